//! ZoteroRemoteLibrary - IRemoteLibrary implementation for the Zotero Web API
//!
//! Holds one [`ZoteroClient`] per configured library so each group is
//! queried with its own API key. Libraries without an entry are queried
//! anonymously, which works for public groups.

use std::collections::HashMap;

use zqda_core::config::Config;
use zqda_core::domain::{LibraryId, RecordKey};
use zqda_core::ports::{IRemoteLibrary, LibraryInfo, RemoteError, RemoteObject};

use crate::client::ZoteroClient;

/// Remote library port over the Zotero Web API
#[derive(Debug)]
pub struct ZoteroRemoteLibrary {
    clients: HashMap<LibraryId, ZoteroClient>,
    anonymous: ZoteroClient,
}

impl ZoteroRemoteLibrary {
    /// Build clients for every library in `config`
    pub fn from_config(config: &Config) -> Self {
        let make = |api_key: Option<String>| {
            ZoteroClient::with_base_url(api_key, config.api.base_url.as_str())
                .with_page_size(config.api.page_size)
                .with_max_retries(config.api.max_retries)
        };

        let clients = config
            .libraries
            .iter()
            .map(|(id, library)| (*id, make(library.api_key.clone())))
            .collect();

        Self {
            clients,
            anonymous: make(None),
        }
    }

    fn client(&self, library: LibraryId) -> &ZoteroClient {
        self.clients.get(&library).unwrap_or(&self.anonymous)
    }
}

#[async_trait::async_trait]
impl IRemoteLibrary for ZoteroRemoteLibrary {
    async fn last_modified_version(&self, library: LibraryId) -> Result<u64, RemoteError> {
        Ok(self.client(library).last_modified_version(library).await?)
    }

    async fn items_since(
        &self,
        library: LibraryId,
        since: u64,
    ) -> Result<Vec<RemoteObject>, RemoteError> {
        Ok(self.client(library).items_since(library, since).await?)
    }

    async fn collections_since(
        &self,
        library: LibraryId,
        since: u64,
    ) -> Result<Vec<RemoteObject>, RemoteError> {
        Ok(self.client(library).collections_since(library, since).await?)
    }

    async fn collection_items(
        &self,
        library: LibraryId,
        collection: &RecordKey,
    ) -> Result<Vec<RemoteObject>, RemoteError> {
        Ok(self
            .client(library)
            .collection_items(library, collection)
            .await?)
    }

    async fn subcollections(
        &self,
        library: LibraryId,
        collection: &RecordKey,
    ) -> Result<Vec<RemoteObject>, RemoteError> {
        Ok(self.client(library).subcollections(library, collection).await?)
    }

    async fn item(&self, library: LibraryId, key: &RecordKey) -> Result<RemoteObject, RemoteError> {
        Ok(self.client(library).item(library, key).await?)
    }

    async fn collection(
        &self,
        library: LibraryId,
        key: &RecordKey,
    ) -> Result<RemoteObject, RemoteError> {
        Ok(self.client(library).collection(library, key).await?)
    }

    async fn download_file(
        &self,
        library: LibraryId,
        key: &RecordKey,
    ) -> Result<Vec<u8>, RemoteError> {
        Ok(self.client(library).download_file(library, key).await?)
    }

    async fn library_info(&self, library: LibraryId) -> Result<LibraryInfo, RemoteError> {
        Ok(self.client(library).group_info(library).await?)
    }

    async fn items_with_tag(
        &self,
        library: LibraryId,
        tag: &str,
    ) -> Result<Vec<RemoteObject>, RemoteError> {
        Ok(self.client(library).items_with_tag(library, tag).await?)
    }

    async fn update_tags(
        &self,
        library: LibraryId,
        key: &RecordKey,
        version: u64,
        tags: &[String],
    ) -> Result<(), RemoteError> {
        Ok(self
            .client(library)
            .update_tags(library, key, version, tags)
            .await?)
    }
}
