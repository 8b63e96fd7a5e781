//! Shared test helpers: an in-memory remote library that records its calls

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::{json, Value};
use tempfile::TempDir;

use zqda_cache::{JsonVersionLedger, SqliteRecordStore};
use zqda_core::config::{Config, ConfigBuilder, LibraryConfig};
use zqda_core::domain::{LibraryId, RecordKey};
use zqda_core::ports::{IRemoteLibrary, LibraryInfo, RemoteError, RemoteObject};
use zqda_sync::LibraryCache;

pub fn lib() -> LibraryId {
    LibraryId::new(4711671).unwrap()
}

pub fn key(s: &str) -> RecordKey {
    RecordKey::new(s.to_string()).unwrap()
}

pub fn object(k: &str, version: u64, data: Value) -> RemoteObject {
    RemoteObject {
        key: key(k),
        version,
        data,
        bib: None,
    }
}

pub fn book(k: &str, version: u64, collections: &[&str], tags: &[&str]) -> RemoteObject {
    let tags: Vec<_> = tags.iter().map(|t| json!({"tag": t})).collect();
    object(
        k,
        version,
        json!({"key": k, "itemType": "book", "title": k, "collections": collections, "tags": tags}),
    )
}

pub fn annotation(k: &str, version: u64, parent: &str, tags: &[&str]) -> RemoteObject {
    let tags: Vec<_> = tags.iter().map(|t| json!({"tag": t})).collect();
    object(
        k,
        version,
        json!({"key": k, "itemType": "annotation", "parentItem": parent, "tags": tags}),
    )
}

pub fn attachment(
    k: &str,
    version: u64,
    parent: &str,
    filename: &str,
    content_type: &str,
    link_mode: &str,
) -> RemoteObject {
    object(
        k,
        version,
        json!({
            "key": k,
            "itemType": "attachment",
            "parentItem": parent,
            "filename": filename,
            "contentType": content_type,
            "linkMode": link_mode,
        }),
    )
}

pub fn collection(k: &str, version: u64, parent: Option<&str>) -> RemoteObject {
    object(
        k,
        version,
        json!({"key": k, "name": format!("Collection {k}"), "parentCollection": parent.map_or(json!(false), |p| json!(p))}),
    )
}

// ============================================================================
// FakeRemote
// ============================================================================

/// Library contents served by [`FakeRemote`]
#[derive(Default)]
pub struct FakeState {
    pub version: u64,
    pub items: Vec<RemoteObject>,
    pub collections: Vec<RemoteObject>,
    /// Collection key → direct member items
    pub members: HashMap<String, Vec<RemoteObject>>,
    /// Collection key → direct subcollections
    pub subcollections: HashMap<String, Vec<RemoteObject>>,
    /// Item key → payload
    pub files: HashMap<String, Vec<u8>>,
    /// `None` answers the metadata request with Unauthorized
    pub info: Option<LibraryInfo>,
    /// Fail the items listing with a server error
    pub fail_items: bool,
    /// Collection keys whose member listings answer NotFound
    pub vanished: Vec<String>,
    pub calls: Vec<String>,
}

#[derive(Default)]
pub struct FakeRemote {
    state: Mutex<FakeState>,
}

impl FakeRemote {
    pub fn new(state: FakeState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    /// Number of recorded calls starting with `prefix`
    pub fn calls(&self, prefix: &str) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    /// Add or replace an item and bump the library version to its version
    pub fn push_item(&self, item: RemoteObject) {
        let mut state = self.state();
        state.version = state.version.max(item.version);
        state.items.retain(|i| i.key != item.key);
        state.items.push(item);
    }

    fn record(&self, call: String) -> MutexGuard<'_, FakeState> {
        let mut state = self.state();
        state.calls.push(call);
        state
    }
}

fn tags_of(data: &Value) -> Vec<String> {
    data.get("tags")
        .and_then(Value::as_array)
        .map(|tags| {
            tags.iter()
                .filter_map(|t| t.get("tag").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait::async_trait]
impl IRemoteLibrary for FakeRemote {
    async fn last_modified_version(&self, _library: LibraryId) -> Result<u64, RemoteError> {
        Ok(self.record("version".into()).version)
    }

    async fn items_since(
        &self,
        _library: LibraryId,
        since: u64,
    ) -> Result<Vec<RemoteObject>, RemoteError> {
        let state = self.record(format!("items_since:{since}"));
        if state.fail_items {
            return Err(RemoteError::Other(anyhow::anyhow!("Server error: 500")));
        }
        Ok(state
            .items
            .iter()
            .filter(|i| i.version > since)
            .cloned()
            .collect())
    }

    async fn collections_since(
        &self,
        _library: LibraryId,
        since: u64,
    ) -> Result<Vec<RemoteObject>, RemoteError> {
        let state = self.record(format!("collections_since:{since}"));
        Ok(state
            .collections
            .iter()
            .filter(|c| c.version > since)
            .cloned()
            .collect())
    }

    async fn collection_items(
        &self,
        _library: LibraryId,
        collection: &RecordKey,
    ) -> Result<Vec<RemoteObject>, RemoteError> {
        let state = self.record(format!("collection_items:{collection}"));
        if state.vanished.iter().any(|k| k == collection.as_str()) {
            return Err(RemoteError::NotFound(format!("collections/{collection}/items")));
        }
        Ok(state
            .members
            .get(collection.as_str())
            .cloned()
            .unwrap_or_default())
    }

    async fn subcollections(
        &self,
        _library: LibraryId,
        collection: &RecordKey,
    ) -> Result<Vec<RemoteObject>, RemoteError> {
        let state = self.record(format!("subcollections:{collection}"));
        if state.vanished.iter().any(|k| k == collection.as_str()) {
            return Err(RemoteError::NotFound(format!("collections/{collection}/collections")));
        }
        Ok(state
            .subcollections
            .get(collection.as_str())
            .cloned()
            .unwrap_or_default())
    }

    async fn item(&self, _library: LibraryId, key: &RecordKey) -> Result<RemoteObject, RemoteError> {
        let state = self.record(format!("item:{key}"));
        state
            .items
            .iter()
            .find(|i| &i.key == key)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(format!("items/{key}")))
    }

    async fn collection(
        &self,
        _library: LibraryId,
        key: &RecordKey,
    ) -> Result<RemoteObject, RemoteError> {
        let state = self.record(format!("collection:{key}"));
        state
            .collections
            .iter()
            .find(|c| &c.key == key)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(format!("collections/{key}")))
    }

    async fn download_file(
        &self,
        _library: LibraryId,
        key: &RecordKey,
    ) -> Result<Vec<u8>, RemoteError> {
        let state = self.record(format!("download:{key}"));
        state
            .files
            .get(key.as_str())
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(format!("items/{key}/file")))
    }

    async fn library_info(&self, _library: LibraryId) -> Result<LibraryInfo, RemoteError> {
        let state = self.record("library_info".into());
        state
            .info
            .clone()
            .ok_or_else(|| RemoteError::Unauthorized("groups".into()))
    }

    async fn items_with_tag(
        &self,
        _library: LibraryId,
        tag: &str,
    ) -> Result<Vec<RemoteObject>, RemoteError> {
        let state = self.record(format!("items_with_tag:{tag}"));
        Ok(state
            .items
            .iter()
            .filter(|i| tags_of(&i.data).iter().any(|t| t == tag))
            .cloned()
            .collect())
    }

    async fn update_tags(
        &self,
        _library: LibraryId,
        key: &RecordKey,
        version: u64,
        tags: &[String],
    ) -> Result<(), RemoteError> {
        let mut state = self.record(format!("update_tags:{key}"));
        let next = state.version + 1;
        let item = state
            .items
            .iter_mut()
            .find(|i| &i.key == key)
            .ok_or_else(|| RemoteError::NotFound(format!("items/{key}")))?;
        if item.version != version {
            return Err(RemoteError::Other(anyhow::anyhow!("Precondition failed")));
        }

        let tags: Vec<_> = tags.iter().map(|t| json!({"tag": t})).collect();
        item.data["tags"] = Value::Array(tags);
        item.version = next;
        state.version = next;
        Ok(())
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub remote: Arc<FakeRemote>,
    pub store: Arc<SqliteRecordStore>,
    pub ledger: Arc<JsonVersionLedger>,
    pub cache: LibraryCache,
    pub dir: TempDir,
}

pub fn config(dir: &TempDir, library: LibraryConfig) -> Config {
    ConfigBuilder::new()
        .data_dir(dir.path())
        .library_with(lib(), library)
        .build()
}

pub fn harness(state: FakeState) -> Harness {
    harness_with(state, LibraryConfig::default())
}

pub fn harness_with(state: FakeState, library: LibraryConfig) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let remote = Arc::new(FakeRemote::new(state));
    let store = Arc::new(SqliteRecordStore::in_memory());
    let ledger = Arc::new(JsonVersionLedger::new(dir.path().join("versions.json")));

    let cache = LibraryCache::new(
        config(&dir, library),
        remote.clone(),
        store.clone(),
        ledger.clone(),
    );

    Harness {
        remote,
        store,
        ledger,
        cache,
        dir,
    }
}
