//! LibraryCache - the read and sync surface for presentation code
//!
//! Every operation is scoped to a library listed in the configuration.
//! Sync triggers (including tag edits, which end in a sync) are serialized
//! by one async mutex; reads never wait for it.

use std::path::PathBuf;
use std::sync::Arc;

use futures_util::TryStreamExt;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{info, warn};

use zqda_core::config::{Config, LibraryConfig};
use zqda_core::domain::links::{group_item_uri, open_pdf_uri, translate_zotero_uri};
use zqda_core::domain::{ChildrenIndex, CollectionIndex, LibraryId, Record, RecordKey, TagIndex};
use zqda_core::ports::{IRecordStore, IRemoteLibrary, IVersionLedger, LibraryInfo};

use crate::attachments::AttachmentFetcher;
use crate::engine::{ObjectKind, SyncEngine, SyncOutcome};
use crate::index_cache::IndexCache;
use crate::tags;
use crate::SyncError;

/// A mirrored attachment payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttachmentFile {
    pub path: PathBuf,
    pub content_type: String,
}

/// Result of a remote tag edit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagEdit {
    /// Items whose tags were written back
    pub updated: usize,
    /// The follow-up sync, if one ran
    pub sync: Option<SyncOutcome>,
}

/// One annotation listed under a tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotationEntry {
    pub key: RecordKey,
    /// Highlighted passage
    pub text: String,
    pub comment: String,
    pub tags: Vec<String>,
    /// Citation of the annotated item, or its title
    pub source: String,
    /// Local path of the annotated item
    pub item_path: Option<String>,
    /// Opens the PDF at the annotation in the desktop client
    pub open_pdf: Option<String>,
}

/// Local mirror of the configured group libraries
pub struct LibraryCache {
    config: Arc<Config>,
    remote: Arc<dyn IRemoteLibrary + Send + Sync>,
    store: Arc<dyn IRecordStore + Send + Sync>,
    engine: SyncEngine,
    indexes: Arc<IndexCache>,
    sync_lock: Mutex<()>,
}

impl LibraryCache {
    pub fn new(
        config: Config,
        remote: Arc<dyn IRemoteLibrary + Send + Sync>,
        store: Arc<dyn IRecordStore + Send + Sync>,
        ledger: Arc<dyn IVersionLedger + Send + Sync>,
    ) -> Self {
        let indexes = Arc::new(IndexCache::new());
        let attachments = AttachmentFetcher::from_config(Arc::clone(&remote), &config);
        let engine = SyncEngine::new(
            Arc::clone(&remote),
            Arc::clone(&store),
            ledger,
            attachments,
            Arc::clone(&indexes),
        );

        Self {
            config: Arc::new(config),
            remote,
            store,
            engine,
            indexes,
            sync_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn indexes(&self) -> &IndexCache {
        &self.indexes
    }

    fn library(&self, library: LibraryId) -> Result<&LibraryConfig, SyncError> {
        self.config
            .library(library)
            .ok_or(SyncError::UnknownLibrary(library))
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    pub async fn get_item(&self, library: LibraryId, key: &RecordKey) -> Result<Record, SyncError> {
        self.library(library)?;
        self.store
            .get(library, key)
            .await?
            .ok_or_else(|| SyncError::NotFound(format!("item {key} in library {library}")))
    }

    /// Every mirrored record, in key order
    pub async fn get_items(&self, library: LibraryId) -> Result<Vec<Record>, SyncError> {
        self.library(library)?;
        let records: Vec<Record> = self.store.scan(library).await?.try_collect().await?;
        Ok(records)
    }

    pub async fn get_tags(&self, library: LibraryId) -> Result<Arc<TagIndex>, SyncError> {
        self.library(library)?;
        Ok(self.indexes.tags(library, self.store.as_ref()).await?)
    }

    pub async fn get_children(&self, library: LibraryId) -> Result<Arc<ChildrenIndex>, SyncError> {
        self.library(library)?;
        Ok(self.indexes.children(library, self.store.as_ref()).await?)
    }

    pub async fn get_collections(
        &self,
        library: LibraryId,
    ) -> Result<Arc<CollectionIndex>, SyncError> {
        self.library(library)?;
        Ok(self.indexes.collections(library, self.store.as_ref()).await?)
    }

    /// Stored name and description, if a sync has fetched them
    pub async fn library_info(&self, library: LibraryId) -> Result<Option<LibraryInfo>, SyncError> {
        self.library(library)?;
        Ok(self.store.library_info(library).await?)
    }

    /// Location and content type of a mirrored attachment payload
    ///
    /// # Errors
    /// `SyncError::NotFound` when the record is missing, is not an attachment,
    /// or its payload is not on disk.
    pub async fn attachment(
        &self,
        library: LibraryId,
        key: &RecordKey,
    ) -> Result<AttachmentFile, SyncError> {
        let record = self.get_item(library, key).await?;
        let missing = || SyncError::NotFound(format!("attachment {key} in library {library}"));

        let info = record.attachment().ok_or_else(missing)?;
        let path = self.engine.attachments().path_for(&record).ok_or_else(missing)?;
        let present = tokio::fs::try_exists(&path)
            .await
            .map_err(|e| SyncError::Storage(e.into()))?;
        if !present {
            return Err(missing());
        }

        Ok(AttachmentFile {
            path,
            content_type: info
                .content_type
                .clone()
                .unwrap_or_else(|| "application/octet-stream".to_string()),
        })
    }

    /// Annotations tagged `tag`, with the item each one annotates
    ///
    /// An annotation hangs off a PDF attachment, which hangs off the cited
    /// item. Links missing from the mirror degrade to `No title`.
    pub async fn annotations_for_tag(
        &self,
        library: LibraryId,
        tag: &str,
    ) -> Result<Vec<AnnotationEntry>, SyncError> {
        let tags = self.get_tags(library).await?;
        let Some(keys) = tags.get(tag) else {
            return Ok(Vec::new());
        };

        let mut entries = Vec::new();
        for key in keys {
            let Some(record) = self.store.get(library, key).await? else {
                continue;
            };
            if record.is_annotation() {
                entries.push(self.annotation_entry(library, &record).await?);
            }
        }
        Ok(entries)
    }

    async fn annotation_entry(
        &self,
        library: LibraryId,
        record: &Record,
    ) -> Result<AnnotationEntry, SyncError> {
        let field = |name: &str| {
            record
                .data()
                .get(name)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let attachment = record.parent_item();
        let cited = match attachment {
            Some(parent) => self
                .store
                .get(library, parent)
                .await?
                .and_then(|a| a.parent_item().cloned()),
            None => None,
        };
        let cited_record = match &cited {
            Some(key) => self.store.get(library, key).await?,
            None => None,
        };

        let source = cited_record
            .as_ref()
            .and_then(|r| {
                r.bib()
                    .map(str::to_string)
                    .or_else(|| r.data().get("title").and_then(Value::as_str).map(str::to_string))
            })
            .unwrap_or_else(|| "No title".to_string());

        Ok(AnnotationEntry {
            key: record.key().clone(),
            text: field("annotationText").unwrap_or_else(|| "No text".to_string()),
            comment: field("annotationComment").unwrap_or_default(),
            tags: record.tags().to_vec(),
            source,
            item_path: cited_record
                .map(|r| translate_zotero_uri(&group_item_uri(library, r.key())).into_owned()),
            open_pdf: attachment.map(|a| {
                open_pdf_uri(library, a, field("annotationPageLabel").as_deref(), record.key())
            }),
        })
    }

    // ------------------------------------------------------------------------
    // Sync triggers
    // ------------------------------------------------------------------------

    pub async fn sync(&self, library: LibraryId) -> Result<SyncOutcome, SyncError> {
        self.library(library)?;
        let _guard = self.sync_lock.lock().await;
        self.engine.sync(library).await
    }

    /// Sync every configured library, one status line per step
    ///
    /// A failing library is reported and the next one still runs.
    pub async fn sync_all(&self) -> Vec<String> {
        let _guard = self.sync_lock.lock().await;
        let mut lines = Vec::new();

        for library in self.config.library_ids() {
            lines.push(format!("Synchronizing {library}..."));
            match self.engine.sync(library).await {
                Ok(outcome) => lines.push(outcome.to_string()),
                Err(e) => {
                    warn!(%library, error = %e, "Library sync failed");
                    lines.push(format!("Failed: {e}"));
                }
            }
        }
        lines
    }

    pub async fn sync_item(
        &self,
        library: LibraryId,
        key: &RecordKey,
        kind: ObjectKind,
    ) -> Result<SyncOutcome, SyncError> {
        self.library(library)?;
        let _guard = self.sync_lock.lock().await;
        self.engine.sync_one(library, key, kind).await
    }

    // ------------------------------------------------------------------------
    // Tag maintenance
    // ------------------------------------------------------------------------

    /// Rewrite `from` to `to` in the tags of every remote item carrying it
    ///
    /// Ends with a sync so the mirror reflects the edit. Nothing is written
    /// or synced when no item carries `from`.
    #[tracing::instrument(skip(self))]
    pub async fn rename_tag(
        &self,
        library: LibraryId,
        from: &str,
        to: &str,
    ) -> Result<TagEdit, SyncError> {
        self.library(library)?;
        let _guard = self.sync_lock.lock().await;

        let mut updated = 0;
        for item in self.remote.items_with_tag(library, from).await? {
            let Some(renamed) = tags::rename_in_tags(&item.tags(), from, to) else {
                continue;
            };
            self.remote
                .update_tags(library, &item.key, item.version, &renamed)
                .await?;
            updated += 1;
        }

        info!(updated, "Tag renamed");
        let sync = if updated > 0 {
            Some(self.engine.sync(library).await?)
        } else {
            None
        };
        Ok(TagEdit { updated, sync })
    }

    /// Tags that could still be grouped under a cluster tag
    pub async fn cluster_candidates(&self, library: LibraryId) -> Result<Vec<String>, SyncError> {
        let prefix = self.library(library)?.cluster_tag_prefix.clone();
        let records = self.get_items(library).await?;
        Ok(tags::cluster_candidates(&records, &prefix))
    }

    /// Add the cluster tag `target` to every remote item tagged with any of
    /// `members`
    #[tracing::instrument(skip(self))]
    pub async fn apply_cluster_tag(
        &self,
        library: LibraryId,
        members: &[String],
        target: &str,
    ) -> Result<TagEdit, SyncError> {
        let prefix = &self.library(library)?.cluster_tag_prefix;
        let target = tags::normalize_cluster_tag(prefix, target);
        let _guard = self.sync_lock.lock().await;

        let mut updated = 0;
        for member in members {
            for item in self.remote.items_with_tag(library, member).await? {
                let Some(tagged) = tags::with_tag(&item.tags(), &target) else {
                    continue;
                };
                self.remote
                    .update_tags(library, &item.key, item.version, &tagged)
                    .await?;
                updated += 1;
            }
        }

        info!(%target, updated, "Cluster tag applied");
        let sync = self.engine.sync(library).await?;
        Ok(TagEdit {
            updated,
            sync: Some(sync),
        })
    }
}
