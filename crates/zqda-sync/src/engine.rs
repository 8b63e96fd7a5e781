//! Incremental synchronization engine
//!
//! The [`SyncEngine`] pulls everything that changed in a group library since
//! the last synchronized version and overwrites the local mirror with it.
//!
//! ## Sync Flow
//!
//! 1. **Version gate**: compare the ledger with `Last-Modified-Version`
//! 2. **Metadata**: refresh the library name and description (best effort)
//! 3. **Pull**: items and collections since the local version, collections
//!    expanded with their direct members
//! 4. **Attachments**: mirror payloads; failures are logged and skipped
//! 5. **Bookkeeping**: write the batch, then advance the ledger, then clear
//!    the index cache
//!
//! A failure before step 5 leaves the ledger untouched, so the next run pulls
//! the same batch again. Remote deletions are not mirrored.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use zqda_core::domain::{CollectionMember, LibraryId, Record, RecordKey};
use zqda_core::ports::{IRecordStore, IRemoteLibrary, IVersionLedger, RemoteError, RemoteObject};

use crate::attachments::{AttachmentFetcher, AttachmentOutcome};
use crate::index_cache::IndexCache;
use crate::SyncError;

// ============================================================================
// Outcomes
// ============================================================================

/// Counters of a completed pull
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Ledger version before the pull
    pub from_version: u64,
    /// Remote version the ledger now holds
    pub to_version: u64,
    /// Records written (items and collections)
    pub records: usize,
    /// Remote objects that could not be mapped onto a record
    pub malformed: usize,
    /// Attachment payloads fetched
    pub downloaded: usize,
    /// Attachment downloads that failed
    pub attachment_errors: usize,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
}

/// Result of a sync call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// The remote version is not newer than the ledger
    NoChanges { version: u64 },
    /// A pull wrote a batch and advanced the ledger
    Updated(SyncReport),
    /// A targeted resync rewrote one record
    RecordUpdated { key: RecordKey },
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoChanges { .. } => write!(f, "No changes."),
            Self::Updated(report) => write!(f, "Updated {} items.", report.records),
            Self::RecordUpdated { .. } => write!(f, "Updated!"),
        }
    }
}

/// Which kind of remote object a targeted resync refetches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Item,
    Collection,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Item => write!(f, "item"),
            Self::Collection => write!(f, "collection"),
        }
    }
}

impl FromStr for ObjectKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "item" => Ok(Self::Item),
            "collection" => Ok(Self::Collection),
            other => Err(format!("expected 'item' or 'collection', got '{other}'")),
        }
    }
}

// ============================================================================
// SyncEngine
// ============================================================================

/// Pulls remote changes into the local store
pub struct SyncEngine {
    remote: Arc<dyn IRemoteLibrary + Send + Sync>,
    store: Arc<dyn IRecordStore + Send + Sync>,
    ledger: Arc<dyn IVersionLedger + Send + Sync>,
    attachments: AttachmentFetcher,
    indexes: Arc<IndexCache>,
}

impl SyncEngine {
    pub fn new(
        remote: Arc<dyn IRemoteLibrary + Send + Sync>,
        store: Arc<dyn IRecordStore + Send + Sync>,
        ledger: Arc<dyn IVersionLedger + Send + Sync>,
        attachments: AttachmentFetcher,
        indexes: Arc<IndexCache>,
    ) -> Self {
        Self {
            remote,
            store,
            ledger,
            attachments,
            indexes,
        }
    }

    pub fn attachments(&self) -> &AttachmentFetcher {
        &self.attachments
    }

    /// Pull every change since the last synchronized version
    ///
    /// # Errors
    /// Any remote failure during the pull, or a store/ledger failure, aborts
    /// the sync with the ledger unchanged.
    #[tracing::instrument(skip(self))]
    pub async fn sync(&self, library: LibraryId) -> Result<SyncOutcome, SyncError> {
        let start = Instant::now();

        // Step 1: Version gate
        let local = self.ledger.get_version(library).await?;
        let remote = self.remote.last_modified_version(library).await?;
        if remote <= local {
            info!(local, remote, "No changes");
            return Ok(SyncOutcome::NoChanges { version: local });
        }

        info!(local, remote, "Starting library sync");

        // Step 2: Library metadata
        self.refresh_library_info(library).await;

        // Step 3: Items and collections since the local version
        let items = self.remote.items_since(library, local).await?;
        let collections = self.remote.collections_since(library, local).await?;
        debug!(
            items = items.len(),
            collections = collections.len(),
            "Fetched changed objects"
        );

        let mut report = SyncReport {
            from_version: local,
            to_version: remote,
            ..SyncReport::default()
        };

        let mut batch = Vec::with_capacity(items.len() + collections.len());
        for object in items {
            match item_record(object) {
                Ok(record) => batch.push(record),
                Err(e) => {
                    warn!(error = %e, "Skipping malformed item");
                    report.malformed += 1;
                }
            }
        }
        for object in collections {
            match self.collection_record(library, object).await {
                Ok(record) => batch.push(record),
                Err(SyncError::Domain(e)) => {
                    warn!(error = %e, "Skipping malformed collection");
                    report.malformed += 1;
                }
                Err(e) => return Err(e),
            }
        }

        // Step 4: Attachments
        for record in batch.iter_mut().filter(|r| r.attachment().is_some()) {
            match self.attachments.ensure_attachment(library, record).await {
                Ok(AttachmentOutcome::Downloaded(path)) => {
                    debug!(key = %record.key(), path = %path.display(), "Attachment downloaded");
                    report.downloaded += 1;
                }
                Ok(AttachmentOutcome::Skipped(reason)) => {
                    debug!(key = %record.key(), ?reason, "Attachment skipped");
                }
                Err(e) => {
                    warn!(key = %record.key(), error = %format!("{e:#}"), "Attachment download failed");
                    report.attachment_errors += 1;
                }
            }
        }

        // Step 5: Store, ledger, index cache
        self.store.put_batch(library, &batch).await?;
        self.ledger.set_version(library, remote).await?;
        self.indexes.invalidate();

        report.records = batch.len();
        report.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            records = report.records,
            downloaded = report.downloaded,
            attachment_errors = report.attachment_errors,
            duration_ms = report.duration_ms,
            "Library sync completed"
        );

        Ok(SyncOutcome::Updated(report))
    }

    /// Refetch one item or collection regardless of versions
    ///
    /// The ledger is not touched.
    ///
    /// # Errors
    /// Returns `SyncError::NotFound` when the remote reports the object as
    /// missing or inaccessible.
    #[tracing::instrument(skip(self))]
    pub async fn sync_one(
        &self,
        library: LibraryId,
        key: &RecordKey,
        kind: ObjectKind,
    ) -> Result<SyncOutcome, SyncError> {
        let fetched = match kind {
            ObjectKind::Item => self.remote.item(library, key).await,
            ObjectKind::Collection => self.remote.collection(library, key).await,
        };
        let missing = |e: SyncError| match e {
            SyncError::Remote(RemoteError::NotFound(_) | RemoteError::Unauthorized(_)) => {
                SyncError::NotFound(format!("{kind} {key} in library {library}"))
            }
            other => other,
        };
        let object = fetched.map_err(|e| missing(e.into()))?;

        let mut record = match kind {
            ObjectKind::Item => item_record(object)?,
            ObjectKind::Collection => self
                .collection_record(library, object)
                .await
                .map_err(missing)?,
        };

        if record.attachment().is_some() {
            if let Err(e) = self.attachments.ensure_attachment(library, &mut record).await {
                warn!(error = %format!("{e:#}"), "Attachment download failed");
            }
        }

        self.store.put(library, &record).await?;
        self.indexes.invalidate();

        info!(key = %record.key(), "Record refreshed");
        Ok(SyncOutcome::RecordUpdated {
            key: record.key().clone(),
        })
    }

    async fn refresh_library_info(&self, library: LibraryId) {
        match self.remote.library_info(library).await {
            Ok(info) => {
                if let Err(e) = self.store.save_library_info(library, &info).await {
                    warn!(error = %format!("{e:#}"), "Failed to store library metadata");
                }
            }
            Err(RemoteError::Unauthorized(msg)) => {
                warn!(%msg, "Not authorized to read library metadata");
            }
            Err(e) => {
                warn!(error = %e, "Failed to refresh library metadata");
            }
        }
    }

    /// Normalize a collection and flatten its direct members
    async fn collection_record(
        &self,
        library: LibraryId,
        object: RemoteObject,
    ) -> Result<Record, SyncError> {
        let members = self.remote.collection_items(library, &object.key).await?;
        let subcollections = self.remote.subcollections(library, &object.key).await?;

        let members = members
            .into_iter()
            .map(|member| {
                let item_type = member.item_type().unwrap_or("item").to_string();
                CollectionMember::item(member.key, item_type)
            })
            .chain(
                subcollections
                    .into_iter()
                    .map(|sub| CollectionMember::subcollection(sub.key)),
            )
            .collect();

        debug!(key = %object.key, "Normalized collection");
        Ok(Record::from_remote_collection(
            object.key,
            object.version,
            object.data,
            members,
        )?)
    }
}

fn item_record(object: RemoteObject) -> Result<Record, SyncError> {
    let RemoteObject {
        key,
        version,
        data,
        bib,
    } = object;
    Ok(Record::from_remote_item(key, version, data)?.with_bib(bib))
}
