//! ZQDA Sync - Incremental library synchronization
//!
//! Provides:
//! - Version-gated incremental pulls of items and collections
//! - Attachment payload mirroring
//! - Memoized derived indexes (tags, children, collections)
//! - The [`LibraryCache`] facade used by the CLI and the HTTP server
//! - Tag maintenance (rename, thematic cluster tags)
//!
//! ## Modules
//!
//! - [`engine`] - Pull cycle and targeted resync
//! - [`attachments`] - Attachment download with atomic writes
//! - [`index_cache`] - Per-library index memoization with generation guard
//! - [`facade`] - Read/sync operations scoped to configured libraries
//! - [`tags`] - Pure tag rewriting helpers

pub mod attachments;
pub mod engine;
pub mod facade;
pub mod index_cache;
pub mod tags;

use thiserror::Error;
use zqda_core::domain::{DomainError, LibraryId};
use zqda_core::ports::RemoteError;

pub use attachments::{AttachmentFetcher, AttachmentOutcome, SkipReason};
pub use engine::{ObjectKind, SyncEngine, SyncOutcome};
pub use facade::{AnnotationEntry, AttachmentFile, LibraryCache, TagEdit};
pub use index_cache::IndexCache;

/// Errors surfaced by sync and read operations
#[derive(Debug, Error)]
pub enum SyncError {
    /// Missing record locally, or remote 404/403 on a targeted resync
    #[error("Not found: {0}")]
    NotFound(String),

    /// The library has no entry in the configuration
    #[error("Unknown library: {0}")]
    UnknownLibrary(LibraryId),

    /// The remote API failed during a pull or a tag edit
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    /// A remote object could not be mapped onto a record
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Local store, ledger or filesystem failure
    #[error("Storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl SyncError {
    /// True for errors a caller should render as "not found"
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::UnknownLibrary(_))
    }
}
