//! Remote library port (driven/secondary port)
//!
//! This module defines the interface for reading a remote group library and
//! writing back tag edits. The implementation targets the Zotero Web API v3.
//!
//! ## Design Notes
//!
//! - Errors are classified into [`RemoteError`] because callers react to the
//!   class: NotFound becomes a typed "not found", Unauthorized degrades the
//!   metadata refresh, everything else aborts the sync.
//! - Every listing method returns the complete result set; pagination is an
//!   adapter concern.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::domain::newtypes::{LibraryId, RecordKey};

// ============================================================================
// DTOs
// ============================================================================

/// One object as returned by the remote API
///
/// Port-level DTO; the sync engine maps it onto a `Record`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteObject {
    pub key: RecordKey,
    pub version: u64,
    /// The object's `data` document
    pub data: Value,
    /// Formatted citation (`include=bib`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bib: Option<String>,
}

impl RemoteObject {
    /// The `itemType` field of the data document, if any
    pub fn item_type(&self) -> Option<&str> {
        self.data.get("itemType").and_then(Value::as_str)
    }

    /// Tag strings of the data document, in remote order
    pub fn tags(&self) -> Vec<String> {
        self.data
            .get("tags")
            .and_then(Value::as_array)
            .map(|tags| {
                tags.iter()
                    .filter_map(|t| t.get("tag").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Group library metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryInfo {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

// ============================================================================
// Errors
// ============================================================================

/// Classified remote failure
#[derive(Debug, Error)]
pub enum RemoteError {
    /// 404, or 403 on a specific object
    #[error("Not found: {0}")]
    NotFound(String),

    /// 401/403 on library-level resources
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Throttled after exhausting retries
    #[error("Rate limited, retry after {retry_after} seconds")]
    RateLimited { retry_after: u64 },

    /// Network, decoding or unexpected status
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ============================================================================
// IRemoteLibrary trait
// ============================================================================

/// Remote library port
///
/// All methods are scoped to one group library. Implementations must be
/// thread-safe (`Send + Sync`).
#[async_trait::async_trait]
pub trait IRemoteLibrary: Send + Sync {
    /// Current library version
    async fn last_modified_version(&self, library: LibraryId) -> Result<u64, RemoteError>;

    /// All items modified after `since`
    async fn items_since(
        &self,
        library: LibraryId,
        since: u64,
    ) -> Result<Vec<RemoteObject>, RemoteError>;

    /// All collections modified after `since`
    async fn collections_since(
        &self,
        library: LibraryId,
        since: u64,
    ) -> Result<Vec<RemoteObject>, RemoteError>;

    /// Top-level items directly inside a collection
    async fn collection_items(
        &self,
        library: LibraryId,
        collection: &RecordKey,
    ) -> Result<Vec<RemoteObject>, RemoteError>;

    /// Direct subcollections of a collection
    async fn subcollections(
        &self,
        library: LibraryId,
        collection: &RecordKey,
    ) -> Result<Vec<RemoteObject>, RemoteError>;

    /// One item by key
    async fn item(&self, library: LibraryId, key: &RecordKey) -> Result<RemoteObject, RemoteError>;

    /// One collection by key
    async fn collection(
        &self,
        library: LibraryId,
        key: &RecordKey,
    ) -> Result<RemoteObject, RemoteError>;

    /// Binary payload of an attachment
    async fn download_file(&self, library: LibraryId, key: &RecordKey)
        -> Result<Vec<u8>, RemoteError>;

    /// Library name and description
    async fn library_info(&self, library: LibraryId) -> Result<LibraryInfo, RemoteError>;

    /// All items carrying `tag`
    async fn items_with_tag(
        &self,
        library: LibraryId,
        tag: &str,
    ) -> Result<Vec<RemoteObject>, RemoteError>;

    /// Replace an item's tags, guarded by its current version
    async fn update_tags(
        &self,
        library: LibraryId,
        key: &RecordKey,
        version: u64,
        tags: &[String],
    ) -> Result<(), RemoteError>;
}
