//! Record store port (driven/secondary port)
//!
//! Defines the interface for per-library persistent storage of mirrored
//! records. The primary implementation uses one SQLite database per library.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because storage errors are adapter-specific.
//! - Reads on a library that was never synced return `None` or an empty
//!   stream; they never create storage.

use futures_util::stream::BoxStream;

use crate::domain::newtypes::{LibraryId, RecordKey};
use crate::domain::record::Record;
use crate::ports::remote_library::LibraryInfo;

/// Lazy stream of records in key order
pub type RecordStream = BoxStream<'static, anyhow::Result<Record>>;

/// Record storage port
#[async_trait::async_trait]
pub trait IRecordStore: Send + Sync {
    /// Insert or overwrite one record
    async fn put(&self, library: LibraryId, record: &Record) -> anyhow::Result<()>;

    /// Insert or overwrite many records in one transaction
    async fn put_batch(&self, library: LibraryId, records: &[Record]) -> anyhow::Result<()>;

    /// Get one record by key
    async fn get(&self, library: LibraryId, key: &RecordKey) -> anyhow::Result<Option<Record>>;

    /// Stream every record of the library, paged by key
    async fn scan(&self, library: LibraryId) -> anyhow::Result<RecordStream>;

    /// Whether storage for the library exists
    async fn exists(&self, library: LibraryId) -> anyhow::Result<bool>;

    /// Store the library's name and description
    async fn save_library_info(&self, library: LibraryId, info: &LibraryInfo)
        -> anyhow::Result<()>;

    /// Stored library metadata, if any
    async fn library_info(&self, library: LibraryId) -> anyhow::Result<Option<LibraryInfo>>;
}
