//! ZQDA Cache - Local mirror persistence
//!
//! Storage for:
//! - Mirrored records, one SQLite database per library
//! - Library metadata (name, description)
//! - The version ledger (last synchronized version per library)
//!
//! ## Architecture
//!
//! This crate implements the `IRecordStore` and `IVersionLedger` ports from
//! `zqda-core`. It is a driven (secondary) adapter in the hexagonal
//! architecture.
//!
//! ## Key Components
//!
//! - [`DatabasePool`] - Connection pool with migration support
//! - [`SqliteRecordStore`] - `IRecordStore` over `items_<library>.db` files
//! - [`JsonVersionLedger`] - `IVersionLedger` over an atomically replaced JSON file
//! - [`CacheError`] - Error types for cache operations
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::PathBuf;
//! use zqda_cache::{JsonVersionLedger, SqliteRecordStore};
//!
//! let data_dir = PathBuf::from("/home/user/.local/share/zqda");
//! let store = SqliteRecordStore::new(data_dir.clone());
//! let ledger = JsonVersionLedger::new(data_dir.join("versions.json"));
//! // Use store as IRecordStore, ledger as IVersionLedger...
//! ```

pub mod ledger;
pub mod pool;
pub mod store;

pub use ledger::JsonVersionLedger;
pub use pool::DatabasePool;
pub use store::SqliteRecordStore;

/// Errors that can occur during cache operations
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Failed to establish a database connection
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A database query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Schema migration failed
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Serialization or deserialization of domain types failed
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Filesystem error on the ledger or database directory
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<sqlx::Error> for CacheError {
    fn from(e: sqlx::Error) -> Self {
        CacheError::QueryFailed(e.to_string())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        CacheError::SerializationError(e.to_string())
    }
}
