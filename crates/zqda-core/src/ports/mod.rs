//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. The sync crate depends on these traits; their
//! implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IRemoteLibrary`] - Read and tag-write access to a remote group library
//! - [`IRecordStore`] - Per-library persistent record storage
//! - [`IVersionLedger`] - Last synchronized version per library

pub mod record_store;
pub mod remote_library;
pub mod version_ledger;

pub use record_store::{IRecordStore, RecordStream};
pub use remote_library::{IRemoteLibrary, LibraryInfo, RemoteError, RemoteObject};
pub use version_ledger::IVersionLedger;
