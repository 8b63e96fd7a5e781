//! ZQDA Core - Domain logic for the library mirror
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `Record` (tagged union of items, attachments, notes,
//!   annotations and collections), `LibraryId`, `RecordKey`
//! - **Derived indexes** - tag, parent/child and collection membership builders
//! - **Port definitions** - Traits for adapters: `IRemoteLibrary`, `IRecordStore`,
//!   `IVersionLedger`
//! - **Configuration** - YAML-backed `Config` with a per-library table
//!
//! # Architecture
//!
//! The domain module is pure and has no I/O. Ports define the trait interfaces
//! that the cache, Zotero and sync crates implement or consume.

pub mod config;
pub mod domain;
pub mod ports;
