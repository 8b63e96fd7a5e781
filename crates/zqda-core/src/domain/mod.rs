//! Domain entities and business logic
//!
//! This module contains the core domain types for ZQDA:
//! - Newtypes for library identifiers and record keys
//! - The `Record` tagged union mirrored from the remote library
//! - Derived index builders (tags, children, collections)
//! - Link helpers for rewriting remote item URIs
//! - Domain-specific error types

pub mod errors;
pub mod index;
pub mod links;
pub mod newtypes;
pub mod record;

// Re-export commonly used types
pub use errors::DomainError;
pub use index::{ChildrenIndex, CollectionIndex, TagIndex, TOP_BUCKET};
pub use newtypes::{LibraryId, RecordKey};
pub use record::{AttachmentInfo, CollectionMember, LinkMode, Record, RecordKind};
