//! Domain error types
//!
//! This module defines error types specific to domain operations:
//! identifier validation and malformed remote documents.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Library identifiers are positive integers
    #[error("Invalid library ID: {0}")]
    InvalidLibraryId(String),

    /// Record keys are non-empty ASCII alphanumeric strings
    #[error("Invalid record key: {0}")]
    InvalidRecordKey(String),

    /// A remote document could not be mapped onto a record
    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}
