//! ZQDA Zotero - Zotero Web API v3 client
//!
//! Provides an async client for:
//! - Version probing (`Last-Modified-Version`)
//! - Incremental item and collection listings (`since=N`), following
//!   `Link: rel="next"` pagination
//! - Attachment payload download
//! - Tag write-back guarded by `If-Unmodified-Since-Version`
//!
//! ## Modules
//!
//! - [`client`] - HTTP client with 429/503 back-off
//! - [`pagination`] - `Link` header parsing
//! - [`provider`] - `IRemoteLibrary` adapter over one client per library

pub mod client;
pub mod pagination;
pub mod provider;

use std::time::Duration;

use thiserror::Error;
use zqda_core::ports::RemoteError;

pub use client::ZoteroClient;
pub use provider::ZoteroRemoteLibrary;

/// Errors that can occur when communicating with the Zotero Web API
#[derive(Debug, Error)]
pub enum ZoteroError {
    /// The API key is missing, invalid or revoked
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The key lacks access to the library or object
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The object changed since the version sent in `If-Unmodified-Since-Version`
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    /// Still throttled after all retries
    #[error("Too many requests, retry after {retry_after:?}")]
    TooManyRequests {
        /// Back-off requested by the last response
        retry_after: Duration,
    },

    /// A server-side error occurred (5xx)
    #[error("Server error: {0}")]
    ServerError(String),

    /// A network-level error occurred
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// The API response could not be parsed or was malformed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<ZoteroError> for RemoteError {
    fn from(e: ZoteroError) -> Self {
        match e {
            ZoteroError::NotFound(msg) => RemoteError::NotFound(msg),
            ZoteroError::Unauthorized(msg) | ZoteroError::Forbidden(msg) => {
                RemoteError::Unauthorized(msg)
            }
            ZoteroError::TooManyRequests { retry_after } => RemoteError::RateLimited {
                retry_after: retry_after.as_secs(),
            },
            other => RemoteError::Other(anyhow::Error::new(other)),
        }
    }
}
