//! Zotero Web API client
//!
//! Provides a typed HTTP client for the group-library endpoints of the Zotero
//! Web API v3. Handles the version and key headers, JSON deserialization,
//! `Link` pagination and throttling back-off.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use zqda_core::domain::LibraryId;
//! use zqda_zotero::client::ZoteroClient;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = ZoteroClient::new(Some("api-key-here".to_string()));
//! let library = LibraryId::new(4711671)?;
//! let version = client.last_modified_version(library).await?;
//! println!("Library is at version {version}");
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};
use url::Url;

use zqda_core::domain::{LibraryId, RecordKey};
use zqda_core::ports::{LibraryInfo, RemoteObject};

use crate::pagination;
use crate::ZoteroError;

/// Base URL of the Zotero Web API
pub const ZOTERO_BASE_URL: &str = "https://api.zotero.org";

/// API version sent with every request
const API_VERSION: &str = "3";

/// Largest page the API serves
const MAX_PAGE_SIZE: u32 = 100;

/// Back-off when a 429/503 carries neither `Retry-After` nor `Backoff`
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(5);

const DEFAULT_MAX_RETRIES: u32 = 3;

// ============================================================================
// Zotero API response types
// ============================================================================

/// Response from `GET /groups/{id}`
#[derive(Debug, Deserialize)]
struct GroupResponse {
    data: GroupData,
}

#[derive(Debug, Deserialize)]
struct GroupData {
    name: String,
    #[serde(default)]
    description: String,
}

// ============================================================================
// ZoteroClient
// ============================================================================

/// HTTP client for one API key
///
/// Wraps `reqwest::Client` with the Zotero headers and base URL construction.
#[derive(Debug, Clone)]
pub struct ZoteroClient {
    /// The underlying HTTP client
    client: Client,
    /// Base URL for API requests
    base_url: String,
    /// Key sent as `Zotero-API-Key`; public groups need none
    api_key: Option<String>,
    /// `limit` for listing requests
    page_size: u32,
    /// Retries on 429/503 before giving up
    max_retries: u32,
}

impl ZoteroClient {
    /// Creates a client against the public API
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_base_url(api_key, ZOTERO_BASE_URL)
    }

    /// Creates a client with a custom base URL (useful for testing)
    pub fn with_base_url(api_key: Option<String>, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            page_size: MAX_PAGE_SIZE,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Sets the listing page size, clamped to what the API serves
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    /// Sets the number of retries on throttling responses
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Returns the base URL for API requests
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Creates a request builder for a path relative to the base URL
    ///
    /// Adds `Zotero-API-Version` and, when configured, `Zotero-API-Key`.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.with_headers(self.client.request(method, url))
    }

    /// Creates a request builder for an absolute URL (pagination links)
    pub fn request_url(&self, method: Method, url: Url) -> RequestBuilder {
        self.with_headers(self.client.request(method, url))
    }

    fn with_headers(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = builder.header("Zotero-API-Version", API_VERSION);
        match &self.api_key {
            Some(key) => builder.header("Zotero-API-Key", key),
            None => builder,
        }
    }

    // ========================================================================
    // execute_with_retry - 429/503 handling
    // ========================================================================

    /// Executes a request, waiting out 429/503 responses
    ///
    /// The wait comes from `Retry-After`, then `Backoff`, then a default.
    /// After `max_retries` throttled attempts the last back-off is returned
    /// as [`ZoteroError::TooManyRequests`]. Other error statuses are mapped
    /// onto [`ZoteroError`] variants without retrying.
    pub async fn execute_with_retry(&self, request: RequestBuilder) -> Result<Response, ZoteroError> {
        for attempt in 0..=self.max_retries {
            let request = request
                .try_clone()
                .ok_or_else(|| {
                    ZoteroError::InvalidResponse("Request body cannot be replayed".to_string())
                })?
                .build()?;
            let path = request.url().path().to_string();

            let response = self.client.execute(request).await?;
            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::SERVICE_UNAVAILABLE {
                let retry_after = backoff_delay(response.headers());

                if attempt >= self.max_retries {
                    warn!(%path, attempts = attempt + 1, %status, "Retry limit exhausted");
                    return Err(ZoteroError::TooManyRequests { retry_after });
                }

                info!(
                    %path,
                    attempt,
                    %status,
                    retry_after_ms = retry_after.as_millis(),
                    "Throttled, backing off"
                );
                tokio::time::sleep(retry_after).await;
                continue;
            }

            if attempt > 0 {
                info!(%path, attempt, "Request succeeded after retry");
            }

            return check_status(response).await;
        }

        Err(ZoteroError::InvalidResponse(
            "Retry loop exited unexpectedly".to_string(),
        ))
    }

    /// Fetches every page of a multi-object listing
    pub async fn get_all(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<RemoteObject>, ZoteroError> {
        let mut objects = Vec::new();
        let mut request = self
            .request(Method::GET, path)
            .query(query)
            .query(&[("limit", self.page_size)]);
        let mut page: u32 = 1;

        loop {
            let response = self.execute_with_retry(request).await?;
            let next = pagination::next_link(response.headers());

            let batch: Vec<RemoteObject> = response.json().await.map_err(|e| {
                ZoteroError::InvalidResponse(format!("Failed to parse listing {path}: {e}"))
            })?;
            debug!(path, page, objects = batch.len(), has_next = next.is_some(), "Received page");
            objects.extend(batch);

            match next {
                Some(target) => {
                    let url = pagination::resolve(&self.base_url, &target)?;
                    request = self.request_url(Method::GET, url);
                    page += 1;
                }
                None => break,
            }
        }

        Ok(objects)
    }

    /// Fetches one object
    pub async fn get_object(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<RemoteObject, ZoteroError> {
        let response = self
            .execute_with_retry(self.request(Method::GET, path).query(query))
            .await?;
        response
            .json()
            .await
            .map_err(|e| ZoteroError::InvalidResponse(format!("Failed to parse {path}: {e}")))
    }

    // ========================================================================
    // Group library endpoints
    // ========================================================================

    /// `Last-Modified-Version` of the library
    pub async fn last_modified_version(&self, library: LibraryId) -> Result<u64, ZoteroError> {
        let path = format!("/groups/{library}/items");
        let response = self
            .execute_with_retry(
                self.request(Method::GET, &path)
                    .query(&[("limit", "1"), ("format", "keys")]),
            )
            .await?;

        let version = last_modified_version(response.headers()).ok_or_else(|| {
            ZoteroError::InvalidResponse(format!("{path}: missing Last-Modified-Version"))
        })?;
        debug!(%library, version, "Remote library version");
        Ok(version)
    }

    /// Items changed after `since`, with citation and data
    pub async fn items_since(
        &self,
        library: LibraryId,
        since: u64,
    ) -> Result<Vec<RemoteObject>, ZoteroError> {
        self.get_all(
            &format!("/groups/{library}/items"),
            &[("since", since.to_string()), ("include", "bib,data".to_string())],
        )
        .await
    }

    /// Collections changed after `since`
    pub async fn collections_since(
        &self,
        library: LibraryId,
        since: u64,
    ) -> Result<Vec<RemoteObject>, ZoteroError> {
        self.get_all(
            &format!("/groups/{library}/collections"),
            &[("since", since.to_string())],
        )
        .await
    }

    /// Top-level items inside a collection
    pub async fn collection_items(
        &self,
        library: LibraryId,
        collection: &RecordKey,
    ) -> Result<Vec<RemoteObject>, ZoteroError> {
        self.get_all(
            &format!("/groups/{library}/collections/{collection}/items/top"),
            &[("include", "bib,data".to_string())],
        )
        .await
    }

    /// Direct subcollections of a collection
    pub async fn subcollections(
        &self,
        library: LibraryId,
        collection: &RecordKey,
    ) -> Result<Vec<RemoteObject>, ZoteroError> {
        self.get_all(
            &format!("/groups/{library}/collections/{collection}/collections"),
            &[],
        )
        .await
    }

    pub async fn item(&self, library: LibraryId, key: &RecordKey) -> Result<RemoteObject, ZoteroError> {
        self.get_object(
            &format!("/groups/{library}/items/{key}"),
            &[("include", "bib,data")],
        )
        .await
    }

    pub async fn collection(
        &self,
        library: LibraryId,
        key: &RecordKey,
    ) -> Result<RemoteObject, ZoteroError> {
        self.get_object(&format!("/groups/{library}/collections/{key}"), &[])
            .await
    }

    /// Attachment payload; the API redirects to file storage
    pub async fn download_file(
        &self,
        library: LibraryId,
        key: &RecordKey,
    ) -> Result<Vec<u8>, ZoteroError> {
        let path = format!("/groups/{library}/items/{key}/file");
        let response = self
            .execute_with_retry(self.request(Method::GET, &path))
            .await?;
        let bytes = response.bytes().await?;
        debug!(%library, %key, bytes = bytes.len(), "Downloaded attachment");
        Ok(bytes.to_vec())
    }

    /// Group name and description
    pub async fn group_info(&self, library: LibraryId) -> Result<LibraryInfo, ZoteroError> {
        let path = format!("/groups/{library}");
        let group: GroupResponse = self
            .execute_with_retry(self.request(Method::GET, &path))
            .await?
            .json()
            .await
            .map_err(|e| ZoteroError::InvalidResponse(format!("Failed to parse {path}: {e}")))?;

        Ok(LibraryInfo {
            name: group.data.name,
            description: group.data.description,
        })
    }

    /// Items carrying exactly `tag`
    pub async fn items_with_tag(
        &self,
        library: LibraryId,
        tag: &str,
    ) -> Result<Vec<RemoteObject>, ZoteroError> {
        self.get_all(
            &format!("/groups/{library}/items"),
            &[("tag", tag.to_string()), ("include", "bib,data".to_string())],
        )
        .await
    }

    /// Replace an item's tags; fails with 412 if the item moved past `version`
    pub async fn update_tags(
        &self,
        library: LibraryId,
        key: &RecordKey,
        version: u64,
        tags: &[String],
    ) -> Result<(), ZoteroError> {
        let body = json!({
            "tags": tags.iter().map(|tag| json!({ "tag": tag })).collect::<Vec<_>>()
        });
        let request = self
            .request(Method::PATCH, &format!("/groups/{library}/items/{key}"))
            .header("If-Unmodified-Since-Version", version.to_string())
            .json(&body);

        self.execute_with_retry(request).await?;
        debug!(%library, %key, version, tags = tags.len(), "Tags updated");
        Ok(())
    }
}

// ============================================================================
// Header helpers
// ============================================================================

fn last_modified_version(headers: &HeaderMap) -> Option<u64> {
    headers
        .get("Last-Modified-Version")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// Wait requested by a throttling response
fn backoff_delay(headers: &HeaderMap) -> Duration {
    ["Retry-After", "Backoff"]
        .iter()
        .find_map(|name| headers.get(*name).and_then(|v| v.to_str().ok()))
        .map(|v| parse_retry_after(v, DEFAULT_RETRY_AFTER))
        .unwrap_or(DEFAULT_RETRY_AFTER)
}

/// Parse a `Retry-After` value: delta-seconds or an HTTP-date
pub fn parse_retry_after(value: &str, default: Duration) -> Duration {
    if let Ok(seconds) = value.trim().parse::<u64>() {
        return Duration::from_secs(seconds);
    }

    if let Ok(date) = chrono::DateTime::parse_from_rfc2822(value.trim()) {
        let now = chrono::Utc::now();
        let target = date.with_timezone(&chrono::Utc);
        if target > now {
            if let Ok(secs) = u64::try_from((target - now).num_seconds()) {
                return Duration::from_secs(secs.min(3600));
            }
        }
        return Duration::ZERO;
    }

    warn!(value, "Could not parse Retry-After header, using default");
    default
}

async fn check_status(response: Response) -> Result<Response, ZoteroError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let path = response.url().path().to_string();
    let body = response.text().await.unwrap_or_default();
    let message = match body.trim() {
        "" => path,
        text => format!("{path}: {text}"),
    };

    Err(match status {
        StatusCode::UNAUTHORIZED => ZoteroError::Unauthorized(message),
        StatusCode::FORBIDDEN => ZoteroError::Forbidden(message),
        StatusCode::NOT_FOUND => ZoteroError::NotFound(message),
        StatusCode::PRECONDITION_FAILED => ZoteroError::PreconditionFailed(message),
        s if s.is_server_error() => ZoteroError::ServerError(format!("{s} {message}")),
        s => ZoteroError::InvalidResponse(format!("{s} {message}")),
    })
}
