//! Shared test helpers for Zotero API integration tests
//!
//! Provides a wiremock mock server with a keyed client, and canned API
//! objects shaped like the listing responses.

use serde_json::{json, Value};
use wiremock::MockServer;

use zqda_core::domain::LibraryId;
use zqda_zotero::client::ZoteroClient;

pub const LIBRARY: u64 = 4711671;

pub fn library() -> LibraryId {
    LibraryId::new(LIBRARY).unwrap()
}

/// Starts a mock server and returns it with a keyed client
pub async fn setup_zotero_mock() -> (MockServer, ZoteroClient) {
    let server = MockServer::start().await;
    let client = ZoteroClient::with_base_url(Some("test-key".to_string()), server.uri())
        .with_max_retries(2);
    (server, client)
}

/// An item object as the listing endpoints return it
pub fn item_json(key: &str, version: u64, item_type: &str) -> Value {
    json!({
        "key": key,
        "version": version,
        "library": {"type": "group", "id": LIBRARY},
        "bib": format!("<div class=\"csl-entry\">{key}</div>"),
        "data": {"key": key, "version": version, "itemType": item_type, "tags": []}
    })
}

pub fn collection_json(key: &str, version: u64, name: &str) -> Value {
    json!({
        "key": key,
        "version": version,
        "data": {"key": key, "version": version, "name": name, "parentCollection": false}
    })
}
