//! Single-object endpoints, payload download and error mapping

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use zqda_core::config::{ConfigBuilder, LibraryConfig};
use zqda_core::domain::RecordKey;
use zqda_core::ports::{IRemoteLibrary, RemoteError};
use zqda_zotero::{ZoteroError, ZoteroRemoteLibrary};

use crate::common;

fn key(s: &str) -> RecordKey {
    RecordKey::new(s.to_string()).unwrap()
}

#[tokio::test]
async fn test_single_item_with_bib() {
    let (server, client) = common::setup_zotero_mock().await;

    Mock::given(method("GET"))
        .and(path(format!("/groups/{}/items/I1", common::LIBRARY)))
        .and(query_param("include", "bib,data"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::item_json("I1", 7, "book")))
        .mount(&server)
        .await;

    let item = client.item(common::library(), &key("I1")).await.unwrap();
    assert_eq!(item.version, 7);
    assert_eq!(item.item_type(), Some("book"));
}

#[tokio::test]
async fn test_missing_item_is_not_found() {
    let (server, client) = common::setup_zotero_mock().await;

    Mock::given(method("GET"))
        .and(path(format!("/groups/{}/items/GONE", common::LIBRARY)))
        .respond_with(ResponseTemplate::new(404).set_body_string("Item not found"))
        .mount(&server)
        .await;

    let err = client.item(common::library(), &key("GONE")).await.unwrap_err();
    match err {
        ZoteroError::NotFound(msg) => assert!(msg.contains("Item not found")),
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn test_download_file_follows_redirect() {
    let (server, client) = common::setup_zotero_mock().await;

    Mock::given(method("GET"))
        .and(path(format!("/groups/{}/items/A1/file", common::LIBRARY)))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("Location", format!("{}/storage/A1", server.uri()).as_str()),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/storage/A1"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.7".to_vec()))
        .mount(&server)
        .await;

    let bytes = client.download_file(common::library(), &key("A1")).await.unwrap();
    assert_eq!(bytes, b"%PDF-1.7");
}

#[tokio::test]
async fn test_group_info() {
    let (server, client) = common::setup_zotero_mock().await;

    Mock::given(method("GET"))
        .and(path(format!("/groups/{}", common::LIBRARY)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": common::LIBRARY,
            "version": 2,
            "data": {"id": common::LIBRARY, "name": "QDA Group", "description": "Shared coding"}
        })))
        .mount(&server)
        .await;

    let info = client.group_info(common::library()).await.unwrap();
    assert_eq!(info.name, "QDA Group");
    assert_eq!(info.description, "Shared coding");
}

#[tokio::test]
async fn test_adapter_classifies_errors() {
    let (server, _client) = common::setup_zotero_mock().await;
    let config = ConfigBuilder::new()
        .api_base_url(server.uri())
        .library_with(
            common::library(),
            LibraryConfig {
                api_key: Some("test-key".to_string()),
                ..LibraryConfig::default()
            },
        )
        .build();
    let remote = ZoteroRemoteLibrary::from_config(&config);

    Mock::given(method("GET"))
        .and(path(format!("/groups/{}", common::LIBRARY)))
        .respond_with(ResponseTemplate::new(403).set_body_string("Forbidden"))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/groups/{}/collections/NOPE", common::LIBRARY)))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/groups/{}/items", common::LIBRARY)))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    assert!(matches!(
        remote.library_info(common::library()).await,
        Err(RemoteError::Unauthorized(_))
    ));
    assert!(matches!(
        remote.collection(common::library(), &key("NOPE")).await,
        Err(RemoteError::NotFound(_))
    ));
    assert!(matches!(
        remote.items_since(common::library(), 0).await,
        Err(RemoteError::Other(_))
    ));
}
