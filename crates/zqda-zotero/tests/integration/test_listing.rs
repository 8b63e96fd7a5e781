//! Listing endpoints and `Link` pagination

use serde_json::json;
use wiremock::matchers::{header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, ResponseTemplate};

use zqda_core::domain::RecordKey;

use crate::common;

#[tokio::test]
async fn test_version_request_sends_headers() {
    let (server, client) = common::setup_zotero_mock().await;

    Mock::given(method("GET"))
        .and(path(format!("/groups/{}/items", common::LIBRARY)))
        .and(query_param("limit", "1"))
        .and(query_param("format", "keys"))
        .and(header("Zotero-API-Version", "3"))
        .and(header("Zotero-API-Key", "test-key"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Last-Modified-Version", "2381")
                .set_body_string("ABCD1234\n"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let version = client
        .last_modified_version(common::library())
        .await
        .expect("version request failed");
    assert_eq!(version, 2381);
}

#[tokio::test]
async fn test_version_request_without_header_is_invalid() {
    let (server, client) = common::setup_zotero_mock().await;

    Mock::given(method("GET"))
        .and(path(format!("/groups/{}/items", common::LIBRARY)))
        .respond_with(ResponseTemplate::new(200).set_body_string(""))
        .mount(&server)
        .await;

    let err = client.last_modified_version(common::library()).await.unwrap_err();
    assert!(matches!(err, zqda_zotero::ZoteroError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_items_since_follows_next_links() {
    let (server, client) = common::setup_zotero_mock().await;
    let items_path = format!("/groups/{}/items", common::LIBRARY);

    Mock::given(method("GET"))
        .and(path(items_path.as_str()))
        .and(query_param("since", "10"))
        .and(query_param("include", "bib,data"))
        .and(query_param_is_missing("start"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header(
                    "Link",
                    format!(
                        "<{}{}?since=10&include=bib%2Cdata&start=2&limit=2>; rel=\"next\"",
                        server.uri(),
                        items_path
                    )
                    .as_str(),
                )
                .set_body_json(json!([
                    common::item_json("I1", 11, "book"),
                    common::item_json("A1", 12, "attachment")
                ])),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(items_path.as_str()))
        .and(query_param("start", "2"))
        .and(header("Zotero-API-Key", "test-key"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([common::item_json("N1", 12, "note")])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let items = client
        .items_since(common::library(), 10)
        .await
        .expect("listing failed");

    let keys: Vec<&str> = items.iter().map(|i| i.key.as_str()).collect();
    assert_eq!(keys, vec!["I1", "A1", "N1"]);
    assert_eq!(items[0].version, 11);
    assert_eq!(items[1].item_type(), Some("attachment"));
    assert!(items[0].bib.as_deref().unwrap().contains("I1"));
}

#[tokio::test]
async fn test_empty_listing() {
    let (server, client) = common::setup_zotero_mock().await;

    Mock::given(method("GET"))
        .and(path(format!("/groups/{}/collections", common::LIBRARY)))
        .and(query_param("since", "99"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let collections = client.collections_since(common::library(), 99).await.unwrap();
    assert!(collections.is_empty());
}

#[tokio::test]
async fn test_collection_members_and_subcollections() {
    let (server, client) = common::setup_zotero_mock().await;
    let c1 = RecordKey::new("C1".to_string()).unwrap();

    Mock::given(method("GET"))
        .and(path(format!("/groups/{}/collections/C1/items/top", common::LIBRARY)))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([common::item_json("I1", 3, "book")])),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/groups/{}/collections/C1/collections", common::LIBRARY)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([common::collection_json("C2", 4, "Sub")])),
        )
        .mount(&server)
        .await;

    let members = client.collection_items(common::library(), &c1).await.unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].key.as_str(), "I1");

    let subs = client.subcollections(common::library(), &c1).await.unwrap();
    assert_eq!(subs[0].data["name"], "Sub");
}

#[tokio::test]
async fn test_malformed_listing_is_invalid_response() {
    let (server, client) = common::setup_zotero_mock().await;

    Mock::given(method("GET"))
        .and(path(format!("/groups/{}/items", common::LIBRARY)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"not": "a list"})))
        .mount(&server)
        .await;

    let err = client.items_since(common::library(), 0).await.unwrap_err();
    assert!(matches!(err, zqda_zotero::ZoteroError::InvalidResponse(_)));
}
