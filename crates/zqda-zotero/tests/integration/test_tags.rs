//! Tag lookup and write-back

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use zqda_core::domain::RecordKey;
use zqda_zotero::ZoteroError;

use crate::common;

#[tokio::test]
async fn test_items_with_tag() {
    let (server, client) = common::setup_zotero_mock().await;

    Mock::given(method("GET"))
        .and(path(format!("/groups/{}/items", common::LIBRARY)))
        .and(query_param("tag", "method"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([common::item_json("I1", 5, "book")])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let items = client.items_with_tag(common::library(), "method").await.unwrap();
    assert_eq!(items.len(), 1);
}

#[tokio::test]
async fn test_update_tags_sends_version_guard() {
    let (server, client) = common::setup_zotero_mock().await;

    Mock::given(method("PATCH"))
        .and(path(format!("/groups/{}/items/I1", common::LIBRARY)))
        .and(header("If-Unmodified-Since-Version", "5"))
        .and(body_json(json!({"tags": [{"tag": "methods"}, {"tag": "@THEME"}]})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client
        .update_tags(
            common::library(),
            &RecordKey::new("I1".to_string()).unwrap(),
            5,
            &["methods".to_string(), "@THEME".to_string()],
        )
        .await
        .expect("tag update failed");
}

#[tokio::test]
async fn test_update_tags_conflict() {
    let (server, client) = common::setup_zotero_mock().await;

    Mock::given(method("PATCH"))
        .and(path(format!("/groups/{}/items/I1", common::LIBRARY)))
        .respond_with(ResponseTemplate::new(412))
        .mount(&server)
        .await;

    let err = client
        .update_tags(
            common::library(),
            &RecordKey::new("I1".to_string()).unwrap(),
            1,
            &[],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ZoteroError::PreconditionFailed(_)));
}
