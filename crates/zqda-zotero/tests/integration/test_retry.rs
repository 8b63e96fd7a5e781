//! 429/503 back-off

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use zqda_zotero::ZoteroError;

use crate::common;

#[tokio::test]
async fn test_retries_after_429() {
    let (server, client) = common::setup_zotero_mock().await;
    let items_path = format!("/groups/{}/items", common::LIBRARY);

    Mock::given(method("GET"))
        .and(path(items_path.as_str()))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(items_path.as_str()))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([common::item_json("I1", 1, "book")])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let items = client.items_since(common::library(), 0).await.unwrap();
    assert_eq!(items.len(), 1);
}

#[tokio::test]
async fn test_retries_after_503_backoff() {
    let (server, client) = common::setup_zotero_mock().await;

    Mock::given(method("GET"))
        .and(path(format!("/groups/{}", common::LIBRARY)))
        .respond_with(ResponseTemplate::new(503).insert_header("Backoff", "0"))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/groups/{}", common::LIBRARY)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"name": "QDA Group"}
        })))
        .mount(&server)
        .await;

    let info = client.group_info(common::library()).await.unwrap();
    assert_eq!(info.name, "QDA Group");
    assert_eq!(info.description, "");
}

#[tokio::test]
async fn test_gives_up_after_max_retries() {
    let (server, client) = common::setup_zotero_mock().await;

    // max_retries is 2 in the shared client: 3 attempts in total
    Mock::given(method("GET"))
        .and(path(format!("/groups/{}/items", common::LIBRARY)))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .expect(3)
        .mount(&server)
        .await;

    let err = client.last_modified_version(common::library()).await.unwrap_err();
    assert!(matches!(err, ZoteroError::TooManyRequests { .. }));
}
