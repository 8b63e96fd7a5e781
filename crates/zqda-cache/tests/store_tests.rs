//! Integration tests for SqliteRecordStore
//!
//! Most tests use in-memory databases; the file-backed tests check the
//! on-disk layout and that reads never create a store.

use futures_util::TryStreamExt;
use serde_json::json;

use zqda_cache::SqliteRecordStore;
use zqda_core::domain::{CollectionMember, LibraryId, Record, RecordKey};
use zqda_core::ports::{IRecordStore, LibraryInfo};

// ============================================================================
// Test helpers
// ============================================================================

fn lib() -> LibraryId {
    LibraryId::new(4711671).unwrap()
}

fn key(s: &str) -> RecordKey {
    RecordKey::new(s.to_string()).unwrap()
}

fn book(k: &str, version: u64, title: &str) -> Record {
    Record::from_remote_item(
        key(k),
        version,
        json!({"key": k, "itemType": "book", "title": title, "collections": ["C1"]}),
    )
    .unwrap()
}

// ============================================================================
// put / get
// ============================================================================

#[tokio::test]
async fn test_put_then_get() {
    let store = SqliteRecordStore::in_memory();
    let record = book("I1", 3, "Coding Manual");

    store.put(lib(), &record).await.unwrap();

    let loaded = store.get(lib(), &key("I1")).await.unwrap().unwrap();
    assert_eq!(loaded, record);
}

#[tokio::test]
async fn test_get_missing_key_is_none() {
    let store = SqliteRecordStore::in_memory();
    store.put(lib(), &book("I1", 1, "a")).await.unwrap();

    assert!(store.get(lib(), &key("NOPE")).await.unwrap().is_none());
}

#[tokio::test]
async fn test_get_on_unknown_library_is_none() {
    let store = SqliteRecordStore::in_memory();
    assert!(store.get(lib(), &key("I1")).await.unwrap().is_none());
    assert!(!store.exists(lib()).await.unwrap());
}

#[tokio::test]
async fn test_put_overwrites_same_key() {
    let store = SqliteRecordStore::in_memory();
    store.put(lib(), &book("I1", 1, "Draft")).await.unwrap();
    store.put(lib(), &book("I1", 2, "Final")).await.unwrap();

    let loaded = store.get(lib(), &key("I1")).await.unwrap().unwrap();
    assert_eq!(loaded.version(), 2);
    assert_eq!(loaded.data()["title"], "Final");

    let all: Vec<Record> = store.scan(lib()).await.unwrap().try_collect().await.unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn test_libraries_are_isolated() {
    let store = SqliteRecordStore::in_memory();
    let other = LibraryId::new(1001).unwrap();
    store.put(lib(), &book("I1", 1, "a")).await.unwrap();

    assert!(store.get(other, &key("I1")).await.unwrap().is_none());
}

// ============================================================================
// put_batch / scan
// ============================================================================

#[tokio::test]
async fn test_batch_and_scan_in_key_order() {
    let store = SqliteRecordStore::in_memory();
    let collection = Record::from_remote_collection(
        key("C1"),
        4,
        json!({"name": "Interviews", "parentCollection": false}),
        vec![CollectionMember::item(key("I2"), "book")],
    )
    .unwrap();
    let batch = vec![book("I2", 4, "b"), collection, book("I1", 4, "a")];

    store.put_batch(lib(), &batch).await.unwrap();

    let keys: Vec<String> = store
        .scan(lib())
        .await
        .unwrap()
        .map_ok(|r| r.key().to_string())
        .try_collect()
        .await
        .unwrap();
    assert_eq!(keys, vec!["C1", "I1", "I2"]);
}

#[tokio::test]
async fn test_scan_spans_multiple_pages() {
    let store = SqliteRecordStore::in_memory();
    let batch: Vec<Record> = (0..600)
        .map(|i| book(&format!("K{i:04}"), 1, "x"))
        .collect();
    store.put_batch(lib(), &batch).await.unwrap();

    let all: Vec<Record> = store.scan(lib()).await.unwrap().try_collect().await.unwrap();
    assert_eq!(all.len(), 600);
    assert_eq!(all.first().unwrap().key().as_str(), "K0000");
    assert_eq!(all.last().unwrap().key().as_str(), "K0599");
}

#[tokio::test]
async fn test_scan_of_unknown_library_is_empty() {
    let store = SqliteRecordStore::in_memory();
    let all: Vec<Record> = store.scan(lib()).await.unwrap().try_collect().await.unwrap();
    assert!(all.is_empty());
}

#[tokio::test]
async fn test_empty_batch_creates_nothing() {
    let store = SqliteRecordStore::in_memory();
    store.put_batch(lib(), &[]).await.unwrap();
    assert!(!store.exists(lib()).await.unwrap());
}

// ============================================================================
// library info
// ============================================================================

#[tokio::test]
async fn test_library_info_round_trip() {
    let store = SqliteRecordStore::in_memory();
    assert!(store.library_info(lib()).await.unwrap().is_none());

    let info = LibraryInfo {
        name: "QDA Group".to_string(),
        description: "Shared coding".to_string(),
    };
    store.save_library_info(lib(), &info).await.unwrap();
    store
        .save_library_info(
            lib(),
            &LibraryInfo {
                name: "QDA Group (renamed)".to_string(),
                description: String::new(),
            },
        )
        .await
        .unwrap();

    let loaded = store.library_info(lib()).await.unwrap().unwrap();
    assert_eq!(loaded.name, "QDA Group (renamed)");
}

// ============================================================================
// file-backed layout
// ============================================================================

#[tokio::test]
async fn test_reads_do_not_create_store_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteRecordStore::new(dir.path().to_path_buf());

    assert!(store.get(lib(), &key("I1")).await.unwrap().is_none());
    assert!(store.library_info(lib()).await.unwrap().is_none());
    assert!(!store.exists(lib()).await.unwrap());
    assert!(!dir.path().join("items_4711671.db").exists());
}

#[tokio::test]
async fn test_store_file_persists_across_instances() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = SqliteRecordStore::new(dir.path().to_path_buf());
        store.put(lib(), &book("I1", 5, "Persisted")).await.unwrap();
    }
    assert!(dir.path().join("items_4711671.db").exists());

    let reopened = SqliteRecordStore::new(dir.path().to_path_buf());
    assert!(reopened.exists(lib()).await.unwrap());
    let loaded = reopened.get(lib(), &key("I1")).await.unwrap().unwrap();
    assert_eq!(loaded.data()["title"], "Persisted");
}
