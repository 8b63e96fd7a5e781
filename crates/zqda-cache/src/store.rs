//! SQLite implementation of IRecordStore
//!
//! Each library lives in its own database file, `items_<library>.db`, under
//! the data directory. Records are stored whole as JSON documents keyed by
//! their remote key; a later write for the same key replaces the earlier one.
//!
//! ## Type Mapping
//!
//! | Domain Type  | SQL Type | Strategy                              |
//! |--------------|----------|---------------------------------------|
//! | RecordKey    | TEXT     | `.as_str()` / `RecordKey::new()`      |
//! | version      | INTEGER  | `u64` stored as `i64`                 |
//! | Record       | TEXT     | serde_json document                   |
//! | LibraryInfo  | TEXT     | `name` and `description` columns      |

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use futures_util::stream::{self, StreamExt, TryStreamExt};
use sqlx::SqlitePool;
use tokio::sync::Mutex;

use zqda_core::domain::{LibraryId, Record, RecordKey};
use zqda_core::ports::{IRecordStore, LibraryInfo, RecordStream};

use crate::pool::DatabasePool;
use crate::CacheError;

/// Rows fetched per page by [`IRecordStore::scan`]
const SCAN_PAGE_SIZE: i64 = 256;

#[derive(Debug)]
enum Location {
    Directory(PathBuf),
    InMemory,
}

/// SQLite-based implementation of the record store port
///
/// Pools are opened lazily per library and kept for the lifetime of the
/// store. Write paths create the database; read paths only open existing ones.
#[derive(Debug)]
pub struct SqliteRecordStore {
    location: Location,
    pools: Mutex<HashMap<LibraryId, SqlitePool>>,
}

impl SqliteRecordStore {
    /// Store rooted at `data_dir`
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            location: Location::Directory(data_dir),
            pools: Mutex::new(HashMap::new()),
        }
    }

    /// Store keeping every library in its own in-memory database
    pub fn in_memory() -> Self {
        Self {
            location: Location::InMemory,
            pools: Mutex::new(HashMap::new()),
        }
    }

    fn db_path(&self, library: LibraryId) -> Option<PathBuf> {
        match &self.location {
            Location::Directory(dir) => Some(dir.join(format!("items_{library}.db"))),
            Location::InMemory => None,
        }
    }

    /// Pool for reads; `None` if the library has never been written
    async fn read_pool(&self, library: LibraryId) -> Result<Option<SqlitePool>, CacheError> {
        let mut pools = self.pools.lock().await;
        if let Some(pool) = pools.get(&library) {
            return Ok(Some(pool.clone()));
        }

        let Some(path) = self.db_path(library) else {
            return Ok(None);
        };
        match DatabasePool::open_existing(&path).await? {
            Some(db) => {
                let pool = db.pool().clone();
                pools.insert(library, pool.clone());
                Ok(Some(pool))
            }
            None => Ok(None),
        }
    }

    /// Pool for writes; creates the database on first use
    async fn write_pool(&self, library: LibraryId) -> Result<SqlitePool, CacheError> {
        let mut pools = self.pools.lock().await;
        if let Some(pool) = pools.get(&library) {
            return Ok(pool.clone());
        }

        let db = match self.db_path(library) {
            Some(path) => DatabasePool::new(&path).await?,
            None => DatabasePool::in_memory().await?,
        };
        let pool = db.pool().clone();
        pools.insert(library, pool.clone());
        Ok(pool)
    }
}

// ============================================================================
// Helper functions for type conversion
// ============================================================================

fn encode(record: &Record) -> Result<String, CacheError> {
    serde_json::to_string(record).map_err(CacheError::from)
}

fn decode(key: &str, document: &str) -> anyhow::Result<Record> {
    serde_json::from_str(document).with_context(|| format!("Corrupt record document for {key}"))
}

fn version_to_i64(version: u64) -> i64 {
    i64::try_from(version).unwrap_or(i64::MAX)
}

async fn fetch_page(
    pool: &SqlitePool,
    after: Option<&str>,
) -> Result<Vec<(String, String)>, sqlx::Error> {
    match after {
        Some(after) => {
            sqlx::query_as(
                "SELECT key, document FROM records WHERE key > ? ORDER BY key LIMIT ?",
            )
            .bind(after)
            .bind(SCAN_PAGE_SIZE)
            .fetch_all(pool)
            .await
        }
        None => {
            sqlx::query_as("SELECT key, document FROM records ORDER BY key LIMIT ?")
                .bind(SCAN_PAGE_SIZE)
                .fetch_all(pool)
                .await
        }
    }
}

/// Cursor state of a running scan
struct ScanCursor {
    pool: SqlitePool,
    after: Option<String>,
    exhausted: bool,
}

fn scan_stream(pool: SqlitePool) -> RecordStream {
    let cursor = ScanCursor {
        pool,
        after: None,
        exhausted: false,
    };

    stream::try_unfold(cursor, |mut cursor| async move {
        if cursor.exhausted {
            return Ok::<_, anyhow::Error>(None);
        }

        let rows = fetch_page(&cursor.pool, cursor.after.as_deref())
            .await
            .context("Failed to fetch record page")?;
        if rows.is_empty() {
            return Ok(None);
        }

        cursor.exhausted = rows.len() < SCAN_PAGE_SIZE as usize;
        cursor.after = rows.last().map(|(key, _)| key.clone());

        let page: Vec<anyhow::Result<Record>> = rows
            .iter()
            .map(|(key, document)| decode(key, document))
            .collect();
        Ok(Some((stream::iter(page), cursor)))
    })
    .try_flatten()
    .boxed()
}

#[async_trait::async_trait]
impl IRecordStore for SqliteRecordStore {
    async fn put(&self, library: LibraryId, record: &Record) -> anyhow::Result<()> {
        let pool = self.write_pool(library).await?;
        let document = encode(record)?;

        sqlx::query(
            "INSERT OR REPLACE INTO records (key, item_type, version, document) VALUES (?, ?, ?, ?)",
        )
        .bind(record.key().as_str())
        .bind(record.item_type())
        .bind(version_to_i64(record.version()))
        .bind(&document)
        .execute(&pool)
        .await
        .with_context(|| format!("Failed to store record {}", record.key()))?;

        tracing::trace!(%library, key = %record.key(), "Record stored");
        Ok(())
    }

    async fn put_batch(&self, library: LibraryId, records: &[Record]) -> anyhow::Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let pool = self.write_pool(library).await?;

        let mut tx = pool.begin().await.context("Failed to begin transaction")?;
        for record in records {
            let document = encode(record)?;
            sqlx::query(
                "INSERT OR REPLACE INTO records (key, item_type, version, document) VALUES (?, ?, ?, ?)",
            )
            .bind(record.key().as_str())
            .bind(record.item_type())
            .bind(version_to_i64(record.version()))
            .bind(&document)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to store record {}", record.key()))?;
        }
        tx.commit().await.context("Failed to commit record batch")?;

        tracing::debug!(%library, count = records.len(), "Record batch stored");
        Ok(())
    }

    async fn get(&self, library: LibraryId, key: &RecordKey) -> anyhow::Result<Option<Record>> {
        let Some(pool) = self.read_pool(library).await? else {
            return Ok(None);
        };

        let document: Option<String> =
            sqlx::query_scalar("SELECT document FROM records WHERE key = ?")
                .bind(key.as_str())
                .fetch_optional(&pool)
                .await
                .with_context(|| format!("Failed to read record {key}"))?;

        document
            .map(|doc| decode(key.as_str(), &doc))
            .transpose()
    }

    async fn scan(&self, library: LibraryId) -> anyhow::Result<RecordStream> {
        match self.read_pool(library).await? {
            Some(pool) => Ok(scan_stream(pool)),
            None => Ok(stream::empty().boxed()),
        }
    }

    async fn exists(&self, library: LibraryId) -> anyhow::Result<bool> {
        if self.pools.lock().await.contains_key(&library) {
            return Ok(true);
        }
        match self.db_path(library) {
            Some(path) => Ok(tokio::fs::try_exists(&path).await?),
            None => Ok(false),
        }
    }

    async fn save_library_info(&self, library: LibraryId, info: &LibraryInfo) -> anyhow::Result<()> {
        let pool = self.write_pool(library).await?;

        sqlx::query(
            "INSERT OR REPLACE INTO library_info (id, name, description, updated_at) VALUES (1, ?, ?, ?)",
        )
        .bind(&info.name)
        .bind(&info.description)
        .bind(Utc::now().to_rfc3339())
        .execute(&pool)
        .await
        .context("Failed to store library info")?;

        tracing::debug!(%library, name = %info.name, "Library info stored");
        Ok(())
    }

    async fn library_info(&self, library: LibraryId) -> anyhow::Result<Option<LibraryInfo>> {
        let Some(pool) = self.read_pool(library).await? else {
            return Ok(None);
        };

        let row: Option<(String, String)> =
            sqlx::query_as("SELECT name, description FROM library_info WHERE id = 1")
                .fetch_optional(&pool)
                .await
                .context("Failed to read library info")?;

        Ok(row.map(|(name, description)| LibraryInfo { name, description }))
    }
}
