//! File-backed version ledger
//!
//! The ledger is a single JSON object mapping library id to the last remote
//! version whose changes were fully written to the store:
//!
//! ```json
//! {"4711671": 2381, "5012345": 77}
//! ```
//!
//! Writes go to a temporary sibling that is renamed over the target, so a
//! crash leaves the previous file intact. A missing, unreadable or malformed
//! file reads as version 0 for every library; the next sync then refetches
//! everything and rewrites the file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use zqda_core::domain::LibraryId;
use zqda_core::ports::IVersionLedger;

type Versions = BTreeMap<LibraryId, u64>;

/// `IVersionLedger` over an atomically replaced JSON file
#[derive(Debug)]
pub struct JsonVersionLedger {
    path: PathBuf,
    /// Serializes read-modify-write cycles within the process
    lock: Mutex<()>,
}

impl JsonVersionLedger {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole ledger; corruption yields an empty map
    async fn load(&self) -> Versions {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Versions::new(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Version ledger unreadable, assuming version 0");
                return Versions::new();
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(versions) => versions,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Version ledger corrupt, assuming version 0");
                Versions::new()
            }
        }
    }

    async fn store(&self, versions: &Versions) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let data = serde_json::to_vec_pretty(versions).context("Failed to encode version ledger")?;

        // Same directory so the rename stays on one filesystem
        let tmp_path = {
            let mut p = self.path.as_os_str().to_owned();
            p.push(".tmp");
            PathBuf::from(p)
        };
        tokio::fs::write(&tmp_path, &data)
            .await
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl IVersionLedger for JsonVersionLedger {
    async fn get_version(&self, library: LibraryId) -> anyhow::Result<u64> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await.get(&library).copied().unwrap_or(0))
    }

    async fn set_version(&self, library: LibraryId, version: u64) -> anyhow::Result<()> {
        let _guard = self.lock.lock().await;
        let mut versions = self.load().await;

        let current = versions.get(&library).copied().unwrap_or(0);
        if version <= current {
            debug!(%library, current, requested = version, "Ledger not lowered");
            return Ok(());
        }

        versions.insert(library, version);
        self.store(&versions).await?;
        debug!(%library, version, "Ledger advanced");
        Ok(())
    }
}
