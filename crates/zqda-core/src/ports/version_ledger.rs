//! Version ledger port (driven/secondary port)

use crate::domain::newtypes::LibraryId;

/// Last synchronized remote version per library
#[async_trait::async_trait]
pub trait IVersionLedger: Send + Sync {
    /// Stored version, or 0 when the library was never synced
    async fn get_version(&self, library: LibraryId) -> anyhow::Result<u64>;

    /// Record a completed sync; never lowers a stored version
    async fn set_version(&self, library: LibraryId, version: u64) -> anyhow::Result<()>;
}
