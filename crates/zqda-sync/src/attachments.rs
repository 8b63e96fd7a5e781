//! Attachment payload mirroring
//!
//! Payloads live at `<root>/<item_key>/<filename>`. A file that already
//! exists is never downloaded again, so re-running a sync over the same batch
//! costs no transfers.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use serde::Serialize;
use tracing::{debug, instrument};

use zqda_core::config::Config;
use zqda_core::domain::{LibraryId, Record};
use zqda_core::ports::IRemoteLibrary;

/// Why an attachment was not downloaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The record is not an attachment
    NotAttachment,
    /// Linked URL or linked file; there is no payload to fetch
    LinkOnly,
    /// Downloads are switched off for the library
    Disabled,
    /// No usable filename
    NoFilename,
    /// The payload is already on disk
    Present,
}

/// Result of [`AttachmentFetcher::ensure_attachment`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentOutcome {
    Downloaded(PathBuf),
    Skipped(SkipReason),
}

/// Downloads attachment payloads into the data directory
pub struct AttachmentFetcher {
    remote: Arc<dyn IRemoteLibrary + Send + Sync>,
    root: PathBuf,
    downloads: BTreeMap<LibraryId, bool>,
}

impl AttachmentFetcher {
    /// Create a fetcher writing below `root`, downloading for every library
    pub fn new(remote: Arc<dyn IRemoteLibrary + Send + Sync>, root: impl Into<PathBuf>) -> Self {
        Self {
            remote,
            root: root.into(),
            downloads: BTreeMap::new(),
        }
    }

    /// Create a fetcher honoring each library's `download_attachments` flag
    pub fn from_config(remote: Arc<dyn IRemoteLibrary + Send + Sync>, config: &Config) -> Self {
        let downloads = config
            .libraries
            .iter()
            .map(|(id, library)| (*id, library.download_attachments))
            .collect();
        Self {
            remote,
            root: config.attachments_root().to_path_buf(),
            downloads,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Libraries missing from the configuration download by default
    pub fn downloads_enabled(&self, library: LibraryId) -> bool {
        self.downloads.get(&library).copied().unwrap_or(true)
    }

    /// Where the payload of `record` lives, if it has a usable filename
    pub fn path_for(&self, record: &Record) -> Option<PathBuf> {
        let filename = record.attachment()?.filename.as_deref()?;
        let name = safe_file_name(filename)?;
        Some(self.root.join(record.key().as_str()).join(name))
    }

    /// Make sure the payload of an attachment record is on disk
    ///
    /// HTML snapshots are remapped to their zipped form first, so the record
    /// is rewritten even when the download is skipped or fails.
    ///
    /// # Errors
    /// Returns the download or filesystem failure; the caller decides whether
    /// it is fatal.
    #[instrument(skip(self, record), fields(key = %record.key()))]
    pub async fn ensure_attachment(
        &self,
        library: LibraryId,
        record: &mut Record,
    ) -> anyhow::Result<AttachmentOutcome> {
        if record.remap_html_snapshot() {
            debug!("Remapped HTML snapshot to zip");
        }

        let Some(info) = record.attachment() else {
            return Ok(AttachmentOutcome::Skipped(SkipReason::NotAttachment));
        };
        if info.link_mode.is_link() {
            return Ok(AttachmentOutcome::Skipped(SkipReason::LinkOnly));
        }
        if !self.downloads_enabled(library) {
            return Ok(AttachmentOutcome::Skipped(SkipReason::Disabled));
        }
        let Some(path) = self.path_for(record) else {
            return Ok(AttachmentOutcome::Skipped(SkipReason::NoFilename));
        };
        if tokio::fs::try_exists(&path)
            .await
            .with_context(|| format!("Failed to check {}", path.display()))?
        {
            return Ok(AttachmentOutcome::Skipped(SkipReason::Present));
        }

        let bytes = self
            .remote
            .download_file(library, record.key())
            .await
            .with_context(|| format!("Failed to download attachment {}", record.key()))?;
        write_atomic(&path, &bytes).await?;

        debug!(path = %path.display(), bytes = bytes.len(), "Attachment stored");
        Ok(AttachmentOutcome::Downloaded(path))
    }
}

/// Final path component of a remote filename, rejecting traversal
fn safe_file_name(filename: &str) -> Option<&str> {
    let name = Path::new(filename).file_name()?.to_str()?;
    (!name.is_empty() && name != "." && name != "..").then_some(name)
}

/// Write to a sibling `.tmp` file, then rename over the target
async fn write_atomic(target: &Path, data: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let tmp_path = {
        let mut p = target.as_os_str().to_owned();
        p.push(".tmp");
        PathBuf::from(p)
    };

    tokio::fs::write(&tmp_path, data)
        .await
        .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
    tokio::fs::rename(&tmp_path, target)
        .await
        .with_context(|| format!("Failed to move payload into {}", target.display()))?;
    Ok(())
}
