//! Sync commands - pull remote changes into the local mirror
//!
//! `zqda sync [LIBRARY]` runs an incremental pull for one library, or for
//! every configured library in order. `zqda resync LIBRARY KEY` refetches a
//! single item or collection without touching the version ledger.

use anyhow::Result;
use clap::Args;
use serde_json::json;
use tracing::info;

use zqda_core::domain::{LibraryId, RecordKey};
use zqda_sync::ObjectKind;

use crate::context::AppContext;

#[derive(Debug, Args)]
pub struct SyncCommand {
    /// Library id; every configured library when omitted
    pub library: Option<LibraryId>,
}

impl SyncCommand {
    pub async fn execute(&self, ctx: &AppContext) -> Result<()> {
        let formatter = ctx.formatter();
        let cache = ctx.library_cache();

        let Some(library) = self.library else {
            if ctx.config.libraries.is_empty() {
                formatter.warn(&format!(
                    "No libraries configured in {}",
                    ctx.config_path.display()
                ));
                return Ok(());
            }

            info!(libraries = ctx.config.libraries.len(), "Syncing all libraries");
            let lines = cache.sync_all().await;
            if ctx.format.is_json() {
                formatter.print_json(&json!({ "lines": lines }));
            } else {
                for line in &lines {
                    formatter.info(line);
                }
            }
            return Ok(());
        };

        let outcome = cache.sync(library).await?;
        if ctx.format.is_json() {
            formatter.print_json(&json!({
                "library": library,
                "message": outcome.to_string(),
                "outcome": serde_json::to_value(&outcome)?,
            }));
        } else {
            formatter.success(&outcome.to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Args)]
pub struct ResyncCommand {
    pub library: LibraryId,

    /// Item or collection key
    pub key: RecordKey,

    /// Treat KEY as a collection
    #[arg(long)]
    pub collection: bool,
}

impl ResyncCommand {
    pub async fn execute(&self, ctx: &AppContext) -> Result<()> {
        let formatter = ctx.formatter();
        let kind = if self.collection {
            ObjectKind::Collection
        } else {
            ObjectKind::Item
        };

        let outcome = ctx
            .library_cache()
            .sync_item(self.library, &self.key, kind)
            .await?;

        if ctx.format.is_json() {
            formatter.print_json(&json!({
                "library": self.library,
                "key": self.key,
                "kind": kind.to_string(),
                "message": outcome.to_string(),
            }));
        } else {
            formatter.success(&outcome.to_string());
        }
        Ok(())
    }
}
