//! Tag maintenance commands
//!
//! These write to the remote library (the API key needs write access) and
//! then sync, so the local mirror reflects the edit.

use anyhow::Result;
use clap::Subcommand;
use serde_json::json;

use zqda_core::domain::LibraryId;
use zqda_sync::TagEdit;

use crate::context::AppContext;
use crate::output::OutputFormatter;

#[derive(Debug, Subcommand)]
pub enum TagsCommand {
    /// Replace FROM with TO inside every tag that contains it
    Rename {
        library: LibraryId,
        from: String,
        to: String,
    },
    /// List annotation tags not yet grouped under a cluster tag
    Candidates { library: LibraryId },
    /// Add the cluster tag TARGET to every item tagged with one of TAGS
    Cluster {
        library: LibraryId,
        target: String,
        #[arg(required = true)]
        tags: Vec<String>,
    },
}

impl TagsCommand {
    pub async fn execute(&self, ctx: &AppContext) -> Result<()> {
        let formatter = ctx.formatter();
        let cache = ctx.library_cache();

        match self {
            TagsCommand::Rename { library, from, to } => {
                let edit = cache.rename_tag(*library, from, to).await?;
                report_edit(formatter.as_ref(), ctx.format.is_json(), &edit)
            }
            TagsCommand::Candidates { library } => {
                let mut candidates = cache.cluster_candidates(*library).await?;
                if ctx.format.is_json() {
                    formatter.print_json(&json!(candidates));
                } else {
                    candidates.sort();
                    for tag in &candidates {
                        formatter.info(tag);
                    }
                }
                Ok(())
            }
            TagsCommand::Cluster {
                library,
                target,
                tags,
            } => {
                let edit = cache.apply_cluster_tag(*library, tags, target).await?;
                report_edit(formatter.as_ref(), ctx.format.is_json(), &edit)
            }
        }
    }
}

fn report_edit(formatter: &dyn OutputFormatter, json: bool, edit: &TagEdit) -> Result<()> {
    if json {
        formatter.print_json(&serde_json::to_value(edit)?);
        return Ok(());
    }

    formatter.success(&format!("Updated tags on {} items", edit.updated));
    if let Some(sync) = &edit.sync {
        formatter.info(&sync.to_string());
    }
    Ok(())
}
