//! Read commands over the local mirror
//!
//! None of these contact the remote API.

use std::collections::BTreeMap;
use std::fmt::Display;

use anyhow::Result;
use clap::{Args, ValueEnum};
use serde_json::json;

use zqda_core::domain::{LibraryId, RecordKey};

use crate::context::AppContext;
use crate::output::{annotation_lines, record_details, record_line, OutputFormatter};

#[derive(Debug, Args)]
pub struct ItemCommand {
    pub library: LibraryId,
    pub key: RecordKey,
}

impl ItemCommand {
    pub async fn execute(&self, ctx: &AppContext) -> Result<()> {
        let formatter = ctx.formatter();
        let record = ctx.library_cache().get_item(self.library, &self.key).await?;

        if ctx.format.is_json() {
            formatter.print_json(&serde_json::to_value(&record)?);
        } else {
            for line in record_details(&record) {
                formatter.info(&line);
            }
        }
        Ok(())
    }
}

#[derive(Debug, Args)]
pub struct ItemsCommand {
    pub library: LibraryId,
}

impl ItemsCommand {
    pub async fn execute(&self, ctx: &AppContext) -> Result<()> {
        let formatter = ctx.formatter();
        let records = ctx.library_cache().get_items(self.library).await?;

        if ctx.format.is_json() {
            formatter.print_json(&serde_json::to_value(&records)?);
        } else if records.is_empty() {
            formatter.info(&format!(
                "Library {} is empty; run 'zqda sync {}' first",
                self.library, self.library
            ));
        } else {
            for record in &records {
                formatter.info(&record_line(record));
            }
            formatter.success(&format!("{} records", records.len()));
        }
        Ok(())
    }
}

/// Derived index to print
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum IndexKind {
    Tags,
    Children,
    Collections,
}

#[derive(Debug, Args)]
pub struct IndexCommand {
    #[arg(value_enum)]
    pub kind: IndexKind,
    pub library: LibraryId,
}

impl IndexCommand {
    pub async fn execute(&self, ctx: &AppContext) -> Result<()> {
        let formatter = ctx.formatter();
        let cache = ctx.library_cache();

        match self.kind {
            IndexKind::Tags => {
                let index = cache.get_tags(self.library).await?;
                print_index(formatter.as_ref(), ctx.format.is_json(), &index)
            }
            IndexKind::Children => {
                let index = cache.get_children(self.library).await?;
                print_index(formatter.as_ref(), ctx.format.is_json(), &index)
            }
            IndexKind::Collections => {
                let index = cache.get_collections(self.library).await?;
                print_index(formatter.as_ref(), ctx.format.is_json(), &index)
            }
        }
    }
}

fn print_index<K>(
    formatter: &dyn OutputFormatter,
    json: bool,
    index: &BTreeMap<K, Vec<RecordKey>>,
) -> Result<()>
where
    K: Display + serde::Serialize + Ord,
{
    if json {
        formatter.print_json(&serde_json::to_value(index)?);
        return Ok(());
    }

    for (bucket, keys) in index {
        let keys: Vec<_> = keys.iter().map(RecordKey::as_str).collect();
        formatter.info(&format!("{bucket}: {}", keys.join(" ")));
    }
    Ok(())
}

#[derive(Debug, Args)]
pub struct AttachmentCommand {
    pub library: LibraryId,
    pub key: RecordKey,
}

impl AttachmentCommand {
    pub async fn execute(&self, ctx: &AppContext) -> Result<()> {
        let formatter = ctx.formatter();
        let file = ctx
            .library_cache()
            .attachment(self.library, &self.key)
            .await?;

        if ctx.format.is_json() {
            formatter.print_json(&json!({
                "path": file.path.display().to_string(),
                "content_type": file.content_type,
            }));
        } else {
            formatter.success(&file.path.display().to_string());
            formatter.info(&format!("Content type: {}", file.content_type));
        }
        Ok(())
    }
}

#[derive(Debug, Args)]
pub struct AnnotationsCommand {
    pub library: LibraryId,
    pub tag: String,
}

impl AnnotationsCommand {
    pub async fn execute(&self, ctx: &AppContext) -> Result<()> {
        let formatter = ctx.formatter();
        let entries = ctx
            .library_cache()
            .annotations_for_tag(self.library, &self.tag)
            .await?;

        if ctx.format.is_json() {
            formatter.print_json(&serde_json::to_value(&entries)?);
        } else if entries.is_empty() {
            formatter.info(&format!("No annotations tagged '{}'", self.tag));
        } else {
            for (i, entry) in entries.iter().enumerate() {
                for line in annotation_lines(i + 1, entry) {
                    formatter.info(&line);
                }
            }
            formatter.success(&format!("{} annotations", entries.len()));
        }
        Ok(())
    }
}
