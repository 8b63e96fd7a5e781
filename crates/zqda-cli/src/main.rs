//! ZQDA CLI - Command-line interface for the Zotero group-library mirror
//!
//! Provides commands for:
//! - Incremental sync of configured group libraries
//! - Reading mirrored records, derived indexes and attachment payloads
//! - Listing the annotations filed under a tag
//! - Tag maintenance (rename, thematic cluster tags)
//! - Inspecting the configuration
//! - Serving the mirror as a JSON read API

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod context;
mod output;
mod server;

use commands::{
    config::ConfigCommand,
    read::{AnnotationsCommand, AttachmentCommand, IndexCommand, ItemCommand, ItemsCommand},
    serve::ServeCommand,
    sync::{ResyncCommand, SyncCommand},
    tags::TagsCommand,
};
use context::AppContext;
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "zqda", version, about = "Local mirror of Zotero group libraries")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Pull remote changes for one or all libraries
    Sync(SyncCommand),
    /// Refetch one item or collection
    Resync(ResyncCommand),
    /// Show one mirrored record
    Item(ItemCommand),
    /// List every mirrored record of a library
    Items(ItemsCommand),
    /// Print a derived index (tags, children, collections)
    Index(IndexCommand),
    /// Locate a mirrored attachment payload
    Attachment(AttachmentCommand),
    /// List the annotations carrying a tag
    Annotations(AnnotationsCommand),
    /// Tag maintenance
    #[command(subcommand)]
    Tags(TagsCommand),
    /// View and validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Serve the mirror as a JSON read API
    Serve(ServeCommand),
}

/// `RUST_LOG` wins, then `-v`/`-q`, then `logging.level` from the config
fn env_filter(verbose: u8, quiet: bool, config_level: &str) -> EnvFilter {
    let fallback = match (verbose, quiet) {
        (0, true) => "error",
        (0, false) => config_level,
        (1, _) => "debug",
        _ => "trace",
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };
    let ctx = AppContext::load(cli.config.clone(), format);

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(cli.verbose, cli.quiet, &ctx.config.logging.level))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
    ctx.report_load_error();

    let result = match &cli.command {
        Commands::Sync(cmd) => cmd.execute(&ctx).await,
        Commands::Resync(cmd) => cmd.execute(&ctx).await,
        Commands::Item(cmd) => cmd.execute(&ctx).await,
        Commands::Items(cmd) => cmd.execute(&ctx).await,
        Commands::Index(cmd) => cmd.execute(&ctx).await,
        Commands::Attachment(cmd) => cmd.execute(&ctx).await,
        Commands::Annotations(cmd) => cmd.execute(&ctx).await,
        Commands::Tags(cmd) => cmd.execute(&ctx).await,
        Commands::Config(cmd) => cmd.execute(&ctx).await,
        Commands::Serve(cmd) => cmd.execute(&ctx).await,
    };

    if let Err(e) = result {
        ctx.formatter().error(&format!("{e:#}"));
        std::process::exit(1);
    }
    Ok(())
}
