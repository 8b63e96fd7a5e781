//! Shared command context: loaded configuration and adapter wiring

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, warn};

use zqda_cache::{JsonVersionLedger, SqliteRecordStore};
use zqda_core::config::Config;
use zqda_sync::LibraryCache;
use zqda_zotero::ZoteroRemoteLibrary;

use crate::output::{get_formatter, OutputFormat, OutputFormatter};

/// What every command needs
pub struct AppContext {
    pub config_path: PathBuf,
    pub config: Config,
    pub format: OutputFormat,
    /// Why an existing config file was not used
    pub load_error: Option<String>,
}

impl AppContext {
    /// Load the configuration from `path` (or the default location)
    ///
    /// A missing or unreadable file falls back to defaults so read-only
    /// commands keep working; `config validate` reports the problem.
    pub fn load(path: Option<PathBuf>, format: OutputFormat) -> Self {
        let config_path = path.unwrap_or_else(Config::default_path);
        let (config, load_error) = match Config::load(&config_path) {
            Ok(config) => (config, None),
            Err(e) if config_path.exists() => (Config::default(), Some(format!("{e:#}"))),
            Err(_) => (Config::default(), None),
        };

        Self {
            config_path,
            config,
            format,
            load_error,
        }
    }

    /// Log a deferred load failure once tracing is up
    pub fn report_load_error(&self) {
        if let Some(error) = &self.load_error {
            warn!(%error, path = %self.config_path.display(), "Using default configuration");
        }
    }

    pub fn formatter(&self) -> Box<dyn OutputFormatter> {
        get_formatter(self.format)
    }

    /// Wire the Zotero client, the SQLite store and the ledger
    pub fn library_cache(&self) -> LibraryCache {
        debug!(data_dir = %self.config.data_dir.display(), "Opening library cache");

        let remote = Arc::new(ZoteroRemoteLibrary::from_config(&self.config));
        let store = Arc::new(SqliteRecordStore::new(self.config.data_dir.clone()));
        let ledger = Arc::new(JsonVersionLedger::new(self.config.ledger_path()));

        LibraryCache::new(self.config.clone(), remote, store, ledger)
    }
}
