//! Configuration module for ZQDA.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::domain::newtypes::LibraryId;

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for ZQDA.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root for store files, the version ledger and attachment payloads.
    pub data_dir: PathBuf,
    pub api: ApiConfig,
    /// Mirrored group libraries, keyed by numeric library id.
    pub libraries: BTreeMap<LibraryId, LibraryConfig>,
    pub logging: LoggingConfig,
    pub server: ServerConfig,
}

/// Remote API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    /// Objects requested per page (the remote caps this at 100).
    pub page_size: u32,
    /// Retries on 429/503 before giving up.
    pub max_retries: u32,
}

/// Per-library settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// API key with read access (and write access for tag tools).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Download attachment payloads during sync.
    pub download_attachments: bool,
    /// Prefix marking cluster (thematic) tags.
    pub cluster_tag_prefix: String,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

/// JSON read API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address, e.g. `127.0.0.1:8080`.
    pub bind: String,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/zqda/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("zqda")
            .join("config.yaml")
    }

    /// Settings for one library, if it is configured.
    pub fn library(&self, id: LibraryId) -> Option<&LibraryConfig> {
        self.libraries.get(&id)
    }

    /// Configured library ids in ascending order.
    pub fn library_ids(&self) -> Vec<LibraryId> {
        self.libraries.keys().copied().collect()
    }

    /// Version ledger file.
    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join("versions.json")
    }

    /// Root of the per-item attachment directories.
    pub fn attachments_root(&self) -> &Path {
        &self.data_dir
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("~/.local/share"))
                .join("zqda"),
            api: ApiConfig::default(),
            libraries: BTreeMap::new(),
            logging: LoggingConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.zotero.org".to_string(),
            page_size: 100,
            max_retries: 3,
        }
    }
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            download_attachments: true,
            cluster_tag_prefix: "@".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"api.page_size"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Upper bound the remote API accepts for `limit`.
const MAX_PAGE_SIZE: u32 = 100;

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- data_dir ---
        if self.data_dir.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "data_dir".into(),
                message: "must not be empty".into(),
            });
        }

        // --- api ---
        if !(self.api.base_url.starts_with("http://") || self.api.base_url.starts_with("https://"))
        {
            errors.push(ValidationError {
                field: "api.base_url".into(),
                message: format!("must be an http(s) URL, got '{}'", self.api.base_url),
            });
        }
        if self.api.page_size == 0 || self.api.page_size > MAX_PAGE_SIZE {
            errors.push(ValidationError {
                field: "api.page_size".into(),
                message: format!("must be between 1 and {MAX_PAGE_SIZE}"),
            });
        }

        // --- libraries ---
        for (id, library) in &self.libraries {
            if library.cluster_tag_prefix.is_empty() {
                errors.push(ValidationError {
                    field: format!("libraries.{id}.cluster_tag_prefix"),
                    message: "must not be empty".into(),
                });
            }
            if library.api_key.as_deref().is_some_and(str::is_empty) {
                errors.push(ValidationError {
                    field: format!("libraries.{id}.api_key"),
                    message: "must not be empty when set".into(),
                });
            }
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "must be one of {VALID_LOG_LEVELS:?}, got '{}'",
                    self.logging.level
                ),
            });
        }

        // --- server ---
        if self.server.bind.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError {
                field: "server.bind".into(),
                message: format!("not a valid socket address: '{}'", self.server.bind),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for [`Config`], mostly used by tests and embedders.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Start from [`Config::default`].
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.data_dir = dir.into();
        self
    }

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api.base_url = url.into();
        self
    }

    pub fn api_page_size(mut self, size: u32) -> Self {
        self.config.api.page_size = size;
        self
    }

    /// Add a library with default settings.
    pub fn library(self, id: LibraryId) -> Self {
        self.library_with(id, LibraryConfig::default())
    }

    /// Add a library with explicit settings.
    pub fn library_with(mut self, id: LibraryId, library: LibraryConfig) -> Self {
        self.config.libraries.insert(id, library);
        self
    }

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
