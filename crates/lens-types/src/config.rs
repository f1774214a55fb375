//! Configuration loading for index-lens.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at ~/.config/index-lens/config.toml.

use std::path::PathBuf;

use ::config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::LensError;
use crate::model::IndexModelDefinition;

/// Pairs a model namespace with the namespace holding its index types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceMapping {
    pub models: String,
    pub indexes: String,
}

impl NamespaceMapping {
    pub fn new(models: impl Into<String>, indexes: impl Into<String>) -> Self {
        Self {
            models: models.into(),
            indexes: indexes.into(),
        }
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Path to RocksDB storage directory
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Document-store connection name
    #[serde(default = "default_connection")]
    pub connection: String,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Maximum log entries kept per build record
    #[serde(default = "default_build_log_cap")]
    pub build_log_cap: usize,

    /// Conditional-update attempts before a build write gives up
    #[serde(default = "default_write_retry_limit")]
    pub write_retry_limit: u32,

    /// Deadline for one build write including retries
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,

    /// Allow lookups by ID prefix through the ID index
    #[serde(default = "default_id_prefix_lookup")]
    pub id_prefix_lookup: bool,

    /// Namespaces searched when qualifying a bare model name
    #[serde(default)]
    pub namespaces: Vec<NamespaceMapping>,

    /// Declared index models
    #[serde(default)]
    pub index_models: Vec<IndexModelDefinition>,
}

fn default_db_path() -> String {
    ProjectDirs::from("", "", "index-lens")
        .map(|p| p.data_local_dir().join("db"))
        .unwrap_or_else(|| PathBuf::from("./data"))
        .to_string_lossy()
        .to_string()
}

fn default_connection() -> String {
    "default".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_build_log_cap() -> usize {
    10
}

fn default_write_retry_limit() -> u32 {
    16
}

fn default_write_timeout_ms() -> u64 {
    2000
}

fn default_id_prefix_lookup() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            connection: default_connection(),
            log_level: default_log_level(),
            build_log_cap: default_build_log_cap(),
            write_retry_limit: default_write_retry_limit(),
            write_timeout_ms: default_write_timeout_ms(),
            id_prefix_lookup: default_id_prefix_lookup(),
            namespaces: Vec::new(),
            index_models: Vec::new(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/index-lens/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (LENS_*)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, LensError> {
        let config_dir = ProjectDirs::from("", "", "index-lens")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("db_path", default_db_path())
            .map_err(|e| LensError::Config(e.to_string()))?
            .set_default("connection", default_connection())
            .map_err(|e| LensError::Config(e.to_string()))?
            .set_default("log_level", default_log_level())
            .map_err(|e| LensError::Config(e.to_string()))?
            .set_default("build_log_cap", default_build_log_cap() as i64)
            .map_err(|e| LensError::Config(e.to_string()))?
            .set_default("write_retry_limit", default_write_retry_limit() as i64)
            .map_err(|e| LensError::Config(e.to_string()))?
            .set_default("write_timeout_ms", default_write_timeout_ms() as i64)
            .map_err(|e| LensError::Config(e.to_string()))?
            .set_default("id_prefix_lookup", default_id_prefix_lookup())
            .map_err(|e| LensError::Config(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // LENS_DB_PATH, LENS_BUILD_LOG_CAP, ...
        builder = builder.add_source(
            Environment::with_prefix("LENS")
                .prefix_separator("_")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| LensError::Config(e.to_string()))?;

        let settings: Settings = config
            .try_deserialize()
            .map_err(|e| LensError::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), LensError> {
        if self.build_log_cap == 0 {
            return Err(LensError::Config("build_log_cap must be > 0".to_string()));
        }
        if self.write_retry_limit == 0 {
            return Err(LensError::Config(
                "write_retry_limit must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Expand ~ in db_path to actual home directory
    pub fn expanded_db_path(&self) -> PathBuf {
        if let Some(rest) = self.db_path.strip_prefix("~/") {
            if let Some(home) = directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
                return home.join(rest);
            }
        }
        PathBuf::from(&self.db_path)
    }
}
