//! Configuration loading and root folder resolution
//!
//! Bootstrap configuration comes from a TOML file. Runtime overrides come from
//! the command line and `PV_*` environment variables, resolved by the binary.
//!
//! # Settings Sources Priority
//!
//! 1. Command-line arguments
//! 2. Environment variables (`PV_ROOT_FOLDER`, `PV_CONCURRENCY`, ...)
//! 3. TOML configuration file
//! 4. Built-in defaults (code constants)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application directory name used under the OS config/data folders
pub const APP_DIR_NAME: &str = "provider-validator";

/// Environment variable naming the root folder
pub const ROOT_FOLDER_ENV: &str = "PV_ROOT_FOLDER";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Root folder holding the database and batch outputs
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Path to SQLite database file (relative paths resolve against the root folder)
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Pipeline tuning
    #[serde(default)]
    pub pipeline: PipelineToml,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Log line format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// `[pipeline]` section. Every key is optional; unset keys fall back to
/// environment variables or built-in defaults in the binary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineToml {
    pub concurrency: Option<usize>,
    pub source_timeout_secs: Option<u64>,
    pub sink_timeout_secs: Option<u64>,
    pub default_region: Option<String>,
    pub verification_base_url: Option<String>,
    /// "placeholder" or "weighted"
    pub confidence_policy: Option<String>,
    pub qa_weight: Option<f64>,
    pub web_preview_chars: Option<usize>,
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Load TOML configuration from `path`
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))
}

/// Load TOML configuration if the file exists, defaults otherwise
pub fn load_toml_config_or_default(path: Option<&Path>) -> Result<TomlConfig> {
    match path {
        Some(path) => load_toml_config(path),
        None => match default_config_path() {
            Some(path) if path.exists() => load_toml_config(&path),
            _ => Ok(TomlConfig::default()),
        },
    }
}

/// Default configuration file path for the platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("config.toml"))
}

/// Root folder resolution:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable (`PV_ROOT_FOLDER`)
/// 3. TOML config file
/// 4. OS-dependent default (fallback)
pub fn resolve_root_folder(cli_arg: Option<&Path>, toml_config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml_config.root_folder {
        return path.clone();
    }

    get_default_root_folder()
}

/// Resolve the database file path against the root folder
pub fn resolve_database_path(root_folder: &Path, toml_config: &TomlConfig) -> PathBuf {
    match &toml_config.database_path {
        Some(path) if path.is_absolute() => path.clone(),
        Some(path) => root_folder.join(path),
        None => root_folder.join("providers.db"),
    }
}

/// OS-dependent default root folder path
fn get_default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("./provider_validator_data"))
}
