//! Batch configuration
//!
//! Each setting resolves independently, highest priority first:
//! 1. Command-line argument
//! 2. Environment variable (`PV_*`)
//! 3. TOML config file (`[pipeline]` table)
//! 4. Built-in default
//!
//! The winning source is logged at `info` so a run's effective settings can
//! be reconstructed from its log.

use crate::extractors::document::DEFAULT_PREVIEW_CHARS;
use crate::extractors::{Extractors, DEFAULT_SOURCE_TIMEOUT};
use crate::stages::{
    ConfidencePolicy, ValidationStage, WebsiteEnrichment, DEFAULT_VERIFICATION_BASE_URL,
};
use crate::workflow::{RecordPipeline, DEFAULT_CONCURRENCY, DEFAULT_SINK_TIMEOUT};
use pv_common::config::{resolve_database_path, resolve_root_folder, TomlConfig};
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub const CONCURRENCY_ENV: &str = "PV_CONCURRENCY";
pub const VERIFICATION_BASE_URL_ENV: &str = "PV_VERIFICATION_BASE_URL";
pub const DEFAULT_REGION_ENV: &str = "PV_DEFAULT_REGION";

const DEFAULT_REGION: &str = "US";

/// Settings given on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub root_folder: Option<PathBuf>,
    pub database_path: Option<PathBuf>,
    pub concurrency: Option<usize>,
    pub verification_base_url: Option<String>,
    pub default_region: Option<String>,
}

/// Effective settings for one batch run
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub root_folder: PathBuf,
    pub database_path: PathBuf,
    pub concurrency: usize,
    pub source_timeout: Duration,
    pub sink_timeout: Duration,
    pub default_region: String,
    pub verification_base_url: String,
    pub confidence_policy: ConfidencePolicy,
    pub preview_chars: usize,
}

impl BatchConfig {
    pub fn resolve(cli: &CliOverrides, toml: &TomlConfig) -> Self {
        let root_folder = resolve_root_folder(cli.root_folder.as_deref(), toml);
        info!("Root folder: {:?}", root_folder);

        let database_path = match &cli.database_path {
            Some(path) => {
                info!("Database: {:?} (from command line)", path);
                path.clone()
            }
            None => {
                let path = resolve_database_path(&root_folder, toml);
                info!("Database: {:?} (resolved)", path);
                path
            }
        };

        let pipeline = &toml.pipeline;

        let concurrency = resolve_setting(
            "concurrency",
            cli.concurrency,
            CONCURRENCY_ENV,
            pipeline.concurrency,
            DEFAULT_CONCURRENCY,
        );
        let default_region = resolve_setting(
            "default_region",
            cli.default_region.clone(),
            DEFAULT_REGION_ENV,
            pipeline.default_region.clone(),
            DEFAULT_REGION.to_string(),
        );
        let verification_base_url = resolve_setting(
            "verification_base_url",
            cli.verification_base_url.clone(),
            VERIFICATION_BASE_URL_ENV,
            pipeline.verification_base_url.clone(),
            DEFAULT_VERIFICATION_BASE_URL.to_string(),
        );

        let source_timeout = pipeline
            .source_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_SOURCE_TIMEOUT);
        let sink_timeout = pipeline
            .sink_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_SINK_TIMEOUT);
        let confidence_policy = ConfidencePolicy::from_config(
            pipeline.confidence_policy.as_deref(),
            pipeline.qa_weight,
        );
        info!(
            ?source_timeout,
            ?sink_timeout,
            ?confidence_policy,
            "Pipeline settings"
        );

        Self {
            root_folder,
            database_path,
            concurrency,
            source_timeout,
            sink_timeout,
            default_region,
            verification_base_url,
            confidence_policy,
            preview_chars: pipeline.web_preview_chars.unwrap_or(DEFAULT_PREVIEW_CHARS),
        }
    }

    /// Record pipeline with these settings
    pub fn build_pipeline(&self, extractors: Extractors) -> RecordPipeline {
        let validation = ValidationStage::new(extractors.clone())
            .with_region(self.default_region.clone())
            .with_source_timeout(self.source_timeout)
            .with_preview_chars(self.preview_chars);
        RecordPipeline::new(extractors)
            .with_validation(validation)
            .with_enrichment(Arc::new(WebsiteEnrichment), self.source_timeout)
            .with_confidence_policy(self.confidence_policy)
            .with_verification_base_url(self.verification_base_url.clone())
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }
}

/// Pick the highest-priority value for one setting and log where it came from
fn resolve_setting<T>(name: &str, cli: Option<T>, env_var: &str, toml: Option<T>, default: T) -> T
where
    T: FromStr + Debug,
{
    if let Some(value) = cli {
        info!("{}: {:?} (from command line)", name, value);
        return value;
    }

    if let Some(raw) = std::env::var(env_var).ok().filter(|v| !v.trim().is_empty()) {
        match raw.trim().parse::<T>() {
            Ok(value) => {
                info!("{}: {:?} (from environment variable {})", name, value, env_var);
                return value;
            }
            Err(_) => warn!("{}: ignoring unparseable {}={:?}", name, env_var, raw),
        }
    }

    if let Some(value) = toml {
        info!("{}: {:?} (from TOML config)", name, value);
        return value;
    }

    info!("{}: {:?} (default)", name, default);
    default
}

#[cfg(test)]
mod tests {
    use super::*;
    use pv_common::config::{PipelineToml, ROOT_FOLDER_ENV};
    use serial_test::serial;

    fn clear_env() {
        for var in [
            CONCURRENCY_ENV,
            VERIFICATION_BASE_URL_ENV,
            DEFAULT_REGION_ENV,
            ROOT_FOLDER_ENV,
        ] {
            std::env::remove_var(var);
        }
    }

    fn toml_with_concurrency(concurrency: usize) -> TomlConfig {
        TomlConfig {
            root_folder: Some(PathBuf::from("/tmp/pv-root")),
            pipeline: PipelineToml {
                concurrency: Some(concurrency),
                confidence_policy: Some("weighted".to_string()),
                qa_weight: Some(0.5),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        let config = BatchConfig::resolve(&CliOverrides::default(), &TomlConfig::default());

        assert_eq!(config.concurrency, DEFAULT_CONCURRENCY);
        assert_eq!(config.default_region, "US");
        assert_eq!(config.verification_base_url, DEFAULT_VERIFICATION_BASE_URL);
        assert_eq!(config.confidence_policy, ConfidencePolicy::Placeholder);
        assert_eq!(config.source_timeout, DEFAULT_SOURCE_TIMEOUT);
        assert_eq!(config.preview_chars, DEFAULT_PREVIEW_CHARS);
    }

    #[test]
    #[serial]
    fn test_priority_cli_env_toml() {
        clear_env();
        let toml = toml_with_concurrency(3);

        let config = BatchConfig::resolve(&CliOverrides::default(), &toml);
        assert_eq!(config.concurrency, 3);
        assert_eq!(config.confidence_policy, ConfidencePolicy::Weighted { qa_weight: 0.5 });
        assert_eq!(config.database_path, PathBuf::from("/tmp/pv-root/providers.db"));

        std::env::set_var(CONCURRENCY_ENV, "5");
        let config = BatchConfig::resolve(&CliOverrides::default(), &toml);
        assert_eq!(config.concurrency, 5);

        let cli = CliOverrides {
            concurrency: Some(7),
            database_path: Some(PathBuf::from("/tmp/other.db")),
            ..Default::default()
        };
        let config = BatchConfig::resolve(&cli, &toml);
        assert_eq!(config.concurrency, 7);
        assert_eq!(config.database_path(), Path::new("/tmp/other.db"));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_unparseable_env_falls_through() {
        clear_env();
        std::env::set_var(CONCURRENCY_ENV, "many");
        let config = BatchConfig::resolve(&CliOverrides::default(), &toml_with_concurrency(2));
        assert_eq!(config.concurrency, 2);
        clear_env();
    }
}
