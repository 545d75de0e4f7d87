pub mod serde_helpers;
mod validation;

use crate::buffer::{BatchConfig, DEFAULT_BATCH_SIZE, DEFAULT_FLUSH_INTERVAL};
use crate::domain::Severity;
use crate::storage::DEFAULT_FILE_PREFIX;
use serde::{Deserialize, Serialize};
use serde_helpers::{load_env_path, load_env_string, load_env_var};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_LOG_DIRECTORY: &str = "logs/diagnostics";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("File error: {0}")]
    FileError(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Environment error: {0}")]
    EnvError(String),
}

/// Batched file output settings. Absent means every record is written as it arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSettings {
    pub max_size: usize,
    #[serde(rename = "flush_interval_ms", with = "serde_helpers::duration_ms")]
    pub flush_interval: Duration,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_BATCH_SIZE,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
        }
    }
}

impl From<BatchSettings> for BatchConfig {
    fn from(settings: BatchSettings) -> Self {
        BatchConfig {
            max_size: settings.max_size,
            flush_interval: settings.flush_interval,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Records below this severity are dropped.
    pub min_severity: Severity,
    pub file_output_enabled: bool,
    pub log_directory: PathBuf,
    pub file_prefix: String,
    pub batch: Option<BatchSettings>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_severity: default_min_severity(),
            file_output_enabled: true,
            log_directory: PathBuf::from(DEFAULT_LOG_DIRECTORY),
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
            batch: None,
        }
    }
}

fn default_min_severity() -> Severity {
    if cfg!(debug_assertions) {
        Severity::Debug
    } else {
        Severity::Info
    }
}

impl LoggerConfig {
    /// Default configuration writing into `directory`.
    pub fn with_directory(directory: impl Into<PathBuf>) -> Self {
        Self {
            log_directory: directory.into(),
            ..Self::default()
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: LoggerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by `STRIDE_*` environment variables.
    ///
    /// Setting either `STRIDE_BATCH_SIZE` or `STRIDE_FLUSH_INTERVAL_MS` turns
    /// batch mode on; the other falls back to its default.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = LoggerConfig::default();

        load_env_var("STRIDE_LOG_LEVEL", &mut config.min_severity)?;
        load_env_var("STRIDE_FILE_OUTPUT", &mut config.file_output_enabled)?;
        load_env_path("STRIDE_LOG_DIR", &mut config.log_directory);
        load_env_string("STRIDE_LOG_PREFIX", &mut config.file_prefix);

        let batch_size_set = std::env::var("STRIDE_BATCH_SIZE").is_ok();
        let interval_set = std::env::var("STRIDE_FLUSH_INTERVAL_MS").is_ok();
        if batch_size_set || interval_set {
            let mut batch = BatchSettings::default();
            let mut interval_ms = batch.flush_interval.as_millis() as u64;
            load_env_var("STRIDE_BATCH_SIZE", &mut batch.max_size)?;
            load_env_var("STRIDE_FLUSH_INTERVAL_MS", &mut interval_ms)?;
            batch.flush_interval = Duration::from_millis(interval_ms);
            config.batch = Some(batch);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn batch_config(&self) -> Option<BatchConfig> {
        self.batch.map(BatchConfig::from)
    }
}
