use super::{ConfigError, LoggerConfig};

impl LoggerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.file_prefix.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "File prefix cannot be empty".to_string(),
            ));
        }

        if self.file_prefix.contains(['/', '\\']) {
            return Err(ConfigError::InvalidConfig(format!(
                "File prefix '{}' must not contain path separators",
                self.file_prefix
            )));
        }

        if self.log_directory.as_os_str().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "Log directory cannot be empty".to_string(),
            ));
        }

        if let Some(batch) = &self.batch {
            if batch.max_size == 0 {
                return Err(ConfigError::InvalidConfig(
                    "Batch size must be greater than 0".to_string(),
                ));
            }
            if batch.flush_interval.is_zero() {
                return Err(ConfigError::InvalidConfig(
                    "Flush interval must be greater than 0".to_string(),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::BatchSettings;
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn test_default_config_is_valid() {
        assert!(LoggerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_empty_prefix_fails() {
        let config = LoggerConfig {
            file_prefix: "  ".to_string(),
            ..LoggerConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("File prefix cannot be empty"));
    }

    #[test]
    fn test_prefix_with_separator_fails() {
        let config = LoggerConfig {
            file_prefix: "../escape".to_string(),
            ..LoggerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_directory_fails() {
        let config = LoggerConfig {
            log_directory: PathBuf::new(),
            ..LoggerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_batch_size_fails() {
        let config = LoggerConfig {
            batch: Some(BatchSettings {
                max_size: 0,
                flush_interval: Duration::from_secs(30),
            }),
            ..LoggerConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Batch size"));
    }

    #[test]
    fn test_zero_flush_interval_fails() {
        let config = LoggerConfig {
            batch: Some(BatchSettings {
                max_size: 10,
                flush_interval: Duration::ZERO,
            }),
            ..LoggerConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
