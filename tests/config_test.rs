use serial_test::serial;
use std::{env, path::PathBuf, time::Duration};
use stride_diagnostics::app::config::{BatchSettings, ConfigError, DEFAULT_LOG_DIRECTORY};
use stride_diagnostics::{LoggerConfig, Severity};
use tempfile::TempDir;

fn clean_all_env_vars() {
    let env_vars = [
        "STRIDE_LOG_LEVEL",
        "STRIDE_LOG_DIR",
        "STRIDE_FILE_OUTPUT",
        "STRIDE_BATCH_SIZE",
        "STRIDE_FLUSH_INTERVAL_MS",
        "STRIDE_LOG_PREFIX",
    ];

    unsafe {
        for var in &env_vars {
            env::remove_var(var);
        }
    }
}

fn set(name: &str, value: &str) {
    unsafe {
        env::set_var(name, value);
    }
}

#[test]
#[serial]
fn test_from_env_without_variables_uses_defaults() {
    clean_all_env_vars();

    let config = LoggerConfig::from_env().unwrap();
    assert_eq!(config, LoggerConfig::default());
    assert_eq!(config.log_directory, PathBuf::from(DEFAULT_LOG_DIRECTORY));
    assert!(config.file_output_enabled);
    assert!(config.batch.is_none());
}

#[test]
#[serial]
fn test_from_env_overrides() {
    clean_all_env_vars();
    set("STRIDE_LOG_LEVEL", "warning");
    set("STRIDE_LOG_DIR", "/var/log/stride");
    set("STRIDE_FILE_OUTPUT", "false");
    set("STRIDE_LOG_PREFIX", "walks");

    let config = LoggerConfig::from_env().unwrap();
    clean_all_env_vars();

    assert_eq!(config.min_severity, Severity::Warning);
    assert_eq!(config.log_directory, PathBuf::from("/var/log/stride"));
    assert!(!config.file_output_enabled);
    assert_eq!(config.file_prefix, "walks");
}

#[test]
#[serial]
fn test_from_env_batch_size_alone_enables_batching() {
    clean_all_env_vars();
    set("STRIDE_BATCH_SIZE", "20");

    let config = LoggerConfig::from_env().unwrap();
    clean_all_env_vars();

    assert_eq!(
        config.batch,
        Some(BatchSettings {
            max_size: 20,
            flush_interval: Duration::from_secs(30),
        })
    );
}

#[test]
#[serial]
fn test_from_env_rejects_bad_values() {
    clean_all_env_vars();
    set("STRIDE_LOG_LEVEL", "loud");
    assert!(matches!(
        LoggerConfig::from_env(),
        Err(ConfigError::EnvError(_))
    ));

    clean_all_env_vars();
    set("STRIDE_FLUSH_INTERVAL_MS", "0");
    assert!(matches!(
        LoggerConfig::from_env(),
        Err(ConfigError::InvalidConfig(_))
    ));

    clean_all_env_vars();
    set("STRIDE_LOG_PREFIX", "../escape");
    assert!(matches!(
        LoggerConfig::from_env(),
        Err(ConfigError::InvalidConfig(_))
    ));

    clean_all_env_vars();
}

#[test]
#[serial]
fn test_from_env_trims_values_and_names_bad_variable() {
    clean_all_env_vars();
    set("STRIDE_BATCH_SIZE", " 25 ");
    let config = LoggerConfig::from_env().unwrap();
    assert_eq!(config.batch.map(|b| b.max_size), Some(25));

    clean_all_env_vars();
    set("STRIDE_BATCH_SIZE", "many");
    match LoggerConfig::from_env() {
        Err(ConfigError::EnvError(message)) => assert!(message.contains("STRIDE_BATCH_SIZE")),
        other => panic!("expected env error, got {other:?}"),
    }

    clean_all_env_vars();
}

#[test]
fn test_from_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("diagnostics.toml");
    std::fs::write(
        &path,
        r#"
        min_severity = "error"
        log_directory = "/tmp/stride"

        [batch]
        max_size = 10
        flush_interval_ms = 250
        "#,
    )
    .unwrap();

    let config = LoggerConfig::from_file(&path).unwrap();
    assert_eq!(config.min_severity, Severity::Error);
    assert_eq!(config.batch.unwrap().flush_interval, Duration::from_millis(250));
}

#[test]
fn test_from_missing_file() {
    let result = LoggerConfig::from_file("/nonexistent/stride/diagnostics.toml");
    assert!(matches!(result, Err(ConfigError::FileError(_))));
}
