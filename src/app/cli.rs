use super::config::LoggerConfig;
use crate::analysis::{
    AnalysisOutcome, Coordinate, LocationObservation, MemoryObservation, MemoryTier,
    SyncObservation, analyze_location, analyze_memory, analyze_sync_health,
    location::SIMULATED_BATTERY_LEVEL,
};
use crate::domain::{Context, Severity};
use crate::logger::DiagnosticLogger;
use crate::session;
use anyhow::Context as _;
use chrono::{DateTime, TimeDelta, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

const MB: u64 = 1024 * 1024;

#[derive(Parser, Debug)]
#[command(name = "stride-diag", author, version, about, long_about = None)]
pub struct Cli {
    /// TOML configuration file; environment variables are used when absent
    #[arg(long, env = "STRIDE_CONFIG_FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Overrides the log directory from the configuration
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,

    /// Enables the engine's own debug tracing on stderr
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List log files in the log directory, oldest first
    Files,
    /// Delete log files last modified more than N days ago
    Clean {
        #[arg(long, default_value_t = 7)]
        older_than_days: u64,
    },
    /// Close the current log file and start a new one
    Rotate,
    /// Write one record through the logger
    Emit {
        message: String,
        #[arg(long, default_value = "info")]
        severity: Severity,
        #[arg(long, default_value = "cli")]
        operation: String,
        /// Context entry as key=value; repeatable
        #[arg(long = "context", value_parser = parse_key_value)]
        context: Vec<(String, String)>,
    },
    /// Classify a location fix
    CheckLocation {
        #[arg(long, allow_negative_numbers = true, default_value_t = 0.0)]
        latitude: f64,
        #[arg(long, allow_negative_numbers = true, default_value_t = 0.0)]
        longitude: f64,
        /// Horizontal accuracy in meters
        #[arg(long)]
        accuracy: f64,
        /// Battery fraction in [0, 1]; -1 when unavailable
        #[arg(long, allow_negative_numbers = true, default_value_t = SIMULATED_BATTERY_LEVEL)]
        battery: f64,
        #[arg(long, default_value_t = 0)]
        duration_secs: u64,
    },
    /// Classify remote sync health
    CheckSync {
        #[arg(long)]
        offline: bool,
        #[arg(long, default_value_t = 0)]
        pending: u32,
        /// Minutes since the last successful sync; omit if it never happened
        #[arg(long)]
        last_sync_minutes: Option<i64>,
    },
    /// Classify memory pressure
    CheckMemory {
        #[arg(long)]
        resident_mb: u64,
        #[arg(long, default_value_t = 0)]
        resources: usize,
        #[arg(long, default_value_t = 0)]
        cache_mb: u64,
    },
    /// Validate a session state transition
    CheckTransition {
        from: String,
        to: String,
        #[arg(long, default_value = "cli")]
        trigger: String,
    },
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    if key.is_empty() {
        return Err(format!("empty key in '{raw}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

impl Cli {
    pub fn tracing_level(&self) -> tracing::Level {
        if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::WARN
        }
    }

    pub fn logger_config(&self) -> anyhow::Result<LoggerConfig> {
        let mut config = match &self.config {
            Some(path) => LoggerConfig::from_file(path)
                .with_context(|| format!("failed to load {}", path.display()))?,
            None => LoggerConfig::from_env().context("invalid STRIDE_* environment")?,
        };
        if let Some(dir) = &self.log_dir {
            config.log_directory.clone_from(dir);
        }
        Ok(config)
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let logger = DiagnosticLogger::start(cli.logger_config()?);
    let result = execute(&logger, cli.command).await;
    logger.shutdown().await;
    result
}

async fn execute(logger: &DiagnosticLogger, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Files => {
            let directory = logger.get_log_directory_path().display().to_string();
            for name in logger.get_log_files().await? {
                println!("{directory}/{name}");
            }
        }
        Command::Clean { older_than_days } => {
            let removed = logger.clear_old_logs_and_wait(older_than_days).await?;
            println!("removed {removed} file(s)");
        }
        Command::Rotate => {
            let path = logger.rotate_log_files_and_wait().await?;
            println!("{}", path.display());
        }
        Command::Emit {
            message,
            severity,
            operation,
            context,
        } => {
            logger.log(
                severity,
                operation,
                message,
                context.into_iter().collect::<Context>(),
                None,
            );
            logger.flush().await?;
        }
        Command::CheckLocation {
            latitude,
            longitude,
            accuracy,
            battery,
            duration_secs,
        } => {
            let outcome = analyze_location(&LocationObservation {
                position: Coordinate {
                    latitude,
                    longitude,
                },
                horizontal_accuracy: accuracy,
                battery_level: battery,
                tracking_duration: Duration::from_secs(duration_secs),
            });
            report(logger, "location.quality", &outcome)?;
        }
        Command::CheckSync {
            offline,
            pending,
            last_sync_minutes,
        } => {
            let outcome = analyze_sync_health(&SyncObservation {
                is_online: !offline,
                pending_writes: pending,
                last_successful_sync: last_sync_from_minutes(last_sync_minutes)?,
            });
            report(logger, "sync.health", &outcome)?;
        }
        Command::CheckMemory {
            resident_mb,
            resources,
            cache_mb,
        } => {
            let resident_bytes = resident_mb.saturating_mul(MB);
            let outcome = analyze_memory(&MemoryObservation {
                resident_bytes,
                loaded_resources: resources,
                cache_bytes: cache_mb.saturating_mul(MB),
            });
            print_json(&MemoryReport {
                tier: MemoryTier::classify(resident_bytes),
                outcome: &outcome,
            })?;
            logger.log_anomaly("memory.pressure", &outcome);
        }
        Command::CheckTransition { from, to, trigger } => {
            let validation = session::validate(&from, &to, &trigger, &Context::new());
            print_json(&validation)?;
            logger.log_state_transition(&validation.result);
        }
    }
    Ok(())
}

fn last_sync_from_minutes(minutes: Option<i64>) -> anyhow::Result<Option<DateTime<Utc>>> {
    minutes
        .map(|m| {
            TimeDelta::try_minutes(m)
                .and_then(|age| Utc::now().checked_sub_signed(age))
                .ok_or_else(|| anyhow::anyhow!("--last-sync-minutes {m} is out of range"))
        })
        .transpose()
}

#[derive(Serialize)]
struct MemoryReport<'a> {
    tier: MemoryTier,
    #[serde(flatten)]
    outcome: &'a AnalysisOutcome,
}

fn report(logger: &DiagnosticLogger, operation: &str, outcome: &AnalysisOutcome) -> anyhow::Result<()> {
    print_json(outcome)?;
    logger.log_anomaly(operation, outcome);
    Ok(())
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_emit_with_context() {
        let cli = Cli::try_parse_from([
            "stride-diag",
            "emit",
            "walk saved",
            "--severity",
            "warning",
            "--context",
            "walk_id=w-1",
            "--context",
            "steps=1200",
        ])
        .unwrap();

        match cli.command {
            Command::Emit {
                message,
                severity,
                context,
                ..
            } => {
                assert_eq!(message, "walk saved");
                assert_eq!(severity, Severity::Warning);
                assert_eq!(context.len(), 2);
                assert_eq!(context[1], ("steps".to_string(), "1200".to_string()));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_malformed_context() {
        let result = Cli::try_parse_from(["stride-diag", "emit", "x", "--context", "novalue"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_negative_battery() {
        let cli = Cli::try_parse_from([
            "stride-diag",
            "check-location",
            "--accuracy",
            "12.5",
            "--battery",
            "-1",
        ])
        .unwrap();
        match cli.command {
            Command::CheckLocation {
                battery, accuracy, ..
            } => {
                assert_eq!(battery, -1.0);
                assert_eq!(accuracy, 12.5);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_last_sync_minutes_out_of_range() {
        assert!(last_sync_from_minutes(Some(i64::MAX)).is_err());
        assert!(last_sync_from_minutes(Some(i64::MIN)).is_err());
        assert!(last_sync_from_minutes(None).unwrap().is_none());

        let last = last_sync_from_minutes(Some(30)).unwrap().unwrap();
        let age = Utc::now() - last;
        assert!(age >= TimeDelta::minutes(30) && age < TimeDelta::minutes(31));
    }

    #[test]
    fn test_log_dir_override() {
        let cli = Cli::try_parse_from(["stride-diag", "files", "--log-dir", "/tmp/stride-logs"])
            .unwrap();
        assert_eq!(cli.log_dir, Some(PathBuf::from("/tmp/stride-logs")));
        assert_eq!(cli.tracing_level(), tracing::Level::WARN);
    }
}
