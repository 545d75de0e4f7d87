#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use stride_diagnostics::logger::MemoryConsole;
use stride_diagnostics::{DiagnosticLogger, LogRecord, LoggerConfig, Severity};
use tempfile::TempDir;

pub fn config(dir: &Path) -> LoggerConfig {
    LoggerConfig {
        min_severity: Severity::Debug,
        ..LoggerConfig::with_directory(dir)
    }
}

pub fn start(config: LoggerConfig) -> (DiagnosticLogger, Arc<MemoryConsole>) {
    let console = Arc::new(MemoryConsole::new());
    let logger = DiagnosticLogger::start_with_console(config, console.clone());
    (logger, console)
}

pub fn start_in(dir: &TempDir) -> (DiagnosticLogger, Arc<MemoryConsole>) {
    start(config(dir.path()))
}

/// Every record in every `.log` file under `dir`, in file name order.
pub fn read_records(dir: &Path) -> Vec<LogRecord> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut paths: Vec<_> = entries
        .map(|e| e.unwrap().path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "log"))
        .collect();
    paths.sort();

    paths
        .iter()
        .flat_map(|p| {
            std::fs::read_to_string(p)
                .unwrap()
                .lines()
                .map(|l| LogRecord::from_json_line(l).unwrap())
                .collect::<Vec<_>>()
        })
        .collect()
}
