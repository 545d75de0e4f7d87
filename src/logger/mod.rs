//! Logger Core.
//!
//! [`DiagnosticLogger`] is a cheap, cloneable handle onto a single worker
//! task. Every entry point enqueues a command and returns; the worker applies
//! commands strictly in arrival order, so records and configuration changes
//! never interleave. Nothing here returns an error to a caller of `log`.

pub mod console;
mod worker;

pub use console::{ConsoleSink, MemoryConsole, StdoutConsole, format_console_line};

use crate::analysis::AnalysisOutcome;
use crate::app::config::LoggerConfig;
use crate::buffer::BatchConfig;
use crate::domain::{
    Attachment, BugReproduction, Context, DiagnosticsError, ErrorChain, LogRecord, Severity,
    SourceLocation, StateTransitionResult,
};
use parking_lot::Mutex;
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use worker::{Command, Worker};

struct LoggerHandle {
    tx: mpsc::UnboundedSender<Command>,
    cancel: CancellationToken,
    worker: Mutex<Option<JoinHandle<()>>>,
    log_directory: PathBuf,
}

#[derive(Clone)]
pub struct DiagnosticLogger {
    inner: Arc<LoggerHandle>,
}

impl std::fmt::Debug for DiagnosticLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagnosticLogger")
            .field("log_directory", &self.inner.log_directory)
            .field("running", &!self.inner.tx.is_closed())
            .finish()
    }
}

impl DiagnosticLogger {
    /// Spawns the worker on the current tokio runtime, writing console lines
    /// to stdout.
    pub fn start(config: LoggerConfig) -> Self {
        Self::start_with_console(config, Arc::new(StdoutConsole))
    }

    pub fn start_with_console(config: LoggerConfig, console: Arc<dyn ConsoleSink>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let log_directory = config.log_directory.clone();

        let worker = Worker::new(config, console, rx, cancel.clone());
        let handle = tokio::spawn(worker.run());

        Self {
            inner: Arc::new(LoggerHandle {
                tx,
                cancel,
                worker: Mutex::new(Some(handle)),
                log_directory,
            }),
        }
    }

    /// Processes everything already enqueued, flushes the batch, closes the
    /// current file and stops the flush timer. Later calls are no-ops.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        let handle = self.inner.worker.lock().take();
        if let Some(handle) = handle
            && let Err(e) = handle.await
        {
            tracing::error!("Diagnostics worker terminated abnormally: {e}");
        }
    }

    fn send(&self, command: Command) {
        if self.inner.tx.send(command).is_err() {
            tracing::debug!("Diagnostics worker stopped; command dropped");
        }
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, DiagnosticsError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.inner
            .tx
            .send(command(reply_tx))
            .map_err(|_| DiagnosticsError::WorkerClosed)?;
        reply_rx.await.map_err(|_| DiagnosticsError::WorkerClosed)
    }

    pub(crate) fn emit(
        &self,
        severity: Severity,
        operation: impl Into<String>,
        message: impl Into<String>,
        context: Context,
        attachment: Option<Attachment>,
        source: Option<SourceLocation>,
    ) {
        let record = LogRecord::new(severity, operation, message, context, attachment, source);
        self.send(Command::Record(record));
    }

    // ---- emission ----

    #[track_caller]
    pub fn log(
        &self,
        severity: Severity,
        operation: impl Into<String>,
        message: impl Into<String>,
        context: Context,
        attachment: Option<Attachment>,
    ) {
        let source = SourceLocation::from_location(Location::caller());
        self.emit(severity, operation, message, context, attachment, Some(source));
    }

    #[track_caller]
    pub fn debug(&self, operation: impl Into<String>, message: impl Into<String>, context: Context) {
        self.log(Severity::Debug, operation, message, context, None);
    }

    #[track_caller]
    pub fn info(&self, operation: impl Into<String>, message: impl Into<String>, context: Context) {
        self.log(Severity::Info, operation, message, context, None);
    }

    #[track_caller]
    pub fn warning(
        &self,
        operation: impl Into<String>,
        message: impl Into<String>,
        context: Context,
    ) {
        self.log(Severity::Warning, operation, message, context, None);
    }

    #[track_caller]
    pub fn error(&self, operation: impl Into<String>, message: impl Into<String>, context: Context) {
        self.log(Severity::Error, operation, message, context, None);
    }

    #[track_caller]
    pub fn critical(
        &self,
        operation: impl Into<String>,
        message: impl Into<String>,
        context: Context,
    ) {
        self.log(Severity::Critical, operation, message, context, None);
    }

    #[track_caller]
    pub fn log_method_start(&self, function: &str, context: Context) {
        let source = SourceLocation::from_location(Location::caller()).with_function(function);
        self.emit(
            Severity::Debug,
            function,
            format!("{function} started"),
            context,
            None,
            Some(source),
        );
    }

    #[track_caller]
    pub fn log_method_end(&self, function: &str, elapsed: Option<Duration>) {
        let source = SourceLocation::from_location(Location::caller()).with_function(function);
        let attachment = elapsed
            .map(|e| Attachment::Performance(crate::domain::PerformanceMetrics::from_elapsed(e)));
        self.emit(
            Severity::Debug,
            function,
            format!("{function} finished"),
            Context::new(),
            attachment,
            Some(source),
        );
    }

    /// Logs `error` at error severity. `kind` names the error category in
    /// place of runtime type inspection; the `source()` chain becomes an
    /// [`ErrorChain`] attachment.
    #[track_caller]
    pub fn log_error(
        &self,
        operation: impl Into<String>,
        kind: &str,
        error: &(dyn std::error::Error + 'static),
        mut context: Context,
    ) {
        let source = SourceLocation::from_location(Location::caller());
        let description = error.to_string();
        context.insert("error_type".to_string(), kind.to_string());
        context.insert("error_description".to_string(), description.clone());

        self.emit(
            Severity::Error,
            operation,
            description,
            context,
            Some(Attachment::ErrorChain(ErrorChain::from_error(kind, error))),
            Some(source),
        );
    }

    #[track_caller]
    pub fn log_error_chain(
        &self,
        severity: Severity,
        operation: impl Into<String>,
        message: impl Into<String>,
        chain: ErrorChain,
    ) {
        let mut context = Context::new();
        context.insert("retry_attempts".to_string(), chain.retry_attempts.to_string());
        context.insert("final_outcome".to_string(), chain.final_outcome.clone());
        self.log(
            severity,
            operation,
            message,
            context,
            Some(Attachment::ErrorChain(chain)),
        );
    }

    /// Routes an anomaly rule result at the severity the rule chose.
    #[track_caller]
    pub fn log_anomaly(&self, operation: impl Into<String>, outcome: &AnalysisOutcome) {
        let message = outcome
            .recommendation
            .clone()
            .unwrap_or_else(|| "No anomalies detected".to_string());
        let mut context = Context::new();
        context.insert("health".to_string(), outcome.health.to_string());
        context.insert("anomaly_severity".to_string(), outcome.severity.to_string());

        self.log(
            outcome.severity.log_severity(),
            operation,
            message,
            context,
            outcome.anomaly.clone().map(Attachment::Anomaly),
        );
    }

    #[track_caller]
    pub fn log_state_transition(&self, result: &StateTransitionResult) {
        let message = match result.anomaly_description() {
            Some(description) => description.to_string(),
            None => format!("{} -> {}", result.from_state(), result.to_state()),
        };
        let mut context = Context::new();
        context.insert("trigger".to_string(), result.trigger().to_string());
        context.insert("valid".to_string(), result.is_valid().to_string());

        self.log(
            result.severity().log_severity(),
            format!("{}.transition", result.component()),
            message,
            context,
            Some(Attachment::StateTransition(result.clone())),
        );
    }

    #[track_caller]
    pub fn log_bug_report(&self, operation: impl Into<String>, bundle: BugReproduction) {
        let message = format!("Bug report: {}", bundle.title);
        self.log(
            Severity::Error,
            operation,
            message,
            Context::new(),
            Some(Attachment::BugReproduction(bundle)),
        );
    }

    // ---- file lifecycle ----

    /// Flushes pending records into the current file, then starts a new one.
    pub fn rotate_log_files(&self) {
        self.send(Command::Rotate(None));
    }

    /// Like [`rotate_log_files`](Self::rotate_log_files) but waits for the new file's path.
    pub async fn rotate_log_files_and_wait(&self) -> Result<PathBuf, DiagnosticsError> {
        self.request(|reply| Command::Rotate(Some(reply))).await?
    }

    pub fn clear_old_logs(&self, older_than_days: u64) {
        self.send(Command::ClearOldLogs(older_than_days, None));
    }

    /// Like [`clear_old_logs`](Self::clear_old_logs) but returns how many files were removed.
    pub async fn clear_old_logs_and_wait(
        &self,
        older_than_days: u64,
    ) -> Result<usize, DiagnosticsError> {
        self.request(|reply| Command::ClearOldLogs(older_than_days, Some(reply)))
            .await?
    }

    pub async fn get_log_files(&self) -> Result<Vec<String>, DiagnosticsError> {
        self.request(Command::ListFiles).await?
    }

    pub fn get_log_directory_path(&self) -> &Path {
        &self.inner.log_directory
    }

    /// Writes out any buffered records and resolves once every command
    /// enqueued before this call has been applied.
    pub async fn flush(&self) -> Result<(), DiagnosticsError> {
        self.request(Command::Flush).await
    }

    pub async fn buffered_len(&self) -> Result<usize, DiagnosticsError> {
        self.request(Command::BufferedLen).await
    }

    // ---- configuration (debug/test surface) ----

    pub fn set_min_severity(&self, severity: Severity) {
        self.send(Command::SetMinSeverity(severity));
    }

    pub async fn min_severity(&self) -> Result<Severity, DiagnosticsError> {
        self.request(Command::MinSeverity).await
    }

    pub fn set_file_output_enabled(&self, enabled: bool) {
        self.send(Command::SetFileOutput(enabled));
    }

    pub async fn file_output_enabled(&self) -> Result<bool, DiagnosticsError> {
        self.request(Command::FileOutputEnabled).await
    }

    /// Restores threshold, file output and batch mode to the values the
    /// logger was started with.
    pub fn reset_to_defaults(&self) {
        self.send(Command::ResetToDefaults);
    }

    pub fn enable_batch_mode(&self, max_size: usize, flush_interval: Duration) {
        self.send(Command::EnableBatch(BatchConfig {
            max_size: max_size.max(1),
            flush_interval,
        }));
    }

    pub fn disable_batch_mode(&self) {
        self.send(Command::DisableBatch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::context;
    use tempfile::TempDir;

    fn start(dir: &TempDir) -> (DiagnosticLogger, Arc<MemoryConsole>) {
        let console = Arc::new(MemoryConsole::new());
        let config = LoggerConfig {
            min_severity: Severity::Debug,
            ..LoggerConfig::with_directory(dir.path())
        };
        let logger = DiagnosticLogger::start_with_console(config, console.clone());
        (logger, console)
    }

    #[tokio::test]
    async fn test_records_carry_call_site() {
        let temp_dir = TempDir::new().unwrap();
        let (logger, _console) = start(&temp_dir);

        logger.info("test", "hello", Context::new());
        logger.flush().await.unwrap();

        let files = logger.get_log_files().await.unwrap();
        let content =
            std::fs::read_to_string(logger.get_log_directory_path().join(&files[0])).unwrap();
        let record = LogRecord::from_json_line(content.lines().next().unwrap()).unwrap();
        let source = record.source.unwrap();
        assert!(source.file.ends_with("mod.rs"));
        assert!(source.line > 0);

        logger.shutdown().await;
    }

    #[tokio::test]
    async fn test_method_start_and_end_name_function() {
        let temp_dir = TempDir::new().unwrap();
        let (logger, console) = start(&temp_dir);

        logger.log_method_start("load_route", context([("route", "42")]));
        logger.log_method_end("load_route", Some(Duration::from_millis(5)));
        logger.flush().await.unwrap();

        let lines = console.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("load_route: load_route started"));
        assert!(lines[1].contains("load_route finished"));
        assert!(lines[1].contains("[5.000ms]"));

        logger.shutdown().await;
    }

    #[tokio::test]
    async fn test_requests_fail_after_shutdown() {
        let temp_dir = TempDir::new().unwrap();
        let (logger, _console) = start(&temp_dir);

        logger.shutdown().await;
        logger.shutdown().await;

        assert!(matches!(
            logger.min_severity().await,
            Err(DiagnosticsError::WorkerClosed)
        ));
        // Fire-and-forget calls stay silent.
        logger.info("test", "after shutdown", Context::new());
    }
}
