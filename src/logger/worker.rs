// The serialized execution context behind DiagnosticLogger.
//
// Every state change (threshold, file toggle, batch buffer, file rotation,
// retention) happens here, one command at a time, in channel arrival order.

use super::console::{ConsoleSink, format_console_line};
use crate::app::config::LoggerConfig;
use crate::buffer::{BatchConfig, BatchTrigger, RecordBatcher};
use crate::domain::{DiagnosticsError, LogRecord, Severity, context};
use crate::storage::LogFileStore;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub(crate) enum Command {
    Record(LogRecord),
    SetMinSeverity(Severity),
    MinSeverity(oneshot::Sender<Severity>),
    SetFileOutput(bool),
    FileOutputEnabled(oneshot::Sender<bool>),
    ResetToDefaults,
    EnableBatch(BatchConfig),
    DisableBatch,
    Flush(oneshot::Sender<()>),
    Rotate(Option<oneshot::Sender<Result<PathBuf, DiagnosticsError>>>),
    ClearOldLogs(u64, Option<oneshot::Sender<Result<usize, DiagnosticsError>>>),
    ListFiles(oneshot::Sender<Result<Vec<String>, DiagnosticsError>>),
    BufferedLen(oneshot::Sender<usize>),
}

pub(crate) struct Worker {
    rx: mpsc::UnboundedReceiver<Command>,
    cancel: CancellationToken,
    console: Arc<dyn ConsoleSink>,
    store: LogFileStore,
    defaults: LoggerConfig,
    min_severity: Severity,
    file_output_enabled: bool,
    batcher: Option<RecordBatcher>,
}

impl Worker {
    pub(crate) fn new(
        config: LoggerConfig,
        console: Arc<dyn ConsoleSink>,
        rx: mpsc::UnboundedReceiver<Command>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            rx,
            cancel,
            console,
            store: LogFileStore::new(&config.log_directory, &config.file_prefix),
            min_severity: config.min_severity,
            file_output_enabled: config.file_output_enabled,
            batcher: config.batch_config().map(RecordBatcher::new),
            defaults: config,
        }
    }

    pub(crate) async fn run(mut self) {
        info!(
            directory = %self.store.directory().display(),
            min_severity = %self.min_severity,
            batched = self.batcher.is_some(),
            "Diagnostics logger started"
        );

        loop {
            let deadline = self.batcher.as_ref().map(RecordBatcher::next_deadline);

            tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    // Records enqueued before shutdown are still processed.
                    while let Ok(command) = self.rx.try_recv() {
                        self.handle(command).await;
                    }
                    break;
                }
                command = self.rx.recv() => match command {
                    Some(command) => self.handle(command).await,
                    None => break,
                },
                () = sleep_until_deadline(deadline) => {
                    self.flush_due().await;
                }
            }
        }

        self.flush_batch(BatchTrigger::Shutdown).await;
        if let Err(e) = self.store.close().await {
            warn!("Failed to close log file on shutdown: {e}");
        }
        info!("Diagnostics logger stopped");
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Record(record) => self.accept(record).await,
            Command::SetMinSeverity(severity) => {
                debug!(%severity, "Minimum severity changed");
                self.min_severity = severity;
            }
            Command::MinSeverity(reply) => {
                let _ = reply.send(self.min_severity);
            }
            Command::SetFileOutput(enabled) => {
                if !enabled {
                    // Records accepted while enabled still reach the disk.
                    self.flush_batch(BatchTrigger::Manual).await;
                }
                self.file_output_enabled = enabled;
            }
            Command::FileOutputEnabled(reply) => {
                let _ = reply.send(self.file_output_enabled);
            }
            Command::ResetToDefaults => {
                self.flush_batch(BatchTrigger::Manual).await;
                self.min_severity = self.defaults.min_severity;
                self.file_output_enabled = self.defaults.file_output_enabled;
                self.batcher = self.defaults.batch_config().map(RecordBatcher::new);
            }
            Command::EnableBatch(config) => {
                self.flush_batch(BatchTrigger::Manual).await;
                debug!(
                    max_size = config.max_size,
                    interval_ms = config.flush_interval.as_millis() as u64,
                    "Batch mode enabled"
                );
                self.batcher = Some(RecordBatcher::new(config));
            }
            Command::DisableBatch => {
                self.flush_batch(BatchTrigger::Manual).await;
                self.batcher = None;
            }
            Command::Flush(reply) => {
                self.flush_batch(BatchTrigger::Manual).await;
                let _ = reply.send(());
            }
            Command::Rotate(reply) => {
                self.flush_batch(BatchTrigger::Manual).await;
                let result = self.store.rotate().await;
                match reply {
                    Some(reply) => {
                        let _ = reply.send(result);
                    }
                    None => {
                        if let Err(e) = result {
                            self.report_degraded(&e, 0);
                        }
                    }
                }
            }
            Command::ClearOldLogs(days, reply) => {
                let result = self.store.clear_old_logs(days).await;
                if let Err(e) = &result {
                    warn!(older_than_days = days, "Log retention failed: {e}");
                }
                if let Some(reply) = reply {
                    let _ = reply.send(result);
                }
            }
            Command::ListFiles(reply) => {
                let _ = reply.send(self.store.list_files().await);
            }
            Command::BufferedLen(reply) => {
                let _ = reply.send(self.batcher.as_ref().map_or(0, RecordBatcher::len));
            }
        }
    }

    async fn accept(&mut self, record: LogRecord) {
        if !record.severity.passes(self.min_severity) {
            return;
        }

        self.console.write_line(&format_console_line(&record));

        if !self.file_output_enabled {
            return;
        }

        let Some(batcher) = self.batcher.as_mut() else {
            self.persist(vec![record]).await;
            return;
        };

        let ready = batcher
            .push(record)
            .or_else(|| batcher.poll_due(Instant::now()));
        if let Some(batch) = ready {
            debug!(size = batch.size(), trigger = ?batch.trigger(), "Flushing batch");
            self.persist(batch.into_records()).await;
        }
    }

    async fn flush_due(&mut self) {
        let Some(batcher) = self.batcher.as_mut() else {
            return;
        };
        if let Some(batch) = batcher.poll_due(Instant::now()) {
            debug!(size = batch.size(), "Flushing batch on interval");
            self.persist(batch.into_records()).await;
        }
    }

    async fn flush_batch(&mut self, trigger: BatchTrigger) {
        let Some(batch) = self.batcher.as_mut().and_then(|b| b.drain(trigger)) else {
            return;
        };
        debug!(size = batch.size(), ?trigger, "Flushing batch");
        self.persist(batch.into_records()).await;
    }

    async fn persist(&mut self, records: Vec<LogRecord>) {
        if let Err(e) = self.store.append(&records).await {
            self.report_degraded(&e, records.len());
        }
    }

    /// Emits one warning about a failed durable write. The warning goes to
    /// the console only and never re-enters the file path.
    fn report_degraded(&self, error: &DiagnosticsError, lost_records: usize) {
        warn!(lost_records, "File output degraded: {error}");

        let record = LogRecord::new(
            Severity::Warning,
            "diagnostics.file_output",
            format!("File output degraded: {error}"),
            context([
                ("lost_records", lost_records.to_string()),
                (
                    "directory",
                    self.store.directory().display().to_string(),
                ),
            ]),
            None,
            None,
        );
        if record.severity.passes(self.min_severity) {
            self.console.write_line(&format_console_line(&record));
        }
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
