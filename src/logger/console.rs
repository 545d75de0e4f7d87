use crate::domain::{Attachment, LogRecord};
use parking_lot::Mutex;
use std::io::Write;

/// Destination for the one-line console rendering of every accepted record.
///
/// Called only from the logger worker, in record order.
pub trait ConsoleSink: Send + Sync {
    fn write_line(&self, line: &str);
}

/// Writes to standard output.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutConsole;

impl ConsoleSink for StdoutConsole {
    fn write_line(&self, line: &str) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "{line}");
    }
}

/// Keeps lines in memory. Useful for tests and for embedding hosts that
/// render the console themselves.
#[derive(Debug, Default)]
pub struct MemoryConsole {
    lines: Mutex<Vec<String>>,
}

impl MemoryConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lines.lock().clear();
    }
}

impl ConsoleSink for MemoryConsole {
    fn write_line(&self, line: &str) {
        self.lines.lock().push(line.to_string());
    }
}

/// `<time> [TAG  ] operation: message {k=v, ...} [summary] #corr`
pub fn format_console_line(record: &LogRecord) -> String {
    let mut line = format!(
        "{} [{:<5}] {}: {}",
        record.timestamp.format("%H:%M:%S%.3f"),
        record.severity.tag(),
        record.operation,
        record.message
    );

    if !record.context.is_empty() {
        let mut pairs: Vec<_> = record.context.iter().collect();
        pairs.sort();
        let rendered: Vec<String> = pairs.iter().map(|(k, v)| format!("{k}={v}")).collect();
        line.push_str(&format!(" {{{}}}", rendered.join(", ")));
    }

    if let Some(summary) = record.attachment.as_ref().map(summarize_attachment) {
        line.push_str(&format!(" [{summary}]"));
    }

    let short_id: String = record.correlation_id.chars().take(8).collect();
    line.push_str(&format!(" #{short_id}"));
    line
}

fn summarize_attachment(attachment: &Attachment) -> String {
    match attachment {
        Attachment::Performance(metrics) => {
            format!("{:.3}ms", metrics.execution_time * 1000.0)
        }
        Attachment::ErrorChain(chain) => format!(
            "root cause: {}, retries: {}",
            chain.root_cause, chain.retry_attempts
        ),
        Attachment::StateTransition(result) => format!(
            "{} -> {} {}",
            result.from_state(),
            result.to_state(),
            if result.is_valid() { "ok" } else { "illegal" }
        ),
        Attachment::BugReproduction(bundle) => {
            format!("bug: {} ({} steps)", bundle.title, bundle.steps.len())
        }
        Attachment::Anomaly(info) => format!(
            "{} anomalies, severity {}",
            info.anomalies().len(),
            info.severity()
        ),
    }
}
