use thiserror::Error;

/// Top-level error type for the diagnostics engine.
///
/// None of these ever reach a caller of `log`; they surface only from query
/// and file lifecycle entry points, or are absorbed as degraded I/O.
#[derive(Error, Debug)]
pub enum DiagnosticsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Encoding error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Logger worker is no longer running")]
    WorkerClosed,

    #[error("Unknown session state: {0}")]
    UnknownState(String),
}
