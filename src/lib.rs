// Specific pedantic lints enforced (not blanket allow):
#![deny(
    clippy::explicit_iter_loop,
    clippy::manual_let_else,
    clippy::semicolon_if_nothing_returned,
    clippy::inconsistent_struct_constructor
)]
// Noisy pedantic lints suppressed with justification:
#![allow(
    clippy::cast_possible_truncation, // Durations in milliseconds fit in u64
    clippy::cast_precision_loss,      // Byte counts converted to f64 for display and thresholds
    clippy::cast_sign_loss,           // Only applied to non-negative values
    clippy::missing_errors_doc,       // Errors are listed on DiagnosticsError and ConfigError
    clippy::module_name_repetitions,  // e.g. LoggerConfig in the config module
    clippy::must_use_candidate        // Annotated selectively on critical APIs
)]

//! Structured diagnostic logging and anomaly detection.
//!
//! - [`logger`]: the severity-filtered logger with console and file sinks
//! - [`buffer`] and [`storage`]: batching, rotation and retention of log files
//! - [`instrument`]: timing wrappers for sync and async work
//! - [`analysis`]: stateless anomaly rules for location, sync and memory telemetry
//! - [`session`]: the session lifecycle state machine

pub mod analysis;
pub mod app;
pub mod buffer;
pub mod domain;
pub mod instrument;
pub mod logger;
pub mod session;
pub mod storage;

pub use analysis::AnalysisOutcome;
pub use app::{ConfigError, LoggerConfig};
pub use domain::{
    AnomalyInfo, AnomalySeverity, Attachment, Context, DiagnosticsError, HealthLabel, LogRecord,
    Severity, context,
};
pub use logger::DiagnosticLogger;
pub use session::{SessionLifecycle, SessionState};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
