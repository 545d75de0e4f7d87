//! Domain layer for stride-diagnostics.
//!
//! Contains the vocabulary shared across all modules:
//! - `Severity`: record severity (Debug/Info/Warning/Error/Critical)
//! - `LogRecord`: the immutable structured record and its single `Attachment`
//! - `AnomalyInfo`, `StateTransitionResult`, `ErrorChain`, ...: attachment payloads
//! - `DiagnosticsError`: top-level error type

pub mod attachments;
pub mod error;
pub mod log_record;
pub mod severity;

pub use attachments::{
    Anomaly, AnomalyInfo, BugReproduction, ErrorChain, ErrorEvent, PerformanceMetrics,
    StateTransitionResult,
};
pub use error::DiagnosticsError;
pub use log_record::{Attachment, Context, EnvironmentSnapshot, LogRecord, SourceLocation, context};
pub use severity::{AnomalySeverity, HealthLabel, Severity};
