use super::attachments::{
    AnomalyInfo, BugReproduction, ErrorChain, PerformanceMetrics, StateTransitionResult,
};
use super::severity::Severity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;
use uuid::Uuid;

/// Key-value context attached to a record. Keys are unique; order is irrelevant.
pub type Context = HashMap<String, String>;

/// Builds a [`Context`] from any iterator of string-like pairs.
pub fn context<I, K, V>(pairs: I) -> Context
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Call site that produced a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    #[serde(default)]
    pub function: Option<String>,
    pub line: u32,
}

impl SourceLocation {
    pub fn from_location(location: &std::panic::Location<'_>) -> Self {
        Self {
            file: location.file().to_string(),
            function: None,
            line: location.line(),
        }
    }

    pub fn with_function(mut self, function: impl Into<String>) -> Self {
        self.function = Some(function.into());
        self
    }
}

/// Device and process metadata captured with every record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentSnapshot {
    pub host: String,
    pub os: String,
    pub arch: String,
    pub app_version: String,
    pub process_id: u32,
    #[serde(default)]
    pub thread: Option<String>,
}

struct StaticEnvironment {
    host: String,
    os: &'static str,
    arch: &'static str,
    process_id: u32,
}

fn static_environment() -> &'static StaticEnvironment {
    static ENV: OnceLock<StaticEnvironment> = OnceLock::new();
    ENV.get_or_init(|| StaticEnvironment {
        host: hostname::get()
            .map(|h| h.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "unknown".to_string()),
        os: std::env::consts::OS,
        arch: std::env::consts::ARCH,
        process_id: std::process::id(),
    })
}

impl EnvironmentSnapshot {
    /// Host, OS and process id are resolved once per process; the thread is
    /// read on every capture.
    pub fn capture() -> Self {
        let env = static_environment();
        Self {
            host: env.host.clone(),
            os: env.os.to_string(),
            arch: env.arch.to_string(),
            app_version: crate::VERSION.to_string(),
            process_id: env.process_id,
            thread: super::attachments::current_thread_descriptor(),
        }
    }
}

/// The single optional payload a record may carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Attachment {
    Performance(PerformanceMetrics),
    ErrorChain(ErrorChain),
    StateTransition(StateTransitionResult),
    BugReproduction(BugReproduction),
    Anomaly(AnomalyInfo),
}

impl Attachment {
    pub fn kind(&self) -> &'static str {
        match self {
            Attachment::Performance(_) => "performance",
            Attachment::ErrorChain(_) => "error_chain",
            Attachment::StateTransition(_) => "state_transition",
            Attachment::BugReproduction(_) => "bug_reproduction",
            Attachment::Anomaly(_) => "anomaly",
        }
    }
}

/// A structured diagnostic record. Built once at the call site and consumed
/// by exactly one sink path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub operation: String,
    pub message: String,
    #[serde(default)]
    pub context: Context,
    pub environment: EnvironmentSnapshot,
    #[serde(default)]
    pub source: Option<SourceLocation>,
    pub correlation_id: String,
    #[serde(default)]
    pub attachment: Option<Attachment>,
}

impl LogRecord {
    pub fn new(
        severity: Severity,
        operation: impl Into<String>,
        message: impl Into<String>,
        context: Context,
        attachment: Option<Attachment>,
        source: Option<SourceLocation>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            severity,
            operation: operation.into(),
            message: message.into(),
            context,
            environment: EnvironmentSnapshot::capture(),
            source,
            correlation_id: Uuid::new_v4().to_string(),
            attachment,
        }
    }

    /// Serializes the record as a single JSON line (without the newline).
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line.trim_end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::attachments::{Anomaly, StateTransitionResult};
    use crate::domain::severity::AnomalySeverity;

    #[test]
    fn test_correlation_ids_are_unique() {
        let a = LogRecord::new(Severity::Info, "op", "a", Context::new(), None, None);
        let b = LogRecord::new(Severity::Info, "op", "b", Context::new(), None, None);
        assert_ne!(a.correlation_id, b.correlation_id);
    }

    #[test]
    fn test_json_line_round_trip() {
        let record = LogRecord::new(
            Severity::Warning,
            "location.track",
            "accuracy degraded",
            context([("accuracy", "150.0"), ("session", "abc")]),
            Some(Attachment::Anomaly(AnomalyInfo::new(
                "location_quality",
                vec![Anomaly {
                    category: "gps_accuracy".to_string(),
                    description: "coarse fix".to_string(),
                    observed_value: 150.0,
                    threshold: 100.0,
                    impact: "distance drift".to_string(),
                    severity: AnomalySeverity::Medium,
                }],
                0.8,
                "move outdoors",
            ))),
            Some(SourceLocation {
                file: "src/tracker.rs".to_string(),
                function: Some("update".to_string()),
                line: 42,
            }),
        );

        let line = record.to_json_line().unwrap();
        assert!(!line.contains('\n'));
        let decoded = LogRecord::from_json_line(&line).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_attachment_is_tagged() {
        let attachment = Attachment::StateTransition(StateTransitionResult::legal(
            "session",
            "notStarted",
            "inProgress",
            "start",
        ));
        let value = serde_json::to_value(&attachment).unwrap();
        assert_eq!(value["kind"], "state_transition");
        assert_eq!(value["data"]["is_valid"], true);
        assert_eq!(attachment.kind(), "state_transition");
    }

    #[test]
    fn test_environment_snapshot_is_populated() {
        let env = EnvironmentSnapshot::capture();
        assert!(!env.os.is_empty());
        assert_eq!(env.app_version, crate::VERSION);
        assert_eq!(env.process_id, std::process::id());
    }
}
