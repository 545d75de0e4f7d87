use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Severity of a diagnostic record, ordered from least to most important.
///
/// The discriminant doubles as the filtering priority (`Debug` = 0 ..
/// `Critical` = 4). A record is accepted when its priority is greater than
/// or equal to the logger's current threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug = 0,
    Info = 1,
    Warning = 2,
    Error = 3,
    Critical = 4,
}

impl Severity {
    pub const ALL: [Severity; 5] = [
        Severity::Debug,
        Severity::Info,
        Severity::Warning,
        Severity::Error,
        Severity::Critical,
    ];

    pub fn priority(self) -> u8 {
        self as u8
    }

    pub fn from_priority(priority: u8) -> Option<Self> {
        Self::ALL.get(priority as usize).copied()
    }

    /// Whether a record at this severity passes the given threshold.
    pub fn passes(self, threshold: Severity) -> bool {
        self.priority() >= threshold.priority()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical",
        }
    }

    /// Fixed-width tag used by the console sink.
    pub fn tag(self) -> &'static str {
        match self {
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warning => "WARN",
            Severity::Error => "ERROR",
            Severity::Critical => "CRIT",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "debug" => Ok(Severity::Debug),
            "info" => Ok(Severity::Info),
            "warn" | "warning" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            "critical" | "fatal" => Ok(Severity::Critical),
            other => Err(format!(
                "unknown severity '{other}' (expected debug, info, warning, error, critical)"
            )),
        }
    }
}

impl From<Severity> for tracing::Level {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Debug => tracing::Level::DEBUG,
            Severity::Info => tracing::Level::INFO,
            Severity::Warning => tracing::Level::WARN,
            Severity::Error | Severity::Critical => tracing::Level::ERROR,
        }
    }
}

/// Severity assigned by anomaly rules and the session validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnomalySeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AnomalySeverity {
    /// Log severity a classification result should be routed at.
    pub fn log_severity(self) -> Severity {
        match self {
            AnomalySeverity::Low => Severity::Info,
            AnomalySeverity::Medium => Severity::Warning,
            AnomalySeverity::High => Severity::Error,
            AnomalySeverity::Critical => Severity::Critical,
        }
    }

    pub fn health(self) -> HealthLabel {
        match self {
            AnomalySeverity::Low => HealthLabel::Good,
            AnomalySeverity::Medium => HealthLabel::Caution,
            AnomalySeverity::High | AnomalySeverity::Critical => HealthLabel::Critical,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AnomalySeverity::Low => "low",
            AnomalySeverity::Medium => "medium",
            AnomalySeverity::High => "high",
            AnomalySeverity::Critical => "critical",
        }
    }
}

impl fmt::Display for AnomalySeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse dashboard label derived from an anomaly severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthLabel {
    Good,
    Caution,
    Critical,
}

impl HealthLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            HealthLabel::Good => "good",
            HealthLabel::Caution => "caution",
            HealthLabel::Critical => "critical",
        }
    }
}

impl fmt::Display for HealthLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
