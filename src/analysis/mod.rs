//! Anomaly rule library.
//!
//! Each rule is a pure function from typed telemetry to an
//! [`AnalysisOutcome`]. Thresholds are fixed per rule. Rules never log;
//! callers route the outcome, typically through
//! [`DiagnosticLogger::log_anomaly`](crate::logger::DiagnosticLogger::log_anomaly).

pub mod location;
pub mod memory;
pub mod sync;

pub use location::{Coordinate, LocationObservation, analyze_location};
pub use memory::{MemoryObservation, MemoryTier, analyze_memory};
pub use sync::{SyncObservation, analyze_sync_health, analyze_sync_health_at};

use crate::domain::{Anomaly, AnomalyInfo, AnomalySeverity, HealthLabel};
use serde::{Deserialize, Serialize};

/// Result of running one anomaly rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    pub severity: AnomalySeverity,
    pub anomaly: Option<AnomalyInfo>,
    pub recommendation: Option<String>,
    pub health: HealthLabel,
}

impl AnalysisOutcome {
    pub fn healthy() -> Self {
        Self {
            severity: AnomalySeverity::Low,
            anomaly: None,
            recommendation: None,
            health: HealthLabel::Good,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.anomaly.is_none()
    }
}

/// A violated threshold plus the rule's tie-break rank and advice.
pub(crate) struct Finding {
    pub anomaly: Anomaly,
    pub rank: u8,
    pub recommendation: &'static str,
}

/// Folds findings into an outcome. The headline recommendation comes from
/// the most severe finding; equal severities fall back to the higher rank.
pub(crate) fn summarize(
    detection_method: &str,
    findings: Vec<Finding>,
    confidence: f64,
) -> AnalysisOutcome {
    let Some(primary) = findings
        .iter()
        .max_by_key(|f| (f.anomaly.severity, f.rank))
        .map(|f| f.recommendation)
    else {
        return AnalysisOutcome::healthy();
    };

    let anomalies = findings.into_iter().map(|f| f.anomaly).collect();
    let info = AnomalyInfo::new(detection_method, anomalies, confidence, primary);
    let severity = info.severity();

    AnalysisOutcome {
        severity,
        anomaly: Some(info),
        recommendation: Some(primary.to_string()),
        health: severity.health(),
    }
}
