use super::severity::AnomalySeverity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Timing captured around a unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Wall-clock execution time in seconds.
    pub execution_time: f64,
    #[serde(default)]
    pub memory_delta_bytes: Option<i64>,
    #[serde(default)]
    pub thread: Option<String>,
}

impl PerformanceMetrics {
    pub fn from_elapsed(elapsed: Duration) -> Self {
        Self {
            execution_time: elapsed.as_secs_f64(),
            memory_delta_bytes: None,
            thread: current_thread_descriptor(),
        }
    }

    pub fn with_memory_delta(mut self, delta_bytes: i64) -> Self {
        self.memory_delta_bytes = Some(delta_bytes);
        self
    }
}

pub(crate) fn current_thread_descriptor() -> Option<String> {
    let thread = std::thread::current();
    Some(match thread.name() {
        Some(name) => name.to_string(),
        None => format!("{:?}", thread.id()),
    })
}

/// One step of an error chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEvent {
    pub error_type: String,
    pub message: String,
    #[serde(default)]
    pub context: BTreeMap<String, String>,
}

impl ErrorEvent {
    pub fn new(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_type: error_type.into(),
            message: message.into(),
            context: BTreeMap::new(),
        }
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// Ordered record of the errors behind a failed operation, including how
/// many retries the caller attempted. The engine only records retries; it
/// never decides them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorChain {
    pub root_cause: String,
    pub events: Vec<ErrorEvent>,
    pub retry_attempts: u32,
    pub final_outcome: String,
}

impl ErrorChain {
    /// Walks `error` and its `source()` chain. The outermost error becomes the
    /// first event and tagged with `kind`; the innermost message is the root cause.
    pub fn from_error(kind: &str, error: &(dyn std::error::Error + 'static)) -> Self {
        let mut events = vec![ErrorEvent::new(kind, error.to_string())];
        let mut root_cause = error.to_string();

        let mut source = error.source();
        while let Some(inner) = source {
            events.push(ErrorEvent::new("source", inner.to_string()));
            root_cause = inner.to_string();
            source = inner.source();
        }

        Self {
            root_cause,
            events,
            retry_attempts: 0,
            final_outcome: "failed".to_string(),
        }
    }

    pub fn with_retries(mut self, retry_attempts: u32) -> Self {
        self.retry_attempts = retry_attempts;
        self
    }

    pub fn with_outcome(mut self, outcome: impl Into<String>) -> Self {
        self.final_outcome = outcome.into();
        self
    }
}

/// Outcome of checking a proposed session state change.
///
/// Only constructible through [`StateTransitionResult::legal`] and
/// [`StateTransitionResult::illegal`], so a legal result always carries low
/// severity without a description and an illegal one always carries high
/// severity with one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateTransitionResult {
    component: String,
    from_state: String,
    to_state: String,
    trigger: String,
    is_valid: bool,
    #[serde(default)]
    duration: Option<f64>,
    severity: AnomalySeverity,
    #[serde(default)]
    anomaly_description: Option<String>,
}

impl StateTransitionResult {
    pub fn legal(
        component: impl Into<String>,
        from_state: impl Into<String>,
        to_state: impl Into<String>,
        trigger: impl Into<String>,
    ) -> Self {
        Self {
            component: component.into(),
            from_state: from_state.into(),
            to_state: to_state.into(),
            trigger: trigger.into(),
            is_valid: true,
            duration: None,
            severity: AnomalySeverity::Low,
            anomaly_description: None,
        }
    }

    pub fn illegal(
        component: impl Into<String>,
        from_state: impl Into<String>,
        to_state: impl Into<String>,
        trigger: impl Into<String>,
    ) -> Self {
        let from_state = from_state.into();
        let to_state = to_state.into();
        let trigger = trigger.into();
        let description =
            format!("Illegal transition {from_state} -> {to_state} (trigger: {trigger})");
        Self {
            component: component.into(),
            from_state,
            to_state,
            trigger,
            is_valid: false,
            duration: None,
            severity: AnomalySeverity::High,
            anomaly_description: Some(description),
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration.as_secs_f64());
        self
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    pub fn from_state(&self) -> &str {
        &self.from_state
    }

    pub fn to_state(&self) -> &str {
        &self.to_state
    }

    pub fn trigger(&self) -> &str {
        &self.trigger
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    /// Seconds spent in the previous state, when known.
    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    pub fn severity(&self) -> AnomalySeverity {
        self.severity
    }

    pub fn anomaly_description(&self) -> Option<&str> {
        self.anomaly_description.as_deref()
    }
}

/// Information a developer needs to reproduce a reported bug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BugReproduction {
    pub title: String,
    pub steps: Vec<String>,
    pub expected_behavior: String,
    pub actual_behavior: String,
    #[serde(default)]
    pub app_state: BTreeMap<String, String>,
}

/// A single threshold violation found by an anomaly rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub category: String,
    pub description: String,
    pub observed_value: f64,
    pub threshold: f64,
    pub impact: String,
    pub severity: AnomalySeverity,
}

/// Result payload of an anomaly rule.
///
/// `severity` is the maximum of the constituent anomalies and is `Low`
/// exactly when the list is empty; a non-empty list is never rated below
/// `Medium`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyInfo {
    anomalies: Vec<Anomaly>,
    severity: AnomalySeverity,
    confidence: f64,
    recommended_action: String,
    detection_method: String,
}

impl AnomalyInfo {
    pub fn new(
        detection_method: impl Into<String>,
        anomalies: Vec<Anomaly>,
        confidence: f64,
        recommended_action: impl Into<String>,
    ) -> Self {
        let severity = anomalies
            .iter()
            .map(|a| a.severity)
            .max()
            .map_or(AnomalySeverity::Low, |max| max.max(AnomalySeverity::Medium));

        Self {
            anomalies,
            severity,
            confidence: confidence.clamp(0.0, 1.0),
            recommended_action: recommended_action.into(),
            detection_method: detection_method.into(),
        }
    }

    pub fn anomalies(&self) -> &[Anomaly] {
        &self.anomalies
    }

    pub fn severity(&self) -> AnomalySeverity {
        self.severity
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn recommended_action(&self) -> &str {
        &self.recommended_action
    }

    pub fn detection_method(&self) -> &str {
        &self.detection_method
    }

    pub fn is_empty(&self) -> bool {
        self.anomalies.is_empty()
    }
}
