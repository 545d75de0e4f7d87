//! Session state validator.
//!
//! [`LEGAL_TRANSITIONS`] is the only source of legality. The string
//! validator ([`validate`]), the typed analyzer ([`analyze_transition`]) and
//! the stateful [`SessionLifecycle`] all consult it.

use crate::domain::{
    Anomaly, AnomalyInfo, AnomalySeverity, Context, DiagnosticsError, HealthLabel,
    StateTransitionResult,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

pub const COMPONENT: &str = "session";
const DETECTION_METHOD: &str = "legal_transition_table";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    NotStarted,
    InProgress,
    Paused,
    Completed,
}

/// Allowed `(from, to)` pairs. Everything else is illegal, including
/// self-transitions and anything leaving `Completed`.
pub const LEGAL_TRANSITIONS: [(SessionState, SessionState); 5] = [
    (SessionState::NotStarted, SessionState::InProgress),
    (SessionState::InProgress, SessionState::Paused),
    (SessionState::Paused, SessionState::InProgress),
    (SessionState::InProgress, SessionState::Completed),
    (SessionState::Paused, SessionState::Completed),
];

pub fn is_legal(from: SessionState, to: SessionState) -> bool {
    LEGAL_TRANSITIONS.contains(&(from, to))
}

impl SessionState {
    pub const ALL: [SessionState; 4] = [
        SessionState::NotStarted,
        SessionState::InProgress,
        SessionState::Paused,
        SessionState::Completed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::NotStarted => "notStarted",
            SessionState::InProgress => "inProgress",
            SessionState::Paused => "paused",
            SessionState::Completed => "completed",
        }
    }

    pub fn is_terminal(self) -> bool {
        !LEGAL_TRANSITIONS.iter().any(|(from, _)| *from == self)
    }

    pub fn next_states(self) -> impl Iterator<Item = SessionState> {
        LEGAL_TRANSITIONS
            .into_iter()
            .filter(move |(from, _)| *from == self)
            .map(|(_, to)| to)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionState {
    type Err = DiagnosticsError;

    /// Accepts the camelCase wire names and their snake_case spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "notStarted" | "not_started" => Ok(SessionState::NotStarted),
            "inProgress" | "in_progress" => Ok(SessionState::InProgress),
            "paused" => Ok(SessionState::Paused),
            "completed" => Ok(SessionState::Completed),
            other => Err(DiagnosticsError::UnknownState(other.to_string())),
        }
    }
}

/// Outcome of [`validate`]. An illegal transition is a normal return value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionValidation {
    pub is_valid: bool,
    pub severity: AnomalySeverity,
    pub anomaly: Option<AnomalyInfo>,
    pub result: StateTransitionResult,
}

/// Outcome of [`analyze_transition`], for dashboards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionAnalysis {
    pub result: StateTransitionResult,
    pub health: HealthLabel,
}

/// Validates a transition given as raw state names. Names that do not parse
/// as a [`SessionState`] make the transition illegal.
pub fn validate(from: &str, to: &str, trigger: &str, context: &Context) -> TransitionValidation {
    let parsed = (from.parse::<SessionState>(), to.parse::<SessionState>());
    let result = match parsed {
        (Ok(from_state), Ok(to_state)) => classify(from_state, to_state, trigger),
        _ => StateTransitionResult::illegal(COMPONENT, from, to, trigger),
    };

    let anomaly = result
        .anomaly_description()
        .map(|description| illegal_transition_anomaly(description, context));

    TransitionValidation {
        is_valid: result.is_valid(),
        severity: result.severity(),
        anomaly,
        result,
    }
}

/// Typed form of [`validate`], reporting a health label alongside the result.
pub fn analyze_transition(
    from: SessionState,
    to: SessionState,
    trigger: &str,
) -> TransitionAnalysis {
    let result = classify(from, to, trigger);
    TransitionAnalysis {
        health: result.severity().health(),
        result,
    }
}

fn classify(from: SessionState, to: SessionState, trigger: &str) -> StateTransitionResult {
    if is_legal(from, to) {
        StateTransitionResult::legal(COMPONENT, from.as_str(), to.as_str(), trigger)
    } else {
        StateTransitionResult::illegal(COMPONENT, from.as_str(), to.as_str(), trigger)
    }
}

fn illegal_transition_anomaly(description: &str, context: &Context) -> AnomalyInfo {
    let mut pairs: Vec<_> = context.iter().collect();
    pairs.sort();
    let description = if pairs.is_empty() {
        description.to_string()
    } else {
        let rendered: Vec<String> = pairs.iter().map(|(k, v)| format!("{k}={v}")).collect();
        format!("{description} [{}]", rendered.join(", "))
    };

    AnomalyInfo::new(
        DETECTION_METHOD,
        vec![Anomaly {
            category: "illegal_transition".to_string(),
            description,
            observed_value: 0.0,
            threshold: 1.0,
            impact: "Session data may be left in an inconsistent state".to_string(),
            severity: AnomalySeverity::High,
        }],
        1.0,
        "Reject the transition and keep the session in its current state",
    )
}

/// Tracks one session through its lifecycle. Illegal transitions are
/// reported and leave the current state unchanged.
#[derive(Debug)]
pub struct SessionLifecycle {
    state: SessionState,
    entered_at: Instant,
    history: Vec<StateTransitionResult>,
}

impl Default for SessionLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionLifecycle {
    pub fn new() -> Self {
        Self {
            state: SessionState::NotStarted,
            entered_at: Instant::now(),
            history: Vec::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn history(&self) -> &[StateTransitionResult] {
        &self.history
    }

    /// Applies a transition. Legal results carry the time spent in the
    /// state being left.
    pub fn transition(&mut self, to: SessionState, trigger: &str) -> StateTransitionResult {
        let mut result = classify(self.state, to, trigger);
        if result.is_valid() {
            result = result.with_duration(self.entered_at.elapsed());
            self.state = to;
            self.entered_at = Instant::now();
        }
        self.history.push(result.clone());
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::context;
    use proptest::prelude::*;
    use proptest::sample::select;

    #[test]
    fn test_legal_table_pairs_are_valid() {
        for (from, to) in LEGAL_TRANSITIONS {
            let validation = validate(from.as_str(), to.as_str(), "tap", &Context::new());
            assert!(validation.is_valid, "{from} -> {to}");
            assert_eq!(validation.severity, AnomalySeverity::Low);
            assert!(validation.anomaly.is_none());
        }
    }

    #[test]
    fn test_illegal_examples() {
        for (from, to) in [("completed", "inProgress"), ("notStarted", "completed")] {
            let validation = validate(from, to, "tap", &Context::new());
            assert!(!validation.is_valid);
            assert_eq!(validation.severity, AnomalySeverity::High);
            let info = validation.anomaly.unwrap();
            assert!(info.anomalies()[0].description.contains(from));
            assert!(info.anomalies()[0].description.contains("tap"));
        }
    }

    #[test]
    fn test_unknown_state_is_illegal() {
        let validation = validate("running", "paused", "resume", &Context::new());
        assert!(!validation.is_valid);
        assert_eq!(validation.severity, AnomalySeverity::High);
        assert_eq!(validation.result.from_state(), "running");
    }

    #[test]
    fn test_context_is_included_in_anomaly() {
        let validation = validate(
            "completed",
            "paused",
            "pauseButton",
            &context([("walk_id", "w-42")]),
        );
        let info = validation.anomaly.unwrap();
        assert!(info.anomalies()[0].description.ends_with("[walk_id=w-42]"));
    }

    #[test]
    fn test_snake_case_names_parse() {
        assert_eq!(
            "in_progress".parse::<SessionState>().unwrap(),
            SessionState::InProgress
        );
        assert!(validate("not_started", "in_progress", "start", &Context::new()).is_valid);
        assert!(matches!(
            "done".parse::<SessionState>(),
            Err(DiagnosticsError::UnknownState(_))
        ));
    }

    #[test]
    fn test_completed_is_only_terminal_state() {
        let terminal: Vec<_> = SessionState::ALL
            .into_iter()
            .filter(|s| s.is_terminal())
            .collect();
        assert_eq!(terminal, vec![SessionState::Completed]);
        assert_eq!(
            SessionState::Paused.next_states().collect::<Vec<_>>(),
            vec![SessionState::InProgress, SessionState::Completed]
        );
    }

    #[test]
    fn test_analyze_health_labels() {
        let ok = analyze_transition(SessionState::InProgress, SessionState::Paused, "pause");
        assert_eq!(ok.health, HealthLabel::Good);
        let bad = analyze_transition(SessionState::Completed, SessionState::Completed, "finish");
        assert_eq!(bad.health, HealthLabel::Critical);
        assert!(!bad.result.is_valid());
    }

    #[test]
    fn test_lifecycle_tracks_state_and_duration() {
        let mut session = SessionLifecycle::new();
        assert_eq!(session.state(), SessionState::NotStarted);

        let started = session.transition(SessionState::InProgress, "start");
        assert!(started.is_valid());
        assert!(started.duration().is_some());

        let rejected = session.transition(SessionState::NotStarted, "reset");
        assert!(!rejected.is_valid());
        assert!(rejected.duration().is_none());
        assert_eq!(session.state(), SessionState::InProgress);

        session.transition(SessionState::Paused, "pause");
        session.transition(SessionState::Completed, "finish");
        assert!(session.is_finished());
        assert_eq!(session.history().len(), 4);

        let after_end = session.transition(SessionState::InProgress, "resume");
        assert!(!after_end.is_valid());
        assert_eq!(session.state(), SessionState::Completed);
    }

    #[test]
    fn test_state_serde_uses_camel_case() {
        let json = serde_json::to_string(&SessionState::NotStarted).unwrap();
        assert_eq!(json, "\"notStarted\"");
        let parsed: SessionState = serde_json::from_str("\"inProgress\"").unwrap();
        assert_eq!(parsed, SessionState::InProgress);
    }

    fn any_state() -> impl Strategy<Value = SessionState> {
        select(SessionState::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn prop_string_and_typed_entry_points_agree(
            from in any_state(),
            to in any_state(),
            trigger in "[a-zA-Z]{1,12}",
        ) {
            let validation = validate(from.as_str(), to.as_str(), &trigger, &Context::new());
            let analysis = analyze_transition(from, to, &trigger);

            prop_assert_eq!(validation.is_valid, is_legal(from, to));
            prop_assert_eq!(&validation.result, &analysis.result);
            prop_assert_eq!(validation.anomaly.is_some(), !validation.is_valid);
        }

        #[test]
        fn prop_result_severity_matches_legality(from in any_state(), to in any_state()) {
            let result = analyze_transition(from, to, "t").result;
            if result.is_valid() {
                prop_assert_eq!(result.severity(), AnomalySeverity::Low);
                prop_assert!(result.anomaly_description().is_none());
            } else {
                prop_assert_eq!(result.severity(), AnomalySeverity::High);
                prop_assert!(result.anomaly_description().is_some());
            }
        }

        #[test]
        fn prop_self_transitions_are_illegal(state in any_state()) {
            prop_assert!(!is_legal(state, state));
        }
    }
}
