use super::{AnalysisOutcome, Finding, summarize};
use crate::domain::{Anomaly, AnomalySeverity};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

pub const DETECTION_METHOD: &str = "sync_health_thresholds";

pub const MAX_PENDING_WRITES: u32 = 10;
pub const STALE_AFTER_SECS: i64 = 60 * 60;

const RANK_PENDING: u8 = 3;
const RANK_OFFLINE: u8 = 2;
const RANK_STALE: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncObservation {
    pub is_online: bool,
    pub pending_writes: u32,
    pub last_successful_sync: Option<DateTime<Utc>>,
}

/// Classifies sync health against the current wall clock.
pub fn analyze_sync_health(observation: &SyncObservation) -> AnalysisOutcome {
    analyze_sync_health_at(observation, Utc::now())
}

/// Classifies sync health relative to `now`. A last sync in the future
/// (clock skew) counts as fresh.
pub fn analyze_sync_health_at(observation: &SyncObservation, now: DateTime<Utc>) -> AnalysisOutcome {
    let mut findings = Vec::new();

    if !observation.is_online {
        findings.push(Finding {
            anomaly: Anomaly {
                category: "connectivity".to_string(),
                description: "Device is offline".to_string(),
                observed_value: 0.0,
                threshold: 1.0,
                impact: "Writes are queued locally until connectivity returns".to_string(),
                severity: AnomalySeverity::Medium,
            },
            rank: RANK_OFFLINE,
            recommendation: "Offline; check network connection",
        });
    }

    if observation.pending_writes > MAX_PENDING_WRITES {
        findings.push(Finding {
            anomaly: Anomaly {
                category: "pending_writes".to_string(),
                description: format!(
                    "{} pending writes exceed the limit of {MAX_PENDING_WRITES}",
                    observation.pending_writes
                ),
                observed_value: f64::from(observation.pending_writes),
                threshold: f64::from(MAX_PENDING_WRITES),
                impact: "Local changes may be lost if the app is removed".to_string(),
                severity: AnomalySeverity::High,
            },
            rank: RANK_PENDING,
            recommendation: "Unsynced data is accumulating; keep the app open on a stable connection",
        });
    }

    if let Some(finding) = staleness(observation.last_successful_sync, now) {
        findings.push(finding);
    }

    summarize(DETECTION_METHOD, findings, 0.9)
}

fn staleness(last_sync: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Option<Finding> {
    let Some(last_sync) = last_sync else {
        return Some(Finding {
            anomaly: Anomaly {
                category: "sync_staleness".to_string(),
                description: "No successful sync has been recorded".to_string(),
                observed_value: -1.0,
                threshold: STALE_AFTER_SECS as f64,
                impact: "Remote copy may not exist yet".to_string(),
                severity: AnomalySeverity::Medium,
            },
            rank: RANK_STALE,
            recommendation: "Never synced; verify sign-in and network access",
        });
    };

    let age = now.signed_duration_since(last_sync);
    if age <= TimeDelta::seconds(STALE_AFTER_SECS) {
        return None;
    }

    Some(Finding {
        anomaly: Anomaly {
            category: "sync_staleness".to_string(),
            description: format!("Last successful sync was {} minutes ago", age.num_minutes()),
            observed_value: age.num_seconds() as f64,
            threshold: STALE_AFTER_SECS as f64,
            impact: "Remote copy is out of date".to_string(),
            severity: AnomalySeverity::Medium,
        },
        rank: RANK_STALE,
        recommendation: "Last sync is stale; trigger a manual sync",
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::HealthLabel;

    fn observe(is_online: bool, pending_writes: u32, last: Option<DateTime<Utc>>) -> SyncObservation {
        SyncObservation {
            is_online,
            pending_writes,
            last_successful_sync: last,
        }
    }

    #[test]
    fn test_healthy_sync() {
        let now = Utc::now();
        let outcome = analyze_sync_health_at(&observe(true, 2, Some(now)), now);
        assert_eq!(outcome.severity, AnomalySeverity::Low);
        assert_eq!(outcome.health, HealthLabel::Good);
        assert!(outcome.anomaly.is_none());
    }

    #[test]
    fn test_offline_is_medium_caution() {
        let now = Utc::now();
        let outcome = analyze_sync_health_at(&observe(false, 2, Some(now)), now);
        assert_eq!(outcome.severity, AnomalySeverity::Medium);
        assert_eq!(outcome.health, HealthLabel::Caution);
        assert!(outcome.recommendation.unwrap().contains("check network connection"));
    }

    #[test]
    fn test_pending_writes_is_high() {
        let now = Utc::now();
        let outcome = analyze_sync_health_at(&observe(true, 15, Some(now)), now);
        assert_eq!(outcome.severity, AnomalySeverity::High);
        assert_eq!(outcome.health, HealthLabel::Critical);
        assert!(outcome.recommendation.unwrap().contains("accumulating"));
    }

    #[test]
    fn test_pending_writes_at_limit_is_fine() {
        let now = Utc::now();
        let outcome = analyze_sync_health_at(&observe(true, 10, Some(now)), now);
        assert_eq!(outcome.severity, AnomalySeverity::Low);
    }

    #[test]
    fn test_never_synced_is_medium() {
        let outcome = analyze_sync_health_at(&observe(true, 2, None), Utc::now());
        assert_eq!(outcome.severity, AnomalySeverity::Medium);
        assert!(outcome.recommendation.unwrap().contains("Never synced"));
    }

    #[test]
    fn test_stale_sync_is_medium_at_any_age() {
        let now = Utc::now();
        let exactly_hour = analyze_sync_health_at(&observe(true, 0, Some(now - TimeDelta::hours(1))), now);
        assert_eq!(exactly_hour.severity, AnomalySeverity::Low);

        let two_hours = analyze_sync_health_at(&observe(true, 0, Some(now - TimeDelta::hours(2))), now);
        assert_eq!(two_hours.severity, AnomalySeverity::Medium);

        let two_days = analyze_sync_health_at(&observe(true, 0, Some(now - TimeDelta::days(2))), now);
        assert_eq!(two_days.severity, AnomalySeverity::Medium);
        assert_eq!(two_days.health, HealthLabel::Caution);

        let future = analyze_sync_health_at(&observe(true, 0, Some(now + TimeDelta::hours(3))), now);
        assert_eq!(future.severity, AnomalySeverity::Low);
    }

    #[test]
    fn test_offline_outranks_staleness_on_tie() {
        let now = Utc::now();
        let outcome =
            analyze_sync_health_at(&observe(false, 0, Some(now - TimeDelta::hours(2))), now);
        assert_eq!(outcome.severity, AnomalySeverity::Medium);
        assert!(outcome.recommendation.unwrap().contains("check network connection"));
        assert_eq!(outcome.anomaly.unwrap().anomalies().len(), 2);
    }

    #[test]
    fn test_wall_clock_entry_point() {
        let outcome = analyze_sync_health(&observe(true, 0, Some(Utc::now())));
        assert!(outcome.is_healthy());
    }
}
