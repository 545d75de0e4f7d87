use super::{AnalysisOutcome, Finding, summarize};
use crate::domain::{Anomaly, AnomalySeverity};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DETECTION_METHOD: &str = "location_quality_thresholds";

/// Fixes coarser than this (in meters) are considered degraded.
pub const MAX_HORIZONTAL_ACCURACY: f64 = 100.0;
pub const LOW_BATTERY_LEVEL: f64 = 0.20;
/// Battery level reported by simulators and devices without a battery.
pub const SIMULATED_BATTERY_LEVEL: f64 = -1.0;
pub const MAX_TRACKING_DURATION: Duration = Duration::from_secs(2 * 60 * 60);

// Tie-break among equal severities: battery > duration > accuracy.
const RANK_BATTERY: u8 = 3;
const RANK_DURATION: u8 = 2;
const RANK_ACCURACY: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationObservation {
    pub position: Coordinate,
    /// Radius of uncertainty in meters.
    pub horizontal_accuracy: f64,
    /// Fraction in [0, 1], or exactly -1 when unavailable.
    pub battery_level: f64,
    pub tracking_duration: Duration,
}

impl LocationObservation {
    pub fn battery_is_simulated(&self) -> bool {
        self.battery_level == SIMULATED_BATTERY_LEVEL
    }
}

pub fn analyze_location(observation: &LocationObservation) -> AnalysisOutcome {
    let mut findings = Vec::new();

    if observation.horizontal_accuracy > MAX_HORIZONTAL_ACCURACY {
        findings.push(Finding {
            anomaly: Anomaly {
                category: "gps_accuracy".to_string(),
                description: format!(
                    "Horizontal accuracy {:.1}m at ({:.5}, {:.5}) exceeds {MAX_HORIZONTAL_ACCURACY}m",
                    observation.horizontal_accuracy,
                    observation.position.latitude,
                    observation.position.longitude
                ),
                observed_value: observation.horizontal_accuracy,
                threshold: MAX_HORIZONTAL_ACCURACY,
                impact: "Recorded distance and route may drift".to_string(),
                severity: AnomalySeverity::Medium,
            },
            rank: RANK_ACCURACY,
            recommendation: "GPS accuracy degraded; recommend outdoor use with a clear view of the sky",
        });
    }

    if !observation.battery_is_simulated() && observation.battery_level < LOW_BATTERY_LEVEL {
        findings.push(Finding {
            anomaly: Anomaly {
                category: "battery_level".to_string(),
                description: format!(
                    "Battery at {:.0}% is below {:.0}%",
                    observation.battery_level * 100.0,
                    LOW_BATTERY_LEVEL * 100.0
                ),
                observed_value: observation.battery_level,
                threshold: LOW_BATTERY_LEVEL,
                impact: "Tracking may stop when the device powers down".to_string(),
                severity: AnomalySeverity::High,
            },
            rank: RANK_BATTERY,
            recommendation: "Battery low; recommend charging before continuing to track",
        });
    }

    if observation.tracking_duration > MAX_TRACKING_DURATION {
        findings.push(Finding {
            anomaly: Anomaly {
                category: "tracking_duration".to_string(),
                description: format!(
                    "Tracking has run for {}s, longer than {}s",
                    observation.tracking_duration.as_secs(),
                    MAX_TRACKING_DURATION.as_secs()
                ),
                observed_value: observation.tracking_duration.as_secs_f64(),
                threshold: MAX_TRACKING_DURATION.as_secs_f64(),
                impact: "Continuous GPS use drains the battery".to_string(),
                severity: AnomalySeverity::Medium,
            },
            rank: RANK_DURATION,
            recommendation: "Extended tracking increases battery drain; consider ending the session",
        });
    }

    let confidence = if observation.battery_is_simulated() {
        0.8
    } else {
        0.95
    };
    summarize(DETECTION_METHOD, findings, confidence)
}
