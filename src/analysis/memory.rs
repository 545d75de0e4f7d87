use super::{AnalysisOutcome, Finding, summarize};
use crate::domain::{Anomaly, AnomalySeverity};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DETECTION_METHOD: &str = "memory_pressure_thresholds";

const MB: u64 = 1024 * 1024;

pub const HIGH_MEMORY_BYTES: u64 = 300 * MB;
pub const MAX_LOADED_RESOURCES: usize = 10;
pub const MAX_CACHE_BYTES: u64 = 50 * MB;

pub const MEDIUM_TIER_BYTES: u64 = 200 * MB;
pub const HIGH_TIER_BYTES: u64 = 500 * MB;

const RANK_MEMORY: u8 = 3;
const RANK_RESOURCES: u8 = 2;
const RANK_CACHE: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryObservation {
    pub resident_bytes: u64,
    /// Decoded resources held in memory, such as photos.
    pub loaded_resources: usize,
    pub cache_bytes: u64,
}

/// Coarse memory label for callers that do not need a full anomaly record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryTier {
    Low,
    Medium,
    High,
}

impl MemoryTier {
    pub fn classify(resident_bytes: u64) -> Self {
        if resident_bytes < MEDIUM_TIER_BYTES {
            MemoryTier::Low
        } else if resident_bytes < HIGH_TIER_BYTES {
            MemoryTier::Medium
        } else {
            MemoryTier::High
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MemoryTier::Low => "low",
            MemoryTier::Medium => "medium",
            MemoryTier::High => "high",
        }
    }
}

impl fmt::Display for MemoryTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn megabytes(bytes: u64) -> f64 {
    bytes as f64 / MB as f64
}

pub fn analyze_memory(observation: &MemoryObservation) -> AnalysisOutcome {
    let mut findings = Vec::new();

    if observation.resident_bytes > HIGH_MEMORY_BYTES {
        findings.push(Finding {
            anomaly: Anomaly {
                category: "memory_usage".to_string(),
                description: format!(
                    "Resident memory {:.1}MB exceeds {:.0}MB",
                    megabytes(observation.resident_bytes),
                    megabytes(HIGH_MEMORY_BYTES)
                ),
                observed_value: observation.resident_bytes as f64,
                threshold: HIGH_MEMORY_BYTES as f64,
                impact: "The OS may terminate the app under pressure".to_string(),
                severity: AnomalySeverity::High,
            },
            rank: RANK_MEMORY,
            recommendation: "Memory usage high; release unused resources",
        });
    }

    if observation.loaded_resources > MAX_LOADED_RESOURCES {
        findings.push(Finding {
            anomaly: Anomaly {
                category: "loaded_resources".to_string(),
                description: format!(
                    "{} resources loaded, limit is {MAX_LOADED_RESOURCES}",
                    observation.loaded_resources
                ),
                observed_value: observation.loaded_resources as f64,
                threshold: MAX_LOADED_RESOURCES as f64,
                impact: "Each decoded resource holds memory until released".to_string(),
                severity: AnomalySeverity::Medium,
            },
            rank: RANK_RESOURCES,
            recommendation: "Too many resources loaded; unload items that are off screen",
        });
    }

    if observation.cache_bytes > MAX_CACHE_BYTES {
        findings.push(Finding {
            anomaly: Anomaly {
                category: "cache_size".to_string(),
                description: format!(
                    "Cache {:.1}MB exceeds {:.0}MB",
                    megabytes(observation.cache_bytes),
                    megabytes(MAX_CACHE_BYTES)
                ),
                observed_value: observation.cache_bytes as f64,
                threshold: MAX_CACHE_BYTES as f64,
                impact: "Cache growth competes with working memory".to_string(),
                severity: AnomalySeverity::Medium,
            },
            rank: RANK_CACHE,
            recommendation: "Cache is large; clear cached data",
        });
    }

    summarize(DETECTION_METHOD, findings, 0.85)
}
