//! Detection: sustained conditions, severity and time-to-failure
//!
//! The engine turns a scored sample into one of three outcomes and opens
//! an incident for every anomaly.

mod engine;
mod sustained;

pub use engine::{estimate_time_to_failure, DetectionEngine};
pub use sustained::{MetricSelector, SustainedCondition, DEFAULT_SUSTAINED_COUNT};

use crate::models::{IncidentId, Severity};
use serde::{Deserialize, Serialize};

/// Outcome of analysing one sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Detection {
    Warmup {
        risk: f64,
        progress: f64,
    },
    Healthy {
        risk: f64,
        future_cpu: Option<f64>,
    },
    Anomaly {
        severity: Severity,
        risk: f64,
        /// Minutes until failure, when the heuristic has an opinion
        eta_minutes: Option<u32>,
        incident_id: IncidentId,
        root_cause: String,
    },
}

impl Detection {
    pub fn is_anomaly(&self) -> bool {
        matches!(self, Detection::Anomaly { .. })
    }

    pub fn risk(&self) -> f64 {
        match self {
            Detection::Warmup { risk, .. }
            | Detection::Healthy { risk, .. }
            | Detection::Anomaly { risk, .. } => *risk,
        }
    }
}
