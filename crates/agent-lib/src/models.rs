//! Core data models for the monitoring agent

use crate::error::SentinelError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One sample of resource and service metrics for a service on a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub timestamp: DateTime<Utc>,
    pub node_id: String,
    pub service_id: String,
    /// CPU usage in percent (0-100)
    pub cpu_usage: f64,
    /// Memory usage in percent (0-100)
    pub memory_usage: f64,
    /// Disk usage in percent (0-100)
    pub disk_usage: f64,
    pub response_time_ms: f64,
    /// Fraction of failed requests (0-1)
    pub error_rate: f64,
}

impl MetricSample {
    /// Feature vector used by the anomaly model
    pub fn features(&self) -> [f64; 5] {
        [
            self.cpu_usage,
            self.memory_usage,
            self.disk_usage,
            self.response_time_ms,
            self.error_rate,
        ]
    }
}

/// Incident severity, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Low => write!(f, "LOW"),
            Severity::Medium => write!(f, "MEDIUM"),
            Severity::High => write!(f, "HIGH"),
            Severity::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Incident lifecycle state. Transitions are one-way: Open -> Resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IncidentStatus {
    Open,
    Resolved,
}

impl fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IncidentStatus::Open => write!(f, "OPEN"),
            IncidentStatus::Resolved => write!(f, "RESOLVED"),
        }
    }
}

impl FromStr for IncidentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "open" => Ok(IncidentStatus::Open),
            "resolved" => Ok(IncidentStatus::Resolved),
            other => Err(format!("unknown incident status '{}'", other)),
        }
    }
}

/// Store-assigned incident identifier (always positive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IncidentId(pub u64);

impl fmt::Display for IncidentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for IncidentId {
    type Err = SentinelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().parse::<u64>() {
            Ok(0) | Err(_) => Err(SentinelError::InvalidIncidentId(s.to_string())),
            Ok(id) => Ok(IncidentId(id)),
        }
    }
}

/// A recorded incident
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub id: IncidentId,
    pub service_id: String,
    pub node_id: String,
    pub severity: Severity,
    pub root_cause: String,
    pub status: IncidentStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Incident fields supplied on creation; the store assigns the id
#[derive(Debug, Clone)]
pub struct NewIncident {
    pub service_id: String,
    pub node_id: String,
    pub severity: Severity,
    pub root_cause: String,
    pub created_at: DateTime<Utc>,
}

/// Per-tick risk estimate. Never cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Composite risk in [0, 100]
    pub risk_score: f64,
    /// Mean forecast CPU over the forecast horizon, when a forecast exists
    pub future_cpu: Option<f64>,
    pub warmup: bool,
    /// Warm-up progress in [0, 100]
    pub progress: f64,
}

/// Remediation action decided for a severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RemediationAction {
    None,
    Scale,
    Restart,
    EmergencyShutdown,
}

impl fmt::Display for RemediationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemediationAction::None => write!(f, "none"),
            RemediationAction::Scale => write!(f, "scale"),
            RemediationAction::Restart => write!(f, "restart"),
            RemediationAction::EmergencyShutdown => write!(f, "emergency_shutdown"),
        }
    }
}

/// Outcome reported by the remediation dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemediationStatus {
    Success,
    NoActionNeeded,
    Failed,
}

/// Decided remediation plus its acknowledgement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemediationIntent {
    pub action: RemediationAction,
    pub service_id: String,
    pub node_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replicas: Option<u32>,
    pub status: RemediationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Coarse host health derived from the most recent sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthState {
    Healthy,
    Degraded,
    Critical,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostHealth {
    pub status: HealthState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_score: Option<f64>,
}

impl HostHealth {
    /// Score is `100 - cpu`; without a sample the health is unknown
    pub fn from_sample(sample: Option<&MetricSample>) -> Self {
        let Some(sample) = sample else {
            return Self {
                status: HealthState::Unknown,
                health_score: None,
            };
        };

        let score = (100.0 - sample.cpu_usage).max(0.0);
        let status = if score > 70.0 {
            HealthState::Healthy
        } else if score > 40.0 {
            HealthState::Degraded
        } else {
            HealthState::Critical
        };

        Self {
            status,
            health_score: Some(score),
        }
    }
}
