//! Agent library for predictive health monitoring
//!
//! This crate provides the core functionality for:
//! - Metric collection and history storage
//! - Failure-risk scoring from stress, anomaly detection and forecasting
//! - Severity classification with incident lifecycle management
//! - Remediation dispatch
//! - The control loop tying these together, plus health and observability

pub mod collector;
pub mod detection;
pub mod error;
pub mod health;
pub mod incident;
pub mod model;
pub mod models;
pub mod observability;
pub mod remediation;
pub mod risk;
pub mod scheduler;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use detection::{Detection, DetectionEngine};
pub use error::SentinelError;
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use incident::{IncidentManager, ResolveOutcome};
pub use models::*;
pub use observability::{AgentMetrics, StructuredLogger};
pub use scheduler::{ControlLoop, ControlLoopBuilder, TickReport, TickReportHandle};
