//! Remediation dispatch
//!
//! Maps incident severity to a corrective action and hands it to an
//! [`Actuator`]. The outcome is always reported; nothing is retried.

use crate::models::{RemediationAction, RemediationIntent, RemediationStatus, Severity};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

/// Replicas requested by a SCALE action
pub const DEFAULT_SCALE_REPLICAS: u32 = 2;

/// Executes a decided remediation
pub trait Actuator: Send + Sync {
    fn execute(&self, intent: &RemediationIntent) -> anyhow::Result<()>;
}

/// Logs the action and acknowledges it without touching infrastructure
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedActuator;

impl Actuator for SimulatedActuator {
    fn execute(&self, intent: &RemediationIntent) -> anyhow::Result<()> {
        match intent.action {
            RemediationAction::Scale => info!(
                service_id = %intent.service_id,
                replicas = intent.replicas.unwrap_or(DEFAULT_SCALE_REPLICAS),
                "Scaling service"
            ),
            RemediationAction::Restart => info!(
                service_id = %intent.service_id,
                node_id = %intent.node_id,
                "Restarting service"
            ),
            RemediationAction::EmergencyShutdown => warn!(
                service_id = %intent.service_id,
                node_id = %intent.node_id,
                "Emergency shutdown"
            ),
            RemediationAction::None => {}
        }
        Ok(())
    }
}

/// Action taken for each severity
pub fn action_for(severity: Severity) -> RemediationAction {
    match severity {
        Severity::Critical => RemediationAction::EmergencyShutdown,
        Severity::High => RemediationAction::Restart,
        Severity::Medium => RemediationAction::Scale,
        Severity::Low => RemediationAction::None,
    }
}

pub struct RemediationDispatcher {
    actuator: Arc<dyn Actuator>,
    default_replicas: u32,
}

impl RemediationDispatcher {
    pub fn new(actuator: Arc<dyn Actuator>) -> Self {
        Self {
            actuator,
            default_replicas: DEFAULT_SCALE_REPLICAS,
        }
    }

    pub fn with_default_replicas(mut self, replicas: u32) -> Self {
        self.default_replicas = replicas;
        self
    }

    pub fn dispatch(&self, severity: Severity, service_id: &str, node_id: &str) -> RemediationIntent {
        let action = action_for(severity);
        let mut intent = RemediationIntent {
            action,
            service_id: service_id.to_string(),
            node_id: node_id.to_string(),
            replicas: (action == RemediationAction::Scale).then_some(self.default_replicas),
            status: RemediationStatus::NoActionNeeded,
            message: None,
            timestamp: Utc::now(),
        };

        if action == RemediationAction::None {
            return intent;
        }

        match self.actuator.execute(&intent) {
            Ok(()) => intent.status = RemediationStatus::Success,
            Err(e) => {
                warn!(action = %action, service_id, error = %e, "Remediation failed");
                intent.status = RemediationStatus::Failed;
                intent.message = Some(format!("{:#}", e));
            }
        }
        intent
    }
}

impl Default for RemediationDispatcher {
    fn default() -> Self {
        Self::new(Arc::new(SimulatedActuator))
    }
}
