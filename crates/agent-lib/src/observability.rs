//! Observability infrastructure for the monitoring agent
//!
//! Provides:
//! - Prometheus metrics (tick latency, risk, incidents, remediations, model trainings)
//! - Structured JSON logging of control-loop events with tracing

use crate::model::ModelKind;
use crate::models::{IncidentId, RemediationIntent, RemediationStatus, Severity};
use prometheus::{
    register_gauge, register_histogram, register_int_counter, register_int_counter_vec,
    register_int_gauge, Gauge, Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{error, info, warn};

/// Histogram buckets for tick latency (in seconds)
const TICK_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<AgentMetricsInner> = OnceLock::new();

struct AgentMetricsInner {
    tick_latency_seconds: Histogram,
    risk_score: Gauge,
    warmup_progress: Gauge,
    incidents_opened: IntCounterVec,
    remediations: IntCounterVec,
    model_trainings: IntCounterVec,
    tick_errors: IntCounter,
    collector_failures: IntCounter,
    samples_stored: IntGauge,
}

impl AgentMetricsInner {
    fn new() -> Self {
        Self {
            tick_latency_seconds: register_histogram!(
                "sentinel_agent_tick_latency_seconds",
                "Time spent on one control-loop tick",
                TICK_LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register tick_latency_seconds"),

            risk_score: register_gauge!(
                "sentinel_agent_risk_score",
                "Composite failure risk of the latest sample (0-100)"
            )
            .expect("Failed to register risk_score"),

            warmup_progress: register_gauge!(
                "sentinel_agent_warmup_progress_percent",
                "Warm-up progress towards the required history"
            )
            .expect("Failed to register warmup_progress"),

            incidents_opened: register_int_counter_vec!(
                "sentinel_agent_incidents_opened_total",
                "Incidents opened by the detection engine",
                &["severity"]
            )
            .expect("Failed to register incidents_opened"),

            remediations: register_int_counter_vec!(
                "sentinel_agent_remediations_total",
                "Remediation intents dispatched",
                &["action", "status"]
            )
            .expect("Failed to register remediations"),

            model_trainings: register_int_counter_vec!(
                "sentinel_agent_model_trainings_total",
                "Model training passes",
                &["kind", "outcome"]
            )
            .expect("Failed to register model_trainings"),

            tick_errors: register_int_counter!(
                "sentinel_agent_tick_errors_total",
                "Ticks abandoned because of an error"
            )
            .expect("Failed to register tick_errors"),

            collector_failures: register_int_counter!(
                "sentinel_agent_collector_failures_total",
                "Ticks without a metric sample"
            )
            .expect("Failed to register collector_failures"),

            samples_stored: register_int_gauge!(
                "sentinel_agent_samples_stored",
                "Metric samples retained in the store"
            )
            .expect("Failed to register samples_stored"),
        }
    }
}

/// Agent metrics for Prometheus exposition
///
/// A lightweight handle to the global metrics instance; clones share the
/// same underlying metrics.
#[derive(Clone)]
pub struct AgentMetrics {
    _private: (),
}

impl Default for AgentMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(AgentMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &AgentMetricsInner {
        GLOBAL_METRICS.get_or_init(AgentMetricsInner::new)
    }

    pub fn observe_tick_latency(&self, duration_secs: f64) {
        self.inner().tick_latency_seconds.observe(duration_secs);
    }

    pub fn set_risk_score(&self, risk: f64) {
        self.inner().risk_score.set(risk);
    }

    pub fn set_warmup_progress(&self, progress: f64) {
        self.inner().warmup_progress.set(progress);
    }

    pub fn inc_incidents_opened(&self, severity: Severity) {
        self.inner()
            .incidents_opened
            .with_label_values(&[severity.to_string().as_str()])
            .inc();
    }

    pub fn inc_remediations(&self, intent: &RemediationIntent) {
        let status = match intent.status {
            RemediationStatus::Success => "success",
            RemediationStatus::NoActionNeeded => "no_action_needed",
            RemediationStatus::Failed => "failed",
        };
        self.inner()
            .remediations
            .with_label_values(&[intent.action.to_string().as_str(), status])
            .inc();
    }

    pub fn inc_model_training(&self, kind: ModelKind, success: bool) {
        let outcome = if success { "success" } else { "failure" };
        self.inner()
            .model_trainings
            .with_label_values(&[kind.to_string().as_str(), outcome])
            .inc();
    }

    pub fn inc_tick_errors(&self) {
        self.inner().tick_errors.inc();
    }

    pub fn inc_collector_failures(&self) {
        self.inner().collector_failures.inc();
    }

    pub fn set_samples_stored(&self, count: usize) {
        self.inner().samples_stored.set(count as i64);
    }
}

/// Structured logger for control-loop events
///
/// Every event carries the node and service it concerns, so log
/// pipelines can group by either.
#[derive(Clone)]
pub struct StructuredLogger {
    node_id: String,
    service_id: String,
}

impl StructuredLogger {
    pub fn new(node_id: impl Into<String>, service_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            service_id: service_id.into(),
        }
    }

    pub fn log_startup(&self, version: &str, interval_secs: u64) {
        info!(
            event = "agent_started",
            node = %self.node_id,
            service = %self.service_id,
            agent_version = %version,
            interval_secs,
            "Monitoring agent started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "agent_shutdown",
            node = %self.node_id,
            service = %self.service_id,
            reason = %reason,
            "Monitoring agent shutting down"
        );
    }

    pub fn log_incident_opened(
        &self,
        incident_id: IncidentId,
        severity: Severity,
        risk: f64,
        eta_minutes: Option<u32>,
        root_cause: &str,
    ) {
        match severity {
            Severity::Critical => error!(
                event = "incident_opened",
                node = %self.node_id,
                service = %self.service_id,
                incident_id = %incident_id,
                severity = %severity,
                risk,
                eta_minutes = ?eta_minutes,
                root_cause = %root_cause,
                "Critical incident opened"
            ),
            _ => warn!(
                event = "incident_opened",
                node = %self.node_id,
                service = %self.service_id,
                incident_id = %incident_id,
                severity = %severity,
                risk,
                eta_minutes = ?eta_minutes,
                root_cause = %root_cause,
                "Incident opened"
            ),
        }
    }

    pub fn log_remediation(&self, intent: &RemediationIntent) {
        match intent.status {
            RemediationStatus::Failed => warn!(
                event = "remediation_dispatched",
                node = %self.node_id,
                service = %self.service_id,
                action = %intent.action,
                status = ?intent.status,
                message = ?intent.message,
                "Remediation failed"
            ),
            _ => info!(
                event = "remediation_dispatched",
                node = %self.node_id,
                service = %self.service_id,
                action = %intent.action,
                replicas = ?intent.replicas,
                status = ?intent.status,
                "Remediation dispatched"
            ),
        }
    }

    pub fn log_warmup(&self, progress: f64, risk: f64) {
        info!(
            event = "warmup_progress",
            node = %self.node_id,
            service = %self.service_id,
            progress = format_args!("{:.1}", progress),
            risk = format_args!("{:.1}", risk),
            "Collecting baseline history"
        );
    }

    pub fn log_healthy(&self, risk: f64, future_cpu: Option<f64>) {
        info!(
            event = "system_healthy",
            node = %self.node_id,
            service = %self.service_id,
            risk = format_args!("{:.1}", risk),
            future_cpu = ?future_cpu,
            "System healthy"
        );
    }

    pub fn log_tick_failed(&self, tick: u64, error: &str) {
        warn!(
            event = "tick_failed",
            node = %self.node_id,
            service = %self.service_id,
            tick,
            error = %error,
            "Tick abandoned, continuing"
        );
    }
}

/// Render every registered metric in the Prometheus text format
pub fn render_metrics() -> Result<String, prometheus::Error> {
    use prometheus::{Encoder, TextEncoder};

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&prometheus::gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RemediationAction;
    use chrono::Utc;

    #[test]
    fn test_metrics_are_rendered() {
        let metrics = AgentMetrics::new();
        metrics.observe_tick_latency(0.02);
        metrics.set_risk_score(42.0);
        metrics.inc_incidents_opened(Severity::High);
        metrics.inc_model_training(ModelKind::Forecast, true);
        metrics.inc_remediations(&RemediationIntent {
            action: RemediationAction::Restart,
            service_id: "svc-1".to_string(),
            node_id: "node-1".to_string(),
            replicas: None,
            status: RemediationStatus::Success,
            message: None,
            timestamp: Utc::now(),
        });

        let text = render_metrics().unwrap();
        assert!(text.contains("sentinel_agent_tick_latency_seconds"));
        assert!(text.contains("sentinel_agent_incidents_opened_total{severity=\"HIGH\"}"));
        assert!(text.contains("action=\"restart\""));
        assert!(text.contains("kind=\"forecast\""));
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("node-1", "svc-1");
        assert_eq!(logger.node_id, "node-1");
        assert_eq!(logger.service_id, "svc-1");
    }
}
