//! Control loop
//!
//! Pulls one sample per tick, scores and classifies it off the async
//! runtime, dispatches remediation for anomalies and publishes a
//! [`TickReport`]. Failures are contained to the tick that raised them.

use crate::collector::MetricCollector;
use crate::detection::{Detection, DetectionEngine};
use crate::health::{components, HealthRegistry};
use crate::models::{HostHealth, MetricSample, RemediationIntent};
use crate::observability::{AgentMetrics, StructuredLogger};
use crate::remediation::RemediationDispatcher;
use crate::store::MetricsStore;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tokio::time::Instant;
use tracing::{debug, info};

/// Default tick interval
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub interval: Duration,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
        }
    }
}

/// Outcome of one tick, as exposed to hosts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    pub tick: u64,
    pub timestamp: DateTime<Utc>,
    pub health: HostHealth,
    pub sample: Option<MetricSample>,
    pub detection: Option<Detection>,
    pub remediation: Option<RemediationIntent>,
    pub error: Option<String>,
}

/// Shared slot holding the latest tick report
#[derive(Debug, Clone, Default)]
pub struct TickReportHandle {
    latest: Arc<RwLock<Option<TickReport>>>,
}

impl TickReportHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn latest(&self) -> Option<TickReport> {
        self.latest.read().await.clone()
    }

    pub async fn publish(&self, report: TickReport) {
        *self.latest.write().await = Some(report);
    }
}

/// Time left in the current period; zero once processing overran it
pub fn cadence_delay(interval: Duration, elapsed: Duration) -> Duration {
    interval.saturating_sub(elapsed)
}

pub struct ControlLoop {
    collector: Arc<dyn MetricCollector>,
    store: Arc<dyn MetricsStore>,
    engine: Arc<DetectionEngine>,
    dispatcher: Arc<RemediationDispatcher>,
    health: HealthRegistry,
    reports: TickReportHandle,
    logger: StructuredLogger,
    metrics: AgentMetrics,
    config: LoopConfig,
    tick: u64,
}

impl ControlLoop {
    /// Run until a shutdown signal arrives. Shutdown is honoured between
    /// ticks, never in the middle of one.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            interval_ms = self.config.interval.as_millis() as u64,
            "Starting control loop"
        );
        self.health.register(components::CONTROL_LOOP).await;
        self.health.register(components::COLLECTOR).await;
        self.health.register(components::STORE).await;
        self.health.register(components::MODELS).await;
        self.health.set_ready(true).await;

        loop {
            let started = Instant::now();
            self.tick().await;

            let delay = cadence_delay(self.config.interval, started.elapsed());
            if delay.is_zero() {
                debug!(tick = self.tick, "Tick overran interval, starting next immediately");
            }

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.recv() => {
                    info!(ticks = self.tick, "Shutting down control loop");
                    break;
                }
            }
        }

        self.health.set_ready(false).await;
    }

    /// Run a single tick and publish its report. Never fails.
    pub async fn tick(&mut self) -> TickReport {
        self.tick += 1;
        let started = Instant::now();

        let report = match self.collector.collect().await {
            Ok(sample) => {
                self.health.set_healthy(components::COLLECTOR).await;
                self.process(sample).await
            }
            Err(e) => {
                self.metrics.inc_collector_failures();
                self.health
                    .set_degraded(components::COLLECTOR, format!("{:#}", e))
                    .await;
                self.failed_report(None, format!("metrics unavailable: {:#}", e))
            }
        };

        self.metrics
            .observe_tick_latency(started.elapsed().as_secs_f64());
        self.reports.publish(report.clone()).await;
        report
    }

    async fn process(&self, sample: MetricSample) -> TickReport {
        match self.evaluate(sample.clone()).await {
            Ok((detection, remediation)) => {
                self.health.set_healthy(components::STORE).await;
                self.health.set_healthy(components::CONTROL_LOOP).await;
                self.update_model_health(&detection).await;
                self.record(&detection, remediation.as_ref());

                TickReport {
                    tick: self.tick,
                    timestamp: Utc::now(),
                    health: HostHealth::from_sample(Some(&sample)),
                    sample: Some(sample),
                    detection: Some(detection),
                    remediation,
                    error: None,
                }
            }
            Err(e) => {
                self.health
                    .set_degraded(components::CONTROL_LOOP, format!("{:#}", e))
                    .await;
                self.failed_report(Some(sample), format!("{:#}", e))
            }
        }
    }

    /// Store the sample, then score, classify and remediate on the
    /// blocking pool so model training never stalls the runtime
    async fn evaluate(
        &self,
        sample: MetricSample,
    ) -> Result<(Detection, Option<RemediationIntent>)> {
        if let Err(e) = self.store.append(sample.clone()) {
            self.health
                .set_unhealthy(components::STORE, e.to_string())
                .await;
            return Err(e).context("Failed to store sample");
        }
        if let Ok(count) = self.store.count() {
            self.metrics.set_samples_stored(count);
        }

        let engine = Arc::clone(&self.engine);
        let dispatcher = Arc::clone(&self.dispatcher);

        tokio::task::spawn_blocking(move || -> Result<_> {
            let detection = engine.analyze(&sample).context("Detection failed")?;
            let remediation = match &detection {
                Detection::Anomaly { severity, .. } => Some(dispatcher.dispatch(
                    *severity,
                    &sample.service_id,
                    &sample.node_id,
                )),
                _ => None,
            };
            Ok((detection, remediation))
        })
        .await
        .context("Evaluation task panicked")?
    }

    /// Past warm-up the forecaster should exist; without it risk loses a term
    async fn update_model_health(&self, detection: &Detection) {
        if matches!(detection, Detection::Warmup { .. }) {
            return;
        }
        if self.engine.risk_engine().models().has_forecast_model() {
            self.health.set_healthy(components::MODELS).await;
        } else {
            self.health
                .set_degraded(components::MODELS, "Forecast model unavailable")
                .await;
        }
    }

    fn record(&self, detection: &Detection, remediation: Option<&RemediationIntent>) {
        self.metrics.set_risk_score(detection.risk());

        match detection {
            Detection::Warmup { risk, progress } => {
                self.metrics.set_warmup_progress(*progress);
                self.logger.log_warmup(*progress, *risk);
            }
            Detection::Healthy { risk, future_cpu } => {
                self.metrics.set_warmup_progress(100.0);
                self.logger.log_healthy(*risk, *future_cpu);
            }
            Detection::Anomaly {
                severity,
                risk,
                eta_minutes,
                incident_id,
                root_cause,
            } => {
                self.metrics.set_warmup_progress(100.0);
                self.metrics.inc_incidents_opened(*severity);
                self.logger
                    .log_incident_opened(*incident_id, *severity, *risk, *eta_minutes, root_cause);
            }
        }

        if let Some(intent) = remediation {
            self.metrics.inc_remediations(intent);
            self.logger.log_remediation(intent);
        }
    }

    fn failed_report(&self, sample: Option<MetricSample>, error: String) -> TickReport {
        self.metrics.inc_tick_errors();
        self.logger.log_tick_failed(self.tick, &error);

        TickReport {
            tick: self.tick,
            timestamp: Utc::now(),
            health: HostHealth::from_sample(sample.as_ref()),
            sample,
            detection: None,
            remediation: None,
            error: Some(error),
        }
    }
}

/// Builder for the control loop
pub struct ControlLoopBuilder {
    collector: Option<Arc<dyn MetricCollector>>,
    store: Option<Arc<dyn MetricsStore>>,
    engine: Option<Arc<DetectionEngine>>,
    dispatcher: Option<Arc<RemediationDispatcher>>,
    health: Option<HealthRegistry>,
    logger: Option<StructuredLogger>,
    config: LoopConfig,
}

impl ControlLoopBuilder {
    pub fn new() -> Self {
        Self {
            collector: None,
            store: None,
            engine: None,
            dispatcher: None,
            health: None,
            logger: None,
            config: LoopConfig::default(),
        }
    }

    pub fn collector(mut self, collector: Arc<dyn MetricCollector>) -> Self {
        self.collector = Some(collector);
        self
    }

    /// The store the detection engine reads from
    pub fn store(mut self, store: Arc<dyn MetricsStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn engine(mut self, engine: Arc<DetectionEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn dispatcher(mut self, dispatcher: Arc<RemediationDispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn health(mut self, health: HealthRegistry) -> Self {
        self.health = Some(health);
        self
    }

    pub fn logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.config.interval = interval;
        self
    }

    /// Build the loop plus a handle for reading its latest report
    pub fn build(self) -> Result<(ControlLoop, TickReportHandle)> {
        let collector = self
            .collector
            .ok_or_else(|| anyhow::anyhow!("Collector is required"))?;
        let store = self
            .store
            .ok_or_else(|| anyhow::anyhow!("Metrics store is required"))?;
        let engine = self
            .engine
            .ok_or_else(|| anyhow::anyhow!("Detection engine is required"))?;

        let reports = TickReportHandle::new();
        let control_loop = ControlLoop {
            collector,
            store,
            engine,
            dispatcher: self.dispatcher.unwrap_or_default(),
            health: self.health.unwrap_or_default(),
            reports: reports.clone(),
            logger: self
                .logger
                .unwrap_or_else(|| StructuredLogger::new("unknown", "unknown")),
            metrics: AgentMetrics::new(),
            config: self.config,
            tick: 0,
        };

        Ok((control_loop, reports))
    }
}

impl Default for ControlLoopBuilder {
    fn default() -> Self {
        Self::new()
    }
}
