//! Wiring of the monitoring pipeline from configuration

use crate::api::AppState;
use crate::config::AgentConfig;
use agent_lib::collector::{HostCollector, MetricCollector, ReplayCollector};
use agent_lib::detection::{MetricSelector, SustainedCondition};
use agent_lib::model::ModelCache;
use agent_lib::remediation::{RemediationDispatcher, SimulatedActuator};
use agent_lib::risk::RiskEngine;
use agent_lib::store::{InMemoryIncidentStore, InMemoryMetricsStore, MetricsStore};
use agent_lib::{
    ControlLoop, ControlLoopBuilder, DetectionEngine, HealthRegistry, IncidentManager,
    StructuredLogger,
};
use anyhow::Result;
use std::sync::Arc;

/// A fully assembled agent: the control loop plus the state the API serves
pub struct Agent {
    pub control_loop: ControlLoop,
    pub state: Arc<AppState>,
    pub logger: StructuredLogger,
}

impl Agent {
    pub fn build(config: &AgentConfig) -> Result<Self> {
        Self::build_with_collector(config, collector_for(config)?)
    }

    /// Assemble the pipeline around an explicit collector
    pub fn build_with_collector(
        config: &AgentConfig,
        collector: Arc<dyn MetricCollector>,
    ) -> Result<Self> {
        let store = Arc::new(InMemoryMetricsStore::new(config.metrics_retention));
        let models = Arc::new(ModelCache::new(store.clone(), config.model_cache_config()));
        let risk = RiskEngine::new(store.clone(), models.clone(), config.risk_config());

        let incidents = Arc::new(
            IncidentManager::new(Arc::new(InMemoryIncidentStore::new()))
                .with_deduplication(config.dedupe_open_incidents),
        );
        let sustained =
            SustainedCondition::new(MetricSelector::Cpu, config.high_cpu, config.sustained_count);
        let engine = Arc::new(DetectionEngine::new(
            risk,
            sustained,
            incidents.clone(),
            store.clone(),
        ));

        let dispatcher = Arc::new(
            RemediationDispatcher::new(Arc::new(SimulatedActuator))
                .with_default_replicas(config.default_replicas),
        );
        let health = HealthRegistry::new();
        let logger = StructuredLogger::new(&config.node_id, &config.service_id);

        let (control_loop, reports) = ControlLoopBuilder::new()
            .collector(collector)
            .store(store.clone())
            .engine(engine)
            .dispatcher(dispatcher)
            .health(health.clone())
            .logger(logger.clone())
            .interval(config.interval())
            .build()?;

        let metrics_store: Arc<dyn MetricsStore> = store;
        let state = Arc::new(AppState {
            health,
            reports,
            incidents,
            metrics_store,
            models,
        });

        Ok(Self {
            control_loop,
            state,
            logger,
        })
    }
}

/// Replay a recorded trace when one is configured, otherwise probe the host
pub fn collector_for(config: &AgentConfig) -> Result<Arc<dyn MetricCollector>> {
    match &config.replay_file {
        Some(path) => Ok(Arc::new(ReplayCollector::from_file(path)?)),
        None => Ok(Arc::new(HostCollector::new(
            &config.node_id,
            &config.service_id,
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_lib::detection::Detection;
    use std::io::Write;

    fn replay_config(lines: &[f64]) -> (tempfile::NamedTempFile, AgentConfig) {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for cpu in lines {
            writeln!(
                file,
                r#"{{"timestamp":"2026-01-01T00:00:00Z","node_id":"node-a","service_id":"api","cpu_usage":{},"memory_usage":40.0,"disk_usage":50.0,"response_time_ms":100.0,"error_rate":0.01}}"#,
                cpu
            )
            .unwrap();
        }
        let config = AgentConfig {
            node_id: "node-a".to_string(),
            service_id: "api".to_string(),
            replay_file: Some(file.path().to_path_buf()),
            warmup_samples: 2,
            ..Default::default()
        };
        (file, config)
    }

    #[test]
    fn test_missing_replay_file_fails() {
        let config = AgentConfig {
            replay_file: Some("/nonexistent/trace.jsonl".into()),
            ..Default::default()
        };
        assert!(collector_for(&config).is_err());
    }

    #[tokio::test]
    async fn test_replayed_samples_drive_the_pipeline() {
        let (_file, config) = replay_config(&[20.0, 25.0, 30.0]);
        let mut agent = Agent::build(&config).unwrap();

        let first = agent.control_loop.tick().await;
        assert!(matches!(first.detection, Some(Detection::Warmup { .. })));

        agent.control_loop.tick().await;
        let third = agent.control_loop.tick().await;
        assert!(matches!(third.detection, Some(Detection::Healthy { .. })));
        assert_eq!(third.sample.unwrap().service_id, "api");

        assert_eq!(agent.state.metrics_store.count().unwrap(), 3);
        assert_eq!(agent.state.reports.latest().await.unwrap().tick, 3);

        let exhausted = agent.control_loop.tick().await;
        assert!(exhausted.error.is_some());
    }
}
