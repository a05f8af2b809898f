//! Agent configuration
//!
//! Values come from an optional config file (path in `SENTINEL_CONFIG`)
//! overridden by `SENTINEL_*` environment variables, e.g.
//! `SENTINEL_INTERVAL_SECS=10`.

use agent_lib::model::ModelCacheConfig;
use agent_lib::risk::{RiskConfig, Thresholds};
use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_PREFIX: &str = "SENTINEL";
pub const CONFIG_PATH_ENV: &str = "SENTINEL_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub node_id: String,
    pub service_id: String,

    /// API server port for health, metrics and incidents
    pub api_port: u16,

    /// Control loop cadence
    pub interval_secs: u64,

    /// History required before the models are consulted
    pub warmup_samples: usize,

    /// Minimum forecaster age before retraining
    pub retrain_interval_secs: u64,

    pub high_cpu: f64,
    pub critical_cpu: f64,
    pub mem_critical: f64,
    pub error_critical: f64,

    /// Consecutive high-CPU samples that count as sustained
    pub sustained_count: usize,

    /// Replicas requested by a SCALE remediation
    pub default_replicas: u32,

    /// Reuse an open incident with the same service, node and severity
    pub dedupe_open_incidents: bool,

    /// Metric samples kept in memory
    pub metrics_retention: usize,

    /// Replay samples from this JSON-lines file instead of probing the host
    pub replay_file: Option<PathBuf>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        let thresholds = Thresholds::default();
        Self {
            node_id: std::env::var("NODE_NAME").unwrap_or_else(|_| "local".to_string()),
            service_id: "default".to_string(),
            api_port: 8080,
            interval_secs: 5,
            warmup_samples: agent_lib::risk::DEFAULT_WARMUP_SAMPLES,
            retrain_interval_secs: 300,
            high_cpu: thresholds.high_cpu,
            critical_cpu: thresholds.critical_cpu,
            mem_critical: thresholds.mem_critical,
            error_critical: thresholds.error_critical,
            sustained_count: agent_lib::detection::DEFAULT_SUSTAINED_COUNT,
            default_replicas: agent_lib::remediation::DEFAULT_SCALE_REPLICAS,
            dedupe_open_incidents: false,
            metrics_retention: agent_lib::store::DEFAULT_RETENTION,
            replay_file: None,
        }
    }
}

impl AgentConfig {
    /// Load from the file named by `SENTINEL_CONFIG` (if set) and the environment
    pub fn load() -> Result<Self> {
        let file = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
        Self::load_with(file.as_deref(), ENV_PREFIX)
    }

    pub fn load_with(file: Option<&Path>, env_prefix: &str) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(config::Environment::with_prefix(env_prefix).try_parsing(true));

        let config: AgentConfig = builder
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.interval_secs > 0, "interval_secs must be positive");
        ensure!(
            self.high_cpu <= self.critical_cpu,
            "high_cpu ({}) must not exceed critical_cpu ({})",
            self.high_cpu,
            self.critical_cpu
        );
        ensure!(
            self.mem_critical > 0.0 && self.error_critical > 0.0 && self.critical_cpu > 0.0,
            "critical thresholds must be positive"
        );
        ensure!(self.metrics_retention > 0, "metrics_retention must be positive");
        ensure!(
            self.metrics_retention >= self.warmup_samples,
            "metrics_retention ({}) is smaller than warmup_samples ({})",
            self.metrics_retention,
            self.warmup_samples
        );
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            high_cpu: self.high_cpu,
            critical_cpu: self.critical_cpu,
            mem_critical: self.mem_critical,
            error_critical: self.error_critical,
            ..Thresholds::default()
        }
    }

    pub fn risk_config(&self) -> RiskConfig {
        RiskConfig {
            warmup_samples: self.warmup_samples,
            thresholds: self.thresholds(),
        }
    }

    pub fn model_cache_config(&self) -> ModelCacheConfig {
        ModelCacheConfig {
            retrain_interval: Duration::from_secs(self.retrain_interval_secs),
            ..ModelCacheConfig::default()
        }
    }
}
