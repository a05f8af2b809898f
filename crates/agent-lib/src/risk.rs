//! Composite failure-risk scoring
//!
//! Risk blends instantaneous stress with the anomaly flag and the CPU
//! forecast. Until enough history exists the engine stays in warm-up and
//! only reports stress and progress.

use crate::error::SentinelError;
use crate::model::ModelCache;
use crate::models::{MetricSample, RiskAssessment};
use crate::store::MetricsStore;
use std::sync::Arc;
use tracing::debug;

/// Samples required before models are consulted (30 minutes at 5s)
pub const DEFAULT_WARMUP_SAMPLES: usize = 360;

const CPU_WEIGHT: f64 = 30.0;
const MEMORY_WEIGHT: f64 = 25.0;
const ERROR_WEIGHT: f64 = 25.0;
const RESPONSE_TIME_WEIGHT: f64 = 20.0;
const ANOMALY_BONUS: f64 = 20.0;
const FORECAST_WEIGHT: f64 = 30.0;

/// Static thresholds shared by scoring, detection and the ETA heuristic
#[derive(Debug, Clone, PartialEq)]
pub struct Thresholds {
    pub high_cpu: f64,
    /// CPU level between high and critical that shortens the ETA
    pub elevated_cpu: f64,
    pub critical_cpu: f64,
    pub mem_critical: f64,
    pub error_critical: f64,
    pub response_time_critical_ms: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            high_cpu: 80.0,
            elevated_cpu: 85.0,
            critical_cpu: 90.0,
            mem_critical: 90.0,
            error_critical: 0.1,
            response_time_critical_ms: 500.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RiskConfig {
    pub warmup_samples: usize,
    pub thresholds: Thresholds,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            warmup_samples: DEFAULT_WARMUP_SAMPLES,
            thresholds: Thresholds::default(),
        }
    }
}

/// `value / limit` clamped to [0, 1]; NaN counts as no stress
fn ratio(value: f64, limit: f64) -> f64 {
    let r = value / limit;
    if r.is_nan() {
        0.0
    } else {
        r.clamp(0.0, 1.0)
    }
}

/// Weighted instantaneous stress in [0, 100]
pub fn weighted_stress(sample: &MetricSample, thresholds: &Thresholds) -> f64 {
    CPU_WEIGHT * ratio(sample.cpu_usage, thresholds.critical_cpu)
        + MEMORY_WEIGHT * ratio(sample.memory_usage, thresholds.mem_critical)
        + ERROR_WEIGHT * ratio(sample.error_rate, thresholds.error_critical)
        + RESPONSE_TIME_WEIGHT
            * ratio(sample.response_time_ms, thresholds.response_time_critical_ms)
}

pub struct RiskEngine {
    store: Arc<dyn MetricsStore>,
    models: Arc<ModelCache>,
    config: RiskConfig,
}

impl RiskEngine {
    pub fn new(store: Arc<dyn MetricsStore>, models: Arc<ModelCache>, config: RiskConfig) -> Self {
        Self {
            store,
            models,
            config,
        }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.config.thresholds
    }

    pub fn models(&self) -> &Arc<ModelCache> {
        &self.models
    }

    /// Score one sample. Only a store failure is an error.
    pub fn assess(&self, sample: &MetricSample) -> Result<RiskAssessment, SentinelError> {
        let stress = weighted_stress(sample, &self.config.thresholds);
        let warmup = self.config.warmup_samples;

        let available = self.store.recent(warmup)?.len();
        if available < warmup {
            let progress = if warmup == 0 {
                100.0
            } else {
                100.0 * available as f64 / warmup as f64
            };
            debug!(available, needed = warmup, progress, "Risk engine warming up");
            return Ok(RiskAssessment {
                risk_score: stress.clamp(0.0, 100.0),
                future_cpu: None,
                warmup: true,
                progress,
            });
        }

        let mut risk = stress;

        if let Some(model) = self.models.get_anomaly_model() {
            if model.is_outlier(sample) {
                debug!(cpu = sample.cpu_usage, "Sample flagged as outlier");
                risk += ANOMALY_BONUS;
            }
        }

        let future_cpu = self.models.get_forecast();
        if let Some(forecast) = future_cpu {
            risk += FORECAST_WEIGHT * ratio(forecast, self.config.thresholds.critical_cpu);
        }

        Ok(RiskAssessment {
            risk_score: risk.clamp(0.0, 100.0),
            future_cpu,
            warmup: false,
            progress: 100.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelCacheConfig;
    use crate::store::InMemoryMetricsStore;
    use crate::testing::{sample_with_cpu, AlwaysOutlierTrainer, FailingTrainer};

    fn engine_with_history(
        n: usize,
        warmup_samples: usize,
    ) -> (Arc<InMemoryMetricsStore>, RiskEngine) {
        let store = Arc::new(InMemoryMetricsStore::new(10_000));
        for _ in 0..n {
            store.append(sample_with_cpu(30.0)).unwrap();
        }
        let models = Arc::new(ModelCache::new(store.clone(), ModelCacheConfig::default()));
        let config = RiskConfig {
            warmup_samples,
            ..Default::default()
        };
        (store.clone(), RiskEngine::new(store, models, config))
    }

    #[test]
    fn test_weighted_stress() {
        let thresholds = Thresholds::default();
        let mut sample = sample_with_cpu(45.0);
        sample.memory_usage = 45.0;
        sample.error_rate = 0.05;
        sample.response_time_ms = 250.0;

        // Every ratio is one half
        assert!((weighted_stress(&sample, &thresholds) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_stress_clamps_each_ratio() {
        let thresholds = Thresholds::default();
        let mut sample = sample_with_cpu(500.0);
        sample.memory_usage = -20.0;
        sample.error_rate = 3.0;
        sample.response_time_ms = f64::NAN;

        assert!((weighted_stress(&sample, &thresholds) - 55.0).abs() < 1e-9);
    }

    #[test]
    fn test_warmup_progress_is_linear() {
        for count in [0usize, 1, 90, 180, 359] {
            let (_, engine) = engine_with_history(count, 360);
            let assessment = engine.assess(&sample_with_cpu(70.0)).unwrap();

            assert!(assessment.warmup);
            assert!(assessment.future_cpu.is_none());
            let expected = 100.0 * count as f64 / 360.0;
            assert!((assessment.progress - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn test_warmup_reports_stress_only() {
        let (_, engine) = engine_with_history(10, 360);
        let mut sample = sample_with_cpu(70.0);
        sample.memory_usage = 40.0;
        sample.error_rate = 0.01;
        sample.response_time_ms = 100.0;

        let assessment = engine.assess(&sample).unwrap();
        let expected = 30.0 * 70.0 / 90.0 + 25.0 * 40.0 / 90.0 + 25.0 * 0.1 + 20.0 * 0.2;
        assert!((assessment.risk_score - expected).abs() < 1e-9);
        assert_eq!(engine.models().stats().anomaly_trainings, 0);
    }

    #[test]
    fn test_warm_engine_adds_forecast() {
        let (_, engine) = engine_with_history(400, 360);
        let sample = sample_with_cpu(30.0);

        let assessment = engine.assess(&sample).unwrap();
        assert!(!assessment.warmup);
        assert_eq!(assessment.progress, 100.0);

        let forecast = assessment.future_cpu.unwrap();
        assert!((forecast - 30.0).abs() < 1e-6);
        let stress = weighted_stress(&sample, engine.thresholds());
        let expected = stress + 30.0 * forecast / 90.0;
        assert!((assessment.risk_score - expected).abs() < 1e-6);
    }

    #[test]
    fn test_anomaly_flag_adds_bonus() {
        let store = Arc::new(InMemoryMetricsStore::new(10_000));
        for _ in 0..60 {
            store.append(sample_with_cpu(30.0)).unwrap();
        }
        let models = Arc::new(ModelCache::with_trainers(
            store.clone(),
            Arc::new(AlwaysOutlierTrainer),
            Arc::new(FailingTrainer),
            ModelCacheConfig::default(),
        ));
        let engine = RiskEngine::new(
            store,
            models,
            RiskConfig {
                warmup_samples: 50,
                ..Default::default()
            },
        );

        let sample = sample_with_cpu(30.0);
        let assessment = engine.assess(&sample).unwrap();
        let stress = weighted_stress(&sample, engine.thresholds());
        assert!((assessment.risk_score - (stress + 20.0)).abs() < 1e-9);
        assert!(assessment.future_cpu.is_none());
    }

    #[test]
    fn test_risk_is_bounded() {
        let (_, engine) = engine_with_history(400, 360);
        let extremes = [
            (1000.0, 1000.0, 10.0, 1e6),
            (-50.0, -50.0, -1.0, -100.0),
            (f64::NAN, 0.0, 0.0, 0.0),
            (f64::INFINITY, f64::INFINITY, f64::INFINITY, f64::INFINITY),
        ];
        for (cpu, mem, err, rt) in extremes {
            let mut sample = sample_with_cpu(cpu);
            sample.memory_usage = mem;
            sample.error_rate = err;
            sample.response_time_ms = rt;

            let risk = engine.assess(&sample).unwrap().risk_score;
            assert!((0.0..=100.0).contains(&risk), "risk {} out of bounds", risk);
        }
    }
}
