//! Severity classification and incident creation

use super::{Detection, SustainedCondition};
use crate::error::SentinelError;
use crate::incident::IncidentManager;
use crate::models::{MetricSample, Severity};
use crate::risk::{RiskEngine, Thresholds};
use crate::store::MetricsStore;
use std::sync::Arc;
use tracing::debug;

/// Composite risk at or above this opens a HIGH incident
pub const RISK_INCIDENT_THRESHOLD: f64 = 70.0;

const CRITICAL_RISK_FLOOR: f64 = 90.0;
const SUSTAINED_RISK_FLOOR: f64 = 75.0;
const CRITICAL_ETA_FLOOR: u32 = 2;
const SUSTAINED_ETA_FLOOR: u32 = 10;

/// Minutes until failure, or `None` when nothing points at one
///
/// The hard-critical rung is checked first so an overloaded host always
/// reports the shortest ETA, even when its load has also been sustained.
pub fn estimate_time_to_failure(
    cpu: f64,
    future_cpu: Option<f64>,
    sustained: bool,
    thresholds: &Thresholds,
) -> Option<u32> {
    if cpu >= thresholds.critical_cpu {
        return Some(2);
    }
    if sustained {
        return Some(10);
    }
    if cpu >= thresholds.elevated_cpu {
        return Some(5);
    }
    if cpu >= thresholds.high_cpu {
        return Some(15);
    }

    match future_cpu {
        Some(future) if future > cpu => {
            let gap = future - cpu;
            if gap < 5.0 {
                Some(60)
            } else if gap < 15.0 {
                Some(30)
            } else {
                Some(10)
            }
        }
        _ => None,
    }
}

pub struct DetectionEngine {
    risk: RiskEngine,
    sustained: SustainedCondition,
    incidents: Arc<IncidentManager>,
    store: Arc<dyn MetricsStore>,
}

impl DetectionEngine {
    pub fn new(
        risk: RiskEngine,
        sustained: SustainedCondition,
        incidents: Arc<IncidentManager>,
        store: Arc<dyn MetricsStore>,
    ) -> Self {
        Self {
            risk,
            sustained,
            incidents,
            store,
        }
    }

    pub fn risk_engine(&self) -> &RiskEngine {
        &self.risk
    }

    pub fn incidents(&self) -> &Arc<IncidentManager> {
        &self.incidents
    }

    fn thresholds(&self) -> &Thresholds {
        self.risk.thresholds()
    }

    /// Classify a sample that is already in the metrics store
    ///
    /// Rules are applied in priority order and the first match wins:
    /// warm-up, hard-critical CPU, sustained high CPU, composite risk.
    pub fn analyze(&self, sample: &MetricSample) -> Result<Detection, SentinelError> {
        let assessment = self.risk.assess(sample)?;

        if assessment.warmup {
            return Ok(Detection::Warmup {
                risk: assessment.risk_score,
                progress: assessment.progress,
            });
        }

        let risk = assessment.risk_score;
        let cpu = sample.cpu_usage;
        let critical_cpu = self.thresholds().critical_cpu;
        let sustained = self.sustained.evaluate(self.store.as_ref())?;
        let eta = estimate_time_to_failure(cpu, assessment.future_cpu, sustained, self.thresholds());

        debug!(risk, cpu, sustained, eta = ?eta, "Sample assessed");

        let (severity, reported_risk, eta_minutes, root_cause) = if cpu >= critical_cpu {
            (
                Severity::Critical,
                risk.max(CRITICAL_RISK_FLOOR),
                eta.or(Some(CRITICAL_ETA_FLOOR)),
                format!("CPU extreme overload ({:.1}%)", cpu),
            )
        } else if sustained {
            (
                Severity::High,
                risk.max(SUSTAINED_RISK_FLOOR),
                eta.or(Some(SUSTAINED_ETA_FLOOR)),
                format!("Sustained high CPU ({:.1}%)", cpu),
            )
        } else if risk >= RISK_INCIDENT_THRESHOLD {
            (
                Severity::High,
                risk,
                eta,
                format!("Failure risk {:.1}%", risk),
            )
        } else {
            return Ok(Detection::Healthy {
                risk,
                future_cpu: assessment.future_cpu,
            });
        };

        let incident_id =
            self.incidents
                .create(&sample.service_id, &sample.node_id, severity, &root_cause)?;

        Ok(Detection::Anomaly {
            severity,
            risk: reported_risk,
            eta_minutes,
            incident_id,
            root_cause,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{MetricSelector, DEFAULT_SUSTAINED_COUNT};
    use crate::model::{ModelCache, ModelCacheConfig};
    use crate::models::IncidentStatus;
    use crate::risk::RiskConfig;
    use crate::store::{InMemoryIncidentStore, InMemoryMetricsStore};
    use crate::testing::{sample_with_cpu, FailingTrainer, NeverOutlierTrainer};

    const WARMUP: usize = 20;

    struct Harness {
        store: Arc<InMemoryMetricsStore>,
        engine: DetectionEngine,
    }

    impl Harness {
        /// Engine with deterministic models: nothing is an outlier and
        /// forecasts are unavailable
        fn new(history: usize) -> Self {
            let store = Arc::new(InMemoryMetricsStore::new(1000));
            for _ in 0..history {
                store.append(sample_with_cpu(30.0)).unwrap();
            }
            let models = Arc::new(ModelCache::with_trainers(
                store.clone(),
                Arc::new(NeverOutlierTrainer),
                Arc::new(FailingTrainer),
                ModelCacheConfig::default(),
            ));
            let risk = RiskEngine::new(
                store.clone(),
                models,
                RiskConfig {
                    warmup_samples: WARMUP,
                    ..Default::default()
                },
            );
            let sustained =
                SustainedCondition::new(MetricSelector::Cpu, 80.0, DEFAULT_SUSTAINED_COUNT);
            let incidents = Arc::new(IncidentManager::new(Arc::new(InMemoryIncidentStore::new())));
            let engine = DetectionEngine::new(risk, sustained, incidents, store.clone());
            Self { store, engine }
        }

        fn observe(&self, sample: MetricSample) -> Detection {
            self.store.append(sample.clone()).unwrap();
            self.engine.analyze(&sample).unwrap()
        }
    }

    #[test]
    fn test_eta_ladder() {
        let t = Thresholds::default();
        assert_eq!(estimate_time_to_failure(95.0, None, true, &t), Some(2));
        assert_eq!(estimate_time_to_failure(82.0, None, true, &t), Some(10));
        assert_eq!(estimate_time_to_failure(86.0, None, false, &t), Some(5));
        assert_eq!(estimate_time_to_failure(80.0, None, false, &t), Some(15));
        assert_eq!(estimate_time_to_failure(50.0, Some(53.0), false, &t), Some(60));
        assert_eq!(estimate_time_to_failure(50.0, Some(60.0), false, &t), Some(30));
        assert_eq!(estimate_time_to_failure(50.0, Some(70.0), false, &t), Some(10));
        assert_eq!(estimate_time_to_failure(50.0, Some(40.0), false, &t), None);
        assert_eq!(estimate_time_to_failure(50.0, None, false, &t), None);
    }

    #[test]
    fn test_warmup_never_opens_incidents() {
        let harness = Harness::new(0);
        for i in 0..WARMUP - 1 {
            let detection = harness.observe(sample_with_cpu(99.0));
            let Detection::Warmup { progress, .. } = detection else {
                panic!("expected warm-up, got {:?}", detection);
            };
            let expected = 100.0 * (i + 1) as f64 / WARMUP as f64;
            assert!((progress - expected).abs() < 1e-9);
        }
        assert!(harness.engine.incidents().list(None, None).unwrap().is_empty());
    }

    #[test]
    fn test_warmup_wins_over_composite_risk() {
        let harness = Harness::new(5);
        let mut sample = sample_with_cpu(70.0);
        sample.memory_usage = 40.0;
        sample.error_rate = 0.01;
        sample.response_time_ms = 100.0;

        assert!(matches!(harness.observe(sample), Detection::Warmup { .. }));
    }

    #[test]
    fn test_critical_cpu_overrides_low_risk() {
        let harness = Harness::new(WARMUP);
        let detection = harness.observe(sample_with_cpu(95.0));

        let Detection::Anomaly {
            severity,
            risk,
            eta_minutes,
            root_cause,
            ..
        } = detection
        else {
            panic!("expected anomaly, got {:?}", detection);
        };
        assert_eq!(severity, Severity::Critical);
        assert_eq!(risk, 90.0);
        assert_eq!(eta_minutes, Some(2));
        assert_eq!(root_cause, "CPU extreme overload (95.0%)");
    }

    #[test]
    fn test_escalation_scenario() {
        let harness = Harness::new(WARMUP);

        assert!(matches!(
            harness.observe(sample_with_cpu(82.0)),
            Detection::Healthy { .. }
        ));
        assert!(matches!(
            harness.observe(sample_with_cpu(81.0)),
            Detection::Healthy { .. }
        ));

        let third = harness.observe(sample_with_cpu(85.0));
        let Detection::Anomaly {
            severity,
            risk,
            eta_minutes,
            ref root_cause,
            ..
        } = third
        else {
            panic!("expected sustained anomaly, got {:?}", third);
        };
        assert_eq!(severity, Severity::High);
        assert_eq!(risk, 75.0);
        assert_eq!(eta_minutes, Some(10));
        assert_eq!(root_cause, "Sustained high CPU (85.0%)");

        let fourth = harness.observe(sample_with_cpu(90.0));
        let Detection::Anomaly {
            severity,
            eta_minutes,
            ..
        } = fourth
        else {
            panic!("expected critical anomaly, got {:?}", fourth);
        };
        assert_eq!(severity, Severity::Critical);
        assert_eq!(eta_minutes, Some(2));

        let open = harness
            .engine
            .incidents()
            .list(Some(IncidentStatus::Open), None)
            .unwrap();
        assert_eq!(open.len(), 2);
        assert_eq!(open[0].severity, Severity::Critical);
        assert_eq!(open[1].severity, Severity::High);
    }

    #[test]
    fn test_composite_risk_opens_high_incident() {
        let harness = Harness::new(WARMUP);
        let mut sample = sample_with_cpu(75.0);
        sample.memory_usage = 85.0;
        sample.error_rate = 0.09;
        sample.response_time_ms = 450.0;

        let detection = harness.observe(sample);
        let Detection::Anomaly {
            severity,
            risk,
            eta_minutes,
            root_cause,
            ..
        } = detection
        else {
            panic!("expected composite anomaly, got {:?}", detection);
        };
        assert_eq!(severity, Severity::High);
        assert!(risk >= RISK_INCIDENT_THRESHOLD);
        assert_eq!(eta_minutes, None);
        assert_eq!(root_cause, format!("Failure risk {:.1}%", risk));
    }

    #[test]
    fn test_healthy_sample() {
        let harness = Harness::new(WARMUP);
        let detection = harness.observe(sample_with_cpu(35.0));

        assert!(!detection.is_anomaly());
        assert!(detection.risk() < RISK_INCIDENT_THRESHOLD);
        assert!(harness.engine.incidents().list(None, None).unwrap().is_empty());
    }
}
