//! Shared fixtures for unit tests

use crate::error::SentinelError;
use crate::model::{AnomalyModel, AnomalyTrainer, ForecastModel, ForecastTrainer, HoltTrainer};
use crate::models::MetricSample;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

pub(crate) fn sample_with_cpu(cpu: f64) -> MetricSample {
    MetricSample {
        timestamp: Utc::now(),
        node_id: "node-1".to_string(),
        service_id: "svc-1".to_string(),
        cpu_usage: cpu,
        memory_usage: 40.0,
        disk_usage: 50.0,
        response_time_ms: 100.0,
        error_rate: 0.01,
    }
}

struct FixedVerdict(bool);

impl AnomalyModel for FixedVerdict {
    fn is_outlier(&self, _sample: &MetricSample) -> bool {
        self.0
    }
}

pub(crate) struct NeverOutlierTrainer;

impl AnomalyTrainer for NeverOutlierTrainer {
    fn train(&self, _history: &[MetricSample]) -> Result<Arc<dyn AnomalyModel>, SentinelError> {
        Ok(Arc::new(FixedVerdict(false)))
    }
}

pub(crate) struct AlwaysOutlierTrainer;

impl AnomalyTrainer for AlwaysOutlierTrainer {
    fn train(&self, _history: &[MetricSample]) -> Result<Arc<dyn AnomalyModel>, SentinelError> {
        Ok(Arc::new(FixedVerdict(true)))
    }
}

/// Fails every training pass, for either model kind
pub(crate) struct FailingTrainer;

impl AnomalyTrainer for FailingTrainer {
    fn train(&self, _history: &[MetricSample]) -> Result<Arc<dyn AnomalyModel>, SentinelError> {
        Err(SentinelError::ModelTraining("injected failure".to_string()))
    }
}

impl ForecastTrainer for FailingTrainer {
    fn train(&self, _series: &[f64]) -> Result<Arc<dyn ForecastModel>, SentinelError> {
        Err(SentinelError::ModelTraining("injected failure".to_string()))
    }
}

/// Holt trainer that counts calls and can be switched to failing
#[derive(Default)]
pub(crate) struct CountingForecastTrainer {
    calls: AtomicUsize,
    failing: AtomicBool,
}

impl CountingForecastTrainer {
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn fail_from_now(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }
}

impl ForecastTrainer for CountingForecastTrainer {
    fn train(&self, series: &[f64]) -> Result<Arc<dyn ForecastModel>, SentinelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(SentinelError::ModelTraining("injected failure".to_string()));
        }
        HoltTrainer.train(series)
    }
}
