//! Sliding-window sustained-condition check

use crate::error::SentinelError;
use crate::models::MetricSample;
use crate::store::MetricsStore;
use serde::{Deserialize, Serialize};

/// Consecutive samples required for a sustained condition
pub const DEFAULT_SUSTAINED_COUNT: usize = 3;

/// Which field of a sample a condition watches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricSelector {
    Cpu,
    Memory,
    Disk,
    ResponseTime,
    ErrorRate,
}

impl MetricSelector {
    pub fn value(&self, sample: &MetricSample) -> f64 {
        match self {
            MetricSelector::Cpu => sample.cpu_usage,
            MetricSelector::Memory => sample.memory_usage,
            MetricSelector::Disk => sample.disk_usage,
            MetricSelector::ResponseTime => sample.response_time_ms,
            MetricSelector::ErrorRate => sample.error_rate,
        }
    }
}

/// `metric >= threshold` for the last `count` samples
#[derive(Debug, Clone, PartialEq)]
pub struct SustainedCondition {
    pub metric: MetricSelector,
    pub threshold: f64,
    pub count: usize,
}

impl SustainedCondition {
    pub fn new(metric: MetricSelector, threshold: f64, count: usize) -> Self {
        Self {
            metric,
            threshold,
            count,
        }
    }

    /// Evaluate against samples ordered newest first. Fewer than `count`
    /// samples, or a zero-length window, never hold.
    pub fn holds(&self, newest_first: &[MetricSample]) -> bool {
        if self.count == 0 || newest_first.len() < self.count {
            return false;
        }
        newest_first[..self.count]
            .iter()
            .all(|s| self.metric.value(s) >= self.threshold)
    }

    pub fn evaluate(&self, store: &dyn MetricsStore) -> Result<bool, SentinelError> {
        if self.count == 0 {
            return Ok(false);
        }
        let recent = store.recent(self.count)?;
        Ok(self.holds(&recent))
    }
}
