//! Predictive models and their cache
//!
//! Two models feed the risk score:
//! - an isolation forest flagging samples that do not fit recent history
//! - a Holt linear-trend forecaster projecting CPU usage
//!
//! Both sit behind trainer traits so the cache can be driven by any
//! implementation, and both are owned exclusively by [`ModelCache`].

mod cache;
mod holt;
mod isolation_forest;

pub use cache::{ModelCache, ModelCacheConfig, ModelCacheStats};
pub use holt::{HoltForecaster, HoltTrainer};
pub use isolation_forest::{IsolationForest, IsolationForestConfig, IsolationForestTrainer};

use crate::error::SentinelError;
use crate::models::MetricSample;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Which cached model a handle holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Anomaly,
    Forecast,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::Anomaly => write!(f, "anomaly"),
            ModelKind::Forecast => write!(f, "forecast"),
        }
    }
}

/// Trained outlier detector
pub trait AnomalyModel: Send + Sync {
    fn is_outlier(&self, sample: &MetricSample) -> bool;
}

/// Builds an anomaly model from history (oldest first)
pub trait AnomalyTrainer: Send + Sync {
    fn train(&self, history: &[MetricSample]) -> Result<Arc<dyn AnomalyModel>, SentinelError>;
}

/// Trained forecaster for a univariate series
pub trait ForecastModel: Send + Sync {
    /// One-step-ahead predictions for the next `horizon` steps
    fn predict(&self, horizon: usize) -> Result<Vec<f64>, SentinelError>;
}

/// Builds a forecast model from a series (oldest first)
pub trait ForecastTrainer: Send + Sync {
    fn train(&self, series: &[f64]) -> Result<Arc<dyn ForecastModel>, SentinelError>;
}

fn ensure_finite(values: impl IntoIterator<Item = f64>) -> Result<(), SentinelError> {
    if values.into_iter().all(f64::is_finite) {
        Ok(())
    } else {
        Err(SentinelError::ModelTraining(
            "training data contains non-finite values".to_string(),
        ))
    }
}
