//! Model lifecycle: train once, reuse, retrain periodically
//!
//! The anomaly detector is retrained on every request from the latest
//! window of history. The forecaster is reused until its retrain interval
//! elapses. A failed training pass never replaces the cached handle.

use super::{
    AnomalyModel, AnomalyTrainer, ForecastModel, ForecastTrainer, HoltTrainer,
    IsolationForestTrainer, ModelKind,
};
use crate::error::SentinelError;
use crate::models::MetricSample;
use crate::observability::AgentMetrics;
use crate::store::MetricsStore;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Default forecast retrain interval
pub const DEFAULT_RETRAIN_INTERVAL: Duration = Duration::from_secs(300);

/// Configuration for the model cache
#[derive(Debug, Clone)]
pub struct ModelCacheConfig {
    /// Samples used to train the anomaly model
    pub anomaly_window: usize,
    /// Below this many samples the anomaly model is unavailable
    pub anomaly_min_samples: usize,
    /// CPU history used to train the forecaster
    pub forecast_window: usize,
    pub forecast_min_samples: usize,
    /// Number of one-step-ahead predictions averaged into the forecast
    pub forecast_horizon: usize,
    /// Minimum age of the forecaster before it is retrained
    pub retrain_interval: Duration,
}

impl Default for ModelCacheConfig {
    fn default() -> Self {
        Self {
            anomaly_window: 200,
            anomaly_min_samples: 50,
            forecast_window: 200,
            forecast_min_samples: 30,
            forecast_horizon: 30,
            retrain_interval: DEFAULT_RETRAIN_INTERVAL,
        }
    }
}

/// A successfully trained model plus its provenance
struct ModelHandle<M: ?Sized> {
    kind: ModelKind,
    trained_at: DateTime<Utc>,
    trained_instant: Instant,
    training_samples: usize,
    model: Arc<M>,
}

impl<M: ?Sized> ModelHandle<M> {
    fn new(kind: ModelKind, training_samples: usize, model: Arc<M>) -> Self {
        Self {
            kind,
            trained_at: Utc::now(),
            trained_instant: Instant::now(),
            training_samples,
            model,
        }
    }

    fn age(&self) -> Duration {
        self.trained_instant.elapsed()
    }
}

/// Snapshot of cache activity for observability
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModelCacheStats {
    pub anomaly_trainings: u64,
    pub anomaly_failures: u64,
    pub forecast_trainings: u64,
    pub forecast_failures: u64,
    pub anomaly_trained_at: Option<DateTime<Utc>>,
    pub anomaly_training_samples: Option<usize>,
    pub forecast_trained_at: Option<DateTime<Utc>>,
    pub forecast_training_samples: Option<usize>,
    pub forecast_age_secs: Option<f64>,
}

#[derive(Debug, Default)]
struct Counters {
    anomaly_trainings: AtomicU64,
    anomaly_failures: AtomicU64,
    forecast_trainings: AtomicU64,
    forecast_failures: AtomicU64,
}

/// Owns the anomaly detector and forecaster
///
/// Training runs outside the handle locks; a swap is a single `Arc`
/// assignment, so readers never observe a half-trained model.
pub struct ModelCache {
    store: Arc<dyn MetricsStore>,
    anomaly_trainer: Arc<dyn AnomalyTrainer>,
    forecast_trainer: Arc<dyn ForecastTrainer>,
    config: ModelCacheConfig,
    anomaly: RwLock<Option<Arc<ModelHandle<dyn AnomalyModel>>>>,
    forecast: RwLock<Option<Arc<ModelHandle<dyn ForecastModel>>>>,
    counters: Counters,
    metrics: AgentMetrics,
}

impl ModelCache {
    /// Cache with the isolation forest and Holt trainers
    pub fn new(store: Arc<dyn MetricsStore>, config: ModelCacheConfig) -> Self {
        Self::with_trainers(
            store,
            Arc::new(IsolationForestTrainer::default()),
            Arc::new(HoltTrainer),
            config,
        )
    }

    pub fn with_trainers(
        store: Arc<dyn MetricsStore>,
        anomaly_trainer: Arc<dyn AnomalyTrainer>,
        forecast_trainer: Arc<dyn ForecastTrainer>,
        config: ModelCacheConfig,
    ) -> Self {
        Self {
            store,
            anomaly_trainer,
            forecast_trainer,
            config,
            anomaly: RwLock::new(None),
            forecast: RwLock::new(None),
            counters: Counters::default(),
            metrics: AgentMetrics::new(),
        }
    }

    pub fn config(&self) -> &ModelCacheConfig {
        &self.config
    }

    /// Retrain the anomaly model from the latest window of history
    ///
    /// Returns `None` when history is too short or training fails; callers
    /// treat that as "not anomalous". A failed pass keeps the previous handle.
    pub fn get_anomaly_model(&self) -> Option<Arc<dyn AnomalyModel>> {
        let mut history = match self.store.recent(self.config.anomaly_window) {
            Ok(history) => history,
            Err(e) => {
                warn!(error = %e, "Anomaly model unavailable: store read failed");
                return None;
            }
        };

        if history.len() < self.config.anomaly_min_samples {
            debug!(
                have = history.len(),
                needed = self.config.anomaly_min_samples,
                "Not enough history for anomaly model"
            );
            return None;
        }

        history.reverse();
        match self.anomaly_trainer.train(&history) {
            Ok(model) => {
                self.counters.anomaly_trainings.fetch_add(1, Ordering::Relaxed);
                let handle = Arc::new(ModelHandle::new(
                    ModelKind::Anomaly,
                    history.len(),
                    Arc::clone(&model),
                ));
                self.record_training(&handle);
                if let Ok(mut slot) = self.anomaly.write() {
                    *slot = Some(handle);
                }
                Some(model)
            }
            Err(e) => {
                self.counters.anomaly_failures.fetch_add(1, Ordering::Relaxed);
                self.record_failure(ModelKind::Anomaly, &e);
                None
            }
        }
    }

    /// Mean CPU forecast over the horizon, clamped to [0, 100]
    ///
    /// The cached forecaster is reused until the retrain interval elapses.
    /// Once stale, a failed retrain yields `None` but the stale model is
    /// kept for the next attempt.
    pub fn get_forecast(&self) -> Option<f64> {
        let handle = match self.current_forecast() {
            Some(handle) if handle.age() <= self.config.retrain_interval => handle,
            _ => self.retrain_forecast()?,
        };

        match handle.model.predict(self.config.forecast_horizon) {
            Ok(predictions) if !predictions.is_empty() => {
                let mean = predictions.iter().sum::<f64>() / predictions.len() as f64;
                Some(mean.clamp(0.0, 100.0))
            }
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "Forecast prediction failed");
                None
            }
        }
    }

    pub fn has_forecast_model(&self) -> bool {
        self.current_forecast().is_some()
    }

    pub fn stats(&self) -> ModelCacheStats {
        let anomaly = self.anomaly.read().ok().and_then(|slot| slot.clone());
        let forecast = self.current_forecast();

        ModelCacheStats {
            anomaly_trainings: self.counters.anomaly_trainings.load(Ordering::Relaxed),
            anomaly_failures: self.counters.anomaly_failures.load(Ordering::Relaxed),
            forecast_trainings: self.counters.forecast_trainings.load(Ordering::Relaxed),
            forecast_failures: self.counters.forecast_failures.load(Ordering::Relaxed),
            anomaly_trained_at: anomaly.as_ref().map(|h| h.trained_at),
            anomaly_training_samples: anomaly.as_ref().map(|h| h.training_samples),
            forecast_trained_at: forecast.as_ref().map(|h| h.trained_at),
            forecast_training_samples: forecast.as_ref().map(|h| h.training_samples),
            forecast_age_secs: forecast.as_ref().map(|h| h.age().as_secs_f64()),
        }
    }

    fn current_forecast(&self) -> Option<Arc<ModelHandle<dyn ForecastModel>>> {
        self.forecast.read().ok().and_then(|slot| slot.clone())
    }

    fn retrain_forecast(&self) -> Option<Arc<ModelHandle<dyn ForecastModel>>> {
        let history = match self.store.recent(self.config.forecast_window) {
            Ok(history) => history,
            Err(e) => {
                warn!(error = %e, "Forecast unavailable: store read failed");
                return None;
            }
        };

        if history.len() < self.config.forecast_min_samples {
            debug!(
                have = history.len(),
                needed = self.config.forecast_min_samples,
                "Not enough history for forecast model"
            );
            return None;
        }

        // Store returns newest first; the forecaster wants chronological order
        let series: Vec<f64> = history.iter().rev().map(|s: &MetricSample| s.cpu_usage).collect();

        match self.forecast_trainer.train(&series) {
            Ok(model) => {
                self.counters.forecast_trainings.fetch_add(1, Ordering::Relaxed);
                let handle = Arc::new(ModelHandle::new(ModelKind::Forecast, series.len(), model));
                self.record_training(&handle);
                if let Ok(mut slot) = self.forecast.write() {
                    *slot = Some(Arc::clone(&handle));
                }
                Some(handle)
            }
            Err(e) => {
                self.counters.forecast_failures.fetch_add(1, Ordering::Relaxed);
                self.record_failure(ModelKind::Forecast, &e);
                None
            }
        }
    }

    fn record_training<M: ?Sized>(&self, handle: &ModelHandle<M>) {
        self.metrics.inc_model_training(handle.kind, true);
        info!(
            event = "model_trained",
            kind = %handle.kind,
            training_samples = handle.training_samples,
            "Model trained"
        );
    }

    fn record_failure(&self, kind: ModelKind, error: &SentinelError) {
        self.metrics.inc_model_training(kind, false);
        warn!(
            event = "model_training_failed",
            kind = %kind,
            error = %error,
            "Model training failed, keeping previous model"
        );
    }
}
