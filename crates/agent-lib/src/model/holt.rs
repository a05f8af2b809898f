//! Holt linear-trend forecaster (double exponential smoothing)

use super::{ensure_finite, ForecastModel, ForecastTrainer};
use crate::error::SentinelError;
use std::sync::Arc;

const ALPHA_GRID: [f64; 9] = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9];
const BETA_GRID: [f64; 5] = [0.05, 0.1, 0.2, 0.3, 0.5];

/// Fitted smoothing state
#[derive(Debug, Clone, PartialEq)]
pub struct HoltForecaster {
    alpha: f64,
    beta: f64,
    level: f64,
    trend: f64,
    sse: f64,
}

impl HoltForecaster {
    /// Fit level and trend, picking `alpha`/`beta` from a fixed grid by
    /// one-step-ahead squared error
    pub fn fit(series: &[f64]) -> Result<Self, SentinelError> {
        if series.len() < 2 {
            return Err(SentinelError::InsufficientData {
                needed: 2,
                have: series.len(),
            });
        }
        ensure_finite(series.iter().copied())?;

        let mut best: Option<HoltForecaster> = None;
        for &alpha in &ALPHA_GRID {
            for &beta in &BETA_GRID {
                let candidate = Self::smooth(series, alpha, beta);
                if best.as_ref().map_or(true, |b| candidate.sse < b.sse) {
                    best = Some(candidate);
                }
            }
        }

        best.filter(|b| b.sse.is_finite()).ok_or_else(|| {
            SentinelError::ModelTraining("smoothing diverged for every parameter pair".to_string())
        })
    }

    fn smooth(series: &[f64], alpha: f64, beta: f64) -> Self {
        let mut level = series[0];
        let mut trend = series[1] - series[0];
        let mut sse = 0.0;

        for &y in &series[1..] {
            let predicted = level + trend;
            sse += (y - predicted).powi(2);

            let previous_level = level;
            level = alpha * y + (1.0 - alpha) * (level + trend);
            trend = beta * (level - previous_level) + (1.0 - beta) * trend;
        }

        Self {
            alpha,
            beta,
            level,
            trend,
            sse,
        }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }
}

impl ForecastModel for HoltForecaster {
    fn predict(&self, horizon: usize) -> Result<Vec<f64>, SentinelError> {
        let predictions: Vec<f64> = (1..=horizon)
            .map(|step| self.level + self.trend * step as f64)
            .collect();
        ensure_finite(predictions.iter().copied())?;
        Ok(predictions)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HoltTrainer;

impl ForecastTrainer for HoltTrainer {
    fn train(&self, series: &[f64]) -> Result<Arc<dyn ForecastModel>, SentinelError> {
        Ok(Arc::new(HoltForecaster::fit(series)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_series_is_extrapolated() {
        let series: Vec<f64> = (10..50).map(f64::from).collect();
        let model = HoltForecaster::fit(&series).unwrap();

        let predictions = model.predict(3).unwrap();
        assert!((predictions[0] - 50.0).abs() < 1e-6);
        assert!((predictions[2] - 52.0).abs() < 1e-6);
    }

    #[test]
    fn test_flat_series_stays_flat() {
        let model = HoltForecaster::fit(&[42.0; 40]).unwrap();
        let predictions = model.predict(30).unwrap();

        assert_eq!(predictions.len(), 30);
        assert!(predictions.iter().all(|p| (p - 42.0).abs() < 1e-9));
    }

    #[test]
    fn test_noisy_series_picks_grid_parameters() {
        let series: Vec<f64> = (0..60)
            .map(|i| 50.0 + if i % 2 == 0 { 3.0 } else { -3.0 })
            .collect();
        let model = HoltForecaster::fit(&series).unwrap();

        assert!(ALPHA_GRID.contains(&model.alpha()));
        assert!(BETA_GRID.contains(&model.beta()));
        let next = model.predict(1).unwrap()[0];
        assert!(next > 0.0 && next < 100.0, "prediction {} drifted", next);
    }

    #[test]
    fn test_rejects_short_or_non_finite_input() {
        assert!(matches!(
            HoltForecaster::fit(&[1.0]),
            Err(SentinelError::InsufficientData { needed: 2, have: 1 })
        ));
        assert!(matches!(
            HoltForecaster::fit(&[1.0, f64::INFINITY, 3.0]),
            Err(SentinelError::ModelTraining(_))
        ));
    }
}
