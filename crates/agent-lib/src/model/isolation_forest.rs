//! Isolation forest anomaly detector
//!
//! Random axis-aligned splits isolate outliers in fewer steps than inliers.
//! The anomaly score is `2^(-E[h(x)] / c(psi))` where `h(x)` is the path
//! length through a tree and `c(psi)` the expected path length of an
//! unsuccessful BST search over `psi` points. A sample is an outlier when
//! its score exceeds the `(1 - contamination)` quantile of training scores.

use super::{ensure_finite, AnomalyModel, AnomalyTrainer};
use crate::error::SentinelError;
use crate::models::MetricSample;
use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

const NUM_FEATURES: usize = 5;

/// Euler-Mascheroni constant, for the harmonic number approximation
const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

#[derive(Debug, Clone)]
pub struct IsolationForestConfig {
    pub n_trees: usize,
    /// Subsample drawn (without replacement) for each tree
    pub max_samples: usize,
    /// Expected share of outliers in the training data
    pub contamination: f64,
    pub seed: u64,
}

impl Default for IsolationForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_samples: 256,
            contamination: 0.05,
            seed: 42,
        }
    }
}

#[derive(Debug)]
enum Node {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        value: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// Trained isolation forest over the five sample features
#[derive(Debug)]
pub struct IsolationForest {
    trees: Vec<Node>,
    subsample: usize,
    threshold: f64,
}

impl IsolationForest {
    /// Fit a forest on feature rows
    pub fn fit(
        rows: &[[f64; NUM_FEATURES]],
        config: &IsolationForestConfig,
    ) -> Result<Self, SentinelError> {
        if rows.len() < 2 {
            return Err(SentinelError::InsufficientData {
                needed: 2,
                have: rows.len(),
            });
        }
        ensure_finite(rows.iter().flat_map(|r| r.iter().copied()))?;
        if !(0.0..0.5).contains(&config.contamination) {
            return Err(SentinelError::ModelTraining(format!(
                "contamination {} outside [0, 0.5)",
                config.contamination
            )));
        }

        let mut rng = StdRng::seed_from_u64(config.seed);
        let subsample = config.max_samples.clamp(2, rows.len());
        let max_depth = (subsample as f64).log2().ceil() as usize;

        let trees = (0..config.n_trees.max(1))
            .map(|_| {
                let picked: Vec<&[f64; NUM_FEATURES]> = index::sample(&mut rng, rows.len(), subsample)
                    .into_iter()
                    .map(|i| &rows[i])
                    .collect();
                build_tree(&picked, 0, max_depth, &mut rng)
            })
            .collect();

        let mut forest = Self {
            trees,
            subsample,
            threshold: f64::INFINITY,
        };

        let mut scores: Vec<f64> = rows.iter().map(|r| forest.score(r)).collect();
        scores.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        forest.threshold = quantile(&scores, 1.0 - config.contamination);

        Ok(forest)
    }

    /// Anomaly score in (0, 1]; higher means easier to isolate
    pub fn score(&self, features: &[f64; NUM_FEATURES]) -> f64 {
        let mean_path: f64 = self
            .trees
            .iter()
            .map(|tree| path_length(tree, features, 0))
            .sum::<f64>()
            / self.trees.len() as f64;

        let normaliser = average_path_length(self.subsample);
        if normaliser <= 0.0 {
            return 0.5;
        }
        2f64.powf(-mean_path / normaliser)
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

impl AnomalyModel for IsolationForest {
    fn is_outlier(&self, sample: &MetricSample) -> bool {
        let features = sample.features();
        if !features.iter().all(|v| v.is_finite()) {
            return false;
        }
        self.score(&features) > self.threshold
    }
}

fn build_tree(
    points: &[&[f64; NUM_FEATURES]],
    depth: usize,
    max_depth: usize,
    rng: &mut StdRng,
) -> Node {
    if depth >= max_depth || points.len() <= 1 {
        return Node::Leaf { size: points.len() };
    }

    // Only features with spread can split this node
    let splittable: Vec<(usize, f64, f64)> = (0..NUM_FEATURES)
        .filter_map(|feature| {
            let (min, max) = points.iter().fold((f64::MAX, f64::MIN), |(lo, hi), p| {
                (lo.min(p[feature]), hi.max(p[feature]))
            });
            (min < max).then_some((feature, min, max))
        })
        .collect();

    if splittable.is_empty() {
        return Node::Leaf { size: points.len() };
    }

    let (feature, min, max) = splittable[rng.gen_range(0..splittable.len())];
    let value = rng.gen_range(min..max);

    let (left, right): (Vec<&[f64; NUM_FEATURES]>, Vec<_>) =
        points.iter().copied().partition(|p| p[feature] < value);

    Node::Split {
        feature,
        value,
        left: Box::new(build_tree(&left, depth + 1, max_depth, rng)),
        right: Box::new(build_tree(&right, depth + 1, max_depth, rng)),
    }
}

fn path_length(node: &Node, x: &[f64; NUM_FEATURES], depth: usize) -> f64 {
    match node {
        Node::Leaf { size } => depth as f64 + average_path_length(*size),
        Node::Split {
            feature,
            value,
            left,
            right,
        } => {
            if x[*feature] < *value {
                path_length(left, x, depth + 1)
            } else {
                path_length(right, x, depth + 1)
            }
        }
    }
}

/// c(n): expected path length of an unsuccessful BST search among n points
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        n => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// Linear-interpolated quantile of an ascending slice
fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::INFINITY;
    }
    let rank = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;
    sorted[lower] * (1.0 - weight) + sorted[upper] * weight
}

/// Trains an [`IsolationForest`] on each call
#[derive(Debug, Clone, Default)]
pub struct IsolationForestTrainer {
    config: IsolationForestConfig,
}

impl IsolationForestTrainer {
    pub fn new(config: IsolationForestConfig) -> Self {
        Self { config }
    }
}

impl AnomalyTrainer for IsolationForestTrainer {
    fn train(&self, history: &[MetricSample]) -> Result<Arc<dyn AnomalyModel>, SentinelError> {
        let rows: Vec<[f64; NUM_FEATURES]> = history.iter().map(MetricSample::features).collect();
        let forest = IsolationForest::fit(&rows, &self.config)?;
        Ok(Arc::new(forest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_with_cpu;

    fn baseline_rows(n: usize) -> Vec<[f64; NUM_FEATURES]> {
        (0..n)
            .map(|i| {
                let wobble = (i % 7) as f64;
                [
                    40.0 + wobble,
                    50.0 + (i % 5) as f64,
                    60.0,
                    120.0 + wobble * 3.0,
                    0.01 + (i % 3) as f64 * 0.005,
                ]
            })
            .collect()
    }

    #[test]
    fn test_isolated_point_is_flagged() {
        let spike = [95.0, 95.0, 95.0, 1500.0, 0.5];
        let mut rows = baseline_rows(199);
        rows.push(spike);
        let forest = IsolationForest::fit(&rows, &IsolationForestConfig::default()).unwrap();

        let centre = [43.0, 52.0, 60.0, 129.0, 0.015];
        assert!(forest.score(&spike) > forest.score(&centre));
        assert!(forest.score(&spike) > forest.threshold());
        assert!(forest.score(&centre) <= forest.threshold());
    }

    #[test]
    fn test_training_is_deterministic() {
        let rows = baseline_rows(120);
        let a = IsolationForest::fit(&rows, &IsolationForestConfig::default()).unwrap();
        let b = IsolationForest::fit(&rows, &IsolationForestConfig::default()).unwrap();

        let probe = [70.0, 55.0, 60.0, 300.0, 0.04];
        assert_eq!(a.score(&probe), b.score(&probe));
        assert_eq!(a.threshold(), b.threshold());
    }

    #[test]
    fn test_constant_history_never_flags() {
        let rows = vec![[50.0, 50.0, 50.0, 100.0, 0.01]; 80];
        let forest = IsolationForest::fit(&rows, &IsolationForestConfig::default()).unwrap();

        assert!(!forest.is_outlier(&sample_with_cpu(50.0)));
    }

    #[test]
    fn test_non_finite_input_fails() {
        let mut rows = baseline_rows(60);
        rows[10][0] = f64::NAN;

        let result = IsolationForest::fit(&rows, &IsolationForestConfig::default());
        assert!(matches!(result, Err(SentinelError::ModelTraining(_))));
    }

    #[test]
    fn test_scores_are_bounded() {
        let forest = IsolationForest::fit(&baseline_rows(100), &IsolationForestConfig::default())
            .unwrap();
        for probe in [[0.0; 5], [1e6; 5], [45.0, 52.0, 60.0, 125.0, 0.02]] {
            let score = forest.score(&probe);
            assert!(score > 0.0 && score <= 1.0, "score {} out of range", score);
        }
    }

    #[test]
    fn test_average_path_length() {
        assert_eq!(average_path_length(1), 0.0);
        assert_eq!(average_path_length(2), 1.0);
        assert!((average_path_length(256) - 10.24).abs() < 0.05);
    }
}
