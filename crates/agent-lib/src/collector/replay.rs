//! Replays recorded samples from a JSON-lines file

use super::{async_trait, MetricCollector};
use crate::models::MetricSample;
use anyhow::{Context, Result};
use chrono::Utc;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

/// Yields one recorded sample per call, then errors once exhausted
pub struct ReplayCollector {
    samples: Mutex<VecDeque<MetricSample>>,
    restamp: bool,
}

impl ReplayCollector {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read replay file {}", path.display()))?;
        let collector = Self::from_json_lines(&content)?;
        info!(
            path = %path.display(),
            samples = collector.remaining(),
            "Loaded replay samples"
        );
        Ok(collector)
    }

    /// Parse one sample per non-empty line
    pub fn from_json_lines(content: &str) -> Result<Self> {
        let samples = content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(n, line)| {
                serde_json::from_str::<MetricSample>(line)
                    .with_context(|| format!("Invalid sample on line {}", n + 1))
            })
            .collect::<Result<VecDeque<_>>>()?;

        Ok(Self {
            samples: Mutex::new(samples),
            restamp: true,
        })
    }

    /// Keep recorded timestamps instead of stamping samples on replay
    pub fn keep_timestamps(mut self) -> Self {
        self.restamp = false;
        self
    }

    pub fn remaining(&self) -> usize {
        self.samples.lock().map(|s| s.len()).unwrap_or(0)
    }
}

#[async_trait]
impl MetricCollector for ReplayCollector {
    async fn collect(&self) -> Result<MetricSample> {
        let mut samples = self
            .samples
            .lock()
            .map_err(|e| anyhow::anyhow!("replay lock poisoned: {}", e))?;

        let mut sample = samples
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("Replay exhausted"))?;
        if self.restamp {
            sample.timestamp = Utc::now();
        }
        Ok(sample)
    }
}
