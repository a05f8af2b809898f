//! In-memory metric history

use super::MetricsStore;
use crate::error::SentinelError;
use crate::models::MetricSample;
use std::collections::VecDeque;
use std::sync::RwLock;

/// Default retention (12 hours at a 5s cadence)
pub const DEFAULT_RETENTION: usize = 8640;

#[derive(Debug, Default)]
struct Ring {
    samples: VecDeque<(u64, MetricSample)>,
    next_seq: u64,
}

/// Bounded ring of samples with FIFO eviction
///
/// Appends and reads take a short lock, so a collector task can append
/// while the control loop reads without reordering.
#[derive(Debug)]
pub struct InMemoryMetricsStore {
    ring: RwLock<Ring>,
    retention: usize,
}

impl InMemoryMetricsStore {
    pub fn new(retention: usize) -> Self {
        Self {
            ring: RwLock::new(Ring {
                samples: VecDeque::with_capacity(retention.min(10_000)),
                next_seq: 1,
            }),
            retention: retention.max(1),
        }
    }

    /// Sequence number of the newest sample, if any
    pub fn last_seq(&self) -> Option<u64> {
        self.ring
            .read()
            .ok()
            .and_then(|ring| ring.samples.back().map(|(seq, _)| *seq))
    }
}

impl Default for InMemoryMetricsStore {
    fn default() -> Self {
        Self::new(DEFAULT_RETENTION)
    }
}

impl MetricsStore for InMemoryMetricsStore {
    fn append(&self, sample: MetricSample) -> Result<u64, SentinelError> {
        let mut ring = self
            .ring
            .write()
            .map_err(|e| SentinelError::StoreUnavailable(format!("metrics lock poisoned: {}", e)))?;

        let seq = ring.next_seq;
        ring.next_seq += 1;
        ring.samples.push_back((seq, sample));

        while ring.samples.len() > self.retention {
            ring.samples.pop_front();
        }

        Ok(seq)
    }

    fn recent(&self, limit: usize) -> Result<Vec<MetricSample>, SentinelError> {
        let ring = self
            .ring
            .read()
            .map_err(|e| SentinelError::StoreUnavailable(format!("metrics lock poisoned: {}", e)))?;

        Ok(ring
            .samples
            .iter()
            .rev()
            .take(limit)
            .map(|(_, sample)| sample.clone())
            .collect())
    }

    fn count(&self) -> Result<usize, SentinelError> {
        let ring = self
            .ring
            .read()
            .map_err(|e| SentinelError::StoreUnavailable(format!("metrics lock poisoned: {}", e)))?;
        Ok(ring.samples.len())
    }
}
