//! Metric sample sources
//!
//! The control loop pulls exactly one sample per tick from a
//! [`MetricCollector`]. A failed collection means "no sample this tick".

mod host;
mod replay;

pub use host::HostCollector;
pub use replay::ReplayCollector;

use crate::models::MetricSample;
use anyhow::Result;

pub use async_trait::async_trait;

/// Source of metric samples for one service on one node
#[async_trait]
pub trait MetricCollector: Send + Sync {
    async fn collect(&self) -> Result<MetricSample>;
}
