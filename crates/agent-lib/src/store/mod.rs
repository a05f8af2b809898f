//! Storage collaborators for metric history and incidents
//!
//! The control loop only depends on the two traits below. The in-memory
//! implementations support a concurrent producer appending samples while
//! the loop reads them.

mod incidents;
mod metrics;

pub use incidents::InMemoryIncidentStore;
pub use metrics::{InMemoryMetricsStore, DEFAULT_RETENTION};

use crate::error::SentinelError;
use crate::models::{Incident, IncidentId, IncidentStatus, MetricSample, NewIncident, Severity};
use chrono::{DateTime, Utc};

/// Append-only history of metric samples
pub trait MetricsStore: Send + Sync {
    /// Append a sample, returning its monotonic sequence number
    fn append(&self, sample: MetricSample) -> Result<u64, SentinelError>;

    /// Most recent `limit` samples, newest first
    fn recent(&self, limit: usize) -> Result<Vec<MetricSample>, SentinelError>;

    /// Number of samples currently retained
    fn count(&self) -> Result<usize, SentinelError>;
}

/// Persistence for incident records
pub trait IncidentStore: Send + Sync {
    fn insert(&self, incident: NewIncident) -> Result<IncidentId, SentinelError>;

    fn get(&self, id: IncidentId) -> Result<Option<Incident>, SentinelError>;

    /// Overwrite status and resolution time; returns the updated record,
    /// or `None` when the id is unknown
    fn update_status(
        &self,
        id: IncidentId,
        status: IncidentStatus,
        resolved_at: Option<DateTime<Utc>>,
    ) -> Result<Option<Incident>, SentinelError>;

    /// Incidents newest first, optionally filtered by status
    fn list(
        &self,
        status: Option<IncidentStatus>,
        limit: Option<usize>,
    ) -> Result<Vec<Incident>, SentinelError>;

    /// Newest open incident matching the service, node and severity
    fn find_open(
        &self,
        service_id: &str,
        node_id: &str,
        severity: Severity,
    ) -> Result<Option<IncidentId>, SentinelError>;
}
