//! In-memory incident index

use super::IncidentStore;
use crate::error::SentinelError;
use crate::models::{Incident, IncidentId, IncidentStatus, NewIncident, Severity};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Incident records keyed by id; ids are assigned from an atomic counter
pub struct InMemoryIncidentStore {
    incidents: DashMap<IncidentId, Incident>,
    next_id: AtomicU64,
}

impl InMemoryIncidentStore {
    pub fn new() -> Self {
        Self {
            incidents: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn len(&self) -> usize {
        self.incidents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.incidents.is_empty()
    }
}

impl Default for InMemoryIncidentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl IncidentStore for InMemoryIncidentStore {
    fn insert(&self, incident: NewIncident) -> Result<IncidentId, SentinelError> {
        let id = IncidentId(self.next_id.fetch_add(1, Ordering::SeqCst));
        debug!(incident_id = %id, severity = %incident.severity, "Inserting incident");

        self.incidents.insert(
            id,
            Incident {
                id,
                service_id: incident.service_id,
                node_id: incident.node_id,
                severity: incident.severity,
                root_cause: incident.root_cause,
                status: IncidentStatus::Open,
                created_at: incident.created_at,
                resolved_at: None,
            },
        );
        Ok(id)
    }

    fn get(&self, id: IncidentId) -> Result<Option<Incident>, SentinelError> {
        Ok(self.incidents.get(&id).map(|r| r.clone()))
    }

    fn update_status(
        &self,
        id: IncidentId,
        status: IncidentStatus,
        resolved_at: Option<DateTime<Utc>>,
    ) -> Result<Option<Incident>, SentinelError> {
        Ok(self.incidents.get_mut(&id).map(|mut entry| {
            entry.status = status;
            entry.resolved_at = resolved_at;
            entry.clone()
        }))
    }

    fn list(
        &self,
        status: Option<IncidentStatus>,
        limit: Option<usize>,
    ) -> Result<Vec<Incident>, SentinelError> {
        let mut incidents: Vec<Incident> = self
            .incidents
            .iter()
            .filter(|r| status.map_or(true, |s| r.status == s))
            .map(|r| r.value().clone())
            .collect();

        incidents.sort_by(|a, b| b.id.cmp(&a.id));
        if let Some(limit) = limit {
            incidents.truncate(limit);
        }
        Ok(incidents)
    }

    fn find_open(
        &self,
        service_id: &str,
        node_id: &str,
        severity: Severity,
    ) -> Result<Option<IncidentId>, SentinelError> {
        Ok(self
            .incidents
            .iter()
            .filter(|r| {
                r.status == IncidentStatus::Open
                    && r.severity == severity
                    && r.service_id == service_id
                    && r.node_id == node_id
            })
            .map(|r| r.id)
            .max())
    }
}
