//! Incident lifecycle
//!
//! Incidents are opened by the detection engine and resolved by hosts.
//! The only transition is OPEN -> RESOLVED; resolving twice is a no-op
//! that keeps the first resolution time.

use crate::error::SentinelError;
use crate::models::{Incident, IncidentId, IncidentStatus, NewIncident, Severity};
use crate::store::IncidentStore;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Result of a resolve request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ResolveOutcome {
    Resolved { resolved_at: DateTime<Utc> },
    AlreadyResolved { resolved_at: DateTime<Utc> },
    NotFound,
}

pub struct IncidentManager {
    store: Arc<dyn IncidentStore>,
    dedupe_open: bool,
    // Serializes read-check-write on resolve
    transitions: Mutex<()>,
}

impl IncidentManager {
    pub fn new(store: Arc<dyn IncidentStore>) -> Self {
        Self {
            store,
            dedupe_open: false,
            transitions: Mutex::new(()),
        }
    }

    /// Reuse an existing OPEN incident with the same service, node and
    /// severity instead of opening a duplicate
    pub fn with_deduplication(mut self, enabled: bool) -> Self {
        self.dedupe_open = enabled;
        self
    }

    pub fn create(
        &self,
        service_id: &str,
        node_id: &str,
        severity: Severity,
        root_cause: &str,
    ) -> Result<IncidentId, SentinelError> {
        if self.dedupe_open {
            if let Some(existing) = self.store.find_open(service_id, node_id, severity)? {
                debug!(incident_id = %existing, %severity, "Reusing open incident");
                return Ok(existing);
            }
        }

        let id = self.store.insert(NewIncident {
            service_id: service_id.to_string(),
            node_id: node_id.to_string(),
            severity,
            root_cause: root_cause.to_string(),
            created_at: Utc::now(),
        })?;

        Ok(id)
    }

    /// Resolve an incident. Unknown and already-resolved ids are reported,
    /// not treated as errors.
    pub fn resolve(&self, id: IncidentId) -> Result<ResolveOutcome, SentinelError> {
        let _guard = self
            .transitions
            .lock()
            .map_err(|e| SentinelError::StoreUnavailable(format!("incident lock poisoned: {}", e)))?;

        let Some(incident) = self.store.get(id)? else {
            return Ok(ResolveOutcome::NotFound);
        };

        if let (IncidentStatus::Resolved, Some(resolved_at)) = (incident.status, incident.resolved_at)
        {
            debug!(incident_id = %id, "Incident already resolved");
            return Ok(ResolveOutcome::AlreadyResolved { resolved_at });
        }

        let resolved_at = Utc::now();
        match self
            .store
            .update_status(id, IncidentStatus::Resolved, Some(resolved_at))?
        {
            Some(_) => {
                info!(incident_id = %id, "Incident resolved");
                Ok(ResolveOutcome::Resolved { resolved_at })
            }
            None => Ok(ResolveOutcome::NotFound),
        }
    }

    pub fn get(&self, id: IncidentId) -> Result<Option<Incident>, SentinelError> {
        self.store.get(id)
    }

    /// Newest first, optionally filtered by status
    pub fn list(
        &self,
        status: Option<IncidentStatus>,
        limit: Option<usize>,
    ) -> Result<Vec<Incident>, SentinelError> {
        self.store.list(status, limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryIncidentStore;

    fn manager() -> IncidentManager {
        IncidentManager::new(Arc::new(InMemoryIncidentStore::new()))
    }

    #[test]
    fn test_create_opens_incident() {
        let manager = manager();
        let id = manager
            .create("svc-1", "node-1", Severity::High, "Failure risk 72.0%")
            .unwrap();

        let incident = manager.get(id).unwrap().unwrap();
        assert_eq!(incident.status, IncidentStatus::Open);
        assert_eq!(incident.severity, Severity::High);
        assert_eq!(incident.root_cause, "Failure risk 72.0%");
        assert!(incident.resolved_at.is_none());
    }

    #[test]
    fn test_duplicates_kept_by_default() {
        let manager = manager();
        let a = manager.create("svc-1", "node-1", Severity::High, "a").unwrap();
        let b = manager.create("svc-1", "node-1", Severity::High, "b").unwrap();

        assert_ne!(a, b);
        assert_eq!(manager.list(None, None).unwrap().len(), 2);
    }

    #[test]
    fn test_deduplication_reuses_open_incident() {
        let manager = manager().with_deduplication(true);
        let a = manager.create("svc-1", "node-1", Severity::High, "a").unwrap();
        let b = manager.create("svc-1", "node-1", Severity::High, "b").unwrap();
        let c = manager.create("svc-1", "node-1", Severity::Critical, "c").unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);

        manager.resolve(a).unwrap();
        let d = manager.create("svc-1", "node-1", Severity::High, "d").unwrap();
        assert_ne!(a, d);
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let manager = manager();
        let id = manager.create("svc-1", "node-1", Severity::Critical, "x").unwrap();

        let first = manager.resolve(id).unwrap();
        let ResolveOutcome::Resolved { resolved_at } = first else {
            panic!("expected Resolved, got {:?}", first);
        };

        let second = manager.resolve(id).unwrap();
        assert_eq!(second, ResolveOutcome::AlreadyResolved { resolved_at });

        let incident = manager.get(id).unwrap().unwrap();
        assert_eq!(incident.status, IncidentStatus::Resolved);
        assert_eq!(incident.resolved_at, Some(resolved_at));
    }

    #[test]
    fn test_resolve_unknown_id() {
        assert_eq!(
            manager().resolve(IncidentId(404)).unwrap(),
            ResolveOutcome::NotFound
        );
    }

    #[test]
    fn test_concurrent_resolves_agree() {
        let manager = Arc::new(manager());
        let id = manager.create("svc-1", "node-1", Severity::High, "x").unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let manager = Arc::clone(&manager);
                std::thread::spawn(move || manager.resolve(id).unwrap())
            })
            .collect();
        let outcomes: Vec<ResolveOutcome> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let resolved = outcomes
            .iter()
            .filter(|o| matches!(o, ResolveOutcome::Resolved { .. }))
            .count();
        assert_eq!(resolved, 1);

        let stored = manager.get(id).unwrap().unwrap().resolved_at.unwrap();
        for outcome in outcomes {
            match outcome {
                ResolveOutcome::Resolved { resolved_at }
                | ResolveOutcome::AlreadyResolved { resolved_at } => {
                    assert_eq!(resolved_at, stored)
                }
                ResolveOutcome::NotFound => panic!("incident vanished"),
            }
        }
    }
}
