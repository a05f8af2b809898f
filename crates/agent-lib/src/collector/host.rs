//! Host resource collector backed by sysinfo
//!
//! CPU, memory and disk come from the operating system. Response time and
//! error rate are synthetic until an application probe is wired in.

use super::{async_trait, MetricCollector};
use crate::models::MetricSample;
use anyhow::{Context, Result};
use chrono::Utc;
use rand::Rng;
use std::sync::{Arc, Mutex};
use sysinfo::{Disks, System};
use tracing::debug;

pub struct HostCollector {
    node_id: String,
    service_id: String,
    system: Arc<Mutex<System>>,
}

impl HostCollector {
    pub fn new(node_id: impl Into<String>, service_id: impl Into<String>) -> Self {
        // Prime CPU counters; usage is measured between refreshes
        let mut system = System::new();
        system.refresh_cpu_usage();
        system.refresh_memory();

        Self {
            node_id: node_id.into(),
            service_id: service_id.into(),
            system: Arc::new(Mutex::new(system)),
        }
    }

    fn read_system(system: &Mutex<System>) -> Result<(f64, f64, f64)> {
        let mut sys = system
            .lock()
            .map_err(|e| anyhow::anyhow!("sysinfo lock poisoned: {}", e))?;
        sys.refresh_cpu_usage();
        sys.refresh_memory();

        let cpu = f64::from(sys.global_cpu_usage());
        let memory = percent(sys.used_memory(), sys.total_memory());

        let disks = Disks::new_with_refreshed_list();
        let (used, total) = disks.list().iter().fold((0u64, 0u64), |(used, total), d| {
            (
                used + d.total_space().saturating_sub(d.available_space()),
                total + d.total_space(),
            )
        });
        let disk = percent(used, total);

        Ok((cpu, memory, disk))
    }
}

fn percent(used: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        used as f64 / total as f64 * 100.0
    }
}

#[async_trait]
impl MetricCollector for HostCollector {
    async fn collect(&self) -> Result<MetricSample> {
        let system = Arc::clone(&self.system);
        let (cpu_usage, memory_usage, disk_usage) =
            tokio::task::spawn_blocking(move || Self::read_system(&system))
                .await
                .context("sysinfo task panicked")??;

        let (response_time_ms, error_rate) = {
            let mut rng = rand::thread_rng();
            (rng.gen_range(80.0..200.0), rng.gen_range(0.0..0.05))
        };

        debug!(cpu_usage, memory_usage, disk_usage, "Collected host metrics");

        Ok(MetricSample {
            timestamp: Utc::now(),
            node_id: self.node_id.clone(),
            service_id: self.service_id.clone(),
            cpu_usage,
            memory_usage,
            disk_usage,
            response_time_ms,
            error_rate,
        })
    }
}
