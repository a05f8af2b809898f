//! Incident listing and resolution

use anyhow::Result;
use tabled::Tabled;

use crate::client::{ApiClient, Incident};
use crate::output::{
    color_severity, color_status, format_timestamp, print_json, print_rows, print_success,
    print_warning, OutputFormat,
};

/// Row for incidents table
#[derive(Tabled)]
struct IncidentRow {
    #[tabled(rename = "ID")]
    id: u64,
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Service")]
    service: String,
    #[tabled(rename = "Node")]
    node: String,
    #[tabled(rename = "Root Cause")]
    root_cause: String,
    #[tabled(rename = "Opened")]
    created_at: String,
}

impl From<&Incident> for IncidentRow {
    fn from(incident: &Incident) -> Self {
        Self {
            id: incident.id,
            severity: color_severity(&incident.severity),
            status: color_status(&incident.status),
            service: incident.service_id.clone(),
            node: incident.node_id.clone(),
            root_cause: incident.root_cause.clone(),
            created_at: format_timestamp(&incident.created_at),
        }
    }
}

pub async fn list_incidents(
    client: &ApiClient,
    status: Option<String>,
    limit: usize,
    format: OutputFormat,
) -> Result<()> {
    let incidents = client.incidents(status.as_deref(), limit).await?;

    match format {
        OutputFormat::Json => print_json(&incidents)?,
        OutputFormat::Table => {
            if incidents.is_empty() {
                print_warning("No incidents found");
                return Ok(());
            }

            print_rows(incidents.iter().map(IncidentRow::from).collect());
            println!("\nTotal: {} incidents", incidents.len());
        }
    }

    Ok(())
}

pub async fn resolve_incident(client: &ApiClient, id: u64, format: OutputFormat) -> Result<()> {
    let response = client.resolve_incident(id).await?;

    match format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Table => {
            let at = response
                .resolved_at
                .as_deref()
                .map(format_timestamp)
                .unwrap_or_default();
            if response.outcome == "already_resolved" {
                print_warning(&format!("Incident #{} was already resolved at {}", id, at));
            } else {
                print_success(&format!("Incident #{} resolved at {}", id, at));
            }
        }
    }

    Ok(())
}
