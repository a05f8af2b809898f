//! Recent metric samples

use anyhow::Result;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{format_timestamp, print_json, print_rows, print_warning, OutputFormat};

#[derive(Tabled)]
struct SampleRow {
    #[tabled(rename = "Time")]
    timestamp: String,
    #[tabled(rename = "CPU %")]
    cpu: String,
    #[tabled(rename = "Mem %")]
    memory: String,
    #[tabled(rename = "Disk %")]
    disk: String,
    #[tabled(rename = "RT ms")]
    response_time: String,
    #[tabled(rename = "Errors")]
    error_rate: String,
}

/// Show the newest samples first
pub async fn show_recent(client: &ApiClient, limit: usize, format: OutputFormat) -> Result<()> {
    let samples = client.recent_metrics(limit).await?;

    match format {
        OutputFormat::Json => print_json(&samples)?,
        OutputFormat::Table => {
            if samples.is_empty() {
                print_warning("No samples collected yet");
                return Ok(());
            }

            let rows = samples
                .iter()
                .map(|s| SampleRow {
                    timestamp: format_timestamp(&s.timestamp),
                    cpu: format!("{:.1}", s.cpu_usage),
                    memory: format!("{:.1}", s.memory_usage),
                    disk: format!("{:.1}", s.disk_usage),
                    response_time: format!("{:.0}", s.response_time_ms),
                    error_rate: format!("{:.3}", s.error_rate),
                })
                .collect();
            print_rows(rows);
        }
    }

    Ok(())
}
