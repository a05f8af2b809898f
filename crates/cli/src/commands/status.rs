//! Agent status: host health, latest tick and model state

use anyhow::Result;
use colored::Colorize;

use crate::client::{ApiClient, Detection, ReportResponse};
use crate::output::{
    color_risk, color_severity, color_status, format_optional, format_timestamp, print_info,
    print_json, print_warning, OutputFormat,
};

pub async fn show_status(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let report = client.report().await?;

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => print_report(&report),
    }

    Ok(())
}

fn print_report(report: &ReportResponse) {
    println!("{}", "Agent Status".bold());
    println!("{}", "=".repeat(50));
    println!("Health:                 {}", color_status(&report.health.status));
    println!(
        "Health Score:           {}",
        format_optional(report.health.health_score.map(|s| format!("{:.1}", s)))
    );

    let Some(tick) = &report.report else {
        println!();
        print_info("No tick has completed yet");
        return;
    };

    println!();
    println!("{}", "Latest Tick".bold());
    println!("{}", "-".repeat(50));
    println!("Tick:                   {}", tick.tick);
    println!("Time:                   {}", format_timestamp(&tick.timestamp));

    if let Some(sample) = &tick.sample {
        println!(
            "Node / Service:         {} / {}",
            sample.node_id.cyan(),
            sample.service_id.cyan()
        );
        println!("CPU:                    {:.1}%", sample.cpu_usage);
        println!("Memory:                 {:.1}%", sample.memory_usage);
        println!("Response Time:          {:.0}ms", sample.response_time_ms);
        println!("Error Rate:             {:.3}", sample.error_rate);
    }

    match &tick.detection {
        Some(Detection::Warmup { risk, progress }) => {
            println!("Risk:                   {}", color_risk(*risk));
            println!("Warm-up:                {:.1}%", progress);
        }
        Some(Detection::Healthy { risk, future_cpu }) => {
            println!("Risk:                   {}", color_risk(*risk));
            println!(
                "Forecast CPU:           {}",
                format_optional(future_cpu.map(|c| format!("{:.1}%", c)))
            );
        }
        Some(Detection::Anomaly {
            severity,
            risk,
            eta_minutes,
            incident_id,
            root_cause,
        }) => {
            println!("Risk:                   {}", color_risk(*risk));
            println!("Severity:               {}", color_severity(severity));
            println!(
                "Time to Failure:        {}",
                format_optional(eta_minutes.map(|m| format!("{} min", m)))
            );
            println!("Incident:               #{}", incident_id);
            println!("Root Cause:             {}", root_cause);
        }
        None => {}
    }

    if let Some(intent) = &tick.remediation {
        println!(
            "Remediation:            {} ({})",
            intent.action,
            color_status(&intent.status)
        );
    }

    if let Some(error) = &tick.error {
        print_warning(&format!("Tick failed: {}", error));
    }

    let models = &report.models;
    println!();
    println!("{}", "Models".bold());
    println!("{}", "-".repeat(50));
    println!(
        "Anomaly Trainings:      {} ({} failed)",
        models.anomaly_trainings, models.anomaly_failures
    );
    println!(
        "Forecast Trainings:     {} ({} failed)",
        models.forecast_trainings, models.forecast_failures
    );
    println!(
        "Forecast Age:           {}",
        format_optional(models.forecast_age_secs.map(|s| format!("{:.0}s", s)))
    );
}
