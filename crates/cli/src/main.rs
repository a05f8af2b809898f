//! SentinelOps CLI
//!
//! Inspect a running monitoring agent: host health, recent samples and
//! incidents, and resolve incidents once handled.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{incidents, metrics, status};

/// SentinelOps CLI
#[derive(Parser)]
#[command(name = "sentinelctl")]
#[command(author, version, about = "CLI for the SentinelOps monitoring agent", long_about = None)]
pub struct Cli {
    /// Agent API URL (can also be set via SENTINEL_API_URL env var)
    #[arg(long, env = "SENTINEL_API_URL", default_value = "http://localhost:8080")]
    pub api_url: String,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show host health, the latest tick and model state
    Status,

    /// List and resolve incidents
    #[command(subcommand)]
    Incidents(IncidentCommands),

    /// Show the most recent metric samples
    Metrics {
        /// Number of samples to show
        #[arg(long, short, default_value_t = 20)]
        limit: usize,
    },
}

#[derive(Subcommand)]
pub enum IncidentCommands {
    /// List incidents, newest first
    List {
        /// Filter by status (open, resolved)
        #[arg(long)]
        status: Option<String>,

        /// Maximum number of incidents
        #[arg(long, short, default_value_t = 20)]
        limit: usize,
    },

    /// Resolve an open incident
    Resolve {
        /// Incident ID
        id: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let client = client::ApiClient::new(&cli.api_url)?;

    match cli.command {
        Commands::Status => {
            status::show_status(&client, cli.format).await?;
        }
        Commands::Incidents(incident_cmd) => match incident_cmd {
            IncidentCommands::List { status, limit } => {
                incidents::list_incidents(&client, status, limit, cli.format).await?;
            }
            IncidentCommands::Resolve { id } => {
                incidents::resolve_incident(&client, id, cli.format).await?;
            }
        },
        Commands::Metrics { limit } => {
            metrics::show_recent(&client, limit, cli.format).await?;
        }
    }

    Ok(())
}
