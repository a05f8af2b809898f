//! SentinelOps agent - predictive health monitoring
//!
//! Samples host metrics on a fixed cadence, scores failure risk, opens
//! incidents and dispatches remediation, and serves the results over HTTP.

use anyhow::Result;
use sentinel_agent::{api, Agent, AgentConfig};
use tokio::sync::broadcast;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting sentinel-agent");

    let config = AgentConfig::load()?;
    info!(
        node_id = %config.node_id,
        service_id = %config.service_id,
        replay = config.replay_file.is_some(),
        "Agent configured"
    );

    let agent = Agent::build(&config)?;
    agent.logger.log_startup(AGENT_VERSION, config.interval_secs);

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let loop_handle = tokio::spawn(agent.control_loop.run(shutdown_rx));

    let api_port = config.api_port;
    let api_state = agent.state.clone();
    tokio::spawn(async move {
        if let Err(e) = api::serve(api_port, api_state).await {
            error!(error = %e, "API server stopped");
        }
    });

    tokio::signal::ctrl_c().await?;
    agent.logger.log_shutdown("SIGINT received");

    // The loop finishes its current tick before exiting
    let _ = shutdown_tx.send(());
    if let Err(e) = loop_handle.await {
        error!(error = %e, "Control loop task failed");
    }

    info!("Shutdown complete");
    Ok(())
}
