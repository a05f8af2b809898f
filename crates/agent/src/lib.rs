//! SentinelOps agent host
//!
//! Wires the monitoring core from `agent-lib` to configuration, a
//! metric collector and the HTTP API.

pub mod api;
pub mod app;
pub mod config;

pub use app::Agent;
pub use config::AgentConfig;
