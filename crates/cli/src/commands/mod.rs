//! Subcommand implementations

pub mod incidents;
pub mod metrics;
pub mod status;
