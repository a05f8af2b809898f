//! Error taxonomy for the detection pipeline

use thiserror::Error;

/// Errors raised by stores, models and the incident lifecycle
///
/// `InsufficientData` is a mode rather than a fault: callers translate it
/// into warm-up or "model unavailable" and carry on.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SentinelError {
    #[error("insufficient data: need {needed} samples, have {have}")]
    InsufficientData { needed: usize, have: usize },

    #[error("model training failed: {0}")]
    ModelTraining(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("invalid incident id '{0}'")]
    InvalidIncidentId(String),
}

impl SentinelError {
    /// True for errors that should abandon the current tick but never the loop
    pub fn is_transient(&self) -> bool {
        matches!(self, SentinelError::StoreUnavailable(_))
    }
}
