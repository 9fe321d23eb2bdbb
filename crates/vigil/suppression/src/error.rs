//! Error types for vigil-suppression.

use thiserror::Error;

/// Errors from the suppression state machine.
#[derive(Debug, Error)]
pub enum SuppressionError {
    /// Exit threshold is not strictly below enter threshold.
    #[error("exit threshold {exit} must be strictly below enter threshold {enter}")]
    InvalidThresholds { enter: f64, exit: f64 },

    /// A proposed weight vector could not be applied.
    #[error("invalid weight vector: {0}")]
    InvalidWeights(String),
}

/// Result type for suppression operations.
pub type SuppressionResult<T> = Result<T, SuppressionError>;
