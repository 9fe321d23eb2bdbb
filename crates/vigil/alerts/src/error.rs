//! Error types for vigil-alerts.

use thiserror::Error;
use vigil_types::AlertId;

/// Errors from the alert store and acknowledgement ledger.
#[derive(Debug, Error)]
pub enum AlertError {
    /// The referenced alert does not exist.
    #[error("alert not found: {0}")]
    NotFound(AlertId),
}

/// Result type for alert operations.
pub type AlertResult<T> = Result<T, AlertError>;
