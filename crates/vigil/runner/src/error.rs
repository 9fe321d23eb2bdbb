//! Runner error types.

use thiserror::Error;
use vigil_suppression::SuppressionError;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("unknown weight signal: {0}")]
    UnknownSignal(String),

    #[error("runner already started")]
    AlreadyRunning,

    #[error(transparent)]
    Suppression(#[from] SuppressionError),
}

pub type RunnerResult<T> = Result<T, RunnerError>;
