//! Error types for vigil-storage.
//!
//! Runtime save/load calls never surface these; they return structured
//! outcomes instead. Errors here are construction-time only.

use thiserror::Error;

/// Errors raised while constructing a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Could not connect to the database.
    #[error("storage connection failed: {0}")]
    Connection(String),

    /// Schema initialization failed.
    #[error("schema initialization failed: {0}")]
    Schema(String),
}

/// Result type for storage construction.
pub type StorageResult<T> = Result<T, StorageError>;
