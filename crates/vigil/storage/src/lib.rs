//! # Vigil Storage - Durable Governance State
//!
//! All I/O for weights and suppression state, plus an audit trail of every
//! attempt.
//!
//! ## Key Components
//!
//! - [`GovernanceStore`]: the storage seam, returning structured outcomes
//! - [`PostgresStore`]: sqlx-backed durable store
//! - [`InMemoryStore`]: concurrent-map store for tests and store-less mode
//! - [`NullStore`]: skips every call when no backend is configured
//! - [`audit`]: the bounded persistence audit ring
//!
//! ## Failure semantics
//!
//! Save/load calls never throw past the call boundary: failures come back
//! as [`PersistOutcome::Failed`] / [`LoadOutcome::Failed`], a missing
//! backend as `Skipped`, and an empty table as `Empty` (first run is a
//! valid state, not an error). Every attempt lands on the audit trail.

pub mod audit;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod traits;

// Re-export main types
pub use audit::{AuditAction, AuditEntity, AuditRing, PersistenceAuditEntry};
pub use error::{StorageError, StorageResult};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use traits::{GovernanceStore, LoadOutcome, NullStore, PersistOutcome};
