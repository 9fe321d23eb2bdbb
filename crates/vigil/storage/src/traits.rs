//! The storage seam.
//!
//! Every method returns a structured outcome rather than an error: a failed
//! save must feed the circuit breaker, not unwind the runner's tick loop,
//! and a missing backend is "skipped", never a failure.

use async_trait::async_trait;
use vigil_types::{SuppressionSnapshot, WeightsHistoryRow, WeightsLatestRow};

use crate::audit::PersistenceAuditEntry;

/// Outcome of a save call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistOutcome {
    /// The write landed.
    Saved,
    /// No durable store is configured; nothing was attempted.
    Skipped,
    /// The write was attempted and failed.
    Failed(String),
}

impl PersistOutcome {
    /// Whether a write was actually attempted (skips don't count toward
    /// circuit-breaker accounting).
    pub fn attempted(&self) -> bool {
        !matches!(self, PersistOutcome::Skipped)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, PersistOutcome::Failed(_))
    }
}

/// Outcome of a load call.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome<T> {
    /// Data was found.
    Loaded(T),
    /// The store is reachable but holds no data; expected on first run.
    Empty,
    /// No durable store is configured.
    Skipped,
    /// The read was attempted and failed.
    Failed(String),
}

impl<T> LoadOutcome<T> {
    pub fn loaded(self) -> Option<T> {
        match self {
            LoadOutcome::Loaded(value) => Some(value),
            _ => None,
        }
    }
}

/// Durable storage for governance state.
///
/// Implementations must never panic and never return transport errors
/// through these methods; failures are folded into the outcome types and
/// recorded on the audit trail.
#[async_trait]
pub trait GovernanceStore: Send + Sync {
    /// Presence check: whether a durable backend is configured.
    fn is_configured(&self) -> bool;

    /// Upsert the latest weights row and append one history row, atomically
    /// where the backend allows it. Audited regardless of outcome.
    async fn save_weights(
        &self,
        latest: &WeightsLatestRow,
        history: &WeightsHistoryRow,
    ) -> PersistOutcome;

    /// Load the latest weights row. `Empty` on first run is not an error.
    async fn load_weights(&self) -> LoadOutcome<WeightsLatestRow>;

    /// Replace the stored snapshot for every group present in the batch.
    async fn save_suppression_states(&self, rows: &[SuppressionSnapshot]) -> PersistOutcome;

    /// Load suppression snapshots, bounded by `limit`.
    async fn load_suppression_states(&self, limit: usize) -> LoadOutcome<Vec<SuppressionSnapshot>>;

    /// Load weight history rows, newest first, bounded by `limit`.
    async fn load_weight_history(&self, limit: usize) -> LoadOutcome<Vec<WeightsHistoryRow>>;

    /// Most recent audit entries, newest last.
    fn recent_audit(&self, limit: usize) -> Vec<PersistenceAuditEntry>;
}

/// Store used when no durable backend is configured: every call skips.
pub struct NullStore;

#[async_trait]
impl GovernanceStore for NullStore {
    fn is_configured(&self) -> bool {
        false
    }

    async fn save_weights(
        &self,
        _latest: &WeightsLatestRow,
        _history: &WeightsHistoryRow,
    ) -> PersistOutcome {
        PersistOutcome::Skipped
    }

    async fn load_weights(&self) -> LoadOutcome<WeightsLatestRow> {
        LoadOutcome::Skipped
    }

    async fn save_suppression_states(&self, _rows: &[SuppressionSnapshot]) -> PersistOutcome {
        PersistOutcome::Skipped
    }

    async fn load_suppression_states(
        &self,
        _limit: usize,
    ) -> LoadOutcome<Vec<SuppressionSnapshot>> {
        LoadOutcome::Skipped
    }

    async fn load_weight_history(&self, _limit: usize) -> LoadOutcome<Vec<WeightsHistoryRow>> {
        LoadOutcome::Skipped
    }

    fn recent_audit(&self, _limit: usize) -> Vec<PersistenceAuditEntry> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use vigil_types::{ControllerState, WeightSaveReason, WeightVector};

    #[tokio::test]
    async fn test_null_store_skips_everything() {
        let store = NullStore;
        assert!(!store.is_configured());

        let latest = WeightsLatestRow {
            version: 1,
            weights: WeightVector::default(),
            controller: ControllerState::default(),
            updated_at: Utc::now(),
        };
        let history = WeightsHistoryRow {
            cycle: 0,
            strategy: "weighted_sum".to_string(),
            weights: WeightVector::default(),
            reason: WeightSaveReason::Applied,
            meta: Default::default(),
            saved_at: Utc::now(),
        };

        assert_eq!(store.save_weights(&latest, &history).await, PersistOutcome::Skipped);
        assert_eq!(store.load_weights().await, LoadOutcome::Skipped);
        assert_eq!(
            store.save_suppression_states(&[]).await,
            PersistOutcome::Skipped
        );
        assert!(matches!(
            store.load_suppression_states(100).await,
            LoadOutcome::Skipped
        ));
    }

    #[test]
    fn test_skip_does_not_count_as_attempt() {
        assert!(!PersistOutcome::Skipped.attempted());
        assert!(PersistOutcome::Saved.attempted());
        assert!(PersistOutcome::Failed("x".to_string()).attempted());
        assert!(PersistOutcome::Failed("x".to_string()).is_failure());
    }
}
