//! In-memory governance store for development and testing.
//!
//! Implements the full [`GovernanceStore`] contract including the audit
//! trail. A failure-injection switch lets tests drive the runner's
//! persistence circuit breaker without a real outage.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::RwLock;
use std::time::Instant;

use async_trait::async_trait;
use dashmap::DashMap;
use vigil_types::{DedupGroup, SuppressionSnapshot, WeightsHistoryRow, WeightsLatestRow};

use crate::audit::{AuditAction, AuditEntity, AuditRing, PersistenceAuditEntry};
use crate::traits::{GovernanceStore, LoadOutcome, PersistOutcome};

/// In-memory store backed by concurrent maps.
pub struct InMemoryStore {
    latest: RwLock<Option<WeightsLatestRow>>,
    history: RwLock<Vec<WeightsHistoryRow>>,
    suppression: DashMap<DedupGroup, SuppressionSnapshot>,
    audit: AuditRing,

    /// When set, every save/load reports failure (test hook).
    fail_mode: AtomicBool,

    saves_attempted: AtomicI64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            latest: RwLock::new(None),
            history: RwLock::new(Vec::new()),
            suppression: DashMap::new(),
            audit: AuditRing::default(),
            fail_mode: AtomicBool::new(false),
            saves_attempted: AtomicI64::new(0),
        }
    }

    /// Toggle failure injection.
    pub fn set_fail_mode(&self, fail: bool) {
        self.fail_mode.store(fail, Ordering::SeqCst);
    }

    fn failing(&self) -> bool {
        self.fail_mode.load(Ordering::SeqCst)
    }

    /// Number of history rows written so far.
    pub fn history_len(&self) -> usize {
        self.history.read().unwrap().len()
    }

    /// Number of suppression snapshots stored.
    pub fn suppression_len(&self) -> usize {
        self.suppression.len()
    }

    /// Total save calls attempted, including injected failures.
    pub fn saves_attempted(&self) -> i64 {
        self.saves_attempted.load(Ordering::SeqCst)
    }

    /// Drop all stored state, keeping the audit trail.
    pub fn clear(&self) {
        *self.latest.write().unwrap() = None;
        self.history.write().unwrap().clear();
        self.suppression.clear();
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GovernanceStore for InMemoryStore {
    fn is_configured(&self) -> bool {
        true
    }

    async fn save_weights(
        &self,
        latest: &WeightsLatestRow,
        history: &WeightsHistoryRow,
    ) -> PersistOutcome {
        let start = Instant::now();
        self.saves_attempted.fetch_add(1, Ordering::SeqCst);

        let (outcome, success, error) = if self.failing() {
            let msg = "injected failure".to_string();
            (PersistOutcome::Failed(msg.clone()), false, Some(msg))
        } else {
            *self.latest.write().unwrap() = Some(latest.clone());
            self.history.write().unwrap().push(history.clone());
            (PersistOutcome::Saved, true, None)
        };

        self.audit.push(PersistenceAuditEntry::new(
            AuditAction::Save,
            AuditEntity::Weights,
            latest.version,
            start.elapsed().as_millis() as u64,
            success,
            error,
        ));
        outcome
    }

    async fn load_weights(&self) -> LoadOutcome<WeightsLatestRow> {
        let start = Instant::now();

        let (outcome, success, error) = if self.failing() {
            let msg = "injected failure".to_string();
            (LoadOutcome::Failed(msg.clone()), false, Some(msg))
        } else {
            match self.latest.read().unwrap().clone() {
                Some(row) => (LoadOutcome::Loaded(row), true, None),
                None => (LoadOutcome::Empty, true, None),
            }
        };

        self.audit.push(PersistenceAuditEntry::new(
            AuditAction::Load,
            AuditEntity::Weights,
            0,
            start.elapsed().as_millis() as u64,
            success,
            error,
        ));
        outcome
    }

    async fn save_suppression_states(&self, rows: &[SuppressionSnapshot]) -> PersistOutcome {
        let start = Instant::now();
        self.saves_attempted.fetch_add(1, Ordering::SeqCst);

        let (outcome, success, error) = if self.failing() {
            let msg = "injected failure".to_string();
            (PersistOutcome::Failed(msg.clone()), false, Some(msg))
        } else {
            // Replace-by-key: the batch's row wholly replaces the old one.
            for row in rows {
                self.suppression.insert(row.dedup_group.clone(), row.clone());
            }
            (PersistOutcome::Saved, true, None)
        };

        self.audit.push(PersistenceAuditEntry::new(
            AuditAction::Save,
            AuditEntity::SuppressionState,
            rows.len() as i64,
            start.elapsed().as_millis() as u64,
            success,
            error,
        ));
        outcome
    }

    async fn load_suppression_states(&self, limit: usize) -> LoadOutcome<Vec<SuppressionSnapshot>> {
        let start = Instant::now();

        let (outcome, success, error) = if self.failing() {
            let msg = "injected failure".to_string();
            (LoadOutcome::Failed(msg.clone()), false, Some(msg))
        } else {
            let rows: Vec<SuppressionSnapshot> = self
                .suppression
                .iter()
                .take(limit)
                .map(|entry| entry.value().clone())
                .collect();
            if rows.is_empty() {
                (LoadOutcome::Empty, true, None)
            } else {
                (LoadOutcome::Loaded(rows), true, None)
            }
        };

        let count = match &outcome {
            LoadOutcome::Loaded(rows) => rows.len() as i64,
            _ => 0,
        };
        self.audit.push(PersistenceAuditEntry::new(
            AuditAction::Load,
            AuditEntity::SuppressionState,
            count,
            start.elapsed().as_millis() as u64,
            success,
            error,
        ));
        outcome
    }

    async fn load_weight_history(&self, limit: usize) -> LoadOutcome<Vec<WeightsHistoryRow>> {
        if self.failing() {
            return LoadOutcome::Failed("injected failure".to_string());
        }
        let history = self.history.read().unwrap();
        if history.is_empty() {
            return LoadOutcome::Empty;
        }
        let rows: Vec<WeightsHistoryRow> = history.iter().rev().take(limit).cloned().collect();
        LoadOutcome::Loaded(rows)
    }

    fn recent_audit(&self, limit: usize) -> Vec<PersistenceAuditEntry> {
        self.audit.recent(limit)
    }
}
