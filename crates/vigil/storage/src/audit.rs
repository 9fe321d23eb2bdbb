//! Persistence audit trail.
//!
//! One entry per attempted save/load, regardless of outcome. Backends keep
//! a bounded in-memory ring so the trail survives even when the durable
//! store itself is the thing failing.

use std::collections::VecDeque;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What the persistence call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Save,
    Load,
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuditAction::Save => write!(f, "save"),
            AuditAction::Load => write!(f, "load"),
        }
    }
}

/// Which entity the call touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEntity {
    Weights,
    SuppressionState,
}

impl std::fmt::Display for AuditEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuditEntity::Weights => write!(f, "weights"),
            AuditEntity::SuppressionState => write!(f, "suppression_state"),
        }
    }
}

/// One attempted persistence action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceAuditEntry {
    pub action: AuditAction,
    pub entity: AuditEntity,

    /// Weights version for weight calls, row count for snapshot calls.
    pub version_or_count: i64,

    /// Wall time the call took.
    pub duration_ms: u64,

    pub success: bool,

    #[serde(default)]
    pub error: Option<String>,

    pub at: DateTime<Utc>,
}

impl PersistenceAuditEntry {
    pub fn new(
        action: AuditAction,
        entity: AuditEntity,
        version_or_count: i64,
        duration_ms: u64,
        success: bool,
        error: Option<String>,
    ) -> Self {
        Self {
            action,
            entity,
            version_or_count,
            duration_ms,
            success,
            error,
            at: Utc::now(),
        }
    }
}

/// Bounded in-memory audit ring shared by all backends.
pub struct AuditRing {
    entries: RwLock<VecDeque<PersistenceAuditEntry>>,
    cap: usize,
}

impl AuditRing {
    pub fn new(cap: usize) -> Self {
        Self {
            entries: RwLock::new(VecDeque::with_capacity(cap)),
            cap,
        }
    }

    pub fn push(&self, entry: PersistenceAuditEntry) {
        let mut entries = self.entries.write().unwrap();
        if entries.len() >= self.cap {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Most recent entries, newest last.
    pub fn recent(&self, limit: usize) -> Vec<PersistenceAuditEntry> {
        let entries = self.entries.read().unwrap();
        let skip = entries.len().saturating_sub(limit);
        entries.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for AuditRing {
    fn default() -> Self {
        Self::new(500)
    }
}
