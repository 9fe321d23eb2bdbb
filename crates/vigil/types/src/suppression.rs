//! Suppression state as seen by persistence and introspection.
//!
//! The live state machine owns richer in-memory bookkeeping; this module is
//! the durable snapshot shape. Every field carries a serde default so a
//! partial or malformed row hydrates field-by-field instead of failing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::alert::Severity;
use crate::ids::DedupGroup;

/// Whether a group's alerts are surfaced or suppressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GroupState {
    /// Alerts in this group are surfaced downstream.
    #[default]
    Active,
    /// Alerts in this group are collapsed, not emitted.
    Suppressed,
}

impl std::fmt::Display for GroupState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GroupState::Active => write!(f, "ACTIVE"),
            GroupState::Suppressed => write!(f, "SUPPRESSED"),
        }
    }
}

fn default_group() -> DedupGroup {
    DedupGroup::new("unknown")
}

fn default_strategy() -> String {
    "weighted_sum".to_string()
}

/// Durable snapshot of one alert group's suppression state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuppressionSnapshot {
    /// Group key.
    #[serde(default = "default_group")]
    pub dedup_group: DedupGroup,

    /// Current state.
    #[serde(default)]
    pub state: GroupState,

    /// Last computed noise score in `[0,1]`.
    #[serde(default)]
    pub noise_score: f64,

    /// Enter threshold in effect when the state last changed.
    ///
    /// Recorded, not recomputed, so audits can replay the transition.
    #[serde(default)]
    pub noise_score_enter: f64,

    /// Exit threshold in effect when the state last changed.
    #[serde(default)]
    pub noise_score_exit: f64,

    /// Alerts collapsed while suppressed.
    #[serde(default)]
    pub suppressed_count: u64,

    /// Volume observed in the most recent scoring cycle.
    #[serde(default)]
    pub last_volume: u64,

    /// Severities seen in this group.
    #[serde(default)]
    pub severity_scope: Vec<Severity>,

    /// Scoring variant that produced the score.
    #[serde(default = "default_strategy")]
    pub strategy: String,

    /// Time of the last ACTIVE/SUPPRESSED flip.
    #[serde(default)]
    pub last_state_change_at: Option<DateTime<Utc>>,

    /// Start of the current suppression window, if suppressed.
    #[serde(default)]
    pub last_suppression_start: Option<DateTime<Utc>>,

    /// Scoring cycles without a state flip.
    #[serde(default)]
    pub consecutive_stable: u32,

    /// Consecutive cycles scored persistently high; resists premature exit.
    #[serde(default)]
    pub robust_high_streak: u32,
}

impl SuppressionSnapshot {
    /// A fresh ACTIVE snapshot for a newly seen group.
    pub fn new(dedup_group: DedupGroup) -> Self {
        Self {
            dedup_group,
            state: GroupState::Active,
            noise_score: 0.0,
            noise_score_enter: 0.0,
            noise_score_exit: 0.0,
            suppressed_count: 0,
            last_volume: 0,
            severity_scope: Vec::new(),
            strategy: default_strategy(),
            last_state_change_at: None,
            last_suppression_start: None,
            consecutive_stable: 0,
            robust_high_streak: 0,
        }
    }
}

/// Aggregate suppression metrics exposed to the tuning controller.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SuppressionMetrics {
    /// Total tracked groups.
    pub total_groups: usize,

    /// Groups currently suppressed.
    pub suppressed_groups: usize,

    /// Alerts collapsed across all suppressed groups.
    pub total_suppressed_alerts: u64,

    /// Estimated suppression accuracy in `[0,1]`.
    pub estimated_accuracy: f64,

    /// Estimated false-positive suppression rate in `[0,1]`.
    pub estimated_false_positive_rate: f64,
}
