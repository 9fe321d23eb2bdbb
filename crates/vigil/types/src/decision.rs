//! Auto-policy decision model.
//!
//! A decision is created by analysis, mutated once when applied, and mutated
//! again once its outcome has been retrospectively scored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ids::{DecisionId, DedupGroup};

/// Domain a decision dispatches into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionDomain {
    /// Nudge a single weight component via the controller/runner.
    WeightNudging,
    /// Adjust per-group dynamic enter/exit thresholds.
    ThresholdAdaptation,
    /// Tune suppression aggressiveness parameters.
    SuppressionTuning,
    /// Change the persistence debounce cadence.
    PersistencePolicy,
}

impl std::fmt::Display for DecisionDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecisionDomain::WeightNudging => write!(f, "weight_nudging"),
            DecisionDomain::ThresholdAdaptation => write!(f, "threshold_adaptation"),
            DecisionDomain::SuppressionTuning => write!(f, "suppression_tuning"),
            DecisionDomain::PersistencePolicy => write!(f, "persistence_policy"),
        }
    }
}

/// Risk assessment attached to a proposed change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Concrete action a decision proposes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum DecisionAction {
    /// Shift weight mass toward or away from one signal.
    NudgeWeight {
        /// Signal name (`volume`, `severity_mix`, ...).
        signal: String,
        /// Signed delta before renormalization.
        delta: f64,
    },

    /// Adjust enter/exit suppression thresholds: for one group's dynamic
    /// band when a group is named, otherwise the defaults.
    AdjustThresholds {
        enter: f64,
        exit: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dedup_group: Option<DedupGroup>,
    },

    /// Scale suppression aggressiveness.
    SetAggressiveness { factor: f64 },

    /// Change the cooldown-save debounce cadence.
    SetDebounceCadence { every_cycles: u32 },
}

/// A cross-domain policy decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    /// Unique decision ID.
    pub id: DecisionId,

    /// Domain the action dispatches into.
    pub domain: DecisionDomain,

    /// The proposed action.
    pub action: DecisionAction,

    /// Confidence in `[0,1]` that the action improves the targeted metric.
    pub confidence: f64,

    /// Risk of applying the action.
    pub risk: RiskLevel,

    /// Metric the decision targets, with its value at proposal time.
    pub target_metric: String,

    /// Targeted metric's value when the decision was proposed.
    pub baseline_value: f64,

    /// Creation time.
    pub created_at: DateTime<Utc>,

    /// Set when the action was dispatched.
    #[serde(default)]
    pub applied_at: Option<DateTime<Utc>>,

    /// Set when the outcome was retrospectively scored.
    #[serde(default)]
    pub outcome_evaluated_at: Option<DateTime<Utc>>,

    /// Whether the targeted metric improved after application.
    #[serde(default)]
    pub success: Option<bool>,

    /// Open extension map for analysis context.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub meta: Map<String, Value>,
}

impl Decision {
    pub fn new(
        domain: DecisionDomain,
        action: DecisionAction,
        confidence: f64,
        risk: RiskLevel,
        target_metric: impl Into<String>,
        baseline_value: f64,
    ) -> Self {
        Self {
            id: DecisionId::generate(),
            domain,
            action,
            confidence: confidence.clamp(0.0, 1.0),
            risk,
            target_metric: target_metric.into(),
            baseline_value,
            created_at: Utc::now(),
            applied_at: None,
            outcome_evaluated_at: None,
            success: None,
            meta: Map::new(),
        }
    }

    /// Whether the decision has been applied but not yet judged.
    pub fn awaiting_outcome(&self) -> bool {
        self.applied_at.is_some() && self.outcome_evaluated_at.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_is_clamped() {
        let decision = Decision::new(
            DecisionDomain::WeightNudging,
            DecisionAction::NudgeWeight {
                signal: "volume".to_string(),
                delta: 0.02,
            },
            1.7,
            RiskLevel::Low,
            "ack_rate",
            0.4,
        );
        assert_eq!(decision.confidence, 1.0);
        assert!(!decision.awaiting_outcome());
    }

    #[test]
    fn test_risk_ordering() {
        assert!(RiskLevel::High > RiskLevel::Medium);
        assert!(RiskLevel::Medium > RiskLevel::Low);
    }
}
