//! Policy engine configuration.

use serde::{Deserialize, Serialize};
use vigil_types::RiskLevel;

/// Gate and scoring parameters for the auto-policy engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Minimum confidence a decision needs to be applied.
    pub min_confidence: f64,

    /// Maximum risk level a decision may carry and still be applied.
    pub max_risk: RiskLevel,

    /// Minimum improvement of the targeted metric for an applied decision
    /// to be scored a success.
    pub min_improvement: f64,

    /// Decisions retained in the in-memory history.
    pub history_cap: usize,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.7,
            max_risk: RiskLevel::Medium,
            min_improvement: 0.01,
            history_cap: 500,
        }
    }
}
