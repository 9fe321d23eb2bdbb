//! Scoring weight vector and its persisted forms.
//!
//! The weight vector feeds the noise-score function. It must sum to 1 at all
//! times; anything loaded from storage or proposed by the controller is
//! renormalized before use so a corrupt row can never poison scoring.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Tolerance for the sum-to-1 invariant.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// The five noise-score weights.
///
/// Fields are named for the per-group signal each weight scales.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightVector {
    /// Volume pressure (log-scaled alert volume).
    pub volume: f64,

    /// Severity mix of the group's recent alerts.
    pub severity_mix: f64,

    /// Historical false-suppression rate (inverted signal).
    pub false_suppression: f64,

    /// Escalation effectiveness (inverted signal).
    pub escalation: f64,

    /// Re-noise rate after a group re-opens.
    pub re_noise: f64,
}

impl Default for WeightVector {
    fn default() -> Self {
        Self {
            volume: 0.30,
            severity_mix: 0.20,
            false_suppression: 0.20,
            escalation: 0.15,
            re_noise: 0.15,
        }
    }
}

impl WeightVector {
    /// Sum of all five weights.
    pub fn sum(&self) -> f64 {
        self.volume + self.severity_mix + self.false_suppression + self.escalation + self.re_noise
    }

    /// Whether the vector satisfies the sum-to-1 invariant within tolerance.
    pub fn is_normalized(&self) -> bool {
        (self.sum() - 1.0).abs() <= WEIGHT_SUM_TOLERANCE
            && self.as_array().iter().all(|w| *w >= 0.0)
    }

    /// Return a normalized copy.
    ///
    /// Negative components are clamped to zero first. A degenerate vector
    /// (sum is zero or not finite) falls back to the default weights rather
    /// than erroring: a corrupt persisted row must not prevent startup.
    pub fn renormalized(&self) -> Self {
        let clamped = Self {
            volume: self.volume.max(0.0),
            severity_mix: self.severity_mix.max(0.0),
            false_suppression: self.false_suppression.max(0.0),
            escalation: self.escalation.max(0.0),
            re_noise: self.re_noise.max(0.0),
        };

        let sum = clamped.sum();
        if !sum.is_finite() || sum <= 0.0 {
            return Self::default();
        }

        Self {
            volume: clamped.volume / sum,
            severity_mix: clamped.severity_mix / sum,
            false_suppression: clamped.false_suppression / sum,
            escalation: clamped.escalation / sum,
            re_noise: clamped.re_noise / sum,
        }
    }

    /// The weights as an array in signal order.
    pub fn as_array(&self) -> [f64; 5] {
        [
            self.volume,
            self.severity_mix,
            self.false_suppression,
            self.escalation,
            self.re_noise,
        ]
    }

    pub fn from_array(values: [f64; 5]) -> Self {
        Self {
            volume: values[0],
            severity_mix: values[1],
            false_suppression: values[2],
            escalation: values[3],
            re_noise: values[4],
        }
    }
}

/// Why a weight save was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightSaveReason {
    /// The controller proposed and the runner applied an adjustment.
    Applied,
    /// All deviations were inside the dead-band; save was debounce-triggered.
    Cooldown,
    /// The controller is frozen; saved to capture the freeze transition.
    Freeze,
}

impl std::fmt::Display for WeightSaveReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WeightSaveReason::Applied => write!(f, "applied"),
            WeightSaveReason::Cooldown => write!(f, "cooldown"),
            WeightSaveReason::Freeze => write!(f, "freeze"),
        }
    }
}

/// Controller safety state that must survive restarts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ControllerState {
    /// Whether the controller is frozen (no further proposals).
    #[serde(default)]
    pub freeze_active: bool,

    /// Cycle at which the current freeze began.
    #[serde(default)]
    pub freeze_since_cycle: Option<u64>,

    /// Last cycle at which an adjustment was applied.
    #[serde(default)]
    pub last_adjustment_cycle: Option<u64>,

    /// Consecutive cycles with all deviations inside the dead-band.
    #[serde(default)]
    pub consecutive_zero_error_cycles: u32,
}

/// Latest persisted weights, one row per logical version (upserted).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightsLatestRow {
    /// Logical version of the weight record.
    pub version: i64,

    /// The weight vector as last applied.
    pub weights: WeightVector,

    /// Controller safety state at save time.
    #[serde(default)]
    pub controller: ControllerState,

    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

/// Append-only weight history, one row per cycle where a save triggered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightsHistoryRow {
    /// Runner cycle that produced this row.
    pub cycle: u64,

    /// Scoring strategy the weights were applied to.
    pub strategy: String,

    /// The weight vector at this cycle.
    pub weights: WeightVector,

    /// Why this row was written.
    pub reason: WeightSaveReason,

    /// Metrics snapshot and deviations for after-the-fact explainability.
    #[serde(default)]
    pub meta: Map<String, Value>,

    /// Save time.
    pub saved_at: DateTime<Utc>,
}
