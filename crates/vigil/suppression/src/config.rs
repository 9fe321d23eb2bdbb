//! Suppression configuration.

use serde::{Deserialize, Serialize};

use crate::error::SuppressionError;

/// Configuration for the suppression state machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuppressionConfig {
    /// Noise score at or above which an ACTIVE group becomes SUPPRESSED.
    pub enter_threshold: f64,

    /// Noise score at or below which a SUPPRESSED group becomes ACTIVE.
    ///
    /// Must be strictly below `enter_threshold` (hysteresis).
    pub exit_threshold: f64,

    /// Reference volume for log-scaling the volume-pressure signal.
    pub volume_ref: f64,

    /// Score at or above which a cycle counts toward the robust-high streak.
    pub robust_high_score: f64,

    /// Per-streak-cycle lowering of the effective exit threshold.
    pub robust_exit_step: f64,

    /// Lower bound on the effective exit threshold.
    pub robust_exit_floor: f64,

    /// Multiplier applied to computed noise scores (suppression tuning knob).
    pub aggressiveness: f64,
}

impl Default for SuppressionConfig {
    fn default() -> Self {
        Self {
            enter_threshold: 0.8,
            exit_threshold: 0.6,
            volume_ref: 50.0,
            robust_high_score: 0.75,
            robust_exit_step: 0.03,
            robust_exit_floor: 0.3,
            aggressiveness: 1.0,
        }
    }
}

impl SuppressionConfig {
    /// Validate the hysteresis invariant.
    pub fn validate(&self) -> Result<(), SuppressionError> {
        if !(self.exit_threshold < self.enter_threshold) {
            return Err(SuppressionError::InvalidThresholds {
                enter: self.enter_threshold,
                exit: self.exit_threshold,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(SuppressionConfig::default().validate().is_ok());
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let config = SuppressionConfig {
            enter_threshold: 0.5,
            exit_threshold: 0.7,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_equal_thresholds_rejected() {
        let config = SuppressionConfig {
            enter_threshold: 0.6,
            exit_threshold: 0.6,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
