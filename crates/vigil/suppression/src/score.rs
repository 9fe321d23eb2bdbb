//! Noise-score computation.
//!
//! The score is a weighted sum of five per-group signals, each in `[0,1]`.
//! With a normalized weight vector the sum is in `[0,1]` too. The linear
//! form keeps each weight's marginal contribution explainable in audit rows.

use serde::{Deserialize, Serialize};
use vigil_types::{Severity, WeightVector};

/// Operational-feedback signals shared across groups.
///
/// Updated by the runner from aggregated metrics; defaults are the same
/// on-target values substituted when metrics are degraded.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SignalContext {
    /// Fraction of suppressions later judged wrong.
    pub false_suppression_rate: f64,

    /// Fraction of escalations that led to action.
    pub escalation_effectiveness: f64,

    /// Fraction of groups that re-entered suppression shortly after exit.
    pub re_noise_rate: f64,
}

impl Default for SignalContext {
    fn default() -> Self {
        Self {
            false_suppression_rate: 0.05,
            escalation_effectiveness: 0.7,
            re_noise_rate: 0.1,
        }
    }
}

/// Log-scaled volume pressure in `[0,1]`.
pub fn volume_pressure(volume: u64, volume_ref: f64) -> f64 {
    if volume == 0 || volume_ref <= 0.0 {
        return 0.0;
    }
    ((1.0 + volume as f64).ln() / (1.0 + volume_ref).ln()).clamp(0.0, 1.0)
}

/// Severity-mix signal: the worst severity seen dominates.
pub fn severity_mix(scope: &[Severity]) -> f64 {
    scope
        .iter()
        .map(|s| match s {
            Severity::Critical => 1.0,
            Severity::Warn => 0.6,
            Severity::Info => 0.2,
        })
        .fold(0.0, f64::max)
}

/// Compute the noise score for one group.
pub fn noise_score(
    weights: &WeightVector,
    volume: u64,
    volume_ref: f64,
    scope: &[Severity],
    ctx: &SignalContext,
    aggressiveness: f64,
) -> f64 {
    let signals = [
        volume_pressure(volume, volume_ref),
        severity_mix(scope),
        // Trustworthy suppression history (few false suppressions) lets
        // scoring lean harder on the other signals.
        (1.0 - ctx.false_suppression_rate).clamp(0.0, 1.0),
        // Ineffective escalations mean surfaced alerts were not actionable.
        (1.0 - ctx.escalation_effectiveness).clamp(0.0, 1.0),
        ctx.re_noise_rate.clamp(0.0, 1.0),
    ];

    let weighted: f64 = weights
        .as_array()
        .iter()
        .zip(signals.iter())
        .map(|(w, s)| w * s)
        .sum();

    (weighted * aggressiveness).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_pressure_saturates_at_reference() {
        assert_eq!(volume_pressure(0, 50.0), 0.0);
        assert!(volume_pressure(10, 50.0) < volume_pressure(40, 50.0));
        assert_eq!(volume_pressure(50, 50.0), 1.0);
        assert_eq!(volume_pressure(5000, 50.0), 1.0);
    }

    #[test]
    fn test_severity_mix_takes_worst() {
        assert_eq!(severity_mix(&[]), 0.0);
        assert_eq!(severity_mix(&[Severity::Info]), 0.2);
        assert_eq!(severity_mix(&[Severity::Info, Severity::Critical]), 1.0);
    }

    #[test]
    fn test_noise_score_bounded() {
        let weights = WeightVector::default();
        let ctx = SignalContext {
            false_suppression_rate: 0.0,
            escalation_effectiveness: 0.0,
            re_noise_rate: 1.0,
        };
        let score = noise_score(
            &weights,
            1000,
            50.0,
            &[Severity::Critical],
            &ctx,
            5.0,
        );
        assert_eq!(score, 1.0);

        let quiet = noise_score(&weights, 0, 50.0, &[], &SignalContext::default(), 1.0);
        assert!(quiet < 0.5);
    }
}
