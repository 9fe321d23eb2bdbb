//! Aggregated operational metrics and the provider seam.
//!
//! The engine depends only on the metric shape; how metrics are computed
//! (ack ledgers, escalation logs) lives behind [`MetricsProvider`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Aggregated operational metrics for one tuning cycle.
///
/// All rates are in `[0,1]`. `degraded` is set when any value came from a
/// fallback default rather than live computation; the controller records
/// degraded cycles but still runs on them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregatedMetrics {
    /// Fraction of surfaced alerts acknowledged within the lookback window.
    pub ack_rate: f64,

    /// Fraction of escalations that led to action.
    pub escalation_effectiveness: f64,

    /// Fraction of suppressions later judged wrong.
    pub false_suppression_rate: f64,

    /// Fraction of suppressions flagged as suspect but not yet judged.
    pub suspected_false_rate: f64,

    /// Fraction of groups that re-entered suppression shortly after exiting.
    pub re_noise_rate: f64,

    /// Whether any value above is a fallback default.
    #[serde(default)]
    pub degraded: bool,
}

impl AggregatedMetrics {
    /// Safe defaults substituted when the provider is unavailable.
    ///
    /// Values sit on the controller's target bands so a degraded cycle
    /// proposes no adjustment.
    pub fn degraded_fallback() -> Self {
        Self {
            ack_rate: 0.6,
            escalation_effectiveness: 0.7,
            false_suppression_rate: 0.05,
            suspected_false_rate: 0.05,
            re_noise_rate: 0.1,
            degraded: true,
        }
    }

    /// Clamp every rate into `[0,1]`, preserving the degraded flag.
    pub fn clamped(&self) -> Self {
        Self {
            ack_rate: self.ack_rate.clamp(0.0, 1.0),
            escalation_effectiveness: self.escalation_effectiveness.clamp(0.0, 1.0),
            false_suppression_rate: self.false_suppression_rate.clamp(0.0, 1.0),
            suspected_false_rate: self.suspected_false_rate.clamp(0.0, 1.0),
            re_noise_rate: self.re_noise_rate.clamp(0.0, 1.0),
            degraded: self.degraded,
        }
    }
}

/// Source of aggregated metrics for the adaptive runner.
///
/// Implementations must not panic; a failed collection is reported as an
/// error and the runner substitutes [`AggregatedMetrics::degraded_fallback`].
#[async_trait]
pub trait MetricsProvider: Send + Sync {
    /// Collect one aggregated metrics snapshot.
    async fn collect_aggregated(&self) -> Result<AggregatedMetrics, MetricsError>;
}

/// Error from a metrics provider.
#[derive(Debug, Clone, thiserror::Error)]
#[error("metrics collection failed: {0}")]
pub struct MetricsError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_out_of_range_rates() {
        let raw = AggregatedMetrics {
            ack_rate: 1.4,
            escalation_effectiveness: -0.2,
            false_suppression_rate: 0.5,
            suspected_false_rate: 0.0,
            re_noise_rate: 2.0,
            degraded: true,
        };
        let clamped = raw.clamped();
        assert_eq!(clamped.ack_rate, 1.0);
        assert_eq!(clamped.escalation_effectiveness, 0.0);
        assert_eq!(clamped.re_noise_rate, 1.0);
        assert!(clamped.degraded);
    }
}
