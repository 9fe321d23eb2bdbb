//! Controller configuration and metric target bands.

use serde::{Deserialize, Serialize};

/// Target values for each aggregated metric.
///
/// Deviations are signed: positive means the metric is on its bad side of
/// the target (deficit for the higher-is-better rates, excess for the
/// lower-is-better ones).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MetricTargets {
    /// Desired ack rate (higher is better).
    pub ack_rate: f64,

    /// Desired escalation effectiveness (higher is better).
    pub escalation_effectiveness: f64,

    /// Acceptable false-suppression rate (lower is better).
    pub false_suppression_rate: f64,

    /// Acceptable suspected-false rate (lower is better).
    pub suspected_false_rate: f64,

    /// Acceptable re-noise rate (lower is better).
    pub re_noise_rate: f64,
}

impl Default for MetricTargets {
    fn default() -> Self {
        Self {
            ack_rate: 0.6,
            escalation_effectiveness: 0.7,
            false_suppression_rate: 0.05,
            suspected_false_rate: 0.05,
            re_noise_rate: 0.1,
        }
    }
}

/// Configuration for the adaptive weight tuning controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Cycles that only record history before any adjustment applies.
    pub warmup_cycles: u32,

    /// Absolute deviation below which a metric counts as on-target.
    pub dead_band: f64,

    /// Proportional gain mapping a deviation into a weight delta.
    pub gain: f64,

    /// Per-component cap on a single cycle's weight delta.
    pub max_step: f64,

    /// Consecutive all-on-target cycles before the controller freezes.
    pub freeze_after_zero_cycles: u32,

    /// Metric targets.
    pub targets: MetricTargets,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            warmup_cycles: 5,
            dead_band: 0.05,
            gain: 0.5,
            max_step: 0.05,
            freeze_after_zero_cycles: 10,
            targets: MetricTargets::default(),
        }
    }
}
