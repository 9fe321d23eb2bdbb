//! The adaptive weight tuning controller.
//!
//! Proposes a new weight vector from aggregated operational metrics, or
//! explains why none is proposed. Three safeguards bound its behavior:
//!
//! 1. **Warm-up**: the first N cycles only record history, so the
//!    controller does not react to noisy startup metrics.
//! 2. **Cooldown**: deviations inside the dead-band propose nothing and
//!    increment `consecutive_zero_error_cycles`.
//! 3. **Freeze**: enough consecutive zero-error cycles stop proposals
//!    entirely until a deviation reappears. Freeze state is persisted so a
//!    restart cannot silently un-freeze and issue a spurious correction
//!    against stale history.
//!
//! The controller computes but never mutates live state: the runner applies
//! proposals to the state machine and owns all persistence.

use tracing::{debug, info};
use vigil_types::{
    AggregatedMetrics, ControllerState, WeightSaveReason, WeightVector, WeightsLatestRow,
};

use crate::config::ControllerConfig;

/// Why a cycle proposed no adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Still inside the warm-up window.
    Warmup,
    /// Every deviation was inside the dead-band.
    DeadBand,
    /// The controller is frozen.
    Frozen,
}

/// Outcome of one tuning cycle.
#[derive(Debug, Clone)]
pub struct AdjustmentOutcome {
    /// Whether a new weight vector is proposed.
    pub adjusted: bool,

    /// The proposed vector, when `adjusted`.
    pub weights: Option<WeightVector>,

    /// The reason recorded on any persisted history row.
    pub reason: WeightSaveReason,

    /// Signed deviation of each metric from its target, in signal order
    /// (volume, severity_mix, false_suppression, escalation, re_noise).
    pub errs: [f64; 5],

    /// Why no adjustment was proposed, when `!adjusted`.
    pub skip: Option<SkipReason>,
}

/// Proportional controller over the noise-score weight vector.
pub struct TuningController {
    config: ControllerConfig,
    state: ControllerState,
}

impl TuningController {
    pub fn new(config: ControllerConfig) -> Self {
        Self {
            config,
            state: ControllerState::default(),
        }
    }

    /// The controller's safety state, for persistence.
    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    /// Whether the controller is currently frozen.
    pub fn is_frozen(&self) -> bool {
        self.state.freeze_active
    }

    /// Reconstruct safety state and the weight vector from one persisted
    /// row, without replaying history. Returns the vector to apply,
    /// renormalized in case the row is corrupt.
    pub fn restore_persistence(&mut self, row: &WeightsLatestRow) -> WeightVector {
        self.state = row.controller.clone();
        let weights = if row.weights.is_normalized() {
            row.weights
        } else {
            row.weights.renormalized()
        };
        info!(
            version = row.version,
            freeze_active = self.state.freeze_active,
            "controller state restored from persistence"
        );
        weights
    }

    /// Signed deviations of the metrics from their targets.
    ///
    /// Positive always means "on the bad side": a deficit for the
    /// higher-is-better rates, an excess for the lower-is-better ones.
    /// Order matches the weight component each deviation nudges.
    fn deviations(&self, metrics: &AggregatedMetrics) -> [f64; 5] {
        let t = &self.config.targets;
        [
            t.ack_rate - metrics.ack_rate,
            metrics.suspected_false_rate - t.suspected_false_rate,
            metrics.false_suppression_rate - t.false_suppression_rate,
            t.escalation_effectiveness - metrics.escalation_effectiveness,
            metrics.re_noise_rate - t.re_noise_rate,
        ]
    }

    /// Run one tuning cycle against the current weights.
    pub fn compute_adjustment(
        &mut self,
        cycle: u64,
        metrics: &AggregatedMetrics,
        current: &WeightVector,
    ) -> AdjustmentOutcome {
        let metrics = metrics.clamped();
        let errs = self.deviations(&metrics);
        let all_on_target = errs.iter().all(|e| e.abs() <= self.config.dead_band);

        if cycle < self.config.warmup_cycles as u64 {
            debug!(cycle, "warm-up cycle, recording only");
            return AdjustmentOutcome {
                adjusted: false,
                weights: None,
                reason: WeightSaveReason::Cooldown,
                errs,
                skip: Some(SkipReason::Warmup),
            };
        }

        if self.state.freeze_active {
            if all_on_target {
                return AdjustmentOutcome {
                    adjusted: false,
                    weights: None,
                    reason: WeightSaveReason::Freeze,
                    errs,
                    skip: Some(SkipReason::Frozen),
                };
            }
            // Deviation reappeared: thaw and fall through to adjust.
            info!(cycle, "deviation reappeared, controller unfreezing");
            self.state.freeze_active = false;
            self.state.freeze_since_cycle = None;
            self.state.consecutive_zero_error_cycles = 0;
        }

        if all_on_target {
            self.state.consecutive_zero_error_cycles += 1;

            if self.state.consecutive_zero_error_cycles >= self.config.freeze_after_zero_cycles {
                info!(
                    cycle,
                    zero_cycles = self.state.consecutive_zero_error_cycles,
                    "controller freezing after sustained zero-error period"
                );
                self.state.freeze_active = true;
                self.state.freeze_since_cycle = Some(cycle);
                return AdjustmentOutcome {
                    adjusted: false,
                    weights: None,
                    reason: WeightSaveReason::Freeze,
                    errs,
                    skip: Some(SkipReason::Frozen),
                };
            }

            return AdjustmentOutcome {
                adjusted: false,
                weights: None,
                reason: WeightSaveReason::Cooldown,
                errs,
                skip: Some(SkipReason::DeadBand),
            };
        }

        self.state.consecutive_zero_error_cycles = 0;

        // Each deviation nudges the weight of the signal best positioned to
        // correct it; renormalization redistributes the rest.
        let mut components = current.as_array();
        for (component, err) in components.iter_mut().zip(errs.iter()) {
            let delta = (self.config.gain * err).clamp(-self.config.max_step, self.config.max_step);
            *component = (*component + delta).max(0.0);
        }
        let proposed = WeightVector::from_array(components).renormalized();

        self.state.last_adjustment_cycle = Some(cycle);

        debug!(
            cycle,
            degraded = metrics.degraded,
            "controller proposing weight adjustment"
        );

        AdjustmentOutcome {
            adjusted: true,
            weights: Some(proposed),
            reason: WeightSaveReason::Applied,
            errs,
            skip: None,
        }
    }
}
