//! The suppression state machine.
//!
//! Decides, per alert group and per scoring cycle, whether new alerts in
//! that group are surfaced or suppressed. Transitions use two thresholds
//! (enter/exit) so scores hovering near a single boundary cannot flap the
//! state, and a robust-high streak lowers the effective exit threshold after
//! sustained noise so one quiet cycle cannot re-open a chronically noisy
//! group.
//!
//! Weights are injected by the adaptive runner and treated as read-only
//! here; the machine never persists anything itself.

use std::sync::RwLock;

use chrono::Utc;
use dashmap::DashMap;
use tracing::{debug, info, warn};
use vigil_types::{
    Alert, DedupGroup, GroupState, SuppressionMetrics, SuppressionSnapshot, WeightVector,
};

use crate::config::SuppressionConfig;
use crate::error::{SuppressionError, SuppressionResult};
use crate::score::{noise_score, SignalContext};

/// Outcome of scoring one incoming alert.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SuppressionVerdict {
    /// Whether the alert should be emitted downstream.
    pub surfaced: bool,

    /// The group's state after scoring.
    pub state: GroupState,

    /// The noise score that produced the state.
    pub noise_score: f64,
}

/// Per-group entry: the durable snapshot plus runtime-only overrides.
#[derive(Debug, Clone)]
struct GroupEntry {
    snapshot: SuppressionSnapshot,

    /// Per-group dynamic thresholds, if the policy layer set any.
    dynamic_thresholds: Option<(f64, f64)>,
}

impl GroupEntry {
    fn new(dedup_group: DedupGroup) -> Self {
        Self {
            snapshot: SuppressionSnapshot::new(dedup_group),
            dynamic_thresholds: None,
        }
    }
}

/// Noise-aware ACTIVE/SUPPRESSED state machine over alert groups.
pub struct SuppressionStateMachine {
    groups: DashMap<DedupGroup, GroupEntry>,
    config: RwLock<SuppressionConfig>,
    weights: RwLock<WeightVector>,
    signal_ctx: RwLock<SignalContext>,
}

impl SuppressionStateMachine {
    /// Create a machine with validated configuration.
    pub fn new(config: SuppressionConfig) -> SuppressionResult<Self> {
        config.validate()?;
        Ok(Self {
            groups: DashMap::new(),
            config: RwLock::new(config),
            weights: RwLock::new(WeightVector::default()),
            signal_ctx: RwLock::new(SignalContext::default()),
        })
    }

    /// Score an incoming alert and decide whether it surfaces.
    ///
    /// `volume` is the group's observed volume for the current window, not
    /// just the sampled alert; it feeds the next scoring cycle so suppressed
    /// groups keep reflecting true pressure.
    pub fn observe(&self, alert: &Alert, volume: u64) -> SuppressionVerdict {
        let config = self.config.read().unwrap().clone();
        let weights = *self.weights.read().unwrap();
        let ctx = *self.signal_ctx.read().unwrap();

        let mut entry = self
            .groups
            .entry(alert.dedup_group.clone())
            .or_insert_with(|| GroupEntry::new(alert.dedup_group.clone()));

        entry.snapshot.last_volume = volume;
        if !entry.snapshot.severity_scope.contains(&alert.severity) {
            entry.snapshot.severity_scope.push(alert.severity);
        }

        let score = noise_score(
            &weights,
            volume,
            config.volume_ref,
            &entry.snapshot.severity_scope,
            &ctx,
            config.aggressiveness,
        );

        let state = Self::transition(&config, &mut entry, score);

        let surfaced = state == GroupState::Active;
        if !surfaced {
            entry.snapshot.suppressed_count += 1;
            debug!(
                dedup_group = %alert.dedup_group,
                suppressed_count = entry.snapshot.suppressed_count,
                noise_score = score,
                "alert collapsed into suppressed group"
            );
        }

        SuppressionVerdict {
            surfaced,
            state,
            noise_score: score,
        }
    }

    /// Apply a precomputed noise score to a group, creating it if needed.
    ///
    /// This is the scoring-cycle entry point used when signals are computed
    /// externally; `observe` funnels through the same transition rule.
    pub fn record_score(&self, dedup_group: &DedupGroup, score: f64) -> GroupState {
        let config = self.config.read().unwrap().clone();
        let mut entry = self
            .groups
            .entry(dedup_group.clone())
            .or_insert_with(|| GroupEntry::new(dedup_group.clone()));
        Self::transition(&config, &mut entry, score.clamp(0.0, 1.0))
    }

    /// The hysteresis transition rule. Returns the post-transition state.
    fn transition(config: &SuppressionConfig, entry: &mut GroupEntry, score: f64) -> GroupState {
        let (enter, exit) = entry
            .dynamic_thresholds
            .unwrap_or((config.enter_threshold, config.exit_threshold));

        let snapshot = &mut entry.snapshot;
        snapshot.noise_score = score;

        match snapshot.state {
            GroupState::Active if score >= enter => {
                info!(
                    dedup_group = %snapshot.dedup_group,
                    noise_score = score,
                    enter_threshold = enter,
                    "group entering suppression"
                );
                snapshot.state = GroupState::Suppressed;
                snapshot.noise_score_enter = enter;
                snapshot.noise_score_exit = exit;
                snapshot.last_state_change_at = Some(Utc::now());
                snapshot.last_suppression_start = Some(Utc::now());
                snapshot.consecutive_stable = 0;
            }
            GroupState::Suppressed => {
                // Sustained high-noise history lowers the bar a score must
                // drop below before the group re-opens.
                let effective_exit = (exit
                    - config.robust_exit_step * snapshot.robust_high_streak as f64)
                    .max(config.robust_exit_floor);

                if score <= effective_exit {
                    info!(
                        dedup_group = %snapshot.dedup_group,
                        noise_score = score,
                        exit_threshold = effective_exit,
                        "group exiting suppression"
                    );
                    snapshot.state = GroupState::Active;
                    snapshot.noise_score_enter = enter;
                    snapshot.noise_score_exit = effective_exit;
                    snapshot.last_state_change_at = Some(Utc::now());
                    snapshot.consecutive_stable = 0;
                } else {
                    snapshot.consecutive_stable += 1;
                }
            }
            GroupState::Active => {
                snapshot.consecutive_stable += 1;
            }
        }

        if score >= config.robust_high_score {
            snapshot.robust_high_streak += 1;
        } else {
            snapshot.robust_high_streak = 0;
        }

        snapshot.state
    }

    /// Inject a new weight vector.
    ///
    /// Non-finite components are rejected; a finite vector that does not sum
    /// to 1 within tolerance is renormalized and applied. Returns the vector
    /// actually applied.
    pub fn set_weights(&self, weights: WeightVector) -> SuppressionResult<WeightVector> {
        if weights.as_array().iter().any(|w| !w.is_finite()) {
            return Err(SuppressionError::InvalidWeights(
                "weight components must be finite".to_string(),
            ));
        }

        let applied = if weights.is_normalized() {
            weights
        } else {
            warn!(sum = weights.sum(), "weight vector off-invariant, renormalizing");
            weights.renormalized()
        };

        *self.weights.write().unwrap() = applied;
        Ok(applied)
    }

    /// The weight vector currently in effect.
    pub fn current_weights(&self) -> WeightVector {
        *self.weights.read().unwrap()
    }

    /// Update the shared operational-feedback signals.
    pub fn set_signal_context(&self, ctx: SignalContext) {
        *self.signal_ctx.write().unwrap() = ctx;
    }

    /// Set per-group dynamic thresholds (threshold adaptation domain).
    pub fn set_dynamic_thresholds(
        &self,
        dedup_group: &DedupGroup,
        enter: f64,
        exit: f64,
    ) -> SuppressionResult<()> {
        if !(exit < enter) {
            return Err(SuppressionError::InvalidThresholds { enter, exit });
        }
        let mut entry = self
            .groups
            .entry(dedup_group.clone())
            .or_insert_with(|| GroupEntry::new(dedup_group.clone()));
        entry.dynamic_thresholds = Some((enter, exit));
        Ok(())
    }

    /// Replace the default enter/exit thresholds for all groups without
    /// per-group overrides.
    pub fn set_default_thresholds(&self, enter: f64, exit: f64) -> SuppressionResult<()> {
        if !(exit < enter) {
            return Err(SuppressionError::InvalidThresholds { enter, exit });
        }
        let mut config = self.config.write().unwrap();
        config.enter_threshold = enter;
        config.exit_threshold = exit;
        Ok(())
    }

    /// Scale suppression aggressiveness (suppression tuning domain).
    pub fn set_aggressiveness(&self, factor: f64) {
        self.config.write().unwrap().aggressiveness = factor.clamp(0.1, 3.0);
    }

    /// Full state dump for persistence.
    pub fn get_all_group_snapshots(&self) -> Vec<SuppressionSnapshot> {
        self.groups
            .iter()
            .map(|entry| entry.snapshot.clone())
            .collect()
    }

    /// Restore state after a restart.
    ///
    /// Idempotent: a row wholly replaces any existing entry for its group,
    /// so replaying the same rows never double-counts `suppressed_count`.
    /// Scores are clamped; rows are accepted field-by-field (missing fields
    /// already defaulted at deserialization) and never rejected.
    pub fn hydrate_from_snapshots(&self, rows: Vec<SuppressionSnapshot>) {
        for mut snapshot in rows {
            snapshot.noise_score = snapshot.noise_score.clamp(0.0, 1.0);
            let key = snapshot.dedup_group.clone();
            let mut entry = self
                .groups
                .entry(key)
                .or_insert_with(|| GroupEntry::new(snapshot.dedup_group.clone()));
            entry.snapshot = snapshot;
        }
    }

    /// Aggregate suppression metrics for the tuning controller.
    pub fn get_suppression_metrics(&self) -> SuppressionMetrics {
        let config = self.config.read().unwrap();
        let mut total_groups = 0usize;
        let mut suppressed_groups = 0usize;
        let mut total_suppressed_alerts = 0u64;
        let mut solid = 0usize;
        let mut suspect = 0usize;

        for entry in self.groups.iter() {
            total_groups += 1;
            let s = &entry.snapshot;
            if s.state == GroupState::Suppressed {
                suppressed_groups += 1;
                total_suppressed_alerts += s.suppressed_count;
                if s.noise_score >= config.enter_threshold {
                    solid += 1;
                }
                // Suppressed but scoring below the exit bar: a suspect hold,
                // only the robust-high streak is keeping it closed.
                if s.noise_score <= config.exit_threshold {
                    suspect += 1;
                }
            }
        }

        let (estimated_accuracy, estimated_false_positive_rate) = if suppressed_groups == 0 {
            (1.0, 0.0)
        } else {
            (
                solid as f64 / suppressed_groups as f64,
                suspect as f64 / suppressed_groups as f64,
            )
        };

        SuppressionMetrics {
            total_groups,
            suppressed_groups,
            total_suppressed_alerts,
            estimated_accuracy,
            estimated_false_positive_rate,
        }
    }

    /// Snapshot for a single group, if tracked.
    pub fn get_group_snapshot(&self, dedup_group: &DedupGroup) -> Option<SuppressionSnapshot> {
        self.groups.get(dedup_group).map(|e| e.snapshot.clone())
    }

    /// Drop all in-memory group state.
    pub fn clear(&self) {
        self.groups.clear();
    }

    /// Number of tracked groups.
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_types::{Rationale, RationaleCode, Severity};

    fn machine() -> SuppressionStateMachine {
        SuppressionStateMachine::new(SuppressionConfig::default()).unwrap()
    }

    fn alert(group: &str, severity: Severity) -> Alert {
        Alert::new(
            group,
            severity,
            "test alert",
            Rationale::new(RationaleCode::External {
                detail: "test".to_string(),
            }),
        )
    }

    #[test]
    fn test_hysteresis_no_flapping_near_enter_threshold() {
        let machine = machine();
        let group = DedupGroup::new("g.flap");
        let mut transitions = 0;
        let mut last_state = GroupState::Active;

        for score in [0.81, 0.79, 0.81, 0.79] {
            let state = machine.record_score(&group, score);
            if state != last_state {
                transitions += 1;
                last_state = state;
            }
        }

        // One genuine crossing of the enter threshold, no flapping after.
        assert_eq!(transitions, 1);
        assert_eq!(last_state, GroupState::Suppressed);

        let snapshot = machine.get_group_snapshot(&group).unwrap();
        assert_eq!(snapshot.noise_score_enter, 0.8);
    }

    #[test]
    fn test_exit_requires_score_below_exit_threshold() {
        let machine = machine();
        let group = DedupGroup::new("g.exit");

        machine.record_score(&group, 0.85);
        assert_eq!(machine.record_score(&group, 0.65), GroupState::Suppressed);
        assert_eq!(machine.record_score(&group, 0.55), GroupState::Active);
    }

    #[test]
    fn test_robust_high_streak_resists_single_quiet_cycle() {
        let machine = machine();
        let group = DedupGroup::new("g.robust");

        for _ in 0..5 {
            machine.record_score(&group, 0.9);
        }
        let snapshot = machine.get_group_snapshot(&group).unwrap();
        assert_eq!(snapshot.robust_high_streak, 5);

        // Effective exit is 0.6 - 5 * 0.03 = 0.45; one quiet cycle at 0.5
        // is not enough to re-open the group.
        assert_eq!(machine.record_score(&group, 0.5), GroupState::Suppressed);

        // The quiet cycle reset the streak; a second one exits.
        assert_eq!(machine.record_score(&group, 0.5), GroupState::Active);
    }

    #[test]
    fn test_observe_collapses_alerts_while_suppressed() {
        let machine = machine();
        let group = DedupGroup::new("g.collapse");

        // High volume of criticals with hostile feedback signals drives the
        // score over the enter threshold.
        machine.set_signal_context(SignalContext {
            false_suppression_rate: 0.0,
            escalation_effectiveness: 0.0,
            re_noise_rate: 1.0,
        });

        let a = alert("g.collapse", Severity::Critical);
        let first = machine.observe(&a, 500);
        assert_eq!(first.state, GroupState::Suppressed);
        assert!(!first.surfaced);

        let second = machine.observe(&a, 600);
        assert!(!second.surfaced);

        let snapshot = machine.get_group_snapshot(&group).unwrap();
        assert_eq!(snapshot.suppressed_count, 2);
        assert_eq!(snapshot.last_volume, 600);
        assert_eq!(snapshot.severity_scope, vec![Severity::Critical]);
    }

    #[test]
    fn test_low_noise_alert_surfaces() {
        let machine = machine();
        let verdict = machine.observe(&alert("g.quiet", Severity::Info), 1);
        assert!(verdict.surfaced);
        assert_eq!(verdict.state, GroupState::Active);
    }

    #[test]
    fn test_set_weights_renormalizes_off_invariant_vector() {
        let machine = machine();
        let skewed = WeightVector::from_array([2.0, 1.0, 1.0, 0.5, 0.5]);
        let applied = machine.set_weights(skewed).unwrap();
        assert!(applied.is_normalized());
        assert_eq!(machine.current_weights(), applied);
    }

    #[test]
    fn test_set_weights_rejects_non_finite() {
        let machine = machine();
        let bad = WeightVector::from_array([f64::NAN, 0.25, 0.25, 0.25, 0.25]);
        assert!(machine.set_weights(bad).is_err());
    }

    #[test]
    fn test_hydrate_is_idempotent() {
        let machine = machine();
        let mut row = SuppressionSnapshot::new(DedupGroup::new("g1"));
        row.state = GroupState::Suppressed;
        row.noise_score = 0.92;
        row.suppressed_count = 7;

        machine.hydrate_from_snapshots(vec![row.clone()]);
        machine.hydrate_from_snapshots(vec![row]);

        let snapshot = machine
            .get_group_snapshot(&DedupGroup::new("g1"))
            .unwrap();
        assert_eq!(snapshot.state, GroupState::Suppressed);
        assert_eq!(snapshot.suppressed_count, 7);
    }

    #[test]
    fn test_hydrate_accepts_partial_rows() {
        let machine = machine();
        let row: SuppressionSnapshot =
            serde_json::from_str(r#"{"dedup_group":"g2","noise_score":12.0}"#).unwrap();
        machine.hydrate_from_snapshots(vec![row]);

        let snapshot = machine
            .get_group_snapshot(&DedupGroup::new("g2"))
            .unwrap();
        assert_eq!(snapshot.state, GroupState::Active);
        assert_eq!(snapshot.noise_score, 1.0);
    }

    #[test]
    fn test_dynamic_thresholds_apply_per_group() {
        let machine = machine();
        let strict = DedupGroup::new("g.strict");
        machine.set_dynamic_thresholds(&strict, 0.5, 0.2).unwrap();

        assert_eq!(machine.record_score(&strict, 0.55), GroupState::Suppressed);
        // Another group at the same score stays active under defaults.
        assert_eq!(
            machine.record_score(&DedupGroup::new("g.lax"), 0.55),
            GroupState::Active
        );
    }

    #[test]
    fn test_dynamic_thresholds_reject_inverted_pair() {
        let machine = machine();
        let group = DedupGroup::new("g.bad");
        assert!(machine.set_dynamic_thresholds(&group, 0.3, 0.6).is_err());
    }

    #[test]
    fn test_suppression_metrics_estimates() {
        let machine = machine();
        machine.record_score(&DedupGroup::new("g.solid"), 0.9);
        machine.record_score(&DedupGroup::new("g.quiet"), 0.1);

        let metrics = machine.get_suppression_metrics();
        assert_eq!(metrics.total_groups, 2);
        assert_eq!(metrics.suppressed_groups, 1);
        assert_eq!(metrics.estimated_accuracy, 1.0);
        assert_eq!(metrics.estimated_false_positive_rate, 0.0);
    }
}
