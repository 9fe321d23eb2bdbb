//! The auto-policy engine.
//!
//! Runs at a slower cadence than the tuning loop. Each policy cycle first
//! judges the outcome of previously applied decisions against the fresh
//! snapshot, then proposes new decisions and applies those that clear the
//! confidence/risk gate. The running success rate of judged decisions
//! calibrates the confidence of everything proposed later, so an engine
//! with a poor track record gradually stops clearing its own gate.
//!
//! Handlers without a live backing component log a simulation and change
//! nothing; a policy cycle never raises.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::{debug, info, warn};
use vigil_runner::AdaptiveRunner;
use vigil_suppression::SuppressionStateMachine;
use vigil_types::{Decision, DecisionAction, DecisionDomain, DedupGroup, GroupState, RiskLevel};

use crate::config::PolicyConfig;
use crate::snapshot::PolicySnapshot;

/// Analysis trip points.
const RE_NOISE_TRIP: f64 = 0.2;
const FALSE_POSITIVE_TRIP: f64 = 0.15;
const ESCALATION_TRIP: f64 = 0.5;
const PERSISTENCE_FAILURE_TRIP: f64 = 0.3;

/// Result of one policy cycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolicyCycleReport {
    /// Previously applied decisions judged this cycle.
    pub judged: usize,

    /// Decisions proposed by analysis.
    pub proposed: usize,

    /// Proposed decisions that cleared the gate and were dispatched.
    pub applied: usize,
}

/// Gated cross-domain decision engine.
pub struct PolicyEngine {
    config: PolicyConfig,
    machine: Option<Arc<SuppressionStateMachine>>,
    runner: Option<Arc<AdaptiveRunner>>,
    decisions: Mutex<Vec<Decision>>,
}

impl PolicyEngine {
    pub fn new(config: PolicyConfig) -> Self {
        Self {
            config,
            machine: None,
            runner: None,
            decisions: Mutex::new(Vec::new()),
        }
    }

    /// Attach the suppression machine as the backing service for the
    /// threshold-adaptation and suppression-tuning domains.
    pub fn with_machine(mut self, machine: Arc<SuppressionStateMachine>) -> Self {
        self.machine = Some(machine);
        self
    }

    /// Attach the runner as the backing service for the weight-nudging and
    /// persistence-policy domains.
    pub fn with_runner(mut self, runner: Arc<AdaptiveRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    /// One full policy cycle against a fresh snapshot.
    pub fn run_cycle(&self, snapshot: &PolicySnapshot) -> PolicyCycleReport {
        let judged = self.evaluate_outcomes(snapshot);
        let proposed = self.analyze(snapshot);
        let proposed_count = proposed.len();

        let mut applied = 0;
        for mut decision in proposed {
            if self.clears_gate(&decision) {
                self.dispatch(&decision);
                decision.applied_at = Some(Utc::now());
                applied += 1;
            } else {
                debug!(
                    id = %decision.id,
                    domain = %decision.domain,
                    confidence = decision.confidence,
                    risk = ?decision.risk,
                    "decision held back by gate"
                );
            }
            self.record(decision);
        }

        PolicyCycleReport {
            judged,
            proposed: proposed_count,
            applied,
        }
    }

    /// Propose decisions from the snapshot. Confidence is scaled by the
    /// engine's calibration factor.
    pub fn analyze(&self, snapshot: &PolicySnapshot) -> Vec<Decision> {
        let calibration = self.calibration();
        let mut proposed = Vec::new();

        if snapshot.re_noise_rate > RE_NOISE_TRIP {
            let confidence = (0.6 + (snapshot.re_noise_rate - RE_NOISE_TRIP)) * calibration;
            proposed.push(Decision::new(
                DecisionDomain::SuppressionTuning,
                DecisionAction::SetAggressiveness { factor: 1.2 },
                confidence,
                RiskLevel::Medium,
                "re_noise_rate",
                snapshot.re_noise_rate,
            ));
        }

        if snapshot.false_positive_rate > FALSE_POSITIVE_TRIP {
            let confidence =
                (0.6 + (snapshot.false_positive_rate - FALSE_POSITIVE_TRIP) * 2.0) * calibration;
            proposed.push(Decision::new(
                DecisionDomain::ThresholdAdaptation,
                DecisionAction::AdjustThresholds {
                    enter: 0.85,
                    exit: 0.65,
                    dedup_group: self.most_marginal_suppressed_group(),
                },
                confidence,
                RiskLevel::Medium,
                "false_positive_rate",
                snapshot.false_positive_rate,
            ));
        }

        if snapshot.escalation_effectiveness < ESCALATION_TRIP {
            let confidence =
                (0.6 + (ESCALATION_TRIP - snapshot.escalation_effectiveness)) * calibration;
            proposed.push(Decision::new(
                DecisionDomain::WeightNudging,
                DecisionAction::NudgeWeight {
                    signal: "escalation".to_string(),
                    delta: 0.02,
                },
                confidence,
                RiskLevel::Low,
                "escalation_effectiveness",
                snapshot.escalation_effectiveness,
            ));
        }

        if snapshot.persistence_failure_ratio > PERSISTENCE_FAILURE_TRIP {
            proposed.push(Decision::new(
                DecisionDomain::PersistencePolicy,
                DecisionAction::SetDebounceCadence { every_cycles: 20 },
                0.8 * calibration,
                RiskLevel::Low,
                "persistence_failure_ratio",
                snapshot.persistence_failure_ratio,
            ));
        }

        proposed
    }

    /// Suppressed group whose score sits closest to its exit threshold.
    /// A suspected false positive is most likely hiding there, so a
    /// threshold adjustment targets it rather than the global defaults.
    fn most_marginal_suppressed_group(&self) -> Option<DedupGroup> {
        let machine = self.machine.as_ref()?;
        machine
            .get_all_group_snapshots()
            .into_iter()
            .filter(|s| s.state == GroupState::Suppressed)
            .min_by(|a, b| a.noise_score.total_cmp(&b.noise_score))
            .map(|s| s.dedup_group)
    }

    fn clears_gate(&self, decision: &Decision) -> bool {
        decision.confidence >= self.config.min_confidence && decision.risk <= self.config.max_risk
    }

    /// Dispatch one decision into its domain. A missing backing service
    /// logs a simulation; nothing here raises.
    fn dispatch(&self, decision: &Decision) {
        match (&decision.action, decision.domain) {
            (DecisionAction::NudgeWeight { signal, delta }, DecisionDomain::WeightNudging) => {
                match &self.runner {
                    Some(runner) => match runner.nudge_weight(signal, *delta) {
                        Ok(applied) => {
                            info!(id = %decision.id, signal, delta, ?applied, "weight nudge applied");
                        }
                        Err(e) => warn!(id = %decision.id, error = %e, "weight nudge rejected"),
                    },
                    None => info!(id = %decision.id, signal, delta, "no runner attached, simulating weight nudge"),
                }
            }
            (
                DecisionAction::AdjustThresholds {
                    enter,
                    exit,
                    dedup_group,
                },
                DecisionDomain::ThresholdAdaptation,
            ) => match (&self.machine, dedup_group) {
                (Some(machine), Some(group)) => {
                    match machine.set_dynamic_thresholds(group, *enter, *exit) {
                        Ok(()) => {
                            info!(id = %decision.id, group = group.as_str(), enter, exit, "group thresholds adjusted");
                        }
                        Err(e) => warn!(id = %decision.id, error = %e, "threshold adjustment rejected"),
                    }
                }
                (Some(machine), None) => match machine.set_default_thresholds(*enter, *exit) {
                    Ok(()) => info!(id = %decision.id, enter, exit, "default thresholds adjusted"),
                    Err(e) => warn!(id = %decision.id, error = %e, "threshold adjustment rejected"),
                },
                (None, _) => {
                    info!(id = %decision.id, enter, exit, "no machine attached, simulating threshold adjustment");
                }
            },
            (DecisionAction::SetAggressiveness { factor }, DecisionDomain::SuppressionTuning) => {
                match &self.machine {
                    Some(machine) => {
                        machine.set_aggressiveness(*factor);
                        info!(id = %decision.id, factor, "aggressiveness adjusted");
                    }
                    None => info!(id = %decision.id, factor, "no machine attached, simulating aggressiveness change"),
                }
            }
            (DecisionAction::SetDebounceCadence { every_cycles }, DecisionDomain::PersistencePolicy) => {
                match &self.runner {
                    Some(runner) => {
                        runner.set_cooldown_save_cadence(*every_cycles);
                        info!(id = %decision.id, every_cycles, "debounce cadence adjusted");
                    }
                    None => info!(id = %decision.id, every_cycles, "no runner attached, simulating cadence change"),
                }
            }
            (action, domain) => {
                warn!(id = %decision.id, ?action, %domain, "action does not belong to domain, ignoring");
            }
        }
    }

    /// Judge previously applied, not-yet-evaluated decisions against the
    /// fresh snapshot. Returns the number judged.
    pub fn evaluate_outcomes(&self, snapshot: &PolicySnapshot) -> usize {
        let mut decisions = self.decisions.lock().unwrap();
        let mut judged = 0;

        for decision in decisions.iter_mut().filter(|d| d.awaiting_outcome()) {
            let Some(current) = snapshot.metric_value(&decision.target_metric) else {
                continue;
            };
            let improvement = if PolicySnapshot::higher_is_better(&decision.target_metric) {
                current - decision.baseline_value
            } else {
                decision.baseline_value - current
            };

            let success = improvement >= self.config.min_improvement;
            decision.success = Some(success);
            decision.outcome_evaluated_at = Some(Utc::now());
            judged += 1;

            info!(
                id = %decision.id,
                metric = %decision.target_metric,
                baseline = decision.baseline_value,
                current,
                success,
                "decision outcome evaluated"
            );
        }

        judged
    }

    /// Fraction of judged decisions that succeeded. `None` until at least
    /// one decision has been judged.
    pub fn success_rate(&self) -> Option<f64> {
        let decisions = self.decisions.lock().unwrap();
        let judged: Vec<_> = decisions.iter().filter_map(|d| d.success).collect();
        if judged.is_empty() {
            return None;
        }
        let successes = judged.iter().filter(|s| **s).count();
        Some(successes as f64 / judged.len() as f64)
    }

    /// Confidence multiplier derived from the running success rate.
    fn calibration(&self) -> f64 {
        match self.success_rate() {
            Some(rate) => 0.5 + 0.5 * rate,
            None => 1.0,
        }
    }

    fn record(&self, decision: Decision) {
        let mut decisions = self.decisions.lock().unwrap();
        decisions.push(decision);
        let cap = self.config.history_cap;
        if decisions.len() > cap {
            let excess = decisions.len() - cap;
            decisions.drain(..excess);
        }
    }

    /// Decision history, oldest first.
    pub fn decisions(&self) -> Vec<Decision> {
        self.decisions.lock().unwrap().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use vigil_runner::RunnerConfig;
    use vigil_storage::NullStore;
    use vigil_suppression::SuppressionConfig;
    use vigil_tuning::{ControllerConfig, TuningController};
    use vigil_types::{AggregatedMetrics, DedupGroup, GroupState, MetricsError, MetricsProvider};

    struct NoopProvider;

    #[async_trait]
    impl MetricsProvider for NoopProvider {
        async fn collect_aggregated(&self) -> Result<AggregatedMetrics, MetricsError> {
            Ok(AggregatedMetrics::degraded_fallback())
        }
    }

    fn machine() -> Arc<SuppressionStateMachine> {
        Arc::new(SuppressionStateMachine::new(SuppressionConfig::default()).unwrap())
    }

    fn runner(machine: Arc<SuppressionStateMachine>) -> Arc<AdaptiveRunner> {
        Arc::new(AdaptiveRunner::new(
            RunnerConfig::default(),
            machine,
            TuningController::new(ControllerConfig::default()),
            Arc::new(NullStore),
            Arc::new(NoopProvider),
        ))
    }

    fn quiet_snapshot() -> PolicySnapshot {
        PolicySnapshot {
            re_noise_rate: 0.05,
            persistence_failure_ratio: 0.0,
            escalation_effectiveness: 0.8,
            suppression_accuracy: 0.95,
            alert_volume: 10,
            false_positive_rate: 0.02,
            mtta_ms: 30_000.0,
            collected_at: Utc::now(),
        }
    }

    fn noisy_snapshot() -> PolicySnapshot {
        PolicySnapshot {
            re_noise_rate: 0.4,
            persistence_failure_ratio: 0.5,
            escalation_effectiveness: 0.2,
            suppression_accuracy: 0.6,
            alert_volume: 300,
            false_positive_rate: 0.3,
            mtta_ms: 240_000.0,
            collected_at: Utc::now(),
        }
    }

    #[test]
    fn test_quiet_snapshot_proposes_nothing() {
        let engine = PolicyEngine::new(PolicyConfig::default());
        let report = engine.run_cycle(&quiet_snapshot());
        assert_eq!(report.proposed, 0);
        assert_eq!(report.applied, 0);
    }

    #[test]
    fn test_noisy_snapshot_proposes_across_domains() {
        let engine = PolicyEngine::new(PolicyConfig::default());
        let proposed = engine.analyze(&noisy_snapshot());
        assert_eq!(proposed.len(), 4);

        let domains: Vec<_> = proposed.iter().map(|d| d.domain).collect();
        assert!(domains.contains(&DecisionDomain::SuppressionTuning));
        assert!(domains.contains(&DecisionDomain::ThresholdAdaptation));
        assert!(domains.contains(&DecisionDomain::WeightNudging));
        assert!(domains.contains(&DecisionDomain::PersistencePolicy));
    }

    #[test]
    fn test_gate_blocks_low_confidence() {
        let engine = PolicyEngine::new(PolicyConfig {
            min_confidence: 0.99,
            ..Default::default()
        });
        let report = engine.run_cycle(&noisy_snapshot());
        assert!(report.proposed > 0);
        assert_eq!(report.applied, 0);
        assert!(engine.decisions().iter().all(|d| d.applied_at.is_none()));
    }

    #[test]
    fn test_gate_blocks_high_risk() {
        let engine = PolicyEngine::new(PolicyConfig {
            max_risk: RiskLevel::Low,
            ..Default::default()
        });
        let report = engine.run_cycle(&noisy_snapshot());
        let applied: Vec<_> = engine
            .decisions()
            .into_iter()
            .filter(|d| d.applied_at.is_some())
            .collect();
        assert_eq!(applied.len(), report.applied);
        assert!(applied.iter().all(|d| d.risk <= RiskLevel::Low));
    }

    #[test]
    fn test_dispatch_without_backing_services_is_harmless() {
        let engine = PolicyEngine::new(PolicyConfig::default());
        let report = engine.run_cycle(&noisy_snapshot());
        assert!(report.applied > 0);
    }

    #[test]
    fn test_threshold_adaptation_reaches_machine() {
        let machine = machine();
        let engine = PolicyEngine::new(PolicyConfig::default()).with_machine(machine.clone());

        let mut snapshot = quiet_snapshot();
        snapshot.false_positive_rate = 0.3;
        let report = engine.run_cycle(&snapshot);
        assert_eq!(report.applied, 1);

        // Defaults moved to enter=0.85: a 0.82 score no longer suppresses.
        assert_eq!(
            machine.record_score(&DedupGroup::new("g"), 0.82),
            GroupState::Active
        );
    }

    #[test]
    fn test_threshold_adaptation_targets_marginal_group() {
        let machine = machine();
        // Suppressed just past the default 0.8 enter threshold.
        assert_eq!(
            machine.record_score(&DedupGroup::new("hot"), 0.82),
            GroupState::Suppressed
        );
        let engine = PolicyEngine::new(PolicyConfig::default()).with_machine(machine.clone());

        let mut snapshot = quiet_snapshot();
        snapshot.false_positive_rate = 0.3;
        let report = engine.run_cycle(&snapshot);
        assert_eq!(report.applied, 1);

        let decision = engine.decisions().pop().unwrap();
        assert!(matches!(
            &decision.action,
            DecisionAction::AdjustThresholds {
                dedup_group: Some(group),
                ..
            } if group.as_str() == "hot"
        ));

        // Defaults are untouched: a fresh group still suppresses at 0.82.
        assert_eq!(
            machine.record_score(&DedupGroup::new("fresh"), 0.82),
            GroupState::Suppressed
        );
        // The targeted group re-opens under its raised band.
        assert_eq!(
            machine.record_score(&DedupGroup::new("hot"), 0.5),
            GroupState::Active
        );
    }

    #[test]
    fn test_weight_nudge_reaches_runner() {
        let machine = machine();
        let runner = runner(machine.clone());
        let engine = PolicyEngine::new(PolicyConfig::default()).with_runner(runner.clone());

        let before = runner.current_weights();
        let mut snapshot = quiet_snapshot();
        snapshot.escalation_effectiveness = 0.2;
        engine.run_cycle(&snapshot);

        assert!(runner.current_weights().escalation > before.escalation);
    }

    #[test]
    fn test_outcome_scoring_and_calibration() {
        let engine = PolicyEngine::new(PolicyConfig::default());

        let mut snapshot = quiet_snapshot();
        snapshot.escalation_effectiveness = 0.2;
        let first = engine.run_cycle(&snapshot);
        assert_eq!(first.applied, 1);
        assert!(engine.success_rate().is_none());

        // Metric got worse: the decision is judged a failure.
        snapshot.escalation_effectiveness = 0.1;
        let second = engine.run_cycle(&snapshot);
        assert_eq!(second.judged, 1);
        assert_eq!(engine.success_rate(), Some(0.0));

        // A judged decision is not judged twice.
        let third = engine.run_cycle(&snapshot);
        assert!(third.judged <= 1);

        // Failed history halves confidence; later proposals no longer
        // clear the default gate.
        let proposed = engine.analyze(&snapshot);
        assert!(proposed.iter().all(|d| d.confidence < 0.7));
    }

    #[test]
    fn test_successful_outcome_counts() {
        let engine = PolicyEngine::new(PolicyConfig::default());

        let mut snapshot = quiet_snapshot();
        snapshot.escalation_effectiveness = 0.2;
        engine.run_cycle(&snapshot);

        snapshot.escalation_effectiveness = 0.6;
        engine.run_cycle(&snapshot);
        assert_eq!(engine.success_rate(), Some(1.0));
    }

    #[test]
    fn test_history_is_capped() {
        let engine = PolicyEngine::new(PolicyConfig {
            history_cap: 3,
            min_confidence: 2.0, // never applied, pure recording
            ..Default::default()
        });
        for _ in 0..5 {
            engine.run_cycle(&noisy_snapshot());
        }
        assert_eq!(engine.decisions().len(), 3);
    }
}
