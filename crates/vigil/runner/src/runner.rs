//! The adaptive runner.
//!
//! Owns the periodic tuning cycle: collect metrics, run the controller,
//! apply proposed weights to the suppression machine, and persist state
//! under debounce rules guarded by the circuit breaker. The runner is the
//! only component that touches the store at runtime; the machine and the
//! controller stay persistence-free.
//!
//! Cycles are non-reentrant: a tick that arrives while the previous cycle
//! is still in flight is dropped, not queued.

use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use vigil_storage::{GovernanceStore, LoadOutcome, PersistOutcome};
use vigil_suppression::{SignalContext, SuppressionStateMachine};
use vigil_tuning::TuningController;
use vigil_types::{
    AggregatedMetrics, MetricsProvider, WeightSaveReason, WeightVector, WeightsHistoryRow,
    WeightsLatestRow,
};

use crate::breaker::{PersistenceBreaker, PersistenceWindow};
use crate::config::RunnerConfig;
use crate::error::RunnerError;
use crate::status::{CycleResult, LogRing, RunnerStatus};

/// Weight signal names, in component order.
const SIGNAL_NAMES: [&str; 5] = [
    "volume",
    "severity_mix",
    "false_suppression",
    "escalation",
    "re_noise",
];

/// Mutable bookkeeping behind one lock.
struct RunState {
    running: bool,
    cycle: u64,
    hydrated: bool,
    last_result: Option<CycleResult>,

    cooldown_streak: u32,
    cycles_since_weight_save: u32,
    cycles_since_snapshot: u32,
    last_reason_was_freeze: bool,

    /// Baseline counts at the last persisted snapshot batch.
    saved_suppressed_groups: usize,
    saved_total_groups: usize,
}

impl RunState {
    fn new() -> Self {
        Self {
            running: false,
            cycle: 0,
            hydrated: false,
            last_result: None,
            cooldown_streak: 0,
            // First debounced save must not wait out the minimum gap.
            cycles_since_weight_save: u32::MAX,
            cycles_since_snapshot: 0,
            last_reason_was_freeze: false,
            saved_suppressed_groups: 0,
            saved_total_groups: 0,
        }
    }
}

/// Periodic tuning loop binding machine, controller and store together.
pub struct AdaptiveRunner {
    config: RwLock<RunnerConfig>,
    machine: Arc<SuppressionStateMachine>,
    controller: Mutex<TuningController>,
    store: Arc<dyn GovernanceStore>,
    provider: Arc<dyn MetricsProvider>,
    breaker: PersistenceBreaker,
    logs: LogRing,
    state: Mutex<RunState>,
    cycle_guard: tokio::sync::Mutex<()>,
    shutdown: Mutex<Option<watch::Sender<bool>>>,
}

impl AdaptiveRunner {
    pub fn new(
        config: RunnerConfig,
        machine: Arc<SuppressionStateMachine>,
        controller: TuningController,
        store: Arc<dyn GovernanceStore>,
        provider: Arc<dyn MetricsProvider>,
    ) -> Self {
        let breaker = PersistenceBreaker::new(config.breaker.clone());
        let logs = LogRing::new(config.log_limit.min(200));
        Self {
            config: RwLock::new(config),
            machine,
            controller: Mutex::new(controller),
            store,
            provider,
            breaker,
            logs,
            state: Mutex::new(RunState::new()),
            cycle_guard: tokio::sync::Mutex::new(()),
            shutdown: Mutex::new(None),
        }
    }

    /// Restore weights, controller safety state and suppression snapshots
    /// from the store. Any failure is logged and the runner starts cold;
    /// hydration never blocks startup.
    pub async fn hydrate(&self) {
        match self.store.load_weights().await {
            LoadOutcome::Loaded(row) => {
                let weights = self.controller.lock().unwrap().restore_persistence(&row);
                if let Err(e) = self.machine.set_weights(weights) {
                    warn!(error = %e, "restored weights rejected, keeping defaults");
                }
                self.logs
                    .push("info", format!("hydrated weights version {}", row.version));
            }
            LoadOutcome::Empty | LoadOutcome::Skipped => {
                info!("no persisted weights, starting with defaults");
            }
            LoadOutcome::Failed(e) => {
                warn!(error = %e, "weight hydration failed, starting cold");
                self.logs.push("warn", format!("weight hydration failed: {e}"));
            }
        }

        let limit = self.config.read().unwrap().persistence.load_snapshot_limit;
        match self.store.load_suppression_states(limit).await {
            LoadOutcome::Loaded(rows) => {
                let count = rows.len();
                self.machine.hydrate_from_snapshots(rows);
                info!(groups = count, "suppression state hydrated");
                self.logs
                    .push("info", format!("hydrated {count} suppression groups"));
            }
            LoadOutcome::Empty | LoadOutcome::Skipped => {}
            LoadOutcome::Failed(e) => {
                warn!(error = %e, "suppression hydration failed, starting cold");
                self.logs
                    .push("warn", format!("suppression hydration failed: {e}"));
            }
        }

        let metrics = self.machine.get_suppression_metrics();
        let mut state = self.state.lock().unwrap();
        state.saved_suppressed_groups = metrics.suppressed_groups;
        state.saved_total_groups = metrics.total_groups;
        state.hydrated = true;
    }

    /// Start the periodic loop. Fails if already running.
    pub fn start(self: &Arc<Self>) -> Result<(), RunnerError> {
        let interval_ms = {
            let mut state = self.state.lock().unwrap();
            if state.running {
                return Err(RunnerError::AlreadyRunning);
            }
            state.running = true;
            self.config.read().unwrap().interval_ms
        };

        let (tx, mut rx) = watch::channel(false);
        *self.shutdown.lock().unwrap() = Some(tx);

        let runner = Arc::clone(self);
        tokio::spawn(async move {
            // Hydration completes before the first tick.
            let hydrated = runner.state.lock().unwrap().hydrated;
            if !hydrated {
                runner.hydrate().await;
            }

            let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        runner.run_cycle().await;
                    }
                    _ = rx.changed() => break,
                }
            }
            debug!("runner loop stopped");
        });

        info!(interval_ms, "adaptive runner started");
        Ok(())
    }

    /// Stop the periodic loop. An in-flight cycle finishes first.
    pub fn stop(&self) {
        if let Some(tx) = self.shutdown.lock().unwrap().take() {
            let _ = tx.send(true);
        }
        self.state.lock().unwrap().running = false;
        info!("adaptive runner stopped");
    }

    /// Run one tuning cycle. A call that overlaps an in-flight cycle is
    /// dropped.
    pub async fn run_cycle(&self) -> Option<CycleResult> {
        let _guard = match self.cycle_guard.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                debug!("cycle already in flight, dropping tick");
                return None;
            }
        };

        let config = self.config.read().unwrap().clone();
        let cycle = self.state.lock().unwrap().cycle;

        let metrics = match self.provider.collect_aggregated().await {
            Ok(metrics) => metrics.clamped(),
            Err(e) => {
                warn!(cycle, error = %e, "metrics collection failed, using fallback");
                self.logs
                    .push("warn", format!("cycle {cycle}: metrics degraded: {e}"));
                AggregatedMetrics::degraded_fallback()
            }
        };

        self.machine.set_signal_context(SignalContext {
            false_suppression_rate: metrics.false_suppression_rate,
            escalation_effectiveness: metrics.escalation_effectiveness,
            re_noise_rate: metrics.re_noise_rate,
        });

        let current = self.machine.current_weights();
        let outcome = self
            .controller
            .lock()
            .unwrap()
            .compute_adjustment(cycle, &metrics, &current);

        if let Some(proposed) = outcome.weights {
            match self.machine.set_weights(proposed) {
                Ok(applied) => {
                    debug!(cycle, ?applied, "weight adjustment applied");
                }
                Err(e) => {
                    warn!(cycle, error = %e, "controller proposed invalid weights");
                }
            }
        }

        // Debounce bookkeeping.
        let (want_weight_save, freeze_started) = {
            let mut state = self.state.lock().unwrap();
            if outcome.reason == WeightSaveReason::Cooldown && !outcome.adjusted {
                state.cooldown_streak += 1;
            } else {
                state.cooldown_streak = 0;
            }
            state.cycles_since_weight_save = state.cycles_since_weight_save.saturating_add(1);
            state.cycles_since_snapshot += 1;

            let freeze_started =
                outcome.reason == WeightSaveReason::Freeze && !state.last_reason_was_freeze;
            let debounce_due = outcome.reason == WeightSaveReason::Cooldown
                && state.cooldown_streak >= config.persistence.cooldown_every_cycles
                && state.cycles_since_weight_save >= config.persistence.min_cycles_between_saves;

            (outcome.adjusted || freeze_started || debounce_due, freeze_started)
        };

        let mut weights_saved = false;
        if want_weight_save {
            if self.breaker.should_attempt(cycle) {
                weights_saved = self
                    .save_weights(cycle, &config, &metrics, &outcome.reason, &outcome.errs)
                    .await;
                if weights_saved {
                    let mut state = self.state.lock().unwrap();
                    state.cycles_since_weight_save = 0;
                    state.cooldown_streak = 0;
                }
            } else {
                debug!(cycle, "persistence disabled, weight save skipped");
                self.logs
                    .push("debug", format!("cycle {cycle}: weight save skipped by breaker"));
            }
        }

        let snapshots_saved = self.maybe_save_snapshots(cycle, &config).await;

        let result = CycleResult {
            cycle,
            adjusted: outcome.adjusted,
            reason: outcome.reason,
            degraded: metrics.degraded,
            weights_saved,
            snapshots_saved,
            completed_at: Utc::now(),
        };

        self.logs.push(
            "info",
            format!(
                "cycle {cycle}: adjusted={} reason={:?} degraded={} saved={}/{}",
                result.adjusted, result.reason, result.degraded, weights_saved, snapshots_saved
            ),
        );
        if freeze_started {
            self.logs
                .push("info", format!("cycle {cycle}: controller froze"));
        }

        {
            let mut state = self.state.lock().unwrap();
            state.cycle += 1;
            state.last_reason_was_freeze = result.reason == WeightSaveReason::Freeze;
            state.last_result = Some(result.clone());
        }

        Some(result)
    }

    async fn save_weights(
        &self,
        cycle: u64,
        config: &RunnerConfig,
        metrics: &AggregatedMetrics,
        reason: &WeightSaveReason,
        errs: &[f64; 5],
    ) -> bool {
        let weights = self.machine.current_weights();
        let controller_state = self.controller.lock().unwrap().state().clone();

        let latest = WeightsLatestRow {
            version: config.weights_version,
            weights,
            controller: controller_state,
            updated_at: Utc::now(),
        };

        let mut meta = serde_json::Map::new();
        meta.insert("errs".to_string(), serde_json::json!(errs));
        meta.insert("degraded".to_string(), serde_json::json!(metrics.degraded));
        let history = WeightsHistoryRow {
            cycle,
            strategy: config.strategy.clone(),
            weights,
            reason: *reason,
            meta,
            saved_at: Utc::now(),
        };

        let outcome = self.store.save_weights(&latest, &history).await;
        if outcome.attempted() {
            self.breaker.record(outcome.is_failure());
        }
        match outcome {
            PersistOutcome::Saved => true,
            PersistOutcome::Skipped => false,
            PersistOutcome::Failed(e) => {
                warn!(cycle, error = %e, "weight save failed");
                self.logs
                    .push("warn", format!("cycle {cycle}: weight save failed: {e}"));
                false
            }
        }
    }

    async fn maybe_save_snapshots(&self, cycle: u64, config: &RunnerConfig) -> bool {
        let snapshots = self.machine.get_all_group_snapshots();
        if snapshots.is_empty() {
            return false;
        }
        let metrics = self.machine.get_suppression_metrics();

        let want = {
            let state = self.state.lock().unwrap();
            let delta = metrics
                .suppressed_groups
                .abs_diff(state.saved_suppressed_groups)
                + metrics.total_groups.abs_diff(state.saved_total_groups);
            let significant = delta >= config.persistence.snapshot_min_changed;
            significant || state.cycles_since_snapshot >= config.persistence.snapshot_every_cycles
        };
        if !want {
            return false;
        }

        if !self.breaker.should_attempt(cycle) {
            debug!(cycle, "persistence disabled, snapshot save skipped");
            return false;
        }

        let outcome = self.store.save_suppression_states(&snapshots).await;
        if outcome.attempted() {
            self.breaker.record(outcome.is_failure());
        }
        match outcome {
            PersistOutcome::Saved => {
                let mut state = self.state.lock().unwrap();
                state.saved_suppressed_groups = metrics.suppressed_groups;
                state.saved_total_groups = metrics.total_groups;
                state.cycles_since_snapshot = 0;
                true
            }
            PersistOutcome::Skipped => false,
            PersistOutcome::Failed(e) => {
                warn!(cycle, error = %e, "snapshot save failed");
                self.logs
                    .push("warn", format!("cycle {cycle}: snapshot save failed: {e}"));
                false
            }
        }
    }

    /// Nudge one weight component by `delta` and apply the renormalized
    /// vector. Returns the vector actually applied.
    pub fn nudge_weight(&self, signal: &str, delta: f64) -> Result<WeightVector, RunnerError> {
        let index = SIGNAL_NAMES
            .iter()
            .position(|name| *name == signal)
            .ok_or_else(|| RunnerError::UnknownSignal(signal.to_string()))?;

        let mut components = self.machine.current_weights().as_array();
        components[index] = (components[index] + delta).max(0.0);
        let applied = self
            .machine
            .set_weights(WeightVector::from_array(components).renormalized())?;
        info!(signal, delta, "weight nudged");
        Ok(applied)
    }

    /// Change the cooldown-save cadence (persistence policy domain).
    pub fn set_cooldown_save_cadence(&self, every_cycles: u32) {
        self.config
            .write()
            .unwrap()
            .persistence
            .cooldown_every_cycles = every_cycles.max(1);
        info!(every_cycles, "cooldown save cadence changed");
    }

    pub fn current_weights(&self) -> WeightVector {
        self.machine.current_weights()
    }

    /// Point-in-time status.
    pub fn status(&self) -> RunnerStatus {
        let state = self.state.lock().unwrap();
        RunnerStatus {
            running: state.running,
            cycle: state.cycle,
            hydrated: state.hydrated,
            last_result: state.last_result.clone(),
            recent_logs: self.logs.recent(20),
            current_weights: self.machine.current_weights(),
            controller_frozen: self.controller.lock().unwrap().is_frozen(),
            persistence: self.breaker.window(),
        }
    }

    /// Recent cycle log entries, bounded by the configured log limit.
    pub fn get_logs(&self, limit: usize) -> Vec<crate::status::LogEntry> {
        let cap = self.config.read().unwrap().log_limit.min(200);
        self.logs.recent(limit.min(cap))
    }

    pub fn persistence_window(&self) -> PersistenceWindow {
        self.breaker.window()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use vigil_storage::InMemoryStore;
    use vigil_suppression::SuppressionConfig;
    use vigil_tuning::ControllerConfig;
    use vigil_types::{ControllerState, DedupGroup, GroupState, MetricsError};

    struct StaticProvider {
        metrics: AggregatedMetrics,
        fail: AtomicBool,
    }

    impl StaticProvider {
        fn on_target() -> Self {
            Self {
                metrics: AggregatedMetrics {
                    ack_rate: 0.6,
                    escalation_effectiveness: 0.7,
                    false_suppression_rate: 0.05,
                    suspected_false_rate: 0.05,
                    re_noise_rate: 0.1,
                    degraded: false,
                },
                fail: AtomicBool::new(false),
            }
        }

        fn low_ack() -> Self {
            Self {
                metrics: AggregatedMetrics {
                    ack_rate: 0.2,
                    ..Self::on_target().metrics
                },
                fail: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl MetricsProvider for StaticProvider {
        async fn collect_aggregated(&self) -> Result<AggregatedMetrics, MetricsError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(MetricsError("provider offline".to_string()));
            }
            Ok(self.metrics)
        }
    }

    fn machine() -> Arc<SuppressionStateMachine> {
        Arc::new(SuppressionStateMachine::new(SuppressionConfig::default()).unwrap())
    }

    fn runner(
        config: RunnerConfig,
        controller_config: ControllerConfig,
        store: Arc<InMemoryStore>,
        provider: Arc<StaticProvider>,
    ) -> Arc<AdaptiveRunner> {
        Arc::new(AdaptiveRunner::new(
            config,
            machine(),
            TuningController::new(controller_config),
            store,
            provider,
        ))
    }

    fn no_warmup() -> ControllerConfig {
        ControllerConfig {
            warmup_cycles: 0,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_debounce_saves_fewer_rows_than_cycles() {
        let store = Arc::new(InMemoryStore::new());
        let mut config = RunnerConfig::default();
        config.persistence.cooldown_every_cycles = 5;
        config.persistence.min_cycles_between_saves = 3;
        let runner = runner(
            config,
            ControllerConfig {
                warmup_cycles: 0,
                freeze_after_zero_cycles: 10,
                ..Default::default()
            },
            store.clone(),
            Arc::new(StaticProvider::on_target()),
        );

        for _ in 0..15 {
            runner.run_cycle().await;
        }

        let rows = store.history_len();
        assert!(rows >= 1, "on-target cycles must still checkpoint");
        assert!(rows < 15, "every cycle persisted, debounce not applied");
        // One debounced cooldown save plus the freeze transition.
        assert_eq!(rows, 2);
    }

    #[tokio::test]
    async fn test_adjustment_applies_and_persists() {
        let store = Arc::new(InMemoryStore::new());
        let runner = runner(
            RunnerConfig::default(),
            no_warmup(),
            store.clone(),
            Arc::new(StaticProvider::low_ack()),
        );

        let result = runner.run_cycle().await.unwrap();
        assert!(result.adjusted);
        assert!(result.weights_saved);
        assert!(runner.current_weights().volume > WeightVector::default().volume);

        let latest = store.load_weights().await.loaded().unwrap();
        assert_eq!(latest.weights, runner.current_weights());
    }

    #[tokio::test]
    async fn test_breaker_disables_then_recovers() {
        let store = Arc::new(InMemoryStore::new());
        let mut config = RunnerConfig::default();
        config.persistence.cooldown_every_cycles = 1;
        config.persistence.min_cycles_between_saves = 0;
        config.persistence.snapshot_every_cycles = 10_000;
        config.breaker.probe_every_cycles = 1;
        let runner = runner(
            config,
            ControllerConfig {
                warmup_cycles: 0,
                freeze_after_zero_cycles: 10_000,
                ..Default::default()
            },
            store.clone(),
            Arc::new(StaticProvider::on_target()),
        );

        store.set_fail_mode(true);
        for _ in 0..10 {
            runner.run_cycle().await;
        }
        assert!(runner.persistence_window().disabled);

        store.set_fail_mode(false);
        for _ in 0..10 {
            runner.run_cycle().await;
        }
        assert!(!runner.persistence_window().disabled);
        assert!(store.history_len() > 0);
    }

    #[tokio::test]
    async fn test_hydrate_restores_freeze_and_suppressed_group() {
        let store = Arc::new(InMemoryStore::new());

        // Seed the store as a previous process would have left it.
        let latest = WeightsLatestRow {
            version: 1,
            weights: WeightVector::default(),
            controller: ControllerState {
                freeze_active: true,
                freeze_since_cycle: Some(42),
                last_adjustment_cycle: Some(30),
                consecutive_zero_error_cycles: 12,
            },
            updated_at: Utc::now(),
        };
        let history = WeightsHistoryRow {
            cycle: 42,
            strategy: "weighted_sum".to_string(),
            weights: WeightVector::default(),
            reason: WeightSaveReason::Freeze,
            meta: Default::default(),
            saved_at: Utc::now(),
        };
        store.save_weights(&latest, &history).await;

        let previous = machine();
        previous.record_score(&DedupGroup::new("g1"), 0.9);
        store
            .save_suppression_states(&previous.get_all_group_snapshots())
            .await;

        let runner = runner(
            RunnerConfig::default(),
            no_warmup(),
            store,
            Arc::new(StaticProvider::on_target()),
        );
        runner.hydrate().await;

        let status = runner.status();
        assert!(status.hydrated);
        assert!(status.controller_frozen);

        let snapshot = runner
            .machine
            .get_group_snapshot(&DedupGroup::new("g1"))
            .unwrap();
        assert_eq!(snapshot.state, GroupState::Suppressed);
    }

    #[tokio::test]
    async fn test_failed_hydration_starts_cold() {
        let store = Arc::new(InMemoryStore::new());
        store.set_fail_mode(true);

        let runner = runner(
            RunnerConfig::default(),
            no_warmup(),
            store,
            Arc::new(StaticProvider::on_target()),
        );
        runner.hydrate().await;

        let status = runner.status();
        assert!(status.hydrated);
        assert_eq!(status.current_weights, WeightVector::default());
        assert_eq!(runner.machine.group_count(), 0);
    }

    #[tokio::test]
    async fn test_metrics_failure_falls_back_degraded() {
        let provider = Arc::new(StaticProvider::on_target());
        provider.fail.store(true, Ordering::SeqCst);

        let runner = runner(
            RunnerConfig::default(),
            no_warmup(),
            Arc::new(InMemoryStore::new()),
            provider,
        );

        let result = runner.run_cycle().await.unwrap();
        assert!(result.degraded);
        // Fallback values sit on target, so no blind correction.
        assert!(!result.adjusted);
    }

    #[tokio::test]
    async fn test_snapshot_saved_on_significant_change_only() {
        let store = Arc::new(InMemoryStore::new());
        let mut config = RunnerConfig::default();
        // Keep weight saves out of the attempt count.
        config.persistence.cooldown_every_cycles = 10_000;
        config.persistence.min_cycles_between_saves = 10_000;
        config.persistence.snapshot_every_cycles = 10_000;
        let runner = runner(
            config,
            ControllerConfig {
                warmup_cycles: 0,
                freeze_after_zero_cycles: 10_000,
                ..Default::default()
            },
            store.clone(),
            Arc::new(StaticProvider::on_target()),
        );

        // No groups yet, nothing to snapshot.
        runner.run_cycle().await;
        assert_eq!(store.saves_attempted(), 0);

        for name in ["g1", "g2", "g3"] {
            runner.machine.record_score(&DedupGroup::new(name), 0.9);
        }
        let result = runner.run_cycle().await.unwrap();
        assert!(result.snapshots_saved);
        assert_eq!(store.suppression_len(), 3);

        // Unchanged state does not re-save.
        let result = runner.run_cycle().await.unwrap();
        assert!(!result.snapshots_saved);
        assert_eq!(store.saves_attempted(), 1);
    }

    #[tokio::test]
    async fn test_snapshot_requires_minimum_changed_groups() {
        let store = Arc::new(InMemoryStore::new());
        let mut config = RunnerConfig::default();
        config.persistence.cooldown_every_cycles = 10_000;
        config.persistence.min_cycles_between_saves = 10_000;
        config.persistence.snapshot_every_cycles = 10_000;
        let runner = runner(
            config,
            ControllerConfig {
                warmup_cycles: 0,
                freeze_after_zero_cycles: 10_000,
                ..Default::default()
            },
            store.clone(),
            Arc::new(StaticProvider::on_target()),
        );

        for name in ["g1", "g2", "g3"] {
            runner.machine.record_score(&DedupGroup::new(name), 0.9);
        }
        runner.run_cycle().await;
        assert_eq!(store.saves_attempted(), 1);

        // One quiet new group moves two counters by one each; still below
        // the three-group bar.
        runner.machine.record_score(&DedupGroup::new("g4"), 0.1);
        let result = runner.run_cycle().await.unwrap();
        assert!(!result.snapshots_saved);
        assert_eq!(store.saves_attempted(), 1);

        // Two more suppressed groups push the cumulative delta over the bar.
        for name in ["g5", "g6"] {
            runner.machine.record_score(&DedupGroup::new(name), 0.9);
        }
        let result = runner.run_cycle().await.unwrap();
        assert!(result.snapshots_saved);
        assert_eq!(store.saves_attempted(), 2);
    }

    #[tokio::test]
    async fn test_start_and_stop_loop() {
        let runner = runner(
            RunnerConfig {
                interval_ms: 10,
                ..Default::default()
            },
            no_warmup(),
            Arc::new(InMemoryStore::new()),
            Arc::new(StaticProvider::on_target()),
        );

        runner.start().unwrap();
        assert!(runner.start().is_err());
        assert!(runner.status().running);

        tokio::time::sleep(Duration::from_millis(60)).await;
        runner.stop();
        assert!(!runner.status().running);
        assert!(runner.status().cycle > 0);
    }

    #[tokio::test]
    async fn test_nudge_weight_renormalizes() {
        let runner = runner(
            RunnerConfig::default(),
            no_warmup(),
            Arc::new(InMemoryStore::new()),
            Arc::new(StaticProvider::on_target()),
        );

        let before = runner.current_weights();
        let applied = runner.nudge_weight("re_noise", 0.05).unwrap();
        assert!(applied.is_normalized());
        assert!(applied.re_noise > before.re_noise);

        assert!(runner.nudge_weight("nope", 0.05).is_err());
    }

    #[tokio::test]
    async fn test_log_surface_is_bounded() {
        let runner = runner(
            RunnerConfig::default(),
            no_warmup(),
            Arc::new(InMemoryStore::new()),
            Arc::new(StaticProvider::on_target()),
        );
        for _ in 0..5 {
            runner.run_cycle().await;
        }
        assert!(!runner.get_logs(200).is_empty());
        assert_eq!(runner.get_logs(2).len(), 2);
    }
}
