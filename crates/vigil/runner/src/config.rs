//! Runner configuration: cycle cadence and persistence debounce.

use serde::{Deserialize, Serialize};

use crate::breaker::BreakerConfig;

/// Debounce rules for durable writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceCadence {
    /// During cooldown, persist unchanged weights only after this many
    /// consecutive cooldown cycles.
    pub cooldown_every_cycles: u32,

    /// Minimum cycles between any two debounced weight saves.
    pub min_cycles_between_saves: u32,

    /// Suppression snapshots are saved at least every this many cycles even
    /// without a significant change.
    pub snapshot_every_cycles: u32,

    /// Minimum number of groups that must have changed state for a change
    /// to count as significant.
    pub snapshot_min_changed: usize,

    /// Row bound applied when loading snapshots at startup.
    pub load_snapshot_limit: usize,
}

impl Default for PersistenceCadence {
    fn default() -> Self {
        Self {
            cooldown_every_cycles: 10,
            min_cycles_between_saves: 5,
            snapshot_every_cycles: 20,
            snapshot_min_changed: 3,
            load_snapshot_limit: 5_000,
        }
    }
}

/// Adaptive runner configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Milliseconds between cycles.
    pub interval_ms: u64,

    /// Version key for the latest-weights upsert.
    pub weights_version: i64,

    /// Scoring strategy label recorded on history rows.
    pub strategy: String,

    /// Cycle log entries retained for introspection.
    pub log_limit: usize,

    pub persistence: PersistenceCadence,

    pub breaker: BreakerConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            interval_ms: 30_000,
            weights_version: 1,
            strategy: "weighted_sum".to_string(),
            log_limit: 200,
            persistence: PersistenceCadence::default(),
            breaker: BreakerConfig::default(),
        }
    }
}
