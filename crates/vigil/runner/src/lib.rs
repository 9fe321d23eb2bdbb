//! # Vigil Runner - The Adaptive Tuning Loop
//!
//! Periodic orchestration of the governance engine: each cycle collects
//! aggregated metrics, runs the tuning controller, applies proposed
//! weights to the suppression machine and persists state under debounce
//! rules. A sliding-window circuit breaker disables persistence during
//! sustained storage failure and probes its way back.
//!
//! ## Key Components
//!
//! - [`AdaptiveRunner`]: the cycle loop, hydration and the status surface
//! - [`PersistenceBreaker`]: outcome-window circuit breaker
//! - [`RunnerConfig`]: cadence and debounce knobs

pub mod breaker;
pub mod config;
pub mod error;
pub mod runner;
pub mod status;

// Re-export main types
pub use breaker::{BreakerConfig, PersistenceBreaker, PersistenceWindow};
pub use config::{PersistenceCadence, RunnerConfig};
pub use error::{RunnerError, RunnerResult};
pub use runner::AdaptiveRunner;
pub use status::{CycleResult, LogEntry, LogRing, RunnerStatus};
