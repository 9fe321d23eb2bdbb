//! # Vigil Suppression - Noise-Aware Alert Suppression
//!
//! Per-group noise scoring and the ACTIVE/SUPPRESSED state machine.
//!
//! ## Key Components
//!
//! - [`SuppressionStateMachine`]: hysteresis transitions over alert groups
//! - [`SuppressionConfig`]: thresholds and robustness knobs
//! - [`score`]: the weighted-sum noise-score function
//!
//! ## Hysteresis
//!
//! A group enters suppression at `noise_score >= enter_threshold` and exits
//! only at `noise_score <= exit_threshold`, with `exit < enter` strictly.
//! Sustained high-noise periods build a robust-high streak that lowers the
//! effective exit threshold further, so one quiet cycle cannot re-open a
//! chronically noisy group.
//!
//! The machine is a consumer of weights: the adaptive runner injects the
//! vector and is the sole writer; nothing here persists state directly.

pub mod config;
pub mod error;
pub mod machine;
pub mod score;

// Re-export main types
pub use config::SuppressionConfig;
pub use error::{SuppressionError, SuppressionResult};
pub use machine::{SuppressionStateMachine, SuppressionVerdict};
pub use score::{noise_score, severity_mix, volume_pressure, SignalContext};
