//! # Vigil Tuning - Adaptive Weight Tuning Controller
//!
//! Computes proposed adjustments to the noise-score weight vector from
//! aggregated operational metrics, with integral-windup-style safeguards:
//! warm-up, a cooldown dead-band, and a persisted freeze state.
//!
//! The controller is pure-ish: it proposes, the runner applies and persists.

pub mod config;
pub mod controller;

// Re-export main types
pub use config::{ControllerConfig, MetricTargets};
pub use controller::{AdjustmentOutcome, SkipReason, TuningController};
