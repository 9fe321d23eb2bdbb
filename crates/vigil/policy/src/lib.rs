//! # Vigil Policy - Auto-Policy Engine
//!
//! Decides, at a slower cadence than the tuning loop, whether proposed
//! cross-domain changes should actually be applied, and later judges
//! whether they worked.
//!
//! ## Key Components
//!
//! - [`PolicyEngine`]: analysis, the confidence/risk gate, domain dispatch
//!   and outcome scoring
//! - [`PolicySnapshot`]: the cross-domain metrics view it analyzes
//! - [`PolicyConfig`]: gate thresholds and scoring parameters

pub mod config;
pub mod engine;
pub mod snapshot;

// Re-export main types
pub use config::PolicyConfig;
pub use engine::{PolicyCycleReport, PolicyEngine};
pub use snapshot::PolicySnapshot;
