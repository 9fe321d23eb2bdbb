//! # Vigil Types - Shared Data Model for Alert Governance
//!
//! Core type definitions shared across the Vigil engine crates:
//!
//! - Strongly-typed IDs ([`AlertId`], [`DecisionId`], [`DedupGroup`])
//! - The governance alert model with structured rationales
//! - The noise-score [`WeightVector`] and its persisted forms
//! - Aggregated operational metrics and the [`MetricsProvider`] seam
//! - Durable suppression snapshots
//! - Auto-policy [`Decision`] records
//!
//! This crate holds data shapes only; behavior lives in the component
//! crates (`vigil-suppression`, `vigil-tuning`, `vigil-runner`, ...).

pub mod alert;
pub mod decision;
pub mod ids;
pub mod metrics;
pub mod suppression;
pub mod weights;

// Re-export main types
pub use alert::{Alert, Rationale, RationaleCode, Severity};
pub use decision::{Decision, DecisionAction, DecisionDomain, RiskLevel};
pub use ids::{AlertId, DecisionId, DedupGroup};
pub use metrics::{AggregatedMetrics, MetricsError, MetricsProvider};
pub use suppression::{GroupState, SuppressionMetrics, SuppressionSnapshot};
pub use weights::{
    ControllerState, WeightSaveReason, WeightVector, WeightsHistoryRow, WeightsLatestRow,
    WEIGHT_SUM_TOLERANCE,
};
