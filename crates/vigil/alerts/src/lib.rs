//! # Vigil Alerts - Governance Alert Store & Acknowledgement Ledger
//!
//! Append-only alert ingestion with dedup-by-cooldown and age-based purge,
//! an idempotent acknowledgement ledger with ack-rate/MTTA metrics, and the
//! weight-trend governance detector.
//!
//! ## Key Components
//!
//! - [`AlertStore`]: ingestion, dedup, purge and queries
//! - [`AckLedger`]: idempotent ack/unack plus metrics
//! - [`governance`]: weight-history slope evaluation

pub mod ack;
pub mod error;
pub mod governance;
pub mod store;

// Re-export main types
pub use ack::{
    AckLedger, AckOutcome, AckRateMetrics, Acknowledgement, MttaMetrics, UnackOutcome,
    MAX_ACK_LOOKBACK_DAYS,
};
pub use error::{AlertError, AlertResult};
pub use governance::{evaluate_weight_trends, WeightTrendConfig};
pub use store::{
    AlertQuery, AlertStore, AlertStoreConfig, AlertView, IngestOutcome, QueryOrder, StoredAlert,
};
