//! Governance alert model.
//!
//! Alerts are immutable once stored; mutation happens on the surrounding
//! store entry (dedup counters) and the acknowledgement ledger, never on the
//! alert itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ids::{AlertId, DedupGroup};

/// Severity of a governance alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational.
    Info,
    /// Needs attention soon.
    Warn,
    /// Needs attention now.
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warn => write!(f, "warn"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// Known reason codes for alert rationales.
///
/// Tagged so downstream consumers get compile-time coverage of the known
/// cases; unknown producers extend via [`Rationale::extra`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum RationaleCode {
    /// A weight trajectory is ramping faster than the governance slope bound.
    WeightSlope {
        /// Scoring strategy whose weight history ramped.
        strategy: String,
        /// Observed per-cycle slope.
        slope: f64,
        /// The slope bound that was exceeded.
        threshold: f64,
    },

    /// A group crossed into suppression.
    SuppressionEntered {
        noise_score: f64,
        enter_threshold: f64,
    },

    /// A group exited suppression.
    SuppressionExited {
        noise_score: f64,
        exit_threshold: f64,
    },

    /// Emitted by an external detector; carries only free text.
    External { detail: String },
}

/// Structured explanation attached to an alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rationale {
    /// The known reason code.
    #[serde(flatten)]
    pub code: RationaleCode,

    /// Open extension map for forward compatibility.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl Rationale {
    pub fn new(code: RationaleCode) -> Self {
        Self {
            code,
            extra: Map::new(),
        }
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// A governance alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    /// Unique alert ID.
    pub id: AlertId,

    /// Key under which recurring alerts of this kind aggregate.
    pub dedup_group: DedupGroup,

    /// Severity at emission time.
    pub severity: Severity,

    /// Human-readable message.
    pub message: String,

    /// Structured explanation of why the alert fired.
    pub rationale: Rationale,

    /// Emission time.
    pub timestamp: DateTime<Utc>,
}

impl Alert {
    /// Create a new alert stamped with the current time.
    pub fn new(
        dedup_group: impl Into<DedupGroup>,
        severity: Severity,
        message: impl Into<String>,
        rationale: Rationale,
    ) -> Self {
        Self {
            id: AlertId::generate(),
            dedup_group: dedup_group.into(),
            severity,
            message: message.into(),
            rationale,
            timestamp: Utc::now(),
        }
    }
}

impl From<String> for DedupGroup {
    fn from(s: String) -> Self {
        DedupGroup::new(s)
    }
}
