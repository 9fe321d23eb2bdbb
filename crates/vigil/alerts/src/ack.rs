//! Acknowledgement ledger and ack metrics.
//!
//! At most one live acknowledgement per alert; ack and unack are both
//! idempotent in their own direction.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use vigil_types::{AlertId, Severity};

use crate::error::{AlertError, AlertResult};
use crate::store::AlertStore;

/// Lookback for ack-rate queries is clamped to this many days to bound
/// query cost.
pub const MAX_ACK_LOOKBACK_DAYS: i64 = 30;

/// A live acknowledgement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Acknowledgement {
    pub alert_id: AlertId,
    pub actor: String,
    pub acknowledged_at: DateTime<Utc>,
}

/// Outcome of an ack call.
#[derive(Debug, Clone, PartialEq)]
pub struct AckOutcome {
    /// When the alert was acknowledged; unchanged on repeat acks.
    pub acknowledged_at: DateTime<Utc>,

    /// True when the alert was already acknowledged before this call.
    pub already_acked: bool,
}

/// Outcome of an unack call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnackOutcome {
    /// False when the alert had no live acknowledgement.
    pub changed: bool,
}

/// Mean and p95 time-to-acknowledge.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MttaMetrics {
    pub mean_ms: f64,
    pub p95_ms: f64,

    /// Acknowledgements the figures are computed over.
    pub samples: usize,
}

/// Ack-rate metrics over a bounded window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckRateMetrics {
    /// Acked alerts / total alerts in the window.
    pub ack_rate: f64,

    pub total_alerts: usize,
    pub acked_alerts: usize,

    /// Per-severity ack rates, present when requested.
    #[serde(default)]
    pub by_severity: Vec<(Severity, f64)>,
}

/// Idempotent acknowledgement ledger.
pub struct AckLedger {
    acks: DashMap<AlertId, Acknowledgement>,
}

impl AckLedger {
    pub fn new() -> Self {
        Self {
            acks: DashMap::new(),
        }
    }

    /// Acknowledge an alert. Repeat acks return the original timestamp with
    /// `already_acked: true` and mutate nothing.
    pub fn ack(&self, store: &AlertStore, alert_id: &AlertId, actor: &str) -> AlertResult<AckOutcome> {
        if store.get(alert_id).is_none() {
            return Err(AlertError::NotFound(alert_id.clone()));
        }

        if let Some(existing) = self.acks.get(alert_id) {
            return Ok(AckOutcome {
                acknowledged_at: existing.acknowledged_at,
                already_acked: true,
            });
        }

        let ack = Acknowledgement {
            alert_id: alert_id.clone(),
            actor: actor.to_string(),
            acknowledged_at: Utc::now(),
        };
        let acknowledged_at = ack.acknowledged_at;
        self.acks.insert(alert_id.clone(), ack);

        Ok(AckOutcome {
            acknowledged_at,
            already_acked: false,
        })
    }

    /// Clear an alert's acknowledgement. Unacking a never-acked or
    /// already-unacked alert is a no-op reported as `changed: false`.
    pub fn unack(&self, alert_id: &AlertId) -> UnackOutcome {
        UnackOutcome {
            changed: self.acks.remove(alert_id).is_some(),
        }
    }

    /// The live acknowledgement for an alert, if any.
    pub fn get(&self, alert_id: &AlertId) -> Option<Acknowledgement> {
        self.acks.get(alert_id).map(|a| a.clone())
    }

    /// Ack rate over alerts emitted within the lookback window (clamped to
    /// [`MAX_ACK_LOOKBACK_DAYS`]).
    pub fn ack_rate(
        &self,
        store: &AlertStore,
        lookback: Duration,
        per_severity: bool,
    ) -> AckRateMetrics {
        let lookback = lookback.min(Duration::days(MAX_ACK_LOOKBACK_DAYS));
        let cutoff = Utc::now() - lookback;

        let alerts = store.all();
        let in_window: Vec<_> = alerts
            .iter()
            .filter(|e| e.alert.timestamp >= cutoff)
            .collect();

        let total_alerts = in_window.len();
        let acked_alerts = in_window
            .iter()
            .filter(|e| self.acks.contains_key(&e.alert.id))
            .count();

        let ack_rate = if total_alerts == 0 {
            0.0
        } else {
            acked_alerts as f64 / total_alerts as f64
        };

        let by_severity = if per_severity {
            [Severity::Info, Severity::Warn, Severity::Critical]
                .into_iter()
                .filter_map(|severity| {
                    let of_severity: Vec<_> = in_window
                        .iter()
                        .filter(|e| e.alert.severity == severity)
                        .collect();
                    if of_severity.is_empty() {
                        return None;
                    }
                    let acked = of_severity
                        .iter()
                        .filter(|e| self.acks.contains_key(&e.alert.id))
                        .count();
                    Some((severity, acked as f64 / of_severity.len() as f64))
                })
                .collect()
        } else {
            Vec::new()
        };

        AckRateMetrics {
            ack_rate,
            total_alerts,
            acked_alerts,
            by_severity,
        }
    }

    /// Mean and p95 time-to-acknowledge over all live acknowledgements.
    pub fn mtta(&self, store: &AlertStore) -> MttaMetrics {
        let mut deltas_ms: Vec<f64> = self
            .acks
            .iter()
            .filter_map(|ack| {
                store.get(&ack.alert_id).map(|stored| {
                    (ack.acknowledged_at - stored.alert.timestamp).num_milliseconds() as f64
                })
            })
            .filter(|d| *d >= 0.0)
            .collect();

        if deltas_ms.is_empty() {
            return MttaMetrics::default();
        }

        deltas_ms.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let mean_ms = deltas_ms.iter().sum::<f64>() / deltas_ms.len() as f64;
        let p95_index = ((deltas_ms.len() as f64) * 0.95).ceil() as usize - 1;
        let p95_ms = deltas_ms[p95_index.min(deltas_ms.len() - 1)];

        MttaMetrics {
            mean_ms,
            p95_ms,
            samples: deltas_ms.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.acks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.acks.is_empty()
    }
}

impl Default for AckLedger {
    fn default() -> Self {
        Self::new()
    }
}
