//! Append-only alert store with dedup-by-cooldown and age-based purge.

use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use vigil_types::{Alert, AlertId, Severity};

use crate::ack::{AckLedger, Acknowledgement};

/// Alert store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertStoreConfig {
    /// Window within which alerts sharing a dedup group collapse into the
    /// existing entry. `0` disables collapsing (test/seed scenarios).
    pub cooldown_ms: i64,

    /// Entries older than this are removed by `purge_expired`.
    pub purge_max_age_hours: i64,
}

impl Default for AlertStoreConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: 300_000,
            purge_max_age_hours: 14 * 24,
        }
    }
}

/// A stored alert with its dedup bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredAlert {
    /// The alert as first emitted; immutable.
    pub alert: Alert,

    /// Occurrences collapsed into this entry, including the first.
    pub count: u64,

    /// Time of the most recent occurrence.
    pub last_seen: DateTime<Utc>,
}

/// Outcome of ingesting one alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// A new entry was created.
    Created(AlertId),

    /// The alert collapsed into an existing entry within cooldown.
    Collapsed {
        /// The existing entry's alert ID.
        alert_id: AlertId,
        /// The entry's occurrence count after collapsing.
        count: u64,
    },
}

/// Sort order for queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryOrder {
    /// Newest first.
    #[default]
    NewestFirst,
    /// Oldest first.
    OldestFirst,
}

/// Query over stored alerts.
#[derive(Debug, Clone, Default)]
pub struct AlertQuery {
    /// Only return alerts of this severity.
    pub severity: Option<Severity>,

    /// Page size; `None` returns everything from `offset`.
    pub limit: Option<usize>,

    /// Entries to skip after ordering.
    pub offset: usize,

    /// Timestamp ordering.
    pub order: QueryOrder,
}

/// One query result row, optionally joined with ack state.
#[derive(Debug, Clone)]
pub struct AlertView {
    pub stored: StoredAlert,

    /// Present when the query requested the ack projection and the alert
    /// has a live acknowledgement.
    pub acknowledgement: Option<Acknowledgement>,
}

/// In-memory governance alert store.
pub struct AlertStore {
    entries: RwLock<Vec<StoredAlert>>,
    config: AlertStoreConfig,
}

impl AlertStore {
    pub fn new(config: AlertStoreConfig) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            config,
        }
    }

    /// Ingest one alert, collapsing into an existing entry when a matching
    /// dedup group was seen within the cooldown window.
    pub fn ingest(&self, alert: Alert) -> IngestOutcome {
        let now = Utc::now();
        let mut entries = self.entries.write().unwrap();

        if self.config.cooldown_ms > 0 {
            let window = Duration::milliseconds(self.config.cooldown_ms);
            if let Some(existing) = entries
                .iter_mut()
                .rev()
                .find(|e| e.alert.dedup_group == alert.dedup_group && now - e.last_seen <= window)
            {
                existing.count += 1;
                existing.last_seen = now;
                debug!(
                    dedup_group = %alert.dedup_group,
                    count = existing.count,
                    "alert collapsed into cooldown entry"
                );
                return IngestOutcome::Collapsed {
                    alert_id: existing.alert.id.clone(),
                    count: existing.count,
                };
            }
        }

        let id = alert.id.clone();
        entries.push(StoredAlert {
            alert,
            count: 1,
            last_seen: now,
        });
        IngestOutcome::Created(id)
    }

    /// Remove entries whose last occurrence is older than the purge age.
    /// Returns the number of entries removed.
    pub fn purge_expired(&self) -> usize {
        let cutoff = Utc::now() - Duration::hours(self.config.purge_max_age_hours);
        let mut entries = self.entries.write().unwrap();
        let before = entries.len();
        entries.retain(|e| e.last_seen >= cutoff);
        before - entries.len()
    }

    /// Fetch one stored alert by ID.
    pub fn get(&self, id: &AlertId) -> Option<StoredAlert> {
        self.entries
            .read()
            .unwrap()
            .iter()
            .find(|e| &e.alert.id == id)
            .cloned()
    }

    /// Query with filtering, ordering and pagination. Pass the ledger to
    /// join ack state per alert.
    pub fn query(&self, query: &AlertQuery, ledger: Option<&AckLedger>) -> Vec<AlertView> {
        let entries = self.entries.read().unwrap();

        let mut matched: Vec<&StoredAlert> = entries
            .iter()
            .filter(|e| query.severity.map_or(true, |s| e.alert.severity == s))
            .collect();

        matched.sort_by_key(|e| e.alert.timestamp);
        if query.order == QueryOrder::NewestFirst {
            matched.reverse();
        }

        matched
            .into_iter()
            .skip(query.offset)
            .take(query.limit.unwrap_or(usize::MAX))
            .map(|stored| AlertView {
                stored: stored.clone(),
                acknowledgement: ledger.and_then(|l| l.get(&stored.alert.id)),
            })
            .collect()
    }

    /// All stored alerts, unordered.
    pub fn all(&self) -> Vec<StoredAlert> {
        self.entries.read().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_types::{Rationale, RationaleCode};

    fn alert(group: &str, severity: Severity) -> Alert {
        Alert::new(
            group,
            severity,
            "test",
            Rationale::new(RationaleCode::External {
                detail: "test".to_string(),
            }),
        )
    }

    #[test]
    fn test_dedup_collapses_within_cooldown() {
        let store = AlertStore::new(AlertStoreConfig::default());

        let first = store.ingest(alert("g1", Severity::Warn));
        let id = match first {
            IngestOutcome::Created(id) => id,
            _ => panic!("expected created"),
        };

        match store.ingest(alert("g1", Severity::Warn)) {
            IngestOutcome::Collapsed { alert_id, count } => {
                assert_eq!(alert_id, id);
                assert_eq!(count, 2);
            }
            _ => panic!("expected collapse"),
        }
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_zero_cooldown_disables_collapsing() {
        let store = AlertStore::new(AlertStoreConfig {
            cooldown_ms: 0,
            ..Default::default()
        });

        store.ingest(alert("g1", Severity::Info));
        assert!(matches!(
            store.ingest(alert("g1", Severity::Info)),
            IngestOutcome::Created(_)
        ));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_different_groups_do_not_collapse() {
        let store = AlertStore::new(AlertStoreConfig::default());
        store.ingest(alert("g1", Severity::Info));
        assert!(matches!(
            store.ingest(alert("g2", Severity::Info)),
            IngestOutcome::Created(_)
        ));
    }

    #[test]
    fn test_query_severity_filter_and_pagination() {
        let store = AlertStore::new(AlertStoreConfig {
            cooldown_ms: 0,
            ..Default::default()
        });
        for _ in 0..3 {
            store.ingest(alert("g.crit", Severity::Critical));
        }
        for _ in 0..2 {
            store.ingest(alert("g.info", Severity::Info));
        }

        let criticals = store.query(
            &AlertQuery {
                severity: Some(Severity::Critical),
                ..Default::default()
            },
            None,
        );
        assert_eq!(criticals.len(), 3);

        let page = store.query(
            &AlertQuery {
                severity: Some(Severity::Critical),
                limit: Some(2),
                offset: 2,
                ..Default::default()
            },
            None,
        );
        assert_eq!(page.len(), 1);
    }

    #[test]
    fn test_purge_removes_old_entries() {
        let store = AlertStore::new(AlertStoreConfig {
            cooldown_ms: 0,
            purge_max_age_hours: 1,
        });
        store.ingest(alert("g1", Severity::Info));

        // Entry is fresh, nothing to purge.
        assert_eq!(store.purge_expired(), 0);

        // Age the entry past the cutoff.
        {
            let mut entries = store.entries.write().unwrap();
            entries[0].last_seen = Utc::now() - Duration::hours(2);
        }
        assert_eq!(store.purge_expired(), 1);
        assert!(store.is_empty());
    }
}
