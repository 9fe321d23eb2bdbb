//! Runner introspection surface: status, cycle results and the log ring.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vigil_types::{WeightSaveReason, WeightVector};

use crate::breaker::PersistenceWindow;

/// Result of one completed cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleResult {
    pub cycle: u64,

    /// Whether the controller proposed and the runner applied new weights.
    pub adjusted: bool,

    /// The reason that would be recorded on a persisted history row.
    pub reason: WeightSaveReason,

    /// Whether the cycle ran on fallback metrics.
    pub degraded: bool,

    pub weights_saved: bool,
    pub snapshots_saved: bool,

    pub completed_at: DateTime<Utc>,
}

/// One introspection log line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub at: DateTime<Utc>,
    pub level: String,
    pub message: String,
}

/// Bounded ring of recent log entries.
pub struct LogRing {
    entries: Mutex<VecDeque<LogEntry>>,
    cap: usize,
}

impl LogRing {
    pub fn new(cap: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(cap.min(256))),
            cap,
        }
    }

    pub fn push(&self, level: &str, message: impl Into<String>) {
        let mut entries = self.entries.lock().unwrap();
        if entries.len() == self.cap {
            entries.pop_front();
        }
        entries.push_back(LogEntry {
            at: Utc::now(),
            level: level.to_string(),
            message: message.into(),
        });
    }

    /// Most recent entries, oldest first, bounded by `limit`.
    pub fn recent(&self, limit: usize) -> Vec<LogEntry> {
        let entries = self.entries.lock().unwrap();
        let skip = entries.len().saturating_sub(limit);
        entries.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Point-in-time status of the runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerStatus {
    pub running: bool,
    pub cycle: u64,
    pub hydrated: bool,

    pub last_result: Option<CycleResult>,
    pub recent_logs: Vec<LogEntry>,

    pub current_weights: WeightVector,
    pub controller_frozen: bool,

    pub persistence: PersistenceWindow,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_ring_caps_and_orders() {
        let ring = LogRing::new(3);
        for i in 0..5 {
            ring.push("info", format!("line {i}"));
        }
        assert_eq!(ring.len(), 3);

        let recent = ring.recent(10);
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].message, "line 2");
        assert_eq!(recent[2].message, "line 4");
    }

    #[test]
    fn test_recent_respects_limit() {
        let ring = LogRing::new(10);
        for i in 0..6 {
            ring.push("info", format!("line {i}"));
        }
        let recent = ring.recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[1].message, "line 5");
    }
}
