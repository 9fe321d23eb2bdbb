//! Cross-domain metrics snapshot the policy engine analyzes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vigil_types::{AggregatedMetrics, SuppressionMetrics};

use vigil_runner::PersistenceWindow;

/// One point-in-time view across the subsystems the engine governs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicySnapshot {
    /// Fraction of groups re-entering suppression shortly after exit.
    pub re_noise_rate: f64,

    /// Persistence failure ratio from the runner's breaker window.
    pub persistence_failure_ratio: f64,

    pub escalation_effectiveness: f64,

    /// Estimated fraction of suppressed groups held for solid reasons.
    pub suppression_accuracy: f64,

    /// Alerts currently tracked.
    pub alert_volume: usize,

    /// Estimated fraction of suppressed groups held wrongly.
    pub false_positive_rate: f64,

    /// Mean time-to-acknowledge, milliseconds.
    pub mtta_ms: f64,

    pub collected_at: DateTime<Utc>,
}

impl PolicySnapshot {
    /// Assemble a snapshot from the subsystems' own metric surfaces.
    pub fn assemble(
        metrics: &AggregatedMetrics,
        suppression: &SuppressionMetrics,
        persistence: &PersistenceWindow,
        alert_volume: usize,
        mtta_ms: f64,
    ) -> Self {
        Self {
            re_noise_rate: metrics.re_noise_rate,
            persistence_failure_ratio: persistence.failure_ratio,
            escalation_effectiveness: metrics.escalation_effectiveness,
            suppression_accuracy: suppression.estimated_accuracy,
            alert_volume,
            false_positive_rate: suppression.estimated_false_positive_rate,
            mtta_ms,
            collected_at: Utc::now(),
        }
    }

    /// Current value of a named target metric.
    pub fn metric_value(&self, name: &str) -> Option<f64> {
        match name {
            "re_noise_rate" => Some(self.re_noise_rate),
            "persistence_failure_ratio" => Some(self.persistence_failure_ratio),
            "escalation_effectiveness" => Some(self.escalation_effectiveness),
            "suppression_accuracy" => Some(self.suppression_accuracy),
            "alert_volume" => Some(self.alert_volume as f64),
            "false_positive_rate" => Some(self.false_positive_rate),
            "mtta_ms" => Some(self.mtta_ms),
            _ => None,
        }
    }

    /// Improvement direction of a named target metric.
    pub fn higher_is_better(name: &str) -> bool {
        matches!(name, "escalation_effectiveness" | "suppression_accuracy")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_lookup_and_direction() {
        let snapshot = PolicySnapshot {
            re_noise_rate: 0.3,
            persistence_failure_ratio: 0.0,
            escalation_effectiveness: 0.4,
            suppression_accuracy: 0.9,
            alert_volume: 12,
            false_positive_rate: 0.1,
            mtta_ms: 60_000.0,
            collected_at: Utc::now(),
        };

        assert_eq!(snapshot.metric_value("re_noise_rate"), Some(0.3));
        assert_eq!(snapshot.metric_value("alert_volume"), Some(12.0));
        assert_eq!(snapshot.metric_value("unknown"), None);

        assert!(PolicySnapshot::higher_is_better("escalation_effectiveness"));
        assert!(!PolicySnapshot::higher_is_better("re_noise_rate"));
    }

    #[test]
    fn test_assemble_pulls_from_subsystem_surfaces() {
        let metrics = AggregatedMetrics::degraded_fallback();
        let suppression = SuppressionMetrics {
            total_groups: 8,
            suppressed_groups: 2,
            total_suppressed_alerts: 40,
            estimated_accuracy: 0.5,
            estimated_false_positive_rate: 0.25,
        };
        let persistence = vigil_runner::PersistenceWindow {
            samples: 20,
            failures: 4,
            failure_ratio: 0.2,
            disabled: false,
        };

        let snapshot = PolicySnapshot::assemble(&metrics, &suppression, &persistence, 100, 5_000.0);
        assert_eq!(snapshot.re_noise_rate, metrics.re_noise_rate);
        assert_eq!(snapshot.suppression_accuracy, 0.5);
        assert_eq!(snapshot.false_positive_rate, 0.25);
        assert_eq!(snapshot.persistence_failure_ratio, 0.2);
        assert_eq!(snapshot.alert_volume, 100);
    }
}
