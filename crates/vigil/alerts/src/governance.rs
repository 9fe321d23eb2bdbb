//! Weight-trend governance detector.
//!
//! Scans persisted weight history for strategies whose weight components
//! are ramping faster than the governance slope bounds. A steep sustained
//! ramp means the tuning controller is chasing something; that deserves a
//! human look before the scoring drifts far from its audited baseline.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;
use vigil_types::{Alert, Rationale, RationaleCode, Severity, WeightsHistoryRow};

/// Names of the weight components, in signal order.
const COMPONENT_NAMES: [&str; 5] = [
    "volume",
    "severity_mix",
    "false_suppression",
    "escalation",
    "re_noise",
];

/// Slope bounds for the weight-trend evaluation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WeightTrendConfig {
    /// Per-cycle slope at which a warn alert fires.
    pub slope_warn: f64,

    /// Per-cycle slope at which a critical alert fires.
    pub slope_critical: f64,

    /// Minimum history points per strategy before evaluating.
    pub min_points: usize,
}

impl Default for WeightTrendConfig {
    fn default() -> Self {
        Self {
            slope_warn: 0.002,
            slope_critical: 0.004,
            min_points: 10,
        }
    }
}

/// Least-squares slope of `values` against `cycles`.
fn slope(cycles: &[f64], values: &[f64]) -> f64 {
    let n = cycles.len() as f64;
    if n < 2.0 {
        return 0.0;
    }
    let mean_x = cycles.iter().sum::<f64>() / n;
    let mean_y = values.iter().sum::<f64>() / n;

    let mut num = 0.0;
    let mut den = 0.0;
    for (x, y) in cycles.iter().zip(values.iter()) {
        num += (x - mean_x) * (y - mean_y);
        den += (x - mean_x) * (x - mean_x);
    }
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

/// Evaluate weight history against the slope bounds.
///
/// History is grouped per strategy; within each strategy the slope of every
/// weight component is estimated by least squares over cycles. The steepest
/// absolute slope decides the severity, and one alert is emitted per
/// strategy that crosses a bound.
pub fn evaluate_weight_trends(
    history: &[WeightsHistoryRow],
    config: &WeightTrendConfig,
) -> Vec<Alert> {
    let mut by_strategy: BTreeMap<&str, Vec<&WeightsHistoryRow>> = BTreeMap::new();
    for row in history {
        by_strategy.entry(row.strategy.as_str()).or_default().push(row);
    }

    let mut alerts = Vec::new();

    for (strategy, mut rows) in by_strategy {
        if rows.len() < config.min_points {
            debug!(strategy, points = rows.len(), "insufficient history, skipping");
            continue;
        }
        rows.sort_by_key(|r| r.cycle);

        let cycles: Vec<f64> = rows.iter().map(|r| r.cycle as f64).collect();

        let mut steepest: (f64, &str) = (0.0, COMPONENT_NAMES[0]);
        for (index, name) in COMPONENT_NAMES.iter().enumerate() {
            let values: Vec<f64> = rows.iter().map(|r| r.weights.as_array()[index]).collect();
            let s = slope(&cycles, &values);
            if s.abs() > steepest.0.abs() {
                steepest = (s, name);
            }
        }

        let (observed, component) = steepest;
        let severity = if observed.abs() >= config.slope_critical {
            Severity::Critical
        } else if observed.abs() >= config.slope_warn {
            Severity::Warn
        } else {
            continue;
        };

        let threshold = match severity {
            Severity::Critical => config.slope_critical,
            _ => config.slope_warn,
        };

        let rationale = Rationale::new(RationaleCode::WeightSlope {
            strategy: strategy.to_string(),
            slope: observed,
            threshold,
        })
        .with_extra("component", serde_json::json!(component))
        .with_extra("points", serde_json::json!(rows.len()));

        alerts.push(Alert::new(
            format!("governance.weight_trend.{strategy}"),
            severity,
            format!(
                "weight component '{component}' of strategy '{strategy}' ramping at {observed:.5}/cycle"
            ),
            rationale,
        ));
    }

    alerts
}
