//! Sliding-window circuit breaker over persistence outcomes.
//!
//! Tracks the most recent attempted save outcomes and trips when failures
//! dominate the window. The open and close thresholds differ so the breaker
//! cannot flap around a single boundary, and the window resets on every
//! state change: re-enabling requires fresh evidence, not a dilution of old
//! failures by new successes.
//!
//! While open, regular saves are skipped but a probe is let through every
//! few cycles; probe outcomes are the only way the window refills.

use std::collections::VecDeque;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Breaker thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakerConfig {
    /// Maximum outcomes retained in the sliding window.
    pub window_cap: usize,

    /// Minimum samples in the window before the breaker may change state.
    pub min_samples: usize,

    /// Failure ratio at or above which persistence is disabled.
    pub disable_ratio: f64,

    /// Failure ratio below which persistence re-enables.
    pub enable_ratio: f64,

    /// While disabled, one probe attempt is allowed every this many cycles.
    pub probe_every_cycles: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            window_cap: 50,
            min_samples: 10,
            disable_ratio: 0.6,
            enable_ratio: 0.2,
            probe_every_cycles: 5,
        }
    }
}

/// Snapshot of the breaker window for introspection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceWindow {
    pub samples: usize,
    pub failures: usize,
    pub failure_ratio: f64,
    pub disabled: bool,
}

struct BreakerInner {
    window: VecDeque<bool>,
    disabled: bool,
}

/// Thread-safe persistence circuit breaker.
pub struct PersistenceBreaker {
    config: BreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl PersistenceBreaker {
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(BreakerInner {
                window: VecDeque::new(),
                disabled: false,
            }),
        }
    }

    /// Whether a save should be attempted on this cycle.
    ///
    /// Always true while closed; while open, true only on probe cycles.
    pub fn should_attempt(&self, cycle: u64) -> bool {
        let inner = self.inner.lock().unwrap();
        if !inner.disabled {
            return true;
        }
        self.config.probe_every_cycles > 0 && cycle % self.config.probe_every_cycles == 0
    }

    /// Record one attempted outcome and re-evaluate the breaker state.
    /// Skipped saves must not be recorded.
    pub fn record(&self, failed: bool) {
        let mut inner = self.inner.lock().unwrap();

        inner.window.push_back(failed);
        while inner.window.len() > self.config.window_cap {
            inner.window.pop_front();
        }

        if inner.window.len() < self.config.min_samples {
            return;
        }

        let failures = inner.window.iter().filter(|f| **f).count();
        let ratio = failures as f64 / inner.window.len() as f64;

        if !inner.disabled && ratio >= self.config.disable_ratio {
            warn!(
                failures,
                samples = inner.window.len(),
                failure_ratio = ratio,
                "persistence failure ratio over threshold, disabling saves"
            );
            inner.disabled = true;
            inner.window.clear();
        } else if inner.disabled && ratio < self.config.enable_ratio {
            info!(
                samples = failures,
                failure_ratio = ratio,
                "persistence recovered, re-enabling saves"
            );
            inner.disabled = false;
            inner.window.clear();
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.inner.lock().unwrap().disabled
    }

    /// Current window snapshot.
    pub fn window(&self) -> PersistenceWindow {
        let inner = self.inner.lock().unwrap();
        let samples = inner.window.len();
        let failures = inner.window.iter().filter(|f| **f).count();
        PersistenceWindow {
            samples,
            failures,
            failure_ratio: if samples == 0 {
                0.0
            } else {
                failures as f64 / samples as f64
            },
            disabled: inner.disabled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker() -> PersistenceBreaker {
        PersistenceBreaker::new(BreakerConfig::default())
    }

    #[test]
    fn test_opens_after_sustained_failures() {
        let breaker = breaker();

        for _ in 0..9 {
            breaker.record(true);
            assert!(!breaker.is_disabled());
        }
        // Tenth failure reaches min_samples with ratio 1.0.
        breaker.record(true);
        assert!(breaker.is_disabled());
    }

    #[test]
    fn test_closes_after_sustained_successes() {
        let breaker = breaker();
        for _ in 0..10 {
            breaker.record(true);
        }
        assert!(breaker.is_disabled());

        for _ in 0..9 {
            breaker.record(false);
            assert!(breaker.is_disabled());
        }
        breaker.record(false);
        assert!(!breaker.is_disabled());
    }

    #[test]
    fn test_mixed_outcomes_below_threshold_stay_enabled() {
        let breaker = breaker();
        for i in 0..20 {
            breaker.record(i % 2 == 0); // ratio 0.5 < 0.6
        }
        assert!(!breaker.is_disabled());
    }

    #[test]
    fn test_too_few_samples_never_trip() {
        let breaker = breaker();
        for _ in 0..9 {
            breaker.record(true);
        }
        assert!(!breaker.is_disabled());
    }

    #[test]
    fn test_window_is_bounded() {
        let breaker = PersistenceBreaker::new(BreakerConfig {
            window_cap: 5,
            min_samples: 100, // keep state changes out of the way
            ..Default::default()
        });
        for _ in 0..20 {
            breaker.record(false);
        }
        assert_eq!(breaker.window().samples, 5);
    }

    #[test]
    fn test_probes_allowed_while_open() {
        let breaker = PersistenceBreaker::new(BreakerConfig {
            probe_every_cycles: 5,
            ..Default::default()
        });
        for _ in 0..10 {
            breaker.record(true);
        }
        assert!(breaker.is_disabled());

        assert!(breaker.should_attempt(10));
        assert!(!breaker.should_attempt(11));
        assert!(!breaker.should_attempt(14));
        assert!(breaker.should_attempt(15));
    }
}
