//! Run mode and summary.

use std::fmt::Display;
use std::time::Duration;

/// Which work set a run operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// The full query source.
    Main,
    /// Only ledger entries still eligible for retry.
    Retry,
}

impl RunMode {
    pub fn label(&self) -> &'static str {
        match self {
            RunMode::Main => "main",
            RunMode::Retry => "retry",
        }
    }
}

impl Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Aggregate counts for one run. Computed once at the end, reported to the
/// operator, never persisted.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub mode: RunMode,
    pub dispatched: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub duration: Duration,
}

impl RunSummary {
    /// Zero-work summary for runs that exit before dispatching anything.
    pub fn empty(mode: RunMode) -> Self {
        Self {
            mode,
            dispatched: 0,
            succeeded: 0,
            failed: 0,
            duration: Duration::ZERO,
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.dispatched == 0 {
            1.0
        } else {
            self.succeeded as f64 / self.dispatched as f64
        }
    }

    pub fn failure_rate(&self) -> f64 {
        if self.dispatched == 0 {
            0.0
        } else {
            self.failed as f64 / self.dispatched as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rates_divide_by_dispatched() {
        let summary = RunSummary {
            mode: RunMode::Main,
            dispatched: 5,
            succeeded: 3,
            failed: 2,
            duration: Duration::from_secs(1),
        };
        assert!((summary.success_rate() - 0.6).abs() < f64::EPSILON);
        assert!((summary.failure_rate() - 0.4).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_dispatched_is_all_clear() {
        let summary = RunSummary::empty(RunMode::Retry);
        assert_eq!(summary.success_rate(), 1.0);
        assert_eq!(summary.failure_rate(), 0.0);
    }
}
