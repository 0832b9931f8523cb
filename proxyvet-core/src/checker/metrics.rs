//! Checker metrics

use metrics::{Counter, Histogram};

use crate::domain::CheckEntry;

/// Checker metrics, recorded through the `metrics` facade.
#[derive(Clone, Debug)]
pub struct CheckerMetrics {
    /// Number of endpoints popped for validation
    pub(crate) attempts_total: Counter,
    /// Latency of successful HTTP echo stages, in milliseconds
    pub(crate) latency_ms: Histogram,
}

impl Default for CheckerMetrics {
    fn default() -> Self {
        Self {
            attempts_total: metrics::counter!("proxyvet.check.attempts_total"),
            latency_ms: metrics::histogram!("proxyvet.check.latency_ms"),
        }
    }
}

impl CheckerMetrics {
    pub(crate) fn record_attempt(&self) {
        self.attempts_total.increment(1);
    }

    pub(crate) fn record_entry(&self, entry: &CheckEntry) {
        if let Some(latency) = entry.latency_ms() {
            self.latency_ms.record(latency);
        }
    }
}
