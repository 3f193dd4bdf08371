//! Best-effort counter metrics.
//!
//! The core increments a handful of named counters ("genesis", "disconnect",
//! ...). Metrics are advisory: implementations must not fail or block, and
//! the core never checks the result of an increment.

/// Sink for named counters.
pub trait Metrics: Send + Sync {
    /// Increment the named counter by one. Best-effort.
    fn increment_counter(&self, name: &str);
}

/// A metrics sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl Metrics for NoopMetrics {
    fn increment_counter(&self, _name: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// Counting sink used across the workspace's tests.
    #[derive(Debug, Default)]
    struct RecordingMetrics {
        counters: Mutex<HashMap<String, u64>>,
    }

    impl Metrics for RecordingMetrics {
        fn increment_counter(&self, name: &str) {
            *self.counters.lock().entry(name.to_string()).or_insert(0) += 1;
        }
    }

    #[test]
    fn test_recording_metrics_counts() {
        let metrics = RecordingMetrics::default();
        metrics.increment_counter("genesis");
        metrics.increment_counter("genesis");
        metrics.increment_counter("disconnect");
        let counters = metrics.counters.lock();
        assert_eq!(counters.get("genesis"), Some(&2));
        assert_eq!(counters.get("disconnect"), Some(&1));
    }

    #[test]
    fn test_noop_is_silent() {
        NoopMetrics.increment_counter("anything");
    }
}
