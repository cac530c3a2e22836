use std::sync::Mutex;

/// Per-run counters for the filter engine.
pub struct MetricsRecorder {
    inner: Mutex<Metrics>,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub computations: usize,
    pub cache_hits: usize,
    pub skipped: usize,
    pub errors: usize,
}

#[derive(Default)]
struct Metrics {
    computations: usize,
    cache_hits: usize,
    skipped: usize,
    errors: usize,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Metrics::default()),
        }
    }

    pub fn record_computation(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.computations += 1;
        }
    }

    pub fn record_cache_hit(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.cache_hits += 1;
        }
    }

    pub fn record_skipped(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.skipped += 1;
        }
    }

    pub fn record_error(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.errors += 1;
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        if let Ok(metrics) = self.inner.lock() {
            MetricsSnapshot {
                computations: metrics.computations,
                cache_hits: metrics.cache_hits,
                skipped: metrics.skipped,
                errors: metrics.errors,
            }
        } else {
            MetricsSnapshot::default()
        }
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MetricsRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("MetricsRecorder")
            .field(&self.snapshot())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_recorded_events() {
        let metrics = MetricsRecorder::new();
        metrics.record_computation();
        metrics.record_computation();
        metrics.record_cache_hit();
        metrics.record_error();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.computations, 2);
        assert_eq!(snapshot.cache_hits, 1);
        assert_eq!(snapshot.skipped, 0);
        assert_eq!(snapshot.errors, 1);
    }
}
