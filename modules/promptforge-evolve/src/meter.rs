use std::sync::atomic::{AtomicU64, Ordering};

/// Counts external collaborator calls (generator, judge, lint, budget)
/// across a run. Thread-safe via atomic operations so the evaluator and
/// variation operators can share one meter.
#[derive(Debug, Default)]
pub struct CallMeter {
    calls: AtomicU64,
}

impl CallMeter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self) {
        self.calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_many(&self, n: u64) {
        self.calls.fetch_add(n, Ordering::Relaxed);
    }

    /// Total external calls this run.
    pub fn total(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}
