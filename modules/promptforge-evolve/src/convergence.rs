//! Convergence: best fitness stable across a trailing window of
//! generations. A stopping condition, not a failure.

use promptforge_common::GenerationSnapshot;

const DEFAULT_WINDOW: usize = 2;
const DEFAULT_THRESHOLD: f64 = 1.0;

pub struct ConvergenceDetector {
    /// Number of consecutive deltas that must stay under the threshold.
    window: usize,
    /// Maximum absolute best-fitness delta that still counts as stable.
    threshold: f64,
}

impl Default for ConvergenceDetector {
    fn default() -> Self {
        Self { window: DEFAULT_WINDOW, threshold: DEFAULT_THRESHOLD }
    }
}

impl ConvergenceDetector {
    pub fn new(window: usize, threshold: f64) -> Self {
        Self { window, threshold }
    }

    /// True when at least `window + 1` snapshots exist and every
    /// consecutive best-fitness delta across the most recent `window + 1`
    /// snapshots is at or under the threshold.
    pub fn converged(&self, snapshots: &[GenerationSnapshot]) -> bool {
        if snapshots.len() < self.window + 1 {
            return false;
        }
        let tail = &snapshots[snapshots.len() - (self.window + 1)..];
        tail.windows(2)
            .all(|pair| (pair[1].best_fitness - pair[0].best_fitness).abs() <= self.threshold)
    }
}
