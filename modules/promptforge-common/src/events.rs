//! Progress events emitted at every phase transition of a run.
//!
//! Sinks are purely observational: they must not block and can never
//! influence the algorithm. A UI driving a progress bar and a test
//! collecting events use the same trait.

use serde::{Deserialize, Serialize};

use crate::types::GenerationSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressKind {
    Init,
    Select,
    Crossover,
    Mutate,
    Evaluate,
    GenerationComplete,
    Done,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub kind: ProgressKind,
    pub generation: u32,
    pub detail: String,
    /// Monotonically increasing 0 → 100 across the run.
    pub progress: f32,
    /// Present on generation_complete and done.
    pub snapshot: Option<GenerationSnapshot>,
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

/// Sink that drops everything. The default when a caller has no observer.
pub struct NullSink;

impl ProgressSink for NullSink {
    fn emit(&self, _event: ProgressEvent) {}
}
