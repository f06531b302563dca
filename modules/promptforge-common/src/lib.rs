pub mod config;
pub mod error;
pub mod events;
pub mod types;

pub use config::{Config, GeneticConfig};
pub use error::EvolveError;
pub use events::{ProgressEvent, ProgressKind, ProgressSink};
pub use types::{
    composite_or_zero, CriterionScore, FitnessScore, GenerationSnapshot, Individual, RunResult,
    FRAMEWORK_POOL,
};
