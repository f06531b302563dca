//! Genetic-algorithm core for evolving prompt candidates.
//!
//! The engine drives generations of a fixed-size population: composite
//! fitness (quality judge − lint penalty − token-cost penalty), tournament
//! selection with top-K elitism, criterion-driven mutation, crossover,
//! trigram-Jaccard diversity with immigration rescue, and best-fitness
//! convergence detection. All text synthesis is delegated to a
//! [`traits::PromptGenerator`]; all scoring to the three sub-score
//! collaborators. The core's properties hold regardless of generator
//! behavior — tests run entirely on deterministic doubles.

pub mod convergence;
pub mod crossover;
pub mod diversity;
pub mod engine;
pub mod fitness;
pub mod initializer;
pub mod meter;
pub mod mutation;
pub mod selection;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;
pub mod util;

pub use engine::{EngineDeps, EvolutionEngine};
pub use fitness::FitnessEvaluator;
pub use meter::CallMeter;
