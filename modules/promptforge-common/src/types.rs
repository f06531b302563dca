use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::GeneticConfig;

/// Frameworks sampled for population diversity when the config framework
/// is "auto". Round-robined by the initializer, sampled by immigration.
pub const FRAMEWORK_POOL: [&str; 5] = ["KERNEL", "COSTAR", "CRISPE", "RACE", "APE"];

// --- Fitness ---

/// One judge sub-score, e.g. `clarity: 62.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CriterionScore {
    pub criterion_id: String,
    pub score: f64,
}

/// Composite fitness for one individual. Computed once per individual;
/// re-scoring requires explicitly clearing the individual's fitness slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FitnessScore {
    /// Judge total on a 0–100 scale.
    pub quality: f64,
    /// Capped at 30: errors*10 + warnings*3 + infos*1.
    pub lint_penalty: f64,
    /// Capped at 20: one point per 100 tokens over the 1500-token budget.
    pub token_cost_penalty: f64,
    /// quality − lint_penalty − token_cost_penalty, clamped to [0, 100].
    pub composite: f64,
    /// Per-criterion judge sub-scores, kept so mutation can target the
    /// weakest criterion.
    pub criterion_scores: Vec<CriterionScore>,
}

impl FitnessScore {
    pub fn compose(
        quality: f64,
        lint_penalty: f64,
        token_cost_penalty: f64,
        criterion_scores: Vec<CriterionScore>,
    ) -> Self {
        let composite = (quality - lint_penalty - token_cost_penalty).clamp(0.0, 100.0);
        Self {
            quality,
            lint_penalty,
            token_cost_penalty,
            composite,
            criterion_scores,
        }
    }

    /// All-zero score, substituted when a scoring collaborator fails.
    pub fn zeroed() -> Self {
        Self {
            quality: 0.0,
            lint_penalty: 0.0,
            token_cost_penalty: 0.0,
            composite: 0.0,
            criterion_scores: Vec::new(),
        }
    }

    /// The lowest-scoring criterion, if any sub-scores are present.
    pub fn weakest_criterion(&self) -> Option<&CriterionScore> {
        self.criterion_scores
            .iter()
            .min_by(|a, b| a.score.total_cmp(&b.score))
    }
}

/// Composite fitness, with unevaluated individuals comparing as 0.
pub fn composite_or_zero(individual: &Individual) -> f64 {
    individual.fitness.as_ref().map_or(0.0, |f| f.composite)
}

// --- Individual ---

/// The unit of evolution: one candidate prompt with lineage.
///
/// Immutable once created except for the fitness slot, which the evaluator
/// sets exactly once. Elite copies, mutants and crossover children are new
/// individuals with fresh ids and `fitness: None`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Individual {
    pub id: Uuid,
    pub generation: u32,
    pub text: String,
    pub rationale: String,
    pub framework_tag: String,
    pub domain_id: String,
    /// 0 parents (initial/immigrant), 1 (elite carry, mutation, clone) or
    /// 2 (crossover).
    pub parent_ids: Vec<Uuid>,
    pub fitness: Option<FitnessScore>,
}

impl Individual {
    /// Copy into the next generation as a new, unevaluated individual.
    /// Used by elitism carries, clone-fills and operator failure fallbacks.
    pub fn advanced_copy(&self, id: Uuid) -> Self {
        Self {
            id,
            generation: self.generation + 1,
            text: self.text.clone(),
            rationale: self.rationale.clone(),
            framework_tag: self.framework_tag.clone(),
            domain_id: self.domain_id.clone(),
            parent_ids: vec![self.id],
            fitness: None,
        }
    }
}

// --- Run history ---

/// Read-only record of one completed generation. The snapshot list is the
/// permanent evolutionary history and is never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GenerationSnapshot {
    pub generation: u32,
    pub population: Vec<Individual>,
    pub best_fitness: f64,
    pub avg_fitness: f64,
    pub worst_fitness: f64,
    /// Mean pairwise trigram Jaccard distance, in [0, 1].
    pub diversity: f64,
    pub best_individual_id: Uuid,
    pub timestamp: DateTime<Utc>,
}

impl GenerationSnapshot {
    /// Build a snapshot from a fully evaluated population.
    pub fn capture(generation: u32, population: &[Individual], diversity: f64) -> Self {
        let best = population
            .iter()
            .max_by(|a, b| composite_or_zero(a).total_cmp(&composite_or_zero(b)));
        let best_fitness = best.map_or(0.0, composite_or_zero);
        let best_individual_id = best.map_or_else(Uuid::nil, |i| i.id);
        let worst_fitness = population
            .iter()
            .map(composite_or_zero)
            .fold(f64::INFINITY, f64::min)
            .min(best_fitness);
        let avg_fitness = if population.is_empty() {
            0.0
        } else {
            population.iter().map(composite_or_zero).sum::<f64>() / population.len() as f64
        };
        Self {
            generation,
            population: population.to_vec(),
            best_fitness,
            avg_fitness,
            worst_fitness,
            diversity,
            best_individual_id,
            timestamp: Utc::now(),
        }
    }
}

/// Final result of an evolution run, assembled once at loop termination.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RunResult {
    pub config: GeneticConfig,
    pub generations: Vec<GenerationSnapshot>,
    /// Best composite fitness ever observed across all snapshots — elitism
    /// re-scoring and stochastic drift mean this individual may not survive
    /// to the final generation.
    pub best_individual_ever: Individual,
    pub convergence_generation: Option<u32>,
    pub total_duration_ms: u64,
    pub total_external_calls: u64,
}

impl std::fmt::Display for RunResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Evolution Run Complete ===")?;
        writeln!(f, "Generations:     {}", self.generations.len())?;
        match self.convergence_generation {
            Some(g) => writeln!(f, "Converged at:    generation {g}")?,
            None => writeln!(f, "Converged at:    (budget exhausted)")?,
        }
        writeln!(
            f,
            "Best fitness:    {:.1}",
            composite_or_zero(&self.best_individual_ever)
        )?;
        writeln!(f, "External calls:  {}", self.total_external_calls)?;
        writeln!(f, "Duration:        {} ms", self.total_duration_ms)?;
        Ok(())
    }
}
