use std::env;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::error::EvolveError;

/// Immutable parameters for one evolution run.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, TypedBuilder)]
pub struct GeneticConfig {
    /// Individuals per generation. Must be at least 2.
    #[builder(default = 8)]
    pub population_size: usize,
    /// Generation budget after generation 0.
    #[builder(default = 10)]
    pub max_generations: u32,
    /// Probability a fill slot mutates its child.
    #[builder(default = 0.3)]
    pub mutation_rate: f64,
    /// Probability a fill slot recombines two parents (else parent A is cloned).
    #[builder(default = 0.7)]
    pub crossover_rate: f64,
    /// Top-K individuals carried unconditionally. Must stay below population_size.
    #[builder(default = 2)]
    pub elitism_count: usize,
    /// Uniform draws per tournament. Must be at least 1.
    #[builder(default = 3)]
    pub tournament_size: usize,
    /// The user intent every candidate prompt is grown from.
    #[builder(setter(into))]
    pub seed_intent: String,
    #[builder(default = "general".to_string(), setter(into))]
    pub domain_id: String,
    #[builder(default = "anthropic".to_string(), setter(into))]
    pub provider_id: String,
    #[builder(default = "en".to_string(), setter(into))]
    pub language: String,
    /// A fixed framework tag, or "auto" to round-robin the diversity pool.
    #[builder(default = "auto".to_string(), setter(into))]
    pub framework: String,
    /// Generated prompt texts are truncated to this many characters.
    #[builder(default = 12_000)]
    pub max_prompt_len: usize,
    /// Fixed delay after each generator invocation (provider rate limits).
    #[builder(default = 0)]
    pub generator_delay_ms: u64,
    /// Seed for the run's random source. None draws from OS entropy.
    #[builder(default)]
    pub rng_seed: Option<u64>,
}

impl GeneticConfig {
    /// Reject configs the loop cannot run with. The engine does not
    /// self-correct invalid parameters.
    pub fn validate(&self) -> Result<(), EvolveError> {
        if self.population_size < 2 {
            return Err(EvolveError::Config(format!(
                "population_size must be at least 2, got {}",
                self.population_size
            )));
        }
        if self.elitism_count >= self.population_size {
            return Err(EvolveError::Config(format!(
                "elitism_count {} must be below population_size {}",
                self.elitism_count, self.population_size
            )));
        }
        if self.tournament_size == 0 {
            return Err(EvolveError::Config("tournament_size must be at least 1".into()));
        }
        for (name, rate) in [("mutation_rate", self.mutation_rate), ("crossover_rate", self.crossover_rate)] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(EvolveError::Config(format!(
                    "{name} must be within [0, 1], got {rate}"
                )));
            }
        }
        if self.seed_intent.trim().is_empty() {
            return Err(EvolveError::Config("seed_intent must not be empty".into()));
        }
        Ok(())
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub claude_model: String,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            anthropic_api_key: required_env("ANTHROPIC_API_KEY"),
            claude_model: env::var("CLAUDE_MODEL")
                .unwrap_or_else(|_| "claude-haiku-4-5-20251001".to_string()),
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> GeneticConfig {
        GeneticConfig::builder().seed_intent("write a code review prompt").build()
    }

    #[test]
    fn default_config_is_valid() {
        assert!(base().validate().is_ok());
    }

    #[test]
    fn rejects_elitism_at_population_size() {
        let mut config = base();
        config.population_size = 4;
        config.elitism_count = 4;
        assert!(matches!(config.validate(), Err(EvolveError::Config(_))));
    }

    #[test]
    fn rejects_tiny_population() {
        let mut config = base();
        config.population_size = 1;
        config.elitism_count = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_rates() {
        let mut config = base();
        config.mutation_rate = 1.5;
        assert!(config.validate().is_err());
    }
}
