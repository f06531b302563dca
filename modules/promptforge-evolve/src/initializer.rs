//! Generation-0 population builder.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use promptforge_common::{
    EvolveError, GeneticConfig, Individual, ProgressEvent, ProgressKind, ProgressSink,
    FRAMEWORK_POOL,
};

use crate::meter::CallMeter;
use crate::traits::{GenerationRequest, IdSource, PromptGenerator};
use crate::util::truncate_prompt;

pub struct PopulationInitializer {
    generator: Arc<dyn PromptGenerator>,
    ids: Arc<dyn IdSource>,
    meter: Arc<CallMeter>,
}

impl PopulationInitializer {
    pub fn new(
        generator: Arc<dyn PromptGenerator>,
        ids: Arc<dyn IdSource>,
        meter: Arc<CallMeter>,
    ) -> Self {
        Self { generator, ids, meter }
    }

    /// Build `population_size` generation-0 individuals from the seed
    /// intent. A generator failure never aborts the run: the slot gets a
    /// degraded individual carrying the raw seed intent and a rationale
    /// recording the failure. Cancellation is checked before each slot.
    pub async fn build(
        &self,
        config: &GeneticConfig,
        cancelled: &AtomicBool,
        sink: &dyn ProgressSink,
    ) -> Result<Vec<Individual>, EvolveError> {
        let mut population = Vec::with_capacity(config.population_size);

        for slot in 0..config.population_size {
            if cancelled.load(Ordering::Relaxed) {
                return Err(EvolveError::Aborted);
            }

            let framework_tag = framework_for_slot(config, slot);
            sink.emit(ProgressEvent {
                kind: ProgressKind::Init,
                generation: 0,
                detail: format!(
                    "seeding individual {}/{} ({framework_tag})",
                    slot + 1,
                    config.population_size
                ),
                progress: slot as f32 / config.population_size as f32 * 10.0,
                snapshot: None,
            });

            let request = GenerationRequest {
                instruction: format!(
                    "Write a complete, high-quality prompt realizing this intent \
                     using the {framework_tag} framework: {}",
                    config.seed_intent
                ),
                source_texts: vec![],
                framework_tag: framework_tag.clone(),
                domain_id: config.domain_id.clone(),
                provider_id: config.provider_id.clone(),
                language: config.language.clone(),
                rules: vec![],
            };

            self.meter.record();
            let individual = match self.generator.generate(&request).await {
                Ok(generated) => Individual {
                    id: self.ids.next_id(),
                    generation: 0,
                    text: truncate_prompt(&generated.text, config.max_prompt_len),
                    rationale: generated.rationale,
                    framework_tag,
                    domain_id: config.domain_id.clone(),
                    parent_ids: vec![],
                    fitness: None,
                },
                Err(e) => {
                    warn!(slot, error = %e, "Initial generation failed, seeding degraded individual");
                    Individual {
                        id: self.ids.next_id(),
                        generation: 0,
                        text: config.seed_intent.clone(),
                        rationale: format!("initial generation failed, raw seed intent used: {e}"),
                        framework_tag,
                        domain_id: config.domain_id.clone(),
                        parent_ids: vec![],
                        fitness: None,
                    }
                }
            };
            population.push(individual);

            if config.generator_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(config.generator_delay_ms)).await;
            }
        }

        info!(size = population.len(), "Initial population seeded");
        Ok(population)
    }
}

/// Round-robin over the diversity pool when the config framework is
/// "auto"; otherwise the fixed framework for every slot.
fn framework_for_slot(config: &GeneticConfig, slot: usize) -> String {
    if config.framework == "auto" {
        FRAMEWORK_POOL[slot % FRAMEWORK_POOL.len()].to_string()
    } else {
        config.framework.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use promptforge_common::events::NullSink;

    use crate::testing::{test_config, CollectingSink, SequentialIds, StubGenerator};

    fn initializer(generator: StubGenerator) -> PopulationInitializer {
        PopulationInitializer::new(
            Arc::new(generator),
            Arc::new(SequentialIds::new()),
            Arc::new(CallMeter::new()),
        )
    }

    #[tokio::test]
    async fn auto_framework_round_robins_the_pool() {
        let init = initializer(StubGenerator::fixed("generated"));
        let mut config = test_config();
        config.population_size = 7;
        config.framework = "auto".into();
        let cancelled = AtomicBool::new(false);

        let population = init.build(&config, &cancelled, &NullSink).await.unwrap();
        assert_eq!(population.len(), 7);
        assert_eq!(population[0].framework_tag, FRAMEWORK_POOL[0]);
        assert_eq!(population[4].framework_tag, FRAMEWORK_POOL[4]);
        assert_eq!(population[5].framework_tag, FRAMEWORK_POOL[0]);
    }

    #[tokio::test]
    async fn fixed_framework_applies_to_every_slot() {
        let init = initializer(StubGenerator::fixed("generated"));
        let mut config = test_config();
        config.framework = "KERNEL".into();
        let cancelled = AtomicBool::new(false);

        let population = init.build(&config, &cancelled, &NullSink).await.unwrap();
        assert!(population.iter().all(|i| i.framework_tag == "KERNEL"));
    }

    #[tokio::test]
    async fn failing_generator_seeds_degraded_individuals() {
        let init = initializer(StubGenerator::failing());
        let config = test_config();
        let cancelled = AtomicBool::new(false);

        let population = init.build(&config, &cancelled, &NullSink).await.unwrap();
        assert_eq!(population.len(), config.population_size);
        for individual in &population {
            assert_eq!(individual.text, config.seed_intent);
            assert!(individual.rationale.contains("failed"));
            assert!(individual.fitness.is_none());
        }
    }

    #[tokio::test]
    async fn cancellation_before_first_slot_aborts() {
        let init = initializer(StubGenerator::fixed("generated"));
        let config = test_config();
        let cancelled = AtomicBool::new(true);

        let result = init.build(&config, &cancelled, &NullSink).await;
        assert!(matches!(result, Err(EvolveError::Aborted)));
    }

    #[tokio::test]
    async fn emits_one_init_event_per_slot() {
        let init = initializer(StubGenerator::fixed("generated"));
        let config = test_config();
        let cancelled = AtomicBool::new(false);
        let sink = CollectingSink::new();

        init.build(&config, &cancelled, &sink).await.unwrap();
        let events = sink.events();
        assert_eq!(events.len(), config.population_size);
        assert!(events.iter().all(|e| e.kind == ProgressKind::Init));
        // Percentages derived from slot index stay within the init band.
        assert!(events.windows(2).all(|w| w[0].progress <= w[1].progress));
        assert!(events.last().unwrap().progress < 10.0);
    }
}
