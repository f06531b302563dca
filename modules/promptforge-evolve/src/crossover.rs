//! Crossover: recombine two parents into one child via a generator
//! instruction chosen uniformly from a fixed set of combination styles.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::Rng;
use tracing::warn;

use promptforge_common::{composite_or_zero, GeneticConfig, Individual};

use crate::meter::CallMeter;
use crate::traits::{GenerationRequest, IdSource, PromptGenerator};
use crate::util::truncate_prompt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossoverType {
    SectionSwap,
    ParagraphBlend,
    StrengthMerge,
}

const CROSSOVER_TYPES: [CrossoverType; 3] = [
    CrossoverType::SectionSwap,
    CrossoverType::ParagraphBlend,
    CrossoverType::StrengthMerge,
];

impl CrossoverType {
    pub fn as_str(self) -> &'static str {
        match self {
            CrossoverType::SectionSwap => "section_swap",
            CrossoverType::ParagraphBlend => "paragraph_blend",
            CrossoverType::StrengthMerge => "strength_merge",
        }
    }

    fn instruction(self) -> &'static str {
        match self {
            CrossoverType::SectionSwap => {
                "Swap whole sections between the two prompts, keeping each section's strongest version."
            }
            CrossoverType::ParagraphBlend => {
                "Blend the prompts paragraph by paragraph into one coherent prompt."
            }
            CrossoverType::StrengthMerge => {
                "Merge the distinct strengths of each prompt; drop weaker duplicated material."
            }
        }
    }
}

pub struct CrossoverOperator {
    generator: Arc<dyn PromptGenerator>,
    ids: Arc<dyn IdSource>,
    meter: Arc<CallMeter>,
}

impl CrossoverOperator {
    pub fn new(
        generator: Arc<dyn PromptGenerator>,
        ids: Arc<dyn IdSource>,
        meter: Arc<CallMeter>,
    ) -> Self {
        Self { generator, ids, meter }
    }

    /// Recombine `parent_a` and `parent_b`. The child sits one generation
    /// past the later parent, records both parent ids, and inherits a
    /// framework tag from a random parent. On generator failure the fitter
    /// parent is carried forward instead — degraded, not fatal.
    pub async fn crossover(
        &self,
        parent_a: &Individual,
        parent_b: &Individual,
        config: &GeneticConfig,
        rng: &mut StdRng,
    ) -> Individual {
        let crossover_type = CROSSOVER_TYPES[rng.random_range(0..CROSSOVER_TYPES.len())];
        let framework_tag = if rng.random_bool(0.5) {
            parent_a.framework_tag.clone()
        } else {
            parent_b.framework_tag.clone()
        };
        let child_generation = parent_a.generation.max(parent_b.generation) + 1;

        let request = GenerationRequest {
            instruction: format!(
                "Combine the two prompts below ('{}' crossover). {}",
                crossover_type.as_str(),
                crossover_type.instruction()
            ),
            source_texts: vec![parent_a.text.clone(), parent_b.text.clone()],
            framework_tag: framework_tag.clone(),
            domain_id: parent_a.domain_id.clone(),
            provider_id: config.provider_id.clone(),
            language: config.language.clone(),
            rules: vec![],
        };

        self.meter.record();
        match self.generator.generate(&request).await {
            Ok(generated) => Individual {
                id: self.ids.next_id(),
                generation: child_generation,
                text: truncate_prompt(&generated.text, config.max_prompt_len),
                rationale: generated.rationale,
                framework_tag,
                domain_id: parent_a.domain_id.clone(),
                parent_ids: vec![parent_a.id, parent_b.id],
                fitness: None,
            },
            Err(e) => {
                let fitter = if composite_or_zero(parent_a) >= composite_or_zero(parent_b) {
                    parent_a
                } else {
                    parent_b
                };
                warn!(id = %fitter.id, error = %e, "Crossover failed, carrying fitter parent forward");
                let mut clone = fitter.advanced_copy(self.ids.next_id());
                clone.generation = child_generation;
                clone.rationale = format!(
                    "crossover '{}' failed, fitter parent carried forward: {e}",
                    crossover_type.as_str()
                );
                clone
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    use crate::testing::{scored_individual, test_config, SequentialIds, StubGenerator};

    fn operator(generator: StubGenerator) -> CrossoverOperator {
        CrossoverOperator::new(
            Arc::new(generator),
            Arc::new(SequentialIds::new()),
            Arc::new(CallMeter::new()),
        )
    }

    #[tokio::test]
    async fn child_links_both_parents_and_advances_generation() {
        let op = operator(StubGenerator::fixed("combined prompt"));
        let config = test_config();
        let mut rng = StdRng::seed_from_u64(0);
        let mut a = scored_individual("parent a", 40.0);
        let b = scored_individual("parent b", 60.0);
        a.generation = 2;

        let child = op.crossover(&a, &b, &config, &mut rng).await;
        assert_eq!(child.generation, 3); // max(2, 0) + 1
        assert_eq!(child.parent_ids, vec![a.id, b.id]);
        assert_eq!(child.text, "combined prompt");
        assert!(child.fitness.is_none());
        assert!(
            child.framework_tag == a.framework_tag || child.framework_tag == b.framework_tag
        );
    }

    #[tokio::test]
    async fn failure_falls_back_to_fitter_parent() {
        let op = operator(StubGenerator::failing());
        let config = test_config();
        let mut rng = StdRng::seed_from_u64(0);
        let a = scored_individual("weaker", 20.0);
        let b = scored_individual("stronger", 75.0);

        let child = op.crossover(&a, &b, &config, &mut rng).await;
        assert_eq!(child.text, "stronger");
        assert_eq!(child.parent_ids, vec![b.id]);
        assert!(child.rationale.contains("failed"));
    }

    #[tokio::test]
    async fn unevaluated_parent_loses_the_fallback_tiebreak() {
        let op = operator(StubGenerator::failing());
        let config = test_config();
        let mut rng = StdRng::seed_from_u64(0);
        let mut a = scored_individual("unscored", 0.0);
        a.fitness = None;
        let b = scored_individual("scored", 10.0);

        let child = op.crossover(&a, &b, &config, &mut rng).await;
        assert_eq!(child.text, "scored");
    }
}
