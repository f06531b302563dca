//! Mutation: transform one individual, targeted at its weakest fitness
//! criterion when sub-scores are available.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::Rng;
use tracing::warn;

use promptforge_common::{FitnessScore, GeneticConfig, Individual};

use crate::meter::CallMeter;
use crate::traits::{GenerationRequest, IdSource, PromptGenerator};
use crate::util::truncate_prompt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationType {
    Rephrase,
    AddDetail,
    RemoveRedundancy,
    Restructure,
    InjectGuardrail,
    StrengthenCriteria,
}

impl MutationType {
    pub fn as_str(self) -> &'static str {
        match self {
            MutationType::Rephrase => "rephrase",
            MutationType::AddDetail => "add_detail",
            MutationType::RemoveRedundancy => "remove_redundancy",
            MutationType::Restructure => "restructure",
            MutationType::InjectGuardrail => "inject_guardrail",
            MutationType::StrengthenCriteria => "strengthen_criteria",
        }
    }

    fn instruction(self) -> &'static str {
        match self {
            MutationType::Rephrase => {
                "Rephrase the prompt for clarity while preserving every requirement."
            }
            MutationType::AddDetail => {
                "Add concrete detail: examples, expected inputs and outputs, edge cases."
            }
            MutationType::RemoveRedundancy => {
                "Remove redundant or repeated instructions without losing any requirement."
            }
            MutationType::Restructure => {
                "Restructure the prompt into clearly headed sections with ordered steps."
            }
            MutationType::InjectGuardrail => {
                "Add security guardrails: injection defenses, refusal rules, PII protection."
            }
            MutationType::StrengthenCriteria => {
                "Strengthen success criteria: measurable checks, stop conditions, determinism constraints."
            }
        }
    }
}

/// Applied when the individual carries no fitness or its weakest criterion
/// has no mapped mutation type.
const DEFAULT_TYPES: [MutationType; 3] = [
    MutationType::Rephrase,
    MutationType::AddDetail,
    MutationType::RemoveRedundancy,
];

fn type_for_criterion(criterion_id: &str) -> Option<MutationType> {
    match criterion_id {
        "clarity" => Some(MutationType::Rephrase),
        "specificity" => Some(MutationType::AddDetail),
        "structure" => Some(MutationType::Restructure),
        "security" => Some(MutationType::InjectGuardrail),
        "reproducibility" => Some(MutationType::StrengthenCriteria),
        _ => None,
    }
}

/// Pick the mutation type for an individual: the weakest scored criterion's
/// mapped type, or a uniform draw from the default set.
pub fn select_mutation_type(
    fitness: Option<&FitnessScore>,
    rng: &mut StdRng,
) -> (MutationType, Option<String>) {
    if let Some(weakest) = fitness.and_then(|f| f.weakest_criterion()) {
        if let Some(mutation_type) = type_for_criterion(&weakest.criterion_id) {
            let weakness = format!(
                "weakest criterion: {} (scored {:.0})",
                weakest.criterion_id, weakest.score
            );
            return (mutation_type, Some(weakness));
        }
    }
    let pick = DEFAULT_TYPES[rng.random_range(0..DEFAULT_TYPES.len())];
    (pick, None)
}

pub struct MutationOperator {
    generator: Arc<dyn PromptGenerator>,
    ids: Arc<dyn IdSource>,
    meter: Arc<CallMeter>,
}

impl MutationOperator {
    pub fn new(
        generator: Arc<dyn PromptGenerator>,
        ids: Arc<dyn IdSource>,
        meter: Arc<CallMeter>,
    ) -> Self {
        Self { generator, ids, meter }
    }

    /// Produce a mutated child one generation ahead of the original. On
    /// generator failure the original is carried forward unchanged, with a
    /// rationale recording the failure — degraded, not fatal.
    pub async fn mutate(
        &self,
        individual: &Individual,
        config: &GeneticConfig,
        rng: &mut StdRng,
    ) -> Individual {
        let (mutation_type, weakness) = select_mutation_type(individual.fitness.as_ref(), rng);

        let mut instruction = format!(
            "Apply a '{}' mutation to the prompt below. {}",
            mutation_type.as_str(),
            mutation_type.instruction()
        );
        if let Some(ref weakness) = weakness {
            instruction.push_str(&format!(" Judge feedback — {weakness}."));
        }

        let request = GenerationRequest {
            instruction,
            source_texts: vec![individual.text.clone()],
            framework_tag: individual.framework_tag.clone(),
            domain_id: individual.domain_id.clone(),
            provider_id: config.provider_id.clone(),
            language: config.language.clone(),
            rules: vec![],
        };

        self.meter.record();
        match self.generator.generate(&request).await {
            Ok(generated) => Individual {
                id: self.ids.next_id(),
                generation: individual.generation + 1,
                text: truncate_prompt(&generated.text, config.max_prompt_len),
                rationale: generated.rationale,
                framework_tag: individual.framework_tag.clone(),
                domain_id: individual.domain_id.clone(),
                parent_ids: vec![individual.id],
                fitness: None,
            },
            Err(e) => {
                warn!(id = %individual.id, error = %e, "Mutation failed, carrying original forward");
                let mut clone = individual.advanced_copy(self.ids.next_id());
                clone.rationale = format!(
                    "mutation '{}' failed, original carried forward: {e}",
                    mutation_type.as_str()
                );
                clone
            }
        }
    }
}
