//! The evolution orchestrator.
//!
//! Phases run strictly sequentially on one logical thread of control:
//! initialize → evaluate → snapshot, then per generation elitism → fill
//! (selection + crossover + mutation) → immigration check → evaluate →
//! snapshot → convergence check. Sequential execution keeps the stochastic
//! decision sequence reproducible and lets the fixed inter-call delay pace
//! provider traffic. Generation g+1's selection never starts before
//! generation g is fully evaluated and snapshotted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};

use promptforge_common::{
    composite_or_zero, events::NullSink, EvolveError, GenerationSnapshot, GeneticConfig,
    Individual, ProgressEvent, ProgressKind, ProgressSink, RunResult, FRAMEWORK_POOL,
};

use crate::convergence::ConvergenceDetector;
use crate::crossover::CrossoverOperator;
use crate::diversity::{population_diversity, worst_non_elite_index, IMMIGRATION_THRESHOLD};
use crate::fitness::FitnessEvaluator;
use crate::initializer::PopulationInitializer;
use crate::meter::CallMeter;
use crate::mutation::MutationOperator;
use crate::traits::{
    BudgetAnalyzer, GenerationRequest, IdSource, LintChecker, PromptGenerator, QualityJudge,
    UuidIds,
};
use crate::util::truncate_prompt;

/// Everything the engine needs from the outside world.
pub struct EngineDeps {
    pub generator: Arc<dyn PromptGenerator>,
    pub judge: Arc<dyn QualityJudge>,
    pub lint: Arc<dyn LintChecker>,
    pub budget: Arc<dyn BudgetAnalyzer>,
    pub sink: Arc<dyn ProgressSink>,
    pub ids: Arc<dyn IdSource>,
    /// Cooperative cancellation — checked at generation boundaries and
    /// before every generator invocation.
    pub cancelled: Arc<AtomicBool>,
}

impl EngineDeps {
    pub fn new(
        generator: Arc<dyn PromptGenerator>,
        judge: Arc<dyn QualityJudge>,
        lint: Arc<dyn LintChecker>,
        budget: Arc<dyn BudgetAnalyzer>,
    ) -> Self {
        Self {
            generator,
            judge,
            lint,
            budget,
            sink: Arc::new(NullSink),
            ids: Arc::new(UuidIds),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_ids(mut self, ids: Arc<dyn IdSource>) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_cancellation(mut self, cancelled: Arc<AtomicBool>) -> Self {
        self.cancelled = cancelled;
        self
    }
}

pub struct EvolutionEngine {
    config: GeneticConfig,
    generator: Arc<dyn PromptGenerator>,
    sink: Arc<dyn ProgressSink>,
    ids: Arc<dyn IdSource>,
    cancelled: Arc<AtomicBool>,
    meter: Arc<CallMeter>,
    evaluator: FitnessEvaluator,
    initializer: PopulationInitializer,
    mutation: MutationOperator,
    crossover: CrossoverOperator,
    detector: ConvergenceDetector,
}

impl EvolutionEngine {
    /// Validates the config up front; the engine never self-corrects an
    /// invalid one.
    pub fn new(config: GeneticConfig, deps: EngineDeps) -> Result<Self, EvolveError> {
        config.validate()?;
        let meter = Arc::new(CallMeter::new());
        let evaluator = FitnessEvaluator::new(
            deps.judge.clone(),
            deps.lint.clone(),
            deps.budget.clone(),
            meter.clone(),
        );
        let initializer =
            PopulationInitializer::new(deps.generator.clone(), deps.ids.clone(), meter.clone());
        let mutation =
            MutationOperator::new(deps.generator.clone(), deps.ids.clone(), meter.clone());
        let crossover =
            CrossoverOperator::new(deps.generator.clone(), deps.ids.clone(), meter.clone());
        Ok(Self {
            config,
            generator: deps.generator,
            sink: deps.sink,
            ids: deps.ids,
            cancelled: deps.cancelled,
            meter,
            evaluator,
            initializer,
            mutation,
            crossover,
            detector: ConvergenceDetector::default(),
        })
    }

    /// Drive the full evolutionary run. Cancellation surfaces as
    /// `EvolveError::Aborted` with no partial result.
    pub async fn run(&self) -> Result<RunResult, EvolveError> {
        let started = Instant::now();
        let mut rng = match self.config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        info!(
            population = self.config.population_size,
            generations = self.config.max_generations,
            seed_intent = %self.config.seed_intent,
            "Evolution run starting"
        );

        // Generation 0: seed, evaluate, snapshot.
        let mut population = self
            .initializer
            .build(&self.config, &self.cancelled, self.sink.as_ref())
            .await?;
        self.emit(ProgressKind::Evaluate, 0, "evaluating initial population", self.band(0).0, None);
        self.evaluator
            .evaluate_all(&mut population, &self.config)
            .await?;

        let mut snapshots: Vec<GenerationSnapshot> = Vec::new();
        self.snapshot(0, &population, &mut snapshots);

        let mut convergence_generation = None;

        for g in 1..=self.config.max_generations {
            if self.cancelled.load(Ordering::Relaxed) {
                return Err(EvolveError::Aborted);
            }
            let (base, span) = self.band(g);
            self.emit(
                ProgressKind::Select,
                g,
                &format!("generation {g}: carrying elites, selecting parents"),
                base,
                None,
            );

            // Elites occupy the leading slots and are protected from
            // immigration replacement below.
            let mut next =
                crate::selection::elites(&population, self.config.elitism_count, self.ids.as_ref());

            while next.len() < self.config.population_size {
                if self.cancelled.load(Ordering::Relaxed) {
                    return Err(EvolveError::Aborted);
                }
                let slot_frac = next.len() as f32 / self.config.population_size as f32;
                let slot_progress = base + span * (0.1 + 0.5 * slot_frac);

                let parent_a =
                    crate::selection::tournament(&population, self.config.tournament_size, &mut rng)
                        .clone();
                let parent_b =
                    crate::selection::tournament(&population, self.config.tournament_size, &mut rng)
                        .clone();

                let mut child = if rng.random::<f64>() < self.config.crossover_rate {
                    self.emit(
                        ProgressKind::Crossover,
                        g,
                        "recombining tournament winners",
                        slot_progress,
                        None,
                    );
                    let child = self
                        .crossover
                        .crossover(&parent_a, &parent_b, &self.config, &mut rng)
                        .await;
                    self.pace().await;
                    child
                } else {
                    // Clone fills keep the parent's score: the text is
                    // unchanged, so the evaluator can skip the slot and a
                    // following mutation can target the weakest criterion.
                    let mut clone = parent_a.advanced_copy(self.ids.next_id());
                    clone.fitness = parent_a.fitness.clone();
                    clone
                };

                if rng.random::<f64>() < self.config.mutation_rate {
                    self.emit(ProgressKind::Mutate, g, "mutating child", slot_progress, None);
                    child = self.mutation.mutate(&child, &self.config, &mut rng).await;
                    self.pace().await;
                }

                next.push(child);
            }

            self.immigration_check(&mut next, &mut rng).await?;

            self.emit(
                ProgressKind::Evaluate,
                g,
                &format!("evaluating generation {g}"),
                base + span * 0.7,
                None,
            );
            self.evaluator.evaluate_all(&mut next, &self.config).await?;

            population = next;
            self.snapshot(g, &population, &mut snapshots);

            if self.detector.converged(&snapshots) {
                info!(generation = g, "Best fitness stabilized, stopping early");
                convergence_generation = Some(g);
                break;
            }
        }

        let best_individual_ever = snapshots
            .iter()
            .flat_map(|s| s.population.iter())
            .max_by(|a, b| composite_or_zero(a).total_cmp(&composite_or_zero(b)))
            .cloned()
            .ok_or_else(|| EvolveError::Evaluation("run produced no individuals".into()))?;

        let result = RunResult {
            config: self.config.clone(),
            generations: snapshots,
            best_individual_ever,
            convergence_generation,
            total_duration_ms: started.elapsed().as_millis() as u64,
            total_external_calls: self.meter.total(),
        };
        self.emit(
            ProgressKind::Done,
            result.generations.len().saturating_sub(1) as u32,
            "run complete",
            100.0,
            result.generations.last().cloned(),
        );
        Ok(result)
    }

    /// When diversity collapses, replace the worst non-elite slot of the
    /// candidate population with a freshly generated immigrant. Runs on the
    /// assembled next generation, before evaluation.
    async fn immigration_check(
        &self,
        next: &mut [Individual],
        rng: &mut StdRng,
    ) -> Result<(), EvolveError> {
        let diversity = population_diversity(next);
        if diversity >= IMMIGRATION_THRESHOLD || next.len() <= 1 {
            return Ok(());
        }
        let Some(target) = worst_non_elite_index(next, self.config.elitism_count) else {
            return Ok(());
        };
        if self.cancelled.load(Ordering::Relaxed) {
            return Err(EvolveError::Aborted);
        }

        let framework_tag = FRAMEWORK_POOL[rng.random_range(0..FRAMEWORK_POOL.len())].to_string();
        let generation = next[target].generation;
        let request = GenerationRequest {
            instruction: format!(
                "The population has converged on similar wording. Write a creative, \
                 unique variation of this intent, structured with the {framework_tag} \
                 framework: {}",
                self.config.seed_intent
            ),
            source_texts: vec![],
            framework_tag: framework_tag.clone(),
            domain_id: self.config.domain_id.clone(),
            provider_id: self.config.provider_id.clone(),
            language: self.config.language.clone(),
            rules: vec![],
        };

        self.meter.record();
        match self.generator.generate(&request).await {
            Ok(generated) => {
                info!(diversity, slot = target, "Diversity collapsed, injecting immigrant");
                next[target] = Individual {
                    id: self.ids.next_id(),
                    generation,
                    text: truncate_prompt(&generated.text, self.config.max_prompt_len),
                    rationale: generated.rationale,
                    framework_tag,
                    domain_id: self.config.domain_id.clone(),
                    parent_ids: vec![],
                    fitness: None,
                };
            }
            Err(e) => {
                warn!(error = %e, "Immigrant generation failed, keeping candidate population");
            }
        }
        self.pace().await;
        Ok(())
    }

    fn snapshot(
        &self,
        generation: u32,
        population: &[Individual],
        snapshots: &mut Vec<GenerationSnapshot>,
    ) {
        let diversity = population_diversity(population);
        let snapshot = GenerationSnapshot::capture(generation, population, diversity);
        self.emit(
            ProgressKind::GenerationComplete,
            generation,
            &format!(
                "generation {generation} complete: best {:.1}, avg {:.1}, diversity {:.2}",
                snapshot.best_fitness, snapshot.avg_fitness, snapshot.diversity
            ),
            self.band(generation).0 + self.band(generation).1,
            Some(snapshot.clone()),
        );
        snapshots.push(snapshot);
    }

    /// Progress band for one generation: generation 0 owns [10, 10+span),
    /// generation g owns [10 + g*span, …). Initialization uses [0, 10).
    fn band(&self, generation: u32) -> (f32, f32) {
        let span = 90.0 / (self.config.max_generations + 1) as f32;
        (10.0 + generation as f32 * span, span)
    }

    fn emit(
        &self,
        kind: ProgressKind,
        generation: u32,
        detail: &str,
        progress: f32,
        snapshot: Option<GenerationSnapshot>,
    ) {
        self.sink.emit(ProgressEvent {
            kind,
            generation,
            detail: detail.to_string(),
            progress: progress.min(100.0),
            snapshot,
        });
    }

    /// Fixed inter-call delay after generator invocations — blunt but
    /// predictable provider rate limiting.
    async fn pace(&self) {
        if self.config.generator_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.generator_delay_ms)).await;
        }
    }
}
