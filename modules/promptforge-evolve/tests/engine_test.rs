//! End-to-end runs of the evolution engine against deterministic doubles.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use promptforge_common::{
    composite_or_zero, CriterionScore, EvolveError, GeneticConfig, ProgressKind,
};
use promptforge_evolve::testing::{
    CollectingSink, FixedBudget, FixedJudge, FixedLint, LengthJudge, SequentialIds, StubGenerator,
};
use promptforge_evolve::{EngineDeps, EvolutionEngine};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn scenario_config() -> GeneticConfig {
    GeneticConfig::builder()
        .seed_intent("write a prompt that reviews Rust code for unsafe patterns")
        .population_size(4)
        .max_generations(5)
        .elitism_count(1)
        .tournament_size(2)
        .mutation_rate(1.0)
        .crossover_rate(0.0)
        .rng_seed(Some(7))
        .build()
}

fn deps(generator: StubGenerator, judge: Arc<dyn promptforge_evolve::traits::QualityJudge>) -> EngineDeps {
    EngineDeps::new(
        Arc::new(generator),
        judge,
        Arc::new(FixedLint::default()),
        Arc::new(FixedBudget::new(100)),
    )
    .with_ids(Arc::new(SequentialIds::new()))
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

/// Echo generator + length-scoring judge: elitism guarantees best fitness
/// never regresses across snapshots.
#[tokio::test]
async fn best_fitness_is_monotone_with_elitism() {
    let engine = EvolutionEngine::new(
        scenario_config(),
        deps(StubGenerator::echo(), Arc::new(LengthJudge)),
    )
    .unwrap();

    let result = engine.run().await.unwrap();
    assert!(!result.generations.is_empty());
    for pair in result.generations.windows(2) {
        assert!(
            pair[1].best_fitness >= pair[0].best_fitness,
            "best fitness regressed: {} -> {} at generation {}",
            pair[0].best_fitness,
            pair[1].best_fitness,
            pair[1].generation
        );
    }
}

/// A generator that always raises never aborts the run: every generation-0
/// individual degrades to the raw seed intent with a failure rationale.
#[tokio::test]
async fn failing_generator_degrades_but_completes() {
    let config = scenario_config();
    let engine = EvolutionEngine::new(
        config.clone(),
        deps(StubGenerator::failing(), Arc::new(FixedJudge::new(50.0))),
    )
    .unwrap();

    let result = engine.run().await.unwrap();
    let generation_zero = &result.generations[0];
    assert_eq!(generation_zero.population.len(), config.population_size);
    for individual in &generation_zero.population {
        assert_eq!(individual.text, config.seed_intent);
        assert!(individual.rationale.contains("failed"));
    }
}

/// An abort signal set before generation 2 terminates the run with the
/// distinct aborted condition and no generation-2 snapshot.
#[tokio::test]
async fn abort_signal_stops_before_generation_two() {
    let cancelled = Arc::new(AtomicBool::new(false));
    let sink = Arc::new(CollectingSink::new());

    // Flip the flag once generation 1 completes.
    struct AbortAfterGenerationOne {
        cancelled: Arc<AtomicBool>,
        inner: Arc<CollectingSink>,
    }
    impl promptforge_common::ProgressSink for AbortAfterGenerationOne {
        fn emit(&self, event: promptforge_common::ProgressEvent) {
            if event.kind == ProgressKind::GenerationComplete && event.generation == 1 {
                self.cancelled.store(true, Ordering::Relaxed);
            }
            self.inner.emit(event);
        }
    }

    let engine = EvolutionEngine::new(
        scenario_config(),
        deps(StubGenerator::echo(), Arc::new(LengthJudge))
            .with_sink(Arc::new(AbortAfterGenerationOne {
                cancelled: cancelled.clone(),
                inner: sink.clone(),
            }))
            .with_cancellation(cancelled),
    )
    .unwrap();

    let result = engine.run().await;
    assert!(matches!(result, Err(EvolveError::Aborted)));

    let completed: Vec<u32> = sink
        .events()
        .iter()
        .filter(|e| e.kind == ProgressKind::GenerationComplete)
        .map(|e| e.generation)
        .collect();
    assert_eq!(completed, vec![0, 1], "no generation-2 snapshot may exist");
}

/// A constant judge converges immediately: identical best fitness across
/// the trailing window stops the loop early and records the generation.
#[tokio::test]
async fn constant_fitness_converges_early() {
    let engine = EvolutionEngine::new(
        scenario_config(),
        deps(StubGenerator::fixed("identical output"), Arc::new(FixedJudge::new(60.0))),
    )
    .unwrap();

    let result = engine.run().await.unwrap();
    let converged_at = result.convergence_generation.expect("run should converge");
    assert!(converged_at <= 2, "converged too late: {converged_at}");
    assert_eq!(
        result.generations.last().unwrap().generation,
        converged_at,
        "loop must stop at the converged generation"
    );
}

/// Result assembly scans all snapshots, not just the final generation.
#[tokio::test]
async fn best_ever_spans_all_generations() {
    let engine = EvolutionEngine::new(
        scenario_config(),
        deps(StubGenerator::echo(), Arc::new(LengthJudge)),
    )
    .unwrap();

    let result = engine.run().await.unwrap();
    let best = composite_or_zero(&result.best_individual_ever);
    for snapshot in &result.generations {
        assert!(snapshot.best_fitness <= best + 1e-9);
    }
    assert!(result.total_external_calls > 0);
}

/// Progress events cover the run 0 → 100 without ever decreasing, ending
/// in a single done event.
#[tokio::test]
async fn progress_is_monotone_and_terminal() {
    let sink = Arc::new(CollectingSink::new());
    let engine = EvolutionEngine::new(
        scenario_config(),
        deps(StubGenerator::echo(), Arc::new(LengthJudge)).with_sink(sink.clone()),
    )
    .unwrap();

    engine.run().await.unwrap();
    let events = sink.events();
    assert!(events.windows(2).all(|w| w[0].progress <= w[1].progress));
    let last = events.last().unwrap();
    assert_eq!(last.kind, ProgressKind::Done);
    assert_eq!(last.progress, 100.0);
    assert!(last.snapshot.is_some());
}

/// Fitness bounds hold for every individual in every snapshot.
#[tokio::test]
async fn all_fitness_values_stay_in_bounds() {
    let engine = EvolutionEngine::new(
        scenario_config(),
        deps(StubGenerator::echo(), Arc::new(LengthJudge)),
    )
    .unwrap();

    let result = engine.run().await.unwrap();
    for snapshot in &result.generations {
        for individual in &snapshot.population {
            let score = individual.fitness.as_ref().expect("snapshots hold evaluated individuals");
            assert!((0.0..=100.0).contains(&score.composite));
        }
    }
}

/// Elite copies of the previous best appear at the head of the next
/// generation with a parent link back to the original.
#[tokio::test]
async fn elites_lead_each_generation() {
    let engine = EvolutionEngine::new(
        scenario_config(),
        deps(StubGenerator::echo(), Arc::new(LengthJudge)),
    )
    .unwrap();

    let result = engine.run().await.unwrap();
    for pair in result.generations.windows(2) {
        let elite = &pair[1].population[0];
        let parent = pair[0]
            .population
            .iter()
            .find(|i| i.id == elite.parent_ids[0])
            .expect("elite parent must come from the previous generation");
        assert_eq!(composite_or_zero(parent), pair[0].best_fitness);
        assert_eq!(elite.text, parent.text);
    }
}

/// Clone fills carry their parent's score into the fill loop, so mutation
/// sees the judge's weakest criterion and picks its mapped type instead of
/// the uniform default set.
#[tokio::test]
async fn weakest_criterion_guides_engine_mutations() {
    let generator = Arc::new(StubGenerator::fixed("hardened prompt"));
    let judge = Arc::new(FixedJudge::with_criteria(
        70.0,
        vec![
            CriterionScore { criterion_id: "clarity".into(), score: 80.0 },
            CriterionScore { criterion_id: "security".into(), score: 5.0 },
        ],
    ));
    let engine = EvolutionEngine::new(
        scenario_config(),
        EngineDeps::new(
            generator.clone(),
            judge,
            Arc::new(FixedLint::default()),
            Arc::new(FixedBudget::new(100)),
        )
        .with_ids(Arc::new(SequentialIds::new())),
    )
    .unwrap();

    engine.run().await.unwrap();

    // Mutation requests carry exactly one source text; seeding and
    // immigration carry none.
    let mutations: Vec<_> = generator
        .requests()
        .into_iter()
        .filter(|r| r.source_texts.len() == 1)
        .collect();
    assert!(!mutations.is_empty());
    for request in &mutations {
        assert!(
            request.instruction.contains("inject_guardrail"),
            "expected the weakest-criterion type, got: {}",
            request.instruction
        );
        assert!(request.instruction.contains("security"));
    }
}

/// With no variation operators firing, only elite copies and immigrants
/// re-enter unevaluated; clone fills keep their parent's score and are
/// skipped by the evaluator.
#[tokio::test]
async fn clone_fills_are_not_rescored() {
    let mut config = scenario_config();
    config.mutation_rate = 0.0;
    let judge = Arc::new(FixedJudge::new(60.0));
    let engine = EvolutionEngine::new(
        config,
        EngineDeps::new(
            Arc::new(StubGenerator::fixed("identical output")),
            judge.clone(),
            Arc::new(FixedLint::default()),
            Arc::new(FixedBudget::new(100)),
        )
        .with_ids(Arc::new(SequentialIds::new())),
    )
    .unwrap();

    let result = engine.run().await.unwrap();
    assert_eq!(result.generations.len(), 3, "constant fitness stops after generation 2");
    // Generation 0 scores all four individuals; each later generation
    // scores only the elite copy and the diversity immigrant.
    assert_eq!(judge.calls(), 4 + 2 * 2);
}

/// When diversity collapses, the immigrant lands in a non-elite slot: the
/// elite copy survives with its lineage intact and exactly one parentless
/// individual appears per generation.
#[tokio::test]
async fn immigration_preserves_elite_slots() {
    let mut config = scenario_config();
    config.mutation_rate = 0.0;
    let engine = EvolutionEngine::new(
        config,
        deps(StubGenerator::fixed("identical output"), Arc::new(FixedJudge::new(60.0))),
    )
    .unwrap();

    let result = engine.run().await.unwrap();
    assert!(result.generations.len() >= 2);
    for pair in result.generations.windows(2) {
        let current = &pair[1];
        let elite = &current.population[0];
        assert_eq!(elite.parent_ids.len(), 1, "elite slot was replaced");
        assert!(
            pair[0].population.iter().any(|i| i.id == elite.parent_ids[0]),
            "elite must descend from the previous generation"
        );

        let immigrant_slots: Vec<usize> = current
            .population
            .iter()
            .enumerate()
            .filter(|(_, i)| i.parent_ids.is_empty())
            .map(|(idx, _)| idx)
            .collect();
        assert_eq!(immigrant_slots.len(), 1, "exactly one slot takes the immigrant");
        assert!(immigrant_slots[0] >= 1, "immigrant landed in the protected elite prefix");
    }
}

/// Invalid configuration is rejected before any external call happens.
#[tokio::test]
async fn invalid_config_is_rejected_up_front() {
    let mut config = scenario_config();
    config.elitism_count = config.population_size;
    let result = EvolutionEngine::new(
        config,
        deps(StubGenerator::echo(), Arc::new(LengthJudge)),
    );
    assert!(matches!(result, Err(EvolveError::Config(_))));
}
