// Deterministic doubles for the collaborator traits.
//
// StubGenerator — fixed / echo / always-failing generation
// FixedJudge / LengthJudge — scripted quality scores, with call counting
// FixedLint / FixedBudget — constant sub-scores
// CollectingSink — captures progress events for assertions
// SequentialIds — reproducible ids
//
// Plus helpers for constructing individuals, configs and snapshots.
// No network, no provider keys. `cargo test` in seconds.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use promptforge_common::{
    CriterionScore, FitnessScore, GenerationSnapshot, GeneticConfig, Individual, ProgressEvent,
    ProgressSink,
};

use crate::traits::{
    BudgetAnalyzer, GeneratedPrompt, GenerationRequest, IdSource, JudgeContext, JudgeReport,
    LintChecker, LintCounts, PromptGenerator, QualityJudge, TokenEstimate,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub fn test_config() -> GeneticConfig {
    GeneticConfig::builder()
        .seed_intent("write a prompt that reviews Rust code")
        .population_size(4)
        .max_generations(5)
        .elitism_count(1)
        .tournament_size(2)
        .rng_seed(Some(42))
        .build()
}

pub fn test_individual(text: &str) -> Individual {
    Individual {
        id: Uuid::new_v4(),
        generation: 0,
        text: text.to_string(),
        rationale: String::new(),
        framework_tag: "KERNEL".to_string(),
        domain_id: "general".to_string(),
        parent_ids: vec![],
        fitness: None,
    }
}

pub fn scored_individual(text: &str, composite: f64) -> Individual {
    let mut individual = test_individual(text);
    individual.fitness = Some(FitnessScore {
        quality: composite,
        lint_penalty: 0.0,
        token_cost_penalty: 0.0,
        composite,
        criterion_scores: vec![],
    });
    individual
}

/// A snapshot carrying only the fields convergence checks look at.
pub fn snapshot_with_best(generation: u32, best_fitness: f64) -> GenerationSnapshot {
    GenerationSnapshot {
        generation,
        population: vec![],
        best_fitness,
        avg_fitness: best_fitness,
        worst_fitness: best_fitness,
        diversity: 0.0,
        best_individual_id: Uuid::nil(),
        timestamp: Utc::now(),
    }
}

// ---------------------------------------------------------------------------
// StubGenerator
// ---------------------------------------------------------------------------

enum StubMode {
    /// Always return the same text.
    Fixed(String),
    /// Return the first source text unchanged (the instruction when there
    /// is no source material).
    Echo,
    /// Always fail.
    Failing,
}

pub struct StubGenerator {
    mode: StubMode,
    calls: AtomicU64,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl StubGenerator {
    pub fn fixed(text: &str) -> Self {
        Self {
            mode: StubMode::Fixed(text.to_string()),
            calls: AtomicU64::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn echo() -> Self {
        Self { mode: StubMode::Echo, calls: AtomicU64::new(0), requests: Mutex::new(Vec::new()) }
    }

    pub fn failing() -> Self {
        Self { mode: StubMode::Failing, calls: AtomicU64::new(0), requests: Mutex::new(Vec::new()) }
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    /// Every request received, in call order.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().expect("request log poisoned").clone()
    }
}

#[async_trait]
impl PromptGenerator for StubGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedPrompt> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.requests.lock().expect("request log poisoned").push(request.clone());
        match &self.mode {
            StubMode::Fixed(text) => Ok(GeneratedPrompt {
                text: text.clone(),
                rationale: "stub: fixed response".to_string(),
            }),
            StubMode::Echo => Ok(GeneratedPrompt {
                text: request
                    .source_texts
                    .first()
                    .cloned()
                    .unwrap_or_else(|| request.instruction.clone()),
                rationale: "stub: echoed input".to_string(),
            }),
            StubMode::Failing => bail!("StubGenerator: provider unavailable"),
        }
    }
}

// ---------------------------------------------------------------------------
// Judges
// ---------------------------------------------------------------------------

/// Constant-score judge. `failing()` errors on every call.
pub struct FixedJudge {
    score: f64,
    criteria: Vec<CriterionScore>,
    fail: bool,
    calls: AtomicU64,
}

impl FixedJudge {
    pub fn new(score: f64) -> Self {
        Self { score, criteria: vec![], fail: false, calls: AtomicU64::new(0) }
    }

    pub fn with_criteria(score: f64, criteria: Vec<CriterionScore>) -> Self {
        Self { score, criteria, fail: false, calls: AtomicU64::new(0) }
    }

    pub fn failing() -> Self {
        Self { score: 0.0, criteria: vec![], fail: true, calls: AtomicU64::new(0) }
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl QualityJudge for FixedJudge {
    async fn judge(&self, _text: &str, _ctx: &JudgeContext) -> Result<JudgeReport> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if self.fail {
            bail!("FixedJudge: scoring backend down");
        }
        Ok(JudgeReport { total_score: self.score, criterion_scores: self.criteria.clone() })
    }
}

/// Scores by text length, capped at 100. Longer prompt, better score —
/// handy for monotonicity scenarios.
pub struct LengthJudge;

#[async_trait]
impl QualityJudge for LengthJudge {
    async fn judge(&self, text: &str, _ctx: &JudgeContext) -> Result<JudgeReport> {
        Ok(JudgeReport {
            total_score: (text.chars().count() as f64).min(100.0),
            criterion_scores: vec![],
        })
    }
}

// ---------------------------------------------------------------------------
// Lint / budget
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FixedLint {
    pub errors: u32,
    pub warnings: u32,
    pub infos: u32,
}

#[async_trait]
impl LintChecker for FixedLint {
    async fn lint(&self, _text: &str, _rationale: Option<&str>) -> Result<LintCounts> {
        Ok(LintCounts { errors: self.errors, warnings: self.warnings, infos: self.infos })
    }
}

pub struct FixedBudget {
    tokens: u64,
}

impl FixedBudget {
    pub fn new(tokens: u64) -> Self {
        Self { tokens }
    }
}

#[async_trait]
impl BudgetAnalyzer for FixedBudget {
    async fn estimate(
        &self,
        _seed_intent: &str,
        _combined_text: &str,
        _provider_id: &str,
    ) -> Result<TokenEstimate> {
        Ok(TokenEstimate { total_tokens: self.tokens })
    }
}

// ---------------------------------------------------------------------------
// CollectingSink / SequentialIds
// ---------------------------------------------------------------------------

pub struct CollectingSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self { events: Mutex::new(Vec::new()) }
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().expect("sink lock poisoned").clone()
    }
}

impl Default for CollectingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for CollectingSink {
    fn emit(&self, event: ProgressEvent) {
        self.events.lock().expect("sink lock poisoned").push(event);
    }
}

/// Deterministic ids: 1, 2, 3, … encoded as UUIDs.
pub struct SequentialIds {
    counter: AtomicU64,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self { counter: AtomicU64::new(0) }
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::new()
    }
}

impl IdSource for SequentialIds {
    fn next_id(&self) -> Uuid {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        Uuid::from_u128(n as u128)
    }
}
