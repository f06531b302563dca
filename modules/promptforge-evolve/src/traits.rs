// Trait abstractions for the four external collaborators plus id generation.
//
// PromptGenerator — every text transformation (initial population, mutation,
//   crossover, immigration) goes through this one seam.
// QualityJudge / LintChecker / BudgetAnalyzer — the three fitness sub-scores.
// IdSource — injectable ids so runs are reproducible under test.
//
// These enable deterministic testing with the doubles in `testing`:
// no network, no provider keys. `cargo test` in seconds.

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use promptforge_common::CriterionScore;

// ---------------------------------------------------------------------------
// PromptGenerator
// ---------------------------------------------------------------------------

/// One generation request. The instruction says what to do; `source_texts`
/// carries the material being transformed (empty for fresh generations,
/// one text for mutation, two for crossover).
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub instruction: String,
    pub source_texts: Vec<String>,
    pub framework_tag: String,
    pub domain_id: String,
    pub provider_id: String,
    pub language: String,
    pub rules: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct GeneratedPrompt {
    pub text: String,
    pub rationale: String,
}

/// The generative collaborator. Safe to call repeatedly; callers apply
/// their own truncation and failure handling, so implementations need not
/// retry.
#[async_trait]
pub trait PromptGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedPrompt>;
}

// ---------------------------------------------------------------------------
// Fitness sub-score collaborators
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct JudgeContext {
    pub domain_id: String,
    pub framework_tag: String,
    pub rationale: String,
}

#[derive(Debug, Clone)]
pub struct JudgeReport {
    /// 0–100 scale.
    pub total_score: f64,
    pub criterion_scores: Vec<CriterionScore>,
}

#[async_trait]
pub trait QualityJudge: Send + Sync {
    async fn judge(&self, text: &str, ctx: &JudgeContext) -> Result<JudgeReport>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LintCounts {
    pub errors: u32,
    pub warnings: u32,
    pub infos: u32,
}

#[async_trait]
pub trait LintChecker: Send + Sync {
    async fn lint(&self, text: &str, rationale: Option<&str>) -> Result<LintCounts>;
}

#[derive(Debug, Clone, Copy)]
pub struct TokenEstimate {
    pub total_tokens: u64,
}

#[async_trait]
pub trait BudgetAnalyzer: Send + Sync {
    async fn estimate(
        &self,
        seed_intent: &str,
        combined_text: &str,
        provider_id: &str,
    ) -> Result<TokenEstimate>;
}

// ---------------------------------------------------------------------------
// IdSource
// ---------------------------------------------------------------------------

pub trait IdSource: Send + Sync {
    fn next_id(&self) -> Uuid;
}

/// Production id source: random v4 UUIDs.
pub struct UuidIds;

impl IdSource for UuidIds {
    fn next_id(&self) -> Uuid {
        Uuid::new_v4()
    }
}
