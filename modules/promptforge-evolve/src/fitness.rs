//! Composite fitness: judge total minus lint and token-cost penalties,
//! clamped to [0, 100]. Scores are memoized on the individual — an
//! already-set fitness slot is never recomputed, which is what makes
//! elitism re-entry an explicit, deliberate re-evaluation (the elite copy
//! arrives with `fitness: None`).

use std::sync::Arc;

use anyhow::Result;
use tracing::warn;

use promptforge_common::{FitnessScore, GeneticConfig, Individual};

use crate::meter::CallMeter;
use crate::traits::{BudgetAnalyzer, JudgeContext, LintChecker, LintCounts, QualityJudge};

/// Lint penalty cap.
const MAX_LINT_PENALTY: f64 = 30.0;
/// Token-cost penalty cap.
const MAX_TOKEN_PENALTY: f64 = 20.0;
/// Combined token estimates at or below this incur no penalty.
const TOKEN_BUDGET: u64 = 1500;

pub fn lint_penalty(counts: LintCounts) -> f64 {
    let raw = counts.errors as f64 * 10.0 + counts.warnings as f64 * 3.0 + counts.infos as f64;
    raw.min(MAX_LINT_PENALTY)
}

pub fn token_cost_penalty(total_tokens: u64) -> f64 {
    if total_tokens <= TOKEN_BUDGET {
        return 0.0;
    }
    (((total_tokens - TOKEN_BUDGET) / 100) as f64).min(MAX_TOKEN_PENALTY)
}

pub struct FitnessEvaluator {
    judge: Arc<dyn QualityJudge>,
    lint: Arc<dyn LintChecker>,
    budget: Arc<dyn BudgetAnalyzer>,
    meter: Arc<CallMeter>,
}

impl FitnessEvaluator {
    pub fn new(
        judge: Arc<dyn QualityJudge>,
        lint: Arc<dyn LintChecker>,
        budget: Arc<dyn BudgetAnalyzer>,
        meter: Arc<CallMeter>,
    ) -> Self {
        Self { judge, lint, budget, meter }
    }

    /// Score one individual. Pure given the collaborators; does not touch
    /// the individual's fitness slot.
    pub async fn evaluate(
        &self,
        individual: &Individual,
        config: &GeneticConfig,
    ) -> Result<FitnessScore> {
        let ctx = JudgeContext {
            domain_id: individual.domain_id.clone(),
            framework_tag: individual.framework_tag.clone(),
            rationale: individual.rationale.clone(),
        };

        self.meter.record();
        let report = self.judge.judge(&individual.text, &ctx).await?;

        self.meter.record();
        let counts = self.lint.lint(&individual.text, Some(&individual.rationale)).await?;

        self.meter.record();
        let estimate = self
            .budget
            .estimate(&config.seed_intent, &individual.text, &config.provider_id)
            .await?;

        Ok(FitnessScore::compose(
            report.total_score,
            lint_penalty(counts),
            token_cost_penalty(estimate.total_tokens),
            report.criterion_scores,
        ))
    }

    /// Score every individual whose fitness slot is empty. Already-scored
    /// individuals are skipped, never recomputed. A collaborator failure is
    /// absorbed as a zeroed score so one bad individual cannot abort the
    /// generation.
    pub async fn evaluate_all(
        &self,
        population: &mut [Individual],
        config: &GeneticConfig,
    ) -> Result<()> {
        for individual in population.iter_mut() {
            if individual.fitness.is_some() {
                continue;
            }
            match self.evaluate(individual, config).await {
                Ok(score) => individual.fitness = Some(score),
                Err(e) => {
                    warn!(id = %individual.id, error = %e, "Scoring failed, substituting zero fitness");
                    individual.fitness = Some(FitnessScore::zeroed());
                }
            }
        }
        Ok(())
    }
}
