//! Character-based token estimation. Roughly four characters per token
//! across the providers this runs against; precise pricing is out of scope.

use anyhow::Result;
use async_trait::async_trait;

use promptforge_evolve::traits::{BudgetAnalyzer, TokenEstimate};

const CHARS_PER_TOKEN: u64 = 4;

#[derive(Default)]
pub struct CharBudget;

impl CharBudget {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl BudgetAnalyzer for CharBudget {
    async fn estimate(
        &self,
        seed_intent: &str,
        combined_text: &str,
        _provider_id: &str,
    ) -> Result<TokenEstimate> {
        let chars = (seed_intent.chars().count() + combined_text.chars().count()) as u64;
        Ok(TokenEstimate { total_tokens: chars.div_ceil(CHARS_PER_TOKEN) })
    }
}
