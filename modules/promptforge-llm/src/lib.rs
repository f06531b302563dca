//! Live collaborator implementations for the evolution engine: a
//! Claude-backed generator and judge, a regex-heuristic lint checker and a
//! character-based token budget analyzer.

pub mod budget;
pub mod claude;
pub mod lint;

pub use budget::CharBudget;
pub use claude::{ClaudeGenerator, ClaudeJudge};
pub use lint::HeuristicLint;
