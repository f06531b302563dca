//! Regex-heuristic lint for prompt texts.
//!
//! Rule pack: structural problems (no system/user separation, no role
//! definition) are errors; missing quality signals (success criteria,
//! guardrails, restrictions, output format, PII handling) are warnings;
//! stylistic gaps (examples, tone, determinism language, structured lists)
//! are info notes.

use std::sync::LazyLock;

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;

use promptforge_evolve::traits::{LintChecker, LintCounts};

static SECTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^#{2,3}\s*(SYSTEM|DEVELOPER|USER)\b").unwrap());
static ROLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(role|persona|act as|you are)\b").unwrap());
static SUCCESS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(success|criteria|pass|fail|metric|measure)\b").unwrap());
static GUARD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(guardrail|safety|security|protection)\b").unwrap());
static RESTRICT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(do not|don't|never|prohibited|forbidden|reject)\b").unwrap());
static FORMAT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(output|format|response|json|markdown|xml|yaml|csv)\b").unwrap());
static PII_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(pii|personal data|mask|redact|anonymize)\b").unwrap());
static EXAMPLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(example|e\.g\.|sample|demo)\b").unwrap());
static TONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(tone|style|formal|informal|professional)\b").unwrap());
static DETERM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(deterministic|temperature|seed|consistent|always)\b").unwrap());
static LIST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*(?:[-*•]|\d+[.)])\s").unwrap());

/// Offline lint collaborator. One pass over the text, no network.
#[derive(Default)]
pub struct HeuristicLint;

impl HeuristicLint {
    pub fn new() -> Self {
        Self
    }

    fn counts(text: &str) -> LintCounts {
        let mut counts = LintCounts::default();

        // Errors: structural prerequisites for a reliable prompt.
        if SECTION_RE.find_iter(text).count() < 2 {
            counts.errors += 1;
        }
        if !ROLE_RE.is_match(text) {
            counts.errors += 1;
        }

        // Warnings: missing quality signals.
        for re in [&*SUCCESS_RE, &*GUARD_RE, &*RESTRICT_RE, &*FORMAT_RE, &*PII_RE] {
            if !re.is_match(text) {
                counts.warnings += 1;
            }
        }

        // Infos: stylistic gaps.
        if !EXAMPLE_RE.is_match(text) {
            counts.infos += 1;
        }
        if !TONE_RE.is_match(text) {
            counts.infos += 1;
        }
        if !DETERM_RE.is_match(text) {
            counts.infos += 1;
        }
        if LIST_RE.find_iter(text).count() < 3 {
            counts.infos += 1;
        }

        counts
    }
}

#[async_trait]
impl LintChecker for HeuristicLint {
    async fn lint(&self, text: &str, _rationale: Option<&str>) -> Result<LintCounts> {
        Ok(Self::counts(text))
    }
}
