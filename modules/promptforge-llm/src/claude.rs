//! Claude-backed generator and judge over the Anthropic messages API.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::debug;

use promptforge_common::CriterionScore;
use promptforge_evolve::traits::{
    GeneratedPrompt, GenerationRequest, JudgeContext, JudgeReport, PromptGenerator, QualityJudge,
};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;

/// Judge criteria and weights, mirroring the judge ensemble the engine's
/// scores are calibrated against.
const CRITERIA: [(&str, f64); 5] = [
    ("clarity", 0.25),
    ("testability", 0.20),
    ("constraint_compliance", 0.25),
    ("security", 0.15),
    ("reproducibility", 0.15),
];

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Clone, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

impl ChatResponse {
    fn text(&self) -> String {
        self.content
            .iter()
            .map(|block| block.text.as_str())
            .collect::<Vec<_>>()
            .join("")
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

struct ClaudeClient {
    api_key: String,
    model: String,
    http: reqwest::Client,
    base_url: String,
}

impl ClaudeClient {
    fn new(api_key: &str, model: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            http: reqwest::Client::new(),
            base_url: ANTHROPIC_API_URL.to_string(),
        }
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_str(&self.api_key)?);
        headers.insert("anthropic-version", HeaderValue::from_static(ANTHROPIC_VERSION));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    async fn chat(&self, system: String, user: String, temperature: f32) -> Result<String> {
        let url = format!("{}/messages", self.base_url);
        let request = ChatRequest {
            model: self.model.clone(),
            max_tokens: MAX_TOKENS,
            messages: vec![WireMessage { role: "user", content: user }],
            system: Some(system),
            temperature: Some(temperature),
        };

        debug!(model = %self.model, "Claude chat request");
        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(anyhow!("Claude API error ({status}): {error_text}"));
        }

        let parsed: ChatResponse = response.json().await?;
        Ok(parsed.text())
    }
}

// ---------------------------------------------------------------------------
// Generator
// ---------------------------------------------------------------------------

const GENERATOR_SYSTEM_PROMPT: &str = r#"You are a prompt engineer. You receive an instruction and optionally one or two source prompts to transform.

Respond with a single JSON object, nothing else:
{"prompt": "<the full prompt text>", "rationale": "<one or two sentences on what you changed and why>"}

Rules:
- The prompt must be complete and self-contained.
- Follow the named framework's structural conventions.
- Write the prompt in the requested language.
- Do not wrap the JSON in markdown fences."#;

pub struct ClaudeGenerator {
    client: ClaudeClient,
}

impl ClaudeGenerator {
    pub fn new(api_key: &str, model: &str) -> Self {
        Self { client: ClaudeClient::new(api_key, model) }
    }
}

fn build_generation_message(request: &GenerationRequest) -> String {
    let mut message = format!(
        "Framework: {}\nDomain: {}\nLanguage: {}\n\nInstruction: {}\n",
        request.framework_tag, request.domain_id, request.language, request.instruction
    );
    for (idx, source) in request.source_texts.iter().enumerate() {
        message.push_str(&format!("\n--- Source prompt {} ---\n{source}\n", idx + 1));
    }
    if !request.rules.is_empty() {
        message.push_str("\nAdditional rules:\n");
        for rule in &request.rules {
            message.push_str(&format!("- {rule}\n"));
        }
    }
    message
}

/// Pull `{prompt, rationale}` out of a completion; a completion that is
/// not valid JSON is treated as the prompt text itself.
fn parse_generated(raw: &str) -> GeneratedPrompt {
    #[derive(Deserialize)]
    struct Body {
        prompt: String,
        #[serde(default)]
        rationale: String,
    }
    match serde_json::from_str::<Body>(raw.trim()) {
        Ok(body) => GeneratedPrompt { text: body.prompt, rationale: body.rationale },
        Err(_) => GeneratedPrompt {
            text: raw.trim().to_string(),
            rationale: "model returned unstructured text".to_string(),
        },
    }
}

#[async_trait]
impl PromptGenerator for ClaudeGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedPrompt> {
        let raw = self
            .client
            .chat(
                GENERATOR_SYSTEM_PROMPT.to_string(),
                build_generation_message(request),
                0.8,
            )
            .await?;
        Ok(parse_generated(&raw))
    }
}

// ---------------------------------------------------------------------------
// Judge
// ---------------------------------------------------------------------------

const JUDGE_SYSTEM_PROMPT: &str = r#"You are a prompt quality judge. Score the prompt you receive on five criteria, each 0-100:

- clarity: structure, explicit goals, constraints, output format
- testability: success criteria, examples, stop conditions
- constraint_compliance: domain/framework fit, role definition, language
- security: guardrails, injection defenses, PII protection
- reproducibility: determinism, structural consistency, budget limits

Respond with a single JSON object, nothing else:
{"criteria": [{"criterion_id": "clarity", "score": 0}, ...]}

Score strictly. A bare one-line prompt scores under 20 on every criterion."#;

pub struct ClaudeJudge {
    client: ClaudeClient,
}

impl ClaudeJudge {
    pub fn new(api_key: &str, model: &str) -> Self {
        Self { client: ClaudeClient::new(api_key, model) }
    }
}

fn parse_judgement(raw: &str) -> Result<JudgeReport> {
    #[derive(Deserialize)]
    struct Body {
        criteria: Vec<CriterionScore>,
    }
    let body: Body = serde_json::from_str(raw.trim())
        .map_err(|e| anyhow!("judge returned unparseable response: {e}"))?;

    let mut total = 0.0;
    for (criterion_id, weight) in CRITERIA {
        let score = body
            .criteria
            .iter()
            .find(|c| c.criterion_id == criterion_id)
            .map_or(0.0, |c| c.score.clamp(0.0, 100.0));
        total += score * weight;
    }
    Ok(JudgeReport { total_score: total, criterion_scores: body.criteria })
}

#[async_trait]
impl QualityJudge for ClaudeJudge {
    async fn judge(&self, text: &str, ctx: &JudgeContext) -> Result<JudgeReport> {
        let user = format!(
            "Domain: {}\nFramework: {}\nAuthor rationale: {}\n\n--- Prompt ---\n{text}",
            ctx.domain_id, ctx.framework_tag, ctx.rationale
        );
        let raw = self.client.chat(JUDGE_SYSTEM_PROMPT.to_string(), user, 0.0).await?;
        parse_judgement(&raw)
    }
}
