use crate::models::question::{GeneratedQuestion, SeedQuestion};
use crate::services::llm_service::{GenerationParams, GenerativeTextService};
use crate::utils::align::{align_correct_answer, clean_options};
use crate::utils::sanitize::parse_llm_json;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Generates one new question variant from a seed, with a bounded retry loop.
///
/// A failed attempt (service error, malformed JSON, or an answer that cannot
/// be aligned onto the options) never escapes as a partial question; callers
/// get `Some` fully-normalized question or `None`.
#[derive(Clone)]
pub struct VariantGenerator {
    llm: Arc<dyn GenerativeTextService>,
    params: GenerationParams,
    max_attempts: u32,
}

impl VariantGenerator {
    pub fn new(llm: Arc<dyn GenerativeTextService>, max_attempts: u32) -> Self {
        Self {
            llm,
            params: GenerationParams::variant(),
            max_attempts: max_attempts.max(1),
        }
    }

    pub async fn generate(&self, seed: &SeedQuestion) -> Option<GeneratedQuestion> {
        let prompt = build_prompt(seed);

        for attempt in 1..=self.max_attempts {
            let raw = match self.llm.submit(&prompt, &self.params).await {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(
                        topic = %seed.topic,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "Generation request failed"
                    );
                    self.backoff(attempt, 2).await;
                    continue;
                }
            };

            let value = match parse_llm_json(&raw) {
                Ok(value) => value,
                Err(e) => {
                    warn!(
                        topic = %seed.topic,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %e,
                        preview = %raw.chars().take(200).collect::<String>(),
                        "Response is not valid JSON"
                    );
                    self.backoff(attempt, 1).await;
                    continue;
                }
            };

            match build_question(seed, &value) {
                Ok(question) => {
                    info!(
                        topic = %seed.topic,
                        attempt,
                        options = question.options.len(),
                        "Generated question variant"
                    );
                    return Some(question);
                }
                Err(reason) => {
                    warn!(topic = %seed.topic, attempt, reason, "Discarding malformed variant");
                    self.backoff(attempt, 2).await;
                }
            }
        }

        None
    }

    /// Linear backoff; `factor` is larger for service/alignment failures than
    /// for plain parse failures. No sleep after the final attempt.
    async fn backoff(&self, attempt: u32, factor: u64) {
        if attempt < self.max_attempts {
            tokio::time::sleep(Duration::from_secs(factor * attempt as u64)).await;
        }
    }
}

fn build_prompt(seed: &SeedQuestion) -> String {
    format!(
        r#"You are a senior exam author for standardized aptitude tests.
Topic: {topic}
Reference question: "{content}"

Task: write ONE new multiple-choice question that follows the same logic as the reference question:
1. Math: change the figures, but recompute the correct answer yourself.
2. Logic: keep the reasoning structure, change the context.
3. Patterns: invent a new, clearly stated rule.

Hard requirements:
- Think step by step and write out the concrete arithmetic, with intermediate results, in step_by_step_thinking ("Step 1: ... Step 2: ...").
- explanation: only the final result and why it is correct; do not repeat the worked steps.
- correct_answer MUST be one of the entries in options, copied verbatim.
- Return pure JSON with no markdown.
- Return EXACTLY these five fields and nothing else: question, options, step_by_step_thinking, correct_answer, explanation.

OUTPUT JSON FORMAT (follow exactly):
{{
    "question": "Question text...",
    "options": ["A. ...", "B. ...", "C. ...", "D. ..."],
    "step_by_step_thinking": "Step 1: ...; Step 2: ... (show the arithmetic and intermediate results)",
    "correct_answer": "Copy the correct option's text here verbatim",
    "explanation": "Why this answer is correct, with the key formula and final number"
}}"#,
        topic = seed.topic,
        content = seed.content,
    )
}

/// Turns a parsed model response into a normalized question, re-attaching the
/// seed's metadata (the model is not trusted to preserve it) and enforcing
/// answer alignment.
fn build_question(
    seed: &SeedQuestion,
    value: &JsonValue,
) -> std::result::Result<GeneratedQuestion, &'static str> {
    let question_text = value
        .get("question")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or("missing question text")?;

    let options: Vec<String> = value
        .get("options")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(|s| s.to_string()))
                .collect()
        })
        .unwrap_or_default();

    let correct = value
        .get("correct_answer")
        .and_then(|v| v.as_str())
        .unwrap_or_default();

    let aligned =
        align_correct_answer(&options, correct).ok_or("correct answer does not align with options")?;

    Ok(GeneratedQuestion {
        question: question_text.to_string(),
        options: clean_options(&options),
        correct_answer: aligned,
        explanation: value
            .get("explanation")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string()),
        step_by_step_thinking: value
            .get("step_by_step_thinking")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string()),
        topic: seed.topic.clone(),
        question_type: seed.question_type.clone(),
        image_url: seed.image_url.clone(),
    })
}
