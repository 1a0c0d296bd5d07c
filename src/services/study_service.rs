use crate::error::{Error, Result};
use crate::models::report::AttemptReport;
use crate::models::study_guide::{StudyGuide, TopicStats};
use crate::services::llm_service::{GenerationParams, GenerativeTextService};
use crate::utils::sanitize::parse_llm_json;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::info;

/// Number of representative questions per topic included in the prompt.
const QUESTIONS_PER_TOPIC: usize = 3;
/// Question text is clipped to keep the prompt inside the token budget.
const QUESTION_CLIP: usize = 150;

/// Produces a personalized study guide from a scored attempt in a single
/// generation call.
#[derive(Clone)]
pub struct StudyGuideService {
    llm: Arc<dyn GenerativeTextService>,
}

impl StudyGuideService {
    pub fn new(llm: Arc<dyn GenerativeTextService>) -> Self {
        Self { llm }
    }

    pub async fn generate_study_guide(&self, report: &AttemptReport) -> Result<StudyGuide> {
        let prompt = build_prompt(report);
        let raw = self
            .llm
            .submit(&prompt, &GenerationParams::study_guide())
            .await?;

        let value = parse_llm_json(&raw)?;
        if !value.get("topics").map_or(false, |t| t.is_array()) {
            return Err(Error::Internal(
                "Study guide response is missing the 'topics' array".to_string(),
            ));
        }

        let mut guide: StudyGuide = serde_json::from_value(value)?;
        attach_stats(&mut guide, report);

        info!(topics = guide.topics.len(), "Study guide generated");
        Ok(guide)
    }
}

/// Per-topic stats come from the local report, never from the model.
fn attach_stats(guide: &mut StudyGuide, report: &AttemptReport) {
    for topic_guide in &mut guide.topics {
        if let Some(topic) = report.topics.iter().find(|t| t.topic == topic_guide.topic) {
            topic_guide.stats = Some(TopicStats {
                total: topic.total,
                correct: topic.correct,
                wrong: topic.wrong,
            });
        }
    }
}

fn build_prompt(report: &AttemptReport) -> String {
    let mut summary = String::new();
    for topic in &report.topics {
        let _ = writeln!(
            summary,
            "- {}: {}/{} correct ({:.0}%)",
            topic.topic,
            topic.correct,
            topic.total,
            topic.accuracy_percent()
        );
    }

    let mut details = String::new();
    for topic in &report.topics {
        for q in topic.questions.iter().take(QUESTIONS_PER_TOPIC) {
            let clipped: String = q.question.chars().take(QUESTION_CLIP).collect();
            let _ = writeln!(
                details,
                "- [{}] {} ({})",
                topic.topic,
                clipped,
                if q.is_correct { "answered correctly" } else { "answered wrong" }
            );
        }
    }

    format!(
        r#"You are a professional test-prep tutor. A student just finished a {total}-question mock exam with these results:

RESULTS BY TOPIC:
{summary}
REPRESENTATIVE QUESTIONS:
{details}
TASK: Produce a complete, detailed study guide in a single response.

OUTPUT (JSON, every field required):
{{
    "overall_summary": "3-4 sentences on overall performance, strengths and weaknesses.",
    "topics": [
        {{
            "topic": "Exact topic name",
            "accuracy": 60,
            "importance": "high",
            "key_concepts": ["Concept: 2-3 sentence explanation with a concrete example", "..."],
            "common_mistakes": ["Mistake: description and how to avoid it", "..."],
            "study_tips": ["Tip: 2-3 sentences of concrete practice advice", "..."],
            "practice_approach": "How to approach this question type: how to read the stem, the solution steps, the traps to watch for. At least 4-5 sentences with an example.",
            "formulas_or_rules": ["Formula or rule, if any"],
            "time_management_tip": "1-2 sentences on pacing for this question type"
        }}
    ],
    "recommended_focus": ["Priority topic and the concrete reason it comes first", "..."],
    "next_steps": "A concrete 7-day study plan: days 1-2, days 3-4, days 5-7. At least 5-6 detailed sentences.",
    "practice_resources": ["Resource and how to use it", "..."],
    "motivation_message": "2-3 encouraging sentences"
}}

RULES:
1. Cover EVERY topic from the results, none skipped.
2. Mark topics under 70% accuracy as importance "high".
3. No placeholders like "..." or "etc" in the output; write everything out.
4. Return pure JSON with no markdown fences.
5. The JSON must be valid with balanced braces."#,
        total = report.total,
        summary = summary,
        details = details,
    )
}
