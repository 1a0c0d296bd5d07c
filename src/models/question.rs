use serde::{Deserialize, Serialize};

/// A reference question used as a template for generating new variants.
/// Loaded once from the seed corpus and never mutated by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedQuestion {
    #[serde(default = "default_topic")]
    pub topic: String,
    pub content: String,
    #[serde(rename = "type", default = "default_qtype")]
    pub question_type: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

fn default_topic() -> String {
    "general".to_string()
}

fn default_qtype() -> String {
    "general".to_string()
}

/// A fully validated multiple-choice question, either freshly generated or
/// read back from the cache. Once one of these leaves the variant generator,
/// `correct_answer` is guaranteed to equal one element of `options` verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub step_by_step_thinking: Option<String>,
    #[serde(default = "default_topic")]
    pub topic: String,
    #[serde(rename = "type", default = "default_qtype")]
    pub question_type: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl GeneratedQuestion {
    /// Dedup key for exam assembly: two questions with the same normalized
    /// text never appear in one exam.
    pub fn normalized_key(&self) -> String {
        self.question.trim().to_lowercase()
    }
}

/// Per-user accumulated wrong-answer count for one topic. Read-only from the
/// pipeline's perspective; used to bias seed selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeakTopicStat {
    pub topic: String,
    pub wrong_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(text: &str) -> GeneratedQuestion {
        GeneratedQuestion {
            question: text.to_string(),
            options: vec!["A. 1".to_string(), "B. 2".to_string()],
            correct_answer: "A. 1".to_string(),
            explanation: None,
            step_by_step_thinking: None,
            topic: "Arithmetic".to_string(),
            question_type: "math".to_string(),
            image_url: None,
        }
    }

    #[test]
    fn normalized_key_ignores_case_and_outer_whitespace() {
        let a = question("  What is 2 + 2?  ");
        let b = question("what is 2 + 2?");
        assert_eq!(a.normalized_key(), b.normalized_key());
    }

    #[test]
    fn seed_question_defaults_missing_metadata() {
        let seed: SeedQuestion =
            serde_json::from_str(r#"{"content": "If x = 3, what is 2x?"}"#).unwrap();
        assert_eq!(seed.topic, "general");
        assert_eq!(seed.question_type, "general");
        assert!(seed.image_url.is_none());
    }
}
