use serde::{Deserialize, Serialize};

/// Scored result of one submitted answer sheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptReport {
    pub total: usize,
    pub correct: usize,
    pub wrong: usize,
    pub score_percent: f64,
    pub topics: Vec<TopicBreakdown>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicBreakdown {
    pub topic: String,
    #[serde(rename = "type")]
    pub question_type: String,
    pub total: usize,
    pub correct: usize,
    pub wrong: usize,
    pub questions: Vec<ReviewedQuestion>,
}

impl TopicBreakdown {
    pub fn accuracy_percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.correct as f64 / self.total as f64 * 100.0
    }
}

/// One question with the grading outcome, kept for study-guide context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewedQuestion {
    pub question: String,
    pub correct_answer: String,
    #[serde(default)]
    pub explanation: Option<String>,
    pub is_correct: bool,
}
