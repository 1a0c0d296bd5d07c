use serde::{Deserialize, Serialize};

/// Personalized study guide produced by one LLM call over an attempt report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyGuide {
    #[serde(default)]
    pub overall_summary: String,
    pub topics: Vec<TopicGuide>,
    #[serde(default)]
    pub recommended_focus: Vec<String>,
    #[serde(default)]
    pub next_steps: String,
    #[serde(default)]
    pub practice_resources: Vec<String>,
    #[serde(default)]
    pub motivation_message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicGuide {
    pub topic: String,
    #[serde(default)]
    pub accuracy: f64,
    #[serde(default)]
    pub importance: String,
    #[serde(default)]
    pub key_concepts: Vec<String>,
    #[serde(default)]
    pub common_mistakes: Vec<String>,
    #[serde(default)]
    pub study_tips: Vec<String>,
    #[serde(default)]
    pub practice_approach: String,
    #[serde(default)]
    pub formulas_or_rules: Vec<String>,
    #[serde(default)]
    pub time_management_tip: String,
    /// Filled locally from the attempt report, never trusted from the model.
    #[serde(default)]
    pub stats: Option<TopicStats>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicStats {
    pub total: usize,
    pub correct: usize,
    pub wrong: usize,
}
