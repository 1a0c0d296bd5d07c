use crate::models::question::GeneratedQuestion;
use crate::models::report::AttemptReport;
use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct GenerateExamPayload {
    #[validate(range(min = 1, max = 100))]
    pub num_questions: Option<u32>,
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ScoreAttemptPayload {
    pub user_id: Option<String>,
    #[validate(length(min = 1))]
    pub questions: Vec<GeneratedQuestion>,
    /// Parallel to `questions`; `null` entries are unanswered.
    pub answers: Vec<Option<String>>,
}

#[derive(Debug, Deserialize)]
pub struct StudyGuidePayload {
    pub report: AttemptReport,
}
