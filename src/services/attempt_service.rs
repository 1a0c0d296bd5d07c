use crate::models::question::GeneratedQuestion;
use crate::models::report::{AttemptReport, ReviewedQuestion, TopicBreakdown};
use crate::services::store_service::QuestionStore;
use std::sync::Arc;
use tracing::{info, warn};

/// Scores a submitted answer sheet and feeds the wrong answers back into the
/// store so future exams can bias toward the user's weak topics.
#[derive(Clone)]
pub struct AttemptService {
    store: Arc<dyn QuestionStore>,
}

impl AttemptService {
    pub fn new(store: Arc<dyn QuestionStore>) -> Self {
        Self { store }
    }

    pub async fn score_attempt(
        &self,
        questions: &[GeneratedQuestion],
        answers: &[Option<String>],
        user_id: Option<&str>,
    ) -> AttemptReport {
        let report = build_report(questions, answers);

        if let Some(uid) = user_id {
            for topic in &report.topics {
                for _ in 0..topic.wrong {
                    if let Err(e) = self
                        .store
                        .record_wrong_answer(uid, &topic.topic, &topic.question_type)
                        .await
                    {
                        warn!(error = %e, topic = %topic.topic, "Could not record wrong answer");
                    }
                }
            }
        }

        info!(
            correct = report.correct,
            total = report.total,
            score = report.score_percent,
            "Attempt scored"
        );
        report
    }
}

/// Options carry letter labels ("B. Rome"), so grading compares the label
/// before the first dot rather than the full text.
fn answer_label(value: &str) -> &str {
    value.split('.').next().unwrap_or("").trim()
}

fn build_report(questions: &[GeneratedQuestion], answers: &[Option<String>]) -> AttemptReport {
    let mut topics: Vec<TopicBreakdown> = Vec::new();

    for (idx, question) in questions.iter().enumerate() {
        let chosen = answers.get(idx).and_then(|a| a.as_deref());
        let is_correct = match chosen {
            Some(choice) if !question.correct_answer.is_empty() => {
                answer_label(choice) == answer_label(&question.correct_answer)
            }
            _ => false,
        };

        let pos = match topics.iter().position(|t| t.topic == question.topic) {
            Some(pos) => pos,
            None => {
                topics.push(TopicBreakdown {
                    topic: question.topic.clone(),
                    question_type: question.question_type.clone(),
                    total: 0,
                    correct: 0,
                    wrong: 0,
                    questions: Vec::new(),
                });
                topics.len() - 1
            }
        };
        let breakdown = &mut topics[pos];

        breakdown.total += 1;
        if is_correct {
            breakdown.correct += 1;
        } else {
            breakdown.wrong += 1;
        }
        breakdown.questions.push(ReviewedQuestion {
            question: question.question.clone(),
            correct_answer: question.correct_answer.clone(),
            explanation: question.explanation.clone(),
            is_correct,
        });
    }

    let total = questions.len();
    let correct: usize = topics.iter().map(|t| t.correct).sum();
    let wrong = total - correct;
    let score_percent = if total > 0 {
        correct as f64 / total as f64 * 100.0
    } else {
        0.0
    };

    AttemptReport {
        total,
        correct,
        wrong,
        score_percent,
        topics,
    }
}
