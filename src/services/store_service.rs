use crate::error::Result;
use crate::models::question::{GeneratedQuestion, WeakTopicStat};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use sqlx::{PgPool, Row};

/// Persistence capability consumed by the exam pipeline. Implementations must
/// be safe for concurrent use and must make `save_questions` idempotent.
#[async_trait]
pub trait QuestionStore: Send + Sync {
    async fn fetch_cached(&self, limit: i64, randomize: bool) -> Result<Vec<GeneratedQuestion>>;

    /// Persists questions, skipping any whose content hash is already stored.
    /// Returns how many rows were newly inserted.
    async fn save_questions(&self, questions: &[GeneratedQuestion]) -> Result<u64>;

    async fn record_wrong_answer(
        &self,
        user_id: &str,
        topic: &str,
        question_type: &str,
    ) -> Result<()>;

    /// Topics ordered by accumulated wrong-answer count, highest first.
    async fn weak_topics(&self, user_id: &str, limit: i64) -> Result<Vec<WeakTopicStat>>;
}

/// Insert-dedup key: sha256 over lowercased question text plus correct answer.
/// Same stem with a differently phrased answer hashes differently; the exam
/// assembler guards against that separately via normalized-text dedup.
pub fn question_hash(question: &GeneratedQuestion) -> String {
    let base = format!("{}|{}", question.question, question.correct_answer)
        .trim()
        .to_lowercase();
    hex::encode(Sha256::digest(base.as_bytes()))
}

#[derive(Clone)]
pub struct PgQuestionStore {
    pool: PgPool,
}

impl PgQuestionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuestionStore for PgQuestionStore {
    async fn fetch_cached(&self, limit: i64, randomize: bool) -> Result<Vec<GeneratedQuestion>> {
        let order_by = if randomize { "RANDOM()" } else { "created_at DESC" };
        let rows = sqlx::query(&format!(
            r#"
            SELECT question, options, correct_answer, explanation, image_url, topic, qtype
            FROM questions
            ORDER BY {}
            LIMIT $1
            "#,
            order_by
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut result = Vec::with_capacity(rows.len());
        for row in rows {
            let options_raw: Option<String> = row.try_get("options")?;
            let options: Vec<String> = options_raw
                .as_deref()
                .and_then(|raw| serde_json::from_str(raw).ok())
                .unwrap_or_default();

            result.push(GeneratedQuestion {
                question: row.try_get("question")?,
                options,
                correct_answer: row
                    .try_get::<Option<String>, _>("correct_answer")?
                    .unwrap_or_default(),
                explanation: row.try_get("explanation")?,
                step_by_step_thinking: None,
                topic: row
                    .try_get::<Option<String>, _>("topic")?
                    .unwrap_or_else(|| "general".to_string()),
                question_type: row
                    .try_get::<Option<String>, _>("qtype")?
                    .unwrap_or_else(|| "general".to_string()),
                image_url: row.try_get("image_url")?,
            });
        }
        Ok(result)
    }

    async fn save_questions(&self, questions: &[GeneratedQuestion]) -> Result<u64> {
        if questions.is_empty() {
            return Ok(0);
        }

        let mut saved = 0;
        for q in questions {
            let qhash = question_hash(q);
            let options_json = serde_json::to_string(&q.options)?;

            let result = sqlx::query(
                r#"
                INSERT INTO questions (qhash, question, options, correct_answer, explanation, image_url, topic, qtype)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ON CONFLICT (qhash) DO NOTHING
                "#,
            )
            .bind(&qhash)
            .bind(&q.question)
            .bind(&options_json)
            .bind(&q.correct_answer)
            .bind(&q.explanation)
            .bind(&q.image_url)
            .bind(&q.topic)
            .bind(&q.question_type)
            .execute(&self.pool)
            .await?;

            saved += result.rows_affected();
        }
        Ok(saved)
    }

    async fn record_wrong_answer(
        &self,
        user_id: &str,
        topic: &str,
        question_type: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_wrong_answers (user_id, topic, qtype, wrong_count)
            VALUES ($1, $2, $3, 1)
            ON CONFLICT (user_id, topic)
            DO UPDATE SET wrong_count = user_wrong_answers.wrong_count + 1,
                          qtype = EXCLUDED.qtype,
                          updated_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(topic)
        .bind(question_type)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn weak_topics(&self, user_id: &str, limit: i64) -> Result<Vec<WeakTopicStat>> {
        let rows = sqlx::query(
            r#"
            SELECT topic, wrong_count
            FROM user_wrong_answers
            WHERE user_id = $1
            ORDER BY wrong_count DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut stats = Vec::with_capacity(rows.len());
        for row in rows {
            stats.push(WeakTopicStat {
                topic: row.try_get("topic")?,
                wrong_count: row.try_get("wrong_count")?,
            });
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(text: &str, answer: &str) -> GeneratedQuestion {
        GeneratedQuestion {
            question: text.to_string(),
            options: vec!["A. 1".to_string(), "B. 2".to_string()],
            correct_answer: answer.to_string(),
            explanation: None,
            step_by_step_thinking: None,
            topic: "Arithmetic".to_string(),
            question_type: "math".to_string(),
            image_url: None,
        }
    }

    #[test]
    fn hash_is_stable_under_case_changes() {
        let a = question("What is 2+2?", "A. 4");
        let b = question("WHAT IS 2+2?", "a. 4");
        assert_eq!(question_hash(&a), question_hash(&b));
    }

    #[test]
    fn hash_differs_when_answer_differs() {
        let a = question("What is 2+2?", "A. 4");
        let b = question("What is 2+2?", "B. 5");
        assert_ne!(question_hash(&a), question_hash(&b));
    }
}
