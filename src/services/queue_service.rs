use crate::error::Result;
use serde_json::Value as JsonValue;
use sqlx::{PgPool, Row};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// DB-backed queue for exam-assembly jobs. Assembly can take minutes under
/// rate-limit pacing, so the HTTP layer enqueues and polls instead of holding
/// a request open. Multiple workers may poll concurrently; claiming uses
/// `FOR UPDATE SKIP LOCKED`.
#[derive(Clone)]
pub struct ExamQueueService {
    pub pool: PgPool,
}

impl ExamQueueService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn enqueue(&self, payload: JsonValue) -> Result<Uuid> {
        let row = sqlx::query(
            r#"
            INSERT INTO exam_jobs (payload)
            VALUES ($1)
            RETURNING id
            "#,
        )
        .bind(payload)
        .fetch_one(&self.pool)
        .await?;
        let id: Uuid = row.try_get("id")?;
        Ok(id)
    }

    pub async fn get(&self, id: Uuid) -> Result<JsonValue> {
        let row = sqlx::query(
            r#"SELECT id, status, payload, progress, result, error, created_at, started_at, finished_at
               FROM exam_jobs WHERE id = $1"#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(serde_json::json!({
            "id": row.try_get::<Uuid, _>("id")?,
            "status": row.try_get::<String, _>("status")?,
            "payload": row.try_get::<JsonValue, _>("payload")?,
            "progress": row.try_get::<f64, _>("progress")?,
            "result": row.try_get::<Option<JsonValue>, _>("result")?,
            "error": row.try_get::<Option<String>, _>("error")?,
            "created_at": row.try_get::<chrono::DateTime<chrono::Utc>, _>("created_at")?,
            "started_at": row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>("started_at")?,
            "finished_at": row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>("finished_at")?,
        }))
    }

    /// Claims and runs one pending job. Returns false when the queue is empty.
    pub async fn run_once(&self, app_state: &crate::AppState) -> Result<bool> {
        let rec = sqlx::query(
            r#"
            UPDATE exam_jobs SET status = 'running', started_at = NOW()
            WHERE id = (
                SELECT id FROM exam_jobs WHERE status = 'pending'
                ORDER BY created_at ASC FOR UPDATE SKIP LOCKED LIMIT 1
            )
            RETURNING id, payload
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = rec else { return Ok(false) };
        let job_id: Uuid = row.try_get("id")?;
        let payload: JsonValue = row.try_get("payload")?;

        let num_questions = payload
            .get("num_questions")
            .and_then(|v| v.as_u64())
            .map(|n| n as usize)
            .unwrap_or(crate::config::get_config().exam_size);
        let user_id = payload
            .get("user_id")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());

        // Progress lands in an atomic from the pipeline's sync callback and a
        // flusher task mirrors it onto the job row while assembly runs.
        let progress = Arc::new(AtomicU64::new(0u64));
        let flusher = {
            let pool = self.pool.clone();
            let progress = progress.clone();
            tokio::spawn(async move {
                loop {
                    tokio::time::sleep(Duration::from_secs(2)).await;
                    let fraction = f64::from_bits(progress.load(Ordering::Relaxed));
                    let _ = sqlx::query("UPDATE exam_jobs SET progress = $1 WHERE id = $2")
                        .bind(fraction)
                        .bind(job_id)
                        .execute(&pool)
                        .await;
                }
            })
        };

        let on_progress = {
            let progress = progress.clone();
            move |fraction: f64| progress.store(fraction.to_bits(), Ordering::Relaxed)
        };

        let questions = app_state
            .exam_assembler
            .assemble_exam(
                &app_state.seed_pool,
                num_questions,
                user_id.as_deref(),
                &on_progress,
            )
            .await;
        flusher.abort();

        if questions.is_empty() {
            tracing::error!(job = %job_id, "Exam assembly produced nothing");
            sqlx::query(
                r#"UPDATE exam_jobs SET status = 'failed', error = $1, finished_at = NOW() WHERE id = $2"#,
            )
            .bind("No questions could be assembled")
            .bind(job_id)
            .execute(&self.pool)
            .await?;
            return Ok(true);
        }

        let result = serde_json::to_value(&questions)?;
        sqlx::query(
            r#"UPDATE exam_jobs
               SET status = 'succeeded', result = $1, progress = 1.0, finished_at = NOW()
               WHERE id = $2"#,
        )
        .bind(result)
        .bind(job_id)
        .execute(&self.pool)
        .await?;

        Ok(true)
    }
}
