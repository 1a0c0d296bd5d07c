use crate::{
    dto::exam_dto::GenerateExamPayload, error::Result, services::queue_service::ExamQueueService,
    AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

#[axum::debug_handler]
pub async fn enqueue_exam(
    State(state): State<AppState>,
    Json(payload): Json<GenerateExamPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;

    let queue = ExamQueueService::new(state.pool.clone());
    let job_id = queue
        .enqueue(json!({
            "num_questions": payload.num_questions,
            "user_id": payload.user_id,
        }))
        .await?;

    Ok((StatusCode::ACCEPTED, Json(json!({ "job_id": job_id }))))
}

#[axum::debug_handler]
pub async fn get_exam_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let queue = ExamQueueService::new(state.pool.clone());
    let job = queue.get(id).await?;
    Ok(Json(job))
}
