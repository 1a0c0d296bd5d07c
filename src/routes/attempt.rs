use crate::{
    dto::exam_dto::{ScoreAttemptPayload, StudyGuidePayload},
    error::{Error, Result},
    AppState,
};
use axum::{extract::State, response::IntoResponse, Json};
use validator::Validate;

#[axum::debug_handler]
pub async fn score_attempt(
    State(state): State<AppState>,
    Json(payload): Json<ScoreAttemptPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    if payload.answers.len() != payload.questions.len() {
        return Err(Error::BadRequest(
            "answers must be the same length as questions".to_string(),
        ));
    }

    let report = state
        .attempt_service
        .score_attempt(
            &payload.questions,
            &payload.answers,
            payload.user_id.as_deref(),
        )
        .await;

    Ok(Json(report))
}

#[axum::debug_handler]
pub async fn generate_study_guide(
    State(state): State<AppState>,
    Json(payload): Json<StudyGuidePayload>,
) -> Result<impl IntoResponse> {
    if payload.report.topics.is_empty() {
        return Err(Error::BadRequest(
            "report must contain at least one topic".to_string(),
        ));
    }

    let guide = state.study_service.generate_study_guide(&payload.report).await?;
    Ok(Json(guide))
}
