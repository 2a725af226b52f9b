use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use std::sync::Arc;

use crate::{
    error::EngineError,
    middlewares::auth::JwtClaims,
    models::{SaveAnswerRequest, SubmitAttemptRequest},
    services::{answer_service::AnswerService, attempt_service::AttemptService, AppState},
};

pub async fn start_attempt(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(definition_id): Path<String>,
) -> Result<impl IntoResponse, EngineError> {
    tracing::info!(
        "Starting attempt for learner={}, definition={}",
        claims.sub,
        definition_id
    );

    let service = AttemptService::new(state.store.clone());
    let response = service.start(&claims, &definition_id).await?;
    let status = if response.resumed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(response)))
}

pub async fn save_answer(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path((attempt_id, question_id)): Path<(String, String)>,
    Json(req): Json<SaveAnswerRequest>,
) -> Result<impl IntoResponse, EngineError> {
    tracing::debug!("Saving answer for attempt={}", attempt_id);

    let service = AnswerService::new(state.store.clone());
    let answer = service
        .save_answer(&claims, &attempt_id, &question_id, req)
        .await?;
    Ok((StatusCode::OK, Json(answer)))
}

pub async fn submit_attempt(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(attempt_id): Path<String>,
    Json(req): Json<SubmitAttemptRequest>,
) -> Result<impl IntoResponse, EngineError> {
    tracing::info!("Submitting attempt={}", attempt_id);

    let service = AttemptService::new(state.store.clone());
    let summary = service.submit(&claims, &attempt_id, req).await?;
    Ok((StatusCode::OK, Json(summary)))
}
