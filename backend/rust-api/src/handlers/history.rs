use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    error::EngineError,
    middlewares::auth::JwtClaims,
    services::{history_service::HistoryService, AppState},
};

#[derive(Debug, Deserialize)]
pub struct ListAttemptsQuery {
    /// Graders may look at another learner's history.
    pub learner_id: Option<String>,
}

pub async fn list_attempts(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(definition_id): Path<String>,
    Query(query): Query<ListAttemptsQuery>,
) -> Result<impl IntoResponse, EngineError> {
    let service = HistoryService::new(state.store.clone(), state.grade_authorizer.clone());
    let summaries = service
        .list_attempts(&claims, &definition_id, query.learner_id.as_deref())
        .await?;
    Ok((StatusCode::OK, Json(summaries)))
}

pub async fn attempt_detail(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(attempt_id): Path<String>,
) -> Result<impl IntoResponse, EngineError> {
    let service = HistoryService::new(state.store.clone(), state.grade_authorizer.clone());
    let detail = service.attempt_detail(&claims, &attempt_id).await?;
    Ok((StatusCode::OK, Json(detail)))
}
