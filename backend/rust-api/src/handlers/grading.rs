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
    models::GradeAttemptRequest,
    services::{grading_service::GradingService, AppState},
};

pub async fn grade_attempt(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(attempt_id): Path<String>,
    Json(req): Json<GradeAttemptRequest>,
) -> Result<impl IntoResponse, EngineError> {
    tracing::info!("Grading attempt={} by {}", attempt_id, claims.sub);

    let service = GradingService::new(state.store.clone(), state.grade_authorizer.clone());
    let summary = service.grade(&claims, &attempt_id, req).await?;
    Ok((StatusCode::OK, Json(summary)))
}
