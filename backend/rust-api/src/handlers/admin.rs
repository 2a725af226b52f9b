use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use std::sync::Arc;

use crate::{
    error::EngineError,
    models::ImportDefinitionRequest,
    services::{definition_service::DefinitionService, AppState},
};

/// Imports (or replaces) an assessment definition with its question
/// bank. Content authoring lives elsewhere; this is the sync entry
/// point for the engine's copy.
pub async fn import_definition(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ImportDefinitionRequest>,
) -> Result<impl IntoResponse, EngineError> {
    tracing::info!(
        "Importing definition {} with {} questions",
        req.definition.id,
        req.questions.len()
    );

    let definition_id = req.definition.id.clone();
    let question_count = req.questions.len();
    let service = DefinitionService::new(state.store.clone());
    service.import(req.definition, req.questions).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "definition_id": definition_id,
            "questions": question_count
        })),
    ))
}
