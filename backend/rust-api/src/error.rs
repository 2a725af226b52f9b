use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

/// Typed engine errors. Quota and state errors are non-retryable and
/// surfaced verbatim; validation errors reject the single offending
/// write and leave prior state untouched.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("attempt limit exceeded for this assessment")]
    AttemptLimitExceeded,
    #[error("assessment is not published or has been deactivated")]
    AssessmentUnavailable,
    #[error("attempt has already been submitted")]
    AlreadySubmitted,
    #[error("attempt is no longer editable")]
    AttemptNotEditable,
    #[error("invalid option: {0}")]
    InvalidOption(String),
    #[error("invalid score: {0}")]
    InvalidScore(String),
    #[error("not authorized for this operation")]
    Unauthorized,
    #[error("attempt has not been submitted yet")]
    AttemptNotSubmitted,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("storage failure: {0}")]
    Storage(#[from] anyhow::Error),
}

impl EngineError {
    /// Stable machine-readable code for API clients.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::AttemptLimitExceeded => "AttemptLimitExceeded",
            EngineError::AssessmentUnavailable => "AssessmentUnavailable",
            EngineError::AlreadySubmitted => "AlreadySubmitted",
            EngineError::AttemptNotEditable => "AttemptNotEditable",
            EngineError::InvalidOption(_) => "InvalidOption",
            EngineError::InvalidScore(_) => "InvalidScore",
            EngineError::Unauthorized => "Unauthorized",
            EngineError::AttemptNotSubmitted => "AttemptNotSubmitted",
            EngineError::NotFound(_) => "NotFound",
            EngineError::Validation(_) => "Validation",
            EngineError::Storage(_) => "Storage",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            EngineError::AttemptLimitExceeded
            | EngineError::AssessmentUnavailable
            | EngineError::AlreadySubmitted
            | EngineError::AttemptNotEditable
            | EngineError::AttemptNotSubmitted => StatusCode::CONFLICT,
            EngineError::InvalidOption(_)
            | EngineError::InvalidScore(_)
            | EngineError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            EngineError::Unauthorized => StatusCode::FORBIDDEN,
            EngineError::NotFound(_) => StatusCode::NOT_FOUND,
            EngineError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<validator::ValidationErrors> for EngineError {
    fn from(err: validator::ValidationErrors) -> Self {
        EngineError::Validation(err.to_string())
    }
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("engine storage failure: {:#}", self);
        }
        let body = json!({
            "error": self.code(),
            "message": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}
