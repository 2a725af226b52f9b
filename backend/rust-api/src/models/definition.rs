use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::question::Question;

/// Governs when a learner may see per-question correctness and points
/// after submitting an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerVisibility {
    Immediate,
    AfterDeadline,
    Never,
}

/// Assessment configuration as published by the content-authoring system.
/// The engine reads it and never mutates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentDefinition {
    #[serde(rename = "_id")]
    pub id: String,
    /// Owning course/lesson reference, opaque to the engine.
    pub context_ref: String,
    pub title: String,
    pub max_score: i64,
    /// None = unlimited time.
    pub time_limit_seconds: Option<i64>,
    pub max_attempts: i64,
    /// None = fall back to the 50%-of-max default.
    pub passing_score: Option<i64>,
    pub shuffle_questions: bool,
    pub shuffle_options: bool,
    pub answer_visibility: AnswerVisibility,
    pub due_at: Option<DateTime<Utc>>,
    pub is_published: bool,
    pub is_active: bool,
}

impl AssessmentDefinition {
    pub fn is_available(&self) -> bool {
        self.is_published && self.is_active
    }

    pub fn deadline_passed(&self, now: DateTime<Utc>) -> bool {
        self.due_at.map(|due| now >= due).unwrap_or(false)
    }
}

/// Sync payload from the content-authoring system: a definition plus its
/// question bank. Ids are owned by the authoring side.
#[derive(Debug, Deserialize)]
pub struct ImportDefinitionRequest {
    pub definition: AssessmentDefinition,
    pub questions: Vec<Question>,
}
