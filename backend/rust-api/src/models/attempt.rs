use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::answer::AnswerView;
use super::question::QuestionView;

/// One instance of a learner taking an assessment. State is derived,
/// never stored: an attempt without submitted_at is in progress, a
/// submitted attempt is partially graded while essay answers await a
/// manual grade, and graded once none remain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attempt {
    #[serde(rename = "_id")]
    pub id: String,
    pub definition_id: String,
    pub learner_id: String,
    /// 1-based, unique per (learner, definition).
    pub attempt_number: i64,
    pub started_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub score: Option<i64>,
    pub is_completed: bool,
    pub is_passed: Option<bool>,
}

impl Attempt {
    pub fn is_submitted(&self) -> bool {
        self.submitted_at.is_some()
    }

    pub fn time_spent_seconds(&self) -> Option<i64> {
        self.submitted_at
            .map(|submitted| (submitted - self.started_at).num_seconds().max(0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptState {
    InProgress,
    PartiallyGraded,
    Graded,
}

impl AttemptState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptState::InProgress => "in_progress",
            AttemptState::PartiallyGraded => "partially_graded",
            AttemptState::Graded => "graded",
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StartAttemptResponse {
    pub attempt_id: String,
    pub attempt_number: i64,
    pub started_at: DateTime<Utc>,
    /// True when an open attempt was returned instead of a new one.
    pub resumed: bool,
    pub time_limit_seconds: Option<i64>,
    pub remaining_seconds: Option<i64>,
    pub questions: Vec<QuestionView>,
}

/// One answer inside a submit payload.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct SubmittedAnswer {
    #[validate(length(min = 1))]
    pub question_id: String,
    pub option_id: Option<String>,
    pub free_text: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct SubmitAttemptRequest {
    #[validate(nested)]
    #[serde(default)]
    pub answers: Vec<SubmittedAnswer>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AttemptSummary {
    pub attempt_id: String,
    pub definition_id: String,
    pub attempt_number: i64,
    pub state: AttemptState,
    pub started_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub score: Option<i64>,
    pub is_completed: bool,
    pub is_passed: Option<bool>,
    pub time_spent_seconds: Option<i64>,
}

impl AttemptSummary {
    pub fn from_attempt(attempt: &Attempt, state: AttemptState) -> Self {
        Self {
            attempt_id: attempt.id.clone(),
            definition_id: attempt.definition_id.clone(),
            attempt_number: attempt.attempt_number,
            state,
            started_at: attempt.started_at,
            submitted_at: attempt.submitted_at,
            score: attempt.score,
            is_completed: attempt.is_completed,
            is_passed: attempt.is_passed,
            time_spent_seconds: attempt.time_spent_seconds(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AttemptDetail {
    #[serde(flatten)]
    pub summary: AttemptSummary,
    pub remaining_seconds: Option<i64>,
    pub answers: Vec<AnswerView>,
}
