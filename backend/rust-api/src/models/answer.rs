use serde::{Deserialize, Serialize};
use validator::Validate;

/// One stored answer per (attempt, question). A draft until the attempt
/// is submitted; auto-grading and manual grading overwrite points_earned
/// and is_correct in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    #[serde(rename = "_id")]
    pub id: String,
    pub attempt_id: String,
    pub question_id: String,
    pub option_id: Option<String>,
    pub free_text: Option<String>,
    pub points_earned: i64,
    /// None = grading still pending (essays before a manual grade).
    pub is_correct: Option<bool>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SaveAnswerRequest {
    pub option_id: Option<String>,
    pub free_text: Option<String>,
}

/// Per-question view inside an attempt detail. points_earned and
/// is_correct are withheld when the visibility policy says so.
#[derive(Debug, Serialize, Deserialize)]
pub struct AnswerView {
    pub question_id: String,
    pub option_id: Option<String>,
    pub free_text: Option<String>,
    pub points_earned: Option<i64>,
    pub is_correct: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct GradeEntry {
    #[validate(length(min = 1))]
    pub question_id: String,
    pub points_earned: i64,
    pub is_correct: bool,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct GradeAttemptRequest {
    #[validate(length(min = 1), nested)]
    pub grades: Vec<GradeEntry>,
}
