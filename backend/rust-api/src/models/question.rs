use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    SingleChoice,
    MultiChoice,
    Essay,
}

impl QuestionType {
    pub fn is_choice(&self) -> bool {
        !matches!(self, QuestionType::Essay)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::SingleChoice => "single_choice",
            QuestionType::MultiChoice => "multi_choice",
            QuestionType::Essay => "essay",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionOption {
    pub id: String,
    pub label: String,
    pub is_correct: bool,
    /// Explicit point value. None = proportional share of the question's
    /// default_points for correct options, 0 for incorrect ones.
    pub points_value: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "_id")]
    pub id: String,
    pub definition_id: String,
    pub question_type: QuestionType,
    pub prompt: String,
    pub default_points: i64,
    pub order_index: i64,
    pub is_active: bool,
    pub options: Vec<QuestionOption>,
}

impl Question {
    pub fn option(&self, option_id: &str) -> Option<&QuestionOption> {
        self.options.iter().find(|o| o.id == option_id)
    }
}

/// Learner-facing option: correctness and point values stripped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionView {
    pub id: String,
    pub label: String,
}

/// Learner-facing question in per-attempt display order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionView {
    pub id: String,
    pub question_type: QuestionType,
    pub prompt: String,
    pub points: i64,
    pub options: Vec<OptionView>,
}
