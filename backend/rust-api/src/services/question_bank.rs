//! Read-only adapter over the question bank: loads active questions for
//! a definition, resolves effective option point values, and builds the
//! learner-facing views with correctness stripped.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{EngineError, EngineResult};
use crate::models::{AssessmentDefinition, OptionView, Question, QuestionView};
use crate::store::AssessmentStore;

use super::definition_service::distribute_points;
use super::ordering;

pub struct QuestionBank {
    store: Arc<dyn AssessmentStore>,
}

impl QuestionBank {
    pub fn new(store: Arc<dyn AssessmentStore>) -> Self {
        Self { store }
    }

    /// Active questions in bank order. Empty banks are a content error
    /// the engine surfaces as unavailability.
    pub async fn fetch(&self, definition_id: &str) -> EngineResult<Vec<Question>> {
        let questions = self.store.list_questions(definition_id).await?;
        if questions.is_empty() {
            return Err(EngineError::AssessmentUnavailable);
        }
        Ok(questions)
    }

    pub fn by_id(questions: &[Question]) -> HashMap<String, Question> {
        questions
            .iter()
            .map(|q| (q.id.clone(), q.clone()))
            .collect()
    }

    /// Learner-facing question list in this attempt's display order.
    pub fn learner_view(
        attempt_id: &str,
        definition: &AssessmentDefinition,
        questions: &[Question],
    ) -> Vec<QuestionView> {
        let by_id = Self::by_id(questions);
        ordering::question_order(attempt_id, definition.shuffle_questions, questions)
            .into_iter()
            .filter_map(|question_id| by_id.get(&question_id).cloned())
            .map(|question| {
                let option_ids =
                    ordering::option_order(attempt_id, &question, definition.shuffle_options);
                let options = option_ids
                    .into_iter()
                    .filter_map(|option_id| question.option(&option_id))
                    .map(|option| OptionView {
                        id: option.id.clone(),
                        label: option.label.clone(),
                    })
                    .collect();
                QuestionView {
                    id: question.id.clone(),
                    question_type: question.question_type,
                    prompt: question.prompt.clone(),
                    points: question.default_points,
                    options,
                }
            })
            .collect()
    }
}

/// Effective point value per option id. Correct options without an
/// explicit points_value share the question's default_points evenly,
/// remainder on the last correct option; incorrect options default to 0.
/// The shares always sum exactly to default_points.
pub fn effective_option_points(question: &Question) -> HashMap<String, i64> {
    let correct: Vec<&str> = question
        .options
        .iter()
        .filter(|o| o.is_correct)
        .map(|o| o.id.as_str())
        .collect();
    let shares = distribute_points(question.default_points, correct.len());
    let default_share: HashMap<&str, i64> = correct.into_iter().zip(shares).collect();

    question
        .options
        .iter()
        .map(|option| {
            let points = option.points_value.unwrap_or_else(|| {
                default_share.get(option.id.as_str()).copied().unwrap_or(0)
            });
            (option.id.clone(), points)
        })
        .collect()
}
