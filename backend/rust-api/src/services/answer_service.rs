//! Draft answer saving while an attempt is open. Drafts carry no points
//! until the submit barrier grades them.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::metrics::ANSWERS_SAVED_TOTAL;
use crate::middlewares::auth::JwtClaims;
use crate::models::{Answer, Question, SaveAnswerRequest};
use crate::store::{AssessmentStore, StoreError};
use crate::utils::time;

use super::attempt_service::finalize_expired;
use super::question_bank::QuestionBank;

pub struct AnswerService {
    store: Arc<dyn AssessmentStore>,
}

impl AnswerService {
    pub fn new(store: Arc<dyn AssessmentStore>) -> Self {
        Self { store }
    }

    /// Upserts one draft answer. Saving is last-write-wins per question;
    /// a save against a submitted or expired attempt is rejected (and an
    /// expired attempt is force-submitted on the spot).
    pub async fn save_answer(
        &self,
        claims: &JwtClaims,
        attempt_id: &str,
        question_id: &str,
        request: SaveAnswerRequest,
    ) -> EngineResult<Answer> {
        let attempt = self
            .store
            .get_attempt(attempt_id)
            .await?
            .ok_or(EngineError::NotFound("attempt"))?;
        if attempt.learner_id != claims.sub {
            return Err(EngineError::Unauthorized);
        }
        if attempt.is_submitted() {
            return Err(EngineError::AttemptNotEditable);
        }

        let definition = self
            .store
            .get_definition(&attempt.definition_id)
            .await?
            .ok_or(EngineError::NotFound("assessment"))?;
        let bank = QuestionBank::new(self.store.clone());
        let questions = bank.fetch(&definition.id).await?;

        if time::is_expired(attempt.started_at, definition.time_limit_seconds, Utc::now()) {
            finalize_expired(self.store.as_ref(), &definition, &questions, attempt).await?;
            return Err(EngineError::AttemptNotEditable);
        }

        let question = questions
            .iter()
            .find(|q| q.id == question_id)
            .ok_or_else(|| {
                EngineError::InvalidOption(format!(
                    "question {question_id} is not part of this assessment"
                ))
            })?;
        validate_selection(question, request.option_id.as_deref())?;

        let existing = self
            .store
            .list_answers(attempt_id)
            .await?
            .into_iter()
            .find(|a| a.question_id == question_id);

        let answer = Answer {
            id: existing
                .map(|a| a.id)
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            attempt_id: attempt_id.to_string(),
            question_id: question_id.to_string(),
            option_id: request.option_id,
            free_text: request.free_text,
            points_earned: 0,
            is_correct: None,
        };
        match self.store.upsert_answer(&answer).await {
            Ok(()) => {}
            // A submit won the race after the editability check above.
            Err(StoreError::AlreadyFinalized) => return Err(EngineError::AttemptNotEditable),
            Err(err) => return Err(err.into()),
        }

        ANSWERS_SAVED_TOTAL
            .with_label_values(&[question.question_type.as_str()])
            .inc();
        tracing::debug!(attempt_id, question_id, "Answer draft saved");
        Ok(answer)
    }
}

fn validate_selection(question: &Question, option_id: Option<&str>) -> EngineResult<()> {
    if question.question_type.is_choice() {
        let option_id = option_id.ok_or_else(|| {
            EngineError::InvalidOption(format!(
                "question {} requires an option selection",
                question.id
            ))
        })?;
        if question.option(option_id).is_none() {
            return Err(EngineError::InvalidOption(format!(
                "option {} does not belong to question {}",
                option_id, question.id
            )));
        }
    } else if option_id.is_some() {
        return Err(EngineError::InvalidOption(format!(
            "question {} does not take an option selection",
            question.id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{QuestionOption, QuestionType};

    fn question(question_type: QuestionType) -> Question {
        Question {
            id: "q-1".to_string(),
            definition_id: "def-1".to_string(),
            question_type,
            prompt: "prompt".to_string(),
            default_points: 5,
            order_index: 0,
            is_active: true,
            options: if question_type == QuestionType::Essay {
                Vec::new()
            } else {
                vec![QuestionOption {
                    id: "opt-1".to_string(),
                    label: "A".to_string(),
                    is_correct: true,
                    points_value: None,
                }]
            },
        }
    }

    #[test]
    fn choice_save_requires_a_known_option() {
        let q = question(QuestionType::SingleChoice);
        assert!(validate_selection(&q, Some("opt-1")).is_ok());
        assert!(matches!(
            validate_selection(&q, Some("opt-9")),
            Err(EngineError::InvalidOption(_))
        ));
        assert!(matches!(
            validate_selection(&q, None),
            Err(EngineError::InvalidOption(_))
        ));
    }

    #[test]
    fn essay_save_rejects_option_selections() {
        let q = question(QuestionType::Essay);
        assert!(validate_selection(&q, None).is_ok());
        assert!(matches!(
            validate_selection(&q, Some("opt-1")),
            Err(EngineError::InvalidOption(_))
        ));
    }
}
