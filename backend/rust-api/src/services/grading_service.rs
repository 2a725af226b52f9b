//! Two-phase grading: automatic scoring of objective answers at submit
//! time, and manual scoring of subjective answers afterwards.

use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;
use validator::Validate;

use crate::error::{EngineError, EngineResult};
use crate::metrics::MANUAL_GRADES_TOTAL;
use crate::middlewares::auth::JwtClaims;
use crate::models::{
    Answer, AttemptSummary, GradeAttemptRequest, Question, QuestionType,
};
use crate::store::AssessmentStore;

use super::question_bank::effective_option_points;
use super::{scoring, GradeAuthorizer};

/// Scores objective answers in place. Essay answers stay at zero points
/// with correctness pending; choice answers earn the selected option's
/// effective point value. Options are matched by id, never by position.
pub fn auto_grade(answers: &mut [Answer], questions: &HashMap<String, Question>) {
    for answer in answers.iter_mut() {
        let Some(question) = questions.get(&answer.question_id) else {
            answer.points_earned = 0;
            answer.is_correct = Some(false);
            continue;
        };
        if question.question_type == QuestionType::Essay {
            answer.points_earned = 0;
            answer.is_correct = None;
            continue;
        }
        let option_points = effective_option_points(question);
        match answer
            .option_id
            .as_deref()
            .and_then(|option_id| question.option(option_id))
        {
            Some(option) => {
                answer.points_earned = option_points.get(&option.id).copied().unwrap_or(0);
                answer.is_correct = Some(option.is_correct);
            }
            None => {
                answer.points_earned = 0;
                answer.is_correct = Some(false);
            }
        }
    }
}

pub struct GradingService {
    store: Arc<dyn AssessmentStore>,
    authorizer: Arc<dyn GradeAuthorizer>,
}

impl GradingService {
    pub fn new(store: Arc<dyn AssessmentStore>, authorizer: Arc<dyn GradeAuthorizer>) -> Self {
        Self { store, authorizer }
    }

    /// Applies a batch of manual grades. The whole batch is validated
    /// before anything is written: one out-of-range score rejects the
    /// call and leaves every answer untouched. Re-grading simply
    /// replaces the prior values.
    pub async fn grade(
        &self,
        claims: &JwtClaims,
        attempt_id: &str,
        request: GradeAttemptRequest,
    ) -> EngineResult<AttemptSummary> {
        request.validate()?;

        let attempt = self
            .store
            .get_attempt(attempt_id)
            .await?
            .ok_or(EngineError::NotFound("attempt"))?;

        if !self
            .authorizer
            .can_grade(claims, &attempt.definition_id)
            .await
        {
            return Err(EngineError::Unauthorized);
        }
        if !attempt.is_submitted() {
            return Err(EngineError::AttemptNotSubmitted);
        }

        let definition = self
            .store
            .get_definition(&attempt.definition_id)
            .await?
            .ok_or(EngineError::NotFound("assessment"))?;
        let questions = self.store.list_questions(&definition.id).await?;
        let by_id: HashMap<String, Question> = questions
            .iter()
            .map(|q| (q.id.clone(), q.clone()))
            .collect();

        // Validate the full batch up front; never clamp silently.
        for grade in &request.grades {
            let question = by_id.get(&grade.question_id).ok_or_else(|| {
                MANUAL_GRADES_TOTAL.with_label_values(&["rejected"]).inc();
                EngineError::InvalidScore(format!(
                    "question {} is not part of this assessment",
                    grade.question_id
                ))
            })?;
            if grade.points_earned < 0 || grade.points_earned > question.default_points {
                MANUAL_GRADES_TOTAL.with_label_values(&["rejected"]).inc();
                return Err(EngineError::InvalidScore(format!(
                    "{} points for question {} outside [0, {}]",
                    grade.points_earned, grade.question_id, question.default_points
                )));
            }
        }

        let mut answers = self.store.list_answers(attempt_id).await?;
        let mut touched: Vec<Answer> = Vec::with_capacity(request.grades.len());
        for grade in &request.grades {
            let answer = match answers
                .iter_mut()
                .find(|a| a.question_id == grade.question_id)
            {
                Some(existing) => {
                    existing.points_earned = grade.points_earned;
                    existing.is_correct = Some(grade.is_correct);
                    existing.clone()
                }
                None => {
                    // Grading an unanswered question creates its record.
                    let answer = Answer {
                        id: Uuid::new_v4().to_string(),
                        attempt_id: attempt_id.to_string(),
                        question_id: grade.question_id.clone(),
                        option_id: None,
                        free_text: None,
                        points_earned: grade.points_earned,
                        is_correct: Some(grade.is_correct),
                    };
                    answers.push(answer.clone());
                    answer
                }
            };
            touched.push(answer);
        }

        let score = scoring::aggregate_score(&answers, definition.max_score);
        let mut updated = attempt.clone();
        updated.score = Some(score);
        updated.is_passed = Some(scoring::is_passing(score, &definition));

        self.store.apply_grades(&updated, &touched).await?;
        MANUAL_GRADES_TOTAL.with_label_values(&["applied"]).inc();

        let state = scoring::attempt_state(&updated, &answers, &by_id);
        tracing::info!(
            attempt_id = %updated.id,
            grader = %claims.sub,
            score,
            state = state.as_str(),
            "Manual grades applied"
        );
        Ok(AttemptSummary::from_attempt(&updated, state))
    }
}
