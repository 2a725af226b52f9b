//! Attempt lifecycle: start (with quota enforcement and idempotent
//! resume), submit (the grading barrier), and lazy expiry reaping.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::error::{EngineError, EngineResult};
use crate::metrics::{ATTEMPTS_STARTED_TOTAL, ATTEMPTS_SUBMITTED_TOTAL};
use crate::middlewares::auth::JwtClaims;
use crate::models::{
    Answer, AssessmentDefinition, Attempt, AttemptSummary, Question, StartAttemptResponse,
    SubmitAttemptRequest, SubmittedAnswer,
};
use crate::store::{AssessmentStore, StoreError};
use crate::utils::time;

use super::grading_service::auto_grade;
use super::question_bank::QuestionBank;
use super::scoring;

/// Bounded retries for the start loop: a lost insert race recounts and
/// either resumes the winner's attempt or surfaces the quota error.
const START_RACE_RETRIES: usize = 3;

pub struct AttemptService {
    store: Arc<dyn AssessmentStore>,
}

impl AttemptService {
    pub fn new(store: Arc<dyn AssessmentStore>) -> Self {
        Self { store }
    }

    /// Starts (or resumes) an attempt. Reloading the start page never
    /// burns quota: an open, non-expired attempt is returned unchanged.
    pub async fn start(
        &self,
        claims: &JwtClaims,
        definition_id: &str,
    ) -> EngineResult<StartAttemptResponse> {
        let definition = self
            .store
            .get_definition(definition_id)
            .await?
            .ok_or(EngineError::NotFound("assessment"))?;
        if !definition.is_available() {
            ATTEMPTS_STARTED_TOTAL.with_label_values(&["rejected"]).inc();
            return Err(EngineError::AssessmentUnavailable);
        }

        let bank = QuestionBank::new(self.store.clone());
        let questions = bank.fetch(definition_id).await?;

        for _ in 0..START_RACE_RETRIES {
            if let Some(open) = self
                .store
                .find_open_attempt(&claims.sub, definition_id)
                .await?
            {
                if time::is_expired(open.started_at, definition.time_limit_seconds, Utc::now()) {
                    finalize_expired(self.store.as_ref(), &definition, &questions, open).await?;
                } else {
                    ATTEMPTS_STARTED_TOTAL.with_label_values(&["resumed"]).inc();
                    return Ok(start_response(&open, &definition, &questions, true));
                }
            }

            let count = self
                .store
                .count_attempts(&claims.sub, definition_id)
                .await?;
            if count >= definition.max_attempts {
                ATTEMPTS_STARTED_TOTAL.with_label_values(&["rejected"]).inc();
                return Err(EngineError::AttemptLimitExceeded);
            }

            let attempt = Attempt {
                id: Uuid::new_v4().to_string(),
                definition_id: definition_id.to_string(),
                learner_id: claims.sub.clone(),
                attempt_number: count + 1,
                started_at: Utc::now(),
                submitted_at: None,
                score: None,
                is_completed: false,
                is_passed: None,
            };

            match self.store.insert_attempt(&attempt).await {
                Ok(()) => {
                    ATTEMPTS_STARTED_TOTAL.with_label_values(&["created"]).inc();
                    tracing::info!(
                        attempt_id = %attempt.id,
                        learner = %claims.sub,
                        definition_id,
                        attempt_number = attempt.attempt_number,
                        "Attempt started"
                    );
                    return Ok(start_response(&attempt, &definition, &questions, false));
                }
                // Lost the race: loop to resume the winner or hit quota.
                Err(StoreError::DuplicateAttemptNumber) => continue,
                Err(err) => return Err(err.into()),
            }
        }

        ATTEMPTS_STARTED_TOTAL.with_label_values(&["rejected"]).inc();
        Err(EngineError::AttemptLimitExceeded)
    }

    /// Submits an attempt: upserts the final answer payload, auto-grades
    /// objective answers, aggregates, and finalizes — all behind the
    /// store's one-shot submit barrier. An expired attempt is finalized
    /// from its stored drafts and the late payload is discarded.
    pub async fn submit(
        &self,
        claims: &JwtClaims,
        attempt_id: &str,
        request: SubmitAttemptRequest,
    ) -> EngineResult<AttemptSummary> {
        request.validate()?;

        let attempt = self
            .store
            .get_attempt(attempt_id)
            .await?
            .ok_or(EngineError::NotFound("attempt"))?;
        if attempt.learner_id != claims.sub {
            return Err(EngineError::Unauthorized);
        }
        if attempt.is_submitted() {
            return Err(EngineError::AlreadySubmitted);
        }

        let definition = self
            .store
            .get_definition(&attempt.definition_id)
            .await?
            .ok_or(EngineError::NotFound("assessment"))?;
        let bank = QuestionBank::new(self.store.clone());
        let questions = bank.fetch(&definition.id).await?;
        let by_id = QuestionBank::by_id(&questions);

        if time::is_expired(attempt.started_at, definition.time_limit_seconds, Utc::now()) {
            let reaped =
                finalize_expired(self.store.as_ref(), &definition, &questions, attempt).await?;
            let answers = self.store.list_answers(&reaped.id).await?;
            let state = scoring::attempt_state(&reaped, &answers, &by_id);
            return Ok(AttemptSummary::from_attempt(&reaped, state));
        }

        // Validate the payload before touching any stored answer.
        for submitted in &request.answers {
            validate_submitted_answer(submitted, &by_id)?;
        }

        let mut answers = self.store.list_answers(attempt_id).await?;
        for submitted in &request.answers {
            merge_answer(&mut answers, attempt_id, submitted);
        }
        materialize_missing(&mut answers, attempt_id, &questions);
        auto_grade(&mut answers, &by_id);

        let score = scoring::aggregate_score(&answers, definition.max_score);
        let mut updated = attempt;
        updated.submitted_at = Some(Utc::now());
        updated.score = Some(score);
        updated.is_passed = Some(scoring::is_passing(score, &definition));
        updated.is_completed = true;

        self.store.finalize_submission(&updated, &answers).await?;

        let state = scoring::attempt_state(&updated, &answers, &by_id);
        ATTEMPTS_SUBMITTED_TOTAL
            .with_label_values(&[state.as_str()])
            .inc();
        tracing::info!(
            attempt_id = %updated.id,
            learner = %claims.sub,
            score,
            state = state.as_str(),
            "Attempt submitted"
        );
        Ok(AttemptSummary::from_attempt(&updated, state))
    }
}

fn validate_submitted_answer(
    submitted: &SubmittedAnswer,
    questions: &std::collections::HashMap<String, Question>,
) -> EngineResult<()> {
    let question = questions.get(&submitted.question_id).ok_or_else(|| {
        EngineError::InvalidOption(format!(
            "question {} is not part of this assessment",
            submitted.question_id
        ))
    })?;
    if question.question_type.is_choice() {
        let option_id = submitted.option_id.as_deref().ok_or_else(|| {
            EngineError::InvalidOption(format!(
                "question {} requires an option selection",
                submitted.question_id
            ))
        })?;
        if question.option(option_id).is_none() {
            return Err(EngineError::InvalidOption(format!(
                "option {} does not belong to question {}",
                option_id, submitted.question_id
            )));
        }
    }
    Ok(())
}

fn merge_answer(answers: &mut Vec<Answer>, attempt_id: &str, submitted: &SubmittedAnswer) {
    match answers
        .iter_mut()
        .find(|a| a.question_id == submitted.question_id)
    {
        Some(existing) => {
            existing.option_id = submitted.option_id.clone();
            existing.free_text = submitted.free_text.clone();
        }
        None => answers.push(Answer {
            id: Uuid::new_v4().to_string(),
            attempt_id: attempt_id.to_string(),
            question_id: submitted.question_id.clone(),
            option_id: submitted.option_id.clone(),
            free_text: submitted.free_text.clone(),
            points_earned: 0,
            is_correct: None,
        }),
    }
}

/// Every active question gets an answer record at submit time, so the
/// aggregate is a sum over the full question set and pending essay
/// detection sees unanswered essays too.
fn materialize_missing(answers: &mut Vec<Answer>, attempt_id: &str, questions: &[Question]) {
    for question in questions {
        if !answers.iter().any(|a| a.question_id == question.id) {
            answers.push(Answer {
                id: Uuid::new_v4().to_string(),
                attempt_id: attempt_id.to_string(),
                question_id: question.id.clone(),
                option_id: None,
                free_text: None,
                points_earned: 0,
                is_correct: None,
            });
        }
    }
}

/// Lazy expiry reaping: an expired open attempt is force-submitted from
/// whatever answers exist, stamped at the instant the clock ran out.
pub(crate) async fn finalize_expired(
    store: &dyn AssessmentStore,
    definition: &AssessmentDefinition,
    questions: &[Question],
    attempt: Attempt,
) -> EngineResult<Attempt> {
    let by_id = QuestionBank::by_id(questions);
    let mut answers = store.list_answers(&attempt.id).await?;
    materialize_missing(&mut answers, &attempt.id, questions);
    auto_grade(&mut answers, &by_id);

    let score = scoring::aggregate_score(&answers, definition.max_score);
    let mut updated = attempt;
    updated.submitted_at = definition
        .time_limit_seconds
        .map(|limit| time::expiry_instant(updated.started_at, limit));
    updated.score = Some(score);
    updated.is_passed = Some(scoring::is_passing(score, definition));
    updated.is_completed = true;

    match store.finalize_submission(&updated, &answers).await {
        Ok(()) => {
            ATTEMPTS_SUBMITTED_TOTAL.with_label_values(&["expired"]).inc();
            tracing::info!(attempt_id = %updated.id, score, "Expired attempt force-submitted");
            Ok(updated)
        }
        // A concurrent touch reaped it first; its result stands.
        Err(StoreError::AlreadyFinalized) => store
            .get_attempt(&updated.id)
            .await?
            .ok_or(EngineError::NotFound("attempt")),
        Err(err) => Err(err.into()),
    }
}

fn start_response(
    attempt: &Attempt,
    definition: &AssessmentDefinition,
    questions: &[Question],
    resumed: bool,
) -> StartAttemptResponse {
    StartAttemptResponse {
        attempt_id: attempt.id.clone(),
        attempt_number: attempt.attempt_number,
        started_at: attempt.started_at,
        resumed,
        time_limit_seconds: definition.time_limit_seconds,
        remaining_seconds: time::remaining_seconds(
            attempt.started_at,
            definition.time_limit_seconds,
            Utc::now(),
        ),
        questions: QuestionBank::learner_view(&attempt.id, definition, questions),
    }
}
