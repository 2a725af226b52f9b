//! Attempt history: listing past attempts and the per-question detail
//! view, with the definition's answer-visibility policy applied.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;

use crate::error::{EngineError, EngineResult};
use crate::middlewares::auth::JwtClaims;
use crate::models::{
    Answer, AnswerView, AnswerVisibility, AssessmentDefinition, Attempt, AttemptDetail,
    AttemptSummary, Question,
};
use crate::store::AssessmentStore;
use crate::utils::time;

use super::attempt_service::finalize_expired;
use super::question_bank::QuestionBank;
use super::{scoring, GradeAuthorizer};

pub struct HistoryService {
    store: Arc<dyn AssessmentStore>,
    authorizer: Arc<dyn GradeAuthorizer>,
}

impl HistoryService {
    pub fn new(store: Arc<dyn AssessmentStore>, authorizer: Arc<dyn GradeAuthorizer>) -> Self {
        Self { store, authorizer }
    }

    /// Attempts for a definition, newest first. Learners see their own;
    /// a grader may ask for another learner's history.
    pub async fn list_attempts(
        &self,
        claims: &JwtClaims,
        definition_id: &str,
        learner_id: Option<&str>,
    ) -> EngineResult<Vec<AttemptSummary>> {
        let subject = learner_id.unwrap_or(&claims.sub);
        if subject != claims.sub && !self.authorizer.can_grade(claims, definition_id).await {
            return Err(EngineError::Unauthorized);
        }

        let definition = self
            .store
            .get_definition(definition_id)
            .await?
            .ok_or(EngineError::NotFound("assessment"))?;
        let questions = self.store.list_questions(definition_id).await?;
        let by_id = QuestionBank::by_id(&questions);

        let mut summaries = Vec::new();
        for attempt in self.store.list_attempts(subject, definition_id).await? {
            let attempt = self
                .reap_if_expired(&definition, &questions, attempt)
                .await?;
            let answers = self.store.list_answers(&attempt.id).await?;
            let state = scoring::attempt_state(&attempt, &answers, &by_id);
            summaries.push(AttemptSummary::from_attempt(&attempt, state));
        }
        Ok(summaries)
    }

    /// Full detail for one attempt. The owner sees it through the
    /// visibility policy; graders always see points and correctness.
    pub async fn attempt_detail(
        &self,
        claims: &JwtClaims,
        attempt_id: &str,
    ) -> EngineResult<AttemptDetail> {
        let attempt = self
            .store
            .get_attempt(attempt_id)
            .await?
            .ok_or(EngineError::NotFound("attempt"))?;

        let is_owner = attempt.learner_id == claims.sub;
        let is_grader = self
            .authorizer
            .can_grade(claims, &attempt.definition_id)
            .await;
        if !is_owner && !is_grader {
            return Err(EngineError::Unauthorized);
        }

        let definition = self
            .store
            .get_definition(&attempt.definition_id)
            .await?
            .ok_or(EngineError::NotFound("assessment"))?;
        let questions = self.store.list_questions(&definition.id).await?;
        let by_id = QuestionBank::by_id(&questions);

        let attempt = self
            .reap_if_expired(&definition, &questions, attempt)
            .await?;
        let answers = self.store.list_answers(&attempt.id).await?;
        let state = scoring::attempt_state(&attempt, &answers, &by_id);

        let reveal = is_grader || reveal_results(&definition, &attempt, Utc::now());
        let answer_views = build_answer_views(&questions, &answers, reveal);

        Ok(AttemptDetail {
            summary: AttemptSummary::from_attempt(&attempt, state),
            remaining_seconds: if attempt.is_submitted() {
                None
            } else {
                time::remaining_seconds(attempt.started_at, definition.time_limit_seconds, Utc::now())
            },
            answers: answer_views,
        })
    }

    async fn reap_if_expired(
        &self,
        definition: &AssessmentDefinition,
        questions: &[Question],
        attempt: Attempt,
    ) -> EngineResult<Attempt> {
        if !attempt.is_submitted()
            && time::is_expired(attempt.started_at, definition.time_limit_seconds, Utc::now())
        {
            finalize_expired(self.store.as_ref(), definition, questions, attempt).await
        } else {
            Ok(attempt)
        }
    }
}

/// Whether points and correctness may be shown to the attempt's owner.
/// In-progress attempts never reveal; after_deadline without a due date
/// behaves like never.
fn reveal_results(
    definition: &AssessmentDefinition,
    attempt: &Attempt,
    now: chrono::DateTime<Utc>,
) -> bool {
    if !attempt.is_submitted() {
        return false;
    }
    match definition.answer_visibility {
        AnswerVisibility::Immediate => true,
        AnswerVisibility::AfterDeadline => definition.deadline_passed(now),
        AnswerVisibility::Never => false,
    }
}

/// One view per answered question, in bank order. The learner's own
/// selections are always visible; points and correctness only when the
/// policy allows.
fn build_answer_views(questions: &[Question], answers: &[Answer], reveal: bool) -> Vec<AnswerView> {
    let by_question: HashMap<&str, &Answer> = answers
        .iter()
        .map(|a| (a.question_id.as_str(), a))
        .collect();
    questions
        .iter()
        .filter_map(|question| by_question.get(question.id.as_str()))
        .map(|answer| AnswerView {
            question_id: answer.question_id.clone(),
            option_id: answer.option_id.clone(),
            free_text: answer.free_text.clone(),
            points_earned: reveal.then_some(answer.points_earned),
            is_correct: if reveal { answer.is_correct } else { None },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn definition(visibility: AnswerVisibility, due_at: Option<chrono::DateTime<Utc>>) -> AssessmentDefinition {
        AssessmentDefinition {
            id: "def-1".to_string(),
            context_ref: "course-1".to_string(),
            title: "Quiz".to_string(),
            max_score: 10,
            time_limit_seconds: None,
            max_attempts: 3,
            passing_score: None,
            shuffle_questions: false,
            shuffle_options: false,
            answer_visibility: visibility,
            due_at,
            is_published: true,
            is_active: true,
        }
    }

    fn submitted_attempt() -> Attempt {
        let started = Utc::now() - Duration::minutes(10);
        Attempt {
            id: "att-1".to_string(),
            definition_id: "def-1".to_string(),
            learner_id: "learner-1".to_string(),
            attempt_number: 1,
            started_at: started,
            submitted_at: Some(started + Duration::minutes(5)),
            score: Some(8),
            is_completed: true,
            is_passed: Some(true),
        }
    }

    #[test]
    fn immediate_policy_reveals_after_submit() {
        let def = definition(AnswerVisibility::Immediate, None);
        assert!(reveal_results(&def, &submitted_attempt(), Utc::now()));
    }

    #[test]
    fn open_attempts_never_reveal() {
        let def = definition(AnswerVisibility::Immediate, None);
        let mut attempt = submitted_attempt();
        attempt.submitted_at = None;
        assert!(!reveal_results(&def, &attempt, Utc::now()));
    }

    #[test]
    fn after_deadline_waits_for_the_due_date() {
        let now = Utc::now();
        let before = definition(AnswerVisibility::AfterDeadline, Some(now + Duration::hours(1)));
        let after = definition(AnswerVisibility::AfterDeadline, Some(now - Duration::hours(1)));
        let attempt = submitted_attempt();
        assert!(!reveal_results(&before, &attempt, now));
        assert!(reveal_results(&after, &attempt, now));
    }

    #[test]
    fn after_deadline_without_a_due_date_stays_hidden() {
        let def = definition(AnswerVisibility::AfterDeadline, None);
        assert!(!reveal_results(&def, &submitted_attempt(), Utc::now()));
    }

    #[test]
    fn never_policy_withholds_points_but_not_selections() {
        let answers = vec![Answer {
            id: "ans-1".to_string(),
            attempt_id: "att-1".to_string(),
            question_id: "q-1".to_string(),
            option_id: Some("opt-1".to_string()),
            free_text: None,
            points_earned: 5,
            is_correct: Some(true),
        }];
        let questions = vec![Question {
            id: "q-1".to_string(),
            definition_id: "def-1".to_string(),
            question_type: crate::models::QuestionType::SingleChoice,
            prompt: "pick".to_string(),
            default_points: 5,
            order_index: 0,
            is_active: true,
            options: Vec::new(),
        }];
        let views = build_answer_views(&questions, &answers, false);
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].option_id.as_deref(), Some("opt-1"));
        assert_eq!(views[0].points_earned, None);
        assert_eq!(views[0].is_correct, None);
    }
}
