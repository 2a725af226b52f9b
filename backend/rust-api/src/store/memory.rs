use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{AssessmentStore, StoreError, StoreResult};
use crate::models::{Answer, AssessmentDefinition, Attempt, Question};

/// In-memory store used by the integration tests. A single RwLock over
/// the whole state makes every multi-document operation trivially
/// atomic, which matches the transactional guarantees MongoStore gives.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    definitions: HashMap<String, AssessmentDefinition>,
    /// definition_id -> questions
    questions: HashMap<String, Vec<Question>>,
    attempts: HashMap<String, Attempt>,
    /// attempt_id -> question_id -> answer
    answers: HashMap<String, HashMap<String, Answer>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AssessmentStore for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn upsert_definition(&self, definition: &AssessmentDefinition) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        inner
            .definitions
            .insert(definition.id.clone(), definition.clone());
        Ok(())
    }

    async fn get_definition(
        &self,
        definition_id: &str,
    ) -> StoreResult<Option<AssessmentDefinition>> {
        let inner = self.inner.read().await;
        Ok(inner.definitions.get(definition_id).cloned())
    }

    async fn upsert_question(&self, question: &Question) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let bank = inner
            .questions
            .entry(question.definition_id.clone())
            .or_default();
        match bank.iter_mut().find(|q| q.id == question.id) {
            Some(existing) => *existing = question.clone(),
            None => bank.push(question.clone()),
        }
        Ok(())
    }

    async fn list_questions(&self, definition_id: &str) -> StoreResult<Vec<Question>> {
        let inner = self.inner.read().await;
        let mut questions: Vec<Question> = inner
            .questions
            .get(definition_id)
            .map(|bank| bank.iter().filter(|q| q.is_active).cloned().collect())
            .unwrap_or_default();
        questions.sort_by_key(|q| q.order_index);
        Ok(questions)
    }

    async fn get_attempt(&self, attempt_id: &str) -> StoreResult<Option<Attempt>> {
        let inner = self.inner.read().await;
        Ok(inner.attempts.get(attempt_id).cloned())
    }

    async fn list_attempts(
        &self,
        learner_id: &str,
        definition_id: &str,
    ) -> StoreResult<Vec<Attempt>> {
        let inner = self.inner.read().await;
        let mut attempts: Vec<Attempt> = inner
            .attempts
            .values()
            .filter(|a| a.learner_id == learner_id && a.definition_id == definition_id)
            .cloned()
            .collect();
        attempts.sort_by(|a, b| b.attempt_number.cmp(&a.attempt_number));
        Ok(attempts)
    }

    async fn count_attempts(&self, learner_id: &str, definition_id: &str) -> StoreResult<i64> {
        let inner = self.inner.read().await;
        let count = inner
            .attempts
            .values()
            .filter(|a| a.learner_id == learner_id && a.definition_id == definition_id)
            .count();
        Ok(count as i64)
    }

    async fn find_open_attempt(
        &self,
        learner_id: &str,
        definition_id: &str,
    ) -> StoreResult<Option<Attempt>> {
        let inner = self.inner.read().await;
        Ok(inner
            .attempts
            .values()
            .find(|a| {
                a.learner_id == learner_id
                    && a.definition_id == definition_id
                    && a.submitted_at.is_none()
            })
            .cloned())
    }

    async fn insert_attempt(&self, attempt: &Attempt) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let taken = inner.attempts.values().any(|a| {
            a.learner_id == attempt.learner_id
                && a.definition_id == attempt.definition_id
                && a.attempt_number == attempt.attempt_number
        });
        if taken {
            return Err(StoreError::DuplicateAttemptNumber);
        }
        inner.attempts.insert(attempt.id.clone(), attempt.clone());
        Ok(())
    }

    async fn upsert_answer(&self, answer: &Answer) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        match inner.attempts.get(&answer.attempt_id) {
            None => return Err(StoreError::Backend(anyhow::anyhow!("attempt vanished"))),
            Some(stored) if stored.submitted_at.is_some() => {
                return Err(StoreError::AlreadyFinalized)
            }
            Some(_) => {}
        }
        inner
            .answers
            .entry(answer.attempt_id.clone())
            .or_default()
            .insert(answer.question_id.clone(), answer.clone());
        Ok(())
    }

    async fn list_answers(&self, attempt_id: &str) -> StoreResult<Vec<Answer>> {
        let inner = self.inner.read().await;
        let mut answers: Vec<Answer> = inner
            .answers
            .get(attempt_id)
            .map(|by_question| by_question.values().cloned().collect())
            .unwrap_or_default();
        answers.sort_by(|a, b| a.question_id.cmp(&b.question_id));
        Ok(answers)
    }

    async fn finalize_submission(
        &self,
        attempt: &Attempt,
        answers: &[Answer],
    ) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        match inner.attempts.get(&attempt.id) {
            None => return Err(StoreError::Backend(anyhow::anyhow!("attempt vanished"))),
            Some(stored) if stored.submitted_at.is_some() => {
                return Err(StoreError::AlreadyFinalized)
            }
            Some(_) => {}
        }
        inner.attempts.insert(attempt.id.clone(), attempt.clone());
        let by_question = inner.answers.entry(attempt.id.clone()).or_default();
        for answer in answers {
            by_question.insert(answer.question_id.clone(), answer.clone());
        }
        Ok(())
    }

    async fn apply_grades(&self, attempt: &Attempt, answers: &[Answer]) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if !inner.attempts.contains_key(&attempt.id) {
            return Err(StoreError::Backend(anyhow::anyhow!("attempt vanished")));
        }
        inner.attempts.insert(attempt.id.clone(), attempt.clone());
        let by_question = inner.answers.entry(attempt.id.clone()).or_default();
        for answer in answers {
            by_question.insert(answer.question_id.clone(), answer.clone());
        }
        Ok(())
    }
}
