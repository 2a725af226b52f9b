use async_trait::async_trait;
use thiserror::Error;

use crate::error::EngineError;
use crate::models::{Answer, AssessmentDefinition, Attempt, Question};

pub mod memory;
pub mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The (learner, definition, attempt_number) slot is already taken;
    /// a concurrent start won the race.
    #[error("attempt number already taken")]
    DuplicateAttemptNumber,
    /// The attempt was finalized by a concurrent submit.
    #[error("attempt already finalized")]
    AlreadyFinalized,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateAttemptNumber => EngineError::AttemptLimitExceeded,
            StoreError::AlreadyFinalized => EngineError::AlreadySubmitted,
            StoreError::Backend(e) => EngineError::Storage(e),
        }
    }
}

/// Persistence port for the engine. MongoStore backs production;
/// MemoryStore backs the test harness. Uniqueness of
/// (learner_id, definition_id, attempt_number) and of
/// (attempt_id, question_id) is enforced here, not in the services.
#[async_trait]
pub trait AssessmentStore: Send + Sync {
    async fn ping(&self) -> StoreResult<()>;

    async fn upsert_definition(&self, definition: &AssessmentDefinition) -> StoreResult<()>;
    async fn get_definition(&self, definition_id: &str)
        -> StoreResult<Option<AssessmentDefinition>>;

    async fn upsert_question(&self, question: &Question) -> StoreResult<()>;
    /// Active questions for a definition, ordered by order_index.
    async fn list_questions(&self, definition_id: &str) -> StoreResult<Vec<Question>>;

    async fn get_attempt(&self, attempt_id: &str) -> StoreResult<Option<Attempt>>;
    /// All attempts for (learner, definition), ordered by attempt_number descending.
    async fn list_attempts(
        &self,
        learner_id: &str,
        definition_id: &str,
    ) -> StoreResult<Vec<Attempt>>;
    async fn count_attempts(&self, learner_id: &str, definition_id: &str) -> StoreResult<i64>;
    async fn find_open_attempt(
        &self,
        learner_id: &str,
        definition_id: &str,
    ) -> StoreResult<Option<Attempt>>;
    /// Fails with DuplicateAttemptNumber when the slot is taken.
    async fn insert_attempt(&self, attempt: &Attempt) -> StoreResult<()>;

    /// Replaces any prior draft for (attempt, question). Fails with
    /// AlreadyFinalized once the attempt is submitted, so a save racing
    /// a submit can never clobber a graded answer.
    async fn upsert_answer(&self, answer: &Answer) -> StoreResult<()>;
    async fn list_answers(&self, attempt_id: &str) -> StoreResult<Vec<Answer>>;

    /// Atomically persists the submitted attempt and its graded answers.
    /// Fails with AlreadyFinalized if the attempt is no longer open, so a
    /// second submit can never change the stored score.
    async fn finalize_submission(&self, attempt: &Attempt, answers: &[Answer])
        -> StoreResult<()>;

    /// Atomically overwrites graded answers and the recomputed aggregate,
    /// so no reader observes a half-updated score.
    async fn apply_grades(&self, attempt: &Attempt, answers: &[Answer]) -> StoreResult<()>;
}
