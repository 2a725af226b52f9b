use anyhow::Context;
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, Bson};
use mongodb::options::{FindOptions, IndexOptions, ReplaceOptions};
use mongodb::{Client, Collection, Database, IndexModel};

use super::{AssessmentStore, StoreError, StoreResult};
use crate::models::{Answer, AssessmentDefinition, Attempt, Question};
use crate::utils::retry::{retry_async_with_config, RetryConfig};

const DEFINITIONS: &str = "assessment_definitions";
const QUESTIONS: &str = "questions";
const ATTEMPTS: &str = "attempts";
const ANSWERS: &str = "answers";

/// MongoDB-backed store. The unique indexes created at startup carry the
/// engine's concurrency invariants: a racing start loses on the
/// (learner, definition, attempt_number) index instead of over-admitting,
/// and answer upserts collapse onto (attempt_id, question_id).
pub struct MongoStore {
    client: Client,
    db: Database,
}

impl MongoStore {
    pub async fn new(client: Client, database: &str) -> anyhow::Result<Self> {
        let db = client.database(database);
        let store = Self { client, db };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> anyhow::Result<()> {
        let unique = IndexOptions::builder().unique(true).build();

        self.attempts()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "learner_id": 1, "definition_id": 1, "attempt_number": 1 })
                    .options(unique.clone())
                    .build(),
            )
            .await
            .context("Failed to create attempt uniqueness index")?;

        self.answers()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "attempt_id": 1, "question_id": 1 })
                    .options(unique)
                    .build(),
            )
            .await
            .context("Failed to create answer uniqueness index")?;

        self.questions()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "definition_id": 1, "order_index": 1 })
                    .build(),
            )
            .await
            .context("Failed to create question bank index")?;

        tracing::info!("MongoDB indexes ensured");
        Ok(())
    }

    fn definitions(&self) -> Collection<AssessmentDefinition> {
        self.db.collection(DEFINITIONS)
    }

    fn questions(&self) -> Collection<Question> {
        self.db.collection(QUESTIONS)
    }

    fn attempts(&self) -> Collection<Attempt> {
        self.db.collection(ATTEMPTS)
    }

    fn answers(&self) -> Collection<Answer> {
        self.db.collection(ANSWERS)
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        *err.kind,
        mongodb::error::ErrorKind::Write(mongodb::error::WriteFailure::WriteError(ref we))
            if we.code == 11000
    )
}

#[async_trait]
impl AssessmentStore for MongoStore {
    async fn ping(&self) -> StoreResult<()> {
        self.db
            .run_command(doc! { "ping": 1 })
            .await
            .context("MongoDB ping failed")?;
        Ok(())
    }

    async fn upsert_definition(&self, definition: &AssessmentDefinition) -> StoreResult<()> {
        self.definitions()
            .replace_one(doc! { "_id": &definition.id }, definition)
            .with_options(ReplaceOptions::builder().upsert(true).build())
            .await
            .context("Failed to upsert assessment definition")?;
        Ok(())
    }

    async fn get_definition(
        &self,
        definition_id: &str,
    ) -> StoreResult<Option<AssessmentDefinition>> {
        let definition = retry_async_with_config(RetryConfig::default(), || async {
            self.definitions()
                .find_one(doc! { "_id": definition_id })
                .await
        })
        .await
        .context("Failed to load assessment definition")?;
        Ok(definition)
    }

    async fn upsert_question(&self, question: &Question) -> StoreResult<()> {
        self.questions()
            .replace_one(doc! { "_id": &question.id }, question)
            .with_options(ReplaceOptions::builder().upsert(true).build())
            .await
            .context("Failed to upsert question")?;
        Ok(())
    }

    async fn list_questions(&self, definition_id: &str) -> StoreResult<Vec<Question>> {
        let cursor = retry_async_with_config(RetryConfig::default(), || async {
            self.questions()
                .find(doc! { "definition_id": definition_id, "is_active": true })
                .with_options(FindOptions::builder().sort(doc! { "order_index": 1 }).build())
                .await
        })
        .await
        .context("Failed to query question bank")?;

        let questions = cursor
            .try_collect()
            .await
            .context("Question bank cursor failed")?;
        Ok(questions)
    }

    async fn get_attempt(&self, attempt_id: &str) -> StoreResult<Option<Attempt>> {
        let attempt = retry_async_with_config(RetryConfig::default(), || async {
            self.attempts().find_one(doc! { "_id": attempt_id }).await
        })
        .await
        .context("Failed to load attempt")?;
        Ok(attempt)
    }

    async fn list_attempts(
        &self,
        learner_id: &str,
        definition_id: &str,
    ) -> StoreResult<Vec<Attempt>> {
        let cursor = retry_async_with_config(RetryConfig::default(), || async {
            self.attempts()
                .find(doc! { "learner_id": learner_id, "definition_id": definition_id })
                .with_options(
                    FindOptions::builder()
                        .sort(doc! { "attempt_number": -1 })
                        .build(),
                )
                .await
        })
        .await
        .context("Failed to query attempts")?;

        let attempts = cursor.try_collect().await.context("Attempt cursor failed")?;
        Ok(attempts)
    }

    async fn count_attempts(&self, learner_id: &str, definition_id: &str) -> StoreResult<i64> {
        let count = retry_async_with_config(RetryConfig::default(), || async {
            self.attempts()
                .count_documents(
                    doc! { "learner_id": learner_id, "definition_id": definition_id },
                )
                .await
        })
        .await
        .context("Failed to count attempts")?;
        Ok(count as i64)
    }

    async fn find_open_attempt(
        &self,
        learner_id: &str,
        definition_id: &str,
    ) -> StoreResult<Option<Attempt>> {
        let attempt = retry_async_with_config(RetryConfig::default(), || async {
            self.attempts()
                .find_one(doc! {
                    "learner_id": learner_id,
                    "definition_id": definition_id,
                    "submitted_at": Bson::Null,
                })
                .await
        })
        .await
        .context("Failed to look up open attempt")?;
        Ok(attempt)
    }

    async fn insert_attempt(&self, attempt: &Attempt) -> StoreResult<()> {
        match self.attempts().insert_one(attempt).await {
            Ok(_) => Ok(()),
            Err(err) if is_duplicate_key(&err) => Err(StoreError::DuplicateAttemptNumber),
            Err(err) => Err(StoreError::Backend(
                anyhow::Error::new(err).context("Failed to insert attempt"),
            )),
        }
    }

    async fn upsert_answer(&self, answer: &Answer) -> StoreResult<()> {
        let mut session = self
            .client
            .start_session()
            .await
            .context("Failed to start MongoDB session")?;
        session
            .start_transaction()
            .await
            .context("Failed to start answer transaction")?;

        // Re-check the attempt inside the transaction so a save racing a
        // submit can never overwrite a graded answer.
        let open = self
            .attempts()
            .find_one(doc! { "_id": &answer.attempt_id, "submitted_at": Bson::Null })
            .session(&mut session)
            .await
            .context("Failed to check attempt state")?;
        if open.is_none() {
            session
                .abort_transaction()
                .await
                .context("Failed to abort answer transaction")?;
            return Err(StoreError::AlreadyFinalized);
        }

        self.answers()
            .replace_one(
                doc! { "attempt_id": &answer.attempt_id, "question_id": &answer.question_id },
                answer,
            )
            .with_options(ReplaceOptions::builder().upsert(true).build())
            .session(&mut session)
            .await
            .context("Failed to upsert answer")?;

        session
            .commit_transaction()
            .await
            .context("Failed to commit answer transaction")?;
        Ok(())
    }

    async fn list_answers(&self, attempt_id: &str) -> StoreResult<Vec<Answer>> {
        let cursor = retry_async_with_config(RetryConfig::default(), || async {
            self.answers()
                .find(doc! { "attempt_id": attempt_id })
                .await
        })
        .await
        .context("Failed to query answers")?;

        let answers = cursor.try_collect().await.context("Answer cursor failed")?;
        Ok(answers)
    }

    async fn finalize_submission(
        &self,
        attempt: &Attempt,
        answers: &[Answer],
    ) -> StoreResult<()> {
        let mut session = self
            .client
            .start_session()
            .await
            .context("Failed to start MongoDB session")?;
        session
            .start_transaction()
            .await
            .context("Failed to start submit transaction")?;

        // Guard on submitted_at so the first successful submit wins.
        let result = self
            .attempts()
            .replace_one(
                doc! { "_id": &attempt.id, "submitted_at": Bson::Null },
                attempt,
            )
            .session(&mut session)
            .await
            .context("Failed to finalize attempt")?;

        if result.matched_count == 0 {
            session
                .abort_transaction()
                .await
                .context("Failed to abort submit transaction")?;
            return Err(StoreError::AlreadyFinalized);
        }

        for answer in answers {
            self.answers()
                .replace_one(
                    doc! { "attempt_id": &answer.attempt_id, "question_id": &answer.question_id },
                    answer,
                )
                .with_options(ReplaceOptions::builder().upsert(true).build())
                .session(&mut session)
                .await
                .context("Failed to persist graded answer")?;
        }

        session
            .commit_transaction()
            .await
            .context("Failed to commit submit transaction")?;
        Ok(())
    }

    async fn apply_grades(&self, attempt: &Attempt, answers: &[Answer]) -> StoreResult<()> {
        let mut session = self
            .client
            .start_session()
            .await
            .context("Failed to start MongoDB session")?;
        session
            .start_transaction()
            .await
            .context("Failed to start grading transaction")?;

        for answer in answers {
            self.answers()
                .replace_one(
                    doc! { "attempt_id": &answer.attempt_id, "question_id": &answer.question_id },
                    answer,
                )
                .with_options(ReplaceOptions::builder().upsert(true).build())
                .session(&mut session)
                .await
                .context("Failed to persist graded answer")?;
        }

        self.attempts()
            .replace_one(doc! { "_id": &attempt.id }, attempt)
            .session(&mut session)
            .await
            .context("Failed to persist regraded attempt")?;

        session
            .commit_transaction()
            .await
            .context("Failed to commit grading transaction")?;
        Ok(())
    }
}
