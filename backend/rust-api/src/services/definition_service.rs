//! Validation of incoming assessment definitions and the exact-sum point
//! arithmetic used across the engine.

use std::sync::Arc;

use crate::error::{EngineError, EngineResult};
use crate::models::{AssessmentDefinition, Question};
use crate::store::AssessmentStore;

/// Splits `total` into `parts` integer shares that sum exactly to
/// `total`. Any rounding remainder lands on the last share.
pub fn distribute_points(total: i64, parts: usize) -> Vec<i64> {
    if parts == 0 {
        return Vec::new();
    }
    let n = parts as i64;
    let base = total / n;
    let mut shares = vec![base; parts];
    shares[parts - 1] = total - base * (n - 1);
    shares
}

pub fn validate_definition(definition: &AssessmentDefinition) -> EngineResult<()> {
    if definition.max_score <= 0 {
        return Err(EngineError::Validation("max_score must be positive".into()));
    }
    if definition.max_attempts < 1 {
        return Err(EngineError::Validation(
            "max_attempts must be at least 1".into(),
        ));
    }
    if let Some(limit) = definition.time_limit_seconds {
        if limit <= 0 {
            return Err(EngineError::Validation(
                "time_limit_seconds must be positive when set".into(),
            ));
        }
    }
    if let Some(passing) = definition.passing_score {
        if passing < 0 || passing > definition.max_score {
            return Err(EngineError::Validation(
                "passing_score must lie within [0, max_score]".into(),
            ));
        }
    }
    Ok(())
}

pub fn validate_question(question: &Question) -> EngineResult<()> {
    if question.default_points < 0 {
        return Err(EngineError::Validation(format!(
            "question {} has negative default_points",
            question.id
        )));
    }
    if question.question_type.is_choice() {
        if question.options.len() < 2 {
            return Err(EngineError::Validation(format!(
                "choice question {} needs at least 2 options",
                question.id
            )));
        }
        if !question.options.iter().any(|o| o.is_correct) {
            return Err(EngineError::Validation(format!(
                "choice question {} needs at least 1 correct option",
                question.id
            )));
        }
    }
    Ok(())
}

/// Narrow interface consumed from the content-authoring system: accepts
/// a definition plus its question bank, validates the engine's
/// invariants, and stores both. Existing attempts are never touched.
pub struct DefinitionService {
    store: Arc<dyn AssessmentStore>,
}

impl DefinitionService {
    pub fn new(store: Arc<dyn AssessmentStore>) -> Self {
        Self { store }
    }

    pub async fn import(
        &self,
        definition: AssessmentDefinition,
        questions: Vec<Question>,
    ) -> EngineResult<()> {
        validate_definition(&definition)?;
        for question in &questions {
            if question.definition_id != definition.id {
                return Err(EngineError::Validation(format!(
                    "question {} belongs to another definition",
                    question.id
                )));
            }
            validate_question(question)?;
        }

        self.store.upsert_definition(&definition).await?;
        for question in &questions {
            self.store.upsert_question(question).await?;
        }

        tracing::info!(
            definition_id = %definition.id,
            questions = questions.len(),
            "Assessment definition imported"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shares_sum_exactly_to_the_total() {
        for (total, parts) in [(10, 3), (10, 4), (7, 2), (100, 7), (1, 3)] {
            let shares = distribute_points(total, parts);
            assert_eq!(shares.len(), parts);
            assert_eq!(shares.iter().sum::<i64>(), total, "{total}/{parts}");
        }
    }

    #[test]
    fn remainder_lands_on_the_last_share() {
        assert_eq!(distribute_points(10, 3), vec![3, 3, 4]);
        assert_eq!(distribute_points(10, 4), vec![2, 2, 2, 4]);
        assert_eq!(distribute_points(9, 3), vec![3, 3, 3]);
    }

    #[test]
    fn zero_parts_yields_nothing() {
        assert!(distribute_points(10, 0).is_empty());
    }
}
