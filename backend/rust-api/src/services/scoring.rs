//! Score aggregation. Always a pure function of the full answer set so
//! the aggregate stays correct after re-grading; never incremental.

use std::collections::HashMap;

use crate::models::{Answer, AssessmentDefinition, Attempt, AttemptState, Question, QuestionType};

/// Total score: sum of points earned, capped at the definition's maximum.
pub fn aggregate_score(answers: &[Answer], max_score: i64) -> i64 {
    let total: i64 = answers.iter().map(|a| a.points_earned).sum();
    total.min(max_score)
}

/// Pass/fail. Falls back to 50% of max when no passing score is
/// configured (exact integer comparison, no floats).
pub fn is_passing(score: i64, definition: &AssessmentDefinition) -> bool {
    match definition.passing_score {
        Some(passing) => score >= passing,
        None => score * 2 >= definition.max_score,
    }
}

/// An answer is pending while its essay question awaits a manual grade.
pub fn has_pending_grades(answers: &[Answer], questions: &HashMap<String, Question>) -> bool {
    answers.iter().any(|answer| {
        answer.is_correct.is_none()
            && questions
                .get(&answer.question_id)
                .map(|q| q.question_type == QuestionType::Essay)
                .unwrap_or(false)
    })
}

pub fn attempt_state(
    attempt: &Attempt,
    answers: &[Answer],
    questions: &HashMap<String, Question>,
) -> AttemptState {
    if !attempt.is_submitted() {
        AttemptState::InProgress
    } else if has_pending_grades(answers, questions) {
        AttemptState::PartiallyGraded
    } else {
        AttemptState::Graded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AnswerVisibility;

    fn definition(max_score: i64, passing_score: Option<i64>) -> AssessmentDefinition {
        AssessmentDefinition {
            id: "def-1".to_string(),
            context_ref: "course-1".to_string(),
            title: "Test".to_string(),
            max_score,
            time_limit_seconds: None,
            max_attempts: 3,
            passing_score,
            shuffle_questions: false,
            shuffle_options: false,
            answer_visibility: AnswerVisibility::Immediate,
            due_at: None,
            is_published: true,
            is_active: true,
        }
    }

    fn answer(question_id: &str, points: i64) -> Answer {
        Answer {
            id: format!("ans-{question_id}"),
            attempt_id: "att-1".to_string(),
            question_id: question_id.to_string(),
            option_id: None,
            free_text: None,
            points_earned: points,
            is_correct: Some(points > 0),
        }
    }

    #[test]
    fn aggregation_is_order_independent() {
        let def = definition(10, Some(7));
        let mut answers = vec![answer("q1", 3), answer("q2", 4), answer("q3", 2)];
        let forward = aggregate_score(&answers, def.max_score);
        answers.reverse();
        let backward = aggregate_score(&answers, def.max_score);
        assert_eq!(forward, backward);
        assert_eq!(forward, 9);
    }

    #[test]
    fn aggregation_is_deterministic() {
        let answers = vec![answer("q1", 5), answer("q2", 5)];
        for _ in 0..10 {
            assert_eq!(aggregate_score(&answers, 10), 10);
        }
    }

    #[test]
    fn score_is_capped_at_max() {
        let answers = vec![answer("q1", 8), answer("q2", 8)];
        assert_eq!(aggregate_score(&answers, 10), 10);
    }

    #[test]
    fn configured_passing_score_is_a_hard_threshold() {
        let def = definition(10, Some(7));
        assert!(!is_passing(6, &def));
        assert!(is_passing(7, &def));
    }

    #[test]
    fn default_threshold_is_half_of_max() {
        let even = definition(10, None);
        assert!(!is_passing(4, &even));
        assert!(is_passing(5, &even));

        // Odd max: 3.5 rounds up, so 4 is the first passing score.
        let odd = definition(7, None);
        assert!(!is_passing(3, &odd));
        assert!(is_passing(4, &odd));
    }
}
