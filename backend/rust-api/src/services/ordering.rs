//! Deterministic per-attempt shuffling. The permutation is a pure
//! function of the attempt (and question) identifiers, so re-fetching an
//! attempt before submission always yields the same order while two
//! attempts by the same learner usually differ. Grading never looks at
//! positions, only at option ids.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use sha2::{Digest, Sha256};

use crate::models::Question;

fn seeded_rng(parts: &[&str]) -> StdRng {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    StdRng::from_seed(hasher.finalize().into())
}

/// Question display order for one attempt. Bank order when shuffling is off.
pub fn question_order(attempt_id: &str, shuffle: bool, questions: &[Question]) -> Vec<String> {
    let mut ids: Vec<String> = questions.iter().map(|q| q.id.clone()).collect();
    if shuffle && ids.len() > 1 {
        let mut rng = seeded_rng(&["questions", attempt_id]);
        ids.shuffle(&mut rng);
    }
    ids
}

/// Option display order for one question within one attempt.
pub fn option_order(attempt_id: &str, question: &Question, shuffle: bool) -> Vec<String> {
    let mut ids: Vec<String> = question.options.iter().map(|o| o.id.clone()).collect();
    if shuffle && ids.len() > 1 {
        let mut rng = seeded_rng(&["options", attempt_id, &question.id]);
        ids.shuffle(&mut rng);
    }
    ids
}
