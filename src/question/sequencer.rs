//! Category-ordered question sequencing.
//!
//! Partitions the input by kind along the fixed precedence, shuffles each
//! bucket independently, then concatenates. The output is always a
//! permutation of the input; category blocks stay contiguous and in
//! precedence order, only the order within a block is random.

use rand::seq::SliceRandom;
use rand::Rng;

use super::{Question, KIND_PRECEDENCE};

/// Order a question set for presentation.
///
/// Empty input yields empty output; the caller surfaces the "no questions"
/// state instead of starting a session.
pub fn sequence<R: Rng>(questions: Vec<Question>, rng: &mut R) -> Vec<Question> {
    let mut buckets: [Vec<Question>; 4] = Default::default();
    for question in questions {
        buckets[question.kind.precedence()].push(question);
    }

    let mut ordered = Vec::with_capacity(buckets.iter().map(Vec::len).sum());
    for bucket in buckets.iter_mut() {
        // Fisher-Yates, uniform over permutations of the bucket.
        bucket.shuffle(rng);
        ordered.append(bucket);
    }

    debug_assert!(is_category_ordered(&ordered));
    ordered
}

fn is_category_ordered(questions: &[Question]) -> bool {
    questions
        .windows(2)
        .all(|w| w[0].kind.precedence() <= w[1].kind.precedence())
}
