//! Similarity Scoring
//!
//! Bounded string similarity used by the fuzzy corrector. The score starts
//! from a normalized edit distance, rewards a shared prefix (typos tend to
//! land at the end of a word) and penalizes length differences so that a
//! short candidate does not latch onto a much longer entry.

use serde::{Deserialize, Serialize};
use strsim::normalized_levenshtein;

/// Maximum bonus for a shared prefix, scaled by the matching prefix ratio.
pub const PREFIX_BONUS_WEIGHT: f64 = 0.15;

/// Both strings must be at least this long before the prefix bonus applies.
pub const MIN_PREFIX_LEN: usize = 3;

/// Maximum penalty for a length difference, scaled by `diff / max_len`.
pub const LENGTH_PENALTY_WEIGHT: f64 = 0.1;

/// Tunable weights for [`similarity_with`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityWeights {
    pub prefix_bonus: f64,
    pub min_prefix_len: usize,
    pub length_penalty: f64,
}

impl Default for SimilarityWeights {
    fn default() -> Self {
        Self {
            prefix_bonus: PREFIX_BONUS_WEIGHT,
            min_prefix_len: MIN_PREFIX_LEN,
            length_penalty: LENGTH_PENALTY_WEIGHT,
        }
    }
}

/// Similarity in `[0, 1]` with the default weights.
///
/// Inputs are compared as given; callers case-fold beforehand.
pub fn similarity(a: &str, b: &str) -> f64 {
    similarity_with(a, b, &SimilarityWeights::default())
}

/// Similarity in `[0, 1]` with explicit weights.
pub fn similarity_with(a: &str, b: &str, weights: &SimilarityWeights) -> f64 {
    if a == b {
        return 1.0;
    }

    let mut score = normalized_levenshtein(a, b);

    let a_len = a.chars().count();
    let b_len = b.chars().count();
    let min_len = a_len.min(b_len);
    let max_len = a_len.max(b_len);

    if min_len >= weights.min_prefix_len {
        let prefix = common_prefix_len(a, b);
        score += (prefix as f64 / min_len as f64) * weights.prefix_bonus;
    }

    if max_len > 0 {
        let diff = max_len - min_len;
        score -= (diff as f64 / max_len as f64) * weights.length_penalty;
    }

    score.clamp(0.0, 1.0)
}

/// Length of the common prefix in characters.
pub fn common_prefix_len(a: &str, b: &str) -> usize {
    a.chars().zip(b.chars()).take_while(|(x, y)| x == y).count()
}
