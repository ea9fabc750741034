//! Fuzzy Correction
//!
//! Repairs likely misspellings in extracted literal values (author names and
//! genres) against the catalog's current vocabulary. The vocabulary is a
//! per-request snapshot, so no index is built: each call is a linear scan
//! scoring every entry, which is fine for catalogs in the low thousands of
//! distinct values and would need a precomputed index beyond that.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::similarity::{similarity_with, SimilarityWeights};

/// Minimum score for a genre correction to be accepted.
pub const GENRE_ACCEPT_THRESHOLD: f64 = 0.75;

/// Minimum score for an author correction to be accepted. Looser than the
/// genre threshold: names are typed from memory and attract more typos.
pub const AUTHOR_ACCEPT_THRESHOLD: f64 = 0.65;

/// Bonus when the candidate matches the first word of an author name.
pub const FIRST_NAME_BONUS: f64 = 0.1;

// ============================================================================
// Vocabulary
// ============================================================================

/// Which catalog field a literal belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VocabularyField {
    Author,
    Genre,
}

impl VocabularyField {
    /// Map a column name to its vocabulary, if it has one.
    pub fn for_column(column: &str) -> Option<Self> {
        if column.eq_ignore_ascii_case("author") {
            Some(VocabularyField::Author)
        } else if column.eq_ignore_ascii_case("genre") {
            Some(VocabularyField::Genre)
        } else {
            None
        }
    }
}

impl std::fmt::Display for VocabularyField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VocabularyField::Author => write!(f, "author"),
            VocabularyField::Genre => write!(f, "genre"),
        }
    }
}

/// Snapshot of the distinct authors and genres known to the catalog at
/// query time. Entries are trimmed, de-duplicated and kept sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceVocabulary {
    authors: Vec<String>,
    genres: Vec<String>,
}

impl ReferenceVocabulary {
    pub fn new<A, G>(authors: A, genres: G) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        G: IntoIterator,
        G::Item: Into<String>,
    {
        Self {
            authors: Self::normalize_entries(authors),
            genres: Self::normalize_entries(genres),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    fn normalize_entries<I>(entries: I) -> Vec<String>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        entries
            .into_iter()
            .map(Into::into)
            .map(|entry| entry.trim().to_string())
            .filter(|entry| !entry.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn authors(&self) -> &[String] {
        &self.authors
    }

    pub fn genres(&self) -> &[String] {
        &self.genres
    }

    pub fn entries(&self, field: VocabularyField) -> &[String] {
        match field {
            VocabularyField::Author => &self.authors,
            VocabularyField::Genre => &self.genres,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.authors.is_empty() && self.genres.is_empty()
    }
}

// ============================================================================
// Policy
// ============================================================================

/// Thresholds and weights for correction. Defaults come from the named
/// constants; they are empirical and can be recalibrated from config.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectionPolicy {
    pub genre_threshold: f64,
    pub author_threshold: f64,
    pub first_name_bonus: f64,
    pub weights: SimilarityWeights,
}

impl Default for CorrectionPolicy {
    fn default() -> Self {
        Self {
            genre_threshold: GENRE_ACCEPT_THRESHOLD,
            author_threshold: AUTHOR_ACCEPT_THRESHOLD,
            first_name_bonus: FIRST_NAME_BONUS,
            weights: SimilarityWeights::default(),
        }
    }
}

impl CorrectionPolicy {
    pub fn threshold(&self, field: VocabularyField) -> f64 {
        match field {
            VocabularyField::Author => self.author_threshold,
            VocabularyField::Genre => self.genre_threshold,
        }
    }
}

// ============================================================================
// Correction
// ============================================================================

/// Outcome of correcting one literal.
///
/// `corrected` only carries a vocabulary entry when `accepted` is true;
/// otherwise it equals `original`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrectionResult {
    pub original: String,
    pub corrected: String,
    pub score: f64,
    pub accepted: bool,
}

impl CorrectionResult {
    fn rejected(original: &str, score: f64) -> Self {
        Self {
            original: original.to_string(),
            corrected: original.to_string(),
            score,
            accepted: false,
        }
    }

    /// The value the caller should use.
    pub fn value(&self) -> &str {
        if self.accepted {
            &self.corrected
        } else {
            &self.original
        }
    }

    /// True when an accepted correction changes the text.
    pub fn changed(&self) -> bool {
        self.accepted && self.corrected != self.original
    }
}

/// Vocabulary-backed typo corrector.
#[derive(Debug, Clone, Default)]
pub struct FuzzyCorrector {
    policy: CorrectionPolicy,
}

impl FuzzyCorrector {
    pub fn new(policy: CorrectionPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &CorrectionPolicy {
        &self.policy
    }

    /// Correct `candidate` against the vocabulary for `field`.
    pub fn correct(
        &self,
        candidate: &str,
        vocabulary: &ReferenceVocabulary,
        field: VocabularyField,
    ) -> CorrectionResult {
        self.correct_against(candidate, vocabulary.entries(field), field)
    }

    /// Correct `candidate` against an explicit list of entries.
    pub fn correct_against(
        &self,
        candidate: &str,
        entries: &[String],
        field: VocabularyField,
    ) -> CorrectionResult {
        let needle = candidate.trim().to_lowercase();
        if needle.is_empty() || entries.is_empty() {
            return CorrectionResult::rejected(candidate, 0.0);
        }

        // Exact case-insensitive hits win outright.
        let exact = entries
            .iter()
            .filter(|entry| entry.trim().to_lowercase() == needle)
            .fold(None, |best: Option<&String>, entry| match best {
                Some(current) if !prefer(entry, current) => Some(current),
                _ => Some(entry),
            });
        if let Some(entry) = exact {
            return CorrectionResult {
                original: candidate.to_string(),
                corrected: entry.clone(),
                score: 1.0,
                accepted: true,
            };
        }

        let mut best: Option<(f64, &String)> = None;
        for entry in entries {
            let score = self.entry_score(&needle, &entry.trim().to_lowercase(), field);
            best = match best {
                None => Some((score, entry)),
                Some((best_score, best_entry)) => {
                    if score > best_score
                        || (score == best_score && prefer(entry, best_entry))
                    {
                        Some((score, entry))
                    } else {
                        Some((best_score, best_entry))
                    }
                }
            };
        }

        let Some((score, entry)) = best else {
            return CorrectionResult::rejected(candidate, 0.0);
        };

        let threshold = self.policy.threshold(field);
        if score >= threshold {
            tracing::debug!(
                field = %field,
                original = candidate,
                corrected = entry.as_str(),
                score,
                "Fuzzy correction accepted"
            );
            CorrectionResult {
                original: candidate.to_string(),
                corrected: entry.clone(),
                score,
                accepted: true,
            }
        } else {
            tracing::debug!(
                field = %field,
                original = candidate,
                best = entry.as_str(),
                score,
                threshold,
                "Fuzzy correction below threshold"
            );
            CorrectionResult::rejected(candidate, score)
        }
    }

    /// Score one folded entry. Author names are also scored token by token,
    /// with a bonus for the first name, and keep the best score.
    fn entry_score(&self, needle: &str, entry: &str, field: VocabularyField) -> f64 {
        let weights = &self.policy.weights;
        let full = similarity_with(needle, entry, weights);
        if field != VocabularyField::Author {
            return full;
        }

        let tokens: Vec<&str> = entry.split_whitespace().collect();
        if tokens.len() < 2 {
            return full;
        }

        tokens
            .iter()
            .enumerate()
            .map(|(i, token)| {
                let bonus = if i == 0 { self.policy.first_name_bonus } else { 0.0 };
                (similarity_with(needle, token, weights) + bonus).min(1.0)
            })
            .fold(full, f64::max)
    }
}

/// Tie-break: shorter entry first, then lexicographic.
fn prefer(candidate: &str, current: &str) -> bool {
    let (a, b) = (candidate.chars().count(), current.chars().count());
    a < b || (a == b && candidate < current)
}
