//! Property-based tests for similarity scoring and fuzzy correction
//!
//! Tests invariants:
//! - Similarity is bounded to [0, 1] and maximal for identical strings
//! - An exact (case-insensitive) vocabulary hit is always accepted
//! - A correction is either a vocabulary entry or the untouched input
//! - An empty vocabulary never corrects

use proptest::prelude::*;

use crate::core::synthesis::{
    similarity, CorrectionPolicy, FuzzyCorrector, ReferenceVocabulary, VocabularyField,
};
use crate::tests::common::{library_vocabulary, LIBRARY_AUTHORS, LIBRARY_GENRES};

fn arb_field() -> impl Strategy<Value = VocabularyField> {
    prop_oneof![Just(VocabularyField::Author), Just(VocabularyField::Genre)]
}

fn arb_entry() -> impl Strategy<Value = (VocabularyField, &'static str)> {
    prop_oneof![
        prop::sample::select(LIBRARY_AUTHORS).prop_map(|a| (VocabularyField::Author, a)),
        prop::sample::select(LIBRARY_GENRES).prop_map(|g| (VocabularyField::Genre, g)),
    ]
}

proptest! {
    #[test]
    fn similarity_is_bounded(a in "\\PC{0,20}", b in "\\PC{0,20}") {
        let score = similarity(&a, &b);
        prop_assert!((0.0..=1.0).contains(&score), "score {} out of range", score);
    }

    #[test]
    fn similarity_of_identical_strings_is_one(a in "\\PC{0,20}") {
        prop_assert_eq!(similarity(&a, &a), 1.0);
    }

    #[test]
    fn exact_hits_are_accepted((field, entry) in arb_entry(), upper in any::<bool>()) {
        let candidate = if upper { entry.to_uppercase() } else { entry.to_lowercase() };
        let result = FuzzyCorrector::default().correct(&candidate, &library_vocabulary(), field);
        prop_assert!(result.accepted);
        prop_assert_eq!(result.corrected.as_str(), entry);
        prop_assert_eq!(result.score, 1.0);
    }

    #[test]
    fn corrections_come_from_vocabulary(candidate in "[A-Za-z .'-]{0,24}", field in arb_field()) {
        let vocabulary = library_vocabulary();
        let result = FuzzyCorrector::default().correct(&candidate, &vocabulary, field);

        prop_assert!((0.0..=1.0).contains(&result.score));
        if result.accepted {
            prop_assert!(vocabulary.entries(field).contains(&result.corrected));
            prop_assert!(result.score >= CorrectionPolicy::default().threshold(field));
        } else {
            prop_assert_eq!(&result.corrected, &candidate);
            prop_assert_eq!(result.value(), candidate.as_str());
        }
    }

    #[test]
    fn empty_vocabulary_never_corrects(candidate in "\\PC{0,24}", field in arb_field()) {
        let result = FuzzyCorrector::default().correct(&candidate, &ReferenceVocabulary::empty(), field);
        prop_assert!(!result.accepted);
        prop_assert!(!result.changed());
    }
}

#[test]
fn test_hirenn_corrects_to_hiren_patel() {
    let result = FuzzyCorrector::default().correct("hirenn", &library_vocabulary(), VocabularyField::Author);
    assert!(result.accepted);
    assert_eq!(result.corrected, "Hiren Patel");
}

#[test]
fn test_xyz123_is_left_alone() {
    let result = FuzzyCorrector::default().correct("xyz123", &library_vocabulary(), VocabularyField::Author);
    assert!(!result.accepted);
    assert_eq!(result.corrected, "xyz123");
}
