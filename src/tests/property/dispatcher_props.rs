//! Property-based tests for the Query Synthesis Dispatcher
//!
//! Tests invariants:
//! - If the SQL fragment is rejected, the method is never `sql_where_clause`
//! - If both paths fail validation, the result is `none` with no constraint
//! - Each path calls the generator at most once (no retries)

use proptest::prelude::*;

use crate::core::synthesis::validator::rules::DENIED_KEYWORDS;
use crate::core::synthesis::{Constraint, GenerationKind, SynthesisMethod, SynthesisResult};
use crate::tests::common::{library_vocabulary, scripted_dispatcher, Reply};

// ============================================================================
// Strategies
// ============================================================================

/// SQL replies the validator must reject.
fn arb_rejected_sql() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z ]{0,20}".prop_map(|s| format!("title = '{s}'; DROP TABLE books")),
        prop::sample::select(DENIED_KEYWORDS).prop_map(|k| format!("author ILIKE '%x%' {k} books")),
        "[a-z]{1,10}".prop_map(|s| format!("title = '{s}' -- tail")),
        Just("author IN (SELECT author FROM books)".to_string()),
        Just("password = 'x'".to_string()),
        Just("SELECT * FROM books".to_string()),
        Just(String::new()),
    ]
}

/// Filter replies that fail parsing or the key whitelist.
fn arb_malformed_filters() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("not json".to_string()),
        Just("[]".to_string()),
        Just(r#"{"shelf": "A"}"#.to_string()),
        Just(r#"{"author": 42}"#.to_string()),
        Just(r#"{"published_year": 99}"#.to_string()),
        Just("{}".to_string()),
    ]
}

/// Filter replies of any quality.
fn arb_any_filters() -> impl Strategy<Value = String> {
    prop_oneof![
        arb_malformed_filters(),
        Just(r#"{"genre": "horror"}"#.to_string()),
        Just(r#"{"author": "stephen kng", "published_year": 1986}"#.to_string()),
        Just(r#"{"search_query": "haunted hotel"}"#.to_string()),
    ]
}

fn dispatch(sql: String, filters: String) -> (SynthesisResult, Vec<GenerationKind>) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime");
    let (dispatcher, generator) = scripted_dispatcher(Reply::Text(sql), Reply::Text(filters));
    let result = runtime
        .block_on(dispatcher.dispatch("scary books from the eighties", &library_vocabulary()))
        .expect("non-outage failures never surface as errors");
    (result, generator.calls())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn rejected_sql_never_yields_sql_method(sql in arb_rejected_sql(), filters in arb_any_filters()) {
        let (result, _) = dispatch(sql, filters);
        prop_assert_ne!(result.method, SynthesisMethod::SqlWhereClause);
        prop_assert!(result.predicate().is_none());
        prop_assert!(result.fallback_used);
    }

    #[test]
    fn both_failures_yield_none(sql in arb_rejected_sql(), filters in arb_malformed_filters()) {
        let (result, _) = dispatch(sql, filters);
        prop_assert_eq!(result.method, SynthesisMethod::None);
        prop_assert_eq!(result.constraint, Constraint::None);
        prop_assert!(result.corrections.is_empty());
    }

    #[test]
    fn generator_is_called_at_most_once_per_path(sql in arb_rejected_sql(), filters in arb_any_filters()) {
        let (_, calls) = dispatch(sql, filters);
        prop_assert_eq!(calls, vec![GenerationKind::SqlFragment, GenerationKind::FilterSet]);
    }
}
