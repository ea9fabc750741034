//! End-to-end synthesis scenarios
//!
//! Each case scripts the generator's replies and checks the dispatcher's
//! final result.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rstest::rstest;

use crate::core::synthesis::{
    Constraint, DispatchSettings, FallbackReason, GenerationConstraints, GenerationKind,
    Generator, GeneratorError, QueryDispatcher, SynthesisMethod,
};
use crate::tests::common::{library_vocabulary, scripted_dispatcher, Reply};

// =============================================================================
// Core Scenarios
// =============================================================================

#[tokio::test]
async fn test_fiction_from_2020_passes_through_unchanged() {
    let fragment = "(genre ILIKE '%fiction%') AND EXTRACT(YEAR FROM published_date) = 2020";
    let (dispatcher, generator) = scripted_dispatcher(Reply::text(fragment), Reply::text("{}"));

    let result = dispatcher
        .dispatch("fiction books from 2020", &library_vocabulary())
        .await
        .expect("dispatch failed");

    assert_eq!(result.method, SynthesisMethod::SqlWhereClause);
    assert_eq!(result.predicate().map(|p| p.as_str()), Some(fragment));
    assert!(result.corrections.is_empty());
    assert!(!result.fallback_used);
    assert_eq!(result.resolved_query_text, "fiction books from 2020");
    assert_eq!(generator.calls(), vec![GenerationKind::SqlFragment]);
}

#[tokio::test]
async fn test_books_by_hirenn_is_corrected_in_place() {
    let (dispatcher, _generator) =
        scripted_dispatcher(Reply::text("author ILIKE '%hirenn%'"), Reply::text("{}"));

    let result = dispatcher
        .dispatch("books by hirenn", &library_vocabulary())
        .await
        .expect("dispatch failed");

    assert_eq!(result.method, SynthesisMethod::SqlWhereClause);
    assert_eq!(
        result.predicate().map(|p| p.as_str()),
        Some("author ILIKE '%Hiren Patel%'")
    );
    assert_eq!(result.corrections.len(), 1);
    assert_eq!(result.corrections[0].original, "hirenn");
    assert_eq!(result.corrections[0].corrected, "Hiren Patel");
}

#[tokio::test]
async fn test_injection_falls_back_to_filters() {
    let (dispatcher, generator) = scripted_dispatcher(
        Reply::text("title = 'x'; DROP TABLE books;--"),
        Reply::text(r#"{"genre": "horror", "search_query": "haunted hotel"}"#),
    );

    let result = dispatcher
        .dispatch("scary hotel books", &library_vocabulary())
        .await
        .expect("dispatch failed");

    assert_eq!(result.method, SynthesisMethod::FilterExtraction);
    assert!(result.fallback_used);
    assert_eq!(result.fallback_reason, Some(FallbackReason::ValidationFailed));
    assert!(result.predicate().is_none());

    let filters = result.filters().expect("filters");
    assert_eq!(filters.genre(), Some("Horror"));
    assert_eq!(filters.keywords(), vec!["haunted", "hotel"]);
    assert_eq!(
        generator.calls(),
        vec![GenerationKind::SqlFragment, GenerationKind::FilterSet]
    );
}

// =============================================================================
// Wrapper Cleanup
// =============================================================================

#[rstest]
#[case::sql_fence("```sql\ntitle ILIKE '%dune%'\n```")]
#[case::bare_fence("```\ntitle ILIKE '%dune%'\n```")]
#[case::where_prefix("WHERE title ILIKE '%dune%'")]
#[case::fenced_where("```sql\nwhere title ILIKE '%dune%'\n```")]
#[case::padded("  title   ILIKE '%dune%'  ")]
#[tokio::test]
async fn test_wrappers_are_stripped(#[case] reply: &str) {
    let (dispatcher, _generator) = scripted_dispatcher(Reply::text(reply), Reply::text("{}"));

    let result = dispatcher
        .dispatch("dune books", &library_vocabulary())
        .await
        .expect("dispatch failed");

    assert_eq!(result.method, SynthesisMethod::SqlWhereClause);
    assert_eq!(
        result.predicate().map(|p| p.as_str()),
        Some("title ILIKE '%dune%'")
    );
}

// =============================================================================
// Fallback Reasons
// =============================================================================

#[rstest]
#[case::rejected(Reply::text("password = 'x'"), FallbackReason::ValidationFailed)]
#[case::timeout(
    Reply::Fail(GeneratorError::Timeout(Duration::from_secs(20))),
    FallbackReason::Timeout
)]
#[case::quota(
    Reply::Fail(GeneratorError::QuotaExceeded("429".to_string())),
    FallbackReason::QuotaExceeded
)]
#[case::upstream(Reply::outage(), FallbackReason::GeneratorUnavailable)]
#[case::empty(Reply::text("```\n```"), FallbackReason::MalformedResponse)]
#[tokio::test]
async fn test_fallback_reason_is_recorded(#[case] sql: Reply, #[case] expected: FallbackReason) {
    let (dispatcher, _generator) =
        scripted_dispatcher(sql, Reply::text(r#"{"author": "stephen kng"}"#));

    let result = dispatcher
        .dispatch("stephen king novels", &library_vocabulary())
        .await
        .expect("dispatch failed");

    assert_eq!(result.method, SynthesisMethod::FilterExtraction);
    assert_eq!(result.fallback_reason, Some(expected));
    assert_eq!(
        result.filters().and_then(|f| f.author()),
        Some("Stephen King")
    );
}

#[rstest]
#[case::malformed_json(Reply::text("```json\n{\"author\": }\n```"))]
#[case::unknown_key(Reply::text(r#"{"rating": 5}"#))]
#[case::nothing_extracted(Reply::text(r#"{"author": null}"#))]
#[tokio::test]
async fn test_both_paths_failing_is_none(#[case] filters: Reply) {
    let (dispatcher, _generator) = scripted_dispatcher(Reply::text("SELECT 1"), filters);

    let result = dispatcher
        .dispatch("anything at all", &library_vocabulary())
        .await
        .expect("dispatch failed");

    assert_eq!(result.method, SynthesisMethod::None);
    assert_eq!(result.constraint, Constraint::None);
    assert!(result.fallback_used);
}

#[tokio::test]
async fn test_full_outage_is_surfaced() {
    let (dispatcher, generator) = scripted_dispatcher(Reply::outage(), Reply::outage());

    let err = dispatcher
        .dispatch("anything at all", &library_vocabulary())
        .await
        .unwrap_err();

    assert!(err.is_generator_outage());
    assert_eq!(generator.calls().len(), 2);
}

// =============================================================================
// Timeouts
// =============================================================================

/// Never answers the SQL path; answers filters immediately.
struct StalledSql;

#[async_trait]
impl Generator for StalledSql {
    async fn generate(
        &self,
        _prompt: &str,
        constraints: &GenerationConstraints,
    ) -> Result<String, GeneratorError> {
        match constraints.kind {
            GenerationKind::SqlFragment => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok("title = 'late'".to_string())
            }
            GenerationKind::FilterSet => Ok(r#"{"genre": "fantasy"}"#.to_string()),
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_stalled_generator_times_out_into_fallback() {
    let timeout = Duration::from_secs(5);
    let settings = DispatchSettings {
        sql: GenerationConstraints::sql_fragment().with_timeout(timeout),
        filters: GenerationConstraints::filter_set().with_timeout(timeout),
        ..DispatchSettings::default()
    };
    let dispatcher = QueryDispatcher::new(Arc::new(StalledSql)).with_settings(settings);

    let result = dispatcher
        .dispatch("wizard books", &library_vocabulary())
        .await
        .expect("dispatch failed");

    assert_eq!(result.method, SynthesisMethod::FilterExtraction);
    assert_eq!(result.fallback_reason, Some(FallbackReason::Timeout));
    assert_eq!(result.filters().and_then(|f| f.genre()), Some("Fantasy"));
}

// =============================================================================
// Prompts
// =============================================================================

#[tokio::test]
async fn test_prompts_carry_query_and_vocabulary() {
    let (dispatcher, generator) =
        scripted_dispatcher(Reply::text("SELECT 1"), Reply::text(r#"{"genre": "mystery"}"#));

    dispatcher
        .dispatch("whodunnit \"classics\"", &library_vocabulary())
        .await
        .expect("dispatch failed");

    let prompts = generator.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[0].contains(r#""whodunnit \"classics\"""#));
    assert!(prompts[1].contains("Romance"));
}
