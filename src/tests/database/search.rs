//! Catalog Search Tests
//!
//! Synthesis plus execution, including the retry through the filter path
//! when a predicate fails inside SQLite.

use std::sync::Arc;

use crate::core::synthesis::validator::rules::NonEmpty;
use crate::core::synthesis::{
    FallbackReason, GenerationKind, PredicateValidator, QueryDispatcher, SynthesisMethod,
    SynthesisService,
};
use crate::database::{search_catalog, SearchOptions};
use crate::tests::common::{create_library_db, Reply, ScriptedGenerator};

const TRUNCATED: &str = "(title ILIKE '%shining%' OR description ILIKE '%shining%') AND";

fn titles(search: &crate::database::CatalogSearch) -> Vec<&str> {
    let mut titles: Vec<&str> = search.page.books.iter().map(|b| b.title.as_str()).collect();
    titles.sort_unstable();
    titles
}

#[tokio::test]
async fn test_predicate_executes_directly() {
    let (db, _temp) = create_library_db().await;
    let generator = Arc::new(ScriptedGenerator::new(
        Reply::text("title ILIKE '%shining%'"),
        Reply::text("{}"),
    ));
    let service = SynthesisService::new(
        Arc::new(db.clone()),
        QueryDispatcher::new(generator.clone()),
    );

    let search = search_catalog(&db, &service, "the shining", SearchOptions::default())
        .await
        .expect("search failed");

    assert_eq!(search.synthesis.method, SynthesisMethod::SqlWhereClause);
    assert_eq!(titles(&search), vec!["The Shining"]);
    assert_eq!(generator.calls(), vec![GenerationKind::SqlFragment]);
}

#[tokio::test]
async fn test_truncated_predicate_never_reaches_sqlite() {
    let (db, _temp) = create_library_db().await;
    let generator = Arc::new(ScriptedGenerator::new(
        Reply::text(TRUNCATED),
        Reply::text(r#"{"author": "stephen kng"}"#),
    ));
    let service = SynthesisService::new(
        Arc::new(db.clone()),
        QueryDispatcher::new(generator.clone()),
    );

    let search = search_catalog(&db, &service, "the shining", SearchOptions::default())
        .await
        .expect("search failed");

    assert_eq!(search.synthesis.method, SynthesisMethod::FilterExtraction);
    assert_eq!(
        search.synthesis.fallback_reason,
        Some(FallbackReason::ValidationFailed)
    );
    assert_eq!(titles(&search), vec!["It", "The Shining"]);
}

#[tokio::test]
async fn test_execution_failure_retries_with_filters() {
    let (db, _temp) = create_library_db().await;
    let generator = Arc::new(ScriptedGenerator::new(
        Reply::text(TRUNCATED),
        Reply::text(r#"{"author": "stephen kng"}"#),
    ));
    // Only the emptiness check, so the malformed predicate gets to SQLite
    let dispatcher = QueryDispatcher::new(generator.clone())
        .with_validator(PredicateValidator::with_rules(vec![Box::new(NonEmpty)]));
    let service = SynthesisService::new(Arc::new(db.clone()), dispatcher);

    let first = service.synthesize("the shining").await.expect("synthesis failed");
    assert_eq!(first.method, SynthesisMethod::SqlWhereClause);

    let search = search_catalog(&db, &service, "the shining", SearchOptions::default())
        .await
        .expect("search failed");

    assert_eq!(search.synthesis.method, SynthesisMethod::FilterExtraction);
    assert!(search.synthesis.fallback_used);
    assert_eq!(
        search.synthesis.fallback_reason,
        Some(FallbackReason::ExecutionFailed)
    );
    assert_eq!(search.synthesis.filters().and_then(|f| f.author()), Some("Stephen King"));
    assert_eq!(titles(&search), vec!["It", "The Shining"]);
    assert_eq!(
        generator.calls(),
        vec![
            GenerationKind::SqlFragment,
            GenerationKind::SqlFragment,
            GenerationKind::FilterSet,
        ]
    );
}
