//! Synthesis Service Tests
//!
//! The service reads its vocabulary from a live catalog on every request.

use std::sync::Arc;

use crate::core::synthesis::{SynthesisMethod, SynthesisService};
use crate::database::{BookOps, SearchOptions};
use crate::tests::common::{book, create_library_db, create_test_db, scripted_dispatcher, Reply};

#[tokio::test]
async fn test_new_authors_are_visible_to_the_next_request() {
    let (db, _temp) = create_test_db().await;
    let (dispatcher, _generator) =
        scripted_dispatcher(Reply::text("author ILIKE '%hirenn%'"), Reply::text("{}"));
    let service = SynthesisService::new(Arc::new(db.clone()), dispatcher);

    let before = service.synthesize("books by hirenn").await.expect("synthesis failed");
    assert_eq!(
        before.predicate().map(|p| p.as_str()),
        Some("author ILIKE '%hirenn%'")
    );
    assert!(before.corrections.is_empty());

    db.insert_book(&book("Quiet Harbor", "Hiren Patel", "Fiction", (2020, 11, 19), "978-7"))
        .await
        .expect("Failed to insert");

    let after = service.synthesize("books by hirenn").await.expect("synthesis failed");
    assert_eq!(
        after.predicate().map(|p| p.as_str()),
        Some("author ILIKE '%Hiren Patel%'")
    );
    assert_eq!(after.corrections.len(), 1);
}

#[tokio::test]
async fn test_corrected_predicate_finds_books() {
    let (db, _temp) = create_library_db().await;
    let (dispatcher, _generator) =
        scripted_dispatcher(Reply::text("author ILIKE '%hirenn%'"), Reply::text("{}"));
    let service = SynthesisService::new(Arc::new(db.clone()), dispatcher);

    let result = service.synthesize("books by hirenn").await.expect("synthesis failed");
    let page = db
        .search(&result, SearchOptions::default())
        .await
        .expect("search failed");

    assert_eq!(page.books.len(), 3);
    assert!(page.books.iter().all(|b| b.author == "Hiren Patel"));
}

#[tokio::test]
async fn test_fallback_filters_find_books() {
    let (db, _temp) = create_library_db().await;
    let (dispatcher, _generator) = scripted_dispatcher(
        Reply::text("title = 'x'; DROP TABLE books;--"),
        Reply::text(r#"{"genre": "horor", "published_year": 1977}"#),
    );
    let service = SynthesisService::new(Arc::new(db.clone()), dispatcher);

    let result = service.synthesize("scary books from 1977").await.expect("synthesis failed");
    assert_eq!(result.method, SynthesisMethod::FilterExtraction);
    assert_eq!(result.filters().and_then(|f| f.genre()), Some("Horror"));

    let page = db
        .search(&result, SearchOptions::default())
        .await
        .expect("search failed");
    assert_eq!(page.books.len(), 1);
    assert_eq!(page.books[0].title, "The Shining");
    assert_eq!(db.count_books().await.unwrap(), 8);
}

#[tokio::test]
async fn test_none_result_lists_the_catalog() {
    let (db, _temp) = create_library_db().await;
    let (dispatcher, _generator) =
        scripted_dispatcher(Reply::text("SELECT 1"), Reply::text("{}"));
    let service = SynthesisService::new(Arc::new(db.clone()), dispatcher);

    let result = service.synthesize("surprise me").await.expect("synthesis failed");
    assert_eq!(result.method, SynthesisMethod::None);

    let page = db
        .search(&result, SearchOptions { limit: 20, ..SearchOptions::default() })
        .await
        .expect("search failed");
    assert_eq!(page.books.len(), 8);
    assert_eq!(page.next_offset, None);
}
