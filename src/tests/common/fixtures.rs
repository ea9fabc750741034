//! Test Fixtures
//!
//! Provides a scripted generator, sample vocabularies and seeded test
//! catalogs.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use tempfile::TempDir;

use crate::core::synthesis::{
    GenerationConstraints, GenerationKind, Generator, GeneratorError, QueryDispatcher,
    ReferenceVocabulary,
};
use crate::database::{BookOps, Database, NewBook};

// =============================================================================
// Scripted Generator
// =============================================================================

/// What the scripted generator answers for one path.
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Fail(GeneratorError),
}

impl Reply {
    pub fn text(text: &str) -> Self {
        Reply::Text(text.to_string())
    }

    pub fn outage() -> Self {
        Reply::Fail(GeneratorError::Upstream("503 Service Unavailable".to_string()))
    }
}

/// Deterministic generator answering per path and recording every call.
pub struct ScriptedGenerator {
    sql: Reply,
    filters: Reply,
    calls: Mutex<Vec<(GenerationKind, String)>>,
}

impl ScriptedGenerator {
    pub fn new(sql: Reply, filters: Reply) -> Self {
        Self {
            sql,
            filters,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Path kinds in call order.
    pub fn calls(&self) -> Vec<GenerationKind> {
        self.calls
            .lock()
            .map(|calls| calls.iter().map(|(kind, _)| *kind).collect())
            .unwrap_or_default()
    }

    /// Prompts in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.calls
            .lock()
            .map(|calls| calls.iter().map(|(_, prompt)| prompt.clone()).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(
        &self,
        prompt: &str,
        constraints: &GenerationConstraints,
    ) -> Result<String, GeneratorError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((constraints.kind, prompt.to_string()));
        }
        let reply = match constraints.kind {
            GenerationKind::SqlFragment => &self.sql,
            GenerationKind::FilterSet => &self.filters,
        };
        match reply {
            Reply::Text(text) => Ok(text.clone()),
            Reply::Fail(err) => Err(err.clone()),
        }
    }
}

/// Dispatcher over a scripted generator, returning both.
pub fn scripted_dispatcher(sql: Reply, filters: Reply) -> (QueryDispatcher, Arc<ScriptedGenerator>) {
    let generator = Arc::new(ScriptedGenerator::new(sql, filters));
    (QueryDispatcher::new(generator.clone()), generator)
}

// =============================================================================
// Vocabulary Fixtures
// =============================================================================

pub const LIBRARY_AUTHORS: &[&str] = &[
    "Agatha Christie",
    "Hiren Patel",
    "J.K. Rowling",
    "Stephen King",
    "Tim O'Brien",
];

pub const LIBRARY_GENRES: &[&str] = &["Fantasy", "Fiction", "Horror", "Mystery", "Romance", "Sci-Fi"];

pub fn library_vocabulary() -> ReferenceVocabulary {
    ReferenceVocabulary::new(LIBRARY_AUTHORS.iter().copied(), LIBRARY_GENRES.iter().copied())
}

// =============================================================================
// Database Fixtures
// =============================================================================

/// Create a test database in a temporary directory.
/// Returns both the database and the TempDir (which must be kept alive).
pub async fn create_test_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let db = Database::new(temp_dir.path())
        .await
        .expect("Failed to create test database");
    (db, temp_dir)
}

pub fn book(title: &str, author: &str, genre: &str, date: (i32, u32, u32), isbn: &str) -> NewBook {
    NewBook {
        title: title.to_string(),
        description: format!("{title} by {author}"),
        isbn: isbn.to_string(),
        author: author.to_string(),
        genre: genre.to_string(),
        published_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).expect("valid date"),
    }
}

/// A small catalog covering every vocabulary entry.
pub fn library_books() -> Vec<NewBook> {
    vec![
        book("It", "Stephen King", "Horror", (1986, 9, 15), "978-0000000001"),
        book("The Shining", "Stephen King", "Horror", (1977, 1, 28), "978-0000000002"),
        book("Murder on the Orient Express", "Agatha Christie", "Mystery", (1934, 1, 1), "978-0000000003"),
        book("Harry Potter and the Philosopher's Stone", "J.K. Rowling", "Fantasy", (1997, 6, 26), "978-0000000004"),
        book("The Things They Carried", "Tim O'Brien", "Fiction", (1990, 3, 28), "978-0000000005"),
        book("Deep Sea Colony", "Hiren Patel", "Sci-Fi", (2020, 4, 2), "978-0000000006"),
        book("Quiet Harbor", "Hiren Patel", "Fiction", (2020, 11, 19), "978-0000000007"),
        book("Summer Letters", "Hiren Patel", "Romance", (2025, 8, 1), "978-0000000008"),
    ]
}

/// Test database seeded with [`library_books`].
pub async fn create_library_db() -> (Database, TempDir) {
    let (db, temp_dir) = create_test_db().await;
    for book in library_books() {
        db.insert_book(&book).await.expect("Failed to seed book");
    }
    (db, temp_dir)
}
