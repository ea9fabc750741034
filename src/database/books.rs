//! Book catalog operations
//!
//! Inserts, vocabulary reads and constraint execution. Predicates are
//! interpolated only after validation and rendering; filter values are
//! always bound as parameters.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite};

use crate::core::synthesis::{
    Constraint, FilterSet, ReferenceVocabulary, SynthesisResult, VocabularyError, VocabularySource,
};

use super::render::render_predicate;
use super::{CatalogError, Database, Result};

const BOOK_COLUMNS: &str =
    "id, title, description, isbn, author, genre, published_date, created_at";

/// Columns a keyword is matched against.
const KEYWORD_COLUMNS: &[&str] = &["title", "description", "author", "genre"];

/// Default page size for searches.
pub const DEFAULT_SEARCH_LIMIT: u32 = 10;

// ============================================================================
// Records
// ============================================================================

/// Book database record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct BookRecord {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub isbn: String,
    pub author: String,
    pub genre: String,
    pub published_date: String, // YYYY-MM-DD
    pub created_at: String,
}

/// A book to insert, as found in import files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBook {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub isbn: String,
    pub author: String,
    pub genre: String,
    pub published_date: NaiveDate,
}

impl NewBook {
    /// Reject blank required fields.
    pub fn check(&self) -> Result<()> {
        for (field, value) in [
            ("title", &self.title),
            ("isbn", &self.isbn),
            ("author", &self.author),
            ("genre", &self.genre),
        ] {
            if value.trim().is_empty() {
                return Err(CatalogError::InvalidBook(format!("'{field}' must not be empty")));
            }
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn sample(isbn: &str) -> Self {
        Self {
            title: "Sample".to_string(),
            description: String::new(),
            isbn: isbn.to_string(),
            author: "Sample Author".to_string(),
            genre: "Fiction".to_string(),
            published_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default(),
        }
    }
}

/// Outcome of a bulk import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub inserted: usize,
    /// Rows whose ISBN was already present.
    pub skipped: usize,
}

// ============================================================================
// Search options
// ============================================================================

/// Listing order by insertion time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    pub limit: u32,
    pub offset: u32,
    pub order: SortOrder,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_SEARCH_LIMIT,
            offset: 0,
            order: SortOrder::Desc,
        }
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchPage {
    pub books: Vec<BookRecord>,
    /// Offset of the next page, if there is one.
    pub next_offset: Option<u32>,
}

// ============================================================================
// Operations
// ============================================================================

/// Extension trait for book catalog operations
pub trait BookOps {
    fn insert_book(&self, book: &NewBook) -> impl std::future::Future<Output = Result<i64>> + Send;
    fn import_books(&self, json: &str) -> impl std::future::Future<Output = Result<ImportSummary>> + Send;
    fn count_books(&self) -> impl std::future::Future<Output = Result<i64>> + Send;
    fn distinct_authors(&self) -> impl std::future::Future<Output = Result<Vec<String>>> + Send;
    fn distinct_genres(&self) -> impl std::future::Future<Output = Result<Vec<String>>> + Send;
    fn search(
        &self,
        result: &SynthesisResult,
        options: SearchOptions,
    ) -> impl std::future::Future<Output = Result<SearchPage>> + Send;
}

impl BookOps for Database {
    async fn insert_book(&self, book: &NewBook) -> Result<i64> {
        book.check()?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO books (title, description, isbn, author, genre, published_date)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(book.title.trim())
        .bind(book.description.trim())
        .bind(book.isbn.trim())
        .bind(book.author.trim())
        .bind(book.genre.trim())
        .bind(book.published_date.format("%Y-%m-%d").to_string())
        .execute(self.pool())
        .await;

        match inserted {
            Ok(done) => Ok(done.last_insert_rowid()),
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
                Err(CatalogError::DuplicateIsbn(book.isbn.trim().to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn import_books(&self, json: &str) -> Result<ImportSummary> {
        let books: Vec<NewBook> = serde_json::from_str(json)?;
        for book in &books {
            book.check()?;
        }

        let mut summary = ImportSummary::default();
        let mut tx = self.pool().begin().await?;
        for book in &books {
            let done = sqlx::query(
                r#"
                INSERT OR IGNORE INTO books (title, description, isbn, author, genre, published_date)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(book.title.trim())
            .bind(book.description.trim())
            .bind(book.isbn.trim())
            .bind(book.author.trim())
            .bind(book.genre.trim())
            .bind(book.published_date.format("%Y-%m-%d").to_string())
            .execute(&mut *tx)
            .await?;

            if done.rows_affected() == 0 {
                log::warn!("Skipping duplicate ISBN {}", book.isbn.trim());
                summary.skipped += 1;
            } else {
                summary.inserted += 1;
            }
        }
        tx.commit().await?;

        log::info!(
            "Imported {} books ({} duplicates skipped)",
            summary.inserted,
            summary.skipped
        );
        Ok(summary)
    }

    async fn count_books(&self) -> Result<i64> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(self.pool())
            .await?)
    }

    async fn distinct_authors(&self) -> Result<Vec<String>> {
        Ok(sqlx::query_scalar(
            "SELECT DISTINCT author FROM books WHERE TRIM(author) <> '' ORDER BY author",
        )
        .fetch_all(self.pool())
        .await?)
    }

    async fn distinct_genres(&self) -> Result<Vec<String>> {
        Ok(sqlx::query_scalar(
            "SELECT DISTINCT genre FROM books WHERE TRIM(genre) <> '' ORDER BY genre",
        )
        .fetch_all(self.pool())
        .await?)
    }

    async fn search(&self, result: &SynthesisResult, options: SearchOptions) -> Result<SearchPage> {
        let mut query = QueryBuilder::<Sqlite>::new(format!("SELECT {BOOK_COLUMNS} FROM books"));

        match &result.constraint {
            Constraint::Predicate(predicate) => {
                let rendered = render_predicate(predicate)?;
                query.push(" WHERE (").push(rendered).push(")");
            }
            Constraint::Filters(filters) => push_filters(&mut query, filters),
            Constraint::None => {}
        }

        let limit = options.limit.max(1);
        query
            .push(" ORDER BY created_at ")
            .push(options.order.as_sql())
            .push(", id ")
            .push(options.order.as_sql())
            .push(" LIMIT ")
            .push_bind(i64::from(limit) + 1)
            .push(" OFFSET ")
            .push_bind(i64::from(options.offset));

        let mut books: Vec<BookRecord> = query.build_query_as().fetch_all(self.pool()).await?;

        let next_offset = if books.len() > limit as usize {
            books.truncate(limit as usize);
            Some(options.offset + limit)
        } else {
            None
        };

        log::info!(
            "Search via {} returned {} books",
            result.method,
            books.len()
        );
        Ok(SearchPage { books, next_offset })
    }
}

/// Escape `LIKE` wildcards so a filter value matches literally.
fn like_pattern(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    escaped.push('%');
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Filter sets: structured keys AND-ed, keywords OR-ed across text columns.
fn push_filters(query: &mut QueryBuilder<'_, Sqlite>, filters: &FilterSet) {
    let mut clause = " WHERE ";

    if let Some(author) = filters.author() {
        query
            .push(clause)
            .push("author LIKE ")
            .push_bind(like_pattern(author))
            .push(" ESCAPE '\\'");
        clause = " AND ";
    }
    if let Some(genre) = filters.genre() {
        query
            .push(clause)
            .push("genre LIKE ")
            .push_bind(like_pattern(genre))
            .push(" ESCAPE '\\'");
        clause = " AND ";
    }
    if let Some(year) = filters.published_year() {
        query
            .push(clause)
            .push("CAST(strftime('%Y', published_date) AS INTEGER) = ")
            .push_bind(year);
        clause = " AND ";
    }

    let keywords = filters.keywords();
    if !keywords.is_empty() {
        query.push(clause).push("(");
        for (i, keyword) in keywords.iter().enumerate() {
            if i > 0 {
                query.push(" OR ");
            }
            for (j, column) in KEYWORD_COLUMNS.iter().enumerate() {
                query
                    .push(if j == 0 { "" } else { " OR " })
                    .push(*column)
                    .push(" LIKE ")
                    .push_bind(like_pattern(keyword))
                    .push(" ESCAPE '\\'");
            }
        }
        query.push(")");
    }
}

#[async_trait]
impl VocabularySource for Database {
    async fn reference_vocabulary(&self) -> std::result::Result<ReferenceVocabulary, VocabularyError> {
        let authors = self
            .distinct_authors()
            .await
            .map_err(|e| VocabularyError(e.to_string()))?;
        let genres = self
            .distinct_genres()
            .await
            .map_err(|e| VocabularyError(e.to_string()))?;
        Ok(ReferenceVocabulary::new(authors, genres))
    }
}
