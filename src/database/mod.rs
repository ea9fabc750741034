//! SQLite Database Module
//!
//! Book catalog storage: the executor for synthesized constraints and the
//! source of the reference vocabulary.

mod books;
mod migrations;
mod render;
mod search;

pub use books::{BookOps, BookRecord, ImportSummary, NewBook, SearchOptions, SearchPage, SortOrder};
pub use migrations::run_migrations;
pub use render::render_predicate;
pub use search::{search_catalog, CatalogSearch, SearchError};

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use thiserror::Error;

/// Catalog file name inside the data directory.
pub const DATABASE_FILE: &str = "catalog.db";

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Failed to create data directory {path}: {source}")]
    DataDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("A book with ISBN {0} already exists")]
    DuplicateIsbn(String),

    #[error("Invalid book: {0}")]
    InvalidBook(String),

    #[error("Invalid import file: {0}")]
    InvalidImport(#[from] serde_json::Error),

    #[error("Predicate cannot be rendered for SQLite: {0}")]
    UnsupportedPredicate(String),
}

pub type Result<T> = std::result::Result<T, CatalogError>;

/// Database connection pool
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
    path: PathBuf,
}

impl Database {
    /// Open (or create) the catalog in `data_dir` and run migrations.
    pub async fn new(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir).map_err(|source| CatalogError::DataDir {
            path: data_dir.to_path_buf(),
            source,
        })?;
        let db_path = data_dir.join(DATABASE_FILE);

        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .min_connections(1)
            .connect_with(options)
            .await?;

        log::info!("Opened catalog at {}", db_path.display());
        Self::migrated(pool, db_path).await
    }

    /// Private in-memory catalog on a single connection.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

        // Every connection to :memory: is a separate database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Self::migrated(pool, PathBuf::from(":memory:")).await
    }

    async fn migrated(pool: SqlitePool, path: PathBuf) -> Result<Self> {
        migrations::run_migrations(&pool).await?;
        Ok(Self { pool, path })
    }

    /// Get the underlying pool for direct queries
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Get database file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
