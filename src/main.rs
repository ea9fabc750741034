//! nlq-catalog CLI: natural-language search over a book catalog.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use miette::{IntoDiagnostic, Result};

use nlq_catalog::config::AppConfig;
use nlq_catalog::core::llm::build_provider;
use nlq_catalog::core::logging;
use nlq_catalog::core::synthesis::{
    FuzzyCorrector, LlmGenerator, PredicateValidator, SynthesisService, VocabularyField,
    VocabularySource,
};
use nlq_catalog::database::{search_catalog, BookOps, CatalogSearch, Database, SearchOptions, SortOrder};

#[derive(Parser)]
#[command(name = "nlq-catalog", version, about = "Natural-language search over a book catalog")]
struct Cli {
    /// Config file (defaults to the XDG config directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data directory holding the catalog database.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Synthesize a constraint for a query and run it against the catalog.
    Search {
        /// Free-text query, e.g. "horror by stephen kng from 1986".
        query: String,

        /// Number of results to return.
        #[arg(long, default_value = "10")]
        limit: u32,

        /// Results to skip.
        #[arg(long, default_value = "0")]
        offset: u32,

        /// Oldest first.
        #[arg(long)]
        asc: bool,

        /// Print the synthesis result and page as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Check a WHERE-clause fragment against the validator.
    Validate {
        fragment: String,
    },

    /// Correct a value against the catalog vocabulary.
    Correct {
        candidate: String,

        #[arg(long, value_enum)]
        field: FieldArg,
    },

    /// Import books from a JSON array file.
    Import {
        file: PathBuf,
    },

    /// Print the effective configuration.
    Config,
}

#[derive(Clone, Copy, ValueEnum)]
enum FieldArg {
    Author,
    Genre,
}

impl From<FieldArg> for VocabularyField {
    fn from(field: FieldArg) -> Self {
        match field {
            FieldArg::Author => VocabularyField::Author,
            FieldArg::Genre => VocabularyField::Genre,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    }
    .into_diagnostic()?;
    if let Some(dir) = cli.data_dir {
        config.data.data_dir = Some(dir);
    }

    let _log_guard = logging::init(&config.logging, &config.data_dir().join("logs")).into_diagnostic()?;
    tracing::debug!("{} v{} starting", nlq_catalog::NAME, nlq_catalog::VERSION);

    match cli.command {
        Commands::Search {
            query,
            limit,
            offset,
            asc,
            json,
        } => {
            let db = Arc::new(Database::new(&config.data_dir()).await.into_diagnostic()?);
            let provider = build_provider(&config.generator).into_diagnostic()?;
            let generator = Arc::new(LlmGenerator::new(provider));
            let service = SynthesisService::new(db.clone(), config.build_dispatcher(generator));

            let options = SearchOptions {
                limit,
                offset,
                order: if asc { SortOrder::Asc } else { SortOrder::Desc },
            };
            let search = search_catalog(&db, &service, &query, options)
                .await
                .into_diagnostic()?;

            if json {
                println!("{}", serde_json::to_string_pretty(&search).into_diagnostic()?);
            } else {
                print_search(&search);
            }
        }

        Commands::Validate { fragment } => {
            let validator = PredicateValidator::with_max_len(config.synthesis.max_fragment_len);
            match validator.validate(&fragment) {
                Ok(predicate) => println!("{predicate}"),
                Err(reason) => miette::bail!("Rejected: {reason}"),
            }
        }

        Commands::Correct { candidate, field } => {
            let db = Database::new(&config.data_dir()).await.into_diagnostic()?;
            let vocabulary = db.reference_vocabulary().await.into_diagnostic()?;
            let corrector = FuzzyCorrector::new(config.synthesis.correction);

            let result = corrector.correct(&candidate, &vocabulary, field.into());
            if result.accepted {
                println!("{} -> {} ({:.2})", result.original, result.corrected, result.score);
            } else {
                println!("{} (no match, best score {:.2})", result.original, result.score);
            }
        }

        Commands::Import { file } => {
            let db = Database::new(&config.data_dir()).await.into_diagnostic()?;
            let content = std::fs::read_to_string(&file).into_diagnostic()?;
            let summary = db.import_books(&content).await.into_diagnostic()?;
            println!(
                "Imported {} books into {} ({} duplicates skipped)",
                summary.inserted,
                db.path().display(),
                summary.skipped
            );
        }

        Commands::Config => {
            println!("# {}", AppConfig::config_path().display());
            println!("# catalog: {}", config.database_path().display());
            print!("{}", config.to_toml().into_diagnostic()?);
        }
    }

    Ok(())
}

fn print_search(search: &CatalogSearch) {
    let (result, page) = (&search.synthesis, &search.page);
    println!("Method: {}", result.method);
    if let Some(predicate) = result.predicate() {
        println!("Predicate: {predicate}");
    }
    if let Some(filters) = result.filters() {
        if let Ok(rendered) = serde_json::to_string(filters) {
            println!("Filters: {rendered}");
        }
    }
    if let Some(reason) = result.fallback_reason {
        println!("Fallback: {reason}");
    }
    for correction in &result.corrections {
        println!("Corrected: {} -> {}", correction.original, correction.corrected);
    }
    println!();

    if page.books.is_empty() {
        println!("No books found.");
    }
    for book in &page.books {
        println!(
            "{:>5}  {}  {} ({}, {}) [{}]",
            book.id, book.title, book.author, book.genre, book.published_date, book.isbn
        );
    }
    if let Some(next) = page.next_offset {
        println!("\nMore results: --offset {next}");
    }
}
