//! Natural-language search
//!
//! Synthesis followed by execution. A predicate the catalog refuses to run
//! is replaced by a filter-path synthesis of the same query.

use serde::Serialize;
use thiserror::Error;

use crate::core::synthesis::{Constraint, SynthesisError, SynthesisResult, SynthesisService};

use super::books::{BookOps, SearchOptions, SearchPage};
use super::{CatalogError, Database};

#[derive(Error, Debug)]
pub enum SearchError {
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// The constraint that was executed and the page it produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogSearch {
    pub synthesis: SynthesisResult,
    pub page: SearchPage,
}

/// Synthesize a constraint for `query` and run it against `db`.
pub async fn search_catalog(
    db: &Database,
    service: &SynthesisService,
    query: &str,
    options: SearchOptions,
) -> Result<CatalogSearch, SearchError> {
    let synthesis = service.synthesize(query).await?;

    match db.search(&synthesis, options).await {
        Ok(page) => Ok(CatalogSearch { synthesis, page }),
        Err(err) if is_predicate_failure(&synthesis, &err) => {
            log::warn!("Predicate failed to execute ({err}), retrying with filters");
            let fallback = service
                .synthesize_filters(query, SynthesisError::ExecutionFailed(err.to_string()))
                .await?;
            let page = db.search(&fallback, options).await?;
            Ok(CatalogSearch {
                synthesis: fallback,
                page,
            })
        }
        Err(err) => Err(err.into()),
    }
}

/// Errors caused by the predicate text rather than the connection.
fn is_predicate_failure(synthesis: &SynthesisResult, err: &CatalogError) -> bool {
    matches!(synthesis.constraint, Constraint::Predicate(_))
        && matches!(
            err,
            CatalogError::UnsupportedPredicate(_) | CatalogError::Database(sqlx::Error::Database(_))
        )
}
