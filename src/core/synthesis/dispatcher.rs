//! Query Synthesis Dispatcher
//!
//! Runs the SQL predicate path, falls back to filter extraction on any
//! failure, and reports an explicit "no constraint" result when both fail.
//! Each dispatch is one pass through [`DispatchState`]; there are no retries.

use std::sync::Arc;

use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

use super::error::{Result, SynthesisError};
use super::filter_path::{FilterExtractorPath, FilterSet};
use super::fuzzy::{CorrectionResult, FuzzyCorrector, ReferenceVocabulary};
use super::generator::{GenerationConstraints, Generator, GeneratorError};
use super::sql_path::SqlPredicatePath;
use super::validator::{PredicateValidator, ValidatedPredicate};

/// Default bound on natural-language query length, in characters.
pub const DEFAULT_MAX_QUERY_LEN: usize = 500;

/// Which strategy produced the constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SynthesisMethod {
    SqlWhereClause,
    FilterExtraction,
    None,
}

impl SynthesisMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SynthesisMethod::SqlWhereClause => "sql_where_clause",
            SynthesisMethod::FilterExtraction => "filter_extraction",
            SynthesisMethod::None => "none",
        }
    }
}

impl std::fmt::Display for SynthesisMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why the SQL path was abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    ValidationFailed,
    GeneratorUnavailable,
    QuotaExceeded,
    Timeout,
    MalformedResponse,
    /// The query exceeded the input bound; no generator call was made.
    QueryTooLong,
    /// The accepted predicate failed when run against the catalog.
    ExecutionFailed,
}

impl FallbackReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackReason::ValidationFailed => "validation_failed",
            FallbackReason::GeneratorUnavailable => "generator_unavailable",
            FallbackReason::QuotaExceeded => "quota_exceeded",
            FallbackReason::Timeout => "timeout",
            FallbackReason::MalformedResponse => "malformed_response",
            FallbackReason::QueryTooLong => "query_too_long",
            FallbackReason::ExecutionFailed => "execution_failed",
        }
    }
}

impl std::fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&SynthesisError> for FallbackReason {
    fn from(err: &SynthesisError) -> Self {
        match err {
            SynthesisError::GeneratorUnavailable(GeneratorError::QuotaExceeded(_)) => {
                FallbackReason::QuotaExceeded
            }
            SynthesisError::GeneratorUnavailable(GeneratorError::Timeout(_)) => {
                FallbackReason::Timeout
            }
            SynthesisError::GeneratorUnavailable(GeneratorError::MalformedResponse(_)) => {
                FallbackReason::MalformedResponse
            }
            SynthesisError::GeneratorUnavailable(GeneratorError::Upstream(_)) => {
                FallbackReason::GeneratorUnavailable
            }
            SynthesisError::InvalidQuery(_) => FallbackReason::QueryTooLong,
            SynthesisError::ExecutionFailed(_) => FallbackReason::ExecutionFailed,
            SynthesisError::ValidationRejected(_) | SynthesisError::MalformedFilterSet(_) => {
                FallbackReason::ValidationFailed
            }
        }
    }
}

/// The constraint handed to the executor.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Constraint {
    Predicate(ValidatedPredicate),
    Filters(FilterSet),
    None,
}

/// Caller-facing synthesis outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynthesisResult {
    pub resolved_query_text: String,
    pub method: SynthesisMethod,
    #[serde(rename = "predicate_or_filters")]
    pub constraint: Constraint,
    pub fallback_used: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<FallbackReason>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub corrections: Vec<CorrectionResult>,
}

impl SynthesisResult {
    fn none(query: &str, sql_failure: Option<&SynthesisError>) -> Self {
        Self {
            resolved_query_text: query.to_string(),
            method: SynthesisMethod::None,
            constraint: Constraint::None,
            // A rejected query never reached either path
            fallback_used: sql_failure
                .is_some_and(|err| !matches!(err, SynthesisError::InvalidQuery(_))),
            fallback_reason: sql_failure.map(FallbackReason::from),
            corrections: Vec::new(),
        }
    }

    pub fn predicate(&self) -> Option<&ValidatedPredicate> {
        match &self.constraint {
            Constraint::Predicate(p) => Some(p),
            _ => None,
        }
    }

    pub fn filters(&self) -> Option<&FilterSet> {
        match &self.constraint {
            Constraint::Filters(f) => Some(f),
            _ => None,
        }
    }
}

/// Dispatch progress. `Accepted` and `Empty` are terminal.
#[derive(Debug)]
pub enum DispatchState {
    Start,
    TrySql,
    TryFilters {
        sql_failure: SynthesisError,
    },
    Accepted(SynthesisResult),
    Empty {
        sql_failure: Option<SynthesisError>,
        filter_failure: Option<SynthesisError>,
    },
}

/// Per-path generation constraints and the input bound.
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub sql: GenerationConstraints,
    pub filters: GenerationConstraints,
    pub max_query_len: usize,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            sql: GenerationConstraints::sql_fragment(),
            filters: GenerationConstraints::filter_set(),
            max_query_len: DEFAULT_MAX_QUERY_LEN,
        }
    }
}

/// Orchestrates the two synthesis paths.
pub struct QueryDispatcher {
    generator: Arc<dyn Generator>,
    validator: PredicateValidator,
    corrector: FuzzyCorrector,
    settings: DispatchSettings,
}

impl QueryDispatcher {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self {
            generator,
            validator: PredicateValidator::new(),
            corrector: FuzzyCorrector::default(),
            settings: DispatchSettings::default(),
        }
    }

    pub fn with_validator(mut self, validator: PredicateValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_corrector(mut self, corrector: FuzzyCorrector) -> Self {
        self.corrector = corrector;
        self
    }

    pub fn with_settings(mut self, settings: DispatchSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn validator(&self) -> &PredicateValidator {
        &self.validator
    }

    pub fn corrector(&self) -> &FuzzyCorrector {
        &self.corrector
    }

    /// Synthesize a constraint for `query` against a vocabulary snapshot.
    ///
    /// Returns `Err` only when both paths failed because the generator was
    /// unavailable.
    pub async fn dispatch(
        &self,
        query: &str,
        vocabulary: &ReferenceVocabulary,
    ) -> Result<SynthesisResult> {
        let span = tracing::info_span!("dispatch", request_id = %Uuid::new_v4());
        self.run(query.trim(), vocabulary, DispatchState::Start)
            .instrument(span)
            .await
    }

    /// Skip the SQL path and synthesize through the filter path, recording
    /// `sql_failure` as the fallback reason. Used when an accepted predicate
    /// fails at execution time.
    pub async fn dispatch_filters(
        &self,
        query: &str,
        vocabulary: &ReferenceVocabulary,
        sql_failure: SynthesisError,
    ) -> Result<SynthesisResult> {
        let span = tracing::info_span!("dispatch_filters", request_id = %Uuid::new_v4());
        self.run(query.trim(), vocabulary, DispatchState::TryFilters { sql_failure })
            .instrument(span)
            .await
    }

    async fn run(
        &self,
        query: &str,
        vocabulary: &ReferenceVocabulary,
        mut state: DispatchState,
    ) -> Result<SynthesisResult> {
        loop {
            state = match state {
                DispatchState::Start => {
                    let len = query.chars().count();
                    if len > self.settings.max_query_len {
                        tracing::info!(len, max = self.settings.max_query_len, "Query too long");
                        DispatchState::Empty {
                            sql_failure: Some(SynthesisError::InvalidQuery(format!(
                                "query is {len} characters, limit is {}",
                                self.settings.max_query_len
                            ))),
                            filter_failure: None,
                        }
                    } else if query.is_empty() {
                        DispatchState::Empty {
                            sql_failure: None,
                            filter_failure: None,
                        }
                    } else {
                        DispatchState::TrySql
                    }
                }

                DispatchState::TrySql => {
                    let path = SqlPredicatePath {
                        generator: self.generator.as_ref(),
                        validator: &self.validator,
                        corrector: &self.corrector,
                        constraints: &self.settings.sql,
                    };
                    match path.run(query, vocabulary).await {
                        Ok(corrected) => {
                            tracing::info!(predicate = corrected.predicate.as_str(), "SQL path accepted");
                            DispatchState::Accepted(SynthesisResult {
                                resolved_query_text: query.to_string(),
                                method: SynthesisMethod::SqlWhereClause,
                                constraint: Constraint::Predicate(corrected.predicate),
                                fallback_used: false,
                                fallback_reason: None,
                                corrections: corrected.corrections,
                            })
                        }
                        Err(err) => {
                            log_path_failure("sql", &err);
                            DispatchState::TryFilters { sql_failure: err }
                        }
                    }
                }

                DispatchState::TryFilters { sql_failure } => {
                    let path = FilterExtractorPath {
                        generator: self.generator.as_ref(),
                        corrector: &self.corrector,
                        constraints: &self.settings.filters,
                    };
                    match path.run(query, vocabulary).await {
                        Ok((filters, corrections)) if !filters.is_empty() => {
                            tracing::info!(?filters, "Filter path accepted");
                            DispatchState::Accepted(SynthesisResult {
                                resolved_query_text: query.to_string(),
                                method: SynthesisMethod::FilterExtraction,
                                constraint: Constraint::Filters(filters),
                                fallback_used: true,
                                fallback_reason: Some(FallbackReason::from(&sql_failure)),
                                corrections,
                            })
                        }
                        Ok(_) => {
                            tracing::debug!("Filter path produced no filters");
                            DispatchState::Empty {
                                sql_failure: Some(sql_failure),
                                filter_failure: None,
                            }
                        }
                        Err(err) => {
                            log_path_failure("filters", &err);
                            DispatchState::Empty {
                                sql_failure: Some(sql_failure),
                                filter_failure: Some(err),
                            }
                        }
                    }
                }

                DispatchState::Accepted(result) => return Ok(result),

                DispatchState::Empty {
                    sql_failure,
                    filter_failure,
                } => {
                    let both_outages = sql_failure
                        .as_ref()
                        .is_some_and(SynthesisError::is_generator_outage)
                        && filter_failure
                            .as_ref()
                            .is_some_and(SynthesisError::is_generator_outage);
                    if both_outages {
                        if let Some(err) = filter_failure {
                            tracing::warn!(error = %err, "Generator unavailable on both paths");
                            return Err(err);
                        }
                    }
                    return Ok(SynthesisResult::none(query, sql_failure.as_ref()));
                }
            };
        }
    }
}

fn log_path_failure(path: &str, err: &SynthesisError) {
    if err.is_generator_outage() {
        tracing::warn!(path, error = %err, "Synthesis path failed");
    } else {
        tracing::debug!(path, error = %err, "Synthesis path failed");
    }
}
