//! Synthesis Error Types
//!
//! Tagged outcomes for every exit point of the synthesis pipeline.

use thiserror::Error;

use super::generator::GeneratorError;

/// Why the predicate validator refused a fragment.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    #[error("Fragment is empty")]
    Empty,

    #[error("Denied keyword: {0}")]
    DeniedKeyword(String),

    #[error("Word '{word}' looks like denied keyword {keyword}")]
    NearMissKeyword { word: String, keyword: &'static str },

    #[error("Multiple statements are not allowed")]
    StatementSeparator,

    #[error("SQL comments are not allowed ({marker})")]
    Comment { marker: &'static str },

    #[error("Stacked query indicator: {indicator}")]
    StackedQuery { indicator: &'static str },

    #[error("Subqueries are not allowed")]
    Subquery,

    #[error("JOIN is not allowed")]
    Join,

    #[error("Fragment must not contain the WHERE keyword")]
    WhereKeyword,

    #[error("Column '{0}' is not allowed")]
    UnknownColumn(String),

    #[error("Unexpected word: {0}")]
    UnknownWord(String),

    #[error("Quoted identifiers are not allowed: {0}")]
    QuotedIdentifier(String),

    #[error("Only EXTRACT is allowed, found functions: {0}")]
    DisallowedFunction(String),

    #[error("Invalid EXTRACT expression: {0}")]
    InvalidExtract(String),

    #[error("Unbalanced parentheses")]
    UnbalancedParentheses,

    #[error("Unbalanced quotes")]
    UnbalancedQuotes,

    #[error("Operator not allowed: {0}")]
    DisallowedOperator(String),

    #[error("Malformed expression: {0}")]
    MalformedExpression(String),

    #[error("Fragment length {len} exceeds maximum of {max} characters")]
    TooLong { len: usize, max: usize },
}

/// Errors surfaced by the synthesis paths and dispatcher.
#[derive(Error, Debug)]
pub enum SynthesisError {
    #[error("Generated predicate rejected: {0}")]
    ValidationRejected(#[from] RejectReason),

    #[error("Generator unavailable: {0}")]
    GeneratorUnavailable(#[from] GeneratorError),

    #[error("Malformed filter set: {0}")]
    MalformedFilterSet(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Predicate failed to execute: {0}")]
    ExecutionFailed(String),
}

impl SynthesisError {
    /// True for upstream outages, the only failure a caller may ever see.
    pub fn is_generator_outage(&self) -> bool {
        matches!(self, SynthesisError::GeneratorUnavailable(_))
    }
}

/// Result type alias for synthesis operations
pub type Result<T> = std::result::Result<T, SynthesisError>;
