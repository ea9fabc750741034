//! Query Synthesis
//!
//! Turns a natural-language catalog query into a safe constraint:
//!
//! - `validator`: the trust boundary; ordered, independent rules over a
//!   lexed WHERE-clause fragment
//! - `similarity` / `fuzzy`: vocabulary-backed typo correction
//! - `sql_path`: generator → validator → literal correction
//! - `filter_path`: generator → typed JSON filters → correction
//! - `dispatcher`: SQL path first, filter path on failure, explicit `none`
//! - `service`: per-request vocabulary snapshot plus dispatch
//!
//! Generated text only leaves this module as a [`ValidatedPredicate`] or a
//! [`FilterSet`]; both are constructible only through validation.

pub mod dispatcher;
pub mod error;
pub mod filter_path;
pub mod fuzzy;
pub mod generator;
pub mod prompts;
pub mod schema;
pub mod service;
pub mod similarity;
pub mod sql_path;
pub mod validator;

pub use dispatcher::{
    Constraint, DispatchSettings, DispatchState, FallbackReason, QueryDispatcher,
    SynthesisMethod, SynthesisResult, DEFAULT_MAX_QUERY_LEN,
};
pub use error::{RejectReason, Result, SynthesisError};
pub use filter_path::{FilterExtractorPath, FilterSet};
pub use fuzzy::{
    CorrectionPolicy, CorrectionResult, FuzzyCorrector, ReferenceVocabulary, VocabularyField,
};
pub use generator::{
    clean_generation, generate_bounded, GenerationConstraints, GenerationKind, Generator,
    GeneratorError, LlmGenerator, RawGeneration,
};
pub use schema::{allowed_column, AllowedColumn, ColumnKind, ALLOWED_COLUMNS};
pub use service::{SynthesisService, VocabularyError, VocabularySource};
pub use similarity::{similarity, similarity_with, SimilarityWeights};
pub use sql_path::{correct_predicate, CorrectedPredicate, SqlPredicatePath};
pub use validator::{escape_literal, validate, PredicateValidator, ValidatedPredicate, MAX_FRAGMENT_LEN};
