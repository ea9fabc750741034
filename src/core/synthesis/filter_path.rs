//! Filter Extractor Path
//!
//! Deterministic fallback: the generator returns a JSON object of typed
//! filters instead of SQL text. The object is checked against a fixed key
//! whitelist and per-key types, then author and genre values go through the
//! fuzzy corrector. The result is only ever bound as query parameters.

use chrono::Datelike;
use serde::Serialize;
use serde_json::Value;

use super::error::{Result, SynthesisError};
use super::fuzzy::{CorrectionResult, FuzzyCorrector, ReferenceVocabulary, VocabularyField};
use super::generator::{generate_bounded, GenerationConstraints, Generator};
use super::prompts::filter_set_prompt;

/// Keys a filter object may carry.
pub const FILTER_KEYS: &[&str] = &["author", "genre", "published_year", "search_query"];

pub const MAX_AUTHOR_LEN: usize = 200;
pub const MAX_GENRE_LEN: usize = 50;
pub const MAX_SEARCH_QUERY_LEN: usize = 500;

/// Earliest publication year accepted.
pub const MIN_PUBLISHED_YEAR: i32 = 1450;

/// Words dropped when turning `search_query` into keywords.
pub const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "any", "me", "my", "find", "show", "get",
];

/// Validated structured filters. Only [`FilterSet::from_json`] builds one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterSet {
    author: Option<String>,
    genre: Option<String>,
    published_year: Option<i32>,
    search_query: Option<String>,
}

impl FilterSet {
    /// Parse and type-check a generator's JSON object.
    ///
    /// `current_year` bounds `published_year` from above (plus one).
    pub fn from_json(raw: &str, current_year: i32) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| SynthesisError::MalformedFilterSet(format!("invalid JSON: {e}")))?;
        let Value::Object(map) = value else {
            return Err(SynthesisError::MalformedFilterSet(
                "expected a JSON object".to_string(),
            ));
        };

        let mut filters = FilterSet::default();
        for (key, value) in map {
            match key.as_str() {
                "author" => filters.author = text_value(&key, value, MAX_AUTHOR_LEN)?,
                "genre" => filters.genre = text_value(&key, value, MAX_GENRE_LEN)?,
                "search_query" => {
                    filters.search_query = text_value(&key, value, MAX_SEARCH_QUERY_LEN)?
                }
                "published_year" => filters.published_year = year_value(value, current_year)?,
                _ => {
                    return Err(SynthesisError::MalformedFilterSet(format!(
                        "unknown key '{key}'"
                    )))
                }
            }
        }

        Ok(filters)
    }

    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    pub fn genre(&self) -> Option<&str> {
        self.genre.as_deref()
    }

    pub fn published_year(&self) -> Option<i32> {
        self.published_year
    }

    pub fn search_query(&self) -> Option<&str> {
        self.search_query.as_deref()
    }

    /// True when the set would not constrain a search: no structured key
    /// and no usable keyword.
    pub fn is_empty(&self) -> bool {
        self.author.is_none()
            && self.genre.is_none()
            && self.published_year.is_none()
            && self.keywords().is_empty()
    }

    /// Lowercased `search_query` words longer than two characters, minus
    /// stop words.
    pub fn keywords(&self) -> Vec<String> {
        self.search_query
            .as_deref()
            .map(|query| {
                query
                    .split_whitespace()
                    .map(|word| {
                        word.trim_matches(|c: char| !c.is_alphanumeric())
                            .to_lowercase()
                    })
                    .filter(|word| word.chars().count() > 2 && !STOP_WORDS.contains(&word.as_str()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Replace author and genre with accepted vocabulary corrections.
    pub fn corrected(
        mut self,
        corrector: &FuzzyCorrector,
        vocabulary: &ReferenceVocabulary,
    ) -> (Self, Vec<CorrectionResult>) {
        let mut corrections = Vec::new();

        for (slot, field) in [
            (&mut self.author, VocabularyField::Author),
            (&mut self.genre, VocabularyField::Genre),
        ] {
            let Some(value) = slot.as_mut() else {
                continue;
            };
            let result = corrector.correct(value, vocabulary, field);
            if result.changed() {
                *value = result.corrected.clone();
                corrections.push(result);
            }
        }

        (self, corrections)
    }
}

fn text_value(key: &str, value: Value, max_len: usize) -> Result<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Err(SynthesisError::MalformedFilterSet(format!(
                    "'{key}' must not be empty"
                )));
            }
            let len = trimmed.chars().count();
            if len > max_len {
                return Err(SynthesisError::MalformedFilterSet(format!(
                    "'{key}' is {len} characters, limit is {max_len}"
                )));
            }
            Ok(Some(trimmed.to_string()))
        }
        other => Err(SynthesisError::MalformedFilterSet(format!(
            "'{key}' must be a string, got {other}"
        ))),
    }
}

fn year_value(value: Value, current_year: i32) -> Result<Option<i32>> {
    let year = match &value {
        Value::Null => return Ok(None),
        Value::Number(n) => n.as_i64(),
        Value::String(s) if s.len() == 4 && s.chars().all(|c| c.is_ascii_digit()) => {
            s.parse::<i64>().ok()
        }
        _ => None,
    };

    let max_year = i64::from(current_year) + 1;
    match year {
        Some(y) if (i64::from(MIN_PUBLISHED_YEAR)..=max_year).contains(&y) => {
            Ok(Some(y as i32))
        }
        _ => Err(SynthesisError::MalformedFilterSet(format!(
            "'published_year' must be a four-digit year between {MIN_PUBLISHED_YEAR} and {max_year}, got {value}"
        ))),
    }
}

/// Fallback synthesis path.
pub struct FilterExtractorPath<'a> {
    pub generator: &'a dyn Generator,
    pub corrector: &'a FuzzyCorrector,
    pub constraints: &'a GenerationConstraints,
}

impl FilterExtractorPath<'_> {
    pub async fn run(
        &self,
        query: &str,
        vocabulary: &ReferenceVocabulary,
    ) -> Result<(FilterSet, Vec<CorrectionResult>)> {
        let prompt = filter_set_prompt(query, vocabulary);
        let raw = generate_bounded(self.generator, &prompt, self.constraints).await?;

        let filters = FilterSet::from_json(raw.text(), chrono::Utc::now().year())?;
        Ok(filters.corrected(self.corrector, vocabulary))
    }
}
