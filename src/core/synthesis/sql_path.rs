//! SQL Predicate Path
//!
//! Primary path: the generator drafts a WHERE-clause fragment, the validator
//! gates it, and a literal-correction pass repairs misspelled author and
//! genre values inside the accepted fragment.

use serde::Serialize;

use super::error::{Result, SynthesisError};
use super::fuzzy::{CorrectionResult, FuzzyCorrector, ReferenceVocabulary, VocabularyField};
use super::generator::{generate_bounded, GenerationConstraints, Generator};
use super::prompts::sql_fragment_prompt;
use super::validator::lexer::{tokenize, Token, TokenKind};
use super::validator::{escape_literal, PredicateValidator, ValidatedPredicate};

/// A validated predicate plus the corrections applied to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrectedPredicate {
    pub predicate: ValidatedPredicate,
    pub corrections: Vec<CorrectionResult>,
}

/// How a literal is compared against its column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Comparison {
    /// `ILIKE`: wildcard pattern, case-insensitive.
    CaseInsensitivePattern,
    /// `LIKE`: wildcard pattern.
    Pattern,
    /// `=`: exact value.
    Equality,
}

/// A quoted literal compared against a vocabulary column.
#[derive(Debug)]
struct LiteralSite {
    field: VocabularyField,
    comparison: Comparison,
    start: usize,
    end: usize,
    value: String,
}

/// Find `author|genre [NOT] ILIKE|LIKE|= '<literal>'` sites.
fn literal_sites(tokens: &[Token<'_>]) -> Vec<LiteralSite> {
    let mut sites = Vec::new();

    for (index, token) in tokens.iter().enumerate() {
        if token.kind != TokenKind::Word {
            continue;
        }
        let Some(field) = VocabularyField::for_column(token.text) else {
            continue;
        };

        let mut cursor = index + 1;
        if tokens.get(cursor).is_some_and(|t| t.is_word("NOT")) {
            cursor += 1;
        }
        let comparison = match tokens.get(cursor) {
            Some(t) if t.is_word("ILIKE") => Comparison::CaseInsensitivePattern,
            Some(t) if t.is_word("LIKE") => Comparison::Pattern,
            Some(t) if t.kind == TokenKind::Operator && t.text == "=" => Comparison::Equality,
            _ => continue,
        };
        let Some(literal) = tokens.get(cursor + 1) else {
            continue;
        };
        let Some(value) = literal.literal_value() else {
            continue;
        };

        sites.push(LiteralSite {
            field,
            comparison,
            start: literal.start,
            end: literal.end,
            value,
        });
    }

    sites
}

/// Split a pattern into leading wildcards, core text and trailing wildcards.
fn split_wildcards(value: &str) -> (&str, &str, &str) {
    let core_start = value.len() - value.trim_start_matches('%').len();
    let trimmed = &value[core_start..];
    let core = trimmed.trim_end_matches('%');
    (&value[..core_start], core, &trimmed[core.len()..])
}

/// Rewrite misspelled author/genre literals inside an accepted predicate.
///
/// The rewritten fragment is validated again; if that fails the input
/// predicate is returned unchanged.
pub fn correct_predicate(
    predicate: ValidatedPredicate,
    validator: &PredicateValidator,
    corrector: &FuzzyCorrector,
    vocabulary: &ReferenceVocabulary,
) -> CorrectedPredicate {
    let text = predicate.as_str();
    let tokens = tokenize(text);

    let mut replacements: Vec<(usize, usize, String)> = Vec::new();
    let mut corrections = Vec::new();

    for site in literal_sites(&tokens) {
        let (prefix, core, suffix) = match site.comparison {
            Comparison::Equality => ("", site.value.as_str(), ""),
            _ => split_wildcards(&site.value),
        };

        let is_pattern = site.comparison != Comparison::Equality;
        // Internal wildcards and numeric literals are not names
        if core.trim().is_empty()
            || (is_pattern && core.contains(|c: char| c == '%' || c == '_'))
            || core.chars().all(|c| c.is_ascii_digit() || c == '-')
        {
            continue;
        }

        let result = corrector.correct(core, vocabulary, site.field);
        if !result.changed() {
            continue;
        }
        if site.comparison == Comparison::CaseInsensitivePattern
            && result.corrected.to_lowercase() == core.to_lowercase()
        {
            continue;
        }

        let rewritten = format!("{prefix}{}{suffix}", result.corrected);
        replacements.push((site.start, site.end, escape_literal(&rewritten)));
        corrections.push(result);
    }

    if replacements.is_empty() {
        return CorrectedPredicate {
            predicate,
            corrections,
        };
    }

    let mut rewritten = text.to_string();
    for (start, end, literal) in replacements.iter().rev() {
        rewritten.replace_range(*start..*end, literal);
    }

    match validator.validate(&rewritten) {
        Ok(corrected) => {
            tracing::debug!(
                original = predicate.as_str(),
                corrected = corrected.as_str(),
                "Applied literal corrections"
            );
            CorrectedPredicate {
                predicate: corrected,
                corrections,
            }
        }
        Err(reason) => {
            tracing::debug!(%reason, "Corrected predicate failed validation, keeping original");
            CorrectedPredicate {
                predicate,
                corrections: Vec::new(),
            }
        }
    }
}

/// Primary synthesis path.
pub struct SqlPredicatePath<'a> {
    pub generator: &'a dyn Generator,
    pub validator: &'a PredicateValidator,
    pub corrector: &'a FuzzyCorrector,
    pub constraints: &'a GenerationConstraints,
}

impl SqlPredicatePath<'_> {
    pub async fn run(
        &self,
        query: &str,
        vocabulary: &ReferenceVocabulary,
    ) -> Result<CorrectedPredicate> {
        let prompt = sql_fragment_prompt(query);
        let raw = generate_bounded(self.generator, &prompt, self.constraints).await?;

        let predicate = self
            .validator
            .validate(raw.text())
            .map_err(SynthesisError::ValidationRejected)?;

        Ok(correct_predicate(
            predicate,
            self.validator,
            self.corrector,
            vocabulary,
        ))
    }
}
