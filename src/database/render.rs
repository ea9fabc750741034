//! Predicate rendering for SQLite
//!
//! Validated predicates use the portable dialect the validator accepts.
//! SQLite lacks `ILIKE` and `EXTRACT`, so both are rewritten token by token;
//! everything else is copied through unchanged.

use crate::core::synthesis::validator::lexer::{tokenize, Token, TokenKind};
use crate::core::synthesis::ValidatedPredicate;

use super::{CatalogError, Result};

/// Rewrite a validated predicate into SQLite syntax.
///
/// `ILIKE` becomes `LIKE` (case-insensitive for ASCII in SQLite) and
/// `EXTRACT(YEAR|MONTH FROM col)` becomes an integer `strftime` call.
pub fn render_predicate(predicate: &ValidatedPredicate) -> Result<String> {
    let tokens = tokenize(predicate.as_str());
    let mut out = String::with_capacity(predicate.as_str().len() + 32);
    let mut prev_end: Option<usize> = None;
    let mut index = 0;

    while let Some(token) = tokens.get(index) {
        if prev_end.is_some_and(|end| token.start > end) {
            out.push(' ');
        }

        if token.is_word("ILIKE") {
            out.push_str("LIKE");
            prev_end = Some(token.end);
            index += 1;
        } else if token.is_word("EXTRACT") {
            let call = tokens.get(index..index + 6).ok_or_else(|| unsupported(token))?;
            out.push_str(&render_extract(call)?);
            prev_end = Some(call[5].end);
            index += 6;
        } else {
            out.push_str(token.text);
            prev_end = Some(token.end);
            index += 1;
        }
    }

    Ok(out)
}

fn render_extract(call: &[Token<'_>]) -> Result<String> {
    let [_, open, field, from, column, close] = call else {
        return Err(unsupported(&call[0]));
    };
    if open.kind != TokenKind::LParen
        || !from.is_word("FROM")
        || column.kind != TokenKind::Word
        || close.kind != TokenKind::RParen
    {
        return Err(unsupported(&call[0]));
    }

    let format = if field.is_word("YEAR") {
        "%Y"
    } else if field.is_word("MONTH") {
        "%m"
    } else {
        return Err(CatalogError::UnsupportedPredicate(format!(
            "EXTRACT field {}",
            field.text
        )));
    };

    Ok(format!(
        "CAST(strftime('{format}', {}) AS INTEGER)",
        column.text
    ))
}

fn unsupported(token: &Token<'_>) -> CatalogError {
    CatalogError::UnsupportedPredicate(format!("malformed {} at byte {}", token.text, token.start))
}
