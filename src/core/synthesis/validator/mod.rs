//! Predicate Validator
//!
//! The single gate between generated text and the catalog query. A fragment
//! either passes every rule and becomes a [`ValidatedPredicate`], or it is
//! rejected with the first failing rule's [`RejectReason`]. Validation is
//! pure and deterministic.

pub mod lexer;
pub mod rules;

use std::fmt;

use serde::Serialize;

use self::lexer::normalize_whitespace;
use self::rules::{default_rules, FragmentView, ValidationRule};
use super::error::RejectReason;

pub use self::rules::{ALLOWED_KEYWORDS, ALLOWED_OPERATORS, DENIED_KEYWORDS};

/// Maximum fragment length in characters.
pub const MAX_FRAGMENT_LEN: usize = 1000;

/// A WHERE-clause fragment that passed every validation rule.
///
/// Only the validator can construct one, so holding a value is proof of
/// validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidatedPredicate(String);

impl ValidatedPredicate {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ValidatedPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ValidatedPredicate {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Ordered rule set applied to generated fragments.
pub struct PredicateValidator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl Default for PredicateValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PredicateValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredicateValidator")
            .field("rules", &self.rule_names())
            .finish()
    }
}

impl PredicateValidator {
    pub fn new() -> Self {
        Self::with_max_len(MAX_FRAGMENT_LEN)
    }

    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            rules: default_rules(max_len),
        }
    }

    /// Build a validator from an explicit rule list, applied in order.
    pub fn with_rules(rules: Vec<Box<dyn ValidationRule>>) -> Self {
        Self { rules }
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Validate a fragment, returning it with whitespace normalized.
    pub fn validate(&self, fragment: &str) -> Result<ValidatedPredicate, RejectReason> {
        let view = FragmentView::new(fragment.trim());

        for rule in &self.rules {
            if let Err(reason) = rule.check(&view) {
                tracing::debug!(rule = rule.name(), %reason, "Predicate rejected");
                return Err(reason);
            }
        }

        Ok(ValidatedPredicate(normalize_whitespace(&view.tokens)))
    }
}

/// Validate with the default rule set.
pub fn validate(fragment: &str) -> Result<ValidatedPredicate, RejectReason> {
    PredicateValidator::new().validate(fragment)
}

/// Quote a value as a SQL string literal, doubling embedded quotes.
pub fn escape_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
