//! Validation Rules
//!
//! Each rule is an independent, pure check over a lexed fragment. The
//! validator runs them in order and stops at the first rejection; adding a
//! denylist or whitelist entry touches one rule and nothing else.

use once_cell::sync::Lazy;
use regex::Regex;
use strsim::jaro_winkler;

use super::lexer::{Token, TokenKind};
use crate::core::synthesis::error::RejectReason;
use crate::core::synthesis::schema::{allowed_column, ColumnKind};

/// Statement, DDL and DML keywords that may never appear, even inside literals.
pub const DENIED_KEYWORDS: &[&str] = &[
    "DROP", "DELETE", "UPDATE", "INSERT", "ALTER", "TRUNCATE", "GRANT", "EXEC", "EXECUTE",
    "UNION", "CREATE",
];

/// Bare words a fragment may use besides column names.
pub const ALLOWED_KEYWORDS: &[&str] = &[
    "AND", "OR", "NOT", "ILIKE", "LIKE", "IS", "NULL", "IN", "BETWEEN", "EXTRACT", "YEAR",
    "MONTH", "FROM", "TRUE", "FALSE",
];

/// Comparison operators allowed between operands.
pub const ALLOWED_OPERATORS: &[&str] = &["=", "<>", "!=", "<", ">", "<=", ">="];

/// Fields accepted as the first argument of `EXTRACT`.
pub const EXTRACT_FIELDS: &[&str] = &["YEAR", "MONTH"];

/// Keywords that, following an identifier, make it an operand of a comparison.
const COMPARISON_KEYWORDS: &[&str] = &["ILIKE", "LIKE", "NOT", "IS", "IN", "BETWEEN"];

/// Similarity above which a bare word is treated as a misspelled denied keyword.
const NEAR_MISS_SIMILARITY: f64 = 0.88;

/// Parenthesis and `NOT` nesting accepted by the expression grammar.
pub const MAX_NESTING: usize = 32;

static DENIED_KEYWORD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)\b({})\b", DENIED_KEYWORDS.join("|")))
        .expect("Invalid denied keyword regex")
});

/// A lexed fragment as seen by the rules.
#[derive(Debug)]
pub struct FragmentView<'a> {
    pub text: &'a str,
    pub tokens: Vec<Token<'a>>,
}

impl<'a> FragmentView<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            tokens: super::lexer::tokenize(text),
        }
    }

    fn words(&self) -> impl Iterator<Item = (usize, &Token<'a>)> {
        self.tokens
            .iter()
            .enumerate()
            .filter(|(_, t)| t.kind == TokenKind::Word)
    }

    fn next(&self, index: usize) -> Option<&Token<'a>> {
        self.tokens.get(index + 1)
    }

    fn prev(&self, index: usize) -> Option<&Token<'a>> {
        index.checked_sub(1).and_then(|i| self.tokens.get(i))
    }
}

/// A single validator check.
pub trait ValidationRule: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    fn check(&self, fragment: &FragmentView<'_>) -> Result<(), RejectReason>;
}

fn is_allowed_keyword(word: &str) -> bool {
    ALLOWED_KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(word))
}

// ============================================================================
// Rules
// ============================================================================

pub struct NonEmpty;

impl ValidationRule for NonEmpty {
    fn name(&self) -> &'static str {
        "non_empty"
    }

    fn check(&self, fragment: &FragmentView<'_>) -> Result<(), RejectReason> {
        if fragment.text.trim().is_empty() {
            return Err(RejectReason::Empty);
        }
        Ok(())
    }
}

/// Whole-word denylist over the raw text.
pub struct TokenDenylist;

impl ValidationRule for TokenDenylist {
    fn name(&self) -> &'static str {
        "token_denylist"
    }

    fn check(&self, fragment: &FragmentView<'_>) -> Result<(), RejectReason> {
        match DENIED_KEYWORD_RE.find(fragment.text) {
            Some(m) => Err(RejectReason::DeniedKeyword(m.as_str().to_uppercase())),
            None => Ok(()),
        }
    }
}

/// Statement separators, comment markers and stacked-query indicators.
pub struct StructuralDenylist;

impl ValidationRule for StructuralDenylist {
    fn name(&self) -> &'static str {
        "structural_denylist"
    }

    fn check(&self, fragment: &FragmentView<'_>) -> Result<(), RejectReason> {
        let text = fragment.text;
        if text.contains(';') {
            return Err(RejectReason::StatementSeparator);
        }
        for marker in ["--", "/*", "*/"] {
            if text.contains(marker) {
                return Err(RejectReason::Comment { marker });
            }
        }
        for indicator in ["\\", "$$", "\0"] {
            if text.contains(indicator) {
                return Err(RejectReason::StackedQuery { indicator });
            }
        }
        Ok(())
    }
}

/// Misspellings and inflections of denied keywords (`delect`, `drp`,
/// `deletes`) used as bare words.
pub struct NearMissDenylist;

impl ValidationRule for NearMissDenylist {
    fn name(&self) -> &'static str {
        "near_miss_denylist"
    }

    fn check(&self, fragment: &FragmentView<'_>) -> Result<(), RejectReason> {
        for (_, token) in fragment.words() {
            let word = token.text;
            if word.chars().count() < 3 || is_allowed_keyword(word) || allowed_column(word).is_some()
            {
                continue;
            }
            let upper = word.to_uppercase();
            for keyword in DENIED_KEYWORDS {
                let inflected = upper.starts_with(keyword) && upper.len() > keyword.len();
                if inflected || jaro_winkler(&upper, keyword) >= NEAR_MISS_SIMILARITY {
                    return Err(RejectReason::NearMissKeyword {
                        word: word.to_string(),
                        keyword,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Clauses that would turn a predicate into a query of its own.
pub struct ClauseDenylist;

impl ValidationRule for ClauseDenylist {
    fn name(&self) -> &'static str {
        "clause_denylist"
    }

    fn check(&self, fragment: &FragmentView<'_>) -> Result<(), RejectReason> {
        for (_, token) in fragment.words() {
            if token.is_word("SELECT") {
                return Err(RejectReason::Subquery);
            }
            if token.is_word("JOIN") {
                return Err(RejectReason::Join);
            }
            if token.is_word("WHERE") {
                return Err(RejectReason::WhereKeyword);
            }
        }
        Ok(())
    }
}

/// Identifiers in operand position must be whitelisted columns.
pub struct ColumnWhitelist;

impl ValidationRule for ColumnWhitelist {
    fn name(&self) -> &'static str {
        "column_whitelist"
    }

    fn check(&self, fragment: &FragmentView<'_>) -> Result<(), RejectReason> {
        for (index, token) in fragment.tokens.iter().enumerate() {
            if token.kind == TokenKind::QuotedIdent {
                return Err(RejectReason::QuotedIdentifier(token.text.to_string()));
            }
            if token.kind != TokenKind::Word || is_allowed_keyword(token.text) {
                continue;
            }

            let compared = match fragment.next(index) {
                Some(next) if next.kind == TokenKind::Operator => true,
                Some(next) if next.kind == TokenKind::Word => COMPARISON_KEYWORDS
                    .iter()
                    .any(|k| next.text.eq_ignore_ascii_case(k)),
                _ => false,
            };
            let extracted = fragment.prev(index).is_some_and(|prev| prev.is_word("FROM"));

            if (compared || extracted) && allowed_column(token.text).is_none() {
                return Err(RejectReason::UnknownColumn(token.text.to_string()));
            }
        }
        Ok(())
    }
}

/// `EXTRACT(YEAR|MONTH FROM <date column>)` is the only call allowed.
pub struct FunctionWhitelist;

impl FunctionWhitelist {
    fn check_extract(fragment: &FragmentView<'_>, index: usize) -> Result<(), RejectReason> {
        let shape: Vec<&Token<'_>> = fragment.tokens.iter().skip(index).take(6).collect();
        let render = || {
            shape
                .iter()
                .map(|t| t.text)
                .collect::<Vec<_>>()
                .join(" ")
        };

        let [_, open, field, from, column, close] = shape.as_slice() else {
            return Err(RejectReason::InvalidExtract(render()));
        };
        let well_formed = open.kind == TokenKind::LParen
            && EXTRACT_FIELDS.iter().any(|f| field.is_word(f))
            && from.is_word("FROM")
            && column.kind == TokenKind::Word
            && close.kind == TokenKind::RParen;
        if !well_formed {
            return Err(RejectReason::InvalidExtract(render()));
        }

        match allowed_column(column.text) {
            Some(allowed) if allowed.kind == ColumnKind::Date => Ok(()),
            Some(_) => Err(RejectReason::InvalidExtract(format!(
                "{} is not a date column",
                column.text
            ))),
            None => Err(RejectReason::UnknownColumn(column.text.to_string())),
        }
    }
}

impl ValidationRule for FunctionWhitelist {
    fn name(&self) -> &'static str {
        "function_whitelist"
    }

    fn check(&self, fragment: &FragmentView<'_>) -> Result<(), RejectReason> {
        for (index, token) in fragment.words() {
            let called = fragment
                .next(index)
                .is_some_and(|next| next.kind == TokenKind::LParen);
            if !called {
                continue;
            }
            if token.is_word("EXTRACT") {
                Self::check_extract(fragment, index)?;
            } else if ["AND", "OR", "NOT", "IN"].iter().any(|k| token.is_word(k)) {
                continue;
            } else {
                return Err(RejectReason::DisallowedFunction(token.text.to_string()));
            }
        }
        Ok(())
    }
}

/// Every bare word is a column or an allowed keyword; `YEAR`, `MONTH` and
/// `FROM` only inside `EXTRACT(...)`.
pub struct BareWordGrammar;

impl ValidationRule for BareWordGrammar {
    fn name(&self) -> &'static str {
        "bare_word_grammar"
    }

    fn check(&self, fragment: &FragmentView<'_>) -> Result<(), RejectReason> {
        for (index, token) in fragment.words() {
            if allowed_column(token.text).is_some() {
                continue;
            }
            if !is_allowed_keyword(token.text) {
                return Err(RejectReason::UnknownWord(token.text.to_string()));
            }

            let in_extract = if EXTRACT_FIELDS.iter().any(|f| token.is_word(f)) {
                fragment.prev(index).is_some_and(|t| t.kind == TokenKind::LParen)
                    && index
                        .checked_sub(2)
                        .and_then(|i| fragment.tokens.get(i))
                        .is_some_and(|t| t.is_word("EXTRACT"))
            } else if token.is_word("FROM") {
                fragment
                    .prev(index)
                    .is_some_and(|prev| EXTRACT_FIELDS.iter().any(|f| prev.is_word(f)))
            } else {
                true
            };
            if !in_extract {
                return Err(RejectReason::UnknownWord(token.text.to_string()));
            }
        }
        Ok(())
    }
}

/// Quotes closed, parentheses nested and closed.
pub struct BalanceCheck;

impl ValidationRule for BalanceCheck {
    fn name(&self) -> &'static str {
        "balance_check"
    }

    fn check(&self, fragment: &FragmentView<'_>) -> Result<(), RejectReason> {
        if fragment
            .tokens
            .iter()
            .any(|t| t.kind == TokenKind::Unterminated)
        {
            return Err(RejectReason::UnbalancedQuotes);
        }

        let mut depth: usize = 0;
        for token in &fragment.tokens {
            match token.kind {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => {
                    depth = depth
                        .checked_sub(1)
                        .ok_or(RejectReason::UnbalancedParentheses)?;
                }
                _ => {}
            }
        }
        if depth != 0 {
            return Err(RejectReason::UnbalancedParentheses);
        }
        Ok(())
    }
}

/// Operators outside literals must come from the fixed comparison set.
pub struct OperatorWhitelist;

impl ValidationRule for OperatorWhitelist {
    fn name(&self) -> &'static str {
        "operator_whitelist"
    }

    fn check(&self, fragment: &FragmentView<'_>) -> Result<(), RejectReason> {
        for token in &fragment.tokens {
            let allowed = match token.kind {
                TokenKind::Operator => ALLOWED_OPERATORS.contains(&token.text),
                TokenKind::Dot | TokenKind::Other | TokenKind::Semicolon => false,
                _ => true,
            };
            if !allowed {
                return Err(RejectReason::DisallowedOperator(token.text.to_string()));
            }
        }
        Ok(())
    }
}

/// The token stream must form one boolean expression: comparisons joined by
/// `AND`/`OR`, optionally negated or parenthesized, with nothing left over.
pub struct ExpressionGrammar;

impl ValidationRule for ExpressionGrammar {
    fn name(&self) -> &'static str {
        "expression_grammar"
    }

    fn check(&self, fragment: &FragmentView<'_>) -> Result<(), RejectReason> {
        let mut parser = ExpressionParser {
            tokens: &fragment.tokens,
            pos: 0,
            depth: 0,
        };
        parser.expression()?;
        match parser.peek() {
            None => Ok(()),
            Some(_) => Err(parser.unexpected("AND or OR")),
        }
    }
}

/// Recursive descent over the grammar
///
/// ```text
/// expression := term { (AND | OR) term }
/// term       := NOT term | "(" expression ")" | comparison | TRUE | FALSE
/// comparison := operand ( op operand
///                       | [NOT] (LIKE | ILIKE) operand
///                       | [NOT] IN "(" operand { "," operand } ")"
///                       | [NOT] BETWEEN operand AND operand
///                       | IS [NOT] (NULL | TRUE | FALSE) )
/// operand    := column | string | number | NULL | TRUE | FALSE | EXTRACT "(" field FROM column ")"
/// ```
struct ExpressionParser<'f, 'a> {
    tokens: &'f [Token<'a>],
    pos: usize,
    depth: usize,
}

impl<'a> ExpressionParser<'_, 'a> {
    fn peek(&self) -> Option<&Token<'a>> {
        self.tokens.get(self.pos)
    }

    fn peek_word(&self, word: &str) -> bool {
        self.peek().is_some_and(|t| t.is_word(word))
    }

    fn peek_kind(&self, kind: TokenKind) -> bool {
        self.peek().is_some_and(|t| t.kind == kind)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn unexpected(&self, expected: &str) -> RejectReason {
        let found = match self.peek() {
            Some(token) => format!("'{}'", token.text),
            None => "end of fragment".to_string(),
        };
        RejectReason::MalformedExpression(format!("expected {expected}, found {found}"))
    }

    fn expect_kind(&mut self, kind: TokenKind, expected: &str) -> Result<(), RejectReason> {
        if !self.peek_kind(kind) {
            return Err(self.unexpected(expected));
        }
        self.advance();
        Ok(())
    }

    fn expect_word(&mut self, word: &str) -> Result<(), RejectReason> {
        if !self.peek_word(word) {
            return Err(self.unexpected(word));
        }
        self.advance();
        Ok(())
    }

    fn nest(&mut self) -> Result<(), RejectReason> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(RejectReason::MalformedExpression(format!(
                "nesting deeper than {MAX_NESTING}"
            )));
        }
        Ok(())
    }

    fn expression(&mut self) -> Result<(), RejectReason> {
        self.term()?;
        while self.peek_word("AND") || self.peek_word("OR") {
            self.advance();
            self.term()?;
        }
        Ok(())
    }

    fn term(&mut self) -> Result<(), RejectReason> {
        if self.peek_word("NOT") {
            self.advance();
            self.nest()?;
            self.term()?;
            self.depth -= 1;
            return Ok(());
        }

        if self.peek_kind(TokenKind::LParen) {
            self.advance();
            if self.peek_kind(TokenKind::RParen) {
                return Err(RejectReason::MalformedExpression(
                    "empty parentheses".to_string(),
                ));
            }
            self.nest()?;
            self.expression()?;
            self.depth -= 1;
            return self.expect_kind(TokenKind::RParen, "')'");
        }

        if self.peek_word("TRUE") || self.peek_word("FALSE") {
            self.advance();
            return Ok(());
        }

        self.comparison()
    }

    fn comparison(&mut self) -> Result<(), RejectReason> {
        self.operand()?;

        if self.peek_kind(TokenKind::Operator) {
            self.advance();
            return self.operand();
        }

        if self.peek_word("IS") {
            self.advance();
            if self.peek_word("NOT") {
                self.advance();
            }
            return match self.peek() {
                Some(t) if t.is_word("NULL") || t.is_word("TRUE") || t.is_word("FALSE") => {
                    self.advance();
                    Ok(())
                }
                _ => Err(self.unexpected("NULL")),
            };
        }

        if self.peek_word("NOT") {
            self.advance();
        }
        match self.peek() {
            Some(t) if t.is_word("LIKE") || t.is_word("ILIKE") => {
                self.advance();
                self.operand()
            }
            Some(t) if t.is_word("IN") => {
                self.advance();
                self.expect_kind(TokenKind::LParen, "'('")?;
                self.operand()?;
                while self.peek_kind(TokenKind::Comma) {
                    self.advance();
                    self.operand()?;
                }
                self.expect_kind(TokenKind::RParen, "')'")
            }
            Some(t) if t.is_word("BETWEEN") => {
                self.advance();
                self.operand()?;
                self.expect_word("AND")?;
                self.operand()
            }
            _ => Err(self.unexpected("a comparison")),
        }
    }

    fn operand(&mut self) -> Result<(), RejectReason> {
        let Some(token) = self.peek().copied() else {
            return Err(self.unexpected("an operand"));
        };

        match token.kind {
            TokenKind::StringLit | TokenKind::Number => {
                self.advance();
                Ok(())
            }
            TokenKind::Word if token.is_word("EXTRACT") => {
                self.advance();
                self.expect_kind(TokenKind::LParen, "'('")?;
                if !EXTRACT_FIELDS.iter().any(|f| self.peek_word(f)) {
                    return Err(self.unexpected("YEAR or MONTH"));
                }
                self.advance();
                self.expect_word("FROM")?;
                self.column()?;
                self.expect_kind(TokenKind::RParen, "')'")
            }
            TokenKind::Word if ["NULL", "TRUE", "FALSE"].iter().any(|k| token.is_word(k)) => {
                self.advance();
                Ok(())
            }
            _ => self.column(),
        }
    }

    fn column(&mut self) -> Result<(), RejectReason> {
        match self.peek() {
            Some(t) if t.kind == TokenKind::Word && allowed_column(t.text).is_some() => {
                self.advance();
                Ok(())
            }
            _ => Err(self.unexpected("an operand")),
        }
    }
}

/// Upper bound on fragment length in characters.
pub struct LengthBound {
    pub max: usize,
}

impl ValidationRule for LengthBound {
    fn name(&self) -> &'static str {
        "length_bound"
    }

    fn check(&self, fragment: &FragmentView<'_>) -> Result<(), RejectReason> {
        let len = fragment.text.chars().count();
        if len > self.max {
            return Err(RejectReason::TooLong { len, max: self.max });
        }
        Ok(())
    }
}

/// The standard rule order.
pub fn default_rules(max_len: usize) -> Vec<Box<dyn ValidationRule>> {
    vec![
        Box::new(NonEmpty),
        Box::new(TokenDenylist),
        Box::new(StructuralDenylist),
        Box::new(NearMissDenylist),
        Box::new(ClauseDenylist),
        Box::new(ColumnWhitelist),
        Box::new(FunctionWhitelist),
        Box::new(BareWordGrammar),
        Box::new(BalanceCheck),
        Box::new(OperatorWhitelist),
        Box::new(ExpressionGrammar),
        Box::new(LengthBound { max: max_len }),
    ]
}
