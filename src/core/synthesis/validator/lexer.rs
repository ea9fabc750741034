//! Fragment Lexer
//!
//! A total tokenizer for WHERE-clause fragments: every non-whitespace
//! character of the input belongs to exactly one token, and malformed input
//! (an unterminated quote, a stray character) still produces tokens for the
//! rules to reject. Tokens borrow from the input and carry byte spans so
//! callers can rewrite literal spans in place.

/// Token categories produced by [`tokenize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Identifier or keyword.
    Word,
    /// Single-quoted string literal, quotes included, `''` escapes allowed.
    StringLit,
    /// Double-quoted identifier, quotes included.
    QuotedIdent,
    /// A quote opened but never closed; runs to the end of input.
    Unterminated,
    Number,
    /// A run of operator characters such as `=`, `<>`, `||`, `::`.
    Operator,
    LParen,
    RParen,
    Comma,
    Dot,
    Semicolon,
    /// Anything else.
    Other,
}

/// A lexed token with its byte span in the source fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub start: usize,
    pub end: usize,
}

impl<'a> Token<'a> {
    /// Case-insensitive comparison for word tokens.
    pub fn is_word(&self, word: &str) -> bool {
        self.kind == TokenKind::Word && self.text.eq_ignore_ascii_case(word)
    }

    /// Unescaped contents of a string literal.
    pub fn literal_value(&self) -> Option<String> {
        if self.kind != TokenKind::StringLit || self.text.len() < 2 {
            return None;
        }
        let inner = &self.text[1..self.text.len() - 1];
        Some(inner.replace("''", "'"))
    }
}

const OPERATOR_CHARS: &[char] = &[
    '=', '<', '>', '!', '|', ':', '-', '+', '*', '/', '%', '&', '^', '~', '@', '#', '?',
];

/// Split a fragment into tokens.
pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        let kind = if c == '\'' || c == '"' {
            chars.next();
            let mut closed = false;
            while let Some((_, next)) = chars.next() {
                if next == c {
                    // A doubled quote is an escaped quote, not the end.
                    if matches!(chars.peek(), Some(&(_, following)) if following == c) {
                        chars.next();
                        continue;
                    }
                    closed = true;
                    break;
                }
            }
            match (closed, c) {
                (false, _) => TokenKind::Unterminated,
                (true, '\'') => TokenKind::StringLit,
                (true, _) => TokenKind::QuotedIdent,
            }
        } else if c.is_alphabetic() || c == '_' {
            chars.next();
            while matches!(chars.peek(), Some(&(_, next)) if next.is_alphanumeric() || next == '_')
            {
                chars.next();
            }
            TokenKind::Word
        } else if c.is_ascii_digit() {
            chars.next();
            while matches!(chars.peek(), Some(&(_, next)) if next.is_ascii_digit() || next == '.')
            {
                chars.next();
            }
            TokenKind::Number
        } else if OPERATOR_CHARS.contains(&c) {
            chars.next();
            while matches!(chars.peek(), Some(&(_, next)) if OPERATOR_CHARS.contains(&next)) {
                chars.next();
            }
            TokenKind::Operator
        } else {
            chars.next();
            match c {
                '(' => TokenKind::LParen,
                ')' => TokenKind::RParen,
                ',' => TokenKind::Comma,
                '.' => TokenKind::Dot,
                ';' => TokenKind::Semicolon,
                _ => TokenKind::Other,
            }
        };

        let end = chars.peek().map(|&(i, _)| i).unwrap_or(input.len());
        tokens.push(Token {
            kind,
            text: &input[start..end],
            start,
            end,
        });
    }

    tokens
}

/// Re-join tokens with single spaces wherever the source had whitespace.
/// Literal contents are untouched; the result is a fixed point.
pub fn normalize_whitespace(tokens: &[Token<'_>]) -> String {
    let mut out = String::new();
    let mut prev_end: Option<usize> = None;
    for token in tokens {
        if let Some(end) = prev_end {
            if token.start > end {
                out.push(' ');
            }
        }
        out.push_str(token.text);
        prev_end = Some(token.end);
    }
    out
}
