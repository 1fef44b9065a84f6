//! Token types for the expression lexer.

use evgen_types::Span;
use std::fmt;

/// A single token with its column span.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// Every lexeme of the expression grammar.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // ── Literals ──────────────────────────────────────────────
    /// `42`, `3.5`
    Number(f64),
    /// `"text"` with escapes decoded.
    Text(String),
    /// Variable, object, automatism or function name.
    Identifier(String),

    // ── Punctuation ───────────────────────────────────────────
    Dot,
    /// `::` between an automatism and its function.
    ColonColon,
    LParen,
    RParen,
    Comma,

    // ── Operators ─────────────────────────────────────────────
    Plus,
    Minus,
    Star,
    Slash,

    Eof,
}

impl TokenKind {
    /// Whether the token is a binary operator.
    pub fn is_operator(&self) -> bool {
        matches!(
            self,
            TokenKind::Plus | TokenKind::Minus | TokenKind::Star | TokenKind::Slash
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Number(n) => write!(f, "number '{n}'"),
            TokenKind::Text(s) => write!(f, "string \"{s}\""),
            TokenKind::Identifier(name) => write!(f, "identifier '{name}'"),
            TokenKind::Dot => f.write_str("'.'"),
            TokenKind::ColonColon => f.write_str("'::'"),
            TokenKind::LParen => f.write_str("'('"),
            TokenKind::RParen => f.write_str("')'"),
            TokenKind::Comma => f.write_str("','"),
            TokenKind::Plus => f.write_str("'+'"),
            TokenKind::Minus => f.write_str("'-'"),
            TokenKind::Star => f.write_str("'*'"),
            TokenKind::Slash => f.write_str("'/'"),
            TokenKind::Eof => f.write_str("end of expression"),
        }
    }
}
