//! Expression lexer.
//!
//! Expressions are single-line, so spans only carry columns. Columns count
//! characters, not bytes, so names with non-ASCII letters report the column
//! the user sees. Lexing never stops at the first problem: every bad
//! character or unterminated string is reported and skipped.

use evgen_types::{Diagnostic, Diagnostics, ErrorCode, Location, Span};

use crate::token::{Token, TokenKind};

/// Converts one expression string into [`Token`]s.
pub struct Lexer<'src> {
    chars: Vec<char>,
    /// Index into `chars`.
    pos: usize,
    /// Where the expression lives in the event tree; errors are reported
    /// there with a column span.
    origin: &'src Location,
    diagnostics: Diagnostics,
}

/// Result of lexing: tokens and any diagnostics collected.
pub struct LexResult {
    /// The token stream (always ends with [`TokenKind::Eof`]).
    pub tokens: Vec<Token>,
    pub diagnostics: Diagnostics,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &str, origin: &'src Location) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            origin,
            diagnostics: Diagnostics::empty(),
        }
    }

    pub fn lex(mut self) -> LexResult {
        let mut tokens = Vec::new();
        loop {
            let token = self.scan();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        LexResult {
            tokens,
            diagnostics: self.diagnostics,
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Character-level helpers
    // ─────────────────────────────────────────────────────────────

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        Some(ch)
    }

    /// 1-based column of the next character.
    fn col(&self) -> u32 {
        self.pos as u32 + 1
    }

    /// Span from `start_col` to the last consumed character.
    fn span_from(&self, start_col: u32) -> Span {
        Span::new(start_col, (self.col() - 1).max(start_col))
    }

    fn error(&self, code: ErrorCode, message: impl Into<String>, span: Span) -> Diagnostic {
        Diagnostic::new(code, message, self.origin.clone().with_span(span))
    }

    fn emit(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    // ─────────────────────────────────────────────────────────────
    // Scanning
    // ─────────────────────────────────────────────────────────────

    fn scan(&mut self) -> Token {
        while self.peek().is_some_and(char::is_whitespace) {
            self.advance();
        }

        let start = self.col();
        let Some(ch) = self.advance() else {
            return Token::new(TokenKind::Eof, Span::point(start));
        };

        let kind = match ch {
            '"' => self.scan_string(start),
            '0'..='9' => self.scan_number(ch),
            c if c.is_alphabetic() || c == '_' => self.scan_identifier(ch),
            '.' => TokenKind::Dot,
            ',' => TokenKind::Comma,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            ':' if self.peek() == Some(':') => {
                self.advance();
                TokenKind::ColonColon
            }
            ':' => {
                let diagnostic = self
                    .error(
                        ErrorCode::UNEXPECTED_CHARACTER,
                        "Unexpected character ':'",
                        Span::point(start),
                    )
                    .with_suggestion("Use '::' between an automatism and its function");
                self.emit(diagnostic);
                return self.scan();
            }
            other => {
                let diagnostic = self.error(
                    ErrorCode::UNEXPECTED_CHARACTER,
                    format!("Unexpected character '{other}'"),
                    Span::point(start),
                );
                self.emit(diagnostic);
                return self.scan();
            }
        };

        Token::new(kind, self.span_from(start))
    }

    /// Scan a string literal after its opening quote.
    fn scan_string(&mut self, start: u32) -> TokenKind {
        let mut value = String::new();
        loop {
            match self.advance() {
                Some('"') => return TokenKind::Text(value),
                Some('\\') => match self.peek() {
                    Some(escaped @ ('"' | '\\')) => {
                        self.advance();
                        value.push(escaped);
                    }
                    _ => value.push('\\'),
                },
                Some(ch) => value.push(ch),
                None => {
                    let diagnostic = self
                        .error(
                            ErrorCode::UNTERMINATED_STRING,
                            "Unterminated string literal",
                            self.span_from(start),
                        )
                        .with_suggestion("Add a closing '\"'");
                    self.emit(diagnostic);
                    return TokenKind::Text(value);
                }
            }
        }
    }

    fn scan_number(&mut self, first: char) -> TokenKind {
        let mut text = String::from(first);
        while let Some(ch @ '0'..='9') = self.peek() {
            text.push(ch);
            self.advance();
        }
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            text.push('.');
            self.advance();
            while let Some(ch @ '0'..='9') = self.peek() {
                text.push(ch);
                self.advance();
            }
        }
        // Only ASCII digits and one dot were collected.
        TokenKind::Number(text.parse().unwrap_or(0.0))
    }

    fn scan_identifier(&mut self, first: char) -> TokenKind {
        let mut name = String::from(first);
        while let Some(ch) = self.peek() {
            if ch.is_alphanumeric() || ch == '_' {
                name.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        TokenKind::Identifier(name)
    }
}
