//! Core parser infrastructure: token cursor, error reporting, public API.

use evgen_lexer::token::{Token, TokenKind};
use evgen_lexer::Lexer;
use evgen_types::expr::{Expr, Ident};
use evgen_types::{Diagnostic, Diagnostics, ErrorCode, Location, Span};

/// Deepest parenthesis / call / unary nesting accepted in one expression.
pub const MAX_NESTING: u32 = 32;

/// The expression parser.
///
/// Consumes a token stream produced by the lexer and builds an [`Expr`].
/// Errors are collected as diagnostics at `origin`, with column spans.
pub struct Parser<'src> {
    tokens: Vec<Token>,
    pos: usize,
    origin: &'src Location,
    diagnostics: Diagnostics,
    /// Current nesting depth, capped at [`MAX_NESTING`].
    pub(crate) depth: u32,
}

/// Result of parsing one expression.
pub struct ParseResult {
    /// `Some` only when no error was reported.
    pub expr: Option<Expr>,
    pub diagnostics: Diagnostics,
}

impl<'src> Parser<'src> {
    pub fn new(tokens: Vec<Token>, origin: &'src Location) -> Self {
        Self {
            tokens,
            pos: 0,
            origin,
            diagnostics: Diagnostics::empty(),
            depth: 0,
        }
    }

    // ── Token Cursor ──────────────────────────────────────────────────────────

    pub(crate) fn peek(&self) -> &Token {
        static EOF: Token = Token {
            kind: TokenKind::Eof,
            span: Span {
                start_col: 1,
                end_col: 1,
            },
        };
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .unwrap_or(&EOF)
    }

    pub(crate) fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    pub(crate) fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    pub(crate) fn current_span(&self) -> Span {
        self.peek().span
    }

    pub(crate) fn at_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    pub(crate) fn check_exact(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == kind
    }

    /// If the current token matches, advance and return `true`.
    pub(crate) fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check_exact(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    // ── Expect Helpers ────────────────────────────────────────────────────────

    /// Expect a specific token kind. Returns the token if matched, or reports
    /// an error.
    pub(crate) fn expect(&mut self, expected: &TokenKind) -> Option<Token> {
        if self.check_exact(expected) {
            Some(self.advance())
        } else {
            self.error_at_current(
                ErrorCode::UNEXPECTED_TOKEN,
                format!("expected {}, got {}", expected, self.peek_kind()),
            );
            None
        }
    }

    pub(crate) fn expect_identifier(&mut self) -> Option<Ident> {
        match self.peek_kind().clone() {
            TokenKind::Identifier(name) => {
                let span = self.advance().span;
                Some(Ident::new(name, span))
            }
            _ => {
                self.error_at_current(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("expected a name, got {}", self.peek_kind()),
                );
                None
            }
        }
    }

    // ── Error Reporting ───────────────────────────────────────────────────────

    pub(crate) fn error_at_current(&mut self, code: ErrorCode, message: impl Into<String>) {
        let span = self.current_span();
        self.error_at(code, message, span);
    }

    pub(crate) fn error_at(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        let location = self.origin.clone().with_span(span);
        self.diagnostics.push(Diagnostic::new(code, message, location));
    }

    // ── Public API ────────────────────────────────────────────────────────────

    /// Parse the whole token stream as one expression.
    pub fn parse(mut self) -> ParseResult {
        if self.at_end() {
            self.error_at_current(ErrorCode::EMPTY_EXPRESSION, "empty expression");
            return ParseResult {
                expr: None,
                diagnostics: self.diagnostics,
            };
        }

        let expr = self.parse_expression();
        if expr.is_some() && !self.at_end() {
            self.error_at_current(
                ErrorCode::UNEXPECTED_TOKEN,
                format!("unexpected {} after expression", self.peek_kind()),
            );
        }

        let expr = if self.diagnostics.has_errors() {
            None
        } else {
            expr
        };
        ParseResult {
            expr,
            diagnostics: self.diagnostics,
        }
    }
}

/// Lex and parse `source`, reporting problems at `origin`.
///
/// Lexer diagnostics come first. The expression is only returned when
/// neither stage reported an error.
pub fn parse_expression(source: &str, origin: &Location) -> ParseResult {
    let lexed = Lexer::new(source, origin).lex();
    let parsed = Parser::new(lexed.tokens, origin).parse();

    let mut diagnostics = lexed.diagnostics;
    let lex_failed = diagnostics.has_errors();
    diagnostics.extend(parsed.diagnostics);
    ParseResult {
        expr: if lex_failed { None } else { parsed.expr },
        diagnostics,
    }
}
