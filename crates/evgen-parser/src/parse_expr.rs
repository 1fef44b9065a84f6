//! Expression grammar.
//!
//! Precedence (lowest → highest):
//! 3. `+`, `-`
//! 2. `*`, `/`
//! 1. unary `-`
//! 0. primaries: literals, `( )`, names, calls, `.` paths, `::` automatism
//!    functions
//!
//! Binary operators are left-associative and parsed by precedence climbing.

use evgen_lexer::token::TokenKind;
use evgen_types::expr::{BinaryOp, Expr, ExprKind, Ident};
use evgen_types::ErrorCode;

use crate::parser::{Parser, MAX_NESTING};

impl<'src> Parser<'src> {
    // ══════════════════════════════════════════════════════════════════════════
    // Entry Point
    // ══════════════════════════════════════════════════════════════════════════

    pub(crate) fn parse_expression(&mut self) -> Option<Expr> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            self.error_at_current(
                ErrorCode::UNEXPECTED_TOKEN,
                format!("expression nesting deeper than {MAX_NESTING} levels"),
            );
            self.depth -= 1;
            return None;
        }
        let result = self.parse_binary(1);
        self.depth -= 1;
        result
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Operators
    // ══════════════════════════════════════════════════════════════════════════

    fn binary_op(&self) -> Option<BinaryOp> {
        match self.peek_kind() {
            TokenKind::Plus => Some(BinaryOp::Add),
            TokenKind::Minus => Some(BinaryOp::Sub),
            TokenKind::Star => Some(BinaryOp::Mul),
            TokenKind::Slash => Some(BinaryOp::Div),
            _ => None,
        }
    }

    /// `Binary = Unary { op Unary }` for operators binding at least as
    /// tightly as `min_precedence`.
    fn parse_binary(&mut self, min_precedence: u8) -> Option<Expr> {
        let mut left = self.parse_unary()?;
        while let Some(op) = self.binary_op() {
            if op.precedence() < min_precedence {
                break;
            }
            self.advance();
            let right = self.parse_binary(op.precedence() + 1)?;
            let span = left.span.merge(right.span);
            left = Expr::new(
                ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            );
        }
        Some(left)
    }

    /// `Unary = "-" Unary | Primary`
    fn parse_unary(&mut self) -> Option<Expr> {
        if self.check_exact(&TokenKind::Minus) {
            let start = self.advance().span;
            self.depth += 1;
            let operand = if self.depth > MAX_NESTING {
                self.error_at_current(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("expression nesting deeper than {MAX_NESTING} levels"),
                );
                None
            } else {
                self.parse_unary()
            };
            self.depth -= 1;
            let operand = operand?;
            let span = start.merge(operand.span);
            return Some(Expr::new(ExprKind::Negate(Box::new(operand)), span));
        }
        self.parse_primary()
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Primaries
    // ══════════════════════════════════════════════════════════════════════════

    fn parse_primary(&mut self) -> Option<Expr> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Number(value) => {
                self.advance();
                Some(Expr::new(ExprKind::Number(value), token.span))
            }
            TokenKind::Text(value) => {
                self.advance();
                Some(Expr::new(ExprKind::Text(value), token.span))
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expression()?;
                let close = self.expect(&TokenKind::RParen)?;
                // Parentheses only group; keep the inner node with the
                // wider span.
                Some(Expr::new(inner.kind, token.span.merge(close.span)))
            }
            TokenKind::Identifier(name) => {
                self.advance();
                self.parse_name(Ident::new(name, token.span))
            }
            TokenKind::Eof => {
                self.error_at_current(ErrorCode::UNEXPECTED_TOKEN, "unexpected end of expression");
                None
            }
            other => {
                self.error_at_current(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("expected a value, got {other}"),
                );
                None
            }
        }
    }

    /// Everything that can follow a leading identifier.
    fn parse_name(&mut self, root: Ident) -> Option<Expr> {
        // Name(args)
        if self.check_exact(&TokenKind::LParen) {
            let (args, end) = self.parse_arguments()?;
            let span = root.span.merge(end);
            return Some(Expr::new(
                ExprKind::Call {
                    function: root,
                    args,
                },
                span,
            ));
        }

        if !self.eat(&TokenKind::Dot) {
            let span = root.span;
            return Some(Expr::new(ExprKind::Name(root), span));
        }

        let member = self.expect_identifier()?;

        // Object.Automatism::Function[(args)]
        if self.eat(&TokenKind::ColonColon) {
            let method = self.expect_identifier()?;
            let (args, end) = if self.check_exact(&TokenKind::LParen) {
                self.parse_arguments()?
            } else {
                (Vec::new(), method.span)
            };
            let span = root.span.merge(end);
            return Some(Expr::new(
                ExprKind::AutomatismCall {
                    object: root,
                    automatism: member,
                    method,
                    args,
                },
                span,
            ));
        }

        // Object.Function(args)
        if self.check_exact(&TokenKind::LParen) {
            let (args, end) = self.parse_arguments()?;
            let span = root.span.merge(end);
            return Some(Expr::new(
                ExprKind::MethodCall {
                    object: root,
                    method: member,
                    args,
                },
                span,
            ));
        }

        // Root.child.child
        let mut segments = vec![member];
        while self.eat(&TokenKind::Dot) {
            segments.push(self.expect_identifier()?);
        }
        if matches!(self.peek_kind(), TokenKind::LParen | TokenKind::ColonColon) {
            self.error_at_current(
                ErrorCode::UNEXPECTED_TOKEN,
                format!(
                    "unexpected {} after a variable path; only 'Object.Function(...)' can be called",
                    self.peek_kind()
                ),
            );
            return None;
        }
        let end = segments.last().map_or(root.span, |s| s.span);
        let span = root.span.merge(end);
        Some(Expr::new(ExprKind::Path { root, segments }, span))
    }

    /// `"(" [ Expr { "," Expr } ] ")"`, returning the closing paren span.
    fn parse_arguments(&mut self) -> Option<(Vec<Expr>, evgen_types::Span)> {
        self.expect(&TokenKind::LParen)?;
        let mut args = Vec::new();
        if let Some(close) = self.peek_close_paren() {
            return Some((args, close));
        }
        loop {
            args.push(self.parse_expression()?);
            if self.eat(&TokenKind::Comma) {
                continue;
            }
            let close = self.expect(&TokenKind::RParen)?;
            return Some((args, close.span));
        }
    }

    fn peek_close_paren(&mut self) -> Option<evgen_types::Span> {
        if self.check_exact(&TokenKind::RParen) {
            Some(self.advance().span)
        } else {
            None
        }
    }
}
