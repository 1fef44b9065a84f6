//! Expression AST produced by the parser.
//!
//! The AST is purely syntactic: names are not resolved and nothing is
//! typed. The compiler's checker turns it into [`crate::ir::TypedExpr`].

use crate::location::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A name with its position in the expression text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

/// A parsed expression node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    /// `12`, `0.5`
    Number(f64),
    /// `"text"` with escapes already decoded.
    Text(String),
    /// A bare identifier: variable, object or zero-argument function.
    Name(Ident),
    /// `Name(args)`: a free function.
    Call { function: Ident, args: Vec<Expr> },
    /// `Root.child.child` without parentheses: variable children, or a
    /// zero-argument object expression when `Root` is an object.
    Path { root: Ident, segments: Vec<Ident> },
    /// `Object.Function(args)`
    MethodCall {
        object: Ident,
        method: Ident,
        args: Vec<Expr>,
    },
    /// `Object.Automatism::Function(args)`; parentheses are optional.
    AutomatismCall {
        object: Ident,
        automatism: Ident,
        method: Ident,
        args: Vec<Expr>,
    },
    /// `-operand`
    Negate(Box<Expr>),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

/// Arithmetic operators. `+` doubles as string concatenation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    /// Binding strength: higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Add | BinaryOp::Sub => 1,
            BinaryOp::Mul | BinaryOp::Div => 2,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        }
    }

    pub fn apply(self, left: f64, right: f64) -> f64 {
        match self {
            BinaryOp::Add => left + right,
            BinaryOp::Sub => left - right,
            BinaryOp::Mul => left * right,
            BinaryOp::Div => left / right,
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
