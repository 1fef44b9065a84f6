//! evgen parser: converts an expression token stream into an AST.

mod parse_expr;
mod parser;

pub use parser::{parse_expression, ParseResult, Parser, MAX_NESTING};
