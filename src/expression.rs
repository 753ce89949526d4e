//! The expression and template mini-language: tokenizer, parser and AST.

pub(crate) mod ast;
pub(crate) mod lexer;
pub(crate) mod parser;
pub(crate) mod template;

pub use ast::{BinaryOp, Expr, FieldSet, PARENT_KEY, UnaryOp};
pub use lexer::{Token, TokenKind, tokenize};
pub use parser::{parse, parse_expression, parse_template};
pub use template::{is_template, tokenize_literal};
