//! Artifact source format
//!
//! An artifact is a declarative unit: constants, functions, nested imports
//! and sibling loads. Its declarations are the only thing a loaded module
//! exposes.
//!
//! ```text
//! const GREETING = "hi"
//! fn hello() = GREETING
//! fn greet(name) = GREETING + ", " + name
//! import "foo" as fee
//! import "foo/baz" to const
//! load "helpers"
//! ```

pub mod ast;
pub mod guards;
pub mod lexer;
pub mod parser;

pub use ast::{Artifact, BinaryOp, Expr, FunctionDecl, Item};
pub use lexer::{tokenize, Span, Token};
pub use parser::{parse, Parser};

use thiserror::Error;

/// Lexing or parsing failure with its source location
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{}:{}: {}", .span.line, .span.column, .message)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

impl ParseError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}
