//! Syntax tree for artifact sources

use super::Span;
use crate::strategy::Strategy;
use std::sync::Arc;

/// A parsed artifact: its declarations in source order
#[derive(Debug, Clone, Default)]
pub struct Artifact {
    pub items: Vec<Item>,
}

impl Artifact {
    pub fn new(items: Vec<Item>) -> Self {
        Self { items }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

/// Top-level declaration
#[derive(Debug, Clone)]
pub enum Item {
    /// `const NAME = expr`
    Const { name: String, value: Expr, span: Span },

    /// `fn name(params) = expr`
    Function(Arc<FunctionDecl>),

    /// `import "ns" [as alias] [to strategy]`
    Import {
        namespace: String,
        alias: Option<String>,
        strategy: Strategy,
        span: Span,
    },

    /// `load "relative/name"`
    Load { name: String, span: Span },
}

/// Function declaration. Shared between the AST and the module scope.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: String,
    pub params: Vec<String>,
    pub body: Expr,
    pub span: Span,
}

impl FunctionDecl {
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Expr>),

    /// Parameter, constant or module member
    Name(String),

    /// `f(args)` on the enclosing module
    Call { callee: String, args: Vec<Expr> },

    /// `target.name`
    Member { target: Box<Expr>, name: String },

    /// `target.name(args)`
    MethodCall {
        target: Box<Expr>,
        name: String,
        args: Vec<Expr>,
    },

    Neg(Box<Expr>),

    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}
