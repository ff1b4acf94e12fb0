//! Evaluation of artifact declarations and function bodies

use super::ModuleHandle;
use crate::artifact::{Artifact, BinaryOp, Expr, Item};
use crate::error::ImportError;
use crate::import::Importer;
use crate::value::Value;
use thiserror::Error;
use tracing::{debug, warn};

/// Maximum nesting of function calls
pub const MAX_CALL_DEPTH: usize = 256;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvalError {
    #[error("Undefined name '{name}' in {module}")]
    UnknownName { module: String, name: String },

    #[error("Undefined function '{name}' in {module}")]
    UnknownFunction { module: String, name: String },

    #[error("Uninitialized constant {module}::{name}")]
    UnknownConstant { module: String, name: String },

    #[error("Function '{function}' expects {expected} argument(s), got {found}")]
    ArityMismatch {
        function: String,
        expected: usize,
        found: usize,
    },

    #[error("Unsupported operand types for {op}: {lhs} and {rhs}")]
    TypeMismatch {
        op: &'static str,
        lhs: &'static str,
        rhs: &'static str,
    },

    #[error("Unsupported operand type for unary {op}: {found}")]
    InvalidOperand { op: &'static str, found: &'static str },

    #[error("Cannot access '{name}' on a value of type {found}")]
    NotAModule { name: String, found: &'static str },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Integer overflow in {0}")]
    Overflow(&'static str),

    #[error("Maximum call depth ({0}) exceeded")]
    CallDepthExceeded(usize),
}

/// Evaluate a parsed artifact into `module`, declaration by declaration.
pub(crate) fn evaluate_artifact(
    module: &ModuleHandle,
    artifact: &Artifact,
    importer: &Importer,
) -> Result<(), ImportError> {
    for item in &artifact.items {
        match item {
            Item::Const { name, value, .. } => {
                let frame = Frame::top_level(module);
                let value = frame.eval(value).map_err(|error| ImportError::Eval {
                    namespace: module.name().to_string(),
                    error,
                })?;
                if module.define_constant(name, value).is_some() {
                    warn!(module = %module.name(), constant = %name, "constant redefined");
                }
            }
            Item::Function(decl) => {
                module.define_function(decl.clone());
            }
            Item::Import {
                namespace,
                alias,
                strategy,
                ..
            } => {
                importer.import_into_module(module, namespace, alias.as_deref(), *strategy)?;
            }
            Item::Load { name, .. } => {
                importer.load_relative(module, name)?;
            }
        }
    }
    Ok(())
}

pub(crate) fn call_function(
    module: &ModuleHandle,
    name: &str,
    args: &[Value],
    depth: usize,
) -> Result<Value, EvalError> {
    if depth >= MAX_CALL_DEPTH {
        return Err(EvalError::CallDepthExceeded(MAX_CALL_DEPTH));
    }

    let decl = module
        .function(name)
        .ok_or_else(|| EvalError::UnknownFunction {
            module: module.name().to_string(),
            name: name.to_string(),
        })?;

    if decl.arity() != args.len() {
        return Err(EvalError::ArityMismatch {
            function: name.to_string(),
            expected: decl.arity(),
            found: args.len(),
        });
    }

    debug!(module = %module.name(), function = name, depth, "call");
    let frame = Frame {
        module,
        params: &decl.params,
        args,
        depth,
    };
    frame.eval(&decl.body)
}

/// Bindings visible while evaluating one expression
struct Frame<'a> {
    module: &'a ModuleHandle,
    params: &'a [String],
    args: &'a [Value],
    depth: usize,
}

impl<'a> Frame<'a> {
    fn top_level(module: &'a ModuleHandle) -> Self {
        Self {
            module,
            params: &[],
            args: &[],
            depth: 0,
        }
    }

    fn eval(&self, expr: &Expr) -> Result<Value, EvalError> {
        match expr {
            Expr::Nil => Ok(Value::Nil),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Int(n) => Ok(Value::Int(*n)),
            Expr::Float(n) => Ok(Value::Float(*n)),
            Expr::Str(s) => Ok(Value::from(s.as_str())),
            Expr::List(elements) => Ok(Value::from(self.eval_all(elements)?)),
            Expr::Name(name) => self.lookup(name),
            Expr::Call { callee, args } => {
                let args = self.eval_all(args)?;
                call_function(self.module, callee, &args, self.depth + 1)
            }
            Expr::Member { target, name } => {
                let target = self.eval(target)?;
                member_of(&target, name, self.depth)
            }
            Expr::MethodCall { target, name, args } => {
                let target = self.eval(target)?;
                let handle = target.as_module().ok_or_else(|| EvalError::NotAModule {
                    name: name.clone(),
                    found: target.type_name(),
                })?;
                let args = self.eval_all(args)?;
                call_function(handle, name, &args, self.depth + 1)
            }
            Expr::Neg(operand) => match self.eval(operand)? {
                Value::Int(n) => n.checked_neg().map(Value::Int).ok_or(EvalError::Overflow("-")),
                Value::Float(n) => Ok(Value::Float(-n)),
                other => Err(EvalError::InvalidOperand {
                    op: "-",
                    found: other.type_name(),
                }),
            },
            Expr::Binary { op, lhs, rhs } => {
                let lhs = self.eval(lhs)?;
                let rhs = self.eval(rhs)?;
                binary(*op, &lhs, &rhs)
            }
        }
    }

    fn eval_all(&self, exprs: &[Expr]) -> Result<Vec<Value>, EvalError> {
        exprs.iter().map(|e| self.eval(e)).collect()
    }

    /// Parameters shadow constants, constants shadow members
    fn lookup(&self, name: &str) -> Result<Value, EvalError> {
        if let Some(index) = self.params.iter().position(|p| p == name) {
            return Ok(self.args[index].clone());
        }
        if let Some(value) = self.module.constant_value(name) {
            return Ok(value);
        }
        if let Some(member) = self.module.member(name) {
            return Ok(Value::Module(member));
        }
        Err(EvalError::UnknownName {
            module: self.module.name().to_string(),
            name: name.to_string(),
        })
    }
}

/// `target.name` without arguments: constant, nested module, or a
/// zero-argument function call.
fn member_of(target: &Value, name: &str, depth: usize) -> Result<Value, EvalError> {
    let handle = target.as_module().ok_or_else(|| EvalError::NotAModule {
        name: name.to_string(),
        found: target.type_name(),
    })?;
    if let Some(value) = handle.constant_value(name) {
        return Ok(value);
    }
    if let Some(member) = handle.member(name) {
        return Ok(Value::Module(member));
    }
    if handle.has_function(name) {
        return call_function(handle, name, &[], depth + 1);
    }
    Err(EvalError::UnknownName {
        module: handle.name().to_string(),
        name: name.to_string(),
    })
}

fn binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    let symbol = op.symbol();
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => {
            let result = match op {
                BinaryOp::Add => a.checked_add(*b),
                BinaryOp::Sub => a.checked_sub(*b),
                BinaryOp::Mul => a.checked_mul(*b),
                BinaryOp::Div => {
                    if *b == 0 {
                        return Err(EvalError::DivisionByZero);
                    }
                    a.checked_div(*b)
                }
            };
            result.map(Value::Int).ok_or(EvalError::Overflow(symbol))
        }
        (Value::Float(_), _) | (_, Value::Float(_)) => match (lhs.as_float(), rhs.as_float()) {
            (Some(a), Some(b)) => Ok(Value::Float(match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => a / b,
            })),
            _ => Err(EvalError::TypeMismatch {
                op: symbol,
                lhs: lhs.type_name(),
                rhs: rhs.type_name(),
            }),
        },
        (Value::Str(a), Value::Str(b)) if op == BinaryOp::Add => {
            Ok(Value::from(format!("{}{}", a, b)))
        }
        (Value::List(a), Value::List(b)) if op == BinaryOp::Add => {
            Ok(Value::from(a.iter().chain(b.iter()).cloned().collect::<Vec<_>>()))
        }
        _ => Err(EvalError::TypeMismatch {
            op: symbol,
            lhs: lhs.type_name(),
            rhs: rhs.type_name(),
        }),
    }
}
