//! Errors surfaced by the import pipeline
//!
//! Every variant is `Clone` so a failed load can be handed to all callers
//! that were waiting on the same registry slot.

use crate::artifact::ParseError;
use crate::module::EvalError;
use crate::namespace::{ArtifactPath, NamespaceError};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum ImportError {
    /// Malformed namespace
    #[error("Invalid namespace: {0}")]
    InvalidNamespace(#[from] NamespaceError),

    /// No file for the artifact path under any search root
    #[error("Artifact not found: {namespace} (tried: {tried:?})")]
    ArtifactNotFound { namespace: String, tried: Vec<PathBuf> },

    /// I/O failure while reading an artifact
    #[error("IO error reading {}: {message}", .path.display())]
    Io { path: PathBuf, message: String },

    /// Artifact source failed to lex or parse
    #[error("Parse error in {}:{error}", .path.display())]
    Parse { path: PathBuf, error: ParseError },

    /// Artifact declarations failed to evaluate
    #[error("Error evaluating {namespace}: {error}")]
    Eval { namespace: String, error: EvalError },

    /// Unrecognized binding strategy token
    #[error("Unknown binding strategy: {0} (expected value, method, const or local)")]
    UnknownStrategy(String),

    /// Name already bound to a module from another artifact, or to a plain constant
    #[error("Binding conflict on {context}: '{name}' is bound to {existing}, refusing to rebind to {incoming}")]
    BindingConflict {
        context: String,
        name: String,
        existing: String,
        incoming: String,
    },

    /// Alias or derived name unusable for the chosen strategy
    #[error("Invalid binding name '{name}': {reason}")]
    InvalidBindingName { name: String, reason: &'static str },

    /// Neither the context nor its enclosing context holds constants
    #[error("{context} cannot hold constants")]
    NoConstantScope { context: String },

    #[error("Uninitialized constant {context}::{name}")]
    ConstantNotFound { context: String, name: String },

    #[error("Undefined method '{name}' for {context}")]
    MethodNotFound { context: String, name: String },

    /// An artifact (transitively) imports itself
    #[error("Circular import of {0}")]
    CircularImport(ArtifactPath),

    /// Gave up waiting for another caller's load
    #[error("Timed out after {waited:?} waiting for {path} to load")]
    LoadTimeout { path: ArtifactPath, waited: Duration },

    /// The loading caller unwound before finishing
    #[error("Load of {0} was aborted")]
    LoadAborted(ArtifactPath),
}

impl ImportError {
    pub(crate) fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        ImportError::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }
}
