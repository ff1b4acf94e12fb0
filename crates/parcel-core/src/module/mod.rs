//! Module handles
//!
//! A [`ModuleHandle`] is the cached, loaded representation of an artifact.
//! Handles are cheap to clone and compare by identity: two handles are
//! equal only if they point at the same loaded module.

mod eval;

pub use eval::{EvalError, MAX_CALL_DEPTH};
pub(crate) use eval::evaluate_artifact;

use crate::artifact::FunctionDecl;
use crate::namespace::{ArtifactPath, Namespace};
use crate::value::Value;
use parking_lot::{ReentrantMutex, ReentrantMutexGuard, RwLock};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_LOAD_ID: AtomicU64 = AtomicU64::new(1);

/// Shared handle to a loaded module
#[derive(Clone)]
pub struct ModuleHandle(Arc<ModuleInner>);

struct ModuleInner {
    name: Namespace,
    artifact_path: ArtifactPath,
    source_file: PathBuf,
    load_id: u64,
    scope: RwLock<ModuleScope>,
    /// Serializes scope extension through `load`
    extension: ReentrantMutex<()>,
}

/// Declarations evaluated into a module
#[derive(Debug, Default)]
struct ModuleScope {
    constants: HashMap<String, Value>,
    functions: HashMap<String, Arc<FunctionDecl>>,
    members: HashMap<String, ModuleHandle>,
    sources: Vec<PathBuf>,
}

/// Sorted listing of a module's declarations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Exports {
    pub constants: Vec<String>,
    /// Function name and arity
    pub functions: Vec<(String, usize)>,
    pub members: Vec<String>,
}

impl ModuleHandle {
    /// Create an empty module for `name`, sourced from `source_file`.
    ///
    /// Each call allocates a fresh identity and load id.
    pub fn new(name: Namespace, source_file: impl Into<PathBuf>) -> Self {
        let artifact_path = name.artifact_path();
        Self(Arc::new(ModuleInner {
            name,
            artifact_path,
            source_file: source_file.into(),
            load_id: NEXT_LOAD_ID.fetch_add(1, Ordering::Relaxed),
            scope: RwLock::new(ModuleScope::default()),
            extension: ReentrantMutex::new(()),
        }))
    }

    /// Canonical namespace
    pub fn name(&self) -> &Namespace {
        &self.0.name
    }

    /// Registry key this module was loaded under
    pub fn artifact_path(&self) -> &ArtifactPath {
        &self.0.artifact_path
    }

    /// File the module was read from
    pub fn source_file(&self) -> &Path {
        &self.0.source_file
    }

    pub fn source_dir(&self) -> Option<&Path> {
        self.0.source_file.parent()
    }

    /// Process-unique id assigned at construction
    pub fn load_id(&self) -> u64 {
        self.0.load_id
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &ModuleHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Look up a declared constant
    pub fn constant(&self, name: &str) -> Result<Value, EvalError> {
        self.constant_value(name)
            .ok_or_else(|| EvalError::UnknownConstant {
                module: self.name().to_string(),
                name: name.to_string(),
            })
    }

    pub(crate) fn constant_value(&self, name: &str) -> Option<Value> {
        self.0.scope.read().constants.get(name).cloned()
    }

    /// Nested module bound into this one by an `import`
    pub fn member(&self, name: &str) -> Option<ModuleHandle> {
        self.0.scope.read().members.get(name).cloned()
    }

    pub fn function(&self, name: &str) -> Option<Arc<FunctionDecl>> {
        self.0.scope.read().functions.get(name).cloned()
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.0.scope.read().functions.contains_key(name)
    }

    /// Invoke a declared function directly on the module
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value, EvalError> {
        eval::call_function(self, name, args, 0)
    }

    pub fn exports(&self) -> Exports {
        let scope = self.0.scope.read();
        let mut constants: Vec<String> = scope.constants.keys().cloned().collect();
        let mut functions: Vec<(String, usize)> = scope
            .functions
            .values()
            .map(|decl| (decl.name.clone(), decl.arity()))
            .collect();
        let mut members: Vec<String> = scope.members.keys().cloned().collect();
        constants.sort();
        functions.sort();
        members.sort();
        Exports {
            constants,
            functions,
            members,
        }
    }

    /// Files evaluated into this module, in order
    pub fn sources(&self) -> Vec<PathBuf> {
        self.0.scope.read().sources.clone()
    }

    pub(crate) fn define_constant(&self, name: &str, value: Value) -> Option<Value> {
        self.0.scope.write().constants.insert(name.to_string(), value)
    }

    pub(crate) fn define_function(&self, decl: Arc<FunctionDecl>) -> Option<Arc<FunctionDecl>> {
        self.0
            .scope
            .write()
            .functions
            .insert(decl.name.clone(), decl)
    }

    pub(crate) fn define_member(&self, name: &str, handle: ModuleHandle) -> Option<ModuleHandle> {
        self.0.scope.write().members.insert(name.to_string(), handle)
    }

    pub(crate) fn record_source(&self, path: PathBuf) {
        self.0.scope.write().sources.push(path);
    }

    /// Undo [`record_source`](Self::record_source) after a failed evaluation
    pub(crate) fn forget_source(&self, path: &Path) {
        self.0.scope.write().sources.retain(|source| source != path);
    }

    pub(crate) fn lock_extension(&self) -> ReentrantMutexGuard<'_, ()> {
        self.0.extension.lock()
    }
}

impl PartialEq for ModuleHandle {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for ModuleHandle {}

impl fmt::Debug for ModuleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#<Module({}):0x{:014x}>",
            self.name(),
            Arc::as_ptr(&self.0) as usize
        )
    }
}

impl fmt::Display for ModuleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
