//! Binding contexts
//!
//! A context is wherever an import lands. Instead of injecting members into
//! live objects, each context owns explicit tables that strategies register
//! into: a method table of zero-argument accessors and, optionally, a
//! constant table.

use crate::error::ImportError;
use crate::module::ModuleHandle;
use crate::strategy::ConflictPolicy;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Zero-argument accessor returning a module
pub type Accessor = Arc<dyn Fn() -> ModuleHandle + Send + Sync>;

/// One accessor plus the module it was created for
#[derive(Clone)]
pub struct MethodBinding {
    origin: ModuleHandle,
    accessor: Accessor,
}

impl MethodBinding {
    fn returning(handle: &ModuleHandle) -> Self {
        let captured = handle.clone();
        Self {
            origin: handle.clone(),
            accessor: Arc::new(move || captured.clone()),
        }
    }

    pub fn origin(&self) -> &ModuleHandle {
        &self.origin
    }

    pub fn invoke(&self) -> ModuleHandle {
        (self.accessor)()
    }
}

impl fmt::Debug for MethodBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodBinding")
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

/// Accessors by name
#[derive(Debug, Default)]
pub struct MethodTable {
    entries: RwLock<HashMap<String, MethodBinding>>,
}

impl MethodTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define `name` as an accessor for `handle`, applying `policy` if the
    /// name is already taken. Check and insert happen under one lock.
    pub fn bind(
        &self,
        context: &str,
        name: &str,
        handle: &ModuleHandle,
        policy: ConflictPolicy,
    ) -> Result<(), ImportError> {
        let mut entries = self.entries.write();
        if let Some(existing) = entries.get(name) {
            policy.resolve(context, name, existing.origin(), handle)?;
        }
        entries.insert(name.to_string(), MethodBinding::returning(handle));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<MethodBinding> {
        self.entries.read().get(name).cloned()
    }

    /// Invoke the accessor bound under `name`
    pub fn call(&self, name: &str) -> Option<ModuleHandle> {
        self.get(name).map(|binding| binding.invoke())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.read().contains_key(name)
    }

    pub fn remove(&self, name: &str) -> Option<ModuleHandle> {
        self.entries.write().remove(name).map(|binding| binding.origin)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

/// Constant bindings by name
#[derive(Debug, Default)]
pub struct ConstantTable {
    entries: RwLock<HashMap<String, ModuleHandle>>,
}

impl ConstantTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(
        &self,
        context: &str,
        name: &str,
        handle: &ModuleHandle,
        policy: ConflictPolicy,
    ) -> Result<(), ImportError> {
        let mut entries = self.entries.write();
        if let Some(existing) = entries.get(name) {
            policy.resolve(context, name, existing, handle)?;
        }
        entries.insert(name.to_string(), handle.clone());
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<ModuleHandle> {
        self.entries.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.read().contains_key(name)
    }

    pub fn remove(&self, name: &str) -> Option<ModuleHandle> {
        self.entries.write().remove(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

/// Something imports can be bound into
pub trait Context: Send + Sync {
    /// Human-readable label used in errors and logs
    fn describe(&self) -> String;

    fn methods(&self) -> &MethodTable;

    /// Own constant table, if this context can hold constants
    fn constants(&self) -> Option<&ConstantTable> {
        None
    }

    /// Context that receives constants on behalf of this one
    fn enclosing(&self) -> Option<&dyn Context> {
        None
    }

    /// Constant table used by the constant strategy: own, else enclosing
    fn constant_table(&self) -> Option<&ConstantTable> {
        self.constants()
            .or_else(|| self.enclosing().and_then(|outer| outer.constant_table()))
    }

    fn responds_to(&self, name: &str) -> bool {
        self.methods().contains(name)
    }

    /// Invoke an accessor defined by the method strategy
    fn call_method(&self, name: &str) -> Result<ModuleHandle, ImportError> {
        self.methods()
            .call(name)
            .ok_or_else(|| ImportError::MethodNotFound {
                context: self.describe(),
                name: name.to_string(),
            })
    }

    fn has_constant(&self, name: &str) -> bool {
        self.constant_table()
            .map(|table| table.contains(name))
            .unwrap_or(false)
    }

    /// Look up a constant defined by the constant strategy
    fn constant(&self, name: &str) -> Result<ModuleHandle, ImportError> {
        self.constant_table()
            .and_then(|table| table.get(name))
            .ok_or_else(|| ImportError::ConstantNotFound {
                context: self.describe(),
                name: name.to_string(),
            })
    }
}

/// Module-like context holding both accessors and constants
#[derive(Debug, Default)]
pub struct Scope {
    name: String,
    methods: MethodTable,
    constants: ConstantTable,
}

impl Scope {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: MethodTable::new(),
            constants: ConstantTable::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Context for Scope {
    fn describe(&self) -> String {
        self.name.clone()
    }

    fn methods(&self) -> &MethodTable {
        &self.methods
    }

    fn constants(&self) -> Option<&ConstantTable> {
        Some(&self.constants)
    }
}

/// Object-like context: its own accessors, constants live on its class
#[derive(Debug)]
pub struct Instance {
    class: Arc<Scope>,
    methods: MethodTable,
}

impl Instance {
    pub fn new(class: Arc<Scope>) -> Self {
        Self {
            class,
            methods: MethodTable::new(),
        }
    }

    pub fn class(&self) -> &Arc<Scope> {
        &self.class
    }
}

impl Context for Instance {
    fn describe(&self) -> String {
        format!("#<{}>", self.class.name())
    }

    fn methods(&self) -> &MethodTable {
        &self.methods
    }

    fn enclosing(&self) -> Option<&dyn Context> {
        Some(self.class.as_ref())
    }
}
