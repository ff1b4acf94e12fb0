//! Import facade
//!
//! [`Importer::import`] is the single entry point consumers use: parse the
//! namespace, fetch or load the module through the registry, then hand it to
//! the chosen binding strategy.

use crate::config::ParcelConfig;
use crate::context::Context;
use crate::error::ImportError;
use crate::loader::ArtifactLoader;
use crate::module::ModuleHandle;
use crate::namespace::Namespace;
use crate::registry::ModuleRegistry;
use crate::strategy::{self, validate_method_name, Strategy};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Per-call options for [`Importer::import`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportOptions {
    /// Name to bind under instead of the derived one
    pub alias: Option<String>,
    /// Strategy, falling back to the configured default
    pub to: Option<Strategy>,
}

impl ImportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn to(mut self, strategy: Strategy) -> Self {
        self.to = Some(strategy);
        self
    }

    /// Set the strategy from its textual token
    pub fn parse_to(self, token: &str) -> Result<Self, ImportError> {
        Ok(self.to(token.parse()?))
    }
}

pub struct Importer {
    registry: Arc<ModuleRegistry>,
    loader: ArtifactLoader,
    config: ParcelConfig,
}

impl Importer {
    /// Importer backed by the process-wide registry
    pub fn new(config: ParcelConfig) -> Self {
        Self::with_registry(config, ModuleRegistry::global())
    }

    pub fn with_registry(config: ParcelConfig, registry: Arc<ModuleRegistry>) -> Self {
        let loader = ArtifactLoader::new(config.loader.search_paths.clone());
        Self {
            registry,
            loader,
            config,
        }
    }

    /// Import `namespace` into `ctx`.
    ///
    /// Namespace and binding name are validated before the registry is
    /// touched, so a malformed request never triggers a load.
    pub fn import(
        &self,
        ctx: &dyn Context,
        namespace: &str,
        options: ImportOptions,
    ) -> Result<ModuleHandle, ImportError> {
        let strategy = options
            .to
            .unwrap_or(self.config.bindings.default_strategy);
        let namespace = Namespace::parse(namespace)?;
        let name = strategy.binding_name(&namespace, options.alias.as_deref())?;

        let handle = self.resolve(&namespace)?;
        strategy::bind(
            strategy,
            ctx,
            name.as_deref(),
            &handle,
            self.config.bindings.on_conflict,
        )?;
        Ok(handle)
    }

    /// Fetch the module for `namespace`, loading it on first use
    pub fn resolve(&self, namespace: &Namespace) -> Result<ModuleHandle, ImportError> {
        self.registry.get_or_create(
            &namespace.artifact_path(),
            self.config.load_timeout(),
            |path| self.loader.load(path, self),
        )
    }

    /// Import without binding anything
    pub fn import_value(&self, namespace: &str) -> Result<ModuleHandle, ImportError> {
        self.resolve(&Namespace::parse(namespace)?)
    }

    /// Runtime half of `import_local!`: check `name` is usable as a local,
    /// then return the handle for the caller to bind.
    pub fn import_local(&self, namespace: &str, name: &str) -> Result<ModuleHandle, ImportError> {
        validate_method_name(name)?;
        self.import_value(namespace)
    }

    /// Import declared inside an artifact: bind into `module` itself
    pub(crate) fn import_into_module(
        &self,
        module: &ModuleHandle,
        namespace: &str,
        alias: Option<&str>,
        strategy: Strategy,
    ) -> Result<(), ImportError> {
        let namespace = Namespace::parse(namespace)?;
        let name = strategy.binding_name(&namespace, alias)?;
        let handle = self.resolve(&namespace)?;
        debug!(module = %module.name(), import = %namespace, strategy = %strategy, "nested import");
        strategy::bind_into_module(
            strategy,
            module,
            name.as_deref(),
            &handle,
            self.config.bindings.on_conflict,
        )
    }

    /// Evaluate a sibling artifact into `module`
    pub fn load_relative(&self, module: &ModuleHandle, name: &str) -> Result<PathBuf, ImportError> {
        self.loader.load_relative(module, name, self)
    }

    /// Evict `namespace` from the registry
    pub fn delete(&self, namespace: &str) -> Result<Option<ModuleHandle>, ImportError> {
        Ok(self.registry.delete(&Namespace::parse(namespace)?))
    }

    pub fn reset(&self) {
        self.registry.reset();
    }

    pub fn registry(&self) -> &Arc<ModuleRegistry> {
        &self.registry
    }

    pub fn loader(&self) -> &ArtifactLoader {
        &self.loader
    }

    pub fn config(&self) -> &ParcelConfig {
        &self.config
    }
}

impl Default for Importer {
    fn default() -> Self {
        Self::new(ParcelConfig::default())
    }
}

/// Bind an imported module to a local variable named after the identifier.
///
/// ```ignore
/// import_local!(importer, "lib/greet" => greet);
/// assert_eq!(greet.call("hello", &[])?, Value::from("hi"));
/// ```
///
/// Expands to a `let`, so it must be used in a function returning a
/// `Result` whose error converts from `ImportError`.
#[macro_export]
macro_rules! import_local {
    ($importer:expr, $namespace:expr => $name:ident) => {
        let $name = $importer.import_local($namespace, stringify!($name))?;
    };
}
