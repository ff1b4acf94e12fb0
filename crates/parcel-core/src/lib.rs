//! Parcel core
//!
//! File-based namespace loading with a process-wide module cache:
//! - **Namespaces**: `foo/bar` names map to `foo/bar.pcl` artifacts (`namespace`)
//! - **Artifacts**: declarative source files of constants, functions and imports (`artifact`)
//! - **Registry**: one module per artifact path, loaded once (`registry`)
//! - **Binding**: value, method, const and local strategies over explicit contexts (`strategy`, `context`)
//!
//! # Example
//!
//! ```rust,ignore
//! use parcel_core::{Context, ImportOptions, Importer, ParcelConfig, Scope, Strategy};
//!
//! let importer = Importer::new(ParcelConfig::default());
//! let app = Scope::new("App");
//!
//! importer.import(&app, "lib/greet", ImportOptions::new())?;
//! let greeting = app.call_method("greet")?.call("hello", &[])?;
//!
//! importer.import(&app, "lib/greet", ImportOptions::new().to(Strategy::Constant))?;
//! assert!(app.constant("Greet")?.ptr_eq(&app.call_method("greet")?));
//! ```

#![warn(rust_2018_idioms)]

pub mod artifact;
pub mod config;
pub mod context;
pub mod error;
pub mod import;
pub mod loader;
pub mod module;
pub mod namespace;
pub mod registry;
pub mod strategy;
pub mod value;

pub use config::{find_config, ConfigError, ParcelConfig, CONFIG_FILE};
pub use context::{ConstantTable, Context, Instance, MethodTable, Scope};
pub use error::ImportError;
pub use import::{ImportOptions, Importer};
pub use loader::ArtifactLoader;
pub use module::{EvalError, Exports, ModuleHandle};
pub use namespace::{
    from_artifact_path, last_segment, qualified_identifier, to_artifact_path, ArtifactPath,
    Namespace, NamespaceError, ARTIFACT_EXTENSION,
};
pub use registry::{CacheStats, ModuleRegistry};
pub use strategy::{ConflictPolicy, Strategy};
pub use value::Value;
