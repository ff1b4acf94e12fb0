//! Binding strategies
//!
//! A strategy decides how a resolved [`ModuleHandle`] is exposed into the
//! importing context:
//!
//! | Strategy   | Default name                     | Side effect                      |
//! |------------|----------------------------------|----------------------------------|
//! | `value`    | -                                | none                             |
//! | `method`   | last namespace segment           | zero-argument accessor           |
//! | `const`    | capitalized last segment         | constant binding                 |
//! | `local`    | last namespace segment           | none at runtime, see `import_local!` |

use crate::context::Context;
use crate::error::ImportError;
use crate::module::ModuleHandle;
use crate::namespace::Namespace;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Return the handle, bind nothing
    Value,
    /// Define an accessor returning the handle
    #[default]
    Method,
    /// Bind the handle as a constant
    #[serde(rename = "const", alias = "constant")]
    Constant,
    /// Bind to a local variable at the call site
    Local,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Value => "value",
            Strategy::Method => "method",
            Strategy::Constant => "const",
            Strategy::Local => "local",
        }
    }

    /// Name the handle is bound under, or `None` for `value`.
    ///
    /// Validated up front so a bad alias fails before anything is loaded.
    pub fn binding_name(
        &self,
        namespace: &Namespace,
        alias: Option<&str>,
    ) -> Result<Option<String>, ImportError> {
        match self {
            Strategy::Value => Ok(None),
            Strategy::Method | Strategy::Local => {
                let name = alias.unwrap_or_else(|| namespace.last_segment());
                validate_method_name(name)?;
                Ok(Some(name.to_string()))
            }
            Strategy::Constant => {
                let name = alias
                    .map(str::to_string)
                    .unwrap_or_else(|| namespace.constant_name());
                validate_constant_name(&name)?;
                Ok(Some(name))
            }
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = ImportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "value" => Ok(Strategy::Value),
            "method" => Ok(Strategy::Method),
            "const" | "constant" => Ok(Strategy::Constant),
            "local" => Ok(Strategy::Local),
            other => Err(ImportError::UnknownStrategy(other.to_string())),
        }
    }
}

/// What to do when a name is already bound to a module from a different
/// artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    /// Replace silently
    Overwrite,
    /// Log a warning, then replace
    #[default]
    Warn,
    /// Fail with `BindingConflict`
    Error,
}

impl ConflictPolicy {
    /// Decide whether a rebinding may proceed
    pub(crate) fn resolve(
        &self,
        context: &str,
        name: &str,
        existing: &ModuleHandle,
        incoming: &ModuleHandle,
    ) -> Result<(), ImportError> {
        if existing.artifact_path() == incoming.artifact_path() {
            return Ok(());
        }
        self.apply(context, name, existing.name().as_str(), incoming)
    }

    /// Same as [`resolve`](Self::resolve) for a constant that may not hold a
    /// module at all. Any other value always counts as a conflict.
    pub(crate) fn resolve_value(
        &self,
        context: &str,
        name: &str,
        existing: &Value,
        incoming: &ModuleHandle,
    ) -> Result<(), ImportError> {
        match existing {
            Value::Module(existing) => self.resolve(context, name, existing, incoming),
            other => self.apply(context, name, &other.to_string(), incoming),
        }
    }

    fn apply(
        &self,
        context: &str,
        name: &str,
        existing: &str,
        incoming: &ModuleHandle,
    ) -> Result<(), ImportError> {
        match self {
            ConflictPolicy::Overwrite => Ok(()),
            ConflictPolicy::Warn => {
                warn!(
                    context,
                    name,
                    existing,
                    incoming = %incoming.artifact_path(),
                    "rebinding name to a different module"
                );
                Ok(())
            }
            ConflictPolicy::Error => Err(ImportError::BindingConflict {
                context: context.to_string(),
                name: name.to_string(),
                existing: existing.to_string(),
                incoming: incoming.name().to_string(),
            }),
        }
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn validate_method_name(name: &str) -> Result<(), ImportError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(ImportError::InvalidBindingName {
            name: name.to_string(),
            reason: "expected an identifier",
        })
    }
}

/// Uppercase ASCII letter followed by identifier characters
pub fn validate_constant_name(name: &str) -> Result<(), ImportError> {
    if !name.starts_with(|c: char| c.is_ascii_uppercase()) {
        return Err(ImportError::InvalidBindingName {
            name: name.to_string(),
            reason: "constant names must start with an uppercase letter",
        });
    }
    validate_method_name(name)
}

/// Expose `handle` into `ctx` under `name` (as computed by
/// [`Strategy::binding_name`]).
pub(crate) fn bind(
    strategy: Strategy,
    ctx: &dyn Context,
    name: Option<&str>,
    handle: &ModuleHandle,
    policy: ConflictPolicy,
) -> Result<(), ImportError> {
    let Some(name) = name else {
        return Ok(());
    };
    match strategy {
        Strategy::Value | Strategy::Local => {}
        Strategy::Method => {
            ctx.methods().bind(&ctx.describe(), name, handle, policy)?;
        }
        Strategy::Constant => {
            let table = ctx.constant_table().ok_or_else(|| ImportError::NoConstantScope {
                context: ctx.describe(),
            })?;
            table.bind(&ctx.describe(), name, handle, policy)?;
        }
    }
    debug!(context = %ctx.describe(), name, strategy = %strategy, module = %handle.name(), "bound");
    Ok(())
}

/// Expose `handle` inside another module, for imports declared in an
/// artifact. Methods become members, constants become module-valued
/// constants.
pub(crate) fn bind_into_module(
    strategy: Strategy,
    module: &ModuleHandle,
    name: Option<&str>,
    handle: &ModuleHandle,
    policy: ConflictPolicy,
) -> Result<(), ImportError> {
    let Some(name) = name else {
        return Ok(());
    };
    let context = module.name().to_string();
    match strategy {
        Strategy::Value | Strategy::Local => {}
        Strategy::Method => {
            if let Some(existing) = module.member(name) {
                policy.resolve(&context, name, &existing, handle)?;
            }
            module.define_member(name, handle.clone());
        }
        Strategy::Constant => {
            if let Ok(existing) = module.constant(name) {
                policy.resolve_value(&context, name, &existing, handle)?;
            }
            module.define_constant(name, Value::Module(handle.clone()));
        }
    }
    Ok(())
}
