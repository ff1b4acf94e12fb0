//! `parcel bind`: run an import against a scratch scope.

use crate::output::StyledOutput;
use parcel_core::{Context, ImportOptions, Importer, Scope, Strategy};

pub fn execute(
    importer: &Importer,
    namespace: &str,
    alias: Option<String>,
    to: Option<&str>,
    out: &mut StyledOutput,
) -> anyhow::Result<()> {
    let mut options = ImportOptions::new();
    if let Some(alias) = alias {
        options = options.alias(alias);
    }
    if let Some(token) = to {
        options = options.parse_to(token)?;
    }
    let strategy = options.to.unwrap_or(importer.config().bindings.default_strategy);

    let scope = Scope::new("main");
    let handle = importer.import(&scope, namespace, options)?;

    out.heading(&format!("{:?}", handle));
    out.field("strategy", strategy.as_str());
    match strategy {
        Strategy::Method => {
            for name in scope.methods().names() {
                out.field("method", &format!("{}.{}", scope.describe(), name));
            }
        }
        Strategy::Constant => {
            if let Some(table) = scope.constants() {
                for name in table.names() {
                    out.field("constant", &format!("{}::{}", scope.describe(), name));
                }
            }
        }
        Strategy::Value | Strategy::Local => out.field("binding", "none (value returned)"),
    }
    Ok(())
}
