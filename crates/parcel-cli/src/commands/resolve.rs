//! `parcel resolve`: namespace to path and name mapping, no loading.

use crate::output::StyledOutput;
use parcel_core::{Importer, Namespace};

pub fn execute(importer: &Importer, namespace: &str, out: &mut StyledOutput) -> anyhow::Result<()> {
    let ns = Namespace::parse(namespace)?;
    let path = ns.artifact_path();

    out.heading(ns.as_str());
    out.field("artifact", &path.to_string());
    out.field("method", ns.last_segment());
    out.field("constant", &ns.constant_name());
    out.field("qualified", &ns.qualified_identifier());

    match importer.loader().locate(&path) {
        Ok(file) => out.field("file", &file.display().to_string()),
        Err(_) => {
            out.plain(&format!("  {:<12}", "file"));
            out.warning("not found");
            out.dim(&format!(
                " (searched {})",
                importer
                    .loader()
                    .search_paths()
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
            out.newline();
        }
    }
    Ok(())
}
