//! `parcel inspect`: load a namespace and list its declarations.

use crate::output::StyledOutput;
use parcel_core::Importer;

pub fn execute(importer: &Importer, namespace: &str, out: &mut StyledOutput) -> anyhow::Result<()> {
    let module = importer.import_value(namespace)?;
    let exports = module.exports();

    out.heading(&format!("{:?}", module));
    out.field("file", &module.source_file().display().to_string());
    for extra in module.sources().iter().skip(1) {
        out.field("loaded", &extra.display().to_string());
    }

    if !exports.constants.is_empty() {
        out.heading("constants");
        for name in &exports.constants {
            let value = module.constant(name)?;
            out.field(name, &value.to_string());
        }
    }

    if !exports.functions.is_empty() {
        out.heading("functions");
        for (name, arity) in &exports.functions {
            let params = module
                .function(name)
                .map(|decl| decl.params.join(", "))
                .unwrap_or_default();
            out.plain("  ");
            out.success(name);
            out.dim(&format!("({})", params));
            out.plain(&format!("  /{}", arity));
            out.newline();
        }
    }

    if !exports.members.is_empty() {
        out.heading("members");
        for name in &exports.members {
            if let Some(member) = module.member(name) {
                out.field(name, member.name().as_str());
            }
        }
    }

    Ok(())
}
