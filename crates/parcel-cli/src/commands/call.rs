//! `parcel call` and `parcel const`

use crate::output::StyledOutput;
use parcel_core::{Importer, Value};

pub fn call(
    importer: &Importer,
    namespace: &str,
    function: &str,
    args: &[String],
    out: &mut StyledOutput,
) -> anyhow::Result<()> {
    let module = importer.import_value(namespace)?;
    let args: Vec<Value> = args.iter().map(String::as_str).map(parse_arg).collect();
    let result = module.call(function, &args)?;
    out.plain(&result.to_string());
    out.newline();
    Ok(())
}

pub fn constant(
    importer: &Importer,
    namespace: &str,
    name: &str,
    out: &mut StyledOutput,
) -> anyhow::Result<()> {
    let module = importer.import_value(namespace)?;
    let value = module.constant(name)?;
    out.plain(&value.to_string());
    out.newline();
    Ok(())
}

/// Command-line literal to value
fn parse_arg(raw: &str) -> Value {
    match raw {
        "nil" => Value::Nil,
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => {
            if let Ok(n) = raw.parse::<i64>() {
                Value::Int(n)
            } else if let Ok(n) = raw.parse::<f64>() {
                Value::Float(n)
            } else {
                Value::from(raw)
            }
        }
    }
}
