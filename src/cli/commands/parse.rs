//! parse command - Parse and validate one bind target

use anyhow::{bail, Result};
use serde_json::{json, Value};

use super::declaration_parser;
use crate::cli::output;
use crate::cli::Context;
use crate::core::declaration::{BindTargetDeclaration, BindTargetScope};
use crate::core::prop::PropAccess;

/// Parse a bind target and print its canonical form.
///
/// With `--scope`, the scope is resolved first; relative declarations
/// inherit its storage type, path, and property prefix.
pub fn parse(ctx: &Context, declaration: &str, file: &str, scope: Option<&str>, json: bool) -> Result<()> {
    let parser = declaration_parser(ctx);

    let scope = match scope {
        None => None,
        Some(text) => match parser.bind_target(text, file, None) {
            Ok(validated) => Some(BindTargetScope::new(validated.value)),
            Err(errors) => {
                output::diagnostics(&errors, text, ctx.verbosity);
                bail!("invalid scope '{text}'");
            }
        },
    };

    let result = parser.bind_target(declaration, file, scope.as_ref());
    if json {
        let report = match &result {
            Ok(validated) => json!({
                "target": target_json(&validated.value),
                "canonical": validated.value.to_string(),
                "diagnostics": validated.diagnostics,
            }),
            Err(errors) => json!({
                "target": Value::Null,
                "canonical": Value::Null,
                "diagnostics": errors,
            }),
        };
        output::result(serde_json::to_string_pretty(&report)?);
    }

    match result {
        Ok(validated) => {
            if !json {
                output::result(&validated.value);
                output::diagnostics(&validated.diagnostics, declaration, ctx.verbosity);
            }
            Ok(())
        }
        Err(errors) => {
            if !json {
                output::diagnostics(&errors, declaration, ctx.verbosity);
            }
            bail!("invalid bind target '{declaration}'")
        }
    }
}

fn target_json(target: &BindTargetDeclaration) -> Value {
    let steps: Vec<Value> = target
        .storage_prop
        .steps()
        .iter()
        .map(|step| match step {
            PropAccess::Object(key) => json!({ "object": key }),
            PropAccess::Array(index) => json!({ "array": index }),
        })
        .collect();
    json!({
        "storage_type": target.storage_type,
        "storage_path": target.storage_path,
        "storage_prop": steps,
        "listen_to_children": target.listen_to_children,
    })
}
