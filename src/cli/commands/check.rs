//! check command - Validate inline declarations in a document

use std::path::Path;

use anyhow::{bail, Context as _, Result};

use super::declaration_parser;
use crate::cli::output;
use crate::cli::Context;
use crate::parser::find_inline_declarations;

/// Validate every inline declaration in a markdown document.
pub fn check(ctx: &Context, file: &Path) -> Result<()> {
    let path = ctx.vault.join(file);
    let markdown = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read '{}'", path.display()))?;
    let file_path = file.to_string_lossy();

    let parser = declaration_parser(ctx);
    let declarations = find_inline_declarations(&markdown);
    let mut failed = 0;

    for inline in &declarations {
        let location = format!("{}:{}", file_path, inline.line);
        match parser.any(inline.kind, &inline.text, &file_path, None) {
            Ok(validated) => {
                output::print(format!("{location}: ok {}", inline.kind), ctx.verbosity);
                if !validated.diagnostics.is_empty() {
                    output::warn(format!("{location}: {}", inline.kind), ctx.verbosity);
                }
                output::diagnostics(&validated.diagnostics, &inline.text, ctx.verbosity);
            }
            Err(errors) => {
                failed += 1;
                eprintln!("{location}: invalid {}", inline.kind);
                output::diagnostics(&errors, &inline.text, ctx.verbosity);
            }
        }
    }

    output::print(
        format!("{} declaration(s), {} with errors", declarations.len(), failed),
        ctx.verbosity,
    );
    if failed > 0 {
        bail!("{failed} declaration(s) in '{file_path}' have errors");
    }
    Ok(())
}
