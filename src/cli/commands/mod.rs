//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Resolves its declarations with the configured default storage type
//! 2. Reads or writes through a metadata manager over the vault
//! 3. Formats and displays output
//!
//! Declaration problems are printed in full before the command fails.

mod check;
mod completion;
mod parse;
mod value;
mod watch;

pub use check::check;
pub use completion::completion;
pub use parse::parse;
pub use value::{get, set};
pub use watch::watch;

use anyhow::{bail, Result};

use super::args::Command;
use super::output;
use super::Context;
use crate::core::declaration::BindTargetDeclaration;
use crate::metadata::sources::{FileDocuments, FrontmatterSource};
use crate::metadata::MetadataManager;
use crate::parser::DeclarationParser;

/// Dispatch a command to its handler.
pub async fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Parse {
            declaration,
            file,
            scope,
            json,
        } => parse(ctx, &declaration, &file, scope.as_deref(), json),
        Command::Check { file } => check(ctx, &file),
        Command::Get { file, target } => get(ctx, &file, &target),
        Command::Set {
            file,
            target,
            value,
        } => set(ctx, &file, &target, &value),
        Command::Watch {
            file,
            target,
            cycles,
        } => watch(ctx, &file, &target, cycles).await,
        Command::Completion { shell } => completion(shell),
    }
}

pub(crate) fn declaration_parser(ctx: &Context) -> DeclarationParser {
    DeclarationParser::new(ctx.engine.default_storage_type)
}

/// Resolve a bind target, printing its diagnostics.
pub(crate) fn resolve_target(ctx: &Context, file: &str, text: &str) -> Result<BindTargetDeclaration> {
    match declaration_parser(ctx).bind_target(text, file, None) {
        Ok(validated) => {
            output::diagnostics(&validated.diagnostics, text, ctx.verbosity);
            Ok(validated.value)
        }
        Err(errors) => {
            output::diagnostics(&errors, text, ctx.verbosity);
            bail!("invalid bind target '{text}'")
        }
    }
}

/// A manager with every source, frontmatter backed by the vault.
pub(crate) fn open_manager(ctx: &Context) -> MetadataManager {
    let manager = MetadataManager::with_default_sources(ctx.engine.clone());
    manager.register_source(FrontmatterSource::new(FileDocuments::new(ctx.vault.clone())));
    manager
}
