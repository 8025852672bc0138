//! cli
//!
//! Command-line interface layer for metabind.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Load configuration for the vault
//! - Delegate to command handlers
//!
//! # Architecture
//!
//! The CLI layer is thin. Declarations go through [`crate::parser`] and
//! values through a [`crate::metadata::MetadataManager`] built over the
//! vault, exactly as a host embedding the library would.

pub mod args;
pub mod commands;
pub mod output;

pub use args::{Cli, Shell};

use std::path::PathBuf;

use anyhow::{Context as _, Result};

use crate::core::config::{Config, EngineConfig};
use output::Verbosity;

/// What every command runs against.
#[derive(Debug, Clone)]
pub struct Context {
    /// Directory documents are resolved against.
    pub vault: PathBuf,
    pub verbosity: Verbosity,
    pub engine: EngineConfig,
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub async fn run(cli: Cli) -> Result<()> {
    let verbosity = Verbosity::from_flags(cli.quiet, cli.debug);
    let vault = match cli.vault {
        Some(vault) => vault,
        None => std::env::current_dir().context("failed to read current directory")?,
    };

    let loaded = Config::load(Some(&vault))?;
    for warning in &loaded.warnings {
        output::warn(
            format!("{} ({})", warning.message, warning.path.display()),
            verbosity,
        );
    }
    if let Some(path) = loaded.config.vault_config_loaded_from() {
        output::debug(format!("vault config: {}", path.display()), verbosity);
    }

    let ctx = Context {
        vault,
        verbosity,
        engine: loaded.config.engine(),
    };

    commands::dispatch(cli.command, &ctx).await
}
