//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--vault <dir>`: Directory documents are resolved against
//! - `--debug`: Verbose output
//! - `--quiet` / `-q`: Results only

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// mb - bind declarations to document metadata
#[derive(Parser, Debug)]
#[command(name = "mb")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Vault directory (defaults to the current directory)
    #[arg(long, global = true, value_name = "DIR")]
    pub vault: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, global = true)]
    pub debug: bool,

    /// Results only, no commentary
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Parse and validate a bind target
    #[command(
        name = "parse",
        long_about = "Parse and validate a bind target declaration.\n\n\
            Prints the canonical form of the resolved target and every \
            diagnostic. Exits with status 1 if the declaration has errors.",
        after_help = "\
EXAMPLES:
    mb parse 'frontmatter^notes/a.md#tags[0]'
    mb parse status --scope 'memory^#' --json
    mb parse 'title' --file notes/a.md"
    )]
    Parse {
        /// The bind target text
        declaration: String,

        /// Document the declaration appears in
        #[arg(long, value_name = "FILE", default_value = "")]
        file: String,

        /// Bind target relative declarations resolve against
        #[arg(long, value_name = "DECL")]
        scope: Option<String>,

        /// Machine-readable output
        #[arg(long)]
        json: bool,
    },

    /// Validate every inline declaration in a markdown document
    #[command(
        name = "check",
        long_about = "Find INPUT[..], VIEW[..] and BUTTON[..] declarations in \
            backtick spans and validate each one.\n\n\
            Exits with status 1 if any declaration has errors."
    )]
    Check {
        /// Markdown document, relative to the vault
        file: PathBuf,
    },

    /// Print the value at a bind target as JSON
    Get {
        /// Document the target is resolved from, relative to the vault
        file: String,

        /// The bind target text
        target: String,
    },

    /// Write a literal to a bind target
    #[command(after_help = "\
EXAMPLES:
    mb set notes/a.md done true
    mb set notes/a.md 'rating' 4.5
    mb set notes/a.md 'frontmatter^notes/b.md#title' 'Other'")]
    Set {
        /// Document the target is resolved from, relative to the vault
        file: String,

        /// The bind target text
        target: String,

        /// Value, parsed as a literal (null, true, false, number, or text)
        value: String,
    },

    /// Print a bind target's value every time it changes
    #[command(
        name = "watch",
        long_about = "Print a bind target's value whenever it changes.\n\n\
            Runs the reconciliation cycle on the configured interval until the \
            document is removed or the process is interrupted."
    )]
    Watch {
        /// Document the target is resolved from, relative to the vault
        file: String,

        /// The bind target text
        target: String,

        /// Stop after this many cycles
        #[arg(long, value_name = "N")]
        cycles: Option<u64>,
    },

    /// Generate shell completion scripts
    #[command(after_help = "\
SETUP:
    # Bash
    mb completion bash > ~/.local/share/bash-completion/completions/mb

    # Zsh
    mb completion zsh > ~/.zfunc/_mb

    # Fish
    mb completion fish > ~/.config/fish/completions/mb.fish")]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completion
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["mb", "get", "a.md", "title", "--vault", "/tmp/v", "-q"]).unwrap();
        assert!(cli.quiet);
        assert_eq!(cli.vault, Some(PathBuf::from("/tmp/v")));
        assert!(matches!(cli.command, Command::Get { .. }));
    }

    #[test]
    fn parse_defaults() {
        let cli = Cli::try_parse_from(["mb", "parse", "tags[0]"]).unwrap();
        match cli.command {
            Command::Parse { file, scope, json, .. } => {
                assert_eq!(file, "");
                assert!(scope.is_none());
                assert!(!json);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
