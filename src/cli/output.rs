//! cli::output
//!
//! Terminal output for `mb`.
//!
//! # Design
//!
//! Results go to stdout and respect `--quiet`. Diagnostics and errors go
//! to stderr. Engine logging is separate and controlled by `MB_LOG`.

use std::fmt::Display;

use crate::core::errors::ErrorCollection;

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Quiet mode - results only, no commentary
    Quiet,
    /// Normal mode - standard output
    Normal,
    /// Debug mode - verbose output
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }
}

/// Print a result line. Always shown.
pub fn result(message: impl Display) {
    println!("{}", message);
}

/// Print a message (respects quiet mode).
pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Print a debug message (only in debug mode).
pub fn debug(message: impl Display, verbosity: Verbosity) {
    if verbosity == Verbosity::Debug {
        eprintln!("[debug] {}", message);
    }
}

/// Print a warning message (respects quiet mode).
pub fn warn(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        eprintln!("warning: {}", message);
    }
}

/// Print every diagnostic with its source excerpt.
///
/// Errors are always shown; a collection holding only warnings respects
/// quiet mode.
pub fn diagnostics(errors: &ErrorCollection, source: &str, verbosity: Verbosity) {
    if errors.is_empty() || (!errors.has_errors() && verbosity == Verbosity::Quiet) {
        return;
    }
    eprint!("{}", errors.render(source));
}
