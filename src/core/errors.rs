//! core::errors
//!
//! Diagnostics produced while turning declaration text into declarations.
//!
//! # Design
//!
//! Parsing and validation never stop at the first problem. Every issue is
//! recorded as a [`BindError`] and collected into an [`ErrorCollection`]
//! scoped to one declaration, so a caller can show every problem at once.
//!
//! Levels:
//! - `Warning` - the declaration is usable (e.g. deprecated identifier)
//! - `Error` - the declaration must not produce a field
//! - `Critical` - an internal invariant was violated
//!
//! # Example
//!
//! ```
//! use metabind::core::errors::{BindError, ErrorCollection, ErrorLevel};
//!
//! let mut errors = ErrorCollection::new("bind target");
//! errors.add(BindError::internal("subscription deleted twice"));
//! assert!(errors.has_errors());
//! assert_eq!(errors.iter().next().unwrap().level, ErrorLevel::Critical);
//! ```

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use super::types::ParsingRange;

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorLevel {
    Warning,
    Error,
    Critical,
}

impl fmt::Display for ErrorLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorLevel::Warning => "warning",
            ErrorLevel::Error => "error",
            ErrorLevel::Critical => "critical",
        })
    }
}

/// Which stage produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// Malformed declaration text.
    Parse,
    /// Well-formed text with invalid meaning.
    Validation,
    /// A property path did not match the shape of a metadata tree.
    Navigation,
    /// A broken invariant inside the engine.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorKind::Parse => "parse",
            ErrorKind::Validation => "validation",
            ErrorKind::Navigation => "navigation",
            ErrorKind::Internal => "internal",
        })
    }
}

/// One diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{level}[{kind}]: {message}")]
pub struct BindError {
    pub level: ErrorLevel,
    pub kind: ErrorKind,
    pub message: String,
    /// Where in the declaration the problem is, if it came from text.
    pub range: Option<ParsingRange>,
}

impl BindError {
    /// A syntax error. Always `Error` level.
    pub fn parse(message: impl Into<String>, range: ParsingRange) -> Self {
        Self {
            level: ErrorLevel::Error,
            kind: ErrorKind::Parse,
            message: message.into(),
            range: Some(range),
        }
    }

    pub fn validation(
        level: ErrorLevel,
        message: impl Into<String>,
        range: Option<ParsingRange>,
    ) -> Self {
        Self {
            level,
            kind: ErrorKind::Validation,
            message: message.into(),
            range,
        }
    }

    pub fn navigation(message: impl Into<String>) -> Self {
        Self {
            level: ErrorLevel::Error,
            kind: ErrorKind::Navigation,
            message: message.into(),
            range: None,
        }
    }

    /// A programming defect. Always `Critical` level.
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            level: ErrorLevel::Critical,
            kind: ErrorKind::Internal,
            message: message.into(),
            range: None,
        }
    }

    /// Whether this diagnostic blocks field creation.
    pub fn is_blocking(&self) -> bool {
        self.level >= ErrorLevel::Error
    }
}

/// All diagnostics for one declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ErrorCollection {
    subject: String,
    errors: Vec<BindError>,
}

impl ErrorCollection {
    /// Create an empty collection. `subject` names what was being parsed.
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            errors: Vec::new(),
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn add(&mut self, error: BindError) {
        self.errors.push(error);
    }

    /// Move every diagnostic of `other` into this collection.
    pub fn merge(&mut self, other: ErrorCollection) {
        self.errors.extend(other.errors);
    }

    /// Whether any diagnostic is `Error` or `Critical`.
    pub fn has_errors(&self) -> bool {
        self.errors.iter().any(BindError::is_blocking)
    }

    pub fn has_warnings(&self) -> bool {
        self.errors.iter().any(|e| e.level == ErrorLevel::Warning)
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BindError> {
        self.errors.iter()
    }

    /// Only the blocking diagnostics.
    pub fn errors(&self) -> impl Iterator<Item = &BindError> {
        self.errors.iter().filter(|e| e.is_blocking())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &BindError> {
        self.errors.iter().filter(|e| e.level == ErrorLevel::Warning)
    }

    /// Render every diagnostic, underlining its range in `source`.
    ///
    /// ```text
    /// error[parse]: array index must be a non-negative integer, found 'x'
    ///   1 | tags[x]
    ///     |      ^
    /// ```
    pub fn render(&self, source: &str) -> String {
        let mut out = String::new();
        for error in &self.errors {
            out.push_str(&error.to_string());
            out.push('\n');
            if let Some(range) = error.range {
                out.push_str(&underline(source, range));
            }
        }
        out
    }
}

impl fmt::Display for ErrorCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let blocking = self.errors().count();
        let warnings = self.warnings().count();
        write!(
            f,
            "{}: {} error(s), {} warning(s)",
            self.subject, blocking, warnings
        )?;
        for error in &self.errors {
            write!(f, "\n  {}", error)?;
            if let Some(range) = error.range {
                write!(f, " at {}", range.from)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ErrorCollection {}

impl IntoIterator for ErrorCollection {
    type Item = BindError;
    type IntoIter = std::vec::IntoIter<BindError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

/// Two lines: the source line containing `range.from` and a caret marker.
fn underline(source: &str, range: ParsingRange) -> String {
    let Some(line) = source.lines().nth(range.from.line.saturating_sub(1)) else {
        return String::new();
    };
    let gutter = range.from.line.to_string();
    let pad = " ".repeat(gutter.len());
    let width = if range.to.line == range.from.line {
        range.to.column.saturating_sub(range.from.column).max(1)
    } else {
        line.chars().count().saturating_sub(range.from.column - 1).max(1)
    };
    format!(
        "  {gutter} | {line}\n  {pad} | {}{}\n",
        " ".repeat(range.from.column.saturating_sub(1)),
        "^".repeat(width)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ParsingPosition;

    fn range(from: usize, to: usize) -> ParsingRange {
        ParsingRange::new(
            ParsingPosition {
                index: from,
                line: 1,
                column: from + 1,
            },
            ParsingPosition {
                index: to,
                line: 1,
                column: to + 1,
            },
        )
    }

    #[test]
    fn warnings_do_not_block() {
        let mut errors = ErrorCollection::new("test");
        errors.add(BindError::validation(ErrorLevel::Warning, "old", None));
        assert!(!errors.has_errors());
        assert!(errors.has_warnings());
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn merge_keeps_order() {
        let mut a = ErrorCollection::new("a");
        a.add(BindError::parse("first", range(0, 1)));
        let mut b = ErrorCollection::new("b");
        b.add(BindError::parse("second", range(1, 2)));
        a.merge(b);
        let messages: Vec<_> = a.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second"]);
        assert_eq!(a.subject(), "a");
    }

    #[test]
    fn render_underlines_range() {
        let mut errors = ErrorCollection::new("bind target");
        errors.add(BindError::parse("bad index", range(5, 6)));
        let rendered = errors.render("tags[x]");
        assert_eq!(
            rendered,
            "error[parse]: bad index\n  1 | tags[x]\n    |      ^\n"
        );
    }

    #[test]
    fn render_zero_width_range_shows_one_caret() {
        let mut errors = ErrorCollection::new("bind target");
        errors.add(BindError::parse("expected ']'", range(5, 5)));
        let rendered = errors.render("tags[");
        assert!(rendered.ends_with("|      ^\n"));
    }

    #[test]
    fn display_summarizes_counts() {
        let mut errors = ErrorCollection::new("input field");
        errors.add(BindError::validation(ErrorLevel::Error, "bad", None));
        errors.add(BindError::validation(ErrorLevel::Warning, "meh", None));
        let text = errors.to_string();
        assert!(text.starts_with("input field: 1 error(s), 1 warning(s)"));
    }
}
