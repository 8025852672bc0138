//! core::types
//!
//! Strong types shared by the declaration parser and the metadata engine.
//!
//! # Types
//!
//! - [`StorageType`] - Which storage source a bind target lives in
//! - [`ParsingPosition`] / [`ParsingRange`] - Source locations for diagnostics
//! - [`ResultNode`] - A parsed token together with where it came from
//! - [`SubscriptionId`] / [`OwnerId`] - Identities used by the metadata manager
//!
//! # Examples
//!
//! ```
//! use metabind::core::types::StorageType;
//!
//! assert_eq!("memory".parse::<StorageType>().unwrap(), StorageType::Memory);
//! assert_eq!(StorageType::GlobalMemory.as_str(), "global_memory");
//! assert!("scratch".parse::<StorageType>().is_err());
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Storage path used for every global memory bind target.
///
/// Global memory is one process-wide tree, so the declared storage path
/// is irrelevant and normalized to this key.
pub const GLOBAL_STORAGE_PATH: &str = "global";

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("unknown storage type '{ident}', expected one of: {expected}")]
    UnknownStorageType { ident: String, expected: String },
}

/// The storage backend a bind target refers to.
///
/// The set of identifiers is fixed. Legacy spellings are still recognized
/// through [`StorageType::from_deprecated_identifier`] so older documents
/// keep working while emitting a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageType {
    /// Structured metadata at the top of a document.
    Frontmatter,
    /// Transient per-document state, lost when nothing observes it.
    Memory,
    /// Transient state shared by every document in the process.
    GlobalMemory,
}

/// Legacy identifiers and the storage type they map to.
const DEPRECATED_IDENTIFIERS: &[(&str, StorageType)] = &[
    ("globalMemory", StorageType::GlobalMemory),
    ("global", StorageType::GlobalMemory),
];

impl StorageType {
    /// Every storage type, in declaration order.
    pub const ALL: [StorageType; 3] = [
        StorageType::Frontmatter,
        StorageType::Memory,
        StorageType::GlobalMemory,
    ];

    /// The canonical identifier used in declarations.
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageType::Frontmatter => "frontmatter",
            StorageType::Memory => "memory",
            StorageType::GlobalMemory => "global_memory",
        }
    }

    /// Look up a canonical identifier.
    pub fn from_identifier(ident: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == ident)
    }

    /// Look up a legacy identifier that is still accepted with a warning.
    pub fn from_deprecated_identifier(ident: &str) -> Option<Self> {
        DEPRECATED_IDENTIFIERS
            .iter()
            .find(|(name, _)| *name == ident)
            .map(|(_, t)| *t)
    }

    /// Whether bind targets of this type ignore their storage path.
    pub fn is_global(&self) -> bool {
        matches!(self, StorageType::GlobalMemory)
    }

    /// Comma separated list of canonical identifiers, for messages.
    pub fn identifier_list() -> String {
        Self::ALL
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_identifier(s).ok_or_else(|| TypeError::UnknownStorageType {
            ident: s.to_string(),
            expected: Self::identifier_list(),
        })
    }
}

/// A location inside declaration text.
///
/// `index` is a byte offset; `line` and `column` are 1-based and count
/// characters, which is what editors display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ParsingPosition {
    pub index: usize,
    pub line: usize,
    pub column: usize,
}

impl ParsingPosition {
    /// The position of the first character of a text.
    pub const START: ParsingPosition = ParsingPosition {
        index: 0,
        line: 1,
        column: 1,
    };
}

impl fmt::Display for ParsingPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A half-open range `[from, to)` inside declaration text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ParsingRange {
    pub from: ParsingPosition,
    pub to: ParsingPosition,
}

impl ParsingRange {
    pub fn new(from: ParsingPosition, to: ParsingPosition) -> Self {
        Self { from, to }
    }

    /// A zero-width range at one position.
    pub fn point(at: ParsingPosition) -> Self {
        Self { from: at, to: at }
    }

    /// The text this range covers.
    ///
    /// Returns an empty string if the range does not fit `source`.
    pub fn slice<'a>(&self, source: &'a str) -> &'a str {
        source.get(self.from.index..self.to.index).unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.from.index >= self.to.index
    }
}

impl fmt::Display for ParsingRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.from, self.to)
    }
}

/// A token produced by the parser, kept together with its source range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultNode {
    pub value: String,
    pub range: Option<ParsingRange>,
}

impl ResultNode {
    pub fn new(value: impl Into<String>, range: ParsingRange) -> Self {
        Self {
            value: value.into(),
            range: Some(range),
        }
    }

    /// A node that did not come from source text.
    pub fn synthetic(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            range: None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }
}

/// Unique identity of one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of the consumer that owns a subscription (usually a mounted field).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// A fresh random owner id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OwnerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
