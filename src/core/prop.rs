//! core::prop
//!
//! Property paths over untyped metadata trees.
//!
//! # Model
//!
//! A [`PropPath`] is an ordered list of [`PropAccess`] steps, root to leaf.
//! Each step is either an object key or an array index. Array indices are
//! parsed once when the path is built, never per access.
//!
//! # Navigation rules
//!
//! - A missing key, an out of range index, or a `null` intermediate means
//!   the value is absent (`Ok(None)`), since metadata is sparse.
//! - An intermediate of the wrong container kind (a string where an object
//!   is expected, an object where an array is expected) is a
//!   [`NavigationError`]. Containers are never converted.
//! - [`PropPath::create`] materializes absent intermediates so a first write
//!   to `a.b[0]` works on an empty tree.
//!
//! # Example
//!
//! ```
//! use metabind::core::prop::{PropAccess, PropPath};
//! use serde_json::json;
//!
//! let path = PropPath::new(vec![PropAccess::object("tags"), PropAccess::array(1)]);
//! let mut tree = json!({});
//!
//! path.create(&mut tree).unwrap();
//! path.set(&mut tree, json!("rust")).unwrap();
//!
//! assert_eq!(tree, json!({ "tags": [null, "rust"] }));
//! assert_eq!(path.get(&tree).unwrap(), Some(&json!("rust")));
//! assert_eq!(path.to_string(), "tags[1]");
//! ```

use std::fmt;

use serde_json::{Map, Value};
use thiserror::Error;

/// Errors from navigating a metadata tree.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NavigationError {
    /// The container at `step` is not the kind the access needs.
    #[error("can not access {access} of {found} at step {step} of '{path}'")]
    ContainerMismatch {
        path: String,
        step: usize,
        access: &'static str,
        found: &'static str,
    },

    /// An intermediate value is absent; call `create` before `set`.
    #[error("missing intermediate value at step {step} of '{path}'")]
    MissingIntermediate { path: String, step: usize },

    /// An array access token that is not a non-negative integer.
    #[error("can not access array with non number index '{0}'")]
    InvalidIndex(String),
}

/// Which kind of container a step expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropAccessKind {
    Object,
    Array,
}

/// One step of a property path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropAccess {
    Object(String),
    Array(usize),
}

impl PropAccess {
    pub fn object(key: impl Into<String>) -> Self {
        PropAccess::Object(key.into())
    }

    pub fn array(index: usize) -> Self {
        PropAccess::Array(index)
    }

    /// Build an array access from source text.
    ///
    /// # Errors
    ///
    /// Returns [`NavigationError::InvalidIndex`] unless `token` is a
    /// non-negative integer that fits in `usize`.
    pub fn parse_index(token: &str) -> Result<Self, NavigationError> {
        if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
            return Err(NavigationError::InvalidIndex(token.to_string()));
        }
        token
            .parse::<usize>()
            .map(PropAccess::Array)
            .map_err(|_| NavigationError::InvalidIndex(token.to_string()))
    }

    pub fn kind(&self) -> PropAccessKind {
        match self {
            PropAccess::Object(_) => PropAccessKind::Object,
            PropAccess::Array(_) => PropAccessKind::Array,
        }
    }

    /// An empty container of the kind this step navigates into.
    fn empty_container(&self) -> Value {
        match self {
            PropAccess::Object(_) => Value::Object(Map::new()),
            PropAccess::Array(_) => Value::Array(Vec::new()),
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            PropAccess::Object(_) => "property",
            PropAccess::Array(_) => "index",
        }
    }
}

/// Short name of a value's JSON kind, for error messages.
fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Whether `key` can be written without brackets in canonical form.
pub(crate) fn is_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '-')
}

fn write_quoted(f: &mut fmt::Formatter<'_>, key: &str) -> fmt::Result {
    f.write_str("[\"")?;
    for c in key.chars() {
        if c == '"' || c == '\\' {
            f.write_str("\\")?;
        }
        write!(f, "{}", c)?;
    }
    f.write_str("\"]")
}

/// An ordered sequence of property accesses.
///
/// The empty path refers to the whole tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PropPath {
    steps: Vec<PropAccess>,
}

impl PropPath {
    pub fn new(steps: Vec<PropAccess>) -> Self {
        Self { steps }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a path from plain segments.
    ///
    /// A segment that is a non-negative integer becomes an array access,
    /// anything else an object access.
    ///
    /// ```
    /// use metabind::core::prop::{PropAccess, PropPath};
    ///
    /// let path = PropPath::from_segments(&["items", "0", "name"]);
    /// assert_eq!(path.steps()[1], PropAccess::Array(0));
    /// ```
    pub fn from_segments<S: AsRef<str>>(segments: &[S]) -> Self {
        let steps = segments
            .iter()
            .map(|s| {
                let s = s.as_ref();
                PropAccess::parse_index(s).unwrap_or_else(|_| PropAccess::object(s))
            })
            .collect();
        Self { steps }
    }

    pub fn steps(&self) -> &[PropAccess] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn push(&mut self, access: PropAccess) {
        self.steps.push(access);
    }

    /// A new path with `other` appended.
    pub fn concat(&self, other: &PropPath) -> PropPath {
        let mut steps = self.steps.clone();
        steps.extend(other.steps.iter().cloned());
        PropPath { steps }
    }

    /// Whether `prefix` is equal to or an ancestor of this path.
    pub fn starts_with(&self, prefix: &PropPath) -> bool {
        self.steps.starts_with(&prefix.steps)
    }

    /// Whether one path is an ancestor of (or equal to) the other.
    pub fn overlaps(&self, other: &PropPath) -> bool {
        self.starts_with(other) || other.starts_with(self)
    }

    fn mismatch(&self, step: usize, access: &PropAccess, found: &Value) -> NavigationError {
        NavigationError::ContainerMismatch {
            path: self.to_string(),
            step,
            access: access.describe(),
            found: kind_name(found),
        }
    }

    /// Read the value at this path.
    ///
    /// # Errors
    ///
    /// Returns [`NavigationError::ContainerMismatch`] if an intermediate
    /// exists but is the wrong container kind.
    pub fn get<'a>(&self, root: &'a Value) -> Result<Option<&'a Value>, NavigationError> {
        let mut node = root;
        for (step, access) in self.steps.iter().enumerate() {
            let next = match (access, node) {
                (_, Value::Null) => None,
                (PropAccess::Object(key), Value::Object(map)) => map.get(key),
                (PropAccess::Array(index), Value::Array(items)) => items.get(*index),
                (access, other) => return Err(self.mismatch(step, access, other)),
            };
            match next {
                Some(value) => node = value,
                None => return Ok(None),
            }
        }
        Ok(Some(node))
    }

    /// Read the value at this path, cloned, with absence as `null`.
    pub fn get_or_null(&self, root: &Value) -> Result<Value, NavigationError> {
        Ok(self.get(root)?.cloned().unwrap_or(Value::Null))
    }

    /// Write `value` at this path.
    ///
    /// Intermediates must already exist; an array shorter than the target
    /// index is padded with `null`. The empty path replaces the root.
    ///
    /// # Errors
    ///
    /// - [`NavigationError::MissingIntermediate`] if a parent is absent
    /// - [`NavigationError::ContainerMismatch`] if a parent has the wrong kind
    pub fn set(&self, root: &mut Value, value: Value) -> Result<(), NavigationError> {
        let Some((last, parents)) = self.steps.split_last() else {
            *root = value;
            return Ok(());
        };

        let mut node = root;
        for (step, access) in parents.iter().enumerate() {
            node = self.child_mut(node, step, access)?.ok_or_else(|| {
                NavigationError::MissingIntermediate {
                    path: self.to_string(),
                    step,
                }
            })?;
        }

        let step = parents.len();
        match (last, node) {
            (PropAccess::Object(key), Value::Object(map)) => {
                map.insert(key.clone(), value);
            }
            (PropAccess::Array(index), Value::Array(items)) => {
                if *index >= items.len() {
                    items.resize(*index + 1, Value::Null);
                }
                items[*index] = value;
            }
            (_, Value::Null) => {
                return Err(NavigationError::MissingIntermediate {
                    path: self.to_string(),
                    step,
                })
            }
            (access, other) => return Err(self.mismatch(step, access, other)),
        }
        Ok(())
    }

    /// Ensure every intermediate of this path exists.
    ///
    /// Absent intermediates (and a `null` root) become an empty object or
    /// array matching the kind of the step that follows them. The leaf is
    /// left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`NavigationError::ContainerMismatch`] if an existing
    /// intermediate has the wrong kind.
    pub fn create(&self, root: &mut Value) -> Result<(), NavigationError> {
        let Some(first) = self.steps.first() else {
            return Ok(());
        };
        if root.is_null() {
            *root = first.empty_container();
        }

        let mut node = root;
        for (step, pair) in self.steps.windows(2).enumerate() {
            let (access, next) = (&pair[0], &pair[1]);
            let child = match (access, node) {
                (PropAccess::Object(key), Value::Object(map)) => {
                    map.entry(key.clone()).or_insert(Value::Null)
                }
                (PropAccess::Array(index), Value::Array(items)) => {
                    if *index >= items.len() {
                        items.resize(*index + 1, Value::Null);
                    }
                    &mut items[*index]
                }
                (access, other) => return Err(self.mismatch(step, access, other)),
            };
            if child.is_null() {
                *child = next.empty_container();
            }
            node = child;
        }

        let step = self.steps.len() - 1;
        let last = &self.steps[step];
        match (last, &*node) {
            (PropAccess::Object(_), Value::Object(_)) | (PropAccess::Array(_), Value::Array(_)) => {
                Ok(())
            }
            (access, other) => Err(self.mismatch(step, access, other)),
        }
    }

    fn child_mut<'a>(
        &self,
        node: &'a mut Value,
        step: usize,
        access: &PropAccess,
    ) -> Result<Option<&'a mut Value>, NavigationError> {
        let child = match (access, node) {
            (_, Value::Null) => None,
            (PropAccess::Object(key), Value::Object(map)) => map.get_mut(key),
            (PropAccess::Array(index), Value::Array(items)) => items.get_mut(*index),
            (access, other) => return Err(self.mismatch(step, access, other)),
        };
        Ok(child.filter(|v| !v.is_null()))
    }
}

impl fmt::Display for PropPath {
    /// Canonical text form, e.g. `a.b[0]["odd key"]`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, access) in self.steps.iter().enumerate() {
            match access {
                PropAccess::Object(key) if is_identifier(key) => {
                    if i > 0 {
                        f.write_str(".")?;
                    }
                    f.write_str(key)?;
                }
                PropAccess::Object(key) => write_quoted(f, key)?,
                PropAccess::Array(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}

impl From<Vec<PropAccess>> for PropPath {
    fn from(steps: Vec<PropAccess>) -> Self {
        Self::new(steps)
    }
}
