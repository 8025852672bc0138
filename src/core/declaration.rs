//! core::declaration
//!
//! Validated bind targets and the scopes relative declarations resolve against.

use std::fmt;

use super::prop::PropPath;
use super::types::StorageType;

/// A fully resolved reference to one value in one storage source.
///
/// Produced by the validator and immutable afterwards; re-parsing a
/// declaration yields a new instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BindTargetDeclaration {
    pub storage_type: StorageType,
    /// The document (or scratch key) the value lives in.
    pub storage_path: String,
    pub storage_prop: PropPath,
    /// Also fire on changes below `storage_prop`, not only at it.
    pub listen_to_children: bool,
}

impl BindTargetDeclaration {
    pub fn new(
        storage_type: StorageType,
        storage_path: impl Into<String>,
        storage_prop: PropPath,
    ) -> Self {
        Self {
            storage_type,
            storage_path: storage_path.into(),
            storage_prop,
            listen_to_children: false,
        }
    }

    pub fn with_listen_to_children(mut self, listen: bool) -> Self {
        self.listen_to_children = listen;
        self
    }

    /// Whether both targets live in the same storage tree.
    pub fn same_storage(&self, other: &BindTargetDeclaration) -> bool {
        self.storage_type == other.storage_type && self.storage_path == other.storage_path
    }

    /// Whether a change to one target can change the other.
    pub fn overlaps(&self, other: &BindTargetDeclaration) -> bool {
        self.same_storage(other) && self.storage_prop.overlaps(&other.storage_prop)
    }
}

impl fmt::Display for BindTargetDeclaration {
    /// Canonical text form: `storageType^storagePath#prop.path`.
    ///
    /// Storage paths containing reserved characters cannot be expressed
    /// and are written verbatim.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}^{}#{}",
            self.storage_type, self.storage_path, self.storage_prop
        )
    }
}

/// Ambient defaults for relative declarations.
///
/// A declaration that names neither a storage type nor a storage path is
/// relative: it inherits both from the scope and its property path is
/// appended to the scope's.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindTargetScope {
    target: BindTargetDeclaration,
}

impl BindTargetScope {
    pub fn new(target: BindTargetDeclaration) -> Self {
        Self { target }
    }

    pub fn target(&self) -> &BindTargetDeclaration {
        &self.target
    }

    pub fn storage_type(&self) -> StorageType {
        self.target.storage_type
    }

    pub fn storage_path(&self) -> &str {
        &self.target.storage_path
    }

    pub fn storage_prop(&self) -> &PropPath {
        &self.target.storage_prop
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::prop::PropAccess;

    #[test]
    fn display_is_canonical() {
        let target = BindTargetDeclaration::new(
            StorageType::Frontmatter,
            "notes/a.md",
            PropPath::new(vec![PropAccess::object("tags"), PropAccess::array(0)]),
        );
        assert_eq!(target.to_string(), "frontmatter^notes/a.md#tags[0]");
    }

    #[test]
    fn overlap_requires_same_storage() {
        let a = BindTargetDeclaration::new(
            StorageType::Memory,
            "a.md",
            PropPath::from_segments(&["x"]),
        );
        let b = BindTargetDeclaration::new(
            StorageType::Memory,
            "a.md",
            PropPath::from_segments(&["x", "y"]),
        );
        let other_doc = BindTargetDeclaration::new(
            StorageType::Memory,
            "b.md",
            PropPath::from_segments(&["x"]),
        );
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&other_doc));
    }
}
