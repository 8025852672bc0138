//! parser::validator
//!
//! Resolve unvalidated bind targets into [`BindTargetDeclaration`]s.
//!
//! # Resolution
//!
//! - A relative target (no storage type, no storage path) inside a scope
//!   inherits the scope's storage type and path, and its property path is
//!   appended to the scope's.
//! - Otherwise an omitted storage type falls back to the configured
//!   default, and an omitted or empty storage path means the current
//!   document.
//! - `global_memory` targets always live at [`GLOBAL_STORAGE_PATH`]; an
//!   explicit path is ignored with a warning.
//!
//! # Diagnostics
//!
//! Unknown storage types are errors. Deprecated spellings are warnings
//! and the target is still created.

use tracing::debug;

use super::bind_target::{parse_bind_target, UnvalidatedBindTarget};
use super::{finish, DeclarationResult};
use crate::core::declaration::{BindTargetDeclaration, BindTargetScope};
use crate::core::errors::{BindError, ErrorCollection, ErrorLevel};
use crate::core::prop::{PropAccess, PropAccessKind, PropPath};
use crate::core::types::{ResultNode, StorageType, GLOBAL_STORAGE_PATH};

/// Parses and validates bind targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindTargetParser {
    default_storage_type: StorageType,
}

impl Default for BindTargetParser {
    fn default() -> Self {
        Self::new(StorageType::Frontmatter)
    }
}

impl BindTargetParser {
    pub fn new(default_storage_type: StorageType) -> Self {
        Self {
            default_storage_type,
        }
    }

    pub fn default_storage_type(&self) -> StorageType {
        self.default_storage_type
    }

    /// Parse and validate a complete bind target.
    ///
    /// # Example
    ///
    /// ```
    /// use metabind::parser::BindTargetParser;
    /// use metabind::core::types::StorageType;
    ///
    /// let parser = BindTargetParser::default();
    /// let target = parser.parse("memory^scratch#counter", "notes/a.md", None).unwrap();
    /// assert_eq!(target.value.storage_type, StorageType::Memory);
    /// assert_eq!(target.value.to_string(), "memory^scratch#counter");
    /// ```
    pub fn parse(
        &self,
        text: &str,
        file_path: &str,
        scope: Option<&BindTargetScope>,
    ) -> DeclarationResult<BindTargetDeclaration> {
        let mut errors = ErrorCollection::new("bind target");
        let declaration = parse_bind_target(text, &mut errors)
            .and_then(|unvalidated| self.validate(&unvalidated, file_path, scope, &mut errors));
        debug!(text, ok = declaration.is_some(), "parsed bind target");
        finish(declaration, errors)
    }

    /// Validate a parsed target, recording problems in `errors`.
    ///
    /// Returns `None` when the target can not be resolved.
    pub fn validate(
        &self,
        unvalidated: &UnvalidatedBindTarget,
        file_path: &str,
        scope: Option<&BindTargetScope>,
        errors: &mut ErrorCollection,
    ) -> Option<BindTargetDeclaration> {
        let explicit_type = match &unvalidated.storage_type {
            Some(node) => Some(self.validate_storage_type(node, errors)?),
            None => None,
        };

        let prop = validate_prop(unvalidated, errors)?;

        if unvalidated.is_relative() {
            if let Some(scope) = scope {
                return Some(BindTargetDeclaration::new(
                    scope.storage_type(),
                    scope.storage_path(),
                    scope.storage_prop().concat(&prop),
                ));
            }
        }

        let storage_type = explicit_type.unwrap_or(self.default_storage_type);
        let explicit_path = unvalidated
            .storage_path
            .as_ref()
            .filter(|node| !node.value.is_empty());

        let storage_path = if storage_type.is_global() {
            if let Some(node) = explicit_path.filter(|node| node.value != GLOBAL_STORAGE_PATH) {
                errors.add(BindError::validation(
                    ErrorLevel::Warning,
                    format!(
                        "storage path '{}' is ignored for storage type '{}'",
                        node.value, storage_type
                    ),
                    node.range,
                ));
            }
            GLOBAL_STORAGE_PATH.to_string()
        } else {
            explicit_path
                .map(|node| node.value.clone())
                .unwrap_or_else(|| file_path.to_string())
        };

        Some(BindTargetDeclaration::new(storage_type, storage_path, prop))
    }

    fn validate_storage_type(
        &self,
        node: &ResultNode,
        errors: &mut ErrorCollection,
    ) -> Option<StorageType> {
        if let Some(storage_type) = StorageType::from_identifier(&node.value) {
            return Some(storage_type);
        }

        if let Some(storage_type) = StorageType::from_deprecated_identifier(&node.value) {
            errors.add(BindError::validation(
                ErrorLevel::Warning,
                format!(
                    "storage type '{}' is deprecated, use '{}'",
                    node.value, storage_type
                ),
                node.range,
            ));
            return Some(storage_type);
        }

        errors.add(BindError::validation(
            ErrorLevel::Error,
            format!(
                "invalid storage type '{}', expected one of {}",
                node.value,
                StorageType::identifier_list()
            ),
            node.range,
        ));
        None
    }
}

fn validate_prop(unvalidated: &UnvalidatedBindTarget, errors: &mut ErrorCollection) -> Option<PropPath> {
    let mut path = PropPath::empty();
    let mut ok = true;
    for step in &unvalidated.storage_prop {
        match step.kind {
            PropAccessKind::Object => path.push(PropAccess::object(step.prop.value.clone())),
            PropAccessKind::Array => match PropAccess::parse_index(&step.prop.value) {
                Ok(access) => path.push(access),
                Err(e) => {
                    errors.add(BindError::validation(
                        ErrorLevel::Error,
                        e.to_string(),
                        step.prop.range,
                    ));
                    ok = false;
                }
            },
        }
    }
    ok.then_some(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> BindTargetParser {
        BindTargetParser::default()
    }

    mod resolution {
        use super::*;

        #[test]
        fn full_target() {
            let target = parser()
                .parse("frontmatter^notes/a.md#tags[0]", "other.md", None)
                .unwrap()
                .value;
            assert_eq!(target.storage_type, StorageType::Frontmatter);
            assert_eq!(target.storage_path, "notes/a.md");
            assert_eq!(
                target.storage_prop.steps(),
                &[PropAccess::object("tags"), PropAccess::array(0)]
            );
            assert!(!target.listen_to_children);
        }

        #[test]
        fn relative_in_scope() {
            let scope = BindTargetScope::new(BindTargetDeclaration::new(
                StorageType::Memory,
                "",
                PropPath::empty(),
            ));
            let target = parser().parse("status", "notes/a.md", Some(&scope)).unwrap().value;
            assert_eq!(target.storage_type, StorageType::Memory);
            assert_eq!(target.storage_path, "");
            assert_eq!(target.storage_prop.steps(), &[PropAccess::object("status")]);
        }

        #[test]
        fn scope_prop_is_prefixed() {
            let scope = BindTargetScope::new(BindTargetDeclaration::new(
                StorageType::Frontmatter,
                "a.md",
                PropPath::from_segments(&["tasks", "0"]),
            ));
            let target = parser().parse("done", "b.md", Some(&scope)).unwrap().value;
            assert_eq!(target.to_string(), "frontmatter^a.md#tasks[0].done");
        }

        #[test]
        fn scope_ignored_for_absolute() {
            let scope = BindTargetScope::new(BindTargetDeclaration::new(
                StorageType::Memory,
                "x",
                PropPath::from_segments(&["p"]),
            ));
            let target = parser().parse("#status", "b.md", Some(&scope)).unwrap().value;
            assert_eq!(target.to_string(), "frontmatter^b.md#status");
        }

        #[test]
        fn omitted_path_is_current_file() {
            let target = parser().parse("memory^counter", "a.md", None);
            // `memory^counter` has no '#', so `counter` is the property
            let target = target.unwrap().value;
            assert_eq!(target.storage_path, "a.md");
            assert_eq!(target.storage_prop.to_string(), "counter");
        }

        #[test]
        fn default_type_is_configurable() {
            let target = BindTargetParser::new(StorageType::Memory)
                .parse("x", "a.md", None)
                .unwrap()
                .value;
            assert_eq!(target.storage_type, StorageType::Memory);
        }

        #[test]
        fn global_memory_path() {
            let result = parser().parse("global_memory^somewhere#x", "a.md", None).unwrap();
            assert_eq!(result.value.storage_path, GLOBAL_STORAGE_PATH);
            assert!(result.diagnostics.has_warnings());
        }
    }

    mod diagnostics {
        use super::*;

        #[test]
        fn unknown_storage_type_is_error() {
            let errors = parser().parse("disk^a.md#x", "a.md", None).unwrap_err();
            assert!(errors.has_errors());
            let range = errors.iter().next().unwrap().range.unwrap();
            assert_eq!(range.slice("disk^a.md#x"), "disk");
        }

        #[test]
        fn deprecated_storage_type_is_warning() {
            let result = parser().parse("globalMemory^#x", "a.md", None).unwrap();
            assert_eq!(result.value.storage_type, StorageType::GlobalMemory);
            assert!(result.diagnostics.has_warnings());
            assert!(!result.diagnostics.has_errors());
        }

        #[test]
        fn index_overflow_is_error() {
            let errors = parser()
                .parse("a[99999999999999999999999]", "a.md", None)
                .unwrap_err();
            assert!(errors.has_errors());
        }

        #[test]
        fn non_numeric_index() {
            let errors = parser().parse("tags[x]", "a.md", None).unwrap_err();
            assert_eq!(errors.len(), 1);
        }
    }
}
