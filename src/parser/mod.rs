//! parser
//!
//! Declaration grammars and validation.
//!
//! # Pipeline
//!
//! Text is parsed into an unvalidated tree that keeps every token's source
//! range, then validated against the storage types and the ambient scope.
//! Both passes record problems in an [`ErrorCollection`] instead of
//! stopping at the first one.
//!
//! # Modules
//!
//! - [`cursor`] - Position-tracking input cursor
//! - [`bind_target`] - `type^path#prop` grammar
//! - [`validator`] - Bind target resolution
//! - [`input_field`] - `INPUT[...]` declarations
//! - [`view_field`] - `VIEW[...]` declarations
//! - [`button`] - `BUTTON[...]` lists

pub mod arguments;
pub mod bind_target;
pub mod button;
pub mod cursor;
pub mod input_field;
pub mod validator;
pub mod view_field;

pub use validator::BindTargetParser;

use std::fmt;

use crate::core::declaration::{BindTargetDeclaration, BindTargetScope};
use crate::core::errors::{BindError, ErrorCollection};
use crate::core::types::StorageType;
use input_field::InputFieldDeclaration;
use view_field::ViewFieldDeclaration;

/// A declaration that passed validation, with any warnings it produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Validated<T> {
    pub value: T,
    /// Non-blocking diagnostics (warnings only).
    pub diagnostics: ErrorCollection,
}

/// Either a usable declaration or every problem that prevented one.
pub type DeclarationResult<T> = Result<Validated<T>, ErrorCollection>;

pub(crate) fn finish<T>(value: Option<T>, mut errors: ErrorCollection) -> DeclarationResult<T> {
    match value {
        Some(value) if !errors.has_errors() => Ok(Validated {
            value,
            diagnostics: errors,
        }),
        Some(_) => Err(errors),
        None => {
            if !errors.has_errors() {
                errors.add(BindError::internal(
                    "declaration rejected without a diagnostic",
                ));
            }
            Err(errors)
        }
    }
}

/// The declaration kinds that can appear inline in a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Input,
    View,
    Button,
}

impl FieldKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            FieldKind::Input => "INPUT[",
            FieldKind::View => "VIEW[",
            FieldKind::Button => "BUTTON[",
        }
    }

    /// The kind a declaration text starts with.
    pub fn detect(text: &str) -> Option<Self> {
        let text = text.trim_start();
        [FieldKind::Input, FieldKind::View, FieldKind::Button]
            .into_iter()
            .find(|kind| text.starts_with(kind.prefix()))
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::Input => "input field",
            FieldKind::View => "view field",
            FieldKind::Button => "button list",
        };
        f.write_str(name)
    }
}

/// A declaration found in a backtick span of a markdown document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineDeclaration {
    pub kind: FieldKind,
    pub text: String,
    /// 1-based line of the span.
    pub line: usize,
}

/// Find every inline declaration in a markdown document.
///
/// Only single-backtick spans are considered; fenced code blocks are
/// skipped.
pub fn find_inline_declarations(markdown: &str) -> Vec<InlineDeclaration> {
    let mut found = Vec::new();
    let mut in_fence = false;

    for (index, line) in markdown.lines().enumerate() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }

        let mut spans = line.split('`');
        spans.next();
        // odd segments are inside backticks
        while let Some(inside) = spans.next() {
            if let Some(kind) = FieldKind::detect(inside) {
                found.push(InlineDeclaration {
                    kind,
                    text: inside.trim().to_string(),
                    line: index + 1,
                });
            }
            spans.next();
        }
    }

    found
}

/// A validated declaration of any inline kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Declaration {
    Input(InputFieldDeclaration),
    View(ViewFieldDeclaration),
    Button(Vec<String>),
}

/// Entry point for every declaration grammar.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclarationParser {
    bind_targets: BindTargetParser,
}

impl DeclarationParser {
    pub fn new(default_storage_type: StorageType) -> Self {
        Self {
            bind_targets: BindTargetParser::new(default_storage_type),
        }
    }

    pub fn bind_targets(&self) -> &BindTargetParser {
        &self.bind_targets
    }

    pub fn bind_target(
        &self,
        text: &str,
        file_path: &str,
        scope: Option<&BindTargetScope>,
    ) -> DeclarationResult<BindTargetDeclaration> {
        self.bind_targets.parse(text, file_path, scope)
    }

    pub fn input_field(
        &self,
        text: &str,
        file_path: &str,
        scope: Option<&BindTargetScope>,
    ) -> DeclarationResult<InputFieldDeclaration> {
        input_field::parse_input_field(&self.bind_targets, text, file_path, scope)
    }

    pub fn view_field(
        &self,
        text: &str,
        file_path: &str,
        scope: Option<&BindTargetScope>,
    ) -> DeclarationResult<ViewFieldDeclaration> {
        view_field::parse_view_field(&self.bind_targets, text, file_path, scope)
    }

    pub fn button_list(&self, text: &str) -> DeclarationResult<Vec<String>> {
        button::parse_button_list(text)
    }

    /// Parse any inline declaration, dispatching on its prefix.
    pub fn any(
        &self,
        kind: FieldKind,
        text: &str,
        file_path: &str,
        scope: Option<&BindTargetScope>,
    ) -> DeclarationResult<Declaration> {
        fn map<T>(result: DeclarationResult<T>, f: impl FnOnce(T) -> Declaration) -> DeclarationResult<Declaration> {
            result.map(|v| Validated {
                value: f(v.value),
                diagnostics: v.diagnostics,
            })
        }
        match kind {
            FieldKind::Input => map(self.input_field(text, file_path, scope), Declaration::Input),
            FieldKind::View => map(self.view_field(text, file_path, scope), Declaration::View),
            FieldKind::Button => map(self.button_list(text), Declaration::Button),
        }
    }
}
