//! parser::bind_target
//!
//! Bind target grammar.
//!
//! # Grammar
//!
//! ```text
//! bind_target := (ident "^")? (file_path "#")? prop_path
//! file_path   := [^{}[\]#^|:?]*
//! prop_path   := first ("." ident bracket*)*
//! first       := bracket+ | ident bracket*
//! bracket     := "[" (digits | quoted) "]"
//! ```
//!
//! The property path may be empty only after an explicit `#`, in which case
//! the target is the whole document.
//!
//! Syntax errors are collected, not returned early: a bad bracket token is
//! reported with the range of exactly that token and parsing resumes after
//! the closing `]`.

use super::cursor::Cursor;
use crate::core::errors::{BindError, ErrorCollection};
use crate::core::prop::PropAccessKind;
use crate::core::types::{ParsingRange, ResultNode};

/// Characters that end a storage path.
const FILE_PATH_RESERVED: &[char] = &['{', '}', '[', ']', '#', '^', '|', ':', '?'];

/// One property step as written, before index conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnvalidatedPropAccess {
    pub kind: PropAccessKind,
    pub prop: ResultNode,
}

/// A bind target as written, with every token's source range.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UnvalidatedBindTarget {
    pub storage_type: Option<ResultNode>,
    pub storage_path: Option<ResultNode>,
    pub storage_prop: Vec<UnvalidatedPropAccess>,
}

impl UnvalidatedBindTarget {
    /// Neither storage type nor storage path was written.
    pub fn is_relative(&self) -> bool {
        self.storage_type.is_none() && self.storage_path.is_none()
    }
}

/// Parse one bind target starting at the cursor.
///
/// Stops at the first character that cannot continue the target; the
/// caller decides whether anything may follow. Returns `None` when no
/// target could be recovered, after recording why.
pub fn bind_target(cursor: &mut Cursor<'_>, errors: &mut ErrorCollection) -> Option<UnvalidatedBindTarget> {
    let mut target = UnvalidatedBindTarget {
        storage_type: storage_type_prefix(cursor),
        ..Default::default()
    };
    target.storage_path = storage_path_prefix(cursor);

    let start = cursor.position();
    match prop_path(cursor, errors) {
        Some(steps) => target.storage_prop = steps,
        None if target.storage_path.is_some() => {}
        None => {
            let found = cursor
                .peek()
                .map(|c| format!("'{c}'"))
                .unwrap_or_else(|| "end of input".to_string());
            errors.add(BindError::parse(
                format!("expected property path, found {found}"),
                ParsingRange::point(start),
            ));
            return None;
        }
    }

    Some(target)
}

/// Parse `text` as a complete bind target.
///
/// Surrounding whitespace is allowed; anything else after the target is an
/// error.
pub fn parse_bind_target(text: &str, errors: &mut ErrorCollection) -> Option<UnvalidatedBindTarget> {
    let mut cursor = Cursor::new(text);
    cursor.skip_whitespace();
    let target = bind_target(&mut cursor, errors)?;
    cursor.skip_whitespace();
    if !cursor.is_eof() {
        let rest = cursor.take_rest();
        errors.add(BindError::parse(
            format!("unexpected input '{}' after bind target", rest.value),
            rest.range.unwrap_or_else(|| ParsingRange::point(cursor.position())),
        ));
    }
    Some(target)
}

fn storage_type_prefix(cursor: &mut Cursor<'_>) -> Option<ResultNode> {
    let mut attempt = cursor.clone();
    let ident = attempt.ident()?;
    if attempt.eat('^') {
        *cursor = attempt;
        Some(ident)
    } else {
        None
    }
}

fn storage_path_prefix(cursor: &mut Cursor<'_>) -> Option<ResultNode> {
    let mut attempt = cursor.clone();
    let path = attempt.take_while(|c| !FILE_PATH_RESERVED.contains(&c));
    if attempt.eat('#') {
        *cursor = attempt;
        Some(path)
    } else {
        None
    }
}

/// `None` when not even a first segment is present.
fn prop_path(cursor: &mut Cursor<'_>, errors: &mut ErrorCollection) -> Option<Vec<UnvalidatedPropAccess>> {
    let mut steps = Vec::new();

    if cursor.at('[') {
        brackets(cursor, errors, &mut steps);
    } else {
        let ident = cursor.ident()?;
        steps.push(UnvalidatedPropAccess {
            kind: PropAccessKind::Object,
            prop: ident,
        });
        brackets(cursor, errors, &mut steps);
    }

    while cursor.at('.') {
        let dot = cursor.position();
        cursor.bump();
        match cursor.ident() {
            Some(ident) => steps.push(UnvalidatedPropAccess {
                kind: PropAccessKind::Object,
                prop: ident,
            }),
            None => {
                errors.add(BindError::parse(
                    "expected identifier after '.'",
                    cursor.range_from(dot),
                ));
                break;
            }
        }
        brackets(cursor, errors, &mut steps);
    }

    Some(steps)
}

fn brackets(cursor: &mut Cursor<'_>, errors: &mut ErrorCollection, steps: &mut Vec<UnvalidatedPropAccess>) {
    while cursor.at('[') {
        let open = cursor.position();
        cursor.bump();

        if cursor.at('"') {
            if let Some(key) = quoted_string(cursor, errors) {
                steps.push(UnvalidatedPropAccess {
                    kind: PropAccessKind::Object,
                    prop: key,
                });
            }
        } else {
            let token = cursor.take_while(|c| c != ']' && c != '[' && c != '\n');
            let range = token.range.unwrap_or_else(|| ParsingRange::point(open));
            if token.value.is_empty() {
                errors.add(BindError::parse(
                    "expected array index or quoted key inside '[]'",
                    range,
                ));
            } else if token.value.bytes().all(|b| b.is_ascii_digit()) {
                steps.push(UnvalidatedPropAccess {
                    kind: PropAccessKind::Array,
                    prop: token,
                });
            } else {
                errors.add(BindError::parse(
                    format!("can not access array with non number index '{}'", token.value),
                    range,
                ));
            }
        }

        if !cursor.eat(']') {
            errors.add(BindError::parse("unclosed '['", cursor.range_from(open)));
            return;
        }
    }
}

/// A double quoted string with `\"` and `\\` escapes.
///
/// The returned node holds the unescaped content and the range of the
/// whole literal.
pub(crate) fn quoted_string(cursor: &mut Cursor<'_>, errors: &mut ErrorCollection) -> Option<ResultNode> {
    let start = cursor.position();
    cursor.bump();
    let mut value = String::new();
    loop {
        match cursor.bump() {
            Some('"') => return Some(ResultNode::new(value, cursor.range_from(start))),
            Some('\\') => match cursor.bump() {
                Some(c) => value.push(c),
                None => break,
            },
            Some(c) => value.push(c),
            None => break,
        }
    }
    errors.add(BindError::parse(
        "unterminated string",
        cursor.range_from(start),
    ));
    None
}
