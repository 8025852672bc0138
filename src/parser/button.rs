//! parser::button
//!
//! Inline button lists: `BUTTON[id1, id2]`.

use super::cursor::Cursor;
use super::{finish, DeclarationResult};
use crate::core::errors::{BindError, ErrorCollection, ErrorLevel};
use crate::core::types::ParsingRange;

/// Characters that may not appear in a button id.
const RESERVED: &[char] = &['[', ']', ',', '^'];

/// Parse `BUTTON[...]` into the ids it references.
///
/// ```
/// use metabind::parser::button::parse_button_list;
///
/// let ids = parse_button_list("BUTTON[save, reset]").unwrap().value;
/// assert_eq!(ids, vec!["save", "reset"]);
/// ```
pub fn parse_button_list(text: &str) -> DeclarationResult<Vec<String>> {
    let mut errors = ErrorCollection::new("button list");
    let ids = parse(text, &mut errors);
    finish(ids, errors)
}

fn parse(text: &str, errors: &mut ErrorCollection) -> Option<Vec<String>> {
    let mut cursor = Cursor::new(text);
    cursor.skip_whitespace();
    if !cursor.eat_str("BUTTON[") {
        errors.add(BindError::parse(
            "expected button list starting with 'BUTTON['",
            ParsingRange::point(cursor.position()),
        ));
        return None;
    }

    let mut ids = Vec::new();
    loop {
        cursor.skip_whitespace();
        let id = cursor.take_while(|c| !RESERVED.contains(&c));
        let trimmed = id.value.trim_end();
        if trimmed.is_empty() {
            errors.add(BindError::validation(
                ErrorLevel::Error,
                "button id must not be empty",
                id.range,
            ));
        } else {
            ids.push(trimmed.to_string());
        }

        match cursor.bump() {
            Some(',') => continue,
            Some(']') => break,
            Some(c) => {
                errors.add(BindError::parse(
                    format!("unexpected '{c}' in button list"),
                    ParsingRange::point(cursor.position()),
                ));
                return None;
            }
            None => {
                errors.add(BindError::parse(
                    "expected ']' to close button list",
                    ParsingRange::point(cursor.position()),
                ));
                return None;
            }
        }
    }

    cursor.skip_whitespace();
    if !cursor.is_eof() {
        let rest = cursor.take_rest();
        errors.add(BindError::parse(
            format!("unexpected input '{}' after button list", rest.value),
            rest.range.unwrap_or_else(|| ParsingRange::point(cursor.position())),
        ));
    }
    Some(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_id() {
        assert_eq!(parse_button_list("BUTTON[go]").unwrap().value, vec!["go"]);
    }

    #[test]
    fn ids_with_spaces() {
        let ids = parse_button_list("BUTTON[ open note , next ]").unwrap().value;
        assert_eq!(ids, vec!["open note", "next"]);
    }

    #[test]
    fn empty_id_is_error() {
        assert!(parse_button_list("BUTTON[a,,b]").unwrap_err().has_errors());
        assert!(parse_button_list("BUTTON[]").is_err());
    }

    #[test]
    fn reserved_character() {
        assert!(parse_button_list("BUTTON[a^b]").is_err());
    }
}
