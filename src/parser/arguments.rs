//! parser::arguments
//!
//! Field argument lists shared by the input and view field grammars.
//!
//! ```text
//! arguments := "(" argument ("," argument)* ")"
//! argument  := ident ("(" value ("," value)* ")")?
//! value     := quoted | [^,()]*
//! ```

use super::bind_target::quoted_string;
use super::cursor::Cursor;
use crate::core::errors::{BindError, ErrorCollection};
use crate::core::types::ResultNode;

/// A field argument as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnvalidatedFieldArgument {
    pub name: ResultNode,
    pub values: Vec<ResultNode>,
}

/// Parse a parenthesized argument list at the cursor.
///
/// The cursor must be at `(`.
pub fn argument_list(cursor: &mut Cursor<'_>, errors: &mut ErrorCollection) -> Vec<UnvalidatedFieldArgument> {
    let open = cursor.position();
    cursor.bump();
    let mut arguments = Vec::new();

    loop {
        cursor.skip_whitespace();
        let Some(name) = cursor.ident() else {
            errors.add(BindError::parse(
                "expected argument name",
                cursor.range_from(cursor.position()),
            ));
            skip_past(cursor, ')');
            return arguments;
        };

        cursor.skip_whitespace();
        let values = if cursor.at('(') {
            value_list(cursor, errors)
        } else {
            Vec::new()
        };
        arguments.push(UnvalidatedFieldArgument { name, values });

        cursor.skip_whitespace();
        if cursor.eat(',') {
            continue;
        }
        if cursor.eat(')') {
            return arguments;
        }
        errors.add(BindError::parse(
            "unclosed argument list, expected ',' or ')'",
            cursor.range_from(open),
        ));
        skip_past(cursor, ')');
        return arguments;
    }
}

fn value_list(cursor: &mut Cursor<'_>, errors: &mut ErrorCollection) -> Vec<ResultNode> {
    let open = cursor.position();
    cursor.bump();
    let mut values = Vec::new();

    loop {
        cursor.skip_whitespace();
        if cursor.at('"') {
            if let Some(value) = quoted_string(cursor, errors) {
                values.push(value);
            }
        } else {
            let raw = cursor.take_while(|c| !matches!(c, ',' | '(' | ')' | '[' | ']'));
            values.push(trim_node(raw));
        }

        cursor.skip_whitespace();
        if cursor.eat(',') {
            continue;
        }
        if cursor.eat(')') {
            return values;
        }
        errors.add(BindError::parse(
            "unclosed argument value list",
            cursor.range_from(open),
        ));
        return values;
    }
}

/// Trim trailing whitespace off a token, narrowing its range.
fn trim_node(node: ResultNode) -> ResultNode {
    let trimmed = node.value.trim_end();
    if trimmed.len() == node.value.len() {
        return node;
    }
    match node.range {
        Some(mut range) => {
            let dropped = &node.value[trimmed.len()..];
            range.to.index -= dropped.len();
            range.to.column -= dropped.chars().count();
            ResultNode::new(trimmed, range)
        }
        None => ResultNode::synthetic(trimmed),
    }
}

fn skip_past(cursor: &mut Cursor<'_>, close: char) {
    while let Some(c) = cursor.bump() {
        if c == close {
            return;
        }
    }
}
