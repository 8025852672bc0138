//! core::literal
//!
//! Coercions between untyped metadata values and the literal types
//! consumers work with.
//!
//! A literal is `null`, a boolean, a number, or a string. Consumers with a
//! native value type (a slider's float, a toggle's bool) use these
//! functions as the `map` of a [`MappedSignal`](crate::reactive::MappedSignal),
//! falling back to a default when a value does not coerce.

use serde_json::{Number, Value};

/// Parse declaration text into a literal.
///
/// `null` (any case), `true`, `false`, and numbers are recognized;
/// everything else stays a string.
///
/// ```
/// use metabind::core::literal::parse_literal;
/// use serde_json::json;
///
/// assert_eq!(parse_literal("NULL"), json!(null));
/// assert_eq!(parse_literal("true"), json!(true));
/// assert_eq!(parse_literal("-2.5"), json!(-2.5));
/// assert_eq!(parse_literal("done"), json!("done"));
/// ```
pub fn parse_literal(text: &str) -> Value {
    if text.eq_ignore_ascii_case("null") {
        Value::Null
    } else if text == "true" {
        Value::Bool(true)
    } else if text == "false" {
        Value::Bool(false)
    } else if let Some(number) = parse_number(text) {
        Value::Number(number)
    } else {
        Value::String(text.to_string())
    }
}

/// Strict number syntax: optional `-`, digits, optional fraction.
fn parse_number(text: &str) -> Option<Number> {
    let digits = text.strip_prefix('-').unwrap_or(text);
    let (int_part, frac_part) = match digits.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (digits, None),
    };
    if int_part.is_empty() || !int_part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    match frac_part {
        None => text
            .parse::<i64>()
            .ok()
            .map(Number::from)
            .or_else(|| text.parse::<f64>().ok().and_then(Number::from_f64)),
        Some(f) if !f.is_empty() && f.bytes().all(|b| b.is_ascii_digit()) => {
            text.parse::<f64>().ok().and_then(Number::from_f64)
        }
        Some(_) => None,
    }
}

pub fn is_literal(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

/// Text form of a literal. `null` becomes the empty string.
pub fn stringify_literal(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// A literal becomes a one element list; a list keeps only its literals.
pub fn to_literal_array(value: &Value) -> Option<Vec<Value>> {
    match value {
        Value::Null => None,
        Value::Array(items) => Some(items.iter().filter(|v| is_literal(v)).cloned().collect()),
        Value::Object(_) => None,
        literal => Some(vec![literal.clone()]),
    }
}

pub fn to_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => match parse_number(s) {
            Some(n) => n.as_f64(),
            None => None,
        },
        _ => None,
    }
}

/// Like [`to_float`], but only for whole numbers.
pub fn to_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) if !s.contains('.') => parse_number(s).and_then(|n| n.as_i64()),
        _ => None,
    }
}

/// The string form of a literal; `None` for lists and objects.
pub fn to_string_lossless(value: &Value) -> Option<String> {
    is_literal(value).then(|| stringify_literal(value))
}

/// Human readable text for any value.
///
/// Lists are joined with `", "` (empty entries dropped), objects are JSON.
///
/// ```
/// use metabind::core::literal::stringify_unknown;
/// use serde_json::json;
///
/// assert_eq!(stringify_unknown(&json!(["a", null, 2]), true), "a, 2");
/// assert_eq!(stringify_unknown(&json!(null), false), "null");
/// ```
pub fn stringify_unknown(value: &Value, null_as_empty: bool) -> String {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|v| stringify_single(v, null_as_empty))
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        other => stringify_single(other, null_as_empty),
    }
}

fn stringify_single(value: &Value, null_as_empty: bool) -> String {
    match value {
        Value::Null if null_as_empty => String::new(),
        Value::Null => "null".to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
        literal => stringify_literal(literal),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn number_parsing_is_strict() {
        assert_eq!(parse_literal("12"), json!(12));
        assert_eq!(parse_literal("1.5"), json!(1.5));
        assert_eq!(parse_literal("1."), json!("1."));
        assert_eq!(parse_literal(".5"), json!(".5"));
        assert_eq!(parse_literal("1e5"), json!("1e5"));
        assert_eq!(parse_literal("True"), json!("True"));
    }

    #[test]
    fn float_coercion() {
        assert_eq!(to_float(&json!(3)), Some(3.0));
        assert_eq!(to_float(&json!("4.25")), Some(4.25));
        assert_eq!(to_float(&json!("four")), None);
        assert_eq!(to_float(&json!(true)), None);
    }

    #[test]
    fn int_coercion() {
        assert_eq!(to_int(&json!(7)), Some(7));
        assert_eq!(to_int(&json!(7.0)), Some(7));
        assert_eq!(to_int(&json!(7.5)), None);
        assert_eq!(to_int(&json!("-3")), Some(-3));
        assert_eq!(to_int(&json!("3.0")), None);
    }

    #[test]
    fn literal_arrays() {
        assert_eq!(to_literal_array(&json!("a")), Some(vec![json!("a")]));
        assert_eq!(
            to_literal_array(&json!(["a", {"x": 1}, 2])),
            Some(vec![json!("a"), json!(2)])
        );
        assert_eq!(to_literal_array(&json!(null)), None);
        assert_eq!(to_literal_array(&json!({})), None);
    }

    #[test]
    fn stringify() {
        assert_eq!(stringify_literal(&json!(null)), "");
        assert_eq!(stringify_literal(&json!(false)), "false");
        assert_eq!(to_string_lossless(&json!([1])), None);
        assert_eq!(stringify_unknown(&json!({"a": 1}), true), r#"{"a":1}"#);
    }
}
