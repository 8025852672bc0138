//! parser::input_field
//!
//! Input field declarations: `INPUT[type(arguments):bindTarget]`.
//!
//! # Validation
//!
//! | Problem                                   | Level   |
//! |-------------------------------------------|---------|
//! | unknown field type                        | error   |
//! | unknown argument                          | warning |
//! | argument not applicable to the field type | warning |
//! | wrong number of argument values           | error   |
//! | value that is not a number                | error   |
//! | repeated non-repeatable argument          | error   |
//! | `minValue` not below `maxValue`           | error   |
//!
//! Warnings drop the offending argument; the field is still created.

use std::fmt;

use serde_json::Value;

use super::arguments::{argument_list, UnvalidatedFieldArgument};
use super::bind_target::{bind_target, UnvalidatedBindTarget};
use super::cursor::Cursor;
use super::validator::BindTargetParser;
use super::{finish, DeclarationResult};
use crate::core::declaration::{BindTargetDeclaration, BindTargetScope};
use crate::core::errors::{BindError, ErrorCollection, ErrorLevel};
use crate::core::literal::parse_literal;
use crate::core::types::{ParsingRange, ResultNode};

/// The kinds of input widget a declaration can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputFieldType {
    Toggle,
    Slider,
    Text,
    TextArea,
    Number,
    Select,
    MultiSelect,
    InlineSelect,
    Date,
    Time,
    DatePicker,
    Suggester,
    ListSuggester,
    List,
    InlineList,
    ProgressBar,
    Editor,
    /// Placeholder for an unrecognized type; always accompanied by an error.
    Invalid,
}

impl InputFieldType {
    pub const ALL: [InputFieldType; 17] = [
        InputFieldType::Toggle,
        InputFieldType::Slider,
        InputFieldType::Text,
        InputFieldType::TextArea,
        InputFieldType::Number,
        InputFieldType::Select,
        InputFieldType::MultiSelect,
        InputFieldType::InlineSelect,
        InputFieldType::Date,
        InputFieldType::Time,
        InputFieldType::DatePicker,
        InputFieldType::Suggester,
        InputFieldType::ListSuggester,
        InputFieldType::List,
        InputFieldType::InlineList,
        InputFieldType::ProgressBar,
        InputFieldType::Editor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InputFieldType::Toggle => "toggle",
            InputFieldType::Slider => "slider",
            InputFieldType::Text => "text",
            InputFieldType::TextArea => "textArea",
            InputFieldType::Number => "number",
            InputFieldType::Select => "select",
            InputFieldType::MultiSelect => "multiSelect",
            InputFieldType::InlineSelect => "inlineSelect",
            InputFieldType::Date => "date",
            InputFieldType::Time => "time",
            InputFieldType::DatePicker => "datePicker",
            InputFieldType::Suggester => "suggester",
            InputFieldType::ListSuggester => "listSuggester",
            InputFieldType::List => "list",
            InputFieldType::InlineList => "inlineList",
            InputFieldType::ProgressBar => "progressBar",
            InputFieldType::Editor => "editor",
            InputFieldType::Invalid => "invalid",
        }
    }

    pub fn from_identifier(ident: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == ident)
    }
}

impl fmt::Display for InputFieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Argument names, with the rules that apply to each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputFieldArgumentType {
    Class,
    AddLabels,
    MinValue,
    MaxValue,
    StepSize,
    Option,
    Title,
    Placeholder,
    DefaultValue,
    Limit,
    OffValue,
    OnValue,
    Showcase,
}

const SELECTS: &[InputFieldType] = &[
    InputFieldType::Select,
    InputFieldType::MultiSelect,
    InputFieldType::InlineSelect,
    InputFieldType::Suggester,
    InputFieldType::ListSuggester,
];
const RANGED: &[InputFieldType] = &[InputFieldType::Slider, InputFieldType::ProgressBar];
const STEPPED: &[InputFieldType] = &[
    InputFieldType::Slider,
    InputFieldType::ProgressBar,
    InputFieldType::Number,
];
const TEXTUAL: &[InputFieldType] = &[
    InputFieldType::Text,
    InputFieldType::TextArea,
    InputFieldType::Number,
    InputFieldType::List,
    InputFieldType::InlineList,
];
const LIMITED: &[InputFieldType] = &[
    InputFieldType::Text,
    InputFieldType::TextArea,
    InputFieldType::List,
    InputFieldType::InlineList,
];

impl InputFieldArgumentType {
    pub const ALL: [InputFieldArgumentType; 13] = [
        InputFieldArgumentType::Class,
        InputFieldArgumentType::AddLabels,
        InputFieldArgumentType::MinValue,
        InputFieldArgumentType::MaxValue,
        InputFieldArgumentType::StepSize,
        InputFieldArgumentType::Option,
        InputFieldArgumentType::Title,
        InputFieldArgumentType::Placeholder,
        InputFieldArgumentType::DefaultValue,
        InputFieldArgumentType::Limit,
        InputFieldArgumentType::OffValue,
        InputFieldArgumentType::OnValue,
        InputFieldArgumentType::Showcase,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InputFieldArgumentType::Class => "class",
            InputFieldArgumentType::AddLabels => "addLabels",
            InputFieldArgumentType::MinValue => "minValue",
            InputFieldArgumentType::MaxValue => "maxValue",
            InputFieldArgumentType::StepSize => "stepSize",
            InputFieldArgumentType::Option => "option",
            InputFieldArgumentType::Title => "title",
            InputFieldArgumentType::Placeholder => "placeholder",
            InputFieldArgumentType::DefaultValue => "defaultValue",
            InputFieldArgumentType::Limit => "limit",
            InputFieldArgumentType::OffValue => "offValue",
            InputFieldArgumentType::OnValue => "onValue",
            InputFieldArgumentType::Showcase => "showcase",
        }
    }

    pub fn from_identifier(ident: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == ident)
    }

    /// Field types the argument applies to; `None` means every type.
    pub fn allowed_types(&self) -> Option<&'static [InputFieldType]> {
        match self {
            InputFieldArgumentType::Class
            | InputFieldArgumentType::DefaultValue
            | InputFieldArgumentType::Showcase => None,
            InputFieldArgumentType::AddLabels => Some(&[InputFieldType::Slider]),
            InputFieldArgumentType::MinValue | InputFieldArgumentType::MaxValue => Some(RANGED),
            InputFieldArgumentType::StepSize => Some(STEPPED),
            InputFieldArgumentType::Option => Some(SELECTS),
            InputFieldArgumentType::Title => Some(&[
                InputFieldType::Select,
                InputFieldType::MultiSelect,
            ]),
            InputFieldArgumentType::Placeholder => Some(TEXTUAL),
            InputFieldArgumentType::Limit => Some(LIMITED),
            InputFieldArgumentType::OffValue | InputFieldArgumentType::OnValue => {
                Some(&[InputFieldType::Toggle])
            }
        }
    }

    pub fn is_allowed(&self, field_type: InputFieldType) -> bool {
        self.allowed_types()
            .map_or(true, |types| types.contains(&field_type))
    }

    pub fn is_repeatable(&self) -> bool {
        matches!(
            self,
            InputFieldArgumentType::Class | InputFieldArgumentType::Option
        )
    }

    /// Accepted number of values, inclusive.
    fn arity(&self) -> (usize, usize) {
        match self {
            InputFieldArgumentType::AddLabels | InputFieldArgumentType::Showcase => (0, 1),
            InputFieldArgumentType::Option => (1, 2),
            _ => (1, 1),
        }
    }
}

impl fmt::Display for InputFieldArgumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated argument with its typed value.
#[derive(Debug, Clone, PartialEq)]
pub enum InputFieldArgument {
    Class(String),
    AddLabels(bool),
    MinValue(f64),
    MaxValue(f64),
    StepSize(f64),
    /// A selectable value and the label shown for it.
    Option { value: Value, name: String },
    Title(String),
    Placeholder(String),
    DefaultValue(Value),
    Limit(u64),
    OffValue(Value),
    OnValue(Value),
    Showcase(bool),
}

impl InputFieldArgument {
    pub fn argument_type(&self) -> InputFieldArgumentType {
        match self {
            InputFieldArgument::Class(_) => InputFieldArgumentType::Class,
            InputFieldArgument::AddLabels(_) => InputFieldArgumentType::AddLabels,
            InputFieldArgument::MinValue(_) => InputFieldArgumentType::MinValue,
            InputFieldArgument::MaxValue(_) => InputFieldArgumentType::MaxValue,
            InputFieldArgument::StepSize(_) => InputFieldArgumentType::StepSize,
            InputFieldArgument::Option { .. } => InputFieldArgumentType::Option,
            InputFieldArgument::Title(_) => InputFieldArgumentType::Title,
            InputFieldArgument::Placeholder(_) => InputFieldArgumentType::Placeholder,
            InputFieldArgument::DefaultValue(_) => InputFieldArgumentType::DefaultValue,
            InputFieldArgument::Limit(_) => InputFieldArgumentType::Limit,
            InputFieldArgument::OffValue(_) => InputFieldArgumentType::OffValue,
            InputFieldArgument::OnValue(_) => InputFieldArgumentType::OnValue,
            InputFieldArgument::Showcase(_) => InputFieldArgumentType::Showcase,
        }
    }
}

/// A validated input field.
#[derive(Debug, Clone, PartialEq)]
pub struct InputFieldDeclaration {
    pub declaration: String,
    pub field_type: InputFieldType,
    pub arguments: Vec<InputFieldArgument>,
    pub bind_target: Option<BindTargetDeclaration>,
}

impl InputFieldDeclaration {
    /// The first argument of a type.
    pub fn argument(&self, argument_type: InputFieldArgumentType) -> Option<&InputFieldArgument> {
        self.arguments
            .iter()
            .find(|a| a.argument_type() == argument_type)
    }

    pub fn arguments_of(
        &self,
        argument_type: InputFieldArgumentType,
    ) -> impl Iterator<Item = &InputFieldArgument> {
        self.arguments
            .iter()
            .filter(move |a| a.argument_type() == argument_type)
    }
}

/// An input field as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnvalidatedInputField {
    pub field_type: ResultNode,
    pub arguments: Vec<UnvalidatedFieldArgument>,
    pub bind_target: Option<UnvalidatedBindTarget>,
}

/// Parse `INPUT[...]` text without validating it.
pub fn parse_unvalidated(text: &str, errors: &mut ErrorCollection) -> Option<UnvalidatedInputField> {
    let mut cursor = Cursor::new(text);
    cursor.skip_whitespace();
    let start = cursor.position();
    if !cursor.eat_str("INPUT[") {
        errors.add(BindError::parse(
            "expected input field declaration starting with 'INPUT['",
            ParsingRange::point(start),
        ));
        return None;
    }

    cursor.skip_whitespace();
    let Some(field_type) = cursor.ident() else {
        errors.add(BindError::parse(
            "expected input field type",
            ParsingRange::point(cursor.position()),
        ));
        return None;
    };

    cursor.skip_whitespace();
    let arguments = if cursor.at('(') {
        argument_list(&mut cursor, errors)
    } else {
        Vec::new()
    };

    cursor.skip_whitespace();
    let target = if cursor.eat(':') {
        bind_target(&mut cursor, errors)
    } else {
        None
    };

    cursor.skip_whitespace();
    if !cursor.eat(']') {
        let rest = cursor.take_rest();
        errors.add(BindError::parse(
            format!("expected ']' to close input field, found '{}'", rest.value),
            rest.range.unwrap_or_else(|| ParsingRange::point(cursor.position())),
        ));
        return None;
    }
    cursor.skip_whitespace();
    if !cursor.is_eof() {
        let rest = cursor.take_rest();
        errors.add(BindError::parse(
            format!("unexpected input '{}' after input field", rest.value),
            rest.range.unwrap_or_else(|| ParsingRange::point(cursor.position())),
        ));
    }

    Some(UnvalidatedInputField {
        field_type,
        arguments,
        bind_target: target,
    })
}

/// Parse and validate an input field declaration.
pub fn parse_input_field(
    parser: &BindTargetParser,
    text: &str,
    file_path: &str,
    scope: Option<&BindTargetScope>,
) -> DeclarationResult<InputFieldDeclaration> {
    let mut errors = ErrorCollection::new("input field");
    let declaration = parse_unvalidated(text, &mut errors)
        .map(|unvalidated| validate(parser, text, &unvalidated, file_path, scope, &mut errors));
    finish(declaration, errors)
}

fn validate(
    parser: &BindTargetParser,
    text: &str,
    unvalidated: &UnvalidatedInputField,
    file_path: &str,
    scope: Option<&BindTargetScope>,
    errors: &mut ErrorCollection,
) -> InputFieldDeclaration {
    let field_type = match InputFieldType::from_identifier(&unvalidated.field_type.value) {
        Some(field_type) => field_type,
        None => {
            errors.add(BindError::validation(
                ErrorLevel::Error,
                format!(
                    "invalid input field type '{}'",
                    unvalidated.field_type.value
                ),
                unvalidated.field_type.range,
            ));
            InputFieldType::Invalid
        }
    };

    let arguments = if field_type == InputFieldType::Invalid {
        Vec::new()
    } else {
        validate_arguments(field_type, &unvalidated.arguments, errors)
    };

    let bind_target = unvalidated
        .bind_target
        .as_ref()
        .and_then(|target| parser.validate(target, file_path, scope, errors));

    InputFieldDeclaration {
        declaration: text.to_string(),
        field_type,
        arguments,
        bind_target,
    }
}

fn validate_arguments(
    field_type: InputFieldType,
    unvalidated: &[UnvalidatedFieldArgument],
    errors: &mut ErrorCollection,
) -> Vec<InputFieldArgument> {
    let mut arguments: Vec<InputFieldArgument> = Vec::new();

    for argument in unvalidated {
        let name = &argument.name;
        let Some(argument_type) = InputFieldArgumentType::from_identifier(&name.value) else {
            errors.add(BindError::validation(
                ErrorLevel::Warning,
                format!("unknown input field argument '{}'", name.value),
                name.range,
            ));
            continue;
        };

        if !argument_type.is_allowed(field_type) {
            errors.add(BindError::validation(
                ErrorLevel::Warning,
                format!(
                    "argument '{}' does not apply to '{}' input fields",
                    argument_type, field_type
                ),
                name.range,
            ));
            continue;
        }

        if !argument_type.is_repeatable()
            && arguments.iter().any(|a| a.argument_type() == argument_type)
        {
            errors.add(BindError::validation(
                ErrorLevel::Error,
                format!("argument '{}' may only be given once", argument_type),
                name.range,
            ));
            continue;
        }

        let (min, max) = argument_type.arity();
        let count = argument.values.len();
        if count < min || count > max {
            errors.add(BindError::validation(
                ErrorLevel::Error,
                format!(
                    "argument '{}' takes {} value(s), found {}",
                    argument_type,
                    if min == max { min.to_string() } else { format!("{min} to {max}") },
                    count
                ),
                name.range,
            ));
            continue;
        }

        if let Some(parsed) = parse_value(argument_type, argument, errors) {
            arguments.push(parsed);
        }
    }

    let bound = |t: InputFieldArgumentType| {
        arguments.iter().find_map(|a| match (a, t) {
            (InputFieldArgument::MinValue(v), InputFieldArgumentType::MinValue)
            | (InputFieldArgument::MaxValue(v), InputFieldArgumentType::MaxValue) => Some(*v),
            _ => None,
        })
    };
    if let (Some(min), Some(max)) = (
        bound(InputFieldArgumentType::MinValue),
        bound(InputFieldArgumentType::MaxValue),
    ) {
        if min >= max {
            errors.add(BindError::validation(
                ErrorLevel::Error,
                format!("minValue ({min}) must be less than maxValue ({max})"),
                None,
            ));
        }
    }

    arguments
}

fn parse_value(
    argument_type: InputFieldArgumentType,
    argument: &UnvalidatedFieldArgument,
    errors: &mut ErrorCollection,
) -> Option<InputFieldArgument> {
    let first = argument.values.first();
    let text = first.map(|v| v.value.as_str()).unwrap_or("");

    let number = |errors: &mut ErrorCollection| -> Option<f64> {
        match text.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => Some(n),
            _ => {
                errors.add(BindError::validation(
                    ErrorLevel::Error,
                    format!("value '{}' of argument '{}' is not a number", text, argument_type),
                    first.and_then(|v| v.range),
                ));
                None
            }
        }
    };
    let flag = || first.map_or(true, |v| v.value != "false");

    let parsed = match argument_type {
        InputFieldArgumentType::Class => InputFieldArgument::Class(text.to_string()),
        InputFieldArgumentType::AddLabels => InputFieldArgument::AddLabels(flag()),
        InputFieldArgumentType::Showcase => InputFieldArgument::Showcase(flag()),
        InputFieldArgumentType::MinValue => InputFieldArgument::MinValue(number(errors)?),
        InputFieldArgumentType::MaxValue => InputFieldArgument::MaxValue(number(errors)?),
        InputFieldArgumentType::StepSize => InputFieldArgument::StepSize(number(errors)?),
        InputFieldArgumentType::Limit => {
            let n = number(errors)?;
            if n < 0.0 || n.fract() != 0.0 {
                errors.add(BindError::validation(
                    ErrorLevel::Error,
                    format!("limit must be a non-negative whole number, found '{text}'"),
                    first.and_then(|v| v.range),
                ));
                return None;
            }
            InputFieldArgument::Limit(n as u64)
        }
        InputFieldArgumentType::Option => {
            let value = parse_literal(text);
            let name = argument
                .values
                .get(1)
                .map(|v| v.value.clone())
                .unwrap_or_else(|| text.to_string());
            InputFieldArgument::Option { value, name }
        }
        InputFieldArgumentType::Title => InputFieldArgument::Title(text.to_string()),
        InputFieldArgumentType::Placeholder => InputFieldArgument::Placeholder(text.to_string()),
        InputFieldArgumentType::DefaultValue => InputFieldArgument::DefaultValue(parse_literal(text)),
        InputFieldArgumentType::OffValue => InputFieldArgument::OffValue(parse_literal(text)),
        InputFieldArgumentType::OnValue => InputFieldArgument::OnValue(parse_literal(text)),
    };
    Some(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::StorageType;
    use serde_json::json;

    fn parse(text: &str) -> DeclarationResult<InputFieldDeclaration> {
        parse_input_field(&BindTargetParser::default(), text, "a.md", None)
    }

    mod grammar {
        use super::*;

        #[test]
        fn type_only() {
            let field = parse("INPUT[toggle]").unwrap().value;
            assert_eq!(field.field_type, InputFieldType::Toggle);
            assert!(field.bind_target.is_none());
        }

        #[test]
        fn with_target() {
            let field = parse("INPUT[text:memory^scratch#notes[0]]").unwrap().value;
            let target = field.bind_target.unwrap();
            assert_eq!(target.storage_type, StorageType::Memory);
            assert_eq!(target.to_string(), "memory^scratch#notes[0]");
        }

        #[test]
        fn with_arguments() {
            let field = parse("INPUT[slider(minValue(0), maxValue(10), addLabels):rating]")
                .unwrap()
                .value;
            assert_eq!(
                field.argument(InputFieldArgumentType::MaxValue),
                Some(&InputFieldArgument::MaxValue(10.0))
            );
            assert_eq!(
                field.argument(InputFieldArgumentType::AddLabels),
                Some(&InputFieldArgument::AddLabels(true))
            );
            assert_eq!(field.bind_target.unwrap().to_string(), "frontmatter^a.md#rating");
        }

        #[test]
        fn options() {
            let field = parse("INPUT[select(option(1, one), option(two)):choice]")
                .unwrap()
                .value;
            let options: Vec<_> = field.arguments_of(InputFieldArgumentType::Option).collect();
            assert_eq!(
                options[0],
                &InputFieldArgument::Option {
                    value: json!(1),
                    name: "one".into()
                }
            );
            assert_eq!(options.len(), 2);
        }

        #[test]
        fn missing_prefix() {
            assert!(parse("VIEW[x]").is_err());
        }

        #[test]
        fn unclosed() {
            assert!(parse("INPUT[text:title").is_err());
        }
    }

    mod validation {
        use super::*;

        #[test]
        fn unknown_type_is_error() {
            let errors = parse("INPUT[dial:x]").unwrap_err();
            let error = errors.iter().next().unwrap();
            assert_eq!(error.range.unwrap().slice("INPUT[dial:x]"), "dial");
        }

        #[test]
        fn unknown_argument_is_warning() {
            let result = parse("INPUT[text(color(red)):x]").unwrap();
            assert!(result.diagnostics.has_warnings());
            assert!(result.value.arguments.is_empty());
        }

        #[test]
        fn inapplicable_argument_is_warning() {
            let result = parse("INPUT[toggle(minValue(1)):x]").unwrap();
            assert!(result.diagnostics.has_warnings());
            assert!(result.value.arguments.is_empty());
        }

        #[test]
        fn bad_number_is_error() {
            assert!(parse("INPUT[slider(minValue(low)):x]").unwrap_err().has_errors());
        }

        #[test]
        fn duplicate_argument_is_error() {
            assert!(parse("INPUT[text(placeholder(a), placeholder(b)):x]").is_err());
        }

        #[test]
        fn repeatable_class() {
            let field = parse("INPUT[text(class(a), class(b)):x]").unwrap().value;
            assert_eq!(field.arguments.len(), 2);
        }

        #[test]
        fn min_not_below_max() {
            assert!(parse("INPUT[slider(minValue(5), maxValue(5)):x]").is_err());
        }

        #[test]
        fn target_errors_surface() {
            assert!(parse("INPUT[text:disk^a#x]").is_err());
        }
    }
}
