//! parser::view_field
//!
//! View field declarations: `VIEW[template][type(arguments):writeTarget]`.
//!
//! The template is literal text with `{bindTarget}` placeholders. The
//! optional second block selects the view type (default `math`), its
//! arguments, and a target the rendered value is written to.

use std::fmt;

use super::arguments::{argument_list, UnvalidatedFieldArgument};
use super::bind_target::{bind_target, UnvalidatedBindTarget};
use super::cursor::Cursor;
use super::validator::BindTargetParser;
use super::{finish, DeclarationResult};
use crate::core::declaration::{BindTargetDeclaration, BindTargetScope};
use crate::core::errors::{BindError, ErrorCollection, ErrorLevel};
use crate::core::types::{ParsingRange, ResultNode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ViewFieldType {
    #[default]
    Math,
    Text,
    Link,
    Image,
    Invalid,
}

impl ViewFieldType {
    pub const ALL: [ViewFieldType; 4] = [
        ViewFieldType::Math,
        ViewFieldType::Text,
        ViewFieldType::Link,
        ViewFieldType::Image,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ViewFieldType::Math => "math",
            ViewFieldType::Text => "text",
            ViewFieldType::Link => "link",
            ViewFieldType::Image => "image",
            ViewFieldType::Invalid => "invalid",
        }
    }

    pub fn from_identifier(ident: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == ident)
    }
}

impl fmt::Display for ViewFieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewFieldArgument {
    Class(String),
    RenderMarkdown(bool),
    Hidden(bool),
}

impl ViewFieldArgument {
    fn name(&self) -> &'static str {
        match self {
            ViewFieldArgument::Class(_) => "class",
            ViewFieldArgument::RenderMarkdown(_) => "renderMarkdown",
            ViewFieldArgument::Hidden(_) => "hidden",
        }
    }
}

/// One piece of a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplatePart<T> {
    Text(String),
    BindTarget(T),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnvalidatedViewField {
    pub template: Vec<TemplatePart<UnvalidatedBindTarget>>,
    pub field_type: Option<ResultNode>,
    pub arguments: Vec<UnvalidatedFieldArgument>,
    pub write_target: Option<UnvalidatedBindTarget>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewFieldDeclaration {
    pub declaration: String,
    pub template: Vec<TemplatePart<BindTargetDeclaration>>,
    pub field_type: ViewFieldType,
    pub arguments: Vec<ViewFieldArgument>,
    pub write_target: Option<BindTargetDeclaration>,
}

impl ViewFieldDeclaration {
    /// Every target the template reads, in order of appearance.
    pub fn dependencies(&self) -> Vec<BindTargetDeclaration> {
        self.template
            .iter()
            .filter_map(|part| match part {
                TemplatePart::BindTarget(target) => Some(target.clone()),
                TemplatePart::Text(_) => None,
            })
            .collect()
    }

    pub fn is_hidden(&self) -> bool {
        self.arguments
            .iter()
            .any(|a| matches!(a, ViewFieldArgument::Hidden(true)))
    }
}

/// Parse `VIEW[...]` text without validating it.
pub fn parse_unvalidated(text: &str, errors: &mut ErrorCollection) -> Option<UnvalidatedViewField> {
    let mut cursor = Cursor::new(text);
    cursor.skip_whitespace();
    let start = cursor.position();
    if !cursor.eat_str("VIEW[") {
        errors.add(BindError::parse(
            "expected view field declaration starting with 'VIEW['",
            ParsingRange::point(start),
        ));
        return None;
    }

    let template = template(&mut cursor, errors)?;
    let mut field = UnvalidatedViewField {
        template,
        field_type: None,
        arguments: Vec::new(),
        write_target: None,
    };

    if cursor.eat('[') {
        cursor.skip_whitespace();
        field.field_type = cursor.ident();
        cursor.skip_whitespace();
        if cursor.at('(') {
            field.arguments = argument_list(&mut cursor, errors);
        }
        cursor.skip_whitespace();
        if cursor.eat(':') {
            field.write_target = bind_target(&mut cursor, errors);
        }
        cursor.skip_whitespace();
        if !cursor.eat(']') {
            errors.add(BindError::parse(
                "expected ']' to close view field options",
                ParsingRange::point(cursor.position()),
            ));
            return None;
        }
    }

    cursor.skip_whitespace();
    if !cursor.is_eof() {
        let rest = cursor.take_rest();
        errors.add(BindError::parse(
            format!("unexpected input '{}' after view field", rest.value),
            rest.range.unwrap_or_else(|| ParsingRange::point(cursor.position())),
        ));
    }

    Some(field)
}

/// Template text up to and including the closing `]`.
fn template(
    cursor: &mut Cursor<'_>,
    errors: &mut ErrorCollection,
) -> Option<Vec<TemplatePart<UnvalidatedBindTarget>>> {
    let mut parts = Vec::new();
    loop {
        let text = cursor.take_while(|c| !matches!(c, '{' | '}' | '[' | ']'));
        if !text.value.is_empty() {
            parts.push(TemplatePart::Text(text.value));
        }

        match cursor.peek() {
            Some(']') => {
                cursor.bump();
                return Some(parts);
            }
            Some('{') => {
                let open = cursor.position();
                cursor.bump();
                cursor.skip_whitespace();
                let target = bind_target(cursor, errors);
                cursor.skip_whitespace();
                if !cursor.eat('}') {
                    errors.add(BindError::parse(
                        "unclosed '{' in view field template",
                        cursor.range_from(open),
                    ));
                    return None;
                }
                if let Some(target) = target {
                    parts.push(TemplatePart::BindTarget(target));
                }
            }
            Some(c) => {
                let at = cursor.position();
                cursor.bump();
                errors.add(BindError::parse(
                    format!("unexpected '{c}' in view field template"),
                    cursor.range_from(at),
                ));
            }
            None => {
                errors.add(BindError::parse(
                    "expected ']' to close view field template",
                    ParsingRange::point(cursor.position()),
                ));
                return None;
            }
        }
    }
}

/// Parse and validate a view field declaration.
pub fn parse_view_field(
    parser: &BindTargetParser,
    text: &str,
    file_path: &str,
    scope: Option<&BindTargetScope>,
) -> DeclarationResult<ViewFieldDeclaration> {
    let mut errors = ErrorCollection::new("view field");
    let declaration = parse_unvalidated(text, &mut errors)
        .map(|unvalidated| validate(parser, text, &unvalidated, file_path, scope, &mut errors));
    finish(declaration, errors)
}

fn validate(
    parser: &BindTargetParser,
    text: &str,
    unvalidated: &UnvalidatedViewField,
    file_path: &str,
    scope: Option<&BindTargetScope>,
    errors: &mut ErrorCollection,
) -> ViewFieldDeclaration {
    let field_type = match &unvalidated.field_type {
        None => ViewFieldType::default(),
        Some(node) => ViewFieldType::from_identifier(&node.value).unwrap_or_else(|| {
            errors.add(BindError::validation(
                ErrorLevel::Error,
                format!("invalid view field type '{}'", node.value),
                node.range,
            ));
            ViewFieldType::Invalid
        }),
    };

    let arguments = validate_arguments(field_type, &unvalidated.arguments, errors);

    let template: Vec<_> = unvalidated
        .template
        .iter()
        .filter_map(|part| match part {
            TemplatePart::Text(text) => Some(TemplatePart::Text(text.clone())),
            TemplatePart::BindTarget(target) => parser
                .validate(target, file_path, scope, errors)
                .map(TemplatePart::BindTarget),
        })
        .collect();

    let write_target = unvalidated
        .write_target
        .as_ref()
        .and_then(|target| parser.validate(target, file_path, scope, errors));

    let declaration = ViewFieldDeclaration {
        declaration: text.to_string(),
        template,
        field_type,
        arguments,
        write_target,
    };

    if let Some(write_target) = &declaration.write_target {
        if declaration
            .dependencies()
            .iter()
            .any(|dependency| dependency.overlaps(write_target))
        {
            errors.add(BindError::validation(
                ErrorLevel::Error,
                format!(
                    "view field writes to '{}', which its own template reads",
                    write_target
                ),
                None,
            ));
        }
    }

    declaration
}

fn validate_arguments(
    field_type: ViewFieldType,
    unvalidated: &[UnvalidatedFieldArgument],
    errors: &mut ErrorCollection,
) -> Vec<ViewFieldArgument> {
    let mut arguments: Vec<ViewFieldArgument> = Vec::new();
    for argument in unvalidated {
        let name = &argument.name;
        let first = argument.values.first().map(|v| v.value.as_str());
        let flag = first.map_or(true, |v| v != "false");
        let parsed = match name.value.as_str() {
            "class" => ViewFieldArgument::Class(first.unwrap_or("").to_string()),
            "hidden" => ViewFieldArgument::Hidden(flag),
            "renderMarkdown" if field_type == ViewFieldType::Text => {
                ViewFieldArgument::RenderMarkdown(flag)
            }
            "renderMarkdown" => {
                errors.add(BindError::validation(
                    ErrorLevel::Warning,
                    format!("argument 'renderMarkdown' does not apply to '{field_type}' view fields"),
                    name.range,
                ));
                continue;
            }
            other => {
                errors.add(BindError::validation(
                    ErrorLevel::Warning,
                    format!("unknown view field argument '{other}'"),
                    name.range,
                ));
                continue;
            }
        };

        if !matches!(parsed, ViewFieldArgument::Class(_))
            && arguments.iter().any(|a| a.name() == parsed.name())
        {
            errors.add(BindError::validation(
                ErrorLevel::Error,
                format!("argument '{}' may only be given once", parsed.name()),
                name.range,
            ));
            continue;
        }
        arguments.push(parsed);
    }
    arguments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> DeclarationResult<ViewFieldDeclaration> {
        parse_view_field(&BindTargetParser::default(), text, "a.md", None)
    }

    #[test]
    fn math_template() {
        let field = parse("VIEW[{price} * {count}]").unwrap().value;
        assert_eq!(field.field_type, ViewFieldType::Math);
        assert_eq!(field.template.len(), 3);
        assert_eq!(field.template[1], TemplatePart::Text(" * ".into()));
        let deps: Vec<String> = field.dependencies().iter().map(|d| d.to_string()).collect();
        assert_eq!(
            deps,
            vec!["frontmatter^a.md#price", "frontmatter^a.md#count"]
        );
    }

    #[test]
    fn type_and_write_target() {
        let field = parse("VIEW[{a}][text(renderMarkdown, hidden):memory^x#out]")
            .unwrap()
            .value;
        assert_eq!(field.field_type, ViewFieldType::Text);
        assert!(field.is_hidden());
        assert_eq!(field.write_target.unwrap().to_string(), "memory^x#out");
    }

    #[test]
    fn nested_brackets_in_target() {
        let field = parse("VIEW[first: {tags[0]}]").unwrap().value;
        assert_eq!(field.dependencies()[0].to_string(), "frontmatter^a.md#tags[0]");
    }

    #[test]
    fn self_dependency_is_error() {
        let errors = parse("VIEW[{total} + 1][math:total]").unwrap_err();
        assert!(errors.iter().any(|e| e.message.contains("its own template")));
    }

    #[test]
    fn unknown_type_is_error() {
        assert!(parse("VIEW[{a}][chart]").is_err());
    }

    #[test]
    fn inapplicable_argument_warns() {
        let result = parse("VIEW[{a}][math(renderMarkdown)]").unwrap();
        assert!(result.diagnostics.has_warnings());
        assert!(result.value.arguments.is_empty());
    }

    #[test]
    fn unclosed_placeholder() {
        assert!(parse("VIEW[{a]").is_err());
    }
}
