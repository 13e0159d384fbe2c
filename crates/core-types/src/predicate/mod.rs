//! Attribute predicates
//!
//! A small NSPredicate-style filter language. Predicates are parsed once and
//! evaluated against anything implementing [`AttributeSource`], which covers
//! both snapshot nodes and live nodes of a tree provider.

mod parser;

use std::fmt;
use std::str::FromStr;

use regex::{Regex, RegexBuilder};
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::attributes::{AttributeValue, ElementAttributes};
use crate::element_type::ElementType;

/// Predicate parse or construction failure.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PredicateError {
    #[error("invalid predicate '{expression}': {message}")]
    Syntax { expression: String, message: String },

    #[error("unknown attribute '{0}'")]
    UnknownAttribute(String),

    #[error("invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("operator {operator} expects {expected}")]
    InvalidOperand {
        operator: &'static str,
        expected: &'static str,
    },
}

/// Anything predicates can be evaluated against.
pub trait AttributeSource {
    fn attributes(&self) -> &ElementAttributes;

    /// Frame-based fallback; tree-aware sources override this.
    fn is_visible(&self) -> bool {
        let attrs = self.attributes();
        !attrs.frame.is_empty() && !attrs.visible_frame().is_empty()
    }

    fn is_accessible(&self) -> bool {
        self.attributes().accessible
    }
}

impl AttributeSource for ElementAttributes {
    fn attributes(&self) -> &ElementAttributes {
        self
    }
}

/// Attribute a comparison reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute {
    Identifier,
    Name,
    Label,
    Value,
    PlaceholderValue,
    ElementType,
    Enabled,
    Selected,
    Visible,
    Accessible,
    X,
    Y,
    Width,
    Height,
}

impl Attribute {
    pub fn from_key(key: &str) -> Result<Self, PredicateError> {
        let attribute = match key {
            "identifier" => Attribute::Identifier,
            "name" | "wdName" => Attribute::Name,
            "label" | "wdLabel" => Attribute::Label,
            "value" | "wdValue" => Attribute::Value,
            "placeholderValue" => Attribute::PlaceholderValue,
            "type" | "elementType" | "wdType" => Attribute::ElementType,
            "enabled" | "isEnabled" => Attribute::Enabled,
            "selected" | "isSelected" => Attribute::Selected,
            "visible" | "isVisible" => Attribute::Visible,
            "accessible" | "isAccessible" => Attribute::Accessible,
            "rect.x" | "x" => Attribute::X,
            "rect.y" | "y" => Attribute::Y,
            "rect.width" | "width" => Attribute::Width,
            "rect.height" | "height" => Attribute::Height,
            other => return Err(PredicateError::UnknownAttribute(other.to_string())),
        };
        Ok(attribute)
    }

    pub fn key(self) -> &'static str {
        match self {
            Attribute::Identifier => "identifier",
            Attribute::Name => "name",
            Attribute::Label => "label",
            Attribute::Value => "value",
            Attribute::PlaceholderValue => "placeholderValue",
            Attribute::ElementType => "elementType",
            Attribute::Enabled => "enabled",
            Attribute::Selected => "selected",
            Attribute::Visible => "visible",
            Attribute::Accessible => "accessible",
            Attribute::X => "rect.x",
            Attribute::Y => "rect.y",
            Attribute::Width => "rect.width",
            Attribute::Height => "rect.height",
        }
    }

    fn read<S: AttributeSource + ?Sized>(self, source: &S) -> Literal {
        let attrs = source.attributes();
        match self {
            Attribute::Identifier => Literal::String(attrs.identifier.clone()),
            Attribute::Name => attrs
                .derived_name()
                .map(|name| Literal::String(name.to_string()))
                .unwrap_or(Literal::Null),
            Attribute::Label => Literal::String(attrs.derived_label().to_string()),
            Attribute::Value => match attrs.derived_value() {
                Some(AttributeValue::Text(text)) => Literal::String(text),
                Some(AttributeValue::Bool(flag)) => Literal::Bool(flag),
                Some(AttributeValue::Number(number)) => Literal::Number(number),
                None => Literal::Null,
            },
            Attribute::PlaceholderValue => attrs
                .placeholder_value
                .clone()
                .map(Literal::String)
                .unwrap_or(Literal::Null),
            Attribute::ElementType => Literal::Number(f64::from(attrs.element_type.code())),
            Attribute::Enabled => Literal::Bool(attrs.enabled),
            Attribute::Selected => Literal::Bool(attrs.selected),
            Attribute::Visible => Literal::Bool(source.is_visible()),
            Attribute::Accessible => Literal::Bool(source.is_accessible()),
            Attribute::X => Literal::Number(attrs.frame.x),
            Attribute::Y => Literal::Number(attrs.frame.y),
            Attribute::Width => Literal::Number(attrs.frame.width),
            Attribute::Height => Literal::Number(attrs.frame.height),
        }
    }
}

/// Right-hand side of a comparison, and the value an attribute reads as.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Number(f64),
    Bool(bool),
    Null,
    List(Vec<Literal>),
}

impl Literal {
    fn as_number(&self) -> Option<f64> {
        match self {
            Literal::Number(number) => Some(*number),
            Literal::Bool(flag) => Some(f64::from(u8::from(*flag))),
            Literal::String(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    fn as_bool(&self) -> Option<bool> {
        match self {
            Literal::Bool(flag) => Some(*flag),
            Literal::Number(number) => Some(*number != 0.0),
            Literal::String(text) => match text.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => Some(true),
                "0" | "false" | "no" | "" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Text view used by string operators. Booleans read as `1`/`0`.
    fn as_text(&self) -> Option<String> {
        match self {
            Literal::String(text) => Some(text.clone()),
            Literal::Number(number) => Some(AttributeValue::Number(*number).to_string()),
            Literal::Bool(flag) => Some(AttributeValue::Bool(*flag).to_string()),
            _ => None,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::String(text) => {
                write!(f, "\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
            }
            Literal::Number(number) => write!(f, "{}", AttributeValue::Number(*number)),
            Literal::Bool(true) => f.write_str("TRUE"),
            Literal::Bool(false) => f.write_str("FALSE"),
            Literal::Null => f.write_str("NIL"),
            Literal::List(items) => {
                f.write_str("{")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("}")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOperator {
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    BeginsWith,
    Contains,
    EndsWith,
    Like,
    Matches,
    In,
}

impl ComparisonOperator {
    pub fn from_token(token: &str) -> Option<Self> {
        let op = match token.to_ascii_uppercase().as_str() {
            "==" | "=" => ComparisonOperator::Equal,
            "!=" | "<>" => ComparisonOperator::NotEqual,
            "<" => ComparisonOperator::Less,
            "<=" | "=<" => ComparisonOperator::LessOrEqual,
            ">" => ComparisonOperator::Greater,
            ">=" | "=>" => ComparisonOperator::GreaterOrEqual,
            "BEGINSWITH" => ComparisonOperator::BeginsWith,
            "CONTAINS" => ComparisonOperator::Contains,
            "ENDSWITH" => ComparisonOperator::EndsWith,
            "LIKE" => ComparisonOperator::Like,
            "MATCHES" => ComparisonOperator::Matches,
            "IN" => ComparisonOperator::In,
            _ => return None,
        };
        Some(op)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            ComparisonOperator::Equal => "==",
            ComparisonOperator::NotEqual => "!=",
            ComparisonOperator::Less => "<",
            ComparisonOperator::LessOrEqual => "<=",
            ComparisonOperator::Greater => ">",
            ComparisonOperator::GreaterOrEqual => ">=",
            ComparisonOperator::BeginsWith => "BEGINSWITH",
            ComparisonOperator::Contains => "CONTAINS",
            ComparisonOperator::EndsWith => "ENDSWITH",
            ComparisonOperator::Like => "LIKE",
            ComparisonOperator::Matches => "MATCHES",
            ComparisonOperator::In => "IN",
        }
    }
}

/// `[c]` / `[d]` modifiers. Diacritic folding is accepted but not applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompareOptions {
    pub case_insensitive: bool,
    pub diacritic_insensitive: bool,
}

/// Operators offered for string attribute lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringComparison {
    Equals,
    NotEquals,
    BeginsWith,
    Contains,
    EndsWith,
    Like,
    Matches,
}

impl StringComparison {
    pub fn operator(self) -> ComparisonOperator {
        match self {
            StringComparison::Equals => ComparisonOperator::Equal,
            StringComparison::NotEquals => ComparisonOperator::NotEqual,
            StringComparison::BeginsWith => ComparisonOperator::BeginsWith,
            StringComparison::Contains => ComparisonOperator::Contains,
            StringComparison::EndsWith => ComparisonOperator::EndsWith,
            StringComparison::Like => ComparisonOperator::Like,
            StringComparison::Matches => ComparisonOperator::Matches,
        }
    }
}

/// `attribute op literal`
#[derive(Debug, Clone)]
pub struct Comparison {
    pub attribute: Attribute,
    pub operator: ComparisonOperator,
    pub options: CompareOptions,
    pub literal: Literal,
    /// Compiled pattern for `LIKE` / `MATCHES`.
    pattern: Option<Regex>,
}

impl PartialEq for Comparison {
    fn eq(&self, other: &Self) -> bool {
        self.attribute == other.attribute
            && self.operator == other.operator
            && self.options == other.options
            && self.literal == other.literal
    }
}

impl Comparison {
    pub fn new(
        attribute: Attribute,
        operator: ComparisonOperator,
        options: CompareOptions,
        literal: Literal,
    ) -> Result<Self, PredicateError> {
        let pattern = match operator {
            ComparisonOperator::Like | ComparisonOperator::Matches => {
                let Literal::String(source) = &literal else {
                    return Err(PredicateError::InvalidOperand {
                        operator: operator.symbol(),
                        expected: "a string pattern",
                    });
                };
                let regex_source = if operator == ComparisonOperator::Like {
                    wildcard_to_regex(source)
                } else {
                    format!("^(?:{})$", source)
                };
                let regex = RegexBuilder::new(&regex_source)
                    .case_insensitive(options.case_insensitive)
                    .dot_matches_new_line(true)
                    .build()
                    .map_err(|err| PredicateError::InvalidPattern {
                        pattern: source.clone(),
                        message: err.to_string(),
                    })?;
                Some(regex)
            }
            ComparisonOperator::In if matches!(literal, Literal::Null) => {
                return Err(PredicateError::InvalidOperand {
                    operator: operator.symbol(),
                    expected: "a list or string",
                });
            }
            _ => None,
        };
        Ok(Self {
            attribute,
            operator,
            options,
            literal,
            pattern,
        })
    }

    pub fn evaluate<S: AttributeSource + ?Sized>(&self, source: &S) -> bool {
        let actual = self.attribute.read(source);
        let expected = self.normalized_literal(&self.literal);

        match self.operator {
            ComparisonOperator::Equal => self.equals(&actual, &expected),
            ComparisonOperator::NotEqual => !self.equals(&actual, &expected),
            ComparisonOperator::Less
            | ComparisonOperator::LessOrEqual
            | ComparisonOperator::Greater
            | ComparisonOperator::GreaterOrEqual => self.ordered(&actual, &expected),
            ComparisonOperator::BeginsWith
            | ComparisonOperator::Contains
            | ComparisonOperator::EndsWith => self.substring(&actual, &expected),
            ComparisonOperator::Like | ComparisonOperator::Matches => {
                match (self.display_text(&actual), &self.pattern) {
                    (Some(text), Some(regex)) => regex.is_match(&text),
                    _ => false,
                }
            }
            ComparisonOperator::In => match &expected {
                Literal::List(items) => items
                    .iter()
                    .any(|item| self.equals(&actual, &self.normalized_literal(item))),
                other => self.substring_in(&actual, other),
            },
        }
    }

    /// Type comparisons accept names or codes on the right-hand side.
    fn normalized_literal(&self, literal: &Literal) -> Literal {
        if self.attribute != Attribute::ElementType {
            return literal.clone();
        }
        match literal {
            Literal::String(name) => match ElementType::lookup(name) {
                Ok(element_type) => Literal::Number(f64::from(element_type.code())),
                Err(_) => literal.clone(),
            },
            other => other.clone(),
        }
    }

    /// Attribute text for string operators; types read as their canonical name.
    fn display_text(&self, actual: &Literal) -> Option<String> {
        if self.attribute == Attribute::ElementType {
            if let Some(code) = actual.as_number() {
                return Some(ElementType::from_code(code as u16).name().to_string());
            }
        }
        actual.as_text()
    }

    fn fold(&self, text: String) -> String {
        if self.options.case_insensitive {
            text.to_lowercase()
        } else {
            text
        }
    }

    fn equals(&self, actual: &Literal, expected: &Literal) -> bool {
        match (actual, expected) {
            (Literal::Null, Literal::Null) => true,
            (Literal::Null, _) | (_, Literal::Null) => false,
            (Literal::String(a), Literal::String(b)) => {
                self.fold(a.clone()) == self.fold(b.clone())
            }
            (Literal::Bool(a), other) | (other, Literal::Bool(a)) => other.as_bool() == Some(*a),
            (Literal::Number(a), other) | (other, Literal::Number(a)) => {
                other.as_number() == Some(*a)
            }
            (Literal::List(a), Literal::List(b)) => a == b,
            _ => false,
        }
    }

    fn ordered(&self, actual: &Literal, expected: &Literal) -> bool {
        let ordering = match (actual.as_number(), expected.as_number()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => match (actual, expected) {
                (Literal::String(a), Literal::String(b)) => {
                    Some(self.fold(a.clone()).cmp(&self.fold(b.clone())))
                }
                _ => None,
            },
        };
        let Some(ordering) = ordering else {
            return false;
        };
        match self.operator {
            ComparisonOperator::Less => ordering.is_lt(),
            ComparisonOperator::LessOrEqual => ordering.is_le(),
            ComparisonOperator::Greater => ordering.is_gt(),
            ComparisonOperator::GreaterOrEqual => ordering.is_ge(),
            _ => false,
        }
    }

    fn substring(&self, actual: &Literal, expected: &Literal) -> bool {
        let (Some(haystack), Some(needle)) = (self.display_text(actual), expected.as_text()) else {
            return false;
        };
        let haystack = self.fold(haystack);
        let needle = self.fold(needle);
        match self.operator {
            ComparisonOperator::BeginsWith => haystack.starts_with(&needle),
            ComparisonOperator::Contains => haystack.contains(&needle),
            ComparisonOperator::EndsWith => haystack.ends_with(&needle),
            _ => false,
        }
    }

    /// `attr IN "text"` reads as substring containment.
    fn substring_in(&self, actual: &Literal, container: &Literal) -> bool {
        match (self.display_text(actual), container.as_text()) {
            (Some(needle), Some(haystack)) => self.fold(haystack).contains(&self.fold(needle)),
            _ => false,
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.attribute.key(), self.operator.symbol())?;
        if self.options.case_insensitive || self.options.diacritic_insensitive {
            f.write_str("[")?;
            if self.options.case_insensitive {
                f.write_str("c")?;
            }
            if self.options.diacritic_insensitive {
                f.write_str("d")?;
            }
            f.write_str("]")?;
        }
        write!(f, " {}", self.literal)
    }
}

fn wildcard_to_regex(pattern: &str) -> String {
    let mut out = String::from("^");
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '\\' => {
                if let Some(escaped) = chars.next() {
                    out.push_str(&regex::escape(&escaped.to_string()));
                }
            }
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out.push('$');
    out
}

/// Parsed predicate expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Constant(bool),
    Comparison(Comparison),
    Not(Box<Predicate>),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

impl Predicate {
    pub fn parse(expression: &str) -> Result<Self, PredicateError> {
        parser::parse(expression)
    }

    /// `TRUEPREDICATE`
    pub fn always() -> Self {
        Predicate::Constant(true)
    }

    /// `attribute == "value"` without going through the parser.
    pub fn equals(key: &str, value: impl Into<String>) -> Result<Self, PredicateError> {
        Self::attribute_matching(key, StringComparison::Equals, value)
    }

    /// Build a single string comparison.
    pub fn attribute_matching(
        key: &str,
        comparison: StringComparison,
        value: impl Into<String>,
    ) -> Result<Self, PredicateError> {
        let attribute = Attribute::from_key(key)?;
        Comparison::new(
            attribute,
            comparison.operator(),
            CompareOptions::default(),
            Literal::String(value.into()),
        )
        .map(Predicate::Comparison)
    }

    pub fn and(self, other: Predicate) -> Self {
        match self {
            Predicate::And(mut terms) => {
                terms.push(other);
                Predicate::And(terms)
            }
            first => Predicate::And(vec![first, other]),
        }
    }

    pub fn or(self, other: Predicate) -> Self {
        match self {
            Predicate::Or(mut terms) => {
                terms.push(other);
                Predicate::Or(terms)
            }
            first => Predicate::Or(vec![first, other]),
        }
    }

    pub fn negate(self) -> Self {
        Predicate::Not(Box::new(self))
    }

    pub fn evaluate<S: AttributeSource + ?Sized>(&self, source: &S) -> bool {
        match self {
            Predicate::Constant(value) => *value,
            Predicate::Comparison(comparison) => comparison.evaluate(source),
            Predicate::Not(inner) => !inner.evaluate(source),
            Predicate::And(terms) => terms.iter().all(|term| term.evaluate(source)),
            Predicate::Or(terms) => terms.iter().any(|term| term.evaluate(source)),
        }
    }
}

impl FromStr for Predicate {
    type Err = PredicateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Predicate::parse(s)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Constant(true) => f.write_str("TRUEPREDICATE"),
            Predicate::Constant(false) => f.write_str("FALSEPREDICATE"),
            Predicate::Comparison(comparison) => write!(f, "{}", comparison),
            Predicate::Not(inner) => write!(f, "NOT ({})", inner),
            Predicate::And(terms) => write_joined(f, terms, " AND "),
            Predicate::Or(terms) => write_joined(f, terms, " OR "),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, terms: &[Predicate], separator: &str) -> fmt::Result {
    for (i, term) in terms.iter().enumerate() {
        if i > 0 {
            f.write_str(separator)?;
        }
        match term {
            Predicate::And(_) | Predicate::Or(_) => write!(f, "({})", term)?,
            _ => write!(f, "{}", term)?,
        }
    }
    Ok(())
}

impl Serialize for Predicate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;

    fn button(label: &str) -> ElementAttributes {
        ElementAttributes::new(ElementType::BUTTON)
            .with_label(label)
            .with_frame(Rect::new(0.0, 0.0, 100.0, 44.0))
    }

    fn eval(expression: &str, attrs: &ElementAttributes) -> bool {
        Predicate::parse(expression).unwrap().evaluate(attrs)
    }

    #[test]
    fn test_string_operators() {
        let attrs = button("Sign In");
        assert!(eval("label == 'Sign In'", &attrs));
        assert!(eval("label ==[c] 'sign in'", &attrs));
        assert!(!eval("label == 'sign in'", &attrs));
        assert!(eval("label BEGINSWITH 'Sign'", &attrs));
        assert!(eval("label CONTAINS[c] 'IN'", &attrs));
        assert!(eval("label ENDSWITH 'In'", &attrs));
        assert!(eval("label LIKE 'S*n ?n'", &attrs));
        assert!(eval("label MATCHES 'Sign\\\\s+In'", &attrs));
        assert!(eval("label IN {'Cancel', 'Sign In'}", &attrs));
    }

    #[test]
    fn test_type_comparison_accepts_names_and_codes() {
        let attrs = button("OK");
        assert!(eval("type == 'XCUIElementTypeButton'", &attrs));
        assert!(eval("elementType == 9", &attrs));
        assert!(eval("type == 'Button'", &attrs));
        assert!(!eval("type == 'XCUIElementTypeCell'", &attrs));
        assert!(eval("type BEGINSWITH 'XCUIElementTypeBut'", &attrs));
    }

    #[test]
    fn test_boolean_and_numeric_coercion() {
        let attrs = button("OK");
        assert!(eval("enabled == YES", &attrs));
        assert!(eval("enabled == 1", &attrs));
        assert!(eval("value == 0", &attrs));
        assert!(eval("rect.width > 50 AND height <= 44", &attrs));
        assert!(eval("visible == TRUE", &attrs));
        assert!(eval("NOT selected == TRUE", &attrs));
    }

    #[test]
    fn test_null_handling() {
        let attrs = ElementAttributes::new(ElementType::OTHER);
        assert!(eval("name == NIL", &attrs));
        assert!(!eval("name == ''", &attrs));
        assert!(!eval("name CONTAINS 'x'", &attrs));
    }

    #[test]
    fn test_invalid_patterns_are_errors() {
        assert!(matches!(
            Predicate::parse("label MATCHES '('"),
            Err(PredicateError::InvalidPattern { .. })
        ));
        assert!(matches!(
            Predicate::parse("label LIKE 3"),
            Err(PredicateError::InvalidOperand { .. })
        ));
        assert!(matches!(
            Predicate::parse("colour == 'red'"),
            Err(PredicateError::UnknownAttribute(_))
        ));
    }

    #[test]
    fn test_display_reparses_to_same_predicate() {
        let source = "label ==[c] \"a\\\"b\" AND (value == 1 OR NOT identifier BEGINSWITH \"x\")";
        let parsed = Predicate::parse(source).unwrap();
        let reparsed = Predicate::parse(&parsed.to_string()).unwrap();
        assert_eq!(parsed, reparsed);
    }

    #[test]
    fn test_attribute_matching_builder() {
        let predicate =
            Predicate::attribute_matching("label", StringComparison::BeginsWith, "Sig").unwrap();
        assert!(predicate.evaluate(&button("Sign In")));
        assert_eq!(predicate.to_string(), "label BEGINSWITH \"Sig\"");
    }
}
