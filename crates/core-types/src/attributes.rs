//! Captured element attributes and the derived values clients see

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::element_type::ElementType;
use crate::geometry::{format_scalar, Rect};

/// Raw attribute value as reported by the accessibility layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl AttributeValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Numeric view, parsing text the lenient way (`"0.5"` -> 0.5, junk -> 0).
    pub fn as_number(&self) -> f64 {
        match self {
            AttributeValue::Bool(flag) => f64::from(u8::from(*flag)),
            AttributeValue::Number(number) => *number,
            AttributeValue::Text(text) => text.trim().parse().unwrap_or(0.0),
        }
    }

    pub fn is_empty_text(&self) -> bool {
        matches!(self, AttributeValue::Text(text) if text.is_empty())
    }
}

/// Booleans render as `1`/`0`.
impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Bool(true) => f.write_str("1"),
            AttributeValue::Bool(false) => f.write_str("0"),
            AttributeValue::Number(number) => f.write_str(&format_scalar(*number)),
            AttributeValue::Text(text) => f.write_str(text),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

/// Attributes of one element at capture time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ElementAttributes {
    #[serde(rename = "type")]
    pub element_type: ElementType,
    pub identifier: String,
    pub label: String,
    pub value: Option<AttributeValue>,
    pub placeholder_value: Option<String>,
    pub enabled: bool,
    pub selected: bool,
    pub frame: Rect,
    /// Portion of `frame` on screen; `None` means the whole frame.
    pub visible_frame: Option<Rect>,
    /// Raw accessibility flag of this element alone.
    pub accessible: bool,
}

impl Default for ElementAttributes {
    fn default() -> Self {
        Self {
            element_type: ElementType::OTHER,
            identifier: String::new(),
            label: String::new(),
            value: None,
            placeholder_value: None,
            enabled: true,
            selected: false,
            frame: Rect::default(),
            visible_frame: None,
            accessible: false,
        }
    }
}

impl ElementAttributes {
    pub fn new(element_type: ElementType) -> Self {
        Self {
            element_type,
            ..Self::default()
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_value(mut self, value: impl Into<AttributeValue>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_frame(mut self, frame: Rect) -> Self {
        self.frame = frame;
        self
    }

    pub fn visible_frame(&self) -> Rect {
        self.visible_frame.unwrap_or(self.frame)
    }

    /// Value as exposed to clients, with per-type fallbacks.
    pub fn derived_value(&self) -> Option<AttributeValue> {
        let value = self.value.clone();
        let element_type = self.element_type;

        if element_type == ElementType::STATIC_TEXT {
            return value.or_else(|| Some(AttributeValue::Text(self.label.clone())));
        }
        if element_type == ElementType::BUTTON {
            return match value {
                Some(v) if !v.is_empty_text() => Some(v),
                _ => Some(AttributeValue::Bool(self.selected)),
            };
        }
        if element_type == ElementType::SWITCH {
            let on = match &value {
                Some(AttributeValue::Bool(flag)) => *flag,
                Some(other) => other.as_number() > 0.0,
                None => false,
            };
            return Some(AttributeValue::Bool(on));
        }
        if element_type == ElementType::TEXT_FIELD
            || element_type == ElementType::TEXT_VIEW
            || element_type == ElementType::SECURE_TEXT_FIELD
        {
            return match value {
                Some(v) if !v.is_empty_text() => Some(v),
                _ => self
                    .placeholder_value
                    .clone()
                    .map(AttributeValue::Text)
                    .or(value),
            };
        }
        value
    }

    /// First non-empty of identifier and label.
    pub fn derived_name(&self) -> Option<&str> {
        [self.identifier.as_str(), self.label.as_str()]
            .into_iter()
            .find(|candidate| !candidate.is_empty())
    }

    pub fn derived_label(&self) -> &str {
        &self.label
    }

    /// Derived value rendered as text, empty when absent.
    pub fn value_text(&self) -> String {
        self.derived_value()
            .map(|value| value.to_string())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_text_value_falls_back_to_label() {
        let attrs = ElementAttributes::new(ElementType::STATIC_TEXT).with_label("Hello");
        assert_eq!(attrs.derived_value(), Some(AttributeValue::Text("Hello".into())));
    }

    #[test]
    fn test_button_value_uses_selection_when_empty() {
        let mut attrs = ElementAttributes::new(ElementType::BUTTON).with_value("");
        attrs.selected = true;
        assert_eq!(attrs.derived_value(), Some(AttributeValue::Bool(true)));
        assert_eq!(attrs.value_text(), "1");

        let attrs = ElementAttributes::new(ElementType::BUTTON).with_value("on");
        assert_eq!(attrs.value_text(), "on");
    }

    #[test]
    fn test_switch_value_is_numeric_flag() {
        let on = ElementAttributes::new(ElementType::SWITCH).with_value("1");
        let off = ElementAttributes::new(ElementType::SWITCH).with_value("0");
        assert_eq!(on.value_text(), "1");
        assert_eq!(off.value_text(), "0");
        assert_eq!(ElementAttributes::new(ElementType::SWITCH).value_text(), "0");
    }

    #[test]
    fn test_text_field_placeholder() {
        let mut attrs = ElementAttributes::new(ElementType::TEXT_FIELD);
        attrs.placeholder_value = Some("Email".into());
        assert_eq!(attrs.value_text(), "Email");
        attrs.value = Some("me@example.com".into());
        assert_eq!(attrs.value_text(), "me@example.com");
    }

    #[test]
    fn test_derived_name_prefers_identifier() {
        let attrs = ElementAttributes::new(ElementType::BUTTON)
            .with_identifier("login")
            .with_label("Log in");
        assert_eq!(attrs.derived_name(), Some("login"));
        let attrs = ElementAttributes::new(ElementType::BUTTON).with_label("Log in");
        assert_eq!(attrs.derived_name(), Some("Log in"));
        assert_eq!(ElementAttributes::new(ElementType::BUTTON).derived_name(), None);
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let attrs: ElementAttributes =
            serde_json::from_str(r#"{"type": "Button", "label": "OK", "value": true}"#).unwrap();
        assert_eq!(attrs.element_type, ElementType::BUTTON);
        assert!(attrs.enabled);
        assert_eq!(attrs.value, Some(AttributeValue::Bool(true)));
    }
}
