//! Element type registry
//!
//! Bidirectional mapping between the small integer type code reported by the
//! accessibility layer and its canonical type name. The table is fixed and the
//! lookup maps are built once per process.

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Prefix shared by every canonical type name.
pub const TYPE_NAME_PREFIX: &str = "XCUIElementType";

const TYPE_NAMES: [&str; 81] = [
    "XCUIElementTypeAny",
    "XCUIElementTypeOther",
    "XCUIElementTypeApplication",
    "XCUIElementTypeGroup",
    "XCUIElementTypeWindow",
    "XCUIElementTypeSheet",
    "XCUIElementTypeDrawer",
    "XCUIElementTypeAlert",
    "XCUIElementTypeDialog",
    "XCUIElementTypeButton",
    "XCUIElementTypeRadioButton",
    "XCUIElementTypeRadioGroup",
    "XCUIElementTypeCheckBox",
    "XCUIElementTypeDisclosureTriangle",
    "XCUIElementTypePopUpButton",
    "XCUIElementTypeComboBox",
    "XCUIElementTypeMenuButton",
    "XCUIElementTypeToolbarButton",
    "XCUIElementTypePopover",
    "XCUIElementTypeKeyboard",
    "XCUIElementTypeKey",
    "XCUIElementTypeNavigationBar",
    "XCUIElementTypeTabBar",
    "XCUIElementTypeTabGroup",
    "XCUIElementTypeToolbar",
    "XCUIElementTypeStatusBar",
    "XCUIElementTypeTable",
    "XCUIElementTypeTableRow",
    "XCUIElementTypeTableColumn",
    "XCUIElementTypeOutline",
    "XCUIElementTypeOutlineRow",
    "XCUIElementTypeBrowser",
    "XCUIElementTypeCollectionView",
    "XCUIElementTypeSlider",
    "XCUIElementTypePageIndicator",
    "XCUIElementTypeProgressIndicator",
    "XCUIElementTypeActivityIndicator",
    "XCUIElementTypeSegmentedControl",
    "XCUIElementTypePicker",
    "XCUIElementTypePickerWheel",
    "XCUIElementTypeSwitch",
    "XCUIElementTypeToggle",
    "XCUIElementTypeLink",
    "XCUIElementTypeImage",
    "XCUIElementTypeIcon",
    "XCUIElementTypeSearchField",
    "XCUIElementTypeScrollView",
    "XCUIElementTypeScrollBar",
    "XCUIElementTypeStaticText",
    "XCUIElementTypeTextField",
    "XCUIElementTypeSecureTextField",
    "XCUIElementTypeDatePicker",
    "XCUIElementTypeTextView",
    "XCUIElementTypeMenu",
    "XCUIElementTypeMenuItem",
    "XCUIElementTypeMenuBar",
    "XCUIElementTypeMenuBarItem",
    "XCUIElementTypeMap",
    "XCUIElementTypeWebView",
    "XCUIElementTypeIncrementArrow",
    "XCUIElementTypeDecrementArrow",
    "XCUIElementTypeTimeline",
    "XCUIElementTypeRatingIndicator",
    "XCUIElementTypeValueIndicator",
    "XCUIElementTypeSplitGroup",
    "XCUIElementTypeSplitter",
    "XCUIElementTypeRelevanceIndicator",
    "XCUIElementTypeColorWell",
    "XCUIElementTypeHelpTag",
    "XCUIElementTypeMatte",
    "XCUIElementTypeDockItem",
    "XCUIElementTypeRuler",
    "XCUIElementTypeRulerMarker",
    "XCUIElementTypeGrid",
    "XCUIElementTypeLevelIndicator",
    "XCUIElementTypeCell",
    "XCUIElementTypeLayoutArea",
    "XCUIElementTypeLayoutItem",
    "XCUIElementTypeHandle",
    "XCUIElementTypeStepper",
    "XCUIElementTypeTab",
];

/// Canonical and short (prefix-less) names, both resolving to the same code.
static NAME_TO_CODE: Lazy<HashMap<&'static str, u16>> = Lazy::new(|| {
    let mut map = HashMap::with_capacity(TYPE_NAMES.len() * 2);
    for (code, name) in TYPE_NAMES.iter().enumerate() {
        let code = code as u16;
        map.insert(*name, code);
        map.insert(&name[TYPE_NAME_PREFIX.len()..], code);
    }
    map
});

/// Unknown type token.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("'{name}' is not a valid element type name")]
pub struct InvalidTypeName {
    pub name: String,
}

/// Accessibility element type, identified by its registry code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "TypeRepr", into = "String")]
pub struct ElementType(u16);

impl ElementType {
    pub const ANY: ElementType = ElementType(0);
    pub const OTHER: ElementType = ElementType(1);
    pub const APPLICATION: ElementType = ElementType(2);
    pub const WINDOW: ElementType = ElementType(4);
    pub const ALERT: ElementType = ElementType(7);
    pub const BUTTON: ElementType = ElementType(9);
    pub const NAVIGATION_BAR: ElementType = ElementType(21);
    pub const TABLE: ElementType = ElementType(26);
    pub const SWITCH: ElementType = ElementType(40);
    pub const IMAGE: ElementType = ElementType(43);
    pub const SCROLL_VIEW: ElementType = ElementType(46);
    pub const STATIC_TEXT: ElementType = ElementType(48);
    pub const TEXT_FIELD: ElementType = ElementType(49);
    pub const SECURE_TEXT_FIELD: ElementType = ElementType(50);
    pub const TEXT_VIEW: ElementType = ElementType(52);
    pub const CELL: ElementType = ElementType(75);

    /// Wrap a raw code. Unregistered codes are allowed and have an empty name.
    pub const fn from_code(code: u16) -> Self {
        Self(code)
    }

    pub const fn code(self) -> u16 {
        self.0
    }

    pub fn is_any(self) -> bool {
        self == Self::ANY
    }

    pub fn is_registered(self) -> bool {
        usize::from(self.0) < TYPE_NAMES.len()
    }

    /// Canonical name, or `""` for an unregistered code.
    pub fn name(self) -> &'static str {
        code_to_name(self.0)
    }

    /// Canonical name without the common type prefix.
    pub fn short_name(self) -> &'static str {
        let name = self.name();
        name.strip_prefix(TYPE_NAME_PREFIX).unwrap_or(name)
    }

    /// Strict lookup accepting canonical or short names.
    pub fn lookup(name: &str) -> Result<Self, InvalidTypeName> {
        NAME_TO_CODE
            .get(name.trim())
            .map(|code| Self(*code))
            .ok_or_else(|| InvalidTypeName {
                name: name.to_string(),
            })
    }

    /// Soft lookup: unknown names fall back to [`ElementType::ANY`] with a warning.
    pub fn from_name(name: &str) -> Self {
        match Self::lookup(name) {
            Ok(element_type) => element_type,
            Err(err) => {
                warn!("{}; falling back to {}", err, Self::ANY.name());
                Self::ANY
            }
        }
    }

    /// True when `self` is a wildcard or equals `other`.
    pub fn accepts(self, other: ElementType) -> bool {
        self.is_any() || self == other
    }

    /// Every registered type in code order.
    pub fn all() -> impl Iterator<Item = ElementType> {
        (0..TYPE_NAMES.len() as u16).map(ElementType)
    }
}

impl Default for ElementType {
    fn default() -> Self {
        Self::ANY
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_registered() {
            f.write_str(self.name())
        } else {
            write!(f, "ElementType({})", self.0)
        }
    }
}

/// Canonical name for a raw code, `""` when unregistered.
pub fn code_to_name(code: u16) -> &'static str {
    TYPE_NAMES.get(usize::from(code)).copied().unwrap_or("")
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TypeRepr {
    Code(u16),
    Name(String),
}

impl TryFrom<TypeRepr> for ElementType {
    type Error = InvalidTypeName;

    fn try_from(value: TypeRepr) -> Result<Self, Self::Error> {
        match value {
            TypeRepr::Code(code) if usize::from(code) < TYPE_NAMES.len() => Ok(Self(code)),
            TypeRepr::Code(code) => Err(InvalidTypeName {
                name: code.to_string(),
            }),
            TypeRepr::Name(name) => Self::lookup(&name),
        }
    }
}

impl From<ElementType> for String {
    fn from(value: ElementType) -> Self {
        value.name().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_for_every_registered_name() {
        for name in TYPE_NAMES {
            let element_type = ElementType::lookup(name).unwrap();
            assert_eq!(element_type.name(), name);
        }
    }

    #[test]
    fn test_unknown_name_falls_back_to_any() {
        assert_eq!(ElementType::from_name("XCUIElementTypeFlux"), ElementType::ANY);
        assert_eq!(ElementType::from_name(""), ElementType::ANY);
        assert!(ElementType::lookup("Flux").is_err());
    }

    #[test]
    fn test_short_names_and_prefix_stripping() {
        assert_eq!(ElementType::lookup("Button").unwrap(), ElementType::BUTTON);
        assert_eq!(ElementType::BUTTON.short_name(), "Button");
        assert_eq!(ElementType::CELL.name(), "XCUIElementTypeCell");
    }

    #[test]
    fn test_unregistered_code_has_empty_name() {
        assert_eq!(code_to_name(500), "");
        assert_eq!(ElementType::from_code(500).short_name(), "");
        assert_eq!(code_to_name(80), "XCUIElementTypeTab");
    }

    #[test]
    fn test_serde_accepts_codes_and_names() {
        let by_name: ElementType = serde_json::from_str("\"StaticText\"").unwrap();
        let by_code: ElementType = serde_json::from_str("48").unwrap();
        assert_eq!(by_name, by_code);
        assert_eq!(
            serde_json::to_string(&by_name).unwrap(),
            "\"XCUIElementTypeStaticText\""
        );
        assert!(serde_json::from_str::<ElementType>("\"Flux\"").is_err());
    }
}
