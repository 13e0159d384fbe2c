//! Serializable page-source views of a snapshot

use serde::{Deserialize, Serialize};

use crate::geometry::Rect;

/// One visible element in a page source dump.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSourceNode {
    /// Short type name, e.g. `Button`.
    #[serde(rename = "type")]
    pub element_type: String,
    pub raw_identifier: String,
    pub name: String,
    pub value: String,
    pub label: String,
    pub rect: Rect,
    /// `{{x, y}, {w, h}}`
    pub frame: String,
    pub is_enabled: bool,
    pub is_visible: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<PageSourceNode>,
}

impl PageSourceNode {
    /// Number of nodes in this subtree, including `self`.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(PageSourceNode::count).sum::<usize>()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccessibilityNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<AccessibilityNode>,
}

impl AccessibilityNode {
    pub fn is_empty(&self) -> bool {
        self.value.is_none() && self.label.is_none() && self.children.is_empty()
    }
}
