use std::path::Path;

use serde::{Deserialize, Serialize};
use uiloc_core_types::ElementAttributes;

use crate::errors::ProviderError;

/// Serialized tree: a node's attributes flattened next to its children.
///
/// ```yaml
/// type: Application
/// frame: { x: 0, y: 0, width: 375, height: 812 }
/// children:
///   - type: Button
///     label: OK
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeFixture {
    #[serde(flatten)]
    pub attributes: ElementAttributes,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeFixture>,
}

impl TreeFixture {
    pub fn new(attributes: ElementAttributes) -> Self {
        Self {
            attributes,
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: TreeFixture) -> Self {
        self.children.push(child);
        self
    }

    pub fn from_json_str(text: &str) -> Result<Self, ProviderError> {
        serde_json::from_str(text).map_err(|err| ProviderError::InvalidFixture(err.to_string()))
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ProviderError> {
        serde_yaml::from_str(text).map_err(|err| ProviderError::InvalidFixture(err.to_string()))
    }

    /// Load by extension; unknown extensions try JSON first, then YAML.
    pub fn load(path: &Path) -> Result<Self, ProviderError> {
        let text = std::fs::read_to_string(path).map_err(|err| ProviderError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());
        match extension.as_deref() {
            Some("json") => Self::from_json_str(&text),
            Some("yaml") | Some("yml") => Self::from_yaml_str(&text),
            _ => Self::from_json_str(&text).or_else(|_| Self::from_yaml_str(&text)),
        }
    }

    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(TreeFixture::node_count).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uiloc_core_types::ElementType;

    #[test]
    fn yaml_fixture_with_defaults() {
        let fixture = TreeFixture::from_yaml_str(
            r#"
type: Application
frame: { x: 0, y: 0, width: 375, height: 812 }
children:
  - type: Button
    label: OK
    value: true
  - type: XCUIElementTypeStaticText
"#,
        )
        .unwrap();
        assert_eq!(fixture.attributes.element_type, ElementType::APPLICATION);
        assert_eq!(fixture.node_count(), 3);
        assert_eq!(fixture.children[0].attributes.label, "OK");
        assert!(fixture.children[1].attributes.enabled);
    }

    #[test]
    fn unknown_type_is_rejected() {
        let err = TreeFixture::from_json_str(r#"{"type": "Gizmo"}"#).unwrap_err();
        assert!(matches!(err, ProviderError::InvalidFixture(_)));
    }
}
