//! XPath matcher over projected snapshots

use sxd_xpath::nodeset::Node;
use sxd_xpath::Value;
use tracing::debug;
use uiloc_core_types::ElementType;

use crate::projector::{XmlProjection, INDEX_PATH_ATTRIBUTE};

/// Why an expression produced no usable node set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XPathFailure {
    pub expression: String,
    pub reason: String,
}

/// Replace the registry's wildcard type name with the XPath wildcard.
pub fn normalize_expression(expression: &str) -> String {
    expression.replace(ElementType::ANY.name(), "*")
}

/// Whether the expression selects from the end of a node list
pub fn uses_last(expression: &str) -> bool {
    expression.contains("last()")
}

/// Index paths of the matched elements in document order.
///
/// Attribute and text matches resolve to their owning element. Duplicates
/// are removed; no match is an empty list.
pub fn match_index_paths(
    projection: &XmlProjection,
    expression: &str,
) -> Result<Vec<String>, XPathFailure> {
    let normalized = normalize_expression(expression);
    let document = projection.document();
    let failure = |reason: String| XPathFailure {
        expression: expression.to_string(),
        reason,
    };

    let value = sxd_xpath::evaluate_xpath(&document, &normalized)
        .map_err(|err| failure(err.to_string()))?;
    let nodeset = match value {
        Value::Nodeset(nodeset) => nodeset,
        other => {
            return Err(failure(format!(
                "expression yields {:?}, not a node set",
                other
            )))
        }
    };

    let mut paths: Vec<String> = Vec::new();
    for node in nodeset.document_order() {
        let owner = match node {
            Node::Element(element) => Some(element),
            Node::Attribute(attribute) => attribute.parent(),
            Node::Text(text) => text.parent(),
            Node::Root(_) => None,
            _ => continue,
        };
        let path = match (node, owner) {
            (Node::Root(_), _) => projection.index_paths().first().cloned(),
            (_, owner) => owner
                .and_then(|element| element.attribute_value(INDEX_PATH_ATTRIBUTE))
                .map(str::to_string),
        };
        if let Some(path) = path {
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
    }
    debug!(expression = %normalized, matches = paths.len(), "xpath evaluated");
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uiloc_core_types::{ElementAttributes, ElementSnapshot, Rect};

    fn projection() -> XmlProjection {
        let mut snapshot = ElementSnapshot::new(
            ElementAttributes::new(ElementType::APPLICATION)
                .with_frame(Rect::new(0.0, 0.0, 375.0, 812.0)),
        );
        let a = snapshot.push_child(0, ElementAttributes::new(ElementType::OTHER).with_label("A"));
        snapshot.push_child(a, ElementAttributes::new(ElementType::BUTTON).with_label("B1"));
        snapshot.push_child(a, ElementAttributes::new(ElementType::BUTTON).with_label("B2"));
        XmlProjection::project(&snapshot, "top")
    }

    #[test]
    fn test_type_selection_in_document_order() {
        let paths = match_index_paths(&projection(), "//XCUIElementTypeButton").unwrap();
        assert_eq!(paths, vec!["top,0,0", "top,0,1"]);
    }

    #[test]
    fn test_any_type_is_normalized() {
        let paths =
            match_index_paths(&projection(), "//XCUIElementTypeAny[@label='B2']").unwrap();
        assert_eq!(paths, vec!["top,0,1"]);
    }

    #[test]
    fn test_attribute_selection_maps_to_owner() {
        let paths = match_index_paths(&projection(), "//XCUIElementTypeButton/@label").unwrap();
        assert_eq!(paths, vec!["top,0,0", "top,0,1"]);
    }

    #[test]
    fn test_last_selector() {
        let expression = "(//XCUIElementTypeButton)[last()]";
        assert!(uses_last(expression));
        assert_eq!(match_index_paths(&projection(), expression).unwrap(), vec!["top,0,1"]);
    }

    #[test]
    fn test_no_match_is_empty() {
        assert!(match_index_paths(&projection(), "//XCUIElementTypeCell")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_invalid_expressions_fail() {
        assert!(match_index_paths(&projection(), "//[").is_err());
        assert!(match_index_paths(&projection(), "count(//*)").is_err());
    }
}
