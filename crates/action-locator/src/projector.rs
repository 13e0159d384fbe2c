//! Snapshot XML projector
//!
//! Mirrors a snapshot into an XML document whose element names are type
//! names, so XPath can run over it. Every element carries a synthetic index
//! path that maps a match back to its snapshot node.

use std::collections::HashMap;

use sxd_document::dom::{Document, Element};
use sxd_document::Package;
use tracing::debug;
use uiloc_core_types::{AttributeValue, ElementSnapshot, ElementType, NodeId};

use crate::errors::LocatorError;

/// Attribute holding the index path of a projected element
pub const INDEX_PATH_ATTRIBUTE: &str = "private_indexPath";

/// Projected document plus the index-path lookup built alongside it
pub struct XmlProjection {
    package: Package,
    index: HashMap<String, NodeId>,
    order: Vec<String>,
}

impl XmlProjection {
    /// Project `snapshot`; the root gets index path `root_path`, its
    /// children `root_path,0`, `root_path,1` and so on.
    pub fn project(snapshot: &ElementSnapshot, root_path: &str) -> Self {
        let package = Package::new();
        let mut index = HashMap::with_capacity(snapshot.len());
        let mut order = Vec::with_capacity(snapshot.len());
        {
            let document = package.as_document();
            let root = project_node(
                &document,
                snapshot,
                0,
                root_path.to_string(),
                &mut index,
                &mut order,
            );
            document.root().append_child(root);
        }
        debug!(nodes = index.len(), "snapshot projected to xml");
        Self {
            package,
            index,
            order,
        }
    }

    pub fn document(&self) -> Document<'_> {
        self.package.as_document()
    }

    /// Snapshot node for an index path
    pub fn node_for(&self, index_path: &str) -> Option<NodeId> {
        self.index.get(index_path).copied()
    }

    /// Index paths in document order
    pub fn index_paths(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn to_xml_string(&self) -> Result<String, LocatorError> {
        let mut buffer = Vec::new();
        let document = self.document();
        sxd_document::writer::format_document(&document, &mut buffer)
            .map_err(|err| LocatorError::Internal(format!("xml write failed: {err}")))?;
        String::from_utf8(buffer)
            .map_err(|err| LocatorError::Internal(format!("xml is not utf-8: {err}")))
    }
}

fn project_node<'d>(
    document: &Document<'d>,
    snapshot: &ElementSnapshot,
    id: NodeId,
    index_path: String,
    index: &mut HashMap<String, NodeId>,
    order: &mut Vec<String>,
) -> Element<'d> {
    let element = document.create_element(element_name(snapshot, id));
    if let Some(node) = snapshot.node(id) {
        let attrs = &node.attributes;
        element.set_attribute_value("type", element_name(snapshot, id));
        if let Some(value) = attrs.derived_value() {
            element.set_attribute_value("value", &value.to_string());
        }
        if let Some(name) = attrs.derived_name() {
            element.set_attribute_value("name", name);
        }
        element.set_attribute_value("label", attrs.derived_label());
        element.set_attribute_value("enabled", bool_text(attrs.enabled));
        element.set_attribute_value("visible", bool_text(snapshot.is_visible(id)));
        element.set_attribute_value("accessible", bool_text(snapshot.is_accessible(id)));
        element.set_attribute_value("x", &scalar(attrs.frame.x));
        element.set_attribute_value("y", &scalar(attrs.frame.y));
        element.set_attribute_value("width", &scalar(attrs.frame.width));
        element.set_attribute_value("height", &scalar(attrs.frame.height));
    }
    element.set_attribute_value(INDEX_PATH_ATTRIBUTE, &index_path);
    order.push(index_path.clone());
    index.insert(index_path.clone(), id);

    for (ordinal, child) in snapshot.children(id).iter().enumerate() {
        let child_path = format!("{},{}", index_path, ordinal);
        let child_element = project_node(document, snapshot, *child, child_path, index, order);
        element.append_child(child_element);
    }
    element
}

/// Unregistered codes have no name and project as `Other`.
fn element_name(snapshot: &ElementSnapshot, id: NodeId) -> &'static str {
    let element_type = snapshot
        .node(id)
        .map(|node| node.attributes.element_type)
        .unwrap_or(ElementType::OTHER);
    if element_type.is_registered() {
        element_type.name()
    } else {
        ElementType::OTHER.name()
    }
}

fn bool_text(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

fn scalar(value: f64) -> String {
    AttributeValue::Number(value).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uiloc_core_types::{ElementAttributes, Rect};

    fn snapshot() -> ElementSnapshot {
        let mut snapshot = ElementSnapshot::new(
            ElementAttributes::new(ElementType::APPLICATION)
                .with_frame(Rect::new(0.0, 0.0, 375.0, 812.0)),
        );
        let window = snapshot.push_child(0, ElementAttributes::new(ElementType::WINDOW));
        let mut switch = ElementAttributes::new(ElementType::SWITCH).with_identifier("wifi");
        switch.value = Some(AttributeValue::Text("1".into()));
        snapshot.push_child(window, switch);
        snapshot.push_child(window, ElementAttributes::new(ElementType::BUTTON).with_label("OK"));
        snapshot.push_child(0, ElementAttributes::new(ElementType::from_code(999)));
        snapshot
    }

    #[test]
    fn test_index_paths_follow_child_order() {
        let projection = XmlProjection::project(&snapshot(), "top");
        assert_eq!(
            projection.index_paths(),
            &["top", "top,0", "top,0,0", "top,0,1", "top,1"]
        );
        assert_eq!(projection.node_for("top,0,1"), Some(3));
        assert_eq!(projection.node_for("top"), Some(0));
        assert_eq!(projection.node_for("top,9"), None);
    }

    fn has_attribute(xml: &str, name: &str, value: &str) -> bool {
        xml.contains(&format!("{name}='{value}'")) || xml.contains(&format!("{name}=\"{value}\""))
    }

    #[test]
    fn test_xml_carries_attributes() {
        let xml = XmlProjection::project(&snapshot(), "top").to_xml_string().unwrap();
        assert!(xml.contains("<XCUIElementTypeApplication"));
        assert!(has_attribute(&xml, "name", "wifi"));
        assert!(has_attribute(&xml, "value", "1"));
        assert!(has_attribute(&xml, "enabled", "true"));
        assert!(has_attribute(&xml, INDEX_PATH_ATTRIBUTE, "top,0,1"));
        assert!(xml.contains("<XCUIElementTypeOther"));
    }

    #[test]
    fn test_projection_is_deterministic() {
        let a = XmlProjection::project(&snapshot(), "top").to_xml_string().unwrap();
        let b = XmlProjection::project(&snapshot(), "top").to_xml_string().unwrap();
        assert_eq!(a, b);
    }
}
