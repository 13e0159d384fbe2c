//! Arena-backed element snapshot
//!
//! A snapshot is an immutable copy of a UI subtree. Nodes live in a flat
//! vector and refer to each other by index, so parent lookups need no shared
//! ownership. Index 0 is always the root.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::attributes::ElementAttributes;
use crate::element_type::ElementType;
use crate::geometry::Rect;
use crate::page_source::{AccessibilityNode, PageSourceNode};
use crate::predicate::AttributeSource;

/// Index of a node inside one [`ElementSnapshot`].
pub type NodeId = usize;

/// One captured element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotNode {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub attributes: ElementAttributes,
}

/// Immutable point-in-time tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SnapshotParts")]
pub struct ElementSnapshot {
    nodes: Vec<SnapshotNode>,
    /// Screen bounds used for visibility checks.
    viewport: Rect,
}

/// Structural problem in a deserialized snapshot
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error("snapshot has no root node")]
    Empty,

    #[error("node at index {index} carries id {id}")]
    MisplacedNode { index: usize, id: NodeId },

    #[error("node {node} has an invalid parent link")]
    InvalidParent { node: NodeId },

    #[error("node {node} lists {child} as a child but is not its parent")]
    InvalidChild { node: NodeId, child: NodeId },
}

#[derive(Deserialize)]
struct SnapshotParts {
    nodes: Vec<SnapshotNode>,
    viewport: Rect,
}

impl TryFrom<SnapshotParts> for ElementSnapshot {
    type Error = SnapshotError;

    /// Parents always precede their children, which keeps ancestor walks finite.
    fn try_from(parts: SnapshotParts) -> Result<Self, Self::Error> {
        let SnapshotParts { nodes, viewport } = parts;
        if nodes.is_empty() {
            return Err(SnapshotError::Empty);
        }
        for (index, node) in nodes.iter().enumerate() {
            if node.id != index {
                return Err(SnapshotError::MisplacedNode { index, id: node.id });
            }
            let parent_ok = match node.parent {
                None => index == 0,
                Some(parent) => parent < index,
            };
            if !parent_ok {
                return Err(SnapshotError::InvalidParent { node: index });
            }
            for &child in &node.children {
                if nodes.get(child).and_then(|c| c.parent) != Some(index) {
                    return Err(SnapshotError::InvalidChild { node: index, child });
                }
            }
        }
        Ok(Self { nodes, viewport })
    }
}

impl ElementSnapshot {
    /// Start a snapshot whose viewport is the root frame.
    pub fn new(root: ElementAttributes) -> Self {
        let viewport = root.frame.bounds();
        Self {
            nodes: vec![SnapshotNode {
                id: 0,
                parent: None,
                children: Vec::new(),
                attributes: root,
            }],
            viewport,
        }
    }

    pub fn with_viewport(mut self, viewport: Rect) -> Self {
        self.viewport = viewport;
        self
    }

    pub fn viewport(&self) -> Rect {
        self.viewport
    }

    /// Append a child under `parent`, returning its id. Unknown parents attach to the root.
    pub fn push_child(&mut self, parent: NodeId, attributes: ElementAttributes) -> NodeId {
        let parent = if parent < self.nodes.len() { parent } else { 0 };
        let id = self.nodes.len();
        self.nodes.push(SnapshotNode {
            id,
            parent: Some(parent),
            children: Vec::new(),
            attributes,
        });
        self.nodes[parent].children.push(id);
        id
    }

    pub fn root(&self) -> &SnapshotNode {
        &self.nodes[0]
    }

    pub fn node(&self, id: NodeId) -> Option<&SnapshotNode> {
        self.nodes.get(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn element(&self, id: NodeId) -> Option<SnapshotElement<'_>> {
        self.node(id).map(|_| SnapshotElement { snapshot: self, id })
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    /// Ancestors from the nearest parent up to the root.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.parent(id);
        while let Some(parent) = current {
            out.push(parent);
            current = self.parent(parent);
        }
        out
    }

    /// Ids of the subtree under `id` in document (pre-order) order, `id` first.
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if self.node(next).is_none() {
                continue;
            }
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// All node ids in document order.
    pub fn document_order(&self) -> Vec<NodeId> {
        self.subtree(0)
    }

    /// Has area on screen.
    pub fn is_visible(&self, id: NodeId) -> bool {
        let Some(node) = self.node(id) else {
            return false;
        };
        let attrs = &node.attributes;
        let visible_frame = attrs.visible_frame();
        if attrs.frame.is_empty() || visible_frame.is_empty() {
            return false;
        }
        visible_frame.intersects(&self.viewport)
    }

    /// Exposed to assistive clients as a leaf.
    pub fn is_accessible(&self, id: NodeId) -> bool {
        let Some(node) = self.node(id) else {
            return false;
        };
        let attrs = &node.attributes;

        if attrs.element_type == ElementType::CELL {
            if !attrs.accessible {
                let container_accessible = node
                    .children
                    .first()
                    .and_then(|child| self.node(*child))
                    .map(|child| child.attributes.accessible)
                    .unwrap_or(false);
                if !container_accessible {
                    return false;
                }
            }
        } else if attrs.element_type != ElementType::TEXT_FIELD
            && attrs.element_type != ElementType::SECURE_TEXT_FIELD
            && !attrs.accessible
        {
            return false;
        }

        !self.ancestors(id).into_iter().any(|ancestor| {
            let attrs = &self.nodes[ancestor].attributes;
            attrs.accessible && attrs.element_type != ElementType::TABLE
        })
    }

    /// Nested page source of the visible part of the tree. `None` if the root is invisible.
    pub fn to_page_source(&self) -> Option<PageSourceNode> {
        self.page_source_node(0)
    }

    fn page_source_node(&self, id: NodeId) -> Option<PageSourceNode> {
        if !self.is_visible(id) {
            return None;
        }
        let attrs = &self.node(id)?.attributes;
        let children = self
            .children(id)
            .iter()
            .filter_map(|child| self.page_source_node(*child))
            .collect();
        Some(PageSourceNode {
            element_type: attrs.element_type.short_name().to_string(),
            raw_identifier: attrs.identifier.clone(),
            name: attrs.derived_name().unwrap_or_default().to_string(),
            value: attrs.value_text(),
            label: attrs.derived_label().to_string(),
            rect: attrs.frame.integral(),
            frame: attrs.frame.frame_string(),
            is_enabled: attrs.enabled,
            is_visible: true,
            children,
        })
    }

    /// Accessible elements only. Non-accessible elements contribute their children.
    pub fn to_accessibility_tree(&self) -> AccessibilityNode {
        self.accessibility_node(0)
    }

    fn accessibility_node(&self, id: NodeId) -> AccessibilityNode {
        let Some(node) = self.node(id) else {
            return AccessibilityNode::default();
        };
        if self.is_accessible(id) {
            if self.is_visible(id) {
                return AccessibilityNode {
                    value: Some(node.attributes.value_text()),
                    label: Some(node.attributes.derived_label().to_string()),
                    children: Vec::new(),
                };
            }
            return AccessibilityNode::default();
        }
        AccessibilityNode {
            value: None,
            label: None,
            children: node
                .children
                .iter()
                .map(|child| self.accessibility_node(*child))
                .filter(|child| !child.is_empty())
                .collect(),
        }
    }
}

/// Borrowed view of one snapshot node with tree-aware attribute lookups.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotElement<'a> {
    pub snapshot: &'a ElementSnapshot,
    pub id: NodeId,
}

impl<'a> SnapshotElement<'a> {
    pub fn node(&self) -> &'a SnapshotNode {
        &self.snapshot.nodes[self.id]
    }
}

impl AttributeSource for SnapshotElement<'_> {
    fn attributes(&self) -> &ElementAttributes {
        &self.node().attributes
    }

    fn is_visible(&self) -> bool {
        self.snapshot.is_visible(self.id)
    }

    fn is_accessible(&self) -> bool {
        self.snapshot.is_accessible(self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ElementSnapshot {
        let app = ElementAttributes::new(ElementType::APPLICATION)
            .with_frame(Rect::new(0.0, 0.0, 375.0, 812.0));
        let mut snapshot = ElementSnapshot::new(app);
        let table = snapshot.push_child(
            0,
            ElementAttributes::new(ElementType::TABLE).with_frame(Rect::new(0.0, 0.0, 375.0, 600.0)),
        );
        let mut cell = ElementAttributes::new(ElementType::CELL)
            .with_frame(Rect::new(0.0, 0.0, 375.0, 44.0));
        cell.accessible = true;
        let cell = snapshot.push_child(table, cell);
        let text = ElementAttributes::new(ElementType::STATIC_TEXT)
            .with_label("Row")
            .with_frame(Rect::new(10.0, 10.0, 100.0, 20.0));
        snapshot.push_child(cell, text);
        snapshot.push_child(
            0,
            ElementAttributes::new(ElementType::BUTTON)
                .with_label("Offscreen")
                .with_frame(Rect::new(500.0, 900.0, 10.0, 10.0)),
        );
        snapshot
    }

    #[test]
    fn test_document_order_is_preorder() {
        let snapshot = sample();
        assert_eq!(snapshot.document_order(), vec![0, 1, 2, 3, 4]);
        assert_eq!(snapshot.ancestors(3), vec![2, 1, 0]);
    }

    #[test]
    fn test_visibility_uses_viewport() {
        let snapshot = sample();
        assert!(snapshot.is_visible(3));
        assert!(!snapshot.is_visible(4));
    }

    #[test]
    fn test_accessibility_rules() {
        let snapshot = sample();
        // cell under a table stays accessible
        assert!(snapshot.is_accessible(2));
        // text inside an accessible cell is hidden by its ancestor
        let mut snapshot = snapshot;
        snapshot.nodes[3].attributes.accessible = true;
        assert!(!snapshot.is_accessible(3));
        // text fields ignore their own flag
        let field = snapshot.push_child(0, ElementAttributes::new(ElementType::TEXT_FIELD));
        assert!(snapshot.is_accessible(field));
    }

    #[test]
    fn test_page_source_skips_invisible_nodes() {
        let snapshot = sample();
        let source = snapshot.to_page_source().unwrap();
        assert_eq!(source.element_type, "Application");
        assert_eq!(source.children.len(), 1);
        let cell = &source.children[0].children[0];
        assert_eq!(cell.element_type, "Cell");
        assert_eq!(cell.children[0].value, "Row");
    }

    #[test]
    fn test_accessibility_tree_collapses_at_accessible_nodes() {
        let snapshot = sample();
        let tree = snapshot.to_accessibility_tree();
        let cell = &tree.children[0].children[0];
        assert_eq!(cell.label.as_deref(), Some(""));
        assert!(cell.children.is_empty());
    }

    #[test]
    fn test_deserialize_validates_structure() {
        let snapshot = sample();
        let json = serde_json::to_value(&snapshot).unwrap();
        let restored: ElementSnapshot = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(restored, snapshot);

        let empty = serde_json::json!({
            "nodes": [],
            "viewport": { "x": 0, "y": 0, "width": 10, "height": 10 }
        });
        let err = serde_json::from_value::<ElementSnapshot>(empty).unwrap_err();
        assert!(err.to_string().contains("no root node"));

        let mut orphaned = json;
        orphaned["nodes"][1]["parent"] = serde_json::Value::Null;
        assert!(serde_json::from_value::<ElementSnapshot>(orphaned.clone()).is_err());

        orphaned["nodes"][1]["parent"] = serde_json::json!(0);
        orphaned["nodes"][0]["children"] = serde_json::json!([1, 42]);
        let err = serde_json::from_value::<ElementSnapshot>(orphaned).unwrap_err();
        assert!(err.to_string().contains("42"));
    }
}
