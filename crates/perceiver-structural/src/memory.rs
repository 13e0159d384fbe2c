//! In-memory live tree
//!
//! A mutable tree with stable per-node ids behind a read/write lock. It
//! behaves like a live accessibility tree: handles go stale when their node
//! is removed, and every snapshot is a fresh copy.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use parking_lot::RwLock;
use tracing::debug;
use uiloc_core_types::{ElementAttributes, ElementSnapshot, NodeId, Rect};

use crate::errors::ProviderError;
use crate::fixture::TreeFixture;
use crate::ports::{ElementHandle, TreeProvider};
use crate::query::{ElementQuery, QueryStep};

const HANDLE_PREFIX: &str = "node-";

#[derive(Debug, Clone)]
struct LiveNode {
    attributes: ElementAttributes,
    parent: Option<u64>,
    children: Vec<u64>,
}

#[derive(Debug)]
struct TreeState {
    nodes: HashMap<u64, LiveNode>,
    root: u64,
    next_id: u64,
}

/// Full capture of the current tree with the live id of every snapshot node.
struct Capture {
    snapshot: ElementSnapshot,
    live_ids: Vec<u64>,
    node_ids: HashMap<u64, NodeId>,
}

impl TreeState {
    fn insert(&mut self, parent: Option<u64>, attributes: ElementAttributes) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.nodes.insert(
            id,
            LiveNode {
                attributes,
                parent,
                children: Vec::new(),
            },
        );
        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            parent.children.push(id);
        }
        id
    }

    fn insert_fixture(&mut self, parent: Option<u64>, fixture: TreeFixture) -> u64 {
        let id = self.insert(parent, fixture.attributes);
        for child in fixture.children {
            self.insert_fixture(Some(id), child);
        }
        id
    }

    fn viewport(&self) -> Rect {
        self.nodes
            .get(&self.root)
            .map(|node| node.attributes.frame.bounds())
            .unwrap_or_default()
    }

    /// Pre-order copy of the subtree under `start`.
    fn capture(&self, start: u64) -> Option<Capture> {
        let root = self.nodes.get(&start)?;
        let mut snapshot =
            ElementSnapshot::new(root.attributes.clone()).with_viewport(self.viewport());
        let mut live_ids = vec![start];
        let mut node_ids = HashMap::from([(start, 0)]);

        let mut stack: Vec<(u64, NodeId)> = root
            .children
            .iter()
            .rev()
            .map(|child| (*child, 0))
            .collect();
        while let Some((live_id, parent)) = stack.pop() {
            let Some(node) = self.nodes.get(&live_id) else {
                continue;
            };
            let id = snapshot.push_child(parent, node.attributes.clone());
            live_ids.push(live_id);
            node_ids.insert(live_id, id);
            stack.extend(node.children.iter().rev().map(|child| (*child, id)));
        }

        Some(Capture {
            snapshot,
            live_ids,
            node_ids,
        })
    }
}

pub struct InMemoryTree {
    state: RwLock<TreeState>,
}

impl InMemoryTree {
    pub fn from_fixture(fixture: TreeFixture) -> Self {
        let mut state = TreeState {
            nodes: HashMap::new(),
            root: 0,
            next_id: 0,
        };
        state.root = state.insert_fixture(None, fixture);
        debug!(nodes = state.nodes.len(), "in-memory tree loaded");
        Self {
            state: RwLock::new(state),
        }
    }

    pub fn load(path: &Path) -> Result<Self, ProviderError> {
        Ok(Self::from_fixture(TreeFixture::load(path)?))
    }

    pub fn len(&self) -> usize {
        self.state.read().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn append_child(
        &self,
        parent: &ElementHandle,
        child: TreeFixture,
    ) -> Result<ElementHandle, ProviderError> {
        let mut state = self.state.write();
        let parent_id = live_id(&state, parent)?;
        let id = state.insert_fixture(Some(parent_id), child);
        Ok(handle(id))
    }

    /// Remove an element and its subtree. Their handles become stale.
    pub fn remove(&self, element: &ElementHandle) -> Result<(), ProviderError> {
        let mut state = self.state.write();
        let id = live_id(&state, element)?;
        if id == state.root {
            return Err(ProviderError::internal("cannot remove the root element"));
        }
        if let Some(parent) = state.nodes.get(&id).and_then(|node| node.parent) {
            if let Some(parent) = state.nodes.get_mut(&parent) {
                parent.children.retain(|child| *child != id);
            }
        }
        let mut pending = vec![id];
        while let Some(next) = pending.pop() {
            if let Some(node) = state.nodes.remove(&next) {
                pending.extend(node.children);
            }
        }
        Ok(())
    }

    pub fn update<F>(&self, element: &ElementHandle, apply: F) -> Result<(), ProviderError>
    where
        F: FnOnce(&mut ElementAttributes),
    {
        let mut state = self.state.write();
        let id = live_id(&state, element)?;
        let node = state
            .nodes
            .get_mut(&id)
            .ok_or_else(|| ProviderError::stale(element))?;
        apply(&mut node.attributes);
        Ok(())
    }

    fn run(&self, query: &ElementQuery) -> Result<Vec<ElementHandle>, ProviderError> {
        let state = self.state.read();
        let start = live_id(&state, &query.root)?;
        let capture = state
            .capture(state.root)
            .ok_or_else(|| ProviderError::internal("tree has no root"))?;
        let snapshot = &capture.snapshot;
        let start = *capture
            .node_ids
            .get(&start)
            .ok_or_else(|| ProviderError::stale(&query.root))?;

        // node ids are pre-order, so set order is document order
        let mut current: BTreeSet<NodeId> = BTreeSet::from([start]);
        for step in &query.steps {
            current = match step {
                QueryStep::Descendants(element_type) => current
                    .iter()
                    .flat_map(|id| snapshot.subtree(*id).into_iter().skip(1))
                    .filter(|id| type_of(snapshot, *id).map_or(false, |t| element_type.accepts(t)))
                    .collect(),
                QueryStep::Children(element_type) => current
                    .iter()
                    .flat_map(|id| snapshot.children(*id).to_vec())
                    .filter(|id| type_of(snapshot, *id).map_or(false, |t| element_type.accepts(t)))
                    .collect(),
                QueryStep::Matching(predicate) => current
                    .into_iter()
                    .filter(|id| {
                        snapshot
                            .element(*id)
                            .map_or(false, |element| predicate.evaluate(&element))
                    })
                    .collect(),
                QueryStep::Identifier(identifier) => current
                    .into_iter()
                    .filter(|id| {
                        snapshot
                            .node(*id)
                            .map_or(false, |node| &node.attributes.identifier == identifier)
                    })
                    .collect(),
                QueryStep::Containing {
                    element_type,
                    predicate,
                } => current
                    .into_iter()
                    .filter(|id| {
                        snapshot.subtree(*id).into_iter().skip(1).any(|descendant| {
                            let type_ok = type_of(snapshot, descendant)
                                .map_or(false, |t| element_type.accepts(t));
                            type_ok
                                && snapshot
                                    .element(descendant)
                                    .map_or(false, |element| predicate.evaluate(&element))
                        })
                    })
                    .collect(),
            };
            if current.is_empty() {
                break;
            }
        }

        Ok(current
            .into_iter()
            .map(|id| handle(capture.live_ids[id]))
            .collect())
    }
}

impl TreeProvider for InMemoryTree {
    fn root(&self) -> Result<ElementHandle, ProviderError> {
        Ok(handle(self.state.read().root))
    }

    fn snapshot(&self, element: &ElementHandle) -> Result<ElementSnapshot, ProviderError> {
        let state = self.state.read();
        let id = live_id(&state, element)?;
        state
            .capture(id)
            .map(|capture| capture.snapshot)
            .ok_or_else(|| ProviderError::stale(element))
    }

    fn query(&self, query: &ElementQuery) -> Result<Vec<ElementHandle>, ProviderError> {
        let result = self.run(query)?;
        debug!(query = %query, matches = result.len(), "live query");
        Ok(result)
    }
}

fn handle(id: u64) -> ElementHandle {
    ElementHandle(format!("{HANDLE_PREFIX}{id}"))
}

fn live_id(state: &TreeState, element: &ElementHandle) -> Result<u64, ProviderError> {
    element
        .as_str()
        .strip_prefix(HANDLE_PREFIX)
        .and_then(|raw| raw.parse::<u64>().ok())
        .filter(|id| state.nodes.contains_key(id))
        .ok_or_else(|| ProviderError::stale(element))
}

fn type_of(snapshot: &ElementSnapshot, id: NodeId) -> Option<uiloc_core_types::ElementType> {
    snapshot.node(id).map(|node| node.attributes.element_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uiloc_core_types::{ElementType, Predicate};

    fn node(element_type: ElementType, label: &str) -> TreeFixture {
        TreeFixture::new(
            ElementAttributes::new(element_type)
                .with_label(label)
                .with_frame(Rect::new(0.0, 0.0, 100.0, 40.0)),
        )
    }

    fn tree() -> InMemoryTree {
        InMemoryTree::from_fixture(
            node(ElementType::APPLICATION, "app")
                .with_child(
                    node(ElementType::OTHER, "outer")
                        .with_child(node(ElementType::BUTTON, "inner-a"))
                        .with_child(node(ElementType::OTHER, "nested").with_child(node(
                            ElementType::BUTTON,
                            "inner-b",
                        ))),
                )
                .with_child(node(ElementType::BUTTON, "top")),
        )
    }

    fn labels(tree: &InMemoryTree, handles: &[ElementHandle]) -> Vec<String> {
        handles
            .iter()
            .map(|h| tree.capture_attributes(h).unwrap().label)
            .collect()
    }

    #[test]
    fn descendants_are_deduplicated_in_document_order() {
        let tree = tree();
        let root = tree.root().unwrap();
        let query = ElementQuery::new(root)
            .descendants(ElementType::OTHER)
            .descendants(ElementType::BUTTON);
        let found = tree.query(&query).unwrap();
        assert_eq!(labels(&tree, &found), vec!["inner-a", "inner-b"]);
    }

    #[test]
    fn children_and_any() {
        let tree = tree();
        let root = tree.root().unwrap();
        let found = tree
            .query(&ElementQuery::new(root).children(ElementType::ANY))
            .unwrap();
        assert_eq!(labels(&tree, &found), vec!["outer", "top"]);
    }

    #[test]
    fn containing_keeps_ancestors_of_matches() {
        let tree = tree();
        let root = tree.root().unwrap();
        let predicate = Predicate::parse("label == 'inner-b'").unwrap();
        let found = tree
            .query(
                &ElementQuery::new(root)
                    .descendants(ElementType::OTHER)
                    .containing(ElementType::ANY, predicate),
            )
            .unwrap();
        assert_eq!(labels(&tree, &found), vec!["outer", "nested"]);
    }

    #[test]
    fn removed_elements_go_stale() {
        let tree = tree();
        let root = tree.root().unwrap();
        let buttons = tree
            .query(&ElementQuery::new(root.clone()).descendants(ElementType::BUTTON))
            .unwrap();
        tree.remove(&buttons[0]).unwrap();
        assert!(matches!(
            tree.snapshot(&buttons[0]),
            Err(ProviderError::StaleElement(_))
        ));
        assert!(tree.remove(&root).is_err());
    }

    #[test]
    fn update_and_append_are_visible_to_queries() {
        let tree = tree();
        let root = tree.root().unwrap();
        let added = tree
            .append_child(&root, node(ElementType::CELL, "fresh"))
            .unwrap();
        tree.update(&added, |attrs| attrs.identifier = "cell-1".into())
            .unwrap();
        let found = tree
            .query(&ElementQuery::new(root).descendants(ElementType::ANY).matching_identifier("cell-1"))
            .unwrap();
        assert_eq!(found, vec![added]);
    }
}
