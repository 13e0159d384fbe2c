//! Snapshot-to-live reconciliation
//!
//! Live handles carry no durable identity, so a snapshot match is mapped back
//! by re-querying live candidates of the same type and comparing freshly
//! captured attributes.

use std::collections::{HashMap, HashSet};

use perceiver_structural::{ElementHandle, ElementQuery, ProviderError, TreeProvider};
use tracing::{debug, warn};
use uiloc_core_types::{ElementAttributes, ElementSnapshot, ElementType, NodeId};

use crate::errors::LocatorError;
use crate::projector::XmlProjection;
use crate::types::{Diagnostic, MatchMode, Resolution, ResolverOptions};

/// Structural equality used to correlate a snapshot node with a live element
pub fn attributes_match(expected: &ElementAttributes, actual: &ElementAttributes) -> bool {
    expected.element_type == actual.element_type
        && expected.derived_name() == actual.derived_name()
        && expected.derived_label() == actual.derived_label()
        && expected.derived_value() == actual.derived_value()
        && expected.frame == actual.frame
}

/// What to reconcile and against which live root
pub struct ReconcileRequest<'a> {
    pub index_paths: &'a [String],
    pub projection: &'a XmlProjection,
    pub snapshot: &'a ElementSnapshot,
    /// Live element the snapshot was captured from
    pub live_root: &'a ElementHandle,
    pub mode: MatchMode,
    /// Scan candidates back to front
    pub reverse: bool,
}

pub struct Reconciler<'a> {
    provider: &'a dyn TreeProvider,
    options: &'a ResolverOptions,
}

impl<'a> Reconciler<'a> {
    pub fn new(provider: &'a dyn TreeProvider, options: &'a ResolverOptions) -> Self {
        Self { provider, options }
    }

    pub fn reconcile(&self, request: &ReconcileRequest<'_>) -> Result<Resolution, LocatorError> {
        let mut matched: Vec<(&str, NodeId)> = request
            .index_paths
            .iter()
            .filter_map(|path| {
                request
                    .projection
                    .node_for(path)
                    .map(|id| (path.as_str(), id))
            })
            .collect();
        if request.mode.is_first() {
            matched.truncate(1);
        }

        // one live query per distinct type
        let mut candidates: HashMap<ElementType, Vec<ElementHandle>> = HashMap::new();
        for (_, id) in &matched {
            if *id == 0 {
                continue;
            }
            let element_type = node_type(request.snapshot, *id);
            if candidates.contains_key(&element_type) {
                continue;
            }
            let query = ElementQuery::new(request.live_root.clone()).descendants(element_type);
            let mut found = self.provider.query(&query)?;
            if request.reverse {
                found.reverse();
            }
            debug!(
                element_type = element_type.short_name(),
                candidates = found.len(),
                "reconciliation candidates"
            );
            candidates.insert(element_type, found);
        }

        let mut captured: HashMap<ElementHandle, Option<ElementAttributes>> = HashMap::new();
        let mut claimed: HashSet<ElementHandle> = HashSet::new();
        let mut resolution = Resolution::default();

        for (path, id) in matched {
            if id == 0 {
                // the snapshot root is the live root itself
                resolution.elements.push(request.live_root.clone());
                continue;
            }
            let Some(expected) = request.snapshot.node(id).map(|node| &node.attributes) else {
                continue;
            };
            let pool = candidates
                .get(&expected.element_type)
                .map(Vec::as_slice)
                .unwrap_or_default();

            let mut chosen = None;
            for candidate in pool {
                if self.options.claim_unique && claimed.contains(candidate) {
                    continue;
                }
                let actual = match captured.get(candidate) {
                    Some(cached) => cached.clone(),
                    None => {
                        let fresh = self.capture(candidate)?;
                        captured.insert(candidate.clone(), fresh.clone());
                        fresh
                    }
                };
                if actual.map_or(false, |actual| attributes_match(expected, &actual)) {
                    chosen = Some(candidate.clone());
                    break;
                }
            }

            match chosen {
                Some(element) => {
                    if self.options.claim_unique {
                        claimed.insert(element.clone());
                    }
                    resolution.elements.push(element);
                }
                None => {
                    let diagnostic = Diagnostic::ReconciliationMiss {
                        index_path: path.to_string(),
                        element_type: expected.element_type.name().to_string(),
                    };
                    warn!("{}", diagnostic);
                    resolution.push_diagnostic(diagnostic);
                }
            }
        }

        Ok(resolution)
    }

    /// Stale candidates count as non-matches.
    fn capture(&self, element: &ElementHandle) -> Result<Option<ElementAttributes>, LocatorError> {
        match self.provider.capture_attributes(element) {
            Ok(attributes) => Ok(Some(attributes)),
            Err(ProviderError::StaleElement(_)) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

fn node_type(snapshot: &ElementSnapshot, id: NodeId) -> ElementType {
    snapshot
        .node(id)
        .map(|node| node.attributes.element_type)
        .unwrap_or(ElementType::ANY)
}
