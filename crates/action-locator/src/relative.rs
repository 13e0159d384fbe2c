//! Parent and sibling lookups relative to a child locator
//!
//! The child locator must describe a single element by identifier, name or
//! predicate. Parent lookups add a containment filter to the parent
//! locator's live query. Sibling lookups climb two levels above the child
//! in a snapshot and resolve the sibling locator from that ancestor.

use perceiver_structural::{ElementHandle, ElementQuery, TreeProvider};
use tracing::{debug, warn};
use uiloc_core_types::{ElementSnapshot, ElementType, NodeId, Predicate};

use crate::chain_resolver::{ChainResolver, ChainTarget};
use crate::class_chain::parse_chain;
use crate::errors::LocatorError;
use crate::projector::XmlProjection;
use crate::reconcile::{ReconcileRequest, Reconciler};
use crate::resolver::{DefaultElementResolver, ElementResolver};
use crate::types::*;

/// Levels between a child and the ancestor its siblings are searched from
const SIBLING_ANCESTOR_DEPTH: usize = 2;

pub(crate) fn find_parent(
    resolver: &DefaultElementResolver,
    parent: &Locator,
    child: &Locator,
    root: &ElementHandle,
    mode: MatchMode,
) -> Result<Resolution, LocatorError> {
    ensure_child_supported(child)?;
    let child_predicate = match child_predicate(child) {
        Ok(predicate) => predicate,
        Err(diagnostic) => return Ok(miss(diagnostic)),
    };
    let provider = resolver.provider();
    let mut diagnostics = Vec::new();

    let base = ElementQuery::new(root.clone());
    let query = match parent.strategy {
        LocatorStrategy::Id | LocatorStrategy::AccessibilityId | LocatorStrategy::Identifier => {
            base.descendants(ElementType::ANY)
                .matching_identifier(parent.value.as_str())
        }
        LocatorStrategy::Name => base
            .descendants(ElementType::ANY)
            .matching(name_predicate(&parent.value)?),
        LocatorStrategy::ClassName => {
            let element_type = ElementType::lookup(&parent.value).unwrap_or_else(|err| {
                warn!("{}; using {}", err, ElementType::ANY.name());
                diagnostics.push(Diagnostic::from(err));
                ElementType::ANY
            });
            base.descendants(element_type)
        }
        LocatorStrategy::Predicate => match Predicate::parse(&parent.value) {
            Ok(predicate) => base.descendants(ElementType::ANY).matching(predicate),
            Err(err) => {
                return Ok(miss(Diagnostic::InvalidPredicate {
                    expression: parent.value.clone(),
                    reason: err.to_string(),
                }))
            }
        },
        LocatorStrategy::ClassChain => {
            let parsed = parse_chain(&parent.value);
            diagnostics.extend(parsed.diagnostics);
            match ChainResolver::new(provider).walk(root, &parsed.query)? {
                ChainTarget::Query(query) => query,
                ChainTarget::Indexed(element) => {
                    let found = if contains(provider, &element, &child_predicate)? {
                        vec![element]
                    } else {
                        Vec::new()
                    };
                    debug!(matches = found.len(), "parent lookup on indexed chain");
                    return Ok(Resolution::new(found).with_diagnostics(diagnostics));
                }
            }
        }
        LocatorStrategy::XPath => {
            return containing_filter(resolver, parent, child_predicate, root, mode);
        }
    };

    let query = query.containing(ElementType::ANY, child_predicate);
    let found = provider.query(&query)?;
    debug!(query = %query, matches = found.len(), "parent lookup");
    Ok(Resolution::new(mode.apply(found)).with_diagnostics(diagnostics))
}

/// XPath results have no live query to extend, so containment is checked
/// element by element.
fn containing_filter(
    resolver: &DefaultElementResolver,
    parent: &Locator,
    child_predicate: Predicate,
    root: &ElementHandle,
    mode: MatchMode,
) -> Result<Resolution, LocatorError> {
    let candidates = resolver.resolve_detailed(parent, root, MatchMode::All)?;
    let mut elements = Vec::new();
    for element in candidates.elements {
        if contains(resolver.provider(), &element, &child_predicate)? {
            elements.push(element);
        }
    }
    Ok(Resolution::new(mode.apply(elements)).with_diagnostics(candidates.diagnostics))
}

/// Whether `element` has a descendant satisfying `predicate`
fn contains(
    provider: &dyn TreeProvider,
    element: &ElementHandle,
    predicate: &Predicate,
) -> Result<bool, LocatorError> {
    let query = ElementQuery::new(element.clone())
        .descendants(ElementType::ANY)
        .matching(predicate.clone());
    Ok(!provider.query(&query)?.is_empty())
}

pub(crate) fn find_sibling(
    resolver: &DefaultElementResolver,
    child: &Locator,
    sibling: &Locator,
    root: &ElementHandle,
    mode: MatchMode,
) -> Result<Resolution, LocatorError> {
    ensure_child_supported(child)?;
    let child_predicate = match child_predicate(child) {
        Ok(predicate) => predicate,
        Err(diagnostic) => return Ok(miss(diagnostic)),
    };
    let provider = resolver.provider();
    let snapshot = provider.snapshot(root)?;

    let Some(child_id) = first_match(&snapshot, &child_predicate) else {
        debug!("No element matches sibling anchor {}", child);
        return Ok(Resolution::default());
    };
    let ancestor = snapshot
        .ancestors(child_id)
        .get(SIBLING_ANCESTOR_DEPTH - 1)
        .copied()
        .unwrap_or(0);
    debug!(child = child_id, ancestor, "sibling anchor located");

    let anchor = match live_element(provider, resolver.options(), &snapshot, ancestor, root)? {
        Ok(anchor) => anchor,
        Err(resolution) => return Ok(resolution),
    };
    resolver.resolve_detailed(sibling, &anchor, mode)
}

fn ensure_child_supported(child: &Locator) -> Result<(), LocatorError> {
    if child.strategy.describes_single_element() {
        return Ok(());
    }
    Err(LocatorError::UnsupportedRelativeLocator {
        locator: child.to_string(),
        reason: format!(
            "'{}' cannot describe a child; use an identifier, name or predicate locator",
            child.strategy.name()
        ),
    })
}

fn child_predicate(child: &Locator) -> Result<Predicate, Diagnostic> {
    let parsed = match child.strategy {
        LocatorStrategy::Name => Predicate::equals("name", child.value.as_str()),
        LocatorStrategy::Predicate => Predicate::parse(&child.value),
        _ => Predicate::equals("identifier", child.value.as_str()),
    };
    parsed.map_err(|err| {
        let diagnostic = Diagnostic::InvalidPredicate {
            expression: child.value.clone(),
            reason: err.to_string(),
        };
        warn!("{}", diagnostic);
        diagnostic
    })
}

fn name_predicate(value: &str) -> Result<Predicate, LocatorError> {
    Predicate::equals("name", value).map_err(|err| LocatorError::Internal(err.to_string()))
}

fn miss(diagnostic: Diagnostic) -> Resolution {
    Resolution::default().with_diagnostics(vec![diagnostic])
}

/// First descendant of the snapshot root satisfying `predicate`
fn first_match(snapshot: &ElementSnapshot, predicate: &Predicate) -> Option<NodeId> {
    snapshot.document_order().into_iter().skip(1).find(|id| {
        snapshot
            .element(*id)
            .map_or(false, |element| predicate.evaluate(&element))
    })
}

/// Map a snapshot node back to a live element. A miss comes back as the
/// resolution to return.
fn live_element(
    provider: &dyn TreeProvider,
    options: &ResolverOptions,
    snapshot: &ElementSnapshot,
    id: NodeId,
    live_root: &ElementHandle,
) -> Result<Result<ElementHandle, Resolution>, LocatorError> {
    if id == 0 {
        return Ok(Ok(live_root.clone()));
    }
    let projection = XmlProjection::project(snapshot, &options.index_path_root);
    let index_paths: Vec<String> = projection
        .index_paths()
        .iter()
        .filter(|path| projection.node_for(path) == Some(id))
        .cloned()
        .collect();
    let request = ReconcileRequest {
        index_paths: &index_paths,
        projection: &projection,
        snapshot,
        live_root,
        mode: MatchMode::First,
        reverse: false,
    };
    let mut resolution = Reconciler::new(provider, options).reconcile(&request)?;
    match resolution.elements.pop() {
        Some(element) => Ok(Ok(element)),
        None => Ok(Err(resolution)),
    }
}
