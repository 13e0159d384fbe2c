//! Class-chain resolution against a live tree
//!
//! The accumulated query and the current root are threaded explicitly
//! through the walk. A positioned step in the middle of the chain resolves
//! to one element immediately and the remaining steps start a fresh query
//! from there.

use perceiver_structural::{ElementHandle, ElementQuery, TreeProvider};
use tracing::debug;
use uiloc_core_types::ElementType;

use crate::class_chain::{ChainQuery, ChainStep};
use crate::errors::LocatorError;
use crate::types::MatchMode;

/// Where a chain walk ended
#[derive(Debug, Clone, PartialEq)]
pub enum ChainTarget {
    /// The last step carried a position
    Indexed(ElementHandle),
    /// Open query over every match of the last step
    Query(ElementQuery),
}

/// Walks class chains over a tree provider
pub struct ChainResolver<'a> {
    provider: &'a dyn TreeProvider,
}

impl<'a> ChainResolver<'a> {
    pub fn new(provider: &'a dyn TreeProvider) -> Self {
        Self { provider }
    }

    /// Resolve a chain to live elements in document order
    pub fn resolve(
        &self,
        root: &ElementHandle,
        chain: &ChainQuery,
        mode: MatchMode,
    ) -> Result<Vec<ElementHandle>, LocatorError> {
        match self.walk(root, chain)? {
            ChainTarget::Indexed(element) => Ok(vec![element]),
            ChainTarget::Query(query) => {
                let found = self.provider.query(&query)?;
                debug!(query = %query, matches = found.len(), "class chain resolved");
                Ok(mode.apply(found))
            }
        }
    }

    /// Composed live query for a chain.
    ///
    /// A terminal position yields the children of the indexed element.
    pub fn query_for(
        &self,
        root: &ElementHandle,
        chain: &ChainQuery,
    ) -> Result<ElementQuery, LocatorError> {
        Ok(match self.walk(root, chain)? {
            ChainTarget::Indexed(element) => ElementQuery::new(element).children(ElementType::ANY),
            ChainTarget::Query(query) => query,
        })
    }

    /// Walk the chain step by step.
    ///
    /// `**` matches zero or more levels, so `**/Button` includes buttons that
    /// are direct children of `root`.
    pub fn walk(
        &self,
        root: &ElementHandle,
        chain: &ChainQuery,
    ) -> Result<ChainTarget, LocatorError> {
        if chain.is_empty() {
            return Err(LocatorError::EmptyChain(chain.to_string()));
        }

        let steps = fold_descendant_markers(&chain.steps);
        let mut query = ElementQuery::new(root.clone());
        let last = steps.len() - 1;

        for (index, step) in steps.iter().enumerate() {
            query = extend(query, step);
            let Some(position) = step.position else {
                continue;
            };
            let matches = self.provider.query(&query)?;
            let element = pick(&matches, position)?;
            debug!(step = %step, position, element = %element, "chain re-rooted");
            if index == last {
                return Ok(ChainTarget::Indexed(element));
            }
            query = ElementQuery::new(element);
        }

        Ok(ChainTarget::Query(query))
    }
}

/// `**` means zero or more levels, so it turns the following step into a
/// descendant step. A trailing `**` stays a descendant step over any type.
fn fold_descendant_markers(steps: &[ChainStep]) -> Vec<ChainStep> {
    let mut folded = Vec::with_capacity(steps.len());
    let mut pending_descendant = false;
    for step in steps {
        if step.is_descendant_marker() {
            pending_descendant = true;
            continue;
        }
        let mut step = step.clone();
        step.is_descendant |= pending_descendant;
        pending_descendant = false;
        folded.push(step);
    }
    if pending_descendant {
        folded.push(ChainStep::descendant_marker());
    }
    folded
}

fn extend(query: ElementQuery, step: &ChainStep) -> ElementQuery {
    let query = if step.is_descendant {
        query.descendants(step.element_type)
    } else {
        query.children(step.element_type)
    };
    match &step.predicate {
        Some(predicate) => query.matching(predicate.clone()),
        None => query,
    }
}

/// 1-based; negative positions count from the end
fn pick(matches: &[ElementHandle], position: i64) -> Result<ElementHandle, LocatorError> {
    let invalid = || LocatorError::InvalidPosition {
        position,
        available: matches.len(),
    };
    let len = i64::try_from(matches.len()).map_err(|_| invalid())?;
    let index = match position {
        0 => return Err(invalid()),
        p if p > 0 => p - 1,
        p => len + p,
    };
    if index < 0 || index >= len {
        return Err(invalid());
    }
    usize::try_from(index)
        .ok()
        .and_then(|i| matches.get(i).cloned())
        .ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class_chain::parse_chain;

    fn handles(n: usize) -> Vec<ElementHandle> {
        (0..n).map(|i| ElementHandle::new(format!("node-{i}"))).collect()
    }

    #[test]
    fn test_pick_positions() {
        let list = handles(3);
        assert_eq!(pick(&list, 1).unwrap(), list[0]);
        assert_eq!(pick(&list, 3).unwrap(), list[2]);
        assert_eq!(pick(&list, -1).unwrap(), list[2]);
        assert_eq!(pick(&list, -3).unwrap(), list[0]);
        assert!(pick(&list, 0).is_err());
        assert!(pick(&list, 4).is_err());
        assert!(pick(&list, -4).is_err());
        assert!(pick(&[], 1).is_err());
    }

    #[test]
    fn test_descendant_marker_folds_into_next_step() {
        let chain = parse_chain("**/Button/**/Cell/**").query;
        let folded = fold_descendant_markers(&chain.steps);
        assert_eq!(folded.len(), 3);
        assert!(folded[0].is_descendant && folded[0].element_type == ElementType::BUTTON);
        assert!(folded[1].is_descendant && folded[1].element_type == ElementType::CELL);
        assert!(folded[2].is_descendant_marker());
    }
}
