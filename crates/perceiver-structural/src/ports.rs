use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uiloc_core_types::{ElementAttributes, ElementSnapshot};

use crate::errors::ProviderError;
use crate::query::ElementQuery;

/// Opaque reference to a live element. Not stable across tree mutation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementHandle(pub String);

impl ElementHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Access to the live UI tree.
///
/// Implementations perform the actual traversal; callers only compose
/// queries and read snapshots. Query results are in document order.
pub trait TreeProvider: Send + Sync {
    fn root(&self) -> Result<ElementHandle, ProviderError>;

    /// Immutable copy of the subtree rooted at `element`.
    fn snapshot(&self, element: &ElementHandle) -> Result<ElementSnapshot, ProviderError>;

    fn query(&self, query: &ElementQuery) -> Result<Vec<ElementHandle>, ProviderError>;

    /// Fresh attributes of a single element.
    fn capture_attributes(
        &self,
        element: &ElementHandle,
    ) -> Result<ElementAttributes, ProviderError> {
        Ok(self.snapshot(element)?.root().attributes.clone())
    }
}

impl<P> TreeProvider for Arc<P>
where
    P: TreeProvider + ?Sized,
{
    fn root(&self) -> Result<ElementHandle, ProviderError> {
        (**self).root()
    }

    fn snapshot(&self, element: &ElementHandle) -> Result<ElementSnapshot, ProviderError> {
        (**self).snapshot(element)
    }

    fn query(&self, query: &ElementQuery) -> Result<Vec<ElementHandle>, ProviderError> {
        (**self).query(query)
    }

    fn capture_attributes(
        &self,
        element: &ElementHandle,
    ) -> Result<ElementAttributes, ProviderError> {
        (**self).capture_attributes(element)
    }
}
