use std::fmt;

use uiloc_core_types::{ElementType, Predicate};

use crate::ports::ElementHandle;

/// One stage of a live query. Each stage maps the current element set to a new one.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryStep {
    /// All descendants of the given type, excluding the elements themselves.
    Descendants(ElementType),
    /// Direct children of the given type.
    Children(ElementType),
    Matching(Predicate),
    /// Exact identifier equality.
    Identifier(String),
    /// Keep elements with at least one matching descendant.
    Containing {
        element_type: ElementType,
        predicate: Predicate,
    },
}

/// Composable live query rooted at one element.
///
/// Builders consume and return the query, so partially built queries can be
/// cloned and extended independently.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementQuery {
    pub root: ElementHandle,
    pub steps: Vec<QueryStep>,
}

impl ElementQuery {
    pub fn new(root: ElementHandle) -> Self {
        Self {
            root,
            steps: Vec::new(),
        }
    }

    pub fn descendants(self, element_type: ElementType) -> Self {
        self.step(QueryStep::Descendants(element_type))
    }

    pub fn children(self, element_type: ElementType) -> Self {
        self.step(QueryStep::Children(element_type))
    }

    pub fn matching(self, predicate: Predicate) -> Self {
        self.step(QueryStep::Matching(predicate))
    }

    pub fn matching_identifier(self, identifier: impl Into<String>) -> Self {
        self.step(QueryStep::Identifier(identifier.into()))
    }

    pub fn containing(self, element_type: ElementType, predicate: Predicate) -> Self {
        self.step(QueryStep::Containing {
            element_type,
            predicate,
        })
    }

    pub fn step(mut self, step: QueryStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl fmt::Display for ElementQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root)?;
        for step in &self.steps {
            match step {
                QueryStep::Descendants(t) => write!(f, ".descendants({})", t.short_name())?,
                QueryStep::Children(t) => write!(f, ".children({})", t.short_name())?,
                QueryStep::Matching(p) => write!(f, ".matching({})", p)?,
                QueryStep::Identifier(id) => write!(f, ".identifier({:?})", id)?,
                QueryStep::Containing {
                    element_type,
                    predicate,
                } => write!(f, ".containing({}, {})", element_type.short_name(), predicate)?,
            }
        }
        Ok(())
    }
}
