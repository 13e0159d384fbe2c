//! Shared primitives for the uiloc locator engine.
//!
//! - [`ElementType`]: process-wide type registry (code <-> canonical name)
//! - [`Rect`]: element geometry
//! - [`ElementSnapshot`]: immutable, arena-backed capture of a UI subtree
//! - [`Predicate`]: attribute filter language shared by class-chain steps,
//!   predicate locators and tree providers

pub mod attributes;
pub mod element_type;
pub mod geometry;
pub mod page_source;
pub mod predicate;
pub mod snapshot;

pub use attributes::{AttributeValue, ElementAttributes};
pub use element_type::{code_to_name, ElementType, InvalidTypeName, TYPE_NAME_PREFIX};
pub use geometry::Rect;
pub use page_source::{AccessibilityNode, PageSourceNode};
pub use predicate::{
    AttributeSource, CompareOptions, Comparison, ComparisonOperator, Literal, Predicate,
    PredicateError, StringComparison,
};
pub use snapshot::{ElementSnapshot, NodeId, SnapshotElement, SnapshotError, SnapshotNode};
