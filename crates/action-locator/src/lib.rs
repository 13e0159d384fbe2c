//! Locator resolution engine
//!
//! Turns locator strings into live UI elements:
//! - identifier, name, class-name and predicate lookups as live queries
//! - class-chain paths walked step by step against the live tree
//! - XPath evaluated over a projected snapshot and reconciled back to live elements
//! - parent and sibling lookups relative to a child locator

pub mod chain_resolver;
pub mod class_chain;
pub mod errors;
pub mod projector;
pub mod reconcile;
mod relative;
pub mod resolver;
pub mod strategies;
pub mod types;
pub mod xpath;

pub use chain_resolver::*;
pub use class_chain::*;
pub use errors::*;
pub use projector::*;
pub use reconcile::*;
pub use resolver::*;
pub use strategies::*;
pub use types::*;
pub use xpath::*;
