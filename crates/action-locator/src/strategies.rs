//! Element resolution strategies
//!
//! One strategy per locator prefix:
//! 1. Identifier - `id=`, `accessibility id=` and bare strings
//! 2. Name - derived name equality
//! 3. ClassName - every descendant of a registered type
//! 4. Predicate - descendants filtered by a predicate expression
//! 5. ClassChain - compact path queries
//! 6. XPath - snapshot projection, matching and reconciliation

use std::sync::Arc;

use perceiver_structural::{ElementHandle, ElementQuery, TreeProvider};
use tracing::{debug, warn};
use uiloc_core_types::{ElementType, Predicate};

use crate::chain_resolver::ChainResolver;
use crate::class_chain::parse_chain;
use crate::errors::LocatorError;
use crate::projector::XmlProjection;
use crate::reconcile::{ReconcileRequest, Reconciler};
use crate::types::*;
use crate::xpath::{match_index_paths, uses_last};

/// Strategy trait for element resolution
pub trait Strategy: Send + Sync {
    /// Resolve `value` under `root`
    fn resolve(
        &self,
        value: &str,
        root: &ElementHandle,
        mode: MatchMode,
    ) -> Result<Resolution, LocatorError>;

    /// Get strategy type
    fn strategy_type(&self) -> LocatorStrategy;

    /// Get strategy name
    fn name(&self) -> &'static str {
        self.strategy_type().name()
    }
}

/// Run a live query and apply the match mode
fn run_query(
    provider: &dyn TreeProvider,
    query: &ElementQuery,
    mode: MatchMode,
) -> Result<Resolution, LocatorError> {
    let found = provider.query(query)?;
    Ok(Resolution::new(mode.apply(found)))
}

/// Identifier equality over every descendant
pub struct IdentifierStrategy {
    provider: Arc<dyn TreeProvider>,
    strategy: LocatorStrategy,
}

impl IdentifierStrategy {
    pub fn new(provider: Arc<dyn TreeProvider>, strategy: LocatorStrategy) -> Self {
        Self { provider, strategy }
    }
}

impl Strategy for IdentifierStrategy {
    fn resolve(
        &self,
        value: &str,
        root: &ElementHandle,
        mode: MatchMode,
    ) -> Result<Resolution, LocatorError> {
        debug!("Resolving identifier: {}", value);
        let query = ElementQuery::new(root.clone())
            .descendants(ElementType::ANY)
            .matching_identifier(value);
        run_query(self.provider.as_ref(), &query, mode)
    }

    fn strategy_type(&self) -> LocatorStrategy {
        self.strategy
    }
}

/// Derived name equality
pub struct NameStrategy {
    provider: Arc<dyn TreeProvider>,
}

impl NameStrategy {
    pub fn new(provider: Arc<dyn TreeProvider>) -> Self {
        Self { provider }
    }
}

impl Strategy for NameStrategy {
    fn resolve(
        &self,
        value: &str,
        root: &ElementHandle,
        mode: MatchMode,
    ) -> Result<Resolution, LocatorError> {
        debug!("Resolving name: {}", value);
        let predicate = Predicate::equals("name", value)
            .map_err(|err| LocatorError::Internal(err.to_string()))?;
        let query = ElementQuery::new(root.clone())
            .descendants(ElementType::ANY)
            .matching(predicate);
        run_query(self.provider.as_ref(), &query, mode)
    }

    fn strategy_type(&self) -> LocatorStrategy {
        LocatorStrategy::Name
    }
}

/// Every descendant of one type
pub struct ClassNameStrategy {
    provider: Arc<dyn TreeProvider>,
}

impl ClassNameStrategy {
    pub fn new(provider: Arc<dyn TreeProvider>) -> Self {
        Self { provider }
    }
}

impl Strategy for ClassNameStrategy {
    fn resolve(
        &self,
        value: &str,
        root: &ElementHandle,
        mode: MatchMode,
    ) -> Result<Resolution, LocatorError> {
        let mut diagnostics = Vec::new();
        let element_type = match ElementType::lookup(value) {
            Ok(element_type) => element_type,
            Err(err) => {
                warn!("{}; using {}", err, ElementType::ANY.name());
                diagnostics.push(Diagnostic::from(err));
                ElementType::ANY
            }
        };
        debug!("Resolving class name: {}", element_type);
        let query = ElementQuery::new(root.clone()).descendants(element_type);
        Ok(run_query(self.provider.as_ref(), &query, mode)?.with_diagnostics(diagnostics))
    }

    fn strategy_type(&self) -> LocatorStrategy {
        LocatorStrategy::ClassName
    }
}

/// Descendants filtered by a predicate expression
pub struct PredicateStrategy {
    provider: Arc<dyn TreeProvider>,
}

impl PredicateStrategy {
    pub fn new(provider: Arc<dyn TreeProvider>) -> Self {
        Self { provider }
    }
}

impl Strategy for PredicateStrategy {
    fn resolve(
        &self,
        value: &str,
        root: &ElementHandle,
        mode: MatchMode,
    ) -> Result<Resolution, LocatorError> {
        let predicate = match Predicate::parse(value) {
            Ok(predicate) => predicate,
            Err(err) => {
                let diagnostic = Diagnostic::InvalidPredicate {
                    expression: value.to_string(),
                    reason: err.to_string(),
                };
                warn!("{}", diagnostic);
                return Ok(Resolution::default().with_diagnostics(vec![diagnostic]));
            }
        };
        debug!("Resolving predicate: {}", predicate);
        let query = ElementQuery::new(root.clone())
            .descendants(ElementType::ANY)
            .matching(predicate);
        run_query(self.provider.as_ref(), &query, mode)
    }

    fn strategy_type(&self) -> LocatorStrategy {
        LocatorStrategy::Predicate
    }
}

/// Class-chain queries
pub struct ClassChainStrategy {
    provider: Arc<dyn TreeProvider>,
}

impl ClassChainStrategy {
    pub fn new(provider: Arc<dyn TreeProvider>) -> Self {
        Self { provider }
    }
}

impl Strategy for ClassChainStrategy {
    fn resolve(
        &self,
        value: &str,
        root: &ElementHandle,
        mode: MatchMode,
    ) -> Result<Resolution, LocatorError> {
        let parsed = parse_chain(value);
        let elements = ChainResolver::new(self.provider.as_ref()).resolve(root, &parsed.query, mode)?;
        Ok(Resolution::new(elements).with_diagnostics(parsed.diagnostics))
    }

    fn strategy_type(&self) -> LocatorStrategy {
        LocatorStrategy::ClassChain
    }
}

/// XPath over a snapshot, reconciled back to live elements
pub struct XPathStrategy {
    provider: Arc<dyn TreeProvider>,
    options: ResolverOptions,
}

impl XPathStrategy {
    pub fn new(provider: Arc<dyn TreeProvider>, options: ResolverOptions) -> Self {
        Self { provider, options }
    }
}

impl Strategy for XPathStrategy {
    fn resolve(
        &self,
        value: &str,
        root: &ElementHandle,
        mode: MatchMode,
    ) -> Result<Resolution, LocatorError> {
        let snapshot = self.provider.snapshot(root)?;
        let projection = XmlProjection::project(&snapshot, &self.options.index_path_root);
        let index_paths = match match_index_paths(&projection, value) {
            Ok(paths) => paths,
            Err(failure) => {
                let diagnostic = Diagnostic::InvalidXPath {
                    expression: failure.expression,
                    reason: failure.reason,
                };
                warn!("{}", diagnostic);
                return Ok(Resolution::default().with_diagnostics(vec![diagnostic]));
            }
        };
        debug!("XPath {} matched {} snapshot node(s)", value, index_paths.len());

        let request = ReconcileRequest {
            index_paths: &index_paths,
            projection: &projection,
            snapshot: &snapshot,
            live_root: root,
            mode,
            reverse: self.options.reverse_on_last && uses_last(value),
        };
        Reconciler::new(self.provider.as_ref(), &self.options).reconcile(&request)
    }

    fn strategy_type(&self) -> LocatorStrategy {
        LocatorStrategy::XPath
    }
}
