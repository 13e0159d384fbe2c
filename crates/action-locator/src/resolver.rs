//! Element resolver dispatching locator strings to strategies

use std::sync::Arc;

use perceiver_structural::{ElementHandle, TreeProvider};
use tracing::{debug, info};

use crate::{errors::LocatorError, relative, strategies::*, types::*};

/// Element resolver trait
pub trait ElementResolver: Send + Sync {
    /// Resolve a locator string to live elements in document order
    fn resolve(
        &self,
        locator: &str,
        root: &ElementHandle,
        first_only: bool,
    ) -> Result<Vec<ElementHandle>, LocatorError>;

    /// Resolve a parsed locator, keeping diagnostics
    fn resolve_detailed(
        &self,
        locator: &Locator,
        root: &ElementHandle,
        mode: MatchMode,
    ) -> Result<Resolution, LocatorError>;

    /// Elements matching `parent` that contain an element matching `child`
    fn find_parent(
        &self,
        parent: &Locator,
        child: &Locator,
        root: &ElementHandle,
        mode: MatchMode,
    ) -> Result<Resolution, LocatorError>;

    /// Elements matching `sibling` near the element matching `child`
    fn find_sibling(
        &self,
        child: &Locator,
        sibling: &Locator,
        root: &ElementHandle,
        mode: MatchMode,
    ) -> Result<Resolution, LocatorError>;
}

/// Default element resolver implementation
pub struct DefaultElementResolver {
    provider: Arc<dyn TreeProvider>,
    options: ResolverOptions,
    id_strategy: Arc<IdentifierStrategy>,
    accessibility_strategy: Arc<IdentifierStrategy>,
    identifier_strategy: Arc<IdentifierStrategy>,
    name_strategy: Arc<NameStrategy>,
    class_name_strategy: Arc<ClassNameStrategy>,
    predicate_strategy: Arc<PredicateStrategy>,
    class_chain_strategy: Arc<ClassChainStrategy>,
    xpath_strategy: Arc<XPathStrategy>,
}

impl DefaultElementResolver {
    /// Create a new resolver with all strategies
    pub fn new(provider: Arc<dyn TreeProvider>) -> Self {
        Self::with_options(provider, ResolverOptions::default())
    }

    pub fn with_options(provider: Arc<dyn TreeProvider>, options: ResolverOptions) -> Self {
        Self {
            id_strategy: Arc::new(IdentifierStrategy::new(provider.clone(), LocatorStrategy::Id)),
            accessibility_strategy: Arc::new(IdentifierStrategy::new(
                provider.clone(),
                LocatorStrategy::AccessibilityId,
            )),
            identifier_strategy: Arc::new(IdentifierStrategy::new(
                provider.clone(),
                LocatorStrategy::Identifier,
            )),
            name_strategy: Arc::new(NameStrategy::new(provider.clone())),
            class_name_strategy: Arc::new(ClassNameStrategy::new(provider.clone())),
            predicate_strategy: Arc::new(PredicateStrategy::new(provider.clone())),
            class_chain_strategy: Arc::new(ClassChainStrategy::new(provider.clone())),
            xpath_strategy: Arc::new(XPathStrategy::new(provider.clone(), options.clone())),
            provider,
            options,
        }
    }

    pub fn provider(&self) -> &dyn TreeProvider {
        self.provider.as_ref()
    }

    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    /// Get strategy by type
    fn get_strategy(&self, strategy_type: LocatorStrategy) -> Arc<dyn Strategy> {
        match strategy_type {
            LocatorStrategy::Id => self.id_strategy.clone(),
            LocatorStrategy::AccessibilityId => self.accessibility_strategy.clone(),
            LocatorStrategy::Identifier => self.identifier_strategy.clone(),
            LocatorStrategy::Name => self.name_strategy.clone(),
            LocatorStrategy::ClassName => self.class_name_strategy.clone(),
            LocatorStrategy::Predicate => self.predicate_strategy.clone(),
            LocatorStrategy::ClassChain => self.class_chain_strategy.clone(),
            LocatorStrategy::XPath => self.xpath_strategy.clone(),
        }
    }

    /// Resolve against the provider's root element
    pub fn resolve_from_root(
        &self,
        locator: &str,
        first_only: bool,
    ) -> Result<Vec<ElementHandle>, LocatorError> {
        let root = self.provider.root()?;
        self.resolve(locator, &root, first_only)
    }
}

impl ElementResolver for DefaultElementResolver {
    fn resolve(
        &self,
        locator: &str,
        root: &ElementHandle,
        first_only: bool,
    ) -> Result<Vec<ElementHandle>, LocatorError> {
        let locator = Locator::parse(locator);
        let resolution =
            self.resolve_detailed(&locator, root, MatchMode::from_first_only(first_only))?;
        Ok(resolution.elements)
    }

    fn resolve_detailed(
        &self,
        locator: &Locator,
        root: &ElementHandle,
        mode: MatchMode,
    ) -> Result<Resolution, LocatorError> {
        info!("Resolving element: {}", locator);

        let strategy = self.get_strategy(locator.strategy);
        debug!("Using strategy: {}", strategy.name());
        let resolution = strategy.resolve(&locator.value, root, mode)?;

        info!(
            "Resolved {} to {} element(s) with {} diagnostic(s)",
            locator,
            resolution.len(),
            resolution.diagnostics.len()
        );
        Ok(resolution)
    }

    fn find_parent(
        &self,
        parent: &Locator,
        child: &Locator,
        root: &ElementHandle,
        mode: MatchMode,
    ) -> Result<Resolution, LocatorError> {
        info!("Finding parent {} of {}", parent, child);
        relative::find_parent(self, parent, child, root, mode)
    }

    fn find_sibling(
        &self,
        child: &Locator,
        sibling: &Locator,
        root: &ElementHandle,
        mode: MatchMode,
    ) -> Result<Resolution, LocatorError> {
        info!("Finding sibling {} of {}", sibling, child);
        relative::find_sibling(self, child, sibling, root, mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use perceiver_structural::{InMemoryTree, TreeFixture};
    use uiloc_core_types::{ElementAttributes, ElementType};

    fn resolver() -> DefaultElementResolver {
        let tree = TreeFixture::new(ElementAttributes::new(ElementType::APPLICATION))
            .with_child(TreeFixture::new(
                ElementAttributes::new(ElementType::BUTTON)
                    .with_identifier("login")
                    .with_label("Log in"),
            ))
            .with_child(TreeFixture::new(
                ElementAttributes::new(ElementType::BUTTON).with_label("Help"),
            ));
        DefaultElementResolver::new(Arc::new(InMemoryTree::from_fixture(tree)))
    }

    #[test]
    fn test_every_strategy_is_wired() {
        let resolver = resolver();
        for strategy in [
            LocatorStrategy::Id,
            LocatorStrategy::Name,
            LocatorStrategy::AccessibilityId,
            LocatorStrategy::ClassName,
            LocatorStrategy::Predicate,
            LocatorStrategy::ClassChain,
            LocatorStrategy::XPath,
            LocatorStrategy::Identifier,
        ] {
            assert_eq!(resolver.get_strategy(strategy).strategy_type(), strategy);
        }
    }

    #[test]
    fn test_identifier_fallback_and_prefixes() {
        let resolver = resolver();
        let by_id = resolver.resolve_from_root("id=login", false).unwrap();
        let bare = resolver.resolve_from_root("login", false).unwrap();
        let accessibility = resolver.resolve_from_root("accessibility id=login", false).unwrap();
        assert_eq!(by_id.len(), 1);
        assert_eq!(by_id, bare);
        assert_eq!(by_id, accessibility);
    }

    #[test]
    fn test_name_uses_label_when_identifier_is_empty() {
        let resolver = resolver();
        assert_eq!(resolver.resolve_from_root("name=Help", false).unwrap().len(), 1);
        assert_eq!(resolver.resolve_from_root("name=login", false).unwrap().len(), 1);
        assert!(resolver.resolve_from_root("name=Log in", false).unwrap().is_empty());
    }

    #[test]
    fn test_first_only_truncates() {
        let resolver = resolver();
        let all = resolver
            .resolve_from_root("class-name=XCUIElementTypeButton", false)
            .unwrap();
        let first = resolver
            .resolve_from_root("class-name=XCUIElementTypeButton", true)
            .unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(first, all[..1].to_vec());
    }

    #[test]
    fn test_soft_failures_become_diagnostics() {
        let resolver = resolver();
        let root = resolver.provider().root().unwrap();

        let resolution = resolver
            .resolve_detailed(&Locator::parse("class-name=Gizmo"), &root, MatchMode::All)
            .unwrap();
        assert_eq!(resolution.len(), 2);
        assert!(matches!(
            resolution.diagnostics[0],
            Diagnostic::InvalidTypeName { .. }
        ));

        let resolution = resolver
            .resolve_detailed(&Locator::parse("predicate=label =="), &root, MatchMode::All)
            .unwrap();
        assert!(resolution.is_empty());
        assert!(matches!(
            resolution.diagnostics[0],
            Diagnostic::InvalidPredicate { .. }
        ));

        let resolution = resolver
            .resolve_detailed(&Locator::parse("xpath=//["), &root, MatchMode::All)
            .unwrap();
        assert!(resolution.is_empty());
        assert!(matches!(
            resolution.diagnostics[0],
            Diagnostic::InvalidXPath { .. }
        ));
    }
}
