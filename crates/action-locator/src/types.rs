//! Core types for locator system

use std::fmt;

use perceiver_structural::ElementHandle;
use serde::{Deserialize, Serialize};
use uiloc_core_types::InvalidTypeName;

/// Locator strategy enumeration
///
/// Every locator string is parsed into exactly one strategy. Strings without
/// a recognized `<strategy>=` prefix become [`LocatorStrategy::Identifier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LocatorStrategy {
    /// `id=`: identifier equality
    Id,

    /// `name=`: derived name equality
    Name,

    /// `accessibility id=`: identifier equality
    AccessibilityId,

    /// `class-name=`: every descendant of a type
    ClassName,

    /// `predicate=`: descendants filtered by a predicate expression
    Predicate,

    /// `class-chain=`: compact path query
    ClassChain,

    /// `xpath=`: XPath over a snapshot, reconciled to live elements
    #[serde(rename = "xpath")]
    XPath,

    /// No prefix: the whole string is an identifier
    Identifier,
}

impl LocatorStrategy {
    /// Get strategy name as string
    pub fn name(&self) -> &'static str {
        match self {
            LocatorStrategy::Id => "id",
            LocatorStrategy::Name => "name",
            LocatorStrategy::AccessibilityId => "accessibility id",
            LocatorStrategy::ClassName => "class-name",
            LocatorStrategy::Predicate => "predicate",
            LocatorStrategy::ClassChain => "class-chain",
            LocatorStrategy::XPath => "xpath",
            LocatorStrategy::Identifier => "identifier",
        }
    }

    /// Recognized `<prefix>=` keys, in match order
    fn prefixes() -> &'static [(&'static str, LocatorStrategy)] {
        &[
            ("id", LocatorStrategy::Id),
            ("name", LocatorStrategy::Name),
            ("accessibility id", LocatorStrategy::AccessibilityId),
            ("accessibility-id", LocatorStrategy::AccessibilityId),
            ("class-name", LocatorStrategy::ClassName),
            ("predicate", LocatorStrategy::Predicate),
            ("class-chain", LocatorStrategy::ClassChain),
            ("xpath", LocatorStrategy::XPath),
        ]
    }

    /// Strategies a relative lookup accepts for its child locator
    pub fn describes_single_element(&self) -> bool {
        matches!(
            self,
            LocatorStrategy::Id
                | LocatorStrategy::Name
                | LocatorStrategy::AccessibilityId
                | LocatorStrategy::Predicate
                | LocatorStrategy::Identifier
        )
    }
}

/// Parsed locator string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    pub strategy: LocatorStrategy,
    pub value: String,
}

impl Locator {
    pub fn new(strategy: LocatorStrategy, value: impl Into<String>) -> Self {
        Self {
            strategy,
            value: value.into(),
        }
    }

    /// Parse `<strategy>=<value>`. Keys are case-sensitive.
    pub fn parse(raw: &str) -> Self {
        for (prefix, strategy) in LocatorStrategy::prefixes() {
            if let Some(value) = raw
                .strip_prefix(prefix)
                .and_then(|rest| rest.strip_prefix('='))
            {
                return Self::new(*strategy, value);
            }
        }
        Self::new(LocatorStrategy::Identifier, raw)
    }

    /// Substitute `%@` / `%d` placeholders in order, then parse.
    ///
    /// Surplus arguments are ignored; placeholders without an argument stay as written.
    pub fn format<T: fmt::Display>(template: &str, args: &[T]) -> Self {
        let mut out = String::with_capacity(template.len());
        let mut args = args.iter();
        let mut rest = template;
        while let Some(at) = rest.find('%') {
            out.push_str(&rest[..at]);
            let tail = &rest[at..];
            let placeholder = tail.starts_with("%@") || tail.starts_with("%d");
            match (placeholder, placeholder.then(|| args.next()).flatten()) {
                (true, Some(arg)) => out.push_str(&arg.to_string()),
                (true, None) => out.push_str(&tail[..2]),
                (false, _) => out.push('%'),
            }
            rest = if placeholder { &tail[2..] } else { &tail[1..] };
        }
        out.push_str(rest);
        Self::parse(&out)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.strategy {
            LocatorStrategy::Identifier => f.write_str(&self.value),
            other => write!(f, "{}={}", other.name(), self.value),
        }
    }
}

impl From<&str> for Locator {
    fn from(raw: &str) -> Self {
        Locator::parse(raw)
    }
}

/// How many matches the caller wants
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    First,
    #[default]
    All,
}

impl MatchMode {
    pub fn from_first_only(first_only: bool) -> Self {
        if first_only {
            MatchMode::First
        } else {
            MatchMode::All
        }
    }

    pub fn is_first(&self) -> bool {
        matches!(self, MatchMode::First)
    }

    /// Apply the mode to an ordered result list
    pub fn apply<T>(&self, mut items: Vec<T>) -> Vec<T> {
        if self.is_first() {
            items.truncate(1);
        }
        items
    }
}

/// Recoverable problem met while resolving
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Unknown type token; the wildcard type was used instead
    InvalidTypeName { name: String },

    /// Chain piece that could not be used and was skipped
    MalformedChainQuery { token: String, reason: String },

    /// Predicate that failed to parse; the lookup matched nothing
    InvalidPredicate { expression: String, reason: String },

    /// XPath that failed to evaluate; the lookup matched nothing
    InvalidXPath { expression: String, reason: String },

    /// Snapshot match without a live counterpart; the match was dropped
    ReconciliationMiss {
        index_path: String,
        element_type: String,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::InvalidTypeName { name } => {
                write!(f, "'{}' is not a valid element type name", name)
            }
            Diagnostic::MalformedChainQuery { token, reason } => {
                write!(f, "malformed chain token '{}': {}", token, reason)
            }
            Diagnostic::InvalidPredicate { expression, reason } => {
                write!(f, "invalid predicate '{}': {}", expression, reason)
            }
            Diagnostic::InvalidXPath { expression, reason } => {
                write!(f, "invalid xpath '{}': {}", expression, reason)
            }
            Diagnostic::ReconciliationMiss {
                index_path,
                element_type,
            } => write!(
                f,
                "no live element matches snapshot node {} ({})",
                index_path, element_type
            ),
        }
    }
}

impl From<InvalidTypeName> for Diagnostic {
    fn from(err: InvalidTypeName) -> Self {
        Diagnostic::InvalidTypeName { name: err.name }
    }
}

/// Resolution outcome: live elements plus any diagnostics raised on the way
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    /// Matches in document order
    pub elements: Vec<ElementHandle>,

    pub diagnostics: Vec<Diagnostic>,
}

impl Resolution {
    pub fn new(elements: Vec<ElementHandle>) -> Self {
        Self {
            elements,
            diagnostics: Vec::new(),
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: Vec<Diagnostic>) -> Self {
        self.diagnostics.extend(diagnostics);
        self
    }

    pub fn push_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn first(&self) -> Option<&ElementHandle> {
        self.elements.first()
    }
}

/// Tunables for snapshot reconciliation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverOptions {
    /// Index path of the snapshot root in projected XML
    pub index_path_root: String,

    /// Scan live candidates back to front when an XPath uses `last()`
    pub reverse_on_last: bool,

    /// Map each live element to at most one snapshot match
    pub claim_unique: bool,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            index_path_root: "top".to_string(),
            reverse_on_last: true,
            claim_unique: true,
        }
    }
}

impl ResolverOptions {
    pub fn with_index_path_root(mut self, root: impl Into<String>) -> Self {
        self.index_path_root = root.into();
        self
    }

    pub fn with_reverse_on_last(mut self, enabled: bool) -> Self {
        self.reverse_on_last = enabled;
        self
    }

    pub fn with_claim_unique(mut self, enabled: bool) -> Self {
        self.claim_unique = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_prefixes() {
        let cases = [
            ("id=login", LocatorStrategy::Id, "login"),
            ("name=OK", LocatorStrategy::Name, "OK"),
            ("accessibility id=close", LocatorStrategy::AccessibilityId, "close"),
            ("class-name=XCUIElementTypeButton", LocatorStrategy::ClassName, "XCUIElementTypeButton"),
            ("predicate=label == 'a=b'", LocatorStrategy::Predicate, "label == 'a=b'"),
            ("class-chain=**/Cell[2]", LocatorStrategy::ClassChain, "**/Cell[2]"),
            ("xpath=//XCUIElementTypeButton[@name='x']", LocatorStrategy::XPath, "//XCUIElementTypeButton[@name='x']"),
        ];
        for (raw, strategy, value) in cases {
            let locator = Locator::parse(raw);
            assert_eq!(locator.strategy, strategy, "{raw}");
            assert_eq!(locator.value, value);
            assert_eq!(locator.to_string(), raw);
        }
    }

    #[test]
    fn test_unrecognized_prefix_is_identifier() {
        for raw in ["login_button", "ID=login", "css=.btn", "idx=3", ""] {
            let locator = Locator::parse(raw);
            assert_eq!(locator.strategy, LocatorStrategy::Identifier);
            assert_eq!(locator.value, raw);
        }
    }

    #[test]
    fn test_format_placeholders() {
        let locator = Locator::format("predicate=label == '%@' AND value == '%@'", &["Row", "7"]);
        assert_eq!(locator.value, "label == 'Row' AND value == '7'");

        let locator = Locator::format("class-chain=**/Cell[%d]", &[3]);
        assert_eq!(locator.value, "**/Cell[3]");

        let locator = Locator::format::<&str>("id=100% %@", &[]);
        assert_eq!(locator.value, "100% %@");
    }

    #[test]
    fn test_match_mode_truncates() {
        assert_eq!(MatchMode::First.apply(vec![1, 2, 3]), vec![1]);
        assert_eq!(MatchMode::All.apply(vec![1, 2, 3]), vec![1, 2, 3]);
    }

    #[test]
    fn test_options_fill_missing_fields() {
        let options: ResolverOptions = serde_yaml::from_str("reverse_on_last: false").unwrap();
        assert_eq!(
            options,
            ResolverOptions::default().with_reverse_on_last(false)
        );
        assert_eq!(options.index_path_root, "top");
    }

    #[test]
    fn test_diagnostic_serializes_with_kind() {
        let diagnostic = Diagnostic::InvalidTypeName {
            name: "Gizmo".into(),
        };
        let json = serde_json::to_value(&diagnostic).unwrap();
        assert_eq!(json["kind"], "invalid_type_name");
    }
}
