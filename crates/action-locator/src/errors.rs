//! Error types for locator system

use perceiver_structural::ProviderError;
use thiserror::Error;

/// Hard resolution failures.
///
/// Soft problems (unknown type names, malformed chain pieces, invalid
/// predicates or XPath, reconciliation misses) are reported as
/// [`crate::Diagnostic`] values next to a best-effort result instead.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LocatorError {
    /// Relative lookup used a strategy that cannot describe a child
    #[error("Unsupported relative locator '{locator}': {reason}")]
    UnsupportedRelativeLocator { locator: String, reason: String },

    /// Class chain without any usable step
    #[error("Empty class chain: '{0}'")]
    EmptyChain(String),

    /// Chain position that does not address an element
    #[error("Invalid position {position} for {available} match(es)")]
    InvalidPosition { position: i64, available: usize },

    /// Tree provider failure
    #[error("Tree provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LocatorError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            LocatorError::Provider(ProviderError::StaleElement(_)) => true,
            LocatorError::InvalidPosition { position, .. } => *position != 0,
            _ => false,
        }
    }

    /// Get error severity (0=low, 1=medium, 2=high, 3=critical)
    pub fn severity(&self) -> u8 {
        match self {
            LocatorError::Internal(_) => 3,
            LocatorError::Provider(_) | LocatorError::UnsupportedRelativeLocator { .. } => 2,
            LocatorError::EmptyChain(_) | LocatorError::InvalidPosition { .. } => 1,
        }
    }
}
