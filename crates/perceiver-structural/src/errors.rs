use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProviderError {
    #[error("stale element: {0}")]
    StaleElement(String),
    #[error("invalid fixture: {0}")]
    InvalidFixture(String),
    #[error("io error on {path}: {message}")]
    Io { path: String, message: String },
    #[error("internal error: {0}")]
    Internal(String),
}

impl ProviderError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn stale(handle: impl std::fmt::Display) -> Self {
        Self::StaleElement(handle.to_string())
    }
}
