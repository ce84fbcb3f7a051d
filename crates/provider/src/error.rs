//! Billing provider error types.

use thiserror::Error;

/// Errors from the billing provider.
///
/// The provider's own error bodies never leave this crate: they are
/// logged at the call site and collapsed into either a not-found signal
/// or a generic request failure.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider reported the referenced entity as missing.
    #[error("{0} not found at billing provider")]
    NotFound(String),

    /// The provider rejected the request for any other reason.
    #[error("billing provider request failed ({status}): {context}")]
    Request { status: u16, context: String },

    /// The request never reached the provider (connect failure, timeout).
    #[error("billing provider transport error: {0}")]
    Transport(String),

    /// The provider's response could not be decoded.
    #[error("billing provider response decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ProviderError {
    /// Returns true when the error maps to a user-facing 404.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::NotFound(_))
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        ProviderError::Transport(err.to_string())
    }
}

/// Convenience type alias for provider results.
pub type Result<T> = std::result::Result<T, ProviderError>;
