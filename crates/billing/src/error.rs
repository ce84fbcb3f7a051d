//! Billing error taxonomy.

use domain::StoreError;
use provider::ProviderError;
use thiserror::Error;

/// Errors surfaced by the orchestration core.
///
/// Every failure maps to a structured status + message at the API
/// boundary; raw provider or database errors never leak to callers.
#[derive(Debug, Error)]
pub enum BillingError {
    /// Malformed or out-of-range request fields (400).
    #[error("{0}")]
    Validation(String),

    /// Account, product, plan or coupon absent (404).
    #[error("{0}")]
    NotFound(String),

    /// Coupon past its expiration policy (400).
    #[error("{0}")]
    Expired(String),

    /// Remapped billing provider failure (404 for the provider's own
    /// not-found signal, 400 for any other classified response).
    #[error(transparent)]
    Provider(ProviderError),

    /// Unexpected failure: store errors, malformed stored data, a
    /// sellable product unexpectedly missing (500).
    #[error("{0}")]
    Internal(String),
}

impl BillingError {
    /// Returns the HTTP status this error maps to.
    pub fn http_status(&self) -> u16 {
        match self {
            BillingError::Validation(_) | BillingError::Expired(_) => 400,
            BillingError::NotFound(_) => 404,
            BillingError::Provider(err) => match err {
                ProviderError::NotFound(_) => 404,
                ProviderError::Request { .. } => 400,
                // The provider never classified these; they are
                // unexpected exceptions, not provider verdicts.
                ProviderError::Transport(_) | ProviderError::Decode(_) => 500,
            },
            BillingError::Internal(_) => 500,
        }
    }
}

impl From<ProviderError> for BillingError {
    fn from(err: ProviderError) -> Self {
        BillingError::Provider(err)
    }
}

impl From<StoreError> for BillingError {
    fn from(err: StoreError) -> Self {
        BillingError::Internal(err.to_string())
    }
}

impl From<cache::CacheError> for BillingError {
    fn from(err: cache::CacheError) -> Self {
        BillingError::Internal(err.to_string())
    }
}

/// Convenience type alias for billing results.
pub type Result<T> = std::result::Result<T, BillingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_http_statuses() {
        assert_eq!(BillingError::Validation("bad index".into()).http_status(), 400);
        assert_eq!(BillingError::NotFound("account".into()).http_status(), 404);
        assert_eq!(BillingError::Expired("coupon".into()).http_status(), 400);
        assert_eq!(BillingError::Internal("boom".into()).http_status(), 500);
    }

    #[test]
    fn provider_not_found_maps_to_404_everything_else_400() {
        assert_eq!(
            BillingError::from(ProviderError::NotFound("plan".into())).http_status(),
            404
        );
        assert_eq!(
            BillingError::from(ProviderError::Request {
                status: 422,
                context: "wallet".into()
            })
            .http_status(),
            400
        );
    }

    #[test]
    fn unclassified_provider_failures_are_internal() {
        assert_eq!(
            BillingError::from(ProviderError::Transport("connection reset".into()))
                .http_status(),
            500
        );
    }

    #[test]
    fn store_errors_are_internal() {
        let err = BillingError::from(StoreError::Backend("db down".into()));
        assert_eq!(err.http_status(), 500);
    }
}
