//! API error type with HTTP response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use billing::BillingError;

/// API-level error wrapping the billing taxonomy.
///
/// Every failure renders as `{"error": message}` with the status the
/// taxonomy prescribes: validation and expired coupons 400, missing
/// entities 404, remapped provider responses 400/404, everything
/// unexpected 500.
#[derive(Debug)]
pub struct ApiError(pub BillingError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self.0, "internal server error");
            // Internal details stay in the logs.
            "Something went wrong".to_string()
        } else {
            self.0.to_string()
        };

        let body = serde_json::json!({ "error": message });
        (status, Json(body)).into_response()
    }
}

impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        ApiError(err)
    }
}
