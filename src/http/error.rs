//! HTTP error envelope
//!
//! Every failure leaves the API as `{ "success": false, "message": ... }`.
//! Client-caused errors keep their message; backend failures are collapsed
//! into generic text and the operator detail goes to the logs only. Vendor
//! error strings never reach end users.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::{error, warn};

use crate::types::ScribeError;

/// Handler-level result alias
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Response-side wrapper around the application error
#[derive(Debug)]
pub struct ApiError(pub ScribeError);

impl From<ScribeError> for ApiError {
    fn from(err: ScribeError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            ScribeError::InvalidRequest(message) => {
                (StatusCode::BAD_REQUEST, message.clone())
            }
            ScribeError::Unauthorized(_) => {
                (StatusCode::UNAUTHORIZED, "Not authenticated".to_string())
            }
            ScribeError::Forbidden(message) => (StatusCode::FORBIDDEN, message.clone()),
            ScribeError::NotFound(message) => (StatusCode::NOT_FOUND, message.clone()),
            ScribeError::Conflict(message) => (StatusCode::CONFLICT, message.clone()),
            ScribeError::NotConfigured(detail) => {
                warn!("Generation unavailable: {}", detail);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "AI processing failed. Please try again later.".to_string(),
                )
            }
            ScribeError::AllBackendsUnavailable { detail } => {
                error!("All generation backends failed: {}", detail);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "AI processing failed. Please try again later.".to_string(),
                )
            }
            ScribeError::Payment(detail) => {
                error!("Payment provider error: {}", detail);
                (
                    StatusCode::BAD_GATEWAY,
                    "Payment processing failed".to_string(),
                )
            }
            other => {
                error!("Internal error: {}", other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred.".to_string(),
                )
            }
        };

        (status, Json(json!({ "success": false, "message": message }))).into_response()
    }
}
