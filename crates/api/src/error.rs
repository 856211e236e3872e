//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::OrderError;
use order_store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Order placement or lookup failed.
    Order(OrderError),
    /// The order did not finish within the configured timeout.
    Timeout,
    /// Internal server error.
    Internal(String),
}

impl ApiError {
    fn status_and_message(self) -> (StatusCode, String, bool) {
        match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, false),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, false),
            ApiError::Order(err) => order_error_to_response(err),
            ApiError::Timeout => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Order timed out".to_string(),
                true,
            ),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg, false)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, retryable) = self.status_and_message();
        let body = serde_json::json!({ "error": message, "retryable": retryable });
        (status, axum::Json(body)).into_response()
    }
}

fn order_error_to_response(err: OrderError) -> (StatusCode, String, bool) {
    let retryable = err.is_retryable();
    let status = match &err {
        OrderError::Validation(_) => StatusCode::BAD_REQUEST,
        OrderError::InsufficientStock { .. } => StatusCode::CONFLICT,
        OrderError::Transaction(StoreError::ProductNotFound(_)) => StatusCode::NOT_FOUND,
        _ if retryable => StatusCode::SERVICE_UNAVAILABLE,
        _ => {
            tracing::error!(error = %err, "order failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, err.to_string(), retryable)
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        ApiError::Order(err)
    }
}
