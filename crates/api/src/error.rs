//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use context_store::ContextStoreError;
use placeorder::PlaceOrderError;
use thiserror::Error;

/// API-level error type that maps to HTTP responses.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad request from the client.
    #[error("{0}")]
    BadRequest(String),
    /// Place-order command error.
    #[error(transparent)]
    PlaceOrder(#[from] PlaceOrderError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PlaceOrder(err) => place_order_status(err),
        };
        let message = self.to_string();
        if status.is_server_error() {
            tracing::error!(error = %message, "internal server error");
        }

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn place_order_status(err: &PlaceOrderError) -> StatusCode {
    match err {
        PlaceOrderError::NoPlaceOrderProcess => StatusCode::NOT_FOUND,
        PlaceOrderError::ProcessAlreadyRunning
        | PlaceOrderError::ContextStore(ContextStoreError::ConcurrencyConflict { .. }) => {
            StatusCode::CONFLICT
        }
        PlaceOrderError::InvalidReturnAddress { .. } | PlaceOrderError::InvalidCart(_) => {
            StatusCode::BAD_REQUEST
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
