//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use context_store::ContextStore;
use serde::Serialize;

use crate::routes::placeorder::AppState;

/// Key probed to check that the context store answers.
const PROBE_KEY: &str = "__health";

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub context_store: &'static str,
}

/// GET /health: reports whether the context store is reachable.
pub async fn check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    match state.coordinator.store().get(PROBE_KEY).await {
        Ok(_) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok",
                context_store: "ok",
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "context store health probe failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "degraded",
                    context_store: "unavailable",
                }),
            )
        }
    }
}
