//! Place-order command endpoints.
//!
//! Every request names its saga through the `x-session-id` header.

use std::sync::Arc;

use axum::Json;
use axum::extract::{FromRequestParts, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use common::SagaId;
use context_store::ContextStore;
use domain::PlaceOrderInfo;
use placeorder::{PlaceOrderCoordinator, PlaceOrderStatus, StartPlaceOrder, StateData};
use serde::Serialize;

use crate::error::ApiError;

/// Header carrying the caller key.
pub const SESSION_HEADER: &str = "x-session-id";

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub coordinator: PlaceOrderCoordinator<Arc<dyn ContextStore>>,
}

/// Caller key taken from the `x-session-id` header.
#[derive(Debug, Clone)]
pub struct SessionKey(pub String);

impl<S: Send + Sync> FromRequestParts<S> for SessionKey {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(|key| SessionKey(key.to_string()))
            .ok_or_else(|| ApiError::BadRequest(format!("Missing {SESSION_HEADER} header")))
    }
}

// -- Response types --

#[derive(Serialize)]
pub struct StartedResponse {
    pub uuid: SagaId,
}

#[derive(Serialize)]
pub struct ActiveResponse {
    pub active: bool,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub uuid: SagaId,
    pub state: String,
    pub state_data: StateData,
    /// Empty unless the saga failed.
    pub failed_reason: String,
    pub order_info: Option<PlaceOrderInfo>,
}

impl From<PlaceOrderStatus> for StatusResponse {
    fn from(status: PlaceOrderStatus) -> Self {
        Self {
            uuid: status.saga_id,
            failed_reason: status.failed_reason_text(),
            state: status.state,
            state_data: status.state_data,
            order_info: status.order_info,
        }
    }
}

// -- Handlers --

/// PUT /placeorder: start a saga for the caller's cart.
#[tracing::instrument(skip_all, fields(session = %key))]
pub async fn start(
    State(state): State<Arc<AppState>>,
    SessionKey(key): SessionKey,
    Json(command): Json<StartPlaceOrder>,
) -> Result<(StatusCode, Json<StartedResponse>), ApiError> {
    let uuid = state.coordinator.start(&key, command).await?;
    Ok((StatusCode::CREATED, Json(StartedResponse { uuid })))
}

/// GET /placeorder: current status without running the saga.
pub async fn current(
    State(state): State<Arc<AppState>>,
    SessionKey(key): SessionKey,
) -> Result<Json<StatusResponse>, ApiError> {
    let status = state.coordinator.current(&key).await?;
    Ok(Json(status.into()))
}

/// GET /placeorder/active: whether the caller has an unfinished saga.
pub async fn active(
    State(state): State<Arc<AppState>>,
    SessionKey(key): SessionKey,
) -> Result<Json<ActiveResponse>, ApiError> {
    let active = state.coordinator.has_unfinished(&key).await?;
    Ok(Json(ActiveResponse { active }))
}

/// POST /placeorder/refresh: resume the saga.
#[tracing::instrument(skip_all, fields(session = %key))]
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    SessionKey(key): SessionKey,
) -> Result<Json<StatusResponse>, ApiError> {
    let status = state.coordinator.refresh(&key).await?;
    Ok(Json(status.into()))
}

/// POST /placeorder/cancel: cancel and compensate the saga.
#[tracing::instrument(skip_all, fields(session = %key))]
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    SessionKey(key): SessionKey,
) -> Result<Json<bool>, ApiError> {
    state.coordinator.cancel(&key).await?;
    Ok(Json(true))
}

/// DELETE /placeorder: forget the caller's saga.
#[tracing::instrument(skip_all, fields(session = %key))]
pub async fn clear(
    State(state): State<Arc<AppState>>,
    SessionKey(key): SessionKey,
) -> Result<Json<bool>, ApiError> {
    state.coordinator.clear(&key).await?;
    Ok(Json(true))
}
