//! HTTP API server for the place-order saga.
//!
//! Exposes the Start, Refresh and Cancel commands keyed by the caller's
//! session, with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use context_store::ContextStore;
use metrics_exporter_prometheus::PrometheusHandle;
use placeorder::{
    CoordinatorConfig, FAKE_GATEWAY_CODE, FakePaymentGateway, InMemoryCartService,
    InMemoryOrderService, PaymentService, PlaceOrderCoordinator, PlaceOrderServices,
    ProcessFactory, RegistryError, default_registry,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::placeorder::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/placeorder",
            get(routes::placeorder::current)
                .put(routes::placeorder::start)
                .delete(routes::placeorder::clear),
        )
        .route("/placeorder/active", get(routes::placeorder::active))
        .route("/placeorder/refresh", post(routes::placeorder::refresh))
        .route("/placeorder/cancel", post(routes::placeorder::cancel))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the default application state over `store`.
///
/// Orders and carts are in-memory, and payments go through a
/// [`FakePaymentGateway`] registered as `fake_payment_gateway` whose payment
/// method code picks the scripted outcome.
pub fn create_default_state(
    store: Arc<dyn ContextStore>,
    config: CoordinatorConfig,
) -> Result<Arc<AppState>, RegistryError> {
    let payments = PaymentService::new()
        .with_gateway(FAKE_GATEWAY_CODE, Arc::new(FakePaymentGateway::new()));
    let services = PlaceOrderServices::new(
        Arc::new(payments),
        Arc::new(InMemoryOrderService::new()),
        Arc::new(InMemoryCartService::new()),
    );
    let registry = Arc::new(default_registry(&services)?);
    let coordinator =
        PlaceOrderCoordinator::with_config(store, ProcessFactory::new(registry), config);

    Ok(Arc::new(AppState { coordinator }))
}
