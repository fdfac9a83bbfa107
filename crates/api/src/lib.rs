//! HTTP API server with observability for the checkout engine.
//!
//! Exposes checkout, order, and product availability endpoints over the
//! `checkout` crate, with structured logging (tracing) and Prometheus
//! metrics. Callers identify themselves with `x-user-id` and `x-user-role`.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use error::ApiError;
pub use state::{AppState, build_state, create_default_state};

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/checkout", post(routes::checkout::create))
        .route("/orders/{id}", get(routes::orders::get))
        .route("/orders/{id}/history", get(routes::orders::history))
        .route("/orders/{id}/status", post(routes::orders::update_status))
        .route(
            "/customers/{id}/orders",
            get(routes::orders::list_for_customer),
        )
        .route("/products", get(routes::products::list))
        .route("/products/{id}", put(routes::products::update))
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
