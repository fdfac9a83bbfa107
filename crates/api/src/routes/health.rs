//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub indexed_products: usize,
    pub queued_notifications: usize,
}

/// GET /health: reports liveness plus index and queue sizes.
pub async fn check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        indexed_products: state.index.len(),
        queued_notifications: state.notifications.len(),
    })
}
