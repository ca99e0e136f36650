//! Health check endpoint

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
    /// Currently registered push channels
    pub listeners: usize,
}

/// GET /health
///
/// Does NOT require authentication.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "radiocast-server".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        listeners: state.broadcaster.channel_count(),
    })
}
