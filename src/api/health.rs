//! Health check API

use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;

use crate::config::env::VERSION;
use crate::state::AppState;

/// Health check response
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    timestamp: String,
    started_at: String,
    directory: String,
    branch: String,
    remote: String,
}

/// Create the health check route
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health_check))
}

/// GET /health
async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let config = state.deployer.config();

    Json(HealthResponse {
        status: "ok",
        service: "autopull",
        version: VERSION,
        timestamp: chrono::Utc::now().to_rfc3339(),
        started_at: state.started_at.to_rfc3339(),
        directory: config.directory.clone(),
        branch: config.branch.clone(),
        remote: config.remote.clone(),
    })
}
