//! HTTP adapter
//!
//! Decodes inbound requests into `RequestContext` values and translates
//! deployment outcomes into transport-level responses. No deployment logic
//! lives here.

pub mod health;
pub mod hook;

use axum::Router;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

/// Build the full API router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(health::router())
        .merge(hook::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
