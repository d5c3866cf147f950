//! Deployment trigger endpoint
//!
//! POST /hook - the push-notification entry point. The handler only builds
//! a `RequestContext` from the connection and hands it to the deployer;
//! authorization and everything after it happen in the core.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, State},
    http::HeaderMap,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::request::RequestContext;
use crate::error::DeployResult;
use crate::state::AppState;

/// Trigger response
#[derive(Debug, Serialize)]
pub struct HookResponse {
    pub status: &'static str,
    pub exit_code: Option<i32>,
    pub finished_at: DateTime<Utc>,
}

/// Create the trigger route
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/hook", post(trigger_deploy))
}

/// Trigger a deployment
///
/// POST /hook
/// Authorized by caller address, not by credentials: the deployer checks
/// the resolved address against the allow-list and a rejection comes back
/// as 403.
async fn trigger_deploy(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: String,
) -> DeployResult<impl IntoResponse> {
    let header_pairs = headers
        .iter()
        .map(|(name, value)| (name.as_str(), value.to_str().unwrap_or("")));

    let request = RequestContext::networked(Some(peer.ip().to_string()))
        .with_headers(header_pairs)
        .with_body(body);

    let outcome = state.deployer.deploy(&request).await?;

    Ok(Json(HookResponse {
        status: "success",
        exit_code: outcome.exit_code,
        finished_at: outcome.finished_at,
    }))
}
