//! autopull - webhook-triggered deployment agent
//!
//! Runs an external update script (a `git pull` wrapper) when triggered
//! either from the command line or by a push notification from a
//! source-hosting provider. Networked triggers are gated on an IPv4 CIDR
//! allow-list; every run mails its transcript to the configured recipients.

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod infra;
pub mod notify;
pub mod services;
pub mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use state::AppState;

pub use config::DeployConfig;
pub use domain::allowlist::AllowList;
pub use domain::outcome::DeployOutcome;
pub use domain::request::{Origin, RequestContext};
pub use error::DeployError;
pub use services::deploy::Deployer;

/// Bind the listener and serve the webhook API until the process is stopped.
///
/// Served with connect-info so handlers see the peer address - the
/// allow-list falls back to it when no forwarding headers are present.
pub async fn run_server(state: Arc<AppState>, port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(%addr, "Listening for deployment triggers");

    axum::serve(
        listener,
        api::router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
}
