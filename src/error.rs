//! Unified error handling
//!
//! `DeployError` covers every way a deployment can fail; the `IntoResponse`
//! impl translates each kind into the HTTP status the webhook caller sees.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// API error response structure
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Deployment error kinds
///
/// None of these are retried. Every variant reaching the caller has already
/// produced its single notification flush, except `Config` which is raised
/// before a deployment is ever attempted.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// Invalid configuration; raised at construction, deployment never runs.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Networked caller not covered by the allow-list.
    #[error("{address} is not an authorised remote address")]
    Unauthorized { address: String },

    /// Update script exited non-zero or failed to launch.
    #[error("{}", script_failure_message(.exit_code))]
    Script {
        /// `None` when the script could not be launched or was killed by a signal.
        exit_code: Option<i32>,
        /// Combined captured output, or the launch error text.
        output: String,
    },

    /// Post-deploy hook returned an error after a successful deployment.
    #[error("post-deploy hook failed: {source}")]
    Hook {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

fn script_failure_message(exit_code: &Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("deploy script failed with exit code {}", code),
        None => "deploy script failed to launch".to_string(),
    }
}

impl IntoResponse for DeployError {
    fn into_response(self) -> Response {
        let (status, error_type, message, details) = match self {
            DeployError::Config(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "configuration",
                msg,
                None,
            ),
            DeployError::Unauthorized { ref address } => (
                StatusCode::FORBIDDEN,
                "forbidden",
                format!("{} is not an authorised remote address", address),
                None,
            ),
            DeployError::Script { exit_code, output } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "script_failed",
                match exit_code {
                    Some(code) => format!("Deploy script failed with exit code {}", code),
                    None => "Deploy script failed to launch".to_string(),
                },
                Some(output),
            ),
            DeployError::Hook { source } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "hook_failed",
                format!("Post-deploy hook failed: {}", source),
                None,
            ),
        };

        let mut body = ErrorResponse::new(error_type, message);
        if let Some(details) = details {
            body = body.with_details(details);
        }
        (status, Json(body)).into_response()
    }
}

/// Convenience alias
pub type DeployResult<T> = Result<T, DeployError>;
