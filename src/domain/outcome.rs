//! Deployment outcome

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Result of one update-script run. Immutable once created; at most one is
/// produced per deployment.
#[derive(Debug, Clone, Serialize)]
pub struct DeployOutcome {
    /// Script exit code. `None` when the script failed to launch or was
    /// killed by a signal.
    pub exit_code: Option<i32>,
    /// Combined stdout/stderr transcript, or the launch error text.
    pub output: String,
    /// True only for exit code 0.
    pub success: bool,
    pub finished_at: DateTime<Utc>,
}

impl DeployOutcome {
    pub fn completed(exit_code: Option<i32>, output: String) -> Self {
        Self {
            exit_code,
            output,
            success: exit_code == Some(0),
            finished_at: Utc::now(),
        }
    }

    /// The script never ran; the launch error becomes the captured output.
    pub fn launch_failure(error: impl std::fmt::Display) -> Self {
        Self {
            exit_code: None,
            output: error.to_string(),
            success: false,
            finished_at: Utc::now(),
        }
    }
}
