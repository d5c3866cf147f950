//! Application state

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::EnvConfig;
use crate::error::DeployError;
use crate::notify::{FileLogSink, SmtpMailer};
use crate::services::deploy::Deployer;

/// Shared state for the webhook API.
pub struct AppState {
    pub deployer: Deployer,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Build the state from environment configuration: wire up the file
    /// log sink and the SMTP mailer when they are configured.
    pub fn from_env_config(config: EnvConfig) -> Result<Self, DeployError> {
        let log_file = config.log_file_path();
        let EnvConfig { deploy, smtp, .. } = config;

        tracing::info!(
            directory = %deploy.directory,
            branch = %deploy.branch,
            remote = %deploy.remote,
            deploy_user = ?deploy.deploy_user,
            script = %deploy.script_path.display(),
            allow_list_entries = deploy.allow_list.len(),
            recipients = deploy.notify_emails.len(),
            "Loaded configuration"
        );

        let mut deployer = Deployer::new(deploy)?;

        if let Some(path) = log_file {
            tracing::info!(log_file = %path.display(), "Logging deployments to file");
            deployer = deployer.with_log_sink(Arc::new(FileLogSink::new(path)));
        }

        if let Some(smtp) = smtp {
            let mailer =
                SmtpMailer::new(smtp).map_err(|e| DeployError::Config(e.to_string()))?;
            deployer = deployer.with_mailer(Arc::new(mailer));
        }

        Ok(Self {
            deployer,
            started_at: Utc::now(),
        })
    }
}
