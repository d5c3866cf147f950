//! Environment variable configuration loading

use std::env;
use std::path::PathBuf;

use chrono::Utc;

use crate::config::deploy::DeployConfig;
use crate::domain::allowlist::AllowList;
use crate::error::DeployError;
use crate::notify::SmtpConfig;

/// Default listener port.
pub const DEFAULT_PORT: u16 = 9876;

/// Version string baked into health responses.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Agent configuration loaded from the environment.
#[derive(Debug)]
pub struct EnvConfig {
    pub deploy: DeployConfig,
    /// Listener port for `serve`.
    pub port: u16,
    /// Directory for per-run log files. `None` disables file logging.
    pub log_dir: Option<PathBuf>,
    /// SMTP settings. `None` when no host is configured.
    pub smtp: Option<SmtpConfig>,
}

impl EnvConfig {
    /// Load everything from `AUTOPULL_*` variables.
    ///
    /// The directory is required; invalid allow-list ranges are a load-time
    /// error rather than entries that silently never match.
    pub fn from_env() -> Result<Self, DeployError> {
        let directory = env::var("AUTOPULL_DIRECTORY")
            .map_err(|_| DeployError::Config("AUTOPULL_DIRECTORY is required".to_string()))?;

        let mut deploy = DeployConfig::new(directory);

        if let Ok(branch) = env::var("AUTOPULL_BRANCH") {
            deploy.branch = branch;
        }
        if let Ok(remote) = env::var("AUTOPULL_REMOTE") {
            deploy.remote = remote;
        }
        deploy.deploy_user = env::var("AUTOPULL_DEPLOY_USER").ok().filter(|s| !s.is_empty());
        if let Ok(script) = env::var("AUTOPULL_SCRIPT") {
            deploy.script_path = PathBuf::from(script);
        }

        // A full replacement list takes precedence; extra ranges merge onto
        // whatever list is in effect.
        if let Ok(ranges) = env::var("AUTOPULL_ALLOWED_RANGES") {
            deploy.allow_list = AllowList::from_ranges(split_list(&ranges))
                .map_err(|e| DeployError::Config(e.to_string()))?;
        }
        if let Ok(extra) = env::var("AUTOPULL_EXTRA_ALLOWED_RANGES") {
            deploy
                .allow_list
                .extend_ranges(split_list(&extra))
                .map_err(|e| DeployError::Config(e.to_string()))?;
        }

        if let Ok(emails) = env::var("AUTOPULL_NOTIFY_EMAILS") {
            deploy.notify_emails = split_list(&emails).map(str::to_string).collect();
        }
        if let Ok(format) = env::var("AUTOPULL_DATE_FORMAT") {
            deploy.date_format = format;
        }

        deploy.validate()?;

        let port = env::var("AUTOPULL_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let log_dir = env::var("AUTOPULL_LOG_DIR")
            .ok()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        let smtp = match SmtpConfig::from_env() {
            Some(Ok(smtp)) => Some(smtp),
            Some(Err(e)) => return Err(DeployError::Config(e.to_string())),
            None => None,
        };

        if smtp.is_none() && !deploy.notify_emails.is_empty() {
            tracing::warn!(
                "AUTOPULL_NOTIFY_EMAILS is set but AUTOPULL_SMTP_HOST is not; notifications will not be delivered"
            );
        }

        Ok(Self {
            deploy,
            port,
            log_dir,
            smtp,
        })
    }

    /// Per-run log file inside the configured log directory.
    pub fn log_file_path(&self) -> Option<PathBuf> {
        let dir = self.log_dir.as_ref()?;
        Some(dir.join(format!("autopull-{}.log", Utc::now().timestamp())))
    }
}

/// Split a comma-separated variable into trimmed, non-empty items.
fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}
