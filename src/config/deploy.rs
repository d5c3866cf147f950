//! Deployment configuration

use std::fmt;
use std::path::PathBuf;

use crate::domain::allowlist::AllowList;
use crate::error::DeployError;

/// Callback invoked once after a successful deployment. A returned error
/// propagates to the caller; it is never silently absorbed.
pub type PostDeployHook =
    Box<dyn Fn() -> Result<(), Box<dyn std::error::Error + Send + Sync>> + Send + Sync>;

/// Everything one `Deployer` needs to know.
pub struct DeployConfig {
    /// Target directory the update script pulls into. Required.
    pub directory: String,
    /// Branch to pull.
    pub branch: String,
    /// Remote to pull from.
    pub remote: String,
    /// Account to run the update script as, via `sudo -u`.
    pub deploy_user: Option<String>,
    /// Update script path.
    pub script_path: PathBuf,
    /// Ranges permitted to trigger networked deployments.
    pub allow_list: AllowList,
    /// Notification recipients. Empty means notifications are disabled.
    pub notify_emails: Vec<String>,
    /// chrono format string for transcript timestamps.
    pub date_format: String,
    /// Optional post-deploy callback.
    pub post_deploy_hook: Option<PostDeployHook>,
}

impl DeployConfig {
    /// A config for `directory` with every other field at its default.
    pub fn new(directory: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            branch: "master".to_string(),
            remote: "origin".to_string(),
            deploy_user: None,
            script_path: Self::default_script_path(),
            allow_list: AllowList::default(),
            notify_emails: Vec::new(),
            date_format: "%Y-%m-%d %H:%M:%S".to_string(),
            post_deploy_hook: None,
        }
    }

    /// `scripts/git-pull.sh` next to the installed executable.
    pub fn default_script_path() -> PathBuf {
        std::env::current_exe()
            .ok()
            .and_then(|exe| Some(exe.parent()?.to_path_buf()))
            .unwrap_or_default()
            .join("scripts/git-pull.sh")
    }

    /// A deployment without a target directory can never run.
    pub fn validate(&self) -> Result<(), DeployError> {
        if self.directory.trim().is_empty() {
            return Err(DeployError::Config(
                "deployment directory must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for DeployConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeployConfig")
            .field("directory", &self.directory)
            .field("branch", &self.branch)
            .field("remote", &self.remote)
            .field("deploy_user", &self.deploy_user)
            .field("script_path", &self.script_path)
            .field("allow_list", &self.allow_list)
            .field("notify_emails", &self.notify_emails)
            .field("date_format", &self.date_format)
            .field("post_deploy_hook", &self.post_deploy_hook.is_some())
            .finish()
    }
}
