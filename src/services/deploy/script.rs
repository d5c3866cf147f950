//! Update-script invocation
//!
//! Builds the argument vector for the external update script and runs it,
//! capturing combined output and exit status. The script contract: called
//! as `<script> -b <branch> -d <directory> -r <remote>`, exits 0 on
//! success, writes diagnostics to stdout/stderr.

use std::path::PathBuf;

use crate::config::DeployConfig;
use crate::domain::outcome::DeployOutcome;
use crate::infra::{CommandError, CommandRunner};

/// Runs the external update script.
pub struct ScriptRunner {
    script_path: PathBuf,
    deploy_user: Option<String>,
}

impl ScriptRunner {
    pub fn from_config(config: &DeployConfig) -> Self {
        Self {
            script_path: config.script_path.clone(),
            deploy_user: config.deploy_user.clone(),
        }
    }

    /// The argv for one invocation: program plus arguments, each value a
    /// distinct element. With a deploy user configured the whole call is
    /// wrapped in `sudo -u <user>`.
    pub fn command_line(&self, branch: &str, directory: &str, remote: &str) -> (String, Vec<String>) {
        let script = self.script_path.to_string_lossy().to_string();
        let script_args = [
            "-b".to_string(),
            branch.to_string(),
            "-d".to_string(),
            directory.to_string(),
            "-r".to_string(),
            remote.to_string(),
        ];

        match &self.deploy_user {
            Some(user) => {
                let mut args = vec!["-u".to_string(), user.clone(), script];
                args.extend(script_args);
                ("sudo".to_string(), args)
            }
            None => (script, script_args.to_vec()),
        }
    }

    /// Run the script and block until it exits. A launch failure is a
    /// failed outcome with the error text as the captured output, never a
    /// panic or a separate error path.
    pub async fn run(&self, branch: &str, directory: &str, remote: &str) -> DeployOutcome {
        let (program, args) = self.command_line(branch, directory, remote);

        tracing::info!(%program, ?args, "Running update script");

        match CommandRunner::run_captured(&program, &args).await {
            Ok(run) => DeployOutcome::completed(run.status.code(), run.output),
            Err(error @ CommandError::SpawnFailed(_)) => {
                tracing::error!(%error, script = %self.script_path.display(), "Update script failed to launch");
                DeployOutcome::launch_failure(error)
            }
            Err(error) => {
                tracing::error!(%error, "Update script wait failed");
                DeployOutcome::launch_failure(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;

    fn runner(script: &str, user: Option<&str>) -> ScriptRunner {
        ScriptRunner {
            script_path: PathBuf::from(script),
            deploy_user: user.map(str::to_string),
        }
    }

    /// Write an executable script into `dir` and return its path.
    fn write_script(dir: &std::path::Path, body: &str) -> PathBuf {
        let path = dir.join("update.sh");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "#!/bin/sh").unwrap();
        writeln!(file, "{}", body).unwrap();
        let mut perms = file.metadata().unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path
    }

    #[test]
    fn test_command_line_without_deploy_user() {
        let runner = runner("/opt/autopull/scripts/git-pull.sh", None);
        let (program, args) = runner.command_line("master", "/var/www/mysite", "origin");

        assert_eq!(program, "/opt/autopull/scripts/git-pull.sh");
        assert_eq!(
            args,
            vec!["-b", "master", "-d", "/var/www/mysite", "-r", "origin"]
        );
    }

    #[test]
    fn test_command_line_wraps_in_sudo_for_deploy_user() {
        let runner = runner("/opt/autopull/scripts/git-pull.sh", Some("deploy"));
        let (program, args) = runner.command_line("master", "/var/www/mysite", "origin");

        assert_eq!(program, "sudo");
        assert_eq!(
            args,
            vec![
                "-u",
                "deploy",
                "/opt/autopull/scripts/git-pull.sh",
                "-b",
                "master",
                "-d",
                "/var/www/mysite",
                "-r",
                "origin"
            ]
        );
    }

    #[test]
    fn test_hostile_config_values_stay_single_arguments() {
        let runner = runner("/opt/autopull/scripts/git-pull.sh", None);
        let (_, args) = runner.command_line("master; rm -rf /", "/var/www", "origin");
        assert_eq!(args[1], "master; rm -rf /");
    }

    #[tokio::test]
    async fn test_run_captures_output_and_exit_zero() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), r#"echo "pulling $2 from $6 into $4""#);
        let runner = runner(script.to_str().unwrap(), None);

        let outcome = runner.run("master", "/var/www/mysite", "origin").await;

        assert!(outcome.success);
        assert_eq!(outcome.exit_code, Some(0));
        assert_eq!(outcome.output, "pulling master from origin into /var/www/mysite");
    }

    #[tokio::test]
    async fn test_run_nonzero_exit_is_failure() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "echo merge conflict >&2\nexit 1");
        let runner = runner(script.to_str().unwrap(), None);

        let outcome = runner.run("master", "/var/www/mysite", "origin").await;

        assert!(!outcome.success);
        assert_eq!(outcome.exit_code, Some(1));
        assert!(outcome.output.contains("merge conflict"));
    }

    #[tokio::test]
    async fn test_run_missing_script_is_launch_failure() {
        let runner = runner("/nonexistent/update.sh", None);
        let outcome = runner.run("master", "/var/www/mysite", "origin").await;

        assert!(!outcome.success);
        assert_eq!(outcome.exit_code, None);
        assert!(outcome.output.contains("failed to spawn command"));
    }
}
