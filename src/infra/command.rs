//! Subprocess execution
//!
//! Runs a program with an explicit argument vector - never through a shell,
//! so configuration values cannot inject commands. Both output streams are
//! drained line-by-line into a single combined transcript in arrival order.
//! No timeout is enforced: an unresponsive child blocks the caller.

use std::process::{ExitStatus, Stdio};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

/// Command execution error
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("failed to spawn command: {0}")]
    SpawnFailed(#[source] std::io::Error),
    #[error("failed to wait for command: {0}")]
    WaitFailed(#[source] std::io::Error),
}

/// Completed run: exit status plus the combined stdout/stderr transcript.
pub struct CapturedRun {
    pub status: ExitStatus,
    pub output: String,
}

/// Command executor
pub struct CommandRunner;

impl CommandRunner {
    /// Run `program` with `args`, blocking until it exits, and capture the
    /// combined output of both streams.
    pub async fn run_captured(program: &str, args: &[String]) -> Result<CapturedRun, CommandError> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(CommandError::SpawnFailed)?;

        let (tx, mut rx) = mpsc::unbounded_channel::<String>();

        let stdout_task = spawn_line_reader(child.stdout.take(), tx.clone());
        let stderr_task = spawn_line_reader(child.stderr.take(), tx);

        let status = child.wait().await.map_err(CommandError::WaitFailed)?;

        // Readers finish when the pipes close; join them so every line
        // written before exit lands in the transcript.
        let _ = stdout_task.await;
        let _ = stderr_task.await;

        let mut lines = Vec::new();
        while let Ok(line) = rx.try_recv() {
            lines.push(line);
        }

        Ok(CapturedRun {
            status,
            output: lines.join("\n"),
        })
    }
}

fn spawn_line_reader<R>(
    stream: Option<R>,
    tx: mpsc::UnboundedSender<String>,
) -> tokio::task::JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        if let Some(stream) = stream {
            let reader = BufReader::new(stream);
            let mut lines = reader.lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let _ = tx.send(line);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_captured_success() {
        let result = CommandRunner::run_captured("echo", &["hello".to_string()])
            .await
            .unwrap();

        assert!(result.status.success());
        assert_eq!(result.output, "hello");
    }

    #[tokio::test]
    async fn test_run_captured_merges_both_streams() {
        let result = CommandRunner::run_captured(
            "sh",
            &["-c".to_string(), "echo out; echo err >&2".to_string()],
        )
        .await
        .unwrap();

        assert!(result.status.success());
        assert!(result.output.contains("out"));
        assert!(result.output.contains("err"));
    }

    #[tokio::test]
    async fn test_run_captured_nonzero_exit() {
        let result = CommandRunner::run_captured("sh", &["-c".to_string(), "exit 3".to_string()])
            .await
            .unwrap();

        assert!(!result.status.success());
        assert_eq!(result.status.code(), Some(3));
    }

    #[tokio::test]
    async fn test_run_captured_spawn_failure() {
        let result = CommandRunner::run_captured("nonexistent_command_12345", &[]).await;
        assert!(matches!(result, Err(CommandError::SpawnFailed(_))));
    }

    #[tokio::test]
    async fn test_arguments_are_not_shell_interpreted() {
        let result = CommandRunner::run_captured("echo", &["$(whoami); rm -rf /".to_string()])
            .await
            .unwrap();

        assert_eq!(result.output, "$(whoami); rm -rf /");
    }
}
