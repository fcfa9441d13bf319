//! Process-backed command runner

use crate::error::ExecError;
use crate::invocation::{CommandOutput, Invocation};
use crate::runner_trait::CommandRunner;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Default timeout for a single command
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(300);

/// Runs commands as child processes
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    default_timeout: Duration,
}

impl ProcessRunner {
    pub fn new(default_timeout: Duration) -> Self {
        Self { default_timeout }
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(DEFAULT_COMMAND_TIMEOUT)
    }
}

#[async_trait::async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput, ExecError> {
        let command_line = invocation.command_line();
        let timeout = invocation.timeout_override().unwrap_or(self.default_timeout);
        debug!(command = %command_line, "running command");

        let mut cmd = Command::new(invocation.program());
        cmd.args(invocation.arguments())
            .envs(invocation.environment().iter().map(|(k, v)| (k, v)))
            .kill_on_drop(true);

        let output = tokio::time::timeout(timeout, cmd.output())
            .await
            .map_err(|_elapsed| {
                warn!(command = %command_line, "command timed out after {:?}", timeout);
                ExecError::Timeout {
                    command: command_line.clone(),
                    timeout,
                }
            })?
            .map_err(|source| ExecError::Spawn {
                command: command_line.clone(),
                source,
            })?;

        let output = CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };
        if !output.success() {
            debug!(command = %command_line, status = %output.status_text(), "command exited unsuccessfully");
        }
        Ok(output)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_captures_stdout() {
        let runner = ProcessRunner::default();
        let output = runner
            .run(&Invocation::new("sh").args(["-c", "echo hello"]))
            .await
            .unwrap();
        assert!(output.success());
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_output_not_error() {
        let runner = ProcessRunner::default();
        let output = runner
            .run(&Invocation::new("sh").args(["-c", "echo oops >&2; exit 3"]))
            .await
            .unwrap();
        assert_eq!(output.status, Some(3));
        assert_eq!(output.stderr.trim(), "oops");

        let err = runner
            .run_checked(&Invocation::new("sh").args(["-c", "exit 3"]))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::Failed { .. }));
    }

    #[tokio::test]
    async fn test_strict_rejects_stderr() {
        let runner = ProcessRunner::default();
        let err = runner
            .run_strict(&Invocation::new("sh").args(["-c", "echo warning >&2"]))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::UnexpectedStderr { .. }));
        assert_eq!(err.stderr(), Some("warning"));
    }

    #[tokio::test]
    async fn test_env_is_passed() {
        let runner = ProcessRunner::default();
        let output = runner
            .run(&Invocation::new("sh").args(["-c", "echo $AGENT_TEST_VALUE"]).env("AGENT_TEST_VALUE", "42"))
            .await
            .unwrap();
        assert_eq!(output.stdout.trim(), "42");
    }

    #[tokio::test]
    async fn test_timeout() {
        let runner = ProcessRunner::new(Duration::from_millis(100));
        let err = runner
            .run(&Invocation::new("sleep").arg("5"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let runner = ProcessRunner::default();
        let err = runner
            .run(&Invocation::new("definitely-not-a-real-binary-4242"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::Spawn { .. }));
    }
}
