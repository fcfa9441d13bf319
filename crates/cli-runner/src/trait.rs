//! CommandRunner trait for mocking
//!
//! The concrete ProcessRunner implements this trait; tests use ScriptedRunner.

use crate::error::ExecError;
use crate::invocation::{CommandOutput, Invocation};

/// Trait for running external commands
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run the command and capture its output.
    ///
    /// Only spawn failures and timeouts are errors here; a non-zero exit is
    /// returned as output so callers can inspect stderr (e.g. `NotFound`).
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput, ExecError>;

    /// Run the command and fail on a non-zero exit
    async fn run_checked(&self, invocation: &Invocation) -> Result<CommandOutput, ExecError> {
        let output = self.run(invocation).await?;
        if !output.success() {
            return Err(ExecError::Failed {
                command: invocation.command_line(),
                status: output.status_text(),
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output)
    }

    /// Run the command and fail on a non-zero exit or any stderr output.
    ///
    /// HMC/VIOS shells and the `ibmcloud` CLI report some failures only on stderr.
    async fn run_strict(&self, invocation: &Invocation) -> Result<CommandOutput, ExecError> {
        let output = self.run_checked(invocation).await?;
        if !output.stderr.trim().is_empty() {
            return Err(ExecError::UnexpectedStderr {
                command: invocation.command_line(),
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output)
    }
}
