//! Command execution errors

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when running an external command
#[derive(Debug, Error)]
pub enum ExecError {
    /// The process could not be started (binary missing, permissions, etc.)
    #[error("failed to execute {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The process did not finish within its timeout and was killed
    #[error("{command} timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    /// The process exited unsuccessfully
    #[error("{command} failed ({status}): {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },

    /// The process exited successfully but reported errors on stderr
    #[error("{command} reported an error: {stderr}")]
    UnexpectedStderr { command: String, stderr: String },
}

impl ExecError {
    /// Captured stderr, when the process ran far enough to produce any
    pub fn stderr(&self) -> Option<&str> {
        match self {
            ExecError::Failed { stderr, .. } | ExecError::UnexpectedStderr { stderr, .. } => {
                Some(stderr)
            }
            ExecError::Spawn { .. } | ExecError::Timeout { .. } => None,
        }
    }
}
