//! HMC client errors

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when talking to the HMC or VIOS
#[derive(Debug, Error)]
pub enum HmcError {
    /// SSH transport or protocol failure
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// The server's host key is missing from, or conflicts with, `known_hosts`
    #[error("host key for {host} rejected: {reason}")]
    HostKey { host: String, reason: String },

    /// Password authentication was refused
    #[error("authentication as {username}@{host} failed")]
    Authentication { host: String, username: String },

    /// Remote command exited unsuccessfully
    #[error("`{command}` on {host} failed ({status}): {stderr}")]
    CommandFailed {
        host: String,
        command: String,
        status: String,
        stderr: String,
    },

    /// Remote command exited successfully but reported errors on stderr
    #[error("`{command}` reported an error: {stderr}")]
    UnexpectedStderr { command: String, stderr: String },

    /// A remote operation did not finish within its bound
    #[error("{operation} on {host} timed out after {timeout:?}")]
    Timeout {
        host: String,
        operation: String,
        timeout: Duration,
    },

    /// The remote scp sink refused the transfer
    #[error("copy to {remote_path} failed: {message}")]
    Transfer { remote_path: String, message: String },

    /// Expected token missing from command output
    #[error("{token} not found in output of `{command}`: {output:?}")]
    TokenNotFound {
        token: String,
        command: String,
        output: String,
    },

    /// Reading the local file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Local path cannot be transferred
    #[error("Invalid path: {0}")]
    InvalidPath(String),
}
