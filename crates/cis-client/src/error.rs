//! CIS client errors

use cli_runner::ExecError;
use thiserror::Error;

/// Errors that can occur when managing CIS DNS records
#[derive(Debug, Error)]
pub enum CisError {
    /// `ibmcloud` failed or wrote to stderr
    #[error("ibmcloud command failed: {0}")]
    Exec(#[from] ExecError),

    /// CLI output was not the expected JSON
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The base domain is not managed by the CIS instance
    #[error("CIS domain {0} not found")]
    DomainNotFound(String),

    /// No DNS record exists with the given name
    #[error("no dns record exists with name: {0}")]
    RecordNotExist(String),
}

impl CisError {
    pub fn is_not_exist(&self) -> bool {
        matches!(self, CisError::RecordNotExist(_))
    }
}
