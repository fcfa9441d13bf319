//! Control plane adapter errors

use cli_runner::ExecError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ControlPlaneError {
    /// `oc` or `hypershift` failed
    #[error("control plane command failed: {0}")]
    Exec(#[from] ExecError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A field the caller depends on is absent from a resource
    #[error("{resource} has no {field}")]
    MissingField { resource: String, field: &'static str },

    /// The rendered manifest set could not be used
    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),
}
