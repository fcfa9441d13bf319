//! PowerVC client errors

use thiserror::Error;

/// Errors that can occur when interacting with the PowerVC API
#[derive(Debug, Error)]
pub enum PowerVcError {
    /// HTTP request/response error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// PowerVC API returned an error
    #[error("PowerVC API error: {0}")]
    Api(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Authentication failed (bad credentials, missing token header, etc.)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Service missing from the token's catalog
    #[error("Service {0} not found in catalog")]
    MissingEndpoint(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request (e.g., missing required fields)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl PowerVcError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, PowerVcError::NotFound(_))
    }
}
