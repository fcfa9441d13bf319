//! Discovery image download

use crate::error::ControllerError;
use futures::StreamExt;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Fetches a URL into a local file
#[async_trait::async_trait]
pub trait Downloader: Send + Sync {
    /// Write the body of `url` to `destination`, returning the byte count
    async fn download(&self, url: &str, destination: &Path) -> Result<u64, ControllerError>;
}

/// Streaming HTTPS downloader
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: reqwest::Client,
}

impl HttpDownloader {
    /// `insecure` accepts self-signed certificates on the image service
    pub fn new(insecure: bool) -> Result<Self, ControllerError> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(insecure)
            .build()
            .map_err(|e| ControllerError::ExternalCommand(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl Downloader for HttpDownloader {
    async fn download(&self, url: &str, destination: &Path) -> Result<u64, ControllerError> {
        debug!(url, "Downloading");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| ControllerError::ExternalCommand(format!("GET {url}: {e}")))?;

        let mut file = tokio::fs::File::create(destination).await?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| ControllerError::ExternalCommand(format!("GET {url}: {e}")))?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        info!(path = %destination.display(), bytes = written, "Download complete");
        Ok(written)
    }
}
