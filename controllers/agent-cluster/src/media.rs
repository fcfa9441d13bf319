//! Installer media mounting on the VIOS
//!
//! The discovery image is copied to the VIOS once, then attached to every
//! agent partition as a virtual optical device:
//! LPAR ID (HMC) -> vhost (VIOS) -> vopt -> vtopt + loadopt -> boot string (HMC).
//! Each hop parses the previous hop's output; nothing is retried.

use crate::agents::Agent;
use crate::cluster::vopt_name;
use crate::error::ControllerError;
use hmc_client::HmcClientTrait;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub struct MediaMounter {
    hmc: Arc<dyn HmcClientTrait>,
    /// Managed system the partitions live on
    host: String,
}

impl std::fmt::Debug for MediaMounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaMounter")
            .field("host", &self.host)
            .finish_non_exhaustive()
    }
}

impl MediaMounter {
    pub fn new(hmc: Arc<dyn HmcClientTrait>, host: impl Into<String>) -> Self {
        Self { hmc, host: host.into() }
    }

    /// Copy `image` to the VIOS and attach it to every agent, in order
    pub async fn mount(&self, image: &Path, agents: &[Agent]) -> Result<(), ControllerError> {
        let file_name = image
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| ControllerError::Validation(format!("invalid image path {}", image.display())))?;

        let remote = self.hmc.copy_to_vios(image).await?;
        info!(remote = %remote, "Discovery image copied to VIOS");

        let result = self.mount_all(file_name, agents).await;
        // The sessions are only needed again at teardown
        let closed = self.hmc.close().await;
        result?;
        closed?;
        Ok(())
    }

    async fn mount_all(&self, file_name: &str, agents: &[Agent]) -> Result<(), ControllerError> {
        for agent in agents {
            self.mount_one(file_name, agent).await?;
        }
        Ok(())
    }

    async fn mount_one(&self, file_name: &str, agent: &Agent) -> Result<(), ControllerError> {
        let partition = agent.partition_name.as_str();

        let lpar_id = self.hmc.get_lpar_id(&self.host, partition).await?;
        info!(agent = %agent.name, lpar_id = %lpar_id, "LPAR ID retrieved");

        let vhost = self.hmc.get_vhost(&lpar_id).await?;
        info!(agent = %agent.name, vhost = %vhost, "vhost retrieved");

        let vopt = vopt_name(partition);
        self.hmc.create_vopt(&vopt, file_name).await?;
        info!(agent = %agent.name, vopt = %vopt, "vopt created");

        let vtopt = self.hmc.map_vopt(&vhost, &vopt).await?;
        info!(agent = %agent.name, vtopt = %vtopt, "Discovery image mounted");

        // Boot order is not switched to the optical device automatically yet
        self.hmc.set_boot_string(&self.host, partition).await?;
        info!(agent = %agent.name, "boot_string configured");
        Ok(())
    }

    /// Delete the discovery image from the VIOS home directory
    pub async fn remove(&self, file_name: &str) -> Result<(), ControllerError> {
        let result = self.hmc.remove_from_vios(file_name).await;
        let closed = self.hmc.close().await;
        result?;
        closed?;
        Ok(())
    }
}
