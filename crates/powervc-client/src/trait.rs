//! PowerVcClient trait for mocking
//!
//! The concrete PowerVcClient implements this trait, and tests use MockPowerVcClient.

use crate::error::PowerVcError;
use crate::models::*;

/// Trait for PowerVC API client operations
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait PowerVcClientTrait: Send + Sync {
    // Block storage
    async fn list_volume_types(&self) -> Result<Vec<VolumeType>, PowerVcError>;
    async fn list_volumes(&self, name: &str) -> Result<Vec<Volume>, PowerVcError>;
    async fn create_volume(&self, request: &CreateVolumeRequest) -> Result<Volume, PowerVcError>;
    async fn delete_volume(&self, id: &str) -> Result<(), PowerVcError>;

    // Images
    async fn list_images(&self, name: &str, tag: &str) -> Result<Vec<Image>, PowerVcError>;
    async fn create_image(&self, request: &CreateImageRequest) -> Result<Image, PowerVcError>;
    async fn upload_image_data(&self, id: &str, data: Vec<u8>) -> Result<(), PowerVcError>;
    async fn delete_image(&self, id: &str) -> Result<(), PowerVcError>;

    // Flavors
    async fn get_flavor(&self, id: &str) -> Result<Flavor, PowerVcError>;
    async fn create_flavor(&self, request: &CreateFlavorRequest) -> Result<Flavor, PowerVcError>;
    async fn create_flavor_extra_specs(&self, id: &str, specs: &std::collections::BTreeMap<String, String>) -> Result<(), PowerVcError>;
    async fn delete_flavor(&self, id: &str) -> Result<(), PowerVcError>;

    // Networking
    async fn list_networks(&self, name: &str) -> Result<Vec<Network>, PowerVcError>;
    async fn list_subnets(&self, network_id: &str) -> Result<Vec<Subnet>, PowerVcError>;

    // Compute
    async fn list_hypervisors(&self) -> Result<Vec<Hypervisor>, PowerVcError>;
    /// List servers whose name matches `name` (nova treats the filter as a regular expression)
    async fn list_servers(&self, name: &str) -> Result<Vec<Server>, PowerVcError>;
    async fn create_servers(&self, request: &CreateServersRequest) -> Result<(), PowerVcError>;
    async fn get_server(&self, id: &str) -> Result<Server, PowerVcError>;
    async fn reboot_server(&self, id: &str, reboot_type: RebootType) -> Result<(), PowerVcError>;
    async fn delete_server(&self, id: &str) -> Result<(), PowerVcError>;
}
