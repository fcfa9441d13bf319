//! Traits for mocking remote shells and HMC operations

use crate::error::HmcError;
use cli_runner::CommandOutput;
use std::path::Path;

/// Authenticated remote shell on a single host
#[async_trait::async_trait]
pub trait RemoteShell: Send + Sync {
    /// Host this shell is connected to
    fn host(&self) -> &str;

    /// Run one command; a non-zero exit is an error
    async fn exec(&self, command: &str) -> Result<CommandOutput, HmcError>;

    /// Copy a local file to `remote_path` on the host
    async fn upload(&self, local: &Path, remote_path: &str) -> Result<(), HmcError>;

    /// Tear down the underlying connection
    async fn close(&self) -> Result<(), HmcError>;
}

/// Trait for HMC / VIOS operations used by the media mounter
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait HmcClientTrait: Send + Sync {
    /// Partition ID of `partition` on managed system `host`, from its virtual SCSI adapters
    async fn get_lpar_id(&self, host: &str, partition: &str) -> Result<String, HmcError>;

    /// Virtual host adapter on the VIOS serving the client partition `lpar_id`
    async fn get_vhost(&self, lpar_id: &str) -> Result<String, HmcError>;

    /// Create a virtual optical device from a file in the VIOS home directory
    async fn create_vopt(&self, vopt_name: &str, file_name: &str) -> Result<(), HmcError>;

    /// Create a virtual target device on `vhost` and load `vopt_name` into it.
    /// Returns the virtual target device name.
    async fn map_vopt(&self, vhost: &str, vopt_name: &str) -> Result<String, HmcError>;

    /// Point the partition's boot device at the virtual optical disk
    async fn set_boot_string(&self, host: &str, partition: &str) -> Result<(), HmcError>;

    /// Copy a local file into the VIOS home directory, returning the remote path
    async fn copy_to_vios(&self, local: &Path) -> Result<String, HmcError>;

    /// Remove a file from the VIOS home directory (absent is success)
    async fn remove_from_vios(&self, file_name: &str) -> Result<(), HmcError>;

    /// Close the HMC and VIOS sessions
    async fn close(&self) -> Result<(), HmcError>;
}
