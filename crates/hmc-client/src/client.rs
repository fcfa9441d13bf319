//! HMC / VIOS client
//!
//! Wraps one shell on the HMC and one on the VIOS. Commands run on the VIOS go
//! through `ioscli` because the `padmin` shell is restricted.

use crate::error::HmcError;
use crate::hmc_trait::{HmcClientTrait, RemoteShell};
use crate::parser;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Boot device path of the first virtual SCSI optical disk
pub const BOOT_STRING: &str = "/vdevice/v-scsi@30000002/disk@8200000000000000";

/// HMC / VIOS client
pub struct HmcClient {
    hmc: Arc<dyn RemoteShell>,
    vios: Arc<dyn RemoteShell>,
    vios_home: String,
}

impl std::fmt::Debug for HmcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmcClient")
            .field("hmc", &self.hmc.host())
            .field("vios", &self.vios.host())
            .field("vios_home", &self.vios_home)
            .finish()
    }
}

impl HmcClient {
    /// Create a client over existing shells
    ///
    /// # Arguments
    /// * `hmc` - shell on the Hardware Management Console
    /// * `vios` - shell on the Virtual I/O Server
    /// * `vios_home` - home directory of the VIOS user (e.g. "/home/padmin")
    pub fn new(hmc: Arc<dyn RemoteShell>, vios: Arc<dyn RemoteShell>, vios_home: impl Into<String>) -> Self {
        Self {
            hmc,
            vios,
            vios_home: vios_home.into().trim_end_matches('/').to_string(),
        }
    }

    fn vios_path(&self, file_name: &str) -> String {
        format!("{}/{}", self.vios_home, file_name)
    }

    fn require_clean_stderr(command: &str, stderr: &str) -> Result<(), HmcError> {
        if stderr.trim().is_empty() {
            return Ok(());
        }
        Err(HmcError::UnexpectedStderr {
            command: command.to_string(),
            stderr: stderr.trim().to_string(),
        })
    }

    pub async fn get_lpar_id(&self, host: &str, partition: &str) -> Result<String, HmcError> {
        let command = format!(
            "lshwres -m {host} -r virtualio --rsubtype scsi --filter \"lpar_names={partition}\""
        );
        let output = self.hmc.exec(&command).await?;
        let lpar_id = parser::find_key_value(&output.stdout, "lpar_id", &command)?;
        debug!(partition, lpar_id = %lpar_id, "resolved LPAR ID");
        Ok(lpar_id)
    }

    pub async fn get_vhost(&self, lpar_id: &str) -> Result<String, HmcError> {
        let command = format!("ioscli lsmap -all -dec -cpid {lpar_id}");
        let output = self.vios.exec(&command).await?;
        let vhost = parser::parse_lsmap_vhost(&output.stdout, &command)?;
        debug!(lpar_id, vhost = %vhost, "resolved virtual host adapter");
        Ok(vhost)
    }

    pub async fn create_vopt(&self, vopt_name: &str, file_name: &str) -> Result<(), HmcError> {
        let command = format!(
            "ioscli mkvopt -name {vopt_name} -file {}",
            self.vios_path(file_name)
        );
        let output = self.vios.exec(&command).await?;
        Self::require_clean_stderr(&command, &output.stderr)?;
        debug!(vopt = vopt_name, "created virtual optical media");
        Ok(())
    }

    pub async fn map_vopt(&self, vhost: &str, vopt_name: &str) -> Result<String, HmcError> {
        let mkvdev = format!("ioscli mkvdev -fbo -vadapter {vhost}");
        let output = self.vios.exec(&mkvdev).await?;
        let vtopt = parser::parse_available_device(&output.stdout, &mkvdev)?;

        let loadopt = format!("ioscli loadopt -vtd {vtopt} -disk {vopt_name}");
        self.vios.exec(&loadopt).await?;
        debug!(vhost, vtopt = %vtopt, vopt = vopt_name, "loaded virtual optical media");
        Ok(vtopt)
    }

    pub async fn set_boot_string(&self, host: &str, partition: &str) -> Result<(), HmcError> {
        let command = format!(
            "chsyscfg -r lpar -m {host} -i name={partition},boot_string={BOOT_STRING}"
        );
        let output = self.hmc.exec(&command).await?;
        Self::require_clean_stderr(&command, &output.stderr)?;
        debug!(partition, "boot string configured");
        Ok(())
    }

    pub async fn copy_to_vios(&self, local: &Path) -> Result<String, HmcError> {
        let file_name = local
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| HmcError::InvalidPath(local.display().to_string()))?;
        let remote = self.vios_path(file_name);
        info!(host = %self.vios.host(), "Copying {} to {}", local.display(), remote);
        self.vios.upload(local, &remote).await?;
        Ok(remote)
    }

    pub async fn remove_from_vios(&self, file_name: &str) -> Result<(), HmcError> {
        let command = format!("rm -f {}", self.vios_path(file_name));
        self.vios.exec(&command).await?;
        Ok(())
    }

    pub async fn close(&self) -> Result<(), HmcError> {
        let hmc = self.hmc.close().await;
        let vios = self.vios.close().await;
        hmc.and(vios)
    }
}

#[async_trait::async_trait]
impl HmcClientTrait for HmcClient {
    async fn get_lpar_id(&self, host: &str, partition: &str) -> Result<String, HmcError> {
        self.get_lpar_id(host, partition).await
    }

    async fn get_vhost(&self, lpar_id: &str) -> Result<String, HmcError> {
        self.get_vhost(lpar_id).await
    }

    async fn create_vopt(&self, vopt_name: &str, file_name: &str) -> Result<(), HmcError> {
        self.create_vopt(vopt_name, file_name).await
    }

    async fn map_vopt(&self, vhost: &str, vopt_name: &str) -> Result<String, HmcError> {
        self.map_vopt(vhost, vopt_name).await
    }

    async fn set_boot_string(&self, host: &str, partition: &str) -> Result<(), HmcError> {
        self.set_boot_string(host, partition).await
    }

    async fn copy_to_vios(&self, local: &Path) -> Result<String, HmcError> {
        self.copy_to_vios(local).await
    }

    async fn remove_from_vios(&self, file_name: &str) -> Result<(), HmcError> {
        self.remove_from_vios(file_name).await
    }

    async fn close(&self) -> Result<(), HmcError> {
        self.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cli_runner::CommandOutput;
    use std::sync::Mutex;

    /// Shell that answers commands by prefix and records them
    #[derive(Default)]
    struct FakeShell {
        host: String,
        responses: Vec<(String, CommandOutput)>,
        commands: Mutex<Vec<String>>,
        uploads: Mutex<Vec<(String, String)>>,
    }

    impl FakeShell {
        fn new(host: &str, responses: &[(&str, CommandOutput)]) -> Arc<Self> {
            Arc::new(Self {
                host: host.to_string(),
                responses: responses
                    .iter()
                    .map(|(prefix, output)| ((*prefix).to_string(), output.clone()))
                    .collect(),
                ..Self::default()
            })
        }

        fn commands(&self) -> Vec<String> {
            self.commands.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl RemoteShell for FakeShell {
        fn host(&self) -> &str {
            &self.host
        }

        async fn exec(&self, command: &str) -> Result<CommandOutput, HmcError> {
            self.commands.lock().unwrap().push(command.to_string());
            Ok(self
                .responses
                .iter()
                .find(|(prefix, _)| command.starts_with(prefix.as_str()))
                .map_or_else(|| CommandOutput::ok(""), |(_, output)| output.clone()))
        }

        async fn upload(&self, local: &Path, remote_path: &str) -> Result<(), HmcError> {
            self.uploads
                .lock()
                .unwrap()
                .push((local.display().to_string(), remote_path.to_string()));
            Ok(())
        }

        async fn close(&self) -> Result<(), HmcError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_get_lpar_id() {
        let hmc = FakeShell::new(
            "hmc",
            &[("lshwres", CommandOutput::ok("lpar_name=p1,lpar_id=7,remote_lpar_id=1\n"))],
        );
        let client = HmcClient::new(hmc.clone(), FakeShell::new("vios", &[]), "/home/padmin");
        assert_eq!(client.get_lpar_id("Server-8286", "p1").await.unwrap(), "7");
        assert_eq!(
            hmc.commands()[0],
            "lshwres -m Server-8286 -r virtualio --rsubtype scsi --filter \"lpar_names=p1\""
        );
    }

    #[tokio::test]
    async fn test_get_lpar_id_missing_token() {
        let hmc = FakeShell::new("hmc", &[("lshwres", CommandOutput::ok("No results were found.\n"))]);
        let client = HmcClient::new(hmc, FakeShell::new("vios", &[]), "/home/padmin");
        assert!(matches!(
            client.get_lpar_id("host", "p1").await,
            Err(HmcError::TokenNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_get_vhost_empty_output_fails() {
        let vios = FakeShell::new("vios", &[("ioscli lsmap", CommandOutput::ok(""))]);
        let client = HmcClient::new(FakeShell::new("hmc", &[]), vios, "/home/padmin");
        assert!(client.get_vhost("7").await.is_err());
    }

    #[tokio::test]
    async fn test_create_vopt_rejects_stderr() {
        let vios = FakeShell::new(
            "vios",
            &[("ioscli mkvopt", CommandOutput::ok("").with_stderr("media already exists"))],
        );
        let client = HmcClient::new(FakeShell::new("hmc", &[]), vios.clone(), "/home/padmin/");
        assert!(client.create_vopt("p1-agent", "demo-discovery.iso").await.is_err());
        assert_eq!(
            vios.commands()[0],
            "ioscli mkvopt -name p1-agent -file /home/padmin/demo-discovery.iso"
        );
    }

    #[tokio::test]
    async fn test_map_vopt_loads_into_available_device() {
        let vios = FakeShell::new("vios", &[("ioscli mkvdev", CommandOutput::ok("vtopt4 Available\n"))]);
        let client = HmcClient::new(FakeShell::new("hmc", &[]), vios.clone(), "/home/padmin");
        assert_eq!(client.map_vopt("vhost3", "p1-agent").await.unwrap(), "vtopt4");
        assert_eq!(
            vios.commands(),
            vec![
                "ioscli mkvdev -fbo -vadapter vhost3".to_string(),
                "ioscli loadopt -vtd vtopt4 -disk p1-agent".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_map_vopt_without_available_device_skips_loadopt() {
        let vios = FakeShell::new("vios", &[("ioscli mkvdev", CommandOutput::ok("vtopt4 Defined\n"))]);
        let client = HmcClient::new(FakeShell::new("hmc", &[]), vios.clone(), "/home/padmin");
        assert!(client.map_vopt("vhost3", "p1-agent").await.is_err());
        assert_eq!(vios.commands().len(), 1);
    }

    #[tokio::test]
    async fn test_set_boot_string() {
        let hmc = FakeShell::new("hmc", &[]);
        let client = HmcClient::new(hmc.clone(), FakeShell::new("vios", &[]), "/home/padmin");
        client.set_boot_string("Server-8286", "p1").await.unwrap();
        assert_eq!(
            hmc.commands()[0],
            format!("chsyscfg -r lpar -m Server-8286 -i name=p1,boot_string={BOOT_STRING}")
        );
    }

    #[tokio::test]
    async fn test_copy_and_remove_use_home_directory() {
        let vios = FakeShell::new("vios", &[]);
        let client = HmcClient::new(FakeShell::new("hmc", &[]), vios.clone(), "/home/padmin");
        let remote = client
            .copy_to_vios(Path::new(".demo/demo-discovery.iso"))
            .await
            .unwrap();
        assert_eq!(remote, "/home/padmin/demo-discovery.iso");
        assert_eq!(
            vios.uploads.lock().unwrap()[0],
            (".demo/demo-discovery.iso".to_string(), "/home/padmin/demo-discovery.iso".to_string())
        );

        client.remove_from_vios("demo-discovery.iso").await.unwrap();
        assert_eq!(vios.commands()[0], "rm -f /home/padmin/demo-discovery.iso");
    }
}
