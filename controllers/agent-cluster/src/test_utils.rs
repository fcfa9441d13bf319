//! Test utilities for unit testing the orchestrator and its components
//!
//! Fixtures describe one cluster, `demo`, in base domain `example.com`, with
//! agents on network `vlan100` of managed system `S922-demo`.

#[cfg(test)]
use crate::agents::Agent;
#[cfg(test)]
use crate::cluster::ClusterSpec;
#[cfg(test)]
use crate::download::Downloader;
#[cfg(test)]
use crate::error::ControllerError;
#[cfg(test)]
use crate::reconciler::NetworkInfo;
#[cfg(test)]
use powervc_client::{MockPowerVcClient, Server, ServerAddress};
#[cfg(test)]
use std::collections::BTreeMap;
#[cfg(test)]
use std::path::{Path, PathBuf};
#[cfg(test)]
use std::sync::{Arc, Mutex};

#[cfg(test)]
pub const STORAGE_TEMPLATE: &str = "demo-storage-template";
#[cfg(test)]
pub const NETWORK_NAME: &str = "vlan100";
/// Display name of the managed system
#[cfg(test)]
pub const HOST: &str = "S922-demo";
#[cfg(test)]
pub const HYPERVISOR_HOSTNAME: &str = "8375-42A_78DA123";
#[cfg(test)]
pub const RELEASE_IMAGE: &str = "quay.io/openshift-release-dev/ocp-release:4.15.0-multi";

/// Cluster in namespace `clusters` and base domain `example.com`
#[cfg(test)]
pub fn cluster_spec(name: &str, node_count: u32) -> ClusterSpec {
    ClusterSpec {
        name: name.to_string(),
        namespace: "clusters".to_string(),
        base_domain: "example.com".to_string(),
        pull_secret: PathBuf::from("pull-secret.json"),
        ssh_key: PathBuf::from("id_rsa.pub"),
        release_image: RELEASE_IMAGE.to_string(),
        node_count,
    }
}

/// Like [`cluster_spec`], with the pull secret and SSH key written into `dir`
#[cfg(test)]
pub fn cluster_spec_in(dir: &Path, name: &str, node_count: u32) -> ClusterSpec {
    let pull_secret = dir.join("pull-secret.json");
    let ssh_key = dir.join("id_rsa.pub");
    std::fs::write(&pull_secret, r#"{"auths":{}}"#).unwrap();
    std::fs::write(&ssh_key, "ssh-ed25519 AAAAC3Nza demo@example.com\n").unwrap();
    ClusterSpec {
        pull_secret,
        ssh_key,
        ..cluster_spec(name, node_count)
    }
}

/// PowerVC with the storage template, agent network and managed system in place
#[cfg(test)]
pub fn powervc_with_infrastructure() -> MockPowerVcClient {
    let mock = MockPowerVcClient::new();
    mock.add_volume_type("vt-1", STORAGE_TEMPLATE);
    mock.add_network("net-1", NETWORK_NAME, "10.0.0.0/24", "10.0.0.1");
    mock.add_hypervisor(HYPERVISOR_HOSTNAME, HOST);
    mock
}

#[cfg(test)]
pub fn network_info() -> NetworkInfo {
    NetworkInfo {
        network_id: "net-1".to_string(),
        gateway_ip: "10.0.0.1".to_string(),
        prefix_length: 24,
    }
}

/// Server record with one fixed address on [`NETWORK_NAME`]
#[cfg(test)]
pub fn server(id: &str, name: &str, state: &str) -> Server {
    Server {
        id: id.to_string(),
        name: name.to_string(),
        status: state.to_uppercase(),
        vm_state: Some(state.to_string()),
        instance_name: Some(format!("{name}-{id}")),
        addresses: BTreeMap::from([(
            NETWORK_NAME.to_string(),
            vec![ServerAddress {
                addr: "10.0.0.99".to_string(),
                version: Some(4),
                mac_addr: Some("fa:16:3e:00:00:99".to_string()),
                kind: Some("fixed".to_string()),
            }],
        )]),
        fault: None,
        created: None,
    }
}

/// The `index`th agent of cluster `demo`
#[cfg(test)]
pub fn agent(index: u32) -> Agent {
    Agent {
        id: format!("srv-{index}"),
        name: format!("demo-worker-{index}"),
        partition_name: format!("demo-worker-{index}-{index:08x}"),
        ip: format!("10.0.0.{}", 10 + index),
        mac: format!("fa:16:3e:00:00:{index:02x}"),
    }
}

/// Downloader that writes a fixed body and records every URL
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct FakeDownloader {
    urls: Arc<Mutex<Vec<String>>>,
    failure: Arc<Mutex<Option<String>>>,
}

#[cfg(test)]
impl FakeDownloader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait::async_trait]
impl Downloader for FakeDownloader {
    async fn download(&self, url: &str, destination: &Path) -> Result<u64, ControllerError> {
        self.urls.lock().unwrap().push(url.to_string());
        if let Some(message) = self.failure.lock().unwrap().clone() {
            return Err(ControllerError::ExternalCommand(message));
        }
        let body = b"discovery image";
        std::fs::write(destination, body)?;
        Ok(body.len() as u64)
    }
}

/// An orchestrator for `demo` wired to in-memory clients, with its manifest
/// directory in a temporary directory
#[cfg(test)]
pub struct Harness {
    pub powervc: MockPowerVcClient,
    pub hmc: hmc_client::MockHmcClient,
    pub cis: cis_client::MockCisClient,
    pub control_plane: hypershift_client::MockControlPlaneClient,
    pub downloader: FakeDownloader,
    pub orchestrator: crate::orchestrator::Orchestrator,
    pub dir: tempfile::TempDir,
}

#[cfg(test)]
pub fn harness(node_count: u32) -> Harness {
    use crate::dns::DnsReconciler;
    use crate::media::MediaMounter;
    use crate::orchestrator::{Components, Orchestrator};
    use crate::reconciler::ResourceReconciler;
    use crate::agents::AgentProvisioner;

    let dir = tempfile::tempdir().unwrap();
    let powervc = powervc_with_infrastructure();
    let hmc = hmc_client::MockHmcClient::new();
    let cis = cis_client::MockCisClient::new();
    let control_plane = hypershift_client::MockControlPlaneClient::new();
    let downloader = FakeDownloader::new();

    let components = Components {
        reconciler: ResourceReconciler::new(Arc::new(powervc.clone()), STORAGE_TEMPLATE, NETWORK_NAME),
        provisioner: AgentProvisioner::new(Arc::new(powervc.clone()), NETWORK_NAME, HOST),
        media: MediaMounter::new(Arc::new(hmc.clone()), HOST),
        dns: DnsReconciler::new(Arc::new(cis.clone())),
        control_plane: Arc::new(control_plane.clone()),
        downloader: Arc::new(downloader.clone()),
    };
    let orchestrator = Orchestrator::new(cluster_spec_in(dir.path(), "demo", node_count), components, dir.path());

    Harness {
        powervc,
        hmc,
        cis,
        control_plane,
        downloader,
        orchestrator,
        dir,
    }
}
