//! Cluster identity and the names derived from it
//!
//! The cluster name is the join key across PowerVC, the HMC, DNS and the
//! management cluster, so every derived name lives here.

use std::path::{Path, PathBuf};

/// Immutable description of the cluster to create or destroy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterSpec {
    pub name: String,
    /// Namespace of the HostedCluster and NodePool
    pub namespace: String,
    pub base_domain: String,
    pub pull_secret: PathBuf,
    pub ssh_key: PathBuf,
    pub release_image: String,
    pub node_count: u32,
}

impl ClusterSpec {
    /// Namespace holding the control plane, agents, InfraEnv and NMStateConfigs
    pub fn control_plane_namespace(&self) -> String {
        format!("{}-{}", self.namespace, self.name)
    }

    /// Name shared by every agent instance in PowerVC
    pub fn worker_group(&self) -> String {
        format!("{}-worker", self.name)
    }

    pub fn flavor_id(&self) -> String {
        format!("{}-flavor", self.name)
    }

    /// Local directory under `root` for rendered manifests, the discovery image and the kubeconfig
    pub fn manifest_dir(&self, root: &Path) -> PathBuf {
        root.join(format!(".{}", self.name))
    }

    pub fn discovery_iso(&self) -> String {
        format!("{}-discovery.iso", self.name)
    }

    /// Label value selecting this cluster's NMStateConfigs
    pub fn nmstate_label(&self) -> String {
        format!("nmstate-config-{}", self.name)
    }

    pub fn nmstate_config_name(&self, partition: &str) -> String {
        format!("{}-{}", self.name, partition)
    }

    pub fn api_record(&self) -> String {
        format!("api.{}.{}", self.name, self.base_domain)
    }

    pub fn api_internal_record(&self) -> String {
        format!("api-int.{}.{}", self.name, self.base_domain)
    }

    pub fn apps_record(&self) -> String {
        format!("*.apps.{}.{}", self.name, self.base_domain)
    }
}

/// Virtual optical device name for a partition
pub fn vopt_name(partition: &str) -> String {
    format!("{partition}-agent")
}
