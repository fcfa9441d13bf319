//! ControlPlaneClient trait for mocking
//!
//! The concrete HypershiftClient implements this trait; tests use
//! MockControlPlaneClient.

use crate::error::ControlPlaneError;
use crate::models::{HostedClusterCondition, RenderRequest};
use crds::Agent;
use std::path::Path;

/// Operations on the management cluster and the hosted cluster
#[async_trait::async_trait]
pub trait ControlPlaneClientTrait: Send + Sync {
    /// Create a namespace; an existing namespace is not an error
    async fn create_namespace(&self, namespace: &str) -> Result<(), ControlPlaneError>;

    async fn hosted_cluster_exists(&self, name: &str, namespace: &str) -> Result<bool, ControlPlaneError>;

    /// Render the HostedCluster manifest set without applying it
    async fn render_cluster(&self, request: &RenderRequest) -> Result<String, ControlPlaneError>;

    async fn apply(&self, manifest: &Path) -> Result<(), ControlPlaneError>;

    /// Block until the HostedCluster reports `condition` or its timeout elapses
    async fn wait_hosted_cluster(
        &self,
        name: &str,
        namespace: &str,
        condition: HostedClusterCondition,
    ) -> Result<(), ControlPlaneError>;

    /// Load balancer hostname of the hosted kube-apiserver service
    async fn api_server_hostname(&self, cp_namespace: &str) -> Result<String, ControlPlaneError>;

    /// Block until the InfraEnv discovery image is built
    async fn wait_infra_env_image(&self, name: &str, cp_namespace: &str) -> Result<(), ControlPlaneError>;

    async fn infra_env_iso_url(&self, name: &str, cp_namespace: &str) -> Result<String, ControlPlaneError>;

    async fn list_agents(&self, cp_namespace: &str) -> Result<Vec<Agent>, ControlPlaneError>;

    /// Approve an agent and set the host name it installs with
    async fn approve_agent(&self, name: &str, cp_namespace: &str, hostname: &str) -> Result<(), ControlPlaneError>;

    async fn scale_node_pool(&self, name: &str, namespace: &str, replicas: u32) -> Result<(), ControlPlaneError>;

    /// Kubeconfig of the hosted cluster
    async fn create_kubeconfig(&self, name: &str) -> Result<String, ControlPlaneError>;

    /// Pin the hosted cluster's default ingress controller to one node
    async fn pin_ingress_to_node(&self, kubeconfig: &Path, hostname: &str) -> Result<(), ControlPlaneError>;

    async fn destroy_cluster(&self, name: &str) -> Result<(), ControlPlaneError>;
}
