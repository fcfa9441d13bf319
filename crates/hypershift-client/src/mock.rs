//! Mock control plane for unit testing
//!
//! Keeps the HostedCluster, agents and node pool in memory. Applied manifest
//! files are read and kept so tests can inspect what would have reached the
//! cluster.

use crate::control_plane_trait::ControlPlaneClientTrait;
use crate::error::ControlPlaneError;
use crate::models::{HostedClusterCondition, RenderRequest};
use crds::{Agent, AgentInventory, AgentSpec, AgentStatus, InventoryInterface};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Default rendered manifest set: a namespace, a pull secret and the HostedCluster
pub const RENDERED_MANIFEST: &str = "\
apiVersion: v1
kind: Namespace
metadata:
  name: clusters
---
apiVersion: v1
kind: Secret
metadata:
  name: demo-pull-secret
  namespace: clusters
---
apiVersion: hypershift.openshift.io/v1beta1
kind: HostedCluster
metadata:
  name: demo
  namespace: clusters
spec:
  release:
    image: quay.io/openshift-release-dev/ocp-release:4.15.0-multi
  services:
  - service: APIServer
    servicePublishingStrategy:
      type: NodePort
";

#[derive(Default)]
struct State {
    namespaces: HashSet<String>,
    hosted_clusters: HashSet<String>,
    rendered: Option<String>,
    applied: Vec<(PathBuf, String)>,
    api_hostname: Option<String>,
    iso_url: Option<String>,
    agents: Vec<Agent>,
    node_pool_replicas: HashMap<String, u32>,
    kubeconfig: String,
    pinned_hostname: Option<String>,
    destroyed: Vec<String>,
}

/// In-memory management cluster
#[derive(Clone, Default)]
pub struct MockControlPlaneClient {
    state: Arc<Mutex<State>>,
    failures: Arc<Mutex<HashMap<String, String>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl std::fmt::Debug for MockControlPlaneClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockControlPlaneClient").finish_non_exhaustive()
    }
}

impl MockControlPlaneClient {
    pub fn new() -> Self {
        let mock = Self::default();
        {
            let mut state = mock.state.lock().unwrap();
            state.api_hostname = Some("api-lb.example.com".to_string());
            state.iso_url = Some("https://assisted.example.com/images/discovery.iso".to_string());
            state.kubeconfig = "apiVersion: v1\nkind: Config\n".to_string();
        }
        mock
    }

    pub fn add_hosted_cluster(&self, namespace: &str, name: &str) {
        self.state
            .lock()
            .unwrap()
            .hosted_clusters
            .insert(format!("{namespace}/{name}"));
    }

    /// Output returned by `render_cluster`; defaults to [`RENDERED_MANIFEST`]
    pub fn set_rendered_manifest(&self, manifest: &str) {
        self.state.lock().unwrap().rendered = Some(manifest.to_string());
    }

    pub fn set_api_hostname(&self, hostname: Option<&str>) {
        self.state.lock().unwrap().api_hostname = hostname.map(ToString::to_string);
    }

    pub fn set_iso_url(&self, url: Option<&str>) {
        self.state.lock().unwrap().iso_url = url.map(ToString::to_string);
    }

    /// Register a discovered agent; `mac` is `None` until its inventory is collected
    pub fn add_agent(&self, name: &str, mac: Option<&str>, approved: bool) {
        let mut agent = Agent::new(
            name,
            AgentSpec {
                approved,
                ..AgentSpec::default()
            },
        );
        agent.status = Some(AgentStatus {
            inventory: mac.map(|mac| AgentInventory {
                hostname: None,
                interfaces: vec![InventoryInterface {
                    name: Some("env2".to_string()),
                    mac_address: Some(mac.to_string()),
                    ipv4_addresses: Vec::new(),
                }],
            }),
            conditions: Vec::new(),
        });
        self.state.lock().unwrap().agents.push(agent);
    }

    /// Make every call of `operation` fail
    pub fn fail(&self, operation: &str, message: &str) {
        self.failures
            .lock()
            .unwrap()
            .insert(operation.to_string(), message.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.split(':').next() == Some(operation))
            .count()
    }

    pub fn namespaces(&self) -> HashSet<String> {
        self.state.lock().unwrap().namespaces.clone()
    }

    /// Paths and contents of applied manifests, in order
    pub fn applied(&self) -> Vec<(PathBuf, String)> {
        self.state.lock().unwrap().applied.clone()
    }

    pub fn agents(&self) -> Vec<Agent> {
        self.state.lock().unwrap().agents.clone()
    }

    pub fn node_pool_replicas(&self, namespace: &str, name: &str) -> Option<u32> {
        self.state
            .lock()
            .unwrap()
            .node_pool_replicas
            .get(&format!("{namespace}/{name}"))
            .copied()
    }

    pub fn pinned_hostname(&self) -> Option<String> {
        self.state.lock().unwrap().pinned_hostname.clone()
    }

    pub fn destroyed(&self) -> Vec<String> {
        self.state.lock().unwrap().destroyed.clone()
    }

    fn record_call(&self, operation: &str, argument: &str) -> Result<(), ControlPlaneError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{operation}:{argument}"));
        match self.failures.lock().unwrap().get(operation) {
            Some(message) => Err(ControlPlaneError::Exec(cli_runner::ExecError::Failed {
                command: format!("oc {operation}"),
                status: "exit status 1".to_string(),
                stderr: message.clone(),
            })),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl ControlPlaneClientTrait for MockControlPlaneClient {
    async fn create_namespace(&self, namespace: &str) -> Result<(), ControlPlaneError> {
        self.record_call("create_namespace", namespace)?;
        self.state
            .lock()
            .unwrap()
            .namespaces
            .insert(namespace.to_string());
        Ok(())
    }

    async fn hosted_cluster_exists(&self, name: &str, namespace: &str) -> Result<bool, ControlPlaneError> {
        self.record_call("hosted_cluster_exists", name)?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .hosted_clusters
            .contains(&format!("{namespace}/{name}")))
    }

    async fn render_cluster(&self, request: &RenderRequest) -> Result<String, ControlPlaneError> {
        self.record_call("render_cluster", &request.name)?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .rendered
            .clone()
            .unwrap_or_else(|| RENDERED_MANIFEST.to_string()))
    }

    async fn apply(&self, manifest: &Path) -> Result<(), ControlPlaneError> {
        self.record_call("apply", &manifest.display().to_string())?;
        let content = std::fs::read_to_string(manifest)
            .map_err(|e| ControlPlaneError::InvalidManifest(format!("{}: {e}", manifest.display())))?;
        let mut state = self.state.lock().unwrap();
        if content.contains("kind: HostedCluster") {
            // Applying the rendered set creates the HostedCluster in its own namespace
            for document in content.split("\n---\n") {
                if document.contains("kind: HostedCluster") {
                    let name = yaml_field(document, "name");
                    let namespace = yaml_field(document, "namespace");
                    if let (Some(name), Some(namespace)) = (name, namespace) {
                        state.hosted_clusters.insert(format!("{namespace}/{name}"));
                    }
                }
            }
        }
        state.applied.push((manifest.to_path_buf(), content));
        Ok(())
    }

    async fn wait_hosted_cluster(
        &self,
        name: &str,
        _namespace: &str,
        condition: HostedClusterCondition,
    ) -> Result<(), ControlPlaneError> {
        let operation = match condition {
            HostedClusterCondition::Available => "wait_available",
            HostedClusterCondition::ClusterVersionAvailable => "wait_completed",
        };
        self.record_call(operation, name)
    }

    async fn api_server_hostname(&self, cp_namespace: &str) -> Result<String, ControlPlaneError> {
        self.record_call("api_server_hostname", cp_namespace)?;
        self.state
            .lock()
            .unwrap()
            .api_hostname
            .clone()
            .ok_or_else(|| ControlPlaneError::MissingField {
                resource: format!("service {cp_namespace}/kube-apiserver"),
                field: "status.loadBalancer.ingress[0].hostname",
            })
    }

    async fn wait_infra_env_image(&self, name: &str, _cp_namespace: &str) -> Result<(), ControlPlaneError> {
        self.record_call("wait_infra_env_image", name)
    }

    async fn infra_env_iso_url(&self, name: &str, cp_namespace: &str) -> Result<String, ControlPlaneError> {
        self.record_call("infra_env_iso_url", name)?;
        self.state
            .lock()
            .unwrap()
            .iso_url
            .clone()
            .ok_or_else(|| ControlPlaneError::MissingField {
                resource: format!("infraenv {cp_namespace}/{name}"),
                field: "status.isoDownloadURL",
            })
    }

    async fn list_agents(&self, cp_namespace: &str) -> Result<Vec<Agent>, ControlPlaneError> {
        self.record_call("list_agents", cp_namespace)?;
        Ok(self.state.lock().unwrap().agents.clone())
    }

    async fn approve_agent(&self, name: &str, _cp_namespace: &str, hostname: &str) -> Result<(), ControlPlaneError> {
        self.record_call("approve_agent", name)?;
        let mut state = self.state.lock().unwrap();
        let agent = state
            .agents
            .iter_mut()
            .find(|agent| agent.metadata.name.as_deref() == Some(name))
            .ok_or_else(|| ControlPlaneError::InvalidManifest(format!("agent {name} not found")))?;
        agent.spec.approved = true;
        agent.spec.hostname = Some(hostname.to_string());
        Ok(())
    }

    async fn scale_node_pool(&self, name: &str, namespace: &str, replicas: u32) -> Result<(), ControlPlaneError> {
        self.record_call("scale_node_pool", &format!("{name}={replicas}"))?;
        self.state
            .lock()
            .unwrap()
            .node_pool_replicas
            .insert(format!("{namespace}/{name}"), replicas);
        Ok(())
    }

    async fn create_kubeconfig(&self, name: &str) -> Result<String, ControlPlaneError> {
        self.record_call("create_kubeconfig", name)?;
        Ok(self.state.lock().unwrap().kubeconfig.clone())
    }

    async fn pin_ingress_to_node(&self, _kubeconfig: &Path, hostname: &str) -> Result<(), ControlPlaneError> {
        self.record_call("pin_ingress_to_node", hostname)?;
        self.state.lock().unwrap().pinned_hostname = Some(hostname.to_string());
        Ok(())
    }

    async fn destroy_cluster(&self, name: &str) -> Result<(), ControlPlaneError> {
        self.record_call("destroy_cluster", name)?;
        let mut state = self.state.lock().unwrap();
        state.hosted_clusters.retain(|key| !key.ends_with(&format!("/{name}")));
        state.destroyed.push(name.to_string());
        Ok(())
    }
}

/// First `key: value` under `metadata:` in a YAML document
fn yaml_field(document: &str, key: &str) -> Option<String> {
    let mut in_metadata = false;
    for line in document.lines() {
        if line.starts_with("metadata:") {
            in_metadata = true;
            continue;
        }
        if in_metadata {
            if !line.starts_with(' ') {
                break;
            }
            if let Some(value) = line.trim().strip_prefix(&format!("{key}:")) {
                return Some(value.trim().trim_matches('"').to_string());
            }
        }
    }
    None
}
