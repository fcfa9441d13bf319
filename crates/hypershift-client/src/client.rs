//! `oc` / `hypershift` wrapper

use crate::control_plane_trait::ControlPlaneClientTrait;
use crate::error::ControlPlaneError;
use crate::models::{HostedClusterCondition, RenderRequest, oc_duration};
use cli_runner::{CommandRunner, Invocation};
use crds::{Agent, InfraEnv, ResourceList};
use k8s_openapi::api::core::v1::Service;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const OC: &str = "oc";
const HYPERSHIFT: &str = "hypershift";

/// Extra time given to the process beyond the wait bound passed to `oc wait`
const WAIT_GRACE: Duration = Duration::from_secs(60);

const IMAGE_CREATED_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// `hypershift destroy` waits for every HostedCluster finalizer to run
pub const DESTROY_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Control plane client backed by the `oc` and `hypershift` binaries
pub struct HypershiftClient {
    runner: Arc<dyn CommandRunner>,
}

impl std::fmt::Debug for HypershiftClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HypershiftClient").finish_non_exhaustive()
    }
}

impl HypershiftClient {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    pub async fn create_namespace(&self, namespace: &str) -> Result<(), ControlPlaneError> {
        let invocation = Invocation::new(OC).args(["create", "namespace", namespace]);
        let output = self.runner.run(&invocation).await?;
        if output.success() {
            info!(namespace, "Namespace created");
        } else if output.stderr.contains("AlreadyExists") {
            debug!(namespace, "Namespace already exists");
        } else {
            return Err(failed(&invocation, &output));
        }
        Ok(())
    }

    pub async fn hosted_cluster_exists(&self, name: &str, namespace: &str) -> Result<bool, ControlPlaneError> {
        let invocation = Invocation::new(OC).args(["get", "hc", name, "-n", namespace]);
        let output = self.runner.run(&invocation).await?;
        if output.success() && output.stderr.trim().is_empty() {
            return Ok(true);
        }
        if output.stderr.contains("NotFound") {
            return Ok(false);
        }
        Err(failed(&invocation, &output))
    }

    pub async fn render_cluster(&self, request: &RenderRequest) -> Result<String, ControlPlaneError> {
        let invocation = Invocation::new(HYPERSHIFT)
            .args(["create", "cluster", "agent"])
            .args(["--name", request.name.as_str()])
            .args(["--infra-id", request.name.as_str()])
            .args(["--agent-namespace", request.agent_namespace.as_str()])
            .arg("--pull-secret")
            .arg(request.pull_secret.display().to_string())
            .args(["--base-domain", request.base_domain.as_str()])
            .arg("--ssh-key")
            .arg(request.ssh_key.display().to_string())
            .args(["--release-image", request.release_image.as_str()])
            .arg("--render");
        let output = self.runner.run_checked(&invocation).await?;
        if output.stdout.trim().is_empty() {
            return Err(ControlPlaneError::InvalidManifest(
                "hypershift rendered no manifests".to_string(),
            ));
        }
        Ok(output.stdout)
    }

    pub async fn apply(&self, manifest: &Path) -> Result<(), ControlPlaneError> {
        let path = manifest.display().to_string();
        self.runner
            .run_strict(&Invocation::new(OC).args(["apply", "-f", path.as_str()]))
            .await?;
        debug!(manifest = %path, "Manifest applied");
        Ok(())
    }

    pub async fn wait_hosted_cluster(
        &self,
        name: &str,
        namespace: &str,
        condition: HostedClusterCondition,
    ) -> Result<(), ControlPlaneError> {
        let timeout = condition.timeout();
        let invocation = Invocation::new(OC)
            .args(["wait", "hc", name, "-n", namespace])
            .arg(format!("--for=condition={}", condition.as_wait_arg()))
            .arg(format!("--timeout={}", oc_duration(timeout)))
            .timeout(timeout + WAIT_GRACE);
        self.runner.run_checked(&invocation).await?;
        Ok(())
    }

    pub async fn api_server_hostname(&self, cp_namespace: &str) -> Result<String, ControlPlaneError> {
        let output = self
            .runner
            .run_strict(&Invocation::new(OC).args(["get", "service", "kube-apiserver", "-n", cp_namespace, "-o", "json"]))
            .await?;
        let service: Service = serde_json::from_str(&output.stdout)?;
        service
            .status
            .and_then(|status| status.load_balancer)
            .and_then(|load_balancer| load_balancer.ingress)
            .and_then(|ingress| ingress.into_iter().next())
            .and_then(|ingress| ingress.hostname)
            .filter(|hostname| !hostname.is_empty())
            .ok_or_else(|| ControlPlaneError::MissingField {
                resource: format!("service {cp_namespace}/kube-apiserver"),
                field: "status.loadBalancer.ingress[0].hostname",
            })
    }

    pub async fn wait_infra_env_image(&self, name: &str, cp_namespace: &str) -> Result<(), ControlPlaneError> {
        let invocation = Invocation::new(OC)
            .arg("wait")
            .arg(format!("--timeout={}", oc_duration(IMAGE_CREATED_TIMEOUT)))
            .arg("--for=condition=ImageCreated")
            .args(["-n", cp_namespace])
            .arg(format!("infraenv/{name}"))
            .timeout(IMAGE_CREATED_TIMEOUT + WAIT_GRACE);
        self.runner.run_strict(&invocation).await?;
        Ok(())
    }

    pub async fn infra_env_iso_url(&self, name: &str, cp_namespace: &str) -> Result<String, ControlPlaneError> {
        let output = self
            .runner
            .run_strict(&Invocation::new(OC).args(["get", "infraenv", name, "-n", cp_namespace, "-o", "json"]))
            .await?;
        let infra_env: InfraEnv = serde_json::from_str(&output.stdout)?;
        infra_env
            .status
            .and_then(|status| status.iso_download_url)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| ControlPlaneError::MissingField {
                resource: format!("infraenv {cp_namespace}/{name}"),
                field: "status.isoDownloadURL",
            })
    }

    pub async fn list_agents(&self, cp_namespace: &str) -> Result<Vec<Agent>, ControlPlaneError> {
        let output = self
            .runner
            .run_strict(&Invocation::new(OC).args(["get", "agents", "-n", cp_namespace, "-o", "json"]))
            .await?;
        let list: ResourceList<Agent> = serde_json::from_str(&output.stdout)?;
        Ok(list.items)
    }

    pub async fn approve_agent(&self, name: &str, cp_namespace: &str, hostname: &str) -> Result<(), ControlPlaneError> {
        let patch = serde_json::json!({"spec": {"approved": true, "hostname": hostname}}).to_string();
        self.runner
            .run_strict(&Invocation::new(OC).args([
                "patch",
                "agent",
                name,
                "-n",
                cp_namespace,
                "-p",
                patch.as_str(),
                "--type",
                "merge",
            ]))
            .await?;
        info!(agent = name, hostname, "Agent approved");
        Ok(())
    }

    pub async fn scale_node_pool(&self, name: &str, namespace: &str, replicas: u32) -> Result<(), ControlPlaneError> {
        let replicas = replicas.to_string();
        self.runner
            .run_strict(&Invocation::new(OC).args([
                "scale",
                "np",
                name,
                "-n",
                namespace,
                "--replicas",
                replicas.as_str(),
            ]))
            .await?;
        Ok(())
    }

    pub async fn create_kubeconfig(&self, name: &str) -> Result<String, ControlPlaneError> {
        let output = self
            .runner
            .run_strict(&Invocation::new(HYPERSHIFT).args(["create", "kubeconfig", "--name", name]))
            .await?;
        Ok(output.stdout)
    }

    pub async fn pin_ingress_to_node(&self, kubeconfig: &Path, hostname: &str) -> Result<(), ControlPlaneError> {
        let patch = ingress_node_placement(hostname).to_string();
        self.runner
            .run_strict(
                &Invocation::new(OC)
                    .args([
                        "patch",
                        "ingresscontroller",
                        "default",
                        "-n",
                        "openshift-ingress-operator",
                        "-p",
                        patch.as_str(),
                        "--type=merge",
                    ])
                    .arg(format!("--kubeconfig={}", kubeconfig.display())),
            )
            .await?;
        Ok(())
    }

    pub async fn destroy_cluster(&self, name: &str) -> Result<(), ControlPlaneError> {
        self.runner
            .run_strict(
                &Invocation::new(HYPERSHIFT)
                    .args(["destroy", "cluster", "agent", "--name", name, "--infra-id", name])
                    .timeout(DESTROY_TIMEOUT),
            )
            .await?;
        Ok(())
    }
}

/// Merge patch pinning the default ingress controller to `hostname`
pub fn ingress_node_placement(hostname: &str) -> serde_json::Value {
    serde_json::json!({
        "spec": {
            "nodePlacement": {
                "nodeSelector": {"matchLabels": {"kubernetes.io/hostname": hostname}},
                "tolerations": [
                    {"effect": "NoSchedule", "key": "kubernetes.io/hostname", "operator": "Exists"}
                ]
            }
        }
    })
}

fn failed(invocation: &Invocation, output: &cli_runner::CommandOutput) -> ControlPlaneError {
    ControlPlaneError::Exec(cli_runner::ExecError::Failed {
        command: invocation.command_line(),
        status: output.status_text(),
        stderr: output.stderr.trim().to_string(),
    })
}

#[async_trait::async_trait]
impl ControlPlaneClientTrait for HypershiftClient {
    async fn create_namespace(&self, namespace: &str) -> Result<(), ControlPlaneError> {
        self.create_namespace(namespace).await
    }

    async fn hosted_cluster_exists(&self, name: &str, namespace: &str) -> Result<bool, ControlPlaneError> {
        self.hosted_cluster_exists(name, namespace).await
    }

    async fn render_cluster(&self, request: &RenderRequest) -> Result<String, ControlPlaneError> {
        self.render_cluster(request).await
    }

    async fn apply(&self, manifest: &Path) -> Result<(), ControlPlaneError> {
        self.apply(manifest).await
    }

    async fn wait_hosted_cluster(
        &self,
        name: &str,
        namespace: &str,
        condition: HostedClusterCondition,
    ) -> Result<(), ControlPlaneError> {
        self.wait_hosted_cluster(name, namespace, condition).await
    }

    async fn api_server_hostname(&self, cp_namespace: &str) -> Result<String, ControlPlaneError> {
        self.api_server_hostname(cp_namespace).await
    }

    async fn wait_infra_env_image(&self, name: &str, cp_namespace: &str) -> Result<(), ControlPlaneError> {
        self.wait_infra_env_image(name, cp_namespace).await
    }

    async fn infra_env_iso_url(&self, name: &str, cp_namespace: &str) -> Result<String, ControlPlaneError> {
        self.infra_env_iso_url(name, cp_namespace).await
    }

    async fn list_agents(&self, cp_namespace: &str) -> Result<Vec<Agent>, ControlPlaneError> {
        self.list_agents(cp_namespace).await
    }

    async fn approve_agent(&self, name: &str, cp_namespace: &str, hostname: &str) -> Result<(), ControlPlaneError> {
        self.approve_agent(name, cp_namespace, hostname).await
    }

    async fn scale_node_pool(&self, name: &str, namespace: &str, replicas: u32) -> Result<(), ControlPlaneError> {
        self.scale_node_pool(name, namespace, replicas).await
    }

    async fn create_kubeconfig(&self, name: &str) -> Result<String, ControlPlaneError> {
        self.create_kubeconfig(name).await
    }

    async fn pin_ingress_to_node(&self, kubeconfig: &Path, hostname: &str) -> Result<(), ControlPlaneError> {
        self.pin_ingress_to_node(kubeconfig, hostname).await
    }

    async fn destroy_cluster(&self, name: &str) -> Result<(), ControlPlaneError> {
        self.destroy_cluster(name).await
    }
}
