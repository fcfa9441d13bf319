//! Create pipeline

use super::{CreateStep, Orchestrator, run_step};
use crate::agents::Agent;
use crate::error::ControllerError;
use crate::manifest::{render_infra_env, render_nmstate_config, rewrite_hosted_cluster};
use crate::poller::poll_until;
use crate::reconciler::NetworkInfo;
use cis_client::RecordType;
use hypershift_client::{HostedClusterCondition, RenderRequest};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

pub const APPROVAL_POLL_INTERVAL: Duration = Duration::from_secs(60);
pub const APPROVAL_POLL_TIMEOUT: Duration = Duration::from_secs(30 * 60);

const CLUSTERS_MANIFEST: &str = "clusters.yaml";
const INFRA_ENV_MANIFEST: &str = "infraenv.yaml";
const KUBECONFIG: &str = "kubeconfig";

impl Orchestrator {
    /// Bring the cluster up; the first failing step aborts with its name attached
    pub async fn create(&self) -> Result<(), ControllerError> {
        let spec = &self.spec;
        let parts = &self.components;
        info!(cluster = %spec.name, nodes = spec.node_count, "Creating cluster");

        let boot = run_step(
            CreateStep::ReconcileBootResources,
            parts.reconciler.reconcile_boot_resources(&spec.name, &spec.flavor_id()),
        )
        .await?;
        let network = run_step(CreateStep::ResolveNetwork, parts.reconciler.resolve_network()).await?;
        let agents = run_step(
            CreateStep::ProvisionAgents,
            parts
                .provisioner
                .provision(&spec.worker_group(), &boot, &network, spec.node_count),
        )
        .await?;

        run_step(CreateStep::EnsureControlPlane, self.ensure_control_plane()).await?;
        run_step(
            CreateStep::WaitControlPlaneAvailable,
            parts
                .control_plane
                .wait_hosted_cluster(&spec.name, &spec.namespace, HostedClusterCondition::Available),
        )
        .await?;

        run_step(CreateStep::ApplyNetworkConfig, self.apply_network_config(&agents, &network)).await?;
        run_step(CreateStep::ReconcileDns, self.reconcile_dns(&agents)).await?;
        run_step(CreateStep::ApplyInfraEnv, self.apply_infra_env()).await?;
        run_step(
            CreateStep::WaitDiscoveryImage,
            parts
                .control_plane
                .wait_infra_env_image(&spec.name, &spec.control_plane_namespace()),
        )
        .await?;
        let image = run_step(CreateStep::DownloadDiscoveryImage, self.download_discovery_image()).await?;
        run_step(CreateStep::MountDiscoveryImage, parts.media.mount(&image, &agents)).await?;
        run_step(CreateStep::RebootAgents, parts.provisioner.reboot(&agents)).await?;

        run_step(CreateStep::ApproveAgents, self.approve_agents(&agents)).await?;
        run_step(
            CreateStep::ScaleNodePool,
            parts
                .control_plane
                .scale_node_pool(&spec.name, &spec.namespace, spec.node_count),
        )
        .await?;

        let kubeconfig = run_step(CreateStep::WriteKubeconfig, self.write_kubeconfig()).await?;
        let primary = primary_agent(&agents)?;
        run_step(
            CreateStep::PinIngress,
            parts.control_plane.pin_ingress_to_node(&kubeconfig, &primary.name),
        )
        .await?;
        run_step(
            CreateStep::WaitClusterVersion,
            parts.control_plane.wait_hosted_cluster(
                &spec.name,
                &spec.namespace,
                HostedClusterCondition::ClusterVersionAvailable,
            ),
        )
        .await?;

        info!(cluster = %spec.name, kubeconfig = %kubeconfig.display(), "Cluster created");
        Ok(())
    }

    /// Create the control-plane namespace, then render and apply the
    /// HostedCluster unless it already exists
    async fn ensure_control_plane(&self) -> Result<(), ControllerError> {
        let spec = &self.spec;
        let control_plane = &self.components.control_plane;

        self.manifests.ensure().await?;
        control_plane.create_namespace(&spec.control_plane_namespace()).await?;

        if control_plane.hosted_cluster_exists(&spec.name, &spec.namespace).await? {
            info!(cluster = %spec.name, "HostedCluster already exists, reusing it");
            return Ok(());
        }

        let rendered = control_plane
            .render_cluster(&RenderRequest {
                name: spec.name.clone(),
                agent_namespace: spec.control_plane_namespace(),
                pull_secret: spec.pull_secret.clone(),
                base_domain: spec.base_domain.clone(),
                ssh_key: spec.ssh_key.clone(),
                release_image: spec.release_image.clone(),
            })
            .await?;
        let manifest = rewrite_hosted_cluster(&rendered)?;
        let path = self.manifests.write(CLUSTERS_MANIFEST, &manifest).await?;
        control_plane.apply(&path).await?;
        info!(cluster = %spec.name, "HostedCluster applied");
        Ok(())
    }

    async fn apply_network_config(&self, agents: &[Agent], network: &NetworkInfo) -> Result<(), ControllerError> {
        for agent in agents {
            let manifest = render_nmstate_config(&self.spec, agent, network)?;
            let path = self
                .manifests
                .write(&format!("nmstate-config-{}.yaml", agent.partition_name), &manifest)
                .await?;
            self.components.control_plane.apply(&path).await?;
            debug!(agent = %agent.name, "NMStateConfig applied");
        }
        Ok(())
    }

    /// api and api-int follow the API load balancer, *.apps goes to the first agent
    async fn reconcile_dns(&self, agents: &[Agent]) -> Result<(), ControllerError> {
        let spec = &self.spec;
        let dns = &self.components.dns;
        let api_hostname = self
            .components
            .control_plane
            .api_server_hostname(&spec.control_plane_namespace())
            .await?;
        let primary = primary_agent(agents)?;

        dns.upsert_record(RecordType::Cname, &spec.api_record(), &api_hostname)
            .await?;
        dns.upsert_record(RecordType::Cname, &spec.api_internal_record(), &api_hostname)
            .await?;
        dns.upsert_record(RecordType::A, &spec.apps_record(), &primary.ip)
            .await?;
        Ok(())
    }

    async fn apply_infra_env(&self) -> Result<(), ControllerError> {
        let ssh_key = tokio::fs::read_to_string(&self.spec.ssh_key).await.map_err(|e| {
            ControllerError::Validation(format!("cannot read SSH key {}: {e}", self.spec.ssh_key.display()))
        })?;
        let manifest = render_infra_env(&self.spec, &ssh_key)?;
        let path = self.manifests.write(INFRA_ENV_MANIFEST, &manifest).await?;
        self.components.control_plane.apply(&path).await?;
        Ok(())
    }

    async fn download_discovery_image(&self) -> Result<PathBuf, ControllerError> {
        let url = self
            .components
            .control_plane
            .infra_env_iso_url(&self.spec.name, &self.spec.control_plane_namespace())
            .await?;
        self.manifests.ensure().await?;
        let path = self.manifests.file(&self.spec.discovery_iso());
        self.components.downloader.download(&url, &path).await?;
        Ok(path)
    }

    /// Approve discovered agents whose inventory carries a provisioned MAC until
    /// `node_count` of them are approved
    async fn approve_agents(&self, agents: &[Agent]) -> Result<usize, ControllerError> {
        let control_plane = &self.components.control_plane;
        let namespace = self.spec.control_plane_namespace();
        let required = self.spec.node_count as usize;

        poll_until(
            APPROVAL_POLL_INTERVAL,
            APPROVAL_POLL_TIMEOUT,
            &format!("{required} agents to be approved"),
            || {
                let namespace = namespace.as_str();
                async move {
                    let mut approved = 0;
                    for discovered in control_plane.list_agents(namespace).await? {
                        let Some(agent) = agents.iter().find(|agent| {
                            discovered
                                .inventory_macs()
                                .iter()
                                .any(|mac| mac.eq_ignore_ascii_case(&agent.mac))
                        }) else {
                            continue;
                        };
                        if !discovered.is_approved() {
                            let name = discovered.metadata.name.as_deref().ok_or_else(|| {
                                ControllerError::Parse(format!("agent for {} has no name", agent.name))
                            })?;
                            control_plane.approve_agent(name, namespace, &agent.name).await?;
                            info!(agent = name, hostname = %agent.name, "Agent approved");
                        }
                        approved += 1;
                    }
                    debug!(approved, required, "Agent approval progress");
                    Ok((approved >= required).then_some(approved))
                }
            },
        )
        .await
    }

    async fn write_kubeconfig(&self) -> Result<PathBuf, ControllerError> {
        let kubeconfig = self.components.control_plane.create_kubeconfig(&self.spec.name).await?;
        self.manifests.write(KUBECONFIG, &kubeconfig).await
    }
}

/// The agent DNS and ingress point at
fn primary_agent(agents: &[Agent]) -> Result<&Agent, ControllerError> {
    agents
        .first()
        .ok_or_else(|| ControllerError::NotFound("provisioned agents".to_string()))
}
