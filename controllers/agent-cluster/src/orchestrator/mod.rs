//! Cluster lifecycle orchestration
//!
//! `create` runs a fixed pipeline and stops at the first failing step.
//! `destroy` attempts every teardown step and reports all failures together.
//! Every component the pipeline touches is handed in at construction.

mod create;
mod destroy;
#[cfg(test)]
mod create_test;

use crate::agents::AgentProvisioner;
use crate::cluster::ClusterSpec;
use crate::dns::DnsReconciler;
use crate::download::Downloader;
use crate::error::ControllerError;
use crate::manifest::ManifestDir;
use crate::media::MediaMounter;
use crate::reconciler::ResourceReconciler;
use hypershift_client::ControlPlaneClientTrait;
use std::fmt;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Components the orchestrator sequences
pub struct Components {
    pub reconciler: ResourceReconciler,
    pub provisioner: AgentProvisioner,
    pub media: MediaMounter,
    pub dns: DnsReconciler,
    pub control_plane: Arc<dyn ControlPlaneClientTrait>,
    pub downloader: Arc<dyn Downloader>,
}

impl fmt::Debug for Components {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Components")
            .field("reconciler", &self.reconciler)
            .field("provisioner", &self.provisioner)
            .field("media", &self.media)
            .field("dns", &self.dns)
            .finish_non_exhaustive()
    }
}

/// Creates and destroys one cluster
#[derive(Debug)]
pub struct Orchestrator {
    spec: ClusterSpec,
    components: Components,
    manifests: ManifestDir,
}

impl Orchestrator {
    /// Manifests, the discovery image and the kubeconfig go to `<root>/.<name>`
    pub fn new(spec: ClusterSpec, components: Components, root: &Path) -> Self {
        let manifests = ManifestDir::new(spec.manifest_dir(root));
        Self {
            spec,
            components,
            manifests,
        }
    }

    pub fn manifest_dir(&self) -> &Path {
        self.manifests.path()
    }
}

/// Create pipeline steps, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateStep {
    ReconcileBootResources,
    ResolveNetwork,
    ProvisionAgents,
    EnsureControlPlane,
    WaitControlPlaneAvailable,
    ApplyNetworkConfig,
    ReconcileDns,
    ApplyInfraEnv,
    WaitDiscoveryImage,
    DownloadDiscoveryImage,
    MountDiscoveryImage,
    RebootAgents,
    ApproveAgents,
    ScaleNodePool,
    WriteKubeconfig,
    PinIngress,
    WaitClusterVersion,
}

impl fmt::Display for CreateStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CreateStep::ReconcileBootResources => "reconcile boot resources",
            CreateStep::ResolveNetwork => "resolve network",
            CreateStep::ProvisionAgents => "provision agents",
            CreateStep::EnsureControlPlane => "ensure control plane",
            CreateStep::WaitControlPlaneAvailable => "wait for control plane",
            CreateStep::ApplyNetworkConfig => "apply NMState configs",
            CreateStep::ReconcileDns => "reconcile DNS records",
            CreateStep::ApplyInfraEnv => "apply InfraEnv",
            CreateStep::WaitDiscoveryImage => "wait for discovery image",
            CreateStep::DownloadDiscoveryImage => "download discovery image",
            CreateStep::MountDiscoveryImage => "mount discovery image",
            CreateStep::RebootAgents => "reboot agents",
            CreateStep::ApproveAgents => "approve agents",
            CreateStep::ScaleNodePool => "scale node pool",
            CreateStep::WriteKubeconfig => "write kubeconfig",
            CreateStep::PinIngress => "pin ingress",
            CreateStep::WaitClusterVersion => "wait for cluster version",
        };
        f.write_str(name)
    }
}

/// Teardown steps, in execution order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestroyStep {
    ScaleDownNodePool,
    DestroyControlPlane,
    CleanupImage,
    CleanupVolume,
    CleanupFlavor,
    DestroyAgents,
    RemoveDiscoveryImage,
    RemoveDnsRecord(String),
    RemoveManifestDir,
}

impl fmt::Display for DestroyStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DestroyStep::ScaleDownNodePool => f.write_str("scale down node pool"),
            DestroyStep::DestroyControlPlane => f.write_str("destroy control plane"),
            DestroyStep::CleanupImage => f.write_str("delete boot image"),
            DestroyStep::CleanupVolume => f.write_str("delete boot volume"),
            DestroyStep::CleanupFlavor => f.write_str("delete flavor"),
            DestroyStep::DestroyAgents => f.write_str("delete agent instances"),
            DestroyStep::RemoveDiscoveryImage => f.write_str("remove discovery image from VIOS"),
            DestroyStep::RemoveDnsRecord(name) => write!(f, "delete DNS record {name}"),
            DestroyStep::RemoveManifestDir => f.write_str("remove manifest directory"),
        }
    }
}

/// Run one create step: log on success, attach the step name on failure
async fn run_step<T, E, F>(step: CreateStep, work: F) -> Result<T, ControllerError>
where
    F: Future<Output = Result<T, E>>,
    E: Into<ControllerError>,
{
    match work.await {
        Ok(value) => {
            info!(step = %step, "Step complete");
            Ok(value)
        }
        Err(e) => Err(e.into().in_step(step)),
    }
}
