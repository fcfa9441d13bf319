//! Agent Cluster
//!
//! Creates and destroys HyperShift hosted clusters whose workers are PowerVC
//! instances booted from the assisted-installer discovery image:
//! - PowerVC: boot volume, image, flavor and the agent instances
//! - HMC / VIOS: discovery image mounted as virtual optical media
//! - IBM Cloud Internet Services: api, api-int and *.apps records
//! - Management cluster: HostedCluster, NMStateConfigs, InfraEnv, agent approval

mod agents;
mod cli;
mod cluster;
mod config;
mod dns;
mod download;
mod error;
mod manifest;
mod media;
mod orchestrator;
mod poller;
mod reconciler;
#[cfg(test)]
mod test_utils;

use crate::agents::AgentProvisioner;
use crate::cli::{Cli, ClusterAction, Commands};
use crate::cluster::ClusterSpec;
use crate::config::InfraConfig;
use crate::dns::DnsReconciler;
use crate::download::HttpDownloader;
use crate::error::ControllerError;
use crate::media::MediaMounter;
use crate::orchestrator::{Components, Orchestrator};
use crate::reconciler::ResourceReconciler;
use cis_client::CisClient;
use clap::Parser;
use cli_runner::{CommandRunner, ProcessRunner};
use hmc_client::{HmcClient, SshSession};
use hypershift_client::HypershiftClient;
use powervc_client::{PowerVcClient, PowerVcClientTrait};
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Create,
    Destroy,
    EndToEnd,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();
    let (mode, args) = match cli.command {
        Commands::Cluster {
            action: ClusterAction::Create(args),
        } => (Mode::Create, args),
        Commands::Cluster {
            action: ClusterAction::Destroy(args),
        } => (Mode::Destroy, args),
        Commands::E2e(args) => (Mode::EndToEnd, args),
    };

    let spec = args.into_spec()?;
    let config = InfraConfig::from_env()?;
    info!(cluster = %spec.name, namespace = %spec.namespace, mode = ?mode, "Starting");
    info!(config = ?config, "Configuration");

    let orchestrator = build_orchestrator(spec, &config).await?;
    info!(manifests = %orchestrator.manifest_dir().display(), "Clients ready");
    match mode {
        Mode::Create => orchestrator.create().await?,
        Mode::Destroy => orchestrator.destroy().await?,
        Mode::EndToEnd => {
            orchestrator.create().await?;
            orchestrator.destroy().await?;
        }
    }
    Ok(())
}

/// Connect every external system once and hand the clients to the orchestrator
async fn build_orchestrator(spec: ClusterSpec, config: &InfraConfig) -> Result<Orchestrator, ControllerError> {
    let runner: Arc<dyn CommandRunner> = Arc::new(ProcessRunner::default());

    let powervc = PowerVcClient::new(config.powervc.clone())?;
    powervc.authenticate().await?;
    let powervc: Arc<dyn PowerVcClientTrait> = Arc::new(powervc);
    info!("Authenticated to PowerVC");

    let hmc_shell = SshSession::new(config.hmc.clone());
    let vios_shell = SshSession::new(config.vios.clone());
    let hmc = HmcClient::new(Arc::new(hmc_shell), Arc::new(vios_shell), config.vios_home.clone());

    let cis = CisClient::connect(
        Arc::clone(&runner),
        config.ibmcloud_api_key.clone(),
        spec.base_domain.clone(),
    )
    .await?;

    let components = Components {
        reconciler: ResourceReconciler::new(
            Arc::clone(&powervc),
            config.storage_template.clone(),
            config.network_name.clone(),
        ),
        provisioner: AgentProvisioner::new(Arc::clone(&powervc), config.network_name.clone(), config.host.clone()),
        media: MediaMounter::new(Arc::new(hmc), config.host.clone()),
        dns: DnsReconciler::new(Arc::new(cis)),
        control_plane: Arc::new(HypershiftClient::new(Arc::clone(&runner))),
        downloader: Arc::new(HttpDownloader::new(config.powervc.insecure)?),
    };
    Ok(Orchestrator::new(spec, components, Path::new(".")))
}
