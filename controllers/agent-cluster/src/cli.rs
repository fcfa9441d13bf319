//! Command-line surface

use crate::cluster::ClusterSpec;
use crate::error::ControllerError;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// HyperShift agent clusters on PowerVC
#[derive(Parser, Debug)]
#[command(name = "agent-cluster")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create or destroy a hosted agent cluster
    Cluster {
        #[command(subcommand)]
        action: ClusterAction,
    },
    /// Create a cluster, then destroy it
    E2e(ClusterArgs),
}

#[derive(Subcommand, Debug)]
pub enum ClusterAction {
    /// Provision agents and bring up the hosted cluster
    Create(ClusterArgs),
    /// Tear down everything `create` made, continuing past failures
    Destroy(ClusterArgs),
}

/// Cluster inputs, each also settable through the environment
#[derive(Args, Debug, Clone, Default)]
pub struct ClusterArgs {
    /// Hosted cluster name
    #[arg(long, env = "HC_NAME")]
    pub name: Option<String>,

    /// Namespace of the HostedCluster
    #[arg(long, env = "HC_NAMESPACE", default_value = "clusters")]
    pub namespace: String,

    /// DNS domain managed in IBM Cloud Internet Services
    #[arg(long, env = "BASE_DOMAIN")]
    pub base_domain: Option<String>,

    /// Path to the pull secret
    #[arg(long, env = "PULL_SECRET")]
    pub pull_secret: Option<PathBuf>,

    /// Path to the SSH public key authorized on the agents
    #[arg(long, env = "SSH_PUB_KEY")]
    pub ssh_key: Option<PathBuf>,

    /// OpenShift release image
    #[arg(long, env = "RELEASE_IMAGE")]
    pub release_image: Option<String>,

    /// Number of agents in the node pool
    #[arg(long, env = "NODE_COUNT", default_value_t = 2)]
    pub node_count: u32,
}

impl ClusterArgs {
    /// Validate and freeze the inputs; every missing one is reported
    pub fn into_spec(self) -> Result<ClusterSpec, ControllerError> {
        let mut problems = Vec::new();
        let name = present(self.name, "--name", &mut problems);
        let base_domain = present(self.base_domain, "--base-domain", &mut problems);
        let pull_secret = present(self.pull_secret, "--pull-secret", &mut problems);
        let ssh_key = present(self.ssh_key, "--ssh-key", &mut problems);
        let release_image = present(self.release_image, "--release-image", &mut problems);
        if self.namespace.is_empty() {
            problems.push("--namespace must not be empty".to_string());
        }
        if self.node_count < 1 {
            problems.push("--node-count must be at least 1".to_string());
        }

        match (name, base_domain, pull_secret, ssh_key, release_image) {
            (Some(name), Some(base_domain), Some(pull_secret), Some(ssh_key), Some(release_image))
                if problems.is_empty() =>
            {
                Ok(ClusterSpec {
                    name,
                    namespace: self.namespace,
                    base_domain,
                    pull_secret,
                    ssh_key,
                    release_image,
                    node_count: self.node_count,
                })
            }
            _ => Err(ControllerError::Validation(problems.join("; "))),
        }
    }
}

fn present<T: IsBlank>(value: Option<T>, flag: &str, problems: &mut Vec<String>) -> Option<T> {
    match value {
        Some(value) if !value.is_blank() => Some(value),
        _ => {
            problems.push(format!("{flag} is required"));
            None
        }
    }
}

trait IsBlank {
    fn is_blank(&self) -> bool;
}

impl IsBlank for String {
    fn is_blank(&self) -> bool {
        self.trim().is_empty()
    }
}

impl IsBlank for PathBuf {
    fn is_blank(&self) -> bool {
        self.as_os_str().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> ClusterArgs {
        ClusterArgs {
            name: Some("demo".to_string()),
            namespace: "clusters".to_string(),
            base_domain: Some("example.com".to_string()),
            pull_secret: Some(PathBuf::from("pull-secret.json")),
            ssh_key: Some(PathBuf::from("id_rsa.pub")),
            release_image: Some("quay.io/openshift-release-dev/ocp-release:4.15.0-multi".to_string()),
            node_count: 2,
        }
    }

    #[test]
    fn test_into_spec() {
        let spec = complete().into_spec().unwrap();
        assert_eq!(spec.name, "demo");
        assert_eq!(spec.node_count, 2);
    }

    #[test]
    fn test_missing_inputs_reported_together() {
        let args = ClusterArgs {
            name: None,
            release_image: Some("  ".to_string()),
            ..complete()
        };
        let err = args.into_spec().unwrap_err();
        let message = err.to_string();
        assert!(matches!(err, ControllerError::Validation(_)));
        assert!(message.contains("--name is required"));
        assert!(message.contains("--release-image is required"));
    }

    #[test]
    fn test_zero_nodes_rejected() {
        let args = ClusterArgs {
            node_count: 0,
            ..complete()
        };
        assert!(matches!(args.into_spec(), Err(ControllerError::Validation(_))));
    }

    #[test]
    fn test_parse_subcommands() {
        let cli = Cli::try_parse_from([
            "agent-cluster",
            "cluster",
            "create",
            "--name",
            "demo",
            "--base-domain",
            "example.com",
            "--pull-secret",
            "ps.json",
            "--ssh-key",
            "id.pub",
            "--release-image",
            "quay.io/ocp:4.15",
            "--node-count",
            "3",
        ])
        .unwrap();
        match cli.command {
            Commands::Cluster {
                action: ClusterAction::Create(args),
            } => {
                assert_eq!(args.name.as_deref(), Some("demo"));
                assert_eq!(args.node_count, 3);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
