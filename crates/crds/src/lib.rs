//! agent-cluster resource definitions
//!
//! Typed forms of the custom resources the orchestrator renders (`NMStateConfig`,
//! `InfraEnv`) or reads back (`Agent`, `InfraEnv` status), plus the service
//! publishing policy forced onto the rendered `HostedCluster`.

pub mod agent;
pub mod common;
pub mod hosted_cluster;
pub mod infra_env;
pub mod nmstate_config;

pub use agent::*;
pub use common::*;
pub use hosted_cluster::*;
pub use infra_env::*;
pub use nmstate_config::*;

/// Label linking NMStateConfigs to the InfraEnv that selects them
pub const INFRAENV_LABEL: &str = "infraenvs.agent-install.openshift.io";
