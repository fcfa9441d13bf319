//! Manifest rendering and the per-cluster manifest directory

use crate::agents::Agent;
use crate::cluster::ClusterSpec;
use crate::error::ControllerError;
use crate::reconciler::NetworkInfo;
use crds::{
    HOSTED_CLUSTER_KIND, INFRAENV_LABEL, InfraEnv, InfraEnvSpec, LabelSelector, NMStateConfig, NMStateConfigSpec,
    SecretReference, hosted_cluster_services,
};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const DOCUMENT_SEPARATOR: &str = "---";

/// Replace `spec.services` of the single HostedCluster document in a rendered
/// manifest set. Every other document is returned unchanged and in place.
pub fn rewrite_hosted_cluster(rendered: &str) -> Result<String, ControllerError> {
    let mut documents = split_documents(rendered);

    let mut target = None;
    for (index, document) in documents.iter().enumerate() {
        if document.trim().is_empty() {
            continue;
        }
        let value: Value = serde_yaml::from_str(document)
            .map_err(|e| ControllerError::Parse(format!("rendered manifest document {index}: {e}")))?;
        if value.get("kind").and_then(Value::as_str) == Some(HOSTED_CLUSTER_KIND) {
            if target.is_some() {
                return Err(ControllerError::Parse(
                    "rendered manifests contain more than one HostedCluster".to_string(),
                ));
            }
            target = Some((index, value));
        }
    }
    let (index, mut hosted_cluster) =
        target.ok_or_else(|| ControllerError::Parse("rendered manifests contain no HostedCluster".to_string()))?;

    let services = serde_yaml::to_value(hosted_cluster_services())
        .map_err(|e| ControllerError::Parse(format!("service publishing policy: {e}")))?;
    hosted_cluster
        .get_mut("spec")
        .and_then(Value::as_mapping_mut)
        .ok_or_else(|| ControllerError::Parse("HostedCluster has no spec".to_string()))?
        .insert(Value::from("services"), services);

    documents[index] = serde_yaml::to_string(&hosted_cluster)
        .map_err(|e| ControllerError::Parse(format!("HostedCluster: {e}")))?;
    Ok(join_documents(&documents))
}

/// Split on separator lines, keeping each document's text as is
fn split_documents(rendered: &str) -> Vec<String> {
    let mut documents = vec![String::new()];
    for line in rendered.lines() {
        if line.trim_end() == DOCUMENT_SEPARATOR {
            documents.push(String::new());
        } else if let Some(current) = documents.last_mut() {
            current.push_str(line);
            current.push('\n');
        }
    }
    documents
}

fn join_documents(documents: &[String]) -> String {
    documents.join(&format!("{DOCUMENT_SEPARATOR}\n"))
}

/// Static network configuration for one agent
pub fn render_nmstate_config(
    spec: &ClusterSpec,
    agent: &Agent,
    network: &NetworkInfo,
) -> Result<String, ControllerError> {
    let mut config = NMStateConfig::new(
        &spec.nmstate_config_name(&agent.partition_name),
        NMStateConfigSpec::static_ipv4(&agent.mac, &agent.ip, network.prefix_length, &network.gateway_ip),
    );
    config.metadata.namespace = Some(spec.control_plane_namespace());
    config.metadata.labels = Some(BTreeMap::from([(INFRAENV_LABEL.to_string(), spec.nmstate_label())]));
    serde_yaml::to_string(&config).map_err(|e| ControllerError::Parse(format!("NMStateConfig: {e}")))
}

/// InfraEnv building the discovery image for this cluster's agents
pub fn render_infra_env(spec: &ClusterSpec, ssh_public_key: &str) -> Result<String, ControllerError> {
    let mut infra_env = InfraEnv::new(
        &spec.name,
        InfraEnvSpec {
            cpu_architecture: Some("ppc64le".to_string()),
            pull_secret_ref: Some(SecretReference {
                name: "pull-secret".to_string(),
            }),
            ssh_authorized_key: Some(ssh_public_key.trim().to_string()),
            nm_state_config_label_selector: Some(LabelSelector {
                match_labels: BTreeMap::from([(INFRAENV_LABEL.to_string(), spec.nmstate_label())]),
            }),
        },
    );
    infra_env.metadata.namespace = Some(spec.control_plane_namespace());
    serde_yaml::to_string(&infra_env).map_err(|e| ControllerError::Parse(format!("InfraEnv: {e}")))
}

/// Local working directory of one cluster
#[derive(Debug, Clone)]
pub struct ManifestDir {
    path: PathBuf,
}

impl ManifestDir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    pub async fn ensure(&self) -> Result<(), ControllerError> {
        tokio::fs::create_dir_all(&self.path).await?;
        Ok(())
    }

    /// Write `contents` to `name` inside the directory and return its path
    pub async fn write(&self, name: &str, contents: &str) -> Result<PathBuf, ControllerError> {
        self.ensure().await?;
        let path = self.file(name);
        tokio::fs::write(&path, contents).await?;
        Ok(path)
    }

    /// Remove the directory and everything in it; a missing directory is fine
    pub async fn remove(&self) -> Result<(), ControllerError> {
        match tokio::fs::remove_dir_all(&self.path).await {
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            other => Ok(other?),
        }
    }
}
