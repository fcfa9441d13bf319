//! InfraEnv CRD
//!
//! Describes the discovery image hosts boot from. The image is built once the
//! `ImageCreated` condition is true and `status.isoDownloadURL` is set.

use crate::common::{Condition, LabelSelector, SecretReference};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "agent-install.openshift.io",
    version = "v1beta1",
    kind = "InfraEnv",
    namespaced,
    status = "InfraEnvStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct InfraEnvSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_architecture: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_secret_ref: Option<SecretReference>,

    /// Public key authorized on the discovery image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_authorized_key: Option<String>,

    /// Selects the NMStateConfigs baked into the image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nm_state_config_label_selector: Option<LabelSelector>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InfraEnvStatus {
    #[serde(rename = "isoDownloadURL", default, skip_serializing_if = "Option::is_none")]
    pub iso_download_url: Option<String>,

    #[serde(default)]
    pub conditions: Vec<Condition>,
}
