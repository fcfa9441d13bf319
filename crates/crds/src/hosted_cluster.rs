//! HostedCluster service publishing
//!
//! The rendered HostedCluster is not modelled in full; only `spec.services`
//! is replaced, so only that shape is typed here.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Kind of the control-plane document in the rendered manifest set
pub const HOSTED_CLUSTER_KIND: &str = "HostedCluster";

/// How a control-plane service is exposed; only the strategies the
/// publishing policy uses are modelled
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum PublishingStrategyType {
    LoadBalancer,
    Route,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ServicePublishingStrategy {
    #[serde(rename = "type")]
    pub type_: PublishingStrategyType,
}

/// One entry of `spec.services`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServicePublishingStrategyMapping {
    pub service: String,
    pub service_publishing_strategy: ServicePublishingStrategy,
}

impl ServicePublishingStrategyMapping {
    pub fn new(service: &str, type_: PublishingStrategyType) -> Self {
        Self {
            service: service.to_string(),
            service_publishing_strategy: ServicePublishingStrategy { type_ },
        }
    }
}

/// Exposure policy for agent clusters: a load-balanced API server, routed
/// OAuth/Konnectivity/Ignition/OVN southbound, no OIDC.
pub fn hosted_cluster_services() -> Vec<ServicePublishingStrategyMapping> {
    use PublishingStrategyType::{LoadBalancer, None, Route};
    vec![
        ServicePublishingStrategyMapping::new("APIServer", LoadBalancer),
        ServicePublishingStrategyMapping::new("OAuthServer", Route),
        ServicePublishingStrategyMapping::new("OIDC", None),
        ServicePublishingStrategyMapping::new("Konnectivity", Route),
        ServicePublishingStrategyMapping::new("Ignition", Route),
        ServicePublishingStrategyMapping::new("OVNSbDb", Route),
    ]
}
