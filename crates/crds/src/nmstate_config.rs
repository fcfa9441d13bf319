//! NMStateConfig CRD
//!
//! Static network configuration for one host, matched to it by MAC address
//! and picked up by the InfraEnv through a label.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Interface name used inside the discovery image
pub const PRIMARY_INTERFACE: &str = "eth0";

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "agent-install.openshift.io",
    version = "v1beta1",
    kind = "NMStateConfig",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct NMStateConfigSpec {
    /// nmstate desired state
    pub config: NetworkState,

    /// Maps interface names in `config` to host MAC addresses
    pub interfaces: Vec<InterfaceMacMapping>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct NetworkState {
    pub interfaces: Vec<NetworkInterface>,
    pub dns_resolver: DnsResolver,
    pub routes: Routes,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct NetworkInterface {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub state: String,
    pub mac_address: String,
    pub ipv4: Ipv4Config,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Ipv4Config {
    pub enabled: bool,
    pub dhcp: bool,
    pub address: Vec<Ipv4Address>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct Ipv4Address {
    pub ip: String,
    pub prefix_length: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct DnsResolver {
    pub config: DnsResolverConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct DnsResolverConfig {
    pub server: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Routes {
    pub config: Vec<Route>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct Route {
    pub destination: String,
    pub next_hop_address: String,
    pub next_hop_interface: String,
    pub table_id: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceMacMapping {
    pub name: String,
    pub mac_address: String,
}

impl NMStateConfigSpec {
    /// Single static IPv4 interface with a default route and DNS via the gateway
    pub fn static_ipv4(mac: &str, ip: &str, prefix_length: u8, gateway: &str) -> Self {
        Self {
            config: NetworkState {
                interfaces: vec![NetworkInterface {
                    name: PRIMARY_INTERFACE.to_string(),
                    type_: "ethernet".to_string(),
                    state: "up".to_string(),
                    mac_address: mac.to_string(),
                    ipv4: Ipv4Config {
                        enabled: true,
                        dhcp: false,
                        address: vec![Ipv4Address {
                            ip: ip.to_string(),
                            prefix_length,
                        }],
                    },
                }],
                dns_resolver: DnsResolver {
                    config: DnsResolverConfig {
                        server: vec![gateway.to_string()],
                    },
                },
                routes: Routes {
                    config: vec![Route {
                        destination: "0.0.0.0/0".to_string(),
                        next_hop_address: gateway.to_string(),
                        next_hop_interface: PRIMARY_INTERFACE.to_string(),
                        table_id: 254,
                    }],
                },
            },
            interfaces: vec![InterfaceMacMapping {
                name: PRIMARY_INTERFACE.to_string(),
                mac_address: mac.to_string(),
            }],
        }
    }
}
