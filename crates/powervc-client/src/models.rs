//! PowerVC API models
//!
//! Request and response bodies for the OpenStack compute (nova), network (neutron),
//! block storage (cinder) and image (glance) APIs as exposed by PowerVC.
//! Only the fields the orchestrator reads are modelled.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cinder volume type (storage template)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VolumeType {
    pub id: String,
    pub name: String,
}

/// Cinder volume
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Volume {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub volume_type: Option<String>,
}

/// Volume creation request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateVolumeRequest {
    pub name: String,
    /// Size in GiB
    pub size: u64,
    pub volume_type: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

/// Glance image
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Image {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Image visibility
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImageVisibility {
    #[default]
    Private,
    Shared,
    Community,
    Public,
}

/// Image creation request
///
/// `properties` are flattened into the top-level body, which is how glance v2
/// accepts custom image properties.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateImageRequest {
    pub name: String,
    pub container_format: String,
    pub disk_format: String,
    pub visibility: ImageVisibility,
    pub min_disk: u64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub properties: BTreeMap<String, String>,
}

/// Nova flavor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Flavor {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub ram: u64,
    #[serde(default)]
    pub vcpus: u64,
    #[serde(default)]
    pub disk: u64,
}

/// Flavor creation request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateFlavorRequest {
    pub id: String,
    pub name: String,
    /// Memory in MiB
    pub ram: u64,
    pub vcpus: u64,
    /// Root disk in GiB
    pub disk: u64,
}

/// Neutron network
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Network {
    pub id: String,
    pub name: String,
}

/// Neutron subnet
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Subnet {
    pub id: String,
    pub network_id: String,
    pub cidr: String,
    #[serde(default)]
    pub gateway_ip: Option<String>,
}

/// Nova hypervisor (a managed host)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Hypervisor {
    pub id: serde_json::Value,
    /// Machine type-model-serial identifier on PowerVC
    pub hypervisor_hostname: String,
    #[serde(default)]
    pub service: Option<HypervisorService>,
}

/// Service block of a hypervisor record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct HypervisorService {
    #[serde(default)]
    pub host: Option<String>,
    /// Human-facing host name shown in the PowerVC UI
    #[serde(default)]
    pub host_display_name: Option<String>,
}

/// One address entry of a server on a network
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerAddress {
    pub addr: String,
    #[serde(default)]
    pub version: Option<u8>,
    #[serde(rename = "OS-EXT-IPS-MAC:mac_addr", default)]
    pub mac_addr: Option<String>,
    #[serde(rename = "OS-EXT-IPS:type", default)]
    pub kind: Option<String>,
}

/// Nova server (detailed view)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Server {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(rename = "OS-EXT-STS:vm_state", default)]
    pub vm_state: Option<String>,
    /// Partition (LPAR) name on the managed host
    #[serde(rename = "OS-EXT-SRV-ATTR:instance_name", default)]
    pub instance_name: Option<String>,
    #[serde(default)]
    pub addresses: BTreeMap<String, Vec<ServerAddress>>,
    #[serde(default)]
    pub fault: Option<serde_json::Value>,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
}

/// Network attachment for a server create request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerNetwork {
    pub uuid: String,
}

/// Batch server creation request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateServersRequest {
    pub name: String,
    #[serde(rename = "imageRef")]
    pub image_ref: String,
    #[serde(rename = "flavorRef")]
    pub flavor_ref: String,
    pub networks: Vec<ServerNetwork>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability_zone: Option<String>,
    pub min_count: u32,
    pub max_count: u32,
}

/// Server reboot type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum RebootType {
    Soft,
    Hard,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_decodes_extension_fields() {
        let body = serde_json::json!({
            "id": "srv-1",
            "name": "demo-worker-1",
            "status": "ACTIVE",
            "OS-EXT-STS:vm_state": "active",
            "OS-EXT-SRV-ATTR:instance_name": "demo-worker-1-0000002a",
            "created": "2024-05-01T10:00:00Z",
            "addresses": {
                "vlan100": [{
                    "addr": "10.0.0.11",
                    "version": 4,
                    "OS-EXT-IPS-MAC:mac_addr": "fa:16:3e:00:00:01",
                    "OS-EXT-IPS:type": "fixed"
                }]
            }
        });
        let server: Server = serde_json::from_value(body).unwrap();
        assert_eq!(server.vm_state.as_deref(), Some("active"));
        assert_eq!(server.instance_name.as_deref(), Some("demo-worker-1-0000002a"));
        let address = &server.addresses["vlan100"][0];
        assert_eq!(address.addr, "10.0.0.11");
        assert_eq!(address.mac_addr.as_deref(), Some("fa:16:3e:00:00:01"));
    }

    #[test]
    fn test_image_request_flattens_properties() {
        let mut properties = BTreeMap::new();
        properties.insert("os_distro".to_string(), "coreos".to_string());
        let request = CreateImageRequest {
            name: "demo".to_string(),
            container_format: "bare".to_string(),
            disk_format: "raw".to_string(),
            visibility: ImageVisibility::Private,
            min_disk: 1,
            tags: vec!["purpose:test".to_string()],
            properties,
        };
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["os_distro"], "coreos");
        assert_eq!(body["visibility"], "private");
        assert!(body.get("properties").is_none());
    }

    #[test]
    fn test_servers_request_field_names() {
        let request = CreateServersRequest {
            name: "demo-worker".to_string(),
            image_ref: "i1".to_string(),
            flavor_ref: "demo-flavor".to_string(),
            networks: vec![ServerNetwork { uuid: "n1".to_string() }],
            metadata: BTreeMap::new(),
            availability_zone: Some(":8286-42A-1234567".to_string()),
            min_count: 2,
            max_count: 2,
        };
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["imageRef"], "i1");
        assert_eq!(body["flavorRef"], "demo-flavor");
        assert!(body.get("metadata").is_none());
        assert_eq!(serde_json::to_value(RebootType::Soft).unwrap(), "SOFT");
    }
}
