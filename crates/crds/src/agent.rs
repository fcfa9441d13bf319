//! Agent CRD
//!
//! A host that booted the discovery image and registered with the assisted
//! installer. It joins the node pool once approved.

use crate::common::Condition;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "agent-install.openshift.io",
    version = "v1beta1",
    kind = "Agent",
    namespaced,
    status = "AgentStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct AgentSpec {
    /// Whether the host may be installed
    #[serde(default)]
    pub approved: bool,

    /// Host name to install with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AgentStatus {
    /// Hardware inventory, present once the host has reported in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory: Option<AgentInventory>,

    #[serde(default)]
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AgentInventory {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,

    #[serde(default)]
    pub interfaces: Vec<InventoryInterface>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventoryInterface {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,

    #[serde(default)]
    pub ipv4_addresses: Vec<String>,
}

impl Agent {
    /// MAC addresses reported by the host, empty until the inventory arrives
    pub fn inventory_macs(&self) -> Vec<&str> {
        self.status
            .as_ref()
            .and_then(|status| status.inventory.as_ref())
            .map(|inventory| {
                inventory
                    .interfaces
                    .iter()
                    .filter_map(|interface| interface.mac_address.as_deref())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn is_approved(&self) -> bool {
        self.spec.approved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ResourceList;

    #[test]
    fn test_agent_list_decodes() {
        let body = r#"{
            "apiVersion": "v1",
            "kind": "List",
            "metadata": {"resourceVersion": ""},
            "items": [
                {
                    "apiVersion": "agent-install.openshift.io/v1beta1",
                    "kind": "Agent",
                    "metadata": {"name": "0b1e", "namespace": "clusters-demo"},
                    "spec": {"approved": false},
                    "status": {
                        "inventory": {
                            "interfaces": [
                                {"name": "env2", "macAddress": "fa:16:3e:00:00:01", "ipv4Addresses": ["10.0.0.11/24"]}
                            ]
                        }
                    }
                },
                {
                    "apiVersion": "agent-install.openshift.io/v1beta1",
                    "kind": "Agent",
                    "metadata": {"name": "9c4d", "namespace": "clusters-demo"},
                    "spec": {"approved": true, "hostname": "demo-worker-2"}
                }
            ]
        }"#;
        let list: ResourceList<Agent> = serde_json::from_str(body).unwrap();
        assert_eq!(list.items.len(), 2);
        assert_eq!(list.items[0].inventory_macs(), vec!["fa:16:3e:00:00:01"]);
        assert!(!list.items[0].is_approved());
        assert!(list.items[1].inventory_macs().is_empty());
        assert!(list.items[1].is_approved());
    }
}
