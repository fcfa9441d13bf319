//! Agent instance provisioning
//!
//! Agents are PowerVC servers created in one batch under a shared group name.
//! Creation is skipped when servers of the group already exist, so a re-run
//! picks up the instances of an earlier attempt.

use crate::error::ControllerError;
use crate::poller::poll_until;
use crate::reconciler::{BootResources, NetworkInfo};
use powervc_client::{CreateServersRequest, PowerVcClientTrait, RebootType, Server, ServerNetwork};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub const ACTIVE_POLL_INTERVAL: Duration = Duration::from_secs(30);
pub const ACTIVE_POLL_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// A provisioned worker instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Agent {
    /// PowerVC server ID
    pub id: String,
    /// Display name; also the node host name
    pub name: String,
    /// LPAR name on the managed system
    pub partition_name: String,
    pub ip: String,
    pub mac: String,
}

/// Creates, converges, reboots and deletes agent instances
pub struct AgentProvisioner {
    powervc: Arc<dyn PowerVcClientTrait>,
    network_name: String,
    /// Display name of the managed system agents are placed on
    host: String,
}

impl std::fmt::Debug for AgentProvisioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentProvisioner")
            .field("network_name", &self.network_name)
            .field("host", &self.host)
            .finish_non_exhaustive()
    }
}

impl AgentProvisioner {
    pub fn new(powervc: Arc<dyn PowerVcClientTrait>, network_name: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            powervc,
            network_name: network_name.into(),
            host: host.into(),
        }
    }

    /// Agents of `group`, in server list order, once every one is active
    pub async fn provision(
        &self,
        group: &str,
        boot: &BootResources,
        network: &NetworkInfo,
        count: u32,
    ) -> Result<Vec<Agent>, ControllerError> {
        if self.group_servers(group).await?.is_empty() {
            let availability_zone = self.availability_zone().await?;
            let request = CreateServersRequest {
                name: group.to_string(),
                image_ref: boot.image_id.clone(),
                flavor_ref: boot.flavor_id.clone(),
                networks: vec![ServerNetwork {
                    uuid: network.network_id.clone(),
                }],
                metadata: BTreeMap::from([("primary_network".to_string(), network.network_id.clone())]),
                availability_zone: Some(availability_zone),
                min_count: count,
                max_count: count,
            };
            self.powervc.create_servers(&request).await?;
            info!(group, count, "Requested agent instances");
        } else {
            info!(group, "Agent instances already exist");
        }

        let servers = self.group_servers(group).await?;
        if servers.is_empty() {
            return Err(ControllerError::NotFound(format!("instances of group {group}")));
        }
        if servers.len() != count as usize {
            return Err(ControllerError::AgentCount {
                group: group.to_string(),
                expected: count,
                found: servers.len(),
            });
        }

        let mut agents = Vec::with_capacity(servers.len());
        for server in servers {
            let server = self.wait_active(&server.id, &server.name).await?;
            let agent = self.to_agent(server)?;
            info!(agent = %agent.name, partition = %agent.partition_name, ip = %agent.ip, "Agent active");
            agents.push(agent);
        }
        Ok(agents)
    }

    /// Soft-reboot each agent in turn; the first failure stops the rest
    pub async fn reboot(&self, agents: &[Agent]) -> Result<(), ControllerError> {
        for agent in agents {
            self.powervc.reboot_server(&agent.id, RebootType::Soft).await?;
            info!(partition = %agent.partition_name, "Rebooted agent");
        }
        Ok(())
    }

    /// Delete every instance of `group`
    pub async fn destroy(&self, group: &str) -> Result<(), ControllerError> {
        for server in self.group_servers(group).await? {
            info!(agent = %server.name, "Deleting agent instance");
            match self.powervc.delete_server(&server.id).await {
                Err(e) if e.is_not_found() => {}
                other => other?,
            }
        }
        Ok(())
    }

    /// Servers named exactly `group`, or `group-<n>` for batch members
    async fn group_servers(&self, group: &str) -> Result<Vec<Server>, ControllerError> {
        Ok(self
            .powervc
            .list_servers(group)
            .await?
            .into_iter()
            .filter(|server| is_group_member(&server.name, group))
            .collect())
    }

    /// `:<hypervisor_hostname>` of the host whose display name is `self.host`
    async fn availability_zone(&self) -> Result<String, ControllerError> {
        self.powervc
            .list_hypervisors()
            .await?
            .into_iter()
            .find(|hypervisor| {
                hypervisor
                    .service
                    .as_ref()
                    .and_then(|service| service.host_display_name.as_deref())
                    == Some(self.host.as_str())
            })
            .map(|hypervisor| format!(":{}", hypervisor.hypervisor_hostname))
            .ok_or_else(|| ControllerError::NotFound(format!("host {}", self.host)))
    }

    async fn wait_active(&self, id: &str, name: &str) -> Result<Server, ControllerError> {
        let powervc = &self.powervc;
        poll_until(
            ACTIVE_POLL_INTERVAL,
            ACTIVE_POLL_TIMEOUT,
            &format!("agent {name} to become active"),
            || async move {
                let server = powervc.get_server(id).await?;
                let state = server.vm_state.clone().unwrap_or_default();
                match state.as_str() {
                    "active" => Ok(Some(server)),
                    "failed" | "error" => Err(ControllerError::TerminalAgentState {
                        name: server.name.clone(),
                        state: state.clone(),
                        details: serde_json::to_string(&server).unwrap_or_default(),
                    }),
                    _ => {
                        info!(agent = %server.name, state = %state, "Waiting for agent to become active");
                        Ok(None)
                    }
                }
            },
        )
        .await
    }

    fn to_agent(&self, server: Server) -> Result<Agent, ControllerError> {
        let partition_name = server
            .instance_name
            .clone()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ControllerError::Parse(format!("server {} has no instance name", server.name)))?;
        let address = server
            .addresses
            .get(&self.network_name)
            .and_then(|addresses| addresses.first())
            .ok_or_else(|| {
                ControllerError::Parse(format!("server {} has no address on {}", server.name, self.network_name))
            })?;
        let mac = address
            .mac_addr
            .clone()
            .ok_or_else(|| ControllerError::Parse(format!("server {} address has no MAC", server.name)))?;

        Ok(Agent {
            ip: address.addr.clone(),
            mac,
            id: server.id,
            name: server.name,
            partition_name,
        })
    }
}

fn is_group_member(name: &str, group: &str) -> bool {
    match name.strip_prefix(group) {
        Some("") => true,
        Some(suffix) => suffix
            .strip_prefix('-')
            .is_some_and(|index| !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit())),
        None => false,
    }
}

#[cfg(test)]
#[path = "agents_test.rs"]
mod agents_test;
