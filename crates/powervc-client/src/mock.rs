//! Mock PowerVcClient for unit testing
//!
//! Stores resources in memory. Tests seed fixtures with the `add_*` methods,
//! script server lifecycle states with [`MockPowerVcClient::set_state_sequence`],
//! inject failures with [`MockPowerVcClient::fail`] and inspect what was called
//! with [`MockPowerVcClient::calls`].

use crate::error::PowerVcError;
use crate::models::*;
use crate::powervc_trait::PowerVcClientTrait;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// Mock PowerVcClient for testing
#[derive(Clone, Default)]
pub struct MockPowerVcClient {
    pub(crate) volume_types: Arc<Mutex<Vec<VolumeType>>>,
    pub(crate) volumes: Arc<Mutex<Vec<Volume>>>,
    pub(crate) images: Arc<Mutex<Vec<Image>>>,
    pub(crate) flavors: Arc<Mutex<HashMap<String, Flavor>>>,
    pub(crate) extra_specs: Arc<Mutex<HashMap<String, BTreeMap<String, String>>>>,
    pub(crate) networks: Arc<Mutex<Vec<Network>>>,
    pub(crate) subnets: Arc<Mutex<Vec<Subnet>>>,
    pub(crate) hypervisors: Arc<Mutex<Vec<Hypervisor>>>,
    pub(crate) servers: Arc<Mutex<Vec<Server>>>,
    pub(crate) server_requests: Arc<Mutex<Vec<CreateServersRequest>>>,
    pub(crate) state_scripts: Arc<Mutex<HashMap<String, VecDeque<String>>>>,
    pub(crate) failures: Arc<Mutex<HashMap<String, String>>>,
    pub(crate) calls: Arc<Mutex<Vec<String>>>,
    pub(crate) next_id: Arc<Mutex<u64>>,
}

impl std::fmt::Debug for MockPowerVcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockPowerVcClient").finish_non_exhaustive()
    }
}

impl MockPowerVcClient {
    /// Create a new, empty mock client
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_volume_type(&self, id: &str, name: &str) {
        self.volume_types.lock().unwrap().push(VolumeType {
            id: id.to_string(),
            name: name.to_string(),
        });
    }

    pub fn add_volume(&self, id: &str, name: &str) {
        self.volumes.lock().unwrap().push(Volume {
            id: id.to_string(),
            name: Some(name.to_string()),
            status: "available".to_string(),
            size: 120,
            volume_type: None,
        });
    }

    pub fn add_image(&self, id: &str, name: &str, tags: &[&str]) {
        self.images.lock().unwrap().push(Image {
            id: id.to_string(),
            name: Some(name.to_string()),
            status: "active".to_string(),
            tags: tags.iter().map(ToString::to_string).collect(),
        });
    }

    pub fn add_flavor(&self, id: &str, name: &str) {
        self.flavors.lock().unwrap().insert(
            id.to_string(),
            Flavor {
                id: id.to_string(),
                name: name.to_string(),
                ram: 16384,
                vcpus: 1,
                disk: 0,
            },
        );
    }

    /// Add a network with a single subnet
    pub fn add_network(&self, id: &str, name: &str, cidr: &str, gateway: &str) {
        self.networks.lock().unwrap().push(Network {
            id: id.to_string(),
            name: name.to_string(),
        });
        self.subnets.lock().unwrap().push(Subnet {
            id: format!("{id}-subnet"),
            network_id: id.to_string(),
            cidr: cidr.to_string(),
            gateway_ip: Some(gateway.to_string()),
        });
    }

    /// Add a network without subnets
    pub fn add_bare_network(&self, id: &str, name: &str) {
        self.networks.lock().unwrap().push(Network {
            id: id.to_string(),
            name: name.to_string(),
        });
    }

    pub fn add_hypervisor(&self, hypervisor_hostname: &str, host_display_name: &str) {
        let mut hypervisors = self.hypervisors.lock().unwrap();
        let id = hypervisors.len() + 1;
        hypervisors.push(Hypervisor {
            id: serde_json::json!(id),
            hypervisor_hostname: hypervisor_hostname.to_string(),
            service: Some(HypervisorService {
                host: Some(hypervisor_hostname.to_string()),
                host_display_name: Some(host_display_name.to_string()),
            }),
        });
    }

    pub fn add_server(&self, server: Server) {
        self.servers.lock().unwrap().push(server);
    }

    /// Lifecycle states returned by successive `get_server` calls for the named server.
    /// The last state repeats. Servers without a script report `active`.
    pub fn set_state_sequence(&self, server_name: &str, states: &[&str]) {
        self.state_scripts.lock().unwrap().insert(
            server_name.to_string(),
            states.iter().map(ToString::to_string).collect(),
        );
    }

    /// Make every call of `operation` (a trait method name) fail with an API error
    pub fn fail(&self, operation: &str, message: &str) {
        self.failures
            .lock()
            .unwrap()
            .insert(operation.to_string(), message.to_string());
    }

    /// Recorded calls as `operation:argument`, oldest first
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of recorded calls of `operation`
    pub fn call_count(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.split(':').next() == Some(operation))
            .count()
    }

    pub fn servers(&self) -> Vec<Server> {
        self.servers.lock().unwrap().clone()
    }

    pub fn server_requests(&self) -> Vec<CreateServersRequest> {
        self.server_requests.lock().unwrap().clone()
    }

    pub fn volumes(&self) -> Vec<Volume> {
        self.volumes.lock().unwrap().clone()
    }

    pub fn images(&self) -> Vec<Image> {
        self.images.lock().unwrap().clone()
    }

    pub fn flavor_ids(&self) -> Vec<String> {
        self.flavors.lock().unwrap().keys().cloned().collect()
    }

    pub fn extra_specs(&self, flavor_id: &str) -> Option<BTreeMap<String, String>> {
        self.extra_specs.lock().unwrap().get(flavor_id).cloned()
    }

    fn record(&self, operation: &str, argument: &str) -> Result<(), PowerVcError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{operation}:{argument}"));
        match self.failures.lock().unwrap().get(operation) {
            Some(message) => Err(PowerVcError::Api(message.clone())),
            None => Ok(()),
        }
    }

    fn next_id(&self, prefix: &str) -> String {
        let mut id = self.next_id.lock().unwrap();
        *id += 1;
        format!("{prefix}-{id}")
    }

    fn network_name(&self, id: &str) -> String {
        self.networks
            .lock()
            .unwrap()
            .iter()
            .find(|network| network.id == id)
            .map_or_else(|| id.to_string(), |network| network.name.clone())
    }
}

#[async_trait::async_trait]
impl PowerVcClientTrait for MockPowerVcClient {
    async fn list_volume_types(&self) -> Result<Vec<VolumeType>, PowerVcError> {
        self.record("list_volume_types", "")?;
        Ok(self.volume_types.lock().unwrap().clone())
    }

    async fn list_volumes(&self, name: &str) -> Result<Vec<Volume>, PowerVcError> {
        self.record("list_volumes", name)?;
        Ok(self
            .volumes
            .lock()
            .unwrap()
            .iter()
            .filter(|volume| volume.name.as_deref() == Some(name))
            .cloned()
            .collect())
    }

    async fn create_volume(&self, request: &CreateVolumeRequest) -> Result<Volume, PowerVcError> {
        self.record("create_volume", &request.name)?;
        let volume = Volume {
            id: self.next_id("vol"),
            name: Some(request.name.clone()),
            status: "creating".to_string(),
            size: request.size,
            volume_type: Some(request.volume_type.clone()),
        };
        self.volumes.lock().unwrap().push(volume.clone());
        Ok(volume)
    }

    async fn delete_volume(&self, id: &str) -> Result<(), PowerVcError> {
        self.record("delete_volume", id)?;
        let mut volumes = self.volumes.lock().unwrap();
        let before = volumes.len();
        volumes.retain(|volume| volume.id != id);
        if volumes.len() == before {
            return Err(PowerVcError::NotFound(format!("volume {id}")));
        }
        Ok(())
    }

    async fn list_images(&self, name: &str, tag: &str) -> Result<Vec<Image>, PowerVcError> {
        self.record("list_images", name)?;
        Ok(self
            .images
            .lock()
            .unwrap()
            .iter()
            .filter(|image| image.name.as_deref() == Some(name) && image.tags.iter().any(|t| t == tag))
            .cloned()
            .collect())
    }

    async fn create_image(&self, request: &CreateImageRequest) -> Result<Image, PowerVcError> {
        self.record("create_image", &request.name)?;
        let image = Image {
            id: self.next_id("img"),
            name: Some(request.name.clone()),
            status: "queued".to_string(),
            tags: request.tags.clone(),
        };
        self.images.lock().unwrap().push(image.clone());
        Ok(image)
    }

    async fn upload_image_data(&self, id: &str, _data: Vec<u8>) -> Result<(), PowerVcError> {
        self.record("upload_image_data", id)?;
        let mut images = self.images.lock().unwrap();
        let image = images
            .iter_mut()
            .find(|image| image.id == id)
            .ok_or_else(|| PowerVcError::NotFound(format!("image {id}")))?;
        image.status = "active".to_string();
        Ok(())
    }

    async fn delete_image(&self, id: &str) -> Result<(), PowerVcError> {
        self.record("delete_image", id)?;
        let mut images = self.images.lock().unwrap();
        let before = images.len();
        images.retain(|image| image.id != id);
        if images.len() == before {
            return Err(PowerVcError::NotFound(format!("image {id}")));
        }
        Ok(())
    }

    async fn get_flavor(&self, id: &str) -> Result<Flavor, PowerVcError> {
        self.record("get_flavor", id)?;
        self.flavors
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| PowerVcError::NotFound(format!("flavor {id}")))
    }

    async fn create_flavor(&self, request: &CreateFlavorRequest) -> Result<Flavor, PowerVcError> {
        self.record("create_flavor", &request.id)?;
        let flavor = Flavor {
            id: request.id.clone(),
            name: request.name.clone(),
            ram: request.ram,
            vcpus: request.vcpus,
            disk: request.disk,
        };
        self.flavors
            .lock()
            .unwrap()
            .insert(flavor.id.clone(), flavor.clone());
        Ok(flavor)
    }

    async fn create_flavor_extra_specs(&self, id: &str, specs: &BTreeMap<String, String>) -> Result<(), PowerVcError> {
        self.record("create_flavor_extra_specs", id)?;
        self.extra_specs
            .lock()
            .unwrap()
            .insert(id.to_string(), specs.clone());
        Ok(())
    }

    async fn delete_flavor(&self, id: &str) -> Result<(), PowerVcError> {
        self.record("delete_flavor", id)?;
        self.flavors
            .lock()
            .unwrap()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| PowerVcError::NotFound(format!("flavor {id}")))
    }

    async fn list_networks(&self, name: &str) -> Result<Vec<Network>, PowerVcError> {
        self.record("list_networks", name)?;
        Ok(self
            .networks
            .lock()
            .unwrap()
            .iter()
            .filter(|network| network.name == name)
            .cloned()
            .collect())
    }

    async fn list_subnets(&self, network_id: &str) -> Result<Vec<Subnet>, PowerVcError> {
        self.record("list_subnets", network_id)?;
        Ok(self
            .subnets
            .lock()
            .unwrap()
            .iter()
            .filter(|subnet| subnet.network_id == network_id)
            .cloned()
            .collect())
    }

    async fn list_hypervisors(&self) -> Result<Vec<Hypervisor>, PowerVcError> {
        self.record("list_hypervisors", "")?;
        Ok(self.hypervisors.lock().unwrap().clone())
    }

    async fn list_servers(&self, name: &str) -> Result<Vec<Server>, PowerVcError> {
        self.record("list_servers", name)?;
        Ok(self
            .servers
            .lock()
            .unwrap()
            .iter()
            .filter(|server| server.name.contains(name))
            .cloned()
            .collect())
    }

    async fn create_servers(&self, request: &CreateServersRequest) -> Result<(), PowerVcError> {
        self.record("create_servers", &request.name)?;
        self.server_requests.lock().unwrap().push(request.clone());
        let count = request.min_count.max(1);
        for index in 1..=count {
            let name = if count == 1 {
                request.name.clone()
            } else {
                format!("{}-{index}", request.name)
            };
            let mut addresses = BTreeMap::new();
            for network in &request.networks {
                addresses.insert(
                    self.network_name(&network.uuid),
                    vec![ServerAddress {
                        addr: format!("10.0.0.{}", 10 + index),
                        version: Some(4),
                        mac_addr: Some(format!("fa:16:3e:00:00:{index:02x}")),
                        kind: Some("fixed".to_string()),
                    }],
                );
            }
            let id = self.next_id("srv");
            self.servers.lock().unwrap().push(Server {
                instance_name: Some(format!("{name}-{id}")),
                id,
                name,
                status: "BUILD".to_string(),
                vm_state: Some("building".to_string()),
                addresses,
                fault: None,
                created: None,
            });
        }
        Ok(())
    }

    async fn get_server(&self, id: &str) -> Result<Server, PowerVcError> {
        self.record("get_server", id)?;
        let mut servers = self.servers.lock().unwrap();
        let server = servers
            .iter_mut()
            .find(|server| server.id == id)
            .ok_or_else(|| PowerVcError::NotFound(format!("server {id}")))?;
        let mut scripts = self.state_scripts.lock().unwrap();
        let state = match scripts.get_mut(&server.name) {
            Some(states) if states.len() > 1 => states.pop_front(),
            Some(states) => states.front().cloned(),
            None => Some("active".to_string()),
        };
        server.vm_state = state;
        Ok(server.clone())
    }

    async fn reboot_server(&self, id: &str, _reboot_type: RebootType) -> Result<(), PowerVcError> {
        self.record("reboot_server", id)?;
        if self.servers.lock().unwrap().iter().any(|server| server.id == id) {
            Ok(())
        } else {
            Err(PowerVcError::NotFound(format!("server {id}")))
        }
    }

    async fn delete_server(&self, id: &str) -> Result<(), PowerVcError> {
        self.record("delete_server", id)?;
        let mut servers = self.servers.lock().unwrap();
        let before = servers.len();
        servers.retain(|server| server.id != id);
        if servers.len() == before {
            return Err(PowerVcError::NotFound(format!("server {id}")));
        }
        Ok(())
    }
}
