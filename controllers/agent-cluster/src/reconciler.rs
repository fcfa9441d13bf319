//! Boot resource reconciliation
//!
//! Finds or creates the boot volume, boot image and flavor a cluster's agents
//! boot from, resolves the agent network, and removes the resources again on
//! teardown. Every create is preceded by a lookup by name, so reconciling twice
//! never creates a second resource.

use crate::error::ControllerError;
use ipnetwork::IpNetwork;
use powervc_client::{
    CreateFlavorRequest, CreateImageRequest, CreateVolumeRequest, ImageVisibility, PowerVcClientTrait,
    PowerVcError,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Boot volume size in GiB
pub const BOOT_VOLUME_SIZE: u64 = 120;

/// Ownership tag on boot images
pub const IMAGE_TAG: &str = "purpose:hypershift-bm-agent-ci";

const FLAVOR_RAM_MIB: u64 = 16384;
const FLAVOR_VCPUS: u64 = 1;
const FLAVOR_DISK_GIB: u64 = 0;

const FLAVOR_EXTRA_SPECS: [(&str, &str); 18] = [
    ("powervm:processor_compatibility", "default"),
    ("powervm:srr_capability", "false"),
    ("powervm:min_vcpu", "1"),
    ("powervm:max_vcpu", "1"),
    ("powervm:min_mem", "4096"),
    ("powervm:max_mem", "16384"),
    ("powervm:availability_priority", "127"),
    ("powervm:enable_lpar_metric", "false"),
    ("powervm:enforce_affinity_check", "false"),
    ("powervm:secure_boot", "0"),
    ("powervm:proc_units", "0.5"),
    ("powervm:min_proc_units", "0.5"),
    ("powervm:max_proc_units", "1"),
    ("powervm:dedicated_proc", "false"),
    ("powervm:shared_proc_pool_name", "DefaultPool"),
    ("powervm:uncapped", "true"),
    ("powervm:shared_weight", "128"),
    ("powervm:ame_expansion_factor", "0"),
];

/// IDs of the resources agents boot from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootResources {
    pub volume_id: String,
    pub image_id: String,
    pub flavor_id: String,
}

/// Agent network as seen by the NMState configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkInfo {
    pub network_id: String,
    pub gateway_ip: String,
    pub prefix_length: u8,
}

/// Find-or-create / find-or-delete for PowerVC boot resources
pub struct ResourceReconciler {
    powervc: Arc<dyn PowerVcClientTrait>,
    storage_template: String,
    network_name: String,
}

impl std::fmt::Debug for ResourceReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceReconciler")
            .field("storage_template", &self.storage_template)
            .field("network_name", &self.network_name)
            .finish_non_exhaustive()
    }
}

impl ResourceReconciler {
    pub fn new(
        powervc: Arc<dyn PowerVcClientTrait>,
        storage_template: impl Into<String>,
        network_name: impl Into<String>,
    ) -> Self {
        Self {
            powervc,
            storage_template: storage_template.into(),
            network_name: network_name.into(),
        }
    }

    /// Volume, image and flavor for `name`, created where missing
    pub async fn reconcile_boot_resources(&self, name: &str, flavor_id: &str) -> Result<BootResources, ControllerError> {
        let volume_id = self.reconcile_volume(name).await?;
        info!(volume_id = %volume_id, "Boot volume ready");
        let image_id = self.reconcile_image(name, &volume_id).await?;
        info!(image_id = %image_id, "Boot image ready");
        self.reconcile_flavor(name, flavor_id).await?;
        info!(flavor_id, "Flavor ready");
        Ok(BootResources {
            volume_id,
            image_id,
            flavor_id: flavor_id.to_string(),
        })
    }

    pub async fn reconcile_volume(&self, name: &str) -> Result<String, ControllerError> {
        let existing = self.powervc.list_volumes(name).await?;
        let mut matches = existing.into_iter().filter(|volume| volume.name.as_deref() == Some(name));
        if let Some(volume) = matches.next() {
            let extra = matches.count();
            if extra > 0 {
                warn!(volume = name, extra, "Several boot volumes share this name, reusing the first");
            }
            return Ok(volume.id);
        }

        let volume_type = self
            .powervc
            .list_volume_types()
            .await?
            .into_iter()
            .find(|volume_type| volume_type.name == self.storage_template)
            .ok_or_else(|| ControllerError::NotFound(format!("storage template {}", self.storage_template)))?;

        let request = CreateVolumeRequest {
            name: name.to_string(),
            size: BOOT_VOLUME_SIZE,
            volume_type: volume_type.id,
            metadata: BTreeMap::from([
                ("is_image_volume".to_string(), "True".to_string()),
                ("is_boot_volume".to_string(), "True".to_string()),
            ]),
        };
        let volume = self.powervc.create_volume(&request).await?;
        info!(volume = name, volume_id = %volume.id, "Created boot volume");
        Ok(volume.id)
    }

    pub async fn reconcile_image(&self, name: &str, volume_id: &str) -> Result<String, ControllerError> {
        if let Some(image) = self.powervc.list_images(name, IMAGE_TAG).await?.into_iter().next() {
            info!(image = name, image_id = %image.id, "Image already exists");
            return Ok(image.id);
        }

        let request = CreateImageRequest {
            name: name.to_string(),
            container_format: "bare".to_string(),
            disk_format: "raw".to_string(),
            visibility: ImageVisibility::Private,
            min_disk: 1,
            tags: vec![IMAGE_TAG.to_string()],
            properties: image_properties(volume_id),
        };
        let image = self.powervc.create_image(&request).await?;
        // The image is backed by the volume; glance still expects a data upload
        self.powervc.upload_image_data(&image.id, Vec::new()).await?;
        info!(image = name, image_id = %image.id, "Created boot image");
        Ok(image.id)
    }

    /// Flavors are immutable once created, so an existing one is left as is
    pub async fn reconcile_flavor(&self, name: &str, flavor_id: &str) -> Result<(), ControllerError> {
        match self.powervc.get_flavor(flavor_id).await {
            Ok(_) => return Ok(()),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e.into()),
        }

        let request = CreateFlavorRequest {
            id: flavor_id.to_string(),
            name: name.to_string(),
            ram: FLAVOR_RAM_MIB,
            vcpus: FLAVOR_VCPUS,
            disk: FLAVOR_DISK_GIB,
        };
        self.powervc.create_flavor(&request).await?;
        let specs = FLAVOR_EXTRA_SPECS
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        self.powervc.create_flavor_extra_specs(flavor_id, &specs).await?;
        info!(flavor_id, "Created flavor");
        Ok(())
    }

    /// First network named `network_name` and its first subnet.
    ///
    /// Networks with several subnets are not disambiguated.
    pub async fn resolve_network(&self) -> Result<NetworkInfo, ControllerError> {
        let network = self
            .powervc
            .list_networks(&self.network_name)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ControllerError::NotFound(format!("network {}", self.network_name)))?;
        let subnet = self
            .powervc
            .list_subnets(&network.id)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ControllerError::NotFound(format!("subnet of network {}", self.network_name)))?;
        let cidr: IpNetwork = subnet
            .cidr
            .parse()
            .map_err(|e| ControllerError::Parse(format!("subnet CIDR {}: {e}", subnet.cidr)))?;
        let gateway_ip = subnet
            .gateway_ip
            .filter(|gateway| !gateway.is_empty())
            .ok_or_else(|| ControllerError::Parse(format!("subnet {} has no gateway", subnet.id)))?;

        Ok(NetworkInfo {
            network_id: network.id,
            gateway_ip,
            prefix_length: cidr.prefix(),
        })
    }

    pub async fn cleanup_volume(&self, name: &str) -> Result<(), ControllerError> {
        for volume in self.powervc.list_volumes(name).await? {
            if volume.name.as_deref() == Some(name) {
                ignore_not_found(self.powervc.delete_volume(&volume.id).await)?;
                info!(volume = name, volume_id = %volume.id, "Deleted boot volume");
            }
        }
        Ok(())
    }

    pub async fn cleanup_image(&self, name: &str) -> Result<(), ControllerError> {
        for image in self.powervc.list_images(name, IMAGE_TAG).await? {
            ignore_not_found(self.powervc.delete_image(&image.id).await)?;
            info!(image = name, image_id = %image.id, "Deleted boot image");
        }
        Ok(())
    }

    pub async fn cleanup_flavor(&self, flavor_id: &str) -> Result<(), ControllerError> {
        ignore_not_found(self.powervc.delete_flavor(flavor_id).await)?;
        info!(flavor_id, "Deleted flavor");
        Ok(())
    }
}

/// Glance properties that make PowerVC boot the image from `volume_id`
pub fn image_properties(volume_id: &str) -> BTreeMap<String, String> {
    let block_device_mapping = serde_json::json!([{
        "guest_format": null,
        "boot_index": 0,
        "no_device": null,
        "image_id": null,
        "volume_id": volume_id,
        "disk_bus": null,
        "volume_size": null,
        "source_type": "volume",
        "device_type": "disk",
        "snapshot_id": null,
        "destination_type": "volume",
        "delete_on_termination": true,
    }]);
    BTreeMap::from([
        ("os_distro".to_string(), "coreos".to_string()),
        ("endianness".to_string(), "little-endian".to_string()),
        ("architecture".to_string(), "ppc64".to_string()),
        ("hypervisor_type".to_string(), "phyp".to_string()),
        ("root_device_name".to_string(), "/dev/sda".to_string()),
        ("block_device_mapping".to_string(), block_device_mapping.to_string()),
        ("bdm_v2".to_string(), "true".to_string()),
    ])
}

fn ignore_not_found(result: Result<(), PowerVcError>) -> Result<(), ControllerError> {
    match result {
        Err(e) if e.is_not_found() => Ok(()),
        other => Ok(other?),
    }
}

#[cfg(test)]
#[path = "reconciler_test.rs"]
mod reconciler_test;
