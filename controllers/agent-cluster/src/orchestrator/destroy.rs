//! Best-effort teardown

use super::{DestroyStep, Orchestrator};
use crate::error::{ControllerError, TeardownError};
use std::future::Future;
use tracing::{error, info};

impl Orchestrator {
    /// Attempt every teardown step; any failure is reported, together with the others
    pub async fn destroy(&self) -> Result<(), ControllerError> {
        let spec = &self.spec;
        let parts = &self.components;
        let mut teardown = TeardownError::new();
        info!(cluster = %spec.name, "Destroying cluster");

        attempt(
            &mut teardown,
            DestroyStep::ScaleDownNodePool,
            parts.control_plane.scale_node_pool(&spec.name, &spec.namespace, 0),
        )
        .await;
        attempt(
            &mut teardown,
            DestroyStep::DestroyControlPlane,
            parts.control_plane.destroy_cluster(&spec.name),
        )
        .await;

        // The image references the volume, so it goes first
        attempt(&mut teardown, DestroyStep::CleanupImage, parts.reconciler.cleanup_image(&spec.name)).await;
        attempt(&mut teardown, DestroyStep::CleanupVolume, parts.reconciler.cleanup_volume(&spec.name)).await;
        attempt(
            &mut teardown,
            DestroyStep::CleanupFlavor,
            parts.reconciler.cleanup_flavor(&spec.flavor_id()),
        )
        .await;

        attempt(
            &mut teardown,
            DestroyStep::DestroyAgents,
            parts.provisioner.destroy(&spec.worker_group()),
        )
        .await;
        attempt(
            &mut teardown,
            DestroyStep::RemoveDiscoveryImage,
            parts.media.remove(&spec.discovery_iso()),
        )
        .await;

        for record in [spec.api_record(), spec.api_internal_record(), spec.apps_record()] {
            let work = parts.dns.delete_record(&record);
            attempt(&mut teardown, DestroyStep::RemoveDnsRecord(record.clone()), work).await;
        }

        attempt(&mut teardown, DestroyStep::RemoveManifestDir, self.manifests.remove()).await;

        if teardown.any_failed() {
            error!(cluster = %spec.name, failed = teardown.failures().len(), "Teardown incomplete");
        } else {
            info!(cluster = %spec.name, "Cluster destroyed");
        }
        teardown.into_result()
    }
}

async fn attempt<E, F>(teardown: &mut TeardownError, step: DestroyStep, work: F)
where
    F: Future<Output = Result<(), E>>,
    E: Into<ControllerError>,
{
    match work.await {
        Ok(()) => info!(step = %step, "Teardown step complete"),
        Err(e) => {
            let e = e.into();
            error!(step = %step, error = %e, "Teardown step failed");
            teardown.push(step, e);
        }
    }
}
