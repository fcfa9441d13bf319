//! Unit tests for the boot resource reconciler

use super::*;
use crate::test_utils::*;
use powervc_client::MockPowerVcClient;

fn reconciler(mock: &MockPowerVcClient) -> ResourceReconciler {
    ResourceReconciler::new(Arc::new(mock.clone()), STORAGE_TEMPLATE, NETWORK_NAME)
}

#[tokio::test]
async fn test_volume_reconcile_is_idempotent() {
    let mock = powervc_with_infrastructure();
    let reconciler = reconciler(&mock);

    let first = reconciler.reconcile_volume("demo").await.unwrap();
    let second = reconciler.reconcile_volume("demo").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(mock.call_count("create_volume"), 1);
    let volumes = mock.volumes();
    assert_eq!(volumes.len(), 1);
    assert_eq!(volumes[0].size, BOOT_VOLUME_SIZE);
    assert_eq!(volumes[0].volume_type.as_deref(), Some("vt-1"));
}

#[tokio::test]
async fn test_volume_reuses_first_of_duplicates() {
    let mock = powervc_with_infrastructure();
    mock.add_volume("v1", "demo");
    mock.add_volume("v2", "demo");

    let volume_id = reconciler(&mock).reconcile_volume("demo").await.unwrap();

    assert_eq!(volume_id, "v1");
    assert_eq!(mock.call_count("create_volume"), 0);
}

#[tokio::test]
async fn test_volume_unknown_storage_template() {
    let mock = MockPowerVcClient::new();
    let err = reconciler(&mock).reconcile_volume("demo").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_image_reconcile_is_idempotent() {
    let mock = powervc_with_infrastructure();
    let reconciler = reconciler(&mock);

    let first = reconciler.reconcile_image("demo", "v1").await.unwrap();
    let second = reconciler.reconcile_image("demo", "v1").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(mock.call_count("create_image"), 1);
    assert_eq!(mock.call_count("upload_image_data"), 1);
    assert_eq!(mock.images()[0].tags, vec![IMAGE_TAG.to_string()]);
}

#[tokio::test]
async fn test_image_with_other_tag_is_not_reused() {
    let mock = powervc_with_infrastructure();
    mock.add_image("foreign", "demo", &["purpose:other"]);

    let image_id = reconciler(&mock).reconcile_image("demo", "v1").await.unwrap();

    assert_ne!(image_id, "foreign");
    assert_eq!(mock.call_count("create_image"), 1);
}

#[test]
fn test_image_properties_point_at_volume() {
    let properties = image_properties("v1");
    assert_eq!(properties["architecture"], "ppc64");
    assert_eq!(properties["bdm_v2"], "true");
    let mapping: serde_json::Value = serde_json::from_str(&properties["block_device_mapping"]).unwrap();
    assert_eq!(mapping[0]["volume_id"], "v1");
    assert_eq!(mapping[0]["boot_index"], 0);
    assert_eq!(mapping[0]["delete_on_termination"], true);
}

#[tokio::test]
async fn test_flavor_reconcile_is_idempotent() {
    let mock = powervc_with_infrastructure();
    let reconciler = reconciler(&mock);

    reconciler.reconcile_flavor("demo", "demo-flavor").await.unwrap();
    reconciler.reconcile_flavor("demo", "demo-flavor").await.unwrap();

    assert_eq!(mock.call_count("create_flavor"), 1);
    assert_eq!(mock.flavor_ids(), vec!["demo-flavor".to_string()]);
    let specs = mock.extra_specs("demo-flavor").unwrap();
    assert_eq!(specs.len(), 18);
    assert_eq!(specs["powervm:proc_units"], "0.5");
    assert_eq!(specs["powervm:shared_proc_pool_name"], "DefaultPool");
}

#[tokio::test]
async fn test_flavor_lookup_failure_propagates() {
    let mock = powervc_with_infrastructure();
    mock.fail("get_flavor", "service unavailable");

    let err = reconciler(&mock).reconcile_flavor("demo", "demo-flavor").await.unwrap_err();

    assert!(matches!(err, ControllerError::ExternalCommand(_)));
    assert_eq!(mock.call_count("create_flavor"), 0);
}

#[tokio::test]
async fn test_boot_resources_for_fresh_cluster() {
    let mock = powervc_with_infrastructure();

    let resources = reconciler(&mock)
        .reconcile_boot_resources("demo", "demo-flavor")
        .await
        .unwrap();

    assert_eq!(resources.flavor_id, "demo-flavor");
    assert_eq!(mock.volumes()[0].id, resources.volume_id);
    assert_eq!(mock.images()[0].id, resources.image_id);
}

#[tokio::test]
async fn test_resolve_network() {
    let mock = powervc_with_infrastructure();

    let network = reconciler(&mock).resolve_network().await.unwrap();

    assert_eq!(
        network,
        NetworkInfo {
            network_id: "net-1".to_string(),
            gateway_ip: "10.0.0.1".to_string(),
            prefix_length: 24,
        }
    );
}

#[tokio::test]
async fn test_resolve_network_missing() {
    let mock = MockPowerVcClient::new();
    let err = reconciler(&mock).resolve_network().await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_resolve_network_without_subnet() {
    let mock = MockPowerVcClient::new();
    mock.add_bare_network("net-1", NETWORK_NAME);
    let err = reconciler(&mock).resolve_network().await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_cleanup_treats_missing_as_success() {
    let mock = powervc_with_infrastructure();
    let reconciler = reconciler(&mock);

    reconciler.cleanup_volume("demo").await.unwrap();
    reconciler.cleanup_image("demo").await.unwrap();
    reconciler.cleanup_flavor("demo-flavor").await.unwrap();
}

#[tokio::test]
async fn test_cleanup_removes_resources() {
    let mock = powervc_with_infrastructure();
    let reconciler = reconciler(&mock);
    reconciler
        .reconcile_boot_resources("demo", "demo-flavor")
        .await
        .unwrap();

    reconciler.cleanup_image("demo").await.unwrap();
    reconciler.cleanup_volume("demo").await.unwrap();
    reconciler.cleanup_flavor("demo-flavor").await.unwrap();

    assert!(mock.volumes().is_empty());
    assert!(mock.images().is_empty());
    assert!(mock.flavor_ids().is_empty());
}

#[tokio::test]
async fn test_cleanup_surfaces_other_failures() {
    let mock = powervc_with_infrastructure();
    mock.add_volume("v1", "demo");
    mock.fail("delete_volume", "volume is attached");

    let err = reconciler(&mock).cleanup_volume("demo").await.unwrap_err();

    assert!(err.to_string().contains("volume is attached"));
}
