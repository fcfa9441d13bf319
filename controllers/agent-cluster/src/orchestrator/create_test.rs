//! Unit tests for the create pipeline

use super::*;
use crate::reconciler::IMAGE_TAG;
use crate::test_utils::*;
use std::time::Duration;

/// Agents the management cluster discovers for `demo-worker-1` and `-2`
fn discover_agents(harness: &Harness) {
    harness
        .control_plane
        .add_agent("a7f3c1d2", Some("fa:16:3e:00:00:01"), false);
    harness
        .control_plane
        .add_agent("b91e04aa", Some("FA:16:3E:00:00:02"), false);
    // Not one of ours, and one still collecting inventory
    harness
        .control_plane
        .add_agent("c0ffee00", Some("fa:16:3e:00:00:63"), false);
    harness.control_plane.add_agent("d00dfeed", None, false);
}

fn position(calls: &[String], call: &str) -> usize {
    calls
        .iter()
        .position(|recorded| recorded == call)
        .unwrap_or_else(|| panic!("{call} not recorded in {calls:?}"))
}

#[tokio::test(start_paused = true)]
async fn test_create_demo_cluster() {
    let harness = harness(2);
    harness.powervc.add_volume("v1", "demo");
    harness.powervc.add_image("i1", "demo", &[IMAGE_TAG]);
    discover_agents(&harness);

    harness.orchestrator.create().await.unwrap();

    // Boot resources reused, flavor created
    assert_eq!(harness.powervc.call_count("create_volume"), 0);
    assert_eq!(harness.powervc.call_count("create_image"), 0);
    assert_eq!(harness.powervc.flavor_ids(), vec!["demo-flavor".to_string()]);
    let requests = harness.powervc.server_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].image_ref, "i1");
    assert_eq!(requests[0].flavor_ref, "demo-flavor");

    // Control plane rendered with the fixed publishing policy
    let namespaces = harness.control_plane.namespaces();
    assert!(namespaces.contains("clusters-demo"), "{namespaces:?}");
    assert!(
        harness
            .control_plane
            .calls()
            .contains(&"create_namespace:clusters-demo".to_string())
    );
    let applied = harness.control_plane.applied();
    let names: Vec<String> = applied
        .iter()
        .map(|(path, _)| path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names.len(), 4);
    assert_eq!(names[0], "clusters.yaml");
    assert!(names[1].starts_with("nmstate-config-demo-worker-1-"));
    assert!(names[2].starts_with("nmstate-config-demo-worker-2-"));
    assert_eq!(names[3], "infraenv.yaml");
    assert!(applied[0].1.contains("LoadBalancer"));
    assert!(!applied[0].1.contains("NodePort"));
    assert!(applied[1].1.contains("10.0.0.11"));
    assert!(applied[2].1.contains("10.0.0.12"));
    assert!(applied[3].1.contains("ssh-ed25519 AAAAC3Nza demo@example.com"));

    // DNS
    let cis = &harness.cis;
    assert_eq!(cis.call_count("create_record"), 3);
    assert_eq!(cis.content_of("api.demo.example.com").as_deref(), Some("api-lb.example.com"));
    assert_eq!(cis.content_of("api-int.demo.example.com").as_deref(), Some("api-lb.example.com"));
    assert_eq!(cis.content_of("*.apps.demo.example.com").as_deref(), Some("10.0.0.11"));

    // Media on both agents, then reboots
    assert_eq!(
        harness.downloader.urls(),
        vec!["https://assisted.example.com/images/discovery.iso".to_string()]
    );
    assert!(harness.orchestrator.manifest_dir().join("demo-discovery.iso").exists());
    assert_eq!(harness.hmc.call_count("copy_to_vios"), 1);
    assert_eq!(harness.hmc.call_count("map_vopt"), 2);
    assert_eq!(harness.hmc.call_count("set_boot_string"), 2);
    assert_eq!(harness.powervc.call_count("reboot_server"), 2);

    // Approval of our two agents only
    let approved: Vec<_> = harness
        .control_plane
        .agents()
        .into_iter()
        .filter(|agent| agent.is_approved())
        .map(|agent| (agent.metadata.name.unwrap(), agent.spec.hostname.unwrap()))
        .collect();
    assert_eq!(
        approved,
        vec![
            ("a7f3c1d2".to_string(), "demo-worker-1".to_string()),
            ("b91e04aa".to_string(), "demo-worker-2".to_string()),
        ]
    );

    assert_eq!(harness.control_plane.node_pool_replicas("clusters", "demo"), Some(2));
    assert_eq!(harness.control_plane.pinned_hostname().as_deref(), Some("demo-worker-1"));
    assert!(harness.orchestrator.manifest_dir().join("kubeconfig").exists());

    let calls = harness.control_plane.calls();
    assert!(position(&calls, "wait_available:demo") < position(&calls, "wait_infra_env_image:demo"));
    assert!(position(&calls, "scale_node_pool:demo=2") < position(&calls, "pin_ingress_to_node:demo-worker-1"));
    assert_eq!(calls.last().map(String::as_str), Some("wait_completed:demo"));
}

#[tokio::test(start_paused = true)]
async fn test_create_waits_for_agents_to_register() {
    let harness = harness(2);
    let control_plane = harness.control_plane.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(150)).await;
        control_plane.add_agent("a7f3c1d2", Some("fa:16:3e:00:00:01"), false);
        control_plane.add_agent("b91e04aa", Some("fa:16:3e:00:00:02"), false);
    });

    harness.orchestrator.create().await.unwrap();

    // Polled at 0, 1m, 2m and 3m
    assert_eq!(harness.control_plane.call_count("list_agents"), 4);
    assert_eq!(harness.control_plane.call_count("approve_agent"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_create_times_out_waiting_for_approval() {
    let harness = harness(2);
    harness
        .control_plane
        .add_agent("a7f3c1d2", Some("fa:16:3e:00:00:01"), false);

    let err = harness.orchestrator.create().await.unwrap_err();

    match err {
        ControllerError::Step { step, source } => {
            assert_eq!(step, "approve agents");
            assert!(matches!(*source, ControllerError::Timeout { .. }));
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(harness.control_plane.call_count("list_agents"), 30);
    assert_eq!(harness.control_plane.call_count("scale_node_pool"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_create_is_rerunnable() {
    let harness = harness(2);
    discover_agents(&harness);

    harness.orchestrator.create().await.unwrap();
    harness.orchestrator.create().await.unwrap();

    assert_eq!(harness.powervc.call_count("create_volume"), 1);
    assert_eq!(harness.powervc.call_count("create_image"), 1);
    assert_eq!(harness.powervc.call_count("create_flavor"), 1);
    assert_eq!(harness.powervc.call_count("create_servers"), 1);
    // The applied HostedCluster is found on the second run
    assert_eq!(harness.control_plane.call_count("render_cluster"), 1);
    assert_eq!(harness.cis.call_count("create_record"), 3);
    assert_eq!(harness.cis.call_count("update_record"), 3);
    // Already approved agents count towards the target
    assert_eq!(harness.control_plane.call_count("approve_agent"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_existing_hosted_cluster_is_reused() {
    let harness = harness(2);
    harness.control_plane.add_hosted_cluster("clusters", "demo");
    discover_agents(&harness);

    harness.orchestrator.create().await.unwrap();

    assert_eq!(harness.control_plane.call_count("render_cluster"), 0);
    assert!(
        !harness
            .control_plane
            .applied()
            .iter()
            .any(|(path, _)| path.ends_with("clusters.yaml"))
    );
    assert!(harness.control_plane.namespaces().contains("clusters-demo"));
}

#[tokio::test(start_paused = true)]
async fn test_create_fails_fast_with_step_context() {
    let harness = harness(2);
    harness
        .control_plane
        .fail("wait_infra_env_image", "timed out waiting for the condition");

    let err = harness.orchestrator.create().await.unwrap_err();

    assert!(err.to_string().starts_with("wait for discovery image failed"), "{err}");
    assert!(harness.downloader.urls().is_empty());
    assert_eq!(harness.hmc.call_count("copy_to_vios"), 0);
    assert_eq!(harness.powervc.call_count("reboot_server"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_download_failure_stops_before_mount() {
    let harness = harness(2);
    harness.downloader.fail("connection reset by peer");

    let err = harness.orchestrator.create().await.unwrap_err();

    assert!(err.to_string().starts_with("download discovery image failed"), "{err}");
    assert_eq!(harness.downloader.urls().len(), 1);
    assert_eq!(harness.hmc.call_count("copy_to_vios"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_failed_agent_aborts_before_control_plane() {
    let harness = harness(2);
    harness
        .powervc
        .set_state_sequence("demo-worker-1", &["building", "error"]);

    let err = harness.orchestrator.create().await.unwrap_err();

    match err {
        ControllerError::Step { step, source } => {
            assert_eq!(step, "provision agents");
            assert!(matches!(*source, ControllerError::TerminalAgentState { .. }));
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(harness.control_plane.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_mount_failure_stops_before_reboot() {
    let harness = harness(2);
    harness.hmc.fail("get_vhost", "no vhost for LPAR");

    let err = harness.orchestrator.create().await.unwrap_err();

    assert!(err.to_string().starts_with("mount discovery image failed"), "{err}");
    assert_eq!(harness.hmc.call_count("close"), 1);
    assert_eq!(harness.powervc.call_count("reboot_server"), 0);
}

#[test]
fn test_step_names() {
    assert_eq!(CreateStep::EnsureControlPlane.to_string(), "ensure control plane");
    assert_eq!(
        DestroyStep::RemoveDnsRecord("api.demo.example.com".to_string()).to_string(),
        "delete DNS record api.demo.example.com"
    );
}
