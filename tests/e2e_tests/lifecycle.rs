//! Stories about the shared harness lifecycle

use std::sync::Arc;

use ephemera::harness::{Harness, HarnessConfig};

use super::helpers::{init, FakeCloud, CERT_PEM, KEY_PEM};

fn config() -> HarnessConfig {
    HarnessConfig {
        cloud_token: Some("e2e-token".to_string()),
        env_name: "ephemera-e2e".to_string(),
        cert_domain: None,
    }
}

/// Story: one harness serves a whole run
///
/// A run starts the harness once, hands it to every test task, and stops it
/// at the very end. Everything created in between must be tracked and gone
/// afterwards.
#[tokio::test]
#[ignore = "requires a reachable Kubernetes cluster - run with: cargo test --test e2e -- --ignored"]
async fn story_harness_tracks_and_tears_down_cloud_resources() {
    init();
    let cloud = Arc::new(FakeCloud::default());
    let harness = Harness::start(config(), cloud.clone())
        .await
        .expect("harness start");

    let cert = harness
        .create_certificate("e2e-cert", CERT_PEM, KEY_PEM)
        .await
        .expect("create certificate");
    assert!(cert.name.starts_with("e2e-cert-"));

    let lb = harness
        .create_load_balancer("e2e-lb", Some("fsn1"))
        .await
        .expect("create load balancer");
    assert_ne!(cert.id, lb.id);

    assert_eq!(harness.certificates().len(), 1);
    assert_eq!(harness.load_balancers().len(), 1);
    assert_eq!(cloud.live_count(), 2);

    harness.stop().await.expect("teardown");
    assert_eq!(cloud.live_count(), 0);
}

/// Story: concurrent test tasks share the registries safely
///
/// Many tasks create resources against the same harness at once; teardown
/// must still find every single one.
#[tokio::test]
#[ignore = "requires a reachable Kubernetes cluster - run with: cargo test --test e2e -- --ignored"]
async fn story_concurrent_tasks_never_lose_tracked_resources() {
    init();
    let cloud = Arc::new(FakeCloud::default());
    let harness = Arc::new(
        Harness::start(config(), cloud.clone())
            .await
            .expect("harness start"),
    );

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let harness = Arc::clone(&harness);
            tokio::spawn(async move {
                harness
                    .create_certificate("e2e-cert", CERT_PEM, KEY_PEM)
                    .await
                    .expect("create certificate");
            })
        })
        .collect();
    for task in tasks {
        task.await.expect("task panicked");
    }

    assert_eq!(harness.certificates().len(), 16);
    assert_eq!(cloud.live_count(), 16);

    harness.stop().await.expect("teardown");
    assert_eq!(cloud.live_count(), 0);
}

/// Story: node naming follows the environment prefix
#[tokio::test]
#[ignore = "requires a reachable Kubernetes cluster - run with: cargo test --test e2e -- --ignored"]
async fn story_node_names_follow_the_environment() {
    init();
    let harness = Harness::start(config(), Arc::new(FakeCloud::default()))
        .await
        .expect("harness start");

    assert_eq!(harness.network_name(), "ephemera-e2e");
    assert_eq!(harness.control_node_name(), "ephemera-e2e-control");
    assert_eq!(harness.worker_node_name(1), "ephemera-e2e-worker-1");

    harness.stop().await.expect("teardown");
}
