//! Stories about a full workload + service scenario

use std::collections::BTreeMap;

use ephemera::scenario::{ingress_address, wait_for_http_available, Scenario};

use super::helpers::init;

/// Story: a workload becomes reachable through its balancer and leaves no
/// trace behind
///
/// The full arc of one test: namespace, pod, readiness, service, address,
/// HTTP reachability, teardown. Needs a cluster whose LoadBalancer services
/// actually get addresses.
#[tokio::test]
#[ignore = "requires a Kubernetes cluster with a LoadBalancer implementation"]
async fn story_workload_becomes_reachable_through_load_balancer() {
    init();
    let client = kube::Client::try_default().await.expect("kubeconfig");
    let scenario = Scenario::new(client, "e2e-web");

    let pod = scenario.deploy_workload().await.expect("workload ready");
    assert_eq!(pod.metadata.name.as_deref(), Some("pod-e2e-web"));

    let definition = scenario.service_definition(&pod, BTreeMap::new());
    let service = scenario
        .create_service(&definition)
        .await
        .expect("service address");
    let address = ingress_address(&service).expect("ingress address");

    wait_for_http_available(&scenario.cancel_token(), &address, false)
        .await
        .expect("endpoint reachable");

    scenario.teardown().await.expect("namespace deleted");
}

/// Story: scenario setup is idempotent across a retried test
///
/// Re-running setup against a half-created scenario must not fail on the
/// namespace that already exists.
#[tokio::test]
#[ignore = "requires a reachable Kubernetes cluster"]
async fn story_namespace_creation_is_idempotent() {
    init();
    let client = kube::Client::try_default().await.expect("kubeconfig");
    let scenario = Scenario::new(client, "e2e-idem");

    scenario.ensure_namespace().await.expect("first create");
    scenario
        .ensure_namespace()
        .await
        .expect("second create hits already-exists and still succeeds");

    scenario.teardown().await.expect("namespace deleted");
}
