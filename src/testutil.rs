//! Test-only helpers: scripted Kubernetes API clients and canned bodies.

use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use http::{Request, Response};
use kube::client::Body;

/// Build a kube client answering every request from `script` in order; the
/// final entry repeats once the script is exhausted. Returns the client and
/// a counter of requests served.
pub(crate) fn scripted_kube_client(
    script: Vec<(u16, serde_json::Value)>,
) -> (kube::Client, Arc<AtomicUsize>) {
    assert!(!script.is_empty(), "script needs at least one response");
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();

    let svc = tower::service_fn(move |_req: Request<Body>| {
        let idx = counter.fetch_add(1, Ordering::SeqCst).min(script.len() - 1);
        let (status, body) = script[idx].clone();
        async move {
            let response = Response::builder()
                .status(status)
                .header(http::header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap();
            Ok::<_, Infallible>(response)
        }
    });

    (kube::Client::new(svc, "default"), hits)
}

/// A kube client that fails every request; for tests that must not touch
/// the cluster API at all.
pub(crate) fn unreachable_kube_client() -> kube::Client {
    let (client, _) = scripted_kube_client(vec![(
        500,
        status_json(500, "InternalError"),
    )]);
    client
}

/// A Kubernetes `Status` failure body, as the API server sends for errors.
pub(crate) fn status_json(code: u16, reason: &str) -> serde_json::Value {
    serde_json::json!({
        "apiVersion": "v1",
        "kind": "Status",
        "metadata": {},
        "status": "Failure",
        "message": format!("{reason}: scripted response"),
        "reason": reason,
        "code": code,
    })
}

/// A minimal pod body; `ready` controls the Ready condition
/// (`None` = no status at all).
pub(crate) fn pod_json(name: &str, ready: Option<bool>) -> serde_json::Value {
    let mut pod = serde_json::json!({
        "apiVersion": "v1",
        "kind": "Pod",
        "metadata": {"name": name, "namespace": "scenario-test"},
        "spec": {"containers": [{"name": "hello-world", "image": "nginxdemos/hello:plain-text"}]},
    });
    if let Some(ready) = ready {
        pod["status"] = serde_json::json!({
            "conditions": [{"type": "Ready", "status": if ready { "True" } else { "False" }}]
        });
    }
    pod
}

/// A minimal service body; `ingress_ip` controls the assigned address list.
pub(crate) fn service_json(name: &str, ingress_ip: Option<&str>) -> serde_json::Value {
    let mut svc = serde_json::json!({
        "apiVersion": "v1",
        "kind": "Service",
        "metadata": {"name": name, "namespace": "scenario-test"},
        "spec": {},
    });
    if let Some(ip) = ingress_ip {
        svc["status"] = serde_json::json!({
            "loadBalancer": {"ingress": [{"ip": ip}]}
        });
    }
    svc
}
