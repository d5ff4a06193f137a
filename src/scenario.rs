//! One composed end-to-end scenario
//!
//! A scenario is a workload pod plus the LoadBalancer service exposing it,
//! scoped to one test function: ensure a namespace, deploy the pod, wait for
//! readiness, expose it, wait for an ingress address, and finally confirm
//! the whole namespace is gone again. Scenario teardown is independent of
//! the harness's cloud teardown.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{
    Container, ContainerPort, Namespace, Pod, PodSpec, Service, ServicePort, ServiceSpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::api::{Api, DeleteParams, PostParams};
use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::{kube_already_exists, kube_not_found};
use crate::poll::{converge, PollOpts, PollStep};
use crate::{
    Error, Result, HTTP_ATTEMPT_TIMEOUT, HTTP_AVAILABLE_BOUND, NAMESPACE_GONE_BOUND,
    POLL_INTERVAL, SERVICE_ADDRESS_BOUND, WORKLOAD_READY_BOUND,
};

/// A single workload-plus-service test scenario.
///
/// Object names derive from the scenario name as `pod-{name}` and
/// `svc-{name}`; the namespace defaults to a random `ephemera-test-{n}`.
/// All waits share the scenario's cancellation token, so one external
/// cancel aborts whatever the scenario is currently waiting on.
pub struct Scenario {
    client: kube::Client,
    namespace: String,
    name: String,
    port: i32,
    cancel: CancellationToken,
}

impl Scenario {
    /// Create a scenario with a generated namespace and port 80
    pub fn new(client: kube::Client, name: impl Into<String>) -> Self {
        Self {
            client,
            namespace: format!("ephemera-test-{}", rand::thread_rng().gen::<u32>()),
            name: name.into(),
            port: 80,
            cancel: CancellationToken::new(),
        }
    }

    /// Use a fixed namespace instead of the generated one
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Expose the service on a different port
    pub fn with_port(mut self, port: i32) -> Self {
        self.port = port;
        self
    }

    /// The namespace this scenario lives in
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The workload pod name
    pub fn pod_name(&self) -> String {
        format!("pod-{}", self.name)
    }

    /// The exposing service name
    pub fn service_name(&self) -> String {
        format!("svc-{}", self.name)
    }

    /// Token cancelling every wait this scenario performs
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Create the scenario namespace; "already exists" is success.
    pub async fn ensure_namespace(&self) -> Result<()> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        let ns = Namespace {
            metadata: ObjectMeta {
                name: Some(self.namespace.clone()),
                ..Default::default()
            },
            ..Default::default()
        };

        match namespaces.create(&PostParams::default(), &ns).await {
            Ok(_) => Ok(()),
            Err(e) if kube_already_exists(&e) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Deploy the workload pod and wait until it reports Ready.
    ///
    /// Returns the observed pod. A get failure inside the wait is fatal;
    /// an absent Ready condition just keeps the wait going.
    pub async fn deploy_workload(&self) -> Result<Pod> {
        self.deploy_workload_with(&PollOpts::new(POLL_INTERVAL, WORKLOAD_READY_BOUND))
            .await
    }

    /// [`Scenario::deploy_workload`] with explicit timing, for callers that
    /// know their cluster better
    pub async fn deploy_workload_with(&self, opts: &PollOpts) -> Result<Pod> {
        self.ensure_namespace().await?;

        let pod_name = self.pod_name();
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), &self.namespace);

        let pod = Pod {
            metadata: ObjectMeta {
                name: Some(pod_name.clone()),
                labels: Some(BTreeMap::from([("app".to_string(), pod_name.clone())])),
                ..Default::default()
            },
            spec: Some(PodSpec {
                containers: vec![Container {
                    name: "hello-world".to_string(),
                    image: Some("nginxdemos/hello:plain-text".to_string()),
                    ports: Some(vec![ContainerPort {
                        container_port: 80,
                        name: Some("http".to_string()),
                        ..Default::default()
                    }]),
                    ..Default::default()
                }],
                ..Default::default()
            }),
            ..Default::default()
        };

        pods.create(&PostParams::default(), &pod).await?;
        info!(pod = %pod_name, namespace = %self.namespace, "created workload pod");

        let condition = format!("readiness of pod {pod_name}");
        converge(opts, &condition, &self.cancel, || {
            let pods = pods.clone();
            let pod_name = pod_name.clone();
            async move {
                let observed = pods.get(&pod_name).await?;
                if is_pod_ready(&observed) {
                    Ok(PollStep::Converged(observed))
                } else {
                    Ok(PollStep::Observed(observed))
                }
            }
        })
        .await
    }

    /// Build the exposing-service definition for a deployed workload.
    ///
    /// The service selects the pod by its `app` label and carries any
    /// caller-supplied annotations (e.g. balancer configuration understood
    /// by the system under test).
    pub fn service_definition(
        &self,
        pod: &Pod,
        annotations: BTreeMap<String, String>,
    ) -> Service {
        let app = pod.metadata.name.clone().unwrap_or_else(|| self.pod_name());

        Service {
            metadata: ObjectMeta {
                name: Some(self.service_name()),
                annotations: (!annotations.is_empty()).then_some(annotations),
                ..Default::default()
            },
            spec: Some(ServiceSpec {
                selector: Some(BTreeMap::from([("app".to_string(), app)])),
                type_: Some("LoadBalancer".to_string()),
                external_traffic_policy: Some("Local".to_string()),
                ports: Some(vec![ServicePort {
                    name: Some("http".to_string()),
                    port: self.port,
                    target_port: Some(IntOrString::Int(80)),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    /// Create the exposing service and wait until it is assigned an ingress
    /// address. Returns the converged service.
    pub async fn create_service(&self, definition: &Service) -> Result<Service> {
        self.create_service_with(&PollOpts::new(POLL_INTERVAL, SERVICE_ADDRESS_BOUND), definition)
            .await
    }

    /// [`Scenario::create_service`] with explicit timing
    pub async fn create_service_with(
        &self,
        opts: &PollOpts,
        definition: &Service,
    ) -> Result<Service> {
        let services: Api<Service> = Api::namespaced(self.client.clone(), &self.namespace);
        let name = definition
            .metadata
            .name
            .clone()
            .unwrap_or_else(|| self.service_name());

        services.create(&PostParams::default(), definition).await?;
        info!(service = %name, namespace = %self.namespace, "created exposing service");

        let condition = format!("ingress address of service {name}");
        converge(opts, &condition, &self.cancel, || {
            let services = services.clone();
            let name = name.clone();
            async move {
                let observed = services.get(&name).await?;
                if ingress_address(&observed).is_some() {
                    Ok(PollStep::Converged(observed))
                } else {
                    Ok(PollStep::Pending)
                }
            }
        })
        .await
    }

    /// Delete the scenario namespace and wait until it is confirmed gone.
    ///
    /// The delete is reissued each round; "not found" is the terminal
    /// success. The first check runs immediately, which also covers
    /// backends that delete synchronously.
    pub async fn teardown(&self) -> Result<()> {
        self.teardown_with(&PollOpts::new(POLL_INTERVAL, NAMESPACE_GONE_BOUND).immediately())
            .await
    }

    /// [`Scenario::teardown`] with explicit timing
    pub async fn teardown_with(&self, opts: &PollOpts) -> Result<()> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        let namespace = self.namespace.clone();

        let condition = format!("deletion of namespace {namespace}");
        converge(opts, &condition, &self.cancel, || {
            let namespaces = namespaces.clone();
            let namespace = namespace.clone();
            async move {
                match namespaces.delete(&namespace, &DeleteParams::default()).await {
                    Ok(_) => Ok(PollStep::Pending),
                    Err(e) if kube_not_found(&e) => Ok(PollStep::Converged(())),
                    Err(e) => Err(e.into()),
                }
            }
        })
        .await
    }
}

/// Whether a pod's status carries a true Ready condition
pub fn is_pod_ready(pod: &Pod) -> bool {
    pod.status
        .as_ref()
        .and_then(|status| status.conditions.as_ref())
        .is_some_and(|conditions| {
            conditions
                .iter()
                .any(|c| c.type_ == "Ready" && c.status == "True")
        })
}

/// The first assigned ingress address of a service, IP preferred over
/// hostname
pub fn ingress_address(service: &Service) -> Option<String> {
    service
        .status
        .as_ref()?
        .load_balancer
        .as_ref()?
        .ingress
        .as_ref()?
        .iter()
        .find_map(|ingress| ingress.ip.clone().or_else(|| ingress.hostname.clone()))
}

/// Wait until `address` answers HTTP 200.
///
/// Uses an insecure client (short per-attempt timeout, certificate
/// validation disabled) because test endpoints carry self-signed
/// certificates. 503 means balancer health checks are still evaluating and
/// keeps the wait going, as do connection-level failures; any other
/// non-200 status is fatal.
pub async fn wait_for_http_available(
    cancel: &CancellationToken,
    address: &str,
    use_https: bool,
) -> Result<()> {
    wait_for_http_available_with(
        &PollOpts::new(POLL_INTERVAL, HTTP_AVAILABLE_BOUND),
        cancel,
        address,
        use_https,
    )
    .await
}

/// [`wait_for_http_available`] with explicit timing
pub async fn wait_for_http_available_with(
    opts: &PollOpts,
    cancel: &CancellationToken,
    address: &str,
    use_https: bool,
) -> Result<()> {
    let client = reqwest::Client::builder()
        .timeout(HTTP_ATTEMPT_TIMEOUT)
        .danger_accept_invalid_certs(true)
        .build()?;

    let proto = if use_https { "https" } else { "http" };
    let url = format!("{proto}://{address}");

    let condition = format!("HTTP availability of {url}");
    converge(opts, &condition, cancel, || {
        let client = client.clone();
        let url = url.clone();
        async move {
            let response = match client.get(&url).send().await {
                Ok(response) => response,
                // The endpoint may not be routable yet.
                Err(_) => return Ok(PollStep::Pending),
            };
            match response.status().as_u16() {
                200 => Ok(PollStep::Converged(())),
                // Balancer health checks are still evaluating.
                503 => Ok(PollStep::Pending),
                status => Err(Error::UnexpectedStatus(status)),
            }
        }
    })
    .await
}
