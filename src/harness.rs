//! Run-scoped lifecycle orchestrator
//!
//! One [`Harness`] exists per test run and is shared by every concurrent
//! test task. It owns the backend client handles, the naming context derived
//! from the environment name, and one [`Registry`] per cloud resource kind.
//! Every create registers the new identifier before returning; [`Harness::stop`]
//! drains every registry best-effort and reports all failures at once.

use std::sync::Arc;

use rand::Rng;
use tracing::{info, warn};

use crate::cloud::{CertificateSpec, CloudApi, LoadBalancerSpec};
use crate::registry::Registry;
use crate::{Error, Result};

/// Configuration for one harness run.
///
/// Loaded from the environment by [`HarnessConfig::from_env`] or constructed
/// explicitly. Validation of required values happens in [`Harness::start`],
/// not here.
#[derive(Clone, Debug, Default)]
pub struct HarnessConfig {
    /// Credential for the cloud API; required
    pub cloud_token: Option<String>,
    /// Name prefix for all resources of this run
    pub env_name: String,
    /// Domain usable for certificate tests; tests needing it should skip
    /// when absent
    pub cert_domain: Option<String>,
}

impl HarnessConfig {
    /// Load from `CLOUD_TOKEN`, `ENV_NAME` and `CERT_DOMAIN`
    pub fn from_env() -> Self {
        Self {
            cloud_token: std::env::var("CLOUD_TOKEN").ok().filter(|v| !v.is_empty()),
            env_name: std::env::var("ENV_NAME").unwrap_or_default(),
            cert_domain: std::env::var("CERT_DOMAIN").ok().filter(|v| !v.is_empty()),
        }
    }
}

/// A cloud resource created through the harness
#[derive(Clone, Debug)]
pub struct CloudResource {
    /// Backend identifier, as registered for teardown
    pub id: i64,
    /// The generated collision-resistant name
    pub name: String,
}

/// The lifecycle orchestrator: backend handles, registries, naming context.
///
/// Lifetime is `start` then `stop`. Construct one per run and pass it
/// explicitly to every test task; the type is `Send + Sync` and all methods
/// take `&self`.
pub struct Harness {
    cloud: Arc<dyn CloudApi>,
    kube: kube::Client,
    config: HarnessConfig,
    certificates: Registry<i64>,
    load_balancers: Registry<i64>,
}

impl Harness {
    /// Start a harness: validate credentials, connect to the cluster from
    /// the ambient kubeconfig, and initialize empty registries.
    ///
    /// Fails fast if the cloud credential is missing - nothing is created
    /// before that check.
    pub async fn start(config: HarnessConfig, cloud: Arc<dyn CloudApi>) -> Result<Self> {
        let kube = kube::Client::try_default()
            .await
            .map_err(|e| Error::config(format!("kubernetes client: {e}")))?;
        Self::with_clients(config, cloud, kube)
    }

    /// Start with an injected Kubernetes client.
    ///
    /// Used by tests and by embedders that build their client elsewhere.
    pub fn with_clients(
        config: HarnessConfig,
        cloud: Arc<dyn CloudApi>,
        kube: kube::Client,
    ) -> Result<Self> {
        if config.cloud_token.as_deref().is_none_or(str::is_empty) {
            return Err(Error::config("no valid CLOUD_TOKEN found"));
        }

        Ok(Self {
            cloud,
            kube,
            config,
            certificates: Registry::new(),
            load_balancers: Registry::new(),
        })
    }

    /// The Kubernetes client handle
    pub fn kube_client(&self) -> kube::Client {
        self.kube.clone()
    }

    /// The validated cloud credential
    pub fn cloud_token(&self) -> &str {
        self.config.cloud_token.as_deref().unwrap_or_default()
    }

    /// Domain available for certificate tests, if configured
    pub fn cert_domain(&self) -> Option<&str> {
        self.config.cert_domain.as_deref()
    }

    /// Registry of created certificate identifiers
    pub fn certificates(&self) -> &Registry<i64> {
        &self.certificates
    }

    /// Registry of created load balancer identifiers
    pub fn load_balancers(&self) -> &Registry<i64> {
        &self.load_balancers
    }

    // =========================================================================
    // Naming
    // =========================================================================

    /// The network name shared by the run's cluster nodes
    pub fn network_name(&self) -> &str {
        &self.config.env_name
    }

    /// The control node name
    pub fn control_node_name(&self) -> String {
        format!("{}-control", self.config.env_name)
    }

    /// The worker node name, zero indexed
    pub fn worker_node_name(&self, index: usize) -> String {
        format!("{}-worker-{}", self.config.env_name, index)
    }

    /// Append a random numeric suffix to `base`, separated by a single "-".
    fn unique_name(base: &str) -> String {
        format!("{}-{}", base, rand::thread_rng().gen::<u32>())
    }

    // =========================================================================
    // Creation
    // =========================================================================

    /// Create a TLS certificate in the cloud backend and track it for
    /// teardown.
    ///
    /// The base name gets a random number suffix attached. A create failure
    /// is fatal to the calling test; nothing is registered in that case.
    pub async fn create_certificate(
        &self,
        base_name: &str,
        certificate: &str,
        private_key: &str,
    ) -> Result<CloudResource> {
        let name = Self::unique_name(base_name);
        let spec = CertificateSpec {
            name: name.clone(),
            certificate: certificate.to_string(),
            private_key: private_key.to_string(),
        };

        let id = self.cloud.create_certificate(&spec).await?;
        self.certificates.add(id);
        info!(id, name = %name, "created certificate");

        Ok(CloudResource { id, name })
    }

    /// Create a load balancer in the cloud backend and track it for
    /// teardown.
    pub async fn create_load_balancer(
        &self,
        base_name: &str,
        location: Option<&str>,
    ) -> Result<CloudResource> {
        let name = Self::unique_name(base_name);
        let spec = LoadBalancerSpec {
            name: name.clone(),
            location: location.map(str::to_string),
        };

        let id = self.cloud.create_load_balancer(&spec).await?;
        self.load_balancers.add(id);
        info!(id, name = %name, "created load balancer");

        Ok(CloudResource { id, name })
    }

    // =========================================================================
    // Teardown
    // =========================================================================

    /// Delete every tracked resource, best-effort.
    ///
    /// Each registry is drained in full: a failed delete never stops the
    /// remaining ones. "Not found" counts as success - the resource is
    /// already gone. All genuine failures are returned at the end as one
    /// [`Error::Teardown`].
    pub async fn stop(&self) -> Result<()> {
        let mut failures = Vec::new();

        for id in self.load_balancers.all() {
            info!(id, "deleting load balancer");
            match self.cloud.delete_load_balancer(id).await {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => {
                    warn!(id, error = %e, "load balancer delete failed");
                    failures.push(Error::Delete {
                        kind: "load balancer",
                        id,
                        source: e,
                    });
                }
            }
        }

        for id in self.certificates.all() {
            info!(id, "deleting certificate");
            match self.cloud.delete_certificate(id).await {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => {
                    warn!(id, error = %e, "certificate delete failed");
                    failures.push(Error::Delete {
                        kind: "certificate",
                        id,
                        source: e,
                    });
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::Teardown(failures))
        }
    }
}
