//! Cloud infrastructure API seam
//!
//! The harness consumes the cloud backend only through abstract
//! create/delete operations on certificate-like and load-balancer-like
//! resources. The trait is the boundary: the real network client lives in
//! the embedding test suite, while this module owns error classification and
//! the retry decorator that makes the collaborator's backoff policy
//! transparent to the orchestrator.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::Serialize;
use thiserror::Error;

use crate::retry::{retry_transient, RetryConfig, Transient};

/// Creation parameters for a TLS certificate resource
#[derive(Clone, Debug, Serialize)]
pub struct CertificateSpec {
    /// Unique resource name
    pub name: String,
    /// PEM-encoded certificate chain
    pub certificate: String,
    /// PEM-encoded private key
    pub private_key: String,
}

/// Creation parameters for a load balancer resource
#[derive(Clone, Debug, Serialize)]
pub struct LoadBalancerSpec {
    /// Unique resource name
    pub name: String,
    /// Datacenter location, if the backend requires one
    pub location: Option<String>,
}

/// Error type for cloud API operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CloudError {
    /// The resource does not exist (treated as success when deleting)
    #[error("resource not found")]
    NotFound,

    /// The API asked us to slow down
    #[error("rate limited by cloud API")]
    RateLimited,

    /// Connection-level failure before any API answer
    #[error("transport error: {0}")]
    Transport(String),

    /// The API answered with an error status
    #[error("cloud API returned status {status}: {message}")]
    Api {
        /// HTTP status code of the answer
        status: u16,
        /// Error message from the API body
        message: String,
    },
}

impl CloudError {
    /// Whether this error means the resource is already gone
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CloudError::NotFound | CloudError::Api { status: 404, .. }
        )
    }

    /// Whether retrying the same call can reasonably succeed
    pub fn is_transient(&self) -> bool {
        match self {
            CloudError::RateLimited | CloudError::Transport(_) => true,
            CloudError::Api { status, .. } => (500..=599).contains(status),
            CloudError::NotFound => false,
        }
    }
}

impl Transient for CloudError {
    fn is_transient(&self) -> bool {
        CloudError::is_transient(self)
    }
}

/// Abstract cloud backend operations.
///
/// Implementations must be safe for concurrent use; the harness shares one
/// handle across all test tasks.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CloudApi: Send + Sync {
    /// Create a TLS certificate, returning its backend identifier
    async fn create_certificate(&self, spec: &CertificateSpec) -> Result<i64, CloudError>;

    /// Delete a TLS certificate by identifier
    async fn delete_certificate(&self, id: i64) -> Result<(), CloudError>;

    /// Create a load balancer, returning its backend identifier
    async fn create_load_balancer(&self, spec: &LoadBalancerSpec) -> Result<i64, CloudError>;

    /// Delete a load balancer by identifier
    async fn delete_load_balancer(&self, id: i64) -> Result<(), CloudError>;
}

/// Decorator that applies the collaborator's backoff policy to every call.
///
/// Wrapping a backend in this makes transient failures invisible to the
/// orchestrator: it either gets a result or an error that survived the
/// retry budget.
pub struct RetryingCloud<C> {
    inner: C,
    config: RetryConfig,
}

impl<C: CloudApi> RetryingCloud<C> {
    /// Wrap a backend with the published cloud backoff policy
    /// (base 1s, multiplier 2, cap 10s).
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            config: RetryConfig::cloud_defaults(),
        }
    }

    /// Wrap a backend with a custom retry configuration
    pub fn with_config(inner: C, config: RetryConfig) -> Self {
        Self { inner, config }
    }
}

#[async_trait]
impl<C: CloudApi> CloudApi for RetryingCloud<C> {
    async fn create_certificate(&self, spec: &CertificateSpec) -> Result<i64, CloudError> {
        retry_transient(&self.config, "create_certificate", || {
            self.inner.create_certificate(spec)
        })
        .await
    }

    async fn delete_certificate(&self, id: i64) -> Result<(), CloudError> {
        retry_transient(&self.config, "delete_certificate", || {
            self.inner.delete_certificate(id)
        })
        .await
    }

    async fn create_load_balancer(&self, spec: &LoadBalancerSpec) -> Result<i64, CloudError> {
        retry_transient(&self.config, "create_load_balancer", || {
            self.inner.create_load_balancer(spec)
        })
        .await
    }

    async fn delete_load_balancer(&self, id: i64) -> Result<(), CloudError> {
        retry_transient(&self.config, "delete_load_balancer", || {
            self.inner.delete_load_balancer(id)
        })
        .await
    }
}
