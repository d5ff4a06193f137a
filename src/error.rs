//! Error types for the harness

use std::time::Duration;

use thiserror::Error;

use crate::cloud::CloudError;

/// Main error type for harness operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// Cloud infrastructure API error
    #[error("cloud API error: {0}")]
    Cloud(#[from] CloudError),

    /// A delete issued during teardown failed for a genuine reason
    #[error("delete {kind} {id} failed: {source}")]
    Delete {
        /// Resource kind being deleted ("certificate", "load balancer")
        kind: &'static str,
        /// Backend identifier of the resource
        id: i64,
        /// The underlying cloud API failure
        #[source]
        source: CloudError,
    },

    /// Setup failure unrelated to teardown, e.g. a missing credential
    #[error("configuration error: {0}")]
    Config(String),

    /// HTTP client construction or transport error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// An endpoint answered with a status that is neither success nor
    /// still-converging
    #[error("got HTTP status {0} instead of 200")]
    UnexpectedStatus(u16),

    /// A poll's bound elapsed before its condition converged
    #[error("timed out after {bound:?} waiting for {condition}")]
    Timeout {
        /// The condition that never converged
        condition: String,
        /// The bound that elapsed
        bound: Duration,
    },

    /// A poll was cancelled externally before converging or timing out
    #[error("cancelled while waiting for {condition}")]
    Cancelled {
        /// The condition that was being awaited
        condition: String,
    },

    /// Teardown ran to completion but some deletes failed
    #[error("teardown finished with {} failure(s): {}", .0.len(), join_errors(.0))]
    Teardown(Vec<Error>),
}

impl Error {
    /// Create a configuration error with the given message
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this error is a poll timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }
}

fn join_errors(errs: &[Error]) -> String {
    errs.iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Whether a Kubernetes API error is a 404 "not found".
///
/// Reused as a poll success condition when waiting for deletions.
pub fn kube_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(ae) if ae.code == 404)
}

/// Whether a Kubernetes API error is a 409 "already exists"
pub fn kube_already_exists(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(ae) if ae.code == 409)
}
