//! Ephemera - ephemeral-resource test harness with guaranteed teardown
//!
//! Ephemera provisions real resources in two independent backends - a cloud
//! infrastructure API and a Kubernetes cluster - runs a scenario against
//! them, and guarantees cleanup regardless of outcome. Every resource created
//! through the harness is tracked in a concurrency-safe registry and torn
//! down exactly once, even under partial failure.
//!
//! # Architecture
//!
//! - A [`harness::Harness`] is created once per test run (`start`/`stop`); it
//!   owns the backend client handles and one registry per tracked resource
//!   kind
//! - Concurrent test executions share the harness; each builds its own
//!   [`scenario::Scenario`] with an independent, scenario-scoped teardown
//! - All waiting goes through one convergence-polling primitive that is
//!   bounded, cancellable, and leaves error classification to the predicate
//!
//! # Modules
//!
//! - [`registry`] - concurrency-safe set of resource identifiers tracked for
//!   cleanup
//! - [`poll`] - bounded, interval-based convergence polling
//! - [`retry`] - exponential backoff for transient collaborator errors
//! - [`cloud`] - cloud infrastructure API seam and its retry decorator
//! - [`harness`] - run-scoped lifecycle orchestrator and teardown
//! - [`scenario`] - composed workload + exposing-service scenario
//! - [`error`] - error types for the harness

#![deny(missing_docs)]

use std::time::Duration;

pub mod cloud;
pub mod error;
pub mod harness;
pub mod poll;
pub mod registry;
pub mod retry;
pub mod scenario;

#[cfg(test)]
mod testutil;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

// =============================================================================
// Default Convergence Bounds
// =============================================================================
// These constants define the interval/bound pairs used by the scenario
// composer. Centralizing them here keeps the timed operations and their tests
// consistent.

/// Interval between predicate evaluations for all standard waits
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// How long a workload pod may take to report its Ready condition
pub const WORKLOAD_READY_BOUND: Duration = Duration::from_secs(60);

/// How long an exposing service may take to be assigned an ingress address
pub const SERVICE_ADDRESS_BOUND: Duration = Duration::from_secs(5 * 60);

/// How long a namespace deletion may take to be confirmed gone
pub const NAMESPACE_GONE_BOUND: Duration = Duration::from_secs(3 * 60);

/// How long an exposed endpoint may take to answer HTTP 200
pub const HTTP_AVAILABLE_BOUND: Duration = Duration::from_secs(4 * 60);

/// Per-attempt timeout for a single HTTP reachability probe
pub const HTTP_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(1);

/// Initialize tracing for harness consumers and tests.
///
/// Respects `RUST_LOG` and defaults to `info`. Safe to call more than once;
/// only the first call installs a subscriber.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();
}
