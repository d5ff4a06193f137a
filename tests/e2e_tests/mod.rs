//! Integration stories for the ephemera harness
//!
//! Tests are organized by the story they tell:
//!
//! - `lifecycle`: how one shared harness tracks cloud resources across a run
//!   and tears them all down at the end
//!
//! - `scenario`: how a single test composes a workload, exposes it, reaches
//!   it over the network, and cleans up after itself
//!
//! # Running These Tests
//!
//! These tests are ignored by default because they require a cluster:
//!
//! ```bash
//! # Ambient kubeconfig must point at a disposable test cluster
//! cargo test --test e2e -- --ignored --nocapture
//! ```

mod helpers;
mod lifecycle;
mod scenario;
