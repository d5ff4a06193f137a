//! Bounded, interval-based convergence polling
//!
//! One driver serves every "wait until a remote condition becomes true"
//! situation in the harness: workload readiness, service address assignment,
//! namespace deletion, network reachability. The predicate decides whether a
//! remote-call error is transient (keep retrying) or fatal (abort); the
//! driver only enforces the interval, the bound, and cancellation.
//!
//! # Example
//!
//! ```ignore
//! use ephemera::poll::{converge, PollOpts, PollStep};
//!
//! let opts = PollOpts::new(Duration::from_secs(1), Duration::from_secs(60));
//! let pod = converge(&opts, "readiness of pod web", &cancel, || {
//!     let pods = pods.clone();
//!     async move {
//!         let pod = pods.get("web").await?;
//!         if is_ready(&pod) {
//!             Ok(PollStep::Converged(pod))
//!         } else {
//!             Ok(PollStep::Observed(pod))
//!         }
//!     }
//! })
//! .await?;
//! ```

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::Error;

/// Timing parameters for one convergence wait
#[derive(Clone, Debug)]
pub struct PollOpts {
    /// Wait between predicate evaluations
    pub interval: Duration,
    /// Total bound after which the wait times out
    pub timeout: Duration,
    /// Evaluate once immediately instead of waiting one interval first
    pub immediate: bool,
}

impl PollOpts {
    /// Create options with the given interval and bound; the first
    /// evaluation happens after one interval.
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval,
            timeout,
            immediate: false,
        }
    }

    /// Evaluate the predicate once immediately, before the first interval.
    ///
    /// Used when the condition may already hold at the time the wait starts,
    /// e.g. confirming a deletion that completed synchronously.
    pub fn immediately(mut self) -> Self {
        self.immediate = true;
        self
    }
}

/// What one predicate evaluation concluded
#[derive(Debug)]
pub enum PollStep<T> {
    /// The condition holds; carry the observed value out of the loop
    Converged(T),
    /// Not yet, but record this observation as the latest one seen
    Observed(T),
    /// Not yet, nothing new observed
    Pending,
}

/// Terminal state of a convergence wait.
///
/// The `Pending` state of the underlying state machine never escapes the
/// driver; a caller only ever sees one of these.
#[derive(Debug)]
pub enum PollOutcome<T> {
    /// The predicate reported convergence
    Converged(T),
    /// The bound elapsed first; `last_seen` is the most recent observation
    /// the predicate recorded, if any
    TimedOut {
        /// Latest value the predicate reported via [`PollStep::Observed`]
        last_seen: Option<T>,
    },
    /// The predicate reported an unrecoverable error
    Failed(Error),
    /// The cancellation token fired before any other terminal state
    Cancelled,
}

enum Tick {
    Elapsed,
    DeadlineHit,
    Cancelled,
}

async fn next_tick(interval: Duration, deadline: Instant, cancel: &CancellationToken) -> Tick {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Tick::Cancelled,
        _ = tokio::time::sleep_until(deadline) => Tick::DeadlineHit,
        _ = tokio::time::sleep(interval) => Tick::Elapsed,
    }
}

/// Evaluate `check` at `opts.interval` until it converges, fails, the bound
/// elapses, or `cancel` fires.
///
/// `condition` names what is being awaited; it appears in logs and, via
/// [`converge`], in timeout errors. The suspension between evaluations is the
/// only place this function waits, so concurrent polls never block each
/// other.
pub async fn poll_until<T, F, Fut>(
    opts: &PollOpts,
    condition: &str,
    cancel: &CancellationToken,
    mut check: F,
) -> PollOutcome<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<PollStep<T>, Error>>,
{
    let deadline = Instant::now() + opts.timeout;
    let mut last_seen = None;

    if !opts.immediate {
        match next_tick(opts.interval, deadline, cancel).await {
            Tick::Elapsed => {}
            Tick::DeadlineHit => return PollOutcome::TimedOut { last_seen },
            Tick::Cancelled => return PollOutcome::Cancelled,
        }
    }

    loop {
        match check().await {
            Ok(PollStep::Converged(value)) => {
                debug!(condition, "condition converged");
                return PollOutcome::Converged(value);
            }
            Ok(PollStep::Observed(value)) => last_seen = Some(value),
            Ok(PollStep::Pending) => {}
            Err(err) => {
                warn!(condition, error = %err, "condition check failed");
                return PollOutcome::Failed(err);
            }
        }

        match next_tick(opts.interval, deadline, cancel).await {
            Tick::Elapsed => {}
            Tick::DeadlineHit => {
                warn!(condition, bound = ?opts.timeout, "condition did not converge within bound");
                return PollOutcome::TimedOut { last_seen };
            }
            Tick::Cancelled => return PollOutcome::Cancelled,
        }
    }
}

/// Like [`poll_until`], mapped into a `Result`.
///
/// Timeouts become [`Error::Timeout`] naming the condition and the bound;
/// cancellation becomes [`Error::Cancelled`]; predicate errors pass through
/// unchanged.
pub async fn converge<T, F, Fut>(
    opts: &PollOpts,
    condition: &str,
    cancel: &CancellationToken,
    check: F,
) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<PollStep<T>, Error>>,
{
    match poll_until(opts, condition, cancel, check).await {
        PollOutcome::Converged(value) => Ok(value),
        PollOutcome::TimedOut { .. } => Err(Error::Timeout {
            condition: condition.to_string(),
            bound: opts.timeout,
        }),
        PollOutcome::Failed(err) => Err(err),
        PollOutcome::Cancelled => Err(Error::Cancelled {
            condition: condition.to_string(),
        }),
    }
}
