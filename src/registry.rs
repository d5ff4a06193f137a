//! Concurrency-safe tracking of created resource identifiers
//!
//! Every resource the harness creates is recorded here so teardown can find
//! it later, no matter which test task created it or whether that task
//! failed. The registry is a grow-only set: members leave it only when the
//! whole registry is discarded after teardown has drained it.

use std::collections::HashSet;
use std::hash::Hash;

use parking_lot::Mutex;

/// A synchronized set of opaque resource identifiers.
///
/// One instance exists per tracked resource kind. Inserts are idempotent and
/// safe under arbitrary concurrent callers; reads observe a consistent
/// snapshot. The underlying set is never exposed, so all access is forced
/// through the lock.
#[derive(Debug, Default)]
pub struct Registry<T> {
    members: Mutex<HashSet<T>>,
}

impl<T: Eq + Hash + Clone> Registry<T> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            members: Mutex::new(HashSet::new()),
        }
    }

    /// Record an identifier. Adding an already-present identifier is a no-op.
    pub fn add(&self, id: T) {
        self.members.lock().insert(id);
    }

    /// Current number of tracked identifiers
    pub fn len(&self) -> usize {
        self.members.lock().len()
    }

    /// Whether the registry currently tracks nothing
    pub fn is_empty(&self) -> bool {
        self.members.lock().is_empty()
    }

    /// Point-in-time snapshot of all tracked identifiers.
    ///
    /// Order is unspecified. Adds made after the snapshot is taken do not
    /// appear in it.
    pub fn all(&self) -> Vec<T> {
        self.members.lock().iter().cloned().collect()
    }
}
