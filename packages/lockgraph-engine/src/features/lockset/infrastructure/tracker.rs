//! Lock/unlock transfer functions
//!
//! The tracker is the only component that mutates held-lock facts. It
//! works functionally: callers pass the current set and receive the
//! successor set, so the solver keeps exclusive ownership of stored
//! state.

use serde::Serialize;
use tracing::warn;

use crate::features::abstract_domains::{Lattice, LockSet};
use crate::shared::models::LockId;

/// Counters for abstract-model inconsistencies
///
/// Neither counter affects soundness; both are surfaced in the analysis
/// report so oracle inputs with broken lock discipline are visible.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct LockDiagnostics {
    /// Same thread path acquired a lock it already held
    pub double_locks: usize,
    /// A lock was released that was not definitely held
    pub unmatched_unlocks: usize,
}

/// Stateless lock/unlock transformer with diagnostic counting
#[derive(Debug, Default)]
pub struct LocksetTracker {
    diagnostics: LockDiagnostics,
}

impl LocksetTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// `lock(m)`: add `m` to the held set
    ///
    /// Re-acquisition on the same path is an internal inconsistency (the
    /// abstract model does not track recursive mutexes); the set is
    /// already correct, so only the diagnostic changes.
    pub fn on_lock(&mut self, held: &LockSet, lock: &LockId) -> LockSet {
        if held.is_bottom() {
            return held.clone();
        }
        let mut next = held.clone();
        if !next.insert(lock.clone()) {
            self.diagnostics.double_locks += 1;
            warn!(lock = %lock, "lock already held on this path");
        }
        next
    }

    /// `unlock(m)`: remove `m` from the held set
    ///
    /// Releasing a lock that is not definitely held is sound to ignore
    /// (the must-set can only shrink), but is counted.
    pub fn on_unlock(&mut self, held: &LockSet, lock: &LockId) -> LockSet {
        if held.is_bottom() {
            return held.clone();
        }
        let mut next = held.clone();
        if !next.remove(lock) {
            self.diagnostics.unmatched_unlocks += 1;
            warn!(lock = %lock, "unlock of a lock not definitely held");
        }
        next
    }

    /// Entry lockset of a freshly spawned thread
    ///
    /// Locks are NOT inherited across thread creation: the new thread
    /// starts with nothing held, regardless of what its creator holds.
    pub fn spawn_entry(&self) -> LockSet {
        LockSet::empty()
    }

    pub fn diagnostics(&self) -> &LockDiagnostics {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> LockDiagnostics {
        std::mem::take(&mut self.diagnostics)
    }
}
