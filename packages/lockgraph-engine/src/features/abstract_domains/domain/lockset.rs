/*
 * Must-Lockset Domain
 *
 * Tracks the set of locks DEFINITELY held at a program point. This is a
 * must-domain, so its lattice is the reverse of the usual powerset order:
 *
 * - Bottom = unreachable (no path reaches the point yet)
 * - Top    = ∅ (nothing is known to be held)
 * - Order:  S₁ ⊑ S₂  iff  S₂ ⊆ S₁ (knowing more locks is more precise)
 * - Join   = set INTERSECTION: a lock survives a merge only if it is held
 *   on every incoming path
 * - Meet   = set union
 *
 * Across thread interleavings no lock may be assumed held unless every
 * interleaving-reachable path establishes it; intersection-join is what
 * enforces that. The domain has finite height, so widening and narrowing
 * stay the trait defaults.
 */

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::lattice::Lattice;
use crate::shared::models::LockId;

/// Set of locks definitely held at a program point
///
/// `None` is the unreachable bottom; `Some(set)` is a reachable point
/// holding exactly the locks in `set` on every path. BTreeSet keeps
/// iteration (and therefore solver runs and reports) deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockSet {
    held: Option<BTreeSet<LockId>>,
}

impl LockSet {
    /// Reachable, nothing held (the top element)
    pub fn empty() -> Self {
        Self {
            held: Some(BTreeSet::new()),
        }
    }

    pub fn singleton(lock: LockId) -> Self {
        let mut set = BTreeSet::new();
        set.insert(lock);
        Self { held: Some(set) }
    }

    pub fn from_locks(locks: impl IntoIterator<Item = LockId>) -> Self {
        Self {
            held: Some(locks.into_iter().collect()),
        }
    }

    pub fn contains(&self, lock: &LockId) -> bool {
        self.held.as_ref().is_some_and(|s| s.contains(lock))
    }

    /// Number of definitely-held locks (0 for unreachable)
    pub fn len(&self) -> usize {
        self.held.as_ref().map_or(0, |s| s.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add a lock; returns false if it was already held (the caller
    /// decides whether that is a diagnostic)
    pub fn insert(&mut self, lock: LockId) -> bool {
        match &mut self.held {
            Some(set) => set.insert(lock),
            None => false,
        }
    }

    /// Remove a lock; returns false if it was not held
    pub fn remove(&mut self, lock: &LockId) -> bool {
        match &mut self.held {
            Some(set) => set.remove(lock),
            None => false,
        }
    }

    /// Does every lock of `required` appear in this set?
    ///
    /// An unreachable set vacuously satisfies any requirement.
    pub fn holds_all(&self, required: &LockSet) -> bool {
        match (&self.held, &required.held) {
            (None, _) => true,
            (_, None) => false,
            (Some(mine), Some(req)) => req.is_subset(mine),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &LockId> {
        self.held.iter().flat_map(|s| s.iter())
    }
}

impl Lattice for LockSet {
    fn bottom() -> Self {
        Self { held: None }
    }

    fn is_bottom(&self) -> bool {
        self.held.is_none()
    }

    /// S₁ ⊑ S₂ iff S₂ ⊆ S₁: the larger set is the more precise fact
    fn leq(&self, other: &Self) -> bool {
        match (&self.held, &other.held) {
            (None, _) => true,
            (_, None) => false,
            (Some(a), Some(b)) => b.is_subset(a),
        }
    }

    /// Intersection: held after a merge only if held on both paths
    fn join(&self, other: &Self) -> Self {
        match (&self.held, &other.held) {
            (None, _) => other.clone(),
            (_, None) => self.clone(),
            (Some(a), Some(b)) => Self {
                held: Some(a.intersection(b).cloned().collect()),
            },
        }
    }

    /// Union: combining two must-facts known to hold simultaneously
    fn meet(&self, other: &Self) -> Self {
        match (&self.held, &other.held) {
            (None, _) | (_, None) => Self::bottom(),
            (Some(a), Some(b)) => Self {
                held: Some(a.union(b).cloned().collect()),
            },
        }
    }
}

impl fmt::Display for LockSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.held {
            None => write!(f, "⊥"),
            Some(set) => {
                write!(f, "{{")?;
                for (i, lock) in set.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", lock)?;
                }
                write!(f, "}}")
            }
        }
    }
}
