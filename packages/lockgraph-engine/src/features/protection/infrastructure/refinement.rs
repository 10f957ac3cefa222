/*
 * Protected-Read Refinement
 *
 * Decides when a thread may replace the conservative view of a global
 * (join over every write from every thread, plus the initial value) with
 * a privatized flow-sensitive copy.
 *
 * Protocol:
 * - lock(m): every global g with m ∈ Lp(g) whose protection set is now
 *   fully held gets a privatized copy, seeded from the global invariant.
 * - write to a privatized g: strong update of the copy (the writer also
 *   publishes into the invariant immediately, so unprotected readers in
 *   other threads stay sound under any interleaving).
 * - unlock(m): privatized copies of globals with m ∈ Lp(g) are dropped;
 *   the protection condition no longer holds.
 *
 * Soundness: Lp(g) non-empty and fully held means every write to g holds
 * all of Lp(g), so no other thread can write g while the reader holds it;
 * within that window strong updates and branch refinement on the copy are
 * exact. Without the condition, reads must not be correlated across
 * statements, because a write may interleave between them.
 */

use crate::features::abstract_domains::LockSet;
use crate::features::protection::domain::protection_map::ProtectionMap;
use crate::shared::models::{GlobalId, LockId};

/// Read-only decision helper over a computed [`ProtectionMap`]
pub struct ProtectionRefiner<'a> {
    map: &'a ProtectionMap,
}

impl<'a> ProtectionRefiner<'a> {
    pub fn new(map: &'a ProtectionMap) -> Self {
        Self { map }
    }

    /// May a reader holding `held` use a privatized copy of `global`?
    pub fn can_privatize(&self, global: &GlobalId, held: &LockSet) -> bool {
        self.map.is_fully_protected(global, held)
    }

    /// Globals to privatize after acquiring `lock`, given the held set
    /// that now includes it
    pub fn privatized_by_lock(&self, lock: &LockId, held_after: &LockSet) -> Vec<GlobalId> {
        let mut globals: Vec<GlobalId> = self
            .map
            .guarded_by(lock)
            .filter(|g| self.map.is_fully_protected(g, held_after))
            .cloned()
            .collect();
        globals.sort();
        globals
    }

    /// Globals whose privatized copy becomes invalid when `lock` is
    /// released
    pub fn invalidated_by_unlock(&self, lock: &LockId) -> Vec<GlobalId> {
        let mut globals: Vec<GlobalId> = self.map.guarded_by(lock).cloned().collect();
        globals.sort();
        globals
    }
}
