//! Per-point abstract state
//!
//! One [`AbstractState`] per (thread, program point): the thread's local
//! variable ranges, its definitely-held lockset, and privatized copies of
//! fully-protected globals. All lattice operations are pointwise; the
//! lockset component joins by intersection while the value components
//! join by union, which is the whole point.
//!
//! Canonical form: top intervals are never stored (an absent key means
//! unconstrained), so structural equality is semantic equality and the
//! worklist's changed-detection stays exact.

use rustc_hash::FxHashMap;
use std::fmt;

use crate::features::abstract_domains::{Interval, Lattice, LockSet};
use crate::shared::models::{GlobalId, VarId};

/// Abstract state at a program point
#[derive(Debug, Clone, PartialEq)]
pub struct AbstractState {
    /// Thread-local variable ranges (absent = unconstrained)
    pub locals: FxHashMap<VarId, Interval>,

    /// Locks definitely held by this thread
    pub locked: LockSet,

    /// Privatized copies of globals whose protection set is fully held.
    /// Only valid while the protection condition holds; lock/unlock
    /// transfer functions maintain that invariant.
    pub privatized: FxHashMap<GlobalId, Interval>,
}

impl AbstractState {
    /// Entry state of a thread: nothing known, nothing held
    pub fn entry() -> Self {
        Self {
            locals: FxHashMap::default(),
            locked: LockSet::empty(),
            privatized: FxHashMap::default(),
        }
    }

    /// `heldAt`: the definitely-held lockset (pure query)
    pub fn held(&self) -> &LockSet {
        &self.locked
    }

    pub fn local(&self, var: &VarId) -> Interval {
        self.locals.get(var).copied().unwrap_or_else(Interval::top)
    }

    /// Strong update of a local; top values are dropped to keep the
    /// canonical form
    pub fn set_local(&mut self, var: VarId, value: Interval) {
        if value.is_top() {
            self.locals.remove(&var);
        } else {
            self.locals.insert(var, value);
        }
    }

    pub fn privatized_copy(&self, global: &GlobalId) -> Option<Interval> {
        self.privatized.get(global).copied()
    }

    pub fn set_privatized(&mut self, global: GlobalId, value: Interval) {
        if value.is_top() {
            self.privatized.remove(&global);
        } else {
            self.privatized.insert(global, value);
        }
    }

    pub fn drop_privatized(&mut self, global: &GlobalId) {
        self.privatized.remove(global);
    }

    /// Any component bottom makes the whole state unreachable
    pub fn is_infeasible(&self) -> bool {
        self.locked.is_bottom()
            || self.locals.values().any(|v| v.is_bottom())
            || self.privatized.values().any(|v| v.is_bottom())
    }
}

/// Pointwise map join: keys missing on either side are unconstrained, so
/// they disappear from the result
fn join_maps<K: Clone + Eq + std::hash::Hash>(
    a: &FxHashMap<K, Interval>,
    b: &FxHashMap<K, Interval>,
    op: impl Fn(&Interval, &Interval) -> Interval,
) -> FxHashMap<K, Interval> {
    let mut out = FxHashMap::default();
    for (k, av) in a {
        if let Some(bv) = b.get(k) {
            let v = op(av, bv);
            if !v.is_top() {
                out.insert(k.clone(), v);
            }
        }
    }
    out
}

/// Pointwise map meet: constraints from both sides accumulate
fn meet_maps<K: Clone + Eq + std::hash::Hash>(
    a: &FxHashMap<K, Interval>,
    b: &FxHashMap<K, Interval>,
) -> FxHashMap<K, Interval> {
    let mut out = a.clone();
    for (k, bv) in b {
        let v = out.get(k).copied().unwrap_or_else(Interval::top).meet(bv);
        out.insert(k.clone(), v);
    }
    out
}

/// Does `mine` imply every constraint `theirs` carries? (missing keys
/// read as top)
fn implies_maps<K: Eq + std::hash::Hash>(
    mine: &FxHashMap<K, Interval>,
    theirs: &FxHashMap<K, Interval>,
) -> bool {
    theirs.iter().all(|(k, tv)| {
        mine.get(k)
            .copied()
            .unwrap_or_else(Interval::top)
            .leq(tv)
    })
}

/// Pointwise map narrowing; keys absent in `old` were widened to top and
/// are recovered from `new`
fn narrow_maps<K: Clone + Eq + std::hash::Hash>(
    old: &FxHashMap<K, Interval>,
    new: &FxHashMap<K, Interval>,
) -> FxHashMap<K, Interval> {
    let mut out = FxHashMap::default();
    for (k, ov) in old {
        let v = match new.get(k) {
            Some(nv) => ov.narrow(nv),
            None => *ov,
        };
        if !v.is_top() {
            out.insert(k.clone(), v);
        }
    }
    for (k, nv) in new {
        if !old.contains_key(k) && !nv.is_top() {
            out.insert(k.clone(), *nv);
        }
    }
    out
}

impl Lattice for AbstractState {
    fn bottom() -> Self {
        Self {
            locals: FxHashMap::default(),
            locked: LockSet::bottom(),
            privatized: FxHashMap::default(),
        }
    }

    fn is_bottom(&self) -> bool {
        self.locked.is_bottom()
    }

    fn leq(&self, other: &Self) -> bool {
        if self.is_bottom() {
            return true;
        }
        if other.is_bottom() {
            return false;
        }
        if !self.locked.leq(&other.locked) {
            return false;
        }
        implies_maps(&self.locals, &other.locals)
            && implies_maps(&self.privatized, &other.privatized)
    }

    fn join(&self, other: &Self) -> Self {
        if self.is_bottom() {
            return other.clone();
        }
        if other.is_bottom() {
            return self.clone();
        }
        Self {
            locals: join_maps(&self.locals, &other.locals, |a, b| a.join(b)),
            locked: self.locked.join(&other.locked),
            privatized: join_maps(&self.privatized, &other.privatized, |a, b| a.join(b)),
        }
    }

    fn meet(&self, other: &Self) -> Self {
        if self.is_bottom() || other.is_bottom() {
            return Self::bottom();
        }
        Self {
            locals: meet_maps(&self.locals, &other.locals),
            locked: self.locked.meet(&other.locked),
            privatized: meet_maps(&self.privatized, &other.privatized),
        }
    }

    fn widen(&self, other: &Self) -> Self {
        if self.is_bottom() {
            return other.clone();
        }
        if other.is_bottom() {
            return self.clone();
        }
        Self {
            locals: join_maps(&self.locals, &other.locals, |a, b| a.widen(b)),
            // Finite-height components use plain join.
            locked: self.locked.join(&other.locked),
            privatized: join_maps(&self.privatized, &other.privatized, |a, b| a.widen(b)),
        }
    }

    fn narrow(&self, other: &Self) -> Self {
        if self.is_bottom() || other.is_bottom() {
            return other.clone();
        }
        Self {
            locals: narrow_maps(&self.locals, &other.locals),
            locked: self.locked.clone(),
            privatized: narrow_maps(&self.privatized, &other.privatized),
        }
    }
}

impl fmt::Display for AbstractState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_bottom() {
            return write!(f, "⊥");
        }
        write!(f, "locked={}", self.locked)?;
        let mut locals: Vec<_> = self.locals.iter().collect();
        locals.sort_by_key(|(k, _)| (*k).clone());
        for (var, value) in locals {
            write!(f, " {}={}", var, value)?;
        }
        let mut privatized: Vec<_> = self.privatized.iter().collect();
        privatized.sort_by_key(|(k, _)| (*k).clone());
        for (global, value) in privatized {
            write!(f, " {}*={}", global, value)?;
        }
        Ok(())
    }
}
