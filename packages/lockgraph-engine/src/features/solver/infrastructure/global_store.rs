//! Solver-owned store of global-variable facts
//!
//! One invariant per global: the join of its initial value and every
//! value ever written to it, from any thread. Invariants only grow.
//!
//! The store also remembers which program points consumed each invariant.
//! Those are the cross-thread edges of the analysis: when a write makes
//! an invariant grow, every recorded reader is re-enqueued, in every
//! thread, which is what makes the iteration thread-modular instead of an
//! interleaving enumeration.

use petgraph::graph::NodeIndex;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::features::abstract_domains::{Interval, Lattice};
use crate::features::flow_graph::Program;
use crate::shared::models::GlobalId;

/// A program point as the solver addresses it: (thread index, node)
pub type PointRef = (usize, NodeIndex);

/// Global invariants and their readers
#[derive(Debug, Clone)]
pub struct GlobalStore {
    invariants: FxHashMap<GlobalId, Interval>,
    readers: FxHashMap<GlobalId, FxHashSet<PointRef>>,
    /// Growth events per global, for invariant widening
    grow_counts: FxHashMap<GlobalId, usize>,
    widening_delay: usize,
}

impl GlobalStore {
    /// Seed invariants from the symbol table's initial values
    pub fn new(program: &Program) -> Self {
        let invariants = program
            .globals
            .iter()
            .map(|(g, init)| (g.clone(), Interval::constant(*init)))
            .collect();
        Self {
            invariants,
            readers: FxHashMap::default(),
            grow_counts: FxHashMap::default(),
            widening_delay: 3,
        }
    }

    pub fn with_widening_delay(mut self, delay: usize) -> Self {
        self.widening_delay = delay;
        self
    }

    /// Current invariant of a global (top for undeclared names)
    pub fn invariant(&self, global: &GlobalId) -> Interval {
        self.invariants
            .get(global)
            .copied()
            .unwrap_or_else(Interval::top)
    }

    /// Join a written value into the invariant; true if it grew
    ///
    /// Invariants have no CFG back edge to hang widening on, yet two
    /// threads feeding each other's globals form an ascending chain all
    /// the same. After `widening_delay` growth events the store widens
    /// instead of joining, which bounds that chain.
    pub fn publish(&mut self, global: &GlobalId, value: Interval) -> bool {
        let current = self.invariant(global);
        let joined = current.join(&value);
        if joined == current {
            return false;
        }
        let count = self.grow_counts.entry(global.clone()).or_insert(0);
        *count += 1;
        let next = if *count > self.widening_delay {
            current.widen(&joined)
        } else {
            joined
        };
        self.invariants.insert(global.clone(), next);
        true
    }

    /// Remember that `point` consumed the invariant of `global`
    pub fn record_reader(&mut self, global: &GlobalId, point: PointRef) {
        self.readers.entry(global.clone()).or_default().insert(point);
    }

    /// Points to re-run when the invariant of `global` grows, in
    /// deterministic order
    pub fn readers_of(&self, global: &GlobalId) -> Vec<PointRef> {
        let mut points: Vec<PointRef> = self
            .readers
            .get(global)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        points.sort_by_key(|(tid, node)| (*tid, node.index()));
        points
    }

    /// Final invariants for reporting, in declaration order
    pub fn invariants(&self, program: &Program) -> Vec<(GlobalId, Interval)> {
        program
            .globals
            .iter()
            .map(|(g, _)| (g.clone(), self.invariant(g)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::flow_graph::{CfgBuilder, ProgramBuilder, Stmt};

    fn program_with_global() -> Program {
        let mut b = CfgBuilder::new("main");
        let entry = b.entry();
        b.seq(entry, Stmt::Skip);
        ProgramBuilder::new().global("g").thread(b.build()).build().unwrap()
    }

    #[test]
    fn test_invariant_starts_at_initial_value() {
        let store = GlobalStore::new(&program_with_global());
        assert_eq!(store.invariant(&GlobalId::new("g")), Interval::constant(0));
    }

    #[test]
    fn test_publish_grows_monotonically() {
        let mut store = GlobalStore::new(&program_with_global());
        let g = GlobalId::new("g");
        assert!(store.publish(&g, Interval::constant(1)));
        assert_eq!(store.invariant(&g), Interval::range(0, 1));
        // Re-publishing a covered value is not a change.
        assert!(!store.publish(&g, Interval::constant(0)));
    }

    #[test]
    fn test_readers_are_deduplicated_and_ordered() {
        let mut store = GlobalStore::new(&program_with_global());
        let g = GlobalId::new("g");
        let p0 = (1, NodeIndex::new(4));
        let p1 = (0, NodeIndex::new(2));
        store.record_reader(&g, p0);
        store.record_reader(&g, p1);
        store.record_reader(&g, p0);
        assert_eq!(store.readers_of(&g), vec![p1, p0]);
    }

    #[test]
    fn test_undeclared_global_is_top() {
        let store = GlobalStore::new(&program_with_global());
        assert!(store.invariant(&GlobalId::new("mystery")).is_top());
    }

    #[test]
    fn test_publish_widens_after_delay() {
        let mut store = GlobalStore::new(&program_with_global()).with_widening_delay(2);
        let g = GlobalId::new("g");
        // An ever-growing chain of writes must stabilize.
        for v in 1..20 {
            store.publish(&g, Interval::constant(v));
        }
        let inv = store.invariant(&g);
        assert!(!inv.hi.is_finite(), "upper bound must have been widened");
        assert!(!store.publish(&g, Interval::constant(1000)));
    }
}
