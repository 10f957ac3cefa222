/*
 * Protection Map
 *
 * For each global g, the set Lp(g) of locks held at EVERY write to g
 * observed anywhere in the program.
 *
 * Computed as a least fixpoint over a value-blind lockset abstraction:
 * 1. Run a worklist iteration tracking only held locksets per program
 *    point (join = intersection; spawned threads enter with ∅).
 * 2. Initialize Lp(g) = all locks in the program (the most restrictive
 *    claim).
 * 3. At each reachable write to g, intersect Lp(g) with the lockset held
 *    at the writing point.
 *
 * In the must-lockset lattice the intersection of step 3 IS the join, so
 * the map construction reuses the domain's own operator.
 */

use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use tracing::debug;

use crate::features::abstract_domains::{Lattice, LockSet};
use crate::features::flow_graph::{Place, Program, Stmt};
use crate::shared::models::{GlobalId, LockId};

/// Global → locks held at every write to it
#[derive(Debug, Clone)]
pub struct ProtectionMap {
    map: FxHashMap<GlobalId, LockSet>,
    universe: LockSet,
}

impl ProtectionMap {
    /// Pre-pass over the whole program (see module header)
    pub fn compute(program: &Program) -> Self {
        let universe = LockSet::from_locks(program.lock_universe());
        let mut map: FxHashMap<GlobalId, LockSet> = program
            .globals
            .iter()
            .map(|(g, _)| (g.clone(), universe.clone()))
            .collect();

        let locksets = lockset_fixpoint(program);

        for (tid, cfg) in program.threads.iter().enumerate() {
            for edge in cfg.graph.edge_references() {
                if let Stmt::Assign {
                    target: Place::Global(g),
                    ..
                } = &edge.weight().stmt
                {
                    let Some(held) = locksets[tid].get(&edge.source()) else {
                        continue; // unreachable write
                    };
                    let entry = map.entry(g.clone()).or_insert_with(|| universe.clone());
                    // join = intersection in the must-lattice
                    *entry = entry.join(held);
                }
            }
        }

        for (g, locks) in &map {
            debug!(global = %g, protecting = %locks, "protection entry");
        }

        Self { map, universe }
    }

    /// Locks observed at every write to `global`
    ///
    /// A global with no reachable write keeps the full universe: nothing
    /// ever contradicted the most restrictive claim.
    pub fn protecting(&self, global: &GlobalId) -> &LockSet {
        self.map.get(global).unwrap_or(&self.universe)
    }

    /// Does `held` satisfy the refinement condition Lp(g) ⊆ Lh?
    ///
    /// An empty protection set means the global has unsynchronized writes;
    /// no reader may privatize it, whatever it holds.
    pub fn is_fully_protected(&self, global: &GlobalId, held: &LockSet) -> bool {
        let protecting = self.protecting(global);
        !protecting.is_empty() && held.holds_all(protecting)
    }

    /// Globals whose protection set mentions `lock`
    pub fn guarded_by(&self, lock: &LockId) -> impl Iterator<Item = &GlobalId> {
        let lock = lock.clone();
        self.map
            .iter()
            .filter(move |(_, locks)| locks.contains(&lock))
            .map(|(g, _)| g)
    }
}

/// Value-blind lockset fixpoint: per (thread, node) the definitely-held
/// set. Diagnostics for lock misuse are left to the main solver run; this
/// pass only needs the sets.
fn lockset_fixpoint(program: &Program) -> Vec<FxHashMap<NodeIndex, LockSet>> {
    let mut states: Vec<FxHashMap<NodeIndex, LockSet>> =
        vec![FxHashMap::default(); program.threads.len()];
    let mut worklist: VecDeque<(usize, NodeIndex)> = VecDeque::new();

    states[0].insert(program.main().entry, LockSet::empty());
    worklist.push_back((0, program.main().entry));

    while let Some((tid, node)) = worklist.pop_front() {
        let held = states[tid]
            .get(&node)
            .cloned()
            .unwrap_or_else(LockSet::bottom);
        if held.is_bottom() {
            continue;
        }

        let cfg = &program.threads[tid];
        let out_edges: Vec<_> = cfg
            .graph
            .edges_directed(node, Direction::Outgoing)
            .map(|e| (e.target(), e.weight().stmt.clone()))
            .collect();

        for (target, stmt) in out_edges {
            let mut post = held.clone();
            match &stmt {
                Stmt::Lock(l) => {
                    post.insert(l.clone());
                }
                Stmt::Unlock(l) => {
                    post.remove(l);
                }
                Stmt::Spawn(spawned) => {
                    // Spawned threads never inherit the creator's locks.
                    if let Some(sid) = program.thread_index(spawned) {
                        let entry = program.threads[sid].entry;
                        if update(&mut states[sid], entry, LockSet::empty()) {
                            worklist.push_back((sid, entry));
                        }
                    }
                }
                _ => {}
            }
            if update(&mut states[tid], target, post) {
                worklist.push_back((tid, target));
            }
        }
    }

    states
}

/// Join `incoming` into the stored set; true if the stored set changed
fn update(states: &mut FxHashMap<NodeIndex, LockSet>, node: NodeIndex, incoming: LockSet) -> bool {
    match states.get_mut(&node) {
        Some(current) => {
            let joined = current.join(&incoming);
            if &joined != current {
                *current = joined;
                true
            } else {
                false
            }
        }
        None => {
            states.insert(node, incoming);
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::flow_graph::{CfgBuilder, Expr, ProgramBuilder};
    use crate::shared::models::ThreadId;

    fn lock(name: &str) -> LockId {
        LockId::new(name)
    }

    /// main: lock(A); g = 1; unlock(A)
    fn locked_writer() -> Program {
        let mut b = CfgBuilder::new("main");
        let entry = b.entry();
        let n1 = b.seq(entry, Stmt::Lock(lock("A")));
        let n2 = b.seq(
            n1,
            Stmt::Assign {
                target: Place::Global(GlobalId::new("g")),
                value: Expr::constant(1),
            },
        );
        b.seq(n2, Stmt::Unlock(lock("A")));
        ProgramBuilder::new().global("g").thread(b.build()).build().unwrap()
    }

    #[test]
    fn test_single_locked_write_protects() {
        let program = locked_writer();
        let map = ProtectionMap::compute(&program);
        let protecting = map.protecting(&GlobalId::new("g"));
        assert!(protecting.contains(&lock("A")));
        assert_eq!(protecting.len(), 1);
    }

    #[test]
    fn test_fully_protected_requires_all_locks() {
        let program = locked_writer();
        let map = ProtectionMap::compute(&program);
        let g = GlobalId::new("g");
        assert!(map.is_fully_protected(&g, &LockSet::singleton(lock("A"))));
        assert!(!map.is_fully_protected(&g, &LockSet::empty()));
    }

    #[test]
    fn test_unsynchronized_write_clears_protection() {
        // One write under A, one bare write: intersection is empty.
        let mut b = CfgBuilder::new("main");
        let entry = b.entry();
        let n1 = b.seq(entry, Stmt::Lock(lock("A")));
        let n2 = b.seq(
            n1,
            Stmt::Assign {
                target: Place::Global(GlobalId::new("g")),
                value: Expr::constant(1),
            },
        );
        let n3 = b.seq(n2, Stmt::Unlock(lock("A")));
        b.seq(
            n3,
            Stmt::Assign {
                target: Place::Global(GlobalId::new("g")),
                value: Expr::constant(2),
            },
        );
        let program = ProgramBuilder::new().global("g").thread(b.build()).build().unwrap();
        let map = ProtectionMap::compute(&program);
        let g = GlobalId::new("g");
        assert!(map.protecting(&g).is_empty());
        // Empty protection can never be "fully held".
        assert!(!map.is_fully_protected(&g, &LockSet::singleton(lock("A"))));
    }

    #[test]
    fn test_spawned_thread_writes_with_empty_entry_lockset() {
        // main holds A at the spawn; the spawned thread writes g bare.
        // If the child inherited A, Lp(g) would stay {A}; it must be ∅.
        let mut child = CfgBuilder::new("t_fun");
        let centry = child.entry();
        child.seq(
            centry,
            Stmt::Assign {
                target: Place::Global(GlobalId::new("g")),
                value: Expr::constant(7),
            },
        );

        let mut main = CfgBuilder::new("main");
        let entry = main.entry();
        let n1 = main.seq(entry, Stmt::Lock(lock("A")));
        let n2 = main.seq(n1, Stmt::Spawn(ThreadId::new("t_fun")));
        main.seq(n2, Stmt::Unlock(lock("A")));

        let program = ProgramBuilder::new()
            .global("g")
            .thread(main.build())
            .thread(child.build())
            .build()
            .unwrap();
        let map = ProtectionMap::compute(&program);
        assert!(map.protecting(&GlobalId::new("g")).is_empty());
    }

    #[test]
    fn test_unwritten_global_keeps_universe() {
        let program = locked_writer();
        let map = ProtectionMap::compute(&program);
        // "h" is never declared or written; the most restrictive claim
        // stands.
        let protecting = map.protecting(&GlobalId::new("h"));
        assert!(protecting.contains(&lock("A")));
    }

    #[test]
    fn test_guarded_by() {
        let program = locked_writer();
        let map = ProtectionMap::compute(&program);
        let guarded: Vec<_> = map.guarded_by(&lock("A")).collect();
        assert_eq!(guarded, vec![&GlobalId::new("g")]);
    }
}
