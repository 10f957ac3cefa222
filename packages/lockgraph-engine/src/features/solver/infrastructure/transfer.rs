/*
 * Edge Transfer Functions
 *
 * Semantics of one CFG edge over the abstract state:
 * - Assign: interval evaluation; global writes publish into the store
 *   immediately (unprotected readers in other threads may observe the
 *   value under any interleaving) and strong-update the privatized copy
 *   when the writer holds the full protection set.
 * - Assume: feasibility test plus backward refinement of locals and
 *   privatized globals. Unprotected globals are NEVER refined: two reads
 *   of such a global must not be correlated, since another thread's
 *   write may interleave between them.
 * - Lock/Unlock: lockset tracking plus the privatization protocol.
 * - Spawn: reported to the solver; the creator's state is unchanged and
 *   the child starts with an empty lockset.
 * - Check: a no-op during solving; verdicts are extracted from the
 *   converged states afterwards.
 *
 * Transfer functions never touch stored solver state; they consume a
 * state and return the successor (None = edge infeasible).
 */

use tracing::trace;

use crate::features::abstract_domains::{Interval, Lattice};
use crate::features::flow_graph::{BinOp, Expr, Place, Stmt, UnOp};
use crate::features::lockset::{LockDiagnostics, LocksetTracker};
use crate::features::protection::{ProtectionMap, ProtectionRefiner};
use crate::features::solver::domain::state::AbstractState;
use crate::features::solver::infrastructure::global_store::GlobalStore;
use crate::shared::models::{GlobalId, ThreadId};

/// Everything one edge application produced
#[derive(Debug)]
pub struct EdgeEffect {
    /// Successor state; None when the edge is infeasible
    pub post: Option<AbstractState>,
    /// Thread created along this edge
    pub spawned: Option<ThreadId>,
    /// Globals whose invariant this edge consumed (re-run dependencies)
    pub globals_read: Vec<GlobalId>,
    /// Globals whose invariant grew (their readers must re-run)
    pub invariants_grown: Vec<GlobalId>,
}

/// Edge semantics over a fixed protection map
pub struct TransferFunction<'a> {
    refiner: ProtectionRefiner<'a>,
    tracker: LocksetTracker,
    /// `ana.int.interval`: with the interval component off, every numeric
    /// value is top and only the lockset analysis retains precision
    track_intervals: bool,
}

impl<'a> TransferFunction<'a> {
    pub fn new(protection: &'a ProtectionMap) -> Self {
        Self {
            refiner: ProtectionRefiner::new(protection),
            tracker: LocksetTracker::new(),
            track_intervals: true,
        }
    }

    pub fn with_intervals(mut self, track_intervals: bool) -> Self {
        self.track_intervals = track_intervals;
        self
    }

    pub fn diagnostics(&self) -> &LockDiagnostics {
        self.tracker.diagnostics()
    }

    pub fn take_diagnostics(&mut self) -> LockDiagnostics {
        self.tracker.take_diagnostics()
    }

    /// Apply one edge statement
    pub fn apply(
        &mut self,
        state: &AbstractState,
        stmt: &Stmt,
        store: &mut GlobalStore,
    ) -> EdgeEffect {
        let mut reads = Vec::new();
        let mut grown = Vec::new();
        let mut spawned = None;

        let post = match stmt {
            Stmt::Skip | Stmt::Check { .. } => Some(state.clone()),

            Stmt::Assign { target, value } => {
                let v = self.eval(value, state, store, &mut reads);
                if v.is_bottom() {
                    None
                } else {
                    let mut post = state.clone();
                    match target {
                        Place::Local(var) => post.set_local(var.clone(), v),
                        Place::Global(g) => {
                            if store.publish(g, v) {
                                grown.push(g.clone());
                            }
                            if self.refiner.can_privatize(g, &post.locked) {
                                // Writer excludes all other writers here,
                                // so the copy takes a strong update.
                                post.set_privatized(g.clone(), v);
                            }
                            trace!(global = %g, value = %v, "global write");
                        }
                    }
                    Some(post)
                }
            }

            Stmt::Assume(cond) => self.assume(state, cond, store, &mut reads),

            Stmt::Lock(m) => {
                let mut post = state.clone();
                post.locked = self.tracker.on_lock(&state.locked, m);
                for g in self.refiner.privatized_by_lock(m, &post.locked) {
                    if post.privatized_copy(&g).is_none() {
                        reads.push(g.clone());
                        let seed = store.invariant(&g);
                        post.set_privatized(g, seed);
                    }
                }
                Some(post)
            }

            Stmt::Unlock(m) => {
                let mut post = state.clone();
                post.locked = self.tracker.on_unlock(&state.locked, m);
                for g in self.refiner.invalidated_by_unlock(m) {
                    post.drop_privatized(&g);
                }
                Some(post)
            }

            Stmt::Spawn(thread) => {
                spawned = Some(thread.clone());
                Some(state.clone())
            }
        };

        let post = post.filter(|s| !s.is_infeasible());
        EdgeEffect {
            post,
            spawned,
            globals_read: reads,
            invariants_grown: grown,
        }
    }

    /// Interval evaluation of an expression
    ///
    /// Global reads record their invariant dependency into `reads` unless
    /// a privatized copy answers them.
    pub fn eval(
        &self,
        expr: &Expr,
        state: &AbstractState,
        store: &GlobalStore,
        reads: &mut Vec<GlobalId>,
    ) -> Interval {
        if !self.track_intervals {
            return Interval::top();
        }
        match expr {
            Expr::Const(c) => Interval::constant(*c),
            Expr::Local(v) => state.local(v),
            Expr::Global(g) => match state.privatized_copy(g) {
                Some(copy) => copy,
                None => {
                    reads.push(g.clone());
                    store.invariant(g)
                }
            },
            Expr::Nondet => Interval::top(),
            Expr::Unary(UnOp::Not, inner) => {
                self.eval(inner, state, store, reads).logical_not()
            }
            Expr::Unary(UnOp::Neg, inner) => self.eval(inner, state, store, reads).neg(),
            Expr::Binary(op, lhs, rhs) => {
                let l = self.eval(lhs, state, store, reads);
                let r = self.eval(rhs, state, store, reads);
                match op {
                    BinOp::Add => l.add(&r),
                    BinOp::Sub => l.sub(&r),
                    BinOp::Mul => l.mul(&r),
                    BinOp::Div => l.div(&r),
                    BinOp::Eq => l.cmp_eq(&r),
                    BinOp::Ne => l.cmp_ne(&r),
                    BinOp::Lt => l.cmp_lt(&r),
                    BinOp::Le => l.cmp_le(&r),
                    BinOp::Gt => r.cmp_lt(&l),
                    BinOp::Ge => r.cmp_le(&l),
                }
            }
        }
    }

    /// Assume `cond` true: feasibility test plus refinement
    fn assume(
        &self,
        state: &AbstractState,
        cond: &Expr,
        store: &GlobalStore,
        reads: &mut Vec<GlobalId>,
    ) -> Option<AbstractState> {
        let truth = self.eval(cond, state, store, reads).truthiness();
        if truth.is_bottom() || truth.as_constant() == Some(0) {
            return None;
        }
        let mut refined = state.clone();
        self.refine(&mut refined, cond, true, store, reads);
        if refined.is_infeasible() {
            None
        } else {
            Some(refined)
        }
    }

    /// Push the truth (or falsehood) of `cond` back into the state
    fn refine(
        &self,
        state: &mut AbstractState,
        cond: &Expr,
        truthy: bool,
        store: &GlobalStore,
        reads: &mut Vec<GlobalId>,
    ) {
        if !self.track_intervals {
            return;
        }
        match cond {
            Expr::Unary(UnOp::Not, inner) => self.refine(state, inner, !truthy, store, reads),
            Expr::Local(_) | Expr::Global(_) => {
                self.refine_place(state, cond, |cur| {
                    if truthy {
                        cur.assume_truthy()
                    } else {
                        cur.assume_falsy()
                    }
                });
            }
            Expr::Binary(op, lhs, rhs) if is_comparison(*op) => {
                let op = if truthy { *op } else { negate_cmp(*op) };
                let rhs_val = self.eval(rhs, state, store, reads);
                let lhs_val = self.eval(lhs, state, store, reads);
                self.refine_place(state, lhs, |cur| apply_cmp(cur, op, &rhs_val));
                self.refine_place(state, rhs, |cur| apply_cmp(cur, swap_cmp(op), &lhs_val));
            }
            _ => {}
        }
    }

    /// Refine the variable a condition side names, if it is refinable:
    /// a local, or a global with a privatized copy
    fn refine_place(
        &self,
        state: &mut AbstractState,
        side: &Expr,
        refine: impl Fn(Interval) -> Interval,
    ) {
        match side {
            Expr::Local(v) => {
                let cur = state.local(v);
                state.set_local(v.clone(), refine(cur));
            }
            Expr::Global(g) => {
                if let Some(cur) = state.privatized_copy(g) {
                    state.set_privatized(g.clone(), refine(cur));
                }
            }
            _ => {}
        }
    }
}

fn is_comparison(op: BinOp) -> bool {
    matches!(
        op,
        BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge
    )
}

/// ¬(a op b) as a op' b
fn negate_cmp(op: BinOp) -> BinOp {
    match op {
        BinOp::Eq => BinOp::Ne,
        BinOp::Ne => BinOp::Eq,
        BinOp::Lt => BinOp::Ge,
        BinOp::Le => BinOp::Gt,
        BinOp::Gt => BinOp::Le,
        BinOp::Ge => BinOp::Lt,
        other => other,
    }
}

/// (a op b) as (b op' a)
fn swap_cmp(op: BinOp) -> BinOp {
    match op {
        BinOp::Lt => BinOp::Gt,
        BinOp::Le => BinOp::Ge,
        BinOp::Gt => BinOp::Lt,
        BinOp::Ge => BinOp::Le,
        other => other,
    }
}

/// One comparison refinement step against an evaluated bound
fn apply_cmp(cur: Interval, op: BinOp, bound: &Interval) -> Interval {
    match op {
        BinOp::Lt => cur.assume_lt(bound),
        BinOp::Le => cur.assume_le(bound),
        BinOp::Gt => cur.assume_gt(bound),
        BinOp::Ge => cur.assume_ge(bound),
        BinOp::Eq => cur.assume_eq(bound),
        BinOp::Ne => match bound.as_constant() {
            Some(c) => cur.assume_ne_constant(c),
            None => cur,
        },
        _ => cur,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::flow_graph::{CfgBuilder, Program, ProgramBuilder};
    use crate::shared::models::{LockId, VarId};

    fn var(name: &str) -> VarId {
        VarId::new(name)
    }

    fn gid(name: &str) -> GlobalId {
        GlobalId::new(name)
    }

    /// Program whose single global g is written only under lock A
    fn protected_program() -> Program {
        let mut b = CfgBuilder::new("main");
        let entry = b.entry();
        let n1 = b.seq(entry, Stmt::Lock(LockId::new("A")));
        let n2 = b.seq(
            n1,
            Stmt::Assign {
                target: Place::Global(gid("g")),
                value: Expr::constant(1),
            },
        );
        b.seq(n2, Stmt::Unlock(LockId::new("A")));
        ProgramBuilder::new().global("g").thread(b.build()).build().unwrap()
    }

    fn setup(program: &Program) -> (ProtectionMap, GlobalStore) {
        (ProtectionMap::compute(program), GlobalStore::new(program))
    }

    #[test]
    fn test_assign_local_evaluates_interval() {
        let program = protected_program();
        let (map, mut store) = setup(&program);
        let mut tf = TransferFunction::new(&map);
        let mut state = AbstractState::entry();
        state.set_local(var("i"), Interval::range(1, 5));

        let effect = tf.apply(
            &state,
            &Stmt::Assign {
                target: Place::Local(var("j")),
                value: Expr::add(Expr::local("i"), Expr::constant(1)),
            },
            &mut store,
        );
        let post = effect.post.unwrap();
        assert_eq!(post.local(&var("j")), Interval::range(2, 6));
    }

    #[test]
    fn test_lock_seeds_privatized_copy_from_invariant() {
        let program = protected_program();
        let (map, mut store) = setup(&program);
        store.publish(&gid("g"), Interval::constant(1));
        let mut tf = TransferFunction::new(&map);

        let effect = tf.apply(
            &AbstractState::entry(),
            &Stmt::Lock(LockId::new("A")),
            &mut store,
        );
        let post = effect.post.unwrap();
        assert_eq!(post.privatized_copy(&gid("g")), Some(Interval::range(0, 1)));
        // Seeding consumed the invariant: the edge depends on it.
        assert_eq!(effect.globals_read, vec![gid("g")]);
    }

    #[test]
    fn test_protected_write_strong_updates_copy_and_publishes() {
        let program = protected_program();
        let (map, mut store) = setup(&program);
        let mut tf = TransferFunction::new(&map);

        let locked = tf
            .apply(&AbstractState::entry(), &Stmt::Lock(LockId::new("A")), &mut store)
            .post
            .unwrap();
        let effect = tf.apply(
            &locked,
            &Stmt::Assign {
                target: Place::Global(gid("g")),
                value: Expr::constant(1),
            },
            &mut store,
        );
        let post = effect.post.unwrap();
        // Strong update: the copy is exactly [1,1], not joined with 0.
        assert_eq!(post.privatized_copy(&gid("g")), Some(Interval::constant(1)));
        // Published immediately for unprotected readers elsewhere.
        assert_eq!(store.invariant(&gid("g")), Interval::range(0, 1));
        assert_eq!(effect.invariants_grown, vec![gid("g")]);
    }

    #[test]
    fn test_unlock_drops_privatized_copy() {
        let program = protected_program();
        let (map, mut store) = setup(&program);
        let mut tf = TransferFunction::new(&map);

        let locked = tf
            .apply(&AbstractState::entry(), &Stmt::Lock(LockId::new("A")), &mut store)
            .post
            .unwrap();
        let unlocked = tf
            .apply(&locked, &Stmt::Unlock(LockId::new("A")), &mut store)
            .post
            .unwrap();
        assert_eq!(unlocked.privatized_copy(&gid("g")), None);
        assert!(unlocked.locked.is_empty());
    }

    #[test]
    fn test_assume_refines_privatized_global_both_ways() {
        let program = protected_program();
        let (map, mut store) = setup(&program);
        store.publish(&gid("g"), Interval::constant(1));
        let mut tf = TransferFunction::new(&map);

        let locked = tf
            .apply(&AbstractState::entry(), &Stmt::Lock(LockId::new("A")), &mut store)
            .post
            .unwrap();
        // if (g): copy refines to [1,1]
        let then_state = tf
            .apply(&locked, &Stmt::Assume(Expr::global("g")), &mut store)
            .post
            .unwrap();
        assert_eq!(
            then_state.privatized_copy(&gid("g")),
            Some(Interval::constant(1))
        );
        // else: copy refines to [0,0]
        let else_state = tf
            .apply(
                &locked,
                &Stmt::Assume(Expr::global("g").negated()),
                &mut store,
            )
            .post
            .unwrap();
        assert_eq!(
            else_state.privatized_copy(&gid("g")),
            Some(Interval::constant(0))
        );
    }

    #[test]
    fn test_assume_does_not_refine_unprotected_global() {
        let program = protected_program();
        let (map, mut store) = setup(&program);
        store.publish(&gid("g"), Interval::constant(1));
        let mut tf = TransferFunction::new(&map);

        // No lock held: the read is the invariant and must stay
        // uncorrelated, so no refinement happens.
        let state = AbstractState::entry();
        let taken = tf
            .apply(&state, &Stmt::Assume(Expr::global("g")), &mut store)
            .post
            .unwrap();
        assert_eq!(taken.privatized_copy(&gid("g")), None);
        let mut reads = Vec::new();
        let read_back = tf.eval(&Expr::global("g"), &taken, &store, &mut reads);
        assert_eq!(read_back, Interval::range(0, 1));
    }

    #[test]
    fn test_assume_infeasible_branch_is_none() {
        let program = protected_program();
        let (map, mut store) = setup(&program);
        let mut tf = TransferFunction::new(&map);
        let mut state = AbstractState::entry();
        state.set_local(var("i"), Interval::constant(3));

        let effect = tf.apply(
            &state,
            &Stmt::Assume(Expr::lt(Expr::local("i"), Expr::constant(0))),
            &mut store,
        );
        assert!(effect.post.is_none());
    }

    #[test]
    fn test_assume_refines_loop_guard() {
        let program = protected_program();
        let (map, mut store) = setup(&program);
        let mut tf = TransferFunction::new(&map);
        let mut state = AbstractState::entry();
        state.set_local(var("i"), Interval::range(1, 100));

        let guard = Expr::le(Expr::local("i"), Expr::constant(5));
        let cont = tf.apply(&state, &Stmt::Assume(guard.clone()), &mut store).post.unwrap();
        assert_eq!(cont.local(&var("i")), Interval::range(1, 5));

        let exit = tf
            .apply(&state, &Stmt::Assume(guard.negated()), &mut store)
            .post
            .unwrap();
        assert_eq!(exit.local(&var("i")), Interval::range(6, 100));
    }

    #[test]
    fn test_spawn_reports_thread_and_keeps_state() {
        let program = protected_program();
        let (map, mut store) = setup(&program);
        let mut tf = TransferFunction::new(&map);
        let mut state = AbstractState::entry();
        state.locked.insert(LockId::new("A"));

        let effect = tf.apply(&state, &Stmt::Spawn(ThreadId::new("t_fun")), &mut store);
        assert_eq!(effect.spawned, Some(ThreadId::new("t_fun")));
        assert_eq!(effect.post.unwrap(), state);
    }

    #[test]
    fn test_intervals_off_drops_numeric_precision() {
        let program = protected_program();
        let (map, mut store) = setup(&program);
        let mut tf = TransferFunction::new(&map).with_intervals(false);

        let mut state = AbstractState::entry();
        state.set_local(var("i"), Interval::constant(3));
        let mut reads = Vec::new();
        assert!(tf
            .eval(&Expr::constant(3), &state, &store, &mut reads)
            .is_top());

        // Assumes stay feasible in both directions and refine nothing.
        let effect = tf.apply(
            &state,
            &Stmt::Assume(Expr::lt(Expr::local("i"), Expr::constant(0))),
            &mut store,
        );
        assert_eq!(effect.post.unwrap(), state);
    }

    #[test]
    fn test_nondet_evaluates_to_top() {
        let program = protected_program();
        let (map, store) = setup(&program);
        let tf = TransferFunction::new(&map);
        let mut reads = Vec::new();
        let v = tf.eval(&Expr::Nondet, &AbstractState::entry(), &store, &mut reads);
        assert!(v.is_top());
    }
}
