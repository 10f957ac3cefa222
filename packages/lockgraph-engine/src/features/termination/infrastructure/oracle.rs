/*
 * Termination Oracle
 *
 * Certifies a loop `terminating` iff it finds a progress measure:
 * a local variable v such that
 *   1. every assignment to v inside the loop body is a strict constant
 *      step, all in the same direction, and nothing else clobbers v;
 *   2. every cycle through the loop header passes one of those step
 *      edges (checked by cutting the step edges out of the body subgraph
 *      and testing whether the header can still reach itself);
 *   3. v is bounded in the step's direction, either by a guard on a
 *      header continue edge (e.g. `i <= 5` with a bounded right side) or
 *      by the header state's interval after narrowing.
 *
 * Each loop is judged on its own descriptor only. A nondeterministic
 * branch around the loop changes which headers are reachable, never the
 * judgment of a reachable loop's own bound. An unreachable loop is
 * vacuously terminating.
 *
 * Incomplete on purpose: a sound "unknown" is always available, and the
 * general problem is undecidable.
 */

use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::features::abstract_domains::Lattice;
use crate::features::flow_graph::{find_loops, BinOp, Expr, LoopDescriptor, Place, Program, Stmt};
use crate::features::protection::ProtectionMap;
use crate::features::solver::infrastructure::transfer::TransferFunction;
use crate::features::solver::infrastructure::worklist::SolveOutcome;
use crate::features::termination::domain::verdict::{LoopReport, LoopVerdict};
use crate::shared::models::VarId;

/// Per-variable evidence collected from the loop body
#[derive(Debug, Default)]
struct StepEvidence {
    /// Constant steps seen (signed)
    steps: Vec<i64>,
    /// Edges carrying those steps
    step_edges: Vec<EdgeIndex>,
    /// A non-step assignment (constant reset, nondet, arithmetic we do
    /// not recognize) disqualifies the variable
    clobbered: bool,
}

/// Judges loop descriptors against a converged solver outcome
pub struct TerminationOracle<'a> {
    program: &'a Program,
    protection: &'a ProtectionMap,
    outcome: &'a SolveOutcome,
}

impl<'a> TerminationOracle<'a> {
    pub fn new(
        program: &'a Program,
        protection: &'a ProtectionMap,
        outcome: &'a SolveOutcome,
    ) -> Self {
        Self {
            program,
            protection,
            outcome,
        }
    }

    /// Verdicts for every loop in every thread, in report order
    pub fn verdicts(&self) -> Vec<LoopReport> {
        let mut reports = Vec::new();
        for (tid, cfg) in self.program.threads.iter().enumerate() {
            for descriptor in find_loops(cfg) {
                let verdict = self.judge(tid, &descriptor);
                debug!(
                    loop_header = %descriptor.location,
                    verdict = %verdict,
                    "loop judged"
                );
                reports.push(LoopReport {
                    thread: descriptor.thread.clone(),
                    location: descriptor.location.clone(),
                    verdict,
                });
            }
        }
        reports
    }

    fn judge(&self, tid: usize, descriptor: &LoopDescriptor) -> LoopVerdict {
        // A budget cut means the states below are not a fixpoint.
        if self.outcome.stats.budget_exhausted {
            return LoopVerdict::Unknown;
        }

        let header_state = match self.outcome.state_at((tid, descriptor.header)) {
            Some(s) if !s.is_bottom() => s,
            // The abstraction proves the loop is never entered.
            _ => return LoopVerdict::Terminating,
        };

        let evidence = self.collect_steps(tid, descriptor);
        let mut candidates: Vec<(&VarId, &StepEvidence)> = evidence
            .iter()
            .filter(|(_, ev)| {
                !ev.clobbered
                    && !ev.steps.is_empty()
                    && (ev.steps.iter().all(|s| *s > 0) || ev.steps.iter().all(|s| *s < 0))
            })
            .collect();
        candidates.sort_by_key(|(v, _)| (*v).clone());

        let tf = TransferFunction::new(self.protection);
        for (var, ev) in candidates {
            let increasing = ev.steps[0] > 0;

            if !self.steps_on_every_cycle(tid, descriptor, &ev.step_edges) {
                continue;
            }

            // Boundedness: a guard on a continue edge, or the header
            // interval itself after narrowing.
            let guard_bounds = self.guard_bounds(tid, descriptor, var, increasing, &tf);
            let header_interval = header_state.local(var);
            let interval_bounds = if increasing {
                header_interval.hi.is_finite()
            } else {
                header_interval.lo.is_finite()
            };

            if guard_bounds || interval_bounds {
                return LoopVerdict::Terminating;
            }
        }

        LoopVerdict::Unknown
    }

    /// Scan assignments on body edges
    fn collect_steps(&self, tid: usize, descriptor: &LoopDescriptor) -> FxHashMap<VarId, StepEvidence> {
        let cfg = &self.program.threads[tid];
        let mut evidence: FxHashMap<VarId, StepEvidence> = FxHashMap::default();

        for edge in cfg.graph.edge_references() {
            if !descriptor.body.contains(&edge.source()) || !descriptor.body.contains(&edge.target())
            {
                continue;
            }
            if let Stmt::Assign {
                target: Place::Local(var),
                value,
            } = &edge.weight().stmt
            {
                let entry = evidence.entry(var.clone()).or_default();
                match constant_step(var, value) {
                    Some(step) if step != 0 => {
                        entry.steps.push(step);
                        entry.step_edges.push(edge.id());
                    }
                    _ => entry.clobbered = true,
                }
            }
        }
        evidence
    }

    /// Does every cycle through the header pass a step edge? Cut the step
    /// edges out of the body subgraph; if the header can still reach
    /// itself, some iteration makes no progress.
    fn steps_on_every_cycle(
        &self,
        tid: usize,
        descriptor: &LoopDescriptor,
        step_edges: &[EdgeIndex],
    ) -> bool {
        let cfg = &self.program.threads[tid];
        let cut: FxHashSet<EdgeIndex> = step_edges.iter().copied().collect();

        let mut visited: FxHashSet<NodeIndex> = FxHashSet::default();
        let mut stack = vec![descriptor.header];
        while let Some(node) = stack.pop() {
            for edge in cfg.graph.edges_directed(node, Direction::Outgoing) {
                if cut.contains(&edge.id()) {
                    continue;
                }
                let target = edge.target();
                if !descriptor.body.contains(&target) {
                    continue;
                }
                if target == descriptor.header {
                    return false; // progress-free cycle
                }
                if visited.insert(target) {
                    stack.push(target);
                }
            }
        }
        true
    }

    /// Does EVERY continue edge's guard bound `var` from the side the
    /// step approaches? One unguarded way into the body would admit
    /// unboundedly many iterations, so a single bounding edge is not
    /// enough.
    fn guard_bounds(
        &self,
        tid: usize,
        descriptor: &LoopDescriptor,
        var: &VarId,
        increasing: bool,
        tf: &TransferFunction<'_>,
    ) -> bool {
        let cfg = &self.program.threads[tid];
        let Some(header_state) = self.outcome.state_at((tid, descriptor.header)) else {
            return false;
        };
        let mut reads = Vec::new();
        let mut found_continue = false;

        for edge in cfg.graph.edges_directed(descriptor.header, Direction::Outgoing) {
            if !descriptor.body.contains(&edge.target()) {
                continue;
            }
            found_continue = true;
            let Stmt::Assume(cond) = &edge.weight().stmt else {
                return false;
            };
            let bound_expr = match cond {
                // v ≤ e / v < e bounds an increasing counter above
                Expr::Binary(BinOp::Le | BinOp::Lt, lhs, rhs)
                    if is_var(lhs, var) && increasing =>
                {
                    Some((rhs, true))
                }
                // e ≥ v / e > v, same bound written the other way round
                Expr::Binary(BinOp::Ge | BinOp::Gt, lhs, rhs)
                    if is_var(rhs, var) && increasing =>
                {
                    Some((lhs, true))
                }
                // v ≥ e / v > e bounds a decreasing counter below
                Expr::Binary(BinOp::Ge | BinOp::Gt, lhs, rhs)
                    if is_var(lhs, var) && !increasing =>
                {
                    Some((rhs, false))
                }
                Expr::Binary(BinOp::Le | BinOp::Lt, lhs, rhs)
                    if is_var(rhs, var) && !increasing =>
                {
                    Some((lhs, false))
                }
                _ => None,
            };
            let Some((expr, upper)) = bound_expr else {
                return false;
            };
            let value = tf.eval(expr, header_state, &self.outcome.store, &mut reads);
            let finite = if upper {
                value.hi.is_finite()
            } else {
                value.lo.is_finite()
            };
            if !finite {
                return false;
            }
        }
        found_continue
    }
}

fn is_var(expr: &Expr, var: &VarId) -> bool {
    matches!(expr, Expr::Local(v) if v == var)
}

/// Recognize `v = v + c`, `v = c + v`, `v = v - c`
fn constant_step(var: &VarId, value: &Expr) -> Option<i64> {
    match value {
        Expr::Binary(BinOp::Add, lhs, rhs) => match (&**lhs, &**rhs) {
            (Expr::Local(v), Expr::Const(c)) if v == var => Some(*c),
            (Expr::Const(c), Expr::Local(v)) if v == var => Some(*c),
            _ => None,
        },
        Expr::Binary(BinOp::Sub, lhs, rhs) => match (&**lhs, &**rhs) {
            (Expr::Local(v), Expr::Const(c)) if v == var => c.checked_neg(),
            _ => None,
        },
        _ => None,
    }
}
