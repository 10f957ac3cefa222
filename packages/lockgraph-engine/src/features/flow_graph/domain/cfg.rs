//! Control-flow graph model
//!
//! One [`ThreadCfg`] per thread entry function, bundled into a [`Program`]
//! with the global symbol table. Nodes are program points; edges carry the
//! statement executed when control moves along them. The statement and
//! expression vocabulary is exactly what the analyses consume: assignment,
//! branch assumption, lock/unlock, thread creation, assertion checks.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use crate::errors::{LockgraphError, Result};
use crate::shared::models::{CheckId, GlobalId, LockId, ProgramPoint, ThreadId, VarId};

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    /// Logical negation (C `!`)
    Not,
    /// Arithmetic negation
    Neg,
}

/// Binary operators (arithmetic and comparison)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Side-effect-free expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Const(i64),
    Local(VarId),
    Global(GlobalId),
    /// Unconstrained external input (`rand()`, uninitialized reads)
    Nondet,
    Unary(UnOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn local(name: impl Into<String>) -> Self {
        Expr::Local(VarId::new(name))
    }

    pub fn global(name: impl Into<String>) -> Self {
        Expr::Global(GlobalId::new(name))
    }

    pub fn constant(v: i64) -> Self {
        Expr::Const(v)
    }

    pub fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary(op, Box::new(lhs), Box::new(rhs))
    }

    pub fn add(lhs: Expr, rhs: Expr) -> Self {
        Self::binary(BinOp::Add, lhs, rhs)
    }

    pub fn le(lhs: Expr, rhs: Expr) -> Self {
        Self::binary(BinOp::Le, lhs, rhs)
    }

    pub fn lt(lhs: Expr, rhs: Expr) -> Self {
        Self::binary(BinOp::Lt, lhs, rhs)
    }

    pub fn equals(lhs: Expr, rhs: Expr) -> Self {
        Self::binary(BinOp::Eq, lhs, rhs)
    }

    pub fn not(inner: Expr) -> Self {
        Expr::Unary(UnOp::Not, Box::new(inner))
    }

    /// Logical negation with comparison flipping, so both branch edges of
    /// a condition refine well
    pub fn negated(&self) -> Expr {
        match self {
            Expr::Binary(op, lhs, rhs) => {
                let flipped = match op {
                    BinOp::Eq => Some(BinOp::Ne),
                    BinOp::Ne => Some(BinOp::Eq),
                    BinOp::Lt => Some(BinOp::Ge),
                    BinOp::Le => Some(BinOp::Gt),
                    BinOp::Gt => Some(BinOp::Le),
                    BinOp::Ge => Some(BinOp::Lt),
                    _ => None,
                };
                match flipped {
                    Some(op) => Expr::Binary(op, lhs.clone(), rhs.clone()),
                    None => Expr::not(self.clone()),
                }
            }
            Expr::Unary(UnOp::Not, inner) => (**inner).clone(),
            other => Expr::not(other.clone()),
        }
    }
}

/// Assignment target
#[derive(Debug, Clone, PartialEq)]
pub enum Place {
    Local(VarId),
    Global(GlobalId),
}

/// Statement attached to a CFG edge
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Skip,
    Assign { target: Place, value: Expr },
    /// Branch condition assumed true along this edge
    Assume(Expr),
    Lock(LockId),
    Unlock(LockId),
    /// Create a thread running the named entry function
    Spawn(ThreadId),
    /// Assertion-like check point, verdicted but never executed
    Check { id: CheckId, cond: Expr },
}

/// Edge classification, as delivered by the front end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    Sequential,
    TrueBranch,
    FalseBranch,
    LoopBack,
    LoopExit,
}

/// CFG edge: a statement plus its classification
#[derive(Debug, Clone)]
pub struct CfgEdge {
    pub stmt: Stmt,
    pub kind: EdgeKind,
}

impl CfgEdge {
    pub fn new(stmt: Stmt) -> Self {
        Self {
            stmt,
            kind: EdgeKind::Sequential,
        }
    }

    pub fn with_kind(stmt: Stmt, kind: EdgeKind) -> Self {
        Self { stmt, kind }
    }
}

/// Control-flow graph of one thread entry function
#[derive(Debug, Clone)]
pub struct ThreadCfg {
    pub thread: ThreadId,
    pub graph: DiGraph<ProgramPoint, CfgEdge>,
    pub entry: NodeIndex,
}

impl ThreadCfg {
    pub fn point(&self, node: NodeIndex) -> &ProgramPoint {
        &self.graph[node]
    }

    pub fn successors(&self, node: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.neighbors_directed(node, Direction::Outgoing)
    }
}

/// Whole analyzed program: all thread CFGs plus the global symbol table
///
/// `threads[0]` is the program entry (`main`). Vec keeps thread order, and
/// therefore every solver run, deterministic.
#[derive(Debug, Clone)]
pub struct Program {
    pub threads: Vec<ThreadCfg>,
    /// Globals with their initial values (zero-initialized in C)
    pub globals: Vec<(GlobalId, i64)>,
}

impl Program {
    pub fn main(&self) -> &ThreadCfg {
        &self.threads[0]
    }

    pub fn thread_index(&self, id: &ThreadId) -> Option<usize> {
        self.threads.iter().position(|t| &t.thread == id)
    }

    pub fn initial_value(&self, global: &GlobalId) -> Option<i64> {
        self.globals
            .iter()
            .find(|(g, _)| g == global)
            .map(|(_, v)| *v)
    }

    /// Every lock mentioned anywhere in the program
    ///
    /// This is the "all locks" top the protection map starts from.
    pub fn lock_universe(&self) -> Vec<LockId> {
        let mut locks: Vec<LockId> = Vec::new();
        for cfg in &self.threads {
            for edge in cfg.graph.edge_weights() {
                if let Stmt::Lock(l) | Stmt::Unlock(l) = &edge.stmt {
                    if !locks.contains(l) {
                        locks.push(l.clone());
                    }
                }
            }
        }
        locks.sort();
        locks
    }

    /// Structural sanity: a program entry exists, spawn targets resolve,
    /// thread names are unique
    pub fn validate(&self) -> Result<()> {
        if self.threads.is_empty() {
            return Err(LockgraphError::malformed_cfg("program has no threads"));
        }
        for (i, a) in self.threads.iter().enumerate() {
            for b in &self.threads[i + 1..] {
                if a.thread == b.thread {
                    return Err(LockgraphError::malformed_cfg(format!(
                        "duplicate thread entry '{}'",
                        a.thread
                    )));
                }
            }
        }
        for cfg in &self.threads {
            for edge in cfg.graph.edge_weights() {
                if let Stmt::Spawn(target) = &edge.stmt {
                    if self.thread_index(target).is_none() {
                        return Err(LockgraphError::malformed_cfg(format!(
                            "spawn of unknown thread '{}' in '{}'",
                            target, cfg.thread
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::flow_graph::infrastructure::builder::{CfgBuilder, ProgramBuilder};

    #[test]
    fn test_negated_flips_comparisons() {
        let cond = Expr::le(Expr::local("i"), Expr::constant(5));
        match cond.negated() {
            Expr::Binary(BinOp::Gt, _, _) => {}
            other => panic!("expected Gt, got {:?}", other),
        }
    }

    #[test]
    fn test_negated_not_cancels() {
        let g = Expr::global("g");
        assert_eq!(Expr::not(g.clone()).negated(), g);
    }

    #[test]
    fn test_lock_universe_sorted_unique() {
        let mut b = CfgBuilder::new("main");
        let entry = b.entry();
        let n1 = b.seq(entry, Stmt::Lock(LockId::new("B")));
        let n2 = b.seq(n1, Stmt::Unlock(LockId::new("B")));
        let n3 = b.seq(n2, Stmt::Lock(LockId::new("A")));
        b.seq(n3, Stmt::Unlock(LockId::new("A")));
        let program = ProgramBuilder::new().thread(b.build()).build().unwrap();
        let locks = program.lock_universe();
        assert_eq!(locks, vec![LockId::new("A"), LockId::new("B")]);
    }

    #[test]
    fn test_validate_rejects_unknown_spawn_target() {
        let mut b = CfgBuilder::new("main");
        let entry = b.entry();
        b.seq(entry, Stmt::Spawn(ThreadId::new("ghost")));
        let err = ProgramBuilder::new().thread(b.build()).build();
        assert!(err.is_err());
    }
}
