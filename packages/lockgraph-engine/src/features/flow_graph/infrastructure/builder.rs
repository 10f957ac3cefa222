//! CFG construction
//!
//! The fluent builders the front-end adapter (and every test in this
//! repository) uses to assemble well-formed graphs. Nodes receive
//! structural program points in creation order; edges default to
//! `Sequential` unless a branch/loop helper is used.

use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};

use crate::errors::Result;
use crate::features::flow_graph::domain::cfg::{
    CfgEdge, EdgeKind, Expr, Program, Stmt, ThreadCfg,
};
use crate::shared::models::{GlobalId, ProgramPoint, ThreadId};

/// Builder for one thread's CFG
pub struct CfgBuilder {
    thread: ThreadId,
    graph: DiGraph<ProgramPoint, CfgEdge>,
    entry: NodeIndex,
    next_index: u32,
}

impl CfgBuilder {
    /// Create a builder whose entry node is already allocated
    pub fn new(thread: impl Into<String>) -> Self {
        let thread = ThreadId::new(thread);
        let mut graph = DiGraph::new();
        let entry = graph.add_node(ProgramPoint::new(thread.as_str(), 0));
        Self {
            thread,
            graph,
            entry,
            next_index: 1,
        }
    }

    pub fn entry(&self) -> NodeIndex {
        self.entry
    }

    /// Allocate a fresh program point
    pub fn node(&mut self) -> NodeIndex {
        let point = ProgramPoint::new(self.thread.as_str(), self.next_index);
        self.next_index += 1;
        self.graph.add_node(point)
    }

    /// Connect two existing nodes with a sequential edge
    pub fn edge(&mut self, from: NodeIndex, to: NodeIndex, stmt: Stmt) -> EdgeIndex {
        self.graph.add_edge(from, to, CfgEdge::new(stmt))
    }

    pub fn edge_kind(
        &mut self,
        from: NodeIndex,
        to: NodeIndex,
        stmt: Stmt,
        kind: EdgeKind,
    ) -> EdgeIndex {
        self.graph.add_edge(from, to, CfgEdge::with_kind(stmt, kind))
    }

    /// Append a statement after `from`, returning the new node
    pub fn seq(&mut self, from: NodeIndex, stmt: Stmt) -> NodeIndex {
        let to = self.node();
        self.edge(from, to, stmt);
        to
    }

    /// Fork on a condition: returns the (true, false) successor nodes,
    /// reached over `Assume(cond)` / `Assume(¬cond)` edges
    pub fn branch(&mut self, from: NodeIndex, cond: Expr) -> (NodeIndex, NodeIndex) {
        let then_node = self.node();
        let else_node = self.node();
        self.edge_kind(
            from,
            then_node,
            Stmt::Assume(cond.clone()),
            EdgeKind::TrueBranch,
        );
        self.edge_kind(
            from,
            else_node,
            Stmt::Assume(cond.negated()),
            EdgeKind::FalseBranch,
        );
        (then_node, else_node)
    }

    pub fn build(self) -> ThreadCfg {
        ThreadCfg {
            thread: self.thread,
            graph: self.graph,
            entry: self.entry,
        }
    }
}

/// Builder for a whole program
///
/// The first thread added is the program entry. Globals default to the C
/// initial value 0.
pub struct ProgramBuilder {
    threads: Vec<ThreadCfg>,
    globals: Vec<(GlobalId, i64)>,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self {
            threads: Vec::new(),
            globals: Vec::new(),
        }
    }

    pub fn global(mut self, name: impl Into<String>) -> Self {
        self.globals.push((GlobalId::new(name), 0));
        self
    }

    pub fn global_with_init(mut self, name: impl Into<String>, init: i64) -> Self {
        self.globals.push((GlobalId::new(name), init));
        self
    }

    pub fn thread(mut self, cfg: ThreadCfg) -> Self {
        self.threads.push(cfg);
        self
    }

    /// Validate and produce the program
    pub fn build(self) -> Result<Program> {
        let program = Program {
            threads: self.threads,
            globals: self.globals,
        };
        program.validate()?;
        Ok(program)
    }
}

impl Default for ProgramBuilder {
    fn default() -> Self {
        Self::new()
    }
}
