//! Loop discovery
//!
//! Back edges are found by depth-first search (an edge into a node still
//! on the DFS stack); each back edge yields a [`LoopDescriptor`] whose
//! body is the natural loop: the header plus every node that reaches the
//! back-edge source without passing through the header. Descriptors are
//! discovered during CFG traversal and later annotated with a termination
//! verdict by the oracle.

use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use rustc_hash::FxHashSet;

use super::cfg::ThreadCfg;
use crate::shared::models::{ProgramPoint, ThreadId};

/// One back edge and the natural loop around it
#[derive(Debug, Clone)]
pub struct LoopDescriptor {
    pub thread: ThreadId,
    /// Loop header (back-edge target)
    pub header: NodeIndex,
    /// Back-edge source
    pub latch: NodeIndex,
    pub back_edge: EdgeIndex,
    /// Natural loop body, header included
    pub body: FxHashSet<NodeIndex>,
    /// Header program point, for reports
    pub location: ProgramPoint,
}

/// Find every loop of one thread's CFG
pub fn find_loops(cfg: &ThreadCfg) -> Vec<LoopDescriptor> {
    let back_edges = find_back_edges(cfg);
    let mut loops: Vec<LoopDescriptor> = back_edges
        .into_iter()
        .map(|edge| {
            let (latch, header) = cfg
                .graph
                .edge_endpoints(edge)
                .expect("back edge endpoints");
            LoopDescriptor {
                thread: cfg.thread.clone(),
                header,
                latch,
                back_edge: edge,
                body: natural_loop(cfg, header, latch),
                location: cfg.point(header).clone(),
            }
        })
        .collect();
    // Deterministic report order: by header position
    loops.sort_by_key(|l| (l.location.index, l.latch.index()));
    loops
}

/// DFS back-edge detection (edge whose target is on the active stack)
fn find_back_edges(cfg: &ThreadCfg) -> Vec<EdgeIndex> {
    #[derive(Clone, Copy, PartialEq)]
    enum Color {
        White,
        Grey,
        Black,
    }

    let mut color = vec![Color::White; cfg.graph.node_count()];
    let mut back = Vec::new();

    // Explicit stack: (node, outgoing edge iterator state)
    let mut stack: Vec<(NodeIndex, Vec<EdgeIndex>)> = Vec::new();
    let out_edges = |n: NodeIndex| {
        let mut es: Vec<EdgeIndex> = cfg
            .graph
            .edges_directed(n, Direction::Outgoing)
            .map(|e| e.id())
            .collect();
        es.sort_by_key(|e| e.index());
        es
    };

    color[cfg.entry.index()] = Color::Grey;
    stack.push((cfg.entry, out_edges(cfg.entry)));

    while let Some((node, edges)) = stack.last_mut() {
        match edges.pop() {
            Some(edge) => {
                let target = cfg.graph.edge_endpoints(edge).expect("edge endpoints").1;
                match color[target.index()] {
                    Color::Grey => back.push(edge),
                    Color::White => {
                        color[target.index()] = Color::Grey;
                        stack.push((target, out_edges(target)));
                    }
                    Color::Black => {}
                }
            }
            None => {
                color[node.index()] = Color::Black;
                stack.pop();
            }
        }
    }

    back.sort_by_key(|e| e.index());
    back
}

/// Natural loop of `header`/`latch`: reverse reachability from the latch,
/// stopping at the header
fn natural_loop(cfg: &ThreadCfg, header: NodeIndex, latch: NodeIndex) -> FxHashSet<NodeIndex> {
    let mut body = FxHashSet::default();
    body.insert(header);
    body.insert(latch);

    let mut stack = vec![latch];
    while let Some(node) = stack.pop() {
        if node == header {
            continue;
        }
        for pred in cfg.graph.neighbors_directed(node, Direction::Incoming) {
            if body.insert(pred) {
                stack.push(pred);
            }
        }
    }
    body
}
