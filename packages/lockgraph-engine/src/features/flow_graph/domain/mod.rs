//! Domain models for the CFG

pub mod cfg;
pub mod loops;

pub use cfg::{BinOp, CfgEdge, EdgeKind, Expr, Place, Program, Stmt, ThreadCfg, UnOp};
pub use loops::{find_loops, LoopDescriptor};
