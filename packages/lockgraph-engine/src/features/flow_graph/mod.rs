//! # Control-Flow Graph Model
//!
//! The engine does not parse C; a front end hands it one CFG per thread
//! entry plus a global symbol table, and this feature is the thin adapter
//! that represents them:
//! - `domain/cfg.rs`: program points, typed edge statements, expressions
//! - `domain/loops.rs`: back-edge discovery and loop descriptors
//! - `infrastructure/builder.rs`: fluent construction (front ends, tests)
//! - `ports/`: the interface a front end implements

pub mod domain;
pub mod infrastructure;
pub mod ports;

// Re-exports for public API
pub use domain::cfg::{BinOp, CfgEdge, EdgeKind, Expr, Place, Program, Stmt, ThreadCfg, UnOp};
pub use domain::loops::{find_loops, LoopDescriptor};
pub use infrastructure::builder::{CfgBuilder, ProgramBuilder};
