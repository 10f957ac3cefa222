/*
 * Lockgraph Engine - Thread-Modular Abstract Interpretation
 *
 * Analyzes the control-flow graphs of a concurrent program without
 * enumerating interleavings:
 * - shared/    : Common models (identifiers, program points)
 * - features/  : Vertical slices (domains → flow graph → lockset →
 *                protection → solver → termination)
 * - config/    : Analysis activation and precision flags
 *
 * The engine consumes one CFG per thread entry from a front end and emits
 * three-valued verdicts for assertion checks and termination verdicts for
 * loops. Soundness discipline: facts that must hold on every interleaving
 * (held locks, protected-global refinements) join by intersection; facts
 * that may hold on some interleaving (value ranges) join by union.
 */

#![allow(clippy::new_without_default)] // Default impl not always needed
#![allow(clippy::collapsible_if)] // Readability over brevity
#![allow(clippy::module_inception)] // Module naming intentional
#![allow(clippy::should_implement_trait)] // add/sub/not are domain transfer ops

/// Shared models and utilities
pub mod shared;

/// Feature modules (domains → graph → trackers → solver → oracle)
pub mod features;

/// Configuration system
pub mod config;

/// Error types
pub mod errors;

// Re-exports for public API
pub use config::{AnalysisConfig, AnalysisKind};
pub use errors::{LockgraphError, Result};
pub use features::abstract_domains::{DomainValue, Interval, Lattice, LockSet};
pub use features::flow_graph::{
    BinOp, CfgBuilder, Expr, Place, Program, ProgramBuilder, Stmt, ThreadCfg,
};
pub use features::solver::{AnalysisReport, AnalysisService, CheckVerdict};
pub use features::termination::LoopVerdict;
pub use shared::models::{CheckId, GlobalId, LockId, ThreadId, VarId};
