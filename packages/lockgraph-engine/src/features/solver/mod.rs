//! # Thread-Modular Fixpoint Solver
//!
//! Iterates abstract transfer functions over every thread's CFG until a
//! post-fixpoint, modeling unboundedly many interleavings without ever
//! enumerating them:
//! - `domain/`: the per-point abstract state and check verdicts
//! - `infrastructure/`: the global store, edge transfer functions and the
//!   worklist iteration (ascending with widening, then descending with
//!   narrowing)
//! - `application/`: the use-case service assembling verdict reports
//!
//! The solver exclusively owns the map from program points to abstract
//! states; every other component receives read-only views and returns
//! deltas.

pub mod application;
pub mod domain;
pub mod infrastructure;

// Re-exports for public API
pub use application::analyze::AnalysisService;
pub use application::report::{AnalysisReport, GlobalReport, ReportDiagnostics};
pub use domain::state::AbstractState;
pub use domain::verdict::{CheckReport, CheckVerdict};
pub use infrastructure::worklist::{SolveOutcome, SolverConfig, SolverStats, ThreadModularSolver};
