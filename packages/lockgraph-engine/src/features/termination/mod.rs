//! # Termination Oracle
//!
//! A derived analysis riding on the solver's converged states: for each
//! loop descriptor it searches for a progress measure — a counter moved
//! by a strict constant step on every path through the body, bounded in
//! the step's direction by the loop guard or the header's interval.
//! Sound and incomplete by design: anything else is `Unknown`, never a
//! false `Terminating`.

pub mod domain;
pub mod infrastructure;

pub use domain::verdict::{LoopReport, LoopVerdict};
pub use infrastructure::oracle::TerminationOracle;
