//! Domain models for the solver

pub mod state;
pub mod verdict;

pub use state::AbstractState;
pub use verdict::{CheckReport, CheckVerdict};
