//! Domain models for the termination oracle

pub mod verdict;

pub use verdict::{LoopReport, LoopVerdict};
