//! Infrastructure layer for the CFG feature

pub mod builder;

pub use builder::{CfgBuilder, ProgramBuilder};
