//! Infrastructure layer for the lockset feature

pub mod tracker;

pub use tracker::{LockDiagnostics, LocksetTracker};
