//! # Lockset Tracker
//!
//! Per-thread tracking of which mutexes are provably held. Lock and
//! unlock are pure abstract-state transformers; the analyzer never blocks
//! on the analyzed program's synchronization. Abstract-model
//! inconsistencies (re-acquiring a held lock, releasing a never-held one)
//! are diagnostics, not failures: the lockset is left unchanged and the
//! analysis continues.

pub mod infrastructure;

pub use infrastructure::tracker::{LockDiagnostics, LocksetTracker};
