//! # Protected-Global Refinement
//!
//! Combines lockset facts with a per-global "protection map" to let reads
//! of a global trust flow-sensitive information when every lock observed
//! to protect the global is currently held:
//! - `domain/protection_map.rs`: which locks are held at EVERY write to
//!   each global (least fixpoint over a value-blind lockset run)
//! - `infrastructure/refinement.rs`: when a reader may privatize and when
//!   privatized copies must be given up

pub mod domain;
pub mod infrastructure;

pub use domain::protection_map::ProtectionMap;
pub use infrastructure::refinement::ProtectionRefiner;
