//! # Abstract Domain Library
//!
//! Lattice domains used by the fixpoint solver:
//! - **Interval**: value ranges over ℤ ∪ {-∞, +∞} with widening/narrowing
//! - **LockSet**: definitely-held locks; join is set INTERSECTION
//! - **DomainValue**: closed tagged variant over the above (and their
//!   product), exposing one lattice-operation surface
//!
//! The key asymmetry lives here: ordinary value domains join upward by
//! union, while "definitely held" lock facts join by intersection, because
//! a held-lock claim must survive every merging path.

pub mod domain;

// Re-exports for public API
pub use domain::interval::{Bound, Interval};
pub use domain::lattice::Lattice;
pub use domain::lockset::LockSet;
pub use domain::value::DomainValue;
