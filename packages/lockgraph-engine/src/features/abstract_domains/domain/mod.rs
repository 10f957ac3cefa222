//! Domain models for the abstract domain library

pub mod interval;
pub mod lattice;
pub mod lockset;
pub mod value;

pub use interval::{Bound, Interval};
pub use lattice::Lattice;
pub use lockset::LockSet;
pub use value::DomainValue;
