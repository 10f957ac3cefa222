//! Feature modules
//!
//! Vertical slices, leaves first:
//! - `abstract_domains`: lattices (intervals, locksets, products)
//! - `flow_graph`: CFG model consumed from the front end
//! - `lockset`: per-thread held-lock tracking
//! - `protection`: global → protecting-lockset map and read refinement
//! - `solver`: thread-modular worklist fixpoint
//! - `termination`: loop termination oracle on the solver's states

pub mod abstract_domains;
pub mod flow_graph;
pub mod lockset;
pub mod protection;
pub mod solver;
pub mod termination;
