//! Shared domain models
//!
//! Identity types used across every feature:
//! - [`VarId`], [`GlobalId`], [`LockId`], [`ThreadId`], [`CheckId`]
//! - [`ProgramPoint`]: structural identity of a CFG node

pub mod ids;
pub mod point;

pub use ids::{CheckId, GlobalId, LockId, ThreadId, VarId};
pub use point::ProgramPoint;
