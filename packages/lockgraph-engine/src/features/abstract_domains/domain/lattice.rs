//! Lattice operation contract
//!
//! Every domain the solver iterates over implements [`Lattice`]. The
//! operator contracts are what make the fixpoint terminate and stay sound:
//!
//! - `leq` is a partial order; `join` is its least upper bound, `meet` its
//!   greatest lower bound.
//! - `widen(prev, next)` over-approximates `join(prev, next)` and, applied
//!   along any ascending chain, reaches a stable value in finitely many
//!   steps. Convergence follows from this contract, not from an iteration
//!   cap (the solver's cap is only a safety valve).
//! - `narrow(prev, next)` takes `next ⊑ prev` and returns a value between
//!   them, recovering precision lost to widening.

/// Uniform lattice-operation interface
///
/// Finite-height domains may keep the default `widen` (plain join) and
/// `narrow` (keep the descending value).
pub trait Lattice: Clone + PartialEq {
    /// Bottom element (empty set / unreachable)
    fn bottom() -> Self;

    /// Is this the bottom element?
    fn is_bottom(&self) -> bool;

    /// Partial order: self ⊑ other
    fn leq(&self, other: &Self) -> bool;

    /// Join (least upper bound): self ⊔ other
    fn join(&self, other: &Self) -> Self;

    /// Meet (greatest lower bound): self ⊓ other
    fn meet(&self, other: &Self) -> Self;

    /// Widening: self ∇ other (other is the newer iterate)
    fn widen(&self, other: &Self) -> Self {
        self.join(other)
    }

    /// Narrowing: self Δ other (other is the newer, smaller iterate)
    fn narrow(&self, other: &Self) -> Self {
        let _ = other;
        self.clone()
    }
}
