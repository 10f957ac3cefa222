//! Tagged domain values
//!
//! Heterogeneous abstract values cross component boundaries as one closed
//! variant rather than an open trait object: new domains are added as new
//! cases plus their operation implementations. The reporting surface uses
//! `Pair` to export a global's value together with its protecting lockset
//! (the interval × lockset product of the data model).

use serde::{Deserialize, Serialize};
use std::fmt;

use super::interval::Interval;
use super::lattice::Lattice;
use super::lockset::LockSet;

/// Closed union of the engine's abstract domains
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DomainValue {
    /// Numeric range
    Interval(Interval),
    /// Definitely-held locks
    Locks(LockSet),
    /// Global-variable view: value range × protecting locks
    Pair(Interval, LockSet),
}

impl DomainValue {
    /// Numeric component, if this value carries one
    pub fn as_interval(&self) -> Option<&Interval> {
        match self {
            DomainValue::Interval(i) | DomainValue::Pair(i, _) => Some(i),
            DomainValue::Locks(_) => None,
        }
    }

    pub fn as_locks(&self) -> Option<&LockSet> {
        match self {
            DomainValue::Locks(l) | DomainValue::Pair(_, l) => Some(l),
            DomainValue::Interval(_) => None,
        }
    }

    /// Apply a lattice operation pointwise; mismatched variants fall back
    /// to the given default (callers pick top-for-join, bottom-for-meet)
    fn zip(
        &self,
        other: &Self,
        iv: impl Fn(&Interval, &Interval) -> Interval,
        ls: impl Fn(&LockSet, &LockSet) -> LockSet,
    ) -> Option<Self> {
        match (self, other) {
            (DomainValue::Interval(a), DomainValue::Interval(b)) => {
                Some(DomainValue::Interval(iv(a, b)))
            }
            (DomainValue::Locks(a), DomainValue::Locks(b)) => Some(DomainValue::Locks(ls(a, b))),
            (DomainValue::Pair(ai, al), DomainValue::Pair(bi, bl)) => {
                Some(DomainValue::Pair(iv(ai, bi), ls(al, bl)))
            }
            _ => None,
        }
    }
}

impl Lattice for DomainValue {
    fn bottom() -> Self {
        DomainValue::Interval(Interval::bottom())
    }

    fn is_bottom(&self) -> bool {
        match self {
            DomainValue::Interval(i) => i.is_bottom(),
            DomainValue::Locks(l) => l.is_bottom(),
            DomainValue::Pair(i, l) => i.is_bottom() && l.is_bottom(),
        }
    }

    fn leq(&self, other: &Self) -> bool {
        match (self, other) {
            (DomainValue::Interval(a), DomainValue::Interval(b)) => a.leq(b),
            (DomainValue::Locks(a), DomainValue::Locks(b)) => a.leq(b),
            (DomainValue::Pair(ai, al), DomainValue::Pair(bi, bl)) => ai.leq(bi) && al.leq(bl),
            // Mismatched variants are unordered (except via bottom)
            _ => self.is_bottom(),
        }
    }

    fn join(&self, other: &Self) -> Self {
        if self.is_bottom() {
            return other.clone();
        }
        if other.is_bottom() {
            return self.clone();
        }
        self.zip(other, |a, b| a.join(b), |a, b| a.join(b))
            .unwrap_or(DomainValue::Interval(Interval::top()))
    }

    fn meet(&self, other: &Self) -> Self {
        self.zip(other, |a, b| a.meet(b), |a, b| a.meet(b))
            .unwrap_or_else(Self::bottom)
    }

    fn widen(&self, other: &Self) -> Self {
        if self.is_bottom() {
            return other.clone();
        }
        self.zip(other, |a, b| a.widen(b), |a, b| a.widen(b))
            .unwrap_or(DomainValue::Interval(Interval::top()))
    }

    fn narrow(&self, other: &Self) -> Self {
        self.zip(other, |a, b| a.narrow(b), |a, b| a.narrow(b))
            .unwrap_or_else(|| self.clone())
    }
}

impl fmt::Display for DomainValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainValue::Interval(i) => write!(f, "{}", i),
            DomainValue::Locks(l) => write!(f, "{}", l),
            DomainValue::Pair(i, l) => write!(f, "({} protected by {})", i, l),
        }
    }
}
