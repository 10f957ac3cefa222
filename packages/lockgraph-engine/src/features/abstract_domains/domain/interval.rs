/*
 * Interval Domain over Extended Integers
 *
 * Maps each variable to an interval [lo, hi] ⊆ ℤ ∪ {-∞, +∞}.
 *
 * Lattice structure:
 * - ⊥ (bottom) = empty interval (lo > hi), ⊤ (top) = [-∞, +∞]
 * - Join:   [l₁,u₁] ⊔ [l₂,u₂] = [min(l₁,l₂), max(u₁,u₂)]
 * - Meet:   [l₁,u₁] ⊓ [l₂,u₂] = [max(l₁,l₂), min(u₁,u₂)]
 * - Widen:  [l₁,u₁] ∇ [l₂,u₂] = [l₂ < l₁ ? -∞ : l₁, u₂ > u₁ ? +∞ : u₁]
 * - Narrow: [l₁,u₁] Δ [l₂,u₂] = [l₁ = -∞ ? l₂ : l₁, u₁ = +∞ ? u₂ : u₁]
 *
 * Arithmetic transfer functions are sound over-approximations: addition
 * widens bounds additively, division by an interval containing zero
 * returns top for that branch.
 *
 * References:
 * - Cousot & Cousot (1977): "Abstract Interpretation: A Unified Lattice
 *   Model for Static Analysis of Programs"
 */

use serde::{Deserialize, Serialize};
use std::fmt;

use super::lattice::Lattice;

// ============================================================================
// Extended integer bounds
// ============================================================================

/// Extended integer: ℤ ∪ {-∞, +∞}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Bound {
    NegInf,
    Finite(i64),
    PosInf,
}

impl Bound {
    pub fn is_finite(self) -> bool {
        matches!(self, Bound::Finite(_))
    }

    pub fn finite(self) -> Option<i64> {
        match self {
            Bound::Finite(v) => Some(v),
            _ => None,
        }
    }

    /// Saturating addition; -∞ + +∞ never occurs on interval bounds of the
    /// same side, but is pinned to the side of `self` for totality
    fn add(self, other: Bound) -> Bound {
        match (self, other) {
            (Bound::NegInf, Bound::PosInf) | (Bound::PosInf, Bound::NegInf) => self,
            (Bound::NegInf, _) | (_, Bound::NegInf) => Bound::NegInf,
            (Bound::PosInf, _) | (_, Bound::PosInf) => Bound::PosInf,
            (Bound::Finite(a), Bound::Finite(b)) => match a.checked_add(b) {
                Some(v) => Bound::Finite(v),
                None if a > 0 => Bound::PosInf,
                None => Bound::NegInf,
            },
        }
    }

    fn neg(self) -> Bound {
        match self {
            Bound::NegInf => Bound::PosInf,
            Bound::PosInf => Bound::NegInf,
            Bound::Finite(v) => match v.checked_neg() {
                Some(n) => Bound::Finite(n),
                None => Bound::PosInf, // -i64::MIN
            },
        }
    }

    fn mul(self, other: Bound) -> Bound {
        let sign = |b: Bound| match b {
            Bound::NegInf => -1,
            Bound::PosInf => 1,
            Bound::Finite(v) => v.signum(),
        };
        match (self, other) {
            (Bound::Finite(0), _) | (_, Bound::Finite(0)) => Bound::Finite(0),
            (Bound::Finite(a), Bound::Finite(b)) => match a.checked_mul(b) {
                Some(v) => Bound::Finite(v),
                None if (a > 0) == (b > 0) => Bound::PosInf,
                None => Bound::NegInf,
            },
            (a, b) => {
                if sign(a) * sign(b) >= 0 {
                    Bound::PosInf
                } else {
                    Bound::NegInf
                }
            }
        }
    }

    /// Next smaller representable bound (for strict upper limits)
    fn pred(self) -> Bound {
        match self {
            Bound::Finite(v) => match v.checked_sub(1) {
                Some(p) => Bound::Finite(p),
                None => Bound::NegInf,
            },
            b => b,
        }
    }

    /// Next larger representable bound (for strict lower limits)
    fn succ(self) -> Bound {
        match self {
            Bound::Finite(v) => match v.checked_add(1) {
                Some(s) => Bound::Finite(s),
                None => Bound::PosInf,
            },
            b => b,
        }
    }
}

impl PartialOrd for Bound {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Bound {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use std::cmp::Ordering::*;
        match (self, other) {
            (Bound::NegInf, Bound::NegInf) => Equal,
            (Bound::NegInf, _) => Less,
            (_, Bound::NegInf) => Greater,
            (Bound::PosInf, Bound::PosInf) => Equal,
            (Bound::PosInf, _) => Greater,
            (_, Bound::PosInf) => Less,
            (Bound::Finite(a), Bound::Finite(b)) => a.cmp(b),
        }
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::NegInf => write!(f, "-∞"),
            Bound::PosInf => write!(f, "+∞"),
            Bound::Finite(v) => write!(f, "{}", v),
        }
    }
}

// ============================================================================
// Interval
// ============================================================================

/// An interval [lo, hi] over extended integers
///
/// Bottom is represented by lo > hi (canonically `[+∞, -∞]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub lo: Bound,
    pub hi: Bound,
}

impl Interval {
    pub fn new(lo: Bound, hi: Bound) -> Self {
        Self { lo, hi }
    }

    /// Top element: [-∞, +∞]
    pub fn top() -> Self {
        Self {
            lo: Bound::NegInf,
            hi: Bound::PosInf,
        }
    }

    /// Constant interval [c, c]
    pub fn constant(c: i64) -> Self {
        Self {
            lo: Bound::Finite(c),
            hi: Bound::Finite(c),
        }
    }

    /// Bounded interval [lo, hi]
    pub fn range(lo: i64, hi: i64) -> Self {
        Self {
            lo: Bound::Finite(lo),
            hi: Bound::Finite(hi),
        }
    }

    /// (-∞, hi]
    pub fn at_most(hi: Bound) -> Self {
        Self {
            lo: Bound::NegInf,
            hi,
        }
    }

    /// [lo, +∞)
    pub fn at_least(lo: Bound) -> Self {
        Self {
            lo,
            hi: Bound::PosInf,
        }
    }

    pub fn is_top(&self) -> bool {
        self.lo == Bound::NegInf && self.hi == Bound::PosInf
    }

    pub fn contains(&self, v: i64) -> bool {
        let v = Bound::Finite(v);
        self.lo <= v && v <= self.hi
    }

    pub fn contains_zero(&self) -> bool {
        self.contains(0)
    }

    /// The single value of a constant interval, if any
    pub fn as_constant(&self) -> Option<i64> {
        match (self.lo, self.hi) {
            (Bound::Finite(a), Bound::Finite(b)) if a == b => Some(a),
            _ => None,
        }
    }

    // ── Arithmetic transfer functions ───────────────────────────────────

    /// [a,b] + [c,d] = [a+c, b+d]
    pub fn add(&self, other: &Self) -> Self {
        if self.is_bottom() || other.is_bottom() {
            return Self::bottom();
        }
        Self {
            lo: self.lo.add(other.lo),
            hi: self.hi.add(other.hi),
        }
    }

    /// [a,b] - [c,d] = [a-d, b-c]
    pub fn sub(&self, other: &Self) -> Self {
        if self.is_bottom() || other.is_bottom() {
            return Self::bottom();
        }
        Self {
            lo: self.lo.add(other.hi.neg()),
            hi: self.hi.add(other.lo.neg()),
        }
    }

    /// [a,b] * [c,d] = [min(ac,ad,bc,bd), max(ac,ad,bc,bd)]
    pub fn mul(&self, other: &Self) -> Self {
        if self.is_bottom() || other.is_bottom() {
            return Self::bottom();
        }
        let products = [
            self.lo.mul(other.lo),
            self.lo.mul(other.hi),
            self.hi.mul(other.lo),
            self.hi.mul(other.hi),
        ];
        Self {
            lo: *products.iter().min().unwrap(),
            hi: *products.iter().max().unwrap(),
        }
    }

    /// Division; any divisor interval containing zero yields top
    ///
    /// Precision is deliberately coarse: the only soundness-critical case
    /// is 0 ∈ [c,d], and refining nonzero divisors further has no effect
    /// on the analyses built on this domain.
    pub fn div(&self, other: &Self) -> Self {
        if self.is_bottom() || other.is_bottom() {
            return Self::bottom();
        }
        if other.contains_zero() {
            return Self::top();
        }
        match (self.as_constant(), other.as_constant()) {
            (Some(a), Some(b)) => Self::constant(a / b),
            _ => Self::top(),
        }
    }

    pub fn neg(&self) -> Self {
        if self.is_bottom() {
            return Self::bottom();
        }
        Self {
            lo: self.hi.neg(),
            hi: self.lo.neg(),
        }
    }

    // ── Three-valued comparisons (truth intervals) ──────────────────────
    //
    // A comparison evaluates to a sub-interval of [0, 1]:
    // [1,1] definitely true, [0,0] definitely false, [0,1] unknown.

    pub fn cmp_lt(&self, other: &Self) -> Self {
        if self.is_bottom() || other.is_bottom() {
            return Self::bottom();
        }
        if self.hi < other.lo {
            Self::constant(1)
        } else if self.lo >= other.hi {
            Self::constant(0)
        } else {
            Self::range(0, 1)
        }
    }

    pub fn cmp_le(&self, other: &Self) -> Self {
        if self.is_bottom() || other.is_bottom() {
            return Self::bottom();
        }
        if self.hi <= other.lo {
            Self::constant(1)
        } else if self.lo > other.hi {
            Self::constant(0)
        } else {
            Self::range(0, 1)
        }
    }

    pub fn cmp_eq(&self, other: &Self) -> Self {
        if self.is_bottom() || other.is_bottom() {
            return Self::bottom();
        }
        match (self.as_constant(), other.as_constant()) {
            (Some(a), Some(b)) if a == b => Self::constant(1),
            _ if self.meet(other).is_bottom() => Self::constant(0),
            _ => Self::range(0, 1),
        }
    }

    pub fn cmp_ne(&self, other: &Self) -> Self {
        self.cmp_eq(other).logical_not()
    }

    /// Truthiness of a numeric value (C semantics: nonzero is true)
    pub fn truthiness(&self) -> Self {
        if self.is_bottom() {
            return Self::bottom();
        }
        if !self.contains_zero() {
            Self::constant(1)
        } else if self.as_constant() == Some(0) {
            Self::constant(0)
        } else {
            Self::range(0, 1)
        }
    }

    /// Logical negation of a truth interval
    pub fn logical_not(&self) -> Self {
        let t = self.truthiness();
        if t.is_bottom() {
            return Self::bottom();
        }
        match t.as_constant() {
            Some(0) => Self::constant(1),
            Some(_) => Self::constant(0),
            None => Self::range(0, 1),
        }
    }

    // ── Guard refinement ────────────────────────────────────────────────

    /// Refine under the assumption `self < other` (keep values with a
    /// witness in `other`)
    pub fn assume_lt(&self, other: &Self) -> Self {
        self.meet(&Self::at_most(other.hi.pred()))
    }

    pub fn assume_le(&self, other: &Self) -> Self {
        self.meet(&Self::at_most(other.hi))
    }

    pub fn assume_gt(&self, other: &Self) -> Self {
        self.meet(&Self::at_least(other.lo.succ()))
    }

    pub fn assume_ge(&self, other: &Self) -> Self {
        self.meet(&Self::at_least(other.lo))
    }

    pub fn assume_eq(&self, other: &Self) -> Self {
        self.meet(other)
    }

    /// Refine under `self != c`: only endpoint values can be trimmed
    pub fn assume_ne_constant(&self, c: i64) -> Self {
        if self.is_bottom() {
            return *self;
        }
        let mut out = *self;
        if out.lo == Bound::Finite(c) {
            out.lo = out.lo.succ();
        }
        if out.hi == Bound::Finite(c) {
            out.hi = out.hi.pred();
        }
        out
    }

    /// Refine under "self is truthy" (self != 0)
    pub fn assume_truthy(&self) -> Self {
        self.assume_ne_constant(0)
    }

    /// Refine under "self is falsy" (self == 0)
    pub fn assume_falsy(&self) -> Self {
        self.meet(&Self::constant(0))
    }
}

impl Lattice for Interval {
    fn bottom() -> Self {
        Self {
            lo: Bound::PosInf,
            hi: Bound::NegInf,
        }
    }

    fn is_bottom(&self) -> bool {
        self.lo > self.hi
    }

    fn leq(&self, other: &Self) -> bool {
        if self.is_bottom() {
            return true;
        }
        if other.is_bottom() {
            return false;
        }
        other.lo <= self.lo && self.hi <= other.hi
    }

    fn join(&self, other: &Self) -> Self {
        if self.is_bottom() {
            return *other;
        }
        if other.is_bottom() {
            return *self;
        }
        Self {
            lo: self.lo.min(other.lo),
            hi: self.hi.max(other.hi),
        }
    }

    fn meet(&self, other: &Self) -> Self {
        Self {
            lo: self.lo.max(other.lo),
            hi: self.hi.min(other.hi),
        }
    }

    fn widen(&self, other: &Self) -> Self {
        if self.is_bottom() {
            return *other;
        }
        if other.is_bottom() {
            return *self;
        }
        Self {
            lo: if other.lo < self.lo {
                Bound::NegInf
            } else {
                self.lo
            },
            hi: if other.hi > self.hi {
                Bound::PosInf
            } else {
                self.hi
            },
        }
    }

    fn narrow(&self, other: &Self) -> Self {
        if self.is_bottom() || other.is_bottom() {
            return *other;
        }
        Self {
            lo: if self.lo == Bound::NegInf {
                other.lo
            } else {
                self.lo
            },
            hi: if self.hi == Bound::PosInf {
                other.hi
            } else {
                self.hi
            },
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_bottom() {
            write!(f, "⊥")
        } else {
            write!(f, "[{}, {}]", self.lo, self.hi)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_join_covers_both() {
        let a = Interval::range(0, 5);
        let b = Interval::range(3, 10);
        let j = a.join(&b);
        assert_eq!(j, Interval::range(0, 10));
        assert!(a.leq(&j));
        assert!(b.leq(&j));
    }

    #[test]
    fn test_meet_intersects() {
        let a = Interval::range(0, 5);
        let b = Interval::range(3, 10);
        assert_eq!(a.meet(&b), Interval::range(3, 5));
    }

    #[test]
    fn test_meet_disjoint_is_bottom() {
        let a = Interval::range(0, 2);
        let b = Interval::range(5, 9);
        assert!(a.meet(&b).is_bottom());
    }

    #[test]
    fn test_widen_blows_growing_bound() {
        let prev = Interval::range(1, 1);
        let next = Interval::range(1, 2);
        let w = prev.widen(&next);
        assert_eq!(w.lo, Bound::Finite(1));
        assert_eq!(w.hi, Bound::PosInf);
    }

    #[test]
    fn test_narrow_recovers_widened_bound() {
        let widened = Interval::new(Bound::Finite(1), Bound::PosInf);
        let descended = Interval::range(1, 6);
        assert_eq!(widened.narrow(&descended), Interval::range(1, 6));
    }

    #[test]
    fn test_narrow_keeps_finite_bounds() {
        let stable = Interval::range(1, 6);
        let smaller = Interval::range(2, 5);
        // Finite bounds were never widened; narrowing must not touch them.
        assert_eq!(stable.narrow(&smaller), stable);
    }

    #[test]
    fn test_add_shifts_bounds() {
        let a = Interval::range(1, 5);
        let b = Interval::constant(1);
        assert_eq!(a.add(&b), Interval::range(2, 6));
    }

    #[test]
    fn test_sub_crosses_bounds() {
        let a = Interval::range(1, 5);
        let b = Interval::range(0, 2);
        assert_eq!(a.sub(&b), Interval::range(-1, 5));
    }

    #[test]
    fn test_div_by_possible_zero_is_top() {
        let a = Interval::range(10, 20);
        let b = Interval::range(-1, 1);
        assert!(a.div(&b).is_top());
    }

    #[test]
    fn test_div_by_nonzero_constant() {
        let a = Interval::constant(10);
        let b = Interval::constant(2);
        assert_eq!(a.div(&b), Interval::constant(5));
    }

    #[test]
    fn test_cmp_le_definite() {
        let i = Interval::range(1, 5);
        let bound = Interval::constant(5);
        assert_eq!(i.cmp_le(&bound), Interval::constant(1));
        assert_eq!(Interval::constant(6).cmp_le(&bound), Interval::constant(0));
    }

    #[test]
    fn test_truthiness() {
        assert_eq!(Interval::constant(0).truthiness(), Interval::constant(0));
        assert_eq!(Interval::range(1, 9).truthiness(), Interval::constant(1));
        assert_eq!(Interval::range(0, 1).truthiness(), Interval::range(0, 1));
    }

    #[test]
    fn test_assume_truthy_trims_zero_endpoint() {
        let g = Interval::range(0, 1);
        assert_eq!(g.assume_truthy(), Interval::constant(1));
        assert_eq!(g.assume_falsy(), Interval::constant(0));
    }

    #[test]
    fn test_assume_lt_strict() {
        let i = Interval::range(0, 100);
        assert_eq!(i.assume_lt(&Interval::constant(5)), Interval::range(0, 4));
        assert_eq!(i.assume_le(&Interval::constant(5)), Interval::range(0, 5));
    }

    #[test]
    fn test_assume_against_unbounded_rhs_is_noop() {
        let i = Interval::range(0, 10);
        assert_eq!(i.assume_le(&Interval::top()), i);
    }

    #[test]
    fn test_overflow_saturates_to_infinity() {
        let a = Interval::constant(i64::MAX);
        let one = Interval::constant(1);
        let sum = a.add(&one);
        assert_eq!(sum.hi, Bound::PosInf);
        assert!(!sum.is_bottom());
    }

    // ── Lattice laws ────────────────────────────────────────────────────

    fn arb_interval() -> impl Strategy<Value = Interval> {
        (-50i64..50, 0i64..40).prop_map(|(lo, len)| Interval::range(lo, lo + len))
    }

    proptest! {
        #[test]
        fn prop_join_is_upper_bound(a in arb_interval(), b in arb_interval()) {
            let j = a.join(&b);
            prop_assert!(a.leq(&j));
            prop_assert!(b.leq(&j));
        }

        #[test]
        fn prop_meet_is_lower_bound(a in arb_interval(), b in arb_interval()) {
            let m = a.meet(&b);
            prop_assert!(m.leq(&a));
            prop_assert!(m.leq(&b));
        }

        #[test]
        fn prop_join_commutes(a in arb_interval(), b in arb_interval()) {
            prop_assert_eq!(a.join(&b), b.join(&a));
        }

        #[test]
        fn prop_widen_covers_join(a in arb_interval(), b in arb_interval()) {
            prop_assert!(a.join(&b).leq(&a.widen(&b)));
        }

        #[test]
        fn prop_narrow_between(a in arb_interval(), b in arb_interval()) {
            // Contract precondition: b ⊑ a
            let b = a.meet(&b);
            prop_assume!(!b.is_bottom());
            let n = a.narrow(&b);
            prop_assert!(b.leq(&n));
            prop_assert!(n.leq(&a));
        }
    }
}
