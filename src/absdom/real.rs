//! Rational intervals with open/closed endpoints, plus integrality tracking.

use rug::Rational;
use serde::{Deserialize, Serialize};

use std::fmt::{self, Display, Formatter};

use super::Tristate;

/// One endpoint of a rational interval.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Bound {
    Unbounded,
    Closed(Rational),
    Open(Rational),
}

impl Bound {
    pub fn value(&self) -> Option<&Rational> {
        match self {
            Bound::Unbounded => None,
            Bound::Closed(q) | Bound::Open(q) => Some(q),
        }
    }

    fn is_open(&self) -> bool {
        matches!(self, Bound::Open(_))
    }

    fn map(&self, f: impl FnOnce(&Rational) -> Rational) -> Bound {
        match self {
            Bound::Unbounded => Bound::Unbounded,
            Bound::Closed(q) => Bound::Closed(f(q)),
            Bound::Open(q) => Bound::Open(f(q)),
        }
    }

    /// Combine two same-side bounds additively; open infects closed.
    fn add(&self, other: &Bound) -> Bound {
        match (self.value(), other.value()) {
            (Some(a), Some(b)) => {
                let sum = Rational::from(a + b);
                if self.is_open() || other.is_open() {
                    Bound::Open(sum)
                } else {
                    Bound::Closed(sum)
                }
            }
            _ => Bound::Unbounded,
        }
    }

    /// The laxer of two same-side bounds (for join); `lower` picks the side.
    fn laxer(&self, other: &Bound, lower: bool) -> Bound {
        match (self.value(), other.value()) {
            (None, _) | (_, None) => Bound::Unbounded,
            (Some(a), Some(b)) => {
                if a == b {
                    if self.is_open() && other.is_open() {
                        Bound::Open(a.clone())
                    } else {
                        Bound::Closed(a.clone())
                    }
                } else if (a < b) == lower {
                    self.clone()
                } else {
                    other.clone()
                }
            }
        }
    }
}

/// A rational interval; `lo`/`hi` may be open, closed, or missing.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct RealRange {
    pub lo: Bound,
    pub hi: Bound,
}

impl RealRange {
    pub fn top() -> RealRange {
        RealRange {
            lo: Bound::Unbounded,
            hi: Bound::Unbounded,
        }
    }

    pub fn singleton(q: Rational) -> RealRange {
        RealRange {
            lo: Bound::Closed(q.clone()),
            hi: Bound::Closed(q),
        }
    }

    pub fn as_singleton(&self) -> Option<&Rational> {
        match (&self.lo, &self.hi) {
            (Bound::Closed(a), Bound::Closed(b)) if a == b => Some(a),
            _ => None,
        }
    }

    pub fn join(&self, other: &RealRange) -> RealRange {
        RealRange {
            lo: self.lo.laxer(&other.lo, true),
            hi: self.hi.laxer(&other.hi, false),
        }
    }

    pub fn overlaps(&self, other: &RealRange) -> bool {
        fn separated(hi: &Bound, lo: &Bound) -> bool {
            match (hi.value(), lo.value()) {
                (Some(h), Some(l)) => h < l || (h == l && (hi.is_open() || lo.is_open())),
                _ => false,
            }
        }
        !separated(&self.hi, &other.lo) && !separated(&other.hi, &self.lo)
    }

    pub fn check_eq(&self, other: &RealRange) -> Tristate {
        match (self.as_singleton(), other.as_singleton()) {
            (Some(a), Some(b)) if a == b => Tristate::True,
            _ if !self.overlaps(other) => Tristate::False,
            _ => Tristate::Unknown,
        }
    }

    /// `self ≤ other` from the endpoints.
    pub fn check_le(&self, other: &RealRange) -> Tristate {
        if let (Some(h), Some(l)) = (self.hi.value(), other.lo.value()) {
            if h <= l {
                return Tristate::True;
            }
        }
        if let (Some(l), Some(h)) = (self.lo.value(), other.hi.value()) {
            if l > h || (l == h && (self.lo.is_open() || other.hi.is_open())) {
                return Tristate::False;
            }
        }
        Tristate::Unknown
    }

    pub fn check_lt(&self, other: &RealRange) -> Tristate {
        if let (Some(h), Some(l)) = (self.hi.value(), other.lo.value()) {
            if h < l || (h == l && (self.hi.is_open() || other.lo.is_open())) {
                return Tristate::True;
            }
        }
        if let (Some(l), Some(h)) = (self.lo.value(), other.hi.value()) {
            if l >= h {
                return Tristate::False;
            }
        }
        Tristate::Unknown
    }

    pub fn add(&self, other: &RealRange) -> RealRange {
        RealRange {
            lo: self.lo.add(&other.lo),
            hi: self.hi.add(&other.hi),
        }
    }

    pub fn neg(&self) -> RealRange {
        RealRange {
            lo: self.hi.map(|q| Rational::from(-q)),
            hi: self.lo.map(|q| Rational::from(-q)),
        }
    }

    pub fn scale(&self, c: &Rational) -> RealRange {
        if *c == 0 {
            return RealRange::singleton(Rational::new());
        }
        let lo = self.lo.map(|q| Rational::from(q * c));
        let hi = self.hi.map(|q| Rational::from(q * c));
        if *c > 0 {
            RealRange { lo, hi }
        } else {
            RealRange { lo: hi, hi: lo }
        }
    }

    /// Corner multiplication. Endpoints are emitted closed (a sound
    /// relaxation), except when one side is a singleton, which scales
    /// exactly.
    pub fn mul(&self, other: &RealRange) -> RealRange {
        if let Some(c) = self.as_singleton() {
            return other.scale(c);
        }
        if let Some(c) = other.as_singleton() {
            return self.scale(c);
        }
        match (
            self.lo.value(),
            self.hi.value(),
            other.lo.value(),
            other.hi.value(),
        ) {
            (Some(a), Some(b), Some(c), Some(d)) => {
                let corners = [
                    Rational::from(a * c),
                    Rational::from(a * d),
                    Rational::from(b * c),
                    Rational::from(b * d),
                ];
                RealRange {
                    lo: Bound::Closed(corners.iter().min().unwrap().clone()),
                    hi: Bound::Closed(corners.iter().max().unwrap().clone()),
                }
            }
            _ => RealRange::top(),
        }
    }
}

impl Display for RealRange {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match &self.lo {
            Bound::Unbounded => write!(f, "(-inf")?,
            Bound::Closed(q) => write!(f, "[{}", q)?,
            Bound::Open(q) => write!(f, "({}", q)?,
        }
        match &self.hi {
            Bound::Unbounded => write!(f, ", inf)"),
            Bound::Closed(q) => write!(f, ", {}]", q),
            Bound::Open(q) => write!(f, ", {})", q),
        }
    }
}

/// Abstract value of a real-sorted term: a range plus an integrality bit.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct RealAbs {
    pub range: RealRange,
    pub is_int: Tristate,
}

impl RealAbs {
    pub fn top() -> RealAbs {
        RealAbs {
            range: RealRange::top(),
            is_int: Tristate::Unknown,
        }
    }

    pub fn singleton(q: Rational) -> RealAbs {
        let is_int = Tristate::from_bool(q.is_integer());
        RealAbs {
            range: RealRange::singleton(q),
            is_int,
        }
    }

    pub fn as_singleton(&self) -> Option<&Rational> {
        self.range.as_singleton()
    }

    pub fn join(&self, other: &RealAbs) -> RealAbs {
        RealAbs {
            range: self.range.join(&other.range),
            is_int: self.is_int.join(other.is_int),
        }
    }

    pub fn check_eq(&self, other: &RealAbs) -> Tristate {
        // differing integrality refutes equality even when ranges overlap
        match (self.is_int, other.is_int) {
            (Tristate::True, Tristate::False) | (Tristate::False, Tristate::True) => {
                return Tristate::False
            }
            _ => {}
        }
        self.range.check_eq(&other.range)
    }

    pub fn add(&self, other: &RealAbs) -> RealAbs {
        RealAbs {
            range: self.range.add(&other.range),
            is_int: self.is_int.and(other.is_int),
        }
    }

    pub fn neg(&self) -> RealAbs {
        RealAbs {
            range: self.range.neg(),
            is_int: self.is_int,
        }
    }

    pub fn scale(&self, c: &Rational) -> RealAbs {
        RealAbs {
            range: self.range.scale(c),
            is_int: if c.is_integer() {
                self.is_int.and(Tristate::True)
            } else {
                Tristate::Unknown
            },
        }
    }

    pub fn mul(&self, other: &RealAbs) -> RealAbs {
        RealAbs {
            range: self.range.mul(&other.range),
            is_int: self.is_int.and(other.is_int),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn q(n: i64, d: i64) -> Rational {
        Rational::from((n, d))
    }

    fn closed(a: Rational, b: Rational) -> RealRange {
        RealRange {
            lo: Bound::Closed(a),
            hi: Bound::Closed(b),
        }
    }

    #[test]
    fn open_endpoints_separate() {
        let a = RealRange {
            lo: Bound::Closed(q(0, 1)),
            hi: Bound::Open(q(1, 1)),
        };
        let b = closed(q(1, 1), q(2, 1));
        assert!(!a.overlaps(&b));
        assert_eq!(a.check_eq(&b), Tristate::False);
        assert_eq!(a.check_lt(&b), Tristate::True);
    }

    #[test]
    fn join_prefers_lax() {
        let a = RealRange {
            lo: Bound::Open(q(0, 1)),
            hi: Bound::Open(q(1, 1)),
        };
        let b = closed(q(0, 1), q(1, 2));
        let j = a.join(&b);
        assert_eq!(j.lo, Bound::Closed(q(0, 1)));
        assert_eq!(j.hi, Bound::Open(q(1, 1)));
    }

    #[test]
    fn integrality_refutes() {
        let third = RealAbs::singleton(q(1, 3));
        let one = RealAbs::singleton(q(1, 1));
        assert_eq!(third.is_int, Tristate::False);
        let joined = third.join(&one);
        assert_eq!(joined.is_int, Tristate::Unknown);
        // an integral abstract value cannot equal a known non-integer
        let int_top = RealAbs {
            range: RealRange::top(),
            is_int: Tristate::True,
        };
        assert_eq!(int_top.check_eq(&third), Tristate::False);
    }

    #[test]
    fn scale_flips() {
        let r = closed(q(1, 1), q(2, 1));
        assert_eq!(r.scale(&q(-1, 1)), closed(q(-2, 1), q(-1, 1)));
    }
}
