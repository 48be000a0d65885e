//! Integer intervals with optional endpoints.

use rug::Integer;
use serde::{Deserialize, Serialize};

use std::fmt::{self, Display, Formatter};

use super::Tristate;

/// `[lo, hi]` where a missing endpoint means unbounded on that side.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct IntRange {
    pub lo: Option<Integer>,
    pub hi: Option<Integer>,
}

impl IntRange {
    pub fn top() -> IntRange {
        IntRange { lo: None, hi: None }
    }

    pub fn singleton(i: Integer) -> IntRange {
        IntRange {
            lo: Some(i.clone()),
            hi: Some(i),
        }
    }

    pub fn new(lo: Option<Integer>, hi: Option<Integer>) -> IntRange {
        if let (Some(l), Some(h)) = (&lo, &hi) {
            debug_assert!(l <= h, "empty range [{}, {}]", l, h);
        }
        IntRange { lo, hi }
    }

    /// `[0, ∞)`; the range of string lengths and other counts.
    pub fn nonneg() -> IntRange {
        IntRange {
            lo: Some(Integer::from(0)),
            hi: None,
        }
    }

    pub fn as_singleton(&self) -> Option<&Integer> {
        match (&self.lo, &self.hi) {
            (Some(l), Some(h)) if l == h => Some(l),
            _ => None,
        }
    }

    pub fn contains(&self, i: &Integer) -> bool {
        self.lo.as_ref().map_or(true, |l| l <= i) && self.hi.as_ref().map_or(true, |h| i <= h)
    }

    pub fn join(&self, other: &IntRange) -> IntRange {
        IntRange {
            lo: match (&self.lo, &other.lo) {
                (Some(a), Some(b)) => Some(a.min(b).clone()),
                _ => None,
            },
            hi: match (&self.hi, &other.hi) {
                (Some(a), Some(b)) => Some(a.max(b).clone()),
                _ => None,
            },
        }
    }

    pub fn overlaps(&self, other: &IntRange) -> bool {
        let below = match (&self.hi, &other.lo) {
            (Some(h), Some(l)) => h < l,
            _ => false,
        };
        let above = match (&self.lo, &other.hi) {
            (Some(l), Some(h)) => l > h,
            _ => false,
        };
        !below && !above
    }

    pub fn check_eq(&self, other: &IntRange) -> Tristate {
        match (self.as_singleton(), other.as_singleton()) {
            (Some(a), Some(b)) if a == b => Tristate::True,
            _ if !self.overlaps(other) => Tristate::False,
            _ => Tristate::Unknown,
        }
    }

    /// `self ≤ other`, decided from the endpoints when possible.
    pub fn check_le(&self, other: &IntRange) -> Tristate {
        if let (Some(h), Some(l)) = (&self.hi, &other.lo) {
            if h <= l {
                return Tristate::True;
            }
        }
        if let (Some(l), Some(h)) = (&self.lo, &other.hi) {
            if l > h {
                return Tristate::False;
            }
        }
        Tristate::Unknown
    }

    /// `self < other`, decided from the endpoints when possible.
    pub fn check_lt(&self, other: &IntRange) -> Tristate {
        if let (Some(h), Some(l)) = (&self.hi, &other.lo) {
            if h < l {
                return Tristate::True;
            }
        }
        if let (Some(l), Some(h)) = (&self.lo, &other.hi) {
            if l >= h {
                return Tristate::False;
            }
        }
        Tristate::Unknown
    }

    pub fn add(&self, other: &IntRange) -> IntRange {
        IntRange {
            lo: match (&self.lo, &other.lo) {
                (Some(a), Some(b)) => Some(Integer::from(a + b)),
                _ => None,
            },
            hi: match (&self.hi, &other.hi) {
                (Some(a), Some(b)) => Some(Integer::from(a + b)),
                _ => None,
            },
        }
    }

    pub fn neg(&self) -> IntRange {
        IntRange {
            lo: self.hi.as_ref().map(|h| Integer::from(-h)),
            hi: self.lo.as_ref().map(|l| Integer::from(-l)),
        }
    }

    pub fn scale(&self, c: &Integer) -> IntRange {
        if *c == 0 {
            return IntRange::singleton(Integer::from(0));
        }
        let (lo, hi) = (
            self.lo.as_ref().map(|l| Integer::from(l * c)),
            self.hi.as_ref().map(|h| Integer::from(h * c)),
        );
        if *c > 0 {
            IntRange { lo, hi }
        } else {
            IntRange { lo: hi, hi: lo }
        }
    }

    pub fn mul(&self, other: &IntRange) -> IntRange {
        if let Some(c) = self.as_singleton() {
            return other.scale(c);
        }
        if let Some(c) = other.as_singleton() {
            return self.scale(c);
        }
        match (&self.lo, &self.hi, &other.lo, &other.hi) {
            (Some(a), Some(b), Some(c), Some(d)) => {
                let corners = [
                    Integer::from(a * c),
                    Integer::from(a * d),
                    Integer::from(b * c),
                    Integer::from(b * d),
                ];
                IntRange {
                    lo: corners.iter().min().cloned(),
                    hi: corners.iter().max().cloned(),
                }
            }
            _ => IntRange::top(),
        }
    }

    /// Euclidean `div` by a divisor drawn from `other`. Precise only when the
    /// divisor range is strictly positive; a range that may reach zero or
    /// below gives ⊤.
    pub fn div(&self, other: &IntRange) -> IntRange {
        match (&other.lo, &other.hi) {
            (Some(dlo), Some(dhi)) if *dlo > 0 => {
                let q = |n: &Integer, d: &Integer| n.clone().div_rem_euc(d.clone()).0;
                IntRange {
                    lo: self.lo.as_ref().map(|n| q(n, dlo).min(q(n, dhi))),
                    hi: self.hi.as_ref().map(|n| q(n, dlo).max(q(n, dhi))),
                }
            }
            _ => IntRange::top(),
        }
    }

    /// Euclidean `mod` by a divisor drawn from `other`: `[0, max|d| − 1]`
    /// when the divisor range excludes zero, ⊤ otherwise.
    pub fn rem(&self, other: &IntRange) -> IntRange {
        let excludes_zero = !other.contains(&Integer::from(0));
        if !excludes_zero {
            return IntRange::top();
        }
        let bound = match (&other.lo, &other.hi) {
            (Some(l), Some(h)) => {
                let la = Integer::from(l.abs_ref());
                let ha = Integer::from(h.abs_ref());
                Some(la.max(ha) - 1)
            }
            _ => None,
        };
        IntRange {
            lo: Some(Integer::from(0)),
            hi: bound,
        }
    }

    /// Clamp the lower endpoint up to zero (string lengths).
    pub fn clamp_nonneg(&self) -> IntRange {
        IntRange {
            lo: Some(
                self.lo
                    .as_ref()
                    .map_or_else(|| Integer::from(0), |l| l.clone().max(Integer::from(0))),
            ),
            hi: self.hi.as_ref().map(|h| h.clone().max(Integer::from(0))),
        }
    }

    /// Pointwise min of the endpoints (for substring-length intersection).
    pub fn min_with(&self, other: &IntRange) -> IntRange {
        IntRange {
            lo: match (&self.lo, &other.lo) {
                (Some(a), Some(b)) => Some(a.min(b).clone()),
                _ => None,
            },
            hi: match (&self.hi, &other.hi) {
                (Some(a), Some(b)) => Some(a.min(b).clone()),
                (Some(a), None) | (None, Some(a)) => Some(a.clone()),
                _ => None,
            },
        }
    }
}

impl Display for IntRange {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match &self.lo {
            Some(l) => write!(f, "[{}", l)?,
            None => write!(f, "(-inf")?,
        }
        match &self.hi {
            Some(h) => write!(f, ", {}]", h),
            None => write!(f, ", inf)"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn r(lo: i64, hi: i64) -> IntRange {
        IntRange::new(Some(Integer::from(lo)), Some(Integer::from(hi)))
    }

    #[test]
    fn arith() {
        assert_eq!(r(1, 2).add(&r(10, 20)), r(11, 22));
        assert_eq!(r(1, 2).neg(), r(-2, -1));
        assert_eq!(r(1, 2).scale(&Integer::from(-3)), r(-6, -3));
        assert_eq!(r(-1, 2).mul(&r(-3, 5)), r(-6, 10));
    }

    #[test]
    fn div_positive_divisor() {
        assert_eq!(r(10, 20).div(&r(2, 5)), r(2, 10));
        assert_eq!(r(-10, 20).div(&r(2, 5)), r(-5, 10));
        // divisor may be zero: unbounded
        assert_eq!(r(10, 20).div(&r(0, 5)), IntRange::top());
    }

    #[test]
    fn rem_bounds() {
        assert_eq!(r(-100, 100).rem(&r(3, 10)), r(0, 9));
        assert_eq!(r(-100, 100).rem(&r(-10, -3)), r(0, 9));
        assert_eq!(r(-100, 100).rem(&r(-1, 1)), IntRange::top());
    }

    #[test]
    fn comparisons() {
        assert_eq!(r(1, 3).check_le(&r(3, 9)), Tristate::True);
        assert_eq!(r(1, 3).check_lt(&r(3, 9)), Tristate::Unknown);
        assert_eq!(r(4, 6).check_lt(&r(1, 4)), Tristate::False);
        assert_eq!(r(1, 3).check_eq(&r(4, 9)), Tristate::False);
        assert_eq!(r(2, 2).check_eq(&r(2, 2)), Tristate::True);
    }

    #[test]
    fn join_unbounded() {
        let u = IntRange::new(Some(Integer::from(0)), None);
        assert_eq!(r(1, 2).join(&u), u.clone().join(&r(1, 2)));
        assert_eq!(r(1, 2).join(&u).lo, Some(Integer::from(0)));
        assert_eq!(r(1, 2).join(&u).hi, None);
    }
}
