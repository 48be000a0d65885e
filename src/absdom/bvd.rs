//! Bit-vector domains: known bits and an unsigned interval, side by side.

use rug::Integer;
use serde::{Deserialize, Serialize};

use std::fmt::{self, Display, Formatter};

use super::Tristate;
use crate::bv::BitVec;

/// Abstract value of a `BitVec(w)` term.
///
/// `known` masks the bit positions whose value is fixed; `val` holds those
/// values (always a subset of `known`). `lo`/`hi` bound the unsigned value.
/// The two views are maintained together and each operator may consult
/// whichever is tighter.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct BvDomain {
    width: usize,
    known: Integer,
    val: Integer,
    lo: Integer,
    hi: Integer,
}

impl BvDomain {
    pub fn top(width: usize) -> BvDomain {
        BvDomain {
            width,
            known: Integer::from(0),
            val: Integer::from(0),
            lo: Integer::from(0),
            hi: (Integer::from(1) << width as u32) - 1,
        }
    }

    pub fn singleton(b: &BitVec) -> BvDomain {
        BvDomain {
            width: b.width(),
            known: (Integer::from(1) << b.width() as u32) - 1,
            val: b.uint().clone(),
            lo: b.uint().clone(),
            hi: b.uint().clone(),
        }
    }

    /// Build from an unsigned interval, inferring shared high bits.
    pub fn from_interval(width: usize, lo: Integer, hi: Integer) -> BvDomain {
        debug_assert!(lo <= hi && lo >= 0);
        debug_assert!((hi.significant_bits() as usize) <= width);
        BvDomain {
            width,
            known: Integer::from(0),
            val: Integer::from(0),
            lo,
            hi,
        }
        .normalized()
    }

    /// Build from known-bit masks alone.
    pub fn from_bits(width: usize, known: Integer, val: Integer) -> BvDomain {
        let full = (Integer::from(1) << width as u32) - 1;
        let unknown = Integer::from(&full ^ &known);
        let lo = val.clone();
        let hi = Integer::from(&val | &unknown);
        BvDomain {
            width,
            known,
            val,
            lo,
            hi,
        }
    }

    /// Tighten each view with the other. The bit view bounds the value by
    /// `[val, val | unknown]`; the interval view fixes the high bits shared
    /// by `lo` and `hi`.
    fn normalized(mut self) -> BvDomain {
        let full = (Integer::from(1) << self.width as u32) - 1;
        let unknown = Integer::from(&full ^ &self.known);
        // interval from bits
        if self.lo < self.val {
            self.lo = self.val.clone();
        }
        let bit_hi = Integer::from(&self.val | &unknown);
        if self.hi > bit_hi {
            self.hi = bit_hi;
        }
        // high bits from interval: positions above the highest differing bit
        // are equal in lo and hi, hence known
        let diff = Integer::from(&self.lo ^ &self.hi);
        let fixed_above = if diff == 0 {
            self.width
        } else {
            self.width - diff.significant_bits() as usize
        };
        if fixed_above > 0 {
            let mut mask = Integer::from(0);
            for i in 0..fixed_above {
                mask.set_bit((self.width - 1 - i) as u32, true);
            }
            let hi_known = Integer::from(&self.hi & &mask);
            self.known |= &mask;
            self.val |= hi_known;
        }
        debug_assert!(self.lo <= self.hi);
        self
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn interval(&self) -> (&Integer, &Integer) {
        (&self.lo, &self.hi)
    }

    pub fn known_bits(&self) -> (&Integer, &Integer) {
        (&self.known, &self.val)
    }

    pub fn as_singleton(&self) -> Option<BitVec> {
        if self.lo == self.hi {
            Some(BitVec::new(self.lo.clone(), self.width))
        } else {
            None
        }
    }

    pub fn contains(&self, b: &BitVec) -> bool {
        debug_assert_eq!(b.width(), self.width);
        *b.uint() >= self.lo
            && *b.uint() <= self.hi
            && Integer::from(b.uint() & &self.known) == self.val
    }

    pub fn join(&self, other: &BvDomain) -> BvDomain {
        debug_assert_eq!(self.width, other.width);
        let agree = Integer::from(&self.val ^ &other.val);
        let known = Integer::from(&self.known & &other.known) & !agree;
        let val = Integer::from(&self.val & &known);
        BvDomain {
            width: self.width,
            known,
            val,
            lo: self.lo.clone().min(other.lo.clone()),
            hi: self.hi.clone().max(other.hi.clone()),
        }
    }

    pub fn overlaps(&self, other: &BvDomain) -> bool {
        if self.hi < other.lo || other.hi < self.lo {
            return false;
        }
        // shared known bits must agree
        let shared = Integer::from(&self.known & &other.known);
        Integer::from(&self.val & &shared) == Integer::from(&other.val & &shared)
    }

    pub fn check_eq(&self, other: &BvDomain) -> Tristate {
        match (self.as_singleton(), other.as_singleton()) {
            (Some(a), Some(b)) if a == b => Tristate::True,
            _ if !self.overlaps(other) => Tristate::False,
            _ => Tristate::Unknown,
        }
    }

    /// Unsigned comparison through the intervals.
    pub fn check_ult(&self, other: &BvDomain) -> Tristate {
        if self.hi < other.lo {
            Tristate::True
        } else if self.lo >= other.hi {
            Tristate::False
        } else {
            Tristate::Unknown
        }
    }

    /// Signed interval `[lo, hi]` under two's complement, top when the sign
    /// bit is unresolved by the unsigned interval.
    pub fn signed_interval(&self) -> (Integer, Integer) {
        let half = Integer::from(1) << (self.width - 1) as u32;
        let full = Integer::from(1) << self.width as u32;
        if self.hi < half {
            (self.lo.clone(), self.hi.clone())
        } else if self.lo >= half {
            (Integer::from(&self.lo - &full), Integer::from(&self.hi - &full))
        } else {
            (-half.clone(), half - 1)
        }
    }

    pub fn check_slt(&self, other: &BvDomain) -> Tristate {
        let (alo, ahi) = self.signed_interval();
        let (blo, bhi) = other.signed_interval();
        if ahi < blo {
            Tristate::True
        } else if alo >= bhi {
            Tristate::False
        } else {
            Tristate::Unknown
        }
    }

    pub fn not(&self) -> BvDomain {
        let full = (Integer::from(1) << self.width as u32) - 1;
        BvDomain {
            width: self.width,
            known: self.known.clone(),
            val: Integer::from(&full & !self.val.clone()) & &self.known,
            lo: Integer::from(&full - &self.hi),
            hi: Integer::from(&full - &self.lo),
        }
    }

    pub fn and(&self, other: &BvDomain) -> BvDomain {
        debug_assert_eq!(self.width, other.width);
        let zeros = |d: &BvDomain| Integer::from(&d.known & !d.val.clone());
        let known_one = Integer::from(&self.val & &other.val);
        let known_zero = zeros(self) | zeros(other);
        let known = Integer::from(&known_one | &known_zero);
        BvDomain {
            width: self.width,
            known,
            val: known_one,
            lo: Integer::from(0),
            hi: self.hi.clone().min(other.hi.clone()),
        }
        .normalized()
    }

    pub fn or(&self, other: &BvDomain) -> BvDomain {
        self.not().and(&other.not()).not().normalized()
    }

    pub fn xor(&self, other: &BvDomain) -> BvDomain {
        debug_assert_eq!(self.width, other.width);
        let known = Integer::from(&self.known & &other.known);
        let val = Integer::from(&self.val ^ &other.val) & &known;
        BvDomain::from_bits(self.width, known, val)
    }

    pub fn add(&self, other: &BvDomain) -> BvDomain {
        debug_assert_eq!(self.width, other.width);
        let hi = Integer::from(&self.hi + &other.hi);
        if (hi.significant_bits() as usize) <= self.width {
            BvDomain::from_interval(self.width, Integer::from(&self.lo + &other.lo), hi)
        } else {
            BvDomain::top(self.width)
        }
    }

    pub fn neg(&self) -> BvDomain {
        if self.lo == 0 {
            if self.hi == 0 {
                return self.clone();
            }
            return BvDomain::top(self.width);
        }
        let full = Integer::from(1) << self.width as u32;
        BvDomain::from_interval(
            self.width,
            Integer::from(&full - &self.hi),
            Integer::from(&full - &self.lo),
        )
    }

    pub fn mul(&self, other: &BvDomain) -> BvDomain {
        debug_assert_eq!(self.width, other.width);
        let hi = Integer::from(&self.hi * &other.hi);
        if (hi.significant_bits() as usize) <= self.width {
            BvDomain::from_interval(self.width, Integer::from(&self.lo * &other.lo), hi)
        } else {
            BvDomain::top(self.width)
        }
    }

    pub fn concat(&self, low: &BvDomain) -> BvDomain {
        let w = self.width + low.width;
        let shift = low.width as u32;
        BvDomain {
            width: w,
            known: Integer::from(&self.known << shift) | &low.known,
            val: Integer::from(&self.val << shift) | &low.val,
            lo: Integer::from(&self.lo << shift) | &low.lo,
            hi: Integer::from(&self.hi << shift) | &low.hi,
        }
        .normalized()
    }

    pub fn extract(&self, high: usize, low: usize) -> BvDomain {
        let w = high - low + 1;
        let known = Integer::from(&self.known >> low as u32).keep_bits(w as u32);
        let val = Integer::from(&self.val >> low as u32).keep_bits(w as u32);
        let mut d = BvDomain::from_bits(w, known, val);
        // a low slice that keeps every significant bit of the interval keeps
        // the interval too
        if low == 0 && (self.hi.significant_bits() as usize) <= w {
            d.lo = d.lo.max(self.lo.clone());
            d.hi = d.hi.min(self.hi.clone());
            d = d.normalized();
        }
        d
    }

    pub fn uext(&self, n: usize) -> BvDomain {
        let mut known = self.known.clone();
        for i in 0..n {
            known.set_bit((self.width + i) as u32, true);
        }
        BvDomain {
            width: self.width + n,
            known,
            val: self.val.clone(),
            lo: self.lo.clone(),
            hi: self.hi.clone(),
        }
    }

    /// Range of the population count from the known bits.
    pub fn popcount_range(&self) -> (u32, u32) {
        let ones = self.val.count_ones().unwrap_or(0);
        let zeros = Integer::from(&self.known & !self.val.clone())
            .count_ones()
            .unwrap_or(0);
        (ones, self.width as u32 - zeros)
    }
}

impl Display for BvDomain {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{{bits:", )?;
        for i in (0..self.width).rev() {
            if self.known.get_bit(i as u32) {
                write!(f, "{}", self.val.get_bit(i as u32) as u8)?;
            } else {
                write!(f, "?")?;
            }
        }
        write!(f, " [{}, {}]}}", self.lo, self.hi)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn bv(u: i64, w: usize) -> BitVec {
        BitVec::new(Integer::from(u).keep_bits(w as u32), w)
    }

    #[test]
    fn singleton_roundtrip() {
        let d = BvDomain::singleton(&bv(42, 8));
        assert_eq!(d.as_singleton(), Some(bv(42, 8)));
        assert!(d.contains(&bv(42, 8)));
        assert!(!d.contains(&bv(43, 8)));
    }

    #[test]
    fn join_keeps_agreement() {
        let d = BvDomain::singleton(&bv(0b1010, 4)).join(&BvDomain::singleton(&bv(0b1000, 4)));
        // bits 3 and 0 agree (1 and 0); bit 1 does not
        let (known, val) = d.known_bits();
        assert!(known.get_bit(3) && val.get_bit(3));
        assert!(known.get_bit(0) && !val.get_bit(0));
        assert!(!known.get_bit(1));
        assert!(d.contains(&bv(0b1010, 4)));
        assert!(d.contains(&bv(0b1000, 4)));
    }

    #[test]
    fn bitwise() {
        let a = BvDomain::singleton(&bv(0b1100, 4));
        let top = BvDomain::top(4);
        let anded = a.and(&top);
        // known zeros of `a` survive AND with anything
        assert!(!anded.contains(&bv(0b0010, 4)));
        assert!(anded.contains(&bv(0b0100, 4)));
        let ored = a.or(&top);
        assert!(ored.contains(&bv(0b1110, 4)));
        assert!(!ored.contains(&bv(0b0111, 4)));
        let x = a.xor(&a);
        assert_eq!(x.as_singleton(), Some(bv(0, 4)));
    }

    #[test]
    fn interval_ops() {
        let a = BvDomain::from_interval(8, Integer::from(10), Integer::from(20));
        let b = BvDomain::from_interval(8, Integer::from(1), Integer::from(2));
        assert_eq!(a.add(&b).interval(), (&Integer::from(11), &Integer::from(22)));
        assert_eq!(b.check_ult(&a), Tristate::True);
        assert_eq!(a.check_ult(&b), Tristate::False);
        // overflow gives top
        let big = BvDomain::from_interval(8, Integer::from(200), Integer::from(250));
        assert_eq!(big.add(&big).interval(), (&Integer::from(0), &Integer::from(255)));
    }

    #[test]
    fn signed_view() {
        let neg = BvDomain::singleton(&bv(-2, 8));
        let pos = BvDomain::singleton(&bv(3, 8));
        assert_eq!(neg.check_slt(&pos), Tristate::True);
        assert_eq!(pos.check_slt(&neg), Tristate::False);
        // unsigned order is reversed
        assert_eq!(pos.check_ult(&neg), Tristate::True);
    }

    #[test]
    fn high_bits_from_interval() {
        let d = BvDomain::from_interval(8, Integer::from(0b1000_0000u32), Integer::from(0b1000_0011u32));
        let (known, val) = d.known_bits();
        assert!(known.get_bit(7) && val.get_bit(7));
        assert!(known.get_bit(2) && !val.get_bit(2));
        assert!(!known.get_bit(1));
    }

    #[test]
    fn popcount() {
        let d = BvDomain::singleton(&bv(0b0110, 4));
        assert_eq!(d.popcount_range(), (2, 2));
        assert_eq!(BvDomain::top(4).popcount_range(), (0, 4));
    }
}
