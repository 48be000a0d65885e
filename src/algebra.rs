//! Weighted sums and products over the engine's four semirings.
//!
//! A [LinComb] is the canonical affine form `Σ cᵢ·xᵢ + k`: an ordered map
//! from term identity to a non-zero coefficient, plus a scalar offset. A
//! [Prod] is the canonical monomial `Π xᵢ^nᵢ` with positive counts. Both are
//! keyed by term identity (the interner's uid order), so iteration order is
//! deterministic and two equal maps build identical nodes.
//!
//! The no-zero-coefficient invariant is what makes `x − x → 0` and
//! `x ⊕ x → 0` structural facts rather than rewrite rules.

use rug::{Integer, Rational};

use std::collections::BTreeMap;

use crate::bv::BitVec;
use crate::term::Term;

/// A commutative semiring whose coefficients annotate sum entries.
///
/// Instances are values, not just types: the bit-vector rings carry their
/// width. All four instances happen to have additive inverses, which `sub`
/// on the builder relies on via [Semiring::neg_one].
pub trait Semiring: Clone + PartialEq + std::fmt::Debug {
    type Coeff: Clone + Eq + std::hash::Hash + std::fmt::Debug;

    fn zero(&self) -> Self::Coeff;
    fn one(&self) -> Self::Coeff;
    /// The coefficient `c` with `c + 1 = 0`.
    fn neg_one(&self) -> Self::Coeff;
    fn add(&self, a: &Self::Coeff, b: &Self::Coeff) -> Self::Coeff;
    fn mul(&self, a: &Self::Coeff, b: &Self::Coeff) -> Self::Coeff;
    fn is_zero(&self, a: &Self::Coeff) -> bool;
    fn is_one(&self, a: &Self::Coeff) -> bool;
    /// Whether multiplication is idempotent (`x · x = x`), in which case
    /// product occurrence counts collapse to 1.
    fn idempotent_factors(&self) -> bool {
        false
    }
}

/// Mathematical integers under `(+, ·)`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct IntRing;

impl Semiring for IntRing {
    type Coeff = Integer;

    fn zero(&self) -> Integer {
        Integer::from(0)
    }
    fn one(&self) -> Integer {
        Integer::from(1)
    }
    fn neg_one(&self) -> Integer {
        Integer::from(-1)
    }
    fn add(&self, a: &Integer, b: &Integer) -> Integer {
        Integer::from(a + b)
    }
    fn mul(&self, a: &Integer, b: &Integer) -> Integer {
        Integer::from(a * b)
    }
    fn is_zero(&self, a: &Integer) -> bool {
        *a == 0
    }
    fn is_one(&self, a: &Integer) -> bool {
        *a == 1
    }
}

/// Rationals under `(+, ·)`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct RealRing;

impl Semiring for RealRing {
    type Coeff = Rational;

    fn zero(&self) -> Rational {
        Rational::new()
    }
    fn one(&self) -> Rational {
        Rational::from(1)
    }
    fn neg_one(&self) -> Rational {
        Rational::from(-1)
    }
    fn add(&self, a: &Rational, b: &Rational) -> Rational {
        Rational::from(a + b)
    }
    fn mul(&self, a: &Rational, b: &Rational) -> Rational {
        Rational::from(a * b)
    }
    fn is_zero(&self, a: &Rational) -> bool {
        *a == 0
    }
    fn is_one(&self, a: &Rational) -> bool {
        *a == 1
    }
}

/// Width-`w` bit-vectors under wrapping `(+, ·)`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct BvArith(pub usize);

impl Semiring for BvArith {
    type Coeff = BitVec;

    fn zero(&self) -> BitVec {
        BitVec::zeros(self.0)
    }
    fn one(&self) -> BitVec {
        BitVec::new(Integer::from(1), self.0)
    }
    fn neg_one(&self) -> BitVec {
        BitVec::ones(self.0)
    }
    fn add(&self, a: &BitVec, b: &BitVec) -> BitVec {
        a.clone() + b.clone()
    }
    fn mul(&self, a: &BitVec, b: &BitVec) -> BitVec {
        a.clone() * b.clone()
    }
    fn is_zero(&self, a: &BitVec) -> bool {
        *a.uint() == 0
    }
    fn is_one(&self, a: &BitVec) -> bool {
        *a.uint() == 1
    }
}

/// Width-`w` bit-vectors as a Boolean ring: `+` is xor, `·` is and.
///
/// Coefficients are bitmasks; the multiplicative identity is the all-ones
/// mask, and every element is its own additive inverse.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct BvXor(pub usize);

impl Semiring for BvXor {
    type Coeff = BitVec;

    fn zero(&self) -> BitVec {
        BitVec::zeros(self.0)
    }
    fn one(&self) -> BitVec {
        BitVec::ones(self.0)
    }
    fn neg_one(&self) -> BitVec {
        BitVec::ones(self.0)
    }
    fn add(&self, a: &BitVec, b: &BitVec) -> BitVec {
        a.clone() ^ b.clone()
    }
    fn mul(&self, a: &BitVec, b: &BitVec) -> BitVec {
        a.clone() & b.clone()
    }
    fn is_zero(&self, a: &BitVec) -> bool {
        *a.uint() == 0
    }
    fn is_one(&self, a: &BitVec) -> bool {
        a.uint().count_ones() == Some(self.0 as u32)
    }
    fn idempotent_factors(&self) -> bool {
        true
    }
}

/// The canonical affine form `Σ cᵢ·xᵢ + k`.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct LinComb<R: Semiring> {
    ring: R,
    terms: BTreeMap<Term, R::Coeff>,
    offset: R::Coeff,
}

impl<R: Semiring> LinComb<R> {
    pub fn zero(ring: R) -> LinComb<R> {
        let offset = ring.zero();
        LinComb {
            ring,
            terms: BTreeMap::new(),
            offset,
        }
    }

    pub fn constant(ring: R, k: R::Coeff) -> LinComb<R> {
        LinComb {
            ring,
            terms: BTreeMap::new(),
            offset: k,
        }
    }

    pub fn var(ring: R, x: Term) -> LinComb<R> {
        let one = ring.one();
        Self::scaled_var(ring, one, x)
    }

    pub fn scaled_var(ring: R, c: R::Coeff, x: Term) -> LinComb<R> {
        let mut s = Self::zero(ring);
        s.insert(x, c);
        s
    }

    pub fn from_terms(ring: R, terms: impl IntoIterator<Item = (Term, R::Coeff)>) -> LinComb<R> {
        let mut s = Self::zero(ring);
        for (x, c) in terms {
            s.insert(x, c);
        }
        s
    }

    pub fn ring(&self) -> &R {
        &self.ring
    }

    pub fn offset(&self) -> &R::Coeff {
        &self.offset
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Term, &R::Coeff)> {
        self.terms.iter()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Add `c·x`, dropping the entry if the combined coefficient is zero.
    pub fn insert(&mut self, x: Term, c: R::Coeff) {
        if self.ring.is_zero(&c) {
            return;
        }
        match self.terms.entry(x) {
            std::collections::btree_map::Entry::Vacant(e) => {
                e.insert(c);
            }
            std::collections::btree_map::Entry::Occupied(mut e) => {
                let sum = self.ring.add(e.get(), &c);
                if self.ring.is_zero(&sum) {
                    e.remove();
                } else {
                    *e.get_mut() = sum;
                }
            }
        }
    }

    pub fn add_const(&mut self, k: &R::Coeff) {
        self.offset = self.ring.add(&self.offset, k);
    }

    pub fn add(mut self, other: &LinComb<R>) -> LinComb<R> {
        debug_assert!(self.ring == other.ring);
        for (x, c) in &other.terms {
            self.insert(x.clone(), c.clone());
        }
        self.add_const(&other.offset);
        self
    }

    pub fn scale(&self, c: &R::Coeff) -> LinComb<R> {
        if self.ring.is_zero(c) {
            return Self::zero(self.ring.clone());
        }
        let mut s = Self::zero(self.ring.clone());
        for (x, c0) in &self.terms {
            s.insert(x.clone(), self.ring.mul(c0, c));
        }
        s.offset = self.ring.mul(&self.offset, c);
        s
    }

    pub fn negate(&self) -> LinComb<R> {
        self.scale(&self.ring.neg_one())
    }

    /// `Some(k)` iff the sum is the constant `k`.
    pub fn as_constant(&self) -> Option<&R::Coeff> {
        if self.terms.is_empty() {
            Some(&self.offset)
        } else {
            None
        }
    }

    /// `Some(x)` iff the sum is exactly `1·x + 0`.
    pub fn as_var(&self) -> Option<&Term> {
        match self.as_weighted_var() {
            Some((c, x)) if self.ring.is_one(c) => Some(x),
            _ => None,
        }
    }

    /// `Some((c, x))` iff the sum is `c·x + 0`.
    pub fn as_weighted_var(&self) -> Option<(&R::Coeff, &Term)> {
        match self.as_affine_var() {
            Some((c, x, k)) if self.ring.is_zero(k) => Some((c, x)),
            _ => None,
        }
    }

    /// `Some((c, x, k))` iff the sum has exactly one entry.
    pub fn as_affine_var(&self) -> Option<(&R::Coeff, &Term, &R::Coeff)> {
        if self.terms.len() == 1 {
            let (x, c) = self.terms.iter().next().unwrap();
            Some((c, x, &self.offset))
        } else {
            None
        }
    }

    /// Split off the part shared by `a` and `b`: entries present in both with
    /// equal coefficients, plus the offset when equal. Returns
    /// `(common, a', b')` with `a = common + a'` and `b = common + b'`.
    pub fn extract_common(a: &LinComb<R>, b: &LinComb<R>) -> (LinComb<R>, LinComb<R>, LinComb<R>) {
        debug_assert!(a.ring == b.ring);
        let ring = a.ring.clone();
        let mut common = Self::zero(ring.clone());
        let mut ra = Self::zero(ring.clone());
        let mut rb = Self::zero(ring);
        for (x, c) in &a.terms {
            if b.terms.get(x) == Some(c) {
                common.insert(x.clone(), c.clone());
            } else {
                ra.insert(x.clone(), c.clone());
            }
        }
        for (x, c) in &b.terms {
            if common.terms.get(x) != Some(c) {
                rb.insert(x.clone(), c.clone());
            }
        }
        if a.offset == b.offset {
            common.offset = a.offset.clone();
        } else {
            ra.offset = a.offset.clone();
            rb.offset = b.offset.clone();
        }
        (common, ra, rb)
    }

    /// Fold the sum. Seeds from `konst(offset)` when the offset is non-zero,
    /// otherwise from the first entry.
    pub fn eval<T>(
        &self,
        add: impl Fn(T, T) -> T,
        entry: impl Fn(&R::Coeff, &Term) -> T,
        konst: impl Fn(&R::Coeff) -> T,
    ) -> T {
        let mut it = self.terms.iter();
        let mut acc = if !self.ring.is_zero(&self.offset) || self.terms.is_empty() {
            konst(&self.offset)
        } else {
            let (x, c) = it.next().unwrap();
            entry(c, x)
        };
        for (x, c) in it {
            acc = add(acc, entry(c, x));
        }
        acc
    }
}

impl LinComb<IntRing> {
    /// Reduce every coefficient and the offset modulo `k ≠ 0`, dropping
    /// entries that become zero. The result is within `[0, |k|)` pointwise.
    pub fn reduce_mod(&self, k: &Integer) -> LinComb<IntRing> {
        debug_assert!(*k != 0);
        let mut s = Self::zero(IntRing);
        for (x, c) in &self.terms {
            s.insert(x.clone(), c.clone().div_rem_euc(k.clone()).1);
        }
        s.offset = self.offset.clone().div_rem_euc(k.clone()).1;
        s
    }
}

/// The canonical monomial `Π xᵢ^nᵢ`.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Prod<R: Semiring> {
    ring: R,
    factors: BTreeMap<Term, u32>,
}

impl<R: Semiring> Prod<R> {
    /// The empty product (the ring's multiplicative identity).
    pub fn identity(ring: R) -> Prod<R> {
        Prod {
            ring,
            factors: BTreeMap::new(),
        }
    }

    pub fn var(ring: R, x: Term) -> Prod<R> {
        Self::from_factor(ring, x, 1)
    }

    pub fn from_factor(ring: R, x: Term, n: u32) -> Prod<R> {
        let mut p = Self::identity(ring);
        p.push(x, n);
        p
    }

    pub fn ring(&self) -> &R {
        &self.ring
    }

    pub fn is_identity(&self) -> bool {
        self.factors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Term, &u32)> {
        self.factors.iter()
    }

    pub fn len(&self) -> usize {
        self.factors.len()
    }

    fn push(&mut self, x: Term, n: u32) {
        debug_assert!(n > 0);
        let e = self.factors.entry(x).or_insert(0);
        *e += n;
        if self.ring.idempotent_factors() {
            *e = 1;
        }
    }

    pub fn mul(mut self, other: &Prod<R>) -> Prod<R> {
        debug_assert!(self.ring == other.ring);
        for (x, n) in &other.factors {
            self.push(x.clone(), *n);
        }
        self
    }

    /// `Some((x, n))` iff the product is a single power.
    pub fn as_single_factor(&self) -> Option<(&Term, u32)> {
        if self.factors.len() == 1 {
            let (x, n) = self.factors.iter().next().unwrap();
            Some((x, *n))
        } else {
            None
        }
    }

    /// Shared sub-product of `a` and `b` (minimum counts), with remainders.
    pub fn extract_common(a: &Prod<R>, b: &Prod<R>) -> (Prod<R>, Prod<R>, Prod<R>) {
        debug_assert!(a.ring == b.ring);
        let ring = a.ring.clone();
        let mut common = Self::identity(ring.clone());
        let mut ra = Self::identity(ring.clone());
        let mut rb = Self::identity(ring);
        for (x, &n) in &a.factors {
            let m = b.factors.get(x).copied().unwrap_or(0);
            let shared = n.min(m);
            if shared > 0 {
                common.push(x.clone(), shared);
            }
            if n > shared {
                ra.push(x.clone(), n - shared);
            }
        }
        for (x, &m) in &b.factors {
            let shared = a.factors.get(x).copied().unwrap_or(0).min(m);
            if m > shared {
                rb.push(x.clone(), m - shared);
            }
        }
        (common, ra, rb)
    }

    /// Fold the product; `None` for the empty product.
    pub fn eval<T>(&self, mul: impl Fn(T, T) -> T, factor: impl Fn(&Term, u32) -> T) -> Option<T> {
        let mut it = self.factors.iter();
        let first = it.next()?;
        let mut acc = factor(first.0, *first.1);
        for (x, n) in it {
            acc = mul(acc, factor(x, *n));
        }
        Some(acc)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::build::Builder;
    use crate::sort::Sort;

    fn vars(b: &mut Builder) -> (Term, Term) {
        (b.var("x", Sort::Int), b.var("y", Sort::Int))
    }

    #[test]
    fn no_zero_coefficients() {
        let mut b = Builder::new();
        let (x, y) = vars(&mut b);
        let mut s = LinComb::var(IntRing, x.clone());
        s.insert(y.clone(), Integer::from(2));
        s.insert(x.clone(), Integer::from(-1));
        assert_eq!(s.len(), 1);
        assert_eq!(s.as_weighted_var(), Some((&Integer::from(2), &y)));
        s.insert(y, Integer::from(-2));
        assert_eq!(s.as_constant(), Some(&Integer::from(0)));
        // scaling by zero collapses everything
        let mut t = LinComb::var(IntRing, x);
        t.add_const(&Integer::from(7));
        assert_eq!(t.scale(&Integer::from(0)).as_constant(), Some(&Integer::from(0)));
    }

    #[test]
    fn recognizers() {
        let mut b = Builder::new();
        let (x, _) = vars(&mut b);
        let s = LinComb::constant(IntRing, Integer::from(5));
        assert_eq!(s.as_constant(), Some(&Integer::from(5)));
        assert!(s.as_affine_var().is_none());
        let v = LinComb::var(IntRing, x.clone());
        assert_eq!(v.as_var(), Some(&x));
        let mut w = LinComb::scaled_var(IntRing, Integer::from(3), x.clone());
        assert_eq!(w.as_weighted_var(), Some((&Integer::from(3), &x)));
        assert!(w.as_var().is_none());
        w.add_const(&Integer::from(1));
        assert!(w.as_weighted_var().is_none());
        assert_eq!(
            w.as_affine_var(),
            Some((&Integer::from(3), &x, &Integer::from(1)))
        );
    }

    #[test]
    fn extract_common_splits() {
        let mut b = Builder::new();
        let (x, y) = vars(&mut b);
        let z = b.var("z", Sort::Int);
        let mut a = LinComb::from_terms(
            IntRing,
            vec![(x.clone(), Integer::from(2)), (y.clone(), Integer::from(1))],
        );
        a.add_const(&Integer::from(4));
        let mut c = LinComb::from_terms(
            IntRing,
            vec![(x.clone(), Integer::from(2)), (z.clone(), Integer::from(5))],
        );
        c.add_const(&Integer::from(4));
        let (common, ra, rc) = LinComb::extract_common(&a, &c);
        assert_eq!(common.as_affine_var(), Some((&Integer::from(2), &x, &Integer::from(4))));
        assert_eq!(ra.as_weighted_var(), Some((&Integer::from(1), &y)));
        assert_eq!(rc.as_weighted_var(), Some((&Integer::from(5), &z)));
        // both decompositions rebuild the originals
        assert_eq!(common.clone().add(&ra), a);
        assert_eq!(common.add(&rc), c);
    }

    #[test]
    fn reduce_mod_drops_multiples() {
        let mut b = Builder::new();
        let (x, y) = vars(&mut b);
        let mut s = LinComb::from_terms(
            IntRing,
            vec![(x, Integer::from(6)), (y.clone(), Integer::from(7))],
        );
        s.add_const(&Integer::from(-5));
        let r = s.reduce_mod(&Integer::from(3));
        assert_eq!(r.as_affine_var(), Some((&Integer::from(1), &y, &Integer::from(1))));
    }

    #[test]
    fn eval_folds() {
        let mut b = Builder::new();
        let (x, y) = vars(&mut b);
        let mut s = LinComb::from_terms(
            IntRing,
            vec![(x.clone(), Integer::from(2)), (y.clone(), Integer::from(3))],
        );
        // zero offset: the fold seeds from the first entry
        let rendered = s.eval(
            |a, b| format!("{} + {}", a, b),
            |c, t| format!("{}*{}", c, t.get()),
            |k| format!("{}", k),
        );
        assert_eq!(rendered, "2*x + 3*y");
        s.add_const(&Integer::from(1));
        let rendered = s.eval(
            |a, b| format!("{} + {}", a, b),
            |c, t| format!("{}*{}", c, t.get()),
            |k| format!("{}", k),
        );
        assert_eq!(rendered, "1 + 2*x + 3*y");
    }

    #[test]
    fn xor_products_are_idempotent() {
        let mut b = Builder::new();
        let x = b.var("x", Sort::BitVec(4));
        let p = Prod::var(BvXor(4), x.clone()).mul(&Prod::var(BvXor(4), x.clone()));
        assert_eq!(p.as_single_factor(), Some((&x, 1)));
        // the arithmetic ring accumulates counts instead
        let q = Prod::var(BvArith(4), x.clone()).mul(&Prod::var(BvArith(4), x.clone()));
        assert_eq!(q.as_single_factor(), Some((&x, 2)));
    }
}
