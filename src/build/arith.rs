//! Integer and real arithmetic: everything is a weighted sum.
//!
//! `x − x → 0` is not a rewrite here; it falls out of the sum
//! canonicalization (zero coefficients are never stored).

use rug::{Integer, Rational};

use super::Builder;
use crate::absdom::Tristate;
use crate::algebra::{IntRing, LinComb, Prod, RealRing};
use crate::term::{Op, Term};
use crate::value::Value;

impl Builder {
    // ---- integers ----

    pub fn int_lit(&mut self, i: impl Into<Integer>) -> Term {
        self.constant(Value::Int(i.into()))
    }

    /// The sum decomposition of an integer term.
    pub(crate) fn int_lincomb(&self, t: &Term) -> LinComb<IntRing> {
        match t.op() {
            Op::Const(Value::Int(i)) => LinComb::constant(IntRing, i.clone()),
            Op::IntSum(coeffs, k) => {
                let mut s = LinComb::constant(IntRing, k.clone());
                for (c, x) in coeffs.iter().zip(t.cs()) {
                    s.insert(x.clone(), c.clone());
                }
                s
            }
            _ => LinComb::var(IntRing, t.clone()),
        }
    }

    pub(crate) fn from_int_lincomb(&mut self, s: LinComb<IntRing>) -> Term {
        if let Some(k) = s.as_constant() {
            return self.int_lit(k.clone());
        }
        if let Some(x) = s.as_var() {
            return x.clone();
        }
        let (cs, coeffs) = s.iter().map(|(x, c)| (x.clone(), c.clone())).unzip();
        self.mk(Op::IntSum(coeffs, s.offset().clone()), cs)
    }

    pub(crate) fn int_prod(&self, t: &Term) -> Prod<IntRing> {
        match t.op() {
            Op::Prod(counts) => {
                let mut p = Prod::identity(IntRing);
                for (n, x) in counts.iter().zip(t.cs()) {
                    p = p.mul(&Prod::from_factor(IntRing, x.clone(), *n));
                }
                p
            }
            _ => Prod::var(IntRing, t.clone()),
        }
    }

    pub(crate) fn from_int_prod(&mut self, p: Prod<IntRing>) -> Term {
        if p.is_identity() {
            return self.int_lit(1);
        }
        if let Some((x, 1)) = p.as_single_factor() {
            return x.clone();
        }
        let (cs, counts) = p.iter().map(|(x, n)| (x.clone(), *n)).unzip();
        self.mk(Op::Prod(counts), cs)
    }

    pub fn int_add(&mut self, a: Term, b: Term) -> Term {
        let s = self.int_lincomb(&a).add(&self.int_lincomb(&b));
        self.from_int_lincomb(s)
    }

    pub fn int_sub(&mut self, a: Term, b: Term) -> Term {
        let s = self.int_lincomb(&a).add(&self.int_lincomb(&b).negate());
        self.from_int_lincomb(s)
    }

    pub fn int_neg(&mut self, a: Term) -> Term {
        let s = self.int_lincomb(&a).negate();
        self.from_int_lincomb(s)
    }

    /// Multiplication: scalar sides scale the other side's sum; two
    /// non-constant sides form a monomial.
    pub fn int_mul(&mut self, a: Term, b: Term) -> Term {
        let la = self.int_lincomb(&a);
        let lb = self.int_lincomb(&b);
        if let Some(k) = la.as_constant() {
            let s = lb.scale(k);
            return self.from_int_lincomb(s);
        }
        if let Some(k) = lb.as_constant() {
            let s = la.scale(k);
            return self.from_int_lincomb(s);
        }
        // pull scalar weights out of weighted-var sides: (c·x)·y = c·(x·y)
        let (ca, ta) = match la.as_weighted_var() {
            Some((c, x)) => (c.clone(), x.clone()),
            None => (Integer::from(1), a),
        };
        let (cb, tb) = match lb.as_weighted_var() {
            Some((c, x)) => (c.clone(), x.clone()),
            None => (Integer::from(1), b),
        };
        let p = self.int_prod(&ta).mul(&self.int_prod(&tb));
        let m = self.from_int_prod(p);
        let s = LinComb::scaled_var(IntRing, Integer::from(ca * cb), m);
        self.from_int_lincomb(s)
    }

    /// SMT-LIB integer division: `y·(x div y) + (x mod y) = x` with
    /// `0 ≤ x mod y < |y|`. Division by a zero constant folds to the
    /// unspecified-but-fixed value 0.
    pub fn int_div(&mut self, a: Term, b: Term) -> Term {
        if let Some(y) = b.as_int_opt() {
            if *y == 0 {
                return self.int_lit(0);
            }
            if *y == 1 {
                return a;
            }
            if let Some(x) = a.as_int_opt() {
                let q = x.clone().div_rem_euc(y.clone()).0;
                return self.int_lit(q);
            }
        }
        let t = self.mk(Op::IntDiv, vec![a, b]);
        self.scalar_simplify(t)
    }

    /// SMT-LIB integer modulus; a zero constant divisor folds to the
    /// dividend.
    pub fn int_mod(&mut self, a: Term, b: Term) -> Term {
        if let Some(y) = b.as_int_opt() {
            if *y == 0 {
                return a;
            }
            if *y == 1 || *y == -1 {
                return self.int_lit(0);
            }
            if let Some(x) = a.as_int_opt() {
                let r = x.clone().div_rem_euc(y.clone()).1;
                return self.int_lit(r);
            }
            // a known multiple of y reduces to its residue
            let reduced = self.int_lincomb(&a).reduce_mod(y);
            if let Some(k) = reduced.as_constant() {
                return self.int_lit(k.clone());
            }
        }
        let t = self.mk(Op::IntMod, vec![a, b]);
        self.scalar_simplify(t)
    }

    pub fn int_le(&mut self, a: Term, b: Term) -> Term {
        match a.aval().as_int().check_le(b.aval().as_int()) {
            Tristate::True => self.tru(),
            Tristate::False => self.fls(),
            Tristate::Unknown => {
                if a == b {
                    return self.tru();
                }
                self.mk(Op::IntLe, vec![a, b])
            }
        }
    }

    pub fn int_lt(&mut self, a: Term, b: Term) -> Term {
        let le = self.int_le(b, a);
        self.not(le)
    }

    pub fn int_ge(&mut self, a: Term, b: Term) -> Term {
        self.int_le(b, a)
    }

    pub fn int_gt(&mut self, a: Term, b: Term) -> Term {
        self.int_lt(b, a)
    }

    pub fn int_min(&mut self, a: Term, b: Term) -> Term {
        let le = self.int_le(a.clone(), b.clone());
        self.min_max_via_ite(le, a, b, true)
    }

    pub fn int_max(&mut self, a: Term, b: Term) -> Term {
        let le = self.int_le(a.clone(), b.clone());
        self.min_max_via_ite(le, a, b, false)
    }

    // ---- reals ----

    pub fn real_lit(&mut self, q: impl Into<Rational>) -> Term {
        self.constant(Value::Real(q.into()))
    }

    pub(crate) fn real_lincomb(&self, t: &Term) -> LinComb<RealRing> {
        match t.op() {
            Op::Const(Value::Real(q)) => LinComb::constant(RealRing, q.clone()),
            Op::RealSum(coeffs, k) => {
                let mut s = LinComb::constant(RealRing, k.clone());
                for (c, x) in coeffs.iter().zip(t.cs()) {
                    s.insert(x.clone(), c.clone());
                }
                s
            }
            _ => LinComb::var(RealRing, t.clone()),
        }
    }

    pub(crate) fn from_real_lincomb(&mut self, s: LinComb<RealRing>) -> Term {
        if let Some(k) = s.as_constant() {
            return self.real_lit(k.clone());
        }
        if let Some(x) = s.as_var() {
            return x.clone();
        }
        let (cs, coeffs) = s.iter().map(|(x, c)| (x.clone(), c.clone())).unzip();
        self.mk(Op::RealSum(coeffs, s.offset().clone()), cs)
    }

    pub(crate) fn real_prod(&self, t: &Term) -> Prod<RealRing> {
        match t.op() {
            Op::Prod(counts) => {
                let mut p = Prod::identity(RealRing);
                for (n, x) in counts.iter().zip(t.cs()) {
                    p = p.mul(&Prod::from_factor(RealRing, x.clone(), *n));
                }
                p
            }
            _ => Prod::var(RealRing, t.clone()),
        }
    }

    pub(crate) fn from_real_prod(&mut self, p: Prod<RealRing>) -> Term {
        if p.is_identity() {
            return self.real_lit(1);
        }
        if let Some((x, 1)) = p.as_single_factor() {
            return x.clone();
        }
        let (cs, counts) = p.iter().map(|(x, n)| (x.clone(), *n)).unzip();
        self.mk(Op::Prod(counts), cs)
    }

    pub fn real_add(&mut self, a: Term, b: Term) -> Term {
        let s = self.real_lincomb(&a).add(&self.real_lincomb(&b));
        self.from_real_lincomb(s)
    }

    pub fn real_sub(&mut self, a: Term, b: Term) -> Term {
        let s = self.real_lincomb(&a).add(&self.real_lincomb(&b).negate());
        self.from_real_lincomb(s)
    }

    pub fn real_neg(&mut self, a: Term) -> Term {
        let s = self.real_lincomb(&a).negate();
        self.from_real_lincomb(s)
    }

    pub fn real_mul(&mut self, a: Term, b: Term) -> Term {
        let la = self.real_lincomb(&a);
        let lb = self.real_lincomb(&b);
        if let Some(k) = la.as_constant() {
            let s = lb.scale(k);
            return self.from_real_lincomb(s);
        }
        if let Some(k) = lb.as_constant() {
            let s = la.scale(k);
            return self.from_real_lincomb(s);
        }
        let (ca, ta) = match la.as_weighted_var() {
            Some((c, x)) => (c.clone(), x.clone()),
            None => (Rational::from(1), a),
        };
        let (cb, tb) = match lb.as_weighted_var() {
            Some((c, x)) => (c.clone(), x.clone()),
            None => (Rational::from(1), b),
        };
        let p = self.real_prod(&ta).mul(&self.real_prod(&tb));
        let m = self.from_real_prod(p);
        let s = LinComb::scaled_var(RealRing, Rational::from(ca * cb), m);
        self.from_real_lincomb(s)
    }

    /// Division by a non-zero constant scales; a zero constant divisor folds
    /// to the unspecified-but-fixed value 0.
    pub fn real_div(&mut self, a: Term, b: Term) -> Term {
        if let Op::Const(Value::Real(q)) = b.op() {
            if *q == 0 {
                return self.real_lit(Rational::new());
            }
            let s = self.real_lincomb(&a).scale(&Rational::from(q.recip_ref()));
            return self.from_real_lincomb(s);
        }
        let t = self.mk(Op::RealDiv, vec![a, b]);
        self.scalar_simplify(t)
    }

    /// Square root. Negative or irrational arguments produce an unspecified
    /// value of real sort; no error is raised.
    pub fn real_sqrt(&mut self, a: Term) -> Term {
        if let Op::Const(Value::Real(q)) = a.op() {
            if *q >= 0 {
                let (ns, nr) = q.numer().clone().sqrt_rem(Integer::new());
                let (ds, dr) = q.denom().clone().sqrt_rem(Integer::new());
                if nr == 0 && dr == 0 {
                    return self.real_lit(Rational::from((ns, ds)));
                }
            }
            return a;
        }
        self.mk(Op::RealSqrt, vec![a])
    }

    pub fn real_le(&mut self, a: Term, b: Term) -> Term {
        match a.aval().as_real().range.check_le(&b.aval().as_real().range) {
            Tristate::True => self.tru(),
            Tristate::False => self.fls(),
            Tristate::Unknown => {
                if a == b {
                    return self.tru();
                }
                self.mk(Op::RealLe, vec![a, b])
            }
        }
    }

    pub fn real_lt(&mut self, a: Term, b: Term) -> Term {
        let le = self.real_le(b, a);
        self.not(le)
    }

    pub fn real_min(&mut self, a: Term, b: Term) -> Term {
        let le = self.real_le(a.clone(), b.clone());
        self.min_max_via_ite(le, a, b, true)
    }

    pub fn real_max(&mut self, a: Term, b: Term) -> Term {
        let le = self.real_le(a.clone(), b.clone());
        self.min_max_via_ite(le, a, b, false)
    }

    pub fn real_is_int(&mut self, a: Term) -> Term {
        match a.aval().as_real().is_int {
            Tristate::True => self.tru(),
            Tristate::False => self.fls(),
            Tristate::Unknown => self.mk(Op::RealIsInt, vec![a]),
        }
    }

    // ---- conversions ----

    pub fn int_to_real(&mut self, a: Term) -> Term {
        if let Some(i) = a.as_int_opt() {
            return self.real_lit(Rational::from(i));
        }
        self.mk(Op::IntToReal, vec![a])
    }

    /// Floor.
    pub fn real_to_int(&mut self, a: Term) -> Term {
        if let Op::Const(Value::Real(q)) = a.op() {
            return self.int_lit(q.clone().floor().numer().clone());
        }
        // floor is the identity on promoted integers
        if let Op::IntToReal = a.op() {
            return a.cs()[0].clone();
        }
        let t = self.mk(Op::RealToInt, vec![a]);
        self.scalar_simplify(t)
    }

    pub fn int_to_bv(&mut self, a: Term, w: usize) -> Term {
        if let Some(i) = a.as_int_opt() {
            return self.bv_lit(i.clone().keep_bits(w as u32), w);
        }
        let t = self.mk(Op::IntToBv(w), vec![a]);
        self.scalar_simplify(t)
    }

    pub fn ubv_to_int(&mut self, a: Term) -> Term {
        if let Some(b) = a.as_bv_opt() {
            return self.int_lit(b.uint().clone());
        }
        let t = self.mk(Op::UbvToInt, vec![a]);
        self.scalar_simplify(t)
    }

    pub fn sbv_to_int(&mut self, a: Term) -> Term {
        if let Some(b) = a.as_bv_opt() {
            return self.int_lit(b.as_sint());
        }
        let t = self.mk(Op::SbvToInt, vec![a]);
        self.scalar_simplify(t)
    }

    /// Fold a wrapped node to a constant when its abstract value pinned it.
    pub(crate) fn scalar_simplify(&mut self, t: Term) -> Term {
        if t.as_const().is_none() {
            if let Some(v) = t.aval().as_singleton() {
                return self.constant(v);
            }
        }
        t
    }
}
