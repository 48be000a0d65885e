//! Bit-vector construction and normalization.
//!
//! Additive structure lives in the modular-arithmetic sum, xor structure in
//! the xor-sum (where bitwise negation is xor with all-ones, so double
//! negation and `x ⊕ x` cancel structurally). Shifts and rotates by concrete
//! amounts lower to extract/concat/extension rewrites; comparisons consult
//! the bit-vector domains before a node is ever built.

use rug::Integer;

use std::collections::BTreeSet;

use super::Builder;
use crate::absdom::Tristate;
use crate::algebra::{BvArith, BvXor, LinComb, Prod};
use crate::bv::BitVec;
use crate::term::{Op, Term};
use crate::value::Value;

impl Builder {
    pub fn bv_lit(&mut self, uint: impl Into<Integer>, w: usize) -> Term {
        self.constant(Value::BitVec(BitVec::new(uint.into(), w)))
    }

    pub fn bv_zero(&mut self, w: usize) -> Term {
        self.constant(Value::BitVec(BitVec::zeros(w)))
    }

    pub fn bv_ones(&mut self, w: usize) -> Term {
        self.constant(Value::BitVec(BitVec::ones(w)))
    }

    // ---- arithmetic (the modular semiring) ----

    pub(crate) fn bv_lincomb(&self, t: &Term) -> LinComb<BvArith> {
        let w = t.sort().as_bv();
        match t.op() {
            Op::Const(Value::BitVec(b)) => LinComb::constant(BvArith(w), b.clone()),
            Op::BvSum(coeffs, k) => {
                let mut s = LinComb::constant(BvArith(w), k.clone());
                for (c, x) in coeffs.iter().zip(t.cs()) {
                    s.insert(x.clone(), c.clone());
                }
                s
            }
            _ => LinComb::var(BvArith(w), t.clone()),
        }
    }

    pub(crate) fn from_bv_lincomb(&mut self, s: LinComb<BvArith>) -> Term {
        if let Some(k) = s.as_constant() {
            return self.constant(Value::BitVec(k.clone()));
        }
        if let Some(x) = s.as_var() {
            return x.clone();
        }
        let (cs, coeffs) = s.iter().map(|(x, c)| (x.clone(), c.clone())).unzip();
        self.mk(Op::BvSum(coeffs, s.offset().clone()), cs)
    }

    pub(crate) fn bv_prod(&self, t: &Term) -> Prod<BvArith> {
        let w = t.sort().as_bv();
        match t.op() {
            Op::Prod(counts) => {
                let mut p = Prod::identity(BvArith(w));
                for (n, x) in counts.iter().zip(t.cs()) {
                    p = p.mul(&Prod::from_factor(BvArith(w), x.clone(), *n));
                }
                p
            }
            _ => Prod::var(BvArith(w), t.clone()),
        }
    }

    pub(crate) fn from_bv_prod(&mut self, p: Prod<BvArith>) -> Term {
        if p.is_identity() {
            let w = p.ring().0;
            return self.bv_lit(1, w);
        }
        if let Some((x, 1)) = p.as_single_factor() {
            return x.clone();
        }
        let (cs, counts) = p.iter().map(|(x, n)| (x.clone(), *n)).unzip();
        self.mk(Op::Prod(counts), cs)
    }

    pub fn bv_add(&mut self, a: Term, b: Term) -> Term {
        let s = self.bv_lincomb(&a).add(&self.bv_lincomb(&b));
        self.from_bv_lincomb(s)
    }

    pub fn bv_sub(&mut self, a: Term, b: Term) -> Term {
        let s = self.bv_lincomb(&a).add(&self.bv_lincomb(&b).negate());
        self.from_bv_lincomb(s)
    }

    pub fn bv_neg(&mut self, a: Term) -> Term {
        let s = self.bv_lincomb(&a).negate();
        self.from_bv_lincomb(s)
    }

    pub fn bv_mul(&mut self, a: Term, b: Term) -> Term {
        let w = a.sort().as_bv();
        let la = self.bv_lincomb(&a);
        let lb = self.bv_lincomb(&b);
        if let Some(k) = la.as_constant() {
            let s = lb.scale(k);
            return self.from_bv_lincomb(s);
        }
        if let Some(k) = lb.as_constant() {
            let s = la.scale(k);
            return self.from_bv_lincomb(s);
        }
        let (ca, ta) = match la.as_weighted_var() {
            Some((c, x)) => (c.clone(), x.clone()),
            None => (BitVec::new(Integer::from(1), w), a),
        };
        let (cb, tb) = match lb.as_weighted_var() {
            Some((c, x)) => (c.clone(), x.clone()),
            None => (BitVec::new(Integer::from(1), w), b),
        };
        let p = self.bv_prod(&ta).mul(&self.bv_prod(&tb));
        let m = self.from_bv_prod(p);
        let s = LinComb::scaled_var(BvArith(w), ca * cb, m);
        self.from_bv_lincomb(s)
    }

    // ---- the xor semiring ----

    pub(crate) fn bv_xor_lincomb(&self, t: &Term) -> LinComb<BvXor> {
        let w = t.sort().as_bv();
        match t.op() {
            Op::Const(Value::BitVec(b)) => LinComb::constant(BvXor(w), b.clone()),
            Op::BvXorSum(coeffs, k) => {
                let mut s = LinComb::constant(BvXor(w), k.clone());
                for (c, x) in coeffs.iter().zip(t.cs()) {
                    s.insert(x.clone(), c.clone());
                }
                s
            }
            _ => LinComb::var(BvXor(w), t.clone()),
        }
    }

    pub(crate) fn from_bv_xor_lincomb(&mut self, s: LinComb<BvXor>) -> Term {
        if let Some(k) = s.as_constant() {
            return self.constant(Value::BitVec(k.clone()));
        }
        if let Some(x) = s.as_var() {
            return x.clone();
        }
        let (cs, coeffs) = s.iter().map(|(x, c)| (x.clone(), c.clone())).unzip();
        self.mk(Op::BvXorSum(coeffs, s.offset().clone()), cs)
    }

    pub fn bv_xor(&mut self, a: Term, b: Term) -> Term {
        let s = self.bv_xor_lincomb(&a).add(&self.bv_xor_lincomb(&b));
        self.from_bv_xor_lincomb(s)
    }

    pub fn bv_xor_all(&mut self, xs: Vec<Term>) -> Term {
        let mut it = xs.into_iter();
        let mut acc = it.next().expect("empty xor");
        for x in it {
            acc = self.bv_xor(acc, x);
        }
        acc
    }

    /// Bitwise negation is xor with all-ones; `¬¬x = x` cancels in the sum.
    pub fn bv_not(&mut self, a: Term) -> Term {
        let w = a.sort().as_bv();
        let mut s = self.bv_xor_lincomb(&a);
        s.add_const(&BitVec::ones(w));
        self.from_bv_xor_lincomb(s)
    }

    // ---- bitwise and / or ----

    pub fn bv_and(&mut self, a: Term, b: Term) -> Term {
        self.bv_and_all(vec![a, b])
    }

    pub fn bv_and_all(&mut self, xs: Vec<Term>) -> Term {
        self.bv_bitwise_all(xs, true)
    }

    pub fn bv_or(&mut self, a: Term, b: Term) -> Term {
        self.bv_or_all(vec![a, b])
    }

    pub fn bv_or_all(&mut self, xs: Vec<Term>) -> Term {
        self.bv_bitwise_all(xs, false)
    }

    /// Shared n-ary and/or normal form: flatten, fold the constant mask,
    /// apply identity and annihilator, deduplicate.
    fn bv_bitwise_all(&mut self, xs: Vec<Term>, is_and: bool) -> Term {
        let w = xs.first().expect("empty bitwise application").sort().as_bv();
        let same_op = if is_and { Op::BvAnd } else { Op::BvOr };
        let mut mask = if is_and {
            BitVec::ones(w)
        } else {
            BitVec::zeros(w)
        };
        let mut set: BTreeSet<Term> = BTreeSet::new();
        let push = |mask: &mut BitVec, set: &mut BTreeSet<Term>, x: &Term| {
            match x.as_bv_opt() {
                Some(b) => {
                    *mask = if is_and {
                        mask.clone() & b.clone()
                    } else {
                        mask.clone() | b.clone()
                    }
                }
                None => {
                    set.insert(x.clone());
                }
            }
        };
        for x in &xs {
            if *x.op() == same_op {
                for c in x.cs() {
                    push(&mut mask, &mut set, c);
                }
            } else {
                push(&mut mask, &mut set, x);
            }
        }
        // annihilator: 0 for and, all-ones for or
        let annihilated = if is_and {
            *mask.uint() == 0
        } else {
            mask == BitVec::ones(w)
        };
        if annihilated || set.is_empty() {
            return self.constant(Value::BitVec(mask));
        }
        let identity = if is_and {
            mask == BitVec::ones(w)
        } else {
            *mask.uint() == 0
        };
        let mut children: Vec<Term> = set.into_iter().collect();
        if children.len() == 1 && identity {
            return children.pop().unwrap();
        }
        if !identity {
            children.push(self.constant(Value::BitVec(mask)));
        }
        let t = self.mk(same_op, children);
        self.scalar_simplify(t)
    }

    // ---- structure: concat, extract, extensions ----

    pub fn bv_concat(&mut self, a: Term, b: Term) -> Term {
        self.bv_concat_all(vec![a, b])
    }

    /// Flattens nested concats and merges adjacent constants.
    pub fn bv_concat_all(&mut self, xs: Vec<Term>) -> Term {
        let mut parts: Vec<Term> = Vec::new();
        for x in xs {
            if let Op::BvConcat = x.op() {
                parts.extend(x.cs().iter().cloned());
            } else {
                parts.push(x);
            }
        }
        let mut merged: Vec<Term> = Vec::new();
        for x in parts {
            match (merged.last().and_then(|l| l.as_bv_opt().cloned()), x.as_bv_opt()) {
                (Some(hi), Some(lo)) => {
                    let joined = hi.concat(lo.clone());
                    merged.pop();
                    merged.push(self.constant(Value::BitVec(joined)));
                }
                _ => merged.push(x),
            }
        }
        if merged.len() == 1 {
            return merged.pop().unwrap();
        }
        self.mk(Op::BvConcat, merged)
    }

    /// Bits `high..=low`. Slices that stay inside one concat piece route to
    /// that piece; nested extracts collapse.
    pub fn bv_extract(&mut self, t: Term, high: usize, low: usize) -> Term {
        let w = t.sort().as_bv();
        assert!(low <= high && high < w, "extract {}..{} of (bv {})", high, low, w);
        if low == 0 && high + 1 == w {
            return t;
        }
        if let Some(b) = t.as_bv_opt() {
            return self.constant(Value::BitVec(b.extract(high, low)));
        }
        if let Op::BvExtract(_, l2) = t.op() {
            let inner = t.cs()[0].clone();
            return self.bv_extract(inner, high + l2, low + l2);
        }
        if let Op::BvConcat = t.op() {
            // pieces run most-significant first; find one containing the slice
            let mut hi_edge = w;
            for c in t.cs() {
                let cw = c.sort().as_bv();
                let lo_edge = hi_edge - cw;
                if low >= lo_edge && high < hi_edge {
                    let c = c.clone();
                    return self.bv_extract(c, high - lo_edge, low - lo_edge);
                }
                hi_edge = lo_edge;
            }
        }
        let t = self.mk(Op::BvExtract(high, low), vec![t]);
        self.scalar_simplify(t)
    }

    pub fn bv_uext(&mut self, t: Term, n: usize) -> Term {
        if n == 0 {
            return t;
        }
        if let Some(b) = t.as_bv_opt() {
            return self.constant(Value::BitVec(b.uext(n)));
        }
        if let Op::BvUext(m) = t.op() {
            let inner = t.cs()[0].clone();
            let m = *m;
            return self.bv_uext(inner, n + m);
        }
        self.mk(Op::BvUext(n), vec![t])
    }

    pub fn bv_sext(&mut self, t: Term, n: usize) -> Term {
        if n == 0 {
            return t;
        }
        if let Some(b) = t.as_bv_opt() {
            return self.constant(Value::BitVec(b.sext(n)));
        }
        if let Op::BvSext(m) = t.op() {
            let inner = t.cs()[0].clone();
            let m = *m;
            return self.bv_sext(inner, n + m);
        }
        self.mk(Op::BvSext(n), vec![t])
    }

    // ---- shifts and rotates ----

    /// Left shift; a concrete amount lowers to extract-and-pad.
    pub fn bv_shl(&mut self, a: Term, b: Term) -> Term {
        let w = a.sort().as_bv();
        if let Some(n) = b.as_bv_opt() {
            return match n.uint().to_usize() {
                Some(n) if n == 0 => a,
                Some(n) if n < w => {
                    let kept = self.bv_extract(a, w - n - 1, 0);
                    let pad = self.bv_zero(n);
                    self.bv_concat(kept, pad)
                }
                _ => self.bv_zero(w),
            };
        }
        self.mk(Op::BvShl, vec![a, b])
    }

    /// Logical right shift; a concrete amount lowers to extract-and-extend.
    pub fn bv_lshr(&mut self, a: Term, b: Term) -> Term {
        let w = a.sort().as_bv();
        if let Some(n) = b.as_bv_opt() {
            return match n.uint().to_usize() {
                Some(n) if n == 0 => a,
                Some(n) if n < w => {
                    let kept = self.bv_extract(a, w - 1, n);
                    self.bv_uext(kept, n)
                }
                _ => self.bv_zero(w),
            };
        }
        let t = self.mk(Op::BvLshr, vec![a, b]);
        self.scalar_simplify(t)
    }

    /// Arithmetic right shift; a concrete amount lowers to sign extension.
    pub fn bv_ashr(&mut self, a: Term, b: Term) -> Term {
        let w = a.sort().as_bv();
        if let Some(n) = b.as_bv_opt() {
            let n = n.uint().to_usize().unwrap_or(w).min(w - 1);
            if n == 0 {
                return a;
            }
            let kept = self.bv_extract(a, w - 1, n);
            return self.bv_sext(kept, n);
        }
        self.mk(Op::BvAshr, vec![a, b])
    }

    /// Rotate left; a concrete amount lowers to a concat of slices.
    pub fn bv_rol(&mut self, a: Term, b: Term) -> Term {
        let w = a.sort().as_bv();
        if let Some(n) = b.as_bv_opt() {
            let n = (n.uint().clone() % Integer::from(w)).to_usize().unwrap();
            if n == 0 {
                return a;
            }
            let lo = self.bv_extract(a.clone(), w - n - 1, 0);
            let hi = self.bv_extract(a, w - 1, w - n);
            return self.bv_concat(lo, hi);
        }
        self.mk(Op::BvRol, vec![a, b])
    }

    /// Rotate right; a concrete amount lowers to a concat of slices.
    pub fn bv_ror(&mut self, a: Term, b: Term) -> Term {
        let w = a.sort().as_bv();
        if let Some(n) = b.as_bv_opt() {
            let n = (n.uint().clone() % Integer::from(w)).to_usize().unwrap();
            if n == 0 {
                return a;
            }
            let lo = self.bv_extract(a.clone(), n - 1, 0);
            let hi = self.bv_extract(a, w - 1, n);
            return self.bv_concat(lo, hi);
        }
        self.mk(Op::BvRor, vec![a, b])
    }

    // ---- division ----

    /// SMT-LIB `bvudiv`; a zero divisor yields all-ones, never an error.
    pub fn bv_udiv(&mut self, a: Term, b: Term) -> Term {
        if let Some(y) = b.as_bv_opt() {
            if *y.uint() == 1 {
                return a;
            }
            if let Some(x) = a.as_bv_opt() {
                return self.constant(Value::BitVec(x.udiv(y)));
            }
        }
        let t = self.mk(Op::BvUdiv, vec![a, b]);
        self.scalar_simplify(t)
    }

    /// SMT-LIB `bvurem`; a zero divisor yields the dividend.
    pub fn bv_urem(&mut self, a: Term, b: Term) -> Term {
        if let Some(y) = b.as_bv_opt() {
            if *y.uint() == 1 {
                let w = y.width();
                return self.bv_zero(w);
            }
            if let Some(x) = a.as_bv_opt() {
                return self.constant(Value::BitVec(x.urem(y)));
            }
        }
        let t = self.mk(Op::BvUrem, vec![a, b]);
        self.scalar_simplify(t)
    }

    pub fn bv_sdiv(&mut self, a: Term, b: Term) -> Term {
        if let (Some(x), Some(y)) = (a.as_bv_opt(), b.as_bv_opt()) {
            return self.constant(Value::BitVec(x.sdiv(y)));
        }
        self.mk(Op::BvSdiv, vec![a, b])
    }

    pub fn bv_srem(&mut self, a: Term, b: Term) -> Term {
        if let (Some(x), Some(y)) = (a.as_bv_opt(), b.as_bv_opt()) {
            return self.constant(Value::BitVec(x.srem(y)));
        }
        self.mk(Op::BvSrem, vec![a, b])
    }

    // ---- comparisons ----

    pub fn bv_ult(&mut self, a: Term, b: Term) -> Term {
        match a.aval().as_bv().check_ult(b.aval().as_bv()) {
            Tristate::True => self.tru(),
            Tristate::False => self.fls(),
            Tristate::Unknown => {
                if a == b {
                    return self.fls();
                }
                self.mk(Op::BvUlt, vec![a, b])
            }
        }
    }

    pub fn bv_ule(&mut self, a: Term, b: Term) -> Term {
        let lt = self.bv_ult(b, a);
        self.not(lt)
    }

    pub fn bv_ugt(&mut self, a: Term, b: Term) -> Term {
        self.bv_ult(b, a)
    }

    pub fn bv_uge(&mut self, a: Term, b: Term) -> Term {
        self.bv_ule(b, a)
    }

    pub fn bv_slt(&mut self, a: Term, b: Term) -> Term {
        match a.aval().as_bv().check_slt(b.aval().as_bv()) {
            Tristate::True => self.tru(),
            Tristate::False => self.fls(),
            Tristate::Unknown => {
                if a == b {
                    return self.fls();
                }
                self.mk(Op::BvSlt, vec![a, b])
            }
        }
    }

    pub fn bv_sle(&mut self, a: Term, b: Term) -> Term {
        let lt = self.bv_slt(b, a);
        self.not(lt)
    }

    pub fn bv_sgt(&mut self, a: Term, b: Term) -> Term {
        self.bv_slt(b, a)
    }

    pub fn bv_sge(&mut self, a: Term, b: Term) -> Term {
        self.bv_sle(b, a)
    }

    // ---- bits ----

    /// Test of bit `i`.
    pub fn bv_bit(&mut self, t: Term, i: usize) -> Term {
        if let Some(b) = t.as_bv_opt() {
            return self.bool_lit(b.bit(i));
        }
        let node = self.mk(Op::BvBit(i), vec![t]);
        self.bool_simplify(node)
    }

    /// `fill(p)`: every bit set to the boolean `p`.
    pub fn bv_fill(&mut self, p: Term, w: usize) -> Term {
        if let Some(b) = p.as_bool_opt() {
            return if b { self.bv_ones(w) } else { self.bv_zero(w) };
        }
        self.mk(Op::BvFill(w), vec![p])
    }

    /// Write `p` at bit `i`, expressed as masked xor so that repeated
    /// writes to the same bit cancel or collapse in the xor-sum.
    pub fn bv_set(&mut self, v: Term, i: usize, p: Term) -> Term {
        let w = v.sort().as_bv();
        assert!(i < w, "bit {} of (bv {})", i, w);
        let mask = BitVec::new(Integer::from(1) << i as u32, w);
        let not_mask = !mask.clone();
        let keep_mask = self.constant(Value::BitVec(not_mask));
        let kept = self.bv_and(v, keep_mask);
        let fill = self.bv_fill(p, w);
        let mask_t = self.constant(Value::BitVec(mask));
        let written = self.bv_and(fill, mask_t);
        self.bv_xor(kept, written)
    }

    pub fn bv_popcount(&mut self, t: Term) -> Term {
        if let Some(b) = t.as_bv_opt() {
            let w = b.width();
            return self.bv_lit(b.popcount(), w);
        }
        let node = self.mk(Op::BvPopcount, vec![t]);
        self.scalar_simplify(node)
    }

    pub fn bv_clz(&mut self, t: Term) -> Term {
        if let Some(b) = t.as_bv_opt() {
            let w = b.width();
            return self.bv_lit(b.clz(), w);
        }
        let node = self.mk(Op::BvClz, vec![t]);
        self.scalar_simplify(node)
    }

    pub fn bv_ctz(&mut self, t: Term) -> Term {
        if let Some(b) = t.as_bv_opt() {
            let w = b.width();
            return self.bv_lit(b.ctz(), w);
        }
        let node = self.mk(Op::BvCtz, vec![t]);
        self.scalar_simplify(node)
    }

    /// Fold a boolean-sorted node to a constant when its tristate resolved.
    pub(crate) fn bool_simplify(&mut self, t: Term) -> Term {
        if t.as_const().is_none() {
            if let Some(b) = t.aval().as_bool().as_bool() {
                return self.bool_lit(b);
            }
        }
        t
    }
}
