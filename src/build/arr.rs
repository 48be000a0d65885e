//! Arrays and tuples.
//!
//! Select/store chains collapse through identity-equal or abstractly
//! disjoint indices; everything else wraps. `copy`, `set`, and `range-eq`
//! are primitive nodes apart from their length-zero degenerate cases.

use super::Builder;
use crate::absdom::Tristate;
use crate::sort::Sort;
use crate::term::{Op, Term};

/// A small concrete length, whichever index sort carries it.
fn const_len(n: &Term) -> Option<u64> {
    if let Some(i) = n.as_int_opt() {
        return if *i <= 0 { Some(0) } else { i.to_u64() };
    }
    if let Some(b) = n.as_bv_opt() {
        return b.uint().to_u64();
    }
    None
}

impl Builder {
    /// The array holding `default` at every index.
    pub fn const_array(&mut self, key_sorts: Vec<Sort>, default: Term) -> Term {
        self.mk(Op::ConstArray(key_sorts), vec![default])
    }

    /// `(select a i₁ … iₖ)`.
    #[track_caller]
    pub fn select(&mut self, a: Term, idxs: Vec<Term>) -> Term {
        match a.op() {
            // a constant array reads its default at any index
            Op::ConstArray(_) => return a.cs()[0].clone(),
            Op::Store => {
                let stored = a.cs();
                let base = stored[0].clone();
                let jdxs = &stored[1..stored.len() - 1];
                let v = stored[stored.len() - 1].clone();
                if jdxs == &idxs[..] {
                    return v;
                }
                // reads through a store at a provably different index
                let disjoint = jdxs.iter().zip(&idxs).any(|(j, i)| {
                    j.aval().check_eq(i.aval()) == Tristate::False
                });
                if disjoint {
                    return self.select(base, idxs);
                }
            }
            _ => {}
        }
        let mut cs = vec![a];
        cs.extend(idxs);
        let t = self.mk(Op::Select, cs);
        self.scalar_simplify(t)
    }

    /// `(store a i₁ … iₖ v)`.
    #[track_caller]
    pub fn store(&mut self, a: Term, idxs: Vec<Term>, v: Term) -> Term {
        // writing a constant array's default back is a no-op
        if let Op::ConstArray(_) = a.op() {
            if a.cs()[0] == v
                || a.cs()[0].aval().check_eq(v.aval()) == Tristate::True
            {
                return a;
            }
        }
        // the last write at an index wins
        if let Op::Store = a.op() {
            let stored = a.cs();
            let jdxs = &stored[1..stored.len() - 1];
            if jdxs == &idxs[..] {
                let base = stored[0].clone();
                return self.store(base, idxs, v);
            }
        }
        let mut cs = vec![a];
        cs.extend(idxs);
        cs.push(v);
        self.mk(Op::Store, cs)
    }

    /// Primitive equality on arrays.
    pub fn array_eq(&mut self, x: Term, y: Term) -> Term {
        if x == y {
            return self.tru();
        }
        if let (Some(a), Some(b)) = (self.concrete(&x), self.concrete(&y)) {
            return self.bool_lit(a == b);
        }
        match x.aval().check_eq(y.aval()) {
            Tristate::True => self.tru(),
            Tristate::False => self.fls(),
            Tristate::Unknown => {
                let (x, y) = if x.uid() <= y.uid() { (x, y) } else { (y, x) };
                self.mk(Op::ArrayEq, vec![x, y])
            }
        }
    }

    /// Pointwise application of `f` over same-shaped arrays; constant
    /// arrays map through their defaults.
    pub fn array_map(&mut self, f: crate::term::FnDef, arrays: Vec<Term>) -> Term {
        if arrays
            .iter()
            .all(|a| matches!(a.op(), Op::ConstArray(_)))
        {
            let key_sorts = arrays[0].sort().as_array().0.to_vec();
            let defaults: Vec<Term> = arrays.iter().map(|a| a.cs()[0].clone()).collect();
            let mapped = self.apply(f, defaults);
            return self.const_array(key_sorts, mapped);
        }
        self.mk(Op::ArrayMap(f), arrays)
    }

    /// `(copy dst i src j n)`: `n` elements of `src` starting at `j`,
    /// written into `dst` starting at `i`.
    pub fn array_copy(&mut self, dst: Term, i: Term, src: Term, j: Term, n: Term) -> Term {
        if const_len(&n) == Some(0) {
            return dst;
        }
        self.mk(Op::ArrayCopy, vec![dst, i, src, j, n])
    }

    /// `(set a i v n)`: `n` copies of `v` starting at `i`.
    pub fn array_set(&mut self, a: Term, i: Term, v: Term, n: Term) -> Term {
        match const_len(&n) {
            Some(0) => a,
            Some(1) => self.store(a, vec![i], v),
            _ => self.mk(Op::ArraySet, vec![a, i, v, n]),
        }
    }

    /// `(range-eq a b i n)`: the two arrays agree on `n` indices from `i`.
    pub fn array_range_eq(&mut self, a: Term, b: Term, i: Term, n: Term) -> Term {
        if a == b || const_len(&n) == Some(0) {
            return self.tru();
        }
        self.mk(Op::ArrayRangeEq, vec![a, b, i, n])
    }

    // ---- tuples ----

    pub fn tuple(&mut self, fields: Vec<Term>) -> Term {
        self.mk(Op::Tuple, fields)
    }

    /// Projection of field `i`; constructors project structurally.
    #[track_caller]
    pub fn field(&mut self, t: Term, i: usize) -> Term {
        if let Op::Tuple = t.op() {
            return t.cs()[i].clone();
        }
        let node = self.mk(Op::Field(i), vec![t]);
        self.scalar_simplify(node)
    }
}
