//! The term builder: constructors, folding, normalization, interning.
//!
//! A [Builder] owns its intern table and identifier counters; terms from
//! different builders never share identities. Every observable constructor
//! routes through [Builder::mk], which checks sorts, computes the abstract
//! value, and interns. Construction is deterministic: the same call sequence
//! from a fresh builder yields the same identifiers.

use fxhash::FxHashMap;
use hashconsing::{HConsign, HashConsign};
use log::debug;
use rug::Integer;

use std::collections::BTreeSet;

mod arith;
mod arr;
mod bvops;
mod fp;
mod quant;
mod strs;

#[cfg(test)]
mod test;

use crate::absdom::{AbsVal, BvDomain, IntRange, Tristate};
use crate::algebra::{LinComb, Prod, Semiring};
use crate::err::{BuildError, Result};
use crate::sort::Sort;
use crate::term::eval::as_concrete;
use crate::term::{absint, ty, FnDef, Op, Term, TermData, UnfoldPolicy};
use crate::value::Value;

/// A synchronous notification from the builder. The callback must not
/// re-enter the builder.
#[derive(Clone, Debug)]
pub enum BuilderEvent {
    VarCreated(Term),
    FnDefined(FnDef),
    Annotated(u64, Term),
}

/// Option store consulted by the builder at operation time.
#[derive(Default)]
pub struct Opts {
    /// Overrides every function symbol's unfold policy when set.
    pub unfold_override: Option<UnfoldPolicy>,
    options: FxHashMap<String, String>,
}

impl Opts {
    pub fn set_option(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.options.insert(key.into(), value.into());
    }

    pub fn get_option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }
}

pub struct Builder {
    table: HConsign<TermData>,
    /// Nonce counter for bound variables, annotations, and function symbols.
    next_nonce: u64,
    pub opts: Opts,
    listener: Option<Box<dyn FnMut(&BuilderEvent)>>,
}

impl Default for Builder {
    fn default() -> Self {
        Builder::new()
    }
}

impl Builder {
    pub fn new() -> Builder {
        Builder {
            table: HConsign::empty(),
            next_nonce: 0,
            opts: Opts::default(),
            listener: None,
        }
    }

    pub fn with_opts(opts: Opts) -> Builder {
        Builder {
            opts,
            ..Builder::new()
        }
    }

    /// Install the solver-event listener. Invoked synchronously; it must not
    /// call back into this builder.
    pub fn set_listener(&mut self, l: impl FnMut(&BuilderEvent) + 'static) {
        self.listener = Some(Box::new(l));
    }

    fn emit(&mut self, ev: BuilderEvent) {
        if let Some(l) = &mut self.listener {
            l(&ev);
        }
    }

    pub(crate) fn fresh_nonce(&mut self) -> u64 {
        let n = self.next_nonce;
        self.next_nonce += 1;
        n
    }

    /// Intern `(op cs…)`. Panics with a rendered sort error on misuse.
    #[track_caller]
    pub(crate) fn mk(&mut self, op: Op, cs: Vec<Term>) -> Term {
        self.mk_with_aval(op, cs, None)
    }

    /// Intern with an abstract-value override (used by bounded variables).
    /// The override only applies when the node is new; re-interning an
    /// existing structure keeps its original abstract value.
    #[track_caller]
    pub(crate) fn mk_with_aval(&mut self, op: Op, cs: Vec<Term>, aval: Option<AbsVal>) -> Term {
        let sort = match ty::sort_of(&op, &cs) {
            Ok(s) => s,
            Err(e) => panic!("{}", e),
        };
        let aval = aval.unwrap_or_else(|| absint::aval_of(&op, &cs, &sort));
        self.table.mk(TermData::new(op, cs, sort, aval))
    }

    // ---- leaves ----

    pub fn constant(&mut self, v: Value) -> Term {
        self.mk(Op::Const(v), Vec::new())
    }

    /// Lift a ground value back into a term.
    pub fn from_concrete(&mut self, v: &Value) -> Term {
        self.constant(v.clone())
    }

    pub fn bool_lit(&mut self, b: bool) -> Term {
        self.constant(Value::Bool(b))
    }

    pub fn tru(&mut self) -> Term {
        self.bool_lit(true)
    }

    pub fn fls(&mut self) -> Term {
        self.bool_lit(false)
    }

    /// A free variable. Re-declaring a name at the same sort returns the
    /// original term (with its original abstract value).
    pub fn var(&mut self, name: impl Into<String>, sort: Sort) -> Term {
        let t = self.mk(Op::Var(name.into(), sort), Vec::new());
        debug!("var {}", t.get());
        self.emit(BuilderEvent::VarCreated(t.clone()));
        t
    }

    /// A fresh integer variable known to lie in `[lo, hi]`.
    pub fn bounded_int_var(
        &mut self,
        name: impl Into<String>,
        lo: Integer,
        hi: Integer,
    ) -> Result<Term> {
        if lo > hi {
            return Err(BuildError::InvalidRange {
                sort: Sort::Int,
                lo,
                hi,
            });
        }
        let aval = AbsVal::Int(IntRange::new(Some(lo), Some(hi)));
        let t = self.mk_with_aval(Op::Var(name.into(), Sort::Int), Vec::new(), Some(aval));
        self.emit(BuilderEvent::VarCreated(t.clone()));
        Ok(t)
    }

    /// A fresh width-`w` bit-vector variable with an unsigned range.
    pub fn bounded_bv_var(
        &mut self,
        name: impl Into<String>,
        w: usize,
        lo: Integer,
        hi: Integer,
    ) -> Result<Term> {
        if lo > hi || lo < 0 || (hi.significant_bits() as usize) > w {
            return Err(BuildError::InvalidRange {
                sort: Sort::BitVec(w),
                lo,
                hi,
            });
        }
        let aval = AbsVal::Bv(BvDomain::from_interval(w, lo, hi));
        let t = self.mk_with_aval(Op::Var(name.into(), Sort::BitVec(w)), Vec::new(), Some(aval));
        self.emit(BuilderEvent::VarCreated(t.clone()));
        Ok(t)
    }

    /// A binder-unique variable for quantifier and function bodies.
    pub fn bound_var(&mut self, name: impl Into<String>, sort: Sort) -> Term {
        let nonce = self.fresh_nonce();
        self.mk(Op::BoundVar(nonce, name.into(), sort), Vec::new())
    }

    // ---- booleans ----

    pub fn not(&mut self, x: Term) -> Term {
        if let Some(b) = x.as_bool_opt() {
            return self.bool_lit(!b);
        }
        if let Op::Not = x.op() {
            return x.cs()[0].clone();
        }
        self.mk(Op::Not, vec![x])
    }

    pub fn and(&mut self, a: Term, b: Term) -> Term {
        self.and_all(vec![a, b])
    }

    /// N-ary conjunction: flattens, folds constants, deduplicates, and
    /// detects complementary pairs.
    pub fn and_all(&mut self, xs: Vec<Term>) -> Term {
        let mut set: BTreeSet<Term> = BTreeSet::new();
        for x in xs {
            if let Op::And = x.op() {
                for c in x.cs() {
                    match c.as_bool_opt() {
                        Some(false) => return self.fls(),
                        Some(true) => {}
                        None => {
                            set.insert(c.clone());
                        }
                    }
                }
            } else {
                match x.as_bool_opt() {
                    Some(false) => return self.fls(),
                    Some(true) => {}
                    None => {
                        set.insert(x);
                    }
                }
            }
        }
        // x and ¬x cannot both hold
        for x in &set {
            if let Op::Not = x.op() {
                if set.contains(&x.cs()[0]) {
                    return self.fls();
                }
            }
        }
        match set.len() {
            0 => self.tru(),
            1 => set.into_iter().next().unwrap(),
            _ => self.mk(Op::And, set.into_iter().collect()),
        }
    }

    pub fn or(&mut self, a: Term, b: Term) -> Term {
        self.or_all(vec![a, b])
    }

    pub fn or_all(&mut self, xs: Vec<Term>) -> Term {
        let negs = xs.into_iter().map(|x| self.not(x)).collect();
        let conj = self.and_all(negs);
        self.not(conj)
    }

    pub fn implies(&mut self, a: Term, b: Term) -> Term {
        let nb = self.not(b);
        let both = self.and(a, nb);
        self.not(both)
    }

    pub fn iff(&mut self, a: Term, b: Term) -> Term {
        let ab = self.implies(a.clone(), b.clone());
        let ba = self.implies(b, a);
        self.and(ab, ba)
    }

    pub fn xor(&mut self, a: Term, b: Term) -> Term {
        let same = self.iff(a, b);
        self.not(same)
    }

    // ---- equality ----

    /// Equality, dispatched on sort.
    #[track_caller]
    pub fn eq(&mut self, x: Term, y: Term) -> Term {
        assert_eq!(
            x.sort(),
            y.sort(),
            "equality between {} and {}",
            x.sort(),
            y.sort()
        );
        if x == y {
            return self.tru();
        }
        match x.sort().clone() {
            Sort::Bool => self.iff(x, y),
            Sort::Tuple(fields) => {
                let eqs = (0..fields.len())
                    .map(|i| {
                        let fx = self.field(x.clone(), i);
                        let fy = self.field(y.clone(), i);
                        self.eq(fx, fy)
                    })
                    .collect();
                self.and_all(eqs)
            }
            Sort::Array(..) => self.array_eq(x, y),
            _ => {
                if let (Some(a), Some(b)) = (x.as_const(), y.as_const()) {
                    return self.bool_lit(a == b);
                }
                match x.aval().check_eq(y.aval()) {
                    Tristate::True => self.tru(),
                    Tristate::False => self.fls(),
                    Tristate::Unknown => {
                        let (x, y) = if x.uid() <= y.uid() { (x, y) } else { (y, x) };
                        self.mk(Op::Eq, vec![x, y])
                    }
                }
            }
        }
    }

    // ---- if-then-else ----

    /// `ite(c, t, e)` over any sort, with boolean rewrites, common sub-sum
    /// and sub-product extraction, and struct push-down.
    pub fn ite(&mut self, c: Term, t: Term, e: Term) -> Term {
        if let Some(b) = c.as_bool_opt() {
            return if b { t } else { e };
        }
        if t == e {
            return t;
        }
        if let Op::Not = c.op() {
            let inner = c.cs()[0].clone();
            return self.ite(inner, e, t);
        }
        match t.sort().clone() {
            Sort::Bool => self.ite_bool(c, t, e),
            Sort::Int => {
                let lt = self.int_lincomb(&t);
                let le = self.int_lincomb(&e);
                match self.ite_sum_fuse(&c, lt, le, Self::from_int_lincomb) {
                    Some(r) => r,
                    None => self.ite_prod_or_wrap(c, t, e),
                }
            }
            Sort::Real => {
                let lt = self.real_lincomb(&t);
                let le = self.real_lincomb(&e);
                match self.ite_sum_fuse(&c, lt, le, Self::from_real_lincomb) {
                    Some(r) => r,
                    None => self.ite_prod_or_wrap(c, t, e),
                }
            }
            Sort::BitVec(_) => {
                if matches!(t.op(), Op::BvXorSum(..)) && matches!(e.op(), Op::BvXorSum(..)) {
                    let lt = self.bv_xor_lincomb(&t);
                    let le = self.bv_xor_lincomb(&e);
                    if let Some(r) = self.ite_sum_fuse(&c, lt, le, Self::from_bv_xor_lincomb) {
                        return r;
                    }
                }
                let lt = self.bv_lincomb(&t);
                let le = self.bv_lincomb(&e);
                match self.ite_sum_fuse(&c, lt, le, Self::from_bv_lincomb) {
                    Some(r) => r,
                    None => self.ite_prod_or_wrap(c, t, e),
                }
            }
            Sort::Tuple(fields) => {
                let cs = (0..fields.len())
                    .map(|i| {
                        let ft = self.field(t.clone(), i);
                        let fe = self.field(e.clone(), i);
                        self.ite(c.clone(), ft, fe)
                    })
                    .collect();
                self.mk(Op::Tuple, cs)
            }
            _ => self.mk(Op::Ite, vec![c, t, e]),
        }
    }

    fn ite_bool(&mut self, c: Term, t: Term, e: Term) -> Term {
        match (t.as_bool_opt(), e.as_bool_opt()) {
            (Some(true), _) => self.or(c, e),
            (Some(false), _) => {
                let nc = self.not(c);
                self.and(nc, e)
            }
            (_, Some(true)) => {
                let nc = self.not(c);
                self.or(nc, t)
            }
            (_, Some(false)) => self.and(c, t),
            _ => self.mk(Op::Ite, vec![c, t, e]),
        }
    }

    /// Shared part of two sum decompositions, hoisted out of the ite:
    /// `ite(c, z + t', z + e') = z + ite(c, t', e')`.
    fn ite_sum_fuse<R: Semiring>(
        &mut self,
        c: &Term,
        lt: LinComb<R>,
        le: LinComb<R>,
        from: impl Fn(&mut Self, LinComb<R>) -> Term,
    ) -> Option<Term> {
        let ring = lt.ring().clone();
        let (z, t2, e2) = LinComb::extract_common(&lt, &le);
        if z.is_empty() && ring.is_zero(z.offset()) {
            return None;
        }
        let ti = from(self, t2);
        let ei = from(self, e2);
        let inner = self.ite(c.clone(), ti, ei);
        let fused = z.add(&LinComb::var(ring, inner));
        Some(from(self, fused))
    }

    /// Product-form extraction for monomial-valued arms; falls back to a
    /// plain wrapped `ite` whose abstract value is the join of the arms.
    fn ite_prod_or_wrap(&mut self, c: Term, t: Term, e: Term) -> Term {
        if let (Op::Prod(_), Op::Prod(_)) = (t.op(), e.op()) {
            match t.sort().clone() {
                Sort::Int => {
                    let pt = self.int_prod(&t);
                    let pe = self.int_prod(&e);
                    if let Some(r) = self.ite_prod_fuse(&c, pt, pe, Self::from_int_prod) {
                        return r;
                    }
                }
                Sort::Real => {
                    let pt = self.real_prod(&t);
                    let pe = self.real_prod(&e);
                    if let Some(r) = self.ite_prod_fuse(&c, pt, pe, Self::from_real_prod) {
                        return r;
                    }
                }
                Sort::BitVec(_) => {
                    let pt = self.bv_prod(&t);
                    let pe = self.bv_prod(&e);
                    if let Some(r) = self.ite_prod_fuse(&c, pt, pe, Self::from_bv_prod) {
                        return r;
                    }
                }
                _ => {}
            }
        }
        self.mk(Op::Ite, vec![c, t, e])
    }

    fn ite_prod_fuse<R: Semiring>(
        &mut self,
        c: &Term,
        pt: Prod<R>,
        pe: Prod<R>,
        from: impl Fn(&mut Self, Prod<R>) -> Term,
    ) -> Option<Term> {
        let ring = pt.ring().clone();
        let (z, t2, e2) = Prod::extract_common(&pt, &pe);
        if z.is_identity() {
            return None;
        }
        let ti = from(self, t2);
        let ei = from(self, e2);
        let inner = self.ite(c.clone(), ti, ei);
        let fused = z.mul(&Prod::var(ring, inner));
        Some(from(self, fused))
    }

    /// `min`/`max` over an ordered sort, given the matching `<=` predicate.
    pub(crate) fn min_max_via_ite(&mut self, le: Term, a: Term, b: Term, min: bool) -> Term {
        if min {
            self.ite(le, a, b)
        } else {
            self.ite(le, b, a)
        }
    }

    // ---- annotation ----

    /// A term semantically equal to `x` at a fresh identity, plus its
    /// annotation id. Re-annotating an annotation returns the existing id.
    pub fn annotate(&mut self, x: Term) -> (u64, Term) {
        if let Op::Annot(id) = x.op() {
            let id = *id;
            return (id, x);
        }
        let id = self.fresh_nonce();
        let t = self.mk(Op::Annot(id), vec![x]);
        self.emit(BuilderEvent::Annotated(id, t.clone()));
        (id, t)
    }

    /// Ground projection; see [crate::term::eval::as_concrete].
    pub fn concrete(&self, t: &Term) -> Option<Value> {
        as_concrete(t)
    }
}
