//! Quantifiers, function symbols, and capture-free substitution.
//!
//! Binders are nonce-unique bound-variable terms, so substituting function
//! arguments or hoisting bodies can never capture: no two binding sites
//! share an identity. Substitution rebuilds every affected node through the
//! public constructors, so sums re-canonicalize and folds re-fire when
//! arguments become constants.

use super::Builder;
use crate::sort::Sort;
use crate::term::eval::as_concrete;
use crate::term::{
    mentions, FnDef, FnDefData, Op, PostOrderIter, QuantKind, Term, TermMap, UnfoldPolicy,
};

impl Builder {
    pub fn forall(&mut self, var: Term, body: Term) -> Term {
        self.quant(QuantKind::Forall, var, body)
    }

    pub fn exists(&mut self, var: Term, body: Term) -> Term {
        self.quant(QuantKind::Exists, var, body)
    }

    /// A body that never mentions its binder quantifies to itself.
    pub fn quant(&mut self, q: QuantKind, var: Term, body: Term) -> Term {
        if !mentions(&body, &var) {
            return body;
        }
        self.mk(Op::Quant(q), vec![var, body])
    }

    /// A defined function symbol. The parameters must be bound variables
    /// created by [Builder::bound_var] and the body may mention only them.
    pub fn define_fun(
        &mut self,
        name: impl Into<String>,
        params: Vec<Term>,
        body: Term,
        policy: UnfoldPolicy,
    ) -> FnDef {
        assert!(
            params.iter().all(|p| matches!(p.op(), Op::BoundVar(..))),
            "function parameters must be bound variables"
        );
        let ret = body.sort().clone();
        let f = FnDef::new(FnDefData {
            id: self.fresh_nonce(),
            name: name.into(),
            params,
            ret,
            body: Some(body),
            policy,
        });
        self.emit(super::BuilderEvent::FnDefined(f.clone()));
        f
    }

    /// An uninterpreted function symbol.
    pub fn uninterp_fun(
        &mut self,
        name: impl Into<String>,
        args: Vec<Sort>,
        ret: Sort,
    ) -> FnDef {
        let name = name.into();
        let params = args
            .into_iter()
            .enumerate()
            .map(|(i, s)| self.bound_var(format!("{}%{}", name, i), s))
            .collect();
        let f = FnDef::new(FnDefData {
            id: self.fresh_nonce(),
            name,
            params,
            ret,
            body: None,
            policy: UnfoldPolicy::Never,
        });
        self.emit(super::BuilderEvent::FnDefined(f.clone()));
        f
    }

    /// Application. Defined functions unfold according to their policy (or
    /// the builder-wide override): always, never, or once every argument
    /// passes the ground test.
    pub fn apply(&mut self, f: FnDef, args: Vec<Term>) -> Term {
        let policy = self.opts.unfold_override.unwrap_or_else(|| f.policy());
        if let Some(body) = f.body() {
            let unfold = match policy {
                UnfoldPolicy::Always => true,
                UnfoldPolicy::Never => false,
                UnfoldPolicy::WhenConcrete => args.iter().all(|a| as_concrete(a).is_some()),
            };
            if unfold {
                let mut map = TermMap::default();
                for (p, a) in f.params().iter().zip(&args) {
                    map.insert(p.clone(), a.clone());
                }
                let body = body.clone();
                return self.substitute(&body, &map);
            }
        }
        self.mk(Op::Apply(f), args)
    }

    /// Replace the keys of `map` throughout `t`, rebuilding every affected
    /// node through the smart constructors.
    pub fn substitute(&mut self, t: &Term, map: &TermMap<Term>) -> Term {
        let mut cache: TermMap<Term> = map.clone();
        for node in PostOrderIter::new(t.clone()) {
            if cache.contains_key(&node) {
                continue;
            }
            let new_cs: Vec<Term> = node
                .cs()
                .iter()
                .map(|c| cache.get(c).unwrap().clone())
                .collect();
            let new = if new_cs[..] == *node.cs() {
                node.clone()
            } else {
                self.rebuild(node.op(), new_cs)
            };
            cache.insert(node, new);
        }
        cache.get(t).unwrap().clone()
    }

    fn mul_by_sort(&mut self, sort: &Sort, a: Term, b: Term) -> Term {
        match sort {
            Sort::Int => self.int_mul(a, b),
            Sort::Real => self.real_mul(a, b),
            Sort::BitVec(_) => self.bv_mul(a, b),
            s => panic!("product over non-semiring sort {}", s),
        }
    }

    /// Re-apply the constructor for `op` to fresh children.
    pub(crate) fn rebuild(&mut self, op: &Op, mut cs: Vec<Term>) -> Term {
        match op {
            Op::Var(..) | Op::BoundVar(..) | Op::Const(_) => self.mk(op.clone(), cs),

            Op::Ite => {
                let (e, t, c) = (cs.pop().unwrap(), cs.pop().unwrap(), cs.pop().unwrap());
                self.ite(c, t, e)
            }
            Op::Eq => {
                let (y, x) = (cs.pop().unwrap(), cs.pop().unwrap());
                self.eq(x, y)
            }
            Op::Not => self.not(cs.pop().unwrap()),
            Op::And => self.and_all(cs),

            Op::IntLe => {
                let (b, a) = (cs.pop().unwrap(), cs.pop().unwrap());
                self.int_le(a, b)
            }
            Op::RealLe => {
                let (b, a) = (cs.pop().unwrap(), cs.pop().unwrap());
                self.real_le(a, b)
            }
            Op::RealIsInt => {
                let a = cs.pop().unwrap();
                self.real_is_int(a)
            }
            Op::BvUlt => {
                let (b, a) = (cs.pop().unwrap(), cs.pop().unwrap());
                self.bv_ult(a, b)
            }
            Op::BvSlt => {
                let (b, a) = (cs.pop().unwrap(), cs.pop().unwrap());
                self.bv_slt(a, b)
            }
            Op::BvBit(i) => {
                let a = cs.pop().unwrap();
                self.bv_bit(a, *i)
            }

            Op::IntSum(coeffs, k) => {
                let mut acc = crate::algebra::LinComb::constant(crate::algebra::IntRing, k.clone());
                for (c, x) in coeffs.iter().zip(&cs) {
                    acc = acc.add(&self.int_lincomb(x).scale(c));
                }
                self.from_int_lincomb(acc)
            }
            Op::RealSum(coeffs, k) => {
                let mut acc =
                    crate::algebra::LinComb::constant(crate::algebra::RealRing, k.clone());
                for (c, x) in coeffs.iter().zip(&cs) {
                    acc = acc.add(&self.real_lincomb(x).scale(c));
                }
                self.from_real_lincomb(acc)
            }
            Op::BvSum(coeffs, k) => {
                let ring = crate::algebra::BvArith(k.width());
                let mut acc = crate::algebra::LinComb::constant(ring, k.clone());
                for (c, x) in coeffs.iter().zip(&cs) {
                    acc = acc.add(&self.bv_lincomb(x).scale(c));
                }
                self.from_bv_lincomb(acc)
            }
            Op::BvXorSum(coeffs, k) => {
                let ring = crate::algebra::BvXor(k.width());
                let mut acc = crate::algebra::LinComb::constant(ring, k.clone());
                for (c, x) in coeffs.iter().zip(&cs) {
                    acc = acc.add(&self.bv_xor_lincomb(x).scale(c));
                }
                self.from_bv_xor_lincomb(acc)
            }
            Op::Prod(counts) => {
                let sort = cs[0].sort().clone();
                let mut acc: Option<Term> = None;
                for (n, x) in counts.iter().zip(&cs) {
                    for _ in 0..*n {
                        acc = Some(match acc {
                            None => x.clone(),
                            Some(a) => self.mul_by_sort(&sort, a, x.clone()),
                        });
                    }
                }
                acc.expect("empty product node")
            }

            Op::IntDiv => {
                let (b, a) = (cs.pop().unwrap(), cs.pop().unwrap());
                self.int_div(a, b)
            }
            Op::IntMod => {
                let (b, a) = (cs.pop().unwrap(), cs.pop().unwrap());
                self.int_mod(a, b)
            }
            Op::RealDiv => {
                let (b, a) = (cs.pop().unwrap(), cs.pop().unwrap());
                self.real_div(a, b)
            }
            Op::RealSqrt => {
                let a = cs.pop().unwrap();
                self.real_sqrt(a)
            }
            Op::IntToReal => {
                let a = cs.pop().unwrap();
                self.int_to_real(a)
            }
            Op::RealToInt => {
                let a = cs.pop().unwrap();
                self.real_to_int(a)
            }
            Op::IntToBv(w) => {
                let a = cs.pop().unwrap();
                self.int_to_bv(a, *w)
            }
            Op::UbvToInt => {
                let a = cs.pop().unwrap();
                self.ubv_to_int(a)
            }
            Op::SbvToInt => {
                let a = cs.pop().unwrap();
                self.sbv_to_int(a)
            }

            Op::BvConcat => self.bv_concat_all(cs),
            Op::BvExtract(h, l) => {
                let a = cs.pop().unwrap();
                self.bv_extract(a, *h, *l)
            }
            Op::BvUdiv => {
                let (b, a) = (cs.pop().unwrap(), cs.pop().unwrap());
                self.bv_udiv(a, b)
            }
            Op::BvUrem => {
                let (b, a) = (cs.pop().unwrap(), cs.pop().unwrap());
                self.bv_urem(a, b)
            }
            Op::BvSdiv => {
                let (b, a) = (cs.pop().unwrap(), cs.pop().unwrap());
                self.bv_sdiv(a, b)
            }
            Op::BvSrem => {
                let (b, a) = (cs.pop().unwrap(), cs.pop().unwrap());
                self.bv_srem(a, b)
            }
            Op::BvShl => {
                let (b, a) = (cs.pop().unwrap(), cs.pop().unwrap());
                self.bv_shl(a, b)
            }
            Op::BvLshr => {
                let (b, a) = (cs.pop().unwrap(), cs.pop().unwrap());
                self.bv_lshr(a, b)
            }
            Op::BvAshr => {
                let (b, a) = (cs.pop().unwrap(), cs.pop().unwrap());
                self.bv_ashr(a, b)
            }
            Op::BvRol => {
                let (b, a) = (cs.pop().unwrap(), cs.pop().unwrap());
                self.bv_rol(a, b)
            }
            Op::BvRor => {
                let (b, a) = (cs.pop().unwrap(), cs.pop().unwrap());
                self.bv_ror(a, b)
            }
            Op::BvUext(n) => {
                let a = cs.pop().unwrap();
                self.bv_uext(a, *n)
            }
            Op::BvSext(n) => {
                let a = cs.pop().unwrap();
                self.bv_sext(a, *n)
            }
            Op::BvAnd => self.bv_and_all(cs),
            Op::BvOr => self.bv_or_all(cs),
            Op::BvPopcount => {
                let a = cs.pop().unwrap();
                self.bv_popcount(a)
            }
            Op::BvClz => {
                let a = cs.pop().unwrap();
                self.bv_clz(a)
            }
            Op::BvCtz => {
                let a = cs.pop().unwrap();
                self.bv_ctz(a)
            }
            Op::BvFill(w) => {
                let p = cs.pop().unwrap();
                self.bv_fill(p, *w)
            }

            Op::FpBinOp(_) | Op::FpUnOp(_) | Op::FpFma | Op::FpBinPred(_) | Op::FpUnPred(_)
            | Op::BvToFp(..) | Op::FpToBv | Op::UbvToFp(..) | Op::SbvToFp(..)
            | Op::FpToFp(..) => self.mk_fold(op.clone(), cs),

            Op::StrConcat => self.str_concat_all(cs),
            Op::StrLen => {
                let a = cs.pop().unwrap();
                self.str_len(a)
            }
            Op::StrContains => {
                let (b, a) = (cs.pop().unwrap(), cs.pop().unwrap());
                self.str_contains(a, b)
            }
            Op::StrPrefixOf => {
                let (b, a) = (cs.pop().unwrap(), cs.pop().unwrap());
                self.str_prefix_of(a, b)
            }
            Op::StrSuffixOf => {
                let (b, a) = (cs.pop().unwrap(), cs.pop().unwrap());
                self.str_suffix_of(a, b)
            }
            Op::StrIndexOf => {
                let (f, n, s) = (cs.pop().unwrap(), cs.pop().unwrap(), cs.pop().unwrap());
                self.str_index_of(s, n, f)
            }
            Op::StrSubstr => {
                let (n, o, s) = (cs.pop().unwrap(), cs.pop().unwrap(), cs.pop().unwrap());
                self.str_substr(s, o, n)
            }

            Op::ConstArray(ks) => {
                let d = cs.pop().unwrap();
                self.const_array(ks.clone(), d)
            }
            Op::Select => {
                let a = cs.remove(0);
                self.select(a, cs)
            }
            Op::Store => {
                let v = cs.pop().unwrap();
                let a = cs.remove(0);
                self.store(a, cs, v)
            }
            Op::ArrayEq => {
                let (b, a) = (cs.pop().unwrap(), cs.pop().unwrap());
                self.array_eq(a, b)
            }
            Op::ArrayMap(f) => self.array_map(f.clone(), cs),
            Op::ArrayCopy => {
                let (n, j, src, i, dst) = (
                    cs.pop().unwrap(),
                    cs.pop().unwrap(),
                    cs.pop().unwrap(),
                    cs.pop().unwrap(),
                    cs.pop().unwrap(),
                );
                self.array_copy(dst, i, src, j, n)
            }
            Op::ArraySet => {
                let (n, v, i, a) = (
                    cs.pop().unwrap(),
                    cs.pop().unwrap(),
                    cs.pop().unwrap(),
                    cs.pop().unwrap(),
                );
                self.array_set(a, i, v, n)
            }
            Op::ArrayRangeEq => {
                let (n, i, b, a) = (
                    cs.pop().unwrap(),
                    cs.pop().unwrap(),
                    cs.pop().unwrap(),
                    cs.pop().unwrap(),
                );
                self.array_range_eq(a, b, i, n)
            }

            Op::Tuple => self.tuple(cs),
            Op::Field(i) => {
                let a = cs.pop().unwrap();
                self.field(a, *i)
            }

            Op::Apply(f) => self.apply(f.clone(), cs),
            Op::Quant(q) => {
                let (body, var) = (cs.pop().unwrap(), cs.pop().unwrap());
                self.quant(*q, var, body)
            }
            Op::Annot(id) => self.mk(Op::Annot(*id), cs),
        }
    }
}
