//! Abstract-value computation, one rule per operator.
//!
//! Run once per interned node, over the children's (already cached) abstract
//! values. Every rule is a sound over-approximation of the operator's
//! concrete semantics, including the unspecified-but-total results of
//! division by zero and friends.

use rug::{Integer, Rational};

use super::{Op, Term};
use crate::absdom::{AbsVal, BvDomain, IntRange, RealAbs, RealRange, Tristate};
use crate::sort::Sort;

/// The abstract value of `(op cs…)` at the given (already checked) sort.
pub fn aval_of(op: &Op, cs: &[Term], sort: &Sort) -> AbsVal {
    let a = |i: usize| cs[i].aval();
    match op {
        Op::Const(v) => AbsVal::singleton(v),
        Op::Var(..) | Op::BoundVar(..) => AbsVal::top(sort),

        Op::Ite => match a(0).as_bool() {
            Tristate::True => a(1).clone(),
            Tristate::False => a(2).clone(),
            Tristate::Unknown => a(1).join(a(2)),
        },
        Op::Eq => AbsVal::Bool(a(0).check_eq(a(1))),
        Op::Not => AbsVal::Bool(a(0).as_bool().not()),
        Op::And => AbsVal::Bool(
            cs.iter()
                .fold(Tristate::True, |acc, c| acc.and(c.aval().as_bool())),
        ),

        Op::IntLe => AbsVal::Bool(a(0).as_int().check_le(a(1).as_int())),
        Op::RealLe => AbsVal::Bool(a(0).as_real().range.check_le(&a(1).as_real().range)),
        Op::RealIsInt => AbsVal::Bool(a(0).as_real().is_int),
        Op::BvUlt => AbsVal::Bool(a(0).as_bv().check_ult(a(1).as_bv())),
        Op::BvSlt => AbsVal::Bool(a(0).as_bv().check_slt(a(1).as_bv())),
        Op::BvBit(i) => {
            let (known, val) = a(0).as_bv().known_bits();
            if known.get_bit(*i as u32) {
                AbsVal::Bool(Tristate::from_bool(val.get_bit(*i as u32)))
            } else {
                AbsVal::Bool(Tristate::Unknown)
            }
        }

        Op::IntSum(coeffs, k) => {
            let mut acc = IntRange::singleton(k.clone());
            for (c, x) in coeffs.iter().zip(cs) {
                acc = acc.add(&x.aval().as_int().scale(c));
            }
            AbsVal::Int(acc)
        }
        Op::RealSum(coeffs, k) => {
            let mut acc = RealAbs::singleton(k.clone());
            for (c, x) in coeffs.iter().zip(cs) {
                acc = acc.add(&x.aval().as_real().scale(c));
            }
            AbsVal::Real(acc)
        }
        Op::BvSum(coeffs, k) => {
            let mut acc = BvDomain::singleton(k);
            for (c, x) in coeffs.iter().zip(cs) {
                acc = acc.add(&x.aval().as_bv().mul(&BvDomain::singleton(c)));
            }
            AbsVal::Bv(acc)
        }
        Op::BvXorSum(coeffs, k) => {
            let mut acc = BvDomain::singleton(k);
            for (c, x) in coeffs.iter().zip(cs) {
                acc = acc.xor(&x.aval().as_bv().and(&BvDomain::singleton(c)));
            }
            AbsVal::Bv(acc)
        }
        Op::Prod(counts) => prod_aval(counts, cs, sort),

        Op::IntDiv => AbsVal::Int(a(0).as_int().div(a(1).as_int())),
        Op::IntMod => AbsVal::Int(int_mod_aval(a(0).as_int(), a(1).as_int())),
        Op::RealDiv => {
            let denom = a(1).as_real();
            match denom.as_singleton() {
                Some(q) if *q != 0 => {
                    let inv = Rational::from(q.recip_ref());
                    AbsVal::Real(a(0).as_real().scale(&inv))
                }
                _ => AbsVal::Real(RealAbs::top()),
            }
        }
        Op::RealSqrt => {
            let x = &a(0).as_real().range;
            let nonneg = match x.lo.value() {
                Some(l) => *l >= 0,
                None => false,
            };
            if nonneg {
                AbsVal::Real(RealAbs {
                    range: RealRange {
                        lo: crate::absdom::Bound::Closed(Rational::new()),
                        hi: crate::absdom::Bound::Unbounded,
                    },
                    is_int: Tristate::Unknown,
                })
            } else {
                AbsVal::Real(RealAbs::top())
            }
        }
        Op::IntToReal => {
            let r = a(0).as_int();
            AbsVal::Real(RealAbs {
                range: RealRange {
                    lo: r
                        .lo
                        .as_ref()
                        .map_or(crate::absdom::Bound::Unbounded, |l| {
                            crate::absdom::Bound::Closed(Rational::from(l))
                        }),
                    hi: r
                        .hi
                        .as_ref()
                        .map_or(crate::absdom::Bound::Unbounded, |h| {
                            crate::absdom::Bound::Closed(Rational::from(h))
                        }),
                },
                is_int: Tristate::True,
            })
        }
        Op::RealToInt => {
            let r = &a(0).as_real().range;
            AbsVal::Int(IntRange {
                lo: r.lo.value().map(|q| q.clone().floor().numer().clone()),
                hi: r.hi.value().map(|q| q.clone().floor().numer().clone()),
            })
        }
        Op::IntToBv(w) => {
            let r = a(0).as_int();
            match (&r.lo, &r.hi) {
                (Some(l), Some(h))
                    if *l >= 0 && (h.significant_bits() as usize) <= *w =>
                {
                    AbsVal::Bv(BvDomain::from_interval(*w, l.clone(), h.clone()))
                }
                _ => AbsVal::Bv(BvDomain::top(*w)),
            }
        }
        Op::UbvToInt => {
            let (lo, hi) = a(0).as_bv().interval();
            AbsVal::Int(IntRange::new(Some(lo.clone()), Some(hi.clone())))
        }
        Op::SbvToInt => {
            let (lo, hi) = a(0).as_bv().signed_interval();
            AbsVal::Int(IntRange::new(Some(lo), Some(hi)))
        }

        Op::BvConcat => {
            let mut it = cs.iter();
            let mut acc = it.next().unwrap().aval().as_bv().clone();
            for c in it {
                acc = acc.concat(c.aval().as_bv());
            }
            AbsVal::Bv(acc)
        }
        Op::BvExtract(high, low) => AbsVal::Bv(a(0).as_bv().extract(*high, *low)),
        Op::BvUdiv => {
            let (xlo, xhi) = a(0).as_bv().interval();
            let (ylo, yhi) = a(1).as_bv().interval();
            if *ylo > 0 {
                AbsVal::Bv(BvDomain::from_interval(
                    sort.as_bv(),
                    Integer::from(xlo / yhi),
                    Integer::from(xhi / ylo),
                ))
            } else {
                AbsVal::Bv(BvDomain::top(sort.as_bv()))
            }
        }
        Op::BvUrem => {
            let (_, xhi) = a(0).as_bv().interval();
            let (ylo, yhi) = a(1).as_bv().interval();
            // the result never exceeds the dividend; a non-zero divisor also
            // bounds it by divisor − 1
            let hi = if *ylo > 0 {
                xhi.clone().min(Integer::from(yhi - 1))
            } else {
                xhi.clone()
            };
            AbsVal::Bv(BvDomain::from_interval(sort.as_bv(), Integer::from(0), hi))
        }
        Op::BvLshr => {
            let (_, xhi) = a(0).as_bv().interval();
            AbsVal::Bv(BvDomain::from_interval(
                sort.as_bv(),
                Integer::from(0),
                xhi.clone(),
            ))
        }
        Op::BvSdiv | Op::BvSrem | Op::BvShl | Op::BvAshr | Op::BvRol | Op::BvRor => {
            AbsVal::top(sort)
        }
        Op::BvUext(n) => AbsVal::Bv(a(0).as_bv().uext(*n)),
        Op::BvSext(n) => {
            let d = a(0).as_bv();
            let w = d.width();
            let (_, hi) = d.interval();
            if (hi.significant_bits() as usize) < w {
                // sign bit is zero throughout: extension preserves the value
                AbsVal::Bv(d.uext(*n))
            } else {
                AbsVal::top(sort)
            }
        }
        Op::BvAnd => {
            let mut it = cs.iter();
            let mut acc = it.next().unwrap().aval().as_bv().clone();
            for c in it {
                acc = acc.and(c.aval().as_bv());
            }
            AbsVal::Bv(acc)
        }
        Op::BvOr => {
            let mut it = cs.iter();
            let mut acc = it.next().unwrap().aval().as_bv().clone();
            for c in it {
                acc = acc.or(c.aval().as_bv());
            }
            AbsVal::Bv(acc)
        }
        Op::BvPopcount => {
            let (lo, hi) = a(0).as_bv().popcount_range();
            AbsVal::Bv(BvDomain::from_interval(
                sort.as_bv(),
                Integer::from(lo),
                Integer::from(hi),
            ))
        }
        Op::BvClz | Op::BvCtz => AbsVal::Bv(BvDomain::from_interval(
            sort.as_bv(),
            Integer::from(0),
            Integer::from(sort.as_bv()),
        )),
        Op::BvFill(w) => match a(0).as_bool() {
            Tristate::True => AbsVal::Bv(BvDomain::singleton(&crate::bv::BitVec::ones(*w))),
            Tristate::False => AbsVal::Bv(BvDomain::singleton(&crate::bv::BitVec::zeros(*w))),
            Tristate::Unknown => AbsVal::Bv(
                BvDomain::singleton(&crate::bv::BitVec::ones(*w))
                    .join(&BvDomain::singleton(&crate::bv::BitVec::zeros(*w))),
            ),
        },

        Op::StrConcat => {
            let mut acc = IntRange::singleton(Integer::from(0));
            for c in cs {
                acc = acc.add(c.aval().as_str_len());
            }
            AbsVal::Str(acc)
        }
        Op::StrLen => AbsVal::Int(a(0).as_str_len().clone()),
        Op::StrContains | Op::StrPrefixOf | Op::StrSuffixOf => {
            // argument order differs (needle is second for contains, first
            // for prefix/suffix), but either way a needle longer than the
            // haystack refutes
            let (hay, needle) = if matches!(op, Op::StrContains) {
                (a(0).as_str_len(), a(1).as_str_len())
            } else {
                (a(1).as_str_len(), a(0).as_str_len())
            };
            match (&needle.lo, &hay.hi) {
                (Some(nl), Some(hh)) if nl > hh => AbsVal::Bool(Tristate::False),
                _ => AbsVal::Bool(Tristate::Unknown),
            }
        }
        Op::StrIndexOf => {
            let hay = a(0).as_str_len();
            AbsVal::Int(IntRange::new(Some(Integer::from(-1)), hay.hi.clone()))
        }
        Op::StrSubstr => {
            let len = a(0).as_str_len();
            let off = a(1).as_int();
            let n = a(2).as_int();
            let avail = len.add(&off.neg());
            let hi = n.min_with(&avail).clamp_nonneg().hi;
            AbsVal::Str(IntRange::new(Some(Integer::from(0)), hi))
        }

        Op::ConstArray(_) => AbsVal::Array(Box::new(a(0).clone())),
        Op::Select => a(0).as_array_elem().clone(),
        Op::Store => {
            let elem = a(0).as_array_elem().join(a(cs.len() - 1));
            AbsVal::Array(Box::new(elem))
        }
        Op::ArrayEq | Op::ArrayRangeEq => AbsVal::Bool(Tristate::Unknown),
        Op::ArrayMap(_) | Op::ArrayCopy | Op::ArraySet => AbsVal::top(sort),

        Op::Tuple => AbsVal::Tuple(cs.iter().map(|c| c.aval().clone()).collect()),
        Op::Field(i) => a(0).as_tuple()[*i].clone(),

        Op::Apply(_) => AbsVal::top(sort),
        Op::Quant(_) => AbsVal::Bool(Tristate::Unknown),
        Op::Annot(_) => a(0).clone(),

        // floats are opaque; their predicates fold on constants upstream
        Op::FpBinOp(_) | Op::FpUnOp(_) | Op::FpFma | Op::BvToFp(..) | Op::UbvToFp(..)
        | Op::SbvToFp(..) | Op::FpToFp(..) => AbsVal::Float,
        Op::FpBinPred(_) | Op::FpUnPred(_) => AbsVal::Bool(Tristate::Unknown),
        Op::FpToBv => AbsVal::top(sort),
    }
}

/// `mod` with an unspecified-but-total zero case: when the divisor may be
/// zero the result is the dividend, so the range must cover it too.
fn int_mod_aval(x: &IntRange, y: &IntRange) -> IntRange {
    let base = x.rem(y);
    if y.contains(&Integer::from(0)) {
        base.join(x)
    } else {
        base
    }
}

fn prod_aval(counts: &[u32], cs: &[Term], sort: &Sort) -> AbsVal {
    // cap the exponent walk; huge powers fall back to top
    const MAX_POW: u32 = 16;
    if counts.iter().any(|n| *n > MAX_POW) {
        return AbsVal::top(sort);
    }
    match sort {
        Sort::Int => {
            let mut acc = IntRange::singleton(Integer::from(1));
            for (n, x) in counts.iter().zip(cs) {
                for _ in 0..*n {
                    acc = acc.mul(x.aval().as_int());
                }
            }
            AbsVal::Int(acc)
        }
        Sort::Real => {
            let mut acc = RealAbs::singleton(Rational::from(1));
            for (n, x) in counts.iter().zip(cs) {
                for _ in 0..*n {
                    acc = acc.mul(x.aval().as_real());
                }
            }
            AbsVal::Real(acc)
        }
        Sort::BitVec(w) => {
            let mut acc = BvDomain::singleton(&crate::bv::BitVec::new(Integer::from(1), *w));
            for (n, x) in counts.iter().zip(cs) {
                for _ in 0..*n {
                    acc = acc.mul(x.aval().as_bv());
                }
            }
            AbsVal::Bv(acc)
        }
        _ => AbsVal::top(sort),
    }
}
