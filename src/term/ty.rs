//! Sort rules, one per operator.
//!
//! Children already carry their sorts, so checking a node is non-recursive.
//! A failed check is a programmer error; the builder surfaces it as a panic
//! with the rendered [TypeError].

use itertools::Itertools;

use std::fmt::{self, Display, Formatter};

use super::{Op, Term};
use crate::sort::Sort;

/// A sort error at some operator.
#[derive(Debug, PartialEq, Eq)]
pub struct TypeError {
    pub op: String,
    pub args: Vec<Sort>,
    pub reason: TypeErrorReason,
}

#[derive(Debug, PartialEq, Eq)]
pub enum TypeErrorReason {
    NotEqual(Sort, Sort, &'static str),
    ExpectedBool(Sort, &'static str),
    ExpectedInt(Sort, &'static str),
    ExpectedReal(Sort, &'static str),
    ExpectedBv(Sort, &'static str),
    ExpectedFp(Sort, &'static str),
    ExpectedStr(Sort, &'static str),
    ExpectedArray(Sort, &'static str),
    ExpectedTuple(Sort, &'static str),
    EmptyNary(&'static str),
    BadArity(&'static str, usize, usize),
    OutOfBounds(String),
    Custom(String),
}

impl Display for TypeError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "sort error at `{}`", self.op)?;
        if !self.args.is_empty() {
            write!(f, " on ({})", self.args.iter().format(", "))?;
        }
        write!(f, ": {}", self.reason)
    }
}

impl Display for TypeErrorReason {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        use TypeErrorReason::*;
        match self {
            NotEqual(a, b, ctx) => write!(f, "{} != {} in {}", a, b, ctx),
            ExpectedBool(a, ctx) => write!(f, "expected bool, got {} in {}", a, ctx),
            ExpectedInt(a, ctx) => write!(f, "expected int, got {} in {}", a, ctx),
            ExpectedReal(a, ctx) => write!(f, "expected real, got {} in {}", a, ctx),
            ExpectedBv(a, ctx) => write!(f, "expected bit-vector, got {} in {}", a, ctx),
            ExpectedFp(a, ctx) => write!(f, "expected float, got {} in {}", a, ctx),
            ExpectedStr(a, ctx) => write!(f, "expected string, got {} in {}", a, ctx),
            ExpectedArray(a, ctx) => write!(f, "expected array, got {} in {}", a, ctx),
            ExpectedTuple(a, ctx) => write!(f, "expected tuple, got {} in {}", a, ctx),
            EmptyNary(ctx) => write!(f, "empty n-ary application in {}", ctx),
            BadArity(ctx, want, got) => {
                write!(f, "{} expects {} arguments, got {}", ctx, want, got)
            }
            OutOfBounds(m) | Custom(m) => write!(f, "{}", m),
        }
    }
}

impl std::error::Error for TypeError {}

type Res<T> = Result<T, TypeErrorReason>;

fn bool_or<'a>(a: &'a Sort, ctx: &'static str) -> Res<&'a Sort> {
    if let Sort::Bool = a {
        Ok(a)
    } else {
        Err(TypeErrorReason::ExpectedBool(a.clone(), ctx))
    }
}

fn int_or<'a>(a: &'a Sort, ctx: &'static str) -> Res<&'a Sort> {
    if let Sort::Int = a {
        Ok(a)
    } else {
        Err(TypeErrorReason::ExpectedInt(a.clone(), ctx))
    }
}

fn real_or<'a>(a: &'a Sort, ctx: &'static str) -> Res<&'a Sort> {
    if let Sort::Real = a {
        Ok(a)
    } else {
        Err(TypeErrorReason::ExpectedReal(a.clone(), ctx))
    }
}

fn bv_or<'a>(a: &'a Sort, ctx: &'static str) -> Res<&'a Sort> {
    if let Sort::BitVec(_) = a {
        Ok(a)
    } else {
        Err(TypeErrorReason::ExpectedBv(a.clone(), ctx))
    }
}

fn fp_or<'a>(a: &'a Sort, ctx: &'static str) -> Res<&'a Sort> {
    if let Sort::Float(..) = a {
        Ok(a)
    } else {
        Err(TypeErrorReason::ExpectedFp(a.clone(), ctx))
    }
}

fn str_or<'a>(a: &'a Sort, ctx: &'static str) -> Res<&'a Sort> {
    if let Sort::Str(_) = a {
        Ok(a)
    } else {
        Err(TypeErrorReason::ExpectedStr(a.clone(), ctx))
    }
}

fn array_or<'a>(a: &'a Sort, ctx: &'static str) -> Res<(&'a [Sort], &'a Sort)> {
    if let Sort::Array(ks, v) = a {
        Ok((ks, v))
    } else {
        Err(TypeErrorReason::ExpectedArray(a.clone(), ctx))
    }
}

fn tuple_or<'a>(a: &'a Sort, ctx: &'static str) -> Res<&'a [Sort]> {
    if let Sort::Tuple(fields) = a {
        Ok(fields)
    } else {
        Err(TypeErrorReason::ExpectedTuple(a.clone(), ctx))
    }
}

fn eq_or(a: &Sort, b: &Sort, ctx: &'static str) -> Res<()> {
    if a == b {
        Ok(())
    } else {
        Err(TypeErrorReason::NotEqual(a.clone(), b.clone(), ctx))
    }
}

fn all_eq_or<'a>(mut sorts: impl Iterator<Item = &'a Sort>, ctx: &'static str) -> Res<&'a Sort> {
    let first = sorts.next().ok_or(TypeErrorReason::EmptyNary(ctx))?;
    for s in sorts {
        eq_or(first, s, ctx)?;
    }
    Ok(first)
}

fn arity_or(want: usize, got: usize, ctx: &'static str) -> Res<()> {
    if want == got {
        Ok(())
    } else {
        Err(TypeErrorReason::BadArity(ctx, want, got))
    }
}

/// The sort of `(op cs…)`, or the reason it is ill-sorted.
pub fn sort_of(op: &Op, cs: &[Term]) -> Result<Sort, TypeError> {
    let s = |i: usize| cs[i].sort();
    let res: Res<Sort> = (|| {
        if let Some(a) = op.arity() {
            arity_or(a, cs.len(), "operator")?;
        }
        match op {
            Op::Var(_, sort) | Op::BoundVar(_, _, sort) => Ok(sort.clone()),
            Op::Const(v) => Ok(v.sort()),
            Op::Ite => {
                bool_or(s(0), "ite condition")?;
                eq_or(s(1), s(2), "ite arms")?;
                Ok(s(1).clone())
            }
            Op::Eq => {
                eq_or(s(0), s(1), "=")?;
                Ok(Sort::Bool)
            }
            Op::Not => {
                bool_or(s(0), "not")?;
                Ok(Sort::Bool)
            }
            Op::And => {
                for c in cs {
                    bool_or(c.sort(), "and")?;
                }
                if cs.is_empty() {
                    return Err(TypeErrorReason::EmptyNary("and"));
                }
                Ok(Sort::Bool)
            }
            Op::IntLe => {
                int_or(s(0), "<=")?;
                int_or(s(1), "<=")?;
                Ok(Sort::Bool)
            }
            Op::RealLe => {
                real_or(s(0), "<=.")?;
                real_or(s(1), "<=.")?;
                Ok(Sort::Bool)
            }
            Op::RealIsInt => {
                real_or(s(0), "is-int")?;
                Ok(Sort::Bool)
            }
            Op::BvUlt | Op::BvSlt => {
                bv_or(s(0), "bv comparison")?;
                eq_or(s(0), s(1), "bv comparison")?;
                Ok(Sort::Bool)
            }
            Op::BvBit(i) => {
                let w = bv_or(s(0), "bit")?.as_bv();
                if *i < w {
                    Ok(Sort::Bool)
                } else {
                    Err(TypeErrorReason::OutOfBounds(format!(
                        "bit {} of a {}-bit vector",
                        i, w
                    )))
                }
            }
            Op::IntSum(coeffs, _) => {
                arity_or(coeffs.len(), cs.len(), "int-sum")?;
                for c in cs {
                    int_or(c.sort(), "int-sum")?;
                }
                Ok(Sort::Int)
            }
            Op::RealSum(coeffs, _) => {
                arity_or(coeffs.len(), cs.len(), "real-sum")?;
                for c in cs {
                    real_or(c.sort(), "real-sum")?;
                }
                Ok(Sort::Real)
            }
            Op::BvSum(coeffs, k) | Op::BvXorSum(coeffs, k) => {
                arity_or(coeffs.len(), cs.len(), "bv-sum")?;
                let sort = Sort::BitVec(k.width());
                for c in cs {
                    eq_or(c.sort(), &sort, "bv-sum")?;
                }
                for c in coeffs {
                    if c.width() != k.width() {
                        return Err(TypeErrorReason::Custom(
                            "bv-sum coefficient width mismatch".into(),
                        ));
                    }
                }
                Ok(sort)
            }
            Op::Prod(counts) => {
                arity_or(counts.len(), cs.len(), "prod")?;
                let sort = all_eq_or(cs.iter().map(|c| c.sort()), "prod")?;
                match sort {
                    Sort::Int | Sort::Real | Sort::BitVec(_) => Ok(sort.clone()),
                    _ => Err(TypeErrorReason::Custom(format!(
                        "prod over non-semiring sort {}",
                        sort
                    ))),
                }
            }
            Op::IntDiv | Op::IntMod => {
                int_or(s(0), "div/mod")?;
                int_or(s(1), "div/mod")?;
                Ok(Sort::Int)
            }
            Op::RealDiv => {
                real_or(s(0), "/")?;
                real_or(s(1), "/")?;
                Ok(Sort::Real)
            }
            Op::RealSqrt => {
                real_or(s(0), "sqrt")?;
                Ok(Sort::Real)
            }
            Op::IntToReal => {
                int_or(s(0), "to-real")?;
                Ok(Sort::Real)
            }
            Op::RealToInt => {
                real_or(s(0), "to-int")?;
                Ok(Sort::Int)
            }
            Op::IntToBv(w) => {
                int_or(s(0), "int2bv")?;
                Ok(Sort::BitVec(*w))
            }
            Op::UbvToInt | Op::SbvToInt => {
                bv_or(s(0), "bv2int")?;
                Ok(Sort::Int)
            }
            Op::BvConcat => {
                let mut w = 0;
                for c in cs {
                    w += bv_or(c.sort(), "concat")?.as_bv();
                }
                if cs.is_empty() {
                    return Err(TypeErrorReason::EmptyNary("concat"));
                }
                Ok(Sort::BitVec(w))
            }
            Op::BvExtract(high, low) => {
                let w = bv_or(s(0), "extract")?.as_bv();
                if low <= high && *high < w {
                    Ok(Sort::BitVec(high - low + 1))
                } else {
                    Err(TypeErrorReason::OutOfBounds(format!(
                        "extract {}..{} from a {}-bit vector",
                        high, low, w
                    )))
                }
            }
            Op::BvUdiv | Op::BvUrem | Op::BvSdiv | Op::BvSrem | Op::BvShl | Op::BvLshr
            | Op::BvAshr | Op::BvRol | Op::BvRor => {
                bv_or(s(0), "bv binary op")?;
                eq_or(s(0), s(1), "bv binary op")?;
                Ok(s(0).clone())
            }
            Op::BvUext(n) | Op::BvSext(n) => {
                let w = bv_or(s(0), "bv extension")?.as_bv();
                Ok(Sort::BitVec(w + n))
            }
            Op::BvAnd | Op::BvOr => {
                let sort = all_eq_or(cs.iter().map(|c| c.sort()), "bv bitwise op")?;
                bv_or(sort, "bv bitwise op")?;
                Ok(sort.clone())
            }
            Op::BvPopcount | Op::BvClz | Op::BvCtz => {
                bv_or(s(0), "bv bit count")?;
                Ok(s(0).clone())
            }
            Op::BvFill(w) => {
                bool_or(s(0), "fill")?;
                Ok(Sort::BitVec(*w))
            }
            Op::FpBinOp(_) => {
                fp_or(s(0), "fp binary op")?;
                eq_or(s(0), s(1), "fp binary op")?;
                Ok(s(0).clone())
            }
            Op::FpUnOp(_) => {
                fp_or(s(0), "fp unary op")?;
                Ok(s(0).clone())
            }
            Op::FpFma => {
                fp_or(s(0), "fma")?;
                eq_or(s(0), s(1), "fma")?;
                eq_or(s(0), s(2), "fma")?;
                Ok(s(0).clone())
            }
            Op::FpBinPred(_) => {
                fp_or(s(0), "fp predicate")?;
                eq_or(s(0), s(1), "fp predicate")?;
                Ok(Sort::Bool)
            }
            Op::FpUnPred(_) => {
                fp_or(s(0), "fp predicate")?;
                Ok(Sort::Bool)
            }
            Op::BvToFp(eb, sb) => {
                let w = bv_or(s(0), "bv2fp")?.as_bv();
                if w == eb + sb {
                    Ok(Sort::Float(*eb, *sb))
                } else {
                    Err(TypeErrorReason::OutOfBounds(format!(
                        "bv2fp of a {}-bit vector into shape ({}, {})",
                        w, eb, sb
                    )))
                }
            }
            Op::FpToBv => {
                let (eb, sb) = fp_or(s(0), "fp2bv")?.as_float();
                Ok(Sort::BitVec(eb + sb))
            }
            Op::UbvToFp(eb, sb) | Op::SbvToFp(eb, sb) => {
                bv_or(s(0), "bv2fp")?;
                Ok(Sort::Float(*eb, *sb))
            }
            Op::FpToFp(eb, sb) => {
                fp_or(s(0), "fp2fp")?;
                Ok(Sort::Float(*eb, *sb))
            }
            Op::StrConcat => {
                let sort = all_eq_or(cs.iter().map(|c| c.sort()), "str.++")?;
                str_or(sort, "str.++")?;
                Ok(sort.clone())
            }
            Op::StrLen => {
                str_or(s(0), "str.len")?;
                Ok(Sort::Int)
            }
            Op::StrContains | Op::StrPrefixOf | Op::StrSuffixOf => {
                str_or(s(0), "str predicate")?;
                eq_or(s(0), s(1), "str predicate")?;
                Ok(Sort::Bool)
            }
            Op::StrIndexOf => {
                str_or(s(0), "str.indexof")?;
                eq_or(s(0), s(1), "str.indexof")?;
                int_or(s(2), "str.indexof")?;
                Ok(Sort::Int)
            }
            Op::StrSubstr => {
                str_or(s(0), "str.substr")?;
                int_or(s(1), "str.substr")?;
                int_or(s(2), "str.substr")?;
                Ok(s(0).clone())
            }
            Op::ConstArray(ks) => {
                if ks.is_empty() {
                    return Err(TypeErrorReason::Custom("array with no index sorts".into()));
                }
                Ok(Sort::Array(ks.clone(), Box::new(s(0).clone())))
            }
            Op::Select => {
                let (ks, v) = array_or(s(0), "select")?;
                arity_or(1 + ks.len(), cs.len(), "select")?;
                for (i, k) in ks.iter().enumerate() {
                    eq_or(s(1 + i), k, "select index")?;
                }
                Ok(v.clone())
            }
            Op::Store => {
                let (ks, v) = array_or(s(0), "store")?;
                arity_or(2 + ks.len(), cs.len(), "store")?;
                for (i, k) in ks.iter().enumerate() {
                    eq_or(s(1 + i), k, "store index")?;
                }
                eq_or(s(cs.len() - 1), v, "store value")?;
                Ok(s(0).clone())
            }
            Op::ArrayEq => {
                array_or(s(0), "array-eq")?;
                eq_or(s(0), s(1), "array-eq")?;
                Ok(Sort::Bool)
            }
            Op::ArrayMap(f) => {
                if cs.is_empty() {
                    return Err(TypeErrorReason::EmptyNary("array-map"));
                }
                arity_or(f.params().len(), cs.len(), "array-map")?;
                let (ks, _) = array_or(s(0), "array-map")?;
                for (c, p) in cs.iter().zip(f.arg_sorts()) {
                    let (cks, cv) = array_or(c.sort(), "array-map")?;
                    if cks != ks {
                        return Err(TypeErrorReason::Custom(
                            "array-map over mismatched index sorts".into(),
                        ));
                    }
                    eq_or(cv, p, "array-map element")?;
                }
                Ok(Sort::Array(ks.to_vec(), Box::new(f.ret().clone())))
            }
            Op::ArrayCopy => {
                let (ks, _) = array_or(s(0), "array-copy")?;
                arity_or(1, ks.len(), "array-copy index")?;
                eq_or(s(0), s(2), "array-copy")?;
                eq_or(s(1), &ks[0], "array-copy index")?;
                eq_or(s(3), &ks[0], "array-copy index")?;
                eq_or(s(4), &ks[0], "array-copy length")?;
                Ok(s(0).clone())
            }
            Op::ArraySet => {
                let (ks, v) = array_or(s(0), "array-set")?;
                arity_or(1, ks.len(), "array-set index")?;
                eq_or(s(1), &ks[0], "array-set index")?;
                eq_or(s(2), v, "array-set value")?;
                eq_or(s(3), &ks[0], "array-set length")?;
                Ok(s(0).clone())
            }
            Op::ArrayRangeEq => {
                let (ks, _) = array_or(s(0), "array-range-eq")?;
                arity_or(1, ks.len(), "array-range-eq index")?;
                eq_or(s(0), s(1), "array-range-eq")?;
                eq_or(s(2), &ks[0], "array-range-eq index")?;
                eq_or(s(3), &ks[0], "array-range-eq length")?;
                Ok(Sort::Bool)
            }
            Op::Tuple => Ok(Sort::Tuple(cs.iter().map(|c| c.sort().clone()).collect())),
            Op::Field(i) => {
                let fields = tuple_or(s(0), "field")?;
                if *i < fields.len() {
                    Ok(fields[*i].clone())
                } else {
                    Err(TypeErrorReason::OutOfBounds(format!(
                        "field {} of a {}-field tuple",
                        i,
                        fields.len()
                    )))
                }
            }
            Op::Apply(f) => {
                for (c, p) in cs.iter().zip(f.arg_sorts()) {
                    eq_or(c.sort(), p, "application")?;
                }
                Ok(f.ret().clone())
            }
            Op::Quant(_) => {
                if !matches!(cs[0].op(), Op::BoundVar(..)) {
                    return Err(TypeErrorReason::Custom(
                        "quantifier binder is not a bound variable".into(),
                    ));
                }
                bool_or(s(1), "quantifier body")?;
                Ok(Sort::Bool)
            }
            Op::Annot(_) => Ok(s(0).clone()),
        }
    })();
    res.map_err(|reason| TypeError {
        op: op.to_string(),
        args: cs.iter().map(|c| c.sort().clone()).collect(),
        reason,
    })
}
