//! Term evaluation and the ground-term projection.
//!
//! Evaluation is total over the undefined operations (division by zero,
//! square roots of negatives and the like return the same fixed but
//! unspecified values the builder folds to) and fallible everywhere a term
//! has no concrete meaning under the environment: a missing or unbound
//! variable, an uninterpreted application, a quantifier over an infinite
//! sort, or a bulk array walk past [MAX_RANGE]. Those cases return an
//! [EvalError]; nothing panics on a well-sorted term.
//!
//! Quantifiers are decided by enumerating the binder's sort when it is
//! finite and small (booleans and bit-vectors up to [MAX_ENUM_BITS] bits);
//! defined functions and `array-map` evaluate their bodies under a
//! bound-variable frame.

use fxhash::FxHashMap;
use log::trace;
use rug::{Integer, Rational};
use thiserror::Error;

use std::collections::BTreeSet;

use super::{
    FnDef, FpBinOp, FpBinPred, FpUnOp, FpUnPred, Op, PostOrderIter, QuantKind, Term, TermMap,
};
use crate::algebra::{BvArith, BvXor, IntRing, RealRing, Semiring};
use crate::bv::BitVec;
use crate::sort::Sort;
use crate::value::{ArrayVal, FloatVal, StrVal, Value};

/// Longest contiguous index range `array-copy`/`set`/`range-eq` will walk.
pub const MAX_RANGE: u64 = 1 << 16;

/// Widest bit-vector sort a quantifier will be decided by enumeration.
pub const MAX_ENUM_BITS: usize = 16;

/// Why a well-sorted term failed to evaluate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    #[error("no value for variable {0} in the environment")]
    MissingVar(String),
    #[error("bound variable {0} occurs outside its binder")]
    UnboundVar(String),
    #[error("{0} has no concrete evaluation")]
    Unsupported(String),
}

/// Recursively evaluate `t` with free-variable values from `env`.
pub fn eval(t: &Term, env: &FxHashMap<String, Value>) -> Result<Value, EvalError> {
    Evaluator {
        env,
        bound: FxHashMap::default(),
    }
    .run(t)
}

/// `Some(v)` iff `t` is ground: constants at every leaf (no free or bound
/// variables anywhere, including under binders) and every operation
/// concretely evaluable. Applications of defined functions to ground
/// arguments are ground; uninterpreted applications are not.
pub fn as_concrete(t: &Term) -> Option<Value> {
    let any_var = PostOrderIter::new(t.clone())
        .any(|n| matches!(n.op(), Op::Var(..) | Op::BoundVar(..)));
    if any_var {
        return None;
    }
    eval(t, &FxHashMap::default()).ok()
}

/// One evaluation context: the caller's environment plus the frame of
/// bound-variable values accumulated by binders above the current term.
struct Evaluator<'e> {
    env: &'e FxHashMap<String, Value>,
    bound: FxHashMap<u64, Value>,
}

impl<'e> Evaluator<'e> {
    fn run(&self, t: &Term) -> Result<Value, EvalError> {
        let mut vs: TermMap<Value> = TermMap::default();
        // (children pushed, term); quantifier bodies are deliberately not
        // traversed here, since their nodes only mean something under a
        // binding frame
        let mut stack = vec![(false, t.clone())];
        while let Some((children_pushed, node)) = stack.pop() {
            if vs.contains_key(&node) {
                continue;
            }
            if children_pushed {
                let v = self.node_value(&node, &vs)?;
                trace!("eval {} => {}", node.op(), v);
                vs.insert(node, v);
            } else {
                stack.push((true, node.clone()));
                if !matches!(node.op(), Op::Quant(_)) {
                    for c in node.cs() {
                        if !vs.contains_key(c) {
                            stack.push((false, c.clone()));
                        }
                    }
                }
            }
        }
        Ok(vs.get(t).unwrap().clone())
    }

    fn node_value(&self, t: &Term, vs: &TermMap<Value>) -> Result<Value, EvalError> {
        match t.op() {
            Op::Var(n, _) => self
                .env
                .get(n)
                .cloned()
                .ok_or_else(|| EvalError::MissingVar(n.clone())),
            Op::BoundVar(nonce, n, _) => self
                .bound
                .get(nonce)
                .cloned()
                .ok_or_else(|| EvalError::UnboundVar(n.clone())),
            Op::Quant(q) => self.quant_value(*q, &t.cs()[0], &t.cs()[1]),
            Op::Apply(f) => {
                let args = t.cs().iter().map(|c| vs.get(c).unwrap().clone()).collect();
                self.apply_value(f, args)
            }
            Op::ArrayMap(f) => {
                let arrays: Vec<&Value> = t.cs().iter().map(|c| vs.get(c).unwrap()).collect();
                self.map_value(f, &arrays)
            }
            _ => {
                let args: Vec<&Value> = t.cs().iter().map(|c| vs.get(c).unwrap()).collect();
                eval_op(t.op(), &args)
            }
        }
    }

    fn with_frame(&self, extra: impl IntoIterator<Item = (u64, Value)>) -> Evaluator<'e> {
        let mut bound = self.bound.clone();
        bound.extend(extra);
        Evaluator {
            env: self.env,
            bound,
        }
    }

    /// Decide a quantifier by walking every element of the binder's sort.
    fn quant_value(&self, q: QuantKind, var: &Term, body: &Term) -> Result<Value, EvalError> {
        let (nonce, sort) = match var.op() {
            Op::BoundVar(nonce, _, sort) => (*nonce, sort.clone()),
            o => return Err(EvalError::Unsupported(format!("binder {}", o))),
        };
        let dom = finite_domain(&sort)
            .ok_or_else(|| EvalError::Unsupported(format!("quantifier over {}", sort)))?;
        let forall = matches!(q, QuantKind::Forall);
        for v in dom {
            let holds = self.with_frame([(nonce, v)]).run(body)?.as_bool();
            if holds != forall {
                return Ok(Value::Bool(!forall));
            }
        }
        Ok(Value::Bool(forall))
    }

    /// Evaluate a defined function's body under its parameter bindings.
    fn apply_value(&self, f: &FnDef, args: Vec<Value>) -> Result<Value, EvalError> {
        let body = f
            .body()
            .ok_or_else(|| EvalError::Unsupported(format!("uninterpreted function {}", f)))?;
        let frame = f.params().iter().zip(args).filter_map(|(p, a)| {
            if let Op::BoundVar(nonce, _, _) = p.op() {
                Some((*nonce, a))
            } else {
                None
            }
        });
        self.with_frame(frame).run(body)
    }

    /// Pointwise application over array tables: the defaults map to the new
    /// default, and every explicitly stored key maps through `f`.
    fn map_value(&self, f: &FnDef, arrays: &[&Value]) -> Result<Value, EvalError> {
        let tables: Vec<&ArrayVal> = arrays.iter().map(|a| a.as_array()).collect();
        let defaults = tables.iter().map(|t| (*t.default).clone()).collect();
        let default = self.apply_value(f, defaults)?;
        let mut keys: BTreeSet<Vec<Value>> = BTreeSet::new();
        for t in &tables {
            keys.extend(t.map.keys().cloned());
        }
        let mut out = ArrayVal::constant(tables[0].key_sorts.clone(), default);
        for key in keys {
            let vals = tables.iter().map(|t| t.select(&key)).collect();
            let v = self.apply_value(f, vals)?;
            out = out.store(key, v);
        }
        Ok(Value::Array(out))
    }
}

/// Every element of a small finite sort, in order.
fn finite_domain(sort: &Sort) -> Option<Vec<Value>> {
    match sort {
        Sort::Bool => Some(vec![Value::Bool(false), Value::Bool(true)]),
        Sort::BitVec(w) if *w <= MAX_ENUM_BITS => Some(
            (0..(1u64 << *w as u32))
                .map(|i| Value::BitVec(BitVec::new(Integer::from(i), *w)))
                .collect(),
        ),
        _ => None,
    }
}

/// A bulk-op length as a walkable count: non-positive is empty, and
/// anything past [MAX_RANGE] (or of a non-numeric index sort) is refused.
fn range_len(n: &Value) -> Result<u64, EvalError> {
    let i = match n {
        Value::Int(i) => i.clone(),
        Value::BitVec(b) => b.uint().clone(),
        v => return Err(EvalError::Unsupported(format!("range length {}", v))),
    };
    if i <= 0 {
        return Ok(0);
    }
    match i.to_u64() {
        Some(k) if k <= MAX_RANGE => Ok(k),
        _ => Err(EvalError::Unsupported(format!("range of length {}", i))),
    }
}

/// The `k`-th successor of a numeric index (bit-vectors wrap).
fn index_plus(base: &Value, k: u64) -> Value {
    match base {
        Value::Int(i) => Value::Int(Integer::from(i + k)),
        Value::BitVec(b) => {
            let w = b.width();
            Value::BitVec(BitVec::new(
                Integer::from(b.uint() + k).keep_bits(w as u32),
                w,
            ))
        }
        v => unreachable!("non-numeric index {}", v),
    }
}

fn fold_sum<R: Semiring>(
    ring: &R,
    coeffs: &[R::Coeff],
    offset: &R::Coeff,
    args: &[&Value],
    scale: impl Fn(&R::Coeff, &Value) -> R::Coeff,
) -> R::Coeff {
    let mut acc = offset.clone();
    for (c, v) in coeffs.iter().zip(args) {
        acc = ring.add(&acc, &scale(c, *v));
    }
    acc
}

/// IEEE comparison at any shape: NaN compares false, zeros are equal, and
/// otherwise the sign-magnitude key order is the value order.
fn fp_key(v: &FloatVal) -> Option<Integer> {
    if v.is_nan() {
        return None;
    }
    if v.is_zero() {
        return Some(Integer::from(0));
    }
    let mag = v.abs().bits().clone();
    Some(if v.sign_bit() { -mag } else { mag })
}

fn fp_bin(o: FpBinOp, a: &FloatVal, b: &FloatVal) -> FloatVal {
    if let (Some(x), Some(y)) = (a.to_f64(), b.to_f64()) {
        return FloatVal::from_f64(match o {
            FpBinOp::Add => x + y,
            FpBinOp::Sub => x - y,
            FpBinOp::Mul => x * y,
            FpBinOp::Div => x / y,
            FpBinOp::Rem => x % y,
            FpBinOp::Min => x.min(y),
            FpBinOp::Max => x.max(y),
        });
    }
    if let (Some(x), Some(y)) = (a.to_f32(), b.to_f32()) {
        return FloatVal::from_f32(match o {
            FpBinOp::Add => x + y,
            FpBinOp::Sub => x - y,
            FpBinOp::Mul => x * y,
            FpBinOp::Div => x / y,
            FpBinOp::Rem => x % y,
            FpBinOp::Min => x.min(y),
            FpBinOp::Max => x.max(y),
        });
    }
    // non-native shape: unspecified result
    a.clone()
}

/// Evaluate one context-free operator over already-evaluated arguments.
///
/// Variables, binders, applications, and `array-map` need an evaluation
/// context and answer [EvalError::Unsupported] here; [eval] handles them.
pub fn eval_op(op: &Op, args: &[&Value]) -> Result<Value, EvalError> {
    let v = match op {
        Op::Const(v) => v.clone(),

        Op::Ite => if args[0].as_bool() { args[1] } else { args[2] }.clone(),
        Op::Eq => Value::Bool(args[0] == args[1]),
        Op::Not => Value::Bool(!args[0].as_bool()),
        Op::And => Value::Bool(args.iter().all(|a| a.as_bool())),

        Op::IntLe => Value::Bool(args[0].as_int() <= args[1].as_int()),
        Op::RealLe => Value::Bool(args[0].as_real() <= args[1].as_real()),
        Op::RealIsInt => Value::Bool(args[0].as_real().is_integer()),
        Op::BvUlt => Value::Bool(args[0].as_bv().uint() < args[1].as_bv().uint()),
        Op::BvSlt => Value::Bool(args[0].as_bv().as_sint() < args[1].as_bv().as_sint()),
        Op::BvBit(i) => Value::Bool(args[0].as_bv().bit(*i)),

        Op::IntSum(coeffs, k) => Value::Int(fold_sum(&IntRing, coeffs, k, args, |c, v| {
            Integer::from(c * v.as_int())
        })),
        Op::RealSum(coeffs, k) => Value::Real(fold_sum(&RealRing, coeffs, k, args, |c, v| {
            Rational::from(c * v.as_real())
        })),
        Op::BvSum(coeffs, k) => {
            let ring = BvArith(k.width());
            Value::BitVec(fold_sum(&ring, coeffs, k, args, |c, v| {
                c.clone() * v.as_bv().clone()
            }))
        }
        Op::BvXorSum(coeffs, k) => {
            let ring = BvXor(k.width());
            Value::BitVec(fold_sum(&ring, coeffs, k, args, |c, v| {
                c.clone() & v.as_bv().clone()
            }))
        }
        Op::Prod(counts) => {
            let mut vals = counts.iter().zip(args);
            let (n0, v0) = vals.next().expect("empty product node");
            let pow = |v: &Value, n: u32| -> Value {
                let mut acc = v.clone();
                for _ in 1..n {
                    acc = match (&acc, v) {
                        (Value::Int(a), Value::Int(b)) => Value::Int(Integer::from(a * b)),
                        (Value::Real(a), Value::Real(b)) => Value::Real(Rational::from(a * b)),
                        (Value::BitVec(a), Value::BitVec(b)) => {
                            Value::BitVec(a.clone() * b.clone())
                        }
                        _ => panic!("product over non-semiring values"),
                    };
                }
                acc
            };
            let mut acc = pow(*v0, *n0);
            for (n, v) in vals {
                let p = pow(*v, *n);
                acc = match (&acc, &p) {
                    (Value::Int(a), Value::Int(b)) => Value::Int(Integer::from(a * b)),
                    (Value::Real(a), Value::Real(b)) => Value::Real(Rational::from(a * b)),
                    (Value::BitVec(a), Value::BitVec(b)) => Value::BitVec(a.clone() * b.clone()),
                    _ => panic!("product over non-semiring values"),
                };
            }
            acc
        }

        // SMT-LIB div/mod (0 ≤ x mod y < |y|); division by zero is the
        // unspecified-but-total pair (0, x)
        Op::IntDiv => {
            let (x, y) = (args[0].as_int(), args[1].as_int());
            Value::Int(if *y == 0 {
                Integer::from(0)
            } else {
                x.clone().div_rem_euc(y.clone()).0
            })
        }
        Op::IntMod => {
            let (x, y) = (args[0].as_int(), args[1].as_int());
            Value::Int(if *y == 0 {
                x.clone()
            } else {
                x.clone().div_rem_euc(y.clone()).1
            })
        }
        Op::RealDiv => {
            let (x, y) = (args[0].as_real(), args[1].as_real());
            Value::Real(if *y == 0 {
                Rational::new()
            } else {
                Rational::from(x / y)
            })
        }
        Op::RealSqrt => {
            let x = args[0].as_real();
            if *x >= 0 {
                let (ns, nr) = x.numer().clone().sqrt_rem(Integer::new());
                let (ds, dr) = x.denom().clone().sqrt_rem(Integer::new());
                if nr == 0 && dr == 0 {
                    return Ok(Value::Real(Rational::from((ns, ds))));
                }
            }
            // irrational or negative: unspecified
            Value::Real(x.clone())
        }
        Op::IntToReal => Value::Real(Rational::from(args[0].as_int())),
        Op::RealToInt => Value::Int(args[0].as_real().clone().floor().numer().clone()),
        Op::IntToBv(w) => Value::BitVec(BitVec::new(
            args[0].as_int().clone().keep_bits(*w as u32),
            *w,
        )),
        Op::UbvToInt => Value::Int(args[0].as_bv().uint().clone()),
        Op::SbvToInt => Value::Int(args[0].as_bv().as_sint()),

        Op::BvConcat => Value::BitVec({
            let mut it = args.iter().map(|a| a.as_bv().clone());
            let first = it.next().unwrap();
            it.fold(first, BitVec::concat)
        }),
        Op::BvExtract(h, l) => Value::BitVec(args[0].as_bv().extract(*h, *l)),
        Op::BvUdiv => Value::BitVec(args[0].as_bv().udiv(args[1].as_bv())),
        Op::BvUrem => Value::BitVec(args[0].as_bv().urem(args[1].as_bv())),
        Op::BvSdiv => Value::BitVec(args[0].as_bv().sdiv(args[1].as_bv())),
        Op::BvSrem => Value::BitVec(args[0].as_bv().srem(args[1].as_bv())),
        Op::BvShl | Op::BvLshr | Op::BvAshr => {
            let a = args[0].as_bv();
            let n = args[1].as_bv().uint().to_usize().unwrap_or(a.width());
            Value::BitVec(match op {
                Op::BvShl => a.shl(n),
                Op::BvLshr => a.lshr(n),
                _ => a.ashr(n),
            })
        }
        Op::BvRol | Op::BvRor => {
            let a = args[0].as_bv();
            let n = (args[1].as_bv().uint().clone() % Integer::from(a.width()))
                .to_usize()
                .unwrap();
            Value::BitVec(if matches!(op, Op::BvRol) {
                a.rotl(n)
            } else {
                a.rotr(n)
            })
        }
        Op::BvUext(n) => Value::BitVec(args[0].as_bv().uext(*n)),
        Op::BvSext(n) => Value::BitVec(args[0].as_bv().sext(*n)),
        Op::BvAnd => Value::BitVec({
            let mut it = args.iter().map(|a| a.as_bv().clone());
            let first = it.next().unwrap();
            it.fold(first, |a, b| a & b)
        }),
        Op::BvOr => Value::BitVec({
            let mut it = args.iter().map(|a| a.as_bv().clone());
            let first = it.next().unwrap();
            it.fold(first, |a, b| a | b)
        }),
        Op::BvPopcount => {
            let a = args[0].as_bv();
            Value::BitVec(BitVec::new(Integer::from(a.popcount()), a.width()))
        }
        Op::BvClz => {
            let a = args[0].as_bv();
            Value::BitVec(BitVec::new(Integer::from(a.clz()), a.width()))
        }
        Op::BvCtz => {
            let a = args[0].as_bv();
            Value::BitVec(BitVec::new(Integer::from(a.ctz()), a.width()))
        }
        Op::BvFill(w) => Value::BitVec(if args[0].as_bool() {
            BitVec::ones(*w)
        } else {
            BitVec::zeros(*w)
        }),

        Op::FpBinOp(o) => Value::Float(fp_bin(*o, args[0].as_float(), args[1].as_float())),
        Op::FpUnOp(o) => {
            let a = args[0].as_float();
            Value::Float(match o {
                FpUnOp::Neg => a.neg(),
                FpUnOp::Abs => a.abs(),
                FpUnOp::Sqrt => {
                    if let Some(x) = a.to_f64() {
                        FloatVal::from_f64(x.sqrt())
                    } else if let Some(x) = a.to_f32() {
                        FloatVal::from_f32(x.sqrt())
                    } else {
                        a.clone()
                    }
                }
                FpUnOp::Round => {
                    if let Some(x) = a.to_f64() {
                        FloatVal::from_f64(x.round_ties_even())
                    } else if let Some(x) = a.to_f32() {
                        FloatVal::from_f32(x.round_ties_even())
                    } else {
                        a.clone()
                    }
                }
            })
        }
        Op::FpFma => {
            let (a, b, c) = (args[0].as_float(), args[1].as_float(), args[2].as_float());
            Value::Float(
                if let (Some(x), Some(y), Some(z)) = (a.to_f64(), b.to_f64(), c.to_f64()) {
                    FloatVal::from_f64(x.mul_add(y, z))
                } else if let (Some(x), Some(y), Some(z)) = (a.to_f32(), b.to_f32(), c.to_f32()) {
                    FloatVal::from_f32(x.mul_add(y, z))
                } else {
                    a.clone()
                },
            )
        }
        Op::FpBinPred(p) => {
            let (a, b) = (args[0].as_float(), args[1].as_float());
            Value::Bool(match (fp_key(a), fp_key(b)) {
                (Some(x), Some(y)) => match p {
                    FpBinPred::Le => x <= y,
                    FpBinPred::Lt => x < y,
                    FpBinPred::Eq => x == y,
                },
                _ => false,
            })
        }
        Op::FpUnPred(p) => {
            let a = args[0].as_float();
            Value::Bool(match p {
                FpUnPred::Normal => a.is_normal(),
                FpUnPred::Subnormal => a.is_subnormal(),
                FpUnPred::Zero => a.is_zero(),
                FpUnPred::Infinite => a.is_infinite(),
                FpUnPred::Nan => a.is_nan(),
                FpUnPred::Negative => a.is_negative(),
                FpUnPred::Positive => a.is_positive(),
            })
        }
        Op::BvToFp(eb, sb) => {
            Value::Float(FloatVal::new(*eb, *sb, args[0].as_bv().uint().clone()))
        }
        Op::FpToBv => {
            let a = args[0].as_float();
            Value::BitVec(BitVec::new(a.bits().clone(), a.total_width()))
        }
        Op::UbvToFp(eb, sb) | Op::SbvToFp(eb, sb) => {
            let signed = matches!(op, Op::SbvToFp(..));
            let i = if signed {
                args[0].as_bv().as_sint()
            } else {
                args[0].as_bv().uint().clone()
            };
            Value::Float(match (eb, sb) {
                (11, 53) => FloatVal::from_f64(i.to_f64()),
                (8, 24) => FloatVal::from_f32(i.to_f32()),
                _ => FloatVal::zero(*eb, *sb),
            })
        }
        Op::FpToFp(eb, sb) => {
            let a = args[0].as_float();
            Value::Float(match (eb, sb) {
                (11, 53) => match (a.to_f32(), a.to_f64()) {
                    (Some(x), _) => FloatVal::from_f64(x as f64),
                    (_, Some(x)) => FloatVal::from_f64(x),
                    _ => FloatVal::zero(*eb, *sb),
                },
                (8, 24) => match (a.to_f32(), a.to_f64()) {
                    (Some(x), _) => FloatVal::from_f32(x),
                    (_, Some(x)) => FloatVal::from_f32(x as f32),
                    _ => FloatVal::zero(*eb, *sb),
                },
                _ => FloatVal::zero(*eb, *sb),
            })
        }

        Op::StrConcat => Value::Str({
            let mut it = args.iter().map(|a| a.as_str());
            let first = it.next().unwrap().clone();
            it.fold(first, |a, b| a.concat(b))
        }),
        Op::StrLen => Value::Int(Integer::from(args[0].as_str().len())),
        Op::StrContains => Value::Bool(args[0].as_str().contains(args[1].as_str())),
        Op::StrIndexOf => {
            let from = args[2].as_int();
            Value::Int(if *from < 0 {
                Integer::from(-1)
            } else {
                match args[0]
                    .as_str()
                    .find(args[1].as_str(), from.to_usize().unwrap_or(usize::MAX))
                {
                    Some(i) => Integer::from(i),
                    None => Integer::from(-1),
                }
            })
        }
        Op::StrPrefixOf => Value::Bool(args[0].as_str().is_prefix_of(args[1].as_str())),
        Op::StrSuffixOf => Value::Bool(args[0].as_str().is_suffix_of(args[1].as_str())),
        Op::StrSubstr => {
            let s = args[0].as_str();
            let (off, n) = (args[1].as_int(), args[2].as_int());
            Value::Str(if *off < 0 || *n < 0 {
                StrVal::empty(s.enc())
            } else {
                s.substr(
                    off.to_usize().unwrap_or(usize::MAX),
                    n.to_usize().unwrap_or(usize::MAX),
                )
            })
        }

        Op::ConstArray(ks) => Value::Array(ArrayVal::constant(ks.clone(), args[0].clone())),
        Op::Select => {
            let keys: Vec<Value> = args[1..].iter().map(|v| (*v).clone()).collect();
            args[0].as_array().select(&keys)
        }
        Op::Store => {
            let keys: Vec<Value> = args[1..args.len() - 1]
                .iter()
                .map(|v| (*v).clone())
                .collect();
            Value::Array(
                args[0]
                    .as_array()
                    .store(keys, (*args.last().unwrap()).clone()),
            )
        }
        Op::ArrayEq => Value::Bool(args[0].as_array() == args[1].as_array()),
        Op::ArraySet => {
            let n = range_len(args[3])?;
            let mut arr = args[0].as_array().clone();
            for k in 0..n {
                arr = arr.store(vec![index_plus(args[1], k)], args[2].clone());
            }
            Value::Array(arr)
        }
        Op::ArrayCopy => {
            let n = range_len(args[4])?;
            let src = args[2].as_array();
            let mut dst = args[0].as_array().clone();
            for k in 0..n {
                let v = src.select(&[index_plus(args[3], k)]);
                dst = dst.store(vec![index_plus(args[1], k)], v);
            }
            Value::Array(dst)
        }
        Op::ArrayRangeEq => {
            let n = range_len(args[3])?;
            let (a, b) = (args[0].as_array(), args[1].as_array());
            Value::Bool((0..n).all(|k| {
                let key = [index_plus(args[2], k)];
                a.select(&key) == b.select(&key)
            }))
        }

        Op::Tuple => Value::Tuple(args.iter().map(|v| (*v).clone()).collect()),
        Op::Field(i) => args[0].as_tuple()[*i].clone(),
        Op::Annot(_) => args[0].clone(),

        o => return Err(EvalError::Unsupported(o.to_string())),
    };
    Ok(v)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::build::Builder;
    use crate::term::UnfoldPolicy;

    #[test]
    fn quantifiers_enumerate_finite_sorts() {
        let mut b = Builder::new();
        let v = b.bound_var("v", Sort::BitVec(2));
        let three = b.bv_lit(3u32, 2);
        let body = b.eq(v.clone(), three);
        let some = b.exists(v.clone(), body.clone());
        assert_eq!(eval(&some, &FxHashMap::default()), Ok(Value::Bool(true)));
        let all = b.forall(v, body);
        assert_eq!(eval(&all, &FxHashMap::default()), Ok(Value::Bool(false)));
        // boolean binders enumerate too
        let p = b.bound_var("p", Sort::Bool);
        let all_p = b.forall(p.clone(), p.clone());
        assert_eq!(eval(&all_p, &FxHashMap::default()), Ok(Value::Bool(false)));
        let some_p = b.exists(p.clone(), p);
        assert_eq!(eval(&some_p, &FxHashMap::default()), Ok(Value::Bool(true)));
    }

    #[test]
    fn wide_quantifiers_report_unsupported() {
        let mut b = Builder::new();
        let v = b.bound_var("v", Sort::Int);
        let zero = b.int_lit(0);
        let body = b.int_le(zero, v.clone());
        let q = b.forall(v, body);
        assert!(matches!(
            eval(&q, &FxHashMap::default()),
            Err(EvalError::Unsupported(_))
        ));
        assert_eq!(as_concrete(&q), None);
    }

    #[test]
    fn applications_evaluate_their_bodies() {
        let mut b = Builder::new();
        let p = b.bound_var("p", Sort::Int);
        let one = b.int_lit(1);
        let body = b.int_add(p.clone(), one);
        // `Never` keeps the application node, so evaluation must unfold
        let inc = b.define_fun("inc", vec![p], body, UnfoldPolicy::Never);
        let two = b.int_lit(2);
        let app = b.apply(inc, vec![two]);
        assert!(matches!(app.op(), Op::Apply(_)));
        assert_eq!(
            eval(&app, &FxHashMap::default()),
            Ok(Value::Int(Integer::from(3)))
        );
        assert_eq!(as_concrete(&app), Some(Value::Int(Integer::from(3))));
        // uninterpreted symbols have no evaluation
        let g = b.uninterp_fun("g", vec![Sort::Int], Sort::Int);
        let five = b.int_lit(5);
        let gapp = b.apply(g, vec![five]);
        assert!(matches!(
            eval(&gapp, &FxHashMap::default()),
            Err(EvalError::Unsupported(_))
        ));
        assert_eq!(as_concrete(&gapp), None);
    }

    #[test]
    fn bulk_array_ops_walk_ranges() {
        let mut b = Builder::new();
        let zero = b.int_lit(0);
        let a = b.const_array(vec![Sort::Int], zero);
        let five = b.int_lit(5);
        let nine = b.int_lit(9);
        let three = b.int_lit(3);
        let set = b.array_set(a.clone(), five.clone(), nine, three);
        let v = eval(&set, &FxHashMap::default()).unwrap();
        let arr = v.as_array();
        assert_eq!(arr.select(&[Value::Int(Integer::from(6))]), Value::Int(Integer::from(9)));
        assert_eq!(arr.select(&[Value::Int(Integer::from(8))]), Value::Int(Integer::from(0)));
        // a copy out of the set region picks the written values up
        let dst_at = b.int_lit(0);
        let two = b.int_lit(2);
        let copied = b.array_copy(a.clone(), dst_at, set.clone(), five.clone(), two.clone());
        let v = eval(&copied, &FxHashMap::default()).unwrap();
        assert_eq!(
            v.as_array().select(&[Value::Int(Integer::from(1))]),
            Value::Int(Integer::from(9))
        );
        // ranges on untouched indices compare equal
        let hundred = b.int_lit(100);
        let req = b.array_range_eq(a.clone(), set.clone(), hundred, two);
        assert_eq!(eval(&req, &FxHashMap::default()), Ok(Value::Bool(true)));
        let four = b.int_lit(4);
        let three = b.int_lit(3);
        let req2 = b.array_range_eq(a.clone(), set, four, three);
        assert_eq!(eval(&req2, &FxHashMap::default()), Ok(Value::Bool(false)));
        // over-long walks are refused, not attempted
        let huge = b.int_lit(1u64 << 40);
        let nine = b.int_lit(9);
        let too_big = b.array_set(a, five, nine, huge);
        assert!(matches!(
            eval(&too_big, &FxHashMap::default()),
            Err(EvalError::Unsupported(_))
        ));
        assert_eq!(as_concrete(&too_big), None);
    }
}
