//! Abstract values: one lattice per sort.
//!
//! Every interned term carries an [AbsVal] computed at construction. The
//! values are sound over-approximations: the denotation of a term under any
//! environment lies inside its abstract value. Joins happen only across
//! if-then-else arms, never in a fixpoint, so no widening is needed.

use rug::Integer;
use serde::{Deserialize, Serialize};

use std::fmt::{self, Display, Formatter};

pub mod bvd;
pub mod int;
pub mod real;

pub use bvd::BvDomain;
pub use int::IntRange;
pub use real::{Bound, RealAbs, RealRange};

use crate::sort::Sort;
use crate::value::Value;

/// Three-valued boolean: known true, known false, or unknown.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Tristate {
    True,
    False,
    Unknown,
}

impl Tristate {
    pub fn from_bool(b: bool) -> Tristate {
        if b {
            Tristate::True
        } else {
            Tristate::False
        }
    }

    pub fn as_bool(self) -> Option<bool> {
        match self {
            Tristate::True => Some(true),
            Tristate::False => Some(false),
            Tristate::Unknown => None,
        }
    }

    pub fn not(self) -> Tristate {
        match self {
            Tristate::True => Tristate::False,
            Tristate::False => Tristate::True,
            Tristate::Unknown => Tristate::Unknown,
        }
    }

    pub fn and(self, other: Tristate) -> Tristate {
        match (self, other) {
            (Tristate::False, _) | (_, Tristate::False) => Tristate::False,
            (Tristate::True, Tristate::True) => Tristate::True,
            _ => Tristate::Unknown,
        }
    }

    pub fn or(self, other: Tristate) -> Tristate {
        self.not().and(other.not()).not()
    }

    pub fn xor(self, other: Tristate) -> Tristate {
        match (self.as_bool(), other.as_bool()) {
            (Some(a), Some(b)) => Tristate::from_bool(a != b),
            _ => Tristate::Unknown,
        }
    }

    pub fn join(self, other: Tristate) -> Tristate {
        if self == other {
            self
        } else {
            Tristate::Unknown
        }
    }
}

impl Display for Tristate {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Tristate::True => write!(f, "T"),
            Tristate::False => write!(f, "F"),
            Tristate::Unknown => write!(f, "?"),
        }
    }
}

/// The sort-indexed abstract value attached to every term.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum AbsVal {
    Bool(Tristate),
    Int(IntRange),
    Real(RealAbs),
    Bv(BvDomain),
    /// Floats are opaque.
    Float,
    /// Length range of a string; the lower endpoint is always ≥ 0.
    Str(IntRange),
    Tuple(Vec<AbsVal>),
    /// Domain of every element the array may hold.
    Array(Box<AbsVal>),
}

impl AbsVal {
    /// The top element for a sort.
    pub fn top(sort: &Sort) -> AbsVal {
        match sort {
            Sort::Bool => AbsVal::Bool(Tristate::Unknown),
            Sort::Int => AbsVal::Int(IntRange::top()),
            Sort::Real => AbsVal::Real(RealAbs::top()),
            Sort::BitVec(w) => AbsVal::Bv(BvDomain::top(*w)),
            Sort::Float(..) => AbsVal::Float,
            Sort::Str(_) => AbsVal::Str(IntRange::nonneg()),
            Sort::Tuple(fields) => AbsVal::Tuple(fields.iter().map(AbsVal::top).collect()),
            Sort::Array(_, v) => AbsVal::Array(Box::new(AbsVal::top(v))),
        }
    }

    /// The singleton abstraction of a concrete value.
    pub fn singleton(v: &Value) -> AbsVal {
        match v {
            Value::Bool(b) => AbsVal::Bool(Tristate::from_bool(*b)),
            Value::Int(i) => AbsVal::Int(IntRange::singleton(i.clone())),
            Value::Real(q) => AbsVal::Real(RealAbs::singleton(q.clone())),
            Value::BitVec(b) => AbsVal::Bv(BvDomain::singleton(b)),
            Value::Float(_) => AbsVal::Float,
            Value::Str(s) => AbsVal::Str(IntRange::singleton(Integer::from(s.len()))),
            Value::Tuple(vs) => AbsVal::Tuple(vs.iter().map(AbsVal::singleton).collect()),
            Value::Array(a) => {
                let mut elem = AbsVal::singleton(&a.default);
                for v in a.map.values() {
                    elem = elem.join(&AbsVal::singleton(v));
                }
                AbsVal::Array(Box::new(elem))
            }
        }
    }

    /// Join of two same-shaped abstract values. Joining values of different
    /// shapes is a programmer error.
    #[track_caller]
    pub fn join(&self, other: &AbsVal) -> AbsVal {
        match (self, other) {
            (AbsVal::Bool(a), AbsVal::Bool(b)) => AbsVal::Bool(a.join(*b)),
            (AbsVal::Int(a), AbsVal::Int(b)) => AbsVal::Int(a.join(b)),
            (AbsVal::Real(a), AbsVal::Real(b)) => AbsVal::Real(a.join(b)),
            (AbsVal::Bv(a), AbsVal::Bv(b)) => AbsVal::Bv(a.join(b)),
            (AbsVal::Float, AbsVal::Float) => AbsVal::Float,
            (AbsVal::Str(a), AbsVal::Str(b)) => AbsVal::Str(a.join(b)),
            (AbsVal::Tuple(a), AbsVal::Tuple(b)) => {
                assert_eq!(a.len(), b.len(), "joining tuples of different arity");
                AbsVal::Tuple(a.iter().zip(b).map(|(x, y)| x.join(y)).collect())
            }
            (AbsVal::Array(a), AbsVal::Array(b)) => AbsVal::Array(Box::new(a.join(b))),
            (a, b) => panic!("cannot join {:?} with {:?}", a, b),
        }
    }

    /// Can the two abstract values denote equal concrete values?
    pub fn check_eq(&self, other: &AbsVal) -> Tristate {
        match (self, other) {
            (AbsVal::Bool(a), AbsVal::Bool(b)) => match (a.as_bool(), b.as_bool()) {
                (Some(x), Some(y)) => Tristate::from_bool(x == y),
                _ => Tristate::Unknown,
            },
            (AbsVal::Int(a), AbsVal::Int(b)) => a.check_eq(b),
            (AbsVal::Real(a), AbsVal::Real(b)) => a.check_eq(b),
            (AbsVal::Bv(a), AbsVal::Bv(b)) => a.check_eq(b),
            (AbsVal::Float, AbsVal::Float) => Tristate::Unknown,
            // length ranges can only refute string equality
            (AbsVal::Str(a), AbsVal::Str(b)) => match a.check_eq(b) {
                Tristate::False => Tristate::False,
                _ => Tristate::Unknown,
            },
            (AbsVal::Tuple(a), AbsVal::Tuple(b)) => {
                let mut all = Tristate::True;
                for (x, y) in a.iter().zip(b) {
                    all = all.and(x.check_eq(y));
                    if all == Tristate::False {
                        return Tristate::False;
                    }
                }
                all
            }
            // element domains: disjoint elements refute; equal singletons
            // force pointwise-equal reads
            (AbsVal::Array(a), AbsVal::Array(b)) => a.check_eq(b),
            _ => Tristate::Unknown,
        }
    }

    /// Does the abstract value pin down a single concrete value? Only
    /// meaningful for scalar shapes; tuples recurse, the rest give `None`.
    pub fn as_singleton(&self) -> Option<Value> {
        match self {
            AbsVal::Bool(t) => t.as_bool().map(Value::Bool),
            AbsVal::Int(r) => r.as_singleton().cloned().map(Value::Int),
            AbsVal::Real(r) => r.as_singleton().cloned().map(Value::Real),
            AbsVal::Bv(d) => d.as_singleton().map(Value::BitVec),
            AbsVal::Tuple(fields) => fields
                .iter()
                .map(AbsVal::as_singleton)
                .collect::<Option<Vec<_>>>()
                .map(Value::Tuple),
            _ => None,
        }
    }

    #[track_caller]
    pub fn as_bool(&self) -> Tristate {
        if let AbsVal::Bool(t) = self {
            *t
        } else {
            panic!("not a boolean abstract value: {:?}", self)
        }
    }

    #[track_caller]
    pub fn as_int(&self) -> &IntRange {
        if let AbsVal::Int(r) = self {
            r
        } else {
            panic!("not an integer abstract value: {:?}", self)
        }
    }

    #[track_caller]
    pub fn as_real(&self) -> &RealAbs {
        if let AbsVal::Real(r) = self {
            r
        } else {
            panic!("not a real abstract value: {:?}", self)
        }
    }

    #[track_caller]
    pub fn as_bv(&self) -> &BvDomain {
        if let AbsVal::Bv(d) = self {
            d
        } else {
            panic!("not a bit-vector abstract value: {:?}", self)
        }
    }

    #[track_caller]
    pub fn as_str_len(&self) -> &IntRange {
        if let AbsVal::Str(r) = self {
            r
        } else {
            panic!("not a string abstract value: {:?}", self)
        }
    }

    #[track_caller]
    pub fn as_tuple(&self) -> &[AbsVal] {
        if let AbsVal::Tuple(fields) = self {
            fields
        } else {
            panic!("not a tuple abstract value: {:?}", self)
        }
    }

    #[track_caller]
    pub fn as_array_elem(&self) -> &AbsVal {
        if let AbsVal::Array(e) = self {
            e
        } else {
            panic!("not an array abstract value: {:?}", self)
        }
    }

    /// Does this abstract value contain the concrete value?
    pub fn contains(&self, v: &Value) -> bool {
        match (self, v) {
            (AbsVal::Bool(t), Value::Bool(b)) => t.as_bool().map_or(true, |x| x == *b),
            (AbsVal::Int(r), Value::Int(i)) => r.contains(i),
            (AbsVal::Real(r), Value::Real(q)) => {
                let in_range = match r.range.as_singleton() {
                    Some(s) => s == q,
                    None => {
                        let above = match &r.range.lo {
                            Bound::Unbounded => true,
                            Bound::Closed(l) => l <= q,
                            Bound::Open(l) => l < q,
                        };
                        let below = match &r.range.hi {
                            Bound::Unbounded => true,
                            Bound::Closed(h) => q <= h,
                            Bound::Open(h) => q < h,
                        };
                        above && below
                    }
                };
                in_range
                    && r.is_int
                        .as_bool()
                        .map_or(true, |b| b == q.is_integer())
            }
            (AbsVal::Bv(d), Value::BitVec(b)) => d.contains(b),
            (AbsVal::Float, Value::Float(_)) => true,
            (AbsVal::Str(r), Value::Str(s)) => r.contains(&Integer::from(s.len())),
            (AbsVal::Tuple(fs), Value::Tuple(vs)) => {
                fs.len() == vs.len() && fs.iter().zip(vs).all(|(f, v)| f.contains(v))
            }
            (AbsVal::Array(e), Value::Array(a)) => {
                e.contains(&a.default) && a.map.values().all(|v| e.contains(v))
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::bv::BitVec;

    #[test]
    fn tristate_tables() {
        use Tristate::*;
        assert_eq!(True.and(Unknown), Unknown);
        assert_eq!(False.and(Unknown), False);
        assert_eq!(True.or(Unknown), True);
        assert_eq!(False.or(Unknown), Unknown);
        assert_eq!(True.xor(True), False);
        assert_eq!(True.xor(Unknown), Unknown);
        assert_eq!(True.join(False), Unknown);
        assert_eq!(True.join(True), True);
    }

    #[test]
    fn singleton_contains() {
        let v = Value::BitVec(BitVec::new(Integer::from(5), 8));
        let a = AbsVal::singleton(&v);
        assert!(a.contains(&v));
        assert_eq!(a.as_singleton(), Some(v));
    }

    #[test]
    fn tuple_check_eq() {
        let a = AbsVal::Tuple(vec![
            AbsVal::Bool(Tristate::True),
            AbsVal::Int(IntRange::top()),
        ]);
        let b = AbsVal::Tuple(vec![
            AbsVal::Bool(Tristate::False),
            AbsVal::Int(IntRange::top()),
        ]);
        assert_eq!(a.check_eq(&b), Tristate::False);
        assert_eq!(a.check_eq(&a), Tristate::Unknown);
    }

    #[test]
    fn join_of_singletons_contains_both() {
        let x = Value::Int(Integer::from(3));
        let y = Value::Int(Integer::from(9));
        let j = AbsVal::singleton(&x).join(&AbsVal::singleton(&y));
        assert!(j.contains(&x));
        assert!(j.contains(&y));
        assert_eq!(j.as_singleton(), None);
    }
}
