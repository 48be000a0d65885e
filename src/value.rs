//! Concrete values, one variant per sort.

use rug::{Integer, Rational};
use serde::{Deserialize, Serialize};

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

use crate::bv::BitVec;
use crate::sort::{Sort, StrEnc};

/// An IEEE-754 value of shape `(eb, sb)`, stored as its bit pattern.
///
/// `sb` counts the hidden bit, so the pattern is `1 + eb + (sb - 1)` bits
/// wide. Arithmetic folds exactly for the binary32 and binary64 shapes (via
/// the native floats); sign operations and classification work at any shape.
#[derive(Clone, PartialEq, Eq, Hash, Debug, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FloatVal {
    eb: usize,
    sb: usize,
    bits: Integer,
}

impl FloatVal {
    pub fn new(eb: usize, sb: usize, bits: Integer) -> FloatVal {
        debug_assert!(eb >= 2 && sb >= 2);
        debug_assert!((bits.significant_bits() as usize) <= eb + sb);
        debug_assert!(bits >= 0);
        FloatVal { eb, sb, bits }
    }

    pub fn zero(eb: usize, sb: usize) -> FloatVal {
        FloatVal::new(eb, sb, Integer::from(0))
    }

    pub fn from_f32(f: f32) -> FloatVal {
        FloatVal::new(8, 24, Integer::from(f.to_bits()))
    }

    pub fn from_f64(f: f64) -> FloatVal {
        FloatVal::new(11, 53, Integer::from(f.to_bits()))
    }

    pub fn eb(&self) -> usize {
        self.eb
    }

    pub fn sb(&self) -> usize {
        self.sb
    }

    pub fn bits(&self) -> &Integer {
        &self.bits
    }

    pub fn total_width(&self) -> usize {
        self.eb + self.sb
    }

    pub fn to_f32(&self) -> Option<f32> {
        if (self.eb, self.sb) == (8, 24) {
            Some(f32::from_bits(self.bits.to_u32().unwrap()))
        } else {
            None
        }
    }

    pub fn to_f64(&self) -> Option<f64> {
        if (self.eb, self.sb) == (11, 53) {
            Some(f64::from_bits(self.bits.to_u64().unwrap()))
        } else {
            None
        }
    }

    pub fn sign_bit(&self) -> bool {
        self.bits.get_bit((self.eb + self.sb - 1) as u32)
    }

    fn exp_field(&self) -> Integer {
        Integer::from(&self.bits >> (self.sb - 1) as u32).keep_bits(self.eb as u32)
    }

    fn sig_field(&self) -> Integer {
        self.bits.clone().keep_bits((self.sb - 1) as u32)
    }

    pub fn is_nan(&self) -> bool {
        self.exp_field() == (Integer::from(1) << self.eb as u32) - 1 && self.sig_field() != 0
    }

    pub fn is_infinite(&self) -> bool {
        self.exp_field() == (Integer::from(1) << self.eb as u32) - 1 && self.sig_field() == 0
    }

    pub fn is_zero(&self) -> bool {
        self.exp_field() == 0 && self.sig_field() == 0
    }

    pub fn is_subnormal(&self) -> bool {
        self.exp_field() == 0 && self.sig_field() != 0
    }

    pub fn is_normal(&self) -> bool {
        let e = self.exp_field();
        e != 0 && e != (Integer::from(1) << self.eb as u32) - 1
    }

    pub fn is_negative(&self) -> bool {
        self.sign_bit() && !self.is_nan()
    }

    pub fn is_positive(&self) -> bool {
        !self.sign_bit() && !self.is_nan()
    }

    /// Sign flip; exact at every shape.
    pub fn neg(&self) -> FloatVal {
        let mut bits = self.bits.clone();
        let sign = (self.eb + self.sb - 1) as u32;
        bits.set_bit(sign, !bits.get_bit(sign));
        FloatVal::new(self.eb, self.sb, bits)
    }

    /// Sign clear; exact at every shape.
    pub fn abs(&self) -> FloatVal {
        let mut bits = self.bits.clone();
        bits.set_bit((self.eb + self.sb - 1) as u32, false);
        FloatVal::new(self.eb, self.sb, bits)
    }
}

impl Display for FloatVal {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        if let Some(v) = self.to_f32() {
            write!(f, "{}f32", v)
        } else if let Some(v) = self.to_f64() {
            write!(f, "{}f64", v)
        } else {
            write!(f, "(fp {} {} #x{:x})", self.eb, self.sb, self.bits)
        }
    }
}

/// A string value: a sequence of code units under a fixed encoding.
#[derive(Clone, PartialEq, Eq, Hash, Debug, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StrVal {
    enc: StrEnc,
    units: Vec<u32>,
}

impl StrVal {
    pub fn new(enc: StrEnc, units: Vec<u32>) -> StrVal {
        debug_assert!(units.iter().all(|u| *u < enc.unit_bound()));
        StrVal { enc, units }
    }

    pub fn empty(enc: StrEnc) -> StrVal {
        StrVal { enc, units: Vec::new() }
    }

    pub fn enc(&self) -> StrEnc {
        self.enc
    }

    pub fn units(&self) -> &[u32] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn concat(&self, other: &StrVal) -> StrVal {
        debug_assert_eq!(self.enc, other.enc);
        let mut units = self.units.clone();
        units.extend_from_slice(&other.units);
        StrVal { enc: self.enc, units }
    }

    /// The substring starting at `off` of length at most `n`; empty when
    /// `off` is past the end (SMT-LIB `str.substr` semantics).
    pub fn substr(&self, off: usize, n: usize) -> StrVal {
        let start = off.min(self.units.len());
        let end = off.saturating_add(n).min(self.units.len());
        StrVal {
            enc: self.enc,
            units: self.units[start..end].to_vec(),
        }
    }

    pub fn contains(&self, needle: &StrVal) -> bool {
        self.find(needle, 0).is_some()
    }

    /// First occurrence of `needle` at or after `from`, if any.
    pub fn find(&self, needle: &StrVal, from: usize) -> Option<usize> {
        let n = needle.units.len();
        if from > self.units.len() || self.units.len() - from < n {
            return None;
        }
        (from..=self.units.len() - n).find(|&i| self.units[i..i + n] == needle.units[..])
    }

    pub fn is_prefix_of(&self, other: &StrVal) -> bool {
        other.units.starts_with(&self.units)
    }

    pub fn is_suffix_of(&self, other: &StrVal) -> bool {
        other.units.ends_with(&self.units)
    }
}

impl Display for StrVal {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "\"")?;
        for u in &self.units {
            match char::from_u32(*u) {
                Some(c) if !c.is_control() => write!(f, "{}", c)?,
                _ => write!(f, "\\u{{{:x}}}", u)?,
            }
        }
        write!(f, "\"")
    }
}

/// An array value: a finite table of explicit entries over a default.
#[derive(Clone, PartialEq, Eq, Hash, Debug, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArrayVal {
    pub key_sorts: Vec<Sort>,
    pub default: Box<Value>,
    pub map: BTreeMap<Vec<Value>, Value>,
}

impl ArrayVal {
    pub fn constant(key_sorts: Vec<Sort>, default: Value) -> ArrayVal {
        ArrayVal {
            key_sorts,
            default: Box::new(default),
            map: BTreeMap::new(),
        }
    }

    pub fn select(&self, keys: &[Value]) -> Value {
        self.map
            .get(keys)
            .cloned()
            .unwrap_or_else(|| (*self.default).clone())
    }

    pub fn store(&self, keys: Vec<Value>, v: Value) -> ArrayVal {
        let mut n = self.clone();
        if v == *n.default {
            n.map.remove(&keys);
        } else {
            n.map.insert(keys, v);
        }
        n
    }
}

#[derive(Clone, PartialEq, Eq, Hash, Debug, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    Int(Integer),
    Real(Rational),
    BitVec(BitVec),
    Float(FloatVal),
    Str(StrVal),
    Tuple(Vec<Value>),
    Array(ArrayVal),
}

impl Value {
    pub fn sort(&self) -> Sort {
        match self {
            Value::Bool(_) => Sort::Bool,
            Value::Int(_) => Sort::Int,
            Value::Real(_) => Sort::Real,
            Value::BitVec(b) => Sort::BitVec(b.width()),
            Value::Float(v) => Sort::Float(v.eb(), v.sb()),
            Value::Str(s) => Sort::Str(s.enc()),
            Value::Tuple(vs) => Sort::Tuple(vs.iter().map(Value::sort).collect()),
            Value::Array(a) => Sort::Array(
                a.key_sorts.clone(),
                Box::new(a.default.sort()),
            ),
        }
    }

    #[track_caller]
    pub fn as_bool(&self) -> bool {
        if let Value::Bool(b) = self {
            *b
        } else {
            panic!("Not a bool: {}", self)
        }
    }

    #[track_caller]
    pub fn as_int(&self) -> &Integer {
        if let Value::Int(i) = self {
            i
        } else {
            panic!("Not an integer: {}", self)
        }
    }

    #[track_caller]
    pub fn as_real(&self) -> &Rational {
        if let Value::Real(r) = self {
            r
        } else {
            panic!("Not a real: {}", self)
        }
    }

    #[track_caller]
    pub fn as_bv(&self) -> &BitVec {
        if let Value::BitVec(b) = self {
            b
        } else {
            panic!("Not a bit-vector: {}", self)
        }
    }

    #[track_caller]
    pub fn as_float(&self) -> &FloatVal {
        if let Value::Float(v) = self {
            v
        } else {
            panic!("Not a float: {}", self)
        }
    }

    #[track_caller]
    pub fn as_str(&self) -> &StrVal {
        if let Value::Str(s) = self {
            s
        } else {
            panic!("Not a string: {}", self)
        }
    }

    #[track_caller]
    pub fn as_tuple(&self) -> &[Value] {
        if let Value::Tuple(vs) = self {
            vs
        } else {
            panic!("Not a tuple: {}", self)
        }
    }

    #[track_caller]
    pub fn as_array(&self) -> &ArrayVal {
        if let Value::Array(a) = self {
            a
        } else {
            panic!("Not an array: {}", self)
        }
    }

    pub fn as_bool_opt(&self) -> Option<bool> {
        if let Value::Bool(b) = self {
            Some(*b)
        } else {
            None
        }
    }

    pub fn as_int_opt(&self) -> Option<&Integer> {
        if let Value::Int(i) = self {
            Some(i)
        } else {
            None
        }
    }

    pub fn as_bv_opt(&self) -> Option<&BitVec> {
        if let Value::BitVec(b) = self {
            Some(b)
        } else {
            None
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Real(r) => write!(f, "{}", r),
            Value::BitVec(b) => write!(f, "{}", b),
            Value::Float(v) => write!(f, "{}", v),
            Value::Str(s) => write!(f, "{}", s),
            Value::Tuple(vs) => {
                write!(f, "(tuple")?;
                for v in vs {
                    write!(f, " {}", v)?;
                }
                write!(f, ")")
            }
            Value::Array(a) => {
                write!(f, "(array default:{}", a.default)?;
                for (k, v) in &a.map {
                    write!(f, " {:?}->{}", k, v)?;
                }
                write!(f, ")")
            }
        }
    }
}

impl Sort {
    /// The canonical zero element of this sort.
    pub fn default_value(&self) -> Value {
        match self {
            Sort::Bool => Value::Bool(false),
            Sort::Int => Value::Int(Integer::from(0)),
            Sort::Real => Value::Real(Rational::new()),
            Sort::BitVec(w) => Value::BitVec(BitVec::zeros(*w)),
            Sort::Float(eb, sb) => Value::Float(FloatVal::zero(*eb, *sb)),
            Sort::Str(e) => Value::Str(StrVal::empty(*e)),
            Sort::Tuple(fields) => {
                Value::Tuple(fields.iter().map(Sort::default_value).collect())
            }
            Sort::Array(ks, v) => {
                Value::Array(ArrayVal::constant(ks.clone(), v.default_value()))
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn float_classify() {
        assert!(FloatVal::from_f32(f32::NAN).is_nan());
        assert!(FloatVal::from_f32(f32::INFINITY).is_infinite());
        assert!(FloatVal::from_f64(0.0).is_zero());
        assert!(FloatVal::from_f64(-0.0).is_zero());
        assert!(FloatVal::from_f64(1.5).is_normal());
        assert!(FloatVal::from_f32(f32::MIN_POSITIVE / 2.0).is_subnormal());
    }

    #[test]
    fn float_sign_ops() {
        let v = FloatVal::from_f64(-2.5);
        assert_eq!(v.neg().to_f64(), Some(2.5));
        assert_eq!(v.abs().to_f64(), Some(2.5));
        let odd = FloatVal::new(5, 11, Integer::from(1) << 15);
        assert!(odd.sign_bit());
        assert!(!odd.neg().sign_bit());
    }

    #[test]
    fn str_search() {
        let s = StrVal::new(StrEnc::Char8, vec![104, 101, 108, 108, 111]);
        let ll = StrVal::new(StrEnc::Char8, vec![108, 108]);
        assert!(s.contains(&ll));
        assert_eq!(s.find(&ll, 0), Some(2));
        assert_eq!(s.find(&ll, 3), None);
        assert_eq!(s.substr(1, 3).units(), &[101, 108, 108]);
        assert_eq!(s.substr(4, 10).len(), 1);
        assert_eq!(s.substr(9, 2).len(), 0);
        assert!(StrVal::new(StrEnc::Char8, vec![104]).is_prefix_of(&s));
        assert!(StrVal::new(StrEnc::Char8, vec![111]).is_suffix_of(&s));
    }

    #[test]
    fn array_store_select() {
        let a = ArrayVal::constant(vec![Sort::Int], Value::Bool(false));
        let k = vec![Value::Int(Integer::from(3))];
        let b = a.store(k.clone(), Value::Bool(true));
        assert_eq!(b.select(&k), Value::Bool(true));
        assert_eq!(b.select(&[Value::Int(Integer::from(4))]), Value::Bool(false));
        // storing the default again erases the entry
        let c = b.store(k.clone(), Value::Bool(false));
        assert!(c.map.is_empty());
    }

    #[test]
    fn default_values() {
        assert_eq!(Sort::Bool.default_value(), Value::Bool(false));
        assert_eq!(
            Sort::Tuple(vec![Sort::Bool, Sort::Int]).default_value().sort(),
            Sort::Tuple(vec![Sort::Bool, Sort::Int])
        );
    }
}
