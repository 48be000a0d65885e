//! The closed family of sorts.
//!
//! Sorts are structural: two sorts are equal exactly when they are built the
//! same way. Every term carries its sort; the builder checks operator
//! arguments against these at construction time.

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use std::fmt::{self, Display, Formatter};

/// Encoding of a string sort's code units.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StrEnc {
    /// 8-bit code units.
    Char8,
    /// 16-bit code units.
    Char16,
    /// Unicode scalar values.
    Unicode,
}

impl StrEnc {
    /// Exclusive upper bound on a single code unit.
    pub fn unit_bound(&self) -> u32 {
        match self {
            StrEnc::Char8 => 1 << 8,
            StrEnc::Char16 => 1 << 16,
            StrEnc::Unicode => 0x11_0000,
        }
    }
}

#[derive(Clone, PartialEq, Eq, Hash, Debug, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Sort {
    Bool,
    /// Unbounded mathematical integers.
    Int,
    /// Rationals.
    Real,
    BitVec(usize),
    /// IEEE-754 float with the given exponent and significand widths.
    Float(usize, usize),
    Str(StrEnc),
    Tuple(Vec<Sort>),
    /// One or more index sorts, and a value sort.
    Array(Vec<Sort>, Box<Sort>),
}

impl Sort {
    #[track_caller]
    pub fn as_bv(&self) -> usize {
        if let Sort::BitVec(w) = self {
            *w
        } else {
            panic!("{} is not a bit-vector sort", self)
        }
    }

    #[track_caller]
    pub fn as_float(&self) -> (usize, usize) {
        if let Sort::Float(eb, sb) = self {
            (*eb, *sb)
        } else {
            panic!("{} is not a float sort", self)
        }
    }

    #[track_caller]
    pub fn as_str_enc(&self) -> StrEnc {
        if let Sort::Str(e) = self {
            *e
        } else {
            panic!("{} is not a string sort", self)
        }
    }

    #[track_caller]
    pub fn as_tuple(&self) -> &[Sort] {
        if let Sort::Tuple(fields) = self {
            fields
        } else {
            panic!("{} is not a tuple sort", self)
        }
    }

    #[track_caller]
    pub fn as_array(&self) -> (&[Sort], &Sort) {
        if let Sort::Array(ks, v) = self {
            (ks, v)
        } else {
            panic!("{} is not an array sort", self)
        }
    }

    pub fn is_bv(&self) -> bool {
        matches!(self, Sort::BitVec(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Sort::Array(..))
    }
}

impl Display for Sort {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Sort::Bool => write!(f, "bool"),
            Sort::Int => write!(f, "int"),
            Sort::Real => write!(f, "real"),
            Sort::BitVec(w) => write!(f, "(bv {})", w),
            Sort::Float(eb, sb) => write!(f, "(fp {} {})", eb, sb),
            Sort::Str(StrEnc::Char8) => write!(f, "(str char8)"),
            Sort::Str(StrEnc::Char16) => write!(f, "(str char16)"),
            Sort::Str(StrEnc::Unicode) => write!(f, "(str unicode)"),
            Sort::Tuple(fields) => {
                write!(f, "(tuple")?;
                for s in fields {
                    write!(f, " {}", s)?;
                }
                write!(f, ")")
            }
            Sort::Array(ks, v) => {
                write!(f, "(array ({}) {})", ks.iter().format(" "), v)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn structural_eq() {
        assert_eq!(Sort::BitVec(8), Sort::BitVec(8));
        assert_ne!(Sort::BitVec(8), Sort::BitVec(9));
        assert_eq!(
            Sort::Array(vec![Sort::Int], Box::new(Sort::Bool)),
            Sort::Array(vec![Sort::Int], Box::new(Sort::Bool)),
        );
        assert_ne!(Sort::Str(StrEnc::Char8), Sort::Str(StrEnc::Unicode));
    }

    #[test]
    fn display() {
        assert_eq!(Sort::BitVec(16).to_string(), "(bv 16)");
        assert_eq!(
            Sort::Array(vec![Sort::Int], Box::new(Sort::Bool)).to_string(),
            "(array (int) bool)"
        );
    }
}
