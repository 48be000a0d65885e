//! Theory classification and the problem-features bitset.
//!
//! [theory_of] is a pure function from a node to the SMT theory a solver
//! must support to discharge it; [features_of] folds it (plus the
//! function-symbol flags) over every subterm of a collection.

use bitflags::bitflags;

use std::fmt::{self, Display, Formatter};

use crate::sort::Sort;
use crate::term::{Op, PostOrderIter, Term, TermSet};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Theory {
    Bool,
    LinArith,
    NonlinArith,
    /// Specials that are computable but outside linear/nonlinear arithmetic
    /// (square roots and friends).
    ComputableArith,
    Bv,
    Quant,
    Str,
    Float,
    Array,
    Struct,
    Fn,
}

impl Display for Theory {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let s = match self {
            Theory::Bool => "bool",
            Theory::LinArith => "linear arithmetic",
            Theory::NonlinArith => "nonlinear arithmetic",
            Theory::ComputableArith => "computable arithmetic",
            Theory::Bv => "bit-vectors",
            Theory::Quant => "quantifiers",
            Theory::Str => "strings",
            Theory::Float => "floats",
            Theory::Array => "arrays",
            Theory::Struct => "structs",
            Theory::Fn => "functions",
        };
        write!(f, "{}", s)
    }
}

fn theory_of_sort(s: &Sort) -> Theory {
    match s {
        Sort::Bool => Theory::Bool,
        Sort::Int | Sort::Real => Theory::LinArith,
        Sort::BitVec(_) => Theory::Bv,
        Sort::Float(..) => Theory::Float,
        Sort::Str(_) => Theory::Str,
        Sort::Tuple(_) => Theory::Struct,
        Sort::Array(..) => Theory::Array,
    }
}

/// The theory needed to discharge this node (children classify separately).
pub fn theory_of(t: &Term) -> Theory {
    match t.op() {
        Op::Var(..) | Op::BoundVar(..) | Op::Const(_) | Op::Ite | Op::Annot(_) => {
            theory_of_sort(t.sort())
        }
        Op::Eq => theory_of_sort(t.cs()[0].sort()),
        Op::Not | Op::And => Theory::Bool,

        Op::IntLe | Op::RealLe | Op::RealIsInt => Theory::LinArith,
        // a sum is linear unless a product sits in one of its entries
        Op::IntSum(..) | Op::RealSum(..) => {
            if t.cs().iter().any(|c| matches!(c.op(), Op::Prod(_))) {
                Theory::NonlinArith
            } else {
                Theory::LinArith
            }
        }
        Op::Prod(_) => match t.sort() {
            Sort::BitVec(_) => Theory::Bv,
            _ => Theory::NonlinArith,
        },
        // a literal divisor stays within linear arithmetic
        Op::IntDiv | Op::IntMod | Op::RealDiv => {
            if t.cs()[1].as_const().is_some() {
                Theory::LinArith
            } else {
                Theory::NonlinArith
            }
        }
        Op::RealSqrt => Theory::ComputableArith,
        Op::IntToReal | Op::RealToInt => Theory::LinArith,
        Op::IntToBv(_) | Op::UbvToInt | Op::SbvToInt => Theory::Bv,

        Op::BvUlt
        | Op::BvSlt
        | Op::BvBit(_)
        | Op::BvSum(..)
        | Op::BvXorSum(..)
        | Op::BvConcat
        | Op::BvExtract(..)
        | Op::BvUdiv
        | Op::BvUrem
        | Op::BvSdiv
        | Op::BvSrem
        | Op::BvShl
        | Op::BvLshr
        | Op::BvAshr
        | Op::BvRol
        | Op::BvRor
        | Op::BvUext(_)
        | Op::BvSext(_)
        | Op::BvAnd
        | Op::BvOr
        | Op::BvPopcount
        | Op::BvClz
        | Op::BvCtz
        | Op::BvFill(_) => Theory::Bv,

        Op::FpBinOp(_)
        | Op::FpUnOp(_)
        | Op::FpFma
        | Op::FpBinPred(_)
        | Op::FpUnPred(_)
        | Op::BvToFp(..)
        | Op::FpToBv
        | Op::UbvToFp(..)
        | Op::SbvToFp(..)
        | Op::FpToFp(..) => Theory::Float,

        Op::StrConcat
        | Op::StrLen
        | Op::StrContains
        | Op::StrIndexOf
        | Op::StrPrefixOf
        | Op::StrSuffixOf
        | Op::StrSubstr => Theory::Str,

        Op::ConstArray(_)
        | Op::Select
        | Op::Store
        | Op::ArrayEq
        | Op::ArrayMap(_)
        | Op::ArrayCopy
        | Op::ArraySet
        | Op::ArrayRangeEq => Theory::Array,

        Op::Tuple | Op::Field(_) => Theory::Struct,
        Op::Apply(_) => Theory::Fn,
        Op::Quant(_) => Theory::Quant,
    }
}

bitflags! {
    /// Which features a collection of terms demands of a solver.
    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
    pub struct ProblemFeatures: u32 {
        const BOOL             = 1 << 0;
        const LIN_ARITH        = 1 << 1;
        const NONLIN_ARITH     = 1 << 2;
        const COMPUTABLE_ARITH = 1 << 3;
        const BV               = 1 << 4;
        const QUANT            = 1 << 5;
        const STRINGS          = 1 << 6;
        const FLOAT            = 1 << 7;
        const ARRAY            = 1 << 8;
        const STRUCT           = 1 << 9;
        const FN               = 1 << 10;
        const UNSAT_CORES       = 1 << 11;
        const UNSAT_ASSUMPTIONS = 1 << 12;
        const UNINTERP_FNS      = 1 << 13;
        const DEFINED_FNS       = 1 << 14;
    }
}

impl Theory {
    pub fn feature(self) -> ProblemFeatures {
        match self {
            Theory::Bool => ProblemFeatures::BOOL,
            Theory::LinArith => ProblemFeatures::LIN_ARITH,
            Theory::NonlinArith => ProblemFeatures::NONLIN_ARITH,
            Theory::ComputableArith => ProblemFeatures::COMPUTABLE_ARITH,
            Theory::Bv => ProblemFeatures::BV,
            Theory::Quant => ProblemFeatures::QUANT,
            Theory::Str => ProblemFeatures::STRINGS,
            Theory::Float => ProblemFeatures::FLOAT,
            Theory::Array => ProblemFeatures::ARRAY,
            Theory::Struct => ProblemFeatures::STRUCT,
            Theory::Fn => ProblemFeatures::FN,
        }
    }
}

/// The features demanded by every subterm of `terms`.
pub fn features_of<'a>(terms: impl IntoIterator<Item = &'a Term>) -> ProblemFeatures {
    let mut fs = ProblemFeatures::empty();
    let mut seen = TermSet::new();
    for t in terms {
        for s in PostOrderIter::new(t.clone()) {
            if !seen.insert(s.clone()) {
                continue;
            }
            fs |= theory_of(&s).feature();
            if let Op::Apply(f) = s.op() {
                fs |= if f.body().is_some() {
                    ProblemFeatures::DEFINED_FNS
                } else {
                    ProblemFeatures::UNINTERP_FNS
                };
            }
        }
    }
    fs
}
