//! Floating-point operations.
//!
//! Arithmetic folds exactly for the binary32/binary64 shapes via native
//! floats; sign operations and classification fold at any shape. Abstract
//! values stay opaque, so nothing here consults domains.

use super::Builder;
use crate::term::eval::eval_op;
use crate::term::{FpBinOp, FpBinPred, FpUnOp, FpUnPred, Op, Term};
use crate::value::{FloatVal, Value};

impl Builder {
    pub fn fp_lit(&mut self, v: FloatVal) -> Term {
        self.constant(Value::Float(v))
    }

    pub fn fp32_lit(&mut self, f: f32) -> Term {
        self.fp_lit(FloatVal::from_f32(f))
    }

    pub fn fp64_lit(&mut self, f: f64) -> Term {
        self.fp_lit(FloatVal::from_f64(f))
    }

    /// Intern, folding through the evaluator when every child is constant.
    pub(crate) fn mk_fold(&mut self, op: Op, cs: Vec<Term>) -> Term {
        let args: Option<Vec<&Value>> = cs.iter().map(|c| c.as_const()).collect();
        if let Some(args) = args {
            // every float operator is context-free and total on constants
            let v = eval_op(&op, &args).expect("float operator on constants");
            return self.constant(v);
        }
        self.mk(op, cs)
    }

    pub fn fp_add(&mut self, a: Term, b: Term) -> Term {
        self.mk_fold(Op::FpBinOp(FpBinOp::Add), vec![a, b])
    }

    pub fn fp_sub(&mut self, a: Term, b: Term) -> Term {
        self.mk_fold(Op::FpBinOp(FpBinOp::Sub), vec![a, b])
    }

    pub fn fp_mul(&mut self, a: Term, b: Term) -> Term {
        self.mk_fold(Op::FpBinOp(FpBinOp::Mul), vec![a, b])
    }

    pub fn fp_div(&mut self, a: Term, b: Term) -> Term {
        self.mk_fold(Op::FpBinOp(FpBinOp::Div), vec![a, b])
    }

    pub fn fp_rem(&mut self, a: Term, b: Term) -> Term {
        self.mk_fold(Op::FpBinOp(FpBinOp::Rem), vec![a, b])
    }

    pub fn fp_min(&mut self, a: Term, b: Term) -> Term {
        self.mk_fold(Op::FpBinOp(FpBinOp::Min), vec![a, b])
    }

    pub fn fp_max(&mut self, a: Term, b: Term) -> Term {
        self.mk_fold(Op::FpBinOp(FpBinOp::Max), vec![a, b])
    }

    pub fn fp_neg(&mut self, a: Term) -> Term {
        if let Op::FpUnOp(FpUnOp::Neg) = a.op() {
            return a.cs()[0].clone();
        }
        self.mk_fold(Op::FpUnOp(FpUnOp::Neg), vec![a])
    }

    pub fn fp_abs(&mut self, a: Term) -> Term {
        if let Op::FpUnOp(FpUnOp::Abs) = a.op() {
            return a;
        }
        self.mk_fold(Op::FpUnOp(FpUnOp::Abs), vec![a])
    }

    pub fn fp_sqrt(&mut self, a: Term) -> Term {
        self.mk_fold(Op::FpUnOp(FpUnOp::Sqrt), vec![a])
    }

    /// Round to integral, ties to even.
    pub fn fp_round(&mut self, a: Term) -> Term {
        if let Op::FpUnOp(FpUnOp::Round) = a.op() {
            return a;
        }
        self.mk_fold(Op::FpUnOp(FpUnOp::Round), vec![a])
    }

    pub fn fp_fma(&mut self, a: Term, b: Term, c: Term) -> Term {
        self.mk_fold(Op::FpFma, vec![a, b, c])
    }

    /// IEEE `<=`: false on NaN.
    pub fn fp_le(&mut self, a: Term, b: Term) -> Term {
        self.mk_fold(Op::FpBinPred(FpBinPred::Le), vec![a, b])
    }

    /// IEEE `<`: false on NaN.
    pub fn fp_lt(&mut self, a: Term, b: Term) -> Term {
        self.mk_fold(Op::FpBinPred(FpBinPred::Lt), vec![a, b])
    }

    /// IEEE equality: false on NaN, true on ±0.
    pub fn fp_eq(&mut self, a: Term, b: Term) -> Term {
        self.mk_fold(Op::FpBinPred(FpBinPred::Eq), vec![a, b])
    }

    pub fn fp_is(&mut self, p: FpUnPred, a: Term) -> Term {
        self.mk_fold(Op::FpUnPred(p), vec![a])
    }

    pub fn fp_is_nan(&mut self, a: Term) -> Term {
        self.fp_is(FpUnPred::Nan, a)
    }

    pub fn fp_is_zero(&mut self, a: Term) -> Term {
        self.fp_is(FpUnPred::Zero, a)
    }

    pub fn fp_is_infinite(&mut self, a: Term) -> Term {
        self.fp_is(FpUnPred::Infinite, a)
    }

    // ---- conversions ----

    /// Bit-pattern cast from `BitVec(eb+sb)`.
    pub fn bv_to_fp(&mut self, a: Term, eb: usize, sb: usize) -> Term {
        // cast of a cast is the original pattern
        if let Op::FpToBv = a.op() {
            let inner = a.cs()[0].clone();
            if inner.sort().as_float() == (eb, sb) {
                return inner;
            }
        }
        self.mk_fold(Op::BvToFp(eb, sb), vec![a])
    }

    /// Bit-pattern cast to `BitVec(eb+sb)`.
    pub fn fp_to_bv(&mut self, a: Term) -> Term {
        if let Op::BvToFp(..) = a.op() {
            return a.cs()[0].clone();
        }
        self.mk_fold(Op::FpToBv, vec![a])
    }

    pub fn ubv_to_fp(&mut self, a: Term, eb: usize, sb: usize) -> Term {
        self.mk_fold(Op::UbvToFp(eb, sb), vec![a])
    }

    pub fn sbv_to_fp(&mut self, a: Term, eb: usize, sb: usize) -> Term {
        self.mk_fold(Op::SbvToFp(eb, sb), vec![a])
    }

    pub fn fp_to_fp(&mut self, a: Term, eb: usize, sb: usize) -> Term {
        if a.sort().as_float() == (eb, sb) {
            return a;
        }
        self.mk_fold(Op::FpToFp(eb, sb), vec![a])
    }
}
