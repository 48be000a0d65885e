//! A symbolic expression engine for driving SMT solvers.
//!
//! Clients assemble terms over a fixed family of sorts (booleans,
//! mathematical integers, reals, fixed-width bit-vectors, IEEE floats,
//! strings, tuples, and multi-index arrays) through a [build::Builder].
//! Construction transparently performs constant folding, algebraic
//! normalization (weighted sums and products over four semirings, n-ary
//! boolean and bitwise normal forms, if-then-else fusion), and hash-consing,
//! and attaches to every node a sound abstract value (intervals, known
//! bits, tristates, length ranges) that downstream simplification and the
//! theory classifier consume.
//!
//! The engine does not decide satisfiability and has no wire protocol; SMT
//! serialization, solver management, and model parsing are external
//! consumers of [term::Term], the concrete projections, and the
//! [theory] classifier.

pub mod absdom;
pub mod algebra;
pub mod build;
pub mod bv;
pub mod err;
pub mod sort;
pub mod term;
pub mod theory;
pub mod value;

pub use absdom::{AbsVal, BvDomain, IntRange, RealAbs, RealRange, Tristate};
pub use build::{Builder, BuilderEvent, Opts};
pub use bv::BitVec;
pub use err::BuildError;
pub use sort::{Sort, StrEnc};
pub use term::eval::EvalError;
pub use term::{FnDef, Op, PostOrderIter, QuantKind, Term, TermMap, TermSet, UnfoldPolicy};
pub use theory::{features_of, theory_of, ProblemFeatures, Theory};
pub use value::{ArrayVal, FloatVal, StrVal, Value};
