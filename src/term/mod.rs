//! Hash-consed term representation.
//!
//! A [Term] is an immutable, interned node: operator, children, sort, and
//! abstract value. Identity (`uid`) is allocated per builder from a
//! monotonically increasing counter, so identity tests, hashing, and the
//! orderings that canonicalize sums and products are all O(1).
//!
//! Structural equality is `(op, child identities)`; the cached sort and
//! abstract value are deterministic functions of those and take no part in
//! identity.

use hashconsing::HConsed;
use rug::{Integer, Rational};

use std::fmt::{self, Debug, Display, Formatter};
use std::sync::Arc;

pub mod absint;
pub mod eval;
pub mod ty;

#[cfg(test)]
pub mod dist;

use crate::absdom::AbsVal;
use crate::bv::BitVec;
use crate::sort::Sort;
use crate::value::Value;

/// Floating-point binary arithmetic.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum FpBinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Min,
    Max,
}

impl Display for FpBinOp {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            FpBinOp::Add => write!(f, "fpadd"),
            FpBinOp::Sub => write!(f, "fpsub"),
            FpBinOp::Mul => write!(f, "fpmul"),
            FpBinOp::Div => write!(f, "fpdiv"),
            FpBinOp::Rem => write!(f, "fprem"),
            FpBinOp::Min => write!(f, "fpmin"),
            FpBinOp::Max => write!(f, "fpmax"),
        }
    }
}

/// Floating-point unary arithmetic.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum FpUnOp {
    Neg,
    Abs,
    Sqrt,
    /// Round to integral, ties to even.
    Round,
}

impl Display for FpUnOp {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            FpUnOp::Neg => write!(f, "fpneg"),
            FpUnOp::Abs => write!(f, "fpabs"),
            FpUnOp::Sqrt => write!(f, "fpsqrt"),
            FpUnOp::Round => write!(f, "fpround"),
        }
    }
}

/// Floating-point comparisons (IEEE semantics: NaN compares false).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum FpBinPred {
    Le,
    Lt,
    Eq,
}

impl Display for FpBinPred {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            FpBinPred::Le => write!(f, "fple"),
            FpBinPred::Lt => write!(f, "fplt"),
            FpBinPred::Eq => write!(f, "fpeq"),
        }
    }
}

/// Floating-point classification predicates.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum FpUnPred {
    Normal,
    Subnormal,
    Zero,
    Infinite,
    Nan,
    Negative,
    Positive,
}

impl Display for FpUnPred {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            FpUnPred::Normal => write!(f, "fpnormal"),
            FpUnPred::Subnormal => write!(f, "fpsubnormal"),
            FpUnPred::Zero => write!(f, "fpzero"),
            FpUnPred::Infinite => write!(f, "fpinfinite"),
            FpUnPred::Nan => write!(f, "fpnan"),
            FpUnPred::Negative => write!(f, "fpnegative"),
            FpUnPred::Positive => write!(f, "fppositive"),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum QuantKind {
    Forall,
    Exists,
}

impl Display for QuantKind {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            QuantKind::Forall => write!(f, "forall"),
            QuantKind::Exists => write!(f, "exists"),
        }
    }
}

/// When an application of a defined function is replaced by its body.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum UnfoldPolicy {
    Never,
    Always,
    /// Unfold only when every argument is ground.
    WhenConcrete,
}

/// A function symbol: uninterpreted when `body` is absent, defined otherwise.
///
/// Symbols are identified by their builder-issued id; two definitions with
/// identical bodies are still distinct symbols.
#[derive(Clone)]
pub struct FnDef(Arc<FnDefData>);

pub struct FnDefData {
    pub id: u64,
    pub name: String,
    /// Bound-variable terms standing for the parameters.
    pub params: Vec<Term>,
    pub ret: Sort,
    pub body: Option<Term>,
    pub policy: UnfoldPolicy,
}

impl FnDef {
    pub fn new(data: FnDefData) -> FnDef {
        FnDef(Arc::new(data))
    }

    pub fn id(&self) -> u64 {
        self.0.id
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn params(&self) -> &[Term] {
        &self.0.params
    }

    pub fn arg_sorts(&self) -> impl Iterator<Item = &Sort> {
        self.0.params.iter().map(|p| p.sort())
    }

    pub fn ret(&self) -> &Sort {
        &self.0.ret
    }

    pub fn body(&self) -> Option<&Term> {
        self.0.body.as_ref()
    }

    pub fn policy(&self) -> UnfoldPolicy {
        self.0.policy
    }
}

impl PartialEq for FnDef {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for FnDef {}

impl std::hash::Hash for FnDef {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl Debug for FnDef {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}#{}", self.0.name, self.0.id)
    }
}

impl Display for FnDef {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.0.name)
    }
}

/// Operator kinds, organized by theory.
///
/// Sum nodes carry their coefficient vector and offset in the payload,
/// aligned with `cs` (which is ordered by child uid); product nodes carry
/// their occurrence counts the same way. Derived boolean connectives
/// (`or`, `xor`, `implies`) have no node kind: the builder lowers them to
/// `And`/`Not`. Bitwise bit-vector negation likewise lowers to an xor-sum
/// with an all-ones offset.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Op {
    Var(String, Sort),
    /// A binder-unique variable; the nonce keeps distinct binding sites
    /// distinct under interning.
    BoundVar(u64, String, Sort),
    Const(Value),

    Ite,
    Eq,
    Not,
    /// N-ary conjunction.
    And,

    IntLe,
    RealLe,
    RealIsInt,
    BvUlt,
    BvSlt,
    /// Test of bit `i`.
    BvBit(usize),

    /// `Σ cᵢ·xᵢ + k` over the integers.
    IntSum(Vec<Integer>, Integer),
    /// `Σ cᵢ·xᵢ + k` over the rationals.
    RealSum(Vec<Rational>, Rational),
    /// `Σ cᵢ·xᵢ + k` over width-w modular arithmetic.
    BvSum(Vec<BitVec>, BitVec),
    /// `⊕ (cᵢ ∧ xᵢ) ⊕ k`: the xor semiring with bitmask coefficients.
    BvXorSum(Vec<BitVec>, BitVec),
    /// `Π xᵢ^nᵢ`; the semiring is determined by the sort.
    Prod(Vec<u32>),

    IntDiv,
    IntMod,
    RealDiv,
    RealSqrt,
    IntToReal,
    /// Floor.
    RealToInt,
    IntToBv(usize),
    UbvToInt,
    SbvToInt,

    BvConcat,
    /// Bits `high..=low`.
    BvExtract(usize, usize),
    BvUdiv,
    BvUrem,
    BvSdiv,
    BvSrem,
    BvShl,
    BvLshr,
    BvAshr,
    BvRol,
    BvRor,
    BvUext(usize),
    BvSext(usize),
    BvAnd,
    BvOr,
    BvPopcount,
    BvClz,
    BvCtz,
    /// All bits set to the boolean argument.
    BvFill(usize),

    FpBinOp(FpBinOp),
    FpUnOp(FpUnOp),
    FpFma,
    FpBinPred(FpBinPred),
    FpUnPred(FpUnPred),
    /// Bit-pattern cast from `BitVec(eb+sb)`.
    BvToFp(usize, usize),
    /// Bit-pattern cast to `BitVec(eb+sb)`.
    FpToBv,
    UbvToFp(usize, usize),
    SbvToFp(usize, usize),
    FpToFp(usize, usize),

    StrConcat,
    StrLen,
    StrContains,
    StrIndexOf,
    StrPrefixOf,
    StrSuffixOf,
    StrSubstr,

    /// Constant array over the given index sorts; the child is the default.
    ConstArray(Vec<Sort>),
    /// `(select a i₁ … iₖ)`.
    Select,
    /// `(store a i₁ … iₖ v)`.
    Store,
    ArrayEq,
    /// Pointwise application of a function to arrays.
    ArrayMap(FnDef),
    /// `(copy dst i src j n)`.
    ArrayCopy,
    /// `(set a i v n)`.
    ArraySet,
    /// `(range-eq a b i n)`.
    ArrayRangeEq,

    Tuple,
    Field(usize),

    Apply(FnDef),
    /// `cs = [bound-var, body]`.
    Quant(QuantKind),
    /// Semantically the identity on its child, at a fresh identity.
    Annot(u64),
}

impl Op {
    /// `None` means n-ary.
    pub fn arity(&self) -> Option<usize> {
        match self {
            Op::Var(..) | Op::BoundVar(..) | Op::Const(_) => Some(0),
            Op::Ite => Some(3),
            Op::Eq => Some(2),
            Op::Not => Some(1),
            Op::And => None,
            Op::IntLe | Op::RealLe | Op::BvUlt | Op::BvSlt => Some(2),
            Op::RealIsInt => Some(1),
            Op::BvBit(_) => Some(1),
            Op::IntSum(..) | Op::RealSum(..) | Op::BvSum(..) | Op::BvXorSum(..) | Op::Prod(_) => {
                None
            }
            Op::IntDiv | Op::IntMod | Op::RealDiv => Some(2),
            Op::RealSqrt => Some(1),
            Op::IntToReal | Op::RealToInt | Op::IntToBv(_) | Op::UbvToInt | Op::SbvToInt => {
                Some(1)
            }
            Op::BvConcat => None,
            Op::BvExtract(..) => Some(1),
            Op::BvUdiv | Op::BvUrem | Op::BvSdiv | Op::BvSrem => Some(2),
            Op::BvShl | Op::BvLshr | Op::BvAshr | Op::BvRol | Op::BvRor => Some(2),
            Op::BvUext(_) | Op::BvSext(_) => Some(1),
            Op::BvAnd | Op::BvOr => None,
            Op::BvPopcount | Op::BvClz | Op::BvCtz => Some(1),
            Op::BvFill(_) => Some(1),
            Op::FpBinOp(_) | Op::FpBinPred(_) => Some(2),
            Op::FpUnOp(_) | Op::FpUnPred(_) => Some(1),
            Op::FpFma => Some(3),
            Op::BvToFp(..) | Op::FpToBv | Op::UbvToFp(..) | Op::SbvToFp(..) | Op::FpToFp(..) => {
                Some(1)
            }
            Op::StrConcat => None,
            Op::StrLen => Some(1),
            Op::StrContains | Op::StrPrefixOf | Op::StrSuffixOf => Some(2),
            Op::StrIndexOf | Op::StrSubstr => Some(3),
            Op::ConstArray(_) => Some(1),
            Op::Select | Op::Store => None,
            Op::ArrayEq => Some(2),
            Op::ArrayMap(_) => None,
            Op::ArrayCopy => Some(5),
            Op::ArraySet => Some(4),
            Op::ArrayRangeEq => Some(4),
            Op::Tuple => None,
            Op::Field(_) => Some(1),
            Op::Apply(f) => Some(f.params().len()),
            Op::Quant(_) => Some(2),
            Op::Annot(_) => Some(1),
        }
    }
}

impl Display for Op {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Op::Var(n, _) => write!(f, "{}", n),
            Op::BoundVar(id, n, _) => write!(f, "{}!{}", n, id),
            Op::Const(v) => write!(f, "{}", v),
            Op::Ite => write!(f, "ite"),
            Op::Eq => write!(f, "="),
            Op::Not => write!(f, "not"),
            Op::And => write!(f, "and"),
            Op::IntLe => write!(f, "<="),
            Op::RealLe => write!(f, "<=."),
            Op::RealIsInt => write!(f, "is-int"),
            Op::BvUlt => write!(f, "bvult"),
            Op::BvSlt => write!(f, "bvslt"),
            Op::BvBit(i) => write!(f, "bit {}", i),
            Op::IntSum(cs, k) => write!(f, "int-sum {:?} {}", cs, k),
            Op::RealSum(cs, k) => write!(f, "real-sum {:?} {}", cs, k),
            Op::BvSum(cs, k) => {
                write!(f, "bv-sum")?;
                for c in cs {
                    write!(f, " {}", c)?;
                }
                write!(f, " {}", k)
            }
            Op::BvXorSum(cs, k) => {
                write!(f, "bv-xor")?;
                for c in cs {
                    write!(f, " {}", c)?;
                }
                write!(f, " {}", k)
            }
            Op::Prod(ns) => write!(f, "prod {:?}", ns),
            Op::IntDiv => write!(f, "div"),
            Op::IntMod => write!(f, "mod"),
            Op::RealDiv => write!(f, "/"),
            Op::RealSqrt => write!(f, "sqrt"),
            Op::IntToReal => write!(f, "to-real"),
            Op::RealToInt => write!(f, "to-int"),
            Op::IntToBv(w) => write!(f, "int2bv {}", w),
            Op::UbvToInt => write!(f, "ubv2int"),
            Op::SbvToInt => write!(f, "sbv2int"),
            Op::BvConcat => write!(f, "concat"),
            Op::BvExtract(h, l) => write!(f, "extract {} {}", h, l),
            Op::BvUdiv => write!(f, "bvudiv"),
            Op::BvUrem => write!(f, "bvurem"),
            Op::BvSdiv => write!(f, "bvsdiv"),
            Op::BvSrem => write!(f, "bvsrem"),
            Op::BvShl => write!(f, "bvshl"),
            Op::BvLshr => write!(f, "bvlshr"),
            Op::BvAshr => write!(f, "bvashr"),
            Op::BvRol => write!(f, "bvrol"),
            Op::BvRor => write!(f, "bvror"),
            Op::BvUext(n) => write!(f, "uext {}", n),
            Op::BvSext(n) => write!(f, "sext {}", n),
            Op::BvAnd => write!(f, "bvand"),
            Op::BvOr => write!(f, "bvor"),
            Op::BvPopcount => write!(f, "popcount"),
            Op::BvClz => write!(f, "clz"),
            Op::BvCtz => write!(f, "ctz"),
            Op::BvFill(w) => write!(f, "fill {}", w),
            Op::FpBinOp(o) => write!(f, "{}", o),
            Op::FpUnOp(o) => write!(f, "{}", o),
            Op::FpFma => write!(f, "fpfma"),
            Op::FpBinPred(o) => write!(f, "{}", o),
            Op::FpUnPred(o) => write!(f, "{}", o),
            Op::BvToFp(eb, sb) => write!(f, "bv2fp {} {}", eb, sb),
            Op::FpToBv => write!(f, "fp2bv"),
            Op::UbvToFp(eb, sb) => write!(f, "ubv2fp {} {}", eb, sb),
            Op::SbvToFp(eb, sb) => write!(f, "sbv2fp {} {}", eb, sb),
            Op::FpToFp(eb, sb) => write!(f, "fp2fp {} {}", eb, sb),
            Op::StrConcat => write!(f, "str.++"),
            Op::StrLen => write!(f, "str.len"),
            Op::StrContains => write!(f, "str.contains"),
            Op::StrIndexOf => write!(f, "str.indexof"),
            Op::StrPrefixOf => write!(f, "str.prefixof"),
            Op::StrSuffixOf => write!(f, "str.suffixof"),
            Op::StrSubstr => write!(f, "str.substr"),
            Op::ConstArray(_) => write!(f, "const-array"),
            Op::Select => write!(f, "select"),
            Op::Store => write!(f, "store"),
            Op::ArrayEq => write!(f, "array-eq"),
            Op::ArrayMap(g) => write!(f, "array-map {}", g),
            Op::ArrayCopy => write!(f, "array-copy"),
            Op::ArraySet => write!(f, "array-set"),
            Op::ArrayRangeEq => write!(f, "array-range-eq"),
            Op::Tuple => write!(f, "tuple"),
            Op::Field(i) => write!(f, "field {}", i),
            Op::Apply(g) => write!(f, "{}", g),
            Op::Quant(q) => write!(f, "{}", q),
            Op::Annot(id) => write!(f, "annot {}", id),
        }
    }
}

/// The interned payload of a term.
#[derive(Clone)]
pub struct TermData {
    op: Op,
    cs: Vec<Term>,
    sort: Sort,
    aval: AbsVal,
}

impl TermData {
    pub(crate) fn new(op: Op, cs: Vec<Term>, sort: Sort, aval: AbsVal) -> TermData {
        TermData { op, cs, sort, aval }
    }

    pub fn op(&self) -> &Op {
        &self.op
    }

    /// The children projection; sufficient to drive any traversal.
    pub fn cs(&self) -> &[Term] {
        &self.cs
    }

    pub fn sort(&self) -> &Sort {
        &self.sort
    }

    pub fn aval(&self) -> &AbsVal {
        &self.aval
    }

    pub fn as_const(&self) -> Option<&Value> {
        if let Op::Const(v) = &self.op {
            Some(v)
        } else {
            None
        }
    }

    pub fn as_bool_opt(&self) -> Option<bool> {
        if let Op::Const(Value::Bool(b)) = &self.op {
            Some(*b)
        } else {
            None
        }
    }

    pub fn as_int_opt(&self) -> Option<&Integer> {
        if let Op::Const(Value::Int(i)) = &self.op {
            Some(i)
        } else {
            None
        }
    }

    pub fn as_bv_opt(&self) -> Option<&BitVec> {
        if let Op::Const(Value::BitVec(b)) = &self.op {
            Some(b)
        } else {
            None
        }
    }

    pub fn is_var(&self) -> bool {
        matches!(self.op, Op::Var(..))
    }
}

impl PartialEq for TermData {
    fn eq(&self, other: &Self) -> bool {
        // sort and aval are functions of (op, cs); identity ignores them
        self.op == other.op && self.cs == other.cs
    }
}

impl Eq for TermData {}

impl std::hash::Hash for TermData {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.op.hash(state);
        for c in &self.cs {
            c.uid().hash(state);
        }
    }
}

impl Display for TermData {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        if self.cs.is_empty() {
            write!(f, "{}", self.op)
        } else {
            write!(f, "({}", self.op)?;
            for c in &self.cs {
                write!(f, " {}", c.get())?;
            }
            write!(f, ")")
        }
    }
}

impl Debug for TermData {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

pub type Term = HConsed<TermData>;

/// Identity-keyed map over terms.
pub type TermMap<T> = hashconsing::coll::HConMap<Term, T>;
/// Identity-keyed set of terms.
pub type TermSet = hashconsing::coll::HConSet<Term>;

/// Post-order traversal that visits each distinct node once.
pub struct PostOrderIter {
    // (children pushed, term)
    stack: Vec<(bool, Term)>,
    visited: TermSet,
}

impl PostOrderIter {
    pub fn new(root: Term) -> Self {
        Self {
            stack: vec![(false, root)],
            visited: TermSet::new(),
        }
    }
}

impl Iterator for PostOrderIter {
    type Item = Term;
    fn next(&mut self) -> Option<Term> {
        while let Some((children_pushed, t)) = self.stack.last() {
            if self.visited.contains(t) {
                self.stack.pop();
            } else if !children_pushed {
                self.stack.last_mut().unwrap().0 = true;
                let last = self.stack.last().unwrap().1.clone();
                self.stack
                    .extend(last.cs().iter().map(|c| (false, c.clone())));
            } else {
                break;
            }
        }
        self.stack.pop().map(|(_, t)| {
            self.visited.insert(t.clone());
            t
        })
    }
}

/// Does `needle` occur in `haystack` (by identity)?
pub fn mentions(haystack: &Term, needle: &Term) -> bool {
    PostOrderIter::new(haystack.clone()).any(|t| t == *needle)
}

/// The free (non-bound) variables of a term.
pub fn free_variables(t: &Term) -> Vec<Term> {
    PostOrderIter::new(t.clone())
        .filter(|t| t.is_var())
        .collect()
}
