use fxhash::FxHashMap;
use quickcheck::{Arbitrary, Gen};
use quickcheck_macros::quickcheck;
use rand::distributions::Distribution;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rug::Integer;

use super::*;
use crate::term::dist::{BoolAst, BoolDist, BvAst, BvDist, IntAst, IntDist, BV_W, NVARS};
use crate::term::eval::eval;
use crate::theory::{features_of, theory_of, ProblemFeatures};
use crate::value::{ArrayVal, StrVal};

fn int_sort_arr() -> Vec<Sort> {
    vec![Sort::Int]
}

// ---- the end-to-end scenarios ----

#[test]
fn scenario_ite_through_double_negation() {
    let mut b = Builder::new();
    let t = b.tru();
    let n1 = b.not(t);
    let n2 = b.not(n1);
    let one = b.int_lit(1);
    let two = b.int_lit(2);
    let r = b.ite(n2, one, two);
    assert_eq!(b.concrete(&r), Some(Value::Int(Integer::from(1))));
}

#[test]
fn scenario_ite_of_or() {
    let mut b = Builder::new();
    let f = b.fls();
    let nf = b.not(f.clone());
    let c = b.or(f, nf);
    let x = b.bv_lit(12890u32, 16);
    let y = b.bv_lit(8293u32, 16);
    let r = b.ite(c, x.clone(), y);
    assert_eq!(r, x);
    assert_eq!(
        b.concrete(&r),
        Some(Value::BitVec(crate::bv::BitVec::new(
            Integer::from(12890),
            16
        )))
    );
}

#[test]
fn scenario_ite_of_xor_over_tuples() {
    let mut b = Builder::new();
    let t = b.tru();
    let f = b.fls();
    let c = b.xor(t.clone(), f.clone());
    let st = b.tuple(vec![t]);
    let sf = b.tuple(vec![f]);
    let r = b.ite(c, st, sf);
    assert_eq!(b.concrete(&r), Some(Value::Tuple(vec![Value::Bool(true)])));
}

#[test]
fn scenario_ite_over_const_arrays() {
    let mut b = Builder::new();
    let t = b.tru();
    let f = b.fls();
    let and = b.and(t.clone(), f.clone());
    let c = b.eq(and, f.clone());
    let arr_t = {
        let d = b.tru();
        b.const_array(int_sort_arr(), d)
    };
    let arr_f = {
        let d = b.fls();
        b.const_array(int_sort_arr(), d)
    };
    let r = b.ite(c, arr_t, arr_f);
    assert_eq!(
        b.concrete(&r),
        Some(Value::Array(ArrayVal::constant(
            int_sort_arr(),
            Value::Bool(true)
        )))
    );
}

#[test]
fn scenario_add_then_cancel() {
    let mut b = Builder::new();
    let x = b.var("x", Sort::Int);
    let three = b.int_lit(3);
    let a = b.int_add(x.clone(), three.clone());
    let s = b.int_sub(a, three);
    assert_eq!(s, x);
    let z = b.int_sub(s, x);
    assert_eq!(b.concrete(&z), Some(Value::Int(Integer::from(0))));
}

#[test]
fn scenario_bv_set_cancels_under_xor() {
    let mut b = Builder::new();
    let z = b.bv_zero(16);
    let t1 = b.tru();
    let t2 = b.tru();
    let s1 = b.bv_set(z.clone(), 3, t1);
    let s2 = b.bv_set(z, 3, t2);
    assert_eq!(s1, s2);
    let r = b.bv_xor(s1, s2);
    assert_eq!(
        b.concrete(&r),
        Some(Value::BitVec(crate::bv::BitVec::zeros(16)))
    );
}

// ---- quantified invariants ----

#[test]
fn interning_is_identity() {
    let mut b = Builder::new();
    let x = b.var("x", Sort::Int);
    let y = b.var("y", Sort::Int);
    let s1 = b.int_add(x.clone(), y.clone());
    let s2 = b.int_add(y.clone(), x.clone());
    assert_eq!(s1, s2);
    assert_eq!(s1.uid(), s2.uid());
    let x2 = b.var("x", Sort::Int);
    assert_eq!(x, x2);
}

#[test]
fn ite_laws() {
    let mut b = Builder::new();
    let p = b.var("p", Sort::Bool);
    let x = b.var("x", Sort::Int);
    let y = b.var("y", Sort::Int);
    let same = b.ite(p.clone(), x.clone(), x.clone());
    assert_eq!(same, x);
    let t = b.tru();
    let f = b.fls();
    assert_eq!(b.ite(t, x.clone(), y.clone()), x);
    assert_eq!(b.ite(f, x.clone(), y.clone()), y);
    let np = b.not(p.clone());
    let a = b.ite(np, x.clone(), y.clone());
    let c = b.ite(p, y, x);
    assert_eq!(a, c);
}

#[test]
fn bv_xor_laws() {
    let mut b = Builder::new();
    let x = b.var("x", Sort::BitVec(8));
    let z = b.bv_zero(8);
    let xx = b.bv_xor(x.clone(), x.clone());
    assert_eq!(b.concrete(&xx), Some(Value::BitVec(crate::bv::BitVec::zeros(8))));
    let xz = b.bv_xor(x.clone(), z);
    assert_eq!(xz, x);
    let n = b.bv_not(x.clone());
    let nn = b.bv_not(n);
    assert_eq!(nn, x);
}

#[test]
fn sum_minus_itself_is_zero() {
    let mut b = Builder::new();
    let x = b.var("x", Sort::Int);
    let y = b.var("y", Sort::Int);
    let xy = b.int_mul(x.clone(), y.clone());
    let two_xy = {
        let two = b.int_lit(2);
        b.int_mul(two, xy)
    };
    let s = {
        let t = b.int_add(two_xy, x.clone());
        let seven = b.int_lit(7);
        b.int_add(t, seven)
    };
    let z = b.int_sub(s.clone(), s.clone());
    assert_eq!(b.concrete(&z), Some(Value::Int(Integer::from(0))));
}

#[test]
fn sum_payload_never_stores_zero_coefficients() {
    let mut b = Builder::new();
    let x = b.var("x", Sort::Int);
    let y = b.var("y", Sort::Int);
    let s = b.int_add(x.clone(), y.clone());
    let s2 = b.int_sub(s, y.clone());
    // y's coefficient hit zero and the whole entry vanished
    assert_eq!(s2, x);
    let t = {
        let a = b.int_add(x.clone(), y.clone());
        let c = b.int_lit(5);
        b.int_add(a, c)
    };
    if let Op::IntSum(coeffs, _) = t.op() {
        assert!(coeffs.iter().all(|c| *c != 0));
    } else {
        panic!("expected a sum node, got {}", t.get());
    }
}

#[test]
fn concrete_roundtrip() {
    let mut b = Builder::new();
    let vals = vec![
        Value::Bool(true),
        Value::Int(Integer::from(-42)),
        Value::Real(rug::Rational::from((3, 4))),
        Value::BitVec(crate::bv::BitVec::new(Integer::from(99), 8)),
        Value::Str(StrVal::new(crate::sort::StrEnc::Char8, vec![104, 105])),
        Value::Tuple(vec![Value::Bool(false), Value::Int(Integer::from(7))]),
    ];
    for v in vals {
        let t = b.from_concrete(&v);
        assert_eq!(b.concrete(&t), Some(v));
    }
}

#[test]
fn classifier_is_total() {
    let mut b = Builder::new();
    let x = b.var("x", Sort::BitVec(8));
    let i = b.var("i", Sort::Int);
    let r = b.var("r", Sort::Real);
    let s = b.var("s", Sort::Str(crate::sort::StrEnc::Unicode));
    let p = b.var("p", Sort::Bool);
    let five = b.int_lit(5);
    let mix = vec![
        b.bv_mul(x.clone(), x.clone()),
        b.int_mul(i.clone(), i.clone()),
        b.int_div(i.clone(), five),
        b.real_sqrt(r.clone()),
        b.str_len(s.clone()),
        b.ite(p.clone(), i.clone(), i.clone()),
        {
            let d = b.int_lit(0);
            b.const_array(int_sort_arr(), d)
        },
        b.tuple(vec![p.clone(), i.clone()]),
    ];
    for t in &mix {
        for sub in crate::term::PostOrderIter::new(t.clone()) {
            // a well-formed node always classifies
            let _ = theory_of(&sub);
        }
    }
    let fs = features_of(mix.iter());
    assert!(fs.contains(ProblemFeatures::NONLIN_ARITH));
    assert!(fs.contains(ProblemFeatures::BV));
    assert!(fs.contains(ProblemFeatures::COMPUTABLE_ARITH));
    assert!(fs.contains(ProblemFeatures::STRINGS));
}

#[test]
fn nonlinear_classification() {
    let mut b = Builder::new();
    let x = b.var("x", Sort::Int);
    let y = b.var("y", Sort::Int);
    let lit_div = {
        let two = b.int_lit(2);
        b.int_div(x.clone(), two)
    };
    assert_eq!(theory_of(&lit_div), crate::theory::Theory::LinArith);
    let var_div = b.int_div(x.clone(), y.clone());
    assert_eq!(theory_of(&var_div), crate::theory::Theory::NonlinArith);
    let prod = b.int_mul(x.clone(), y.clone());
    assert_eq!(theory_of(&prod), crate::theory::Theory::NonlinArith);
    // a sum holding that product is itself nonlinear
    let s = b.int_add(prod, x);
    assert_eq!(theory_of(&s), crate::theory::Theory::NonlinArith);
}

// ---- boundary checks ----

#[test]
fn division_by_zero_is_total() {
    let mut b = Builder::new();
    let x = b.var("x", Sort::BitVec(8));
    let z = b.bv_zero(8);
    let d = b.bv_udiv(x.clone(), z.clone());
    assert_eq!(*d.sort(), Sort::BitVec(8));
    let r = b.bv_urem(x.clone(), z);
    assert_eq!(*r.sort(), Sort::BitVec(8));
    // the engine keeps working afterwards
    let s = b.bv_add(d, r);
    assert_eq!(*s.sort(), Sort::BitVec(8));
    // concrete zero division folds to the fixed unspecified values
    let seven = b.bv_lit(7u32, 8);
    let z = b.bv_zero(8);
    let q = b.bv_udiv(seven.clone(), z.clone());
    assert_eq!(
        b.concrete(&q),
        Some(Value::BitVec(crate::bv::BitVec::ones(8)))
    );
    let m = b.bv_urem(seven.clone(), z);
    assert_eq!(b.concrete(&m), b.concrete(&seven));
}

#[test]
fn quantifier_over_unused_binder_collapses() {
    let mut b = Builder::new();
    let v = b.bound_var("v", Sort::Int);
    let x = b.var("x", Sort::Int);
    let y = b.var("y", Sort::Int);
    let body = b.eq(x, y);
    let q = b.forall(v.clone(), body.clone());
    assert_eq!(q, body);
    // a body that does mention the binder stays quantified
    let five = b.int_lit(5);
    let used = b.eq(v.clone(), five);
    let q2 = b.exists(v, used);
    assert!(matches!(q2.op(), Op::Quant(crate::term::QuantKind::Exists)));
}

#[test]
fn annotation_preserves_semantics() {
    let mut b = Builder::new();
    let x = b.int_lit(17);
    let (id, a) = b.annotate(x.clone());
    assert_ne!(a, x);
    assert_eq!(b.concrete(&a), b.concrete(&x));
    // re-annotation returns the existing id
    let (id2, a2) = b.annotate(a.clone());
    assert_eq!(id, id2);
    assert_eq!(a, a2);
    // a second annotation of the base term is a fresh identity
    let (id3, a3) = b.annotate(x);
    assert_ne!(id3, id);
    assert_ne!(a3, a);
    assert_eq!(b.concrete(&a3), b.concrete(&a));
}

#[test]
fn bounded_vars() {
    let mut b = Builder::new();
    let e = b.bounded_int_var("n", Integer::from(3), Integer::from(1));
    assert_eq!(
        e,
        Err(crate::err::BuildError::InvalidRange {
            sort: Sort::Int,
            lo: Integer::from(3),
            hi: Integer::from(1),
        })
    );
    let n = b
        .bounded_int_var("n", Integer::from(0), Integer::from(10))
        .unwrap();
    let twenty = b.int_lit(20);
    let le = b.int_le(n.clone(), twenty);
    assert_eq!(b.concrete(&le), Some(Value::Bool(true)));
    // non-negativity flows through arithmetic
    let m = b
        .bounded_int_var("m", Integer::from(1), Integer::from(5))
        .unwrap();
    let s = b.int_add(n, m);
    let zero = b.int_lit(0);
    let nonneg = b.int_le(zero, s);
    assert_eq!(b.concrete(&nonneg), Some(Value::Bool(true)));
    // bv ranges must fit the width
    let e = b.bounded_bv_var("w", 4, Integer::from(0), Integer::from(16));
    assert!(e.is_err());
}

// ---- normalization details ----

#[test]
fn and_normalization() {
    let mut b = Builder::new();
    let x = b.var("x", Sort::Bool);
    let y = b.var("y", Sort::Bool);
    let t = b.tru();
    let xx = b.and(x.clone(), x.clone());
    assert_eq!(xx, x);
    let xt = b.and(x.clone(), t);
    assert_eq!(xt, x);
    let nx = b.not(x.clone());
    let contradiction = b.and(x.clone(), nx);
    assert_eq!(contradiction, b.fls());
    // nested conjunctions flatten
    let inner = b.and(x.clone(), y.clone());
    let outer = b.and(inner.clone(), x.clone());
    assert_eq!(outer, inner);
}

#[test]
fn ite_extracts_common_subsums() {
    let mut b = Builder::new();
    let c = b.var("c", Sort::Bool);
    let x = b.var("x", Sort::Int);
    let three = b.int_lit(3);
    let five = b.int_lit(5);
    let t = b.int_add(x.clone(), three.clone());
    let e = b.int_add(x.clone(), five.clone());
    let fused = b.ite(c.clone(), t, e);
    let expect = {
        let inner = b.ite(c, three, five);
        b.int_add(x, inner)
    };
    assert_eq!(fused, expect);
}

#[test]
fn ite_extracts_common_factors() {
    let mut b = Builder::new();
    let c = b.var("c", Sort::Bool);
    let x = b.var("x", Sort::Int);
    let y = b.var("y", Sort::Int);
    let z = b.var("z", Sort::Int);
    let t = b.int_mul(x.clone(), y.clone());
    let e = b.int_mul(x.clone(), z.clone());
    let fused = b.ite(c.clone(), t, e);
    let expect = {
        let inner = b.ite(c, y, z);
        b.int_mul(x, inner)
    };
    assert_eq!(fused, expect);
}

#[test]
fn select_store_rules() {
    let mut b = Builder::new();
    let d = b.int_lit(0);
    let a = b.const_array(int_sort_arr(), d.clone());
    let i = b.int_lit(3);
    let j = b.int_lit(4);
    let v = b.int_lit(99);
    let stored = b.store(a.clone(), vec![i.clone()], v.clone());
    // read back through the store at the same index
    let at_i = b.select(stored.clone(), vec![i.clone()]);
    assert_eq!(at_i, v);
    // a provably different index reads through to the base
    let at_j = b.select(stored.clone(), vec![j.clone()]);
    assert_eq!(at_j, d);
    // the last write at an index wins
    let w = b.int_lit(100);
    let restored = b.store(stored.clone(), vec![i.clone()], w.clone());
    let direct = b.store(a.clone(), vec![i.clone()], w);
    assert_eq!(restored, direct);
    // storing a constant array's default back is the identity
    let same = b.store(a.clone(), vec![j], d);
    assert_eq!(same, a);
    // symbolic index: the select stays put
    let k = b.var("k", Sort::Int);
    let sym = b.select(stored, vec![k]);
    assert!(matches!(sym.op(), Op::Select));
}

#[test]
fn array_set_and_copy_degenerate() {
    let mut b = Builder::new();
    let d = b.int_lit(0);
    let a = b.const_array(int_sort_arr(), d);
    let i = b.int_lit(2);
    let v = b.int_lit(7);
    let zero = b.int_lit(0);
    let one = b.int_lit(1);
    let unchanged = b.array_set(a.clone(), i.clone(), v.clone(), zero.clone());
    assert_eq!(unchanged, a);
    let single = b.array_set(a.clone(), i.clone(), v.clone(), one);
    let direct = b.store(a.clone(), vec![i.clone()], v);
    assert_eq!(single, direct);
    let copied = b.array_copy(a.clone(), i.clone(), single.clone(), i.clone(), zero.clone());
    assert_eq!(copied, a);
    let req = b.array_range_eq(a.clone(), a.clone(), i, zero);
    assert_eq!(req, b.tru());
}

#[test]
fn string_lengths() {
    let mut b = Builder::new();
    let s = b.var("s", Sort::Str(crate::sort::StrEnc::Char8));
    let hi = b.str_ascii("hi");
    let cat = b.str_concat(hi.clone(), s.clone());
    // length of a concat with a literal is 2 + len(s)
    let len = b.str_len(cat.clone());
    let expect = {
        let l = b.str_len(s.clone());
        let two = b.int_lit(2);
        b.int_add(l, two)
    };
    assert_eq!(len, expect);
    // a longer needle can never be contained
    let needle = b.str_ascii("abc");
    let c = b.str_contains(hi.clone(), needle);
    assert_eq!(b.concrete(&c), Some(Value::Bool(false)));
    // substring lengths are clamped
    let off = b.int_lit(1);
    let n = b.int_lit(5);
    let sub = b.str_substr(hi, off, n);
    assert_eq!(
        b.concrete(&sub),
        Some(Value::Str(StrVal::new(crate::sort::StrEnc::Char8, vec![105])))
    );
}

#[test]
fn bv_rewrites() {
    let mut b = Builder::new();
    let x = b.var("x", Sort::BitVec(8));
    // shift by a constant lowers to extract/concat
    let two = b.bv_lit(2u32, 8);
    let shifted = b.bv_shl(x.clone(), two.clone());
    assert!(matches!(shifted.op(), Op::BvConcat));
    let rshifted = b.bv_lshr(x.clone(), two);
    assert!(matches!(rshifted.op(), Op::BvUext(_)));
    // select inside a concat routes to the right piece
    let y = b.var("y", Sort::BitVec(8));
    let cat = b.bv_concat(x.clone(), y.clone());
    let high = b.bv_extract(cat.clone(), 15, 8);
    assert_eq!(high, x);
    let low = b.bv_extract(cat, 7, 0);
    assert_eq!(low, y);
    // extract of extract collapses
    let e1 = b.bv_extract(x.clone(), 6, 1);
    let e2 = b.bv_extract(e1, 3, 2);
    let direct = b.bv_extract(x.clone(), 4, 3);
    assert_eq!(e2, direct);
    // identity and annihilator masks
    let ones = b.bv_ones(8);
    let zeros = b.bv_zero(8);
    assert_eq!(b.bv_and(x.clone(), ones.clone()), x);
    let anded = b.bv_and(x.clone(), zeros.clone());
    assert_eq!(anded, zeros);
    assert_eq!(b.bv_or(x.clone(), zeros), x);
    let ored = b.bv_or(x.clone(), ones.clone());
    assert_eq!(ored, ones);
}

#[test]
fn bv_comparisons_from_domains() {
    let mut b = Builder::new();
    let small = b
        .bounded_bv_var("s", 8, Integer::from(0), Integer::from(10))
        .unwrap();
    let big = b
        .bounded_bv_var("b", 8, Integer::from(20), Integer::from(30))
        .unwrap();
    let lt = b.bv_ult(small.clone(), big.clone());
    assert_eq!(b.concrete(&lt), Some(Value::Bool(true)));
    let gt = b.bv_ult(big.clone(), small.clone());
    assert_eq!(b.concrete(&gt), Some(Value::Bool(false)));
    let eq = b.eq(small, big);
    assert_eq!(b.concrete(&eq), Some(Value::Bool(false)));
}

#[test]
fn tuple_equality_conjoins_fields() {
    let mut b = Builder::new();
    let x = b.var("x", Sort::Tuple(vec![Sort::Bool, Sort::Int]));
    let p = b.var("p", Sort::Bool);
    let i = b.var("i", Sort::Int);
    let y = b.tuple(vec![p.clone(), i.clone()]);
    let e = b.eq(x.clone(), y);
    // the equality became a conjunction over the fields
    assert!(matches!(e.op(), Op::And));
}

#[test]
fn unfold_policies() {
    let mut b = Builder::new();
    let p = b.bound_var("p", Sort::Int);
    let one = b.int_lit(1);
    let body = b.int_add(p.clone(), one);
    let f_always = b.define_fun("inc", vec![p.clone()], body.clone(), UnfoldPolicy::Always);
    let f_never = b.define_fun("inc2", vec![p.clone()], body.clone(), UnfoldPolicy::Never);
    let f_conc = b.define_fun(
        "inc3",
        vec![p.clone()],
        body.clone(),
        UnfoldPolicy::WhenConcrete,
    );
    let x = b.var("x", Sort::Int);
    let always = b.apply(f_always, vec![x.clone()]);
    let expect = {
        let one = b.int_lit(1);
        b.int_add(x.clone(), one)
    };
    assert_eq!(always, expect);
    let never = b.apply(f_never, vec![x.clone()]);
    assert!(matches!(never.op(), Op::Apply(_)));
    let sym = b.apply(f_conc.clone(), vec![x.clone()]);
    assert!(matches!(sym.op(), Op::Apply(_)));
    let two = b.int_lit(2);
    let conc = b.apply(f_conc, vec![two]);
    assert_eq!(b.concrete(&conc), Some(Value::Int(Integer::from(3))));
    // uninterpreted symbols never unfold, and flag as such in the features
    let g = b.uninterp_fun("g", vec![Sort::Int], Sort::Int);
    let app = b.apply(g, vec![x]);
    let fs = features_of(std::iter::once(&app));
    assert!(fs.contains(ProblemFeatures::UNINTERP_FNS));
    assert!(!fs.contains(ProblemFeatures::DEFINED_FNS));
}

#[test]
fn listener_sees_vars() {
    use std::cell::RefCell;
    use std::rc::Rc;
    let names = Rc::new(RefCell::new(Vec::new()));
    let sink = names.clone();
    let mut b = Builder::new();
    b.set_listener(move |ev| {
        if let BuilderEvent::VarCreated(t) = ev {
            sink.borrow_mut().push(t.get().to_string());
        }
    });
    b.var("a", Sort::Bool);
    b.var("z", Sort::Int);
    assert_eq!(&*names.borrow(), &["a".to_string(), "z".to_string()]);
}

#[test]
#[should_panic]
fn sort_mismatch_panics() {
    let mut b = Builder::new();
    let x = b.var("x", Sort::Int);
    let p = b.var("p", Sort::Bool);
    b.and(x, p);
}

// ---- randomized properties ----

#[derive(Clone, Debug)]
struct ArbBool(BoolAst, Vec<bool>);

impl Arbitrary for ArbBool {
    fn arbitrary(g: &mut Gen) -> Self {
        let mut rng = StdRng::seed_from_u64(u64::arbitrary(g));
        let size = 1 + usize::arbitrary(g) % 25;
        let ast = BoolDist(size).sample(&mut rng);
        let env = (0..NVARS).map(|_| rng.gen()).collect();
        ArbBool(ast, env)
    }
}

#[derive(Clone, Debug)]
struct ArbBv(BvAst, Vec<u8>);

impl Arbitrary for ArbBv {
    fn arbitrary(g: &mut Gen) -> Self {
        let mut rng = StdRng::seed_from_u64(u64::arbitrary(g));
        let size = 1 + usize::arbitrary(g) % 25;
        let ast = BvDist(size).sample(&mut rng);
        let env = (0..NVARS).map(|_| rng.gen()).collect();
        ArbBv(ast, env)
    }
}

#[derive(Clone, Debug)]
struct ArbInt(IntAst, Vec<bool>, Vec<i32>);

impl Arbitrary for ArbInt {
    fn arbitrary(g: &mut Gen) -> Self {
        let mut rng = StdRng::seed_from_u64(u64::arbitrary(g));
        let size = 1 + usize::arbitrary(g) % 20;
        let ast = IntDist(size).sample(&mut rng);
        let benv = (0..NVARS).map(|_| rng.gen()).collect();
        let env = (0..NVARS).map(|_| rng.gen_range(-100..=100)).collect();
        ArbInt(ast, benv, env)
    }
}

#[quickcheck]
fn bool_building_preserves_semantics(arb: ArbBool) {
    let ArbBool(ast, env) = arb;
    let mut b = Builder::new();
    let t = ast.build(&mut b);
    let expected = ast.denote(&env);
    let mut h = FxHashMap::default();
    for (i, v) in env.iter().enumerate() {
        h.insert(format!("b{}", i), Value::Bool(*v));
    }
    assert_eq!(eval(&t, &h).unwrap(), Value::Bool(expected), "term {}", t.get());
    // the abstract value contains the denotation
    assert!(t.aval().contains(&Value::Bool(expected)));
}

#[quickcheck]
fn bv_building_preserves_semantics(arb: ArbBv) {
    let ArbBv(ast, env) = arb;
    let mut b = Builder::new();
    let t = ast.build(&mut b);
    let expected = ast.denote(&env);
    let mut h = FxHashMap::default();
    for (i, v) in env.iter().enumerate() {
        h.insert(
            format!("v{}", i),
            Value::BitVec(crate::bv::BitVec::new(Integer::from(*v), BV_W)),
        );
    }
    assert_eq!(
        eval(&t, &h).unwrap(),
        Value::BitVec(expected.clone()),
        "term {}",
        t.get()
    );
    assert!(t.aval().contains(&Value::BitVec(expected)));
}

#[quickcheck]
fn int_building_preserves_semantics(arb: ArbInt) {
    let ArbInt(ast, benv, env) = arb;
    let mut b = Builder::new();
    let t = ast.build(&mut b);
    let expected = ast.denote(&benv, &env);
    let mut h = FxHashMap::default();
    for (i, v) in benv.iter().enumerate() {
        h.insert(format!("b{}", i), Value::Bool(*v));
    }
    for (i, v) in env.iter().enumerate() {
        h.insert(format!("i{}", i), Value::Int(Integer::from(*v)));
    }
    assert_eq!(
        eval(&t, &h).unwrap(),
        Value::Int(expected.clone()),
        "term {}",
        t.get()
    );
    assert!(t.aval().contains(&Value::Int(expected)));
}

#[quickcheck]
fn construction_is_deterministic(arb: ArbBv) {
    let ArbBv(ast, _) = arb;
    let mut b1 = Builder::new();
    let t1 = ast.build(&mut b1);
    let mut b2 = Builder::new();
    let t2 = ast.build(&mut b2);
    assert_eq!(t1.uid(), t2.uid());
    assert_eq!(t1.get(), t2.get());
}
