//! Random expression distributions for property tests.
//!
//! Each distribution samples a little syntax tree with a size budget; the
//! tree knows both its direct denotation and how to push itself through a
//! [Builder], so properties can compare the two.

use rand::distributions::Distribution;
use rand::seq::SliceRandom;
use rand::Rng;
use rug::Integer;

use crate::build::Builder;
use crate::bv::BitVec;
use crate::sort::Sort;
use crate::term::Term;

pub const NVARS: usize = 4;

/// A distribution of `n` sizes that sum to the budget.
struct Split(usize, usize);

impl Distribution<Vec<usize>> for Split {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<usize> {
        let mut acc = self.1;
        let mut ns = Vec::new();
        while acc > 0 && ns.len() < self.0 {
            let x = rng.gen_range(0..=acc);
            acc -= x;
            ns.push(x);
        }
        while ns.len() < self.0 {
            ns.push(0);
        }
        if acc > 0 {
            *ns.last_mut().unwrap() += acc;
        }
        ns.shuffle(rng);
        ns
    }
}

#[derive(Clone, Debug)]
pub enum BoolAst {
    Const(bool),
    Var(usize),
    Not(Box<BoolAst>),
    And(Vec<BoolAst>),
    Or(Vec<BoolAst>),
    Xor(Box<BoolAst>, Box<BoolAst>),
    Implies(Box<BoolAst>, Box<BoolAst>),
    Ite(Box<BoolAst>, Box<BoolAst>, Box<BoolAst>),
}

impl BoolAst {
    pub fn denote(&self, env: &[bool]) -> bool {
        match self {
            BoolAst::Const(b) => *b,
            BoolAst::Var(i) => env[*i],
            BoolAst::Not(x) => !x.denote(env),
            BoolAst::And(xs) => xs.iter().all(|x| x.denote(env)),
            BoolAst::Or(xs) => xs.iter().any(|x| x.denote(env)),
            BoolAst::Xor(a, b) => a.denote(env) != b.denote(env),
            BoolAst::Implies(a, b) => !a.denote(env) || b.denote(env),
            BoolAst::Ite(c, t, e) => {
                if c.denote(env) {
                    t.denote(env)
                } else {
                    e.denote(env)
                }
            }
        }
    }

    pub fn build(&self, b: &mut Builder) -> Term {
        match self {
            BoolAst::Const(v) => b.bool_lit(*v),
            BoolAst::Var(i) => b.var(format!("b{}", i), Sort::Bool),
            BoolAst::Not(x) => {
                let x = x.build(b);
                b.not(x)
            }
            BoolAst::And(xs) => {
                let xs = xs.iter().map(|x| x.build(b)).collect();
                b.and_all(xs)
            }
            BoolAst::Or(xs) => {
                let xs = xs.iter().map(|x| x.build(b)).collect();
                b.or_all(xs)
            }
            BoolAst::Xor(x, y) => {
                let x = x.build(b);
                let y = y.build(b);
                b.xor(x, y)
            }
            BoolAst::Implies(x, y) => {
                let x = x.build(b);
                let y = y.build(b);
                b.implies(x, y)
            }
            BoolAst::Ite(c, t, e) => {
                let c = c.build(b);
                let t = t.build(b);
                let e = e.build(b);
                b.ite(c, t, e)
            }
        }
    }
}

/// Boolean trees with the given size.
pub struct BoolDist(pub usize);

impl Distribution<BoolAst> for BoolDist {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> BoolAst {
        if self.0 <= 1 {
            return if rng.gen() {
                BoolAst::Const(rng.gen())
            } else {
                BoolAst::Var(rng.gen_range(0..NVARS))
            };
        }
        let budget = self.0 - 1;
        match rng.gen_range(0..6) {
            0 => BoolAst::Not(Box::new(BoolDist(budget).sample(rng))),
            1 | 2 => {
                let arity = rng.gen_range(2..=3.min(budget).max(2));
                let sizes = Split(arity, budget.saturating_sub(arity)).sample(rng);
                let xs = sizes.iter().map(|n| BoolDist(n + 1).sample(rng)).collect();
                if rng.gen() {
                    BoolAst::And(xs)
                } else {
                    BoolAst::Or(xs)
                }
            }
            3 => {
                let sizes = Split(2, budget.saturating_sub(2)).sample(rng);
                BoolAst::Xor(
                    Box::new(BoolDist(sizes[0] + 1).sample(rng)),
                    Box::new(BoolDist(sizes[1] + 1).sample(rng)),
                )
            }
            4 => {
                let sizes = Split(2, budget.saturating_sub(2)).sample(rng);
                BoolAst::Implies(
                    Box::new(BoolDist(sizes[0] + 1).sample(rng)),
                    Box::new(BoolDist(sizes[1] + 1).sample(rng)),
                )
            }
            _ => {
                let sizes = Split(3, budget.saturating_sub(3)).sample(rng);
                BoolAst::Ite(
                    Box::new(BoolDist(sizes[0] + 1).sample(rng)),
                    Box::new(BoolDist(sizes[1] + 1).sample(rng)),
                    Box::new(BoolDist(sizes[2] + 1).sample(rng)),
                )
            }
        }
    }
}

pub const BV_W: usize = 8;

#[derive(Clone, Debug)]
pub enum BvAst {
    Const(u8),
    Var(usize),
    Add(Box<BvAst>, Box<BvAst>),
    Sub(Box<BvAst>, Box<BvAst>),
    Mul(Box<BvAst>, Box<BvAst>),
    Neg(Box<BvAst>),
    Xor(Box<BvAst>, Box<BvAst>),
    And(Box<BvAst>, Box<BvAst>),
    Or(Box<BvAst>, Box<BvAst>),
    Not(Box<BvAst>),
    ShlC(Box<BvAst>, usize),
    LshrC(Box<BvAst>, usize),
    Extract(Box<BvAst>, usize, usize),
}

impl BvAst {
    pub fn denote(&self, env: &[u8]) -> BitVec {
        let bv = |v: u8| BitVec::new(Integer::from(v), BV_W);
        match self {
            BvAst::Const(v) => bv(*v),
            BvAst::Var(i) => bv(env[*i]),
            BvAst::Add(a, b) => a.denote(env) + b.denote(env),
            BvAst::Sub(a, b) => a.denote(env) - b.denote(env),
            BvAst::Mul(a, b) => a.denote(env) * b.denote(env),
            BvAst::Neg(a) => -a.denote(env),
            BvAst::Xor(a, b) => a.denote(env) ^ b.denote(env),
            BvAst::And(a, b) => a.denote(env) & b.denote(env),
            BvAst::Or(a, b) => a.denote(env) | b.denote(env),
            BvAst::Not(a) => !a.denote(env),
            BvAst::ShlC(a, n) => a.denote(env).shl(*n),
            BvAst::LshrC(a, n) => a.denote(env).lshr(*n),
            BvAst::Extract(a, h, l) => a.denote(env).extract(*h, *l).uext(BV_W - (h - l + 1)),
        }
    }

    pub fn build(&self, b: &mut Builder) -> Term {
        match self {
            BvAst::Const(v) => b.bv_lit(*v, BV_W),
            BvAst::Var(i) => b.var(format!("v{}", i), Sort::BitVec(BV_W)),
            BvAst::Add(x, y) => {
                let (x, y) = (x.build(b), y.build(b));
                b.bv_add(x, y)
            }
            BvAst::Sub(x, y) => {
                let (x, y) = (x.build(b), y.build(b));
                b.bv_sub(x, y)
            }
            BvAst::Mul(x, y) => {
                let (x, y) = (x.build(b), y.build(b));
                b.bv_mul(x, y)
            }
            BvAst::Neg(x) => {
                let x = x.build(b);
                b.bv_neg(x)
            }
            BvAst::Xor(x, y) => {
                let (x, y) = (x.build(b), y.build(b));
                b.bv_xor(x, y)
            }
            BvAst::And(x, y) => {
                let (x, y) = (x.build(b), y.build(b));
                b.bv_and(x, y)
            }
            BvAst::Or(x, y) => {
                let (x, y) = (x.build(b), y.build(b));
                b.bv_or(x, y)
            }
            BvAst::Not(x) => {
                let x = x.build(b);
                b.bv_not(x)
            }
            BvAst::ShlC(x, n) => {
                let x = x.build(b);
                let n = b.bv_lit(*n as u64, BV_W);
                b.bv_shl(x, n)
            }
            BvAst::LshrC(x, n) => {
                let x = x.build(b);
                let n = b.bv_lit(*n as u64, BV_W);
                b.bv_lshr(x, n)
            }
            BvAst::Extract(x, h, l) => {
                let x = x.build(b);
                let e = b.bv_extract(x, *h, *l);
                b.bv_uext(e, BV_W - (h - l + 1))
            }
        }
    }
}

/// Bit-vector trees with the given size, all at width [BV_W].
pub struct BvDist(pub usize);

impl Distribution<BvAst> for BvDist {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> BvAst {
        if self.0 <= 1 {
            return if rng.gen() {
                BvAst::Const(rng.gen())
            } else {
                BvAst::Var(rng.gen_range(0..NVARS))
            };
        }
        let budget = self.0 - 1;
        let bin = |rng: &mut R| {
            let sizes = Split(2, budget.saturating_sub(2)).sample(rng);
            (
                Box::new(BvDist(sizes[0] + 1).sample(rng)),
                Box::new(BvDist(sizes[1] + 1).sample(rng)),
            )
        };
        match rng.gen_range(0..11) {
            0 => {
                let (a, b) = bin(rng);
                BvAst::Add(a, b)
            }
            1 => {
                let (a, b) = bin(rng);
                BvAst::Sub(a, b)
            }
            2 => {
                let (a, b) = bin(rng);
                BvAst::Mul(a, b)
            }
            3 => BvAst::Neg(Box::new(BvDist(budget).sample(rng))),
            4 => {
                let (a, b) = bin(rng);
                BvAst::Xor(a, b)
            }
            5 => {
                let (a, b) = bin(rng);
                BvAst::And(a, b)
            }
            6 => {
                let (a, b) = bin(rng);
                BvAst::Or(a, b)
            }
            7 => BvAst::Not(Box::new(BvDist(budget).sample(rng))),
            8 => BvAst::ShlC(Box::new(BvDist(budget).sample(rng)), rng.gen_range(0..BV_W)),
            9 => BvAst::LshrC(Box::new(BvDist(budget).sample(rng)), rng.gen_range(0..BV_W)),
            _ => {
                let h = rng.gen_range(0..BV_W);
                let l = rng.gen_range(0..=h);
                BvAst::Extract(Box::new(BvDist(budget).sample(rng)), h, l)
            }
        }
    }
}

#[derive(Clone, Debug)]
pub enum IntAst {
    Const(i32),
    Var(usize),
    Add(Box<IntAst>, Box<IntAst>),
    Sub(Box<IntAst>, Box<IntAst>),
    Mul(Box<IntAst>, Box<IntAst>),
    Neg(Box<IntAst>),
    Ite(BoolAst, Box<IntAst>, Box<IntAst>),
}

impl IntAst {
    pub fn denote(&self, benv: &[bool], env: &[i32]) -> Integer {
        match self {
            IntAst::Const(v) => Integer::from(*v),
            IntAst::Var(i) => Integer::from(env[*i]),
            IntAst::Add(a, b) => a.denote(benv, env) + b.denote(benv, env),
            IntAst::Sub(a, b) => a.denote(benv, env) - b.denote(benv, env),
            IntAst::Mul(a, b) => a.denote(benv, env) * b.denote(benv, env),
            IntAst::Neg(a) => -a.denote(benv, env),
            IntAst::Ite(c, t, e) => {
                if c.denote(benv) {
                    t.denote(benv, env)
                } else {
                    e.denote(benv, env)
                }
            }
        }
    }

    pub fn build(&self, b: &mut Builder) -> Term {
        match self {
            IntAst::Const(v) => b.int_lit(*v),
            IntAst::Var(i) => b.var(format!("i{}", i), Sort::Int),
            IntAst::Add(x, y) => {
                let (x, y) = (x.build(b), y.build(b));
                b.int_add(x, y)
            }
            IntAst::Sub(x, y) => {
                let (x, y) = (x.build(b), y.build(b));
                b.int_sub(x, y)
            }
            IntAst::Mul(x, y) => {
                let (x, y) = (x.build(b), y.build(b));
                b.int_mul(x, y)
            }
            IntAst::Neg(x) => {
                let x = x.build(b);
                b.int_neg(x)
            }
            IntAst::Ite(c, t, e) => {
                let c = c.build(b);
                let (t, e) = (t.build(b), e.build(b));
                b.ite(c, t, e)
            }
        }
    }
}

/// Integer trees with the given size.
pub struct IntDist(pub usize);

impl Distribution<IntAst> for IntDist {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> IntAst {
        if self.0 <= 1 {
            return if rng.gen() {
                IntAst::Const(rng.gen_range(-8..=8))
            } else {
                IntAst::Var(rng.gen_range(0..NVARS))
            };
        }
        let budget = self.0 - 1;
        let bin = |rng: &mut R| {
            let sizes = Split(2, budget.saturating_sub(2)).sample(rng);
            (
                Box::new(IntDist(sizes[0] + 1).sample(rng)),
                Box::new(IntDist(sizes[1] + 1).sample(rng)),
            )
        };
        match rng.gen_range(0..5) {
            0 => {
                let (a, b) = bin(rng);
                IntAst::Add(a, b)
            }
            1 => {
                let (a, b) = bin(rng);
                IntAst::Sub(a, b)
            }
            2 => {
                let (a, b) = bin(rng);
                IntAst::Mul(a, b)
            }
            3 => IntAst::Neg(Box::new(IntDist(budget).sample(rng))),
            _ => {
                let sizes = Split(3, budget.saturating_sub(3)).sample(rng);
                IntAst::Ite(
                    BoolDist(sizes[0] + 1).sample(rng),
                    Box::new(IntDist(sizes[1] + 1).sample(rng)),
                    Box::new(IntDist(sizes[2] + 1).sample(rng)),
                )
            }
        }
    }
}
