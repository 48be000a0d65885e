//! Strings. Every string term tracks a length range; the predicates consult
//! it before wrapping.

use super::Builder;
use crate::sort::StrEnc;
use crate::term::{Op, Term};
use crate::value::{StrVal, Value};

impl Builder {
    pub fn str_lit(&mut self, v: StrVal) -> Term {
        self.constant(Value::Str(v))
    }

    /// An 8-bit-encoded literal from ASCII text.
    pub fn str_ascii(&mut self, s: &str) -> Term {
        debug_assert!(s.is_ascii());
        let units = s.bytes().map(u32::from).collect();
        self.str_lit(StrVal::new(StrEnc::Char8, units))
    }

    pub fn str_empty(&mut self, enc: StrEnc) -> Term {
        self.str_lit(StrVal::empty(enc))
    }

    pub fn str_concat(&mut self, a: Term, b: Term) -> Term {
        self.str_concat_all(vec![a, b])
    }

    /// Flattens nested concats, merges adjacent literals, drops empties.
    pub fn str_concat_all(&mut self, xs: Vec<Term>) -> Term {
        let enc = xs.first().expect("empty concat").sort().as_str_enc();
        let mut parts: Vec<Term> = Vec::new();
        for x in xs {
            let flat: Vec<Term> = if let Op::StrConcat = x.op() {
                x.cs().to_vec()
            } else {
                vec![x]
            };
            for p in flat {
                let lit = if let Op::Const(Value::Str(s)) = p.op() {
                    Some(s.clone())
                } else {
                    None
                };
                match lit {
                    Some(s) if s.is_empty() => {}
                    Some(s) => {
                        let prev = match parts.last().map(|l| l.op()) {
                            Some(Op::Const(Value::Str(p0))) => Some(p0.clone()),
                            _ => None,
                        };
                        let joined = match prev {
                            Some(p0) => {
                                parts.pop();
                                p0.concat(&s)
                            }
                            None => s,
                        };
                        let t = self.str_lit(joined);
                        parts.push(t);
                    }
                    None => parts.push(p),
                }
            }
        }
        match parts.len() {
            0 => self.str_empty(enc),
            1 => parts.pop().unwrap(),
            _ => self.mk(Op::StrConcat, parts),
        }
    }

    pub fn str_len(&mut self, s: Term) -> Term {
        if let Op::Const(Value::Str(v)) = s.op() {
            return self.int_lit(v.len() as u64);
        }
        // length distributes over concatenation
        if let Op::StrConcat = s.op() {
            let mut acc = self.int_lit(0);
            for c in s.cs().to_vec() {
                let l = self.str_len(c);
                acc = self.int_add(acc, l);
            }
            return acc;
        }
        let t = self.mk(Op::StrLen, vec![s]);
        self.scalar_simplify(t)
    }

    pub fn str_contains(&mut self, s: Term, needle: Term) -> Term {
        if let (Op::Const(Value::Str(a)), Op::Const(Value::Str(b))) = (s.op(), needle.op()) {
            let r = a.contains(b);
            return self.bool_lit(r);
        }
        if let Op::Const(Value::Str(b)) = needle.op() {
            if b.is_empty() {
                return self.tru();
            }
        }
        let t = self.mk(Op::StrContains, vec![s, needle]);
        self.bool_simplify(t)
    }

    pub fn str_prefix_of(&mut self, prefix: Term, s: Term) -> Term {
        if let (Op::Const(Value::Str(a)), Op::Const(Value::Str(b))) = (prefix.op(), s.op()) {
            let r = a.is_prefix_of(b);
            return self.bool_lit(r);
        }
        if let Op::Const(Value::Str(a)) = prefix.op() {
            if a.is_empty() {
                return self.tru();
            }
        }
        let t = self.mk(Op::StrPrefixOf, vec![prefix, s]);
        self.bool_simplify(t)
    }

    pub fn str_suffix_of(&mut self, suffix: Term, s: Term) -> Term {
        if let (Op::Const(Value::Str(a)), Op::Const(Value::Str(b))) = (suffix.op(), s.op()) {
            let r = a.is_suffix_of(b);
            return self.bool_lit(r);
        }
        if let Op::Const(Value::Str(a)) = suffix.op() {
            if a.is_empty() {
                return self.tru();
            }
        }
        let t = self.mk(Op::StrSuffixOf, vec![suffix, s]);
        self.bool_simplify(t)
    }

    /// First occurrence of `needle` in `s` at or after `from`; −1 when
    /// absent or `from` is negative.
    pub fn str_index_of(&mut self, s: Term, needle: Term, from: Term) -> Term {
        if let (Op::Const(Value::Str(a)), Op::Const(Value::Str(b)), Some(i)) =
            (s.op(), needle.op(), from.as_int_opt())
        {
            let r = if *i < 0 {
                -1i64
            } else {
                match a.find(b, i.to_usize().unwrap_or(usize::MAX)) {
                    Some(j) => j as i64,
                    None => -1,
                }
            };
            return self.int_lit(r);
        }
        let t = self.mk(Op::StrIndexOf, vec![s, needle, from]);
        self.scalar_simplify(t)
    }

    /// Substring of length at most `n` starting at `off`; out-of-range or
    /// negative arguments give the empty string.
    pub fn str_substr(&mut self, s: Term, off: Term, n: Term) -> Term {
        let enc = s.sort().as_str_enc();
        if let (Op::Const(Value::Str(v)), Some(o), Some(k)) =
            (s.op(), off.as_int_opt(), n.as_int_opt())
        {
            let r = if *o < 0 || *k < 0 {
                StrVal::empty(enc)
            } else {
                v.substr(
                    o.to_usize().unwrap_or(usize::MAX),
                    k.to_usize().unwrap_or(usize::MAX),
                )
            };
            return self.str_lit(r);
        }
        if let Some(k) = n.as_int_opt() {
            if *k <= 0 {
                return self.str_empty(enc);
            }
        }
        self.mk(Op::StrSubstr, vec![s, off, n])
    }
}
