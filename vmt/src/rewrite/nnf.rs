//! Negation normal form: pushes negations down to atoms using the LTL
//! dualities (`not X = N not`, `not G = F not`, `not U = R not` swapping
//! both operands, and the past mirrors), plus the ordinary Boolean
//! dualities for `and`/`or`/`=>`/`<=>`/quantifiers/`ite`.
//!
//! Implemented as a pair of mutually recursive walks, `pos` (rewrite `t` as
//! it occurs) and `neg` (rewrite `not t` as it would occur), rather than a
//! single walk that matches on `Not` nodes — this makes every duality a
//! direct translation instead of a lookup followed by a second pass.

use super::support::rebuild;
use crate::env::Environment;
use crate::error::Result;
use crate::sort::{LtlOp, Quantifier, Sort};
use crate::term::{FormulaNode, Term};
use std::cell::RefCell;
use std::collections::HashMap;

pub fn nnf(env: &Environment, t: Term) -> Result<Term> {
    Nnfizer { env, pos_memo: RefCell::new(HashMap::new()), neg_memo: RefCell::new(HashMap::new()) }.pos(t)
}

struct Nnfizer<'e> {
    env: &'e Environment,
    pos_memo: RefCell<HashMap<Term, Term>>,
    neg_memo: RefCell<HashMap<Term, Term>>,
}

fn dual(q: Quantifier) -> Quantifier {
    match q {
        Quantifier::Forall => Quantifier::Exists,
        Quantifier::Exists => Quantifier::Forall,
    }
}

fn dual_ltl(op: LtlOp) -> LtlOp {
    match op {
        LtlOp::X => LtlOp::N,
        LtlOp::N => LtlOp::X,
        LtlOp::G => LtlOp::F,
        LtlOp::F => LtlOp::G,
        LtlOp::U => LtlOp::R,
        LtlOp::R => LtlOp::U,
        LtlOp::Y => LtlOp::Z,
        LtlOp::Z => LtlOp::Y,
        LtlOp::H => LtlOp::O,
        LtlOp::O => LtlOp::H,
        LtlOp::S => LtlOp::T,
        LtlOp::T => LtlOp::S,
    }
}

impl Nnfizer<'_> {
    /// NNF of `t`, as it appears in positive position.
    fn pos(&self, t: Term) -> Result<Term> {
        if let Some(r) = self.pos_memo.borrow().get(&t) {
            return Ok(*r);
        }
        let env = self.env;
        let result = match &*t {
            FormulaNode::Not(a) => self.neg(*a)?,
            FormulaNode::Implies(a, b) => {
                let na = self.neg(*a)?;
                let pb = self.pos(*b)?;
                env.mk_or(vec![na, pb])?
            }
            FormulaNode::Iff(a, b) => {
                let (pa, pb, na, nb) = (self.pos(*a)?, self.pos(*b)?, self.neg(*a)?, self.neg(*b)?);
                let c1 = env.mk_and(vec![pa, pb])?;
                let c2 = env.mk_and(vec![na, nb])?;
                env.mk_or(vec![c1, c2])?
            }
            FormulaNode::Ite(c, a, b) if env.sort_of(t) == Sort::Bool => {
                let (pc, pa, pb) = (self.pos(*c)?, self.pos(*a)?, self.pos(*b)?);
                env.mk_ite(pc, pa, pb)?
            }
            FormulaNode::Quantifier(q, vars, body) => {
                env.mk_quantifier(*q, vars.clone(), self.pos(*body)?)?
            }
            FormulaNode::Ltl(op, args) => {
                let new_args: Vec<Term> = args.iter().map(|a| self.pos(*a)).collect::<Result<_>>()?;
                self.rebuild_ltl(*op, new_args)?
            }
            other => {
                let children = other.children();
                let new_children = children.iter().map(|c| self.pos(*c)).collect::<Result<Vec<_>>>()?;
                rebuild(env, other, new_children)?
            }
        };
        self.pos_memo.borrow_mut().insert(t, result);
        Ok(result)
    }

    /// NNF of `not t`, i.e. `t` as it appears in negative position.
    fn neg(&self, t: Term) -> Result<Term> {
        if let Some(r) = self.neg_memo.borrow().get(&t) {
            return Ok(*r);
        }
        let env = self.env;
        let result = match &*t {
            FormulaNode::Not(a) => self.pos(*a)?,
            FormulaNode::And(args) => {
                let negated: Vec<Term> = args.iter().map(|a| self.neg(*a)).collect::<Result<_>>()?;
                env.mk_or(negated)?
            }
            FormulaNode::Or(args) => {
                let negated: Vec<Term> = args.iter().map(|a| self.neg(*a)).collect::<Result<_>>()?;
                env.mk_and(negated)?
            }
            FormulaNode::Implies(a, b) => {
                let pa = self.pos(*a)?;
                let nb = self.neg(*b)?;
                env.mk_and(vec![pa, nb])?
            }
            FormulaNode::Iff(a, b) => {
                let (pa, pb, na, nb) = (self.pos(*a)?, self.pos(*b)?, self.neg(*a)?, self.neg(*b)?);
                let c1 = env.mk_and(vec![pa, nb])?;
                let c2 = env.mk_and(vec![na, pb])?;
                env.mk_or(vec![c1, c2])?
            }
            FormulaNode::Ite(c, a, b) if env.sort_of(t) == Sort::Bool => {
                let (pc, na, nb) = (self.pos(*c)?, self.neg(*a)?, self.neg(*b)?);
                env.mk_ite(pc, na, nb)?
            }
            FormulaNode::Quantifier(q, vars, body) => {
                env.mk_quantifier(dual(*q), vars.clone(), self.neg(*body)?)?
            }
            FormulaNode::Next(a) => env.mk_next(self.neg(*a)?)?,
            FormulaNode::Ltl(op, args) => {
                let negated: Vec<Term> = args.iter().map(|a| self.neg(*a)).collect::<Result<_>>()?;
                self.rebuild_ltl(dual_ltl(*op), negated)?
            }
            // Atoms: leaves, Eq/Cmp/Arith/BvOp comparisons. Negation stops here.
            _ => env.mk_not(self.pos(t)?)?,
        };
        self.neg_memo.borrow_mut().insert(t, result);
        Ok(result)
    }

    fn rebuild_ltl(&self, op: LtlOp, mut args: Vec<Term>) -> Result<Term> {
        if args.len() == 1 {
            self.env.mk_ltl_unary(op, args.remove(0))
        } else {
            let b = args.remove(1);
            let a = args.remove(0);
            self.env.mk_ltl_binary(op, a, b)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::symbol;

    #[test]
    fn double_negation_cancels() {
        let env = Environment::new();
        let a = env.mk_symbol(symbol("a", Sort::Bool));
        let nn = env.mk_not(env.mk_not(a).unwrap()).unwrap();
        assert_eq!(nnf(&env, nn).unwrap(), a);
    }

    #[test]
    fn not_x_becomes_n_not() {
        let env = Environment::new();
        let a = env.mk_symbol(symbol("a", Sort::Bool));
        let x = env.mk_ltl_unary(LtlOp::X, a).unwrap();
        let not_x = env.mk_not(x).unwrap();
        let result = nnf(&env, not_x).unwrap();
        match &*result {
            FormulaNode::Ltl(LtlOp::N, args) => assert!(matches!(&*args[0], FormulaNode::Not(_))),
            other => panic!("expected N(not a), got {other}"),
        }
    }

    #[test]
    fn not_and_becomes_or_of_nots() {
        let env = Environment::new();
        let a = env.mk_symbol(symbol("a", Sort::Bool));
        let b = env.mk_symbol(symbol("b", Sort::Bool));
        let and_ab = env.mk_and(vec![a, b]).unwrap();
        let not_and = env.mk_not(and_ab).unwrap();
        let result = nnf(&env, not_and).unwrap();
        assert!(matches!(&*result, FormulaNode::Or(_)));
    }

    #[test]
    fn not_until_becomes_release_of_nots() {
        let env = Environment::new();
        let a = env.mk_symbol(symbol("a", Sort::Bool));
        let b = env.mk_symbol(symbol("b", Sort::Bool));
        let u = env.mk_ltl_binary(LtlOp::U, a, b).unwrap();
        let not_u = env.mk_not(u).unwrap();
        let result = nnf(&env, not_u).unwrap();
        match &*result {
            FormulaNode::Ltl(LtlOp::R, args) => {
                assert!(matches!(&*args[0], FormulaNode::Not(_)));
                assert!(matches!(&*args[1], FormulaNode::Not(_)));
            }
            other => panic!("expected R(not a, not b), got {other}"),
        }
    }

    #[test]
    fn already_nnf_formula_is_stable() {
        let env = Environment::new();
        let a = env.mk_symbol(symbol("a", Sort::Bool));
        let g = env.mk_ltl_unary(LtlOp::G, a).unwrap();
        assert_eq!(nnf(&env, g).unwrap(), g);
    }
}
