//! The NEXT-pusher (C2): rewrites a formula so every `NEXT` wraps a
//! symbol leaf directly, respecting quantifier-bound variables.

use crate::env::Environment;
use crate::error::{Result, VmtError};
use crate::symbol::Symbol;
use crate::term::{FormulaNode, Term, intern};
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};

/// Push every `NEXT` in `t` down to symbol leaves.
///
/// Fails with [`VmtError::UnexpectedNext`] if a `NEXT` is found nested
/// inside another `NEXT` anywhere in the DAG.
pub fn push_next(env: &Environment, t: Term) -> Result<Term> {
    NextPusher::new(env).push(t, &BTreeSet::new())
}

/// Returns `true` once every `NEXT` in `t` has a symbol child.
pub fn has_next_at_leaves(t: Term) -> bool {
    fn check(t: Term, under_next: bool) -> bool {
        match &*t {
            FormulaNode::Next(inner) => inner.is_symbol() && check(*inner, true),
            other => other.children().iter().all(|c| check(*c, under_next)),
        }
    }
    check(t, false)
}

struct NextPusher<'e> {
    env: &'e Environment,
    memo: RefCell<HashMap<(Term, BTreeSet<Symbol>), Term>>,
}

impl<'e> NextPusher<'e> {
    fn new(env: &'e Environment) -> Self {
        NextPusher {
            env,
            memo: RefCell::new(HashMap::new()),
        }
    }

    fn push(&self, t: Term, bound: &BTreeSet<Symbol>) -> Result<Term> {
        let key = (t, bound.clone());
        if let Some(r) = self.memo.borrow().get(&key) {
            return Ok(*r);
        }
        let result = match &*t {
            FormulaNode::Next(inner) => self.distribute_next(*inner, bound)?,
            FormulaNode::Quantifier(q, vars, body) => {
                let mut nb = bound.clone();
                nb.extend(vars.iter().copied());
                let new_body = self.push(*body, &nb)?;
                self.env.mk_quantifier(*q, vars.clone(), new_body)?
            }
            FormulaNode::BoolConst(_)
            | FormulaNode::IntConst(_)
            | FormulaNode::RealConst(_)
            | FormulaNode::BvConst { .. }
            | FormulaNode::Symbol(_) => t,
            other => {
                let children = other.children();
                let new_children = children
                    .iter()
                    .map(|c| self.push(*c, bound))
                    .collect::<Result<Vec<_>>>()?;
                rebuild(self.env, other, new_children)?
            }
        };
        self.memo.borrow_mut().insert(key, result);
        Ok(result)
    }

    /// `inner` is the operand of a `NEXT` node: distribute the `NEXT` over
    /// `inner`'s top operator, or strip/retain it at a symbol leaf.
    fn distribute_next(&self, inner: Term, bound: &BTreeSet<Symbol>) -> Result<Term> {
        if self.env.has_next(inner) {
            return Err(VmtError::UnexpectedNext);
        }
        match &*inner {
            FormulaNode::Symbol(s) => {
                if bound.contains(s) {
                    // Binding overrides temporal next.
                    Ok(inner)
                } else {
                    self.env.mk_next(inner)
                }
            }
            FormulaNode::Quantifier(q, vars, body) => {
                let mut nb = bound.clone();
                nb.extend(vars.iter().copied());
                let next_body = self.env.mk_next(*body)?;
                let pushed_body = self.push(next_body, &nb)?;
                self.env.mk_quantifier(*q, vars.clone(), pushed_body)
            }
            other => {
                let children = other.children();
                let next_children = children
                    .iter()
                    .map(|c| {
                        let nc = self.env.mk_next(*c)?;
                        self.push(nc, bound)
                    })
                    .collect::<Result<Vec<_>>>()?;
                rebuild(self.env, other, next_children)
            }
        }
    }
}

/// Rebuild a node of the same kind as `node`, with `new_children` in place
/// of its original children. Used after recursively rewriting children.
fn rebuild(env: &Environment, node: &FormulaNode, mut new_children: Vec<Term>) -> Result<Term> {
    match node {
        FormulaNode::BoolConst(_)
        | FormulaNode::IntConst(_)
        | FormulaNode::RealConst(_)
        | FormulaNode::BvConst { .. }
        | FormulaNode::Symbol(_) => Ok(intern(node.clone())),
        FormulaNode::Not(_) => env.mk_not(new_children.remove(0)),
        FormulaNode::And(_) => env.mk_and(new_children),
        FormulaNode::Or(_) => env.mk_or(new_children),
        FormulaNode::Implies(_, _) => {
            let b = new_children.remove(1);
            let a = new_children.remove(0);
            env.mk_implies(a, b)
        }
        FormulaNode::Iff(_, _) => {
            let b = new_children.remove(1);
            let a = new_children.remove(0);
            env.mk_iff(a, b)
        }
        FormulaNode::Ite(_, _, _) => {
            let e = new_children.remove(2);
            let t = new_children.remove(1);
            let c = new_children.remove(0);
            env.mk_ite(c, t, e)
        }
        FormulaNode::Eq(_, _) => {
            let b = new_children.remove(1);
            let a = new_children.remove(0);
            env.mk_eq(a, b)
        }
        FormulaNode::Cmp(op, _, _) => {
            let b = new_children.remove(1);
            let a = new_children.remove(0);
            env.mk_cmp(*op, a, b)
        }
        FormulaNode::Arith(op, _, _) => {
            let b = new_children.remove(1);
            let a = new_children.remove(0);
            env.mk_arith(*op, a, b)
        }
        FormulaNode::BvOp(op, _) => env.mk_bvop(*op, new_children),
        FormulaNode::Next(_) => env.mk_next(new_children.remove(0)),
        FormulaNode::Ltl(op, _) => {
            if new_children.len() == 1 {
                env.mk_ltl_unary(*op, new_children.remove(0))
            } else {
                let b = new_children.remove(1);
                let a = new_children.remove(0);
                env.mk_ltl_binary(*op, a, b)
            }
        }
        FormulaNode::Quantifier(..) => unreachable!("quantifiers are rewritten separately"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sort::{Quantifier, Sort};
    use crate::symbol::symbol;

    #[test]
    fn push_over_or() {
        let env = Environment::new();
        let a = env.mk_symbol(symbol("a", Sort::Bool));
        let b = env.mk_symbol(symbol("b", Sort::Bool));
        let or_ab = env.mk_or(vec![a, b]).unwrap();
        let next_or = env.mk_next(or_ab).unwrap();

        let pushed = push_next(&env, next_or).unwrap();
        let next_a = env.mk_next(a).unwrap();
        let next_b = env.mk_next(b).unwrap();
        let expected = env.mk_or(vec![next_a, next_b]).unwrap();
        assert_eq!(pushed, expected);
    }

    #[test]
    fn push_respects_quantifier_binding() {
        let env = Environment::new();
        let a = symbol("a", Sort::Bool);
        let x = symbol("x", Sort::Bool);
        let at = env.mk_symbol(a);
        let xt = env.mk_symbol(x);
        let eq = env.mk_eq(xt, xt).unwrap(); // stand-in body using x
        let body = env.mk_and(vec![at, eq]).unwrap();
        let exists = env.mk_quantifier(Quantifier::Exists, vec![x], body).unwrap();
        let next_exists = env.mk_next(exists).unwrap();

        let pushed = push_next(&env, next_exists).unwrap();
        assert!(has_next_at_leaves(pushed));
        // `a` (free) must be wrapped in NEXT, `x` (bound) must not be.
        let next_a = env.mk_next(at).unwrap();
        assert!(format!("{pushed}").contains(&format!("{next_a}")));
    }

    #[test]
    fn idempotent() {
        let env = Environment::new();
        let a = env.mk_symbol(symbol("a", Sort::Bool));
        let b = env.mk_symbol(symbol("b", Sort::Bool));
        let u = env.mk_ltl_binary(crate::sort::LtlOp::U, a, b).unwrap();
        let next_u = env.mk_next(u).unwrap();
        let once = push_next(&env, next_u).unwrap();
        let twice = push_next(&env, once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn nested_next_is_rejected() {
        let env = Environment::new();
        let a = env.mk_symbol(symbol("a", Sort::Bool));
        let next_a = env.mk_next(a).unwrap();
        assert!(env.mk_next(next_a).is_err());
    }
}
