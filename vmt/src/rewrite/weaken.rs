//! X-weakener (§4.4.4): replaces every strong next (`X`) with its weak
//! counterpart (`N`), the transform the safety-LTL encoder applies before
//! handing a formula to the LTLf tableau.

use super::support::rebuild;
use crate::env::Environment;
use crate::error::Result;
use crate::sort::LtlOp;
use crate::term::{FormulaNode, Term};
use std::cell::RefCell;
use std::collections::HashMap;

pub fn weaken_x(env: &Environment, t: Term) -> Result<Term> {
    Weakener { env, memo: RefCell::new(HashMap::new()) }.walk(t)
}

struct Weakener<'e> {
    env: &'e Environment,
    memo: RefCell<HashMap<Term, Term>>,
}

impl Weakener<'_> {
    fn walk(&self, t: Term) -> Result<Term> {
        if let Some(r) = self.memo.borrow().get(&t) {
            return Ok(*r);
        }
        let result = match &*t {
            FormulaNode::Ltl(LtlOp::X, args) => {
                let a = self.walk(args[0])?;
                self.env.mk_ltl_unary(LtlOp::N, a)?
            }
            other => {
                let children = other.children();
                let new_children = children.iter().map(|c| self.walk(*c)).collect::<Result<Vec<_>>>()?;
                rebuild(self.env, other, new_children)?
            }
        };
        self.memo.borrow_mut().insert(t, result);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sort::Sort;
    use crate::symbol::symbol;

    #[test]
    fn strong_next_becomes_weak_next() {
        let env = Environment::new();
        let a = env.mk_symbol(symbol("a", Sort::Bool));
        let x = env.mk_ltl_unary(LtlOp::X, a).unwrap();
        let weakened = weaken_x(&env, x).unwrap();
        let expected = env.mk_ltl_unary(LtlOp::N, a).unwrap();
        assert_eq!(weakened, expected);
    }

    #[test]
    fn recurses_under_until() {
        let env = Environment::new();
        let a = env.mk_symbol(symbol("a", Sort::Bool));
        let b = env.mk_symbol(symbol("b", Sort::Bool));
        let x = env.mk_ltl_unary(LtlOp::X, a).unwrap();
        let u = env.mk_ltl_binary(LtlOp::U, x, b).unwrap();
        let weakened = weaken_x(&env, u).unwrap();
        match &*weakened {
            FormulaNode::Ltl(LtlOp::U, args) => {
                assert!(matches!(&*args[0], FormulaNode::Ltl(LtlOp::N, _)));
            }
            other => panic!("expected U(N(a), b), got {other}"),
        }
    }

    #[test]
    fn formula_without_x_is_unchanged() {
        let env = Environment::new();
        let a = env.mk_symbol(symbol("a", Sort::Bool));
        let g = env.mk_ltl_unary(LtlOp::G, a).unwrap();
        assert_eq!(weaken_x(&env, g).unwrap(), g);
    }
}
