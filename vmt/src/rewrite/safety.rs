//! Safety-LTL detection under negation normal form (§4.3, §9): a formula is
//! *not* safety iff it contains a positive occurrence of `U` or `F`.
//!
//! The walk below intentionally does not special-case the generic Boolean
//! and arithmetic operators the way the reference implementation's
//! overlapping handler registration did (its `ALL_TYPES` handler and its
//! `LTL_U, LTL_F` handler both matched generic connectives, so results
//! depended on registration order). Here there is exactly one rule:
//! `U`/`F` are live, every other node is live iff one of its children is.

use crate::sort::LtlOp;
use crate::term::{FormulaNode, Term};

/// `t` must already be in negation normal form — callers run [`super::nnf`]
/// first so that every remaining `U`/`F` occurrence is genuinely positive.
pub fn is_safety_ltl(t: Term) -> bool {
    !contains_live_operator(t)
}

fn contains_live_operator(t: Term) -> bool {
    match &*t {
        FormulaNode::Ltl(LtlOp::U, _) | FormulaNode::Ltl(LtlOp::F, _) => true,
        other => other.children().iter().any(|c| contains_live_operator(*c)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Environment;
    use crate::rewrite::nnf;
    use crate::sort::Sort;
    use crate::symbol::symbol;

    #[test]
    fn globally_is_safety() {
        let env = Environment::new();
        let a = env.mk_symbol(symbol("a", Sort::Bool));
        let g = env.mk_ltl_unary(LtlOp::G, a).unwrap();
        assert!(is_safety_ltl(nnf(&env, g).unwrap()));
    }

    #[test]
    fn eventually_is_not_safety() {
        let env = Environment::new();
        let a = env.mk_symbol(symbol("a", Sort::Bool));
        let f = env.mk_ltl_unary(LtlOp::F, a).unwrap();
        assert!(!is_safety_ltl(nnf(&env, f).unwrap()));
    }

    #[test]
    fn until_under_globally_is_not_safety() {
        let env = Environment::new();
        let a = env.mk_symbol(symbol("a", Sort::Bool));
        let b = env.mk_symbol(symbol("b", Sort::Bool));
        let u = env.mk_ltl_binary(LtlOp::U, a, b).unwrap();
        let g = env.mk_ltl_unary(LtlOp::G, u).unwrap();
        assert!(!is_safety_ltl(nnf(&env, g).unwrap()));
    }

    #[test]
    fn negated_until_in_nnf_becomes_release_and_is_safety() {
        // not(a U b), in NNF, is (not a) R (not b) - a release, which is safety.
        let env = Environment::new();
        let a = env.mk_symbol(symbol("a", Sort::Bool));
        let b = env.mk_symbol(symbol("b", Sort::Bool));
        let u = env.mk_ltl_binary(LtlOp::U, a, b).unwrap();
        let not_u = env.mk_not(u).unwrap();
        assert!(is_safety_ltl(nnf(&env, not_u).unwrap()));
    }
}
