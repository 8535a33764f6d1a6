//! Shared plumbing for the rewriters in this module: rebuilding a node from
//! already-rewritten children, used by every walker here once it has
//! recursed into a node it doesn't special-case itself.

use crate::env::Environment;
use crate::error::Result;
use crate::term::{FormulaNode, Term, intern};

pub(super) fn rebuild(env: &Environment, node: &FormulaNode, mut children: Vec<Term>) -> Result<Term> {
    match node {
        FormulaNode::BoolConst(_)
        | FormulaNode::IntConst(_)
        | FormulaNode::RealConst(_)
        | FormulaNode::BvConst { .. }
        | FormulaNode::Symbol(_) => Ok(intern(node.clone())),
        FormulaNode::Not(_) => env.mk_not(children.remove(0)),
        FormulaNode::And(_) => env.mk_and(children),
        FormulaNode::Or(_) => env.mk_or(children),
        FormulaNode::Implies(_, _) => {
            let b = children.remove(1);
            let a = children.remove(0);
            env.mk_implies(a, b)
        }
        FormulaNode::Iff(_, _) => {
            let b = children.remove(1);
            let a = children.remove(0);
            env.mk_iff(a, b)
        }
        FormulaNode::Ite(_, _, _) => {
            let e = children.remove(2);
            let t = children.remove(1);
            let c = children.remove(0);
            env.mk_ite(c, t, e)
        }
        FormulaNode::Eq(_, _) => {
            let b = children.remove(1);
            let a = children.remove(0);
            env.mk_eq(a, b)
        }
        FormulaNode::Cmp(op, _, _) => {
            let b = children.remove(1);
            let a = children.remove(0);
            env.mk_cmp(*op, a, b)
        }
        FormulaNode::Arith(op, _, _) => {
            let b = children.remove(1);
            let a = children.remove(0);
            env.mk_arith(*op, a, b)
        }
        FormulaNode::BvOp(op, _) => env.mk_bvop(*op, children),
        FormulaNode::Quantifier(q, vars, _) => env.mk_quantifier(*q, vars.clone(), children.remove(0)),
        FormulaNode::Next(_) => env.mk_next(children.remove(0)),
        FormulaNode::Ltl(op, _) => {
            if children.len() == 1 {
                env.mk_ltl_unary(*op, children.remove(0))
            } else {
                let b = children.remove(1);
                let a = children.remove(0);
                env.mk_ltl_binary(*op, a, b)
            }
        }
    }
}
