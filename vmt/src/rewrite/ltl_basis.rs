//! Rewrites every LTL operator down to the `{X, U, Y, S}` basis (§4.3):
//! `F phi = true U phi`, `G phi = not(true U (not phi))`,
//! `phi R psi = not(not phi U not psi)`, `N phi = not X not phi`, and the
//! past-time mirrors `O`/`H`/`T` via `Y`/`S`/`Z`.

use super::support::rebuild;
use crate::env::Environment;
use crate::error::Result;
use crate::sort::LtlOp;
use crate::term::{FormulaNode, Term};
use std::cell::RefCell;
use std::collections::HashMap;

/// Rewrite `t` so its only LTL operators are `X`, `U`, `Y` and `S`.
pub fn rewrite_to_basis(env: &Environment, t: Term) -> Result<Term> {
    Rewriter { env, memo: RefCell::new(HashMap::new()), ltlf: false }.rewrite(t)
}

/// Rewrite `t` to the wider LTLf basis `{X, N, U, R, Y, Z, S, T}` (§4.4.3):
/// only `F`/`G`/`O`/`H` are eliminated (via `U`/`S`), since the finite-trace
/// tableau needs `R` and `T` as primitives rather than negated `U`/`S`.
pub fn rewrite_to_ltlf_basis(env: &Environment, t: Term) -> Result<Term> {
    Rewriter { env, memo: RefCell::new(HashMap::new()), ltlf: true }.rewrite(t)
}

struct Rewriter<'e> {
    env: &'e Environment,
    memo: RefCell<HashMap<Term, Term>>,
    /// `true` keeps `X`/`N`/`R`/`T` as primitives (the LTLf basis);
    /// `false` reduces them away too (the infinite-LTL basis).
    ltlf: bool,
}

impl Rewriter<'_> {
    fn rewrite(&self, t: Term) -> Result<Term> {
        if let Some(r) = self.memo.borrow().get(&t) {
            return Ok(*r);
        }
        let result = match &*t {
            FormulaNode::Ltl(op, args) => {
                let args: Vec<Term> = args.iter().map(|a| self.rewrite(*a)).collect::<Result<_>>()?;
                self.reduce(*op, &args)?
            }
            other => {
                let children = other.children();
                let new_children = children.iter().map(|c| self.rewrite(*c)).collect::<Result<Vec<_>>>()?;
                rebuild(self.env, other, new_children)?
            }
        };
        self.memo.borrow_mut().insert(t, result);
        Ok(result)
    }

    /// `args` are already rewritten to the basis; combine them per `op`.
    fn reduce(&self, op: LtlOp, args: &[Term]) -> Result<Term> {
        let env = self.env;
        match op {
            LtlOp::X | LtlOp::U | LtlOp::Y | LtlOp::S => {
                if args.len() == 1 {
                    env.mk_ltl_unary(op, args[0])
                } else {
                    env.mk_ltl_binary(op, args[0], args[1])
                }
            }
            // The LTLf basis keeps N/R/Z/T as primitives; the infinite-LTL
            // basis reduces them to X/U/Y/S plus negation.
            LtlOp::N | LtlOp::R | LtlOp::Z | LtlOp::T if self.ltlf => {
                if args.len() == 1 {
                    env.mk_ltl_unary(op, args[0])
                } else {
                    env.mk_ltl_binary(op, args[0], args[1])
                }
            }
            LtlOp::F => {
                // F phi = true U phi
                let top = env.mk_true();
                env.mk_ltl_binary(LtlOp::U, top, args[0])
            }
            LtlOp::G => {
                // G phi = not(true U not phi)
                let not_phi = env.mk_not(args[0])?;
                let top = env.mk_true();
                let until = env.mk_ltl_binary(LtlOp::U, top, not_phi)?;
                env.mk_not(until)
            }
            LtlOp::R => {
                // phi R psi = not(not phi U not psi)
                let not_a = env.mk_not(args[0])?;
                let not_b = env.mk_not(args[1])?;
                let until = env.mk_ltl_binary(LtlOp::U, not_a, not_b)?;
                env.mk_not(until)
            }
            LtlOp::N => {
                // N phi = not X not phi
                let not_phi = env.mk_not(args[0])?;
                let x = env.mk_ltl_unary(LtlOp::X, not_phi)?;
                env.mk_not(x)
            }
            LtlOp::O => {
                // O phi = true S phi
                let top = env.mk_true();
                env.mk_ltl_binary(LtlOp::S, top, args[0])
            }
            LtlOp::H => {
                // H phi = not(true S not phi)
                let not_phi = env.mk_not(args[0])?;
                let top = env.mk_true();
                let since = env.mk_ltl_binary(LtlOp::S, top, not_phi)?;
                env.mk_not(since)
            }
            LtlOp::T => {
                // phi T psi = not(not phi S not psi)
                let not_a = env.mk_not(args[0])?;
                let not_b = env.mk_not(args[1])?;
                let since = env.mk_ltl_binary(LtlOp::S, not_a, not_b)?;
                env.mk_not(since)
            }
            LtlOp::Z => {
                // Z phi = not Y not phi
                let not_phi = env.mk_not(args[0])?;
                let y = env.mk_ltl_unary(LtlOp::Y, not_phi)?;
                env.mk_not(y)
            }
        }
    }
}
