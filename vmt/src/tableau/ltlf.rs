//! LTLf (finite-trace) tableau encoder (§4.4.3): produces a copy of the
//! input model carrying one invariant property whose falsity witnesses a
//! finite trace satisfying the original formula.
//!
//! Elementary-subformula extraction follows [`super::classical`], extended
//! with the weak-next (`N`), `Z`, `R` and `T` cases. The key semantic lever
//! is the tableau transition for *strong* future obligations (`X`, and the
//! witness variables for `U`/`R`): it is an implication, not a
//! biconditional, so a finite trace may end with the obligation
//! undischarged — that is exactly what the finite-stop invariant (the
//! disjunction of every positive-`X` witness) catches.

use crate::env::Environment;
use crate::error::Result;
use crate::model::Model;
use crate::rewrite::{nnf, rewrite_to_ltlf_basis};
use crate::sort::{LtlOp, Sort};
use crate::term::{FormulaNode, Term};
use std::collections::HashMap;

/// Encode `phi` against `model` via the LTLf tableau. Returns a new model
/// with the same variables/`INIT`/`TRANS` as `model`, plus tableau state
/// and exactly one invariant property at index 0.
pub fn encode_ltlf(model: &Model, phi: Term) -> Result<Model> {
    let env = model.env().clone();
    tracing::debug!("encoding LTLf tableau");
    let mut out = model.clone();

    let not_phi = env.mk_not(phi)?;
    let basis = rewrite_to_ltlf_basis(&env, not_phi)?;
    let normal = nnf(&env, basis)?;

    let mut builder = Builder {
        env: env.clone(),
        model: &mut out,
        sat_memo: HashMap::new(),
        x_vars: Vec::new(),
    };
    let sat_root = builder.sat(normal)?;
    let x_vars = std::mem::take(&mut builder.x_vars);
    out.add_init(sat_root)?;

    tracing::trace!(strong_obligations = x_vars.len(), "LTLf elementary subformulae done");
    let invariant = if x_vars.is_empty() {
        env.mk_false()
    } else {
        env.mk_or(x_vars)?
    };
    out.add_invar_property(invariant)?;
    Ok(out)
}

struct Builder<'m> {
    env: Environment,
    model: &'m mut Model,
    sat_memo: HashMap<Term, Term>,
    /// Fresh variables introduced for a positive `X` — exactly these feed
    /// the finite-stop invariant; `N`'s witness is deliberately excluded.
    x_vars: Vec<Term>,
}

impl Builder<'_> {
    fn sat(&mut self, t: Term) -> Result<Term> {
        if let Some(r) = self.sat_memo.get(&t) {
            return Ok(*r);
        }
        let result = match &*t {
            FormulaNode::Ltl(LtlOp::X, args) => {
                let sp = self.sat(args[0])?;
                let v = self.fresh_el("EL_X");
                self.x_vars.push(v);
                self.strong_future_trans(v, sp)?;
                v
            }
            FormulaNode::Ltl(LtlOp::N, args) => {
                let sp = self.sat(args[0])?;
                let v = self.fresh_el("EL_N");
                self.strong_future_trans(v, sp)?;
                v
            }
            FormulaNode::Ltl(LtlOp::U, args) => {
                let sa = self.sat(args[0])?;
                let sb = self.sat(args[1])?;
                let v = self.fresh_el("EL_XU");
                self.x_vars.push(v);
                let sa_and_v = self.env.mk_and(vec![sa, v])?;
                let sat_val = self.env.mk_or(vec![sb, sa_and_v])?;
                self.strong_future_trans(v, sat_val)?;
                sat_val
            }
            FormulaNode::Ltl(LtlOp::R, args) => {
                let sa = self.sat(args[0])?;
                let sb = self.sat(args[1])?;
                let v = self.fresh_el("EL_NR");
                let sa_or_v = self.env.mk_or(vec![sa, v])?;
                let sat_val = self.env.mk_and(vec![sb, sa_or_v])?;
                self.strong_future_trans(v, sat_val)?;
                sat_val
            }
            FormulaNode::Ltl(LtlOp::Y, args) => {
                let sp = self.sat(args[0])?;
                let v = self.fresh_el("EL_Y");
                self.past_trans(v, sp)?;
                v
            }
            FormulaNode::Ltl(LtlOp::Z, args) => {
                let sp = self.sat(args[0])?;
                let v = self.fresh_el("EL_Z");
                self.past_trans(v, sp)?;
                v
            }
            FormulaNode::Ltl(LtlOp::S, args) => {
                let sa = self.sat(args[0])?;
                let sb = self.sat(args[1])?;
                let v = self.fresh_el("EL_YS");
                let sa_and_v = self.env.mk_and(vec![sa, v])?;
                let sat_val = self.env.mk_or(vec![sb, sa_and_v])?;
                self.past_trans(v, sat_val)?;
                sat_val
            }
            FormulaNode::Ltl(LtlOp::T, args) => {
                let sa = self.sat(args[0])?;
                let sb = self.sat(args[1])?;
                let v = self.fresh_el("EL_ZT");
                let sa_or_v = self.env.mk_or(vec![sa, v])?;
                let sat_val = self.env.mk_and(vec![sb, sa_or_v])?;
                self.past_trans(v, sat_val)?;
                sat_val
            }
            FormulaNode::Ltl(op, _) => {
                unreachable!("LTLf basis leaves only X/N/U/R/Y/Z/S/T, found {op}")
            }
            FormulaNode::BoolConst(_)
            | FormulaNode::IntConst(_)
            | FormulaNode::RealConst(_)
            | FormulaNode::BvConst { .. }
            | FormulaNode::Symbol(_) => t,
            other => {
                let children = other.children();
                let new_children = children.iter().map(|c| self.sat(*c)).collect::<Result<Vec<_>>>()?;
                crate::rewrite::rebuild(&self.env, other, new_children)?
            }
        };
        self.sat_memo.insert(t, result);
        Ok(result)
    }

    /// `v -> NEXT(child)`: a strong proof obligation that a finite trace
    /// may leave undischarged at its last state.
    fn strong_future_trans(&mut self, v: Term, child: Term) -> Result<()> {
        let next_child = self.model.next(child)?;
        let trans = self.env.mk_implies(v, next_child)?;
        self.model.add_trans(trans)
    }

    /// `NEXT(v) <-> child`: past witnesses are fully determined, finite
    /// traces or not.
    fn past_trans(&mut self, v: Term, child: Term) -> Result<()> {
        let next_v = self.model.next(v)?;
        let trans = self.env.mk_iff(next_v, child)?;
        self.model.add_trans(trans)
    }

    fn fresh_el(&mut self, prefix: &str) -> Term {
        let sym = self.env.fresh_symbol(Sort::Bool, &format!("{prefix}.%d"));
        self.model
            .create_state_var(sym.name.clone(), Sort::Bool)
            .expect("fresh symbol name cannot collide");
        self.env.mk_symbol(sym)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PropertyKind;

    #[test]
    fn unary_x_contributes_to_finite_stop_invariant() {
        let env = Environment::new();
        let mut m = Model::new(env.clone());
        let a = m.create_state_var("a", Sort::Bool).unwrap();
        let at = env.mk_symbol(a);
        let phi = env.mk_ltl_unary(LtlOp::X, at).unwrap();

        let out = encode_ltlf(&m, phi).unwrap();
        let invs: Vec<_> = out.properties_of_kind(PropertyKind::Invar).collect();
        assert_eq!(invs.len(), 1);
        assert!(out.state_vars().len() > m.state_vars().len());
    }

    #[test]
    fn weak_next_does_not_enter_the_invariant() {
        let env = Environment::new();
        let mut m = Model::new(env.clone());
        let a = m.create_state_var("a", Sort::Bool).unwrap();
        let at = env.mk_symbol(a);
        let phi = env.mk_ltl_unary(LtlOp::N, at).unwrap();

        let out = encode_ltlf(&m, phi).unwrap();
        let prop = out.get_property(0).unwrap();
        // With no positive X anywhere the invariant collapses to `false`.
        assert_eq!(prop.formula, env.mk_false());
    }

    #[test]
    fn scenario_s2_shape() {
        // S2: a Bool state var, phi = (G X a) <=> G a.
        let env = Environment::new();
        let mut m = Model::new(env.clone());
        let a = m.create_state_var("a", Sort::Bool).unwrap();
        let at = env.mk_symbol(a);
        let x_a = env.mk_ltl_unary(LtlOp::X, at).unwrap();
        let g_x_a = env.mk_ltl_unary(LtlOp::G, x_a).unwrap();
        let g_a = env.mk_ltl_unary(LtlOp::G, at).unwrap();
        let phi = env.mk_iff(g_x_a, g_a).unwrap();

        let out = encode_ltlf(&m, phi).unwrap();
        assert_eq!(out.properties_of_kind(PropertyKind::Invar).count(), 1);
        // G unfolds via U-negation, contributing EL_XU witnesses; X
        // contributes EL_X witnesses. Both kinds must be present.
        let names: Vec<_> = out.state_vars().iter().map(|s| s.name.clone()).collect();
        assert!(names.iter().any(|n| n.starts_with("EL_X.")));
        assert!(names.iter().any(|n| n.starts_with("EL_XU.")));
    }
}
