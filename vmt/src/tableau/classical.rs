//! Classical (Manna-Pnueli style) LTL tableau encoder (§4.4.1): produces a
//! copy of the input model carrying one liveness property whose falsity
//! witnesses a path satisfying the original formula.

use super::justice::flatten;
use crate::env::Environment;
use crate::error::Result;
use crate::model::Model;
use crate::rewrite::rewrite_to_basis;
use crate::sort::{LtlOp, Sort};
use crate::term::{FormulaNode, Term};
use std::collections::HashMap;

/// Encode `phi` against `model` via the classical tableau. Returns a new
/// model with the same variables/`INIT`/`TRANS` as `model`, plus tableau
/// state and exactly one liveness property at index 0.
pub fn encode_classical(model: &Model, phi: Term) -> Result<Model> {
    let env = model.env().clone();
    tracing::debug!("encoding classical LTL tableau");
    let mut out = model.clone();

    let not_phi = env.mk_not(phi)?;
    let basis = rewrite_to_basis(&env, not_phi)?;

    let mut builder = Builder {
        env: env.clone(),
        model: &mut out,
        sat_memo: HashMap::new(),
        justices: Vec::new(),
    };
    let sat_root = builder.sat(basis)?;
    let justices = std::mem::take(&mut builder.justices);
    out.add_init(sat_root)?;

    tracing::trace!(justices = justices.len(), "classical tableau elementary subformulae done");
    let accept = if justices.is_empty() {
        env.mk_true()
    } else {
        flatten(&mut out, &justices)?
    };
    let not_accept = env.mk_not(accept)?;
    out.add_live_property(not_accept)?;
    Ok(out)
}

struct Builder<'m> {
    env: Environment,
    model: &'m mut Model,
    sat_memo: HashMap<Term, Term>,
    justices: Vec<Term>,
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
                let next_sp = self.model.next(sp)?;
                let trans = self.env.mk_iff(v, next_sp)?;
                self.model.add_trans(trans)?;
                v
            }
            FormulaNode::Ltl(LtlOp::U, args) => {
                let sa = self.sat(args[0])?;
                let sb = self.sat(args[1])?;
                let v = self.fresh_el("EL_XU");
                let sa_and_v = self.env.mk_and(vec![sa, v])?;
                let sat_val = self.env.mk_or(vec![sb, sa_and_v])?;
                let next_sat = self.model.next(sat_val)?;
                let trans = self.env.mk_iff(v, next_sat)?;
                self.model.add_trans(trans)?;
                let not_sat = self.env.mk_not(sat_val)?;
                let justice = self.env.mk_or(vec![not_sat, sb])?;
                self.justices.push(justice);
                sat_val
            }
            FormulaNode::Ltl(LtlOp::Y, args) => {
                let sp = self.sat(args[0])?;
                let v = self.fresh_el("EL_Y");
                let next_v = self.model.next(v)?;
                let trans = self.env.mk_iff(next_v, sp)?;
                self.model.add_trans(trans)?;
                v
            }
            FormulaNode::Ltl(LtlOp::S, args) => {
                let sa = self.sat(args[0])?;
                let sb = self.sat(args[1])?;
                let v = self.fresh_el("EL_YS");
                let sa_and_v = self.env.mk_and(vec![sa, v])?;
                let sat_val = self.env.mk_or(vec![sb, sa_and_v])?;
                let next_v = self.model.next(v)?;
                let trans = self.env.mk_iff(next_v, sat_val)?;
                self.model.add_trans(trans)?;
                sat_val
            }
            FormulaNode::Ltl(op, _) => unreachable!("basis rewrite leaves only X/U/Y/S, found {op}"),
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
    use crate::symbol::symbol;

    #[test]
    fn unary_x_allocates_one_elementary_var() {
        let env = Environment::new();
        let mut m = Model::new(env.clone());
        let a = m.create_state_var("a", Sort::Bool).unwrap();
        let at = env.mk_symbol(a);
        let phi = env.mk_ltl_unary(LtlOp::X, at).unwrap();

        let out = encode_classical(&m, phi).unwrap();
        assert!(out.state_vars().len() > m.state_vars().len());
        assert_eq!(out.properties_of_kind(PropertyKind::Live).count(), 1);
    }

    #[test]
    fn until_emits_a_justice_and_flattens_to_single_accept() {
        let env = Environment::new();
        let mut m = Model::new(env.clone());
        let x = m.create_state_var("x", Sort::Bool).unwrap();
        let z = m.create_state_var("z", Sort::Bool).unwrap();
        let xt = env.mk_symbol(x);
        let zt = env.mk_symbol(z);
        let phi = env.mk_ltl_binary(LtlOp::U, xt, zt).unwrap();

        let out = encode_classical(&m, phi).unwrap();
        let live: Vec<_> = out.properties_of_kind(PropertyKind::Live).collect();
        assert_eq!(live.len(), 1);
    }

    #[test]
    fn scenario_s1_shape() {
        // S1: x,y,z Bool state vars, phi = X(x /\ y) /\ (x U z).
        let env = Environment::new();
        let mut m = Model::new(env.clone());
        let x = m.create_state_var("x", Sort::Bool).unwrap();
        let y = m.create_state_var("y", Sort::Bool).unwrap();
        let z = m.create_state_var("z", Sort::Bool).unwrap();
        let xt = env.mk_symbol(x);
        let yt = env.mk_symbol(y);
        let zt = env.mk_symbol(z);
        let xy = env.mk_and(vec![xt, yt]).unwrap();
        let x_xy = env.mk_ltl_unary(LtlOp::X, xy).unwrap();
        let x_u_z = env.mk_ltl_binary(LtlOp::U, xt, zt).unwrap();
        let phi = env.mk_and(vec![x_xy, x_u_z]).unwrap();

        let out = encode_classical(&m, phi).unwrap();
        // At least two fresh tableau vars: one for X, one for U.
        assert!(out.state_vars().len() >= m.state_vars().len() + 2);
        assert_eq!(out.properties_of_kind(PropertyKind::Live).count(), 1);
        let symbol_names: Vec<_> = out.state_vars().iter().map(|s| s.name.clone()).collect();
        assert!(symbol_names.iter().any(|n| n.starts_with("EL_X.")));
        assert!(symbol_names.iter().any(|n| n.starts_with("EL_XU.")));
    }
}
