//! Circuit (monitor-automaton) encoder in the style of Claessen-Sörensson
//! (§4.4.2): labels every LTL/Boolean subformula with an activator variable,
//! then generates one small local machine per label rather than threading a
//! single recursive `sat` relation as [`super::classical`] does.

use super::justice::flatten;
use crate::env::Environment;
use crate::error::Result;
use crate::model::Model;
use crate::rewrite::nnf;
use crate::sort::{LtlOp, Sort};
use crate::term::{FormulaNode, Term};
use std::collections::HashMap;

/// Encode `phi` against `model` via the circuit/monitor tableau. Returns a
/// new model with one liveness property at index 0.
pub fn encode_circuit(model: &Model, phi: Term) -> Result<Model> {
    let env = model.env().clone();
    tracing::debug!("encoding circuit/monitor LTL tableau");
    let mut out = model.clone();

    let not_phi = env.mk_not(phi)?;
    let normal = nnf(&env, not_phi)?;

    let mut labeler = Labeler { env: env.clone(), memo: HashMap::new(), subformulae: Vec::new() };
    let root_label = labeler.label(normal)?;
    let mut subformulae = std::mem::take(&mut labeler.subformulae);
    if subformulae.is_empty() {
        // Degenerate case: no LTL/Boolean structure at all. Synthesise one
        // trivial monitor so the encoding always has at least one.
        let top = env.mk_true();
        let wrapped = env.mk_and(vec![normal, top])?;
        subformulae.push((root_label, wrapped));
    }

    let is_init = env.fresh_symbol(Sort::Bool, "is_init.%d");
    out.add_state_var(is_init)?;
    let is_init_t = env.mk_symbol(is_init);
    out.add_init(is_init_t)?;
    let next_is_init = out.next(is_init_t)?;
    let false_t = env.mk_false();
    let is_init_trans = env.mk_iff(next_is_init, false_t)?;
    out.add_trans(is_init_trans)?;

    let last = subformulae.len() - 1;
    for (activator, _) in subformulae.iter().take(last) {
        if let FormulaNode::Symbol(sym) = &**activator {
            out.add_state_var(*sym)?;
        }
    }

    // The outermost label is replaced by `is_init`: the root monitor fires
    // exactly once, at the start of the trace. `is_init` itself is already
    // declared above, so it must not be re-declared by the loop.
    subformulae[last].0 = is_init_t;

    let monitors = subformulae
        .iter()
        .map(|(activator, subformula)| make_monitor(&env, &mut out, is_init_t, *activator, *subformula));
    let (all_accept, all_failed): (Vec<Term>, Vec<Term>) =
        itertools::process_results(monitors, |it| it.map(|m| (m.accept, m.failed)).unzip())?;

    let has_failed = env.fresh_symbol(Sort::Bool, "has_failed.%d");
    out.add_state_var(has_failed)?;
    let has_failed_t = env.mk_symbol(has_failed);
    let not_has_failed = env.mk_not(has_failed_t)?;
    out.add_init(not_has_failed)?;
    let failed_or = env.mk_or(all_failed)?;
    let sticky_failed = env.mk_or(vec![failed_or, has_failed_t])?;
    let next_has_failed = out.next(has_failed_t)?;
    let has_failed_trans = env.mk_iff(next_has_failed, sticky_failed)?;
    out.add_trans(has_failed_trans)?;

    let justices = all_accept
        .into_iter()
        .map(|a| env.mk_and(vec![a, not_has_failed]))
        .collect::<Result<Vec<_>>>()?;
    let accept = flatten(&mut out, &justices)?;
    let not_accept = env.mk_not(accept)?;
    out.add_live_property(not_accept)?;
    Ok(out)
}

struct Monitor {
    accept: Term,
    failed: Term,
}

/// Generate the local machine for one labelled subformula, per the table
/// in §4.4.2. `is_init` feeds the `Y`/`Z`/`S`/`T` monitors nowhere directly;
/// it only gates the root label, already substituted in by the caller.
fn make_monitor(env: &Environment, model: &mut Model, _is_init: Term, z: Term, subf: Term) -> Result<Monitor> {
    match &*subf {
        FormulaNode::And(_) | FormulaNode::Or(_) => {
            let not_subf = env.mk_not(subf)?;
            let failed = env.mk_and(vec![z, not_subf])?;
            Ok(Monitor { accept: env.mk_true(), failed })
        }
        // Over an infinite trace strong and weak next coincide (there is
        // always a successor state), so `N` gets the identical monitor shape
        // as `X`; NNF can introduce `N` from a nested negated `X`.
        FormulaNode::Ltl(LtlOp::X, args) | FormulaNode::Ltl(LtlOp::N, args) => {
            let a = args[0];
            let yz = fresh_mon_var(env, model, "LTL.X.YZ.%d")?;
            let not_yz = env.mk_not(yz)?;
            model.add_init(not_yz)?;
            let next_yz = model.next(yz)?;
            let trans = env.mk_iff(next_yz, z)?;
            model.add_trans(trans)?;
            let not_a = env.mk_not(a)?;
            let failed = env.mk_and(vec![yz, not_a])?;
            Ok(Monitor { accept: env.mk_true(), failed })
        }
        FormulaNode::Ltl(LtlOp::G, args) => {
            let a = args[0];
            let yp = fresh_mon_var(env, model, "LTL.G.YP.%d")?;
            let not_yp = env.mk_not(yp)?;
            model.add_init(not_yp)?;
            let pending = env.mk_or(vec![yp, z])?;
            let next_yp = model.next(yp)?;
            let trans = env.mk_iff(next_yp, pending)?;
            model.add_trans(trans)?;
            let not_a = env.mk_not(a)?;
            let failed = env.mk_and(vec![pending, not_a])?;
            Ok(Monitor { accept: env.mk_true(), failed })
        }
        FormulaNode::Ltl(LtlOp::F, args) => {
            let a = args[0];
            let yp = fresh_mon_var(env, model, "LTL.F.YP.%d")?;
            let not_yp = env.mk_not(yp)?;
            model.add_init(not_yp)?;
            let z_or_yp = env.mk_or(vec![z, yp])?;
            let not_a = env.mk_not(a)?;
            let pending = env.mk_and(vec![z_or_yp, not_a])?;
            let next_yp = model.next(yp)?;
            let trans = env.mk_iff(next_yp, pending)?;
            model.add_trans(trans)?;
            let accept = env.mk_not(pending)?;
            Ok(Monitor { accept, failed: env.mk_false() })
        }
        FormulaNode::Ltl(LtlOp::U, args) => {
            let (a, b) = (args[0], args[1]);
            let yp = fresh_mon_var(env, model, "LTL.U.YP.%d")?;
            let not_yp = env.mk_not(yp)?;
            model.add_init(not_yp)?;
            let z_or_yp = env.mk_or(vec![z, yp])?;
            let not_b = env.mk_not(b)?;
            let pending = env.mk_and(vec![z_or_yp, not_b])?;
            let next_yp = model.next(yp)?;
            let trans = env.mk_iff(next_yp, pending)?;
            model.add_trans(trans)?;
            let accept = env.mk_not(pending)?;
            let not_a = env.mk_not(a)?;
            let failed = env.mk_and(vec![pending, not_a])?;
            Ok(Monitor { accept, failed })
        }
        FormulaNode::Ltl(LtlOp::R, args) => {
            let (a, b) = (args[0], args[1]);
            let yp = fresh_mon_var(env, model, "LTL.R.YP.%d")?;
            let not_yp = env.mk_not(yp)?;
            model.add_init(not_yp)?;
            let z_or_yp = env.mk_or(vec![z, yp])?;
            let not_a = env.mk_not(a)?;
            let pending = env.mk_and(vec![z_or_yp, not_a])?;
            let next_yp = model.next(yp)?;
            let trans = env.mk_iff(next_yp, pending)?;
            model.add_trans(trans)?;
            let accept = env.mk_not(pending)?;
            let not_b = env.mk_not(b)?;
            let failed = env.mk_and(vec![pending, not_b])?;
            Ok(Monitor { accept, failed })
        }
        FormulaNode::Ltl(LtlOp::Y, args) => {
            let a = args[0];
            let yarg = fresh_mon_var(env, model, "LTL.Y.YARG.%d")?;
            let not_yarg = env.mk_not(yarg)?;
            model.add_init(not_yarg)?;
            let next_yarg = model.next(yarg)?;
            let trans = env.mk_iff(next_yarg, a)?;
            model.add_trans(trans)?;
            let failed = env.mk_and(vec![z, not_yarg])?;
            Ok(Monitor { accept: env.mk_true(), failed })
        }
        FormulaNode::Ltl(LtlOp::Z, args) => {
            let a = args[0];
            let zarg = fresh_mon_var(env, model, "LTL.Z.ZARG.%d")?;
            model.add_init(zarg)?;
            let next_zarg = model.next(zarg)?;
            let trans = env.mk_iff(next_zarg, a)?;
            model.add_trans(trans)?;
            let not_zarg = env.mk_not(zarg)?;
            let failed = env.mk_and(vec![z, not_zarg])?;
            Ok(Monitor { accept: env.mk_true(), failed })
        }
        FormulaNode::Ltl(LtlOp::H, args) => {
            let a = args[0];
            let ynt = fresh_mon_var(env, model, "LTL.H.YNT.%d")?;
            let not_ynt = env.mk_not(ynt)?;
            model.add_init(not_ynt)?;
            let not_a = env.mk_not(a)?;
            let nt = env.mk_or(vec![ynt, not_a])?;
            let next_ynt = model.next(ynt)?;
            let trans = env.mk_iff(next_ynt, nt)?;
            model.add_trans(trans)?;
            let failed = env.mk_and(vec![z, nt])?;
            Ok(Monitor { accept: env.mk_true(), failed })
        }
        FormulaNode::Ltl(LtlOp::O, args) => {
            let a = args[0];
            let yt = fresh_mon_var(env, model, "LTL.O.YT.%d")?;
            let not_yt = env.mk_not(yt)?;
            model.add_init(not_yt)?;
            let t = env.mk_or(vec![yt, a])?;
            let next_yt = model.next(yt)?;
            let trans = env.mk_iff(next_yt, t)?;
            model.add_trans(trans)?;
            let not_t = env.mk_not(t)?;
            let failed = env.mk_and(vec![z, not_t])?;
            Ok(Monitor { accept: env.mk_true(), failed })
        }
        FormulaNode::Ltl(LtlOp::S, args) => {
            let (a, b) = (args[0], args[1]);
            let yt = fresh_mon_var(env, model, "LTL.S.YT.%d")?;
            let not_yt = env.mk_not(yt)?;
            model.add_init(not_yt)?;
            let yt_and_a = env.mk_and(vec![yt, a])?;
            let t = env.mk_or(vec![b, yt_and_a])?;
            let next_yt = model.next(yt)?;
            let trans = env.mk_iff(next_yt, t)?;
            model.add_trans(trans)?;
            let not_t = env.mk_not(t)?;
            let failed = env.mk_and(vec![z, not_t])?;
            Ok(Monitor { accept: env.mk_true(), failed })
        }
        FormulaNode::Ltl(LtlOp::T, args) => {
            let (a, b) = (args[0], args[1]);
            let ynt = fresh_mon_var(env, model, "LTL.T.YNT.%d")?;
            let not_ynt = env.mk_not(ynt)?;
            model.add_init(not_ynt)?;
            let not_a = env.mk_not(a)?;
            let not_b = env.mk_not(b)?;
            let ynt_and_not_a = env.mk_and(vec![ynt, not_a])?;
            let nt = env.mk_or(vec![not_b, ynt_and_not_a])?;
            let next_ynt = model.next(ynt)?;
            let trans = env.mk_iff(next_ynt, nt)?;
            model.add_trans(trans)?;
            let failed = env.mk_and(vec![z, nt])?;
            Ok(Monitor { accept: env.mk_true(), failed })
        }
        other => unreachable!("labeler only labels LTL/And/Or nodes, found {other}"),
    }
}

fn fresh_mon_var(env: &Environment, model: &mut Model, template: &str) -> Result<Term> {
    let sym = env.fresh_symbol(Sort::Bool, template);
    model.add_state_var(sym)?;
    Ok(env.mk_symbol(sym))
}

struct Labeler {
    env: Environment,
    memo: HashMap<Term, Term>,
    subformulae: Vec<(Term, Term)>,
}

impl Labeler {
    /// Returns the activator for `t`: a fresh label if `t` is LTL/And/Or,
    /// or `t` itself at the leaves. Children are labelled first, so a
    /// recorded `(z, subf)` pair has `subf` already rebuilt over child
    /// labels, matching the table in §4.4.2.
    fn label(&mut self, t: Term) -> Result<Term> {
        if let Some(r) = self.memo.get(&t) {
            return Ok(*r);
        }
        let result = match &*t {
            FormulaNode::And(args) => {
                let labelled = args.iter().map(|a| self.label(*a)).collect::<Result<Vec<_>>>()?;
                let rebuilt = self.env.mk_and(labelled)?;
                self.store(rebuilt)?
            }
            FormulaNode::Or(args) => {
                let labelled = args.iter().map(|a| self.label(*a)).collect::<Result<Vec<_>>>()?;
                let rebuilt = self.env.mk_or(labelled)?;
                self.store(rebuilt)?
            }
            FormulaNode::Ltl(op, args) => {
                let labelled = args.iter().map(|a| self.label(*a)).collect::<Result<Vec<_>>>()?;
                let rebuilt = if labelled.len() == 1 {
                    self.env.mk_ltl_unary(*op, labelled[0])?
                } else {
                    self.env.mk_ltl_binary(*op, labelled[0], labelled[1])?
                };
                self.store(rebuilt)?
            }
            _ => t,
        };
        self.memo.insert(t, result);
        Ok(result)
    }

    fn store(&mut self, rebuilt: Term) -> Result<Term> {
        let z = self.env.fresh_symbol(Sort::Bool, "LTL.Z.%d");
        let z_t = self.env.mk_symbol(z);
        self.subformulae.push((z_t, rebuilt));
        Ok(z_t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PropertyKind;

    #[test]
    fn unary_x_shapes_one_monitor() {
        let env = Environment::new();
        let mut m = Model::new(env.clone());
        let a = m.create_state_var("a", Sort::Bool).unwrap();
        let at = env.mk_symbol(a);
        let phi = env.mk_ltl_unary(LtlOp::X, at).unwrap();

        let out = encode_circuit(&m, phi).unwrap();
        assert_eq!(out.properties_of_kind(PropertyKind::Live).count(), 1);
        let names: Vec<_> = out.state_vars().iter().map(|s| s.name.clone()).collect();
        assert!(names.iter().any(|n| n.starts_with("is_init.")));
        assert!(names.iter().any(|n| n.starts_with("has_failed.")));
        assert!(names.iter().any(|n| n.starts_with("LTL.X.YZ.")));
    }

    #[test]
    fn conjunction_only_fails_never_pends() {
        let env = Environment::new();
        let mut m = Model::new(env.clone());
        let a = m.create_state_var("a", Sort::Bool).unwrap();
        let b = m.create_state_var("b", Sort::Bool).unwrap();
        let at = env.mk_symbol(a);
        let bt = env.mk_symbol(b);
        let phi = env.mk_and(vec![at, bt]).unwrap();

        let out = encode_circuit(&m, phi).unwrap();
        assert_eq!(out.properties_of_kind(PropertyKind::Live).count(), 1);
    }

    #[test]
    fn degenerate_atomic_formula_still_gets_one_monitor() {
        let env = Environment::new();
        let mut m = Model::new(env.clone());
        let a = m.create_state_var("a", Sort::Bool).unwrap();
        let phi = env.mk_symbol(a);

        let out = encode_circuit(&m, phi).unwrap();
        assert_eq!(out.properties_of_kind(PropertyKind::Live).count(), 1);
        assert!(out.state_vars().len() > m.state_vars().len());
    }
}
