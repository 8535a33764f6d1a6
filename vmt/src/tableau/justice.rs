//! Shared justice-flattening (§4.4.5): turns a set of fairness constraints
//! into a single Boolean `accept` signal that holds infinitely often iff
//! every justice is discharged infinitely often.
//!
//! Always flattens, even for a single justice (§9): one fewer special case,
//! and the shape of the emitted `TRANS`/`INIT` is identical regardless of
//! how many justices came in.

use crate::error::Result;
use crate::model::Model;
use crate::sort::Sort;
use crate::term::Term;

/// Allocate one state var per justice, wire up `INIT`/`TRANS` per §4.4.5,
/// and return the `accept` term (`⋀ s_i`).
pub fn flatten(model: &mut Model, justices: &[Term]) -> Result<Term> {
    let env = model.env().clone();
    tracing::debug!(count = justices.len(), "flattening justice set");

    let s_vars: Vec<Term> = justices
        .iter()
        .enumerate()
        .map(|(i, _)| {
            let sym = env.fresh_symbol(Sort::Bool, &format!("JUSTICE{i}.%d"));
            model.create_state_var(sym.name.clone(), Sort::Bool)?;
            Ok(env.mk_symbol(sym))
        })
        .collect::<Result<_>>()?;

    let accept = if s_vars.len() == 1 {
        s_vars[0]
    } else {
        env.mk_and(s_vars.clone())?
    };

    for (s_i, j_i) in s_vars.iter().zip(justices.iter()) {
        let not_s_i = env.mk_not(*s_i)?;
        model.add_init(not_s_i)?;

        let j_or_s = env.mk_or(vec![*j_i, *s_i])?;
        let rhs = env.mk_ite(accept, *j_i, j_or_s)?;
        let next_s_i = model.next(*s_i)?;
        let trans = env.mk_iff(next_s_i, rhs)?;
        model.add_trans(trans)?;
    }

    Ok(accept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Environment;

    #[test]
    fn single_justice_still_flattens() {
        let env = Environment::new();
        let mut m = Model::new(env.clone());
        let a = m.create_state_var("a", Sort::Bool).unwrap();
        let at = env.mk_symbol(a);
        let accept = flatten(&mut m, &[at]).unwrap();
        assert_eq!(m.state_vars().len(), 2); // a, plus one JUSTICE var
        assert_eq!(m.trans().len(), 1);
        assert_eq!(m.init().len(), 1);
        // accept is the lone s_i, a fresh symbol distinct from `a`.
        assert_ne!(accept, at);
    }

    #[test]
    fn multiple_justices_conjoin_into_accept() {
        let env = Environment::new();
        let mut m = Model::new(env.clone());
        let a = m.create_state_var("a", Sort::Bool).unwrap();
        let b = m.create_state_var("b", Sort::Bool).unwrap();
        let at = env.mk_symbol(a);
        let bt = env.mk_symbol(b);
        let accept = flatten(&mut m, &[at, bt]).unwrap();
        assert!(matches!(&*accept, crate::term::FormulaNode::And(args) if args.len() == 2));
        assert_eq!(m.trans().len(), 2);
    }
}
