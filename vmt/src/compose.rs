//! Model composition (§4.5): merges two models sharing an [`Environment`]
//! into one whose variables, `INIT`/`TRANS` and properties are the union of
//! both inputs.

use crate::error::{Result, VmtError};
use crate::model::Model;

/// Compose `a` and `b` into a single model.
///
/// - Both models must share the same [`crate::env::Environment`].
/// - State variables are unioned.
/// - Input variables are unioned, then any symbol that is a state variable
///   in the union is dropped from the input set (an input in one model that
///   is a state variable in the other is a state variable in the result).
/// - `INIT`/`TRANS`/invariant conjuncts are concatenated, `a`'s first.
/// - Properties are concatenated; a property index present in both inputs
///   is a conflict, not a silent overwrite.
pub fn compose(a: &Model, b: &Model) -> Result<Model> {
    if a.env() != b.env() {
        return Err(VmtError::MismatchedEnvironment);
    }
    let mut out = Model::new(a.env().clone());

    for s in a.state_vars().iter().chain(b.state_vars()) {
        if !out.state_vars().contains(s) {
            out.add_state_var(*s)?;
        }
    }
    for s in a.input_vars().iter().chain(b.input_vars()) {
        if !out.state_vars().contains(s) && !out.input_vars().contains(s) {
            out.add_input_var(*s)?;
        }
    }

    for t in a.init().iter().chain(b.init()) {
        out.add_init(*t)?;
    }
    for t in a.trans().iter().chain(b.trans()) {
        out.add_trans(*t)?;
    }
    // `INIT`/`TRANS` above already carry each invariant's conjuncts (added
    // eagerly by `add_invar` on `a`/`b`); just preserve the provenance.
    for t in a.invars().iter().chain(b.invars()) {
        out.record_invar(*t);
    }

    for p in a.properties().iter().chain(b.properties()) {
        out.add_property_at(p.kind, p.formula, p.idx)?;
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Environment;
    use crate::sort::Sort;

    #[test]
    fn disjoint_models_union_cleanly() {
        let env = Environment::new();
        let mut a = Model::new(env.clone());
        a.create_state_var("x", Sort::Bool).unwrap();
        let mut b = Model::new(env.clone());
        b.create_state_var("y", Sort::Bool).unwrap();

        let c = compose(&a, &b).unwrap();
        assert_eq!(c.state_vars().len(), 2);
    }

    #[test]
    fn input_absorbed_by_state_across_models() {
        let env = Environment::new();
        let mut a = Model::new(env.clone());
        a.create_input_var("x", Sort::Bool).unwrap();
        let mut b = Model::new(env.clone());
        b.create_state_var("x", Sort::Bool).unwrap();

        let c = compose(&a, &b).unwrap();
        assert_eq!(c.state_vars().len(), 1);
        assert!(c.input_vars().is_empty());
    }

    #[test]
    fn mismatched_environment_is_rejected() {
        let env_a = Environment::new();
        let env_b = Environment::new();
        let a = Model::new(env_a);
        let b = Model::new(env_b);
        assert_eq!(compose(&a, &b).unwrap_err(), VmtError::MismatchedEnvironment);
    }

    #[test]
    fn conflicting_property_index_is_rejected() {
        let env = Environment::new();
        let mut a = Model::new(env.clone());
        let x = a.create_state_var("x", Sort::Bool).unwrap();
        let xt = env.mk_symbol(x);
        a.add_property_at(crate::model::PropertyKind::Invar, xt, 0).unwrap();

        let mut b = Model::new(env.clone());
        let y = b.create_state_var("y", Sort::Bool).unwrap();
        let yt = env.mk_symbol(y);
        b.add_property_at(crate::model::PropertyKind::Invar, yt, 0).unwrap();

        assert!(compose(&a, &b).is_err());
    }
}
