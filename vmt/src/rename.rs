//! Capture-avoiding symbol renaming (§4.5), plus a strict pattern-matching
//! mode for the common case of renaming by `(old_suffix, new_suffix)`.

use crate::env::Environment;
use crate::error::{Result, VmtError};
use crate::model::Model;
use crate::symbol::{Symbol, symbol};
use crate::term::{FormulaNode, Term, intern};
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};

/// Substitute every free occurrence of a symbol in `mapping`'s keys with its
/// paired value, leaving symbols shadowed by an enclosing quantifier alone.
pub fn substitute(env: &Environment, t: Term, mapping: &HashMap<Symbol, Symbol>) -> Result<Term> {
    Substituter { env, mapping, memo: RefCell::new(HashMap::new()) }.walk(t, &BTreeSet::new())
}

struct Substituter<'a> {
    env: &'a Environment,
    mapping: &'a HashMap<Symbol, Symbol>,
    memo: RefCell<HashMap<(Term, BTreeSet<Symbol>), Term>>,
}

impl Substituter<'_> {
    fn walk(&self, t: Term, shadowed: &BTreeSet<Symbol>) -> Result<Term> {
        let key = (t, shadowed.clone());
        if let Some(r) = self.memo.borrow().get(&key) {
            return Ok(*r);
        }
        let result = match &*t {
            FormulaNode::Symbol(s) => {
                if shadowed.contains(s) {
                    t
                } else if let Some(replacement) = self.mapping.get(s) {
                    intern(FormulaNode::Symbol(*replacement))
                } else {
                    t
                }
            }
            FormulaNode::Quantifier(q, vars, body) => {
                let mut sh = shadowed.clone();
                sh.extend(vars.iter().copied());
                let new_body = self.walk(*body, &sh)?;
                self.env.mk_quantifier(*q, vars.clone(), new_body)?
            }
            FormulaNode::BoolConst(_)
            | FormulaNode::IntConst(_)
            | FormulaNode::RealConst(_)
            | FormulaNode::BvConst { .. } => t,
            other => {
                let new_children = other
                    .children()
                    .iter()
                    .map(|c| self.walk(*c, shadowed))
                    .collect::<Result<Vec<_>>>()?;
                crate::rewrite::rebuild(self.env, other, new_children)?
            }
        };
        self.memo.borrow_mut().insert(key, result);
        Ok(result)
    }
}

/// Rename every variable in `model` per `mapping`, producing a fresh model
/// over the same environment. Declarations and `INIT`/`TRANS`/invariant/
/// property formulas are all rewritten consistently.
pub fn rename_model(model: &Model, mapping: &HashMap<Symbol, Symbol>) -> Result<Model> {
    let env = model.env().clone();
    let mut out = Model::new(env.clone());

    let rename_sym = |s: &Symbol| -> Symbol { *mapping.get(s).unwrap_or(s) };

    for s in model.state_vars() {
        out.add_state_var(rename_sym(s))?;
    }
    for s in model.input_vars() {
        out.add_input_var(rename_sym(s))?;
    }
    for t in model.init() {
        out.add_init(substitute(&env, *t, mapping)?)?;
    }
    for t in model.trans() {
        out.add_trans(substitute(&env, *t, mapping)?)?;
    }
    // `INIT`/`TRANS` above already carry each invariant's renamed conjuncts;
    // just preserve the provenance.
    for t in model.invars() {
        out.record_invar(substitute(&env, *t, mapping)?);
    }
    for p in model.properties() {
        out.add_property_at(p.kind, substitute(&env, p.formula, mapping)?, p.idx)?;
    }
    Ok(out)
}

/// Strict pattern-based renaming: every symbol whose name ends with
/// `old_suffix` is renamed by replacing that suffix with `new_suffix`.
/// Fails with [`VmtError::IncorrectSymbolName`] the first time a symbol's
/// name doesn't match the expected pattern, rather than silently leaving it
/// unrenamed.
pub fn rename_pattern(symbols: &[Symbol], old_suffix: &str, new_suffix: &str) -> Result<HashMap<Symbol, Symbol>> {
    let mut mapping = HashMap::new();
    for s in symbols {
        if !s.name.ends_with(old_suffix) {
            return Err(VmtError::IncorrectSymbolName {
                name: s.name.clone(),
                pattern: old_suffix.to_string(),
            });
        }
        let stem = &s.name[..s.name.len() - old_suffix.len()];
        let new_name = format!("{stem}{new_suffix}");
        mapping.insert(*s, symbol(new_name, s.sort));
    }
    Ok(mapping)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sort::Sort;

    #[test]
    fn substitution_respects_quantifier_shadowing() {
        let env = Environment::new();
        let x = symbol("x", Sort::Bool);
        let x2 = symbol("x2", Sort::Bool);
        let xt = env.mk_symbol(x);
        let body = env.mk_and(vec![xt, xt]).unwrap();
        let q = env.mk_quantifier(crate::sort::Quantifier::Exists, vec![x], body).unwrap();

        let mut mapping = HashMap::new();
        mapping.insert(x, x2);
        let renamed = substitute(&env, q, &mapping).unwrap();
        // `x` is bound inside the quantifier, so the body is unaffected.
        assert_eq!(renamed, q);
    }

    #[test]
    fn substitution_hits_free_occurrences() {
        let env = Environment::new();
        let x = symbol("x", Sort::Bool);
        let x2 = symbol("x2", Sort::Bool);
        let xt = env.mk_symbol(x);
        let mut mapping = HashMap::new();
        mapping.insert(x, x2);
        let renamed = substitute(&env, xt, &mapping).unwrap();
        assert_eq!(renamed, env.mk_symbol(x2));
    }

    #[test]
    fn pattern_rename_requires_matching_suffix() {
        let x = symbol("foo.bar", Sort::Bool);
        let mapping = rename_pattern(&[x], ".bar", ".baz").unwrap();
        assert_eq!(mapping[&x].name, "foo.baz");

        let y = symbol("nomatch", Sort::Bool);
        assert!(rename_pattern(&[y], ".bar", ".baz").is_err());
    }
}
