//! The transition-model container (C5): state/input variables, the
//! `INIT`/`TRANS` relations, and the property list, each gated at insertion
//! time so a `Model` is always well-formed by construction.

use crate::env::Environment;
use crate::error::{Result, VmtError};
use crate::sort::Sort;
use crate::symbol::Symbol;
use crate::term::Term;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// The kind of proof obligation a [`Property`] states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyKind {
    /// An invariant over `M`'s own variables (holds in every reachable state).
    Invar,
    /// A liveness/justice obligation over `M`'s own variables.
    Live,
    /// A raw LTL formula, not yet tableau-encoded.
    Ltl,
    /// A raw LTLf (finite-trace) formula, not yet tableau-encoded.
    Ltlf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub idx: u32,
    pub kind: PropertyKind,
    pub formula: Term,
}

/// A symbolic transition system: declared variables, `INIT`/`TRANS`
/// constraints (each a list of conjuncts, never collapsed into one `Term`
/// so callers can append without rebuilding a giant `And`), and properties.
#[derive(Clone)]
pub struct Model {
    env: Environment,
    state_vars: Vec<Symbol>,
    input_vars: Vec<Symbol>,
    init: Vec<Term>,
    trans: Vec<Term>,
    invars: Vec<Term>,
    properties: Vec<Property>,
    next_property_idx: u32,
}

impl Model {
    pub fn new(env: Environment) -> Self {
        Model {
            env,
            state_vars: Vec::new(),
            input_vars: Vec::new(),
            init: Vec::new(),
            trans: Vec::new(),
            invars: Vec::new(),
            properties: Vec::new(),
            next_property_idx: 0,
        }
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn state_vars(&self) -> &[Symbol] {
        &self.state_vars
    }

    pub fn input_vars(&self) -> &[Symbol] {
        &self.input_vars
    }

    pub fn init(&self) -> &[Term] {
        &self.init
    }

    pub fn trans(&self) -> &[Term] {
        &self.trans
    }

    pub fn invars(&self) -> &[Term] {
        &self.invars
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn properties_of_kind(&self, kind: PropertyKind) -> impl Iterator<Item = &Property> {
        self.properties.iter().filter(move |p| p.kind == kind)
    }

    pub fn get_property(&self, idx: u32) -> Result<&Property> {
        self.properties
            .iter()
            .find(|p| p.idx == idx)
            .ok_or(VmtError::PropertyNotFound(idx))
    }

    fn is_declared(&self, name: &str) -> bool {
        self.state_vars.iter().any(|s| s.name == name)
            || self.input_vars.iter().any(|s| s.name == name)
    }

    fn check_not_duplicate(&self, sym: Symbol) -> Result<()> {
        if self.is_declared(&sym.name) {
            return Err(VmtError::DuplicateDeclaration(sym.name.clone()));
        }
        Ok(())
    }

    fn check_all_declared(&self, t: Term) -> Result<()> {
        let free: std::rc::Rc<BTreeSet<Symbol>> = self.env.free_vars(t);
        for s in free.iter() {
            if !self.is_declared(&s.name) {
                return Err(VmtError::UndeclaredSymbol(s.name.clone()));
            }
        }
        Ok(())
    }

    fn check_bool(&self, t: Term) -> Result<()> {
        let s = self.env.sort_of(t);
        if s != Sort::Bool {
            return Err(VmtError::TypeMismatch { expected: Sort::Bool, found: s });
        }
        Ok(())
    }

    // ---- variable declaration ----

    pub fn add_state_var(&mut self, sym: Symbol) -> Result<()> {
        self.check_not_duplicate(sym)?;
        self.state_vars.push(sym);
        Ok(())
    }

    pub fn add_input_var(&mut self, sym: Symbol) -> Result<()> {
        self.check_not_duplicate(sym)?;
        self.input_vars.push(sym);
        Ok(())
    }

    /// Allocate a fresh state variable and declare it in one step.
    pub fn create_state_var(&mut self, name: impl Into<String>, sort: Sort) -> Result<Symbol> {
        let sym = crate::symbol::symbol(name, sort);
        self.add_state_var(sym)?;
        Ok(sym)
    }

    pub fn create_input_var(&mut self, name: impl Into<String>, sort: Sort) -> Result<Symbol> {
        let sym = crate::symbol::symbol(name, sort);
        self.add_input_var(sym)?;
        Ok(sym)
    }

    /// A frozen variable is an ordinary state variable with an added
    /// `TRANS` constraint pinning it to its own `NEXT`: once initialized it
    /// never changes across a trace.
    pub fn create_frozen_var(&mut self, name: impl Into<String>, sort: Sort) -> Result<Symbol> {
        let sym = self.create_state_var(name, sort)?;
        let t = self.env.mk_symbol(sym);
        let next_t = self.next(t)?;
        let eq = self.env.mk_equals_or_iff(t, next_t)?;
        self.add_trans(eq)?;
        Ok(sym)
    }

    // ---- constraints ----

    /// `INIT` and `TRANS` may not mention LTL; `INIT` additionally may not
    /// mention `NEXT` (there is no "next" state before the first one).
    pub fn add_init(&mut self, t: Term) -> Result<()> {
        self.check_bool(t)?;
        self.check_all_declared(t)?;
        if self.env.has_next(t) {
            return Err(VmtError::UnexpectedNext);
        }
        if self.env.has_ltl(t) {
            return Err(VmtError::UnexpectedLtl);
        }
        self.init.push(t);
        Ok(())
    }

    pub fn add_trans(&mut self, t: Term) -> Result<()> {
        self.check_bool(t)?;
        self.check_all_declared(t)?;
        if self.env.has_ltl(t) {
            return Err(VmtError::UnexpectedLtl);
        }
        self.trans.push(t);
        Ok(())
    }

    /// An invariant holds in every state, including the initial one — it is
    /// shorthand for conjoining the same constraint to both `INIT` and every
    /// step of `TRANS` (via its primed copy), without requiring the caller
    /// to push `NEXT` themselves.
    pub fn add_invar(&mut self, t: Term) -> Result<()> {
        let next_t = self.next(t)?;
        self.add_init(t)?;
        self.add_trans(t)?;
        self.add_trans(next_t)?;
        self.invars.push(t);
        Ok(())
    }

    /// Record `t` as an invariant without re-adding its `INIT`/`TRANS`
    /// conjuncts — for callers that already copy a source model's `INIT`
    /// and `TRANS` lists verbatim (composition, renaming) and only need to
    /// preserve the provenance `invars()` exposes.
    pub(crate) fn record_invar(&mut self, t: Term) {
        self.invars.push(t);
    }

    /// Wrap `t` in `NEXT`, checking that every free symbol in `t` is
    /// declared in this model before doing so.
    pub fn next(&self, t: Term) -> Result<Term> {
        self.check_all_declared(t)?;
        self.env.mk_next(t)
    }

    // ---- properties ----

    fn add_property(&mut self, kind: PropertyKind, t: Term, idx: Option<u32>) -> Result<u32> {
        self.check_bool(t)?;
        self.check_all_declared(t)?;
        match kind {
            PropertyKind::Invar | PropertyKind::Live => {
                if self.env.has_ltl(t) {
                    return Err(VmtError::UnexpectedLtl);
                }
            }
            PropertyKind::Ltl | PropertyKind::Ltlf => {}
        }
        let idx = match idx {
            Some(i) => {
                if self.properties.iter().any(|p| p.idx == i) {
                    return Err(VmtError::DuplicatePropertyIdx(i));
                }
                i
            }
            None => self.next_property_idx,
        };
        self.next_property_idx = self.next_property_idx.max(idx + 1);
        self.properties.push(Property { idx, kind, formula: t });
        Ok(idx)
    }

    pub fn add_invar_property(&mut self, t: Term) -> Result<u32> {
        self.add_property(PropertyKind::Invar, t, None)
    }

    pub fn add_live_property(&mut self, t: Term) -> Result<u32> {
        self.add_property(PropertyKind::Live, t, None)
    }

    pub fn add_ltl_property(&mut self, t: Term) -> Result<u32> {
        self.add_property(PropertyKind::Ltl, t, None)
    }

    pub fn add_ltlf_property(&mut self, t: Term) -> Result<u32> {
        self.add_property(PropertyKind::Ltlf, t, None)
    }

    /// Insert a property at an explicit index, as composition does when
    /// merging two models' property lists.
    pub fn add_property_at(&mut self, kind: PropertyKind, t: Term, idx: u32) -> Result<u32> {
        self.add_property(kind, t, Some(idx))
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "; state vars")?;
        for s in &self.state_vars {
            writeln!(f, "(declare-fun {} () {})", s.name, s.sort)?;
        }
        writeln!(f, "; input vars")?;
        for s in &self.input_vars {
            writeln!(f, "(declare-fun {} () {})", s.name, s.sort)?;
        }
        writeln!(f, "; init")?;
        for t in &self.init {
            writeln!(f, "{t}")?;
        }
        writeln!(f, "; invar")?;
        for t in &self.invars {
            writeln!(f, "{t}")?;
        }
        writeln!(f, "; trans")?;
        for t in &self.trans {
            writeln!(f, "{t}")?;
        }
        writeln!(f, "; properties")?;
        for p in &self.properties {
            writeln!(f, "; [{}] {:?}: {}", p.idx, p.kind, p.formula)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::symbol;

    #[test]
    fn duplicate_state_var_is_rejected() {
        let env = Environment::new();
        let mut m = Model::new(env);
        m.create_state_var("x", Sort::Bool).unwrap();
        assert_eq!(
            m.create_state_var("x", Sort::Bool).unwrap_err(),
            VmtError::DuplicateDeclaration("x".into())
        );
    }

    #[test]
    fn undeclared_symbol_in_trans_is_rejected() {
        let env = Environment::new();
        let mut m = Model::new(env.clone());
        let stray = env.mk_symbol(symbol("y", Sort::Bool));
        assert!(m.add_trans(stray).is_err());
    }

    #[test]
    fn next_in_init_is_rejected() {
        let env = Environment::new();
        let mut m = Model::new(env.clone());
        let x = m.create_state_var("x", Sort::Bool).unwrap();
        let xt = env.mk_symbol(x);
        let nx = env.mk_next(xt).unwrap();
        assert_eq!(m.add_init(nx).unwrap_err(), VmtError::UnexpectedNext);
    }

    #[test]
    fn ltl_in_trans_is_rejected() {
        let env = Environment::new();
        let mut m = Model::new(env.clone());
        let x = m.create_state_var("x", Sort::Bool).unwrap();
        let xt = env.mk_symbol(x);
        let gx = env.mk_ltl_unary(crate::sort::LtlOp::G, xt).unwrap();
        assert_eq!(m.add_trans(gx).unwrap_err(), VmtError::UnexpectedLtl);
    }

    #[test]
    fn add_invar_injects_init_and_both_trans_forms() {
        let env = Environment::new();
        let mut m = Model::new(env.clone());
        let x = m.create_state_var("x", Sort::Bool).unwrap();
        let xt = env.mk_symbol(x);
        m.add_invar(xt).unwrap();
        assert_eq!(m.init(), &[xt]);
        let next_x = m.next(xt).unwrap();
        assert_eq!(m.trans(), &[xt, next_x]);
        assert_eq!(m.invars(), &[xt]);
    }

    #[test]
    fn duplicate_property_index_is_rejected() {
        let env = Environment::new();
        let mut m = Model::new(env.clone());
        let x = m.create_state_var("x", Sort::Bool).unwrap();
        let xt = env.mk_symbol(x);
        m.add_property_at(PropertyKind::Invar, xt, 0).unwrap();
        assert_eq!(
            m.add_property_at(PropertyKind::Invar, xt, 0).unwrap_err(),
            VmtError::DuplicatePropertyIdx(0)
        );
    }
}
