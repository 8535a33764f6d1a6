//! Counterexample traces (§3, §6): an ordered sequence of steps a solver's
//! model-checking answer produces, each a total assignment from symbol to
//! constant term, with evaluation support for arbitrary ground formulae.
//! A trace may mark one step as the loopback target so an infinite,
//! ultimately periodic counterexample can be represented finitely.

use crate::env::Environment;
use crate::error::{Result, VmtError};
use crate::model::Model;
use crate::sort::{ArithOp, BvOp, CmpOp, Sort};
use crate::symbol::Symbol;
use crate::term::{FormulaNode, Term};
use std::collections::BTreeMap;

/// One step of a [`Trace`]: a total assignment from symbol to constant term.
#[derive(Debug, Clone, Default)]
pub struct Step {
    assignments: BTreeMap<Symbol, Term>,
}

impl Step {
    pub fn new(assignments: impl IntoIterator<Item = (Symbol, Term)>) -> Self {
        Step {
            assignments: assignments.into_iter().collect(),
        }
    }

    pub fn get(&self, sym: Symbol) -> Option<Term> {
        self.assignments.get(&sym).copied()
    }

    pub fn assignments(&self) -> &BTreeMap<Symbol, Term> {
        &self.assignments
    }

    /// Symbols whose value in `self` differs from their value in `other`
    /// (or is absent from `other` entirely).
    pub fn different_variables(&self, other: &Step) -> Vec<Symbol> {
        self.assignments
            .iter()
            .filter(|(s, v)| other.assignments.get(s) != Some(*v))
            .map(|(s, _)| *s)
            .collect()
    }
}

/// An ordered sequence of [`Step`]s over a fixed set of variables (a
/// model's state variables), optionally marking one step as the loopback
/// target for an infinite trace.
#[derive(Debug, Clone)]
pub struct Trace {
    env: Environment,
    vars: Vec<Symbol>,
    steps: Vec<Step>,
    loopback: Option<usize>,
}

impl Trace {
    pub fn new(env: Environment, vars: Vec<Symbol>) -> Self {
        Trace {
            env,
            vars,
            steps: Vec::new(),
            loopback: None,
        }
    }

    /// Convenience constructor scoping the trace to `model`'s state variables.
    pub fn from_model(model: &Model) -> Self {
        Trace::new(model.env().clone(), model.state_vars().to_vec())
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn vars(&self) -> &[Symbol] {
        &self.vars
    }

    /// Append a step. `assignments` must cover every variable in
    /// [`Self::vars`]; fails with [`VmtError::UndeclaredSymbol`] naming the
    /// first missing one. At most one step may be the loopback target.
    pub fn create_step(
        &mut self,
        assignments: impl IntoIterator<Item = (Symbol, Term)>,
        is_loopback: bool,
    ) -> Result<usize> {
        let step = Step::new(assignments);
        for v in &self.vars {
            if step.get(*v).is_none() {
                return Err(VmtError::UndeclaredSymbol(v.name.clone()));
            }
        }
        if is_loopback {
            if self.loopback.is_some() {
                return Err(VmtError::DuplicateLoopbackStep);
            }
            self.loopback = Some(self.steps.len());
        }
        self.steps.push(step);
        Ok(self.steps.len() - 1)
    }

    pub fn steps_count(&self) -> usize {
        self.steps.len()
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn get_step(&self, idx: usize) -> Result<&Step> {
        self.steps.get(idx).ok_or(VmtError::TraceStepNotFound(idx))
    }

    pub fn has_loopback_step(&self) -> bool {
        self.loopback.is_some()
    }

    pub fn loopback_step_idx(&self) -> Result<usize> {
        self.loopback.ok_or(VmtError::MissingLoopbackStep)
    }

    pub fn loopback_step(&self) -> Result<&Step> {
        let idx = self.loopback_step_idx()?;
        self.get_step(idx)
    }

    /// The step that follows `idx`: `idx + 1`, or the loopback target if
    /// `idx` is the last step of an (ultimately periodic) infinite trace.
    pub fn next_step_idx(&self, idx: usize) -> Result<usize> {
        if idx + 1 < self.steps.len() {
            Ok(idx + 1)
        } else {
            self.loopback_step_idx().map_err(|_| VmtError::NoNextStep)
        }
    }

    /// Variables whose value at `idx` differs from their value at the
    /// following step (per [`Self::next_step_idx`]).
    pub fn changing_variables(&self, idx: usize) -> Result<Vec<Symbol>> {
        let cur = self.get_step(idx)?;
        let next = self.get_step(self.next_step_idx(idx)?)?;
        Ok(cur.different_variables(next))
    }

    /// Variables whose value at `idx` differs from their value at the
    /// preceding step. The first step has no predecessor.
    pub fn changed_variables(&self, idx: usize) -> Result<Vec<Symbol>> {
        if idx == 0 {
            return Err(VmtError::TraceStepNotFound(0));
        }
        let prev = self.get_step(idx - 1)?;
        let cur = self.get_step(idx)?;
        Ok(prev.different_variables(cur))
    }

    /// Evaluate `formula` at step `idx` down to a constant term: plain
    /// symbols read from this step, `NEXT`-wrapped subterms read from the
    /// step that follows (§6).
    pub fn evaluate(&self, idx: usize, formula: Term) -> Result<Term> {
        let step = self.get_step(idx)?;
        Evaluator {
            trace: self,
            step,
            idx,
        }
        .eval(formula)
    }
}

struct Evaluator<'t> {
    trace: &'t Trace,
    step: &'t Step,
    idx: usize,
}

impl Evaluator<'_> {
    fn eval(&self, t: Term) -> Result<Term> {
        let env = &self.trace.env;
        match &*t {
            FormulaNode::BoolConst(_)
            | FormulaNode::IntConst(_)
            | FormulaNode::RealConst(_)
            | FormulaNode::BvConst { .. } => Ok(t),
            FormulaNode::Symbol(s) => self
                .step
                .get(*s)
                .ok_or_else(|| VmtError::UndeclaredSymbol(s.name.clone())),
            FormulaNode::Not(a) => {
                let av = as_bool(env, self.eval(*a)?)?;
                Ok(env.mk_bool(!av))
            }
            FormulaNode::And(args) => {
                let mut acc = true;
                for a in args {
                    acc &= as_bool(env, self.eval(*a)?)?;
                }
                Ok(env.mk_bool(acc))
            }
            FormulaNode::Or(args) => {
                let mut acc = false;
                for a in args {
                    acc |= as_bool(env, self.eval(*a)?)?;
                }
                Ok(env.mk_bool(acc))
            }
            FormulaNode::Implies(a, b) => {
                let av = as_bool(env, self.eval(*a)?)?;
                let bv = as_bool(env, self.eval(*b)?)?;
                Ok(env.mk_bool(!av || bv))
            }
            FormulaNode::Iff(a, b) => {
                let av = self.eval(*a)?;
                let bv = self.eval(*b)?;
                Ok(env.mk_bool(av == bv))
            }
            FormulaNode::Ite(c, th, el) => {
                if as_bool(env, self.eval(*c)?)? {
                    self.eval(*th)
                } else {
                    self.eval(*el)
                }
            }
            FormulaNode::Eq(a, b) => {
                let av = self.eval(*a)?;
                let bv = self.eval(*b)?;
                Ok(env.mk_bool(av == bv))
            }
            FormulaNode::Cmp(op, a, b) => self.eval_cmp(*op, *a, *b),
            FormulaNode::Arith(op, a, b) => self.eval_arith(*op, *a, *b),
            FormulaNode::BvOp(op, args) => self.eval_bvop(*op, args),
            FormulaNode::Next(inner) => {
                let next_idx = self.trace.next_step_idx(self.idx)?;
                let next_step = self.trace.get_step(next_idx)?;
                Evaluator {
                    trace: self.trace,
                    step: next_step,
                    idx: next_idx,
                }
                .eval(*inner)
            }
            FormulaNode::Quantifier(..) => Err(VmtError::ParseError(
                "cannot evaluate a quantified formula over a concrete trace step".into(),
            )),
            FormulaNode::Ltl(..) => Err(VmtError::UnexpectedLtl),
        }
    }

    fn eval_cmp(&self, op: CmpOp, a: Term, b: Term) -> Result<Term> {
        let env = &self.trace.env;
        let av = self.eval(a)?;
        let bv = self.eval(b)?;
        let ordering = match env.sort_of(av) {
            Sort::Int => as_int(env, av)?.cmp(&as_int(env, bv)?),
            Sort::BitVec(_) => as_bv(env, av)?.0.cmp(&as_bv(env, bv)?.0),
            Sort::Real => as_real(env, av)?
                .partial_cmp(&as_real(env, bv)?)
                .unwrap_or(std::cmp::Ordering::Equal),
            other => return Err(VmtError::TypeMismatch { expected: Sort::Int, found: other }),
        };
        use std::cmp::Ordering::*;
        let result = match (op, ordering) {
            (CmpOp::Lt, Less) | (CmpOp::Le, Less | Equal) | (CmpOp::Gt, Greater) | (CmpOp::Ge, Greater | Equal) => true,
            _ => false,
        };
        Ok(env.mk_bool(result))
    }

    fn eval_arith(&self, op: ArithOp, a: Term, b: Term) -> Result<Term> {
        let env = &self.trace.env;
        let av = self.eval(a)?;
        let bv = self.eval(b)?;
        match env.sort_of(av) {
            Sort::Int => {
                let (x, y) = (as_int(env, av)?, as_int(env, bv)?);
                let r = match op {
                    ArithOp::Add => x + y,
                    ArithOp::Sub => x - y,
                    ArithOp::Mul => x * y,
                };
                Ok(env.mk_int(r))
            }
            Sort::Real => {
                let (x, y) = (as_real(env, av)?, as_real(env, bv)?);
                let r = match op {
                    ArithOp::Add => x + y,
                    ArithOp::Sub => x - y,
                    ArithOp::Mul => x * y,
                };
                Ok(env.mk_real(r.to_string()))
            }
            other => Err(VmtError::TypeMismatch { expected: Sort::Int, found: other }),
        }
    }

    fn eval_bvop(&self, op: BvOp, args: &[Term]) -> Result<Term> {
        let env = &self.trace.env;
        let vals: Vec<Term> = args.iter().map(|a| self.eval(*a)).collect::<Result<_>>()?;
        match op {
            BvOp::Concat => {
                let mut value = 0u64;
                let mut width = 0u32;
                for v in &vals {
                    let (x, w) = as_bv(env, *v)?;
                    value = (value << w) | x;
                    width += w;
                }
                Ok(env.mk_bv(mask(value, width), width))
            }
            BvOp::Extract { hi, lo } => {
                let (x, _) = as_bv(env, vals[0])?;
                let width = hi - lo + 1;
                Ok(env.mk_bv(mask(x >> lo, width), width))
            }
            BvOp::Not => {
                let (x, w) = as_bv(env, vals[0])?;
                Ok(env.mk_bv(mask(!x, w), w))
            }
            _ => {
                let (x, w) = as_bv(env, vals[0])?;
                let (y, _) = as_bv(env, vals[1])?;
                let r = match op {
                    BvOp::Add => x.wrapping_add(y),
                    BvOp::Sub => x.wrapping_sub(y),
                    BvOp::And => x & y,
                    BvOp::Or => x | y,
                    BvOp::Xor => x ^ y,
                    BvOp::Shl => x.wrapping_shl(y as u32),
                    BvOp::Lshr => x.wrapping_shr(y as u32),
                    BvOp::Not | BvOp::Concat | BvOp::Extract { .. } => unreachable!("handled above"),
                };
                Ok(env.mk_bv(mask(r, w), w))
            }
        }
    }
}

fn mask(v: u64, width: u32) -> u64 {
    if width >= 64 { v } else { v & ((1u64 << width) - 1) }
}

fn as_bool(env: &Environment, t: Term) -> Result<bool> {
    match &*t {
        FormulaNode::BoolConst(b) => Ok(*b),
        _ => Err(VmtError::TypeMismatch { expected: Sort::Bool, found: env.sort_of(t) }),
    }
}

fn as_int(env: &Environment, t: Term) -> Result<i64> {
    match &*t {
        FormulaNode::IntConst(v) => Ok(*v),
        _ => Err(VmtError::TypeMismatch { expected: Sort::Int, found: env.sort_of(t) }),
    }
}

fn as_real(env: &Environment, t: Term) -> Result<f64> {
    match &*t {
        FormulaNode::RealConst(s) => s
            .parse::<f64>()
            .map_err(|_| VmtError::ParseError(format!("not a real literal: {s}"))),
        _ => Err(VmtError::TypeMismatch { expected: Sort::Real, found: env.sort_of(t) }),
    }
}

fn as_bv(env: &Environment, t: Term) -> Result<(u64, u32)> {
    match &*t {
        FormulaNode::BvConst { value, width } => Ok((*value, *width)),
        _ => Err(VmtError::TypeMismatch { expected: Sort::BitVec(0), found: env.sort_of(t) }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sort::Sort;

    fn example_trace(with_loopback: bool) -> (Model, Trace) {
        let env = Environment::new();
        let mut model = Model::new(env.clone());
        let x = model.create_state_var("x", Sort::Int).unwrap();
        let y = model.create_state_var("y", Sort::Bool).unwrap();
        let mut trace = Trace::from_model(&model);
        trace
            .create_step([(x, env.mk_int(0)), (y, env.mk_bool(true))], false)
            .unwrap();
        trace
            .create_step([(x, env.mk_int(1)), (y, env.mk_bool(false))], with_loopback)
            .unwrap();
        trace
            .create_step([(x, env.mk_int(2)), (y, env.mk_bool(false))], false)
            .unwrap();
        trace
            .create_step([(x, env.mk_int(3)), (y, env.mk_bool(true))], false)
            .unwrap();
        (model, trace)
    }

    #[test]
    fn loopback_step_is_tracked() {
        let (_, trace) = example_trace(true);
        assert!(trace.has_loopback_step());
        assert_eq!(trace.loopback_step_idx().unwrap(), 1);

        let (_, trace) = example_trace(false);
        assert!(!trace.has_loopback_step());
        assert_eq!(trace.loopback_step().unwrap_err(), VmtError::MissingLoopbackStep);
    }

    #[test]
    fn duplicate_loopback_is_rejected() {
        let (model, _) = example_trace(true);
        let mut trace = Trace::from_model(&model);
        let x = model.state_vars()[0];
        let y = model.state_vars()[1];
        let env = model.env();
        trace
            .create_step([(x, env.mk_int(0)), (y, env.mk_bool(true))], true)
            .unwrap();
        assert_eq!(
            trace
                .create_step([(x, env.mk_int(1)), (y, env.mk_bool(false))], true)
                .unwrap_err(),
            VmtError::DuplicateLoopbackStep
        );
    }

    #[test]
    fn changing_and_changed_variables() {
        let (model, trace) = example_trace(true);
        let x = model.state_vars()[0];
        let y = model.state_vars()[1];
        assert_eq!(trace.changing_variables(1).unwrap(), vec![x]);
        let mut changed = trace.changed_variables(1).unwrap();
        changed.sort_by_key(|s| s.name.clone());
        assert_eq!(changed, vec![x, y]);
        assert_eq!(trace.changed_variables(0).unwrap_err(), VmtError::TraceStepNotFound(0));
    }

    #[test]
    fn evaluate_reads_next_step_for_next_wrapped_symbols() {
        let (model, trace) = example_trace(true);
        let env = model.env();
        let x = model.state_vars()[0];
        let y = model.state_vars()[1];
        let xt = env.mk_symbol(x);
        let yt = env.mk_symbol(y);
        let next_x = model.next(xt).unwrap();
        let sum = env.mk_arith(ArithOp::Add, xt, next_x).unwrap();
        assert_eq!(trace.evaluate(1, sum).unwrap(), env.mk_int(3));

        let next_x_eq_1 = env.mk_eq(model.next(xt).unwrap(), env.mk_int(1)).unwrap();
        let conj = env.mk_and(vec![yt, next_x_eq_1]).unwrap();
        assert_eq!(trace.evaluate(3, conj).unwrap(), env.mk_bool(true));
    }

    #[test]
    fn evaluate_next_at_last_step_without_loopback_fails() {
        let (model, trace) = example_trace(false);
        let env = model.env();
        let x = model.state_vars()[0];
        let xt = env.mk_symbol(x);
        let next_x = model.next(xt).unwrap();
        assert_eq!(trace.evaluate(3, next_x).unwrap_err(), VmtError::NoNextStep);
    }

    #[test]
    fn evaluate_undeclared_next_symbol_fails() {
        let (model, trace) = example_trace(true);
        let env = model.env();
        let extra = crate::symbol::symbol("extra", Sort::Bool);
        let extra_t = env.mk_symbol(extra);
        let next_extra = env.mk_next(extra_t).unwrap();
        assert!(trace.evaluate(1, next_extra).is_err());
    }
}
