//! VMT-LIB serialization (§4.7, §6): emit a [`Model`] as the
//! `declare-fun`/`define-fun` s-expression dialect [`super::read`] parses
//! back. `NEXT` never reaches the printer — every `TRANS`/property formula
//! is pushed to leaves and has its `NEXT(symbol)` leaves rewritten to the
//! symbol's dedicated next-state partner before being written out.

use crate::env::Environment;
use crate::error::{Result, VmtError};
use crate::model::{Model, PropertyKind};
use crate::next_push::push_next;
use crate::sort::{ArithOp, BvOp, CmpOp, Quantifier};
use crate::symbol::{Symbol, symbol};
use crate::term::{FormulaNode, Term};
use std::collections::HashMap;
use std::fmt::Write as _;

/// Serialize `model` to a VMT-LIB script.
///
/// Inputs are declared first, then each state variable alongside its
/// next-state partner symbol and the `:next`-annotated `define-fun` linking
/// them, then the conjoined `INIT`/`TRANS` formulas, then one
/// `define-fun` per property, in per-kind declaration order (`invar0`,
/// `invar1`, ..., `live0`, ...) — independent of the property's own index,
/// which becomes the annotation's value.
pub fn serialize(model: &Model) -> Result<String> {
    let env = model.env();
    let mut out = String::new();

    for s in model.input_vars() {
        writeln!(out, "(declare-fun {} () {})", s.name, s.sort)?;
    }

    let mut partner_of: HashMap<Symbol, Symbol> = HashMap::new();
    for (k, s) in model.state_vars().iter().enumerate() {
        writeln!(out, "(declare-fun {} () {})", s.name, s.sort)?;
        let partner = symbol(format!("{}.__next{k}", s.name), s.sort);
        writeln!(out, "(declare-fun {} () {})", partner.name, partner.sort)?;
        writeln!(
            out,
            "(define-fun next{k} () {} (! {} :next {}))",
            s.sort, s.name, partner.name
        )?;
        partner_of.insert(*s, partner);
    }

    if let Some(init) = conjoin(env, model.init())? {
        let init = prepare(env, &partner_of, init)?;
        writeln!(
            out,
            "(define-fun init0 () Bool (! {} :init true))",
            write_term(init)?
        )?;
    }
    if let Some(trans) = conjoin(env, model.trans())? {
        let trans = prepare(env, &partner_of, trans)?;
        writeln!(
            out,
            "(define-fun trans0 () Bool (! {} :trans true))",
            write_term(trans)?
        )?;
    }

    let mut counters: HashMap<PropertyKind, u32> = HashMap::new();
    for p in model.properties() {
        let n = counters.entry(p.kind).or_insert(0);
        let name = format!("{}{n}", property_stem(p.kind));
        *n += 1;
        let formula = prepare(env, &partner_of, p.formula)?;
        writeln!(
            out,
            "(define-fun {name} () Bool (! {} {} {}))",
            write_term(formula)?,
            property_annotation(p.kind),
            p.idx
        )?;
    }

    writeln!(out, "(assert true)")?;
    Ok(out)
}

fn conjoin(env: &Environment, terms: &[Term]) -> Result<Option<Term>> {
    match terms.len() {
        0 => Ok(None),
        1 => Ok(Some(terms[0])),
        _ => Ok(Some(env.mk_and(terms.to_vec())?)),
    }
}

fn property_stem(kind: PropertyKind) -> &'static str {
    match kind {
        PropertyKind::Invar => "invar",
        PropertyKind::Live => "live",
        PropertyKind::Ltl => "ltl",
        PropertyKind::Ltlf => "ltlf",
    }
}

fn property_annotation(kind: PropertyKind) -> &'static str {
    match kind {
        PropertyKind::Invar => ":invar-property",
        PropertyKind::Live => ":live-property",
        PropertyKind::Ltl => ":ltl-property",
        PropertyKind::Ltlf => ":ltlf-property",
    }
}

/// Push `t`'s `NEXT`s to leaves and rewrite each `NEXT(symbol)` leaf to its
/// dedicated partner symbol, so the result is printable without `NEXT`.
fn prepare(env: &Environment, partner_of: &HashMap<Symbol, Symbol>, t: Term) -> Result<Term> {
    let pushed = push_next(env, t)?;
    replace_next_leaves(env, partner_of, pushed)
}

fn replace_next_leaves(env: &Environment, partner_of: &HashMap<Symbol, Symbol>, t: Term) -> Result<Term> {
    match &*t {
        FormulaNode::Next(inner) => match &**inner {
            FormulaNode::Symbol(s) => {
                let partner = partner_of
                    .get(s)
                    .copied()
                    .ok_or_else(|| VmtError::UndeclaredSymbol(s.name.clone()))?;
                Ok(env.mk_symbol(partner))
            }
            _ => Err(VmtError::UnexpectedNext),
        },
        FormulaNode::BoolConst(_)
        | FormulaNode::IntConst(_)
        | FormulaNode::RealConst(_)
        | FormulaNode::BvConst { .. }
        | FormulaNode::Symbol(_) => Ok(t),
        other => {
            let children = other
                .children()
                .iter()
                .map(|c| replace_next_leaves(env, partner_of, *c))
                .collect::<Result<Vec<_>>>()?;
            crate::rewrite::rebuild(env, other, children)
        }
    }
}

/// Render `t` as a VMT-LIB-dialect prefix s-expression. `t` must not contain
/// `NEXT` — callers route `TRANS`/property formulas through [`prepare`]
/// first.
fn write_term(t: Term) -> Result<String> {
    Ok(match &*t {
        FormulaNode::BoolConst(b) => b.to_string(),
        FormulaNode::IntConst(v) => v.to_string(),
        FormulaNode::RealConst(s) => s.clone(),
        FormulaNode::BvConst { value, width } => format!("(_ bv{value} {width})"),
        FormulaNode::Symbol(s) => s.name.clone(),
        FormulaNode::Not(a) => format!("(not {})", write_term(*a)?),
        FormulaNode::And(args) => format!("(and {})", write_args(args)?),
        FormulaNode::Or(args) => format!("(or {})", write_args(args)?),
        FormulaNode::Implies(a, b) => format!("(=> {} {})", write_term(*a)?, write_term(*b)?),
        FormulaNode::Iff(a, b) | FormulaNode::Eq(a, b) => {
            format!("(= {} {})", write_term(*a)?, write_term(*b)?)
        }
        FormulaNode::Ite(c, th, el) => {
            format!("(ite {} {} {})", write_term(*c)?, write_term(*th)?, write_term(*el)?)
        }
        FormulaNode::Cmp(op, a, b) => format!("({} {} {})", cmp_symbol(*op), write_term(*a)?, write_term(*b)?),
        FormulaNode::Arith(op, a, b) => {
            format!("({} {} {})", arith_symbol(*op), write_term(*a)?, write_term(*b)?)
        }
        FormulaNode::BvOp(op, args) => write_bvop(*op, args)?,
        FormulaNode::Quantifier(q, vars, body) => {
            let binder = match q {
                Quantifier::Forall => "forall",
                Quantifier::Exists => "exists",
            };
            let bindings = vars
                .iter()
                .map(|v| format!("({} {})", v.name, v.sort))
                .collect::<Vec<_>>()
                .join(" ");
            format!("({binder} ({bindings}) {})", write_term(*body)?)
        }
        FormulaNode::Next(_) => return Err(VmtError::UnexpectedNext),
        FormulaNode::Ltl(op, args) => format!("(ltl.{} {})", op.symbol(), write_args(args)?),
    })
}

fn write_args(args: &[Term]) -> Result<String> {
    Ok(args
        .iter()
        .map(|a| write_term(*a))
        .collect::<Result<Vec<_>>>()?
        .join(" "))
}

fn cmp_symbol(op: CmpOp) -> &'static str {
    match op {
        CmpOp::Lt => "<",
        CmpOp::Le => "<=",
        CmpOp::Gt => ">",
        CmpOp::Ge => ">=",
    }
}

fn arith_symbol(op: ArithOp) -> &'static str {
    match op {
        ArithOp::Add => "+",
        ArithOp::Sub => "-",
        ArithOp::Mul => "*",
    }
}

fn write_bvop(op: BvOp, args: &[Term]) -> Result<String> {
    match op {
        BvOp::Extract { hi, lo } => Ok(format!("((_ extract {hi} {lo}) {})", write_term(args[0])?)),
        BvOp::Concat => Ok(format!("(concat {})", write_args(args)?)),
        _ => {
            let name = match op {
                BvOp::Add => "bvadd",
                BvOp::Sub => "bvsub",
                BvOp::And => "bvand",
                BvOp::Or => "bvor",
                BvOp::Xor => "bvxor",
                BvOp::Not => "bvnot",
                BvOp::Shl => "bvshl",
                BvOp::Lshr => "bvlshr",
                BvOp::Concat | BvOp::Extract { .. } => unreachable!("handled above"),
            };
            Ok(format!("({name} {})", write_args(args)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sort::Sort;

    #[test]
    fn declares_inputs_then_state_vars_with_next_partners() {
        let env = Environment::new();
        let mut m = Model::new(env.clone());
        m.create_input_var("i", Sort::Bool).unwrap();
        let x = m.create_state_var("x", Sort::Bool).unwrap();
        let xt = env.mk_symbol(x);
        m.add_init(xt).unwrap();
        let nx = m.next(xt).unwrap();
        m.add_trans(env.mk_iff(nx, xt).unwrap()).unwrap();

        let text = serialize(&m).unwrap();
        assert!(text.contains("(declare-fun i () Bool)"));
        assert!(text.contains("(declare-fun x () Bool)"));
        assert!(text.contains("(declare-fun x.__next0 () Bool)"));
        assert!(text.contains("(define-fun next0 () Bool (! x :next x.__next0))"));
        assert!(text.contains("(define-fun init0 () Bool (! x :init true))"));
        assert!(text.contains("(define-fun trans0 () Bool (! (= x.__next0 x) :trans true))"));
        assert!(text.trim_end().ends_with("(assert true)"));
    }

    #[test]
    fn properties_get_per_kind_sequential_names_and_idx_annotation() {
        let env = Environment::new();
        let mut m = Model::new(env.clone());
        let x = m.create_state_var("x", Sort::Bool).unwrap();
        let xt = env.mk_symbol(x);
        m.add_property_at(PropertyKind::Invar, xt, 5).unwrap();
        m.add_property_at(PropertyKind::Invar, xt, 7).unwrap();

        let text = serialize(&m).unwrap();
        assert!(text.contains("(define-fun invar0 () Bool (! x :invar-property 5))"));
        assert!(text.contains("(define-fun invar1 () Bool (! x :invar-property 7))"));
    }

    #[test]
    fn ltl_operators_are_emitted_with_ltl_dot_prefix() {
        let env = Environment::new();
        let mut m = Model::new(env.clone());
        let x = m.create_state_var("x", Sort::Bool).unwrap();
        let xt = env.mk_symbol(x);
        let gx = env.mk_ltl_unary(crate::sort::LtlOp::G, xt).unwrap();
        m.add_ltl_property(gx).unwrap();

        let text = serialize(&m).unwrap();
        assert!(text.contains("(ltl.G x)"));
    }
}
