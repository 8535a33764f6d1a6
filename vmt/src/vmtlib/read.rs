//! VMT-LIB parsing (§4.7, §6): the mirror of [`super::write`] — reads a
//! `declare-fun`/`define-fun` script back into a fresh [`Model`]. No
//! external SMT-LIB parser is used; [`super::sexpr`] supplies just enough
//! structure for this narrow dialect.

use crate::env::Environment;
use crate::error::{Result, VmtError};
use crate::model::{Model, PropertyKind};
use crate::sort::{ArithOp, BvOp, CmpOp, LtlOp, Quantifier, Sort};
use crate::symbol::{Symbol, symbol};
use crate::term::{FormulaNode, Term};
use crate::vmtlib::sexpr::{SExpr, parse_all};
use std::collections::{HashMap, HashSet};

/// Parse `text` into a fresh [`Model`] over `env`.
pub fn read_vmt(env: &Environment, text: &str) -> Result<Model> {
    let commands = parse_all(text)?;
    let mut model = Model::new(env.clone());

    let mut pool: Vec<(String, Sort)> = Vec::new();
    let mut next_pairs: Vec<(String, String)> = Vec::new();
    let mut other_defines: Vec<&[SExpr]> = Vec::new();

    for cmd in &commands {
        let items = cmd
            .as_list()
            .ok_or_else(|| VmtError::ParseError("expected a command list".into()))?;
        let head = items
            .first()
            .and_then(SExpr::as_atom)
            .ok_or_else(|| VmtError::ParseError("expected a command name".into()))?;
        match head {
            "declare-fun" => pool.push(parse_declare_fun(items)?),
            "define-fun" => match try_parse_next_define(items)? {
                Some(pair) => next_pairs.push(pair),
                None => other_defines.push(items),
            },
            "assert" => {
                if items.len() != 2 || items[1].as_atom() != Some("true") {
                    return Err(VmtError::ParseError("expected a trailing `(assert true)`".into()));
                }
            }
            other => return Err(VmtError::ParseError(format!("unknown command `{other}`"))),
        }
    }

    let pool_map: HashMap<&str, Sort> = pool.iter().map(|(n, s)| (n.as_str(), *s)).collect();
    let mut consumed: HashSet<String> = HashSet::new();
    let mut symtab: HashMap<String, Symbol> = HashMap::new();
    let mut next_replacements: HashMap<Symbol, Term> = HashMap::new();

    for (curr_name, partner_name) in &next_pairs {
        let sort = *pool_map
            .get(curr_name.as_str())
            .ok_or_else(|| VmtError::UndeclaredSymbol(curr_name.clone()))?;
        let curr = model.create_state_var(curr_name.clone(), sort)?;
        symtab.insert(curr_name.clone(), curr);
        consumed.insert(curr_name.clone());

        let partner_sort = *pool_map
            .get(partner_name.as_str())
            .ok_or_else(|| VmtError::UndeclaredSymbol(partner_name.clone()))?;
        let partner = symbol(partner_name.clone(), partner_sort);
        consumed.insert(partner_name.clone());

        let curr_term = env.mk_symbol(curr);
        let next_term = model.next(curr_term)?;
        next_replacements.insert(partner, next_term);
    }

    for (name, sort) in &pool {
        if consumed.contains(name) {
            continue;
        }
        let sym = model.create_input_var(name.clone(), *sort)?;
        symtab.insert(name.clone(), sym);
    }

    for items in other_defines {
        process_define_fun(env, &mut model, &symtab, &next_replacements, items)?;
    }

    Ok(model)
}

fn parse_declare_fun(items: &[SExpr]) -> Result<(String, Sort)> {
    if items.len() != 4 {
        return Err(VmtError::ParseError("malformed declare-fun".into()));
    }
    let name = items[1]
        .as_atom()
        .ok_or_else(|| VmtError::ParseError("expected a symbol name".into()))?
        .to_string();
    let sort = parse_sort(&items[3])?;
    Ok((name, sort))
}

fn parse_sort(e: &SExpr) -> Result<Sort> {
    match e {
        SExpr::Atom(s) => match s.as_str() {
            "Bool" => Ok(Sort::Bool),
            "Int" => Ok(Sort::Int),
            "Real" => Ok(Sort::Real),
            other => Err(VmtError::ParseError(format!("unknown sort `{other}`"))),
        },
        SExpr::List(items) => {
            if items.len() == 3
                && items[0].as_atom() == Some("_")
                && items[1].as_atom() == Some("BitVec")
            {
                let w = items[2]
                    .as_atom()
                    .and_then(|s| s.parse().ok())
                    .ok_or_else(|| VmtError::ParseError("bad BitVec width".into()))?;
                Ok(Sort::BitVec(w))
            } else {
                Err(VmtError::ParseError("unrecognized sort expression".into()))
            }
        }
    }
}

/// `(! inner :key value)` — the one annotation wrapper shape this dialect
/// writes (§4.7). Returns `(inner, key, value)`.
fn annotation_of(body: &SExpr) -> Option<(&SExpr, &str, &SExpr)> {
    let items = body.as_list()?;
    if items.len() == 4 && items[0].as_atom() == Some("!") {
        Some((&items[1], items[2].as_atom()?, &items[3]))
    } else {
        None
    }
}

fn try_parse_next_define(items: &[SExpr]) -> Result<Option<(String, String)>> {
    if items.len() != 5 {
        return Ok(None);
    }
    if let Some((inner, ":next", value)) = annotation_of(&items[4]) {
        let curr = inner
            .as_atom()
            .ok_or_else(|| VmtError::ParseError("expected a symbol for :next".into()))?
            .to_string();
        let partner = value
            .as_atom()
            .ok_or_else(|| VmtError::ParseError("expected a symbol for :next value".into()))?
            .to_string();
        return Ok(Some((curr, partner)));
    }
    Ok(None)
}

fn process_define_fun(
    env: &Environment,
    model: &mut Model,
    symtab: &HashMap<String, Symbol>,
    next_replacements: &HashMap<Symbol, Term>,
    items: &[SExpr],
) -> Result<()> {
    if items.len() != 5 {
        return Err(VmtError::ParseError("malformed define-fun".into()));
    }
    let (formula_expr, key, value) = annotation_of(&items[4])
        .ok_or_else(|| VmtError::ParseError("define-fun missing an annotation".into()))?;
    let term = parse_term(env, symtab, formula_expr)?;
    let term = apply_next_replacements(env, next_replacements, term)?;

    match key {
        ":init" => {
            expect_true("init", value)?;
            model.add_init(term)
        }
        ":trans" => {
            expect_true("trans", value)?;
            model.add_trans(term)
        }
        ":invar-property" => model
            .add_property_at(PropertyKind::Invar, term, parse_property_idx(value)?)
            .map(|_| ()),
        ":live-property" => model
            .add_property_at(PropertyKind::Live, term, parse_property_idx(value)?)
            .map(|_| ()),
        ":ltl-property" => model
            .add_property_at(PropertyKind::Ltl, term, parse_property_idx(value)?)
            .map(|_| ()),
        ":ltlf-property" => model
            .add_property_at(PropertyKind::Ltlf, term, parse_property_idx(value)?)
            .map(|_| ()),
        other => Err(VmtError::InvalidPropertyType(other.to_string())),
    }
}

fn expect_true(annotation: &str, value: &SExpr) -> Result<()> {
    match value.as_atom() {
        Some("true") => Ok(()),
        other => Err(VmtError::InvalidAnnotationValue {
            annotation: annotation.to_string(),
            found: other.unwrap_or("<list>").to_string(),
        }),
    }
}

fn parse_property_idx(value: &SExpr) -> Result<u32> {
    let raw = value
        .as_atom()
        .ok_or_else(|| VmtError::ParseError("expected a property index".into()))?;
    let i: i64 = raw
        .parse()
        .map_err(|_| VmtError::ParseError(format!("not an integer: {raw}")))?;
    u32::try_from(i).map_err(|_| VmtError::InvalidPropertyIdx(i))
}

/// Substitute every free occurrence of a next-partner symbol with its
/// `NEXT(curr)` term. Partner symbols are never themselves quantifier-bound
/// in scripts this reader is expected to see, so no shadowing tracking is
/// needed here (contrast [`crate::rename::substitute`]).
fn apply_next_replacements(env: &Environment, map: &HashMap<Symbol, Term>, t: Term) -> Result<Term> {
    match &*t {
        FormulaNode::Symbol(s) => Ok(map.get(s).copied().unwrap_or(t)),
        FormulaNode::BoolConst(_)
        | FormulaNode::IntConst(_)
        | FormulaNode::RealConst(_)
        | FormulaNode::BvConst { .. } => Ok(t),
        other => {
            let children = other
                .children()
                .iter()
                .map(|c| apply_next_replacements(env, map, *c))
                .collect::<Result<Vec<_>>>()?;
            crate::rewrite::rebuild(env, other, children)
        }
    }
}

fn nth(args: &[Term], i: usize) -> Result<Term> {
    args.get(i)
        .copied()
        .ok_or_else(|| VmtError::ParseError(format!("missing argument {i}")))
}

fn parse_term(env: &Environment, symtab: &HashMap<String, Symbol>, e: &SExpr) -> Result<Term> {
    match e {
        SExpr::Atom(s) => parse_atom(env, symtab, s),
        SExpr::List(items) => parse_list(env, symtab, items),
    }
}

fn parse_atom(env: &Environment, symtab: &HashMap<String, Symbol>, s: &str) -> Result<Term> {
    match s {
        "true" => Ok(env.mk_true()),
        "false" => Ok(env.mk_false()),
        _ => {
            if let Some(sym) = symtab.get(s) {
                return Ok(env.mk_symbol(*sym));
            }
            if let Ok(i) = s.parse::<i64>() {
                return Ok(env.mk_int(i));
            }
            if s.contains('.') && s.chars().next().is_some_and(|c| c.is_ascii_digit() || c == '-') {
                return Ok(env.mk_real(s.to_string()));
            }
            Err(VmtError::UndeclaredSymbol(s.to_string()))
        }
    }
}

fn parse_list(env: &Environment, symtab: &HashMap<String, Symbol>, items: &[SExpr]) -> Result<Term> {
    if items.is_empty() {
        return Err(VmtError::ParseError("empty list".into()));
    }

    if items[0].as_atom() == Some("_") {
        if items.len() == 3 {
            if let Some(bv) = items[1].as_atom() {
                if let Some(val) = bv.strip_prefix("bv") {
                    let value: u64 = val
                        .parse()
                        .map_err(|_| VmtError::ParseError(format!("bad bv literal `{bv}`")))?;
                    let width: u32 = items[2]
                        .as_atom()
                        .and_then(|s| s.parse().ok())
                        .ok_or_else(|| VmtError::ParseError("bad bv width".into()))?;
                    return Ok(env.mk_bv(value, width));
                }
            }
        }
        return Err(VmtError::ParseError("malformed `_` expression".into()));
    }

    if let SExpr::List(head_items) = &items[0] {
        if head_items.len() == 4
            && head_items[0].as_atom() == Some("_")
            && head_items[1].as_atom() == Some("extract")
        {
            let hi: u32 = head_items[2]
                .as_atom()
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| VmtError::ParseError("bad extract hi".into()))?;
            let lo: u32 = head_items[3]
                .as_atom()
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| VmtError::ParseError("bad extract lo".into()))?;
            let arg = parse_term(env, symtab, &items[1])?;
            return env.mk_bvop(BvOp::Extract { hi, lo }, vec![arg]);
        }
        return Err(VmtError::ParseError("unsupported compound functor".into()));
    }

    let head = items[0]
        .as_atom()
        .ok_or_else(|| VmtError::ParseError("expected an operator".into()))?;

    if head == "forall" || head == "exists" {
        return parse_quantifier(env, symtab, head, items);
    }

    let args: Vec<Term> = items[1..]
        .iter()
        .map(|a| parse_term(env, symtab, a))
        .collect::<Result<_>>()?;

    if let Some(op) = head.strip_prefix("ltl.") {
        let op = parse_ltl_op(op)?;
        return if args.len() == 1 {
            env.mk_ltl_unary(op, nth(&args, 0)?)
        } else {
            env.mk_ltl_binary(op, nth(&args, 0)?, nth(&args, 1)?)
        };
    }

    match head {
        "not" => env.mk_not(nth(&args, 0)?),
        "and" => env.mk_and(args),
        "or" => env.mk_or(args),
        "=>" => env.mk_implies(nth(&args, 0)?, nth(&args, 1)?),
        "=" => env.mk_eq(nth(&args, 0)?, nth(&args, 1)?),
        "ite" => env.mk_ite(nth(&args, 0)?, nth(&args, 1)?, nth(&args, 2)?),
        "<" => env.mk_cmp(CmpOp::Lt, nth(&args, 0)?, nth(&args, 1)?),
        "<=" => env.mk_cmp(CmpOp::Le, nth(&args, 0)?, nth(&args, 1)?),
        ">" => env.mk_cmp(CmpOp::Gt, nth(&args, 0)?, nth(&args, 1)?),
        ">=" => env.mk_cmp(CmpOp::Ge, nth(&args, 0)?, nth(&args, 1)?),
        "+" => env.mk_arith(ArithOp::Add, nth(&args, 0)?, nth(&args, 1)?),
        "-" => env.mk_arith(ArithOp::Sub, nth(&args, 0)?, nth(&args, 1)?),
        "*" => env.mk_arith(ArithOp::Mul, nth(&args, 0)?, nth(&args, 1)?),
        "bvadd" => env.mk_bvop(BvOp::Add, args),
        "bvsub" => env.mk_bvop(BvOp::Sub, args),
        "bvand" => env.mk_bvop(BvOp::And, args),
        "bvor" => env.mk_bvop(BvOp::Or, args),
        "bvxor" => env.mk_bvop(BvOp::Xor, args),
        "bvnot" => env.mk_bvop(BvOp::Not, args),
        "bvshl" => env.mk_bvop(BvOp::Shl, args),
        "bvlshr" => env.mk_bvop(BvOp::Lshr, args),
        "concat" => env.mk_bvop(BvOp::Concat, args),
        other => Err(VmtError::ParseError(format!("unknown operator `{other}`"))),
    }
}

fn parse_quantifier(
    env: &Environment,
    symtab: &HashMap<String, Symbol>,
    head: &str,
    items: &[SExpr],
) -> Result<Term> {
    if items.len() != 3 {
        return Err(VmtError::ParseError("malformed quantifier".into()));
    }
    let bindings = items[1]
        .as_list()
        .ok_or_else(|| VmtError::ParseError("expected a binding list".into()))?;
    let mut vars = Vec::new();
    let mut inner_symtab = symtab.clone();
    for b in bindings {
        let pair = b
            .as_list()
            .ok_or_else(|| VmtError::ParseError("expected a (name sort) binding".into()))?;
        if pair.len() != 2 {
            return Err(VmtError::ParseError("expected a (name sort) binding".into()));
        }
        let name = pair[0]
            .as_atom()
            .ok_or_else(|| VmtError::ParseError("expected a bound variable name".into()))?
            .to_string();
        let sort = parse_sort(&pair[1])?;
        let sym = symbol(name.clone(), sort);
        vars.push(sym);
        inner_symtab.insert(name, sym);
    }
    let body = parse_term(env, &inner_symtab, &items[2])?;
    let q = if head == "forall" { Quantifier::Forall } else { Quantifier::Exists };
    env.mk_quantifier(q, vars, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vmtlib::write::serialize;

    #[test]
    fn round_trips_a_simple_counter_model() {
        let env = Environment::new();
        let mut m = Model::new(env.clone());
        m.create_input_var("i", Sort::Bool).unwrap();
        let x = m.create_state_var("x", Sort::Int).unwrap();
        let xt = env.mk_symbol(x);
        m.add_init(env.mk_eq(xt, env.mk_int(0)).unwrap()).unwrap();
        let nx = m.next(xt).unwrap();
        m.add_trans(env.mk_eq(nx, env.mk_arith(ArithOp::Add, xt, env.mk_int(1)).unwrap()).unwrap())
            .unwrap();
        m.add_invar_property(env.mk_cmp(CmpOp::Ge, xt, env.mk_int(0)).unwrap()).unwrap();

        let text = serialize(&m).unwrap();
        let read_back = read_vmt(&env, &text).unwrap();

        assert_eq!(read_back.state_vars().len(), 1);
        assert_eq!(read_back.input_vars().len(), 1);
        assert_eq!(read_back.init().len(), 1);
        assert_eq!(read_back.trans().len(), 1);
        assert_eq!(read_back.properties().len(), 1);
    }

    #[test]
    fn rejects_non_true_init_annotation() {
        let env = Environment::new();
        let text = "(declare-fun x () Bool)\n\
                     (define-fun init0 () Bool (! x :init false))\n\
                     (assert true)\n";
        assert!(matches!(read_vmt(&env, text), Err(VmtError::InvalidAnnotationValue { .. })));
    }

    #[test]
    fn leftover_declarations_become_inputs() {
        let env = Environment::new();
        let text = "(declare-fun a () Bool)\n(assert true)\n";
        let m = read_vmt(&env, text).unwrap();
        assert_eq!(m.input_vars().len(), 1);
        assert_eq!(m.input_vars()[0].name, "a");
    }

    #[test]
    fn parses_ltl_properties() {
        let env = Environment::new();
        let text = "(declare-fun x () Bool)\n\
                     (define-fun ltl0 () Bool (! (ltl.G x) :ltl-property 0))\n\
                     (assert true)\n";
        let m = read_vmt(&env, text).unwrap();
        assert_eq!(m.properties().len(), 1);
        assert_eq!(m.properties()[0].kind, PropertyKind::Ltl);
    }
}
