use crate::sort::{ArithOp, BvOp, CmpOp, LtlOp, Quantifier};
use crate::symbol::Symbol;
use internment::Intern;
use std::fmt;

/// A hash-consed formula DAG node. See §3: equality is structural via
/// interning, so two `FormulaNode`s built the same way produce the same
/// [`Term`] handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FormulaNode {
    BoolConst(bool),
    IntConst(i64),
    /// Stored as a decimal string to keep `Eq`/`Hash` exact without pulling
    /// in a rational-arithmetic dependency the encoders never need.
    RealConst(String),
    BvConst { value: u64, width: u32 },
    Symbol(Symbol),
    Not(Term),
    And(Vec<Term>),
    Or(Vec<Term>),
    Implies(Term, Term),
    Iff(Term, Term),
    Ite(Term, Term, Term),
    Eq(Term, Term),
    Cmp(CmpOp, Term, Term),
    Arith(ArithOp, Term, Term),
    BvOp(BvOp, Vec<Term>),
    Quantifier(Quantifier, Vec<Symbol>, Term),
    /// `NEXT(term)`: selects `term`'s value in the successor step.
    Next(Term),
    /// An LTL operator applied to one (unary) or two (binary) Bool operands;
    /// see [`LtlOp::arity`].
    Ltl(LtlOp, Vec<Term>),
}

/// A handle to an interned [`FormulaNode`]. `Copy`, and `Eq`/`Hash` by
/// pointer identity — cheap to pass around and to use as a `HashMap` key in
/// the walker memo tables.
pub type Term = Intern<FormulaNode>;

pub(crate) fn intern(node: FormulaNode) -> Term {
    Intern::new(node)
}

impl FormulaNode {
    pub fn children(&self) -> Vec<Term> {
        match self {
            FormulaNode::BoolConst(_)
            | FormulaNode::IntConst(_)
            | FormulaNode::RealConst(_)
            | FormulaNode::BvConst { .. }
            | FormulaNode::Symbol(_) => Vec::new(),
            FormulaNode::Not(a) => vec![*a],
            FormulaNode::And(args) | FormulaNode::Or(args) => args.clone(),
            FormulaNode::Implies(a, b) | FormulaNode::Iff(a, b) => vec![*a, *b],
            FormulaNode::Ite(c, t, e) => vec![*c, *t, *e],
            FormulaNode::Eq(a, b) | FormulaNode::Cmp(_, a, b) | FormulaNode::Arith(_, a, b) => {
                vec![*a, *b]
            }
            FormulaNode::BvOp(_, args) => args.clone(),
            FormulaNode::Quantifier(_, _, body) => vec![*body],
            FormulaNode::Next(a) => vec![*a],
            FormulaNode::Ltl(_, args) => args.clone(),
        }
    }

    pub fn is_symbol(&self) -> bool {
        matches!(self, FormulaNode::Symbol(_))
    }

    pub fn as_symbol(&self) -> Option<Symbol> {
        match self {
            FormulaNode::Symbol(s) => Some(*s),
            _ => None,
        }
    }

    pub fn is_ltl(&self) -> bool {
        matches!(self, FormulaNode::Ltl(_, _))
    }

    pub fn is_next(&self) -> bool {
        matches!(self, FormulaNode::Next(_))
    }

    pub fn is_and_or(&self) -> bool {
        matches!(self, FormulaNode::And(_) | FormulaNode::Or(_))
    }
}

impl fmt::Display for FormulaNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormulaNode::BoolConst(b) => write!(f, "{b}"),
            FormulaNode::IntConst(v) => write!(f, "{v}"),
            FormulaNode::RealConst(v) => write!(f, "{v}"),
            FormulaNode::BvConst { value, width } => write!(f, "{value:#x}:{width}"),
            FormulaNode::Symbol(s) => write!(f, "{}", s.name),
            FormulaNode::Not(a) => write!(f, "(not {a})"),
            FormulaNode::And(args) => write!(f, "(and {})", display_args(args)),
            FormulaNode::Or(args) => write!(f, "(or {})", display_args(args)),
            FormulaNode::Implies(a, b) => write!(f, "({a} => {b})"),
            FormulaNode::Iff(a, b) => write!(f, "({a} <=> {b})"),
            FormulaNode::Ite(c, t, e) => write!(f, "(ite {c} {t} {e})"),
            FormulaNode::Eq(a, b) => write!(f, "({a} = {b})"),
            FormulaNode::Cmp(op, a, b) => write!(f, "({a} {op:?} {b})"),
            FormulaNode::Arith(op, a, b) => write!(f, "({a} {op:?} {b})"),
            FormulaNode::BvOp(op, args) => write!(f, "({op:?} {})", display_args(args)),
            FormulaNode::Quantifier(q, vars, body) => {
                let names: Vec<_> = vars.iter().map(|v| v.name.clone()).collect();
                write!(f, "({q:?} ({}) {body})", names.join(" "))
            }
            FormulaNode::Next(a) => write!(f, "{a}'"),
            FormulaNode::Ltl(op, args) if args.len() == 1 => write!(f, "({op} {})", args[0]),
            FormulaNode::Ltl(op, args) if args.len() == 2 => {
                write!(f, "({} {op} {})", args[0], args[1])
            }
            FormulaNode::Ltl(op, args) => write!(f, "({op} {})", display_args(args)),
        }
    }
}

fn display_args(args: &[Term]) -> String {
    args.iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}
