use crate::error::{Result, VmtError};
use crate::sort::{ArithOp, BvOp, CmpOp, LtlOp, Quantifier, Sort};
use crate::symbol::{Symbol, symbol};
use crate::term::{FormulaNode, Term, intern};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ENV_ID: AtomicU64 = AtomicU64::new(0);

struct EnvInner {
    id: u64,
    counter: Cell<u64>,
    sort_cache: RefCell<HashMap<Term, Sort>>,
    free_vars_cache: RefCell<HashMap<Term, Rc<BTreeSet<Symbol>>>>,
    has_ltl_cache: RefCell<HashMap<Term, bool>>,
    has_next_cache: RefCell<HashMap<Term, bool>>,
}

/// Process-wide (replaceable) container of walker memo tables and the
/// monotonic counter backing [`Environment::fresh_symbol`]. Two models may
/// be composed only if they share an `Environment` (compared by identity,
/// not contents) — see §5.
///
/// Formula/symbol interning itself is global (backed by `internment`), so
/// cloning an `Environment` is cheap and shares the same memo tables and
/// counter with the original; `Environment::new` is the only way to obtain
/// a fresh, independent one.
#[derive(Clone)]
pub struct Environment(Rc<EnvInner>);

impl PartialEq for Environment {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}
impl Eq for Environment {}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    pub fn new() -> Self {
        let id = NEXT_ENV_ID.fetch_add(1, Ordering::Relaxed);
        Environment(Rc::new(EnvInner {
            id,
            counter: Cell::new(0),
            sort_cache: RefCell::new(HashMap::new()),
            free_vars_cache: RefCell::new(HashMap::new()),
            has_ltl_cache: RefCell::new(HashMap::new()),
            has_next_cache: RefCell::new(HashMap::new()),
        }))
    }

    pub fn id(&self) -> u64 {
        self.0.id
    }

    /// Returns a symbol whose name is guaranteed unused by this environment's
    /// counter, using `template` as a printf-style pattern (`%d` is replaced
    /// by a monotonically increasing integer).
    pub fn fresh_symbol(&self, sort: Sort, template: &str) -> Symbol {
        let n = self.0.counter.get();
        self.0.counter.set(n + 1);
        let name = if template.contains("%d") {
            template.replacen("%d", &n.to_string(), 1)
        } else {
            format!("{template}{n}")
        };
        symbol(name, sort)
    }

    // ---- leaves ----

    pub fn mk_bool(&self, b: bool) -> Term {
        intern(FormulaNode::BoolConst(b))
    }

    pub fn mk_true(&self) -> Term {
        self.mk_bool(true)
    }

    pub fn mk_false(&self) -> Term {
        self.mk_bool(false)
    }

    pub fn mk_int(&self, v: i64) -> Term {
        intern(FormulaNode::IntConst(v))
    }

    pub fn mk_real(&self, v: impl Into<String>) -> Term {
        intern(FormulaNode::RealConst(v.into()))
    }

    pub fn mk_bv(&self, value: u64, width: u32) -> Term {
        intern(FormulaNode::BvConst { value, width })
    }

    pub fn mk_symbol(&self, sym: Symbol) -> Term {
        intern(FormulaNode::Symbol(sym))
    }

    // ---- boolean connectives ----

    pub fn mk_not(&self, a: Term) -> Result<Term> {
        self.expect_bool(a)?;
        Ok(intern(FormulaNode::Not(a)))
    }

    pub fn mk_and(&self, args: Vec<Term>) -> Result<Term> {
        self.mk_nary(args, FormulaNode::And)
    }

    pub fn mk_or(&self, args: Vec<Term>) -> Result<Term> {
        self.mk_nary(args, FormulaNode::Or)
    }

    fn mk_nary(&self, args: Vec<Term>, ctor: fn(Vec<Term>) -> FormulaNode) -> Result<Term> {
        if args.is_empty() {
            return Err(VmtError::TypeMismatch {
                expected: Sort::Bool,
                found: Sort::Bool,
            });
        }
        for a in &args {
            self.expect_bool(*a)?;
        }
        Ok(intern(ctor(args)))
    }

    pub fn mk_implies(&self, a: Term, b: Term) -> Result<Term> {
        self.expect_bool(a)?;
        self.expect_bool(b)?;
        Ok(intern(FormulaNode::Implies(a, b)))
    }

    pub fn mk_iff(&self, a: Term, b: Term) -> Result<Term> {
        self.expect_bool(a)?;
        self.expect_bool(b)?;
        Ok(intern(FormulaNode::Iff(a, b)))
    }

    pub fn mk_ite(&self, c: Term, t: Term, e: Term) -> Result<Term> {
        self.expect_bool(c)?;
        let st = self.sort_of(t);
        let se = self.sort_of(e);
        if st != se {
            return Err(VmtError::TypeMismatch {
                expected: st,
                found: se,
            });
        }
        Ok(intern(FormulaNode::Ite(c, t, e)))
    }

    pub fn mk_eq(&self, a: Term, b: Term) -> Result<Term> {
        let sa = self.sort_of(a);
        let sb = self.sort_of(b);
        if sa != sb {
            return Err(VmtError::TypeMismatch {
                expected: sa,
                found: sb,
            });
        }
        Ok(intern(FormulaNode::Eq(a, b)))
    }

    /// `a = b` for `Bool`-sorted terms, `a <=> b` otherwise-`Bool` semantics
    /// notwithstanding — convenience matching the original's
    /// `EqualsOrIff`: dispatches to `mk_iff` for `Bool` operands and
    /// `mk_eq` otherwise.
    pub fn mk_equals_or_iff(&self, a: Term, b: Term) -> Result<Term> {
        if self.sort_of(a) == Sort::Bool {
            self.mk_iff(a, b)
        } else {
            self.mk_eq(a, b)
        }
    }

    pub fn mk_cmp(&self, op: CmpOp, a: Term, b: Term) -> Result<Term> {
        let sa = self.sort_of(a);
        let sb = self.sort_of(b);
        if sa != sb || matches!(sa, Sort::Bool) {
            return Err(VmtError::TypeMismatch {
                expected: sa,
                found: sb,
            });
        }
        Ok(intern(FormulaNode::Cmp(op, a, b)))
    }

    pub fn mk_arith(&self, op: ArithOp, a: Term, b: Term) -> Result<Term> {
        let sa = self.sort_of(a);
        let sb = self.sort_of(b);
        if sa != sb || matches!(sa, Sort::Bool) {
            return Err(VmtError::TypeMismatch {
                expected: sa,
                found: sb,
            });
        }
        Ok(intern(FormulaNode::Arith(op, a, b)))
    }

    pub fn mk_bvop(&self, op: BvOp, args: Vec<Term>) -> Result<Term> {
        let widths: Vec<u32> = args
            .iter()
            .map(|t| match self.sort_of(*t) {
                Sort::BitVec(w) => Ok(w),
                other => Err(VmtError::TypeMismatch {
                    expected: Sort::BitVec(0),
                    found: other,
                }),
            })
            .collect::<Result<_>>()?;
        if matches!(op, BvOp::Concat) {
            // width is the sum; no further checks needed beyond all-BV above
        } else if let BvOp::Extract { .. } = op {
            // single-operand, width determined by hi/lo at call site
        } else if widths.windows(2).any(|w| w[0] != w[1]) {
            return Err(VmtError::TypeMismatch {
                expected: Sort::BitVec(widths[0]),
                found: Sort::BitVec(*widths.last().unwrap()),
            });
        }
        Ok(intern(FormulaNode::BvOp(op, args)))
    }

    pub fn mk_quantifier(&self, q: Quantifier, vars: Vec<Symbol>, body: Term) -> Result<Term> {
        self.expect_bool(body)?;
        Ok(intern(FormulaNode::Quantifier(q, vars, body)))
    }

    // ---- next / LTL ----

    /// Fails with [`VmtError::UnexpectedNext`] if `a` already contains a
    /// `NEXT` node — a `NEXT` may never wrap another `NEXT` (§3, §4.1).
    pub fn mk_next(&self, a: Term) -> Result<Term> {
        if self.has_next(a) {
            return Err(VmtError::UnexpectedNext);
        }
        Ok(intern(FormulaNode::Next(a)))
    }

    pub fn mk_ltl_unary(&self, op: LtlOp, a: Term) -> Result<Term> {
        debug_assert_eq!(op.arity(), 1);
        self.expect_bool(a)?;
        Ok(intern(FormulaNode::Ltl(op, vec![a])))
    }

    pub fn mk_ltl_binary(&self, op: LtlOp, a: Term, b: Term) -> Result<Term> {
        debug_assert_eq!(op.arity(), 2);
        self.expect_bool(a)?;
        self.expect_bool(b)?;
        Ok(intern(FormulaNode::Ltl(op, vec![a, b])))
    }

    fn expect_bool(&self, t: Term) -> Result<()> {
        let s = self.sort_of(t);
        if s != Sort::Bool {
            return Err(VmtError::TypeMismatch {
                expected: Sort::Bool,
                found: s,
            });
        }
        Ok(())
    }

    // ---- oracles ----

    /// Type-check `t` bottom-up, memoized per environment. `NEXT(x)` has
    /// the type of `x` (BV width propagates transparently); LTL operators
    /// require and yield `Bool`.
    pub fn sort_of(&self, t: Term) -> Sort {
        if let Some(s) = self.0.sort_cache.borrow().get(&t) {
            return *s;
        }
        let s = match &*t {
            FormulaNode::BoolConst(_) => Sort::Bool,
            FormulaNode::IntConst(_) => Sort::Int,
            FormulaNode::RealConst(_) => Sort::Real,
            FormulaNode::BvConst { width, .. } => Sort::BitVec(*width),
            FormulaNode::Symbol(s) => s.sort,
            FormulaNode::Not(_)
            | FormulaNode::And(_)
            | FormulaNode::Or(_)
            | FormulaNode::Implies(_, _)
            | FormulaNode::Iff(_, _)
            | FormulaNode::Eq(_, _)
            | FormulaNode::Cmp(_, _, _)
            | FormulaNode::Ltl(_, _) => Sort::Bool,
            FormulaNode::Ite(_, a, _) => self.sort_of(*a),
            FormulaNode::Arith(_, a, _) => self.sort_of(*a),
            FormulaNode::BvOp(BvOp::Extract { hi, lo }, _) => Sort::BitVec(hi - lo + 1),
            FormulaNode::BvOp(BvOp::Concat, args) => {
                let total = args
                    .iter()
                    .map(|a| match self.sort_of(*a) {
                        Sort::BitVec(w) => w,
                        _ => 0,
                    })
                    .sum();
                Sort::BitVec(total)
            }
            FormulaNode::BvOp(_, args) => self.sort_of(args[0]),
            FormulaNode::Quantifier(_, _, _) => Sort::Bool,
            FormulaNode::Next(inner) => self.sort_of(*inner),
        };
        self.0.sort_cache.borrow_mut().insert(t, s);
        s
    }

    /// Free-variable set of `t`: every symbol occurring in it, excluding
    /// names bound by an enclosing quantifier in `t` itself.
    pub fn free_vars(&self, t: Term) -> Rc<BTreeSet<Symbol>> {
        if let Some(v) = self.0.free_vars_cache.borrow().get(&t) {
            return v.clone();
        }
        let result: BTreeSet<Symbol> = match &*t {
            FormulaNode::Symbol(s) => [*s].into_iter().collect(),
            FormulaNode::Quantifier(_, vars, body) => {
                let mut fv = (*self.free_vars(*body)).clone();
                for v in vars {
                    fv.remove(v);
                }
                fv
            }
            other => {
                let mut fv = BTreeSet::new();
                for c in other.children() {
                    fv.extend(self.free_vars(c).iter().copied());
                }
                fv
            }
        };
        let rc = Rc::new(result);
        self.0.free_vars_cache.borrow_mut().insert(t, rc.clone());
        rc
    }

    pub fn has_ltl(&self, t: Term) -> bool {
        if let Some(v) = self.0.has_ltl_cache.borrow().get(&t) {
            return *v;
        }
        let result = match &*t {
            FormulaNode::Ltl(_, _) => true,
            other => other.children().iter().any(|c| self.has_ltl(*c)),
        };
        self.0.has_ltl_cache.borrow_mut().insert(t, result);
        result
    }

    pub fn has_next(&self, t: Term) -> bool {
        if let Some(v) = self.0.has_next_cache.borrow().get(&t) {
            return *v;
        }
        let result = match &*t {
            FormulaNode::Next(_) => true,
            other => other.children().iter().any(|c| self.has_next(*c)),
        };
        self.0.has_next_cache.borrow_mut().insert(t, result);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sort::LtlOp;

    #[test]
    fn fresh_symbol_is_monotonic_and_unused() {
        let env = Environment::new();
        let a = env.fresh_symbol(Sort::Bool, "el_x_%d");
        let b = env.fresh_symbol(Sort::Bool, "el_x_%d");
        assert_ne!(a, b);
        assert_eq!(a.name, "el_x_0");
        assert_eq!(b.name, "el_x_1");
    }

    #[test]
    fn next_of_next_fails() {
        let env = Environment::new();
        let x = env.mk_symbol(symbol("x", Sort::Bool));
        let nx = env.mk_next(x).unwrap();
        assert_eq!(env.mk_next(nx).unwrap_err(), VmtError::UnexpectedNext);
    }

    #[test]
    fn ltl_unary_requires_bool() {
        let env = Environment::new();
        let n = env.mk_int(4);
        assert!(env.mk_ltl_unary(LtlOp::X, n).is_err());
    }

    #[test]
    fn next_propagates_child_sort() {
        let env = Environment::new();
        let x = env.mk_symbol(symbol("x", Sort::BitVec(8)));
        let nx = env.mk_next(x).unwrap();
        assert_eq!(env.sort_of(nx), Sort::BitVec(8));
    }

    #[test]
    fn free_vars_excludes_quantifier_bound() {
        let env = Environment::new();
        let x = symbol("x", Sort::Bool);
        let y = symbol("y", Sort::Bool);
        let xt = env.mk_symbol(x);
        let yt = env.mk_symbol(y);
        let body = env.mk_and(vec![xt, yt]).unwrap();
        let q = env
            .mk_quantifier(Quantifier::Exists, vec![x], body)
            .unwrap();
        let fv = env.free_vars(q);
        assert!(!fv.contains(&x));
        assert!(fv.contains(&y));
    }

    #[test]
    fn has_ltl_and_has_next_are_structural() {
        let env = Environment::new();
        let x = env.mk_symbol(symbol("x", Sort::Bool));
        let gx = env.mk_ltl_unary(LtlOp::G, x).unwrap();
        assert!(env.has_ltl(gx));
        assert!(!env.has_next(gx));
        let nx = env.mk_next(x).unwrap();
        assert!(env.has_next(nx));
        assert!(!env.has_ltl(nx));
    }
}
