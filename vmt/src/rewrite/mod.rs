//! Operator rewriters (C3): basis reduction, negation normal form, safety
//! detection and the X-weakener, each a structural walk over [`crate::term::Term`].

mod ltl_basis;
mod nnf;
mod safety;
mod support;
mod weaken;

pub use ltl_basis::{rewrite_to_basis, rewrite_to_ltlf_basis};
pub use nnf::nnf;
pub use safety::is_safety_ltl;
pub use weaken::weaken_x;

pub(crate) use support::rebuild;
