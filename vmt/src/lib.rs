//! `vmt`: symbolic transition systems and LTL/LTLf tableau encoders for
//! model checking.
//!
//! The crate is organised leaves-first, mirroring the component table this
//! implements: a hash-consed [`term`] kernel sits under [`env`]'s typed
//! constructors and oracles, [`model`] builds well-formed transition
//! systems over them, [`next_push`] and [`rewrite`] normalize formulae,
//! [`tableau`] turns a temporal property into tableau machinery wired into
//! a [`model::Model`], and [`vmtlib`]/[`trace`] are the textual I/O and
//! counterexample boundary.

pub mod compose;
pub mod env;
pub mod error;
pub mod model;
pub mod next_push;
pub mod rename;
pub mod rewrite;
pub mod sort;
pub mod symbol;
pub mod tableau;
pub mod term;
pub mod trace;
pub mod vmtlib;

pub use compose::compose;
pub use env::Environment;
pub use error::{Result, VmtError};
pub use model::{Model, Property, PropertyKind};
pub use rename::{rename_model, rename_pattern};
pub use sort::{ArithOp, BvOp, CmpOp, LtlOp, Quantifier, Sort};
pub use symbol::{Symbol, symbol};
pub use term::{FormulaNode, Term};
pub use trace::{Step, Trace};
pub use vmtlib::{read_vmt, serialize};
