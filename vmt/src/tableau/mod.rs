//! Tableau encoders (C4): each turns a temporal property into an enriched
//! [`crate::model::Model`] that states an equisatisfiable reachability or
//! invariant obligation instead.

mod circuit;
mod classical;
mod justice;
mod ltlf;
mod safety;

pub use circuit::encode_circuit;
pub use classical::encode_classical;
pub use justice::flatten;
pub use ltlf::encode_ltlf;
pub use safety::encode_safety;
