//! VMT-LIB textual I/O (C7, §4.7, §6): a hand-written s-expression layer
//! and a serializer/reader built on it. No external SMT-LIB parser crate —
//! the dialect this format needs is narrow enough that pulling one in would
//! buy nothing over a few hundred lines of structural walking.

pub mod read;
pub mod sexpr;
pub mod write;

pub use read::read_vmt;
pub use sexpr::SExpr;
pub use write::serialize;
