use crate::sort::Sort;
use internment::Intern;
use std::fmt;

/// The data behind a [`Symbol`]: a name and a type. Symbol identity is
/// `(name, sort)`, matching §3's definition; interning gives two symbols
/// built from the same name and sort the same handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SymbolData {
    pub name: String,
    pub sort: Sort,
}

/// A named, typed leaf. Cheap to copy and compare: identity is a pointer
/// into the global intern table.
pub type Symbol = Intern<SymbolData>;

/// Construct (or retrieve) the symbol named `name` with the given `sort`.
pub fn symbol(name: impl Into<String>, sort: Sort) -> Symbol {
    Intern::new(SymbolData {
        name: name.into(),
        sort,
    })
}

impl fmt::Display for SymbolData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
