//! A minimal S-expression reader/writer for the narrow SMT-LIB-like dialect
//! VMT-LIB scripts are written in (§4.7, §6): parenthesized lists of bare
//! atoms, no string literals or block comments, `;` runs to end of line.
//! Deliberately not a general SMT-LIB parser — just enough structure to
//! round-trip `declare-fun`/`define-fun`/`assert` commands.

use crate::error::{Result, VmtError};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SExpr {
    Atom(String),
    List(Vec<SExpr>),
}

impl SExpr {
    pub fn atom(s: impl Into<String>) -> SExpr {
        SExpr::Atom(s.into())
    }

    pub fn list(items: impl IntoIterator<Item = SExpr>) -> SExpr {
        SExpr::List(items.into_iter().collect())
    }

    pub fn as_atom(&self) -> Option<&str> {
        match self {
            SExpr::Atom(s) => Some(s),
            SExpr::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[SExpr]> {
        match self {
            SExpr::List(items) => Some(items),
            SExpr::Atom(_) => None,
        }
    }
}

impl fmt::Display for SExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SExpr::Atom(s) => write!(f, "{s}"),
            SExpr::List(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Split `text` into `(`, `)`, and bare-atom tokens, dropping `;`-comments.
fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            ';' => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            '(' | ')' => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
                tokens.push(c.to_string());
            }
            c if c.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Parse every top-level command in `text` into a list of [`SExpr`]s.
pub fn parse_all(text: &str) -> Result<Vec<SExpr>> {
    let tokens = tokenize(text);
    let mut pos = 0;
    let mut commands = Vec::new();
    while pos < tokens.len() {
        let (expr, next) = parse_one(&tokens, pos)?;
        commands.push(expr);
        pos = next;
    }
    Ok(commands)
}

fn parse_one(tokens: &[String], pos: usize) -> Result<(SExpr, usize)> {
    match tokens.get(pos) {
        None => Err(VmtError::ParseError("unexpected end of input".into())),
        Some(t) if t == "(" => {
            let mut items = Vec::new();
            let mut pos = pos + 1;
            loop {
                match tokens.get(pos) {
                    None => return Err(VmtError::ParseError("unclosed `(`".into())),
                    Some(t) if t == ")" => return Ok((SExpr::List(items), pos + 1)),
                    _ => {
                        let (item, next) = parse_one(tokens, pos)?;
                        items.push(item);
                        pos = next;
                    }
                }
            }
        }
        Some(t) if t == ")" => Err(VmtError::ParseError("unexpected `)`".into())),
        Some(t) => Ok((SExpr::Atom(t.clone()), pos + 1)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_lists() {
        let cmds = parse_all("(declare-fun x () Bool)\n(assert (and x (not x)))").unwrap();
        assert_eq!(cmds.len(), 2);
        assert_eq!(
            cmds[0],
            SExpr::list([
                SExpr::atom("declare-fun"),
                SExpr::atom("x"),
                SExpr::list([]),
                SExpr::atom("Bool"),
            ])
        );
    }

    #[test]
    fn strips_line_comments() {
        let cmds = parse_all("; a comment\n(assert true) ; trailing\n").unwrap();
        assert_eq!(cmds.len(), 1);
        assert_eq!(cmds[0].to_string(), "(assert true)");
    }

    #[test]
    fn unclosed_paren_is_an_error() {
        assert!(parse_all("(assert true").is_err());
    }

    #[test]
    fn display_round_trips_through_parse() {
        let text = "(! (= x 0) :init true)";
        let cmds = parse_all(text).unwrap();
        assert_eq!(cmds[0].to_string(), text);
    }
}
