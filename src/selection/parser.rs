//! Parser for selection strings.
//!
//! ```text
//! list := item (',' item)*
//! item := '*' | name [ '{' list '}' ]
//! ```
//!
//! Whitespace is insignificant. A list consisting only of `*` is the wildcard.

use super::{Field, Selection};
use crate::core::{ResolveError, Result};
use std::collections::BTreeMap;
use std::iter::Peekable;
use std::str::CharIndices;

/// Parse a selection string.
pub fn parse(input: &str) -> Result<Selection> {
    let mut parser = Parser {
        input,
        chars: input.char_indices().peekable(),
    };

    let selection = parser.list(0)?;
    parser.skip_whitespace();
    if let Some((pos, c)) = parser.chars.next() {
        return Err(parser.error(format!("unexpected '{c}' at position {pos}")));
    }
    Ok(selection)
}

struct Parser<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl Parser<'_> {
    fn error(&self, reason: impl Into<String>) -> ResolveError {
        ResolveError::InvalidSelection {
            input: self.input.to_string(),
            reason: reason.into(),
        }
    }

    fn skip_whitespace(&mut self) {
        while self.chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
    }

    fn list(&mut self, depth: usize) -> Result<Selection> {
        let mut fields = BTreeMap::new();
        let mut wildcard = false;

        loop {
            self.skip_whitespace();
            match self.chars.peek().copied() {
                None if depth > 0 => return Err(self.error("unbalanced '{'")),
                None | Some((_, '}')) if fields.is_empty() && !wildcard => {
                    if depth == 0 && self.input.trim().is_empty() {
                        return Ok(Selection::default());
                    }
                    return Err(self.error("empty selection list"));
                }
                None => return Err(self.error("trailing ','")),
                Some((_, '*')) => {
                    self.chars.next();
                    wildcard = true;
                }
                Some((_, c)) if is_name_char(c) => {
                    let name = self.name();
                    self.skip_whitespace();
                    let field = if self.chars.next_if(|(_, c)| *c == '{').is_some() {
                        let nested = self.list(depth + 1)?;
                        self.skip_whitespace();
                        if self.chars.next_if(|(_, c)| *c == '}').is_none() {
                            return Err(self.error(format!("missing '}}' after '{name}'")));
                        }
                        Field::Nested(nested)
                    } else {
                        Field::Scalar
                    };
                    fields.insert(name, field);
                }
                Some((pos, c)) => {
                    return Err(self.error(format!("unexpected '{c}' at position {pos}")));
                }
            }

            self.skip_whitespace();
            if self.chars.next_if(|(_, c)| *c == ',').is_none() {
                break;
            }
        }

        if wildcard && fields.is_empty() {
            Ok(Selection::Wildcard)
        } else {
            // `*` mixed with names keeps the named fields only; trimming still applies.
            Ok(Selection::Fields(fields))
        }
    }

    fn name(&mut self) -> String {
        let mut name = String::new();
        while let Some((_, c)) = self.chars.next_if(|(_, c)| is_name_char(*c)) {
            name.push(c);
        }
        name
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '@' | '$' | '.' | ':' | '-')
}
