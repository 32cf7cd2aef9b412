//! Field and association selection trees.
//!
//! A [`Selection`] describes which fields of an object to keep and which
//! associations to resolve. It is either the wildcard (`*`, keep everything and
//! stop descending) or a set of named [`Field`]s, each a plain scalar field or a
//! nested selection for an association.
//!
//! Selections are written as strings and parsed with [`Selection::parse`]:
//!
//! ```rust,no_run
//! use linkgraph::selection::Selection;
//!
//! let selection = Selection::parse("id, name, organization { name, country }").unwrap();
//! assert!(selection.get("organization").is_some());
//! ```
//!
//! Selections are never mutated by the resolver. When it needs extra properties
//! on an association's objects it derives a new tree with
//! [`Selection::extended_with`].

mod parser;

use crate::constants::IDENTITY_KEYS;
use crate::core::Object;
use std::collections::BTreeMap;

pub use parser::parse;

/// One entry of a selection tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    /// Keep the field as-is (`true` in object notation).
    Scalar,
    /// An association with its own selection.
    Nested(Selection),
}

/// A caller supplied field/association shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Take everything, do not recurse.
    Wildcard,
    /// Keep exactly these fields.
    Fields(BTreeMap<String, Field>),
}

impl Default for Selection {
    fn default() -> Self {
        Self::Fields(BTreeMap::new())
    }
}

impl Selection {
    /// Parse a selection string such as `"id, organization { name }"`.
    pub fn parse(input: &str) -> crate::core::Result<Self> {
        parser::parse(input)
    }

    /// Build a flat selection of scalar fields.
    #[must_use]
    pub fn of_fields<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Fields(names.into_iter().map(|name| (name.into(), Field::Scalar)).collect())
    }

    /// Builder style insertion of a nested association selection.
    #[must_use]
    pub fn with_nested(mut self, name: impl Into<String>, nested: Self) -> Self {
        if let Self::Fields(fields) = &mut self {
            fields.insert(name.into(), Field::Nested(nested));
        }
        self
    }

    /// Whether this is the wildcard selection.
    #[must_use]
    pub const fn is_wildcard(&self) -> bool {
        matches!(self, Self::Wildcard)
    }

    /// Look up a selected field.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Field> {
        match self {
            Self::Wildcard => None,
            Self::Fields(fields) => fields.get(name),
        }
    }

    /// Selected field names; empty for the wildcard.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        let fields = match self {
            Self::Wildcard => None,
            Self::Fields(fields) => Some(fields),
        };
        fields.into_iter().flat_map(|fields| fields.keys().map(String::as_str))
    }

    /// A copy that also selects the identity and bookkeeping keys.
    #[must_use]
    pub fn with_identity(&self) -> Self {
        self.extended_with(IDENTITY_KEYS)
    }

    /// A copy that additionally selects `names` as scalar fields.
    ///
    /// Existing entries are left untouched; the wildcard already selects
    /// everything and is returned unchanged.
    #[must_use]
    pub fn extended_with<I, S>(&self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        match self {
            Self::Wildcard => Self::Wildcard,
            Self::Fields(fields) => {
                let mut fields = fields.clone();
                for name in names {
                    fields.entry(name.as_ref().to_string()).or_insert(Field::Scalar);
                }
                Self::Fields(fields)
            }
        }
    }

    /// Reduce `object` to the selected keys. The wildcard keeps everything.
    #[must_use]
    pub fn trim(&self, object: Object) -> Object {
        match self {
            Self::Wildcard => object,
            Self::Fields(fields) => {
                object.into_iter().filter(|(key, _)| fields.contains_key(key)).collect()
            }
        }
    }
}
