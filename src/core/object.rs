//! Owner objects and the references they carry.
//!
//! Objects are plain JSON maps as returned by the backend. Each one belongs to
//! exactly one [`OwnerDialect`]:
//!
//! - **Linked**: `@context`, `@id`, `@type` and `@associations` (a single URI for
//!   to-one references, an array of URIs for to-many / HABTM references).
//! - **Schema**: `$schema`, `$id` and `$links` (always a single, possibly
//!   comma-joined, URI string).

use serde_json::{Map, Value};

/// A fetched resource instance.
pub type Object = Map<String, Value>;

/// Key holding linked-dialect references.
pub const ASSOCIATIONS_KEY: &str = "@associations";
/// Key holding schema-dialect references.
pub const LINKS_KEY: &str = "$links";

/// Reference value(s) stored on an owner for one association.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    /// A single URI.
    One(String),
    /// An array of URIs, the HABTM shape.
    Many(Vec<String>),
}

impl Reference {
    /// All URIs of this reference, in stored order.
    #[must_use]
    pub fn uris(&self) -> Vec<&str> {
        match self {
            Self::One(uri) => vec![uri.as_str()],
            Self::Many(uris) => uris.iter().map(String::as_str).collect(),
        }
    }

    /// Whether the reference was stored as an array.
    #[must_use]
    pub const fn is_many(&self) -> bool {
        matches!(self, Self::Many(_))
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(uri) if !uri.is_empty() => Some(Self::One(uri.clone())),
            Value::Array(items) => Some(Self::Many(
                items.iter().filter_map(Value::as_str).map(str::to_string).collect(),
            )),
            _ => None,
        }
    }
}

/// The representation convention an owner object follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerDialect {
    /// `@id` / `@context` / `@associations`
    Linked,
    /// `$id` / `$schema` / `$links`
    Schema,
}

impl OwnerDialect {
    /// Determine the dialect of an object; `$schema` wins, everything else is linked.
    #[must_use]
    pub fn of(object: &Object) -> Self {
        if object.contains_key("$schema") { Self::Schema } else { Self::Linked }
    }

    /// Key under which this dialect stores references.
    #[must_use]
    pub const fn references_key(self) -> &'static str {
        match self {
            Self::Linked => ASSOCIATIONS_KEY,
            Self::Schema => LINKS_KEY,
        }
    }

    /// The stored reference for `name`, or `None` when absent or empty.
    ///
    /// Both reference keys are consulted so objects that were converted between
    /// dialects still resolve.
    #[must_use]
    pub fn references_of(self, object: &Object, name: &str) -> Option<Reference> {
        let lookup = |key: &str| {
            object
                .get(key)
                .and_then(Value::as_object)
                .and_then(|refs| refs.get(name))
                .and_then(Reference::from_value)
        };

        match self {
            Self::Linked => lookup(ASSOCIATIONS_KEY).or_else(|| lookup(LINKS_KEY)),
            Self::Schema => lookup(LINKS_KEY).or_else(|| lookup(ASSOCIATIONS_KEY)),
        }
    }

    /// Names of all associations this object carries references for.
    #[must_use]
    pub fn reference_names(self, object: &Object) -> Vec<String> {
        object
            .get(self.references_key())
            .and_then(Value::as_object)
            .map(|refs| refs.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// The object's own URI.
    #[must_use]
    pub fn identity_of(self, object: &Object) -> Option<&str> {
        let (primary, fallback) = match self {
            Self::Linked => ("@id", "$id"),
            Self::Schema => ("$id", "@id"),
        };
        object
            .get(primary)
            .and_then(Value::as_str)
            .or_else(|| object.get(fallback).and_then(Value::as_str))
    }

    /// Identifier of the object's type metadata.
    #[must_use]
    pub fn metadata_id_of(self, object: &Object) -> Option<&str> {
        let key = match self {
            Self::Linked => "@context",
            Self::Schema => "$schema",
        };
        object.get(key).and_then(Value::as_str)
    }
}

/// Identity of an object regardless of its dialect.
#[must_use]
pub fn identity(object: &Object) -> Option<&str> {
    OwnerDialect::of(object).identity_of(object)
}

/// Loose string form used when comparing property values across types.
///
/// Numbers and strings with the same textual form compare equal, arrays join
/// their elements with commas and `null` becomes the empty string.
#[must_use]
pub fn loose_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items.iter().map(loose_string).collect::<Vec<_>>().join(","),
        Value::Object(_) => value.to_string(),
    }
}
