//! Resource metadata in its two dialects.
//!
//! Every resource type is described by a metadata document fetched from the
//! backend. Two conventions exist:
//!
//! - **Linked** (`.../v20140601/context/user`): `properties` plus
//!   `member_actions` / `collection_actions`. A property is an association when
//!   its `type` is itself a metadata URL.
//! - **Schema** (`.../v2021/schemas/my.bicycle.json`): JSON-schema `properties`
//!   plus `actions`. A property is an association when it (or its `items`)
//!   carries `$jsonld_context` or `$ref`, possibly wrapped in `anyOf`.
//!
//! Both are exposed through [`ResourceMetadata`], whose
//! [`MetadataCapability`] implementation answers the questions the resolver
//! asks: which associations exist, which operations exist, and which
//! operations can fetch instances in bulk.

pub mod provider;

use crate::core::{ResolveError, Result};
use crate::template::UriTemplate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub use provider::{HttpMetadataProvider, MetadataProvider, resolve_metadata_url};

/// Maps an object property onto a template variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mapping {
    /// Property name on the resource, e.g. `organization_id`.
    pub source: String,
    /// Template variable, e.g. `organization_ids`.
    pub variable: String,
    /// Whether the operation cannot be called without it.
    #[serde(default)]
    pub required: bool,
}

fn default_method() -> String {
    "GET".to_string()
}

/// A backend operation declared by a resource type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// HTTP method; normalised with [`Operation::http_method`].
    #[serde(default = "default_method")]
    pub method: String,
    /// URI template of the endpoint.
    pub template: String,
    /// Property to variable mappings, in declaration order.
    #[serde(default)]
    pub mappings: Vec<Mapping>,
}

impl Operation {
    /// Parse the operation's template.
    pub fn uri_template(&self) -> Result<UriTemplate> {
        UriTemplate::parse(&self.template)
    }

    /// Upper-cased HTTP method.
    #[must_use]
    pub fn http_method(&self) -> String {
        self.method.to_ascii_uppercase()
    }
}

/// How an association is typed on its owner.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssociationDescriptor {
    /// Metadata URL of the associated type, or its type name as a fallback.
    pub target: String,
    /// To-many association (explicit collection flag or array type).
    pub many: bool,
    /// The property definition after unwrapping.
    pub definition: Value,
}

impl AssociationDescriptor {
    fn from_property(definition: Value) -> Option<Self> {
        let target = spec_url(&definition)
            .or_else(|| definition.get("type").and_then(Value::as_str))?
            .to_string();
        let many = definition.get("collection").and_then(Value::as_bool).unwrap_or(false)
            || definition.get("type").and_then(Value::as_str) == Some("array");

        Some(Self {
            target,
            many,
            definition,
        })
    }
}

/// Metadata URL embedded in a property definition, if any.
fn spec_url(property: &Value) -> Option<&str> {
    const PATHS: [&[&str]; 4] =
        [&["$jsonld_context"], &["$ref"], &["items", "$jsonld_context"], &["items", "$ref"]];

    PATHS.iter().find_map(|path| {
        path.iter()
            .try_fold(property, |value, key| value.get(*key))
            .and_then(Value::as_str)
            .filter(|url| !url.is_empty())
    })
}

fn is_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

/// The two metadata conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    /// `@context` documents with member and collection actions.
    Linked,
    /// JSON-schema documents with a flat action table.
    Schema,
}

/// Questions the resolver asks about a resource type.
pub trait MetadataCapability {
    /// URL the metadata was loaded from.
    fn url(&self) -> &str;

    /// Association descriptors by name.
    fn associations(&self) -> &BTreeMap<String, AssociationDescriptor>;

    /// Look up an operation by name.
    fn find_operation(&self, name: &str) -> Option<&Operation>;

    /// Operations able to fetch many instances at once, in order of preference:
    /// member get, collection get, collection query.
    fn bulk_candidates(&self) -> Vec<&Operation>;
}

/// Metadata in the linked convention.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkedMetadata {
    /// Source URL
    pub url: String,
    /// Raw property definitions
    pub properties: BTreeMap<String, Value>,
    /// Properties typed by another metadata URL
    pub associations: BTreeMap<String, AssociationDescriptor>,
    /// Actions on a single instance
    pub member_actions: BTreeMap<String, Operation>,
    /// Actions on collections
    pub collection_actions: BTreeMap<String, Operation>,
}

impl MetadataCapability for LinkedMetadata {
    fn url(&self) -> &str {
        &self.url
    }

    fn associations(&self) -> &BTreeMap<String, AssociationDescriptor> {
        &self.associations
    }

    /// Accepts `member.get` / `collection.get`; unprefixed names prefer collection actions.
    fn find_operation(&self, name: &str) -> Option<&Operation> {
        let (scope, name) = match name.split_once('.') {
            Some((scope, name)) => (Some(scope), name),
            None => (None, name),
        };

        if scope != Some("member") {
            if let Some(operation) = self.collection_actions.get(name) {
                return Some(operation);
            }
        }
        self.member_actions.get(name)
    }

    fn bulk_candidates(&self) -> Vec<&Operation> {
        [self.member_actions.get("get"), self.find_operation("get"), self.find_operation("query")]
            .into_iter()
            .flatten()
            .collect()
    }
}

/// Metadata in the schema convention.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaMetadata {
    /// Source URL
    pub url: String,
    /// Raw property definitions
    pub properties: BTreeMap<String, Value>,
    /// Properties referencing another schema, unwrapped
    pub associations: BTreeMap<String, AssociationDescriptor>,
    /// Declared actions
    pub actions: BTreeMap<String, Operation>,
}

impl MetadataCapability for SchemaMetadata {
    fn url(&self) -> &str {
        &self.url
    }

    fn associations(&self) -> &BTreeMap<String, AssociationDescriptor> {
        &self.associations
    }

    fn find_operation(&self, name: &str) -> Option<&Operation> {
        self.actions.get(name)
    }

    fn bulk_candidates(&self) -> Vec<&Operation> {
        [self.find_operation("get"), self.find_operation("query")].into_iter().flatten().collect()
    }
}

/// Metadata of one resource type, in either dialect.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "dialect", rename_all = "snake_case")]
pub enum ResourceMetadata {
    /// Linked-data context
    Linked(LinkedMetadata),
    /// JSON schema
    Schema(SchemaMetadata),
}

impl ResourceMetadata {
    /// Build metadata from a fetched document.
    ///
    /// The dialect follows the URL (`/context` or `/schemas`), falling back to
    /// the document's shape. Linked documents may be wrapped in `@context`.
    pub fn from_document(url: &str, document: Value) -> Result<Self> {
        let document = match document {
            Value::Object(mut map) if map.get("@context").is_some_and(Value::is_object) => {
                map.remove("@context").unwrap_or_default()
            }
            other => other,
        };
        let Value::Object(document) = document else {
            return Err(ResolveError::metadata(url, "metadata document is not an object"));
        };

        let dialect = if url.contains("/context") {
            Dialect::Linked
        } else if url.contains("/schemas") {
            Dialect::Schema
        } else if document.contains_key("member_actions") || document.contains_key("collection_actions") {
            Dialect::Linked
        } else if document.contains_key("actions") {
            Dialect::Schema
        } else {
            return Err(ResolveError::metadata(url, "unknown metadata dialect"));
        };

        let properties = object_entries(&document, "properties");
        Ok(match dialect {
            Dialect::Linked => Self::Linked(LinkedMetadata {
                url: url.to_string(),
                associations: linked_associations(&properties),
                properties,
                member_actions: operations(url, &document, "member_actions")?,
                collection_actions: operations(url, &document, "collection_actions")?,
            }),
            Dialect::Schema => Self::Schema(SchemaMetadata {
                url: url.to_string(),
                associations: schema_associations(&properties),
                properties,
                actions: operations(url, &document, "actions")?,
            }),
        })
    }

    /// Which convention this metadata follows.
    #[must_use]
    pub const fn dialect(&self) -> Dialect {
        match self {
            Self::Linked(_) => Dialect::Linked,
            Self::Schema(_) => Dialect::Schema,
        }
    }

    fn capability(&self) -> &dyn MetadataCapability {
        match self {
            Self::Linked(linked) => linked,
            Self::Schema(schema) => schema,
        }
    }
}

impl MetadataCapability for ResourceMetadata {
    fn url(&self) -> &str {
        self.capability().url()
    }

    fn associations(&self) -> &BTreeMap<String, AssociationDescriptor> {
        self.capability().associations()
    }

    fn find_operation(&self, name: &str) -> Option<&Operation> {
        self.capability().find_operation(name)
    }

    fn bulk_candidates(&self) -> Vec<&Operation> {
        self.capability().bulk_candidates()
    }
}

fn object_entries(document: &Map<String, Value>, key: &str) -> BTreeMap<String, Value> {
    document
        .get(key)
        .and_then(Value::as_object)
        .map(|entries| entries.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default()
}

fn operations(url: &str, document: &Map<String, Value>, key: &str) -> Result<BTreeMap<String, Operation>> {
    object_entries(document, key)
        .into_iter()
        .map(|(name, definition)| {
            serde_json::from_value(definition)
                .map(|operation| (name.clone(), operation))
                .map_err(|e| ResolveError::metadata(url, format!("invalid operation '{name}': {e}")))
        })
        .collect()
}

fn linked_associations(properties: &BTreeMap<String, Value>) -> BTreeMap<String, AssociationDescriptor> {
    properties
        .iter()
        .filter(|(_, definition)| definition.get("type").and_then(Value::as_str).is_some_and(is_url))
        .filter_map(|(name, definition)| {
            AssociationDescriptor::from_property(definition.clone()).map(|d| (name.clone(), d))
        })
        .collect()
}

fn schema_associations(properties: &BTreeMap<String, Value>) -> BTreeMap<String, AssociationDescriptor> {
    properties
        .iter()
        .filter_map(|(name, definition)| {
            let unwrapped = unwrap_alternatives(definition);
            spec_url(&unwrapped)?;
            AssociationDescriptor::from_property(unwrapped).map(|d| (name.clone(), d))
        })
        .collect()
}

/// Unwrap `anyOf` / `items.anyOf` unions to their first alternative.
///
/// Properties that reference a linked-data context are left as they are.
fn unwrap_alternatives(definition: &Value) -> Value {
    let references_linked = definition.get("$jsonld_context").is_some()
        || definition.pointer("/items/$jsonld_context").is_some();
    if references_linked {
        return definition.clone();
    }

    if let Some(first) = definition.pointer("/items/anyOf/0").and_then(Value::as_object) {
        let mut unwrapped = first.clone();
        unwrapped.insert("type".to_string(), Value::String("array".to_string()));
        return Value::Object(unwrapped);
    }
    if let Some(first) = definition.pointer("/anyOf/0") {
        return first.clone();
    }
    definition.clone()
}
