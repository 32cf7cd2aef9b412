//! Reference extraction, template matching and parameter building.
//!
//! Owners store references to associated objects as URIs. To fetch all of them
//! in one call, each URI is reverse-matched against the URI templates of the
//! target type's bulk operations, which yields the property values (`id`,
//! `organization_id`, ...) that identify the referenced objects. Those values
//! are then mapped back onto an operation's template variables.

use crate::core::{Object, OwnerDialect, Reference};
use crate::metadata::{MetadataCapability, Operation};
use serde_json::Value;
use std::collections::BTreeMap;

/// Source property name to its deduplicated values, in first-seen order.
pub type Props = BTreeMap<String, Vec<String>>;

/// Properties extracted from the owners' references for one association.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedProps {
    /// Some owner stored its reference as an array.
    pub habtm: bool,
    /// Props per owner identity, used to match fetched objects back to owners.
    pub by_owner: BTreeMap<String, Props>,
    /// Props across all owners, used to build the batched request.
    pub all: Props,
}

impl ExtractedProps {
    /// Whether the only extracted property is `id`.
    #[must_use]
    pub fn referenced_by_id(&self) -> bool {
        self.all.len() == 1 && self.all.contains_key("id")
    }
}

/// A stored reference together with the identity of its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerReference {
    /// `@id` / `$id` of the owner, if it has one.
    pub owner: Option<String>,
    /// The stored reference.
    pub reference: Reference,
}

/// Read every owner's stored reference for `name`. Owners without one are skipped.
#[must_use]
pub fn extract_references(owners: &[Object], name: &str) -> Vec<OwnerReference> {
    owners
        .iter()
        .filter_map(|owner| {
            let dialect = OwnerDialect::of(owner);
            let reference = dialect.references_of(owner, name)?;
            Some(OwnerReference {
                owner: dialect.identity_of(owner).map(str::to_string),
                reference,
            })
        })
        .collect()
}

fn push_unique(values: &mut Vec<String>, value: String) {
    if !values.contains(&value) {
        values.push(value);
    }
}

/// Reverse-match `references` against the target's bulk operations.
///
/// Every candidate operation is tried for every reference; matched variables
/// are stored under the source property their mapping declares. References no
/// candidate can match contribute nothing.
#[must_use]
pub fn get_props(metadata: &dyn MetadataCapability, references: &[&str]) -> Props {
    let mut result = Props::new();

    for operation in metadata.bulk_candidates() {
        let template = match operation.uri_template() {
            Ok(template) => template,
            Err(e) => {
                tracing::debug!(target: "resolver", "Skipping operation template: {}", e);
                continue;
            }
        };

        for reference in references {
            let Some(values) = template.match_uri(reference) else {
                tracing::debug!(
                    target: "resolver",
                    "Reference {} does not match {}",
                    reference,
                    template.as_str()
                );
                continue;
            };

            for mapping in &operation.mappings {
                let Some(matched) = values.get(&mapping.variable).filter(|v| !v.is_empty()) else {
                    continue;
                };
                let accumulated = result.entry(mapping.source.clone()).or_default();
                for value in matched {
                    push_unique(accumulated, value.clone());
                }
            }
        }
    }

    result
}

/// Extract the props needed to fetch association `name` for `owners`.
#[must_use]
pub fn extract_props(name: &str, metadata: &dyn MetadataCapability, owners: &[Object]) -> ExtractedProps {
    let references = extract_references(owners, name);
    let habtm = references.iter().any(|r| r.reference.is_many());

    let by_owner = references
        .iter()
        .filter_map(|r| {
            let owner = r.owner.clone()?;
            Some((owner, get_props(metadata, &r.reference.uris())))
        })
        .collect();

    let all_uris: Vec<&str> = references.iter().flat_map(|r| r.reference.uris()).collect();
    let all = get_props(metadata, &all_uris);

    ExtractedProps {
        habtm,
        by_owner,
        all,
    }
}

/// Map extracted props onto `operation`'s template variables.
///
/// Variables whose source property has no values are omitted.
#[must_use]
pub fn build_params(operation: &Operation, props: &Props) -> BTreeMap<String, Value> {
    operation
        .mappings
        .iter()
        .filter_map(|mapping| {
            let values = props.get(&mapping.source).filter(|values| !values.is_empty())?;
            let values = values.iter().cloned().map(Value::String).collect();
            Some((mapping.variable.clone(), Value::Array(values)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{Mapping, ResourceMetadata};
    use crate::test_utils::fixtures;
    use serde_json::json;

    fn object(value: Value) -> Object {
        value.as_object().cloned().unwrap()
    }

    fn organization_metadata() -> ResourceMetadata {
        ResourceMetadata::from_document(fixtures::ORGANIZATION_CONTEXT_URL, fixtures::organization_context())
            .unwrap()
    }

    #[test]
    fn test_extract_references() {
        let owners = vec![
            object(json!({"@id": "u/1", "@associations": {"organization": "o/1"}})),
            object(json!({"@id": "u/2", "@associations": {}})),
            object(json!({"@id": "u/3", "@associations": {"organization": ["o/2", "o/3"]}})),
            object(json!({"$id": "b/1", "$schema": "s", "$links": {"organization": "o/4"}})),
        ];

        let references = extract_references(&owners, "organization");
        assert_eq!(references.len(), 3);
        assert_eq!(references[0].owner.as_deref(), Some("u/1"));
        assert!(references[1].reference.is_many());
        assert_eq!(references[2].reference, Reference::One("o/4".to_string()));
    }

    #[test]
    fn test_get_props_deduplicates_across_references() {
        let metadata = organization_metadata();
        let first = fixtures::organization_uri(104);
        let second = fixtures::organization_uri(105);
        let props =
            get_props(&metadata, &[first.as_str(), second.as_str(), first.as_str(), "https://elsewhere.example.com/nothing/1"]);

        assert_eq!(props, Props::from([("id".to_string(), vec!["104".to_string(), "105".to_string()])]));
    }

    #[test]
    fn test_get_props_comma_joined_reference() {
        let metadata = organization_metadata();
        let uri = format!("{}/organizations/104,105", fixtures::UM_API);
        let props = get_props(&metadata, &[uri.as_str()]);
        assert_eq!(props["id"], vec!["104", "105"]);
    }

    #[test]
    fn test_extract_props_per_owner() {
        let metadata = organization_metadata();
        let owners = vec![
            object(json!({"@id": "u/1", "@associations": {"organization": fixtures::organization_uri(9)}})),
            object(json!({"@id": "u/2", "@associations": {"organization": fixtures::organization_uri(10)}})),
            object(json!({"@id": "u/3", "@associations": {"organization": fixtures::organization_uri(9)}})),
        ];

        let extracted = extract_props("organization", &metadata, &owners);
        assert!(!extracted.habtm);
        assert!(extracted.referenced_by_id());
        assert_eq!(extracted.all["id"], vec!["9", "10"]);
        assert_eq!(extracted.by_owner["u/2"]["id"], vec!["10"]);
        assert_eq!(extracted.by_owner.len(), 3);
    }

    #[test]
    fn test_build_params() {
        let operation = Operation {
            method: "GET".to_string(),
            template: "/users/{user_ids}/phones{?organization_id}".to_string(),
            mappings: vec![
                Mapping {
                    source: "user_id".to_string(),
                    variable: "user_ids".to_string(),
                    required: true,
                },
                Mapping {
                    source: "organization_id".to_string(),
                    variable: "organization_id".to_string(),
                    required: false,
                },
            ],
        };
        let props = Props::from([
            ("user_id".to_string(), vec!["1".to_string(), "2".to_string()]),
            ("unused".to_string(), vec!["x".to_string()]),
        ]);

        let params = build_params(&operation, &props);
        assert_eq!(params, BTreeMap::from([("user_ids".to_string(), json!(["1", "2"]))]));
    }
}
