//! Writing fetched objects back onto the owners referencing them.
//!
//! After assignment every owner carries the association key: an object or
//! `null` for to-one associations, an array for to-many associations.

use super::extract::{ExtractedProps, Props};
use crate::core::{Object, OwnerDialect, identity, loose_string};
use serde_json::Value;
use std::collections::HashMap;

/// Assign `objects` to `owners` under `name`.
///
/// The first owner's dialect selects the matching strategy.
pub fn assign(owners: &mut [Object], objects: &[Object], name: &str, many: bool, extracted: &ExtractedProps) {
    let Some(first) = owners.first() else {
        return;
    };
    match OwnerDialect::of(first) {
        OwnerDialect::Schema => assign_to_schema(owners, objects, name, many, extracted),
        OwnerDialect::Linked => assign_to_linked(owners, objects, name, many),
    }

    if many {
        for owner in owners.iter_mut() {
            if is_missing(owner.get(name)) {
                owner.insert(name.to_string(), Value::Array(Vec::new()));
            }
        }
    }
    assign_empty(owners, name);
}

fn is_missing(value: Option<&Value>) -> bool {
    value.is_none_or(Value::is_null)
}

/// Set `name` to `null` on every owner that has no value for it.
pub fn assign_empty(owners: &mut [Object], name: &str) {
    for owner in owners.iter_mut() {
        if is_missing(owner.get(name)) {
            owner.insert(name.to_string(), Value::Null);
        }
    }
}

/// Match by identity.
///
/// Forward: an owner's array reference receives the fetched objects it lists,
/// in reference order; a scalar reference receives the one object it names.
/// Reverse (to-many only): a fetched object whose own references name an owner
/// is appended to that owner's array, unless the owner already holds a
/// non-array value.
pub fn assign_to_linked(owners: &mut [Object], objects: &[Object], name: &str, many: bool) {
    let objects_by_id: HashMap<&str, &Object> =
        objects.iter().filter_map(|object| identity(object).map(|id| (id, object))).collect();

    for owner in owners.iter_mut() {
        let Some(reference) = OwnerDialect::of(owner).references_of(owner, name) else {
            continue;
        };

        let value = if reference.is_many() {
            let mut matches: Vec<Value> = Vec::new();
            for uri in reference.uris() {
                if let Some(object) = objects_by_id.get(uri) {
                    let object = Value::Object((*object).clone());
                    if !matches.contains(&object) {
                        matches.push(object);
                    }
                }
            }
            (!matches.is_empty()).then_some(Value::Array(matches))
        } else {
            reference.uris().first().and_then(|uri| objects_by_id.get(uri)).map(|object| Value::Object((*object).clone()))
        };

        if let Some(value) = value {
            owner.insert(name.to_string(), value);
        }
    }

    if !many {
        return;
    }

    let owners_by_id: HashMap<String, usize> = owners
        .iter()
        .enumerate()
        .filter_map(|(index, owner)| identity(owner).map(|id| (id.to_string(), index)))
        .collect();

    for object in objects {
        let dialect = OwnerDialect::of(object);
        for reference_name in dialect.reference_names(object) {
            let Some(reference) = dialect.references_of(object, &reference_name) else {
                continue;
            };
            if reference.is_many() {
                continue;
            }
            let Some(&index) = reference.uris().first().and_then(|uri| owners_by_id.get(*uri)) else {
                continue;
            };

            let owner = &mut owners[index];
            match owner.get_mut(name) {
                Some(Value::Array(items)) => {
                    let object = Value::Object(object.clone());
                    if !items.contains(&object) {
                        items.push(object);
                    }
                }
                Some(value) if !value.is_null() => {}
                _ => {
                    owner.insert(name.to_string(), Value::Array(vec![Value::Object(object.clone())]));
                }
            }
        }
    }
}

fn matches_props(object: &Object, props: &Props, many: bool) -> bool {
    props.iter().all(|(key, values)| {
        let actual = object.get(key).map(loose_string).unwrap_or_default();
        if many { values.contains(&actual) } else { actual == values.join(",") }
    })
}

/// Match by the per-owner props extracted from each owner's references.
///
/// Values are compared as loose strings, so numeric and string ids are equal.
/// For to-many associations an object matches when its value is one of the
/// owner's values.
pub fn assign_to_schema(owners: &mut [Object], objects: &[Object], name: &str, many: bool, extracted: &ExtractedProps) {
    for owner in owners.iter_mut() {
        let Some(props) = identity(owner).and_then(|id| extracted.by_owner.get(id)) else {
            continue;
        };

        let mut matches = objects.iter().filter(|object| matches_props(object, props, many));
        let value = if many {
            Value::Array(matches.map(|object| Value::Object(object.clone())).collect())
        } else {
            matches.next().map_or(Value::Null, |object| Value::Object(object.clone()))
        };
        owner.insert(name.to_string(), value);
    }
}
