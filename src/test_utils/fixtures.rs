//! Metadata documents and objects of a small test domain.
//!
//! Linked dialect (`um` app): users belong to an organization, have phones
//! (referenced through a collection URI) and many geo scopes (HABTM).
//!
//! Schema dialect (`my` app): bicycles have an owner (a linked user), a
//! manufacturer, activities (referenced through a collection URI) and wheels
//! (a comma-joined link).

use super::StaticMetadataProvider;
use crate::core::Object;
use serde_json::{Value, json};

/// Base URL of the linked API
pub const UM_API: &str = "https://um.example.com/v20140601";
/// Base URL of the schema API
pub const MY_API: &str = "https://my.example.com/v2021";

pub const USER_CONTEXT_URL: &str = "https://um.example.com/v20140601/context/user";
pub const ORGANIZATION_CONTEXT_URL: &str = "https://um.example.com/v20140601/context/organization";
pub const PHONE_CONTEXT_URL: &str = "https://um.example.com/v20140601/context/user/phone";
pub const GEO_SCOPE_CONTEXT_URL: &str = "https://um.example.com/v20140601/context/geo_scope";

pub const BICYCLE_SCHEMA_URL: &str = "https://my.example.com/v2021/schemas/my.bicycle";
pub const MANUFACTURER_SCHEMA_URL: &str = "https://my.example.com/v2021/schemas/my.manufacturer";
pub const ACTIVITY_SCHEMA_URL: &str = "https://my.example.com/v2021/schemas/my.activity";
pub const WHEEL_SCHEMA_URL: &str = "https://my.example.com/v2021/schemas/my.wheel";

fn get(template: String, source: &str, variable: &str) -> Value {
    json!({
        "method": "GET",
        "template": template,
        "mappings": [{"source": source, "variable": variable, "required": true}]
    })
}

fn into_object(value: Value) -> Object {
    match value {
        Value::Object(object) => object,
        _ => Object::new(),
    }
}

pub fn user_context() -> Value {
    json!({
        "@context": {
            "properties": {
                "id": {"type": "integer"},
                "first_name": {"type": "string"},
                "organization_id": {"type": "integer"},
                "organization": {"type": ORGANIZATION_CONTEXT_URL},
                "phones": {"type": PHONE_CONTEXT_URL, "collection": true},
                "geo_scopes": {"type": GEO_SCOPE_CONTEXT_URL, "collection": true}
            },
            "member_actions": {
                "get": get(format!("{UM_API}/users/{{user_id}}"), "id", "user_id")
            },
            "collection_actions": {
                "get": get(format!("{UM_API}/users/{{user_ids}}"), "id", "user_ids"),
                "query": {
                    "method": "GET",
                    "template": format!("{UM_API}/users{{?user_ids,organization_id}}"),
                    "mappings": [
                        {"source": "id", "variable": "user_ids"},
                        {"source": "organization_id", "variable": "organization_id"}
                    ]
                }
            }
        }
    })
}

pub fn organization_context() -> Value {
    json!({
        "@context": {
            "properties": {
                "id": {"type": "integer"},
                "name": {"type": "string"},
                "users": {"type": USER_CONTEXT_URL, "collection": true}
            },
            "member_actions": {
                "get": get(format!("{UM_API}/organizations/{{organization_id}}"), "id", "organization_id")
            },
            "collection_actions": {
                "get": get(format!("{UM_API}/organizations/{{organization_ids}}"), "id", "organization_ids"),
                "query": {
                    "method": "GET",
                    "template": format!("{UM_API}/organizations{{?organization_ids}}"),
                    "mappings": [{"source": "id", "variable": "organization_ids"}]
                }
            }
        }
    })
}

pub fn phone_context() -> Value {
    json!({
        "@context": {
            "properties": {
                "id": {"type": "integer"},
                "number": {"type": "string"},
                "user_id": {"type": "integer"},
                "user": {"type": USER_CONTEXT_URL}
            },
            "member_actions": {},
            "collection_actions": {
                "query": get(format!("{UM_API}/users/{{user_ids}}/phones"), "user_id", "user_ids")
            }
        }
    })
}

pub fn geo_scope_context() -> Value {
    json!({
        "@context": {
            "properties": {
                "id": {"type": "string"},
                "name": {"type": "string"}
            },
            "member_actions": {
                "get": get(format!("{UM_API}/geo_scopes/{{geo_scope_id}}"), "id", "geo_scope_id")
            },
            "collection_actions": {
                "get": get(format!("{UM_API}/geo_scopes/{{geo_scope_ids}}"), "id", "geo_scope_ids"),
                "query": {
                    "method": "GET",
                    "template": format!("{UM_API}/geo_scopes{{?geo_scope_ids}}"),
                    "mappings": [{"source": "id", "variable": "geo_scope_ids"}]
                }
            }
        }
    })
}

pub fn bicycle_schema() -> Value {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "$id": BICYCLE_SCHEMA_URL,
        "type": "object",
        "properties": {
            "id": {"type": "integer"},
            "name": {"type": "string"},
            "owner_id": {"type": "integer"},
            "owner": {"type": "object", "$jsonld_context": USER_CONTEXT_URL},
            "previous_owners": {"type": "array", "items": {"$jsonld_context": USER_CONTEXT_URL}},
            "manufacturer": {"$ref": MANUFACTURER_SCHEMA_URL},
            "activities": {"type": "array", "items": {"$ref": ACTIVITY_SCHEMA_URL}},
            "wheels": {
                "type": "array",
                "items": {"anyOf": [{"$ref": WHEEL_SCHEMA_URL}, {"type": "null"}]}
            }
        },
        "actions": {
            "get": get(format!("{MY_API}/bicycles/{{bicycle_ids}}"), "id", "bicycle_ids")
        }
    })
}

pub fn manufacturer_schema() -> Value {
    json!({
        "$id": MANUFACTURER_SCHEMA_URL,
        "type": "object",
        "properties": {
            "id": {"type": "integer"},
            "name": {"type": "string"}
        },
        "actions": {
            "get": get(format!("{MY_API}/manufacturers/{{manufacturer_ids}}"), "id", "manufacturer_ids"),
            "search": {"method": "POST", "template": format!("{MY_API}/manufacturers/search"), "mappings": []}
        }
    })
}

pub fn activity_schema() -> Value {
    json!({
        "$id": ACTIVITY_SCHEMA_URL,
        "type": "object",
        "properties": {
            "id": {"type": "integer"},
            "bicycle_id": {"type": "integer"},
            "title": {"type": "string"}
        },
        "actions": {
            "get": get(format!("{MY_API}/activities/{{activity_ids}}"), "id", "activity_ids"),
            "query": get(format!("{MY_API}/bicycles/{{bicycle_ids}}/activities"), "bicycle_id", "bicycle_ids")
        }
    })
}

pub fn wheel_schema() -> Value {
    json!({
        "$id": WHEEL_SCHEMA_URL,
        "type": "object",
        "properties": {
            "id": {"type": "integer"},
            "size": {"type": "integer"}
        },
        "actions": {
            "get": get(format!("{MY_API}/wheels/{{wheel_ids}}"), "id", "wheel_ids")
        }
    })
}

/// A provider serving every document of this module.
#[must_use]
pub fn provider() -> StaticMetadataProvider {
    StaticMetadataProvider::new()
        .with_document(USER_CONTEXT_URL, user_context())
        .with_document(ORGANIZATION_CONTEXT_URL, organization_context())
        .with_document(PHONE_CONTEXT_URL, phone_context())
        .with_document(GEO_SCOPE_CONTEXT_URL, geo_scope_context())
        .with_document(BICYCLE_SCHEMA_URL, bicycle_schema())
        .with_document(MANUFACTURER_SCHEMA_URL, manufacturer_schema())
        .with_document(ACTIVITY_SCHEMA_URL, activity_schema())
        .with_document(WHEEL_SCHEMA_URL, wheel_schema())
}

pub fn user_uri(id: u64) -> String {
    format!("{UM_API}/users/{id}")
}

pub fn organization_uri(id: u64) -> String {
    format!("{UM_API}/organizations/{id}")
}

pub fn geo_scope_uri(id: &str) -> String {
    format!("{UM_API}/geo_scopes/{id}")
}

pub fn bicycle_uri(id: u64) -> String {
    format!("{MY_API}/bicycles/{id}")
}

pub fn manufacturer_uri(id: u64) -> String {
    format!("{MY_API}/manufacturers/{id}")
}

/// A linked user referencing its organization, phones and geo scopes.
pub fn user(id: u64, organization: Option<u64>, geo_scopes: &[&str]) -> Object {
    let mut associations = json!({
        "phones": format!("{UM_API}/users/{id}/phones"),
        "geo_scopes": geo_scopes.iter().map(|gs| geo_scope_uri(gs)).collect::<Vec<_>>(),
    });
    if let Some(organization) = organization {
        associations["organization"] = json!(organization_uri(organization));
    }

    into_object(json!({
        "@context": USER_CONTEXT_URL,
        "@id": user_uri(id),
        "@type": "user",
        "id": id,
        "first_name": format!("User {id}"),
        "organization_id": organization,
        "@associations": associations,
    }))
}

pub fn organization(id: u64, name: &str) -> Value {
    json!({
        "@context": ORGANIZATION_CONTEXT_URL,
        "@id": organization_uri(id),
        "@type": "organization",
        "@associations": {},
        "id": id,
        "name": name,
    })
}

pub fn phone(id: u64, user_id: u64, number: &str) -> Value {
    json!({
        "@context": PHONE_CONTEXT_URL,
        "@id": format!("{UM_API}/users/{user_id}/phones/{id}"),
        "@type": "phone",
        "@associations": {"user": user_uri(user_id)},
        "id": id,
        "user_id": user_id,
        "number": number,
    })
}

pub fn geo_scope(id: &str, name: &str) -> Value {
    json!({
        "@context": GEO_SCOPE_CONTEXT_URL,
        "@id": geo_scope_uri(id),
        "@type": "geo_scope",
        "@associations": {},
        "id": id,
        "name": name,
    })
}

/// A schema bicycle linking its owner, manufacturer, activities and wheels.
pub fn bicycle(id: u64, owner: u64, manufacturer: u64, wheels: &[u64]) -> Object {
    let wheels: Vec<String> = wheels.iter().map(u64::to_string).collect();
    into_object(json!({
        "$schema": BICYCLE_SCHEMA_URL,
        "$id": bicycle_uri(id),
        "id": id,
        "name": format!("Bicycle {id}"),
        "owner_id": owner,
        "$links": {
            "owner": user_uri(owner),
            "manufacturer": manufacturer_uri(manufacturer),
            "activities": format!("{MY_API}/bicycles/{id}/activities"),
            "wheels": format!("{MY_API}/wheels/{}", wheels.join(",")),
        },
    }))
}

pub fn manufacturer(id: u64, name: &str) -> Value {
    json!({"$schema": MANUFACTURER_SCHEMA_URL, "$id": manufacturer_uri(id), "$links": {}, "id": id, "name": name})
}

pub fn activity(id: u64, bicycle_id: u64, title: &str) -> Value {
    json!({
        "$schema": ACTIVITY_SCHEMA_URL,
        "$id": format!("{MY_API}/activities/{id}"),
        "$links": {"bicycle": bicycle_uri(bicycle_id)},
        "id": id,
        "bicycle_id": bicycle_id,
        "title": title,
    })
}

pub fn wheel(id: u64, size: u64) -> Value {
    json!({"$schema": WHEEL_SCHEMA_URL, "$id": format!("{MY_API}/wheels/{id}"), "$links": {}, "id": id, "size": size})
}
