//! Request body cleanup.
//!
//! Objects read from the backend carry bookkeeping that must not be sent back:
//! `@`-prefixed keys, validation `errors` and empty nested objects. [`clean_body`]
//! strips them recursively before a body is sent.

use serde_json::{Map, Value};

/// Clean a request body (object or array of objects).
#[must_use]
pub fn clean_body(body: &Value) -> Value {
    match body {
        Value::Array(items) => Value::Array(items.iter().map(clean_value).collect()),
        Value::Object(object) => Value::Object(clean_object(object)),
        other => other.clone(),
    }
}

fn clean_value(value: &Value) -> Value {
    match value {
        Value::Object(object) => Value::Object(clean_object(object)),
        other => other.clone(),
    }
}

fn clean_object(object: &Map<String, Value>) -> Map<String, Value> {
    let mut cleaned = Map::new();

    for (key, value) in object {
        if key.starts_with('@') || key == "errors" {
            continue;
        }
        match value {
            Value::Array(items) if items.first().is_some_and(Value::is_object) => {
                let items: Vec<Value> = items
                    .iter()
                    .map(clean_value)
                    .filter(|item| item.as_object().is_none_or(|o| !o.is_empty()))
                    .collect();
                cleaned.insert(key.clone(), Value::Array(items));
            }
            Value::Object(nested) => {
                let nested = clean_object(nested);
                if !nested.is_empty() {
                    cleaned.insert(key.clone(), Value::Object(nested));
                }
            }
            other => {
                cleaned.insert(key.clone(), other.clone());
            }
        }
    }

    cleaned
}
