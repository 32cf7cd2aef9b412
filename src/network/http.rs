//! reqwest-backed [`NetworkClient`].
//!
//! One invocation performs exactly one HTTP request (plus retries):
//!
//! 1. look up the operation in the model's metadata
//! 2. clean the body and derive template parameters from body and params
//! 3. expand the URI template, resolving relative templates against the
//!    metadata URL
//! 4. send with the operation's method, retrying transient failures
//! 5. turn the response into a [`CallResult`] and move embedded association
//!    data of linked objects into `@associations`

use super::format::clean_body;
use super::{CallOptions, CallResult, NetworkClient, Pagination};
use crate::config::ClientConfig;
use crate::constants::{MAX_BACKOFF_DELAY_MS, STARTING_BACKOFF_DELAY_MS};
use crate::core::object::ASSOCIATIONS_KEY;
use crate::core::{Object, ResolveError, Result, loose_string};
use crate::metadata::{MetadataCapability, MetadataProvider, Operation};
use crate::template::TemplateValues;
use async_trait::async_trait;
use futures::future::join_all;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;
use tokio_retry::RetryIf;
use tokio_retry::strategy::ExponentialBackoff;

const PAGINATION_PROPS: [&str; 3] = ["total_pages", "total_count", "current_page"];

/// Performs backend operations over HTTP.
#[derive(Clone)]
pub struct HttpNetwork {
    http: reqwest::Client,
    config: Arc<ClientConfig>,
    metadata: Arc<dyn MetadataProvider>,
}

impl HttpNetwork {
    /// Create a network client sharing `metadata` with the resolver.
    #[must_use]
    pub fn new(http: reqwest::Client, config: Arc<ClientConfig>, metadata: Arc<dyn MetadataProvider>) -> Self {
        Self {
            http,
            config,
            metadata,
        }
    }

    async fn send(
        &self,
        method: &reqwest::Method,
        url: &reqwest::Url,
        headers: &BTreeMap<String, String>,
        body: Option<&Value>,
    ) -> Result<(Value, BTreeMap<String, String>)> {
        let mut request = self.http.request(method.clone(), url.clone()).timeout(self.config.request_timeout());
        for (name, value) in self.config.headers.iter().chain(headers) {
            request = request.header(name, value);
        }
        if let Some(timestamp) = self.config.timestamp {
            request = request.query(&[("t", timestamp)]);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| ResolveError::Network {
            message: e.to_string(),
            status: e.status().map(|s| s.as_u16()),
            url: Some(url.to_string()),
        })?;

        let status = response.status();
        let response_headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.to_string(), v.to_string())))
            .collect();
        let text = response.text().await.map_err(|e| ResolveError::Network {
            message: e.to_string(),
            status: Some(status.as_u16()),
            url: Some(url.to_string()),
        })?;
        let body: Value = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).map_err(|e| ResolveError::Network {
                message: format!("invalid JSON response: {e}"),
                status: Some(status.as_u16()),
                url: Some(url.to_string()),
            })?
        };

        if !status.is_success() {
            let description = body.get("description").and_then(Value::as_str).map(str::to_string);
            return Err(ResolveError::Network {
                message: description.unwrap_or_else(|| format!("HTTP {status}")),
                status: Some(status.as_u16()),
                url: Some(url.to_string()),
            });
        }

        Ok((body, response_headers))
    }

    /// Replace embedded association data of linked objects by references.
    ///
    /// Every association declared by the object's context ends up `null` on the
    /// object, with the referenced `@id`(s) stored under `@associations`.
    async fn link_associations(&self, objects: &mut [Object]) -> Result<()> {
        let contexts: BTreeSet<String> = objects
            .iter()
            .filter_map(|object| object.get("@context").and_then(Value::as_str).map(str::to_string))
            .collect();
        let lookups = contexts.into_iter().map(|context| async move {
            let metadata = self.metadata.metadata(&context).await;
            (context, metadata)
        });

        let mut associations_by_context = BTreeMap::new();
        for (context, metadata) in join_all(lookups).await {
            let names: Vec<String> = metadata?.associations().keys().cloned().collect();
            associations_by_context.insert(context, names);
        }

        for object in objects.iter_mut() {
            let Some(names) = object
                .get("@context")
                .and_then(Value::as_str)
                .and_then(|context| associations_by_context.get(context))
            else {
                continue;
            };

            let mut references = Map::new();
            for name in names {
                if let Some(reference) = object.get(name).and_then(embedded_reference) {
                    references.insert(name.clone(), reference);
                }
                object.insert(name.clone(), Value::Null);
            }
            object.insert(ASSOCIATIONS_KEY.to_string(), Value::Object(references));
        }

        Ok(())
    }
}

#[async_trait]
impl NetworkClient for HttpNetwork {
    async fn invoke(&self, model: &str, operation_name: &str, options: CallOptions) -> Result<CallResult> {
        let metadata = self.metadata.metadata(model).await?;
        let operation = metadata.find_operation(operation_name).ok_or_else(|| {
            ResolveError::metadata(model, format!("operation '{operation_name}' is not declared"))
        })?;

        let body = options.body.as_ref().map(clean_body);
        let params = template_params(operation, body.as_ref(), &options.params);
        for variable in missing_required_params(operation, &params) {
            tracing::warn!(target: "network", "Required param '{}' for '{}' missing!", variable, operation.template);
        }

        let template = operation.uri_template()?;
        let expanded = template.expand(&params);
        let url = if template.is_relative() {
            reqwest::Url::parse(metadata.url()).and_then(|base| base.join(&expanded))
        } else {
            reqwest::Url::parse(&expanded)
        }
        .map_err(|e| ResolveError::InvalidTemplate {
            template: operation.template.clone(),
            reason: e.to_string(),
        })?;

        let method = reqwest::Method::from_bytes(operation.http_method().as_bytes()).map_err(|e| {
            ResolveError::metadata(model, format!("invalid method '{}': {e}", operation.method))
        })?;
        let send_body = if method == reqwest::Method::GET { None } else { body.as_ref() };

        tracing::debug!(
            target: "network",
            "{} {} ({}.{}, params: {:?})",
            method,
            url,
            model,
            operation_name,
            params.keys().collect::<Vec<_>>()
        );

        let strategy = ExponentialBackoff::from_millis(STARTING_BACKOFF_DELAY_MS)
            .max_delay(Duration::from_millis(MAX_BACKOFF_DELAY_MS))
            .take(self.config.max_retries);
        let (response, headers) = RetryIf::start(
            strategy,
            || self.send(&method, &url, &options.headers, send_body),
            is_transient,
        )
        .await?;

        let mut result = parse_response(response, headers);
        self.link_associations(&mut result.objects).await?;
        Ok(result)
    }
}

fn is_transient(error: &ResolveError) -> bool {
    match error {
        ResolveError::Network { status: None, .. } => true,
        ResolveError::Network { status: Some(status), .. } => *status >= 500,
        _ => false,
    }
}

fn values_of(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().map(loose_string).collect(),
        Value::Null => Vec::new(),
        other => vec![loose_string(other)],
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Template parameters from mapped body properties, mapped params and params.
///
/// Params are also read through the mappings so a source property name
/// (`asset_id`) fills a differently named variable (`asset_ids`).
fn template_params(operation: &Operation, body: Option<&Value>, params: &BTreeMap<String, Value>) -> TemplateValues {
    let mut result = TemplateValues::new();

    let mut apply_mappings = |source: &dyn Fn(&str) -> Option<Value>| {
        for mapping in &operation.mappings {
            if let Some(value) = source(&mapping.source).filter(truthy) {
                result.insert(mapping.variable.clone(), values_of(&value));
            }
        }
    };
    if let Some(body) = body {
        apply_mappings(&|name| body.get(name).cloned());
    }
    apply_mappings(&|name| params.get(name).cloned());

    for (name, value) in params {
        result.insert(name.clone(), values_of(value));
    }
    result
}

/// Required mapping variables with no value. The call is still sent.
fn missing_required_params<'a>(operation: &'a Operation, params: &TemplateValues) -> Vec<&'a str> {
    operation
        .mappings
        .iter()
        .filter(|mapping| mapping.required && params.get(&mapping.variable).is_none_or(Vec::is_empty))
        .map(|mapping| mapping.variable.as_str())
        .collect()
}

fn embedded_reference(data: &Value) -> Option<Value> {
    match data {
        Value::Array(items) => Some(Value::Array(
            items.iter().filter_map(|item| item.get("@id").cloned()).collect(),
        )),
        Value::Object(object) => object.get("@id").cloned(),
        _ => None,
    }
}

fn parse_response(body: Value, headers: BTreeMap<String, String>) -> CallResult {
    let objects: Vec<Object> = match body.get("members").and_then(Value::as_array) {
        Some(members) => members.iter().filter_map(Value::as_object).cloned().collect(),
        None => match &body {
            Value::Object(object) if !object.is_empty() => vec![object.clone()],
            _ => Vec::new(),
        },
    };

    let has_pagination = ["total_count", "@total_count"]
        .iter()
        .any(|key| body.get(*key).is_some_and(truthy));
    let pagination = has_pagination.then(|| {
        let read = |prop: &str| {
            body.get(prop)
                .filter(|v| truthy(v))
                .or_else(|| body.get(format!("@{prop}")))
                .and_then(Value::as_u64)
                .unwrap_or_default()
        };
        let [total_pages, total_count, current_page] = PAGINATION_PROPS.map(read);
        Pagination {
            total_pages,
            total_count,
            current_page,
        }
    });

    let aggregations = body.get("aggregations").and_then(Value::as_object).map(|aggregations| {
        let converted: Map<String, Value> = aggregations
            .iter()
            .map(|(name, aggregation)| {
                let buckets = aggregation
                    .get("buckets")
                    .and_then(Value::as_array)
                    .map(|buckets| {
                        buckets
                            .iter()
                            .map(|bucket| {
                                serde_json::json!({
                                    "value": bucket.get("key").cloned().unwrap_or(Value::Null),
                                    "count": bucket.get("doc_count").cloned().unwrap_or(Value::Null),
                                })
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                (name.clone(), Value::Array(buckets))
            })
            .collect();
        Value::Object(converted)
    });

    CallResult {
        objects,
        pagination,
        headers,
        type_name: body.get("@type").and_then(Value::as_str).map(str::to_string),
        aggregations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::Mapping;
    use serde_json::json;

    fn operation() -> Operation {
        Operation {
            method: "get".to_string(),
            template: "https://um.example.com/v20140601/assets/{asset_ids}/products/{product_ids}".to_string(),
            mappings: vec![
                Mapping {
                    source: "asset_id".to_string(),
                    variable: "asset_ids".to_string(),
                    required: true,
                },
                Mapping {
                    source: "id".to_string(),
                    variable: "product_ids".to_string(),
                    required: false,
                },
            ],
        }
    }

    #[test]
    fn test_template_params_from_body_and_params() {
        let body = json!({"id": 7, "asset_id": 0});
        let params = BTreeMap::from([("asset_id".to_string(), json!([1, 2]))]);

        let result = template_params(&operation(), Some(&body), &params);
        assert_eq!(result["asset_ids"], vec!["1", "2"]);
        assert_eq!(result["product_ids"], vec!["7"]);
        assert_eq!(result["asset_id"], vec!["1", "2"]);
        assert!(missing_required_params(&operation(), &result).is_empty());
    }

    #[test]
    fn test_missing_required_params() {
        let params = TemplateValues::from([("product_ids".to_string(), vec!["7".to_string()])]);
        assert_eq!(missing_required_params(&operation(), &params), vec!["asset_ids"]);

        let params = TemplateValues::from([("asset_ids".to_string(), Vec::new())]);
        assert_eq!(missing_required_params(&operation(), &params), vec!["asset_ids"]);
    }

    #[test]
    fn test_parse_collection_response() {
        let body = json!({
            "@type": "collection",
            "members": [{"id": 1}, {"id": 2}],
            "@total_count": 250,
            "@total_pages": 3,
            "@current_page": 1,
            "aggregations": {
                "status": {"buckets": [{"key": "active", "doc_count": 12}]}
            }
        });

        let result = parse_response(body, BTreeMap::new());
        assert_eq!(result.objects.len(), 2);
        assert_eq!(result.type_name.as_deref(), Some("collection"));
        assert_eq!(
            result.pagination,
            Some(Pagination {
                total_pages: 3,
                total_count: 250,
                current_page: 1
            })
        );
        assert_eq!(result.aggregations, Some(json!({"status": [{"value": "active", "count": 12}]})));
    }

    #[test]
    fn test_parse_single_object_and_empty_responses() {
        let result = parse_response(json!({"id": 1, "name": "Acme"}), BTreeMap::new());
        assert_eq!(result.objects.len(), 1);
        assert!(result.pagination.is_none());

        assert!(parse_response(Value::Null, BTreeMap::new()).objects.is_empty());
        assert!(parse_response(json!({}), BTreeMap::new()).objects.is_empty());
    }

    #[test]
    fn test_embedded_reference() {
        assert_eq!(embedded_reference(&json!({"@id": "org/1", "name": "Acme"})), Some(json!("org/1")));
        assert_eq!(
            embedded_reference(&json!([{"@id": "gs/1"}, {"@id": "gs/2"}])),
            Some(json!(["gs/1", "gs/2"]))
        );
        assert_eq!(embedded_reference(&json!("org/1")), None);
    }

    #[test]
    fn test_transient_errors() {
        assert!(is_transient(&ResolveError::network("connection refused")));
        assert!(is_transient(&ResolveError::Network {
            message: "bad gateway".to_string(),
            status: Some(502),
            url: None
        }));
        assert!(!is_transient(&ResolveError::Network {
            message: "not found".to_string(),
            status: Some(404),
            url: None
        }));
        assert!(!is_transient(&ResolveError::Cancelled));
    }
}
