//! Backend invocation.
//!
//! The resolver only ever talks to the backend through [`NetworkClient`]: given
//! a model identifier, an operation name and [`CallOptions`], it performs the
//! call and returns the matched objects. Implementations:
//!
//! - [`HttpNetwork`] performs a single reqwest call per invocation
//! - [`Unfurl`] wraps another client and follows pagination

pub mod format;
pub mod http;
pub mod unfurl;

use crate::core::{Object, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

pub use http::HttpNetwork;
pub use unfurl::Unfurl;

/// Parameters and body of one backend call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallOptions {
    /// Template parameters (and, for reads, query parameters).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, Value>,
    /// Request body for POST-like operations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    /// Extra request headers.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

impl CallOptions {
    /// Options carrying only template parameters.
    #[must_use]
    pub fn with_params(params: BTreeMap<String, Value>) -> Self {
        Self {
            params,
            ..Self::default()
        }
    }

    /// Builder style body.
    #[must_use]
    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Pagination reported by a collection response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Total pages available
    pub total_pages: u64,
    /// Total objects available
    pub total_count: u64,
    /// Page this response holds
    pub current_page: u64,
}

/// Result of one backend call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CallResult {
    /// Matched objects, in response order.
    pub objects: Vec<Object>,
    /// Present for paginated collection responses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    /// Response headers.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    /// `@type` of the response body.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    /// Aggregations as `name -> [{value, count}]`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregations: Option<Value>,
}

impl CallResult {
    /// A result holding just `objects`.
    #[must_use]
    pub fn from_objects(objects: Vec<Object>) -> Self {
        Self {
            objects,
            ..Self::default()
        }
    }

    /// First object, if any.
    #[must_use]
    pub fn object(&self) -> Option<&Object> {
        self.objects.first()
    }
}

/// Performs backend operations.
#[async_trait]
pub trait NetworkClient: Send + Sync {
    /// Invoke `operation` of `model` (a model identifier or metadata URL).
    async fn invoke(&self, model: &str, operation: &str, options: CallOptions) -> Result<CallResult>;
}

#[async_trait]
impl<T: NetworkClient + ?Sized> NetworkClient for Arc<T> {
    async fn invoke(&self, model: &str, operation: &str, options: CallOptions) -> Result<CallResult> {
        (**self).invoke(model, operation, options).await
    }
}
