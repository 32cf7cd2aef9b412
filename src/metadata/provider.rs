//! Metadata lookup with a process-wide, single-flight cache.
//!
//! [`HttpMetadataProvider`] fetches metadata documents over HTTP and caches the
//! parsed [`ResourceMetadata`] per URL. Concurrent lookups of the same URL
//! coordinate through a `Pending(Notify)` / `Ready` state machine stored in a
//! [`DashMap`], so each URL is fetched at most once while the first fetch is
//! in flight. Failed fetches are not cached; the next lookup retries.

use super::ResourceMetadata;
use crate::config::ClientConfig;
use crate::constants::{LINKED_API_VERSION, PENDING_STATE_TIMEOUT, SCHEMA_API_VERSION, SCHEMA_MODEL_PREFIX};
use crate::core::{ResolveError, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Notify;

/// Read-only metadata lookup used by the resolver and the network layer.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Metadata for a model identifier (`um.user`, `mm3:my.bicycle`) or metadata URL.
    async fn metadata(&self, id: &str) -> Result<Arc<ResourceMetadata>>;
}

/// Turn a model identifier into the URL of its metadata document.
///
/// - `https://...` is used as-is, minus any query string
/// - `mm3:app.model` maps to `{endpoint}/v2021/schemas/{model}`
/// - `app.model` maps to `{endpoint}/v20140601/context/{model}`
pub fn resolve_metadata_url(id: &str, config: &ClientConfig) -> Result<String> {
    if id.starts_with("http://") || id.starts_with("https://") {
        return Ok(id.split('?').next().unwrap_or(id).to_string());
    }

    let (schema_dialect, app_model) = match id.strip_prefix(SCHEMA_MODEL_PREFIX) {
        Some(rest) => (true, rest),
        None => (false, id),
    };
    let (app, model) = app_model.split_once('.').ok_or_else(|| ResolveError::Config {
        message: format!("model identifier '{id}' is neither a URL nor 'app.model'"),
    })?;
    let endpoint = config.endpoint(app).ok_or_else(|| ResolveError::Config {
        message: format!("no endpoint configured for app '{app}'"),
    })?;
    let endpoint = endpoint.trim_end_matches('/');

    Ok(if schema_dialect {
        format!("{endpoint}/{SCHEMA_API_VERSION}/schemas/{model}")
    } else if endpoint.contains(LINKED_API_VERSION) {
        format!("{endpoint}/context/{model}")
    } else {
        format!("{endpoint}/{LINKED_API_VERSION}/context/{model}")
    })
}

#[derive(Debug, Clone)]
enum MetadataState {
    /// Another task is fetching this URL.
    Pending(Arc<Notify>),
    /// Parsed and ready.
    Ready(Arc<ResourceMetadata>),
}

/// Fetches metadata documents with reqwest and caches them per URL.
#[derive(Debug, Clone)]
pub struct HttpMetadataProvider {
    http: reqwest::Client,
    config: Arc<ClientConfig>,
    cache: Arc<DashMap<String, MetadataState>>,
}

impl HttpMetadataProvider {
    /// Create a provider using `http` for requests.
    #[must_use]
    pub fn new(http: reqwest::Client, config: Arc<ClientConfig>) -> Self {
        Self {
            http,
            config,
            cache: Arc::new(DashMap::new()),
        }
    }

    /// Number of cached (ready) entries.
    #[must_use]
    pub fn cached_len(&self) -> usize {
        self.cache.iter().filter(|entry| matches!(entry.value(), MetadataState::Ready(_))).count()
    }

    async fn fetch(&self, url: &str) -> Result<Arc<ResourceMetadata>> {
        tracing::debug!(target: "metadata", "Fetching metadata {}", url);

        let mut request = self.http.get(url).timeout(self.config.request_timeout());
        for (name, value) in &self.config.headers {
            request = request.header(name, value);
        }
        if let Some(timestamp) = self.config.timestamp {
            request = request.query(&[("t", timestamp)]);
        }

        let response = request.send().await.map_err(|e| ResolveError::metadata(url, e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ResolveError::metadata(url, format!("HTTP {status}")));
        }
        let document: Value =
            response.json().await.map_err(|e| ResolveError::metadata(url, e.to_string()))?;

        ResourceMetadata::from_document(url, document).map(Arc::new)
    }
}

/// Owner of a `Pending` entry.
///
/// Dropping the guard removes the entry if it is still the one this fetch
/// inserted and wakes its waiters, whether the fetch finished or its future
/// was dropped mid-flight.
struct PendingGuard {
    cache: Arc<DashMap<String, MetadataState>>,
    url: String,
    notify: Arc<Notify>,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.cache.remove_if(&self.url, |_, state| {
            matches!(state, MetadataState::Pending(notify) if Arc::ptr_eq(notify, &self.notify))
        });
        self.notify.notify_waiters();
    }
}

#[async_trait]
impl MetadataProvider for HttpMetadataProvider {
    async fn metadata(&self, id: &str) -> Result<Arc<ResourceMetadata>> {
        let url = resolve_metadata_url(id, &self.config)?;

        let guard = loop {
            let notify = match self.cache.entry(url.clone()) {
                Entry::Occupied(entry) => match entry.get() {
                    MetadataState::Ready(metadata) => return Ok(metadata.clone()),
                    MetadataState::Pending(notify) => notify.clone(),
                },
                Entry::Vacant(entry) => {
                    let notify = Arc::new(Notify::new());
                    entry.insert(MetadataState::Pending(notify.clone()));
                    break PendingGuard {
                        cache: self.cache.clone(),
                        url: url.clone(),
                        notify,
                    };
                }
            };

            let notified = notify.notified();
            tokio::pin!(notified);
            // The fetching task may have finished before we registered.
            match self.cache.get(&url).map(|entry| entry.value().clone()) {
                Some(MetadataState::Ready(metadata)) => return Ok(metadata),
                Some(MetadataState::Pending(current)) if Arc::ptr_eq(&current, &notify) => {}
                _ => continue,
            }

            if tokio::time::timeout(PENDING_STATE_TIMEOUT, &mut notified).await.is_err() {
                tracing::warn!(target: "metadata", "Timeout waiting for metadata {} - fetching directly", url);
                return self.fetch(&url).await;
            }
        };

        // We own the Pending entry: fetch and publish. Dropping the guard wakes waiters.
        let result = self.fetch(&url).await;
        match &result {
            Ok(metadata) => {
                self.cache.insert(url.clone(), MetadataState::Ready(metadata.clone()));
            }
            Err(e) => {
                tracing::debug!(target: "metadata", "Metadata fetch for {} failed: {}", url, e);
            }
        }
        drop(guard);

        result
    }
}
