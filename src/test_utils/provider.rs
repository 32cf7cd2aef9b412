use crate::core::{ResolveError, Result};
use crate::metadata::{MetadataProvider, ResourceMetadata};
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Serves metadata documents registered by URL and counts lookups.
#[derive(Debug, Clone, Default)]
pub struct StaticMetadataProvider {
    documents: Arc<BTreeMap<String, Value>>,
    lookups: Arc<DashMap<String, usize>>,
}

impl StaticMetadataProvider {
    /// An empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `document` under `url`.
    #[must_use]
    pub fn with_document(mut self, url: impl Into<String>, document: Value) -> Self {
        Arc::make_mut(&mut self.documents).insert(url.into(), document);
        self
    }

    /// How often `url` was looked up.
    #[must_use]
    pub fn lookups(&self, url: &str) -> usize {
        self.lookups.get(url).map_or(0, |count| *count)
    }
}

#[async_trait]
impl MetadataProvider for StaticMetadataProvider {
    async fn metadata(&self, id: &str) -> Result<Arc<ResourceMetadata>> {
        let url = id.split('?').next().unwrap_or(id);
        *self.lookups.entry(url.to_string()).or_default() += 1;

        let document = self
            .documents
            .get(url)
            .cloned()
            .ok_or_else(|| ResolveError::metadata(url, "no such metadata document"))?;
        ResourceMetadata::from_document(url, document).map(Arc::new)
    }
}
