//! Pagination following.

use super::{CallOptions, CallResult, NetworkClient};
use crate::constants::DEFAULT_PER_PAGE;
use crate::core::Result;
use async_trait::async_trait;
use futures::future::try_join_all;
use serde_json::Value;

/// Wraps a [`NetworkClient`] and fetches every remaining page of paginated
/// responses concurrently, concatenating the objects in page order.
///
/// The returned result reports a single page.
#[derive(Debug, Clone)]
pub struct Unfurl<C> {
    inner: C,
}

impl<C: NetworkClient> Unfurl<C> {
    /// Wrap `inner`.
    pub const fn new(inner: C) -> Self {
        Self {
            inner,
        }
    }

    /// The wrapped client.
    pub const fn inner(&self) -> &C {
        &self.inner
    }
}

fn page_size(options: &CallOptions) -> u64 {
    options
        .params
        .get("per")
        .and_then(Value::as_u64)
        .or_else(|| options.body.as_ref().and_then(|body| body.get("per")).and_then(Value::as_u64))
        .filter(|per| *per > 0)
        .unwrap_or(DEFAULT_PER_PAGE)
}

fn page_options(options: &CallOptions, page: u64, per: u64) -> CallOptions {
    let mut options = options.clone();
    options.params.insert("page".to_string(), page.into());
    options.params.insert("per".to_string(), per.into());
    if let Some(Value::Object(body)) = options.body.as_mut() {
        body.insert("page".to_string(), page.into());
        body.insert("per".to_string(), per.into());
    }
    options
}

#[async_trait]
impl<C: NetworkClient> NetworkClient for Unfurl<C> {
    async fn invoke(&self, model: &str, operation: &str, options: CallOptions) -> Result<CallResult> {
        let per = page_size(&options);
        let start_page = options.params.get("page").and_then(Value::as_u64).unwrap_or(1);

        let mut result = self.inner.invoke(model, operation, options.clone()).await?;
        let Some(total_pages) = result.pagination.map(|pagination| pagination.total_pages) else {
            return Ok(result);
        };

        if start_page < total_pages {
            tracing::debug!(
                target: "network",
                "Unfurling {}.{}: pages {}..={} ({} per page)",
                model,
                operation,
                start_page + 1,
                total_pages,
                per
            );
            let pages = (start_page + 1..=total_pages)
                .map(|page| self.inner.invoke(model, operation, page_options(&options, page, per)));
            for page in try_join_all(pages).await? {
                result.objects.extend(page.objects);
            }
        }
        if let Some(pagination) = result.pagination.as_mut() {
            pagination.total_pages = 1;
        }

        Ok(result)
    }
}
