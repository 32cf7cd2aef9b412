//! High level entry point tying configuration and collaborators together.
//!
//! A [`Client`] owns one metadata provider, one network client (plain and
//! unfurling) and an [`AssociationResolver`] sharing them. All operations
//! observe the client's [`CancellationSignal`].
//!
//! ```rust,no_run
//! use linkgraph::client::{ActionOptions, Client};
//! use linkgraph::config::ClientConfig;
//!
//! # async fn example() -> linkgraph::core::Result<()> {
//! let config = ClientConfig::default().with_endpoint("um", "https://um.api.example.com");
//! let client = Client::new(config)?;
//!
//! let users = client
//!     .action("um.user", "query", ActionOptions::default().schema("id, first_name, organization { name }"))
//!     .await?;
//! println!("{} users", users.objects.len());
//! # Ok(())
//! # }
//! ```

use crate::config::ClientConfig;
use crate::core::{CancellationSignal, Object, ResolveError, Result};
use crate::metadata::{HttpMetadataProvider, MetadataProvider, ResourceMetadata};
use crate::network::{CallOptions, CallResult, HttpNetwork, NetworkClient, Unfurl};
use crate::resolver::{AssociationResolver, FetchResult, assign};
use crate::selection::Selection;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Options of [`Client::action`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionOptions {
    /// Template and query parameters
    pub params: BTreeMap<String, Value>,
    /// Request body
    pub body: Option<Value>,
    /// Extra request headers
    pub headers: BTreeMap<String, String>,
    /// Selection string applied to the result
    pub schema: Option<String>,
    /// Skip association resolution even if `schema` is set
    pub raw: bool,
    /// Follow pagination
    pub unfurl: bool,
}

impl ActionOptions {
    /// Builder style selection string.
    #[must_use]
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Builder style parameter.
    #[must_use]
    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Builder style body.
    #[must_use]
    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Resource client with association resolution.
#[derive(Clone)]
pub struct Client {
    config: Arc<ClientConfig>,
    metadata: Arc<dyn MetadataProvider>,
    network: Arc<dyn NetworkClient>,
    unfurl: Arc<dyn NetworkClient>,
    resolver: AssociationResolver,
    signal: CancellationSignal,
}

impl Client {
    /// Create a client talking HTTP.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ResolveError::Config {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        let config = Arc::new(config);
        let metadata: Arc<dyn MetadataProvider> = Arc::new(HttpMetadataProvider::new(http.clone(), config.clone()));
        let network: Arc<dyn NetworkClient> = Arc::new(HttpNetwork::new(http, config.clone(), metadata.clone()));

        Ok(Self::assemble(config, metadata, network))
    }

    /// Create a client with custom collaborators.
    #[must_use]
    pub fn with_collaborators(
        config: ClientConfig,
        metadata: Arc<dyn MetadataProvider>,
        network: Arc<dyn NetworkClient>,
    ) -> Self {
        Self::assemble(Arc::new(config), metadata, network)
    }

    fn assemble(
        config: Arc<ClientConfig>,
        metadata: Arc<dyn MetadataProvider>,
        network: Arc<dyn NetworkClient>,
    ) -> Self {
        let unfurl: Arc<dyn NetworkClient> = Arc::new(Unfurl::new(network.clone()));
        let signal = CancellationSignal::new();
        let resolver = AssociationResolver::new(metadata.clone(), unfurl.clone(), config.clone())
            .with_signal(signal.clone());

        Self {
            config,
            metadata,
            network,
            unfurl,
            resolver,
            signal,
        }
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Signal observed by every operation of this client.
    ///
    /// A fired signal stays fired: every later call of this client fails with
    /// [`ResolveError::Cancelled`]. Use [`with_signal`](Self::with_signal) to get
    /// a client for a new run.
    #[must_use]
    pub const fn signal(&self) -> &CancellationSignal {
        &self.signal
    }

    /// A client sharing this one's collaborators and metadata cache, observing `signal`.
    #[must_use]
    pub fn with_signal(&self, signal: CancellationSignal) -> Self {
        Self {
            resolver: self.resolver.clone().with_signal(signal.clone()),
            signal,
            ..self.clone()
        }
    }

    /// Metadata of a model identifier or metadata URL.
    pub async fn context(&self, id: &str) -> Result<Arc<ResourceMetadata>> {
        self.signal.run(self.metadata.metadata(id)).await
    }

    /// Invoke `operation` of `model`, then resolve `options.schema` on the result.
    pub async fn action(&self, model: &str, operation: &str, options: ActionOptions) -> Result<CallResult> {
        let selection = match (&options.schema, options.raw) {
            (Some(schema), false) => Some(Selection::parse(schema)?),
            _ => None,
        };
        let call = CallOptions {
            params: options.params,
            body: options.body,
            headers: options.headers,
        };

        let mut result = if options.unfurl {
            self.unfurl(model, operation, call).await?
        } else {
            self.signal.run(self.network.invoke(model, operation, call)).await?
        };

        if let Some(selection) = selection {
            result.objects = self.resolve(std::mem::take(&mut result.objects), &selection).await?;
        }
        Ok(result)
    }

    /// Invoke `operation` following pagination with the configured page size.
    pub async fn unfurl(&self, model: &str, operation: &str, mut options: CallOptions) -> Result<CallResult> {
        let per_in_body = options.body.as_ref().is_some_and(|body| body.get("per").is_some());
        if !per_in_body {
            options.params.entry("per".to_string()).or_insert_with(|| self.config.per_page.into());
        }
        self.signal.run(self.unfurl.invoke(model, operation, options)).await
    }

    /// Fetch association `name` for `owners` without assigning it.
    pub async fn fetch(&self, owners: &[Object], name: &str) -> Result<FetchResult> {
        self.resolver.fetch_association(owners, name).await
    }

    /// Assign a fetch result to `owners`.
    pub fn assign(&self, owners: &mut [Object], fetched: &FetchResult) {
        assign(owners, &fetched.objects, &fetched.name, fetched.many, &fetched.extracted);
    }

    /// Resolve `selection` on `owners`.
    pub async fn resolve(&self, owners: Vec<Object>, selection: &Selection) -> Result<Vec<Object>> {
        self.resolver.resolve(owners, selection).await
    }
}
