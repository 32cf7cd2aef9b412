//! Client configuration.
//!
//! `ClientConfig` is loaded from `~/.linkgraph/config.toml` (or an explicit path)
//! and can be layered with [`ClientConfig::merge`], later values winning:
//!
//! ```toml
//! verbose = false
//! max_retries = 2
//!
//! [endpoints]
//! um = "https://um.api.example.com"
//! my = "https://my.api.example.com"
//!
//! [headers]
//! "Affiliation-Id" = "acme"
//!
//! [default_associations_search.organization]
//! search = { filters = [["active", "eq", true]] }
//! ```

use crate::constants::{DEFAULT_MAX_RETRIES, DEFAULT_PER_PAGE, DEFAULT_REQUEST_TIMEOUT_SECS};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

const fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

const fn default_max_retries() -> usize {
    DEFAULT_MAX_RETRIES
}

const fn default_per_page() -> u64 {
    DEFAULT_PER_PAGE
}

fn default_headers() -> BTreeMap<String, String> {
    BTreeMap::from([("Accept".to_string(), "application/json".to_string())])
}

fn default_timestamp() -> Option<i64> {
    Some(chrono::Utc::now().timestamp())
}

/// Settings shared by the metadata provider, the network layer and the resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL per application, used to resolve `app.model` identifiers.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub endpoints: BTreeMap<String, String>,

    /// Headers sent with every request.
    #[serde(default = "default_headers")]
    pub headers: BTreeMap<String, String>,

    /// Log request details and resolution failures at debug level.
    #[serde(default)]
    pub verbose: bool,

    /// Cache busting `t` query parameter; `None` disables it.
    #[serde(default = "default_timestamp")]
    pub timestamp: Option<i64>,

    /// Search bodies merged into association searches, keyed by association name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub default_associations_search: BTreeMap<String, Value>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Retries for transient network failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Page size used when unfurling paginated responses.
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoints: BTreeMap::new(),
            headers: default_headers(),
            verbose: false,
            timestamp: default_timestamp(),
            default_associations_search: BTreeMap::new(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl ClientConfig {
    /// Load from the default location, falling back to defaults if the file is missing.
    pub async fn load() -> Result<Self> {
        let path = Self::default_path()?;
        if path.exists() { Self::load_from(&path).await } else { Ok(Self::default()) }
    }

    /// Load from `path` if given and present, else from the default location.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => Self::default_path()?,
        };
        if path.exists() { Self::load_from(&path).await } else { Ok(Self::default()) }
    }

    /// Load from a TOML file.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// `~/.linkgraph/config.toml`
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?;
        Ok(home.join(".linkgraph").join("config.toml"))
    }

    /// Overlay `other` on top of `self`.
    ///
    /// Maps are merged key-wise; numeric settings are taken from `other` when
    /// they differ from the defaults. The timestamp always comes from `other`.
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        let defaults = Self::default();
        let mut merged = self.clone();

        merged.endpoints.extend(other.endpoints.clone());
        merged.headers.extend(other.headers.clone());
        merged.default_associations_search.extend(other.default_associations_search.clone());

        merged.verbose |= other.verbose;
        merged.timestamp = other.timestamp;
        if other.request_timeout_secs != defaults.request_timeout_secs {
            merged.request_timeout_secs = other.request_timeout_secs;
        }
        if other.max_retries != defaults.max_retries {
            merged.max_retries = other.max_retries;
        }
        if other.per_page != defaults.per_page {
            merged.per_page = other.per_page;
        }

        merged
    }

    /// Builder style endpoint registration.
    #[must_use]
    pub fn with_endpoint(mut self, app: impl Into<String>, url: impl Into<String>) -> Self {
        self.endpoints.insert(app.into(), url.into());
        self
    }

    /// Configured endpoint of an application.
    #[must_use]
    pub fn endpoint(&self, app: &str) -> Option<&str> {
        self.endpoints.get(app).map(String::as_str)
    }

    /// Per-request timeout as a [`Duration`].
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
