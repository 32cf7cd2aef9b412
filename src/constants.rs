//! Global constants used throughout the linkgraph codebase.
//!
//! Timeouts, retry parameters and well-known keys that are shared between
//! modules live here so magic values stay discoverable.

use std::time::Duration;

/// Identity and bookkeeping fields that survive selection trimming.
pub const IDENTITY_KEYS: [&str; 7] =
    ["@id", "@context", "@type", "@associations", "$id", "$schema", "$links"];

/// Default page size used when unfurling paginated responses.
pub const DEFAULT_PER_PAGE: u64 = 100;

/// Default per-request timeout (30 seconds).
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default number of retries for transient network failures.
pub const DEFAULT_MAX_RETRIES: usize = 2;

/// Starting delay for exponential backoff (10ms).
pub const STARTING_BACKOFF_DELAY_MS: u64 = 10;

/// Maximum backoff delay for exponential backoff (500ms).
pub const MAX_BACKOFF_DELAY_MS: u64 = 500;

/// Timeout for waiting on another task's pending metadata fetch (10 seconds).
///
/// After it elapses the waiter fetches the metadata itself.
pub const PENDING_STATE_TIMEOUT: Duration = Duration::from_secs(10);

/// Version segment of the legacy linked-data API.
pub const LINKED_API_VERSION: &str = "v20140601";

/// Version segment of the schema API.
pub const SCHEMA_API_VERSION: &str = "v2021";

/// Prefix marking schema-dialect model identifiers (`mm3:app.model`).
pub const SCHEMA_MODEL_PREFIX: &str = "mm3:";
