//! Test utilities for linkgraph
//!
//! In-memory collaborators and fixtures for exercising the resolver without a
//! backend:
//! - [`StaticMetadataProvider`] serves metadata documents from memory
//! - [`MockNetwork`] answers backend calls with canned results and records them
//! - [`fixtures`] holds linked contexts and JSON schemas of a small user /
//!   organization / bicycle domain
//!
//! # Example
//!
//! ```rust,no_run
//! use linkgraph::test_utils::{MockNetwork, fixtures};
//! use serde_json::json;
//!
//! let provider = fixtures::provider();
//! let network = MockNetwork::new()
//!     .respond(fixtures::ORGANIZATION_CONTEXT_URL, "get", vec![json!({"@id": fixtures::organization_uri(9)})]);
//! ```

pub mod fixtures;
mod network;
mod provider;

pub use network::{MockNetwork, RecordedCall};
pub use provider::StaticMetadataProvider;

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. Uses `level` if given, else `RUST_LOG`;
/// with neither, logging stays off.
///
/// ```bash
/// RUST_LOG=resolver=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}
