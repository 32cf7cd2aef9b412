//! Configuration management for linkgraph
//!
//! A single [`ClientConfig`] drives every layer: the metadata provider resolves
//! model identifiers through its `endpoints`, the network layer sends its
//! `headers` and honours `max_retries`, `request_timeout_secs` and `per_page`,
//! and the resolver merges `default_associations_search` into association
//! searches.
//!
//! **Location:** `~/.linkgraph/config.toml`, overridable with `--config`.

mod client;

pub use client::ClientConfig;
