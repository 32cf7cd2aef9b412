//! linkgraph - association graph resolution for linked REST resources
//!
//! Resources served by the backend carry references to related resources
//! instead of embedding them. Given a set of such objects and a caller
//! supplied [`Selection`](selection::Selection), linkgraph fetches every
//! selected association with one batched call per association and nesting
//! level, and writes the results back onto the objects.
//!
//! # Architecture Overview
//!
//! Two metadata conventions are supported side by side:
//! - **Linked** objects carry `@id`, `@context` and an `@associations` map of
//!   reference URIs
//! - **Schema** objects carry `$id`, `$schema` and a `$links` map
//!
//! Resolution of one association goes through four steps:
//! 1. References of every owner are matched against the target type's URI
//!    templates to recover properties such as `organization_id`
//! 2. The properties are turned into the parameters of one bulk operation
//!    (`search`, `get` or `query`)
//! 3. The fetched objects are resolved recursively with the nested selection
//! 4. Each fetched object is assigned to the owners whose properties it matches
//!
//! Sibling associations resolve concurrently. A failing association is logged
//! and left `null`; only cancellation aborts a whole resolution.
//!
//! # Core Modules
//!
//! - [`client`] - [`Client`](client::Client) facade: actions, unfurling, resolution
//! - [`resolver`] - extraction, fetching, assignment and the recursive resolver
//! - [`selection`] - selection trees and their parser
//! - [`template`] - RFC 6570 URI templates: expansion and reverse matching
//! - [`metadata`] - metadata documents of both dialects and their cached provider
//! - [`network`] - backend calls over HTTP, response normalisation, pagination
//! - [`config`] - `~/.linkgraph/config.toml`
//! - [`core`] - errors, owner objects, cancellation
//! - [`cli`] - the `linkgraph` command
//!
//! # Example
//!
//! ```rust,no_run
//! use linkgraph::client::Client;
//! use linkgraph::config::ClientConfig;
//! use linkgraph::selection::Selection;
//!
//! # async fn example(users: Vec<linkgraph::core::Object>) -> anyhow::Result<()> {
//! let client = Client::new(ClientConfig::load().await?)?;
//! let selection = Selection::parse("first_name, organization { name }, phones")?;
//! let users = client.resolve(users, &selection).await?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod client;
pub mod config;
pub mod constants;
pub mod core;
pub mod metadata;
pub mod network;
pub mod resolver;
pub mod selection;
pub mod template;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
