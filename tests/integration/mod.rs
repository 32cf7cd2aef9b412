//! Integration test suite for linkgraph
//!
//! End-to-end tests through the public API and the `linkgraph` binary.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **cli**: the `linkgraph` binary against a local test server
//! - **http**: the reqwest-backed client against a local test server
//! - **resolution**: mixed-dialect graphs with in-memory collaborators

#[path = "../common/mod.rs"]
mod common;

mod cli;
mod http;
mod resolution;
