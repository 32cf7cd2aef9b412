//! Core types shared by every layer of linkgraph
//!
//! - [`error`] - the [`ResolveError`] taxonomy and user-facing [`ErrorContext`]
//! - [`object`] - owner objects, their dialects and stored references
//! - [`cancel`] - the [`CancellationSignal`] observed during resolution

pub mod cancel;
pub mod error;
pub mod object;

pub use cancel::CancellationSignal;
pub use error::{ErrorContext, ResolveError, Result, user_friendly_error};
pub use object::{Object, OwnerDialect, Reference, identity, loose_string};
