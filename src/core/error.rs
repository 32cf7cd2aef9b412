//! Error handling for linkgraph
//!
//! The resolver distinguishes two kinds of failure:
//! 1. **Branch-fatal errors** that only affect the association being resolved.
//!    They are caught at that association's boundary, the association is set to
//!    `null` on every owner and resolution of its siblings continues.
//! 2. **Cancellation**, which aborts the entire `resolve` call.
//!
//! [`ResolveError::is_cancellation`] is the single place that encodes this split.
//!
//! # Error Categories
//!
//! - **Association resolution**: [`ResolveError::AssociationNotFound`],
//!   [`ResolveError::UnresolvableAssociationAction`]
//! - **Collaborators**: [`ResolveError::Network`], [`ResolveError::Metadata`]
//! - **Control flow**: [`ResolveError::Cancelled`]
//! - **Caller input**: [`ResolveError::InvalidSelection`],
//!   [`ResolveError::InvalidTemplate`], [`ResolveError::Config`]
//!
//! Application boundaries (CLI, configuration files) work with [`anyhow::Error`];
//! [`user_friendly_error`] turns one into an [`ErrorContext`] with a suggestion.
//!
//! # Examples
//!
//! ```rust,no_run
//! use linkgraph::core::{ResolveError, user_friendly_error};
//!
//! let err = ResolveError::AssociationNotFound { name: "organization".to_string() };
//! assert!(!err.is_cancellation());
//!
//! let ctx = user_friendly_error(anyhow::Error::from(err));
//! ctx.display(); // coloured output on stderr
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The error type for association resolution and its collaborators.
///
/// Only [`ResolveError::Cancelled`] is allowed to escape a `resolve` call;
/// every other variant is absorbed at the boundary of the association that
/// produced it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// None of the owners' metadata declares the requested association.
    #[error("could not find the requested association '{name}'")]
    AssociationNotFound {
        /// Association name that was requested
        name: String,
    },

    /// No candidate operation of the associated type can be satisfied by the
    /// properties extracted from the owners' references.
    #[error("could not find the association action to resolve data for '{name}'")]
    UnresolvableAssociationAction {
        /// Association name that could not be resolved
        name: String,
    },

    /// The backend call failed.
    #[error("Network error: {message}")]
    Network {
        /// Human readable failure description
        message: String,
        /// HTTP status, if a response was received
        status: Option<u16>,
        /// Request URL, if known
        url: Option<String>,
    },

    /// The resolution was cancelled through its [`CancellationSignal`](super::CancellationSignal).
    #[error("Request was aborted")]
    Cancelled,

    /// Metadata for a resource type could not be fetched or understood.
    #[error("Failed to load metadata '{id}': {message}")]
    Metadata {
        /// Model identifier or metadata URL
        id: String,
        /// What went wrong
        message: String,
    },

    /// A selection string could not be parsed.
    #[error("Invalid selection '{input}': {reason}")]
    InvalidSelection {
        /// The offending selection string
        input: String,
        /// Parser diagnostic
        reason: String,
    },

    /// A URI template could not be parsed.
    #[error("Invalid URI template '{template}': {reason}")]
    InvalidTemplate {
        /// The offending template
        template: String,
        /// Parser diagnostic
        reason: String,
    },

    /// The client configuration cannot serve the request.
    #[error("Configuration error: {message}")]
    Config {
        /// What is missing or wrong
        message: String,
    },
}

impl ResolveError {
    /// Returns `true` for the one error category that aborts a whole resolution.
    #[must_use]
    pub const fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Shorthand for a [`ResolveError::Network`] without status or URL.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            status: None,
            url: None,
        }
    }

    /// Shorthand for a [`ResolveError::Metadata`].
    pub fn metadata(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Metadata {
            id: id.into(),
            message: message.into(),
        }
    }
}

/// Result alias used throughout the library.
pub type Result<T, E = ResolveError> = std::result::Result<T, E>;

/// A [`ResolveError`] enriched with details and a suggestion for CLI users.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: ResolveError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub const fn new(error: ResolveError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add details explaining the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr: error in red, details in yellow, suggestion in green.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

fn create_error_context(error: ResolveError) -> ErrorContext {
    match &error {
        ResolveError::Config { .. } => ErrorContext::new(error)
            .with_suggestion("Add the missing endpoint to ~/.linkgraph/config.toml under [endpoints]")
            .with_details("Model identifiers like 'um.user' are resolved through the configured endpoints"),
        ResolveError::Network { status: Some(status), .. } if *status == 401 || *status == 403 => {
            ErrorContext::new(error)
                .with_suggestion("Check the session headers configured under [headers]")
        }
        ResolveError::Network { .. } => ErrorContext::new(error)
            .with_suggestion("Check your network connection and the configured endpoints")
            .with_details("Transient failures are retried; raise max_retries for flaky backends"),
        ResolveError::Metadata { .. } => ErrorContext::new(error)
            .with_suggestion("Verify the model identifier, e.g. 'um.user' or 'mm3:my.bicycle'"),
        ResolveError::InvalidSelection { .. } => ErrorContext::new(error)
            .with_suggestion("Selections look like 'id, name, organization { name }'"),
        _ => ErrorContext::new(error),
    }
}

/// Convert any error into an [`ErrorContext`] suitable for terminal display.
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(resolve_error) = error.downcast_ref::<ResolveError>() {
        return create_error_context(resolve_error.clone());
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(ResolveError::Config {
            message: toml_error.to_string(),
        })
        .with_suggestion("Check the TOML syntax of your configuration file");
    }

    if let Some(json_error) = error.downcast_ref::<serde_json::Error>() {
        return ErrorContext::new(ResolveError::Config {
            message: format!("invalid JSON input: {json_error}"),
        })
        .with_suggestion("Pass request bodies as valid JSON objects");
    }

    ErrorContext::new(ResolveError::Config {
        message: format!("{error:#}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_cancellation_aborts() {
        assert!(ResolveError::Cancelled.is_cancellation());
        assert!(!ResolveError::network("boom").is_cancellation());
        assert!(
            !ResolveError::AssociationNotFound {
                name: "org".to_string()
            }
            .is_cancellation()
        );
    }

    #[test]
    fn test_error_messages() {
        let err = ResolveError::UnresolvableAssociationAction {
            name: "wheels".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "could not find the association action to resolve data for 'wheels'"
        );
        assert_eq!(ResolveError::Cancelled.to_string(), "Request was aborted");
    }

    #[test]
    fn test_user_friendly_error_suggestions() {
        let ctx = user_friendly_error(anyhow::Error::from(ResolveError::Config {
            message: "no endpoint configured for app 'um'".to_string(),
        }));
        assert!(ctx.suggestion.unwrap().contains("[endpoints]"));

        let ctx = user_friendly_error(anyhow::anyhow!("something else"));
        assert!(ctx.to_string().contains("something else"));
    }

    #[test]
    fn test_error_context_display() {
        let ctx = ErrorContext::new(ResolveError::Cancelled)
            .with_details("the signal fired")
            .with_suggestion("retry");
        let rendered = ctx.to_string();
        assert!(rendered.contains("Details: the signal fired"));
        assert!(rendered.contains("Suggestion: retry"));
    }
}
