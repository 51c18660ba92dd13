//! Error types for reconciliation passes.
//!
//! Only [`Error::Validation`] is ever recovered from, and only by a bulk
//! pass running in skip-and-warn mode. Everything else ends the pass and
//! leaves remote state as it was after the last applied entry.

use crate::types::Action;
use thiserror::Error;

/// Failures of the remote call layer
#[derive(Debug, Error)]
pub enum TransportError {
    /// The remote answered with a non-success HTTP status
    #[error("{path} returned HTTP {status}")]
    Status {
        /// API path that was called
        path: String,
        /// HTTP status code
        status: u16,
    },

    /// Connection, TLS or timeout failure
    #[error("network error calling {path}: {message}")]
    Network { path: String, message: String },

    /// The response body did not have the expected shape
    #[error("malformed response from {path}: {message}")]
    Malformed { path: String, message: String },

    /// The remote refused the payload (e.g. its own field validation)
    #[error("{path} rejected the request: {message}")]
    Rejected { path: String, message: String },
}

/// Errors that can end a reconciliation pass
#[derive(Debug, Error)]
pub enum Error {
    /// Desired config fails the resource kind's field constraints
    #[error("invalid config for '{entry}': {message}")]
    Validation { entry: String, message: String },

    /// More than one existing item matches the identity fields
    #[error("{count} existing {kind} entries match '{entry}' on its identity fields")]
    AmbiguousMatch {
        kind: String,
        entry: String,
        count: usize,
    },

    /// An update or delete was decided without a remote id to target
    #[error("no remote id known for '{entry}'")]
    MissingId { entry: String },

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A fatal failure, annotated with where the pass stopped
    #[error("failed to {action} '{entry}': {source}")]
    Entry {
        entry: String,
        action: Action,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Build a validation error
    pub fn validation(entry: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            entry: entry.into(),
            message: message.into(),
        }
    }

    /// Whether the error is a per-entry validation failure
    pub fn is_validation(&self) -> bool {
        match self {
            Self::Validation { .. } => true,
            Self::Entry { source, .. } => source.is_validation(),
            _ => false,
        }
    }

    /// Annotate the error with the entry and action in progress
    #[must_use]
    pub fn in_entry(self, entry: &str, action: Action) -> Self {
        match self {
            already @ Self::Entry { .. } => already,
            other => Self::Entry {
                entry: entry.to_string(),
                action,
                source: Box::new(other),
            },
        }
    }
}

/// Result type for reconciliation operations.
pub type Result<T> = std::result::Result<T, Error>;
