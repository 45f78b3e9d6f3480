//! Error types and result aliases shared across Credo components.
//!
//! `NotFound` is ordinary control flow for read accessors ("no trust result
//! yet") and must stay distinguishable from storage failures; callers match
//! on it via [`Error::is_not_found`] rather than inspecting messages.

use std::fmt;

/// The result type used throughout Credo.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Credo core operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An invalid identifier was provided.
    #[error("invalid identifier: {message}")]
    InvalidId {
        /// Description of what made the ID invalid.
        message: String,
    },

    /// The requested persisted entity does not exist.
    #[error("not found: {resource_type} with key {key}")]
    NotFound {
        /// The type of entity that was not found.
        resource_type: &'static str,
        /// The key that was looked up.
        key: String,
    },

    /// A storage operation failed.
    #[error("storage error: {message}")]
    Storage {
        /// Description of the storage failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A serialization or deserialization error occurred.
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of the serialization failure.
        message: String,
    },

    /// A commit could not durably finalize pending writes.
    #[error("commit failed: {message}")]
    Commit {
        /// Description of the commit failure.
        message: String,
    },

    /// An internal error occurred that should not happen in normal operation.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl Error {
    /// Creates a new storage error with the given message.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new storage error with a source cause.
    #[must_use]
    pub fn storage_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Storage {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new not-found error for the given entity type and key.
    #[must_use]
    pub fn not_found(resource_type: &'static str, key: impl fmt::Display) -> Self {
        Self::NotFound {
            resource_type,
            key: key.to_string(),
        }
    }

    /// Returns whether this error is a not-found condition.
    ///
    /// Read accessors use not-found as ordinary control flow, so callers
    /// frequently branch on this instead of treating the error as fatal.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
