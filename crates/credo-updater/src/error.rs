//! Error types for the update engine.
//!
//! Missing-dependency signals are **not** errors here - they are outcome
//! variants on the evaluator contracts (`RevisionOutcome`, `VoteOutcome`),
//! and lock contention is a value (`LockAcquisition::Busy`). What remains
//! in this enum is genuinely fatal to the current run.

use credo_core::{PageId, RevisionId};

/// The result type used throughout credo-updater.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in update-engine operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A revision reported itself as its own missing ancestor.
    ///
    /// Guards the dependency-resolution loop against a self-referential
    /// evaluator bug; not expected to fire.
    #[error("revision {revision_id} reported itself as its missing ancestor")]
    SelfDependency {
        /// The revision that named itself.
        revision_id: RevisionId,
    },

    /// A missing ancestor belongs to a different page.
    ///
    /// The engine holds exactly one page lock while resolving dependencies,
    /// so a cross-page ancestor cannot be backfilled safely.
    #[error("revision {revision_id} reported missing ancestor on foreign page {ancestor_page_id}")]
    ForeignAncestor {
        /// The revision whose evaluation was attempted.
        revision_id: RevisionId,
        /// The page the reported ancestor belongs to.
        ancestor_page_id: PageId,
    },

    /// A revision kept signalling a missing ancestor past the retry budget.
    #[error("revision {revision_id} still missing ancestors after {attempts} backfill attempts")]
    BackfillRetriesExhausted {
        /// The revision whose evaluation kept being deferred.
        revision_id: RevisionId,
        /// How many missing-ancestor signals were seen for it.
        attempts: u32,
    },

    /// An evaluator failed for a reason other than a missing dependency.
    ///
    /// Fatal to the current run; nothing was marked done, so a later run
    /// re-attempts the same event.
    #[error("evaluator failed: {message}")]
    Evaluator {
        /// Description of the failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An error from credo-core (storage, locking, identifiers).
    #[error("core error: {0}")]
    Core(#[from] credo_core::Error),
}

impl Error {
    /// Creates a new evaluator error.
    #[must_use]
    pub fn evaluator(message: impl Into<String>) -> Self {
        Self::Evaluator {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new evaluator error with a source cause.
    #[must_use]
    pub fn evaluator_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Evaluator {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}
