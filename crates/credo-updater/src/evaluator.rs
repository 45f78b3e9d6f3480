//! Evaluator contracts: the engine's seams to the trust computation.
//!
//! The actual trust math - text diffing, authorship attribution, reputation
//! updates - lives outside this crate. The engine only needs to know, for
//! each unit of work, whether it completed or what it is waiting on, so the
//! contracts return tagged outcomes instead of using errors as control
//! flow: a missing dependency is an [`Ok`] variant, and an [`Err`] from an
//! evaluator is always fatal to the current run.

use async_trait::async_trait;

use credo_core::{PageId, Revision, RevisionId, UserId};

use crate::error::Result;

/// Outcome of evaluating one revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevisionOutcome {
    /// The revision's trust result was computed and persisted.
    Evaluated,
    /// An older revision of the same page has no trust result yet and must
    /// be evaluated first.
    MissingTrust {
        /// The ancestor revision blocking this one.
        ancestor: Revision,
    },
}

impl RevisionOutcome {
    /// Returns true if the revision was evaluated.
    #[must_use]
    pub const fn is_evaluated(&self) -> bool {
        matches!(self, Self::Evaluated)
    }
}

/// Outcome of applying one vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    /// The vote's reputation effect was applied.
    Applied,
    /// The voted-on revision has no trust result, so there is nothing to
    /// endorse yet.
    MissingWorkRevision,
}

impl VoteOutcome {
    /// Returns true if the vote was applied.
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Computes and persists the trust result for one revision.
///
/// Invoked while the engine holds the revision's page lock, so the
/// implementation may freely rewrite that page's trust state and trust
/// results. It must **not** acquire the page lock itself.
#[async_trait]
pub trait RevisionEvaluator: Send + Sync {
    /// Evaluates one revision.
    ///
    /// # Errors
    ///
    /// Any error other than the `MissingTrust` outcome is fatal to the
    /// current run.
    async fn evaluate(&self, revision: &Revision) -> Result<RevisionOutcome>;
}

/// Applies one vote's effect to reputation.
///
/// Invoked while the engine holds the page lock; marking the vote
/// processed stays with the engine, so an implementation is free to fail
/// without leaving a half-applied marker.
#[async_trait]
pub trait VoteEvaluator: Send + Sync {
    /// Applies one vote.
    ///
    /// # Errors
    ///
    /// Any error other than the `MissingWorkRevision` outcome is fatal to
    /// the current run.
    async fn apply(
        &self,
        page_id: PageId,
        revision_id: RevisionId,
        voter_id: UserId,
    ) -> Result<VoteOutcome>;
}
