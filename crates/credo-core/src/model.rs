//! Domain model for the trust update pipeline.
//!
//! These are the persisted shapes the engine coordinates around. The engine
//! itself never computes trust values; it reads [`Revision`] and [`Vote`]
//! rows produced by the editing and voting systems, and sequences the
//! evaluators that write everything else.
//!
//! Ownership rules:
//!
//! - [`Revision`] rows are immutable and read-only from the engine's side.
//! - [`Vote`] rows are mutated only in their `processed` flag, exactly once,
//!   under the owning page's lock.
//! - [`PageTrustState`] and a page's [`RevisionTrustResult`] rows are owned
//!   by the current page-lock holder and rewritten wholesale.
//! - [`GlobalHistogram`] is owned by the reputation-lock holder.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{PageId, RevisionId, UserId};

/// One immutable edit to a page.
///
/// Produced by the editing system; the engine reads it and never mutates
/// revision rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Revision {
    /// Unique revision identifier.
    pub id: RevisionId,
    /// Page this revision belongs to.
    pub page_id: PageId,
    /// Identifier of the stored text blob for this revision.
    pub text_id: i64,
    /// User who made the edit.
    pub author_id: UserId,
    /// When the edit was made.
    pub timestamp: DateTime<Utc>,
    /// Whether the author flagged the edit as minor.
    pub minor_edit: bool,
    /// The author's edit comment.
    pub comment: String,
}

/// A reviewer's endorsement of one revision.
///
/// Created by the voting front end. The engine mutates only the `processed`
/// flag; once true it never reverts to false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    /// The revision being endorsed.
    pub revision_id: RevisionId,
    /// Page the revision belongs to.
    pub page_id: PageId,
    /// The reviewer casting the vote.
    pub voter_id: UserId,
    /// When the vote was cast.
    pub voted_on: DateTime<Utc>,
    /// Whether the vote's reputation effect has been applied.
    pub processed: bool,
}

/// Text removed from the live page but retained for authorship and trust
/// accounting.
///
/// The three per-word vectors are index-aligned: `trust[i]` and `origins[i]`
/// describe `words[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadChunk {
    /// The removed words, in page order.
    pub words: Vec<String>,
    /// Per-word trust values at the time of removal.
    pub trust: Vec<f64>,
    /// Per-word origin revisions.
    pub origins: Vec<RevisionId>,
    /// When the text left the live page.
    pub retired_at: DateTime<Utc>,
}

/// Per-page trust state: dead text chunks plus opaque page metadata.
///
/// Rewritten wholesale (delete then insert) each time it changes, always by
/// the worker holding that page's lock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageTrustState {
    /// The page this state belongs to.
    pub page_id: PageId,
    /// Text removed from the live article but retained for accounting.
    pub dead_chunks: Vec<DeadChunk>,
    /// Opaque metadata owned by the trust computation.
    pub page_info: serde_json::Value,
}

impl PageTrustState {
    /// Creates an empty trust state for a page with no history.
    #[must_use]
    pub fn empty(page_id: PageId) -> Self {
        Self {
            page_id,
            dead_chunks: Vec::new(),
            page_info: serde_json::Value::Null,
        }
    }
}

/// The persisted outcome of evaluating one revision.
///
/// Existence of this record is the signal "this revision has been
/// evaluated"; the engine's dependency resolution keys off that alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionTrustResult {
    /// The evaluated revision.
    pub revision_id: RevisionId,
    /// Opaque quality record owned by the trust computation.
    pub quality_info: serde_json::Value,
    /// Reputation delta attributed to the revision's author.
    pub reputation_delta: f64,
    /// Overall trust score for the revision's text.
    pub overall_trust: f64,
}

/// Ordered per-word authorship/trust attribution tokens for one revision.
///
/// Stored independently of the text itself. Its length must match the live
/// word count of the revision's text when a consumer reads both together;
/// that contract is owed to external consumers and not enforced here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorSignatures {
    /// The revision these signatures describe.
    pub revision_id: RevisionId,
    /// One attribution token per live word, in text order.
    pub signatures: Vec<String>,
}

/// A single user's floating reputation value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReputationRecord {
    /// The user the reputation belongs to.
    pub user_id: UserId,
    /// Accumulated reputation.
    pub reputation: f64,
}

/// Number of buckets in the global reputation histogram.
pub const HISTOGRAM_BUCKETS: usize = 10;

/// The single-row global reputation histogram.
///
/// Used to normalize trust-value display; rewritten wholesale under the
/// reputation lock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalHistogram {
    /// Reputation bucket counts.
    pub buckets: [u64; HISTOGRAM_BUCKETS],
    /// Current median reputation.
    pub median: f64,
}

impl Default for GlobalHistogram {
    fn default() -> Self {
        Self {
            buckets: [0; HISTOGRAM_BUCKETS],
            median: 0.0,
        }
    }
}

/// The trust-annotated rendering of one revision's text.
///
/// Kept as an opaque blob: the wire format belongs to the presentation
/// layer. Keyed 1:1 with [`RevisionTrustResult`] and created at the same
/// time.
pub type ColoredMarkup = Bytes;
