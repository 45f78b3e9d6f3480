//! Persistence contract for trust state.
//!
//! [`TrustStore`] is the thinnest durable-state surface the update engine
//! needs: keyed read/write accessors for the seven persisted collections
//! plus a commit fence. No business logic lives here.
//!
//! ## Contract
//!
//! - Every read fails with a not-found condition when no row exists; that
//!   is ordinary control flow ("no trust result yet"), distinguishable from
//!   storage failures via [`Error::is_not_found`].
//! - Every write is a full replace (delete then insert) for its key, never
//!   a partial update.
//! - A vote's processed marker, once set, never reverts.
//! - `commit` durably finalizes pending writes; failure is reported, not
//!   swallowed.
//!
//! Mutual exclusion is *not* enforced here - callers hold the appropriate
//! lease from [`crate::lock::LockService`] before writing page-scoped or
//! reputation-scoped rows.

use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{Error, Result};
use crate::id::{PageId, RevisionId, UserId};
use crate::model::{
    AuthorSignatures, GlobalHistogram, PageTrustState, ReputationRecord, RevisionTrustResult,
};
use crate::paths;

/// Durable storage for trust state.
///
/// All accessors are `Send + Sync` so one store can be shared across
/// concurrent workers behind an `Arc`.
#[async_trait]
pub trait TrustStore: Send + Sync {
    /// Reads the global reputation histogram.
    ///
    /// # Errors
    ///
    /// Returns a not-found error if the histogram row has never been
    /// written.
    async fn global_histogram(&self) -> Result<GlobalHistogram>;

    /// Replaces the global reputation histogram.
    async fn put_global_histogram(&self, histogram: &GlobalHistogram) -> Result<()>;

    /// Reads a page's trust state (dead chunks + metadata).
    ///
    /// # Errors
    ///
    /// Returns a not-found error if the page has no trust state yet.
    async fn page_state(&self, page_id: PageId) -> Result<PageTrustState>;

    /// Replaces a page's trust state wholesale.
    async fn put_page_state(&self, state: &PageTrustState) -> Result<()>;

    /// Reads a revision's trust result.
    ///
    /// Existence of this row is the signal "this revision has been
    /// evaluated".
    ///
    /// # Errors
    ///
    /// Returns a not-found error if the revision has not been evaluated.
    async fn trust_result(&self, revision_id: RevisionId) -> Result<RevisionTrustResult>;

    /// Replaces a revision's trust result wholesale.
    async fn put_trust_result(&self, result: &RevisionTrustResult) -> Result<()>;

    /// Reads a revision's colored markup blob.
    ///
    /// # Errors
    ///
    /// Returns a not-found error if no markup has been stored.
    async fn colored_markup(&self, page_id: PageId, revision_id: RevisionId) -> Result<Bytes>;

    /// Replaces a revision's colored markup blob.
    async fn put_colored_markup(
        &self,
        page_id: PageId,
        revision_id: RevisionId,
        markup: Bytes,
    ) -> Result<()>;

    /// Reads a revision's author signatures.
    ///
    /// # Errors
    ///
    /// Returns a not-found error if no signatures have been stored.
    async fn author_signatures(&self, revision_id: RevisionId) -> Result<AuthorSignatures>;

    /// Replaces a revision's author signatures wholesale.
    async fn put_author_signatures(&self, signatures: &AuthorSignatures) -> Result<()>;

    /// Reads a user's reputation record.
    ///
    /// # Errors
    ///
    /// Returns a not-found error if the user has no reputation yet.
    async fn reputation(&self, user_id: UserId) -> Result<ReputationRecord>;

    /// Inserts or updates a user's reputation record.
    async fn upsert_reputation(&self, record: &ReputationRecord) -> Result<()>;

    /// Returns whether a vote's effect has already been applied.
    async fn vote_processed(&self, revision_id: RevisionId, voter_id: UserId) -> Result<bool>;

    /// Marks a vote as processed.
    ///
    /// Idempotent; the marker never reverts once set.
    async fn mark_vote_processed(&self, revision_id: RevisionId, voter_id: UserId) -> Result<()>;

    /// Durably finalizes pending writes.
    ///
    /// # Errors
    ///
    /// Returns a commit error if the writes could not be made durable.
    async fn commit(&self) -> Result<()>;
}

/// In-memory trust store for testing and development.
///
/// Thread-safe via `RwLock`. Writes are visible immediately; `commit` only
/// counts fences so tests can assert the engine's commit discipline.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Debug, Default)]
struct MemoryStoreInner {
    histogram: Option<GlobalHistogram>,
    page_states: HashMap<PageId, PageTrustState>,
    trust_results: HashMap<RevisionId, RevisionTrustResult>,
    markup: HashMap<String, Bytes>,
    signatures: HashMap<RevisionId, AuthorSignatures>,
    reputations: HashMap<UserId, ReputationRecord>,
    processed_votes: HashSet<(RevisionId, UserId)>,
    commits: u64,
}

/// Converts a lock poison error to a storage error.
fn poison_err<T>(_: PoisonError<T>) -> Error {
    Error::storage("lock poisoned")
}

impl MemoryStore {
    /// Creates a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns how many commit fences have been requested.
    ///
    /// # Errors
    ///
    /// Returns an error if the internal lock is poisoned.
    pub fn commit_count(&self) -> Result<u64> {
        Ok(self.inner.read().map_err(poison_err)?.commits)
    }
}

#[async_trait]
impl TrustStore for MemoryStore {
    async fn global_histogram(&self) -> Result<GlobalHistogram> {
        self.inner
            .read()
            .map_err(poison_err)?
            .histogram
            .clone()
            .ok_or_else(|| Error::not_found("global_histogram", "singleton"))
    }

    async fn put_global_histogram(&self, histogram: &GlobalHistogram) -> Result<()> {
        self.inner.write().map_err(poison_err)?.histogram = Some(histogram.clone());
        Ok(())
    }

    async fn page_state(&self, page_id: PageId) -> Result<PageTrustState> {
        self.inner
            .read()
            .map_err(poison_err)?
            .page_states
            .get(&page_id)
            .cloned()
            .ok_or_else(|| Error::not_found("page_state", page_id))
    }

    async fn put_page_state(&self, state: &PageTrustState) -> Result<()> {
        self.inner
            .write()
            .map_err(poison_err)?
            .page_states
            .insert(state.page_id, state.clone());
        Ok(())
    }

    async fn trust_result(&self, revision_id: RevisionId) -> Result<RevisionTrustResult> {
        self.inner
            .read()
            .map_err(poison_err)?
            .trust_results
            .get(&revision_id)
            .cloned()
            .ok_or_else(|| Error::not_found("trust_result", revision_id))
    }

    async fn put_trust_result(&self, result: &RevisionTrustResult) -> Result<()> {
        self.inner
            .write()
            .map_err(poison_err)?
            .trust_results
            .insert(result.revision_id, result.clone());
        Ok(())
    }

    async fn colored_markup(&self, page_id: PageId, revision_id: RevisionId) -> Result<Bytes> {
        let path = paths::markup_path(page_id, revision_id);
        self.inner
            .read()
            .map_err(poison_err)?
            .markup
            .get(&path)
            .cloned()
            .ok_or(Error::NotFound {
                resource_type: "colored_markup",
                key: path,
            })
    }

    async fn put_colored_markup(
        &self,
        page_id: PageId,
        revision_id: RevisionId,
        markup: Bytes,
    ) -> Result<()> {
        let path = paths::markup_path(page_id, revision_id);
        self.inner
            .write()
            .map_err(poison_err)?
            .markup
            .insert(path, markup);
        Ok(())
    }

    async fn author_signatures(&self, revision_id: RevisionId) -> Result<AuthorSignatures> {
        self.inner
            .read()
            .map_err(poison_err)?
            .signatures
            .get(&revision_id)
            .cloned()
            .ok_or_else(|| Error::not_found("author_signatures", revision_id))
    }

    async fn put_author_signatures(&self, signatures: &AuthorSignatures) -> Result<()> {
        self.inner
            .write()
            .map_err(poison_err)?
            .signatures
            .insert(signatures.revision_id, signatures.clone());
        Ok(())
    }

    async fn reputation(&self, user_id: UserId) -> Result<ReputationRecord> {
        self.inner
            .read()
            .map_err(poison_err)?
            .reputations
            .get(&user_id)
            .cloned()
            .ok_or_else(|| Error::not_found("reputation", user_id))
    }

    async fn upsert_reputation(&self, record: &ReputationRecord) -> Result<()> {
        self.inner
            .write()
            .map_err(poison_err)?
            .reputations
            .insert(record.user_id, record.clone());
        Ok(())
    }

    async fn vote_processed(&self, revision_id: RevisionId, voter_id: UserId) -> Result<bool> {
        Ok(self
            .inner
            .read()
            .map_err(poison_err)?
            .processed_votes
            .contains(&(revision_id, voter_id)))
    }

    async fn mark_vote_processed(&self, revision_id: RevisionId, voter_id: UserId) -> Result<()> {
        self.inner
            .write()
            .map_err(poison_err)?
            .processed_votes
            .insert((revision_id, voter_id));
        Ok(())
    }

    async fn commit(&self) -> Result<()> {
        self.inner.write().map_err(poison_err)?.commits += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_result(revision_id: i64) -> RevisionTrustResult {
        RevisionTrustResult {
            revision_id: RevisionId::new(revision_id),
            quality_info: json!({"judged": 0}),
            reputation_delta: 0.5,
            overall_trust: 3.2,
        }
    }

    #[tokio::test]
    async fn missing_rows_are_not_found() -> Result<()> {
        let store = MemoryStore::new();

        assert!(store.global_histogram().await.unwrap_err().is_not_found());
        assert!(store
            .page_state(PageId::new(1))
            .await
            .unwrap_err()
            .is_not_found());
        assert!(store
            .trust_result(RevisionId::new(1))
            .await
            .unwrap_err()
            .is_not_found());
        assert!(store
            .reputation(UserId::new(1))
            .await
            .unwrap_err()
            .is_not_found());

        Ok(())
    }

    #[tokio::test]
    async fn trust_result_write_is_full_replace() -> Result<()> {
        let store = MemoryStore::new();

        store.put_trust_result(&sample_result(7)).await?;
        let mut updated = sample_result(7);
        updated.overall_trust = 9.9;
        store.put_trust_result(&updated).await?;

        let read = store.trust_result(RevisionId::new(7)).await?;
        assert_eq!(read.overall_trust, 9.9);

        Ok(())
    }

    #[tokio::test]
    async fn reputation_upserts() -> Result<()> {
        let store = MemoryStore::new();
        let user = UserId::new(5);

        store
            .upsert_reputation(&ReputationRecord {
                user_id: user,
                reputation: 1.0,
            })
            .await?;
        store
            .upsert_reputation(&ReputationRecord {
                user_id: user,
                reputation: 2.5,
            })
            .await?;

        let read = store.reputation(user).await?;
        assert_eq!(read.reputation, 2.5);

        Ok(())
    }

    #[tokio::test]
    async fn vote_marker_never_reverts() -> Result<()> {
        let store = MemoryStore::new();
        let revision = RevisionId::new(3);
        let voter = UserId::new(9);

        assert!(!store.vote_processed(revision, voter).await?);
        store.mark_vote_processed(revision, voter).await?;
        assert!(store.vote_processed(revision, voter).await?);

        // Marking again is idempotent.
        store.mark_vote_processed(revision, voter).await?;
        assert!(store.vote_processed(revision, voter).await?);

        Ok(())
    }

    #[tokio::test]
    async fn markup_is_keyed_by_derived_path() -> Result<()> {
        let store = MemoryStore::new();
        let page = PageId::new(12_042);
        let revision = RevisionId::new(98_765);

        store
            .put_colored_markup(page, revision, Bytes::from_static(b"<trust>"))
            .await?;

        let blob = store.colored_markup(page, revision).await?;
        assert_eq!(blob, Bytes::from_static(b"<trust>"));

        // A different revision of the same page is a different key.
        assert!(store
            .colored_markup(page, RevisionId::new(1))
            .await
            .unwrap_err()
            .is_not_found());

        Ok(())
    }

    #[tokio::test]
    async fn commit_counts_fences() -> Result<()> {
        let store = MemoryStore::new();

        store.commit().await?;
        store.commit().await?;
        assert_eq!(store.commit_count()?, 2);

        Ok(())
    }
}
