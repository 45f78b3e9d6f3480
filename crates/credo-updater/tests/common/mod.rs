//! Shared fixtures for update-engine integration tests.
//!
//! The evaluators here stand in for the real trust computation: they obey
//! the same contract (results keyed by revision, missing-ancestor signals
//! when a prior revision has no result) without doing any trust math.

#![allow(dead_code)] // not every test binary uses every fixture

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{TimeZone, Utc};

use credo_core::{
    AuthorSignatures, InMemoryLockService, MemoryStore, PageId, ReputationRecord, Revision,
    RevisionId, RevisionTrustResult, TrustStore, UserId, Vote,
};
use credo_updater::config::UpdaterConfig;
use credo_updater::error::Result;
use credo_updater::evaluator::{
    RevisionEvaluator, RevisionOutcome, VoteEvaluator, VoteOutcome,
};
use credo_updater::feed::{EventFeed, FeedItem, FeedSource, InMemoryFeedSource};
use credo_updater::updater::Updater;

/// Builds a revision with the given ids and timestamp (epoch seconds).
pub fn revision(id: i64, page: i64, secs: i64) -> Revision {
    Revision {
        id: RevisionId::new(id),
        page_id: PageId::new(page),
        text_id: id,
        author_id: UserId::new(1),
        timestamp: Utc.timestamp_opt(secs, 0).unwrap(),
        minor_edit: false,
        comment: String::new(),
    }
}

/// Builds an unprocessed vote with the given ids and timestamp.
pub fn vote(revision_id: i64, page: i64, voter: i64, secs: i64) -> Vote {
    Vote {
        revision_id: RevisionId::new(revision_id),
        page_id: PageId::new(page),
        voter_id: UserId::new(voter),
        voted_on: Utc.timestamp_opt(secs, 0).unwrap(),
        processed: false,
    }
}

/// A revision evaluator backed by the shared store.
///
/// Refuses to evaluate a revision while any prior revision of the same
/// page (by id) lacks a trust result, signalling the newest such prior as
/// the missing ancestor. On success it persists a trust result, markup,
/// and signatures, exactly as the real computation would.
pub struct StoreBackedRevisions {
    store: Arc<MemoryStore>,
    corpus: Vec<Revision>,
    calls: Mutex<Vec<RevisionId>>,
    completions: Mutex<Vec<(PageId, RevisionId)>>,
}

impl StoreBackedRevisions {
    pub fn new(store: Arc<MemoryStore>, corpus: Vec<Revision>) -> Self {
        Self {
            store,
            corpus,
            calls: Mutex::new(Vec::new()),
            completions: Mutex::new(Vec::new()),
        }
    }

    /// Every evaluate call, in order.
    pub fn calls(&self) -> Vec<RevisionId> {
        self.calls.lock().unwrap().clone()
    }

    /// Revisions in the order their results were first written.
    pub fn completions(&self) -> Vec<(PageId, RevisionId)> {
        self.completions.lock().unwrap().clone()
    }
}

#[async_trait]
impl RevisionEvaluator for StoreBackedRevisions {
    async fn evaluate(&self, revision: &Revision) -> Result<RevisionOutcome> {
        self.calls.lock().unwrap().push(revision.id);

        // Already evaluated - nothing to recompute.
        if self.store.trust_result(revision.id).await.is_ok() {
            return Ok(RevisionOutcome::Evaluated);
        }

        let mut blocking: Option<Revision> = None;
        for prior in self
            .corpus
            .iter()
            .filter(|p| p.page_id == revision.page_id && p.id < revision.id)
        {
            if self.store.trust_result(prior.id).await.is_err()
                && blocking.as_ref().map_or(true, |b| prior.id > b.id)
            {
                blocking = Some(prior.clone());
            }
        }
        if let Some(ancestor) = blocking {
            return Ok(RevisionOutcome::MissingTrust { ancestor });
        }

        self.store
            .put_trust_result(&RevisionTrustResult {
                revision_id: revision.id,
                quality_info: serde_json::json!({ "judged": 1 }),
                reputation_delta: 0.1,
                overall_trust: 1.0,
            })
            .await?;
        self.store
            .put_colored_markup(
                revision.page_id,
                revision.id,
                Bytes::from(format!("<trust rev={}>", revision.id)),
            )
            .await?;
        self.store
            .put_author_signatures(&AuthorSignatures {
                revision_id: revision.id,
                signatures: vec!["sig".into()],
            })
            .await?;

        self.completions
            .lock()
            .unwrap()
            .push((revision.page_id, revision.id));
        Ok(RevisionOutcome::Evaluated)
    }
}

/// A vote evaluator backed by the shared store.
///
/// Applies a vote only when the voted-on revision has a trust result,
/// bumping the voter's reputation by 1.0; otherwise reports the missing
/// work revision.
pub struct StoreBackedVotes {
    store: Arc<MemoryStore>,
    calls: Mutex<Vec<(RevisionId, UserId)>>,
}

impl StoreBackedVotes {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self {
            store,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every apply call, in order.
    pub fn calls(&self) -> Vec<(RevisionId, UserId)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl VoteEvaluator for StoreBackedVotes {
    async fn apply(
        &self,
        _page_id: PageId,
        revision_id: RevisionId,
        voter_id: UserId,
    ) -> Result<VoteOutcome> {
        self.calls.lock().unwrap().push((revision_id, voter_id));

        if self.store.trust_result(revision_id).await.is_err() {
            return Ok(VoteOutcome::MissingWorkRevision);
        }

        let reputation = match self.store.reputation(voter_id).await {
            Ok(record) => record.reputation,
            Err(_) => 0.0,
        };
        self.store
            .upsert_reputation(&ReputationRecord {
                user_id: voter_id,
                reputation: reputation + 1.0,
            })
            .await?;
        Ok(VoteOutcome::Applied)
    }
}

/// A feed that serves items exactly in seeded order, modelling a buggy
/// upstream that violates chronological order.
pub struct RawFeedSource {
    items: Mutex<Vec<FeedItem>>,
}

impl RawFeedSource {
    pub fn new(items: Vec<FeedItem>) -> Self {
        Self {
            items: Mutex::new(items),
        }
    }
}

struct RawFeed {
    items: VecDeque<FeedItem>,
}

#[async_trait]
impl EventFeed for RawFeed {
    async fn next(&mut self) -> Result<Option<FeedItem>> {
        Ok(self.items.pop_front())
    }
}

#[async_trait]
impl FeedSource for RawFeedSource {
    async fn global_feed(&self) -> Result<Box<dyn EventFeed>> {
        let items = self.items.lock().unwrap().clone();
        Ok(Box::new(RawFeed {
            items: items.into(),
        }))
    }

    async fn page_feed(&self, page_id: PageId) -> Result<Box<dyn EventFeed>> {
        let items = self
            .items
            .lock()
            .unwrap()
            .iter()
            .filter(|item| item.page_id == page_id)
            .cloned()
            .collect::<Vec<_>>();
        Ok(Box::new(RawFeed {
            items: items.into(),
        }))
    }
}

/// Everything a test needs: shared store, locks, evaluators, and a feed.
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub locks: Arc<InMemoryLockService>,
    pub feeds: Arc<dyn FeedSource>,
    pub revisions: Arc<StoreBackedRevisions>,
    pub votes: Arc<StoreBackedVotes>,
}

impl Harness {
    /// A harness over a chronologically sorted feed of the given items.
    pub fn new(corpus: Vec<Revision>, items: Vec<FeedItem>) -> Self {
        Self::with_feeds(corpus, Arc::new(InMemoryFeedSource::with_items(items)))
    }

    /// A harness over a feed that preserves seeded order verbatim.
    pub fn with_raw_feed(corpus: Vec<Revision>, items: Vec<FeedItem>) -> Self {
        Self::with_feeds(corpus, Arc::new(RawFeedSource::new(items)))
    }

    fn with_feeds(corpus: Vec<Revision>, feeds: Arc<dyn FeedSource>) -> Self {
        let store = Arc::new(MemoryStore::new());
        let revisions = Arc::new(StoreBackedRevisions::new(store.clone(), corpus));
        let votes = Arc::new(StoreBackedVotes::new(store.clone()));
        Self {
            store,
            locks: Arc::new(InMemoryLockService::default()),
            feeds,
            revisions,
            votes,
        }
    }

    /// Builds one worker over the shared parts.
    pub fn engine(&self, config: UpdaterConfig) -> Updater {
        Updater::new(
            self.store.clone(),
            self.locks.clone(),
            self.feeds.clone(),
            self.revisions.clone(),
            self.votes.clone(),
            config,
        )
    }
}
