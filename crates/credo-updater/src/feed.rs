//! Chronological event feeds for the update engine.
//!
//! A feed is a finite, lazily pulled sequence of domain events - revision
//! created, vote cast - each tagged with its timestamp and owning page.
//! Two flavors exist:
//!
//! - the **global feed**, spanning all pages, drained with the
//!   bounded-overtake scheduling discipline
//! - the **page feed**, scoped to one page, drained strictly in order once
//!   that page's lock is already held
//!
//! Production deployments implement [`FeedSource`] over the editing
//! system's revision and vote tables; [`InMemoryFeedSource`] serves tests
//! and development.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use credo_core::{PageId, Revision, RevisionId, UserId, Vote};

use crate::error::{Error, Result};

/// One domain event the engine can process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateEvent {
    /// A revision was created and awaits trust evaluation.
    Revision(Revision),
    /// A vote was cast and awaits reputation application.
    Vote {
        /// The revision voted on.
        revision_id: RevisionId,
        /// The reviewer who cast the vote.
        voter_id: UserId,
    },
}

impl UpdateEvent {
    /// Returns a short label for the event kind, for logs and metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Revision(_) => "revision",
            Self::Vote { .. } => "vote",
        }
    }
}

/// A feed entry: the event plus its chronological and page coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    /// When the event happened in the source system.
    pub timestamp: DateTime<Utc>,
    /// The page whose lock must be held to process the event.
    pub page_id: PageId,
    /// The event payload.
    pub event: UpdateEvent,
}

impl FeedItem {
    /// Builds a feed item from a revision row.
    #[must_use]
    pub fn revision(revision: Revision) -> Self {
        Self {
            timestamp: revision.timestamp,
            page_id: revision.page_id,
            event: UpdateEvent::Revision(revision),
        }
    }

    /// Builds a feed item from a vote row.
    #[must_use]
    pub fn vote(vote: &Vote) -> Self {
        Self {
            timestamp: vote.voted_on,
            page_id: vote.page_id,
            event: UpdateEvent::Vote {
                revision_id: vote.revision_id,
                voter_id: vote.voter_id,
            },
        }
    }
}

/// A finite, lazily pulled, chronologically ordered event sequence.
#[async_trait]
pub trait EventFeed: Send {
    /// Pulls the next event, or `None` when the feed is exhausted.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying source fails.
    async fn next(&mut self) -> Result<Option<FeedItem>>;
}

/// Builds feeds over the source system's event tables.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Builds a feed over every page's pending events.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying source fails.
    async fn global_feed(&self) -> Result<Box<dyn EventFeed>>;

    /// Builds a feed over one page's pending events.
    ///
    /// Callers hold the page's lock for the lifetime of the feed.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying source fails.
    async fn page_feed(&self, page_id: PageId) -> Result<Box<dyn EventFeed>>;
}

/// A vector-backed feed, already sorted chronologically.
#[derive(Debug)]
pub struct InMemoryFeed {
    items: VecDeque<FeedItem>,
}

impl InMemoryFeed {
    /// Creates a feed over the given items, sorting them by timestamp.
    ///
    /// The sort is stable, so items sharing a timestamp keep their seeded
    /// order.
    #[must_use]
    pub fn new(mut items: Vec<FeedItem>) -> Self {
        items.sort_by_key(|item| item.timestamp);
        Self {
            items: items.into(),
        }
    }
}

#[async_trait]
impl EventFeed for InMemoryFeed {
    async fn next(&mut self) -> Result<Option<FeedItem>> {
        Ok(self.items.pop_front())
    }
}

/// Converts a lock poison error to a storage error.
fn poison_err<T>(_: PoisonError<T>) -> Error {
    Error::Core(credo_core::Error::storage("lock poisoned"))
}

/// In-memory feed source for testing.
///
/// Seed it with events up front; every feed built afterwards serves a
/// chronologically sorted copy of what was seeded.
#[derive(Debug, Default)]
pub struct InMemoryFeedSource {
    items: Mutex<Vec<FeedItem>>,
}

impl InMemoryFeedSource {
    /// Creates an empty feed source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a feed source seeded with the given items.
    #[must_use]
    pub fn with_items(items: Vec<FeedItem>) -> Self {
        Self {
            items: Mutex::new(items),
        }
    }

    /// Appends an item to the backing event list.
    ///
    /// # Errors
    ///
    /// Returns an error if the internal lock is poisoned.
    pub fn push(&self, item: FeedItem) -> Result<()> {
        self.items.lock().map_err(poison_err)?.push(item);
        Ok(())
    }
}

#[async_trait]
impl FeedSource for InMemoryFeedSource {
    async fn global_feed(&self) -> Result<Box<dyn EventFeed>> {
        let items = self.items.lock().map_err(poison_err)?.clone();
        Ok(Box::new(InMemoryFeed::new(items)))
    }

    async fn page_feed(&self, page_id: PageId) -> Result<Box<dyn EventFeed>> {
        let items = self
            .items
            .lock()
            .map_err(poison_err)?
            .iter()
            .filter(|item| item.page_id == page_id)
            .cloned()
            .collect();
        Ok(Box::new(InMemoryFeed::new(items)))
    }
}
