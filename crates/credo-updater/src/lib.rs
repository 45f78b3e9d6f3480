//! # credo-updater
//!
//! Update-orchestration engine for the Credo content-trust infrastructure.
//!
//! The engine folds a chronologically ordered feed of edit and vote events
//! into the persisted trust state, providing:
//!
//! - **Per-page total order**: events for one page are applied in feed
//!   order, enforced through page leases and recursive ancestor backfill
//! - **Inter-page parallelism**: busy pages are skipped (bounded overtake)
//!   so concurrent workers progress on unrelated pages
//! - **Exactly-once votes**: the processed marker is written once, under
//!   the page lease, and never reverts
//! - **Deterministic termination**: a processed-event budget and fail-stop
//!   on escalated lock contention
//!
//! The trust math itself is a collaborator behind the
//! [`evaluator::RevisionEvaluator`] and [`evaluator::VoteEvaluator`] seams;
//! this crate decides only *when and in what order* each unit of work runs.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use credo_core::{InMemoryLockService, MemoryStore};
//! use credo_updater::config::UpdaterConfig;
//! use credo_updater::error::Result;
//! use credo_updater::feed::InMemoryFeedSource;
//! use credo_updater::updater::Updater;
//! # use credo_updater::evaluator::{RevisionEvaluator, VoteEvaluator};
//! # async fn run(revisions: Arc<dyn RevisionEvaluator>, votes: Arc<dyn VoteEvaluator>) -> Result<()> {
//!
//! let engine = Updater::new(
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(InMemoryLockService::default()),
//!     Arc::new(InMemoryFeedSource::new()),
//!     revisions,
//!     votes,
//!     UpdaterConfig::default().with_max_events(500),
//! );
//!
//! let report = engine.update_global().await?;
//! println!("processed {} events", report.events_processed);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod evaluator;
pub mod feed;
pub mod metrics;
pub mod throttle;
pub mod updater;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::UpdaterConfig;
    pub use crate::error::{Error, Result};
    pub use crate::evaluator::{
        RevisionEvaluator, RevisionOutcome, VoteEvaluator, VoteOutcome,
    };
    pub use crate::feed::{
        EventFeed, FeedItem, FeedSource, InMemoryFeed, InMemoryFeedSource, UpdateEvent,
    };
    pub use crate::metrics::UpdaterMetrics;
    pub use crate::throttle::Throttle;
    pub use crate::updater::{RunContext, RunOutcome, RunReport, Updater};
}
