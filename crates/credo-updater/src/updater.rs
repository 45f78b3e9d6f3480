//! The update-orchestration engine.
//!
//! [`Updater`] pulls events from a chronologically ordered feed, acquires
//! the right page lease for each, delegates to the revision/vote
//! evaluators, resolves missing-ancestor signals by backfilling older
//! revisions first, throttles throughput, marks votes processed exactly
//! once, and terminates deterministically on a processed-event budget or
//! on escalated lock contention.
//!
//! ## Scheduling ("bounded overtake")
//!
//! Events for the same page are always applied in feed order. A busy page
//! is skipped on first encounter (zero-timeout attempt) so unrelated pages
//! keep making progress; the page's *next* event escalates to the
//! configured long timeout, and a failure there fail-stops the whole run.
//! A page is therefore never overtaken by more than one deferral round.
//!
//! ## Failure model
//!
//! Missing dependencies and lock contention are values, handled in the
//! loop. Evaluator and commit failures are fatal: the held lease is
//! released and the error propagates, leaving nothing marked done so a
//! later run re-attempts the same event.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{Instrument, debug, info, warn};
use ulid::Ulid;

use credo_core::observability::{page_span, run_span};
use credo_core::{
    LockAcquisition, LockKey, LockService, PageId, Revision, RevisionId, TrustStore, UserId,
};

use crate::config::UpdaterConfig;
use crate::error::{Error, Result};
use crate::evaluator::{RevisionEvaluator, RevisionOutcome, VoteEvaluator, VoteOutcome};
use crate::feed::{EventFeed, FeedItem, FeedSource, UpdateEvent};
use crate::metrics::UpdaterMetrics;
use crate::throttle::Throttle;

/// Run-scoped processed-event accounting.
///
/// Holds the budget and counter for exactly one run, so concurrent runs in
/// the same process never interfere.
#[derive(Debug)]
pub struct RunContext {
    budget: u64,
    processed: u64,
}

impl RunContext {
    /// Creates a context with the given processed-event budget.
    #[must_use]
    pub const fn new(budget: u64) -> Self {
        Self {
            budget,
            processed: 0,
        }
    }

    /// Records one processed event and returns the new count.
    pub fn record(&mut self) -> u64 {
        self.processed += 1;
        self.processed
    }

    /// Returns whether the budget is spent.
    #[must_use]
    pub const fn exhausted(&self) -> bool {
        self.processed >= self.budget
    }

    /// Returns how many events this run has processed.
    #[must_use]
    pub const fn events_processed(&self) -> u64 {
        self.processed
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The feed was drained (or the requested unit of work completed).
    Completed,
    /// The processed-event budget was spent with events still pending.
    BudgetExhausted,
    /// A page stayed locked through the escalated wait; the run
    /// fail-stopped so the operator can re-run later.
    ContentionAborted {
        /// The page that could not be locked.
        page_id: PageId,
    },
    /// The page lock could not be acquired; the call was a no-op.
    LockBusy {
        /// The page that was busy.
        page_id: PageId,
    },
}

impl RunOutcome {
    /// Returns true if the run completed its work.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Returns the outcome as a metrics/log label.
    #[must_use]
    pub const fn as_label(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::BudgetExhausted => "budget_exhausted",
            Self::ContentionAborted { .. } => "contention_aborted",
            Self::LockBusy { .. } => "lock_busy",
        }
    }
}

/// Summary returned to the scheduler that invoked a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// How the run ended.
    pub outcome: RunOutcome,
    /// How many events the run processed.
    pub events_processed: u64,
}

impl RunReport {
    /// Creates a new run report.
    #[must_use]
    pub const fn new(outcome: RunOutcome, events_processed: u64) -> Self {
        Self {
            outcome,
            events_processed,
        }
    }
}

/// The update-orchestration engine.
///
/// One `Updater` is one worker. Multiple workers may run concurrently
/// against the same store and lock service; they coordinate purely through
/// page leases.
pub struct Updater {
    store: Arc<dyn TrustStore>,
    locks: Arc<dyn LockService>,
    feeds: Arc<dyn FeedSource>,
    revisions: Arc<dyn RevisionEvaluator>,
    votes: Arc<dyn VoteEvaluator>,
    config: UpdaterConfig,
    throttle: Throttle,
    metrics: UpdaterMetrics,
    holder_id: String,
}

impl Updater {
    /// Creates a new engine instance with a unique worker identity.
    #[must_use]
    pub fn new(
        store: Arc<dyn TrustStore>,
        locks: Arc<dyn LockService>,
        feeds: Arc<dyn FeedSource>,
        revisions: Arc<dyn RevisionEvaluator>,
        votes: Arc<dyn VoteEvaluator>,
        config: UpdaterConfig,
    ) -> Self {
        let throttle = Throttle::from_config(&config);
        Self {
            store,
            locks,
            feeds,
            revisions,
            votes,
            config,
            throttle,
            metrics: UpdaterMetrics::new(),
            holder_id: Ulid::new().to_string(),
        }
    }

    /// Returns this worker's lease holder ID.
    #[must_use]
    pub fn holder_id(&self) -> &str {
        &self.holder_id
    }

    /// Builds the global feed and drains it.
    ///
    /// # Errors
    ///
    /// Propagates evaluator, commit, and service failures; contention and
    /// budget exhaustion are clean [`RunOutcome`]s, not errors.
    pub async fn update_global(&self) -> Result<RunReport> {
        let span = run_span("update_global");
        async {
            let mut ctx = RunContext::new(self.config.max_events_per_run);
            let mut feed = self.feeds.global_feed().await?;

            let outcome = self.process_feed(&mut ctx, feed.as_mut()).await?;

            self.metrics.record_run(outcome.as_label());
            info!(
                events = ctx.events_processed(),
                outcome = outcome.as_label(),
                "global update finished"
            );
            Ok(RunReport::new(outcome, ctx.events_processed()))
        }
        .instrument(span)
        .await
    }

    /// Acquires one page's lease and drains that page's feed.
    ///
    /// If the lease cannot be obtained within the configured timeout the
    /// call is a no-op reporting [`RunOutcome::LockBusy`].
    ///
    /// # Errors
    ///
    /// Propagates evaluator, commit, and service failures after releasing
    /// the lease.
    pub async fn update_page(&self, page_id: PageId) -> Result<RunReport> {
        let span = page_span("update_page", page_id);
        async {
            let mut ctx = RunContext::new(self.config.max_events_per_run);

            let acquisition = self
                .locks
                .acquire(LockKey::Page(page_id), &self.holder_id, self.config.lock_timeout)
                .await?;
            let Some(lease) = acquisition.into_lease() else {
                self.metrics.record_lock_contention();
                let outcome = RunOutcome::LockBusy { page_id };
                self.metrics.record_run(outcome.as_label());
                info!(page = %page_id, "page locked elsewhere, nothing to do");
                return Ok(RunReport::new(outcome, 0));
            };

            let drained = self.drain_page(&mut ctx, page_id).await;
            let released = self.locks.release(&lease).await;
            let outcome = drained?;
            if !released? {
                warn!(page = %page_id, "page lease expired before release");
            }

            self.metrics.record_run(outcome.as_label());
            info!(
                page = %page_id,
                events = ctx.events_processed(),
                outcome = outcome.as_label(),
                "page update finished"
            );
            Ok(RunReport::new(outcome, ctx.events_processed()))
        }
        .instrument(span)
        .await
    }

    /// Applies a single freshly cast vote under the page lease.
    ///
    /// If the lease cannot be obtained within the configured timeout the
    /// call is a no-op reporting [`RunOutcome::LockBusy`].
    ///
    /// # Errors
    ///
    /// Propagates evaluator, commit, and service failures after releasing
    /// the lease.
    pub async fn eval_vote(
        &self,
        page_id: PageId,
        revision_id: RevisionId,
        voter_id: UserId,
    ) -> Result<RunReport> {
        let span = page_span("eval_vote", page_id);
        async {
            let mut ctx = RunContext::new(self.config.max_events_per_run);

            let acquisition = self
                .locks
                .acquire(LockKey::Page(page_id), &self.holder_id, self.config.lock_timeout)
                .await?;
            let Some(lease) = acquisition.into_lease() else {
                self.metrics.record_lock_contention();
                let outcome = RunOutcome::LockBusy { page_id };
                self.metrics.record_run(outcome.as_label());
                info!(page = %page_id, revision = %revision_id, "page locked elsewhere, vote left pending");
                return Ok(RunReport::new(outcome, 0));
            };

            let applied = self
                .evaluate_vote_and_commit(&mut ctx, page_id, revision_id, voter_id)
                .await;
            let released = self.locks.release(&lease).await;
            applied?;
            if !released? {
                warn!(page = %page_id, "page lease expired before release");
            }

            let outcome = RunOutcome::Completed;
            self.metrics.record_run(outcome.as_label());
            Ok(RunReport::new(outcome, ctx.events_processed()))
        }
        .instrument(span)
        .await
    }

    /// Drains a global (multi-page) feed under the bounded-overtake
    /// scheduling discipline.
    ///
    /// # Errors
    ///
    /// Propagates dispatch failures after the page lease is released.
    pub async fn process_feed(
        &self,
        ctx: &mut RunContext,
        feed: &mut dyn EventFeed,
    ) -> Result<RunOutcome> {
        // Pages this pass already attempted and failed to lock. First
        // encounters try once and skip ahead; second encounters escalate
        // to the long timeout.
        let mut tried: HashSet<PageId> = HashSet::new();

        loop {
            if ctx.exhausted() {
                return Ok(RunOutcome::BudgetExhausted);
            }
            let Some(item) = feed.next().await? else {
                return Ok(RunOutcome::Completed);
            };

            let escalated = tried.contains(&item.page_id);
            let timeout = if escalated {
                self.config.lock_timeout
            } else {
                Duration::ZERO
            };

            match self
                .locks
                .acquire(LockKey::Page(item.page_id), &self.holder_id, timeout)
                .await?
            {
                LockAcquisition::Acquired { lease } => {
                    tried.remove(&item.page_id);
                    let dispatched = self.dispatch(ctx, &item).await;
                    let released = self.locks.release(&lease).await;
                    dispatched?;
                    if !released? {
                        warn!(page = %item.page_id, "page lease expired before release");
                    }
                }
                LockAcquisition::Busy { current_holder } => {
                    self.metrics.record_lock_contention();
                    if escalated {
                        warn!(
                            page = %item.page_id,
                            holder = ?current_holder,
                            "page still locked after escalated wait, aborting run"
                        );
                        return Ok(RunOutcome::ContentionAborted {
                            page_id: item.page_id,
                        });
                    }
                    debug!(
                        page = %item.page_id,
                        holder = ?current_holder,
                        "page locked, deferring and skipping ahead"
                    );
                    tried.insert(item.page_id);
                }
            }
        }
    }

    /// Drains a page-scoped feed strictly in order.
    ///
    /// The caller already holds the page's lease for the whole call, so
    /// there is no locking and no skip-ahead here.
    ///
    /// # Errors
    ///
    /// Propagates dispatch failures.
    pub async fn process_page_feed(
        &self,
        ctx: &mut RunContext,
        feed: &mut dyn EventFeed,
    ) -> Result<RunOutcome> {
        loop {
            if ctx.exhausted() {
                return Ok(RunOutcome::BudgetExhausted);
            }
            let Some(item) = feed.next().await? else {
                return Ok(RunOutcome::Completed);
            };
            self.dispatch(ctx, &item).await?;
        }
    }

    /// Builds and drains one page's feed. The caller holds the lease.
    async fn drain_page(&self, ctx: &mut RunContext, page_id: PageId) -> Result<RunOutcome> {
        let mut feed = self.feeds.page_feed(page_id).await?;
        self.process_page_feed(ctx, feed.as_mut()).await
    }

    /// Dispatches one event by kind, then commits.
    async fn dispatch(&self, ctx: &mut RunContext, item: &FeedItem) -> Result<()> {
        let kind = item.event.kind();
        let started = Instant::now();

        match &item.event {
            UpdateEvent::Revision(revision) => self.evaluate_revision(ctx, revision).await?,
            UpdateEvent::Vote {
                revision_id,
                voter_id,
            } => {
                self.evaluate_vote(ctx, item.page_id, *revision_id, *voter_id)
                    .await?;
            }
        }
        self.store.commit().await?;

        self.metrics
            .observe_event_duration(kind, started.elapsed().as_secs_f64());
        Ok(())
    }

    /// Evaluates one revision, backfilling unevaluated ancestors first.
    ///
    /// Runs under the page lease already held by the caller; it never
    /// acquires a lock for the page it is working on. The dependency chain
    /// is walked with an explicit work stack so a pathologically long run
    /// of unevaluated ancestors cannot overflow the call stack.
    async fn evaluate_revision(&self, ctx: &mut RunContext, target: &Revision) -> Result<()> {
        let mut pending: Vec<Revision> = vec![target.clone()];
        let mut deferrals: HashMap<RevisionId, u32> = HashMap::new();

        while let Some(current) = pending.last().cloned() {
            if ctx.exhausted() {
                debug!(revision = %current.id, "budget spent mid-chain, revision left for next run");
                return Ok(());
            }

            match self.revisions.evaluate(&current).await? {
                RevisionOutcome::Evaluated => {
                    pending.pop();
                    let processed = ctx.record();
                    self.metrics.record_event("revision");
                    self.throttle.pause(processed).await;
                }
                RevisionOutcome::MissingTrust { ancestor } => {
                    if ancestor.id == current.id {
                        return Err(Error::SelfDependency {
                            revision_id: current.id,
                        });
                    }
                    if ancestor.page_id != current.page_id {
                        return Err(Error::ForeignAncestor {
                            revision_id: current.id,
                            ancestor_page_id: ancestor.page_id,
                        });
                    }

                    let seen = deferrals.entry(current.id).or_insert(0);
                    *seen += 1;
                    if *seen > self.config.backfill_retries {
                        return Err(Error::BackfillRetriesExhausted {
                            revision_id: current.id,
                            attempts: *seen,
                        });
                    }

                    debug!(
                        revision = %current.id,
                        ancestor = %ancestor.id,
                        "ancestor lacks trust result, backfilling"
                    );
                    self.metrics.record_backfill();
                    pending.push(ancestor);
                }
            }
        }

        Ok(())
    }

    /// Applies one vote, exactly once, under the held page lease.
    ///
    /// A vote whose revision has no trust result is marked processed and
    /// dropped: votes do not trigger backfill.
    async fn evaluate_vote(
        &self,
        ctx: &mut RunContext,
        page_id: PageId,
        revision_id: RevisionId,
        voter_id: UserId,
    ) -> Result<()> {
        if self.store.vote_processed(revision_id, voter_id).await? {
            debug!(revision = %revision_id, voter = %voter_id, "vote already processed, skipping");
            return Ok(());
        }

        match self.votes.apply(page_id, revision_id, voter_id).await? {
            VoteOutcome::Applied => {
                self.store.mark_vote_processed(revision_id, voter_id).await?;
                let processed = ctx.record();
                self.metrics.record_event("vote");
                self.throttle.pause(processed).await;
            }
            VoteOutcome::MissingWorkRevision => {
                self.store.mark_vote_processed(revision_id, voter_id).await?;
                self.metrics.record_vote_dropped();
                warn!(
                    page = %page_id,
                    revision = %revision_id,
                    voter = %voter_id,
                    "dropping vote on revision with no trust result"
                );
            }
        }

        Ok(())
    }

    /// Vote application followed by the commit fence, for the direct
    /// `eval_vote` entry point.
    async fn evaluate_vote_and_commit(
        &self,
        ctx: &mut RunContext,
        page_id: PageId,
        revision_id: RevisionId,
        voter_id: UserId,
    ) -> Result<()> {
        self.evaluate_vote(ctx, page_id, revision_id, voter_id)
            .await?;
        self.store.commit().await?;
        Ok(())
    }
}
