//! Run configuration for the update engine.
//!
//! The engine consumes this surface but does not own it: values come from
//! whatever deployment glue launches a run (cron job, request handler,
//! test harness).

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for one update run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdaterConfig {
    /// Hard cap on events processed in one run.
    ///
    /// The run returns cleanly once the budget is spent, even if the feed
    /// has more events pending.
    pub max_events_per_run: u64,

    /// Sleep applied after every processed event.
    pub each_event_delay: Duration,

    /// Every this-many processed events, sleep one extra second.
    ///
    /// `None` disables the extra pause.
    pub every_n_events_delay: Option<u64>,

    /// How long to wait for a page lock on an escalated attempt.
    ///
    /// First encounters of a busy page use a zero timeout and skip ahead;
    /// this budget applies once a page has already been deferred, and to
    /// the direct `update_page` / `eval_vote` entry points.
    pub lock_timeout: Duration,

    /// How many missing-ancestor signals one revision may produce in a
    /// single evaluation before the run fails.
    pub backfill_retries: u32,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            max_events_per_run: 1000,
            each_event_delay: Duration::ZERO,
            every_n_events_delay: Some(50),
            lock_timeout: Duration::from_secs(30),
            backfill_retries: 3,
        }
    }
}

impl UpdaterConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the processed-event budget.
    #[must_use]
    pub const fn with_max_events(mut self, max_events: u64) -> Self {
        self.max_events_per_run = max_events;
        self
    }

    /// Sets the per-event delay.
    #[must_use]
    pub const fn with_each_event_delay(mut self, delay: Duration) -> Self {
        self.each_event_delay = delay;
        self
    }

    /// Sets the extra-second pause interval.
    #[must_use]
    pub const fn with_every_n_events_delay(mut self, every_n: Option<u64>) -> Self {
        self.every_n_events_delay = every_n;
        self
    }

    /// Sets the escalated lock-acquisition timeout.
    #[must_use]
    pub const fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Sets the backfill retry bound.
    #[must_use]
    pub const fn with_backfill_retries(mut self, retries: u32) -> Self {
        self.backfill_retries = retries;
        self
    }
}
