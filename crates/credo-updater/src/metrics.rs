//! Observability metrics for the update engine.
//!
//! Exposed via the `metrics` crate facade; installing an exporter (e.g.
//! Prometheus) is deployment glue, not this crate's concern.
//!
//! ## Metrics Exported
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `credo_updater_events_processed_total` | Counter | `kind` | Events processed, by event kind |
//! | `credo_updater_votes_dropped_total` | Counter | - | Votes dropped for lack of a trust result |
//! | `credo_updater_backfills_total` | Counter | - | Missing-ancestor signals resolved by backfill |
//! | `credo_updater_lock_contention_total` | Counter | - | Page-lock attempts that found the page busy |
//! | `credo_updater_runs_total` | Counter | `outcome` | Update runs, by terminal outcome |
//! | `credo_updater_event_duration_seconds` | Histogram | `kind` | End-to-end dispatch time per event |

use metrics::{counter, histogram};

/// Metric names as constants for consistency.
pub mod names {
    /// Counter: Events processed, by event kind.
    pub const EVENTS_PROCESSED_TOTAL: &str = "credo_updater_events_processed_total";
    /// Counter: Votes dropped because the revision had no trust result.
    pub const VOTES_DROPPED_TOTAL: &str = "credo_updater_votes_dropped_total";
    /// Counter: Missing-ancestor signals resolved by backfill.
    pub const BACKFILLS_TOTAL: &str = "credo_updater_backfills_total";
    /// Counter: Page-lock attempts that found the page busy.
    pub const LOCK_CONTENTION_TOTAL: &str = "credo_updater_lock_contention_total";
    /// Counter: Update runs, by terminal outcome.
    pub const RUNS_TOTAL: &str = "credo_updater_runs_total";
    /// Histogram: End-to-end dispatch time per event in seconds.
    pub const EVENT_DURATION_SECONDS: &str = "credo_updater_event_duration_seconds";
}

/// Label keys used across metrics.
pub mod labels {
    /// Event kind (revision, vote).
    pub const KIND: &str = "kind";
    /// Run outcome (completed, budget_exhausted, contention_aborted, lock_busy).
    pub const OUTCOME: &str = "outcome";
}

/// High-level interface for recording update-engine metrics.
///
/// Cheap to clone and share across workers.
#[derive(Debug, Clone, Default)]
pub struct UpdaterMetrics;

impl UpdaterMetrics {
    /// Creates a new metrics recorder.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Records one processed event.
    pub fn record_event(&self, kind: &'static str) {
        counter!(names::EVENTS_PROCESSED_TOTAL, labels::KIND => kind).increment(1);
    }

    /// Records a vote dropped for lack of a trust result.
    pub fn record_vote_dropped(&self) {
        counter!(names::VOTES_DROPPED_TOTAL).increment(1);
    }

    /// Records a missing-ancestor signal that triggered backfill.
    pub fn record_backfill(&self) {
        counter!(names::BACKFILLS_TOTAL).increment(1);
    }

    /// Records a page-lock attempt that found the page busy.
    pub fn record_lock_contention(&self) {
        counter!(names::LOCK_CONTENTION_TOTAL).increment(1);
    }

    /// Records a finished run with its terminal outcome.
    pub fn record_run(&self, outcome: &'static str) {
        counter!(names::RUNS_TOTAL, labels::OUTCOME => outcome).increment(1);
    }

    /// Records the end-to-end dispatch time of one event.
    pub fn observe_event_duration(&self, kind: &'static str, duration_secs: f64) {
        histogram!(names::EVENT_DURATION_SECONDS, labels::KIND => kind).record(duration_secs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_without_an_exporter_is_a_no_op() {
        // The metrics facade drops everything until a recorder is
        // installed; these must not panic.
        let metrics = UpdaterMetrics::new();
        metrics.record_event("revision");
        metrics.record_vote_dropped();
        metrics.record_backfill();
        metrics.record_lock_contention();
        metrics.record_run("completed");
        metrics.observe_event_duration("vote", 0.012);
    }

    #[test]
    fn metric_names_share_the_engine_prefix() {
        assert!(names::EVENTS_PROCESSED_TOTAL.starts_with("credo_updater_"));
        assert!(names::RUNS_TOTAL.starts_with("credo_updater_"));
    }
}
