//! Load throttling between processed events.
//!
//! The throttle bounds the load one worker places on the shared store and
//! on contended pages, independent of how fast the feed can produce
//! events: a fixed sleep after every processed event, plus one extra
//! second after every Nth.

use std::time::Duration;

use crate::config::UpdaterConfig;

/// Extra pause applied after every Nth processed event.
const EXTRA_EVENT_DELAY: Duration = Duration::from_secs(1);

/// Per-event pacing for an update run.
#[derive(Debug, Clone)]
pub struct Throttle {
    each_event_delay: Duration,
    every_n_events_delay: Option<u64>,
}

impl Throttle {
    /// Creates a throttle with explicit delays.
    #[must_use]
    pub const fn new(each_event_delay: Duration, every_n_events_delay: Option<u64>) -> Self {
        Self {
            each_event_delay,
            every_n_events_delay,
        }
    }

    /// Creates a throttle from run configuration.
    #[must_use]
    pub const fn from_config(config: &UpdaterConfig) -> Self {
        Self::new(config.each_event_delay, config.every_n_events_delay)
    }

    /// Pauses after a processed event.
    ///
    /// `processed` is the run's processed-event count *including* the event
    /// just handled, so with an interval of 3 the extra pause lands after
    /// events 3, 6, 9, ...
    pub async fn pause(&self, processed: u64) {
        if !self.each_event_delay.is_zero() {
            tokio::time::sleep(self.each_event_delay).await;
        }

        if let Some(every_n) = self.every_n_events_delay {
            if every_n > 0 && processed % every_n == 0 {
                tokio::time::sleep(EXTRA_EVENT_DELAY).await;
            }
        }
    }
}
