//! Implements current sync state

use std::time::{Duration, Instant};

#[derive(Debug)]
pub(crate) struct SyncState {
    /// Time of the most recent slider-driven write.
    pub last_local_change: Instant,
    /// When the armed debounce timer is due. At most one exists.
    pub pending_until: Option<Instant>,
    /// Level the slider currently shows.
    pub displayed: f64,
    /// Whether the indicator is shown.
    pub visible: bool,
}

impl SyncState {
    pub(crate) fn new(now: Instant) -> Self {
        Self {
            last_local_change: now,
            pending_until: None,
            displayed: 0.0,
            visible: false,
        }
    }

    /// Delay before a reconciliation may overwrite the slider.
    ///
    /// Zero once `window` has passed since the last local change.
    pub(crate) fn quiet_delay(&self, now: Instant, window: Duration) -> Duration {
        (self.last_local_change + window).saturating_duration_since(now)
    }
}
