//! Keeps the slider and the backlight service converged.
//!
//! User slides are written to the service right away. Change notifications
//! from the service (including the echo of our own writes) only reach the
//! slider once the user has left it alone for the debounce window, so a
//! drag in progress is never yanked around.

use std::{
    rc::Rc,
    time::{Duration, Instant},
};

use log::{debug, warn};

use crate::{
    backlight::{to_level, to_raw, Backlight, Subscription},
    errors::KbdError,
    indicator::{Indicator, ValueOrigin},
    state::SyncState,
    timer::DebounceTimer,
};

pub(crate) struct Controller {
    backlight: Box<dyn Backlight>,
    indicator: Box<dyn Indicator>,
    timer: Rc<dyn DebounceTimer>,
    /// Queried once at construction.
    max: i32,
    debounce: Duration,
    state: SyncState,
    subscription: Option<Subscription>,
}

impl Controller {
    pub(crate) fn new(
        backlight: Box<dyn Backlight>,
        indicator: Box<dyn Indicator>,
        timer: Rc<dyn DebounceTimer>,
        debounce: Duration,
        now: Instant,
    ) -> Result<Self, KbdError> {
        let max = backlight.max_brightness()?;
        debug!("Max brightness {max}, debounce {debounce:?}");
        Ok(Self {
            backlight,
            indicator,
            timer,
            max,
            debounce,
            state: SyncState::new(now),
            subscription: None,
        })
    }

    /// Keep `subscription` alive until teardown.
    pub(crate) fn attach(&mut self, subscription: Subscription) {
        self.subscription = Some(subscription);
    }

    /// Level the slider currently shows.
    pub(crate) fn displayed(&self) -> f64 {
        self.state.displayed
    }

    pub(crate) fn is_visible(&self) -> bool {
        self.state.visible
    }

    /// The user moved the slider to `level`.
    ///
    /// Writes to the service immediately and leaves the debounce timer alone.
    pub(crate) fn on_user_slide(&mut self, level: f64, now: Instant) -> Result<(), KbdError> {
        let level = level.clamp(0.0, 1.0);
        self.state.last_local_change = now;
        self.state.displayed = level;
        self.indicator.set_value(level, ValueOrigin::User);

        let raw = to_raw(level, self.max);
        debug!("User slide to {level:.3}, writing {raw}");
        self.backlight.set_brightness(raw)
    }

    /// The service reported a brightness change.
    ///
    /// Updates visibility now and schedules the slider overwrite for when the
    /// quiet window after the last local change has passed.
    pub(crate) fn on_remote_changed(&mut self, now: Instant) -> Result<(), KbdError> {
        let visible = self.read_level().is_some();
        self.set_visible(visible);
        if !visible {
            return Ok(());
        }

        if self.state.pending_until.take().is_some() {
            self.timer.disarm()?;
        }
        let delay = self.state.quiet_delay(now, self.debounce);
        debug!("Reconciling slider in {delay:?}");
        self.timer.arm(delay)?;
        self.state.pending_until = Some(now + delay);
        Ok(())
    }

    /// The debounce timer fired: show what the service reports now.
    pub(crate) fn on_debounce_expired(&mut self, now: Instant) -> Result<(), KbdError> {
        let Some(due) = self.state.pending_until.take() else {
            debug!("Stale debounce expiry ignored");
            return Ok(());
        };
        debug!(
            "Debounce expired {:?} after its deadline",
            now.saturating_duration_since(due)
        );
        match self.read_level() {
            Some(level) => {
                debug!("Reconciled slider to {level:.3}");
                self.state.displayed = level;
                self.indicator.set_value(level, ValueOrigin::Sync);
            }
            None => self.set_visible(false),
        }
        Ok(())
    }

    /// Cancel the pending update and stop listening for changes.
    pub(crate) fn teardown(mut self) -> Result<(), KbdError> {
        drop(self.subscription.take());
        if self.state.pending_until.take().is_some() {
            self.timer.disarm()?;
        }
        debug!("Controller torn down");
        Ok(())
    }

    /// Current service level, `None` when there is no usable backlight.
    fn read_level(&self) -> Option<f64> {
        match self.backlight.brightness() {
            Ok(raw) => to_level(raw, self.max),
            Err(e) => {
                warn!("Could not read keyboard brightness: {e}");
                None
            }
        }
    }

    fn set_visible(&mut self, visible: bool) {
        if visible != self.state.visible {
            debug!("Indicator {}", if visible { "shown" } else { "hidden" });
        }
        self.state.visible = visible;
        self.indicator.set_visible(visible);
    }
}
