//! One-shot debounce timer slot

use std::{os::fd::AsFd, time::Duration};

use nix::{
    errno::Errno,
    sys::{
        time::TimeSpec,
        timerfd::{ClockId, Expiration, TimerFd, TimerFlags, TimerSetTimeFlags},
    },
};
use snafu::ResultExt;

use crate::errors::{KbdError, TimerSnafu};

/// A single timer slot. Arming replaces whatever was armed before.
pub(crate) trait DebounceTimer {
    /// Fire once after `after`.
    fn arm(&self, after: Duration) -> Result<(), KbdError>;
    /// Cancel a pending expiry, if any.
    fn disarm(&self) -> Result<(), KbdError>;
}

/// Debounce timer on a monotonic `timerfd`, polled by the main loop.
#[derive(Debug)]
pub(crate) struct TimerFdSlot {
    fd: TimerFd,
}

impl TimerFdSlot {
    pub(crate) fn new() -> Result<Self, KbdError> {
        Ok(Self {
            fd: TimerFd::new(
                ClockId::CLOCK_MONOTONIC,
                TimerFlags::TFD_NONBLOCK | TimerFlags::TFD_CLOEXEC,
            )
            .context(TimerSnafu)?,
        })
    }

    /// Consume the expiry so the fd stops polling readable.
    ///
    /// `false` if nothing had expired, e.g. the timer was re-armed after it
    /// became readable.
    pub(crate) fn acknowledge(&self) -> Result<bool, KbdError> {
        match self.fd.wait() {
            Ok(()) => Ok(true),
            Err(Errno::EAGAIN) => Ok(false),
            Err(e) => Err(e).context(TimerSnafu),
        }
    }
}

impl AsFd for TimerFdSlot {
    fn as_fd(&self) -> std::os::fd::BorrowedFd<'_> {
        self.fd.as_fd()
    }
}

impl DebounceTimer for TimerFdSlot {
    fn arm(&self, after: Duration) -> Result<(), KbdError> {
        // A zero expiry would disarm the timerfd instead.
        let after = after.max(Duration::from_nanos(1));
        self.fd
            .set(
                Expiration::OneShot(TimeSpec::from_duration(after)),
                TimerSetTimeFlags::empty(),
            )
            .context(TimerSnafu)
    }

    fn disarm(&self) -> Result<(), KbdError> {
        self.fd.unset().context(TimerSnafu)
    }
}
