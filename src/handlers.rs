//! Handlers for activity on file descriptors

use std::{os::fd::BorrowedFd, time::Instant};

use log::error;

use crate::{errors::KbdError, extension::Extension};

/// What the main loop should do after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    Quit,
}

/// Handles some type of notification
pub(crate) trait Handler {
    /// File descriptor that needs to be monitored for this handler
    fn monitored(&self) -> BorrowedFd<'_>;
    /// Called when the monitored fd is readable
    fn process(&mut self, extension: &mut Extension, now: Instant) -> Result<Flow, KbdError>;
}

/// Report failed service calls the way the shell reports uncaught errors:
/// log and carry on. No retries.
fn report(result: Result<(), KbdError>) -> Result<(), KbdError> {
    match result {
        Err(e @ KbdError::RemoteCall { .. }) => {
            error!("{e}");
            Ok(())
        }
        other => other,
    }
}

pub(crate) use change::ChangeListener;
pub(crate) use debounce::DebounceExpiry;
pub(crate) use signals::TerminationSignals;
pub(crate) use slider::SliderInput;

/// Slider movements on stdin
mod slider {
    use std::{
        fs::File,
        io::{ErrorKind, Read},
        os::fd::{AsFd, BorrowedFd},
        time::Instant,
    };

    use log::{debug, warn};
    use nix::{
        errno::Errno,
        sys::{
            epoll::{Epoll, EpollCreateFlags, EpollEvent, EpollFlags},
            eventfd::{EfdFlags, EventFd},
        },
    };
    use snafu::ResultExt;

    use crate::{
        errors::{EpollSnafu, EventFdSnafu, InputSnafu, KbdError},
        extension::Extension,
        input::{LineBuffer, SliderCommand},
    };

    use super::{report, Flow, Handler};

    #[derive(Debug)]
    pub(crate) struct SliderInput {
        input: File,
        buffer: LineBuffer,
        /// Stands in for `input` in the epoll set when `input` is a regular
        /// file. Never drained, so it stays readable until EOF.
        always_ready: Option<EventFd>,
    }

    impl SliderInput {
        /// Wrap a pipe, socket or terminal.
        pub(crate) fn new(input: File) -> Self {
            Self {
                input,
                buffer: LineBuffer::default(),
                always_ready: None,
            }
        }

        /// Wrap any input, or `None` if it can never be read from the loop.
        ///
        /// Regular files cannot be polled but never block, so they are read
        /// to EOF on successive loop turns. Other unpollable inputs such as
        /// `/dev/null` are given up on.
        pub(crate) fn open(input: File) -> Result<Option<Self>, KbdError> {
            if input.metadata().context(InputSnafu)?.is_file() {
                let always_ready = EventFd::from_value_and_flags(
                    1,
                    EfdFlags::EFD_CLOEXEC | EfdFlags::EFD_NONBLOCK,
                )
                .context(EventFdSnafu)?;
                return Ok(Some(Self {
                    always_ready: Some(always_ready),
                    ..Self::new(input)
                }));
            }
            let trial = Epoll::new(EpollCreateFlags::EPOLL_CLOEXEC).context(EpollSnafu)?;
            match trial.add(&input, EpollEvent::new(EpollFlags::EPOLLIN, 0)) {
                Ok(()) => Ok(Some(Self::new(input))),
                Err(Errno::EPERM) => {
                    warn!("Slider input cannot be polled, running without it");
                    Ok(None)
                }
                Err(e) => Err(e).context(EpollSnafu),
            }
        }

        /// Read from a duplicate of stdin, unbuffered.
        pub(crate) fn stdin() -> Result<Option<Self>, KbdError> {
            let fd = std::io::stdin()
                .as_fd()
                .try_clone_to_owned()
                .context(InputSnafu)?;
            Self::open(File::from(fd))
        }

        fn slide(
            extension: &mut Extension,
            cmd: SliderCommand,
            now: Instant,
        ) -> Result<(), KbdError> {
            let Some(controller) = extension.controller_mut() else {
                return Ok(());
            };
            if !controller.is_visible() {
                warn!("Keyboard brightness slider is hidden, ignoring {cmd:?}");
                return Ok(());
            }
            let level = cmd.apply(controller.displayed());
            report(controller.on_user_slide(level, now))
        }
    }

    impl Handler for SliderInput {
        fn monitored(&self) -> BorrowedFd<'_> {
            match &self.always_ready {
                Some(ready) => ready.as_fd(),
                None => self.input.as_fd(),
            }
        }

        fn process(&mut self, extension: &mut Extension, now: Instant) -> Result<Flow, KbdError> {
            let mut buf = [0u8; 1024];
            let n = match self.input.read(&mut buf) {
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => return Ok(Flow::Continue),
                Err(e) => return Err(e).context(InputSnafu),
            };
            if n == 0 {
                debug!("Slider input closed");
                if let Some(cmd) = self.buffer.finish() {
                    Self::slide(extension, cmd, now)?;
                }
                return Ok(Flow::Quit);
            }
            for cmd in self.buffer.feed(&buf[..n]) {
                Self::slide(extension, cmd, now)?;
            }
            Ok(Flow::Continue)
        }
    }
}

/// BrightnessChanged notifications forwarded through an eventfd
mod change {
    use std::{
        os::fd::{AsFd, BorrowedFd},
        sync::Arc,
        time::Instant,
    };

    use log::{debug, warn};
    use nix::{
        errno::Errno,
        sys::eventfd::{EfdFlags, EventFd},
    };
    use snafu::ResultExt;

    use crate::{
        errors::{EventFdSnafu, KbdError},
        extension::Extension,
    };

    use super::{report, Flow, Handler};

    #[derive(Debug)]
    pub(crate) struct ChangeListener {
        events: Arc<EventFd>,
    }

    impl ChangeListener {
        pub(crate) fn new() -> Result<Self, KbdError> {
            Ok(Self {
                events: Arc::new(
                    EventFd::from_value_and_flags(0, EfdFlags::EFD_CLOEXEC | EfdFlags::EFD_NONBLOCK)
                        .context(EventFdSnafu)?,
                ),
            })
        }

        /// Callback that wakes this handler. Safe to call from any thread.
        pub(crate) fn notifier(&self) -> Arc<dyn Fn() + Send + Sync> {
            let events = self.events.clone();
            Arc::new(move || {
                if let Err(e) = events.write(1) {
                    warn!("Failed to forward brightness change: {e}");
                }
            })
        }
    }

    impl Handler for ChangeListener {
        fn monitored(&self) -> BorrowedFd<'_> {
            self.events.as_fd()
        }

        fn process(&mut self, extension: &mut Extension, now: Instant) -> Result<Flow, KbdError> {
            // Several notifications may have piled up. One sync covers them all.
            match self.events.read() {
                Ok(count) => debug!("{count} brightness change notification(s)"),
                Err(Errno::EAGAIN) => return Ok(Flow::Continue),
                Err(e) => return Err(e).context(EventFdSnafu),
            }
            if let Some(controller) = extension.controller_mut() {
                report(controller.on_remote_changed(now))?;
            }
            Ok(Flow::Continue)
        }
    }
}

/// Debounce timer expiry
mod debounce {
    use std::{
        os::fd::{AsFd, BorrowedFd},
        rc::Rc,
        time::Instant,
    };

    use crate::{errors::KbdError, extension::Extension, timer::TimerFdSlot};

    use super::{report, Flow, Handler};

    #[derive(Debug)]
    pub(crate) struct DebounceExpiry {
        timer: Rc<TimerFdSlot>,
    }

    impl DebounceExpiry {
        pub(crate) fn new(timer: Rc<TimerFdSlot>) -> Self {
            Self { timer }
        }
    }

    impl Handler for DebounceExpiry {
        fn monitored(&self) -> BorrowedFd<'_> {
            self.timer.as_fd()
        }

        fn process(&mut self, extension: &mut Extension, now: Instant) -> Result<Flow, KbdError> {
            // Re-armed since it became readable: nothing expired after all.
            if !self.timer.acknowledge()? {
                return Ok(Flow::Continue);
            }
            if let Some(controller) = extension.controller_mut() {
                report(controller.on_debounce_expired(now))?;
            }
            Ok(Flow::Continue)
        }
    }
}

/// SIGINT/SIGTERM
mod signals {
    use std::{
        os::fd::{AsFd, BorrowedFd},
        time::Instant,
    };

    use log::info;
    use nix::sys::{
        signal::{SigSet, Signal},
        signalfd::{SfdFlags, SignalFd},
    };
    use snafu::ResultExt;

    use crate::{
        errors::{KbdError, SignalSnafu},
        extension::Extension,
    };

    use super::{Flow, Handler};

    #[derive(Debug)]
    pub(crate) struct TerminationSignals {
        fd: SignalFd,
    }

    impl TerminationSignals {
        /// Block SIGINT and SIGTERM for this thread and read them from a
        /// signalfd instead.
        ///
        /// Threads started afterwards inherit the mask, so call this first.
        pub(crate) fn new() -> Result<Self, KbdError> {
            let mut mask = SigSet::empty();
            mask.add(Signal::SIGINT);
            mask.add(Signal::SIGTERM);
            mask.thread_block().context(SignalSnafu)?;
            Ok(Self {
                fd: SignalFd::with_flags(&mask, SfdFlags::SFD_NONBLOCK | SfdFlags::SFD_CLOEXEC)
                    .context(SignalSnafu)?,
            })
        }
    }

    impl Handler for TerminationSignals {
        fn monitored(&self) -> BorrowedFd<'_> {
            self.fd.as_fd()
        }

        fn process(&mut self, _extension: &mut Extension, _now: Instant) -> Result<Flow, KbdError> {
            match self.fd.read_signal().context(SignalSnafu)? {
                Some(info) => {
                    info!("Received signal {}, shutting down", info.ssi_signo);
                    Ok(Flow::Quit)
                }
                None => Ok(Flow::Continue),
            }
        }
    }
}
