//! Main epoll loop

use std::time::Instant;

use log::debug;
use nix::{
    errno::Errno,
    sys::epoll::{Epoll, EpollCreateFlags, EpollEvent, EpollFlags, EpollTimeout},
};
use snafu::ResultExt;

use crate::{
    errors::{EpollSnafu, KbdError},
    extension::Extension,
    handlers::{Flow, Handler},
};

#[derive(Debug)]
pub(crate) struct Monitor {
    epoll: Epoll,
}

impl Monitor {
    pub(crate) fn new() -> Result<Self, KbdError> {
        Ok(Self {
            epoll: Epoll::new(EpollCreateFlags::EPOLL_CLOEXEC).context(EpollSnafu)?,
        })
    }

    fn setup(&self, handlers: &[Box<dyn Handler>]) -> Result<(), KbdError> {
        for (idx, handler) in handlers.iter().enumerate() {
            self.epoll
                .add(
                    handler.monitored(),
                    EpollEvent::new(EpollFlags::EPOLLIN | EpollFlags::EPOLLERR, idx as u64),
                )
                .context(EpollSnafu)?;
        }
        Ok(())
    }

    /// Dispatch events to `handlers` until one of them asks to quit.
    pub(crate) fn monitor(
        &self,
        mut handlers: Vec<Box<dyn Handler>>,
        extension: &mut Extension,
    ) -> Result<(), KbdError> {
        self.setup(&handlers)?;

        loop {
            let mut events = [EpollEvent::empty(); 8];
            let n = match self.epoll.wait(&mut events, EpollTimeout::NONE) {
                Ok(n) => n,
                Err(Errno::EINTR) => continue,
                Err(err) => return Err(err).context(EpollSnafu),
            };
            let now = Instant::now();
            for event in &events[..n] {
                let handler = &mut handlers[event.data() as usize];
                if handler.process(extension, now)? == Flow::Quit {
                    debug!("Leaving main loop");
                    return Ok(());
                }
            }
        }
    }
}
