//! Error types

use snafu::{prelude::*, Backtrace};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub(crate) enum KbdError {
    #[snafu(display("Keyboard backlight service unavailable: {source}"))]
    ServiceUnavailable {
        source: zbus::Error,
        backtrace: Backtrace,
    },
    #[snafu(display("Call to {method} on keyboard backlight service failed: {source}"))]
    RemoteCall {
        method: &'static str,
        source: zbus::Error,
        backtrace: Backtrace,
    },
    #[snafu(display("Debounce timer error: {source}"))]
    Timer {
        source: nix::Error,
        backtrace: Backtrace,
    },
    #[snafu(display("Epoll polling error: {source}"))]
    Epoll {
        source: nix::Error,
        backtrace: Backtrace,
    },
    #[snafu(display("Change notification eventfd error: {source}"))]
    EventFd {
        source: nix::Error,
        backtrace: Backtrace,
    },
    #[snafu(display("Signal handling error: {source}"))]
    Signal {
        source: nix::Error,
        backtrace: Backtrace,
    },
    #[snafu(display("Failed to read slider input: {source}"))]
    Input {
        source: std::io::Error,
        backtrace: Backtrace,
    },
    #[snafu(display("Failed to start notification thread: {source}"))]
    Spawn {
        source: std::io::Error,
        backtrace: Backtrace,
    },
}
