//! Keyboard backlight slider. Keeps a brightness slider in sync with the
//! UPower keyboard backlight service.
//!
//! There is no public code API for you to use! However, the command line
//! interface should be stable.

use std::{rc::Rc, time::Duration, time::Instant};

use anyhow::Context;
use clap::Parser;

use backlight::Bus;
use extension::{Extension, UPowerConnector};
use handlers::{ChangeListener, DebounceExpiry, Handler, SliderInput, TerminationSignals};
use indicator::TerminalPanel;
use monitor::Monitor;
use timer::TimerFdSlot;

mod backlight;
mod controller;
mod errors;
mod extension;
mod flags;
mod handlers;
mod indicator;
mod input;
mod monitor;
mod state;
mod timer;

#[cfg(test)]
mod test_utils;

fn main() -> anyhow::Result<()> {
    let cli = flags::Cli::parse();
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if cli.verbose { "debug" } else { "warn" }),
    )
    .init();
    run(&cli)
}

/// Enable the indicator and run until input ends or we are told to stop.
fn run(config: &flags::Cli) -> anyhow::Result<()> {
    // Before any thread exists, so none of them takes the signals.
    let signals = TerminationSignals::new()?;
    let timer = Rc::new(TimerFdSlot::new()?);
    let changes = ChangeListener::new()?;
    let bus = if config.session {
        Bus::Session
    } else {
        Bus::System
    };

    let mut extension = Extension::new(
        Box::new(TerminalPanel::stdout()),
        Box::new(UPowerConnector { bus }),
        timer.clone(),
        changes.notifier(),
        Duration::from_millis(config.debounce.into()),
    );
    extension
        .enable(Instant::now())
        .context("Failed to enable keyboard brightness indicator")?;

    let mut handlers: Vec<Box<dyn Handler>> = vec![
        Box::new(signals),
        Box::new(changes),
        Box::new(DebounceExpiry::new(timer)),
    ];
    if !config.no_input {
        if let Some(input) = SliderInput::stdin()? {
            handlers.push(Box::new(input));
        }
    }
    let result = Monitor::new()?.monitor(handlers, &mut extension);
    extension.disable()?;
    Ok(result?)
}
