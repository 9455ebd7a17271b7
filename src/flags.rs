//! Command line argument parsing

#[derive(Debug, clap::Parser)]
#[command(version, about, long_about = None)]
/// Keyboard backlight slider. Keeps a brightness slider in sync with UPower.
///
/// Reads slider movements from stdin, one per line: a level such as `0.42`
/// or `42%`, or one of `up`, `down`, `scroll-up`, `scroll-down`.
/// Writes the indicator state to stdout.
pub struct Cli {
    /// Connect to the session bus instead of the system bus.
    #[clap(long)]
    pub session: bool,
    /// Quiet time in milliseconds after the last slider movement before the
    /// slider is reconciled with the service.
    #[clap(short, long, default_value_t = 1000)]
    pub debounce: u32,
    /// Do not read slider movements from stdin, only show the state.
    #[clap(long)]
    pub no_input: bool,
    /// Enable extra verbosity!
    #[clap(short, long)]
    pub verbose: bool,
}
