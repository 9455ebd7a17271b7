//! Slider movements read as text lines

use log::warn;
use smallvec::SmallVec;

/// Slider step for arrow keys.
pub(crate) const KEY_STEP: f64 = 0.1;
/// Slider step for one scroll notch.
pub(crate) const SCROLL_STEP: f64 = 0.02;
/// Longest partial line kept while waiting for its newline.
pub(crate) const MAX_LINE: usize = 4096;

/// One user interaction with the slider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum SliderCommand {
    /// Drag or click to an absolute level.
    MoveTo(f64),
    /// Relative movement from a key press or scroll.
    Step(f64),
}

impl SliderCommand {
    /// Level the slider ends up at when starting from `current`.
    pub(crate) fn apply(self, current: f64) -> f64 {
        match self {
            SliderCommand::MoveTo(level) => level,
            SliderCommand::Step(delta) => current + delta,
        }
        .clamp(0.0, 1.0)
    }
}

/// Parse one input line. Blank lines and garbage yield `None`.
pub(crate) fn parse_command(line: &str) -> Option<SliderCommand> {
    let line = line.trim();
    let cmd = match line {
        "" => return None,
        "up" => SliderCommand::Step(KEY_STEP),
        "down" => SliderCommand::Step(-KEY_STEP),
        "scroll-up" => SliderCommand::Step(SCROLL_STEP),
        "scroll-down" => SliderCommand::Step(-SCROLL_STEP),
        _ => {
            let level = match line.strip_suffix('%') {
                Some(pct) => pct.trim().parse::<f64>().map(|p| p / 100.0),
                None => line.parse::<f64>(),
            };
            match level {
                Ok(level) if level.is_finite() => SliderCommand::MoveTo(level),
                _ => {
                    warn!("Ignoring unrecognised slider input {line:?}");
                    return None;
                }
            }
        }
    };
    Some(cmd)
}

/// Collects raw bytes and hands back complete lines.
#[derive(Debug, Default)]
pub(crate) struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    /// Append `bytes` and parse every line completed by them.
    pub(crate) fn feed(&mut self, bytes: &[u8]) -> SmallVec<[SliderCommand; 4]> {
        self.pending.extend_from_slice(bytes);
        let mut commands = SmallVec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            commands.extend(parse_command(&String::from_utf8_lossy(&line)));
        }
        if self.pending.len() > MAX_LINE {
            warn!(
                "Dropping {} bytes of slider input without a newline",
                self.pending.len()
            );
            self.pending.clear();
        }
        commands
    }

    /// Parse whatever is left once input has ended.
    pub(crate) fn finish(&mut self) -> Option<SliderCommand> {
        let rest = std::mem::take(&mut self.pending);
        parse_command(&String::from_utf8_lossy(&rest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_levels_and_percentages() {
        assert_eq!(parse_command("0.42"), Some(SliderCommand::MoveTo(0.42)));
        assert_eq!(parse_command(" 1 \n"), Some(SliderCommand::MoveTo(1.0)));
        assert_eq!(parse_command("50%"), Some(SliderCommand::MoveTo(0.5)));
    }

    #[test]
    fn parses_key_and_scroll_steps() {
        assert_eq!(parse_command("up"), Some(SliderCommand::Step(KEY_STEP)));
        assert_eq!(parse_command("down"), Some(SliderCommand::Step(-KEY_STEP)));
        assert_eq!(
            parse_command("scroll-up"),
            Some(SliderCommand::Step(SCROLL_STEP))
        );
        assert_eq!(
            parse_command("scroll-down"),
            Some(SliderCommand::Step(-SCROLL_STEP))
        );
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("brighter"), None);
        assert_eq!(parse_command("NaN"), None);
        assert_eq!(parse_command("inf"), None);
    }

    #[test]
    fn steps_clamp_at_the_ends() {
        assert_eq!(SliderCommand::Step(KEY_STEP).apply(0.95), 1.0);
        assert_eq!(SliderCommand::Step(-KEY_STEP).apply(0.05), 0.0);
        assert_eq!(SliderCommand::MoveTo(1.2).apply(0.3), 1.0);
        assert_eq!(SliderCommand::Step(0.25).apply(0.5), 0.75);
    }

    #[test]
    fn buffer_holds_partial_lines() {
        let mut buf = LineBuffer::default();
        assert!(buf.feed(b"0.").is_empty());
        assert_eq!(
            buf.feed(b"25\nup\n0.7").as_slice(),
            [SliderCommand::MoveTo(0.25), SliderCommand::Step(KEY_STEP)]
        );
        assert_eq!(buf.finish(), Some(SliderCommand::MoveTo(0.7)));
        assert_eq!(buf.finish(), None);
    }

    #[test]
    fn buffer_skips_bad_lines() {
        let mut buf = LineBuffer::default();
        assert_eq!(
            buf.feed(b"\nnope\n10%\n").as_slice(),
            [SliderCommand::MoveTo(0.1)]
        );
    }

    #[test]
    fn overlong_partial_line_is_dropped() {
        let mut buf = LineBuffer::default();
        assert!(buf.feed(&[b'7'; MAX_LINE + 1]).is_empty());
        // The runaway digits are gone; the next line parses on its own.
        assert_eq!(buf.feed(b"0.2\n").as_slice(), [SliderCommand::MoveTo(0.2)]);
        assert_eq!(buf.finish(), None);
    }

    #[test]
    fn partial_line_at_the_cap_is_kept() {
        let mut buf = LineBuffer::default();
        let mut line = vec![b' '; MAX_LINE - 3];
        line.extend_from_slice(b"0.4");
        assert!(buf.feed(&line).is_empty());
        assert_eq!(buf.feed(b"\n").as_slice(), [SliderCommand::MoveTo(0.4)]);
    }
}
