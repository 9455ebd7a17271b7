//! Panel indicator hosting the brightness slider

use std::{cell::RefCell, io::Write, rc::Rc};

use log::{debug, warn};

/// Accessible name of the slider.
pub(crate) const ACCESSIBLE_NAME: &str = "Keyboard brightness";
/// Icon shown next to the slider.
pub(crate) const ICON_NAME: &str = "keyboard-brightness-symbolic";

/// Who moved the slider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ValueOrigin {
    /// Direct user interaction.
    User,
    /// Reconciliation with the service. Never fed back as a user slide.
    Sync,
}

/// The panel item with the slider.
pub(crate) trait Indicator {
    fn set_visible(&mut self, visible: bool);
    /// Move the slider to `value` in `[0.0, 1.0]`.
    fn set_value(&mut self, value: f64, origin: ValueOrigin);
}

/// Container that indicators are inserted into.
pub(crate) trait Panel {
    /// Insert a new, hidden indicator at `position` among the panel's items.
    fn add_indicator(
        &mut self,
        position: usize,
        accessible_name: &'static str,
        icon_name: &'static str,
    ) -> Box<dyn Indicator>;
}

/// Panel that renders indicator state as text lines.
pub(crate) struct TerminalPanel {
    out: Rc<RefCell<dyn Write>>,
}

impl TerminalPanel {
    pub(crate) fn new(out: Rc<RefCell<dyn Write>>) -> Self {
        Self { out }
    }

    pub(crate) fn stdout() -> Self {
        Self::new(Rc::new(RefCell::new(std::io::stdout())))
    }
}

impl Panel for TerminalPanel {
    fn add_indicator(
        &mut self,
        position: usize,
        accessible_name: &'static str,
        icon_name: &'static str,
    ) -> Box<dyn Indicator> {
        debug!("Adding indicator {accessible_name:?} ({icon_name}) at position {position}");
        Box::new(TerminalIndicator {
            out: self.out.clone(),
            label: accessible_name,
            visible: false,
            value: 0.0,
            last_line: None,
        })
    }
}

/// Indicator printing one line per visible change of state.
struct TerminalIndicator {
    out: Rc<RefCell<dyn Write>>,
    label: &'static str,
    visible: bool,
    value: f64,
    last_line: Option<String>,
}

impl TerminalIndicator {
    fn render(&mut self) {
        let line = if self.visible {
            format!("{}: {}%", self.label, (self.value * 100.0).round() as i32)
        } else {
            format!("{}: hidden", self.label)
        };
        if self.last_line.as_deref() == Some(line.as_str()) {
            return;
        }
        let mut out = self.out.borrow_mut();
        if let Err(e) = writeln!(out, "{line}").and_then(|()| out.flush()) {
            warn!("Failed to write indicator state: {e}");
        }
        self.last_line = Some(line);
    }
}

impl Indicator for TerminalIndicator {
    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        self.render();
    }

    fn set_value(&mut self, value: f64, _origin: ValueOrigin) {
        self.value = value;
        // Hidden sliders still track the value, there is just nothing to show.
        if self.visible {
            self.render();
        }
    }
}

impl Drop for TerminalIndicator {
    fn drop(&mut self) {
        if self.visible {
            self.visible = false;
            self.render();
        }
    }
}
