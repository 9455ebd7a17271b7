//! Shared fakes for unit tests.

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
    time::Duration,
};

use snafu::IntoError;

use crate::{
    backlight::{Backlight, Subscription},
    errors::{KbdError, RemoteCallSnafu, ServiceUnavailableSnafu},
    extension::Connector,
    indicator::{Indicator, Panel, ValueOrigin},
    timer::DebounceTimer,
};

fn remote_failure(method: &'static str) -> KbdError {
    RemoteCallSnafu { method }.into_error(zbus::Error::Failure("injected failure".into()))
}

#[derive(Default)]
struct BacklightInner {
    brightness: i32,
    max: i32,
    writes: Vec<i32>,
    max_queries: usize,
    fail_reads: bool,
    fail_writes: bool,
    subscriptions: usize,
    released: usize,
    on_change: Option<Box<dyn Fn() + Send>>,
}

/// In-memory backlight service. Clones share state.
#[derive(Clone, Default)]
pub(crate) struct FakeBacklight {
    inner: Rc<RefCell<BacklightInner>>,
}

impl FakeBacklight {
    pub(crate) fn new(brightness: i32, max: i32) -> Self {
        Self {
            inner: Rc::new(RefCell::new(BacklightInner {
                brightness,
                max,
                ..Default::default()
            })),
        }
    }

    /// Change the brightness behind the controller's back.
    pub(crate) fn set_external(&self, brightness: i32) {
        self.inner.borrow_mut().brightness = brightness;
    }

    pub(crate) fn fail_reads(&self, fail: bool) {
        self.inner.borrow_mut().fail_reads = fail;
    }

    pub(crate) fn fail_writes(&self, fail: bool) {
        self.inner.borrow_mut().fail_writes = fail;
    }

    pub(crate) fn writes(&self) -> Vec<i32> {
        self.inner.borrow().writes.clone()
    }

    pub(crate) fn max_queries(&self) -> usize {
        self.inner.borrow().max_queries
    }

    /// Emit a change notification to the current subscriber.
    pub(crate) fn notify_change(&self) {
        if let Some(on_change) = &self.inner.borrow().on_change {
            on_change();
        }
    }

    /// Subscriptions handed out and not yet released.
    pub(crate) fn live_subscriptions(&self) -> usize {
        let inner = self.inner.borrow();
        inner.subscriptions - inner.released
    }
}

impl Backlight for FakeBacklight {
    fn brightness(&self) -> Result<i32, KbdError> {
        let inner = self.inner.borrow();
        if inner.fail_reads {
            return Err(remote_failure("GetBrightness"));
        }
        Ok(inner.brightness)
    }

    fn set_brightness(&self, value: i32) -> Result<(), KbdError> {
        let mut inner = self.inner.borrow_mut();
        if inner.fail_writes {
            return Err(remote_failure("SetBrightness"));
        }
        inner.brightness = value;
        inner.writes.push(value);
        Ok(())
    }

    fn max_brightness(&self) -> Result<i32, KbdError> {
        let mut inner = self.inner.borrow_mut();
        inner.max_queries += 1;
        Ok(inner.max)
    }

    fn subscribe(&self, on_change: Box<dyn Fn() + Send>) -> Result<Subscription, KbdError> {
        {
            let mut inner = self.inner.borrow_mut();
            inner.subscriptions += 1;
            inner.on_change = Some(on_change);
        }
        let inner = self.inner.clone();
        Ok(Subscription::new(move || {
            let mut inner = inner.borrow_mut();
            inner.released += 1;
            inner.on_change = None;
        }))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TimerOp {
    Arm(Duration),
    Disarm,
}

/// Records timer operations.
///
/// Counts armed timers the way a scheduler that stacks callbacks would, so
/// a missing disarm before re-arming shows up as more than one.
#[derive(Debug, Default)]
pub(crate) struct FakeTimer {
    ops: RefCell<Vec<TimerOp>>,
    armed: Cell<usize>,
}

impl FakeTimer {
    pub(crate) fn ops(&self) -> Vec<TimerOp> {
        self.ops.borrow().clone()
    }

    pub(crate) fn armed_count(&self) -> usize {
        self.armed.get()
    }
}

impl DebounceTimer for FakeTimer {
    fn arm(&self, after: Duration) -> Result<(), KbdError> {
        self.ops.borrow_mut().push(TimerOp::Arm(after));
        self.armed.set(self.armed.get() + 1);
        Ok(())
    }

    fn disarm(&self) -> Result<(), KbdError> {
        self.ops.borrow_mut().push(TimerOp::Disarm);
        self.armed.set(self.armed.get().saturating_sub(1));
        Ok(())
    }
}

#[derive(Debug, Default)]
struct IndicatorInner {
    visibility: Vec<bool>,
    values: Vec<(f64, ValueOrigin)>,
    dropped: bool,
}

/// Indicator recording every call. Clones share state.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeIndicator {
    inner: Rc<RefCell<IndicatorInner>>,
}

impl FakeIndicator {
    pub(crate) fn visibility(&self) -> Vec<bool> {
        self.inner.borrow().visibility.clone()
    }

    pub(crate) fn values(&self) -> Vec<(f64, ValueOrigin)> {
        self.inner.borrow().values.clone()
    }

    /// Values set by reconciliation, not by the user.
    pub(crate) fn sync_values(&self) -> Vec<f64> {
        self.inner
            .borrow()
            .values
            .iter()
            .filter(|(_, origin)| *origin == ValueOrigin::Sync)
            .map(|(value, _)| *value)
            .collect()
    }

    pub(crate) fn is_dropped(&self) -> bool {
        self.inner.borrow().dropped
    }
}

impl Indicator for FakeIndicator {
    fn set_visible(&mut self, visible: bool) {
        self.inner.borrow_mut().visibility.push(visible);
    }

    fn set_value(&mut self, value: f64, origin: ValueOrigin) {
        self.inner.borrow_mut().values.push((value, origin));
    }
}

/// Drop marker for indicators handed out by [`FakePanel`].
struct PanelItem(FakeIndicator);

impl Indicator for PanelItem {
    fn set_visible(&mut self, visible: bool) {
        self.0.set_visible(visible);
    }

    fn set_value(&mut self, value: f64, origin: ValueOrigin) {
        self.0.set_value(value, origin);
    }
}

impl Drop for PanelItem {
    fn drop(&mut self) {
        self.0.inner.borrow_mut().dropped = true;
    }
}

/// Panel remembering where indicators went.
#[derive(Debug, Default)]
pub(crate) struct FakePanel {
    pub(crate) inserted: Rc<RefCell<Vec<(usize, &'static str, FakeIndicator)>>>,
}

impl Panel for FakePanel {
    fn add_indicator(
        &mut self,
        position: usize,
        accessible_name: &'static str,
        _icon_name: &'static str,
    ) -> Box<dyn Indicator> {
        let indicator = FakeIndicator::default();
        self.inserted
            .borrow_mut()
            .push((position, accessible_name, indicator.clone()));
        Box::new(PanelItem(indicator))
    }
}

/// Connector handing out a shared [`FakeBacklight`], or failing.
#[derive(Clone)]
pub(crate) struct FakeConnector {
    pub(crate) backlight: FakeBacklight,
    pub(crate) available: Rc<Cell<bool>>,
}

impl FakeConnector {
    pub(crate) fn new(backlight: FakeBacklight) -> Self {
        Self {
            backlight,
            available: Rc::new(Cell::new(true)),
        }
    }
}

impl Connector for FakeConnector {
    fn connect(&self) -> Result<Box<dyn Backlight>, KbdError> {
        if !self.available.get() {
            return Err(ServiceUnavailableSnafu
                .into_error(zbus::Error::Failure("no such service".into())));
        }
        Ok(Box::new(self.backlight.clone()))
    }
}
