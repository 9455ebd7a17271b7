//! Enable/disable lifecycle of the brightness indicator

use std::{
    rc::Rc,
    sync::Arc,
    time::{Duration, Instant},
};

use log::{debug, info};

use crate::{
    backlight::{Backlight, Bus, UPowerBacklight},
    controller::Controller,
    errors::KbdError,
    indicator::{Panel, ACCESSIBLE_NAME, ICON_NAME},
    timer::DebounceTimer,
};

/// Where the indicator goes among its siblings in the panel.
pub(crate) const PANEL_POSITION: usize = 2;

/// Opens a connection to the brightness service.
pub(crate) trait Connector {
    fn connect(&self) -> Result<Box<dyn Backlight>, KbdError>;
}

#[derive(Debug)]
pub(crate) struct UPowerConnector {
    pub bus: Bus,
}

impl Connector for UPowerConnector {
    fn connect(&self) -> Result<Box<dyn Backlight>, KbdError> {
        Ok(Box::new(UPowerBacklight::connect(self.bus)?))
    }
}

/// Owns the controller while enabled.
pub(crate) struct Extension {
    panel: Box<dyn Panel>,
    connector: Box<dyn Connector>,
    timer: Rc<dyn DebounceTimer>,
    /// Wakes the main loop when the service reports a change. Called from
    /// the notification thread.
    notify: Arc<dyn Fn() + Send + Sync>,
    debounce: Duration,
    controller: Option<Controller>,
}

impl Extension {
    pub(crate) fn new(
        panel: Box<dyn Panel>,
        connector: Box<dyn Connector>,
        timer: Rc<dyn DebounceTimer>,
        notify: Arc<dyn Fn() + Send + Sync>,
        debounce: Duration,
    ) -> Self {
        Self {
            panel,
            connector,
            timer,
            notify,
            debounce,
            controller: None,
        }
    }

    /// Connect to the service and put the indicator in the panel.
    ///
    /// If the service is unavailable the error is returned and no indicator
    /// is created.
    pub(crate) fn enable(&mut self, now: Instant) -> Result<(), KbdError> {
        if self.controller.is_some() {
            debug!("Already enabled");
            return Ok(());
        }
        let backlight = self.connector.connect()?;
        let notify = self.notify.clone();
        let subscription = backlight.subscribe(Box::new(move || notify()))?;
        let indicator = self
            .panel
            .add_indicator(PANEL_POSITION, ACCESSIBLE_NAME, ICON_NAME);

        let mut controller =
            Controller::new(backlight, indicator, self.timer.clone(), self.debounce, now)?;
        controller.attach(subscription);
        controller.on_remote_changed(now)?;
        self.controller = Some(controller);
        info!("Keyboard brightness indicator enabled");
        Ok(())
    }

    /// Remove the indicator and release everything it holds.
    pub(crate) fn disable(&mut self) -> Result<(), KbdError> {
        if let Some(controller) = self.controller.take() {
            controller.teardown()?;
            info!("Keyboard brightness indicator disabled");
        }
        Ok(())
    }

    pub(crate) fn controller_mut(&mut self) -> Option<&mut Controller> {
        self.controller.as_mut()
    }
}
