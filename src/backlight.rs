//! Abstraction for the keyboard backlight service

use std::thread;

use log::{debug, warn};
use snafu::ResultExt;
use zbus::{blocking::Connection, proxy};

use crate::errors::{KbdError, RemoteCallSnafu, ServiceUnavailableSnafu, SpawnSnafu};

/// D-Bus binding for `org.freedesktop.UPower.KbdBacklight`.
#[proxy(
    interface = "org.freedesktop.UPower.KbdBacklight",
    default_service = "org.freedesktop.UPower",
    default_path = "/org/freedesktop/UPower/KbdBacklight",
    gen_async = false,
    blocking_name = "KbdBacklightProxy"
)]
trait KbdBacklight {
    fn get_brightness(&self) -> zbus::Result<i32>;

    fn set_brightness(&self, value: i32) -> zbus::Result<()>;

    fn get_max_brightness(&self) -> zbus::Result<i32>;

    /// Emitted on every brightness change, whoever caused it.
    #[zbus(signal)]
    fn brightness_changed(&self, value: i32) -> zbus::Result<()>;
}

/// Remote brightness service as seen by the controller.
///
/// Readings are raw integers in `0..=max`. A negative reading means there is
/// no keyboard backlight.
pub(crate) trait Backlight {
    /// Get the current brightness
    fn brightness(&self) -> Result<i32, KbdError>;
    /// Request a new brightness
    fn set_brightness(&self, value: i32) -> Result<(), KbdError>;
    /// Get the max brightness supported
    fn max_brightness(&self) -> Result<i32, KbdError>;
    /// Call `on_change` whenever the service reports a brightness change.
    ///
    /// `on_change` may run on another thread. Delivery stops when the
    /// returned [`Subscription`] is dropped.
    fn subscribe(&self, on_change: Box<dyn Fn() + Send>) -> Result<Subscription, KbdError>;
}

/// Handle for a change notification subscription. Released on drop.
pub(crate) struct Subscription {
    release: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub(crate) fn new(release: impl FnOnce() + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.release.is_some())
            .finish()
    }
}

/// Convert a slider level to the service's integer range.
pub(crate) fn to_raw(level: f64, max: i32) -> i32 {
    (level.clamp(0.0, 1.0) * f64::from(max)).round() as i32
}

/// Convert a service reading to a slider level.
///
/// `None` when the reading says there is no usable backlight.
pub(crate) fn to_level(raw: i32, max: i32) -> Option<f64> {
    if raw < 0 || max <= 0 {
        None
    } else {
        Some(f64::from(raw) / f64::from(max))
    }
}

/// Which message bus to find UPower on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Bus {
    System,
    /// For testing against a mock service.
    Session,
}

impl Bus {
    fn connect(self) -> zbus::Result<Connection> {
        match self {
            Bus::System => Connection::system(),
            Bus::Session => Connection::session(),
        }
    }
}

/// [`Backlight`] backed by UPower over D-Bus.
pub(crate) struct UPowerBacklight {
    bus: Bus,
    proxy: KbdBacklightProxy<'static>,
    /// Queried once on connect.
    max: i32,
}

impl UPowerBacklight {
    /// Connect to the service and query its maximum.
    ///
    /// Fails if the bus or the service is not there.
    pub(crate) fn connect(bus: Bus) -> Result<Self, KbdError> {
        let connection = bus.connect().context(ServiceUnavailableSnafu)?;
        let proxy = KbdBacklightProxy::new(&connection).context(ServiceUnavailableSnafu)?;
        let max = proxy
            .get_max_brightness()
            .context(ServiceUnavailableSnafu)?;
        debug!("Connected to keyboard backlight on {bus:?} bus, max brightness {max}");
        Ok(Self { bus, proxy, max })
    }
}

impl Backlight for UPowerBacklight {
    fn brightness(&self) -> Result<i32, KbdError> {
        self.proxy.get_brightness().context(RemoteCallSnafu {
            method: "GetBrightness",
        })
    }

    fn set_brightness(&self, value: i32) -> Result<(), KbdError> {
        self.proxy.set_brightness(value).context(RemoteCallSnafu {
            method: "SetBrightness",
        })
    }

    fn max_brightness(&self) -> Result<i32, KbdError> {
        Ok(self.max)
    }

    fn subscribe(&self, on_change: Box<dyn Fn() + Send>) -> Result<Subscription, KbdError> {
        // Own connection, so closing it ends the signal stream without
        // touching the one used for method calls.
        let connection = self.bus.connect().context(ServiceUnavailableSnafu)?;
        let proxy = KbdBacklightProxy::new(&connection).context(ServiceUnavailableSnafu)?;
        let changes = proxy
            .receive_brightness_changed()
            .context(RemoteCallSnafu {
                method: "BrightnessChanged",
            })?;

        thread::Builder::new()
            .name("brightness-changed".into())
            .spawn(move || {
                for signal in changes {
                    match signal.args() {
                        Ok(args) => debug!("BrightnessChanged({})", args.value()),
                        Err(e) => warn!("Malformed BrightnessChanged signal: {e}"),
                    }
                    on_change();
                }
                debug!("BrightnessChanged stream ended");
            })
            .context(SpawnSnafu)?;

        Ok(Subscription::new(move || {
            if let Err(e) = connection.close() {
                warn!("Failed to close notification connection: {e}");
            }
        }))
    }
}
