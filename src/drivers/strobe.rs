//! Anti-collision strobe driver.
//!
//! Generates the flash waveform on a single digital output: high for
//! `on_ms` at the start of every `period_ms`.  The control loop calls
//! [`StrobeDriver::tick`] every cycle; the pin is only written when the
//! level actually changes.
//!
//! A cadence change restarts the waveform on the next tick, so a faster
//! alert cadence flashes immediately instead of waiting out the old period.
//!
//! ## Dual-target design
//!
//! Generic over `embedded_hal::digital::OutputPin`: the firmware passes a
//! GPIO, the simulator and tests pass an in-memory pin.

use embedded_hal::digital::OutputPin;
use log::{info, warn};

use crate::app::ports::StrobePort;
use crate::policy::Cadence;
use crate::time::{Millis, elapsed};

pub struct StrobeDriver<P: OutputPin> {
    pin: P,
    enabled: bool,
    cadence: Cadence,
    /// Waveform origin; `None` restarts on the next tick.
    zero: Option<Millis>,
    level: bool,
}

impl<P: OutputPin> StrobeDriver<P> {
    /// Disabled, at `cadence`, pin driven low.
    pub fn new(mut pin: P, cadence: Cadence) -> Self {
        if let Err(e) = pin.set_low() {
            warn!("strobe pin init failed: {:?}", e);
        }
        Self {
            pin,
            enabled: false,
            cadence,
            zero: None,
            level: false,
        }
    }

    /// Advance the waveform to `now`.
    pub fn tick(&mut self, now: Millis) {
        let high = self.enabled && {
            let zero = *self.zero.get_or_insert(now);
            let period = Millis::from(self.cadence.period_ms.max(1));
            elapsed(now, zero) % period < Millis::from(self.cadence.on_ms)
        };
        self.drive(high);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn cadence(&self) -> Cadence {
        self.cadence
    }

    /// Level currently on the pin.
    pub fn is_lit(&self) -> bool {
        self.level
    }

    pub fn release(self) -> P {
        self.pin
    }

    fn drive(&mut self, high: bool) {
        if high == self.level {
            return;
        }
        let res = if high {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        match res {
            Ok(()) => self.level = high,
            Err(e) => warn!("strobe pin write failed: {:?}", e),
        }
    }
}

impl<P: OutputPin> StrobePort for StrobeDriver<P> {
    fn set_enabled(&mut self, enabled: bool) {
        if enabled == self.enabled {
            return;
        }
        self.enabled = enabled;
        self.zero = None;
        if !enabled {
            self.drive(false);
        }
        info!("strobe {}", if enabled { "on" } else { "off" });
    }

    fn set_cadence(&mut self, cadence: Cadence) {
        self.cadence = cadence;
        self.zero = None;
        info!(
            "strobe cadence {} ms on / {} ms period",
            cadence.on_ms, cadence.period_ms
        );
    }
}
