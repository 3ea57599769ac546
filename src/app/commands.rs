//! Inbound commands to the application service.
//!
//! These are the bench / console / BLE control plane.  They travel through
//! the service's control channel and are applied at the start of the next
//! tick, never in the middle of one.

use crate::config::DataSource;
use crate::time::Millis;

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlCommand {
    /// Jump to LANDING on the next tick.
    ForceLanding,

    /// Jump to FLYING now and inhibit landing detection for a while.
    ForceFlying,

    /// Skip landing detection for at least this many more ms.
    ExtendLandingInhibit(Millis),

    /// Take the current barometric altitude as ground (AGL zero) and
    /// persist it.
    CaptureBaseline,

    /// Re-initialise the flight-phase machine.
    Reset,

    /// Feed a synthetic traffic alert (bench only).
    InjectAlert {
        severity: u8,
        bearing_deg: f32,
        rel_vertical_m: f32,
    },

    /// Drop a previously injected alert.
    ClearAlert,

    // Persisted settings.  Out-of-range values are rejected, not clamped.
    /// Annunciator volume, 0–30.
    SetVolume(u8),
    /// QNH in whole hPa.
    SetQnh(u16),
    /// Airfield elevation in feet.
    SetFieldElevation(u16),
    SetDataSource(DataSource),
}

impl ControlCommand {
    /// Map a serial-console key.
    ///
    /// | Key | Command |
    /// |-----|---------|
    /// | `F` | force flying |
    /// | `L` | force landing |
    /// | `R` | reset |
    /// | `C` | capture baseline |
    /// | `1`..`3` | inject an alert at that level, dead ahead, level |
    /// | `X` | clear alert |
    pub fn from_console_key(key: char) -> Option<Self> {
        let inject = |severity| Self::InjectAlert {
            severity,
            bearing_deg: 0.0,
            rel_vertical_m: 0.0,
        };
        match key.to_ascii_uppercase() {
            'F' => Some(Self::ForceFlying),
            'L' => Some(Self::ForceLanding),
            'R' => Some(Self::Reset),
            'C' => Some(Self::CaptureBaseline),
            '1' => Some(inject(1)),
            '2' => Some(inject(2)),
            '3' => Some(inject(3)),
            'X' => Some(Self::ClearAlert),
            _ => None,
        }
    }
}
