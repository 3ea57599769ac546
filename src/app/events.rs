//! Outbound application events.
//!
//! The [`HaloService`](super::service::HaloService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log to serial, notify a BLE
//! characteristic, and so on.

use crate::fsm::Phase;
use crate::fsm::context::FlightRecord;
use crate::app::ports::{ConfigError, StorageError};
use crate::config::HaloSettings;
use crate::time::Millis;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The machine was (re-)initialised.
    Started(Phase),

    /// The flight phase changed.
    PhaseChanged { from: Phase, to: Phase },

    /// A new traffic alert was counted.
    AlertRaised {
        severity: u8,
        bearing_deg: f32,
        count: u16,
    },

    /// Debounced nav-link edge.
    NavLinkChanged(bool),

    /// AGL zero captured at this MSL altitude (m).
    BaselineCaptured(f32),

    /// Landing detection inhibited until this tick.
    LandingInhibited { until: Millis },

    /// A completed flight was written to the log.
    FlightRecorded(FlightRecord),

    /// Writing the flight log failed; the flight still counts as landed.
    FlightRecordFailed(StorageError),

    /// A settings change was applied and written to storage.
    SettingsSaved(HaloSettings),

    /// A settings change failed validation and was dropped.
    SettingsRejected(ConfigError),

    /// A settings change was applied but could not be written; it lasts
    /// until the next restart.
    SettingsSaveFailed(ConfigError),
}
