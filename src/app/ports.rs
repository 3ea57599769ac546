//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ HaloService (domain)
//! ```
//!
//! Driven adapters (nav receiver, strobe, audio player, display, flight log,
//! settings store, event sinks, storage) implement these traits.  The
//! [`HaloService`](super::service::HaloService) consumes them via generics,
//! so the flight-phase machine never touches hardware directly.

use crate::config::{DataSource, HaloSettings};
use crate::fsm::context::{AudioCue, FlightRecord, Page, TelemetrySnapshot, TrafficAlert};
use crate::policy::Cadence;
use crate::time::Millis;

// ───────────────────────────────────────────────────────────────
// Nav port (driven adapter: receiver → domain)
// ───────────────────────────────────────────────────────────────

/// Everything the navigation layer knows at one instant.
#[derive(Debug, Clone, Copy, Default)]
pub struct NavReading {
    pub telemetry: TelemetrySnapshot,
    pub traffic: TrafficAlert,
    /// The traffic/GNSS serial link is alive and parsing.
    pub link_ok: bool,
}

/// Read-side port: the service calls this once per tick.
pub trait NavPort {
    fn read(&mut self, now: Millis) -> NavReading;

    /// Sea-level pressure the barometer converts altitude against.
    fn set_qnh(&mut self, qnh_hpa: f32);

    /// Reopen the traffic receiver link at the source's baud rate.
    fn select_source(&mut self, source: DataSource);
}

// ───────────────────────────────────────────────────────────────
// Output ports (driven adapters: domain → devices)
// ───────────────────────────────────────────────────────────────

pub trait StrobePort {
    fn set_enabled(&mut self, enabled: bool);

    /// Change the waveform.  Restarts the flash phase.
    fn set_cadence(&mut self, cadence: Cadence);
}

pub trait AudioPort {
    /// Stop the current cue and drop everything pending.
    fn stop_and_flush(&mut self);

    /// Queue a cue behind whatever is pending.
    fn enqueue(&mut self, cue: AudioCue);

    /// Player volume, 0 to [`HaloSettings::MAX_VOLUME`].
    fn set_volume(&mut self, volume: u8);
}

pub trait DisplayPort {
    fn select_page(&mut self, page: Page);

    /// QNH and field elevation shown in the status line.
    fn set_field_info(&mut self, qnh_hpa: f32, elevation_ft: f32);
}

/// Persists completed flights.
pub trait FlightLogPort {
    fn record_flight(&mut self, record: &FlightRecord) -> Result<(), StorageError>;
}

/// Persists the user settings.  Implementations validate before writing.
pub trait SettingsPort {
    fn save_settings(&mut self, settings: &HaloSettings) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage.
///
/// Keys are namespaced to prevent collisions between subsystems.  Writes
/// MUST be atomic: no partial record after a power loss.
pub trait StoragePort {
    /// Read a value.  Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key.  Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    fn exists(&self, namespace: &str, key: &str) -> bool;

    /// Delete every key in `namespace`.
    fn erase_namespace(&mut self, namespace: &str) -> Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from loading or validating configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No settings found in storage (first boot).
    NotFound,
    /// Stored settings failed deserialization.
    Corrupted,
    /// A field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    IoError,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    NotFound,
    Full,
    IoError,
    /// A stored blob failed to decode.
    Corrupted,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
            Self::Corrupted => write!(f, "stored data corrupted"),
        }
    }
}

impl From<StorageError> for ConfigError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound => Self::NotFound,
            StorageError::Corrupted => Self::Corrupted,
            StorageError::Full | StorageError::IoError => Self::IoError,
        }
    }
}
