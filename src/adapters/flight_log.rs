//! Flight log and settings persistence.
//!
//! [`FlightLogStore`] implements [`FlightLogPort`] and [`SettingsPort`] on
//! top of any [`StoragePort`].  Completed flights are folded into cumulative
//! [`FlightTotals`]; the user [`HaloSettings`] live next to them.  Both are
//! `postcard`-encoded blobs in the `halo` namespace.
//!
//! A missing totals record reads as zero.  A corrupted one also reads as
//! zero (with a warning) so a bad blob never blocks the next flight.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::{ConfigError, FlightLogPort, SettingsPort, StorageError, StoragePort};
use crate::config::HaloSettings;
use crate::fsm::context::FlightRecord;

pub const NAMESPACE: &str = "halo";
const FLIGHT_KEY: &str = "flight";
const SETTINGS_KEY: &str = "settings";

/// Largest encoded blob either record can produce, with headroom.
const MAX_BLOB_SIZE: usize = 64;

/// Cumulative logbook.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightTotals {
    pub flights: u32,
    pub total_ms: u64,
    pub total_alerts: u32,
    pub last_flight_ms: u32,
    pub last_alerts: u16,
    pub last_utc_hour: Option<u8>,
    pub last_utc_min: Option<u8>,
}

impl FlightTotals {
    pub fn add(&mut self, record: &FlightRecord) {
        self.flights = self.flights.saturating_add(1);
        self.total_ms = self.total_ms.saturating_add(u64::from(record.duration_ms));
        self.total_alerts = self.total_alerts.saturating_add(u32::from(record.alerts));
        self.last_flight_ms = record.duration_ms;
        self.last_alerts = record.alerts;
        self.last_utc_hour = record.utc_hour;
        self.last_utc_min = record.utc_min;
    }
}

pub struct FlightLogStore<S: StoragePort> {
    storage: S,
}

impl<S: StoragePort> FlightLogStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Totals as stored.  `NotFound` on a fresh partition.
    pub fn load_totals(&self) -> Result<FlightTotals, StorageError> {
        self.load(FLIGHT_KEY)
    }

    /// Totals, falling back to zero on a fresh or corrupted partition.
    pub fn totals(&self) -> FlightTotals {
        match self.load_totals() {
            Ok(t) => t,
            Err(StorageError::NotFound) => FlightTotals::default(),
            Err(e) => {
                warn!("flight totals unreadable ({}), starting from zero", e);
                FlightTotals::default()
            }
        }
    }

    pub fn load_settings(&self) -> Result<HaloSettings, ConfigError> {
        let settings: HaloSettings = self.load(SETTINGS_KEY)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Stored settings, or defaults if absent or invalid.
    pub fn settings_or_default(&self) -> HaloSettings {
        match self.load_settings() {
            Ok(s) => s,
            Err(ConfigError::NotFound) => HaloSettings::default(),
            Err(e) => {
                warn!("stored settings rejected ({}), using defaults", e);
                HaloSettings::default()
            }
        }
    }

    /// Forget the logbook, the settings and anything else under
    /// [`NAMESPACE`].
    pub fn factory_reset(&mut self) -> Result<(), StorageError> {
        self.storage.erase_namespace(NAMESPACE)?;
        info!("flight log factory reset");
        Ok(())
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    // ── Internal ──────────────────────────────────────────────

    fn load<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Result<T, StorageError> {
        let mut buf = [0u8; MAX_BLOB_SIZE];
        let len = self.storage.read(NAMESPACE, key, &mut buf)?;
        postcard::from_bytes(&buf[..len]).map_err(|_| StorageError::Corrupted)
    }

    fn store<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), StorageError> {
        let mut buf = [0u8; MAX_BLOB_SIZE];
        let bytes = postcard::to_slice(value, &mut buf).map_err(|_| StorageError::IoError)?;
        self.storage.write(NAMESPACE, key, bytes)
    }
}

impl<S: StoragePort> FlightLogPort for FlightLogStore<S> {
    fn record_flight(&mut self, record: &FlightRecord) -> Result<(), StorageError> {
        let mut totals = self.totals();
        totals.add(record);
        self.store(FLIGHT_KEY, &totals)?;
        info!(
            "flight #{} logged: {} s, {} alert(s)",
            totals.flights,
            record.duration_ms / 1000,
            record.alerts
        );
        Ok(())
    }
}

impl<S: StoragePort> SettingsPort for FlightLogStore<S> {
    /// Validate, then persist.
    fn save_settings(&mut self, settings: &HaloSettings) -> Result<(), ConfigError> {
        settings.validate()?;
        self.store(SETTINGS_KEY, settings)?;
        info!("settings saved");
        Ok(())
    }
}
