//! System configuration parameters
//!
//! [`HaloConfig`] holds every threshold, hold window and cadence used by the
//! flight-phase machine.  [`HaloSettings`] holds the user-facing settings
//! that are persisted in the flight-log store and edited from the control
//! channel.

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;

/// Flight-phase thresholds and timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HaloConfig {
    // --- Takeoff ---
    /// Ground speed (kts) above which takeoff is considered.
    pub takeoff_speed_kts: f32,
    /// AGL (ft) above which the barometric takeoff fallback fires and
    /// landing detection becomes armed.
    pub takeoff_alt_ft: f32,
    /// Continuous hold for either takeoff condition (ms).
    pub takeoff_hold_ms: u32,
    /// Window after init during which takeoff is ignored (ms).
    pub startup_grace_ms: u32,

    // --- Landing ---
    /// AGL (ft) at or below which landing is detected.
    pub landing_alt_ft: f32,
    /// Continuous hold below `landing_alt_ft` (ms).
    pub landing_agl_hold_ms: u32,
    /// Minimum time the landing page stays up before LANDED can fire (ms).
    pub landing_display_hold_ms: u32,
    /// Ground speed (kts) below which the aircraft counts as rolled out.
    pub landed_slow_kts: f32,
    /// Continuous hold below `landed_slow_kts` (ms).
    pub landed_slow_hold_ms: u32,

    // --- Traffic ---
    /// An alert is alive for this long after its last update (ms).
    pub alert_hold_ms: u32,
    /// Fixed floor for the traffic page minimum hold (ms).
    pub alert_page_floor_ms: u32,
    /// Debounce for nav-link edges (ms).
    pub nav_edge_hyst_ms: u32,
    /// Landing inhibit applied by the bench force-flying hook (ms).
    pub bench_inhibit_ms: u32,

    // --- Strobe ---
    pub strobe_on_ms: u16,
    pub strobe_period_std_ms: u16,
    pub strobe_period_l1_ms: u16,
    pub strobe_period_l2_ms: u16,
    pub strobe_period_l3_ms: u16,

    // --- Audio ---
    /// Minimum spacing between two queued cues (ms).
    pub audio_gap_ms: u32,
}

impl Default for HaloConfig {
    fn default() -> Self {
        Self {
            // Takeoff
            takeoff_speed_kts: 20.0,
            takeoff_alt_ft: 200.0,
            takeoff_hold_ms: 3000,
            startup_grace_ms: 4000,

            // Landing
            landing_alt_ft: 200.0,
            landing_agl_hold_ms: 2000,
            landing_display_hold_ms: 8000,
            landed_slow_kts: 5.0,
            landed_slow_hold_ms: 3000,

            // Traffic
            alert_hold_ms: 8000,
            alert_page_floor_ms: 5000,
            nav_edge_hyst_ms: 500,
            bench_inhibit_ms: 8000,

            // Strobe
            strobe_on_ms: 120,
            strobe_period_std_ms: 2000, // standard
            strobe_period_l1_ms: 1400,  // gentle
            strobe_period_l2_ms: 900,   // faster
            strobe_period_l3_ms: 500,   // fastest

            // Audio
            audio_gap_ms: 140,
        }
    }
}

impl HaloConfig {
    /// Range-check every field.  Adapters call this before persisting and
    /// the binary calls it before starting the control loop.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = |v: f32| v.is_finite() && v > 0.0;
        if !positive(self.takeoff_speed_kts) {
            return Err(ConfigError::ValidationFailed(
                "takeoff_speed_kts must be finite and > 0",
            ));
        }
        if !positive(self.takeoff_alt_ft) || !positive(self.landing_alt_ft) {
            return Err(ConfigError::ValidationFailed(
                "takeoff_alt_ft and landing_alt_ft must be finite and > 0",
            ));
        }
        if !positive(self.landed_slow_kts) || self.landed_slow_kts >= self.takeoff_speed_kts {
            return Err(ConfigError::ValidationFailed(
                "landed_slow_kts must be > 0 and below takeoff_speed_kts",
            ));
        }
        if self.takeoff_hold_ms == 0
            || self.landing_agl_hold_ms == 0
            || self.landed_slow_hold_ms == 0
            || self.alert_hold_ms == 0
        {
            return Err(ConfigError::ValidationFailed("hold windows must be > 0"));
        }
        let periods = [
            self.strobe_period_std_ms,
            self.strobe_period_l1_ms,
            self.strobe_period_l2_ms,
            self.strobe_period_l3_ms,
        ];
        if periods.windows(2).any(|w| w[0] <= w[1]) {
            return Err(ConfigError::ValidationFailed(
                "strobe periods must strictly decrease from standard to L3",
            ));
        }
        if self.strobe_on_ms == 0 || self.strobe_on_ms >= self.strobe_period_l3_ms {
            return Err(ConfigError::ValidationFailed(
                "strobe_on_ms must be > 0 and shorter than the L3 period",
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// User settings
// ---------------------------------------------------------------------------

/// Where traffic data comes from.  Only the UART baud differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    Flarm,
    SoftRf,
}

impl DataSource {
    pub fn baud(self) -> u32 {
        match self {
            Self::Flarm => 19_200,
            Self::SoftRf => 38_400,
        }
    }
}

/// Persisted user settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HaloSettings {
    /// Barometer sea-level reference, 800–1200 hPa.
    pub qnh_hpa: f32,
    /// 0–30000 ft, display only.
    pub airfield_elev_ft: f32,
    /// Annunciator volume, 0–30.
    pub volume: u8,
    /// Captured ground reference (MSL metres), if any.
    pub baseline_alt_m: Option<f32>,
    pub data_source: DataSource,
}

impl Default for HaloSettings {
    fn default() -> Self {
        Self {
            qnh_hpa: 1013.25,
            airfield_elev_ft: 0.0,
            volume: 24,
            baseline_alt_m: None,
            data_source: DataSource::Flarm,
        }
    }
}

impl HaloSettings {
    pub const MAX_VOLUME: u8 = 30;
    pub const QNH_RANGE_HPA: core::ops::RangeInclusive<f32> = 800.0..=1200.0;
    pub const MAX_ELEVATION_FT: f32 = 30_000.0;

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !Self::QNH_RANGE_HPA.contains(&self.qnh_hpa) {
            return Err(ConfigError::ValidationFailed("qnh_hpa must be 800–1200"));
        }
        if !(0.0..=Self::MAX_ELEVATION_FT).contains(&self.airfield_elev_ft) {
            return Err(ConfigError::ValidationFailed(
                "airfield_elev_ft must be 0–30000",
            ));
        }
        if self.volume > Self::MAX_VOLUME {
            return Err(ConfigError::ValidationFailed("volume must be 0–30"));
        }
        if self.baseline_alt_m.is_some_and(|b| !b.is_finite()) {
            return Err(ConfigError::ValidationFailed("baseline_alt_m must be finite"));
        }
        Ok(())
    }
}
