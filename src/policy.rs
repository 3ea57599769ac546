//! Annunciation policy: strobe cadence per alert level, and the clock /
//! vertical categories spoken for a traffic alert.
//!
//! Everything here is a pure function of its inputs, except
//! [`CadenceTracker`], which remembers the last level handed to the strobe
//! so the machine never re-issues an identical cadence (no flicker).
//!
//! | Level | Meaning      | Period (default) |
//! |-------|--------------|------------------|
//! | 0     | no alert     | 2000 ms          |
//! | 1     | low          | 1400 ms          |
//! | 2     | important    |  900 ms          |
//! | 3     | urgent       |  500 ms          |
//!
//! The on-time is the same for every level.

use crate::config::HaloConfig;

/// Strobe waveform: `on_ms` high at the start of every `period_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    pub on_ms: u16,
    pub period_ms: u16,
}

/// Clamp a raw alarm severity into the 1..=3 alert range.
pub fn alert_level(severity: u8) -> u8 {
    severity.clamp(1, 3)
}

/// Cadence for a strobe level (0 = standard, 1..=3 = alert levels).
pub fn cadence_for_level(config: &HaloConfig, level: u8) -> Cadence {
    let period_ms = match level {
        0 => config.strobe_period_std_ms,
        1 => config.strobe_period_l1_ms,
        2 => config.strobe_period_l2_ms,
        _ => config.strobe_period_l3_ms,
    };
    Cadence {
        on_ms: config.strobe_on_ms,
        period_ms,
    }
}

/// Remembers the last applied level.
#[derive(Debug, Clone, Copy, Default)]
pub struct CadenceTracker {
    last_applied: Option<u8>,
}

impl CadenceTracker {
    pub fn new() -> Self {
        Self { last_applied: None }
    }

    /// Returns the cadence to send, or `None` if `level` is already applied.
    pub fn apply(&mut self, config: &HaloConfig, level: u8) -> Option<Cadence> {
        if self.last_applied == Some(level) {
            return None;
        }
        self.last_applied = Some(level);
        Some(cadence_for_level(config, level))
    }

    /// Unconditionally re-baseline to standard cadence.
    pub fn reset_to_standard(&mut self, config: &HaloConfig) -> Cadence {
        self.last_applied = Some(0);
        cadence_for_level(config, 0)
    }

    pub fn last_applied(&self) -> Option<u8> {
        self.last_applied
    }
}

// ---------------------------------------------------------------------------
// Spoken alert direction
// ---------------------------------------------------------------------------

/// Clock sector (1..=12) of a target at absolute bearing `target_deg`
/// seen from own track `own_track_deg`.  Unknown track counts as north.
pub fn clock_sector(target_deg: f32, own_track_deg: f32) -> u8 {
    let own = if own_track_deg.is_finite() { own_track_deg } else { 0.0 };
    let target = if target_deg.is_finite() { target_deg } else { own };
    let rel = (target - own).rem_euclid(360.0);
    let sector = (((rel + 15.0) / 30.0) as u32 % 12) as u8;
    if sector == 0 { 12 } else { sector }
}

/// Band used for the spoken "high / level / low" call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalCategory {
    Below,
    Level,
    Above,
}

impl VerticalCategory {
    const BAND_FT: f32 = 200.0;

    pub fn from_relative_ft(rel_ft: f32) -> Self {
        if rel_ft > Self::BAND_FT {
            Self::Above
        } else if rel_ft < -Self::BAND_FT {
            Self::Below
        } else {
            Self::Level
        }
    }
}

/// Metres to feet.
pub fn m_to_ft(m: f32) -> f32 {
    m * 3.280_84
}
