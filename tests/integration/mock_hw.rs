//! Mock hardware adapters for integration tests.
//!
//! Records every device call so tests can assert on the full command
//! history without touching a real strobe, player or display.

use halo::app::events::AppEvent;
use halo::app::ports::{
    AudioPort, ConfigError, DisplayPort, EventSink, FlightLogPort, NavPort, NavReading,
    SettingsPort, StorageError, StrobePort,
};
use halo::config::{DataSource, HaloSettings};
use halo::fsm::context::{AudioCue, FlightRecord, Page, TrafficAlert};
use halo::policy::Cadence;
use halo::time::Millis;

// ── Device call record ────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    StopAudio,
    Cue(AudioCue),
    Strobe(bool),
    Cadence(Cadence),
    Page(Page),
    Volume(u8),
    Qnh(f32),
    Source(DataSource),
    FieldInfo { qnh_hpa: f32, elevation_ft: f32 },
}

// ── MockHardware ──────────────────────────────────────────────

/// Nav input is whatever the test last put in `reading`.
pub struct MockHardware {
    pub reading: NavReading,
    pub calls: Vec<DeviceCall>,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new() -> Self {
        Self {
            reading: NavReading::default(),
            calls: Vec::new(),
        }
    }

    pub fn set_speed(&mut self, kts: f32) {
        self.reading.telemetry.sog_kts = kts;
    }

    pub fn set_msl(&mut self, m: f32) {
        self.reading.telemetry.msl_alt_m = m;
    }

    pub fn set_alert(&mut self, alert: TrafficAlert) {
        self.reading.traffic = alert;
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn cues(&self) -> Vec<AudioCue> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                DeviceCall::Cue(cue) => Some(*cue),
                _ => None,
            })
            .collect()
    }

    pub fn cue_count(&self, cue: AudioCue) -> usize {
        self.cues().iter().filter(|&&c| c == cue).count()
    }

    pub fn strobe_on(&self) -> bool {
        self.calls
            .iter()
            .rev()
            .find_map(|c| match c {
                DeviceCall::Strobe(on) => Some(*on),
                _ => None,
            })
            .unwrap_or(false)
    }

    pub fn last_cadence(&self) -> Option<Cadence> {
        self.calls.iter().rev().find_map(|c| match c {
            DeviceCall::Cadence(cadence) => Some(*cadence),
            _ => None,
        })
    }

    pub fn volume(&self) -> Option<u8> {
        self.calls.iter().rev().find_map(|c| match c {
            DeviceCall::Volume(v) => Some(*v),
            _ => None,
        })
    }

    pub fn page(&self) -> Option<Page> {
        self.calls.iter().rev().find_map(|c| match c {
            DeviceCall::Page(p) => Some(*p),
            _ => None,
        })
    }
}

impl Default for MockHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl NavPort for MockHardware {
    fn read(&mut self, _now: Millis) -> NavReading {
        self.reading
    }

    fn set_qnh(&mut self, qnh_hpa: f32) {
        self.calls.push(DeviceCall::Qnh(qnh_hpa));
    }

    fn select_source(&mut self, source: DataSource) {
        self.calls.push(DeviceCall::Source(source));
    }
}

impl StrobePort for MockHardware {
    fn set_enabled(&mut self, enabled: bool) {
        self.calls.push(DeviceCall::Strobe(enabled));
    }

    fn set_cadence(&mut self, cadence: Cadence) {
        self.calls.push(DeviceCall::Cadence(cadence));
    }
}

impl AudioPort for MockHardware {
    fn stop_and_flush(&mut self) {
        self.calls.push(DeviceCall::StopAudio);
    }

    fn enqueue(&mut self, cue: AudioCue) {
        self.calls.push(DeviceCall::Cue(cue));
    }

    fn set_volume(&mut self, volume: u8) {
        self.calls.push(DeviceCall::Volume(volume));
    }
}

impl DisplayPort for MockHardware {
    fn select_page(&mut self, page: Page) {
        self.calls.push(DeviceCall::Page(page));
    }

    fn set_field_info(&mut self, qnh_hpa: f32, elevation_ft: f32) {
        self.calls.push(DeviceCall::FieldInfo {
            qnh_hpa,
            elevation_ft,
        });
    }
}

// ── MockFlightLog ─────────────────────────────────────────────

/// Flight records and settings saves, kept in memory.  `fail_with` fails
/// both.
pub struct MockFlightLog {
    pub records: Vec<FlightRecord>,
    pub saved_settings: Vec<HaloSettings>,
    pub fail_with: Option<StorageError>,
}

#[allow(dead_code)]
impl MockFlightLog {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            saved_settings: Vec::new(),
            fail_with: None,
        }
    }

    pub fn failing(e: StorageError) -> Self {
        Self {
            records: Vec::new(),
            saved_settings: Vec::new(),
            fail_with: Some(e),
        }
    }
}

impl FlightLogPort for MockFlightLog {
    fn record_flight(&mut self, record: &FlightRecord) -> Result<(), StorageError> {
        if let Some(e) = self.fail_with {
            return Err(e);
        }
        self.records.push(*record);
        Ok(())
    }
}

impl SettingsPort for MockFlightLog {
    fn save_settings(&mut self, settings: &HaloSettings) -> Result<(), ConfigError> {
        if let Some(e) = self.fail_with {
            return Err(e.into());
        }
        self.saved_settings.push(*settings);
        Ok(())
    }
}

// ── RecordingSink ─────────────────────────────────────────────

pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn phase_changes(&self) -> Vec<(halo::fsm::Phase, halo::fsm::Phase)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                AppEvent::PhaseChanged { from, to } => Some((*from, *to)),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}
