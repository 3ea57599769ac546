//! Application service: the hexagonal core.
//!
//! [`HaloService`] owns the flight-phase machine, the AGL baseline, the
//! live user settings and the receiving end of the control channel.  All I/O flows through port
//! traits injected at call sites, making the entire service testable with
//! mock adapters.
//!
//! ```text
//!      NavPort ──▶ ┌──────────────────────────┐ ──▶ EventSink
//!                  │       HaloService        │
//!  StrobePort  ◀── │  control ▸ FSM ▸ dispatch │ ──▶ FlightLogPort
//!  AudioPort   ◀── │                          │ ──▶ SettingsPort
//!  DisplayPort ◀── └──────────────────────────┘
//! ```
//!
//! Per tick: drain control commands, read the nav port, tick the machine,
//! then dispatch the returned commands to the output ports in order.
//! Settings commands are validated, applied to the device that uses them
//! and persisted through the [`SettingsPort`].

use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::channel::{Channel, Sender};
use log::{info, warn};

use crate::config::{HaloConfig, HaloSettings};
use crate::fsm::context::{AglBaseline, FlightInputs, OutputCommand, TrafficAlert};
use crate::fsm::{FlightPhaseMachine, Phase};
use crate::time::Millis;

use super::commands::ControlCommand;
use super::events::AppEvent;
use super::ports::{
    AudioPort, DisplayPort, EventSink, FlightLogPort, NavPort, NavReading, SettingsPort,
    StrobePort,
};

/// Depth of the control channel.
pub const CONTROL_DEPTH: usize = 8;

/// Control plane: console / BLE / bench → service.
pub type ControlChannel = Channel<NoopRawMutex, ControlCommand, CONTROL_DEPTH>;

pub type ControlSender<'a> = Sender<'a, NoopRawMutex, ControlCommand, CONTROL_DEPTH>;

// ───────────────────────────────────────────────────────────────
// HaloService
// ───────────────────────────────────────────────────────────────

pub struct HaloService<'a> {
    machine: FlightPhaseMachine,
    control: &'a ControlChannel,
    baseline: AglBaseline,
    settings: HaloSettings,
    /// Bench-injected alert; replaces the nav port's report while set.
    injected: Option<TrafficAlert>,
    last_reading: NavReading,
    tick_count: u64,
}

impl<'a> HaloService<'a> {
    /// Construct the service.  Does **not** initialise the machine; call
    /// [`start`](Self::start) next.
    pub fn new(config: HaloConfig, settings: &HaloSettings, control: &'a ControlChannel) -> Self {
        Self {
            machine: FlightPhaseMachine::new(config),
            control,
            baseline: AglBaseline::new(settings.baseline_alt_m),
            settings: *settings,
            injected: None,
            last_reading: NavReading::default(),
            tick_count: 0,
        }
    }

    /// Sending side of the control channel.
    pub fn control_sender(&self) -> ControlSender<'a> {
        self.control.sender()
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Initialise the machine, play the boot annunciation, then hand the
    /// stored settings to the devices.
    pub fn start(
        &mut self,
        now: Millis,
        hw: &mut (impl NavPort + StrobePort + AudioPort + DisplayPort),
        store: &mut (impl FlightLogPort + SettingsPort),
        sink: &mut impl EventSink,
    ) {
        let cmds = self.machine.init(now);
        Self::dispatch(&cmds, hw, store, sink);
        Self::apply_settings(&self.settings, hw);
        sink.emit(&AppEvent::Started(self.machine.phase()));
        info!("HaloService started in {}", self.machine.phase().name());
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one full cycle: control → nav → FSM → outputs.
    ///
    /// `hw` satisfies the nav port and every output port; this avoids a
    /// double mutable borrow while keeping the port boundary explicit.
    pub fn tick(
        &mut self,
        now: Millis,
        hw: &mut (impl NavPort + StrobePort + AudioPort + DisplayPort),
        store: &mut (impl FlightLogPort + SettingsPort),
        sink: &mut impl EventSink,
    ) {
        self.tick_count += 1;

        // 1. Overrides land between ticks
        while let Ok(cmd) = self.control.try_receive() {
            self.handle_command(cmd, now, hw, store, sink);
        }

        // 2. One consistent input snapshot
        let reading = hw.read(now);
        self.last_reading = reading;
        let inputs = FlightInputs {
            telemetry: reading.telemetry,
            traffic: self.injected.unwrap_or(reading.traffic),
            link_ok: reading.link_ok,
            baseline: self.baseline,
        };

        // 3. FSM tick (pure phase logic)
        let prev_phase = self.machine.phase();
        let prev_link = self.machine.nav_link();
        let cmds = self.machine.tick(now, &inputs);

        // 4. Apply side effects in issue order
        Self::dispatch(&cmds, hw, store, sink);

        // 5. Structured events
        if self.machine.nav_link() != prev_link {
            sink.emit(&AppEvent::NavLinkChanged(self.machine.nav_link()));
        }
        self.emit_phase_change(prev_phase, &inputs.traffic, sink);
    }

    // ── Command handling ──────────────────────────────────────

    /// Apply one control command immediately.
    pub fn handle_command(
        &mut self,
        cmd: ControlCommand,
        now: Millis,
        hw: &mut (impl NavPort + StrobePort + AudioPort + DisplayPort),
        store: &mut (impl FlightLogPort + SettingsPort),
        sink: &mut impl EventSink,
    ) {
        match cmd {
            ControlCommand::ForceLanding => {
                self.machine.force_landing();
            }
            ControlCommand::ForceFlying => {
                let prev = self.machine.phase();
                let cmds = self.machine.force_flying(now);
                Self::dispatch(&cmds, hw, store, sink);
                self.emit_phase_change(prev, &TrafficAlert::default(), sink);
                self.emit_inhibit(sink);
            }
            ControlCommand::ExtendLandingInhibit(ms) => {
                self.machine.extend_landing_inhibit(now, ms);
                self.emit_inhibit(sink);
            }
            ControlCommand::CaptureBaseline => {
                let msl = self.last_reading.telemetry.msl_alt_m;
                if self.baseline.capture(msl) {
                    info!("AGL baseline captured at {:.1} m MSL", msl);
                    sink.emit(&AppEvent::BaselineCaptured(msl));
                    self.update_settings(store, sink, |s| s.baseline_alt_m = Some(msl));
                } else {
                    warn!("AGL baseline capture ignored: altitude unknown");
                }
            }
            ControlCommand::Reset => {
                let cmds = self.machine.init(now);
                self.injected = None;
                Self::dispatch(&cmds, hw, store, sink);
                sink.emit(&AppEvent::Started(self.machine.phase()));
            }
            ControlCommand::InjectAlert {
                severity,
                bearing_deg,
                rel_vertical_m,
            } => {
                info!(
                    "bench: alert level {} at {:.0} deg, {:+.0} m",
                    severity, bearing_deg, rel_vertical_m
                );
                self.injected = Some(TrafficAlert::synthetic(
                    now,
                    severity,
                    bearing_deg,
                    rel_vertical_m,
                ));
            }
            ControlCommand::ClearAlert => {
                self.injected = None;
            }
            ControlCommand::SetVolume(volume) => {
                if self.update_settings(store, sink, |s| s.volume = volume) {
                    hw.set_volume(volume);
                }
            }
            ControlCommand::SetQnh(hpa) => {
                if self.update_settings(store, sink, |s| s.qnh_hpa = f32::from(hpa)) {
                    hw.set_qnh(self.settings.qnh_hpa);
                    hw.set_field_info(self.settings.qnh_hpa, self.settings.airfield_elev_ft);
                }
            }
            ControlCommand::SetFieldElevation(ft) => {
                if self.update_settings(store, sink, |s| s.airfield_elev_ft = f32::from(ft)) {
                    hw.set_field_info(self.settings.qnh_hpa, self.settings.airfield_elev_ft);
                }
            }
            ControlCommand::SetDataSource(source) => {
                if self.update_settings(store, sink, |s| s.data_source = source) {
                    info!("nav source {:?}, {} baud", source, source.baud());
                    hw.select_source(source);
                }
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.machine.phase()
    }

    pub fn machine(&self) -> &FlightPhaseMachine {
        &self.machine
    }

    pub fn baseline(&self) -> AglBaseline {
        self.baseline
    }

    /// Settings in force, including changes whose save failed.
    pub fn settings(&self) -> &HaloSettings {
        &self.settings
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    // ── Internal ──────────────────────────────────────────────

    fn apply_settings(settings: &HaloSettings, hw: &mut (impl NavPort + AudioPort + DisplayPort)) {
        hw.set_volume(settings.volume);
        hw.set_qnh(settings.qnh_hpa);
        hw.select_source(settings.data_source);
        hw.set_field_info(settings.qnh_hpa, settings.airfield_elev_ft);
    }

    /// Validate an edited copy of the settings, adopt it, then persist it.
    /// Returns `false` if validation dropped the edit.  A failed save keeps
    /// the new value in RAM.
    fn update_settings(
        &mut self,
        store: &mut impl SettingsPort,
        sink: &mut impl EventSink,
        edit: impl FnOnce(&mut HaloSettings),
    ) -> bool {
        let mut next = self.settings;
        edit(&mut next);
        if let Err(e) = next.validate() {
            warn!("settings change rejected: {}", e);
            sink.emit(&AppEvent::SettingsRejected(e));
            return false;
        }
        self.settings = next;
        match store.save_settings(&self.settings) {
            Ok(()) => sink.emit(&AppEvent::SettingsSaved(self.settings)),
            Err(e) => {
                warn!("settings save failed: {}", e);
                sink.emit(&AppEvent::SettingsSaveFailed(e));
            }
        }
        true
    }

    /// Translate machine commands into port calls.
    fn dispatch(
        cmds: &[OutputCommand],
        hw: &mut (impl StrobePort + AudioPort + DisplayPort),
        log: &mut impl FlightLogPort,
        sink: &mut impl EventSink,
    ) {
        for cmd in cmds {
            match *cmd {
                OutputCommand::StopAudio => hw.stop_and_flush(),
                OutputCommand::PlayCue(cue) => hw.enqueue(cue),
                OutputCommand::StrobeEnable(on) => hw.set_enabled(on),
                OutputCommand::StrobeCadence(cadence) => hw.set_cadence(cadence),
                OutputCommand::SelectPage(page) => hw.select_page(page),
                OutputCommand::RecordFlight(record) => match log.record_flight(&record) {
                    Ok(()) => sink.emit(&AppEvent::FlightRecorded(record)),
                    Err(e) => {
                        warn!("flight log write failed: {}", e);
                        sink.emit(&AppEvent::FlightRecordFailed(e));
                    }
                },
            }
        }
    }

    fn emit_phase_change(&self, prev: Phase, alert: &TrafficAlert, sink: &mut impl EventSink) {
        let now_phase = self.machine.phase();
        if now_phase == prev {
            return;
        }
        sink.emit(&AppEvent::PhaseChanged {
            from: prev,
            to: now_phase,
        });
        if now_phase == Phase::Alert {
            sink.emit(&AppEvent::AlertRaised {
                severity: alert.severity,
                bearing_deg: alert.bearing_deg,
                count: self.machine.last_flight_alerts(),
            });
        }
    }

    fn emit_inhibit(&self, sink: &mut impl EventSink) {
        if let Some(until) = self.machine.landing_inhibit_until() {
            sink.emit(&AppEvent::LandingInhibited { until });
        }
    }
}
