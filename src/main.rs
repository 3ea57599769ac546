//! Halo bench simulator: the full control loop on the host.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Adapters (outer ring)                    │
//! │                                                              │
//! │  SimNav        StrobeDriver<SimPin>   AudioQueue + SimPlayer │
//! │  (NavPort)     (StrobePort)           (AudioPort)            │
//! │  SimDisplay    LogEventSink           FlightLogStore<Nvs>    │
//! │  (DisplayPort) (EventSink)            (FlightLogPort)        │
//! │                                                              │
//! │  ──────────────── Port Trait Boundary ───────────────────    │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │            HaloService (pure logic)                    │  │
//! │  │  control channel · FlightPhaseMachine · dispatcher     │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! `halo-sim` flies a scripted flight; `halo-sim --bench` keeps the unit
//! on the ground and runs the bench sequence through the control channel.

#![deny(unused_must_use)]

use core::convert::Infallible;

use anyhow::{Context, Result};
use embedded_hal::digital::{ErrorType, OutputPin};
use log::{info, warn};

use halo::adapters::flight_log::FlightLogStore;
use halo::adapters::log_sink::LogEventSink;
use halo::adapters::nvs::NvsAdapter;
use halo::app::commands::ControlCommand;
use halo::app::ports::{AudioPort, DisplayPort, NavPort, NavReading, StrobePort};
use halo::app::service::{ControlChannel, HaloService};
use halo::bench::{BenchSequence, DEFAULT_STEP_MS};
use halo::config::{DataSource, HaloConfig, HaloSettings};
use halo::drivers::audio::AudioQueue;
use halo::drivers::strobe::StrobeDriver;
use halo::fsm::Phase;
use halo::fsm::context::{AudioCue, Page, TelemetrySnapshot, TrafficAlert};
use halo::policy::{Cadence, cadence_for_level};
use halo::time::{Millis, reached};

/// Overrides the default `info` filter, e.g. `HALO_LOG=halo=debug`.
const LOG_ENV: &str = "HALO_LOG";
const TICK_MS: Millis = 50;
const MAX_SIM_MS: Millis = 10 * 60 * 1000;
/// Field elevation used by the scripted flight (m MSL).
const FIELD_MSL_M: f32 = 100.0;

// ── Simulated nav receiver ────────────────────────────────────

/// Scripted flight: ground, takeoff roll, climb, cruise with three
/// traffic alerts, descent, roll-out.
struct SimNav {
    grounded: bool,
    traffic: TrafficAlert,
    qnh_hpa: f32,
}

/// (time s, severity, bearing deg, relative vertical m)
const SCRIPTED_ALERTS: [(u32, u8, f32, f32); 3] = [
    (30, 2, 60.0, 100.0),
    (48, 3, 300.0, -80.0),
    (66, 1, 0.0, 0.0),
];

impl SimNav {
    fn new(grounded: bool) -> Self {
        Self {
            grounded,
            traffic: TrafficAlert::default(),
            qnh_hpa: HaloSettings::default().qnh_hpa,
        }
    }

    /// Static pressure the barometer would read at `msl_m` (ISA lapse).
    fn pressure_at(&self, msl_m: f32) -> f32 {
        self.qnh_hpa * (1.0 - 2.255_77e-5 * msl_m).powf(5.255_88)
    }

    /// (ground speed kts, altitude m MSL) at `t` ms.
    fn profile(&self, t: Millis) -> (f32, f32) {
        if self.grounded {
            return (0.0, FIELD_MSL_M);
        }
        let s = t as f32 / 1000.0;
        match s {
            s if s < 6.0 => (0.0, FIELD_MSL_M),
            s if s < 10.0 => (25.0 + (s - 6.0) * 10.0, FIELD_MSL_M),
            s if s < 25.0 => (70.0, FIELD_MSL_M + (s - 10.0) * 20.0),
            s if s < 80.0 => (80.0, FIELD_MSL_M + 300.0),
            s if s < 100.0 => (65.0, FIELD_MSL_M + 300.0 - (s - 80.0) * 12.5),
            s if s < 106.0 => (65.0 - (s - 100.0) * 10.0, FIELD_MSL_M),
            _ => (2.0, FIELD_MSL_M),
        }
    }
}

impl NavPort for SimNav {
    fn read(&mut self, now: Millis) -> NavReading {
        let (sog_kts, msl_alt_m) = self.profile(now);
        if !self.grounded {
            for (at_s, severity, bearing_deg, rel_vertical_m) in SCRIPTED_ALERTS {
                if now == at_s * 1000 {
                    self.traffic = TrafficAlert::synthetic(now, severity, bearing_deg, rel_vertical_m);
                }
            }
        }
        let link_ok = now >= 1000;
        let minutes = now / 60_000;
        NavReading {
            telemetry: TelemetrySnapshot {
                temperature_c: 18.0,
                pressure_hpa: self.pressure_at(msl_alt_m),
                msl_alt_m,
                baro_ok: true,
                sog_kts,
                track_deg: 90.0,
                last_fix_ms: link_ok.then_some(now),
                vertical_speed_mps: 0.0,
                utc_hour: link_ok.then_some(14),
                utc_min: link_ok.then_some((minutes % 60) as u8),
            },
            traffic: self.traffic,
            link_ok,
        }
    }

    fn set_qnh(&mut self, qnh_hpa: f32) {
        self.qnh_hpa = qnh_hpa;
    }

    fn select_source(&mut self, source: DataSource) {
        info!("nav: UART reopened at {} baud ({:?})", source.baud(), source);
    }
}

// ── Simulated output devices ──────────────────────────────────

#[derive(Default)]
struct SimPin {
    flashes: u32,
}

impl ErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> core::result::Result<(), Infallible> {
        Ok(())
    }
    fn set_high(&mut self) -> core::result::Result<(), Infallible> {
        self.flashes += 1;
        Ok(())
    }
}

/// MP3 module stand-in: every track plays for a fixed time.
struct SimPlayer {
    playing_until: Option<Millis>,
}

impl SimPlayer {
    const TRACK_MS: Millis = 700;

    fn busy(&self, now: Millis) -> bool {
        self.playing_until.is_some_and(|until| !reached(now, until))
    }

    fn play(&mut self, track: u16, volume: u8, now: Millis) {
        info!("audio: track {:03}.mp3 at volume {}", track, volume);
        self.playing_until = Some(now.wrapping_add(Self::TRACK_MS));
    }

    fn stop(&mut self) {
        self.playing_until = None;
    }
}

struct SimHardware {
    nav: SimNav,
    strobe: StrobeDriver<SimPin>,
    audio: AudioQueue,
    player: SimPlayer,
    page: Option<Page>,
}

impl SimHardware {
    fn new(config: &HaloConfig, grounded: bool) -> Self {
        Self {
            nav: SimNav::new(grounded),
            strobe: StrobeDriver::new(SimPin::default(), cadence_for_level(config, 0)),
            audio: AudioQueue::new(config.audio_gap_ms),
            player: SimPlayer { playing_until: None },
            page: None,
        }
    }

    /// Advance the device-side state machines.
    fn service_devices(&mut self, now: Millis) {
        self.strobe.tick(now);
        if self.audio.take_stop_request() {
            self.player.stop();
        }
        if let Some(track) = self.audio.tick(now, self.player.busy(now)) {
            self.player.play(track, self.audio.volume(), now);
        }
    }
}

impl NavPort for SimHardware {
    fn read(&mut self, now: Millis) -> NavReading {
        self.nav.read(now)
    }
    fn set_qnh(&mut self, qnh_hpa: f32) {
        self.nav.set_qnh(qnh_hpa);
    }
    fn select_source(&mut self, source: DataSource) {
        self.nav.select_source(source);
    }
}

impl StrobePort for SimHardware {
    fn set_enabled(&mut self, enabled: bool) {
        self.strobe.set_enabled(enabled);
    }
    fn set_cadence(&mut self, cadence: Cadence) {
        self.strobe.set_cadence(cadence);
    }
}

impl AudioPort for SimHardware {
    fn stop_and_flush(&mut self) {
        self.audio.stop_and_flush();
    }
    fn enqueue(&mut self, cue: AudioCue) {
        self.audio.enqueue(cue);
    }
    fn set_volume(&mut self, volume: u8) {
        self.audio.set_volume(volume);
    }
}

impl DisplayPort for SimHardware {
    fn select_page(&mut self, page: Page) {
        if self.page != Some(page) {
            info!("display: {:?} page", page);
        }
        self.page = Some(page);
    }
    fn set_field_info(&mut self, qnh_hpa: f32, elevation_ft: f32) {
        info!("display: {:.0}hPa {:.0}ft", qnh_hpa, elevation_ft);
    }
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().filter_or(LOG_ENV, "info")).init();
    let bench_mode = std::env::args().skip(1).any(|a| a == "--bench");

    info!("╔══════════════════════════════════════╗");
    info!("║  Halo simulator v{:<20}║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");
    info!(
        "log level {}, {} mode",
        log::max_level(),
        if bench_mode { "bench" } else { "flight" }
    );

    // ── 1. Configuration and persisted settings ───────────────
    let config = HaloConfig::default();
    config
        .validate()
        .map_err(halo::Error::from)
        .context("built-in configuration rejected")?;

    let mut flight_log = FlightLogStore::new(NvsAdapter::new());
    let settings = flight_log.settings_or_default();
    info!(
        "settings: QNH {:.2} hPa, field {:.0} ft, volume {}, {:?} @ {} baud",
        settings.qnh_hpa,
        settings.airfield_elev_ft,
        settings.volume,
        settings.data_source,
        settings.data_source.baud()
    );

    // ── 2. Service and devices ────────────────────────────────
    let control = ControlChannel::new();
    let mut svc = HaloService::new(config.clone(), &settings, &control);
    let tx = svc.control_sender();
    let mut hw = SimHardware::new(&config, bench_mode);
    let mut sink = LogEventSink::new();
    let mut bench = BenchSequence::new(&config, DEFAULT_STEP_MS);

    svc.start(0, &mut hw, &mut flight_log, &mut sink);

    // ── 3. Control loop ───────────────────────────────────────
    let mut now: Millis = 0;
    while now < MAX_SIM_MS {
        now += TICK_MS;

        // Ground reference once the baro has settled.
        if now == 500 && tx.try_send(ControlCommand::CaptureBaseline).is_err() {
            warn!("control channel full, baseline capture dropped");
        }
        if bench_mode {
            if now == 5000 {
                bench.start(now);
            }
            for cmd in bench.poll(now) {
                if tx.try_send(cmd).is_err() {
                    warn!("control channel full, dropping {:?}", cmd);
                }
            }
        }

        svc.tick(now, &mut hw, &mut flight_log, &mut sink);
        hw.service_devices(now);

        if svc.phase() == Phase::Landed {
            break;
        }
    }

    // ── 4. Wrap-up ────────────────────────────────────────────
    if svc.phase() != Phase::Landed {
        warn!(
            "simulation stopped in {} after {} ms ({} ms in phase)",
            svc.phase().name(),
            now,
            svc.machine().time_in_phase(now)
        );
    }

    // Captured at 500 ms and saved by the service.
    let stored = flight_log.settings_or_default();
    info!("stored AGL baseline: {:?} m MSL", stored.baseline_alt_m);

    let totals = flight_log.totals();
    info!(
        "logbook: {} flight(s), {} s total, {} alert(s); last {} s / {} alert(s)",
        totals.flights,
        totals.total_ms / 1000,
        totals.total_alerts,
        totals.last_flight_ms / 1000,
        totals.last_alerts
    );
    info!(
        "strobe flashed {} times over {} ticks",
        hw.strobe.release().flashes,
        svc.tick_count()
    );
    Ok(())
}
