//! Shared mutable context threaded through every FSM handler.
//!
//! `FsmContext` is the single struct that phase handlers read from and
//! write to.  It holds the tick's input snapshot, the outbound command
//! queue, every hold timer, the flight statistics and the configuration.
//! Think of it as the "blackboard" in a blackboard architecture.
//!
//! Handlers never touch a device.  They push [`OutputCommand`]s, and the
//! service dispatches them after the tick returns.

use heapless::Vec;
use log::warn;
use serde::{Deserialize, Serialize};

use super::Phase;
use super::debounce::HoldTimer;
use crate::config::HaloConfig;
use crate::policy::{Cadence, CadenceTracker, VerticalCategory, m_to_ft};
use crate::time::{Millis, elapsed, reached};

// ---------------------------------------------------------------------------
// Telemetry snapshot (read-only to handlers; written by the nav layer)
// ---------------------------------------------------------------------------

/// Latest motion/position state.  `NaN` means unknown.
#[derive(Debug, Clone, Copy)]
pub struct TelemetrySnapshot {
    pub temperature_c: f32,
    pub pressure_hpa: f32,
    /// Barometric altitude above mean sea level (m).
    pub msl_alt_m: f32,
    /// Barometric sensor is healthy.
    pub baro_ok: bool,
    /// Speed over ground (kts).
    pub sog_kts: f32,
    /// Track over ground (deg true).
    pub track_deg: f32,
    /// Tick of the last valid navigation fix.
    pub last_fix_ms: Option<Millis>,
    /// Derived vertical speed (m/s).
    pub vertical_speed_mps: f32,
    pub utc_hour: Option<u8>,
    pub utc_min: Option<u8>,
}

impl Default for TelemetrySnapshot {
    fn default() -> Self {
        Self::unknown()
    }
}

impl TelemetrySnapshot {
    /// Everything unknown.
    pub const fn unknown() -> Self {
        Self {
            temperature_c: f32::NAN,
            pressure_hpa: f32::NAN,
            msl_alt_m: f32::NAN,
            baro_ok: false,
            sog_kts: f32::NAN,
            track_deg: f32::NAN,
            last_fix_ms: None,
            vertical_speed_mps: f32::NAN,
            utc_hour: None,
            utc_min: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Traffic alert
// ---------------------------------------------------------------------------

/// Most recent proximity report.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrafficAlert {
    pub active: bool,
    /// Tick at which this report arrived.  Distinct reports carry
    /// distinct stamps.
    pub since: Millis,
    pub rel_north_m: f32,
    pub rel_east_m: f32,
    pub rel_vertical_m: f32,
    pub distance_m: f32,
    /// Absolute bearing to the target (deg true).
    pub bearing_deg: f32,
    /// 0 = none, 1..=3 escalating.
    pub severity: u8,
}

impl TrafficAlert {
    /// Synthesise a report for bench use: a target 1 km out on `bearing_deg`.
    pub fn synthetic(now: Millis, severity: u8, bearing_deg: f32, rel_vertical_m: f32) -> Self {
        const RANGE_M: f32 = 1000.0;
        let rad = bearing_deg.to_radians();
        let rel_north_m = RANGE_M * rad.cos();
        let rel_east_m = RANGE_M * rad.sin();
        Self {
            active: true,
            since: now,
            rel_north_m,
            rel_east_m,
            rel_vertical_m,
            distance_m: rel_north_m.hypot(rel_east_m),
            bearing_deg,
            severity,
        }
    }

    /// Active, alarming and fresher than `hold_ms`.  Recomputed every tick.
    pub fn is_alive(&self, now: Millis, hold_ms: Millis) -> bool {
        self.active && self.severity > 0 && elapsed(now, self.since) < hold_ms
    }

    pub fn vertical_category(&self) -> VerticalCategory {
        VerticalCategory::from_relative_ft(m_to_ft(self.rel_vertical_m))
    }
}

// ---------------------------------------------------------------------------
// AGL baseline
// ---------------------------------------------------------------------------

/// Ground reference captured on the airfield.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AglBaseline {
    msl_m: Option<f32>,
}

impl AglBaseline {
    pub fn new(msl_m: Option<f32>) -> Self {
        Self {
            msl_m: msl_m.filter(|m| m.is_finite()),
        }
    }

    /// Capture `msl_m` as ground.  Unknown altitude leaves the baseline as is.
    pub fn capture(&mut self, msl_m: f32) -> bool {
        if !msl_m.is_finite() {
            return false;
        }
        self.msl_m = Some(msl_m);
        true
    }

    pub fn clear(&mut self) {
        self.msl_m = None;
    }

    pub fn is_set(&self) -> bool {
        self.msl_m.is_some()
    }

    pub fn msl_m(&self) -> Option<f32> {
        self.msl_m
    }

    /// Height above the baseline in feet; `None` if either side is unknown.
    pub fn agl_ft(&self, msl_m: f32) -> Option<f32> {
        let base = self.msl_m?;
        msl_m.is_finite().then(|| m_to_ft(msl_m - base))
    }
}

// ---------------------------------------------------------------------------
// Per-tick inputs
// ---------------------------------------------------------------------------

/// One consistent view of everything the machine reads during a tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlightInputs {
    pub telemetry: TelemetrySnapshot,
    pub traffic: TrafficAlert,
    pub link_ok: bool,
    pub baseline: AglBaseline,
}

// ---------------------------------------------------------------------------
// Output commands (written by handlers; dispatched by the service)
// ---------------------------------------------------------------------------

/// Display pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Boot,
    Cruise,
    Traffic,
    Landing,
    Landed,
}

/// Symbolic audio cues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioCue {
    Boot,
    NavValid,
    Takeoff,
    Landing,
    AlertVertical(VerticalCategory),
    /// Clock position 1..=12.
    AlertClock(u8),
}

impl AudioCue {
    /// Track number on the player's storage card.
    pub fn track(self) -> u16 {
        match self {
            Self::Boot => 1,
            Self::NavValid => 2,
            Self::Takeoff => 3,
            Self::Landing => 7,
            Self::AlertVertical(VerticalCategory::Level) => 10,
            Self::AlertVertical(VerticalCategory::Above) => 11,
            Self::AlertVertical(VerticalCategory::Below) => 12,
            Self::AlertClock(h) => 20 + u16::from(h.clamp(1, 12)),
        }
    }
}

/// What gets written to the flight log when a flight completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightRecord {
    pub duration_ms: u32,
    pub alerts: u16,
    pub utc_hour: Option<u8>,
    pub utc_min: Option<u8>,
}

/// A single side effect requested by a handler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputCommand {
    /// Stop the current cue and drop anything queued.
    StopAudio,
    PlayCue(AudioCue),
    StrobeEnable(bool),
    StrobeCadence(Cadence),
    SelectPage(Page),
    RecordFlight(FlightRecord),
}

/// Worst case per tick is well under this (see the alert entry: five).
pub const COMMAND_CAPACITY: usize = 16;

/// Commands emitted during one tick, in issue order.
pub type CommandBatch = Vec<OutputCommand, COMMAND_CAPACITY>;

// ---------------------------------------------------------------------------
// Timers and statistics
// ---------------------------------------------------------------------------

/// Every debounce and deadline the table uses.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhaseTimers {
    /// Tick of the last `init`; the startup grace runs from here.
    pub init_at: Millis,
    pub speed_high: HoldTimer,
    pub alt_high: HoldTimer,
    pub alt_low: HoldTimer,
    pub slow_speed: HoldTimer,
    pub nav_edge: HoldTimer,
    /// When the landing page went up.
    pub landing_shown_at: Option<Millis>,
    /// Traffic page stays up at least until here.
    pub traffic_hold_until: Millis,
    /// Landing detection is skipped until here.
    pub land_inhibit_until: Option<Millis>,
}

/// Per-flight accumulators.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlightStats {
    pub flight_start: Option<Millis>,
    pub last_duration_ms: u32,
    pub alert_count: u16,
    /// Stamp of the last alert that was counted.
    pub last_alert_stamp: Option<Millis>,
    pub takeoff_chimed: bool,
    /// Set by the first climb above the takeoff altitude.
    pub landing_armed: bool,
}

// ---------------------------------------------------------------------------
// FsmContext
// ---------------------------------------------------------------------------

pub struct FsmContext {
    // -- Timing --
    /// Tick currently being evaluated.
    pub now: Millis,

    // -- Inputs --
    pub inputs: FlightInputs,

    // -- Outputs --
    pub commands: CommandBatch,
    pub cadence: CadenceTracker,

    // -- Configuration --
    pub config: HaloConfig,

    // -- State --
    pub timers: PhaseTimers,
    pub stats: FlightStats,
    /// Phase the machine just left; valid inside `on_enter`.
    pub entered_from: Phase,
    /// Debounced nav-link state.
    pub nav_link: bool,
    /// One-shot bench override, consumed by the next tick.
    pub force_landing: bool,
}

impl FsmContext {
    pub fn new(config: HaloConfig) -> Self {
        Self {
            now: 0,
            inputs: FlightInputs::default(),
            commands: CommandBatch::new(),
            cadence: CadenceTracker::new(),
            config,
            timers: PhaseTimers::default(),
            stats: FlightStats::default(),
            entered_from: Phase::Boot,
            nav_link: false,
            force_landing: false,
        }
    }

    /// Clear every timer, guard, statistic and override.
    pub fn reset(&mut self, now: Millis) {
        self.now = now;
        self.commands.clear();
        self.cadence = CadenceTracker::new();
        self.timers = PhaseTimers {
            init_at: now,
            ..PhaseTimers::default()
        };
        self.stats = FlightStats::default();
        self.force_landing = false;
    }

    /// Queue a side effect for the dispatcher.
    pub fn push(&mut self, cmd: OutputCommand) {
        if self.commands.push(cmd).is_err() {
            warn!("FSM: command queue full, dropping {:?}", cmd);
        }
    }

    /// Drain the commands emitted so far.
    pub fn take_commands(&mut self) -> CommandBatch {
        core::mem::take(&mut self.commands)
    }

    /// Known ground speed (kts).
    pub fn speed_kts(&self) -> Option<f32> {
        Some(self.inputs.telemetry.sog_kts).filter(|k| k.is_finite())
    }

    /// Known height above the baseline (ft).
    pub fn agl_ft(&self) -> Option<f32> {
        self.inputs
            .baseline
            .agl_ft(self.inputs.telemetry.msl_alt_m)
    }

    pub fn alert_alive(&self) -> bool {
        self.inputs
            .traffic
            .is_alive(self.now, self.config.alert_hold_ms)
    }

    pub fn in_startup_grace(&self) -> bool {
        elapsed(self.now, self.timers.init_at) < self.config.startup_grace_ms
    }

    pub fn landing_inhibited(&self) -> bool {
        self.landing_inhibited_at(self.now)
    }

    pub fn landing_inhibited_at(&self, now: Millis) -> bool {
        self.timers
            .land_inhibit_until
            .is_some_and(|until| !reached(now, until))
    }
}
