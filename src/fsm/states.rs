//! Concrete phase handler functions and table builder.
//!
//! Each phase is defined by plain `fn` pointers: no closures, no dynamic
//! dispatch, no heap.
//!
//! ```text
//!  BOOT ──[init]──▶ PREFLIGHT ──[speed | baro AGL held]──▶ FLYING ◀──┐
//!                                                           │  ▲     │
//!                                         [new live alert]  │  │ [expired, page hold done]
//!                                                           ▼  │     │
//!                                                          ALERT ────┘
//!                                                           │
//!              FLYING / ALERT ──[armed, AGL low held]──▶ LANDING
//!                                                           │
//!                                  [display hold, then slow speed held]
//!                                                           ▼
//!                                                        LANDED
//! ```
//!
//! Every entry action issues its side effects in the same order: audio
//! (stop first, then cues), strobe, page.  ALERT is the only phase with an
//! exit action: it puts the strobe back on standard cadence, ahead of the
//! next phase's entry commands.

use log::info;

use super::context::{AudioCue, FlightRecord, FsmContext, OutputCommand, Page};
use super::{Phase, StateDescriptor};
use crate::policy::{alert_level, clock_sector};
use crate::time::{elapsed, later_of, reached};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static phase table.
pub fn build_phase_table() -> [StateDescriptor; Phase::COUNT] {
    [
        // Index 0 — Boot
        StateDescriptor {
            id: Phase::Boot,
            name: "BOOT",
            on_enter: None,
            on_exit: None,
            on_update: boot_update,
        },
        // Index 1 — Preflight
        StateDescriptor {
            id: Phase::Preflight,
            name: "PREFLIGHT",
            on_enter: Some(preflight_enter),
            on_exit: None,
            on_update: preflight_update,
        },
        // Index 2 — Flying
        StateDescriptor {
            id: Phase::Flying,
            name: "FLYING",
            on_enter: Some(flying_enter),
            on_exit: None,
            on_update: flying_update,
        },
        // Index 3 — Alert
        StateDescriptor {
            id: Phase::Alert,
            name: "ALERT",
            on_enter: Some(alert_enter),
            on_exit: Some(alert_exit),
            on_update: alert_update,
        },
        // Index 4 — Landing
        StateDescriptor {
            id: Phase::Landing,
            name: "LANDING",
            on_enter: Some(landing_enter),
            on_exit: None,
            on_update: landing_update,
        },
        // Index 5 — Landed
        StateDescriptor {
            id: Phase::Landed,
            name: "LANDED",
            on_enter: Some(landed_enter),
            on_exit: None,
            on_update: landed_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  Shared guards and actions
// ═══════════════════════════════════════════════════════════════════════════

/// Stop whatever is playing, then queue `cues` in order.
fn announce(ctx: &mut FsmContext, cues: &[AudioCue]) {
    ctx.push(OutputCommand::StopAudio);
    for &cue in cues {
        ctx.push(OutputCommand::PlayCue(cue));
    }
}

/// Arm landing detection on the first climb above the takeoff altitude.
fn arm_landing(ctx: &mut FsmContext) {
    if ctx.stats.landing_armed {
        return;
    }
    if ctx.agl_ft().is_some_and(|agl| agl > ctx.config.takeoff_alt_ft) {
        ctx.stats.landing_armed = true;
        info!("landing detection armed");
    }
}

/// AGL at or below the landing altitude, held, while armed and not inhibited.
fn landing_detected(ctx: &mut FsmContext) -> bool {
    if ctx.landing_inhibited() {
        ctx.timers.alt_low.reset();
        return false;
    }
    let low = ctx.stats.landing_armed
        && ctx
            .agl_ft()
            .is_some_and(|agl| agl <= ctx.config.landing_alt_ft);
    let (now, hold) = (ctx.now, ctx.config.landing_agl_hold_ms);
    ctx.timers.alt_low.update(low, now, hold)
}

/// A live alert that has not been counted yet.
fn fresh_alert(ctx: &FsmContext) -> bool {
    ctx.alert_alive() && ctx.stats.last_alert_stamp != Some(ctx.inputs.traffic.since)
}

// ═══════════════════════════════════════════════════════════════════════════
//  BOOT — constructed, waiting for init
// ═══════════════════════════════════════════════════════════════════════════

fn boot_update(_ctx: &mut FsmContext) -> Option<Phase> {
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  PREFLIGHT
// ═══════════════════════════════════════════════════════════════════════════

fn preflight_enter(ctx: &mut FsmContext) {
    announce(ctx, &[AudioCue::Boot]);
    ctx.push(OutputCommand::StrobeEnable(false));
    let cadence = ctx.cadence.reset_to_standard(&ctx.config);
    ctx.push(OutputCommand::StrobeCadence(cadence));
    ctx.push(OutputCommand::SelectPage(Page::Boot));
    info!(
        "PREFLIGHT: takeoff ignored for {} ms",
        ctx.config.startup_grace_ms
    );
}

fn preflight_update(ctx: &mut FsmContext) -> Option<Phase> {
    if ctx.in_startup_grace() {
        ctx.timers.speed_high.reset();
        ctx.timers.alt_high.reset();
        return None;
    }

    let (now, hold) = (ctx.now, ctx.config.takeoff_hold_ms);

    let fast = ctx
        .speed_kts()
        .is_some_and(|kts| kts > ctx.config.takeoff_speed_kts);
    if ctx.timers.speed_high.update(fast, now, hold) {
        info!("PREFLIGHT: takeoff by ground speed");
        return Some(Phase::Flying);
    }

    // Barometric fallback, only without a nav link.
    let high = !ctx.inputs.link_ok
        && ctx
            .agl_ft()
            .is_some_and(|agl| agl > ctx.config.takeoff_alt_ft);
    if ctx.timers.alt_high.update(high, now, hold) {
        info!("PREFLIGHT: takeoff by barometric altitude");
        return Some(Phase::Flying);
    }

    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  FLYING
// ═══════════════════════════════════════════════════════════════════════════

fn flying_enter(ctx: &mut FsmContext) {
    if ctx.entered_from == Phase::Alert {
        // Cadence was restored on the way out of ALERT.
        ctx.push(OutputCommand::SelectPage(Page::Cruise));
        info!("FLYING: alert cleared, resuming cruise");
        return;
    }

    if ctx.stats.takeoff_chimed {
        ctx.push(OutputCommand::StopAudio);
    } else {
        announce(ctx, &[AudioCue::Takeoff]);
        ctx.stats.takeoff_chimed = true;
    }
    ctx.push(OutputCommand::StrobeEnable(true));
    let cadence = ctx.cadence.reset_to_standard(&ctx.config);
    ctx.push(OutputCommand::StrobeCadence(cadence));
    ctx.push(OutputCommand::SelectPage(Page::Cruise));

    ctx.stats.flight_start = Some(ctx.now);
    ctx.stats.alert_count = 0;
    ctx.stats.landing_armed = false;
    ctx.timers.alt_low.reset();
    info!("FLYING: takeoff at t={} ms", ctx.now);
}

fn flying_update(ctx: &mut FsmContext) -> Option<Phase> {
    arm_landing(ctx);

    if fresh_alert(ctx) {
        return Some(Phase::Alert);
    }
    if landing_detected(ctx) {
        return Some(Phase::Landing);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  ALERT — traffic page up, strobe at alert cadence
// ═══════════════════════════════════════════════════════════════════════════

fn alert_enter(ctx: &mut FsmContext) {
    let alert = ctx.inputs.traffic;
    let sector = clock_sector(alert.bearing_deg, ctx.inputs.telemetry.track_deg);
    let level = alert_level(alert.severity);

    announce(
        ctx,
        &[
            AudioCue::AlertVertical(alert.vertical_category()),
            AudioCue::AlertClock(sector),
        ],
    );
    if let Some(cadence) = ctx.cadence.apply(&ctx.config, level) {
        ctx.push(OutputCommand::StrobeCadence(cadence));
    }
    ctx.push(OutputCommand::SelectPage(Page::Traffic));

    ctx.stats.alert_count = ctx.stats.alert_count.saturating_add(1);
    ctx.stats.last_alert_stamp = Some(alert.since);
    ctx.timers.traffic_hold_until = later_of(
        ctx.now.wrapping_add(ctx.config.alert_page_floor_ms),
        alert.since.wrapping_add(ctx.config.alert_hold_ms),
    );

    info!(
        "ALERT: level {} at {} o'clock, alert #{} this flight",
        level, sector, ctx.stats.alert_count
    );
}

/// The alert cadence never outlives the alert, whichever way ALERT is left.
fn alert_exit(ctx: &mut FsmContext) {
    if let Some(cadence) = ctx.cadence.apply(&ctx.config, 0) {
        ctx.push(OutputCommand::StrobeCadence(cadence));
    }
}

fn alert_update(ctx: &mut FsmContext) -> Option<Phase> {
    arm_landing(ctx);

    if landing_detected(ctx) {
        return Some(Phase::Landing);
    }

    if !ctx.alert_alive() {
        if reached(ctx.now, ctx.timers.traffic_hold_until) {
            return Some(Phase::Flying);
        }
        return None;
    }

    let level = alert_level(ctx.inputs.traffic.severity);
    if let Some(cadence) = ctx.cadence.apply(&ctx.config, level) {
        info!("ALERT: severity now level {level}");
        ctx.push(OutputCommand::StrobeCadence(cadence));
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  LANDING
// ═══════════════════════════════════════════════════════════════════════════

fn landing_enter(ctx: &mut FsmContext) {
    announce(ctx, &[AudioCue::Landing]);
    ctx.push(OutputCommand::StrobeEnable(false));
    ctx.push(OutputCommand::SelectPage(Page::Landing));
    ctx.timers.landing_shown_at = Some(ctx.now);
    ctx.timers.slow_speed.reset();
    info!("LANDING: detected at t={} ms", ctx.now);
}

fn landing_update(ctx: &mut FsmContext) -> Option<Phase> {
    let shown_for = ctx
        .timers
        .landing_shown_at
        .map_or(0, |at| elapsed(ctx.now, at));
    if shown_for < ctx.config.landing_display_hold_ms {
        ctx.timers.slow_speed.reset();
        return None;
    }

    let slow = ctx
        .speed_kts()
        .is_some_and(|kts| kts < ctx.config.landed_slow_kts);
    let (now, hold) = (ctx.now, ctx.config.landed_slow_hold_ms);
    if ctx.timers.slow_speed.update(slow, now, hold) {
        return Some(Phase::Landed);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  LANDED — terminal until re-init or a bench override
// ═══════════════════════════════════════════════════════════════════════════

fn landed_enter(ctx: &mut FsmContext) {
    let duration_ms = ctx
        .stats
        .flight_start
        .take()
        .map_or(0, |start| elapsed(ctx.now, start));
    ctx.stats.last_duration_ms = duration_ms;
    ctx.stats.takeoff_chimed = false;

    let record = FlightRecord {
        duration_ms,
        alerts: ctx.stats.alert_count,
        utc_hour: ctx.inputs.telemetry.utc_hour,
        utc_min: ctx.inputs.telemetry.utc_min,
    };
    ctx.push(OutputCommand::SelectPage(Page::Landed));
    ctx.push(OutputCommand::RecordFlight(record));

    info!(
        "LANDED: flight of {} s with {} alert(s)",
        duration_ms / 1000,
        record.alerts
    );
}

fn landed_update(_ctx: &mut FsmContext) -> Option<Phase> {
    None
}
