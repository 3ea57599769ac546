//! The flight-phase machine as the rest of the firmware sees it.
//!
//! Owns the table-driven [`Fsm`] and its [`FsmContext`].  Every operation
//! that can change phase returns the batch of [`OutputCommand`]s produced,
//! in issue order; the caller dispatches them to the devices.

use log::info;

use super::context::{AudioCue, CommandBatch, FlightInputs, FsmContext, OutputCommand};
use super::{Fsm, Phase, states};
use crate::config::HaloConfig;
use crate::time::{Millis, later_of};

pub struct FlightPhaseMachine {
    fsm: Fsm,
    ctx: FsmContext,
}

impl FlightPhaseMachine {
    /// A fresh machine in `Boot`.  Nothing happens until [`init`](Self::init).
    pub fn new(config: HaloConfig) -> Self {
        Self {
            fsm: Fsm::new(states::build_phase_table(), Phase::Boot),
            ctx: FsmContext::new(config),
        }
    }

    /// Reset every timer, statistic and override, then enter `Preflight`
    /// with the boot annunciation.  Safe to call again at any time.
    pub fn init(&mut self, now: Millis) -> CommandBatch {
        self.ctx.reset(now);
        self.fsm.start_in(Phase::Preflight, &mut self.ctx);
        self.ctx.take_commands()
    }

    /// Evaluate one tick against a consistent input snapshot.
    pub fn tick(&mut self, now: Millis, inputs: &FlightInputs) -> CommandBatch {
        self.ctx.now = now;
        self.ctx.inputs = *inputs;

        self.track_nav_link();

        if core::mem::take(&mut self.ctx.force_landing) {
            info!("bench: forcing LANDING");
            self.fsm.force_transition(Phase::Landing, &mut self.ctx);
        }

        self.fsm.tick(&mut self.ctx);
        self.ctx.take_commands()
    }

    // -----------------------------------------------------------------------
    // Bench overrides
    // -----------------------------------------------------------------------

    /// Request `Landing` on the next tick.  Idempotent.
    pub fn force_landing(&mut self) {
        self.ctx.force_landing = true;
    }

    /// Enter `Flying` immediately and hold off landing detection for the
    /// configured bench window.
    pub fn force_flying(&mut self, now: Millis) -> CommandBatch {
        self.ctx.now = now;
        let bench_ms = self.ctx.config.bench_inhibit_ms;
        self.extend_landing_inhibit(now, bench_ms);
        info!("bench: forcing FLYING");
        self.fsm.force_transition(Phase::Flying, &mut self.ctx);
        self.ctx.take_commands()
    }

    /// Skip landing detection until `now + ms`.  Never shortens an inhibit
    /// that is already in force.
    pub fn extend_landing_inhibit(&mut self, now: Millis, ms: Millis) {
        let until = now.wrapping_add(ms);
        let active = self
            .ctx
            .timers
            .land_inhibit_until
            .filter(|_| self.ctx.landing_inhibited_at(now));
        self.ctx.timers.land_inhibit_until =
            Some(active.map_or(until, |current| later_of(current, until)));
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn phase(&self) -> Phase {
        self.fsm.current_phase()
    }

    /// Duration of the most recently completed flight (0 if none yet).
    pub fn last_flight_duration_ms(&self) -> u32 {
        self.ctx.stats.last_duration_ms
    }

    /// Alerts counted in the current or most recent flight.
    pub fn last_flight_alerts(&self) -> u16 {
        self.ctx.stats.alert_count
    }

    pub fn landing_armed(&self) -> bool {
        self.ctx.stats.landing_armed
    }

    pub fn landing_inhibited(&self, now: Millis) -> bool {
        self.ctx.landing_inhibited_at(now)
    }

    pub fn landing_inhibit_until(&self) -> Option<Millis> {
        self.ctx.timers.land_inhibit_until
    }

    /// Debounced nav-link state.
    pub fn nav_link(&self) -> bool {
        self.ctx.nav_link
    }

    /// Strobe level last handed out (0 = standard).
    pub fn strobe_level(&self) -> Option<u8> {
        self.ctx.cadence.last_applied()
    }

    pub fn time_in_phase(&self, now: Millis) -> Millis {
        self.fsm.time_in_phase(now)
    }

    pub fn config(&self) -> &HaloConfig {
        &self.ctx.config
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    /// Debounce link edges; chime on a confirmed rising edge.
    fn track_nav_link(&mut self) {
        let ctx = &mut self.ctx;
        let raw = ctx.inputs.link_ok;
        let changed = raw != ctx.nav_link;
        if !ctx
            .timers
            .nav_edge
            .update(changed, ctx.now, ctx.config.nav_edge_hyst_ms)
        {
            return;
        }
        ctx.timers.nav_edge.reset();
        ctx.nav_link = raw;
        info!("nav link {}", if raw { "valid" } else { "lost" });
        if raw {
            ctx.push(OutputCommand::PlayCue(AudioCue::NavValid));
        }
    }
}
