//! Scripted bench test.
//!
//! Walks a grounded unit through a whole flight using only the control
//! plane: force FLYING, three escalating/de-escalating traffic alerts,
//! then clear and force LANDING.  Landing detection stays inhibited
//! between steps so a unit sitting on the bench (AGL ≈ 0) does not land
//! itself halfway through.
//!
//! ```text
//!  step 1   ForceFlying
//!  step 2   L2, 2 o'clock, high
//!  step 3   L3, 10 o'clock, low
//!  step 4   L1, 12 o'clock, level
//!  step 5   ClearAlert + ForceLanding
//! ```

use heapless::Vec;
use log::info;

use crate::app::commands::ControlCommand;
use crate::config::HaloConfig;
use crate::time::{Millis, reached};

pub const DEFAULT_STEP_MS: Millis = 2500;

/// Commands produced by one step.
pub type BenchStep = Vec<ControlCommand, 2>;

const LAST_STEP: u8 = 5;

pub struct BenchSequence {
    step_ms: Millis,
    inhibit_ms: Millis,
    /// Next step to run (1-based); 0 = not started.
    next_step: u8,
    next_at: Millis,
}

impl BenchSequence {
    pub fn new(config: &HaloConfig, step_ms: Millis) -> Self {
        Self {
            step_ms,
            inhibit_ms: config.bench_inhibit_ms,
            next_step: 0,
            next_at: 0,
        }
    }

    /// Arm the sequence; step 1 runs on the first `poll` at or after `now`.
    pub fn start(&mut self, now: Millis) {
        info!("bench: sequence armed, {} ms per step", self.step_ms);
        self.next_step = 1;
        self.next_at = now;
    }

    pub fn is_running(&self) -> bool {
        (1..=LAST_STEP).contains(&self.next_step)
    }

    pub fn is_finished(&self) -> bool {
        self.next_step > LAST_STEP
    }

    /// Commands due at `now`, if a step is due.
    pub fn poll(&mut self, now: Millis) -> BenchStep {
        let mut out = BenchStep::new();
        if !self.is_running() || !reached(now, self.next_at) {
            return out;
        }

        let step = self.next_step;
        let alert = |severity, bearing_deg, rel_vertical_m| ControlCommand::InjectAlert {
            severity,
            bearing_deg,
            rel_vertical_m,
        };
        let inhibit = ControlCommand::ExtendLandingInhibit(self.inhibit_ms);
        let (first, second) = match step {
            1 => (ControlCommand::ForceFlying, None),
            2 => (inhibit, Some(alert(2, 60.0, 120.0))),
            3 => (inhibit, Some(alert(3, 300.0, -150.0))),
            4 => (inhibit, Some(alert(1, 0.0, 0.0))),
            _ => (ControlCommand::ClearAlert, Some(ControlCommand::ForceLanding)),
        };
        // Capacity covers the longest step.
        let _ = out.push(first);
        if let Some(cmd) = second {
            let _ = out.push(cmd);
        }

        info!("bench: step {}/{}", step, LAST_STEP);
        self.next_step += 1;
        self.next_at = now.wrapping_add(self.step_ms);
        out
    }
}
