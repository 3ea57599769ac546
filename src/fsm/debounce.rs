//! Debounced conditions.
//!
//! Every threshold in the flight-phase table must hold *continuously* for
//! some window before it is trusted.  A [`HoldTimer`] records the tick at
//! which its condition was first seen true and forgets it the moment the
//! condition goes false; there is no partial credit.

use crate::time::{Millis, elapsed};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HoldTimer {
    since: Option<Millis>,
}

impl HoldTimer {
    pub const fn new() -> Self {
        Self { since: None }
    }

    /// Latch `now` as the rising edge if the timer is not already running.
    pub fn start_if_needed(&mut self, now: Millis) {
        if self.since.is_none() {
            self.since = Some(now);
        }
    }

    /// How long the condition has held, or 0 if it is not running.
    pub fn held_for(&self, now: Millis) -> Millis {
        self.since.map_or(0, |since| elapsed(now, since))
    }

    pub fn reset(&mut self) {
        self.since = None;
    }

    pub fn is_running(&self) -> bool {
        self.since.is_some()
    }

    /// Feed this tick's condition.  Returns `true` once it has held for at
    /// least `hold_ms`.
    pub fn update(&mut self, condition: bool, now: Millis, hold_ms: Millis) -> bool {
        if condition {
            self.start_if_needed(now);
            self.held_for(now) >= hold_ms
        } else {
            self.reset();
            false
        }
    }
}
