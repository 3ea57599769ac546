//! Function-pointer finite state machine engine.
//!
//! Classic embedded FSM pattern:
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │  PhaseTable                                                │
//! │  ┌───────────┬───────────┬──────────┬───────────────────┐  │
//! │  │ Phase     │ on_enter  │ on_exit  │ on_update         │  │
//! │  ├───────────┼───────────┼──────────┼───────────────────┤  │
//! │  │ Boot      │ -         │ -        │ fn(ctx)->Option<> │  │
//! │  │ Preflight │ fn(ctx)   │ -        │ fn(ctx)->Option<> │  │
//! │  │ Flying    │ fn(ctx)   │ -        │ fn(ctx)->Option<> │  │
//! │  │ Alert     │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option<> │  │
//! │  │ Landing   │ fn(ctx)   │ -        │ fn(ctx)->Option<> │  │
//! │  │ Landed    │ fn(ctx)   │ -        │ fn(ctx)->Option<> │  │
//! │  └───────────┴───────────┴──────────┴───────────────────┘  │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each tick the engine calls `on_update` for the **current** phase.
//! If it returns `Some(next)`, the engine runs `on_exit` for the current
//! phase, then `on_enter` for the next, and updates the current pointer.
//! All functions receive `&mut FsmContext`, which holds the tick's inputs,
//! the outbound command queue, the timers and the configuration.
//!
//! [`FlightPhaseMachine`] wraps the engine and its context behind the
//! operations the rest of the firmware uses.

pub mod context;
pub mod debounce;
pub mod machine;
pub mod states;

pub use machine::FlightPhaseMachine;

use context::FsmContext;
use log::{info, warn};

use crate::time::Millis;

// ---------------------------------------------------------------------------
// Phase identity
// ---------------------------------------------------------------------------

/// Enumeration of all flight phases.
/// Must stay in sync with the table built in [`states::build_phase_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Phase {
    Boot = 0,
    Preflight = 1,
    Flying = 2,
    Alert = 3,
    Landing = 4,
    Landed = 5,
}

impl Phase {
    /// Total number of phases, used to size the table array.
    pub const COUNT: usize = 6;

    /// Convert an index back to `Phase`.  Anything out of range heals to
    /// `Preflight`.
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Boot,
            1 => Self::Preflight,
            2 => Self::Flying,
            3 => Self::Alert,
            4 => Self::Landing,
            5 => Self::Landed,
            _ => {
                warn!("FSM: invalid phase index {idx}, healing to Preflight");
                Self::Preflight
            }
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Boot => "BOOT",
            Self::Preflight => "PREFLIGHT",
            Self::Flying => "FLYING",
            Self::Alert => "ALERT",
            Self::Landing => "LANDING",
            Self::Landed => "LANDED",
        }
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
pub type StateActionFn = fn(&mut FsmContext);

/// Per-tick update.  Returns `Some(next)` to trigger a transition.
pub type StateUpdateFn = fn(&mut FsmContext) -> Option<Phase>;

// ---------------------------------------------------------------------------
// Phase descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Static descriptor for a single phase.
/// Stored in a fixed-size array: no heap, no `dyn`.
pub struct StateDescriptor {
    pub id: Phase,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

pub struct Fsm {
    /// Fixed-size table indexed by `Phase as usize`.
    table: [StateDescriptor; Phase::COUNT],
    /// Index of the active phase.
    current: usize,
    /// Tick at which the current phase was entered.
    entered_at: Millis,
}

impl Fsm {
    pub fn new(table: [StateDescriptor; Phase::COUNT], initial: Phase) -> Self {
        Self {
            table,
            current: initial as usize,
            entered_at: 0,
        }
    }

    /// Jump to `phase` and run its `on_enter` unconditionally, without
    /// running any `on_exit`.  Used at init and re-init.
    pub fn start_in(&mut self, phase: Phase, ctx: &mut FsmContext) {
        self.current = phase as usize;
        self.entered_at = ctx.now;
        info!("FSM starting in phase: {}", self.table[self.current].name);
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Advance by one tick: run `on_update`, then transition if asked to.
    pub fn tick(&mut self, ctx: &mut FsmContext) {
        self.heal();
        let next = (self.table[self.current].on_update)(ctx);
        if let Some(next) = next {
            self.force_transition(next, ctx);
        }
    }

    /// Transition to `next` now.  Returns `false` (and runs no actions) if
    /// `next` is already the current phase.
    pub fn force_transition(&mut self, next: Phase, ctx: &mut FsmContext) -> bool {
        self.heal();
        if next as usize == self.current {
            return false;
        }
        self.transition(next, ctx);
        true
    }

    pub fn current_phase(&self) -> Phase {
        Phase::from_index(self.current)
    }

    /// How long the current phase has been active.
    pub fn time_in_phase(&self, now: Millis) -> Millis {
        crate::time::elapsed(now, self.entered_at)
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn heal(&mut self) {
        if self.current >= Phase::COUNT {
            self.current = Phase::from_index(self.current) as usize;
        }
    }

    fn transition(&mut self, next: Phase, ctx: &mut FsmContext) {
        let next_idx = next as usize;

        info!(
            "FSM transition: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        ctx.entered_from = self.current_phase();
        self.current = next_idx;
        self.entered_at = ctx.now;

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    #[cfg(test)]
    fn corrupt(&mut self, idx: usize) {
        self.current = idx;
    }
}
