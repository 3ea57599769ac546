//! Halo flight-phase firmware library.
//!
//! Strobe / audio / display annunciator for light aircraft.  A table-driven
//! flight-phase machine consumes navigation telemetry and traffic alerts and
//! emits output commands; the [`app::service::HaloService`] dispatches them
//! to the devices through port traits.
//!
//! Everything here runs on the host, which is how the integration tests
//! and the `halo-sim` binary drive it.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod bench;
pub mod config;
pub mod drivers;
pub mod error;
pub mod fsm;
pub mod policy;
pub mod time;

pub use error::{Error, Result};
