//! Application core: pure domain logic, zero I/O.
//!
//! Control-plane commands in, structured events out, and the service that
//! ties the flight-phase machine to the devices.  All interaction with
//! hardware happens through **port traits** defined in [`ports`], keeping
//! this layer fully testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
