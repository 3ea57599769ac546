//! Output device drivers.

pub mod audio;
pub mod strobe;
