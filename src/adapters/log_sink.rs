//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events
//! through the `log` facade (serial console on the device, stderr in the
//! simulator).  A BLE notification adapter would implement the same trait.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started(phase) => {
                info!("START | phase={}", phase.name());
            }
            AppEvent::PhaseChanged { from, to } => {
                info!("PHASE | {} -> {}", from.name(), to.name());
            }
            AppEvent::AlertRaised {
                severity,
                bearing_deg,
                count,
            } => {
                info!(
                    "ALERT | level={} bearing={:.0}\u{00b0} | #{} this flight",
                    severity, bearing_deg, count
                );
            }
            AppEvent::NavLinkChanged(ok) => {
                info!("NAV   | link {}", if *ok { "valid" } else { "lost" });
            }
            AppEvent::BaselineCaptured(msl) => {
                info!("BASE  | AGL zero at {:.1} m MSL", msl);
            }
            AppEvent::LandingInhibited { until } => {
                info!("BENCH | landing inhibited until t={} ms", until);
            }
            AppEvent::FlightRecorded(r) => {
                let utc = match (r.utc_hour, r.utc_min) {
                    (Some(h), Some(m)) => format!("{:02}:{:02}Z", h, m),
                    _ => "--:--Z".to_string(),
                };
                info!(
                    "FLIGHT | {}:{:02} | alerts={} | landed {}",
                    r.duration_ms / 60_000,
                    (r.duration_ms / 1000) % 60,
                    r.alerts,
                    utc
                );
            }
            AppEvent::FlightRecordFailed(e) => {
                warn!("FLIGHT | log write failed: {}", e);
            }
            AppEvent::SettingsSaved(s) => {
                info!(
                    "CONF  | qnh={:.0} hPa elev={:.0} ft vol={} src={:?} base={}",
                    s.qnh_hpa,
                    s.airfield_elev_ft,
                    s.volume,
                    s.data_source,
                    s.baseline_alt_m
                        .map_or_else(|| "unset".to_string(), |m| format!("{:.1} m", m))
                );
            }
            AppEvent::SettingsRejected(e) => {
                warn!("CONF  | change rejected: {}", e);
            }
            AppEvent::SettingsSaveFailed(e) => {
                warn!("CONF  | save failed, change kept until restart: {}", e);
            }
        }
    }
}
