//! HaloService writing through the real flight-log store.

use super::mock_hw::{DeviceCall, MockHardware, RecordingSink};

use halo::adapters::flight_log::{FlightLogStore, FlightTotals};
use halo::adapters::nvs::NvsAdapter;
use halo::app::commands::ControlCommand;
use halo::app::events::AppEvent;
use halo::app::ports::{ConfigError, SettingsPort, StorageError};
use halo::app::service::{ControlChannel, ControlSender, HaloService};
use halo::config::{DataSource, HaloConfig, HaloSettings};
use halo::fsm::Phase;
use halo::time::Millis;

const STEP: Millis = 100;

type Store = FlightLogStore<NvsAdapter>;

struct Bench<'a> {
    svc: HaloService<'a>,
    tx: ControlSender<'a>,
    hw: MockHardware,
    sink: RecordingSink,
    now: Millis,
}

impl<'a> Bench<'a> {
    fn new(control: &'a ControlChannel, settings: &HaloSettings, log: &mut Store) -> Self {
        let svc = HaloService::new(HaloConfig::default(), settings, control);
        let tx = svc.control_sender();
        let mut hw = MockHardware::new();
        hw.set_speed(0.0);
        hw.set_msl(0.0);
        let mut bench = Self {
            svc,
            tx,
            hw,
            sink: RecordingSink::new(),
            now: 0,
        };
        bench.svc.start(0, &mut bench.hw, log, &mut bench.sink);
        bench
    }

    fn send(&self, cmd: ControlCommand) {
        self.tx.try_send(cmd).unwrap();
    }

    fn run_for(&mut self, ms: Millis, log: &mut Store) {
        let end = self.now + ms;
        while self.now < end {
            self.now += STEP;
            self.svc.tick(self.now, &mut self.hw, log, &mut self.sink);
        }
    }

    /// Forced flight of `airborne_ms` with `alerts` injected alerts, rolled
    /// out to LANDED.
    fn fly(&mut self, airborne_ms: Millis, alerts: u8, log: &mut Store) {
        self.send(ControlCommand::ForceFlying);
        self.run_for(STEP, log);
        assert_eq!(self.svc.phase(), Phase::Flying);

        let mut left = airborne_ms;
        for _ in 0..alerts {
            self.send(ControlCommand::InjectAlert {
                severity: 2,
                bearing_deg: 90.0,
                rel_vertical_m: 0.0,
            });
            self.run_for(STEP, log);
            assert_eq!(self.svc.phase(), Phase::Alert);
            self.send(ControlCommand::ClearAlert);
            // Alert hold expires 8 s after injection.
            self.run_for(8000, log);
            assert_eq!(self.svc.phase(), Phase::Flying);
            left -= 8100;
        }
        self.run_for(left - STEP, log);

        self.send(ControlCommand::ForceLanding);
        self.run_for(12_000, log);
        assert_eq!(self.svc.phase(), Phase::Landed);
    }
}

#[test]
fn two_flights_accumulate_in_the_logbook() {
    let control = ControlChannel::new();
    let mut log = FlightLogStore::new(NvsAdapter::new());
    let settings = HaloSettings {
        baseline_alt_m: Some(0.0),
        ..Default::default()
    };
    let mut bench = Bench::new(&control, &settings, &mut log);

    bench.run_for(5000, &mut log);
    bench.fly(20_000, 0, &mut log);
    let first = log.totals();
    assert_eq!(first.flights, 1);
    assert_eq!(first.total_alerts, 0);
    // Airborne time plus display hold and slow hold.
    assert_eq!(first.last_flight_ms, 20_000 + 11_000);

    bench.send(ControlCommand::Reset);
    bench.run_for(5000, &mut log);
    assert_eq!(bench.svc.phase(), Phase::Preflight);
    bench.fly(30_000, 2, &mut log);

    let totals = log.totals();
    assert_eq!(totals.flights, 2);
    assert_eq!(totals.total_alerts, 2);
    assert_eq!(totals.last_alerts, 2);
    assert_eq!(totals.last_flight_ms, 30_000 + 11_000);
    assert_eq!(totals.total_ms, 31_000 + 41_000);

    let recorded = bench
        .sink
        .events
        .iter()
        .filter(|e| matches!(e, AppEvent::FlightRecorded(_)))
        .count();
    assert_eq!(recorded, 2);
}

#[test]
fn full_partition_keeps_the_machine_running() {
    let control = ControlChannel::new();
    let mut log = FlightLogStore::new(NvsAdapter::with_capacity(2));
    let mut bench = Bench::new(&control, &HaloSettings::default(), &mut log);

    bench.run_for(5000, &mut log);
    bench.fly(10_000, 0, &mut log);

    assert!(
        bench
            .sink
            .events
            .contains(&AppEvent::FlightRecordFailed(StorageError::Full))
    );
    assert_eq!(log.totals(), FlightTotals::default());

    // The next flight still runs and fails the same way.
    bench.send(ControlCommand::Reset);
    bench.run_for(5000, &mut log);
    bench.fly(10_000, 0, &mut log);
    assert_eq!(bench.svc.machine().last_flight_duration_ms(), 21_000);
}

#[test]
fn captured_baseline_survives_a_restart() {
    let mut log = FlightLogStore::new(NvsAdapter::new());
    let settings = log.settings_or_default();
    assert_eq!(settings.baseline_alt_m, None);

    {
        let control = ControlChannel::new();
        let mut bench = Bench::new(&control, &settings, &mut log);
        bench.hw.set_msl(152.0);
        bench.run_for(STEP, &mut log);
        bench.send(ControlCommand::CaptureBaseline);
        bench.run_for(STEP, &mut log);
        assert!(
            bench
                .sink
                .events
                .iter()
                .any(|e| matches!(e, AppEvent::SettingsSaved(s) if s.baseline_alt_m == Some(152.0)))
        );
    }

    let reloaded = log.settings_or_default();
    assert_eq!(reloaded.baseline_alt_m, Some(152.0));

    let control = ControlChannel::new();
    let bench = Bench::new(&control, &reloaded, &mut log);
    assert_eq!(bench.svc.baseline().msl_m(), Some(152.0));
}

#[test]
fn factory_reset_clears_logbook_and_settings() {
    let control = ControlChannel::new();
    let mut log = FlightLogStore::new(NvsAdapter::new());
    let settings = HaloSettings {
        volume: 12,
        ..Default::default()
    };
    log.save_settings(&settings).unwrap();

    let mut bench = Bench::new(&control, &settings, &mut log);
    bench.run_for(5000, &mut log);
    bench.fly(10_000, 0, &mut log);
    assert_eq!(log.totals().flights, 1);

    log.factory_reset().unwrap();
    assert_eq!(log.load_totals(), Err(StorageError::NotFound));
    assert_eq!(log.settings_or_default(), HaloSettings::default());
}

// ── Settings commands ─────────────────────────────────────────

/// Send one settings command to a freshly started unit.  Returns what a
/// restart would load, and the device calls the command caused.
fn apply_and_reload(cmd: ControlCommand) -> (Result<HaloSettings, ConfigError>, Vec<DeviceCall>) {
    let control = ControlChannel::new();
    let mut log = FlightLogStore::new(NvsAdapter::new());
    let settings = log.settings_or_default();
    let mut bench = Bench::new(&control, &settings, &mut log);
    bench.hw.clear_calls();
    bench.send(cmd);
    bench.run_for(STEP, &mut log);
    let calls = bench.hw.calls;
    (log.load_settings(), calls)
}

#[test]
fn volume_is_saved_and_sent_to_the_player() {
    let (reloaded, calls) = apply_and_reload(ControlCommand::SetVolume(12));
    assert_eq!(reloaded.unwrap().volume, 12);
    assert_eq!(calls, vec![DeviceCall::Volume(12)]);
}

#[test]
fn qnh_is_saved_and_sent_to_baro_and_display() {
    let (reloaded, calls) = apply_and_reload(ControlCommand::SetQnh(1021));
    assert_eq!(reloaded.unwrap().qnh_hpa, 1021.0);
    assert_eq!(
        calls,
        vec![
            DeviceCall::Qnh(1021.0),
            DeviceCall::FieldInfo {
                qnh_hpa: 1021.0,
                elevation_ft: 0.0
            },
        ]
    );
}

#[test]
fn field_elevation_is_saved_and_shown() {
    let (reloaded, calls) = apply_and_reload(ControlCommand::SetFieldElevation(1450));
    let reloaded = reloaded.unwrap();
    assert_eq!(reloaded.airfield_elev_ft, 1450.0);
    assert_eq!(reloaded.qnh_hpa, HaloSettings::default().qnh_hpa);
    assert_eq!(
        calls,
        vec![DeviceCall::FieldInfo {
            qnh_hpa: 1013.25,
            elevation_ft: 1450.0
        }]
    );
}

#[test]
fn data_source_is_saved_and_reopens_the_link() {
    let (reloaded, calls) = apply_and_reload(ControlCommand::SetDataSource(DataSource::SoftRf));
    let reloaded = reloaded.unwrap();
    assert_eq!(reloaded.data_source, DataSource::SoftRf);
    assert_eq!(reloaded.data_source.baud(), 38_400);
    assert_eq!(calls, vec![DeviceCall::Source(DataSource::SoftRf)]);
}

#[test]
fn rejected_setting_writes_nothing() {
    let (reloaded, calls) = apply_and_reload(ControlCommand::SetQnh(700));
    assert_eq!(reloaded, Err(ConfigError::NotFound));
    assert!(calls.is_empty());
}

#[test]
fn stored_settings_are_applied_on_start() {
    let mut log = FlightLogStore::new(NvsAdapter::new());
    let stored = HaloSettings {
        volume: 5,
        data_source: DataSource::SoftRf,
        ..Default::default()
    };
    log.save_settings(&stored).unwrap();

    let control = ControlChannel::new();
    let bench = Bench::new(&control, &log.settings_or_default(), &mut log);
    assert_eq!(bench.hw.volume(), Some(5));
    assert!(bench.hw.calls.contains(&DeviceCall::Source(DataSource::SoftRf)));
    assert_eq!(*bench.svc.settings(), stored);
}
