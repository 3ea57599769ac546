//! Scripted bench sequence driven through the control channel.
//!
//! The unit sits on the bench (speed 0, AGL 0) the whole time; only the
//! control plane moves it through a flight.

use super::mock_hw::{DeviceCall, MockFlightLog, MockHardware, RecordingSink};

use halo::app::events::AppEvent;
use halo::app::service::{ControlChannel, HaloService};
use halo::bench::{BenchSequence, DEFAULT_STEP_MS};
use halo::config::{HaloConfig, HaloSettings};
use halo::fsm::Phase;
use halo::fsm::context::{FlightRecord, Page};
use halo::time::Millis;

const STEP: Millis = 100;
const BENCH_START: Millis = 5000;

struct BenchRun {
    hw: MockHardware,
    log: MockFlightLog,
    sink: RecordingSink,
    final_phase: Phase,
    alerts: u16,
    ended_at: Millis,
}

fn run_bench(limit: Millis) -> BenchRun {
    let config = HaloConfig::default();
    let control = ControlChannel::new();
    let settings = HaloSettings {
        baseline_alt_m: Some(0.0),
        ..Default::default()
    };
    let mut svc = HaloService::new(config.clone(), &settings, &control);
    let tx = svc.control_sender();
    let mut bench = BenchSequence::new(&config, DEFAULT_STEP_MS);

    let mut hw = MockHardware::new();
    hw.set_speed(0.0);
    hw.set_msl(0.0);
    let mut log = MockFlightLog::new();
    let mut sink = RecordingSink::new();
    svc.start(0, &mut hw, &mut log, &mut sink);

    let mut now = 0;
    while now < limit && svc.phase() != Phase::Landed {
        now += STEP;
        if now == BENCH_START {
            bench.start(now);
        }
        for cmd in bench.poll(now) {
            tx.try_send(cmd).unwrap();
        }
        svc.tick(now, &mut hw, &mut log, &mut sink);
    }

    assert!(bench.is_finished());
    BenchRun {
        final_phase: svc.phase(),
        alerts: svc.machine().last_flight_alerts(),
        ended_at: now,
        hw,
        log,
        sink,
    }
}

#[test]
fn bench_walks_every_airborne_phase() {
    let run = run_bench(60_000);

    assert_eq!(run.final_phase, Phase::Landed);
    assert_eq!(
        run.sink.phase_changes(),
        vec![
            (Phase::Preflight, Phase::Flying),
            (Phase::Flying, Phase::Alert),
            (Phase::Alert, Phase::Landing),
            (Phase::Landing, Phase::Landed),
        ]
    );
}

#[test]
fn bench_alert_cadence_follows_each_step() {
    let run = run_bench(60_000);

    let periods: Vec<u16> = run
        .hw
        .calls
        .iter()
        .filter_map(|c| match c {
            DeviceCall::Cadence(cadence) => Some(cadence.period_ms),
            _ => None,
        })
        .collect();
    // Boot, takeoff, then L2 → L3 → L1, back to standard on leaving ALERT.
    assert_eq!(periods, vec![2000, 2000, 900, 500, 1400, 2000]);
}

#[test]
fn bench_counts_one_alert_and_records_the_flight() {
    let run = run_bench(60_000);

    // Steps 3 and 4 update the alert already on screen.
    assert_eq!(run.alerts, 1);
    let alert_events = run
        .sink
        .events
        .iter()
        .filter(|e| matches!(e, AppEvent::AlertRaised { .. }))
        .count();
    assert_eq!(alert_events, 1);

    // Forced landing at step 5 (t = 15 s), display hold then slow hold.
    assert_eq!(run.ended_at, 26_000);
    assert_eq!(
        run.log.records,
        vec![FlightRecord {
            duration_ms: 21_000,
            alerts: 1,
            utc_hour: None,
            utc_min: None,
        }]
    );
    assert_eq!(run.hw.page(), Some(Page::Landed));
}

#[test]
fn bench_never_lands_on_its_own_between_steps() {
    let run = run_bench(60_000);

    // Every inhibit extension is reported and none moves the deadline back.
    let untils: Vec<Millis> = run
        .sink
        .events
        .iter()
        .filter_map(|e| match e {
            AppEvent::LandingInhibited { until } => Some(*until),
            _ => None,
        })
        .collect();
    assert_eq!(untils, vec![13_000, 15_500, 18_000, 20_500]);

    let landing_at = run
        .sink
        .events
        .iter()
        .position(|e| {
            *e == AppEvent::PhaseChanged {
                from: Phase::Alert,
                to: Phase::Landing,
            }
        });
    assert!(landing_at.is_some());
}
