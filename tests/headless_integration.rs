use std::time::Duration;

use chrono::Local;
use lineflow::{
    alert::RecordedAlerts,
    clock::RunState,
    history::MemoryHistoryStore,
    pool::ImageRef,
    practice::Practice,
    runtime::{AppEvent, EventSource, FixedTicker, Runner, TestEventSource},
    session::{PracticeMode, SessionConfig},
};
use rand::{rngs::StdRng, SeedableRng};

// Headless integration using the internal runtime + Practice without a TTY.
// Ticks come from the Runner's deadline; the test only counts them.

fn practice(config: SessionConfig, images: usize) -> Practice<MemoryHistoryStore, RecordedAlerts, StdRng> {
    let mut p = Practice::new(
        config,
        MemoryHistoryStore::new(),
        RecordedAlerts::default(),
        StdRng::seed_from_u64(7),
    );
    p.add_images((0..images).map(|i| ImageRef::new(format!("/refs/{i}.png"))));
    p
}

#[test]
fn headless_speed_session_finishes_and_is_recorded() {
    let mut p = practice(
        SessionConfig {
            mode: PracticeMode::Speed,
            total_session_secs: 12,
            minimum_image_secs: 3,
            interval_secs: 0,
            audible_alerts: true,
            ..SessionConfig::default()
        },
        3,
    );

    let es = TestEventSource::new();
    let ticker = FixedTicker::new(Duration::from_millis(2));
    let mut runner = Runner::new(es, ticker);

    p.toggle(Local::now()).unwrap();
    let durations = p.clock().durations().to_vec();
    assert_eq!(durations.iter().sum::<u32>(), 12);
    assert!(durations.windows(2).all(|w| w[0] >= w[1]));

    let mut ticks = 0;
    for _ in 0..100u32 {
        if let AppEvent::Tick = runner.step() {
            ticks += 1;
            p.tick(Local::now());
        }
        if p.take_ticker_restart() {
            runner.restart();
        }
        if p.run_state() == RunState::Finished {
            break;
        }
    }

    assert_eq!(ticks, 12);
    assert_eq!(p.run_state(), RunState::Finished);
    let record = p.last_record().expect("finished session has a summary").clone();
    assert_eq!(record.images_completed, 3);
    assert_eq!(p.history(), vec![record]);
    assert_eq!(p.alerts().chimes, expected_chimes(&durations));
}

// an image of d seconds chimes for every alert second below d
fn expected_chimes(durations: &[u32]) -> Vec<u32> {
    durations
        .iter()
        .flat_map(|&d| [3, 2, 1].into_iter().filter(move |&s| s < d))
        .collect()
}

#[test]
fn headless_keys_pass_through_between_ticks() {
    let mut p = practice(
        SessionConfig {
            per_image_secs: 60,
            shuffle: false,
            ..SessionConfig::default()
        },
        3,
    );

    let es = TestEventSource::new();
    let tx = es.sender();
    let ticker = FixedTicker::new(Duration::from_secs(5));
    let mut runner = Runner::new(es, ticker);

    p.toggle(Local::now()).unwrap();
    tx.send(AppEvent::Resize).unwrap();
    tx.send(AppEvent::Resize).unwrap();

    assert!(matches!(runner.step(), AppEvent::Resize));
    assert!(matches!(runner.step(), AppEvent::Resize));
    assert_eq!(p.state().time_remaining, 60);
    assert_eq!(p.current_image(), Some(&ImageRef::new("/refs/0.png")));
}

#[test]
fn headless_zen_session_ignores_ticks() {
    let mut p = practice(
        SessionConfig {
            mode: PracticeMode::Zen,
            ..SessionConfig::default()
        },
        2,
    );
    let es = TestEventSource::new();
    let ticker = FixedTicker::new(Duration::from_millis(1));
    let mut runner = Runner::new(es, ticker);

    p.toggle(Local::now()).unwrap();
    let before = *p.state();
    for _ in 0..20u32 {
        if let AppEvent::Tick = runner.step() {
            p.tick(Local::now());
        }
    }
    assert_eq!(*p.state(), before);
    assert_eq!(p.run_state(), RunState::Running);
}
