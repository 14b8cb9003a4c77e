//! End-to-end recorder behaviour against a real ledger directory.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rollcall_core::{AttendanceRecorder, Ledger, ManualClock, RecordOutcome, Suppression};
use std::fs;
use tempfile::TempDir;

fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 1)
        .unwrap()
        .and_hms_opt(h, m, s)
        .unwrap()
}

fn recorder(dir: &TempDir, clock: &ManualClock) -> AttendanceRecorder {
    let ledger = Ledger::open(dir.path().join("logs")).unwrap();
    AttendanceRecorder::with_clock(ledger, Duration::minutes(30), clock.clone())
}

fn ledger_text(recorder: &AttendanceRecorder) -> String {
    fs::read_to_string(recorder.ledger().path_for(at(0, 0, 0).date())).unwrap()
}

#[test]
fn test_morning_scenario() {
    let tmp = TempDir::new().unwrap();
    let clock = ManualClock::new(at(9, 0, 0));
    let mut recorder = recorder(&tmp, &clock);

    assert!(recorder.record("Alice").is_accepted());
    assert_eq!(
        ledger_text(&recorder),
        "Name,Timestamp,Status\nAlice,09:00:00,Present\n"
    );

    clock.set(at(9, 10, 0));
    assert!(!recorder.record("Alice").is_accepted());

    clock.set(at(9, 31, 0));
    assert!(recorder.record("Alice").is_accepted());
    assert_eq!(
        ledger_text(&recorder),
        "Name,Timestamp,Status\nAlice,09:00:00,Present\nAlice,09:31:00,Present\n"
    );
}

#[test]
fn test_accepted_rows_are_at_least_one_cooldown_apart() {
    let tmp = TempDir::new().unwrap();
    let clock = ManualClock::new(at(8, 0, 0));
    let mut recorder = recorder(&tmp, &clock);

    // A sighting every 7 minutes for four hours, with a restart every hour.
    for step in 0..35 {
        if step % 9 == 0 {
            recorder.clear_cache();
        }
        recorder.record("Alice");
        clock.advance(Duration::minutes(7));
    }

    let rows = recorder.ledger().rows(at(0, 0, 0).date()).unwrap();
    assert!(rows.len() > 1);
    for pair in rows.windows(2) {
        let gap = pair[1].time_of_day.unwrap() - pair[0].time_of_day.unwrap();
        assert!(gap >= Duration::minutes(30), "rows only {gap} apart");
    }
}

#[test]
fn test_restart_does_not_duplicate() {
    let tmp = TempDir::new().unwrap();
    let clock = ManualClock::new(at(9, 0, 0));
    let mut first = recorder(&tmp, &clock);
    assert!(first.record("Alice").is_accepted());
    drop(first);

    clock.advance(Duration::seconds(5));
    let mut second = recorder(&tmp, &clock);
    assert_eq!(
        second.record("Alice"),
        RecordOutcome::Suppressed(Suppression::Recovered { since: at(9, 0, 0) })
    );
    assert_eq!(second.ledger().rows(at(0, 0, 0).date()).unwrap().len(), 1);
}

#[test]
fn test_corrupted_timestamp_blocks_identity_for_the_day() {
    let tmp = TempDir::new().unwrap();
    let clock = ManualClock::new(at(9, 0, 0));
    let mut recorder = recorder(&tmp, &clock);
    assert!(recorder.record("Alice").is_accepted());

    let path = recorder.ledger().path_for(at(0, 0, 0).date());
    let edited = ledger_text(&recorder).replace("09:00:00", "9am-ish");
    fs::write(&path, edited).unwrap();
    recorder.clear_cache();

    for hour in [9, 12, 17] {
        clock.set(at(hour, 0, 0));
        assert!(matches!(
            recorder.record("Alice"),
            RecordOutcome::Suppressed(Suppression::UnreadableTimestamp { .. })
        ));
    }
}

#[test]
fn test_replay_against_populated_ledger_adds_nothing() {
    let events = [
        ("Alice", at(9, 0, 0)),
        ("Bob", at(9, 5, 0)),
        ("Alice", at(9, 10, 0)),
        ("Alice", at(9, 31, 0)),
        ("Bob", at(9, 40, 0)),
        ("Carol", at(10, 0, 0)),
        ("Alice", at(10, 2, 0)),
    ];

    let tmp = TempDir::new().unwrap();
    let clock = ManualClock::new(at(9, 0, 0));

    let mut live = recorder(&tmp, &clock);
    for (name, when) in events {
        clock.set(when);
        live.record(name);
    }
    let before = ledger_text(&live);
    assert_eq!(before.lines().count(), 1 + 6);

    let mut replay = recorder(&tmp, &clock);
    for (name, when) in events {
        clock.set(when);
        assert!(!replay.record(name).is_accepted(), "{name} at {when} re-recorded");
    }
    assert_eq!(ledger_text(&replay), before);
}
