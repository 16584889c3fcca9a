use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use itertools::Itertools;

use super::data::{DayOfWeekMask, ManualOverride, OneTimeTarget, ScheduleData, ScheduleItem};
use super::*;
use crate::time_util::test_utils::utc_datetime;

fn lookahead() -> Duration {
    Duration::minutes(DEFAULT_LOOKAHEAD_MINS)
}

fn store(data: ScheduleData) -> ScheduleStore {
    ScheduleStore::new(data, ScheduleZone::Utc).unwrap()
}

fn target(start: DateTime<Utc>, end: DateTime<Utc>, temperature: f32, priority: TargetPriority) -> HeatingTarget {
    HeatingTarget::new(start, end, temperature, priority)
}

fn assert_exact_cover(targets: &[HeatingTarget], now: DateTime<Utc>, end: DateTime<Utc>) {
    assert!(!targets.is_empty());
    assert_eq!(targets[0].start, now, "First target should start now: {:?}", targets);
    assert_eq!(targets[targets.len() - 1].end, end, "Last target should end at lookahead: {:?}", targets);
    for (a, b) in targets.iter().tuple_windows() {
        assert_eq!(a.end, b.start, "Gap or overlap between {} and {}", a, b);
    }
    for t in targets {
        assert!(!t.is_empty(), "Empty target {}", t);
    }
}

#[test_log::test]
fn test_default_schedule_monday_morning() {
    // 2024-01-08 is a Monday.
    let now = utc_datetime(2024, 1, 8, 6, 40, 0);
    let mut store = store(ScheduleData::default());

    let targets = store.get_heating_targets(now, lookahead()).unwrap();

    assert_eq!(
        targets,
        vec![
            target(now, utc_datetime(2024, 1, 8, 7, 0, 0), 19.0, TargetPriority::Default),
            target(utc_datetime(2024, 1, 8, 7, 0, 0), utc_datetime(2024, 1, 8, 8, 0, 0), 21.0, TargetPriority::Schedule),
            target(utc_datetime(2024, 1, 8, 8, 0, 0), utc_datetime(2024, 1, 8, 19, 0, 0), 19.0, TargetPriority::Default),
            target(utc_datetime(2024, 1, 8, 19, 0, 0), utc_datetime(2024, 1, 8, 22, 0, 0), 21.0, TargetPriority::Schedule),
            target(utc_datetime(2024, 1, 8, 22, 0, 0), utc_datetime(2024, 1, 9, 6, 40, 0), 19.0, TargetPriority::Default),
        ]
    );
}

#[test]
fn test_manual_override_displaces_schedule() {
    let now = utc_datetime(2024, 1, 8, 6, 40, 0);
    let manual = ManualOverride::new(utc_datetime(2024, 1, 8, 7, 30, 0), utc_datetime(2024, 1, 8, 9, 0, 0), 23.0).unwrap();
    let mut store = store(ScheduleData {
        manual_override: Some(manual),
        ..ScheduleData::default()
    });

    let targets = store.get_heating_targets(now, lookahead()).unwrap();

    assert_exact_cover(&targets, now, now + lookahead());
    assert_eq!(
        &targets[..4],
        &[
            target(now, utc_datetime(2024, 1, 8, 7, 0, 0), 19.0, TargetPriority::Default),
            target(utc_datetime(2024, 1, 8, 7, 0, 0), utc_datetime(2024, 1, 8, 7, 30, 0), 21.0, TargetPriority::Schedule),
            target(utc_datetime(2024, 1, 8, 7, 30, 0), utc_datetime(2024, 1, 8, 9, 0, 0), 23.0, TargetPriority::ManualOverride),
            target(utc_datetime(2024, 1, 8, 9, 0, 0), utc_datetime(2024, 1, 8, 19, 0, 0), 19.0, TargetPriority::Default),
        ]
    );
}

#[test]
fn test_one_time_override_applies_within_window_only() {
    let now = utc_datetime(2024, 1, 8, 6, 40, 0);
    let holiday = OneTimeTarget {
        start_time: utc_datetime(2024, 1, 8, 0, 0, 0),
        end_time: utc_datetime(2024, 1, 8, 12, 0, 0),
        schedule: ScheduleItem::new(DayOfWeekMask::every_day(), 0, 24 * 60, 16.0),
    };
    let mut store = store(ScheduleData {
        one_time_overrides: vec![holiday],
        ..ScheduleData::default()
    });

    let targets = store.get_heating_targets(now, lookahead()).unwrap();

    assert_eq!(
        targets,
        vec![
            target(now, utc_datetime(2024, 1, 8, 12, 0, 0), 16.0, TargetPriority::OneTimeOverride),
            target(utc_datetime(2024, 1, 8, 12, 0, 0), utc_datetime(2024, 1, 8, 19, 0, 0), 19.0, TargetPriority::Default),
            target(utc_datetime(2024, 1, 8, 19, 0, 0), utc_datetime(2024, 1, 8, 22, 0, 0), 21.0, TargetPriority::Schedule),
            target(utc_datetime(2024, 1, 8, 22, 0, 0), utc_datetime(2024, 1, 9, 6, 40, 0), 19.0, TargetPriority::Default),
        ]
    );
}

#[test]
fn test_overnight_rule_from_previous_day() {
    let now = utc_datetime(2024, 1, 8, 3, 0, 0);
    let mut store = store(ScheduleData {
        default_temperature: 19.0,
        schedule: vec![ScheduleItem::new(DayOfWeekMask::every_day(), 22 * 60, 6 * 60, 17.0)],
        one_time_overrides: vec![],
        manual_override: None,
    });

    let targets = store.get_heating_targets(now, lookahead()).unwrap();

    assert_eq!(
        targets,
        vec![
            target(now, utc_datetime(2024, 1, 8, 6, 0, 0), 17.0, TargetPriority::Schedule),
            target(utc_datetime(2024, 1, 8, 6, 0, 0), utc_datetime(2024, 1, 8, 22, 0, 0), 19.0, TargetPriority::Default),
            target(utc_datetime(2024, 1, 8, 22, 0, 0), utc_datetime(2024, 1, 9, 3, 0, 0), 17.0, TargetPriority::Schedule),
        ]
    );
}

#[test]
fn test_empty_day_mask_contributes_nothing() {
    let now = utc_datetime(2024, 1, 8, 6, 40, 0);
    let mut store = store(ScheduleData {
        default_temperature: 18.0,
        schedule: vec![ScheduleItem::new(DayOfWeekMask::default(), 0, 24 * 60, 25.0)],
        one_time_overrides: vec![],
        manual_override: None,
    });

    let targets = store.get_heating_targets(now, lookahead()).unwrap();

    assert_eq!(targets, vec![target(now, now + lookahead(), 18.0, TargetPriority::Default)]);
}

#[test]
fn test_targets_always_cover_lookahead_exactly() {
    let manual = ManualOverride::new(utc_datetime(2024, 1, 10, 20, 0, 0), utc_datetime(2024, 1, 11, 2, 0, 0), 24.0).unwrap();
    let mut data = ScheduleData {
        manual_override: Some(manual),
        ..ScheduleData::default()
    };
    data.schedule.push(ScheduleItem::new(DayOfWeekMask::every_day(), 23 * 60, 5 * 60 + 30, 17.5));
    data.one_time_overrides.push(OneTimeTarget {
        start_time: utc_datetime(2024, 1, 12, 6, 15, 0),
        end_time: utc_datetime(2024, 1, 13, 18, 45, 0),
        schedule: ScheduleItem::new(DayOfWeekMask::weekends(), 8 * 60, 20 * 60, 22.0),
    });

    let start = utc_datetime(2024, 1, 8, 0, 0, 0);
    for step in 0..(7 * 24 * 4) {
        let now = start + Duration::minutes(step * 15 + 7);
        let mut store = store(data.clone());
        let targets = store.get_heating_targets(now, lookahead()).unwrap();
        assert_exact_cover(&targets, now, now + lookahead());
    }
}

#[test]
fn test_expired_overrides_are_purged() {
    let now = utc_datetime(2024, 1, 8, 6, 40, 0);
    let expired_manual = ManualOverride::new(utc_datetime(2024, 1, 8, 5, 0, 0), utc_datetime(2024, 1, 8, 6, 0, 0), 25.0).unwrap();
    let expired_one_time = OneTimeTarget {
        start_time: utc_datetime(2024, 1, 1, 0, 0, 0),
        end_time: utc_datetime(2024, 1, 8, 6, 40, 0),
        schedule: ScheduleItem::new(DayOfWeekMask::every_day(), 0, 24 * 60, 10.0),
    };
    let running_one_time = OneTimeTarget {
        start_time: utc_datetime(2024, 1, 8, 0, 0, 0),
        end_time: utc_datetime(2024, 1, 9, 0, 0, 0),
        schedule: ScheduleItem::new(DayOfWeekMask::every_day(), 0, 24 * 60, 12.0),
    };
    let mut store = store(ScheduleData {
        manual_override: Some(expired_manual),
        one_time_overrides: vec![expired_one_time, running_one_time.clone()],
        ..ScheduleData::default()
    });
    let changes = Arc::new(Mutex::new(0));
    let changes_clone = changes.clone();
    store.subscribe(move |_| *changes_clone.lock().unwrap() += 1);

    store.get_heating_targets(now, lookahead()).unwrap();

    let schedule = store.get_schedule();
    assert_eq!(schedule.manual_override, None);
    assert_eq!(schedule.one_time_overrides, vec![running_one_time]);
    assert_eq!(*changes.lock().unwrap(), 0, "Purging should not count as a schedule change");
}

#[test]
fn test_set_schedule_notifies_listeners() {
    let mut store = store(ScheduleData::default());
    let seen: Arc<Mutex<Vec<ScheduleChange>>> = Arc::new(Mutex::new(vec![]));
    let seen_clone = seen.clone();
    store.subscribe(move |change| seen_clone.lock().unwrap().push(change.clone()));

    let manual = ManualOverride::new(utc_datetime(2024, 1, 8, 8, 0, 0), utc_datetime(2024, 1, 8, 9, 0, 0), 22.0).unwrap();
    store.set_manual_override(Some(manual.clone())).unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].old, ScheduleData::default());
    assert_eq!(seen[0].new.manual_override, Some(manual));
    assert_eq!(seen[0].new.schedule, ScheduleData::default().schedule);
}

#[test]
fn test_invalid_schedule_is_rejected() {
    let mut store = store(ScheduleData::default());
    let notified = Arc::new(Mutex::new(false));
    let notified_clone = notified.clone();
    let id = store.subscribe(move |_| *notified_clone.lock().unwrap() = true);

    let invalid = ScheduleData {
        default_temperature: f32::INFINITY,
        ..ScheduleData::default()
    };
    assert_eq!(store.set_schedule(invalid), Err(ScheduleError::InvalidTemperature(f32::INFINITY)));
    assert_eq!(store.get_schedule(), ScheduleData::default());
    assert!(!*notified.lock().unwrap());

    assert!(store.unsubscribe(id));
    assert!(!store.unsubscribe(id));
}
