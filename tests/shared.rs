use std::thread;

use chrono::{Duration, TimeZone, Utc};
use hit_counter::{Clock, Config, Error, Eviction, ManualClock, SharedHitCounter};

#[test]
fn concurrent_records_are_not_lost() {
    let now = Utc.with_ymd_and_hms(2017, 1, 1, 0, 5, 1).unwrap();
    let counter = SharedHitCounter::new();

    thread::scope(|s| {
        for _ in 0..8 {
            s.spawn(|| {
                for _ in 0..1_000 {
                    counter.record_at(now);
                }
            });
        }
    });

    assert_eq!(counter.count_at(now.timestamp()).unwrap(), 8_000);
    assert_eq!(counter.count_until(now).unwrap(), 8_000);
}

#[test]
fn records_from_threads_across_seconds() {
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2017, 1, 1, 0, 5, 1).unwrap());
    let counter = SharedHitCounter::with_clock(clock.clone());

    thread::scope(|s| {
        for i in 0..4 {
            let counter = counter.clone();
            let clock = clock.clone();
            s.spawn(move || {
                counter.record_many_at(clock.now() - Duration::seconds(i), 10);
            });
        }
    });

    assert_eq!(counter.timestamp_count(), 4);
    assert_eq!(counter.count_recent().unwrap(), 40);
}

#[test]
fn matches_single_owner_window_semantics() {
    let now = Utc.with_ymd_and_hms(2017, 1, 1, 0, 5, 1).unwrap();
    let just_outside = now - Duration::minutes(5) - Duration::seconds(1);
    let counter = SharedHitCounter::new();
    counter
        .record_at(now)
        .record_at(now - Duration::minutes(5))
        .record_at(now + Duration::minutes(6))
        .record_at(now - Duration::seconds(1))
        .record_at(just_outside);

    assert_eq!(counter.count_until(now).unwrap(), 3);
    assert!(!counter.has_timestamp(&just_outside));
    assert_eq!(counter.counts().len(), 3);
}

#[test]
fn explicit_sweep_and_inverted_range() {
    let now = Utc.with_ymd_and_hms(2017, 1, 1, 0, 5, 1).unwrap();
    let config = Config::default().with_eviction(Eviction::Disabled);
    let counter = SharedHitCounter::with_config(config);
    counter
        .record_at(now)
        .record_at(now - Duration::hours(1))
        .record_at(now + Duration::hours(1));

    assert!(matches!(
        counter.count_between(now, now - Duration::seconds(1)),
        Err(Error::InvalidRange { .. })
    ));
    assert_eq!(counter.log_size(), 3);

    assert_eq!(counter.evict_outside(now, now).unwrap(), 2);
    assert_eq!(counter.timestamps(), vec![now.timestamp()]);

    counter.clear();
    assert!(counter.is_empty());
}
