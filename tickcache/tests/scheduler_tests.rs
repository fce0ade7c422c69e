//! Tests for window-deduplicated scheduling

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tickcache::{CacheSettings, Scheduler};

const TZ: Tz = chrono_tz::America::New_York;

/// 2026-08-05 is a Wednesday
fn wednesday(hh: u32, mm: u32) -> DateTime<Utc> {
    TZ.with_ymd_and_hms(2026, 8, 5, hh, mm, 0)
        .unwrap()
        .with_timezone(&Utc)
}

#[tokio::test(start_paused = true)]
async fn identical_windows_dispatch_once() {
    let scheduler = Scheduler::new(&CacheSettings::default());
    let runs = Arc::new(AtomicU32::new(0));
    let task_runs = runs.clone();
    scheduler.register("dashboard", move || {
        let runs = task_runs.clone();
        async move {
            runs.fetch_add(1, Ordering::SeqCst);
        }
    });

    // Five ticks: the first three share a window, the fourth enters a new
    // one, the fifth repeats it. Tasks fire exactly twice.
    let dispatched: Vec<bool> = [
        wednesday(10, 1),
        wednesday(10, 3),
        wednesday(10, 29),
        wednesday(10, 31),
        wednesday(10, 45),
    ]
    .into_iter()
    .map(|now| scheduler.observe(now))
    .collect();

    assert_eq!(dispatched, vec![true, false, false, true, false]);

    tokio::task::yield_now().await;
    tokio::task::yield_now().await;
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn ticks_outside_active_hours_are_noops() {
    let scheduler = Scheduler::new(&CacheSettings::default());
    let runs = Arc::new(AtomicU32::new(0));
    let task_runs = runs.clone();
    scheduler.register("dashboard", move || {
        let runs = task_runs.clone();
        async move {
            runs.fetch_add(1, Ordering::SeqCst);
        }
    });

    assert!(!scheduler.observe(wednesday(7, 0)));
    assert!(!scheduler.observe(wednesday(18, 0)));

    // Saturday 2026-08-08.
    let saturday = TZ
        .with_ymd_and_hms(2026, 8, 8, 10, 0, 0)
        .unwrap()
        .with_timezone(&Utc);
    assert!(!scheduler.observe(saturday));

    tokio::task::yield_now().await;
    assert_eq!(runs.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn task_families_run_independently() {
    let scheduler = Scheduler::new(&CacheSettings::default());
    let fast_runs = Arc::new(AtomicU32::new(0));
    let slow_runs = Arc::new(AtomicU32::new(0));

    let counter = fast_runs.clone();
    scheduler.register("dashboard", move || {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });

    // The slow family never finishes; it must not block the fast one.
    let counter = slow_runs.clone();
    scheduler.register("universe", move || {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::pending::<()>().await;
        }
    });

    scheduler.observe(wednesday(10, 1));
    tokio::task::yield_now().await;
    tokio::task::yield_now().await;

    assert_eq!(fast_runs.load(Ordering::SeqCst), 1);
    assert_eq!(slow_runs.load(Ordering::SeqCst), 1);

    // Next window: the hung "universe" run is skipped, "dashboard" fires.
    scheduler.observe(wednesday(10, 31));
    tokio::task::yield_now().await;
    tokio::task::yield_now().await;

    assert_eq!(fast_runs.load(Ordering::SeqCst), 2);
    assert_eq!(slow_runs.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn finished_family_reruns_in_the_next_window() {
    let scheduler = Scheduler::new(&CacheSettings::default());
    let runs = Arc::new(AtomicU32::new(0));
    let counter = runs.clone();
    scheduler.register("breadth", move || {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });

    scheduler.observe(wednesday(11, 0));
    tokio::task::yield_now().await;
    scheduler.observe(wednesday(11, 30));
    tokio::task::yield_now().await;

    assert_eq!(runs.load(Ordering::SeqCst), 2);
}
