//! Tests for the shutdown flag

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use linelog::shutdown::ShutdownFlag;

#[test]
fn test_starts_untriggered() {
    let flag = ShutdownFlag::new();
    assert!(!flag.is_triggered());
}

#[test]
fn test_first_trigger_wins() {
    let flag = ShutdownFlag::new();

    assert!(flag.trigger());
    assert!(!flag.trigger());
    assert!(!flag.trigger());
    assert!(flag.is_triggered());
}

#[test]
fn test_only_one_concurrent_trigger_wins() {
    let flag = Arc::new(ShutdownFlag::new());

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let flag = Arc::clone(&flag);
            thread::spawn(move || flag.trigger())
        })
        .collect();

    let winners = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|won| *won)
        .count();
    assert_eq!(winners, 1);
}

#[test]
fn test_wait_times_out_when_not_triggered() {
    let flag = ShutdownFlag::new();

    let start = Instant::now();
    assert!(!flag.wait_timeout(Duration::from_millis(50)));
    assert!(start.elapsed() >= Duration::from_millis(50));
}

#[test]
fn test_wait_returns_immediately_when_already_triggered() {
    let flag = ShutdownFlag::new();
    flag.trigger();

    let start = Instant::now();
    assert!(flag.wait_timeout(Duration::from_secs(30)));
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[test]
fn test_trigger_wakes_sleeper_early() {
    let flag = Arc::new(ShutdownFlag::new());

    let sleeper = {
        let flag = Arc::clone(&flag);
        thread::spawn(move || {
            let start = Instant::now();
            let triggered = flag.wait_timeout(Duration::from_secs(30));
            (triggered, start.elapsed())
        })
    };

    thread::sleep(Duration::from_millis(50));
    flag.trigger();

    let (triggered, elapsed) = sleeper.join().unwrap();
    assert!(triggered);
    assert!(elapsed < Duration::from_secs(5));
}

#[test]
fn test_unbounded_wait_still_wakes_on_trigger() {
    let flag = Arc::new(ShutdownFlag::new());

    let sleeper = {
        let flag = Arc::clone(&flag);
        thread::spawn(move || flag.wait_timeout(Duration::MAX))
    };

    thread::sleep(Duration::from_millis(50));
    flag.trigger();

    assert!(sleeper.join().unwrap());
}
