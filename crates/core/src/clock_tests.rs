// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;

#[test]
fn system_clock_returns_increasing_time() {
    let clock = SystemClock;
    let t1 = clock.now();
    std::thread::sleep(Duration::from_millis(1));
    let t2 = clock.now();
    assert!(t2 > t1);
}

#[test]
fn fake_clock_can_be_advanced() {
    let clock = FakeClock::new();
    let t1 = clock.now();
    let u1 = clock.utc_now();
    clock.advance(Duration::from_secs(60));
    assert!(clock.now().duration_since(t1) >= Duration::from_secs(60));
    assert_eq!((clock.utc_now() - u1).num_seconds(), 60);
}

#[test]
fn fake_clock_is_cloneable_and_shared() {
    let clock1 = FakeClock::new();
    let clock2 = clock1.clone();
    let u1 = clock1.utc_now();
    clock2.advance(Duration::from_secs(30));
    assert_eq!((clock1.utc_now() - u1).num_seconds(), 30);
}

#[test]
fn fake_clock_set_utc() {
    let clock = FakeClock::new();
    let dt = chrono::Utc::now();
    clock.set_utc(dt);
    assert_eq!(clock.utc_now(), dt);
}
