//! Software timer tests for quark-core

use std::cell::Cell;

use quark_core::{duration, Clock, SoftTimer, Tick, TimeBase};

struct TestClock {
    ticks: Cell<u32>,
}

impl TestClock {
    fn starting_at(ticks: u32) -> Self {
        Self { ticks: Cell::new(ticks) }
    }

    fn tick(&self) {
        self.ticks.set(self.ticks.get().wrapping_add(1));
    }
}

impl Clock for TestClock {
    fn now(&self) -> Tick {
        Tick::new(self.ticks.get())
    }

    fn time_base(&self) -> TimeBase {
        TimeBase::MILLIS
    }
}

#[test]
fn test_expired_only_once_elapsed_reaches_duration() {
    let clock = TestClock::starting_at(100);
    let mut timer = SoftTimer::new();
    timer.set(&clock, duration!(5 ms)).unwrap();

    for _ in 0..5 {
        assert!(timer.elapsed(&clock) < 5);
        assert!(!timer.expired(&clock));
        clock.tick();
    }
    assert_eq!(timer.elapsed(&clock), 5);
    assert!(timer.expired(&clock));

    clock.tick();
    assert!(timer.expired(&clock));
}

#[test]
fn test_disarmed_timer_never_expires() {
    let clock = TestClock::starting_at(0);
    let mut timer = SoftTimer::new();
    timer.set(&clock, duration!(2 ms)).unwrap();
    timer.disarm();
    for _ in 0..10 {
        clock.tick();
    }
    assert!(!timer.is_armed());
    assert!(!timer.expired(&clock));
    assert_eq!(timer.elapsed(&clock), 0);
}

#[test]
fn test_free_run_arms_then_fires_once() {
    let clock = TestClock::starting_at(7);
    let mut timer = SoftTimer::new();

    // Disarmed: arms and reports false.
    assert!(!timer.free_run(&clock, duration!(4 ms)));
    assert!(timer.is_armed());

    // Before the duration passes, still false; the new duration is ignored.
    for _ in 0..3 {
        clock.tick();
        assert!(!timer.free_run(&clock, duration!(100 ms)));
    }

    clock.tick();
    assert!(timer.free_run(&clock, duration!(100 ms)));
    assert!(!timer.is_armed());

    // Next call re-arms instead of firing again.
    assert!(!timer.free_run(&clock, duration!(4 ms)));
    assert!(timer.is_armed());
}

#[test]
fn test_free_run_below_resolution_stays_disarmed() {
    let clock = TestClock::starting_at(0);
    let mut timer = SoftTimer::new();
    assert!(!timer.free_run(&clock, duration!(1 ms)));
    assert!(!timer.is_armed());
}

#[test]
fn test_timer_survives_tick_wraparound() {
    let clock = TestClock::starting_at(u32::MAX - 1);
    let mut timer = SoftTimer::new();
    timer.set(&clock, duration!(3 ms)).unwrap();
    clock.tick();
    clock.tick();
    assert!(!timer.expired(&clock));
    clock.tick();
    assert!(timer.expired(&clock));
}
