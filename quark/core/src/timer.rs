//! Polling software timers
//!
//! A [`SoftTimer`] is pure arithmetic over the scheduler tick counter. It owns
//! no callback and never blocks: callers poll it from task bodies.

use core::convert::Infallible;

use crate::{Clock, Duration, Error, Result, Tick};

/// Software timer measured in scheduler ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SoftTimer {
    duration: u32,
    start: Tick,
    armed: bool,
}

impl SoftTimer {
    /// Create a disarmed timer
    pub const fn new() -> Self {
        Self {
            duration: 0,
            start: Tick::ZERO,
            armed: false,
        }
    }

    /// Arm the timer to expire `duration` from now
    ///
    /// Durations shorter than two ticks are rejected with
    /// [`Error::TimerResolution`] and leave the timer untouched.
    pub fn set<C: Clock>(&mut self, clock: &C, duration: Duration) -> Result<()> {
        let base = clock.time_base();
        if !base.resolves(duration) {
            return Err(Error::TimerResolution);
        }
        self.duration = base.to_ticks(duration);
        self.start = clock.now();
        self.armed = true;
        Ok(())
    }

    /// Check for expiration; a disarmed timer never expires
    pub fn expired<C: Clock>(&self, clock: &C) -> bool {
        self.armed && self.elapsed(clock) >= self.duration
    }

    /// Ticks elapsed since the timer was armed, zero when disarmed
    pub fn elapsed<C: Clock>(&self, clock: &C) -> u32 {
        if self.armed {
            clock.now().elapsed_since(self.start)
        } else {
            0
        }
    }

    /// Ticks left before expiration
    ///
    /// Reports the full duration when the timer is disarmed or has overrun.
    pub fn remaining<C: Clock>(&self, clock: &C) -> u32 {
        let elapsed = self.elapsed(clock);
        if self.duration == 0 || elapsed > self.duration {
            self.duration
        } else {
            self.duration - elapsed
        }
    }

    /// Disarm the timer
    pub fn disarm(&mut self) {
        self.armed = false;
        self.start = Tick::ZERO;
    }

    /// Check-and-reload in one call
    ///
    /// When armed, `duration` is ignored: returns true exactly once on
    /// expiry and leaves the timer disarmed. When disarmed, arms the timer
    /// with `duration` and returns false.
    pub fn free_run<C: Clock>(&mut self, clock: &C, duration: Duration) -> bool {
        if self.armed {
            if self.expired(clock) {
                self.disarm();
                return true;
            }
            return false;
        }
        // A duration below resolution simply leaves the timer disarmed.
        let _ = self.set(clock, duration);
        false
    }

    /// Armed/disarmed status
    pub const fn is_armed(&self) -> bool {
        self.armed
    }

    /// Duration in ticks the timer was armed with
    pub const fn duration_ticks(&self) -> u32 {
        self.duration
    }

    /// Replace the duration without re-arming or moving the start tick
    pub fn change_duration<C: Clock>(&mut self, clock: &C, duration: Duration) {
        self.duration = clock.time_base().to_ticks(duration);
    }

    /// Non-blocking wait for expiration
    pub fn wait<C: Clock>(&self, clock: &C) -> nb::Result<(), Infallible> {
        if self.expired(clock) {
            Ok(())
        } else {
            Err(nb::Error::WouldBlock)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TimeBase;
    use core::cell::Cell;

    struct FakeClock {
        now: Cell<u32>,
        base: TimeBase,
    }

    impl FakeClock {
        fn new(tick_ms: u32) -> Self {
            Self {
                now: Cell::new(0),
                base: TimeBase::new(Duration::from_millis(tick_ms)).unwrap(),
            }
        }

        fn advance(&self, ticks: u32) {
            self.now.set(self.now.get().wrapping_add(ticks));
        }
    }

    impl Clock for FakeClock {
        fn now(&self) -> Tick {
            Tick::new(self.now.get())
        }

        fn time_base(&self) -> TimeBase {
            self.base
        }
    }

    #[test]
    fn test_set_rejects_sub_resolution() {
        let clock = FakeClock::new(10);
        let mut timer = SoftTimer::new();
        assert_eq!(timer.set(&clock, Duration::from_millis(15)), Err(Error::TimerResolution));
        assert!(!timer.is_armed());
        assert!(timer.set(&clock, Duration::from_millis(20)).is_ok());
        assert_eq!(timer.duration_ticks(), 2);
    }

    #[test]
    fn test_elapsed_and_remaining() {
        let clock = FakeClock::new(1);
        let mut timer = SoftTimer::new();
        assert_eq!(timer.elapsed(&clock), 0);

        timer.set(&clock, Duration::from_millis(10)).unwrap();
        clock.advance(4);
        assert_eq!(timer.elapsed(&clock), 4);
        assert_eq!(timer.remaining(&clock), 6);

        clock.advance(20);
        assert_eq!(timer.remaining(&clock), 10);
    }

    #[test]
    fn test_wait_polls_until_expiry() {
        let clock = FakeClock::new(1);
        let mut timer = SoftTimer::new();
        assert_eq!(timer.wait(&clock), Err(nb::Error::WouldBlock));

        timer.set(&clock, Duration::from_millis(3)).unwrap();
        clock.advance(2);
        assert_eq!(timer.wait(&clock), Err(nb::Error::WouldBlock));
        clock.advance(1);
        assert_eq!(timer.wait(&clock), Ok(()));
    }

    #[test]
    fn test_change_duration_keeps_start() {
        let clock = FakeClock::new(1);
        let mut timer = SoftTimer::new();
        timer.set(&clock, Duration::from_millis(10)).unwrap();
        clock.advance(5);
        timer.change_duration(&clock, Duration::from_millis(5));
        assert!(timer.expired(&clock));
    }
}
