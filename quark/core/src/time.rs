//! Time management types and utilities

use core::fmt;
use crate::{Error, Result};

/// System tick counter value
///
/// The counter is fed once per timer interrupt and wraps on overflow, so
/// every comparison goes through [`Tick::elapsed_since`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Tick(u32);

impl Tick {
    /// Zero tick
    pub const ZERO: Self = Self(0);

    /// Create a tick value from a raw count
    pub const fn new(ticks: u32) -> Self {
        Self(ticks)
    }

    /// Get the raw tick value
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Advance the counter by one tick
    pub fn increment(&mut self) {
        self.0 = self.0.wrapping_add(1);
    }

    /// Advance the counter by `ticks`
    pub fn advance(&mut self, ticks: u32) {
        self.0 = self.0.wrapping_add(ticks);
    }

    /// Ticks elapsed since an earlier tick (handles wraparound)
    pub const fn elapsed_since(self, earlier: Tick) -> u32 {
        self.0.wrapping_sub(earlier.0)
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tick:{}", self.0)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Tick {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "tick:{}", self.0);
    }
}

/// Wall-clock duration in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Duration {
    millis: u32,
}

impl Duration {
    /// Zero duration
    pub const ZERO: Self = Self { millis: 0 };

    /// Maximum duration
    pub const MAX: Self = Self { millis: u32::MAX };

    /// Create duration from milliseconds
    pub const fn from_millis(millis: u32) -> Self {
        Self { millis }
    }

    /// Create duration from seconds
    pub const fn from_secs(secs: u32) -> Self {
        Self { millis: secs.saturating_mul(1000) }
    }

    /// Convert to milliseconds
    pub const fn as_millis(&self) -> u32 {
        self.millis
    }

    /// Convert to whole seconds
    pub const fn as_secs(&self) -> u32 {
        self.millis / 1000
    }

    /// Check if duration is zero
    pub const fn is_zero(&self) -> bool {
        self.millis == 0
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.millis)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Duration {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "{}ms", self.millis);
    }
}

/// Tick period of the scheduler, used to convert durations into ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBase {
    tick: Duration,
}

impl TimeBase {
    /// One millisecond per tick
    pub const MILLIS: Self = Self { tick: Duration::from_millis(1) };

    /// Create a time base from the tick interrupt period
    ///
    /// A zero period cannot measure anything and is rejected.
    pub const fn new(tick: Duration) -> Result<Self> {
        if tick.is_zero() {
            Err(Error::InvalidArgument)
        } else {
            Ok(Self { tick })
        }
    }

    /// Period of one tick
    pub const fn tick(&self) -> Duration {
        self.tick
    }

    /// Convert a duration into whole ticks (truncating)
    pub const fn to_ticks(&self, duration: Duration) -> u32 {
        duration.as_millis() / self.tick.as_millis()
    }

    /// Convert a tick count back into a duration (saturating)
    pub const fn to_duration(&self, ticks: u32) -> Duration {
        Duration::from_millis(ticks.saturating_mul(self.tick.as_millis()))
    }

    /// Check whether `duration` spans at least two ticks
    ///
    /// Anything shorter cannot be measured reliably by a polling timer.
    pub const fn resolves(&self, duration: Duration) -> bool {
        duration.as_millis() / 2 >= self.tick.as_millis()
    }
}

impl Default for TimeBase {
    fn default() -> Self {
        Self::MILLIS
    }
}

/// Source of the current tick and the tick period
pub trait Clock {
    /// Current value of the tick counter
    fn now(&self) -> Tick;

    /// Tick period used to convert durations
    fn time_base(&self) -> TimeBase;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Tick {
        (**self).now()
    }

    fn time_base(&self) -> TimeBase {
        (**self).time_base()
    }
}

/// Macro to create compile-time durations
#[macro_export]
macro_rules! duration {
    ($value:literal ms) => {
        $crate::Duration::from_millis($value)
    };
    ($value:literal s) => {
        $crate::Duration::from_secs($value)
    };
}
