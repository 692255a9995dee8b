#![no_std]
#![forbid(unsafe_code)]

//! # Quark Core
//!
//! Core types shared by every layer of the Quark scheduler: the error type,
//! task priorities, the tick/duration time base and the polling software
//! timer used for deadline arithmetic.

use core::fmt;

pub mod priority;
pub mod time;
pub mod timer;

pub use priority::*;
pub use time::*;
pub use timer::*;

#[cfg(feature = "std")]
extern crate std;

/// Quark framework version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Result type used throughout the Quark framework
pub type Result<T> = core::result::Result<T, Error>;

/// Error types for Quark framework operations
///
/// A rejected operation never leaves partial state behind: the scheduler,
/// the queue and the timers are exactly as they were before the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Priority event queue is full
    QueueFull,
    /// Task handle is stale or was never issued by this scheduler
    UnknownTask,
    /// Every task slot is in use
    TaskLimit,
    /// Task is not linked into the priority chain
    NotLinked,
    /// Timer duration is shorter than two scheduler ticks
    TimerResolution,
    /// Argument outside its valid range
    InvalidArgument,
    /// Task is not driven by a state machine
    NotStateMachine,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::QueueFull => write!(f, "Priority event queue is full"),
            Error::UnknownTask => write!(f, "Unknown or stale task handle"),
            Error::TaskLimit => write!(f, "No free task slot"),
            Error::NotLinked => write!(f, "Task is not in the priority chain"),
            Error::TimerResolution => write!(f, "Timer duration below tick resolution"),
            Error::InvalidArgument => write!(f, "Invalid argument"),
            Error::NotStateMachine => write!(f, "Task has no state machine attached"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Error::QueueFull => defmt::write!(fmt, "QueueFull"),
            Error::UnknownTask => defmt::write!(fmt, "UnknownTask"),
            Error::TaskLimit => defmt::write!(fmt, "TaskLimit"),
            Error::NotLinked => defmt::write!(fmt, "NotLinked"),
            Error::TimerResolution => defmt::write!(fmt, "TimerResolution"),
            Error::InvalidArgument => defmt::write!(fmt, "InvalidArgument"),
            Error::NotStateMachine => defmt::write!(fmt, "NotStateMachine"),
        }
    }
}
