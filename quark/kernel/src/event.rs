//! Dispatch triggers and the per-dispatch event record

use core::fmt;

use crate::buffer::LinkedBuffer;

/// Reason a task (or the idle/release callback) was invoked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Trigger {
    /// No trigger resolved yet
    #[default]
    None,
    /// Interval deadline reached
    TimeElapsed,
    /// Asynchronous event sent with `send_event`
    AsyncEvent,
    /// Event taken from the priority event queue
    QueueExtraction,
    /// Linked buffer has an element to auto-pop
    BufferPop,
    /// Linked buffer is full
    BufferFull,
    /// Linked buffer reached its count threshold
    BufferCount,
    /// Linked buffer is empty
    BufferEmpty,
    /// Nothing was ready; idle callback
    NoReadyTasks,
    /// Scheduler loop released
    SchedulingRelease,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Trigger::None => "None",
            Trigger::TimeElapsed => "TimeElapsed",
            Trigger::AsyncEvent => "AsyncEvent",
            Trigger::QueueExtraction => "QueueExtraction",
            Trigger::BufferPop => "BufferPop",
            Trigger::BufferFull => "BufferFull",
            Trigger::BufferCount => "BufferCount",
            Trigger::BufferEmpty => "BufferEmpty",
            Trigger::NoReadyTasks => "NoReadyTasks",
            Trigger::SchedulingRelease => "SchedulingRelease",
        };
        f.write_str(name)
    }
}

/// Trigger-scoped payload delivered with a dispatch
#[derive(Clone, Copy)]
pub enum EventData<'a, P> {
    /// Nothing attached
    None,
    /// Payload from `send_event` or the priority queue
    Payload(P),
    /// Front element of an auto-popped buffer, removed once the task returns
    Front(P),
    /// The linked buffer itself (full / count / empty triggers)
    Buffer(&'a dyn LinkedBuffer<P>),
}

impl<'a, P: Copy> EventData<'a, P> {
    /// Payload or buffer front element, if any
    pub fn value(&self) -> Option<P> {
        match self {
            EventData::Payload(value) | EventData::Front(value) => Some(*value),
            _ => None,
        }
    }

    /// Linked buffer, for buffer-state triggers
    pub fn buffer(&self) -> Option<&'a dyn LinkedBuffer<P>> {
        match self {
            EventData::Buffer(buffer) => Some(*buffer),
            _ => None,
        }
    }

    /// Check whether nothing is attached
    pub fn is_none(&self) -> bool {
        matches!(self, EventData::None)
    }
}

impl<P: fmt::Debug> fmt::Debug for EventData<'_, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventData::None => write!(f, "None"),
            EventData::Payload(value) => f.debug_tuple("Payload").field(value).finish(),
            EventData::Front(value) => f.debug_tuple("Front").field(value).finish(),
            EventData::Buffer(buffer) => write!(f, "Buffer(count: {})", buffer.count()),
        }
    }
}

/// Context handed to a task for exactly one dispatch
///
/// `event_data` only means something during the invocation that produced it.
#[derive(Clone, Copy, Debug)]
pub struct EventInfo<'a, P> {
    /// Why the task runs now
    pub trigger: Trigger,
    /// True until the task has completed its first dispatch
    pub first_call: bool,
    /// First time-elapsed dispatch after the iteration count was (re)armed
    pub first_iteration: bool,
    /// Time-elapsed dispatch that consumed the last iteration
    pub last_iteration: bool,
    /// Task-scoped data set at registration
    pub task_data: Option<P>,
    /// Trigger-scoped payload
    pub event_data: EventData<'a, P>,
}

impl<'a, P> EventInfo<'a, P> {
    pub(crate) fn new(trigger: Trigger) -> Self {
        Self {
            trigger,
            first_call: false,
            first_iteration: false,
            last_iteration: false,
            task_data: None,
            event_data: EventData::None,
        }
    }
}
