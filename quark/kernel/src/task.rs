//! Task entity, handles and registration config

use core::fmt;

use quark_core::{Duration, Priority, Tick, TimeBase};
use quark_fsm::StateMachine;

use crate::buffer::BufferLink;
use crate::{EventInfo, TaskFn, Trigger};

/// Stable handle to a task slot
///
/// The generation changes whenever the slot is freed, so a handle to a
/// deleted task never reaches the task that reuses its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TaskId {
    index: u16,
    generation: u16,
}

impl TaskId {
    pub(crate) const fn new(index: u16, generation: u16) -> Self {
        Self { index, generation }
    }

    /// Slot index
    pub const fn index(&self) -> usize {
        self.index as usize
    }

    /// Slot generation
    pub const fn generation(&self) -> u16 {
        self.generation
    }

    pub(crate) const fn slot(&self) -> u16 {
        self.index
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.index, self.generation)
    }
}

/// Scheduling state of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TaskState {
    /// Not ready this cycle, or finished its last dispatch
    #[default]
    Suspended,
    /// Selected for dispatch this cycle
    Ready,
    /// Currently executing
    Running,
    /// Passed over during the chain walk
    Waiting,
}

/// Time between two time-elapsed dispatches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interval {
    /// Due on every cycle
    #[default]
    Immediate,
    /// Due once the period has elapsed since the last window start
    Every(Duration),
}

/// Remaining time-elapsed dispatches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Iterations {
    /// Never runs out
    #[default]
    Forever,
    /// Runs this many more times, then disables the task
    Times(u32),
}

impl Iterations {
    /// Exactly one more dispatch
    pub const SINGLE_SHOT: Self = Iterations::Times(1);

    /// Check whether at least one dispatch is left
    pub const fn is_pending(&self) -> bool {
        match self {
            Iterations::Forever => true,
            Iterations::Times(n) => *n > 0,
        }
    }
}

/// What a dispatch executes
pub enum TaskBody<'a, P, const N: usize, const Q: usize> {
    /// Plain callback
    Plain(TaskFn<'a, P, N, Q>),
    /// Attached state machine, stepped once per dispatch
    StateMachine(StateMachine<EventInfo<'a, P>>),
}

impl<P, const N: usize, const Q: usize> fmt::Debug for TaskBody<'_, P, N, Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskBody::Plain(_) => f.write_str("Plain"),
            TaskBody::StateMachine(sm) => f.debug_tuple("StateMachine").field(sm).finish(),
        }
    }
}

/// Registration parameters
///
/// ```
/// use quark_core::{duration, Priority};
/// use quark_kernel::{Interval, Iterations, TaskConfig};
///
/// let config: TaskConfig<u32> = TaskConfig::new(Priority::new(3))
///     .interval(Interval::Every(duration!(50 ms)))
///     .iterations(Iterations::Times(10))
///     .data(7);
/// assert!(config.is_enabled());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct TaskConfig<P> {
    priority: Priority,
    interval: Interval,
    iterations: Iterations,
    enabled: bool,
    data: Option<P>,
}

impl<P> TaskConfig<P> {
    /// Enabled, immediate, never-ending task at `priority`
    pub const fn new(priority: Priority) -> Self {
        Self {
            priority,
            interval: Interval::Immediate,
            iterations: Iterations::Forever,
            enabled: true,
            data: None,
        }
    }

    /// Set the interval
    pub const fn interval(mut self, interval: Interval) -> Self {
        self.interval = interval;
        self
    }

    /// Set the iteration count
    pub const fn iterations(mut self, iterations: Iterations) -> Self {
        self.iterations = iterations;
        self
    }

    /// Set the initial enabled state
    pub const fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Attach task-scoped data
    pub fn data(mut self, data: P) -> Self {
        self.data = Some(data);
        self
    }

    /// Configured priority
    pub const fn priority(&self) -> Priority {
        self.priority
    }

    /// Check the initial enabled state
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// A registered task
pub struct Task<'a, P, const N: usize, const Q: usize> {
    pub(crate) body: TaskBody<'a, P, N, Q>,
    pub(crate) priority: Priority,
    pub(crate) interval: Interval,
    pub(crate) period: u32,
    pub(crate) remaining: Iterations,
    pub(crate) rearmed: bool,
    pub(crate) enabled: bool,
    pub(crate) state: TaskState,
    pub(crate) trigger: Trigger,
    pub(crate) clock_start: Tick,
    pub(crate) cycles: u32,
    pub(crate) has_run: bool,
    pub(crate) data: Option<P>,
    pub(crate) link: Option<BufferLink<'a, P>>,
}

impl<'a, P, const N: usize, const Q: usize> Task<'a, P, N, Q> {
    pub(crate) fn new(
        body: TaskBody<'a, P, N, Q>,
        config: TaskConfig<P>,
        time_base: &TimeBase,
        now: Tick,
    ) -> Self {
        let mut task = Self {
            body,
            priority: config.priority,
            interval: Interval::Immediate,
            period: 0,
            remaining: config.iterations,
            rearmed: true,
            enabled: config.enabled,
            state: TaskState::Suspended,
            trigger: Trigger::None,
            clock_start: now,
            cycles: 0,
            has_run: false,
            data: config.data,
            link: None,
        };
        task.set_interval(config.interval, time_base);
        task
    }

    pub(crate) fn set_interval(&mut self, interval: Interval, time_base: &TimeBase) {
        self.interval = interval;
        self.period = match interval {
            Interval::Immediate => 0,
            Interval::Every(period) => time_base.to_ticks(period),
        };
    }

    pub(crate) fn deadline_reached(&self, now: Tick) -> bool {
        match self.interval {
            Interval::Immediate => true,
            Interval::Every(_) => now.elapsed_since(self.clock_start) >= self.period,
        }
    }

    /// Priority
    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Interval between time-elapsed dispatches
    pub fn interval(&self) -> Interval {
        self.interval
    }

    /// Remaining time-elapsed dispatches
    pub fn iterations(&self) -> Iterations {
        self.remaining
    }

    /// Check if time-elapsed dispatches are enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Scheduling state
    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Trigger of the latest resolution
    pub fn trigger(&self) -> Trigger {
        self.trigger
    }

    /// Completed dispatches
    pub fn cycles(&self) -> u32 {
        self.cycles
    }

    /// Tick at which the current deadline window started
    pub fn clock_start(&self) -> Tick {
        self.clock_start
    }

    /// Task-scoped data
    pub fn data(&self) -> Option<&P> {
        self.data.as_ref()
    }

    /// Check if the task is driven by a state machine
    pub fn is_state_machine(&self) -> bool {
        matches!(self.body, TaskBody::StateMachine(_))
    }

    /// Check if an external buffer is linked
    pub fn has_buffer(&self) -> bool {
        self.link.is_some()
    }
}

impl<P, const N: usize, const Q: usize> fmt::Debug for Task<'_, P, N, Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("body", &self.body)
            .field("priority", &self.priority)
            .field("interval", &self.interval)
            .field("iterations", &self.remaining)
            .field("enabled", &self.enabled)
            .field("state", &self.state)
            .field("cycles", &self.cycles)
            .finish()
    }
}
