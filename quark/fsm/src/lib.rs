#![no_std]
#![forbid(unsafe_code)]

//! # Quark FSM Engine
//!
//! Flat finite state machines that advance by exactly one state per call to
//! [`StateMachine::run`]. A state is a plain function returning a [`Status`];
//! transitions happen when a state rewrites the machine's next state. Four
//! optional hooks wrap every step:
//! - before-any, invoked unconditionally before the state runs
//! - on-success / on-failure / on-unexpected, selected by the returned status

use core::fmt;

pub mod attribute;

pub use attribute::*;

#[cfg(test)]
extern crate std;


/// State function: runs one step and reports how it went
pub type StateFn<D> = fn(&mut StateMachine<D>) -> Status;

/// Hook function invoked around state execution
pub type HookFn<D> = fn(&mut StateMachine<D>);

/// Exit status of a state function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Status {
    /// State finished its work for this step
    #[default]
    Success,
    /// State failed, or the machine has no next state
    Failure,
    /// Application-defined outcome
    Unexpected(i16),
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Success => write!(f, "Success"),
            Status::Failure => write!(f, "Failure"),
            Status::Unexpected(code) => write!(f, "Unexpected({})", code),
        }
    }
}

/// Compare two states by function identity
pub fn same_state<D>(a: StateFn<D>, b: StateFn<D>) -> bool {
    a as usize == b as usize
}

fn same_slot<D>(a: Option<StateFn<D>>, b: Option<StateFn<D>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => same_state(a, b),
        (None, None) => true,
        _ => false,
    }
}

/// Single-step finite state machine carrying per-step data `D`
pub struct StateMachine<D> {
    next_state: Option<StateFn<D>>,
    last_state: Option<StateFn<D>>,
    previous_state: Option<StateFn<D>>,
    previous_status: Status,
    first_entry: bool,
    data: Option<D>,
    hooks: Hooks<D>,
}

impl<D> StateMachine<D> {
    /// Create a machine that will run `initial` on its first step
    pub const fn new(initial: StateFn<D>, hooks: Hooks<D>) -> Self {
        Self {
            next_state: Some(initial),
            last_state: None,
            previous_state: None,
            previous_status: Status::Success,
            first_entry: false,
            data: None,
            hooks,
        }
    }

    /// Advance the machine by one step
    ///
    /// Stores `data`, runs the before-any hook, runs the next state (or
    /// reports [`Status::Failure`] when there is none) and finally runs the
    /// hook matching the resulting status. `data` is dropped when the step
    /// ends.
    pub fn run(&mut self, data: D) {
        self.data = Some(data);

        if let Some(before) = self.hooks.before_any {
            before(self);
        }

        match self.next_state {
            Some(state) => {
                self.first_entry = !same_slot(self.last_state, Some(state));
                if self.first_entry {
                    self.previous_state = self.last_state;
                }
                self.previous_status = state(self);
                self.last_state = Some(state);
            }
            None => self.previous_status = Status::Failure,
        }

        let hook = match self.previous_status {
            Status::Success => self.hooks.on_success,
            Status::Failure => self.hooks.on_failure,
            Status::Unexpected(_) => self.hooks.on_unexpected,
        };
        if let Some(hook) = hook {
            hook(self);
        }
        self.data = None;
    }

    /// Data passed to the step in progress; `None` between steps
    pub fn data(&self) -> Option<&D> {
        self.data.as_ref()
    }

    /// State that will run on the next step
    pub fn next_state(&self) -> Option<StateFn<D>> {
        self.next_state
    }

    /// Select the state for the next step (itself to stay)
    pub fn set_next_state(&mut self, state: StateFn<D>) {
        self.next_state = Some(state);
    }

    /// Clear the next state; following steps report failure
    pub fn halt(&mut self) {
        self.next_state = None;
    }

    /// Last state executed
    pub fn last_state(&self) -> Option<StateFn<D>> {
        self.last_state
    }

    /// State executed before the current one was first entered
    pub fn previous_state(&self) -> Option<StateFn<D>> {
        self.previous_state
    }

    /// Status returned by the last executed state
    pub fn previous_status(&self) -> Status {
        self.previous_status
    }

    /// True while the running state executes for the first time in a row
    pub fn is_first_entry(&self) -> bool {
        self.first_entry
    }

    /// Check whether `state` was the last one executed
    pub fn is_in(&self, state: StateFn<D>) -> bool {
        same_slot(self.last_state, Some(state))
    }

    /// Installed hooks
    pub fn hooks(&self) -> &Hooks<D> {
        &self.hooks
    }
}

impl<D> fmt::Debug for StateMachine<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateMachine")
            .field("halted", &self.next_state.is_none())
            .field("previous_status", &self.previous_status)
            .field("first_entry", &self.first_entry)
            .finish()
    }
}
