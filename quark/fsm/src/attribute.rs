//! Hooks and runtime reconfiguration of a state machine

use crate::{HookFn, StateFn, StateMachine, Status};

/// Optional hooks run around every step
pub struct Hooks<D> {
    /// Runs before the state on every step
    pub before_any: Option<HookFn<D>>,
    /// Runs after a state returns [`Status::Success`]
    pub on_success: Option<HookFn<D>>,
    /// Runs after a state returns [`Status::Failure`] or the machine is halted
    pub on_failure: Option<HookFn<D>>,
    /// Runs after a state returns [`Status::Unexpected`]
    pub on_unexpected: Option<HookFn<D>>,
}

impl<D> Hooks<D> {
    /// No hooks installed
    pub const fn none() -> Self {
        Self {
            before_any: None,
            on_success: None,
            on_failure: None,
            on_unexpected: None,
        }
    }
}

impl<D> Default for Hooks<D> {
    fn default() -> Self {
        Self::none()
    }
}

impl<D> Clone for Hooks<D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<D> Copy for Hooks<D> {}

/// Runtime reconfiguration of a [`StateMachine`]
pub enum Attribute<D> {
    /// Restart from the given state with history cleared
    Restart(StateFn<D>),
    /// Forget the last/previous state so the next step counts as a first entry
    ClearFirstEntry,
    /// Replace the before-any hook
    BeforeAny(Option<HookFn<D>>),
    /// Replace the success hook
    OnSuccess(Option<HookFn<D>>),
    /// Replace the failure hook
    OnFailure(Option<HookFn<D>>),
    /// Replace the unexpected-status hook
    OnUnexpected(Option<HookFn<D>>),
}

impl<D> StateMachine<D> {
    /// Apply a runtime attribute change
    pub fn set_attribute(&mut self, attribute: Attribute<D>) {
        match attribute {
            Attribute::Restart(state) => {
                self.next_state = Some(state);
                self.previous_state = None;
                self.last_state = None;
                self.first_entry = false;
                self.previous_status = Status::Success;
            }
            Attribute::ClearFirstEntry => {
                self.previous_state = None;
                self.last_state = None;
            }
            Attribute::BeforeAny(hook) => self.hooks.before_any = hook,
            Attribute::OnSuccess(hook) => self.hooks.on_success = hook,
            Attribute::OnFailure(hook) => self.hooks.on_failure = hook,
            Attribute::OnUnexpected(hook) => self.hooks.on_unexpected = hook,
        }
    }

    /// Restart the machine from `state`
    pub fn restart(&mut self, state: StateFn<D>) {
        self.set_attribute(Attribute::Restart(state));
    }
}
