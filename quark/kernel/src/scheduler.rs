//! Scheduler context: task slots, registration and runtime control
//!
//! A [`Scheduler`] owns every task in a fixed arena of `N` slots and the
//! priority chain threading through them. It borrows the interrupt-shared
//! [`Signals`] for the tick counter, the event queue and release requests.
//! The core loop (`run` and `cycle`) lives in the dispatch module.

use heapless::Vec;
use log::{debug, warn};

use quark_core::{Clock, Error, Priority, Result, Tick, TimeBase};
use quark_fsm::{Hooks, StateFn, StateMachine};

use crate::buffer::{BufferLink, LinkMode, LinkedBuffer};
use crate::chain::{Chain, ChainIter};
use crate::{
    EventInfo, Interval, Iterations, Signals, Task, TaskBody, TaskConfig, TaskId, TaskState, Trigger,
};

/// Task callback
///
/// Receives the scheduler itself, so a task may reconfigure any task
/// (including removing itself) while it runs. The idle and release
/// callbacks share this signature.
pub type TaskFn<'a, P, const N: usize, const Q: usize> =
    fn(&mut Scheduler<'a, P, N, Q>, &EventInfo<'a, P>);

/// State function of a task-attached state machine
pub type TaskStateFn<'a, P> = StateFn<EventInfo<'a, P>>;

pub(crate) struct Slot<'a, P, const N: usize, const Q: usize> {
    pub(crate) generation: u16,
    pub(crate) task: Option<Task<'a, P, N, Q>>,
}

/// Cooperative priority scheduler with `N` task slots and a queue of `Q`
pub struct Scheduler<'a, P, const N: usize, const Q: usize> {
    pub(crate) signals: &'a Signals<P, N, Q>,
    pub(crate) time_base: TimeBase,
    pub(crate) slots: Vec<Slot<'a, P, N, Q>, N>,
    pub(crate) chain: Chain<N>,
    pub(crate) cursor: Option<u16>,
    pub(crate) sorted: bool,
    pub(crate) current: Option<TaskId>,
    pub(crate) idle: Option<TaskFn<'a, P, N, Q>>,
    pub(crate) idle_called: bool,
    pub(crate) release: Option<TaskFn<'a, P, N, Q>>,
    pub(crate) release_called: bool,
}

impl<'a, P: Copy, const N: usize, const Q: usize> Scheduler<'a, P, N, Q> {
    /// Create a scheduler ticking at `time_base`
    ///
    /// `idle` runs whenever a cycle finds nothing to dispatch.
    pub fn new(
        signals: &'a Signals<P, N, Q>,
        time_base: TimeBase,
        idle: Option<TaskFn<'a, P, N, Q>>,
    ) -> Self {
        Self {
            signals,
            time_base,
            slots: Vec::new(),
            chain: Chain::new(),
            cursor: None,
            sorted: true,
            current: None,
            idle,
            idle_called: false,
            release: None,
            release_called: false,
        }
    }

    /// Register a periodic or count-limited task
    pub fn add_task(&mut self, callback: TaskFn<'a, P, N, Q>, config: TaskConfig<P>) -> Result<TaskId> {
        self.spawn(TaskBody::Plain(callback), config)
    }

    /// Register an event-only task
    ///
    /// The task starts disabled with an immediate single-shot interval, so it
    /// only runs on async, queued or buffer events until enabled.
    pub fn add_event_task(
        &mut self,
        callback: TaskFn<'a, P, N, Q>,
        priority: Priority,
        data: Option<P>,
    ) -> Result<TaskId> {
        let mut config = TaskConfig::new(priority)
            .iterations(Iterations::SINGLE_SHOT)
            .enabled(false);
        if let Some(data) = data {
            config = config.data(data);
        }
        self.spawn(TaskBody::Plain(callback), config)
    }

    /// Register a task driven by a state machine starting at `initial`
    ///
    /// State machine tasks always repeat: the iteration count of `config` is
    /// replaced by [`Iterations::Forever`].
    pub fn add_state_machine_task(
        &mut self,
        config: TaskConfig<P>,
        initial: TaskStateFn<'a, P>,
        hooks: Hooks<EventInfo<'a, P>>,
    ) -> Result<TaskId> {
        let config = config.iterations(Iterations::Forever);
        self.spawn(TaskBody::StateMachine(StateMachine::new(initial, hooks)), config)
    }

    /// Register again under an existing handle
    ///
    /// The previous registration is dropped entirely: the task leaves the
    /// chain, loses its buffer link and any pending async event, and is
    /// re-inserted with fresh bookkeeping.
    pub fn register(&mut self, id: TaskId, body: TaskBody<'a, P, N, Q>, config: TaskConfig<P>) -> Result<()> {
        self.task(id)?;
        self.place(id, body, config);
        Ok(())
    }

    /// Unlink a task from the chain
    ///
    /// The handle stays valid; the task keeps its configuration, still takes
    /// queued events and can be registered again. Fails with
    /// [`Error::NotLinked`] if it was not in the chain.
    pub fn remove_task(&mut self, id: TaskId) -> Result<()> {
        self.task(id)?;
        if !self.chain.remove(id.slot()) {
            return Err(Error::NotLinked);
        }
        debug!("task {} removed from chain", id);
        Ok(())
    }

    /// Remove a task and free its slot
    ///
    /// The handle becomes stale, its pending async event is dropped and any
    /// queued event for it is discarded at extraction.
    pub fn delete_task(&mut self, id: TaskId) -> Result<()> {
        self.task(id)?;
        self.chain.remove(id.slot());
        self.signals.unbind(id.index());
        let slot = &mut self.slots[id.index()];
        slot.task = None;
        slot.generation = slot.generation.wrapping_add(1);
        debug!("task {} deleted", id);
        Ok(())
    }

    /// Set the idle callback
    pub fn set_idle(&mut self, idle: Option<TaskFn<'a, P, N, Q>>) {
        self.idle = idle;
    }

    /// Set the callback run when the loop is released
    pub fn set_release_callback(&mut self, callback: Option<TaskFn<'a, P, N, Q>>) {
        self.release = callback;
    }

    /// Change the interval; takes effect from the current window start
    pub fn set_interval(&mut self, id: TaskId, interval: Interval) -> Result<()> {
        let time_base = self.time_base;
        self.task_mut(id)?.set_interval(interval, &time_base);
        Ok(())
    }

    /// Change the iteration count and re-arm the first-iteration flag
    pub fn set_iterations(&mut self, id: TaskId, iterations: Iterations) -> Result<()> {
        let task = self.task_mut(id)?;
        task.remaining = iterations;
        task.rearmed = true;
        Ok(())
    }

    /// Change the priority; the chain is rebuilt before the next scan
    pub fn set_priority(&mut self, id: TaskId, priority: Priority) -> Result<()> {
        self.task_mut(id)?.priority = priority;
        self.sorted = false;
        Ok(())
    }

    /// Replace the body with a plain callback
    pub fn set_callback(&mut self, id: TaskId, callback: TaskFn<'a, P, N, Q>) -> Result<()> {
        self.task_mut(id)?.body = TaskBody::Plain(callback);
        Ok(())
    }

    /// Enable or disable time-elapsed dispatches
    ///
    /// Enabling a disabled task restarts its deadline window; enabling an
    /// enabled task changes nothing.
    pub fn set_enabled(&mut self, id: TaskId, enabled: bool) -> Result<()> {
        let now = self.now();
        let task = self.task_mut(id)?;
        if enabled && task.enabled {
            return Ok(());
        }
        task.enabled = enabled;
        task.clock_start = now;
        Ok(())
    }

    /// Replace the task-scoped data
    pub fn set_data(&mut self, id: TaskId, data: Option<P>) -> Result<()> {
        self.task_mut(id)?.data = data;
        Ok(())
    }

    /// Restart the deadline window at the current tick
    pub fn clear_elapsed(&mut self, id: TaskId) -> Result<()> {
        let now = self.now();
        self.task_mut(id)?.clock_start = now;
        Ok(())
    }

    /// Link an external buffer, or enable another mode on the linked one
    ///
    /// Modes accumulate; linking a different buffer keeps the modes already
    /// enabled. `LinkMode::Count(0)` is rejected.
    pub fn link_buffer(&mut self, id: TaskId, buffer: &'a dyn LinkedBuffer<P>, mode: LinkMode) -> Result<()> {
        if mode == LinkMode::Count(0) {
            return Err(Error::InvalidArgument);
        }
        let task = self.task_mut(id)?;
        let link = task.link.get_or_insert_with(|| BufferLink::new(buffer));
        link.buffer = buffer;
        link.enable(mode);
        Ok(())
    }

    /// Drop the buffer link and every mode on it
    pub fn unlink_buffer(&mut self, id: TaskId) -> Result<()> {
        self.task_mut(id)?.link = None;
        Ok(())
    }

    /// Attached state machine, for attribute changes
    pub fn state_machine_mut(&mut self, id: TaskId) -> Result<&mut StateMachine<EventInfo<'a, P>>> {
        match &mut self.task_mut(id)?.body {
            TaskBody::StateMachine(sm) => Ok(sm),
            TaskBody::Plain(_) => Err(Error::NotStateMachine),
        }
    }

    /// Send an asynchronous event to a task
    ///
    /// The task becomes ready on the next cycle even if disabled.
    pub fn send_event(&self, id: TaskId, payload: P) -> Result<()> {
        self.task(id)?;
        self.signals.send_event(id, payload)
    }

    /// Put an event for a task on the priority event queue
    pub fn queue_event(&self, id: TaskId, payload: P) -> Result<()> {
        self.task(id)?;
        self.signals.queue_event(id, payload).map_err(|err| {
            warn!("event for task {} dropped: {}", id, err);
            err
        })
    }

    /// Ask [`run`](Self::run) to return after the current cycle
    pub fn release(&self) {
        self.signals.request_release();
    }

    /// Look up a task
    pub fn task(&self, id: TaskId) -> Result<&Task<'a, P, N, Q>> {
        self.slots
            .get(id.index())
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.task.as_ref())
            .ok_or(Error::UnknownTask)
    }

    pub(crate) fn task_mut(&mut self, id: TaskId) -> Result<&mut Task<'a, P, N, Q>> {
        self.slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.task.as_mut())
            .ok_or(Error::UnknownTask)
    }

    /// Check if time-elapsed dispatches are enabled; false for unknown tasks
    pub fn is_enabled(&self, id: TaskId) -> bool {
        self.task(id).map_or(false, |task| task.is_enabled())
    }

    /// Completed dispatches of a task
    pub fn cycles(&self, id: TaskId) -> Result<u32> {
        self.task(id).map(|task| task.cycles())
    }

    /// Scheduling state of a task
    pub fn state(&self, id: TaskId) -> Result<TaskState> {
        self.task(id).map(|task| task.state())
    }

    /// Priority of a task
    pub fn priority(&self, id: TaskId) -> Result<Priority> {
        self.task(id).map(|task| task.priority())
    }

    /// Latest trigger of a task
    pub fn trigger(&self, id: TaskId) -> Result<Trigger> {
        self.task(id).map(|task| task.trigger())
    }

    /// Task being dispatched right now
    ///
    /// `None` outside a task dispatch, including inside the idle and release
    /// callbacks.
    pub fn current_task(&self) -> Option<TaskId> {
        self.current
    }

    /// Check whether a task is linked into the chain
    pub fn is_linked(&self, id: TaskId) -> bool {
        self.task(id).is_ok() && self.chain.contains(id.slot())
    }

    /// Linked tasks in chain order
    pub fn chain(&self) -> TaskIds<'_, 'a, P, N, Q> {
        TaskIds {
            nodes: self.chain.iter(),
            slots: &self.slots,
        }
    }

    /// Number of registered tasks
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.task.is_some()).count()
    }

    /// Check if no task is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of events waiting on the priority queue
    pub fn queue_len(&self) -> usize {
        self.signals.queue_len()
    }

    /// Tick period
    pub fn time_base(&self) -> TimeBase {
        self.time_base
    }

    /// Current tick count
    pub fn now(&self) -> Tick {
        self.signals.now()
    }

    pub(crate) fn id_at(&self, index: u16) -> TaskId {
        let generation = self.slots.get(index as usize).map_or(0, |slot| slot.generation);
        TaskId::new(index, generation)
    }

    fn spawn(&mut self, body: TaskBody<'a, P, N, Q>, config: TaskConfig<P>) -> Result<TaskId> {
        let index = match self.slots.iter().position(|slot| slot.task.is_none()) {
            Some(index) => index,
            None => {
                let index = self.slots.len();
                if index > u16::MAX as usize {
                    return Err(Error::TaskLimit);
                }
                self.slots
                    .push(Slot { generation: 0, task: None })
                    .map_err(|_| Error::TaskLimit)?;
                index
            }
        };
        let id = TaskId::new(index as u16, self.slots[index].generation);
        self.place(id, body, config);
        Ok(id)
    }

    fn place(&mut self, id: TaskId, body: TaskBody<'a, P, N, Q>, config: TaskConfig<P>) {
        self.chain.remove(id.slot());
        self.signals.bind(id);

        let priority = config.priority();
        let task = Task::new(body, config, &self.time_base, self.now());
        self.slots[id.index()].task = Some(task);

        let slots = &self.slots;
        self.chain.insert(id.slot(), |index| priority_at(slots, index));
        debug!("task {} registered at priority {}", id, priority);
    }
}

/// Handles of the linked tasks, highest priority first
pub struct TaskIds<'s, 'a, P, const N: usize, const Q: usize> {
    nodes: ChainIter<'s, N>,
    slots: &'s [Slot<'a, P, N, Q>],
}

impl<P, const N: usize, const Q: usize> Iterator for TaskIds<'_, '_, P, N, Q> {
    type Item = TaskId;

    fn next(&mut self) -> Option<TaskId> {
        let index = self.nodes.next()?;
        let generation = self.slots.get(index as usize).map_or(0, |slot| slot.generation);
        Some(TaskId::new(index, generation))
    }
}

pub(crate) fn priority_at<P, const N: usize, const Q: usize>(
    slots: &[Slot<'_, P, N, Q>],
    index: u16,
) -> Priority {
    slots
        .get(index as usize)
        .and_then(|slot| slot.task.as_ref())
        .map_or(Priority::MIN, |task| task.priority)
}

impl<P: Copy, const N: usize, const Q: usize> Clock for Scheduler<'_, P, N, Q> {
    fn now(&self) -> Tick {
        self.signals.now()
    }

    fn time_base(&self) -> TimeBase {
        self.time_base
    }
}
