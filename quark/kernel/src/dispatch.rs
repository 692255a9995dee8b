//! Core loop: readiness resolution and dispatch
//!
//! Each cycle runs to completion before the next one starts:
//! 1. rebuild the chain if a priority changed
//! 2. extract and dispatch at most one queued event
//! 3. resolve one trigger per chained task
//! 4. walk the chain dispatching every ready task
//! 5. run the idle callback if nothing at all was dispatched
//!
//! Dispatches never nest: a callback holds the scheduler's unique borrow, so
//! it can reconfigure tasks but cannot start another cycle.

use log::{debug, trace, warn};

use quark_core::Tick;

use crate::scheduler::priority_at;
use crate::{EventData, EventInfo, Iterations, Scheduler, TaskBody, TaskId, TaskState, Trigger};

impl<'a, P: Copy, const N: usize, const Q: usize> Scheduler<'a, P, N, Q> {
    /// Run the scheduler until a release is requested
    ///
    /// After the last cycle the chain is marked for rebuild and the release
    /// callback, if any, runs with [`Trigger::SchedulingRelease`].
    pub fn run(&mut self) {
        debug!("scheduler running {} task(s)", self.chain.len());
        loop {
            self.cycle();
            if self.signals.take_release() {
                break;
            }
        }

        self.sorted = false;
        debug!("scheduler released");
        if let Some(release) = self.release {
            let mut info = EventInfo::new(Trigger::SchedulingRelease);
            info.first_call = !self.release_called;
            release(self, &info);
            self.release_called = true;
        }
    }

    /// Run a single core loop cycle
    ///
    /// Returns true if at least one task was dispatched.
    pub fn cycle(&mut self) -> bool {
        if !self.sorted {
            self.rearrange();
        }

        let extracted = self.dispatch_queued();
        if self.resolve() {
            self.walk() || extracted
        } else {
            if !extracted {
                self.run_idle();
            }
            extracted
        }
    }

    fn rearrange(&mut self) {
        let slots = &self.slots;
        self.chain.rearrange(|index| priority_at(slots, index));
        self.sorted = true;
        debug!("chain rebuilt");
    }

    fn dispatch_queued(&mut self) -> bool {
        let slots = &self.slots;
        let (entry, purged) = self.signals.extract(|id| {
            slots
                .get(id.index())
                .filter(|slot| slot.generation == id.generation())
                .and_then(|slot| slot.task.as_ref())
                .map(|task| task.priority)
        });
        if purged > 0 {
            warn!("discarded {} queued event(s) for deleted tasks", purged);
        }

        let Some(entry) = entry else {
            return false;
        };
        let Ok(task) = self.task_mut(entry.task) else {
            return false;
        };
        task.state = TaskState::Ready;
        task.trigger = Trigger::QueueExtraction;
        self.dispatch(entry.task, Trigger::QueueExtraction, Some(entry.payload));
        true
    }

    /// Resolve the trigger of every chained task
    ///
    /// First match wins per task: deadline, then linked buffer, then async
    /// event. Only the deadline path depends on the enabled flag.
    fn resolve(&mut self) -> bool {
        let now = self.now();
        let signals = self.signals;
        let mut any_ready = false;

        let mut node = self.chain.first();
        while let Some(index) = node {
            node = self.chain.next(index);
            let slot = &mut self.slots[index as usize];
            let id = TaskId::new(index, slot.generation);
            let Some(task) = slot.task.as_mut() else {
                continue;
            };

            let trigger = if task.enabled && task.remaining.is_pending() && task.deadline_reached(now) {
                task.clock_start = now;
                Trigger::TimeElapsed
            } else if let Some(trigger) = task.link.as_ref().and_then(|link| link.poll()) {
                trigger
            } else if signals.has_pending(id) {
                Trigger::AsyncEvent
            } else {
                task.state = TaskState::Suspended;
                continue;
            };

            task.state = TaskState::Ready;
            task.trigger = trigger;
            any_ready = true;
        }
        any_ready
    }

    /// Dispatch every ready task in chain order
    ///
    /// The cursor moves on before each dispatch. A node unlinked by the
    /// previous callback is still visited, but has no successor, so the walk
    /// ends with it.
    fn walk(&mut self) -> bool {
        let mut dispatched = false;
        self.cursor = self.chain.first();

        while let Some(index) = self.cursor {
            self.cursor = self.chain.next(index);
            let id = self.id_at(index);
            let trigger = match self.slots[index as usize].task.as_mut() {
                Some(task) if task.state == TaskState::Ready => task.trigger,
                Some(task) => {
                    task.state = TaskState::Waiting;
                    continue;
                }
                None => continue,
            };

            if !self.chain.contains(index) {
                trace!("chain walk ends at unlinked {}", id);
            }
            self.dispatch(id, trigger, None);
            dispatched = true;
        }
        dispatched
    }

    fn run_idle(&mut self) {
        if let Some(idle) = self.idle {
            let mut info = EventInfo::new(Trigger::NoReadyTasks);
            info.first_call = !self.idle_called;
            idle(self, &info);
            self.idle_called = true;
        }
    }

    /// Prepare the event info and run one dispatch of `id`
    fn dispatch(&mut self, id: TaskId, trigger: Trigger, queued: Option<P>) {
        let signals = self.signals;
        let now: Tick = self.now();
        let Ok(task) = self.task_mut(id) else {
            return;
        };

        let mut info = EventInfo::new(trigger);
        let mut pop_from = None;
        match trigger {
            Trigger::TimeElapsed => {
                info.first_iteration = task.remaining != Iterations::Forever && task.rearmed;
                task.rearmed = false;
                if let Iterations::Times(left) = task.remaining {
                    let left = left.saturating_sub(1);
                    task.remaining = Iterations::Times(left);
                    if left == 0 {
                        info.last_iteration = true;
                        task.enabled = false;
                    }
                }
            }
            Trigger::AsyncEvent => {
                if let Some(payload) = signals.take_pending(id) {
                    info.event_data = EventData::Payload(payload);
                }
            }
            Trigger::BufferPop => {
                if let Some(link) = &task.link {
                    if let Some(front) = link.buffer.front() {
                        info.event_data = EventData::Front(front);
                        pop_from = Some(link.buffer);
                    }
                }
            }
            Trigger::BufferFull | Trigger::BufferCount | Trigger::BufferEmpty => {
                if let Some(link) = &task.link {
                    info.event_data = EventData::Buffer(link.buffer);
                }
            }
            Trigger::QueueExtraction => {
                if let Some(payload) = queued {
                    info.event_data = EventData::Payload(payload);
                }
            }
            _ => {}
        }

        task.state = TaskState::Running;
        info.first_call = !task.has_run;
        info.task_data = task.data;
        let callback = match &task.body {
            TaskBody::Plain(callback) => Some(*callback),
            TaskBody::StateMachine(_) => None,
        };

        trace!("dispatch {} by {} at {}", id, trigger, now);
        self.current = Some(id);
        match callback {
            Some(callback) => callback(self, &info),
            None => {
                if let Ok(task) = self.task_mut(id) {
                    if let TaskBody::StateMachine(sm) = &mut task.body {
                        sm.run(info);
                    }
                }
            }
        }
        self.current = None;

        if let Some(buffer) = pop_from {
            buffer.pop_front();
        }
        // Deleted by its own callback: nothing left to account for.
        if let Ok(task) = self.task_mut(id) {
            task.has_run = true;
            task.cycles = task.cycles.wrapping_add(1);
            task.state = TaskState::Suspended;
        }
    }
}
