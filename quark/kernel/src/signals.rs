//! State shared between interrupt handlers and the scheduler loop
//!
//! [`Signals`] is meant to live in a `static` so interrupt handlers can reach
//! it. Every access goes through a critical section; the scheduler holds a
//! shared reference and is the only consumer.
//!
//! ```
//! use quark_kernel::Signals;
//!
//! static SIGNALS: Signals<u32, 8, 4> = Signals::new();
//!
//! // From the tick interrupt:
//! SIGNALS.tick();
//! assert_eq!(SIGNALS.now().raw(), 1);
//! ```

use core::cell::{Cell, RefCell};
use critical_section::{CriticalSection, Mutex};

use quark_core::{Error, Priority, Result, Tick};

use crate::queue::{PriorityQueue, QueueEntry};
use crate::TaskId;

/// Interrupt-shared scheduler inputs for `N` task slots and a queue of `Q`
pub struct Signals<P, const N: usize, const Q: usize> {
    epochs: Mutex<Cell<Tick>>,
    queue: Mutex<RefCell<PriorityQueue<P, Q>>>,
    pending: Mutex<RefCell<[Option<(TaskId, P)>; N]>>,
    live: Mutex<RefCell<[Option<u16>; N]>>,
    release: Mutex<Cell<bool>>,
}

impl<P: Copy, const N: usize, const Q: usize> Signals<P, N, Q> {
    /// Create the shared state with the tick counter at zero
    pub const fn new() -> Self {
        Self {
            epochs: Mutex::new(Cell::new(Tick::ZERO)),
            queue: Mutex::new(RefCell::new(PriorityQueue::new())),
            pending: Mutex::new(RefCell::new([None; N])),
            live: Mutex::new(RefCell::new([None; N])),
            release: Mutex::new(Cell::new(false)),
        }
    }

    /// Feed one tick; call from the timer interrupt
    pub fn tick(&self) {
        critical_section::with(|cs| {
            let epochs = self.epochs.borrow(cs);
            let mut now = epochs.get();
            now.increment();
            epochs.set(now);
        });
    }

    /// Current tick count
    pub fn now(&self) -> Tick {
        critical_section::with(|cs| self.epochs.borrow(cs).get())
    }

    /// Enqueue an event for `task` on the priority event queue
    ///
    /// Fails with [`Error::QueueFull`] without blocking; the caller decides
    /// whether to drop or retry. Handles of deleted tasks are rejected with
    /// [`Error::UnknownTask`].
    pub fn queue_event(&self, task: TaskId, payload: P) -> Result<()> {
        critical_section::with(|cs| {
            if !self.is_live(cs, task) {
                return Err(Error::UnknownTask);
            }
            self.queue.borrow_ref_mut(cs).push(task, payload)
        })
    }

    /// Signal an asynchronous event to `task`
    ///
    /// Overwrites an event still pending for the same task. Handles of
    /// deleted tasks are rejected with [`Error::UnknownTask`] and never touch
    /// the event of a task that reused the slot.
    pub fn send_event(&self, task: TaskId, payload: P) -> Result<()> {
        critical_section::with(|cs| {
            if !self.is_live(cs, task) {
                return Err(Error::UnknownTask);
            }
            self.pending.borrow_ref_mut(cs)[task.index()] = Some((task, payload));
            Ok(())
        })
    }

    /// Ask the scheduler loop to return after the current cycle
    pub fn request_release(&self) {
        critical_section::with(|cs| self.release.borrow(cs).set(true));
    }

    /// Number of queued events
    pub fn queue_len(&self) -> usize {
        critical_section::with(|cs| self.queue.borrow_ref(cs).len())
    }

    pub(crate) fn has_pending(&self, task: TaskId) -> bool {
        critical_section::with(|cs| {
            matches!(
                self.pending.borrow_ref(cs).get(task.index()),
                Some(Some((pending, _))) if *pending == task
            )
        })
    }

    pub(crate) fn take_pending(&self, task: TaskId) -> Option<P> {
        critical_section::with(|cs| {
            let mut pending = self.pending.borrow_ref_mut(cs);
            let slot = pending.get_mut(task.index())?;
            if matches!(slot, Some((owner, _)) if *owner == task) {
                slot.take().map(|(_, payload)| payload)
            } else {
                None
            }
        })
    }

    /// Make `task` the live owner of its slot, dropping any pending event
    pub(crate) fn bind(&self, task: TaskId) {
        self.set_owner(task.index(), Some(task.generation()));
    }

    /// Free the slot at `index`, dropping any pending event
    pub(crate) fn unbind(&self, index: usize) {
        self.set_owner(index, None);
    }

    fn set_owner(&self, index: usize, generation: Option<u16>) {
        critical_section::with(|cs| {
            if let Some(owner) = self.live.borrow_ref_mut(cs).get_mut(index) {
                *owner = generation;
            }
            if let Some(slot) = self.pending.borrow_ref_mut(cs).get_mut(index) {
                *slot = None;
            }
        });
    }

    fn is_live(&self, cs: CriticalSection<'_>, task: TaskId) -> bool {
        self.live.borrow_ref(cs).get(task.index()).copied().flatten() == Some(task.generation())
    }

    /// Purge entries of dead tasks, then extract the most urgent one
    ///
    /// Returns the extracted entry and the number of entries purged.
    pub(crate) fn extract<F>(&self, priority_of: F) -> (Option<QueueEntry<P>>, usize)
    where
        F: Fn(TaskId) -> Option<Priority>,
    {
        critical_section::with(|cs| {
            let mut queue = self.queue.borrow_ref_mut(cs);
            if queue.is_empty() {
                return (None, 0);
            }
            let purged = queue.purge(|task| priority_of(task).is_some());
            (queue.extract(&priority_of), purged)
        })
    }

    pub(crate) fn take_release(&self) -> bool {
        critical_section::with(|cs| self.release.borrow(cs).replace(false))
    }
}

impl<P: Copy, const N: usize, const Q: usize> Default for Signals<P, N, Q> {
    fn default() -> Self {
        Self::new()
    }
}
