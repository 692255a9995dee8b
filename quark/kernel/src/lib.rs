#![no_std]
#![forbid(unsafe_code)]

//! # Quark Kernel
//!
//! Non-preemptive, priority-ordered cooperative scheduler. Tasks run to
//! completion when triggered by elapsed time, an asynchronous event, a
//! queued event or a linked buffer condition, and share one execution
//! context ordered by static priority.
//!
//! Interrupt handlers only touch [`Signals`]: the tick counter, the priority
//! event queue, async-event mailboxes and release requests. Everything else
//! belongs to the [`Scheduler`] and is mutated from the main loop alone.
//!
//! ```
//! use quark_kernel::{EventInfo, Scheduler, Signals, TaskConfig, TimeBase, Priority};
//!
//! static SIGNALS: Signals<u32, 4, 4> = Signals::new();
//!
//! fn hello(sched: &mut Scheduler<'_, u32, 4, 4>, _info: &EventInfo<'_, u32>) {
//!     sched.release();
//! }
//!
//! let mut sched = Scheduler::new(&SIGNALS, TimeBase::MILLIS, None);
//! sched.add_task(hello, TaskConfig::new(Priority::new(1))).unwrap();
//! sched.run();
//! ```

pub mod buffer;
pub mod chain;
mod dispatch;
pub mod event;
pub mod queue;
pub mod scheduler;
pub mod signals;
pub mod task;

pub use quark_core::*;
pub use quark_fsm::{Attribute, Hooks, StateMachine, Status};

pub use buffer::{LinkMode, LinkedBuffer};
pub use event::*;
pub use queue::{PriorityQueue, QueueEntry};
pub use scheduler::*;
pub use signals::*;
pub use task::*;

#[cfg(test)]
extern crate std;
