//! External buffers that can trigger a task
//!
//! The scheduler never owns a linked buffer. It only polls the narrow
//! [`LinkedBuffer`] predicates once per cycle and, for auto-pop links, pops
//! the front element after the task has consumed it.

use core::cell::RefCell;
use critical_section::Mutex;
use heapless::Deque;

use crate::Trigger;

/// Predicates the scheduler consumes from a linked buffer
///
/// Every method takes `&self`: implementors written to from interrupt context
/// provide their own interior mutability and interrupt safety.
pub trait LinkedBuffer<P> {
    /// Check if the buffer is full
    fn is_full(&self) -> bool;

    /// Check if the buffer is empty
    fn is_empty(&self) -> bool;

    /// Number of stored elements
    fn count(&self) -> usize;

    /// Copy of the front element, if any
    fn front(&self) -> Option<P>;

    /// Remove and return the front element
    fn pop_front(&self) -> Option<P>;
}

impl<P: Copy, const M: usize> LinkedBuffer<P> for Mutex<RefCell<Deque<P, M>>> {
    fn is_full(&self) -> bool {
        critical_section::with(|cs| self.borrow_ref(cs).is_full())
    }

    fn is_empty(&self) -> bool {
        critical_section::with(|cs| self.borrow_ref(cs).is_empty())
    }

    fn count(&self) -> usize {
        critical_section::with(|cs| self.borrow_ref(cs).len())
    }

    fn front(&self) -> Option<P> {
        critical_section::with(|cs| self.borrow_ref(cs).front().copied())
    }

    fn pop_front(&self) -> Option<P> {
        critical_section::with(|cs| self.borrow_ref_mut(cs).pop_front())
    }
}

/// Condition on a linked buffer that makes its task ready
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkMode {
    /// Ready while the buffer has a front element; it is popped after dispatch
    AutoPop,
    /// Ready while the buffer is full
    Full,
    /// Ready once the buffer holds at least this many elements
    Count(usize),
    /// Ready while the buffer is empty
    Empty,
}

/// A task's link to an external buffer and the modes enabled on it
pub(crate) struct BufferLink<'a, P> {
    pub(crate) buffer: &'a dyn LinkedBuffer<P>,
    auto_pop: bool,
    full: bool,
    count: usize,
    empty: bool,
}

impl<'a, P> BufferLink<'a, P> {
    pub(crate) fn new(buffer: &'a dyn LinkedBuffer<P>) -> Self {
        Self {
            buffer,
            auto_pop: false,
            full: false,
            count: 0,
            empty: false,
        }
    }

    /// Enable one more mode; modes already enabled stay on
    pub(crate) fn enable(&mut self, mode: LinkMode) {
        match mode {
            LinkMode::AutoPop => self.auto_pop = true,
            LinkMode::Full => self.full = true,
            LinkMode::Count(threshold) => self.count = threshold,
            LinkMode::Empty => self.empty = true,
        }
    }

    /// Resolve the buffer trigger, if any
    ///
    /// Checked in a fixed order: full, count, auto-pop, empty.
    pub(crate) fn poll(&self) -> Option<Trigger> {
        if self.full && self.buffer.is_full() {
            Some(Trigger::BufferFull)
        } else if self.count > 0 && self.buffer.count() >= self.count {
            Some(Trigger::BufferCount)
        } else if self.auto_pop && self.buffer.front().is_some() {
            Some(Trigger::BufferPop)
        } else if self.empty && self.buffer.is_empty() {
            Some(Trigger::BufferEmpty)
        } else {
            None
        }
    }
}
