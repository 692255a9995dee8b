//! Priority event queue
//!
//! Bounded FIFO with priority extraction. Entries are appended in arrival
//! order; extraction takes the entry whose task has the highest priority,
//! the earliest one winning ties, and shifts the rest down so their relative
//! order is kept.

use heapless::Vec;
use quark_core::{Error, Priority, Result};

use crate::TaskId;

/// Queued event: target task and payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueEntry<P> {
    /// Task the event is addressed to
    pub task: TaskId,
    /// Event payload
    pub payload: P,
}

/// Fixed-capacity priority event queue
pub struct PriorityQueue<P, const Q: usize> {
    entries: Vec<QueueEntry<P>, Q>,
}

impl<P, const Q: usize> PriorityQueue<P, Q> {
    /// Create an empty queue
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append an event
    ///
    /// Fails with [`Error::QueueFull`] and leaves the queue unchanged when
    /// every slot is taken.
    pub fn push(&mut self, task: TaskId, payload: P) -> Result<()> {
        self.entries
            .push(QueueEntry { task, payload })
            .map_err(|_| Error::QueueFull)
    }

    /// Take the entry with the highest task priority
    ///
    /// `priority_of` returns `None` for tasks that no longer exist; their
    /// entries are skipped and left in place for [`purge`](Self::purge).
    pub fn extract<F>(&mut self, priority_of: F) -> Option<QueueEntry<P>>
    where
        F: Fn(TaskId) -> Option<Priority>,
    {
        let mut best: Option<(usize, Priority)> = None;
        for (slot, entry) in self.entries.iter().enumerate() {
            if let Some(priority) = priority_of(entry.task) {
                match best {
                    Some((_, top)) if priority <= top => {}
                    _ => best = Some((slot, priority)),
                }
            }
        }
        best.map(|(slot, _)| self.entries.remove(slot))
    }

    /// Drop every entry whose task is no longer alive
    ///
    /// Returns the number of entries dropped.
    pub fn purge<F>(&mut self, is_alive: F) -> usize
    where
        F: Fn(TaskId) -> bool,
    {
        let before = self.entries.len();
        self.entries.retain(|entry| is_alive(entry.task));
        before - self.entries.len()
    }

    /// Check if the queue is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check if the queue is full
    pub fn is_full(&self) -> bool {
        self.entries.is_full()
    }

    /// Number of queued events
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Maximum number of queued events
    pub const fn capacity(&self) -> usize {
        Q
    }

    /// Remove every queued event
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<P, const Q: usize> Default for PriorityQueue<P, Q> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(index: u16) -> TaskId {
        TaskId::new(index, 0)
    }

    fn prio(task: TaskId) -> Option<Priority> {
        const PRIORITIES: [u8; 4] = [5, 9, 9, 3];
        PRIORITIES.get(task.index()).map(|p| Priority::new(*p))
    }

    #[test]
    fn test_extract_highest_priority_earliest_first() {
        let mut queue: PriorityQueue<char, 4> = PriorityQueue::new();
        for (index, tag) in ['a', 'b', 'c', 'd'].into_iter().enumerate() {
            queue.push(id(index as u16), tag).unwrap();
        }

        assert_eq!(queue.extract(prio).map(|e| e.payload), Some('b'));
        assert_eq!(queue.extract(prio).map(|e| e.payload), Some('c'));
        assert_eq!(queue.extract(prio).map(|e| e.payload), Some('a'));
        assert_eq!(queue.extract(prio).map(|e| e.payload), Some('d'));
        assert_eq!(queue.extract(prio), None);
    }

    #[test]
    fn test_push_fails_when_full() {
        let mut queue: PriorityQueue<u8, 2> = PriorityQueue::new();
        queue.push(id(0), 1).unwrap();
        queue.push(id(1), 2).unwrap();
        assert_eq!(queue.push(id(2), 3), Err(Error::QueueFull));
        assert_eq!(queue.len(), 2);
        assert!(queue.is_full());
        assert_eq!(queue.extract(prio).map(|e| e.payload), Some(2));
        assert_eq!(queue.extract(prio).map(|e| e.payload), Some(1));
    }

    #[test]
    fn test_purge_dead_entries() {
        let mut queue: PriorityQueue<u8, 4> = PriorityQueue::new();
        queue.push(id(0), 0).unwrap();
        queue.push(id(7), 7).unwrap();
        queue.push(id(3), 3).unwrap();

        assert_eq!(queue.purge(|task| prio(task).is_some()), 1);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.extract(prio).map(|e| e.payload), Some(0));
    }
}
