//! Priority chain
//!
//! Singly linked sequence of task slot indices ordered by non-increasing
//! priority. Links live in a fixed array indexed by slot, so membership and
//! traversal never alias the task storage itself. Within a priority band the
//! chain keeps arrival order: a node is always spliced after every node of
//! equal or higher priority.

use quark_core::Priority;

#[derive(Debug, Clone, Copy)]
struct Link {
    next: Option<u16>,
    linked: bool,
}

impl Link {
    const UNLINKED: Self = Self {
        next: None,
        linked: false,
    };
}

/// Priority-ordered chain over `N` slot indices
#[derive(Debug)]
pub struct Chain<const N: usize> {
    head: Option<u16>,
    links: [Link; N],
    len: usize,
}

impl<const N: usize> Chain<N> {
    /// Create an empty chain
    pub const fn new() -> Self {
        Self {
            head: None,
            links: [Link::UNLINKED; N],
            len: 0,
        }
    }

    /// Insert `index` at its priority position
    ///
    /// Returns false if the index is out of range or already linked.
    pub fn insert<F>(&mut self, index: u16, priority_of: F) -> bool
    where
        F: Fn(u16) -> Priority,
    {
        let slot = index as usize;
        if slot >= N || self.links[slot].linked {
            return false;
        }

        let priority = priority_of(index);
        match self.head {
            Some(head) if priority <= priority_of(head) => {
                let mut at = head;
                while let Some(next) = self.links[at as usize].next {
                    if priority_of(next) < priority {
                        break;
                    }
                    at = next;
                }
                self.links[slot].next = self.links[at as usize].next;
                self.links[at as usize].next = Some(index);
            }
            _ => {
                self.links[slot].next = self.head;
                self.head = Some(index);
            }
        }

        self.links[slot].linked = true;
        self.len += 1;
        true
    }

    /// Unlink `index`, clearing its link
    ///
    /// Returns false (and does nothing) if it is not in the chain.
    pub fn remove(&mut self, index: u16) -> bool {
        if !self.contains(index) {
            return false;
        }

        let slot = index as usize;
        let next = self.links[slot].next;
        if self.head == Some(index) {
            self.head = next;
        } else {
            let mut at = self.head;
            while let Some(node) = at {
                if self.links[node as usize].next == Some(index) {
                    self.links[node as usize].next = next;
                    break;
                }
                at = self.links[node as usize].next;
            }
        }

        self.links[slot] = Link::UNLINKED;
        self.len -= 1;
        true
    }

    /// Rebuild the chain by re-inserting every node in its current order
    pub fn rearrange<F>(&mut self, priority_of: F)
    where
        F: Fn(u16) -> Priority,
    {
        let mut node = self.head.take();
        self.len = 0;
        while let Some(index) = node {
            node = self.links[index as usize].next;
            self.links[index as usize] = Link::UNLINKED;
            self.insert(index, &priority_of);
        }
    }

    /// First (highest priority) node
    pub fn first(&self) -> Option<u16> {
        self.head
    }

    /// Node following `index`
    pub fn next(&self, index: u16) -> Option<u16> {
        self.links.get(index as usize).and_then(|link| link.next)
    }

    /// Check whether `index` is linked
    pub fn contains(&self, index: u16) -> bool {
        self.links
            .get(index as usize)
            .map_or(false, |link| link.linked)
    }

    /// Number of linked nodes
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if no node is linked
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Iterate over the chain in priority order
    pub fn iter(&self) -> ChainIter<'_, N> {
        ChainIter {
            chain: self,
            at: self.head,
        }
    }
}

impl<const N: usize> Default for Chain<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over chain indices, highest priority first
pub struct ChainIter<'c, const N: usize> {
    chain: &'c Chain<N>,
    at: Option<u16>,
}

impl<const N: usize> Iterator for ChainIter<'_, N> {
    type Item = u16;

    fn next(&mut self) -> Option<u16> {
        let index = self.at?;
        self.at = self.chain.next(index);
        Some(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::vec::Vec;

    fn order<const N: usize>(chain: &Chain<N>) -> Vec<u16> {
        chain.iter().collect()
    }

    #[test]
    fn test_insert_keeps_priority_then_arrival_order() {
        let priorities = [3u8, 7, 3, 9, 7, 1];
        let prio = |i: u16| Priority::new(priorities[i as usize]);
        let mut chain: Chain<6> = Chain::new();
        for index in 0..6 {
            assert!(chain.insert(index, prio));
        }
        assert_eq!(order(&chain), [3, 1, 4, 0, 2, 5]);
        assert_eq!(chain.len(), 6);
    }

    #[test]
    fn test_insert_rejects_linked_or_out_of_range() {
        let prio = |_| Priority::new(1);
        let mut chain: Chain<2> = Chain::new();
        assert!(chain.insert(0, prio));
        assert!(!chain.insert(0, prio));
        assert!(!chain.insert(2, prio));
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn test_remove() {
        let prio = |i: u16| Priority::new(10 - i as u8);
        let mut chain: Chain<4> = Chain::new();
        for index in 0..4 {
            chain.insert(index, prio);
        }

        assert!(chain.remove(0));
        assert!(chain.remove(2));
        assert!(!chain.remove(2));
        assert!(!chain.contains(2));
        assert_eq!(chain.next(2), None);
        assert_eq!(order(&chain), [1, 3]);

        assert!(chain.remove(3));
        assert!(chain.remove(1));
        assert!(chain.is_empty());
        assert_eq!(chain.len(), 0);
    }

    #[test]
    fn test_rearrange_after_priority_change() {
        let mut priorities = [5u8, 5, 5];
        let mut chain: Chain<3> = Chain::new();
        for index in 0..3 {
            chain.insert(index, |i| Priority::new(priorities[i as usize]));
        }
        assert_eq!(order(&chain), [0, 1, 2]);

        priorities[2] = 8;
        priorities[0] = 1;
        chain.rearrange(|i| Priority::new(priorities[i as usize]));
        assert_eq!(order(&chain), [2, 1, 0]);
        assert_eq!(chain.len(), 3);
    }
}
