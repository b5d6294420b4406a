// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Slot arena with an intrusive free list, shared by both broad-phase indices.
//!
//! Slots are addressed by plain indices. Growth doubles capacity by appending a
//! block of free slots, so indices handed out earlier stay valid. Released slots
//! are pushed on the head of the free list and reused first (LIFO).

use tracing::trace;

/// Capacity of a freshly constructed pool.
pub(crate) const INITIAL_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub(crate) enum Slot<T> {
    Free { next: Option<usize> },
    Occupied(T),
}

#[derive(Debug, Clone)]
pub(crate) struct NodePool<T> {
    slots: Vec<Slot<T>>,
    free_head: Option<usize>,
    active: usize,
}

impl<T> Default for NodePool<T> {
    fn default() -> Self {
        Self::with_capacity(INITIAL_CAPACITY)
    }
}

impl<T> NodePool<T> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        let mut pool = Self { slots: Vec::new(), free_head: None, active: 0 };
        pool.grow_to(capacity.max(1));
        pool
    }

    /// Appends free slots `[len, new_capacity)` threaded in ascending order.
    fn grow_to(&mut self, new_capacity: usize) {
        let start = self.slots.len();
        debug_assert!(new_capacity > start);
        self.slots.reserve_exact(new_capacity - start);
        for i in start..new_capacity {
            let next = if i + 1 < new_capacity { Some(i + 1) } else { self.free_head };
            self.slots.push(Slot::Free { next });
        }
        self.free_head = Some(start);
    }

    /// Stores `value` in a free slot and returns its index.
    pub(crate) fn allocate(&mut self, value: T) -> usize {
        if self.free_head.is_none() {
            assert_eq!(self.active, self.slots.len(), "pool accounting mismatch");
            let doubled = self.slots.len() * 2;
            trace!(from = self.slots.len(), to = doubled, "node pool grow");
            self.grow_to(doubled);
        }
        let Some(index) = self.free_head else {
            unreachable!("free list empty after growth");
        };
        let Slot::Free { next } = self.slots[index] else {
            unreachable!("free list head {index} is occupied");
        };
        self.free_head = next;
        self.slots[index] = Slot::Occupied(value);
        self.active += 1;
        index
    }

    /// Returns the slot to the free list, handing back its payload.
    ///
    /// # Panics
    /// Panics if `index` is not an occupied slot.
    pub(crate) fn release(&mut self, index: usize) -> T {
        let slot = std::mem::replace(&mut self.slots[index], Slot::Free { next: self.free_head });
        let Slot::Occupied(value) = slot else {
            unreachable!("released slot {index} was already free");
        };
        self.free_head = Some(index);
        self.active -= 1;
        value
    }

    pub(crate) fn get(&self, index: usize) -> Option<&T> {
        match self.slots.get(index) {
            Some(Slot::Occupied(value)) => Some(value),
            _ => None,
        }
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        match self.slots.get_mut(index) {
            Some(Slot::Occupied(value)) => Some(value),
            _ => None,
        }
    }

    /// Occupied slot accessor for indices the caller knows to be live.
    pub(crate) fn at(&self, index: usize) -> &T {
        match self.get(index) {
            Some(value) => value,
            None => unreachable!("slot {index} is not active"),
        }
    }

    pub(crate) fn at_mut(&mut self, index: usize) -> &mut T {
        match self.get_mut(index) {
            Some(value) => value,
            None => unreachable!("slot {index} is not active"),
        }
    }

    pub(crate) fn active(&self) -> usize {
        self.active
    }

    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Walks the free list. O(capacity); diagnostics only.
    ///
    /// Stops early (returning the partial count) if the walk exceeds capacity,
    /// which can only happen when the list is cyclic.
    pub(crate) fn free_len(&self) -> usize {
        let mut count = 0;
        let mut cursor = self.free_head;
        while let Some(index) = cursor {
            if count > self.slots.len() {
                break;
            }
            count += 1;
            cursor = match self.slots.get(index) {
                Some(Slot::Free { next }) => *next,
                _ => break,
            };
        }
        count
    }

    /// Free-list indices in pop order. Diagnostics only.
    pub(crate) fn free_indices(&self) -> Vec<usize> {
        let mut out = Vec::new();
        let mut cursor = self.free_head;
        while let Some(index) = cursor {
            if out.len() >= self.slots.len() {
                break;
            }
            out.push(index);
            cursor = match self.slots.get(index) {
                Some(Slot::Free { next }) => *next,
                _ => break,
            };
        }
        out
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (usize, &T)> + '_ {
        self.slots.iter().enumerate().filter_map(|(i, slot)| match slot {
            Slot::Occupied(value) => Some((i, value)),
            Slot::Free { .. } => None,
        })
    }
}
