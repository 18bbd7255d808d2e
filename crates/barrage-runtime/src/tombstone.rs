#![forbid(unsafe_code)]

//! Bounded memory of removed item ids.
//!
//! Re-delivery of an id that already exited, was deserted or discarded must
//! be a no-op. Remembering every id forever would grow without bound, so the
//! oldest entries are evicted first once `capacity` is reached.

use std::collections::VecDeque;

use ahash::AHashSet;
use barrage_core::ItemId;

#[derive(Debug, Clone)]
pub struct Tombstones {
    order: VecDeque<ItemId>,
    set: AHashSet<ItemId>,
    capacity: usize,
}

impl Tombstones {
    /// Capacity is clamped to at least one entry.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            order: VecDeque::with_capacity(capacity.min(1_024)),
            set: AHashSet::with_capacity(capacity.min(1_024)),
            capacity,
        }
    }

    /// Remember `id`. Already-remembered ids are left in place.
    pub fn insert(&mut self, id: ItemId) {
        if self.set.contains(&id) {
            return;
        }
        if self.order.len() == self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.set.remove(&oldest);
            }
        }
        self.set.insert(id.clone());
        self.order.push_back(id);
    }

    #[must_use]
    pub fn contains(&self, id: &ItemId) -> bool {
        self.set.contains(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Change capacity, evicting the oldest entries if it shrinks.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.set.remove(&oldest);
            }
        }
    }
}
