use rand::seq::index;
use rand::Rng;

use crate::env::Observation;
use crate::error::{GridError, Result};

/// One recorded step of experience.
#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    /// Observation the action was chosen from
    pub state: Observation,
    pub action: usize,
    pub reward: f32,
    /// Observation after the environment stepped
    pub next_state: Observation,
    /// Terminal steps bootstrap from the reward alone
    pub done: bool,
}

/// Fixed-capacity ring buffer with uniform sampling.
///
/// Slots fill up in insertion order; once full, `cursor` points at the
/// oldest entry, which the next `push` overwrites.
#[derive(Clone, Debug)]
pub struct ReplayBuffer<T = Transition> {
    slots: Vec<T>,
    capacity: usize,
    cursor: usize,
}

impl<T> ReplayBuffer<T> {
    /// Create an empty buffer holding at most `capacity` entries.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero. Configs are validated before a buffer
    /// is built, so this only fires on direct misuse.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "replay buffer capacity must be positive");
        ReplayBuffer {
            slots: Vec::with_capacity(capacity),
            capacity,
            cursor: 0,
        }
    }

    /// Append an entry in O(1), overwriting the oldest one once full.
    pub fn push(&mut self, element: T) {
        if self.slots.len() < self.capacity {
            self.slots.push(element);
        } else {
            self.slots[self.cursor] = element;
        }
        self.cursor = (self.cursor + 1) % self.capacity;
    }

    /// Draw `batch_size` distinct entries uniformly at random.
    ///
    /// Fails with [`GridError::InsufficientData`] when the buffer holds
    /// fewer than `batch_size` entries. The order of the returned entries
    /// is random.
    pub fn sample<R: Rng + ?Sized>(&self, batch_size: usize, rng: &mut R) -> Result<Vec<&T>> {
        if batch_size > self.slots.len() {
            return Err(GridError::InsufficientData {
                requested: batch_size,
                available: self.slots.len(),
            });
        }
        Ok(index::sample(rng, self.slots.len(), batch_size)
            .into_iter()
            .map(|i| &self.slots[i])
            .collect())
    }

    /// Entries from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        let (newer, older) = self.slots.split_at(self.oldest_slot());
        older.iter().chain(newer.iter())
    }

    fn oldest_slot(&self) -> usize {
        if self.is_full() {
            self.cursor
        } else {
            0
        }
    }

    /// Number of stored entries, never more than the capacity.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Whether the next `push` evicts an entry.
    pub fn is_full(&self) -> bool {
        self.slots.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every entry; the capacity is kept.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.cursor = 0;
    }
}
