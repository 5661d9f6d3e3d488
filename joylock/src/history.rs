//! Rolling record of the most recent direction events.

use crate::direction::Direction;

/// Circular buffer holding the last `capacity` direction events, where
/// the capacity always equals the current combo length.
///
/// Slots hold `Option<Direction>`; `None` is a sentinel that can never
/// equal a target symbol, which is what makes [ComboHistory::invalidate]
/// force a complete fresh entry.
#[derive(Debug)]
pub struct ComboHistory {
    slots: Vec<Option<Direction>>,
    cursor: usize,
}

impl ComboHistory {
    pub fn new(capacity: usize) -> Self {
        ComboHistory {
            slots: vec![None; capacity],
            cursor: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Records one direction event. O(1); the oldest event wraps out.
    pub fn append(&mut self, dir: Direction) {
        let capacity = self.slots.len();
        self.slots[self.cursor % capacity] = Some(dir);
        self.cursor += 1;
    }

    /// True iff the most recent `capacity` events equal the target, in
    /// order. Exact order and exact length; false until enough history
    /// has been recorded.
    pub fn matches(&self, target: &[Direction]) -> bool {
        let capacity = self.slots.len();
        if target.len() != capacity || self.cursor < capacity {
            return false;
        }
        (0..capacity)
            .all(|i| self.slots[(self.cursor - capacity + i) % capacity] == Some(target[i]))
    }

    /// Clears the buffer and gives it a new capacity. No match is
    /// possible until `capacity` fresh events are recorded.
    pub fn reset(&mut self, capacity: usize) {
        self.slots = vec![None; capacity];
        self.cursor = 0;
    }

    /// Overwrites every slot with the empty sentinel, so the next match
    /// requires a complete fresh entry.
    pub fn invalidate(&mut self) {
        self.slots.fill(None);
    }

    /// Pre-loads the buffer with the target so an immediately-following
    /// match succeeds.
    pub fn seed(&mut self, target: &[Direction]) {
        self.slots = target.iter().copied().map(Some).collect();
        self.cursor = self.slots.len();
    }

    /// The recorded events, oldest first. Shorter than the capacity
    /// while the buffer is still filling; invalidated slots show as
    /// `None`.
    pub fn entries(&self) -> Vec<Option<Direction>> {
        let capacity = self.slots.len();
        let count = self.cursor.min(capacity);
        let start = self.cursor - count;
        (0..count)
            .map(|i| self.slots[(start + i) % capacity])
            .collect()
    }
}
