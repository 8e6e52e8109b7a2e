use std::collections::VecDeque;

use crate::api::types::ContactEvent;

/// Bounded store for the contacts produced by the most recent step.
///
/// Each step replaces the contents. Draining removes what it returns, so a
/// contact is delivered at most once.
pub struct ContactBuffer {
    events: VecDeque<ContactEvent>,
    capacity: usize,
    /// Contacts discarded by the last step because the buffer was full.
    dropped: usize,
}

impl ContactBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            dropped: 0,
        }
    }

    /// Discard everything left over from the previous step.
    pub fn begin_step(&mut self) {
        self.events.clear();
        self.dropped = 0;
    }

    /// Record a contact. Returns `false` once the buffer is full.
    pub fn push(&mut self, event: ContactEvent) -> bool {
        if self.events.len() >= self.capacity {
            self.dropped += 1;
            return false;
        }
        self.events.push_back(event);
        true
    }

    /// Remove and return up to `max` contacts, oldest first.
    pub fn drain(&mut self, max: usize) -> Vec<ContactEvent> {
        let n = max.min(self.events.len());
        self.events.drain(..n).collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn dropped(&self) -> usize {
        self.dropped
    }
}
