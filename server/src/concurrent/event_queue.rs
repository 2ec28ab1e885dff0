// bbox_sync/server/src/concurrent/event_queue.rs
use crate::core::types::WorldEvent;
use crossbeam_queue::SegQueue;
use std::sync::Arc;

/// Lock-free FIFO of engine lifecycle events.
///
/// One lane only: an add and a later removal of the same owner must be
/// consumed in the order they were pushed.
#[derive(Clone)]
pub struct EventQueue {
    events: Arc<SegQueue<WorldEvent>>,
}

impl EventQueue {
    pub fn new() -> Self {
        EventQueue {
            events: Arc::new(SegQueue::new()),
        }
    }

    pub fn push(&self, event: WorldEvent) {
        self.events.push(event);
    }

    pub fn pop(&self) -> Option<WorldEvent> {
        self.events.pop()
    }

    pub fn pop_batch(&self, max_count: usize) -> Vec<WorldEvent> {
        let mut batch = Vec::with_capacity(max_count.min(self.events.len()));
        while batch.len() < max_count {
            match self.events.pop() {
                Some(event) => batch.push(event),
                None => break,
            }
        }
        batch
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}
