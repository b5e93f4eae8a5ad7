//! Event sinks

use std::sync::{Arc, Mutex, PoisonError};

use crate::error::EventError;
use crate::event::LendingEvent;

/// Destination for committed-operation events.
///
/// `publish` is called before the ledger commits; an error aborts the
/// operation.
pub trait EventSink: Send + Sync {
    fn publish(&mut self, event: &LendingEvent) -> Result<(), EventError>;
}

/// Shared in-memory buffer.
///
/// Clones share the same buffer, so a test can keep one handle and give
/// another to the protocol.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<LendingEvent>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every event published so far
    pub fn events(&self) -> Vec<LendingEvent> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn last(&self) -> Option<LendingEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for MemorySink {
    fn publish(&mut self, event: &LendingEvent) -> Result<(), EventError> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
        Ok(())
    }
}

impl<S: EventSink + ?Sized> EventSink for Box<S> {
    fn publish(&mut self, event: &LendingEvent) -> Result<(), EventError> {
        (**self).publish(event)
    }
}
