//! Decoupled event bus for engine lifecycle notifications.
//!
//! The bootstrapper and trigger handler emit via [`EventBus::emit`];
//! anything interested subscribes via [`EventBus::subscribe`]. Built on
//! [`tokio::sync::broadcast`] so multiple listeners react independently.

use tokio::sync::broadcast;

use crate::trigger::TriggerKind;

/// Events that flow through the system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A new engine was bound and cached.
    EngineStored {
        id: String,
        instance: u64,
        entry_point: String,
    },
    /// Startup found an engine already cached and left it alone.
    EngineReused { id: String, instance: u64 },
    /// The cached engine was removed and released.
    EngineReleased { id: String, instance: u64 },
    /// A trigger ran inside the cached engine.
    TriggerDispatched {
        id: String,
        instance: u64,
        kind: TriggerKind,
    },
}

/// A broadcast channel that any component can emit to or subscribe from.
#[derive(Debug)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a new event bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emit an event to all current subscribers.
    /// Returns the number of receivers that will see it.
    pub fn emit(&self, event: Event) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    /// Subscribe to future events. Past ones are not replayed.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
