//! The domain-event broadcast boundary.
//!
//! An external WebSocket layer (out of scope) drains the `EventBuffer`;
//! the ingest core never touches a socket directly.

use std::sync::Arc;

use crate::events::{DomainEvent, EventBuffer};

pub trait Broadcaster: Send + Sync {
    fn broadcast(&self, event: DomainEvent);
}

pub struct EventBufferBroadcaster {
    buffer: Arc<EventBuffer>,
}

impl EventBufferBroadcaster {
    pub fn new(buffer: Arc<EventBuffer>) -> Self {
        Self { buffer }
    }
}

impl Broadcaster for EventBufferBroadcaster {
    fn broadcast(&self, event: DomainEvent) {
        self.buffer.publish(event);
    }
}
