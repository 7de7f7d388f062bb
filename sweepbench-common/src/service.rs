// SPDX-License-Identifier: MIT

//! Generic service system for the cooperative firmware main loop.

use core::cell::RefCell;
use heapless::Vec;

/// Events that can be sent between services
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// A test session started streaming
    TestStarted,
    /// The active test session completed or was cancelled
    TestFinished,
}

/// Event bus for inter-service communication
pub struct EventBus {
    events: RefCell<Vec<Event, 32>>,
}

impl EventBus {
    pub const fn new() -> Self {
        Self {
            events: RefCell::new(Vec::new()),
        }
    }

    /// Publish an event to the bus
    pub fn publish(&self, event: Event) {
        if self.events.borrow_mut().push(event).is_err() {
            #[cfg(feature = "defmt")]
            defmt::warn!("Event bus full, dropping event: {:?}", event);
        }
    }

    /// Consume events matching a filter
    pub fn consume<F>(&self, mut filter: F)
    where
        F: FnMut(&Event) -> bool,
    {
        self.events.borrow_mut().retain(|e| !filter(e));
    }

    /// Check if an event exists without consuming it
    pub fn has_event<F>(&self, filter: F) -> bool
    where
        F: FnMut(&Event) -> bool,
    {
        self.events.borrow().iter().any(filter)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared context passed to all services
pub struct ServiceContext<'a, P> {
    pub peripherals: &'a mut P,
    pub events: &'a EventBus,
}

/// Trait for services that run in the main loop
pub trait Service<P> {
    /// Process this service's logic
    /// Uses interior mutability (Cell/RefCell) for state changes
    fn process(&self, ctx: &mut ServiceContext<P>);
}
