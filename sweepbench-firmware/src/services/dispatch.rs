// SPDX-License-Identifier: MIT

//! Dispatch service: drives the protocol dispatcher once per tick.

use core::cell::{Cell, RefCell};

use rand_wyrand::WyRand;
use sweepbench_common::dispatch::Dispatcher;
use sweepbench_common::service::{Event, Service, ServiceContext};

use crate::peripherals::Peripherals;
use crate::services::usb;

/// Service that feeds received bytes to the dispatcher and pumps the
/// engine and heartbeat. Publishes session transitions for the LED service.
pub struct DispatchService {
    dispatcher: RefCell<Dispatcher<WyRand>>,
    announced: Cell<bool>,
    was_active: Cell<bool>,
}

impl DispatchService {
    pub fn new(dispatcher: Dispatcher<WyRand>) -> Self {
        Self {
            dispatcher: RefCell::new(dispatcher),
            announced: Cell::new(false),
            was_active: Cell::new(false),
        }
    }
}

impl Service<Peripherals> for DispatchService {
    fn process(&self, ctx: &mut ServiceContext<Peripherals>) {
        let now_us = ctx.peripherals.timer.get_counter().ticks();
        let mut dispatcher = self.dispatcher.borrow_mut();

        usb::with_transport(|transport| {
            if !self.announced.get() {
                dispatcher.announce_ready(transport);
                self.announced.set(true);
                defmt::println!("Startup banner sent");
            }

            while let Some(byte) = usb::pop_byte() {
                dispatcher.feed(byte, now_us, transport);
            }

            dispatcher.poll(now_us, transport);
        });

        let active = dispatcher.is_test_active();
        if active != self.was_active.get() {
            self.was_active.set(active);
            let event = if active {
                Event::TestStarted
            } else {
                Event::TestFinished
            };
            defmt::println!("Session transition: active={}", active);
            ctx.events.publish(event);
        }
    }
}
