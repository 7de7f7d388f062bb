// SPDX-License-Identifier: MIT

//! LED service: visual feedback while a test is streaming.
//!
//! The original firmware blinked the LED around each test run; here the LED
//! toggles at the same 200 ms cadence for the duration of a session and is
//! held low while idle.

use core::cell::Cell;

use embedded_hal::digital::OutputPin;
use sweepbench_common::service::{Event, Service, ServiceContext};

use crate::peripherals::Peripherals;

const BLINK_PERIOD_US: u64 = 200_000;

#[derive(Clone, Copy)]
enum LedState {
    Idle,
    Blinking { on: bool, since_us: u64 },
}

pub struct LedBlinkService {
    state: Cell<LedState>,
}

impl LedBlinkService {
    pub fn new() -> Self {
        Self {
            state: Cell::new(LedState::Idle),
        }
    }
}

impl Default for LedBlinkService {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<Peripherals> for LedBlinkService {
    fn process(&self, ctx: &mut ServiceContext<Peripherals>) {
        let now_us = ctx.peripherals.timer.get_counter().ticks();

        let mut started = false;
        let mut finished = false;
        ctx.events.consume(|event| match event {
            Event::TestStarted => {
                started = true;
                true
            }
            Event::TestFinished => {
                finished = true;
                true
            }
        });

        if finished {
            ctx.peripherals.led_pin.set_low().ok();
            self.state.set(LedState::Idle);
        }
        if started {
            ctx.peripherals.led_pin.set_high().ok();
            self.state.set(LedState::Blinking {
                on: true,
                since_us: now_us,
            });
        }

        if let LedState::Blinking { on, since_us } = self.state.get() {
            if now_us - since_us >= BLINK_PERIOD_US {
                if on {
                    ctx.peripherals.led_pin.set_low().ok();
                } else {
                    ctx.peripherals.led_pin.set_high().ok();
                }
                self.state.set(LedState::Blinking {
                    on: !on,
                    since_us: now_us,
                });
            }
        }
    }
}
