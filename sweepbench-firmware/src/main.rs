// SPDX-License-Identifier: MIT

#![no_std]
#![no_main]

mod peripherals;
mod services;
mod usb_transport;

use defmt_rtt as _;
use panic_probe as _;

defmt::timestamp!("{=u64:us}", { 0 });

use cortex_m_rt::entry;
use rand_core::SeedableRng;
use rand_wyrand::WyRand;
use sweepbench_common::dispatch::Dispatcher;
use sweepbench_common::engine::Pacing;
use sweepbench_common::service::{EventBus, Service, ServiceContext};
use usb_device::class_prelude::UsbBusAllocator;

use crate::services::{DispatchService, LedBlinkService, UsbTransportService};

#[unsafe(link_section = ".boot2")]
#[used]
pub static BOOT2: [u8; 256] = rp2040_boot2::BOOT_LOADER_GENERIC_03H;

fn halt() -> ! {
    loop {
        cortex_m::asm::nop();
    }
}

#[entry]
fn main() -> ! {
    defmt::println!("Sweepbench firmware init");

    let Some((mut peripherals, mut usb)) = peripherals::init() else {
        defmt::error!("Board initialization failed");
        halt();
    };

    sweepbench_common::board::blink(&mut peripherals.led_pin, &mut peripherals.timer, 3, 200);

    let usb_bus = UsbBusAllocator::new(rp2040_hal::usb::UsbBus::new(
        usb.regs,
        usb.dpram,
        usb.clock,
        true,
        &mut usb.resets,
    ));
    peripherals::store_usb_bus(usb_bus);

    let Some(usb_bus) = peripherals::usb_bus_ref() else {
        defmt::error!("USB bus unavailable after init");
        halt();
    };
    match usb_transport::UsbTransport::new(usb_bus) {
        Ok(transport) => {
            defmt::println!("USB CDC initialized");
            services::usb::store_transport(transport);
        }
        Err(e) => {
            defmt::error!("Failed to initialize USB transport: {:?}", e);
            halt();
        }
    }

    let now_us = peripherals.timer.get_counter().ticks();
    let rng = WyRand::seed_from_u64(now_us ^ 0x5EED_CA57_ED00_0001);
    let dispatcher = Dispatcher::new(Pacing::default(), rng, now_us);

    let usb_service = UsbTransportService::new();
    let dispatch_service = DispatchService::new(dispatcher);
    let led_service = LedBlinkService::new();
    let services: [&dyn Service<peripherals::Peripherals>; 3] =
        [&usb_service, &dispatch_service, &led_service];

    let events = EventBus::new();
    defmt::println!("Entering service loop");

    loop {
        let mut ctx = ServiceContext {
            peripherals: &mut peripherals,
            events: &events,
        };
        for service in &services {
            service.process(&mut ctx);
        }
    }
}
