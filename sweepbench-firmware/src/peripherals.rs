// SPDX-License-Identifier: MIT

//! Board bring-up and shared peripheral state.

use core::cell::UnsafeCell;

use rp2040_hal::clocks::{init_clocks_and_plls, UsbClock};
use rp2040_hal::gpio::bank0::Gpio25;
use rp2040_hal::gpio::{FunctionSioOutput, Pin, Pins, PullDown};
use rp2040_hal::pac;
use rp2040_hal::usb::UsbBus;
use rp2040_hal::{Sio, Timer, Watchdog};
use usb_device::class_prelude::UsbBusAllocator;

const XOSC_CRYSTAL_FREQ: u32 = 12_000_000;

pub type LedPin = Pin<Gpio25, FunctionSioOutput, PullDown>;

/// Raw pieces needed to bring up the USB bus; consumed once in `main`.
pub struct UsbParts {
    pub regs: pac::USBCTRL_REGS,
    pub dpram: pac::USBCTRL_DPRAM,
    pub clock: UsbClock,
    pub resets: pac::RESETS,
}

/// Peripherals shared with the service loop.
pub struct Peripherals {
    pub timer: Timer,
    pub led_pin: LedPin,
}

/// One-shot board initialization. Returns `None` if the PAC was already
/// taken or the clocks failed to lock.
pub fn init() -> Option<(Peripherals, UsbParts)> {
    let mut pac = pac::Peripherals::take()?;
    let mut watchdog = Watchdog::new(pac.WATCHDOG);

    let clocks = init_clocks_and_plls(
        XOSC_CRYSTAL_FREQ,
        pac.XOSC,
        pac.CLOCKS,
        pac.PLL_SYS,
        pac.PLL_USB,
        &mut pac.RESETS,
        &mut watchdog,
    )
    .ok()?;

    let sio = Sio::new(pac.SIO);
    let pins = Pins::new(
        pac.IO_BANK0,
        pac.PADS_BANK0,
        sio.gpio_bank0,
        &mut pac.RESETS,
    );
    let timer = Timer::new(pac.TIMER, &mut pac.RESETS, &clocks);
    let led_pin = pins.gpio25.into_push_pull_output();

    let usb = UsbParts {
        regs: pac.USBCTRL_REGS,
        dpram: pac.USBCTRL_DPRAM,
        clock: clocks.usb_clock,
        resets: pac.RESETS,
    };

    Some((Peripherals { timer, led_pin }, usb))
}

/// Wrapper to hold the USB bus allocator in a static without `static mut`.
///
/// SAFETY: This is only safe in a single-threaded (bare-metal, no OS)
/// environment. Written once during init, read-only afterwards.
struct SyncUsbBus(UnsafeCell<Option<UsbBusAllocator<UsbBus>>>);
unsafe impl Sync for SyncUsbBus {}

static USB_BUS: SyncUsbBus = SyncUsbBus(UnsafeCell::new(None));

/// Store the USB bus allocator (call once at startup)
pub fn store_usb_bus(bus: UsbBusAllocator<UsbBus>) {
    // SAFETY: Called only once during initialization, single-threaded
    unsafe {
        *USB_BUS.0.get() = Some(bus);
    }
}

/// Borrow the stored allocator for the lifetime of the program
pub fn usb_bus_ref() -> Option<&'static UsbBusAllocator<UsbBus>> {
    // SAFETY: Single-threaded environment, no concurrent access
    unsafe { (*USB_BUS.0.get()).as_ref() }
}
