// SPDX-License-Identifier: MIT

//! Service implementations for the firmware main loop.

pub mod dispatch;
pub mod led;
pub mod usb;

pub use dispatch::DispatchService;
pub use led::LedBlinkService;
pub use usb::UsbTransportService;
