// SPDX-License-Identifier: MIT

//! USB CDC transport carrying the line-oriented control protocol.

use rp2040_hal::usb::UsbBus;
use sweepbench_common::dispatch::Transport;
use usb_device::class_prelude::UsbBusAllocator;
use usb_device::prelude::*;
use usbd_serial::SerialPort;

#[derive(Debug, defmt::Format)]
pub enum TransportError {
    StringTooLong,
}

pub struct UsbTransport {
    serial: SerialPort<'static, UsbBus>,
    usb_dev: UsbDevice<'static, UsbBus>,
}

impl UsbTransport {
    pub fn new(usb_bus: &'static UsbBusAllocator<UsbBus>) -> Result<Self, TransportError> {
        let serial = SerialPort::new(usb_bus);
        let usb_dev = UsbDeviceBuilder::new(usb_bus, UsbVidPid(0x2E8A, 0x000A))
            .strings(&[StringDescriptors::default()
                .manufacturer("Sweepbench")
                .product("Sweepbench RF Test Bench")
                .serial_number("0001")])
            .map_err(|_| TransportError::StringTooLong)?
            .device_class(usbd_serial::USB_CLASS_CDC)
            .build();

        Ok(Self { serial, usb_dev })
    }

    /// Poll USB device. Must be called frequently.
    pub fn poll(&mut self) -> bool {
        self.usb_dev.poll(&mut [&mut self.serial])
    }

    /// Read whatever bytes are pending; never blocks.
    pub fn read_bytes(&mut self, buf: &mut [u8]) -> usize {
        match self.serial.read(buf) {
            Ok(count) => count,
            Err(_) => 0,
        }
    }

    /// Write all bytes to USB serial, handling WouldBlock by polling.
    fn write_bytes(&mut self, data: &[u8]) {
        let mut offset = 0;
        while offset < data.len() {
            match self.serial.write(&data[offset..]) {
                Ok(n) => offset += n,
                Err(UsbError::WouldBlock) => {
                    self.poll();
                }
                Err(_) => break,
            }
        }
    }
}

impl Transport for UsbTransport {
    fn write_all(&mut self, bytes: &[u8]) {
        self.write_bytes(bytes);
    }

    fn flush(&mut self) {
        // WouldBlock just means the host has not drained the endpoint yet.
        self.serial.flush().ok();
    }
}
