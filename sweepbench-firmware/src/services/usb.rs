// SPDX-License-Identifier: MIT

//! USB transport service: polls the device and queues received bytes.
//!
//! Line framing happens in the dispatcher; this service only moves raw
//! bytes off the endpoint so a slow tick never drops mid-line input.

use core::cell::UnsafeCell;

use heapless::spsc::Queue;
use sweepbench_common::service::{Service, ServiceContext};

use crate::peripherals::Peripherals;
use crate::usb_transport::UsbTransport;

const RX_QUEUE_LEN: usize = 512;

/// Wrapper to hold a Queue in a static without `static mut`.
///
/// SAFETY: This is only safe in a single-threaded (bare-metal, no OS)
/// environment. Only UsbTransportService enqueues, only DispatchService
/// dequeues.
struct SyncQueue(UnsafeCell<Queue<u8, RX_QUEUE_LEN>>);
unsafe impl Sync for SyncQueue {}

static RX_QUEUE: SyncQueue = SyncQueue(UnsafeCell::new(Queue::new()));

/// Push a received byte (called by the USB service)
pub fn push_byte(byte: u8) -> Result<(), u8> {
    // SAFETY: Single-threaded bare-metal environment, no concurrent access
    unsafe { (*RX_QUEUE.0.get()).enqueue(byte) }
}

/// Pop a received byte (called by the dispatch service)
pub fn pop_byte() -> Option<u8> {
    // SAFETY: Single-threaded bare-metal environment, no concurrent access
    unsafe { (*RX_QUEUE.0.get()).dequeue() }
}

/// Wrapper to hold an Option<UsbTransport> in a static without `static mut`.
///
/// SAFETY: Same single-threaded guarantee as above.
struct SyncTransport(UnsafeCell<Option<UsbTransport>>);
unsafe impl Sync for SyncTransport {}

static USB_TRANSPORT: SyncTransport = SyncTransport(UnsafeCell::new(None));

/// Store the USB transport (call once after initialization)
pub fn store_transport(transport: UsbTransport) {
    // SAFETY: Called only once during initialization, single-threaded
    unsafe {
        *USB_TRANSPORT.0.get() = Some(transport);
    }
}

/// Run a closure against the USB transport, if initialized
pub fn with_transport<F, R>(f: F) -> Option<R>
where
    F: FnOnce(&mut UsbTransport) -> R,
{
    // SAFETY: Single-threaded environment, no concurrent access
    unsafe { (*USB_TRANSPORT.0.get()).as_mut().map(f) }
}

/// Service that polls USB and queues received bytes
pub struct UsbTransportService;

impl UsbTransportService {
    pub fn new() -> Self {
        Self
    }
}

impl Default for UsbTransportService {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<Peripherals> for UsbTransportService {
    fn process(&self, _ctx: &mut ServiceContext<Peripherals>) {
        with_transport(|transport| {
            transport.poll();

            let mut chunk = [0u8; 64];
            let count = transport.read_bytes(&mut chunk);
            for &byte in &chunk[..count] {
                if push_byte(byte).is_err() {
                    defmt::warn!("RX queue full, dropping byte");
                }
            }
        });
    }
}
