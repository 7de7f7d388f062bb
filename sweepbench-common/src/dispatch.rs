// SPDX-License-Identifier: MIT

//! Top-level command dispatcher.
//!
//! Owns the process-wide [`TestMode`] flag, the engine, the line reader and
//! the heartbeat deadline. The firmware's service loop calls [`Dispatcher::feed`]
//! for every received byte and [`Dispatcher::poll`] once per tick; both take
//! the current time and the transport explicitly, so the dispatcher itself is
//! free of clock and I/O dependencies and runs unchanged under the host tests.

use rand_core::RngCore;

use crate::engine::{Pacing, SweepTestEngine, TestMode};
use crate::line::LineReader;
use crate::protocol::{parse_line, Command, ErrorKind, SweepRange};
use crate::record::Record;

/// Liveness dot cadence while no test is streaming.
pub const HEARTBEAT_INTERVAL_US: u64 = 1_000_000;

/// Longest accepted command line; beyond this the partial line is dropped.
pub const MAX_LINE_LEN: usize = 256;

/// Version string reported in the startup banner.
pub const FIRMWARE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Byte sink for outbound records, diagnostics and heartbeats. The
/// dispatcher is the transport's only writer.
pub trait Transport {
    fn write_all(&mut self, bytes: &[u8]);
    /// Push buffered bytes out. Records are flushed line-by-line so the
    /// harness sees each sample as soon as it is computed.
    fn flush(&mut self) {}
}

pub struct Dispatcher<R> {
    mode: TestMode,
    engine: SweepTestEngine<R>,
    reader: LineReader<MAX_LINE_LEN>,
    next_heartbeat_us: u64,
}

impl<R: RngCore> Dispatcher<R> {
    /// `now_us` anchors the first heartbeat one interval from startup.
    pub fn new(pacing: Pacing, rng: R, now_us: u64) -> Self {
        Self {
            mode: TestMode::default(),
            engine: SweepTestEngine::new(pacing, rng),
            reader: LineReader::new(),
            next_heartbeat_us: now_us + HEARTBEAT_INTERVAL_US,
        }
    }

    /// Whether a test session is currently active.
    pub fn is_test_active(&self) -> bool {
        self.engine.is_active()
    }

    pub fn mode(&self) -> TestMode {
        self.mode
    }

    /// Startup banner, emitted once after the transport comes up.
    pub fn announce_ready<T: Transport>(&self, transport: &mut T) {
        write_line(transport, "Sweepbench ready for testing!");
        transport.write_all(b"Firmware version: ");
        write_line(transport, FIRMWARE_VERSION);
    }

    /// Consume one transport byte; dispatches when it completes a line.
    pub fn feed<T: Transport>(&mut self, byte: u8, now_us: u64, transport: &mut T) {
        // Copy the completed line out so the reader can keep framing while
        // the handlers borrow the dispatcher mutably.
        let line: Option<heapless::String<MAX_LINE_LEN>> = match self.reader.push(byte) {
            Ok(Some(line)) if !line.is_empty() => heapless::String::try_from(line).ok(),
            Ok(_) => None,
            Err(kind) => {
                write_line(transport, kind.diagnostic());
                None
            }
        };

        if let Some(line) = line {
            self.handle_line(&line, now_us, transport);
        }
    }

    /// One scheduler tick: pump the engine, then the heartbeat. While a
    /// session is active the heartbeat is held off and re-anchored, so the
    /// next dot lands one full interval after the run ends.
    pub fn poll<T: Transport>(&mut self, now_us: u64, transport: &mut T) {
        if let Some(record) = self.engine.poll(now_us) {
            write_record(transport, &record);
        }

        if self.engine.is_active() {
            self.next_heartbeat_us = now_us + HEARTBEAT_INTERVAL_US;
        } else if now_us >= self.next_heartbeat_us {
            transport.write_all(b".");
            transport.flush();
            self.next_heartbeat_us += HEARTBEAT_INTERVAL_US;
        }
    }

    fn handle_line<T: Transport>(&mut self, line: &str, now_us: u64, transport: &mut T) {
        // Leading newline breaks a run of heartbeat dots before the echo.
        transport.write_all(b"\nReceived command: ");
        write_line(transport, line);

        let command = match parse_line(line) {
            Ok(command) => command,
            Err(kind) => {
                write_line(transport, kind.diagnostic());
                return;
            }
        };

        match command {
            Command::SimpleTest { test_id } => {
                let outcome = self.engine.start_simple(test_id, now_us);
                report(transport, outcome);
            }
            Command::ModeToggle { enabled } => {
                self.mode = if enabled {
                    TestMode::Simulated
                } else {
                    TestMode::Normal
                };
                write_line(
                    transport,
                    if enabled {
                        "Test mode enabled"
                    } else {
                        "Test mode disabled"
                    },
                );
            }
            Command::SweepTest(request) => {
                let outcome = SweepRange::parse(request.snr_range).and_then(|range| {
                    self.engine
                        .start_sweep(request.id, range, request.batch_size, self.mode, now_us)
                });
                report(transport, outcome);
            }
            Command::CancelTest => match self.engine.cancel() {
                Some(record) => write_record(transport, &record),
                None => write_line(transport, "No test is running"),
            },
            Command::Unrecognized { .. } => {
                write_line(transport, ErrorKind::UnknownCommand.diagnostic());
            }
        }
    }
}

fn report<T: Transport>(transport: &mut T, outcome: Result<Record, ErrorKind>) {
    match outcome {
        Ok(record) => write_record(transport, &record),
        Err(kind) => write_line(transport, kind.diagnostic()),
    }
}

fn write_record<T: Transport>(transport: &mut T, record: &Record) {
    let encoded = match record.to_json() {
        Ok(encoded) => encoded,
        Err(_) => return,
    };
    transport.write_all(encoded.as_bytes());
    transport.write_all(b"\n");
    transport.flush();
}

fn write_line<T: Transport>(transport: &mut T, text: &str) {
    transport.write_all(text.as_bytes());
    transport.write_all(b"\n");
    transport.flush();
}
