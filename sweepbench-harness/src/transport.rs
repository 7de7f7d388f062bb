// SPDX-License-Identifier: MIT

//! Serial transport for talking to the firmware.

use std::io::{Read, Write};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use serialport::SerialPort;

const READ_CHUNK: usize = 256;

/// One unit of firmware output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SerialEvent {
    /// Idle heartbeat dot; arrives outside any line.
    Heartbeat,
    /// A complete line: JSON record or plain-text diagnostic.
    Line(String),
}

pub struct Transport {
    port: Box<dyn SerialPort>,
    name: String,
    pending: Vec<u8>,
}

impl Transport {
    pub fn new(name: &str, baud: u32) -> Result<Self> {
        let port = serialport::new(name, baud)
            .timeout(Duration::from_millis(100))
            .open()
            .with_context(|| format!("Failed to open serial port {name}"))?;

        Ok(Self {
            port,
            name: name.to_string(),
            pending: Vec::new(),
        })
    }

    pub fn port_name(&self) -> &str {
        &self.name
    }

    /// Send one command line.
    pub fn send_line(&mut self, line: &str) -> Result<()> {
        self.port
            .write_all(line.as_bytes())
            .with_context(|| format!("Failed to write command '{line}'"))?;
        self.port.write_all(b"\n").context("Failed to write terminator")?;
        self.port.flush().context("Failed to flush serial port")?;
        Ok(())
    }

    /// Wait up to `timeout` for the next event; `None` on timeout.
    pub fn read_event(&mut self, timeout: Duration) -> Result<Option<SerialEvent>> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(event) = self.pop_pending() {
                return Ok(Some(event));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }

            let mut chunk = [0u8; READ_CHUNK];
            match self.port.read(&mut chunk) {
                Ok(0) => {}
                Ok(count) => self.pending.extend_from_slice(&chunk[..count]),
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {}
                Err(e) => return Err(e).context("Serial read failed"),
            }
        }
    }

    /// Pull one event off the front of the pending buffer.
    fn pop_pending(&mut self) -> Option<SerialEvent> {
        loop {
            // Skip blank separators; dots between lines are heartbeats.
            match self.pending.first() {
                Some(b'.') => {
                    self.pending.remove(0);
                    return Some(SerialEvent::Heartbeat);
                }
                Some(b'\n' | b'\r') => {
                    self.pending.remove(0);
                    continue;
                }
                _ => {}
            }

            let end = self.pending.iter().position(|&b| b == b'\n')?;
            let raw: Vec<u8> = self.pending.drain(..=end).collect();
            let line = String::from_utf8_lossy(&raw).trim().to_string();
            if !line.is_empty() {
                return Some(SerialEvent::Line(line));
            }
        }
    }
}
