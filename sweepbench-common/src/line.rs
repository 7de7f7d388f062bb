// SPDX-License-Identifier: MIT

//! Byte-at-a-time line framing for the serial transport.

use heapless::Vec;

use crate::protocol::ErrorKind;

/// Accumulates transport bytes until a `\n` terminator and yields complete,
/// whitespace-trimmed lines. Never blocks: bytes are pushed as they arrive
/// and a line is returned only when its terminator has been seen.
///
/// Buffered length is capped at `N`; on overflow the partial line is dropped
/// and [`ErrorKind::LineTooLong`] reported, then framing resumes with the
/// next terminator.
#[derive(Debug, Default)]
pub struct LineReader<const N: usize> {
    buf: Vec<u8, N>,
    ready: bool,
    overflowed: bool,
}

impl<const N: usize> LineReader<N> {
    pub const fn new() -> Self {
        Self {
            buf: Vec::new(),
            ready: false,
            overflowed: false,
        }
    }

    /// Push one received byte. Returns `Ok(Some(line))` when `byte` completed
    /// a line; the returned slice stays valid until the next call.
    pub fn push(&mut self, byte: u8) -> Result<Option<&str>, ErrorKind> {
        if self.ready {
            self.buf.clear();
            self.ready = false;
        }

        if byte != b'\n' {
            if self.overflowed {
                return Ok(None);
            }
            if self.buf.push(byte).is_err() {
                self.buf.clear();
                self.overflowed = true;
                return Err(ErrorKind::LineTooLong);
            }
            return Ok(None);
        }

        // Terminator: the rest of an overflowed line has now been consumed.
        if self.overflowed {
            self.overflowed = false;
            self.buf.clear();
            return Ok(None);
        }

        self.ready = true;
        // Non-UTF-8 garbage (framing noise at plug-in time) is dropped whole.
        let Ok(line) = core::str::from_utf8(&self.buf) else {
            return Ok(None);
        };
        Ok(Some(line.trim()))
    }
}
