// SPDX-License-Identifier: MIT

//! Command grammar and wire types for the serial control protocol.
//!
//! Inbound lines are plain text except for `RUN_TEST`, which carries a JSON
//! payload. Parsing is deliberately permissive: anything that does not match
//! the grammar becomes [`Command::Unrecognized`] and is reported downstream;
//! only a `RUN_TEST` line with an undecodable payload is a parse error.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Protocol-level error taxonomy. Every kind maps to a fixed diagnostic line
/// sent back over the transport; none is fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ErrorKind {
    /// `RUN_TEST` payload or SNR range triple failed to decode.
    MalformedPayload,
    /// Test id is zero or negative.
    InvalidTestId,
    /// Line matched no command in the grammar.
    UnknownCommand,
    /// Sweep range has a zero or negative step.
    InvalidRange,
    /// A test session is already active.
    Busy,
    /// Receive buffer overflowed before a line terminator arrived.
    LineTooLong,
}

impl ErrorKind {
    /// The diagnostic line reported to the harness for this error.
    pub fn diagnostic(&self) -> &'static str {
        match self {
            Self::MalformedPayload => "Failed to parse test parameters",
            Self::InvalidTestId => "Invalid test ID",
            Self::UnknownCommand => "Unknown command. Use 'TEST<id>' to run a test.",
            Self::InvalidRange => "Invalid SNR range: step must be positive",
            Self::Busy => "Test already running",
            Self::LineTooLong => "Command line too long",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.diagnostic())
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ErrorKind {}

/// Decoded `RUN_TEST` JSON payload.
///
/// Field names follow the wire format used by the harness
/// (`{"id":1,"snrRange":"0:5:10","batchSize":2}`). The range stays a string
/// here; it is parsed into a [`SweepRange`] at dispatch so a malformed triple
/// can be reported without tearing down the command loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SweepRequest<'a> {
    pub id: i32,
    #[serde(rename = "snrRange")]
    pub snr_range: &'a str,
    #[serde(rename = "batchSize")]
    pub batch_size: u32,
}

/// Inclusive SNR iteration bounds, parsed from a `"start:step:stop"` token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SweepRange {
    pub start: i32,
    pub step: i32,
    pub stop: i32,
}

impl SweepRange {
    /// Parse a `"start:step:stop"` triple. Whitespace around each field is
    /// tolerated; anything else is [`ErrorKind::MalformedPayload`].
    pub fn parse(text: &str) -> Result<Self, ErrorKind> {
        let mut parts = text.split(':');
        let (Some(start), Some(step), Some(stop), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(ErrorKind::MalformedPayload);
        };

        let field = |s: &str| {
            s.trim()
                .parse::<i32>()
                .map_err(|_| ErrorKind::MalformedPayload)
        };

        Ok(Self {
            start: field(start)?,
            step: field(step)?,
            stop: field(stop)?,
        })
    }

    /// Only upward iteration is defined; a zero or negative step would never
    /// terminate and is rejected before a session starts.
    pub fn validate(&self) -> Result<(), ErrorKind> {
        if self.step <= 0 {
            return Err(ErrorKind::InvalidRange);
        }
        Ok(())
    }

    /// Number of SNR points visited: `floor((stop-start)/step) + 1`, or zero
    /// for an empty sweep (`start > stop`). The span is computed in `i64`
    /// since `stop - start` can exceed `i32` for extreme bounds.
    pub fn point_count(&self) -> u64 {
        if self.step <= 0 || self.start > self.stop {
            return 0;
        }
        let span = i64::from(self.stop) - i64::from(self.start);
        (span / i64::from(self.step) + 1) as u64
    }

    /// Total samples a sweep over this range emits.
    pub fn sample_count(&self, batch_size: u32) -> u64 {
        self.point_count() * u64::from(batch_size)
    }
}

/// A classified command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command<'a> {
    /// `TEST<n>`: run the countdown test with id `n`.
    SimpleTest { test_id: i32 },
    /// `TEST_MODE_ON` / `TEST_MODE_OFF`.
    ModeToggle { enabled: bool },
    /// `RUN_TEST <json>`: run an SNR/batch sweep.
    SweepTest(SweepRequest<'a>),
    /// `CANCEL_TEST`: abort the active test, if any.
    CancelTest,
    /// Anything else; echoed back with an unknown-command diagnostic.
    Unrecognized { raw: &'a str },
}

/// Classify one trimmed command line.
///
/// Exact keywords are matched before the `TEST` prefix so `TEST_MODE_ON` does
/// not fall into the simple-test rule. An unparseable id suffix yields id 0
/// (the behavior of the original firmware's `toInt()`), which the dispatcher
/// rejects; validation stays out of the parser.
pub fn parse_line(line: &str) -> Result<Command<'_>, ErrorKind> {
    match line {
        "TEST_MODE_ON" => return Ok(Command::ModeToggle { enabled: true }),
        "TEST_MODE_OFF" => return Ok(Command::ModeToggle { enabled: false }),
        "CANCEL_TEST" => return Ok(Command::CancelTest),
        _ => {}
    }

    if let Some(payload) = line.strip_prefix("RUN_TEST") {
        let (request, _) = serde_json_core::from_str::<SweepRequest>(payload.trim_start())
            .map_err(|_| ErrorKind::MalformedPayload)?;
        return Ok(Command::SweepTest(request));
    }

    if let Some(suffix) = line.strip_prefix("TEST") {
        let test_id = suffix.parse::<i32>().unwrap_or(0);
        return Ok(Command::SimpleTest { test_id });
    }

    Ok(Command::Unrecognized { raw: line })
}
