// SPDX-License-Identifier: MIT

//! Common types and logic for the sweepbench RF test firmware.
//!
//! This crate supports both `no_std` (firmware) and `std` (host) environments:
//! - Default: `no_std` mode for embedded targets
//! - `std` feature: Enables `std` support for host tools
//! - `embedded` feature: Enables embedded-specific helpers (embedded-hal)
//!
//! Everything with protocol or timing semantics lives here so the firmware
//! binary stays a thin I/O shell and the whole engine is testable on the host.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod dispatch;
pub mod engine;
pub mod line;
pub mod protocol;
pub mod record;
pub mod service;

// Board helpers for firmware targets (requires embedded feature)
#[cfg(feature = "embedded")]
pub mod board;

// Re-export commonly used types
pub use dispatch::{Dispatcher, Transport, HEARTBEAT_INTERVAL_US, MAX_LINE_LEN};
pub use engine::{Pacing, SweepTestEngine, TestMode};
pub use line::LineReader;
pub use protocol::{parse_line, Command, ErrorKind, SweepRange, SweepRequest};
pub use record::Record;
