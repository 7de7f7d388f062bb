// SPDX-License-Identifier: MIT

//! Sweep-test execution engine.
//!
//! One engine owns at most one live [`TestSession`] and is driven by the
//! scheduler tick: [`SweepTestEngine::poll`] emits at most one record per
//! call, and only once the pacing deadline for that record has passed. The
//! original firmware paced with blocking delays inside the test loop, which
//! starved the heartbeat and command intake; here a run never occupies the
//! loop, so cancellation and new commands are seen mid-sweep.

use rand_core::RngCore;

use crate::protocol::{ErrorKind, SweepRange};
use crate::record::Record;

/// Number of countdown samples the simple test emits.
const SIMPLE_TEST_COUNT: u32 = 10;

/// Process-wide metric mode. `Normal` computes the fixed linear law;
/// `Simulated` draws pseudo-random metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TestMode {
    #[default]
    Normal,
    Simulated,
}

/// Inter-record delays. Defaults match the original firmware (1 s countdown
/// steps, 100 ms sweep samples); tests use [`Pacing::immediate`] to run a
/// whole test without wall-clock waits.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Pacing {
    pub simple_step_us: u64,
    pub sample_interval_us: u64,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            simple_step_us: 1_000_000,
            sample_interval_us: 100_000,
        }
    }
}

impl Pacing {
    /// Zero delays: every record is due on the next poll.
    pub const fn immediate() -> Self {
        Self {
            simple_step_us: 0,
            sample_interval_us: 0,
        }
    }
}

/// Lifecycle of a session: `Idle -> Started -> Running -> Completed -> Idle`.
/// `Completed` (or a cancellation) resets the engine to `Idle` immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionStatus {
    Idle,
    Started,
    Running,
}

/// Cursor of the active test.
#[derive(Debug, Clone, Copy)]
enum TestKind {
    Simple {
        next_count: u32,
    },
    Sweep {
        range: SweepRange,
        batch_size: u32,
        /// Widened so stepping one past `i32::MAX` terminates instead of
        /// wrapping back under `stop`.
        next_snr: i64,
        next_batch: u32,
    },
}

/// Live execution context for one run. The mode is copied in at start, so
/// toggling the process-wide flag never affects an in-flight test.
#[derive(Debug, Clone, Copy)]
struct TestSession {
    test_id: i32,
    mode: TestMode,
    kind: TestKind,
    emitted: bool,
}

/// Resumable test executor. Generic over the random source so the firmware
/// can seed a `WyRand` from the hardware timer while tests inject a fixed
/// seed.
pub struct SweepTestEngine<R> {
    session: Option<TestSession>,
    pacing: Pacing,
    deadline_us: u64,
    rng: R,
}

impl<R: RngCore> SweepTestEngine<R> {
    pub fn new(pacing: Pacing, rng: R) -> Self {
        Self {
            session: None,
            pacing,
            deadline_us: 0,
            rng,
        }
    }

    /// Whether a session is active (started or running).
    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn status(&self) -> SessionStatus {
        match &self.session {
            None => SessionStatus::Idle,
            Some(s) if s.emitted => SessionStatus::Running,
            Some(_) => SessionStatus::Started,
        }
    }

    /// Begin the countdown test. Returns the `started` record to emit, or an
    /// error if the id is invalid or a session is already active.
    pub fn start_simple(&mut self, test_id: i32, now_us: u64) -> Result<Record, ErrorKind> {
        if test_id <= 0 {
            return Err(ErrorKind::InvalidTestId);
        }
        self.begin(
            TestSession {
                test_id,
                mode: TestMode::Normal,
                kind: TestKind::Simple { next_count: 1 },
                emitted: false,
            },
            now_us,
        )
    }

    /// Begin an SNR/batch sweep with the mode in force at this instant.
    /// A zero or negative step is rejected before the session starts; a
    /// positive step with `start > stop` is a valid empty sweep that emits
    /// only the `started`/`completed` frame.
    pub fn start_sweep(
        &mut self,
        test_id: i32,
        range: SweepRange,
        batch_size: u32,
        mode: TestMode,
        now_us: u64,
    ) -> Result<Record, ErrorKind> {
        if test_id <= 0 {
            return Err(ErrorKind::InvalidTestId);
        }
        range.validate()?;
        self.begin(
            TestSession {
                test_id,
                mode,
                kind: TestKind::Sweep {
                    range,
                    batch_size,
                    next_snr: range.start.into(),
                    next_batch: 0,
                },
                emitted: false,
            },
            now_us,
        )
    }

    fn begin(&mut self, session: TestSession, now_us: u64) -> Result<Record, ErrorKind> {
        if self.session.is_some() {
            return Err(ErrorKind::Busy);
        }
        let test_id = session.test_id;
        self.session = Some(session);
        // First sample is due on the next poll.
        self.deadline_us = now_us;
        Ok(Record::Started { test_id })
    }

    /// Abort the active session, yielding the `cancelled` record to emit.
    pub fn cancel(&mut self) -> Option<Record> {
        let session = self.session.take()?;
        Some(Record::Cancelled {
            test_id: session.test_id,
        })
    }

    /// Advance the session by at most one record. Returns `None` while idle
    /// or until the pacing deadline passes. The `completed` record is the
    /// last one produced; the engine is `Idle` again once it is returned.
    pub fn poll(&mut self, now_us: u64) -> Option<Record> {
        if now_us < self.deadline_us {
            return None;
        }
        let session = self.session.as_mut()?;
        let test_id = session.test_id;
        let mode = session.mode;

        let step = match &mut session.kind {
            TestKind::Simple { next_count } => {
                if *next_count > SIMPLE_TEST_COUNT {
                    None
                } else {
                    let count = *next_count;
                    *next_count += 1;
                    Some((
                        Record::Count { test_id, count },
                        self.pacing.simple_step_us,
                    ))
                }
            }
            TestKind::Sweep {
                range,
                batch_size,
                next_snr,
                next_batch,
            } => {
                if *batch_size == 0 || *next_snr > i64::from(range.stop) {
                    None
                } else {
                    // In range, so the cursor fits i32 again.
                    let snr = *next_snr as i32;
                    *next_batch += 1;
                    if *next_batch >= *batch_size {
                        *next_batch = 0;
                        *next_snr += i64::from(range.step);
                    }
                    let (ber, fer) = metrics(&mut self.rng, mode, snr);
                    Some((
                        Record::Sample {
                            test_id,
                            snr,
                            ber,
                            fer,
                        },
                        self.pacing.sample_interval_us,
                    ))
                }
            }
        };

        match step {
            Some((record, interval_us)) => {
                session.emitted = true;
                self.deadline_us = now_us + interval_us;
                Some(record)
            }
            None => {
                self.session = None;
                Some(Record::Completed { test_id })
            }
        }
    }
}

/// Per-sample metric computation.
///
/// Simulated draws mirror the original integer scaling: `ber` in [0, 0.1)
/// from a 0..=99 draw, `fer` in [0, 0.2) from 0..=199, both over 1000.
/// Normal mode is the exact linear law required for test-vector
/// compatibility.
fn metrics<R: RngCore>(rng: &mut R, mode: TestMode, snr: i32) -> (f64, f64) {
    match mode {
        TestMode::Simulated => {
            let ber = f64::from(rng.next_u32() % 100) / 1000.0;
            let fer = f64::from(rng.next_u32() % 200) / 1000.0;
            (ber, fer)
        }
        TestMode::Normal => (0.01 * f64::from(snr), 0.02 * f64::from(snr)),
    }
}
