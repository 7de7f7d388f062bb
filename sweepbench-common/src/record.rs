// SPDX-License-Identifier: MIT

//! Outbound wire records.
//!
//! Every record encodes to exactly one line of compact JSON. Field order is
//! fixed by the wire structs below so golden-output tests stay stable.

use serde::Serialize;

/// Capacity for one encoded record line. The widest record (a sweep sample
/// with two full-precision floats) stays well inside this.
pub const MAX_RECORD_LEN: usize = 96;

/// One status or result record emitted by the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Record {
    /// `{"status":"started","testId":n}`
    Started { test_id: i32 },
    /// `{"testId":n,"count":k}` — countdown sample of the simple test.
    Count { test_id: i32, count: u32 },
    /// `{"testId":n,"snr":s,"ber":b,"fer":f}` — one sweep sample.
    Sample {
        test_id: i32,
        snr: i32,
        ber: f64,
        fer: f64,
    },
    /// `{"status":"completed","testId":n}`
    Completed { test_id: i32 },
    /// `{"status":"cancelled","testId":n}` — session aborted by `CANCEL_TEST`.
    Cancelled { test_id: i32 },
}

#[derive(Serialize)]
struct LifecycleWire {
    status: &'static str,
    #[serde(rename = "testId")]
    test_id: i32,
}

#[derive(Serialize)]
struct CountWire {
    #[serde(rename = "testId")]
    test_id: i32,
    count: u32,
}

#[derive(Serialize)]
struct SampleWire {
    #[serde(rename = "testId")]
    test_id: i32,
    snr: i32,
    ber: f64,
    fer: f64,
}

impl Record {
    /// Test id this record belongs to.
    pub fn test_id(&self) -> i32 {
        match *self {
            Self::Started { test_id }
            | Self::Count { test_id, .. }
            | Self::Sample { test_id, .. }
            | Self::Completed { test_id }
            | Self::Cancelled { test_id } => test_id,
        }
    }

    /// Encode as one compact JSON line (without the terminator).
    pub fn to_json(
        &self,
    ) -> Result<heapless::String<MAX_RECORD_LEN>, serde_json_core::ser::Error> {
        match *self {
            Self::Started { test_id } => serde_json_core::to_string(&LifecycleWire {
                status: "started",
                test_id,
            }),
            Self::Completed { test_id } => serde_json_core::to_string(&LifecycleWire {
                status: "completed",
                test_id,
            }),
            Self::Cancelled { test_id } => serde_json_core::to_string(&LifecycleWire {
                status: "cancelled",
                test_id,
            }),
            Self::Count { test_id, count } => {
                serde_json_core::to_string(&CountWire { test_id, count })
            }
            Self::Sample {
                test_id,
                snr,
                ber,
                fer,
            } => serde_json_core::to_string(&SampleWire {
                test_id,
                snr,
                ber,
                fer,
            }),
        }
    }
}
