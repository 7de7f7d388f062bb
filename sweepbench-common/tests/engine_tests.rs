// SPDX-License-Identifier: MIT

//! Unit tests for the sweep-test engine state machine.

use rand_core::SeedableRng;
use rand_wyrand::WyRand;

use sweepbench_common::engine::{Pacing, SessionStatus, SweepTestEngine, TestMode};
use sweepbench_common::protocol::{ErrorKind, SweepRange};
use sweepbench_common::record::Record;

fn engine(pacing: Pacing) -> SweepTestEngine<WyRand> {
    SweepTestEngine::new(pacing, WyRand::seed_from_u64(0xBEEF))
}

/// Drive an immediately-paced engine to completion, collecting every record.
fn drain(engine: &mut SweepTestEngine<WyRand>) -> Vec<Record> {
    let mut records = Vec::new();
    while let Some(record) = engine.poll(0) {
        records.push(record);
    }
    records
}

#[test]
fn test_simple_test_emits_ten_counts_framed() {
    let mut engine = engine(Pacing::immediate());

    let started = engine.start_simple(5, 0).unwrap();
    assert_eq!(started, Record::Started { test_id: 5 });

    let records = drain(&mut engine);
    assert_eq!(records.len(), 11);

    for (i, record) in records[..10].iter().enumerate() {
        assert_eq!(
            *record,
            Record::Count {
                test_id: 5,
                count: i as u32 + 1
            }
        );
    }
    assert_eq!(records[10], Record::Completed { test_id: 5 });
    assert!(!engine.is_active());
}

#[test]
fn test_simple_test_rejects_non_positive_ids() {
    let mut engine = engine(Pacing::immediate());
    assert_eq!(engine.start_simple(0, 0), Err(ErrorKind::InvalidTestId));
    assert_eq!(engine.start_simple(-3, 0), Err(ErrorKind::InvalidTestId));
    assert!(!engine.is_active());
}

#[test]
fn test_engine_rejects_second_session() {
    let mut engine = engine(Pacing::immediate());
    engine.start_simple(1, 0).unwrap();

    assert_eq!(engine.start_simple(2, 0), Err(ErrorKind::Busy));
    let range = SweepRange {
        start: 0,
        step: 1,
        stop: 5,
    };
    assert_eq!(
        engine.start_sweep(3, range, 1, TestMode::Normal, 0),
        Err(ErrorKind::Busy)
    );

    // The rejected requests left the original session untouched.
    let records = drain(&mut engine);
    assert!(records.iter().all(|r| r.test_id() == 1));
}

#[test]
fn test_deterministic_sweep_golden_run() {
    let mut engine = engine(Pacing::immediate());
    let range = SweepRange {
        start: 0,
        step: 5,
        stop: 10,
    };

    let started = engine.start_sweep(1, range, 2, TestMode::Normal, 0).unwrap();
    assert_eq!(started, Record::Started { test_id: 1 });

    let records = drain(&mut engine);
    assert_eq!(records.len(), 7);

    let expected_snrs = [0, 0, 5, 5, 10, 10];
    for (record, &snr) in records[..6].iter().zip(&expected_snrs) {
        let Record::Sample {
            test_id,
            snr: got_snr,
            ber,
            fer,
        } = *record
        else {
            panic!("expected sample, got {record:?}");
        };
        assert_eq!(test_id, 1);
        assert_eq!(got_snr, snr);
        assert_eq!(ber, 0.01 * f64::from(snr));
        assert_eq!(fer, 0.02 * f64::from(snr));
    }
    assert_eq!(records[6], Record::Completed { test_id: 1 });
}

#[test]
fn test_simulated_sweep_metrics_stay_in_range() {
    let mut engine = engine(Pacing::immediate());
    let range = SweepRange {
        start: 0,
        step: 1,
        stop: 20,
    };

    engine.start_sweep(4, range, 5, TestMode::Simulated, 0).unwrap();
    let records = drain(&mut engine);

    let samples: Vec<_> = records
        .iter()
        .filter_map(|r| match *r {
            Record::Sample { ber, fer, .. } => Some((ber, fer)),
            _ => None,
        })
        .collect();
    assert_eq!(samples.len(), 105); // 21 points x 5 samples

    for (ber, fer) in samples {
        assert!((0.0..0.1).contains(&ber), "ber out of range: {ber}");
        assert!((0.0..0.2).contains(&fer), "fer out of range: {fer}");
    }
}

#[test]
fn test_sample_count_matches_range_formula() {
    let cases = [
        (0, 5, 10, 2),
        (0, 3, 10, 1),
        (-6, 2, 6, 3),
        (5, 1, 5, 4),
        (0, 7, 6, 2),
    ];

    for (start, step, stop, batch) in cases {
        let range = SweepRange { start, step, stop };
        let mut engine = engine(Pacing::immediate());
        engine
            .start_sweep(1, range, batch, TestMode::Normal, 0)
            .unwrap();

        let samples = drain(&mut engine)
            .iter()
            .filter(|r| matches!(r, Record::Sample { .. }))
            .count();
        assert_eq!(
            samples as u64,
            range.sample_count(batch),
            "range {start}:{step}:{stop} batch {batch}"
        );
    }
}

#[test]
fn test_sweep_ending_at_i32_max_completes() {
    let mut engine = engine(Pacing::immediate());
    let range = SweepRange {
        start: i32::MAX - 1,
        step: 5,
        stop: i32::MAX,
    };

    // Advancing past the last point steps beyond i32::MAX; the cursor must
    // not wrap back under `stop`.
    engine.start_sweep(3, range, 1, TestMode::Normal, 0).unwrap();
    let records = drain(&mut engine);

    assert_eq!(records.len(), 2);
    assert!(matches!(
        records[0],
        Record::Sample {
            test_id: 3,
            snr,
            ..
        } if snr == i32::MAX - 1
    ));
    assert_eq!(records[1], Record::Completed { test_id: 3 });
    assert!(!engine.is_active());
}

#[test]
fn test_empty_sweep_still_emits_completion_frame() {
    let mut engine = engine(Pacing::immediate());
    let range = SweepRange {
        start: 10,
        step: 1,
        stop: 0,
    };

    let started = engine.start_sweep(2, range, 3, TestMode::Normal, 0).unwrap();
    assert_eq!(started, Record::Started { test_id: 2 });

    let records = drain(&mut engine);
    assert_eq!(records, vec![Record::Completed { test_id: 2 }]);
}

#[test]
fn test_zero_batch_size_is_an_empty_sweep() {
    let mut engine = engine(Pacing::immediate());
    let range = SweepRange {
        start: 0,
        step: 1,
        stop: 5,
    };

    engine.start_sweep(2, range, 0, TestMode::Normal, 0).unwrap();
    assert_eq!(drain(&mut engine), vec![Record::Completed { test_id: 2 }]);
}

#[test]
fn test_sweep_rejects_invalid_range_before_starting() {
    let mut engine = engine(Pacing::immediate());
    let zero_step = SweepRange {
        start: 0,
        step: 0,
        stop: 10,
    };

    assert_eq!(
        engine.start_sweep(1, zero_step, 2, TestMode::Normal, 0),
        Err(ErrorKind::InvalidRange)
    );
    assert!(!engine.is_active());
}

#[test]
fn test_pacing_holds_records_until_deadline() {
    let mut engine = engine(Pacing {
        simple_step_us: 1_000,
        sample_interval_us: 100,
    });

    engine.start_simple(1, 0).unwrap();

    // First count is due immediately after start.
    assert!(matches!(
        engine.poll(0),
        Some(Record::Count { count: 1, .. })
    ));
    // Second is held until one step interval has elapsed.
    assert_eq!(engine.poll(500), None);
    assert!(matches!(
        engine.poll(1_000),
        Some(Record::Count { count: 2, .. })
    ));
}

#[test]
fn test_cancel_aborts_and_frees_the_engine() {
    let mut engine = engine(Pacing::immediate());
    let range = SweepRange {
        start: 0,
        step: 1,
        stop: 100,
    };
    engine.start_sweep(7, range, 10, TestMode::Normal, 0).unwrap();

    // A few samples in, cancel mid-sweep.
    engine.poll(0);
    engine.poll(0);
    assert_eq!(engine.cancel(), Some(Record::Cancelled { test_id: 7 }));
    assert!(!engine.is_active());
    assert_eq!(engine.poll(0), None);

    // The engine accepts a new session afterwards.
    engine.start_simple(8, 0).unwrap();
    assert!(engine.is_active());
}

#[test]
fn test_cancel_is_a_no_op_while_idle() {
    let mut engine = engine(Pacing::immediate());
    assert_eq!(engine.cancel(), None);
}

#[test]
fn test_status_follows_session_lifecycle() {
    let mut engine = engine(Pacing::immediate());
    assert_eq!(engine.status(), SessionStatus::Idle);

    engine.start_simple(1, 0).unwrap();
    assert_eq!(engine.status(), SessionStatus::Started);

    engine.poll(0);
    assert_eq!(engine.status(), SessionStatus::Running);

    drain(&mut engine);
    assert_eq!(engine.status(), SessionStatus::Idle);
}
